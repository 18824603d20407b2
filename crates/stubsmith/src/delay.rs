//! Artificial latency: per-stub and global delay settings.
//!
//! The fixed delay and the random distribution are resolved independently
//! (stub value first, then the global value) and added together into the
//! response's initial delay. Chunked dribble delay is separate and paces the
//! body as it is written.

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Random delay distribution
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DelayDistribution {
    /// Uniformly distributed delay in `[lower, upper]` milliseconds
    Uniform { lower: u64, upper: u64 },
    /// Log-normal delay around `median` milliseconds
    #[serde(rename_all = "camelCase")]
    Lognormal {
        median: f64,
        sigma: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_value: Option<f64>,
    },
}

impl DelayDistribution {
    pub fn sample_millis(&self) -> u64 {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match self {
            DelayDistribution::Uniform { lower, upper } => {
                if upper <= lower {
                    *lower
                } else {
                    rng.gen_range(*lower..=*upper)
                }
            }
            DelayDistribution::Lognormal {
                median,
                sigma,
                max_value,
            } => {
                // Box-Muller; u1 in (0, 1] keeps ln() finite
                let u1: f64 = 1.0 - rng.gen::<f64>();
                let u2: f64 = rng.gen::<f64>();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                let mut value = median * (sigma * z).exp();
                if let Some(max) = max_value {
                    value = value.min(*max);
                }
                value.max(0.0).round() as u64
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            DelayDistribution::Uniform { lower, upper } if lower > upper => Err(format!(
                "uniform delay lower bound {lower} exceeds upper bound {upper}"
            )),
            DelayDistribution::Lognormal { median, sigma, .. } if *median < 0.0 || *sigma < 0.0 => {
                Err("lognormal delay median and sigma must be non-negative".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Spread the body over `number_of_chunks` writes within `total_duration` ms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkedDribbleDelay {
    pub number_of_chunks: u32,
    pub total_duration: u64,
}

impl ChunkedDribbleDelay {
    pub fn new(number_of_chunks: u32, total_duration: u64) -> Self {
        Self {
            number_of_chunks,
            total_duration,
        }
    }

    /// Pause between consecutive chunks
    pub fn chunk_interval(&self) -> Duration {
        if self.number_of_chunks == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.total_duration / u64::from(self.number_of_chunks))
    }
}

/// Process-wide default delays, replaced through the admin API
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_distribution: Option<DelayDistribution>,
}

/// Read-mostly store for [`GlobalSettings`]
///
/// Readers always get a complete snapshot; writers swap the whole value.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Arc<GlobalSettings>;

    fn set(&self, settings: GlobalSettings);
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    current: RwLock<Arc<GlobalSettings>>,
}

impl InMemorySettingsStore {
    pub fn new(settings: GlobalSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self) -> Arc<GlobalSettings> {
        self.current.read().clone()
    }

    fn set(&self, settings: GlobalSettings) {
        *self.current.write() = Arc::new(settings);
    }
}

/// Compute the delay to apply before the response is sent.
///
/// Stub values take precedence over global ones, each axis on its own.
pub fn resolve_initial_delay(
    global: &GlobalSettings,
    fixed_delay: Option<u64>,
    distribution: Option<&DelayDistribution>,
) -> Duration {
    let fixed_ms = fixed_delay.or(global.fixed_delay).unwrap_or(0);
    let random_ms = distribution
        .or(global.delay_distribution.as_ref())
        .map(DelayDistribution::sample_millis)
        .unwrap_or(0);
    Duration::from_millis(fixed_ms.saturating_add(random_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sample_in_range() {
        let dist = DelayDistribution::Uniform {
            lower: 100,
            upper: 200,
        };
        for _ in 0..50 {
            let ms = dist.sample_millis();
            assert!((100..=200).contains(&ms), "{ms} outside 100..=200");
        }
    }

    #[test]
    fn test_lognormal_respects_max_value() {
        let dist = DelayDistribution::Lognormal {
            median: 80.0,
            sigma: 2.0,
            max_value: Some(120.0),
        };
        for _ in 0..200 {
            assert!(dist.sample_millis() <= 120);
        }
    }

    #[test]
    fn test_lognormal_zero_sigma_is_median() {
        let dist = DelayDistribution::Lognormal {
            median: 90.0,
            sigma: 0.0,
            max_value: None,
        };
        assert_eq!(dist.sample_millis(), 90);
    }

    #[test]
    fn test_distribution_serde() {
        let dist: DelayDistribution =
            serde_json::from_str(r#"{"type": "uniform", "lower": 5, "upper": 10}"#).unwrap();
        assert_eq!(dist, DelayDistribution::Uniform { lower: 5, upper: 10 });

        let dist: DelayDistribution =
            serde_yaml::from_str("type: lognormal\nmedian: 50\nsigma: 0.1\nmaxValue: 70").unwrap();
        assert!(matches!(
            dist,
            DelayDistribution::Lognormal {
                max_value: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_uniform() {
        let dist = DelayDistribution::Uniform {
            lower: 10,
            upper: 5,
        };
        assert!(dist.validate().is_err());
    }

    #[test]
    fn test_stub_fixed_delay_overrides_global() {
        let global = GlobalSettings {
            fixed_delay: Some(500),
            delay_distribution: None,
        };
        assert_eq!(
            resolve_initial_delay(&global, Some(20), None),
            Duration::from_millis(20)
        );
        assert_eq!(
            resolve_initial_delay(&global, None, None),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_fixed_and_distribution_are_summed() {
        let global = GlobalSettings {
            fixed_delay: Some(100),
            delay_distribution: None,
        };
        let dist = DelayDistribution::Uniform {
            lower: 30,
            upper: 30,
        };
        assert_eq!(
            resolve_initial_delay(&global, None, Some(&dist)),
            Duration::from_millis(130)
        );
    }

    #[test]
    fn test_no_delay_configured() {
        assert_eq!(
            resolve_initial_delay(&GlobalSettings::default(), None, None),
            Duration::ZERO
        );
    }

    #[test]
    fn test_settings_store_swaps_snapshot() {
        let store = InMemorySettingsStore::default();
        let before = store.get();
        store.set(GlobalSettings {
            fixed_delay: Some(42),
            delay_distribution: None,
        });
        assert_eq!(before.fixed_delay, None);
        assert_eq!(store.get().fixed_delay, Some(42));
    }

    #[test]
    fn test_chunk_interval() {
        assert_eq!(
            ChunkedDribbleDelay::new(4, 1000).chunk_interval(),
            Duration::from_millis(250)
        );
        assert_eq!(ChunkedDribbleDelay::new(0, 1000).chunk_interval(), Duration::ZERO);
    }
}
