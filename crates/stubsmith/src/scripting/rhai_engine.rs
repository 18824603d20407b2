use super::{ScriptError, ScriptEvaluator, ScriptRequest};
use chrono::Utc;
use rhai::{Dynamic, Engine, Scope};

/// Rhai script evaluator
///
/// A fresh engine is built for every evaluation so nothing leaks between
/// requests.
#[derive(Debug, Clone, Default)]
pub struct RhaiEvaluator {
    /// Operation budget per evaluation (0 = unlimited)
    max_operations: u64,
}

impl RhaiEvaluator {
    pub fn new(max_operations: u64) -> Self {
        Self { max_operations }
    }

    pub fn create_engine(&self) -> Engine {
        let mut engine = Engine::new();
        if self.max_operations > 0 {
            engine.set_max_operations(self.max_operations);
        }

        engine.register_fn("now_iso", || -> String { Utc::now().to_rfc3339() });
        engine.register_fn("now_plus_minutes", |minutes: i64| -> String {
            (Utc::now() + chrono::Duration::minutes(minutes)).to_rfc3339()
        });

        engine
    }
}

impl ScriptEvaluator for RhaiEvaluator {
    fn engine_name(&self) -> &'static str {
        "rhai"
    }

    fn evaluate(
        &self,
        name: &str,
        source: &str,
        request: &ScriptRequest,
    ) -> Result<String, ScriptError> {
        let engine = self.create_engine();
        let mut scope = Scope::new();

        let request_value =
            rhai::serde::to_dynamic(request.to_json()).map_err(|e| ScriptError::Evaluation {
                name: name.to_string(),
                message: format!("cannot bind request: {e}"),
            })?;
        scope.push_dynamic("request", request_value);

        let result: Dynamic =
            engine
                .eval_with_scope(&mut scope, source)
                .map_err(|e| ScriptError::Evaluation {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;

        Ok(dynamic_to_body(result))
    }
}

/// Textual form of a script result: strings verbatim, maps and arrays as JSON
pub(crate) fn dynamic_to_body(value: Dynamic) -> String {
    if value.is_unit() {
        return String::new();
    }
    if value.is_string() {
        return value.into_string().unwrap_or_default();
    }
    if value.is_map() || value.is_array() {
        if let Ok(json) = rhai::serde::from_dynamic::<serde_json::Value>(&value) {
            return json.to_string();
        }
    }
    value.to_string()
}
