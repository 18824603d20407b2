//! Ordered, multi-valued HTTP header collection.
//!
//! Header names keep the case they were declared with; lookups are
//! case-insensitive. Adding a header never replaces an existing one.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single header name with one or more values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub key: String,
    pub values: Vec<String>,
}

impl HttpHeader {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![value.into()],
        }
    }

    pub fn with_values(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn key_equals(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    headers: Vec<HttpHeader>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `header` appended after the existing headers
    pub fn plus(mut self, header: HttpHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn push(&mut self, header: HttpHeader) {
        self.headers.push(header);
    }

    /// Replace every header named `name` with a single value
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|h| !h.key_equals(name));
        self.headers.push(HttpHeader::new(name, value));
    }

    pub fn get(&self, name: &str) -> Option<&HttpHeader> {
        self.headers.iter().find(|h| h.key_equals(name))
    }

    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HttpHeader::first_value)
    }

    /// All values declared for `name`, across repeated entries
    pub fn all_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.key_equals(name))
            .flat_map(|h| h.values.iter().map(String::as_str))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HttpHeader> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl FromIterator<HttpHeader> for HttpHeaders {
    fn from_iter<I: IntoIterator<Item = HttpHeader>>(iter: I) -> Self {
        Self {
            headers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HttpHeaders {
    type Item = &'a HttpHeader;
    type IntoIter = std::slice::Iter<'a, HttpHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

// Wire format: { "Name": "value" } or { "Name": ["v1", "v2"] }
#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValuesRaw {
    One(String),
    Many(Vec<String>),
}

// Repeated names (in any case) become one entry under the first spelling
impl Serialize for HttpHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut merged: Vec<(&str, Vec<&str>)> = Vec::with_capacity(self.headers.len());
        for header in &self.headers {
            let values = header.values.iter().map(String::as_str);
            match merged
                .iter_mut()
                .find(|(key, _)| key.eq_ignore_ascii_case(&header.key))
            {
                Some((_, existing)) => existing.extend(values),
                None => merged.push((header.key.as_str(), values.collect())),
            }
        }

        let mut map = serializer.serialize_map(Some(merged.len()))?;
        for (key, values) in &merged {
            match values.as_slice() {
                [single] => map.serialize_entry(key, single)?,
                many => map.serialize_entry(key, many)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HttpHeaders {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = HttpHeaders;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of header names to a string or list of strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut headers = HttpHeaders::new();
                while let Some((key, raw)) = access.next_entry::<String, HeaderValuesRaw>()? {
                    let values = match raw {
                        HeaderValuesRaw::One(v) => vec![v],
                        HeaderValuesRaw::Many(vs) => vs,
                    };
                    headers.push(HttpHeader::with_values(key, values));
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}
