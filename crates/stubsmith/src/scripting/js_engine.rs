use super::{ScriptError, ScriptEvaluator, ScriptRequest};
use boa_engine::{
    js_string, object::builtins::JsArray, property::PropertyKey, Context, JsObject, JsResult,
    JsValue, Source,
};
use serde_json::Value;

/// Create a JavaScript object with proper Object.prototype
fn create_js_object(context: &Context) -> JsObject {
    JsObject::with_object_proto(context.intrinsics())
}

/// JavaScript script evaluator backed by Boa
///
/// Every evaluation gets its own `Context`; the result of the script's last
/// expression is the body.
#[derive(Debug, Clone, Default)]
pub struct JsEvaluator;

impl JsEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptEvaluator for JsEvaluator {
    fn engine_name(&self) -> &'static str {
        "javascript"
    }

    fn evaluate(
        &self,
        name: &str,
        source: &str,
        request: &ScriptRequest,
    ) -> Result<String, ScriptError> {
        let failed = |message: String| ScriptError::Evaluation {
            name: name.to_string(),
            message,
        };

        let mut context = Context::default();
        let request_value = json_to_js(&mut context, &request.to_json())
            .map_err(|e| failed(format!("cannot bind request: {e}")))?;
        context
            .global_object()
            .set(js_string!("request"), request_value, false, &mut context)
            .map_err(|e| failed(format!("cannot bind request: {e}")))?;

        let result = context
            .eval(Source::from_bytes(source.as_bytes()))
            .map_err(|e| failed(e.to_string()))?;

        js_to_body(&mut context, &result).map_err(|e| failed(e.to_string()))
    }
}

/// Textual form of a script result: strings verbatim, objects as JSON
fn js_to_body(context: &mut Context, value: &JsValue) -> JsResult<String> {
    if value.is_null() || value.is_undefined() {
        return Ok(String::new());
    }
    if let Some(s) = value.as_string() {
        return Ok(s.to_std_string_escaped());
    }
    if value.is_object() {
        return Ok(js_to_json(context, value)?.to_string());
    }
    Ok(value.to_string(context)?.to_std_string_escaped())
}

fn json_to_js(context: &mut Context, value: &Value) -> JsResult<JsValue> {
    match value {
        Value::Null => Ok(JsValue::null()),
        Value::Bool(b) => Ok(JsValue::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(JsValue::from(i))
            } else if let Some(f) = n.as_f64() {
                Ok(JsValue::from(f))
            } else {
                Ok(JsValue::null())
            }
        }
        Value::String(s) => Ok(JsValue::from(js_string!(s.clone()))),
        Value::Array(arr) => {
            let js_arr = JsArray::new(context);
            for (i, v) in arr.iter().enumerate() {
                let js_val = json_to_js(context, v)?;
                js_arr.set(i as u32, js_val, false, context)?;
            }
            Ok(js_arr.into())
        }
        Value::Object(obj) => {
            let js_obj = create_js_object(context);
            for (k, v) in obj {
                let js_val = json_to_js(context, v)?;
                js_obj.set(js_string!(k.clone()), js_val, false, context)?;
            }
            Ok(js_obj.into())
        }
    }
}

fn js_to_json(context: &mut Context, value: &JsValue) -> JsResult<Value> {
    if value.is_null() || value.is_undefined() {
        return Ok(Value::Null);
    }
    if let Some(b) = value.as_boolean() {
        return Ok(Value::Bool(b));
    }
    if let Some(n) = value.as_number() {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            return Ok(Value::from(n as i64));
        }
        return Ok(serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }
    if let Some(s) = value.as_string() {
        return Ok(Value::String(s.to_std_string_escaped()));
    }

    if let Some(obj) = value.as_object() {
        if obj.is_array() {
            let len = obj
                .get(js_string!("length"), context)?
                .as_number()
                .unwrap_or(0.0) as u32;
            let mut arr = Vec::with_capacity(len as usize);
            for i in 0..len {
                let item = obj.get(i, context)?;
                arr.push(js_to_json(context, &item)?);
            }
            return Ok(Value::Array(arr));
        }

        let mut map = serde_json::Map::new();
        for key in obj.own_property_keys(context)? {
            let key_str = match &key {
                PropertyKey::String(s) => s.to_std_string_escaped(),
                PropertyKey::Index(i) => i.get().to_string(),
                PropertyKey::Symbol(_) => continue,
            };
            let val = obj.get(key.clone(), context)?;
            map.insert(key_str, js_to_json(context, &val)?);
        }
        return Ok(Value::Object(map));
    }

    Ok(Value::Null)
}
