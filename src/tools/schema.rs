//! Parameter declarations and argument validation

use serde_json::{json, Map, Value};
use crate::Result;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    /// Filled in when an optional parameter is absent or null
    pub default: Option<Value>,
    /// Inclusive bounds for integers
    pub range: Option<(i64, i64)>,
    /// Allowed values for strings
    pub one_of: Option<&'static [&'static str]>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
            range: None,
            one_of: None,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str, default: Value) -> Self {
        Self {
            required: false,
            default: Some(default),
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    fn check(&self, value: &Value) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(Error::Validation(format!(
                "'{}' must be of type {}, got {}", self.name, self.kind.json_type(), value
            )));
        }

        if let (Some((min, max)), Some(n)) = (self.range, value.as_i64()) {
            if n < min || n > max {
                return Err(Error::Validation(format!(
                    "'{}' must be between {} and {}, got {}", self.name, min, max, n
                )));
            }
        }
        // u64 values beyond i64 are always out of any declared range
        if self.range.is_some() && value.as_i64().is_none() && value.is_u64() {
            return Err(Error::Validation(format!("'{}' is out of range: {}", self.name, value)));
        }

        if let (Some(allowed), Some(s)) = (self.one_of, value.as_str()) {
            if !allowed.contains(&s) {
                return Err(Error::Validation(format!(
                    "'{}' must be one of [{}], got '{}'", self.name, allowed.join(", "), s
                )));
            }
        }
        Ok(())
    }
}

/// Render parameter specs as a JSON Schema object
pub fn json_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for p in params {
        let mut prop = json!({
            "type": p.kind.json_type(),
            "description": p.description,
        });
        if let Some(default) = &p.default {
            prop["default"] = default.clone();
        }
        if let Some((min, max)) = p.range {
            prop["minimum"] = json!(min);
            prop["maximum"] = json!(max);
        }
        if let Some(values) = p.one_of {
            prop["enum"] = json!(values);
        }
        if p.required {
            required.push(p.name);
        }
        properties.insert(p.name.to_string(), prop);
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Check raw arguments against `params`, filling defaults.
///
/// Unknown keys are rejected; null counts as absent.
pub fn validate(tool: &str, params: &[ParamSpec], args: Value) -> Result<ToolArgs> {
    let mut given = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(Error::Validation(format!(
                "arguments for '{}' must be an object, got {}", tool, other
            )))
        }
    };

    if let Some(unknown) = given.keys().find(|k| !params.iter().any(|p| p.name == k.as_str())) {
        return Err(Error::Validation(format!("'{}' has no parameter named '{}'", tool, unknown)));
    }

    let mut checked = Map::new();
    for p in params {
        match given.remove(p.name).filter(|v| !v.is_null()) {
            Some(value) => {
                p.check(&value)?;
                checked.insert(p.name.to_string(), value);
            }
            None if p.required => {
                return Err(Error::Validation(format!(
                    "missing required parameter '{}' for '{}'", p.name, tool
                )));
            }
            None => {
                if let Some(default) = &p.default {
                    checked.insert(p.name.to_string(), default.clone());
                }
            }
        }
    }

    Ok(ToolArgs(checked))
}

/// Arguments that passed validation
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn str(&self, name: &str) -> Result<&str> {
        self.0.get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation(format!("missing string parameter '{}'", name)))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.0.get(name)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| Error::Validation(format!("missing integer parameter '{}'", name)))
    }

    /// Optional string; empty strings count as absent
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }
}
