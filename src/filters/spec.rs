use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Declarative filter specification as written in the settings document.
///
/// Three forms are accepted:
/// - `"name"` — no parameters
/// - `["name", [arg1, arg2]]` — positional parameters
/// - `["name", {param = value}]` — keyword parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    Name(String),
    WithParams(String, FilterParams),
}

impl FilterSpec {
    /// Shorthand for a parameterless spec
    pub fn name<S: Into<String>>(name: S) -> Self {
        FilterSpec::Name(name.into())
    }

    /// The filter name this spec refers to
    pub fn filter_name(&self) -> &str {
        match self {
            FilterSpec::Name(name) => name,
            FilterSpec::WithParams(name, _) => name,
        }
    }

    /// View the parameters uniformly, whether positional or keyword
    pub fn args(&self) -> FilterArgs<'_> {
        match self {
            FilterSpec::Name(_) => FilterArgs::default(),
            FilterSpec::WithParams(_, FilterParams::Positional(args)) => FilterArgs {
                positional: args,
                keyword: None,
            },
            FilterSpec::WithParams(_, FilterParams::Keyword(kwargs)) => FilterArgs {
                positional: &[],
                keyword: Some(kwargs),
            },
        }
    }
}

/// Parameter payload of a [`FilterSpec`]: either a positional list or a
/// keyword mapping, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterParams {
    Positional(Vec<ParamValue>),
    Keyword(BTreeMap<String, ParamValue>),
}

/// A single filter parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl ParamValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Float(f) => Some(*f as f32),
            ParamValue::Integer(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ParamValue::Integer(i) => u32::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

/// Uniform accessor over a spec's parameters, used by filter constructors
/// to validate arity and types at resolution time.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterArgs<'a> {
    positional: &'a [ParamValue],
    keyword: Option<&'a BTreeMap<String, ParamValue>>,
}

impl<'a> FilterArgs<'a> {
    /// Number of parameters supplied
    pub fn len(&self) -> usize {
        match self.keyword {
            Some(kwargs) => kwargs.len(),
            None => self.positional.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look a parameter up by position or, for keyword specs, by name
    pub fn get(&self, index: usize, key: &str) -> Option<&'a ParamValue> {
        match self.keyword {
            Some(kwargs) => kwargs.get(key),
            None => self.positional.get(index),
        }
    }

    /// Fail resolution unless exactly `expected` parameters were supplied
    pub fn expect_len(&self, filter: &str, expected: usize) -> Result<(), FilterError> {
        if self.len() != expected {
            return Err(FilterError::BadParams {
                name: filter.to_string(),
                reason: format!("expected {} parameter(s), got {}", expected, self.len()),
            });
        }
        Ok(())
    }

    /// Required numeric parameter
    pub fn require_f32(&self, filter: &str, index: usize, key: &str) -> Result<f32, FilterError> {
        self.get(index, key)
            .and_then(ParamValue::as_f32)
            .ok_or_else(|| FilterError::BadParams {
                name: filter.to_string(),
                reason: format!("missing or non-numeric parameter '{}'", key),
            })
    }

    /// Required non-negative integer parameter
    pub fn require_u32(&self, filter: &str, index: usize, key: &str) -> Result<u32, FilterError> {
        self.get(index, key)
            .and_then(ParamValue::as_u32)
            .ok_or_else(|| FilterError::BadParams {
                name: filter.to_string(),
                reason: format!("missing or invalid integer parameter '{}'", key),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Doc {
        filters: Vec<FilterSpec>,
    }

    #[test]
    fn test_all_three_grammar_forms_deserialize() {
        let doc: Doc = toml::from_str(
            r#"filters = ["grayscale", ["blur", [5]], ["brightness", {factor = 1.5}]]"#,
        )
        .unwrap();

        assert_eq!(doc.filters.len(), 3);
        assert_eq!(doc.filters[0], FilterSpec::Name("grayscale".to_string()));

        assert_eq!(doc.filters[1].filter_name(), "blur");
        assert_eq!(doc.filters[1].args().get(0, "radius").unwrap().as_u32(), Some(5));

        assert_eq!(doc.filters[2].filter_name(), "brightness");
        assert_eq!(
            doc.filters[2].args().get(0, "factor").unwrap().as_f32(),
            Some(1.5)
        );
    }

    #[test]
    fn test_keyword_lookup_ignores_position() {
        let doc: Doc =
            toml::from_str(r#"filters = [["color_filter", {b = 0.5, r = 1.0}]]"#).unwrap();
        let spec = &doc.filters[0];
        assert_eq!(spec.args().require_f32("color_filter", 0, "r").unwrap(), 1.0);
        assert_eq!(spec.args().require_f32("color_filter", 2, "b").unwrap(), 0.5);
        assert!(spec.args().require_f32("color_filter", 1, "g").is_err());
    }

    #[test]
    fn test_expect_len() {
        let doc: Doc = toml::from_str(r#"filters = [["blur", [5, 6]]]"#).unwrap();
        let args = doc.filters[0].args();
        assert!(args.expect_len("blur", 1).is_err());
        assert!(args.expect_len("blur", 2).is_ok());
    }
}
