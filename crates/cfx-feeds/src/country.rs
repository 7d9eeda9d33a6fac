//! Structurally typed view over one opaque country-feed entry.
//!
//! Upstream entries are loosely shaped: keys go missing, lists come back
//! empty. Absence is always `None` here and consumers decide what it means.
//! A key that is present with the wrong JSON type is a [`MalformedCountry`].

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawCountry {
    pub name: Option<String>,
    pub population: Option<i64>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub flag: Option<String>,
    /// `code` of the first `currencies` entry, untrimmed.
    pub currency_code: Option<String>,
}

/// A country entry whose shape could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCountry {
    /// Best-effort name for labelling the skip, when one was readable.
    pub name: Option<String>,
    pub reason: String,
}

impl fmt::Display for MalformedCountry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(n) => write!(f, "malformed country '{n}': {}", self.reason),
            None => write!(f, "malformed country entry: {}", self.reason),
        }
    }
}

impl std::error::Error for MalformedCountry {}

impl RawCountry {
    pub fn from_value(v: &Value) -> Result<Self, MalformedCountry> {
        let obj = v.as_object().ok_or_else(|| MalformedCountry {
            name: None,
            reason: format!("entry is not an object ({})", json_kind(v)),
        })?;

        // Name first so later failures can be labelled.
        let name = opt_str(obj, "name").map_err(|reason| MalformedCountry { name: None, reason })?;
        let fail = |reason: String| MalformedCountry {
            name: name.clone(),
            reason,
        };

        Ok(Self {
            population: opt_population(obj).map_err(fail)?,
            capital: opt_str(obj, "capital").map_err(fail)?,
            region: opt_str(obj, "region").map_err(fail)?,
            flag: opt_str(obj, "flag").map_err(fail)?,
            currency_code: first_currency_code(obj).map_err(fail)?,
            name,
        })
    }
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!("field '{key}' is {}, expected string", json_kind(other))),
    }
}

fn opt_population(obj: &Map<String, Value>) -> Result<Option<i64>, String> {
    match obj.get("population") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            // Whole-valued floats (e.g. `1.0e6`) are accepted; fractions are not.
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(format!("population {n} is not an integer")),
            }
        }
        Some(other) => Err(format!("field 'population' is {}, expected number", json_kind(other))),
    }
}

fn first_currency_code(obj: &Map<String, Value>) -> Result<Option<String>, String> {
    match obj.get("currencies") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(list)) => match list.first() {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(first)) => opt_str(first, "code"),
            Some(other) => Err(format!("currencies[0] is {}, expected object", json_kind(other))),
        },
        Some(other) => Err(format!("field 'currencies' is {}, expected array", json_kind(other))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_entry_decodes() {
        let v = json!({
            "name": "Nigeria",
            "capital": "Abuja",
            "region": "Africa",
            "population": 206139587,
            "flag": "https://flagcdn.com/ng.svg",
            "currencies": [{"code": "NGN", "name": "Nigerian naira", "symbol": "₦"}],
            "independent": false
        });
        let c = RawCountry::from_value(&v).unwrap();
        assert_eq!(c.name.as_deref(), Some("Nigeria"));
        assert_eq!(c.population, Some(206_139_587));
        assert_eq!(c.currency_code.as_deref(), Some("NGN"));
        assert_eq!(c.flag.as_deref(), Some("https://flagcdn.com/ng.svg"));
    }

    #[test]
    fn missing_keys_become_none() {
        let c = RawCountry::from_value(&json!({"name": "Antarctica", "population": 1000})).unwrap();
        assert_eq!(c.capital, None);
        assert_eq!(c.region, None);
        assert_eq!(c.currency_code, None);

        let c = RawCountry::from_value(&json!({"name": "X", "currencies": []})).unwrap();
        assert_eq!(c.currency_code, None);
        assert_eq!(c.population, None);

        let c = RawCountry::from_value(&json!({"name": "Y", "currencies": [{"name": "no code"}]})).unwrap();
        assert_eq!(c.currency_code, None);
    }

    #[test]
    fn whole_float_population_accepted() {
        let c = RawCountry::from_value(&json!({"name": "F", "population": 2.0e6})).unwrap();
        assert_eq!(c.population, Some(2_000_000));
    }

    #[test]
    fn wrong_types_are_malformed_and_keep_the_name() {
        let err = RawCountry::from_value(&json!({"name": "Atlantis", "population": "lots"})).unwrap_err();
        assert_eq!(err.name.as_deref(), Some("Atlantis"));
        assert!(err.reason.contains("population"));

        let err = RawCountry::from_value(&json!({"name": "Atlantis", "currencies": "ATL"})).unwrap_err();
        assert!(err.reason.contains("currencies"));

        let err = RawCountry::from_value(&json!({"name": "Atlantis", "population": 1.5})).unwrap_err();
        assert!(err.reason.contains("not an integer"));
    }

    #[test]
    fn non_object_entry_is_malformed_without_name() {
        let err = RawCountry::from_value(&json!(42)).unwrap_err();
        assert_eq!(err.name, None);
        assert_eq!(err.to_string(), "malformed country entry: entry is not an object (number)");

        let err = RawCountry::from_value(&json!({"name": {"common": "Peru"}})).unwrap_err();
        assert_eq!(err.name, None);
    }
}
