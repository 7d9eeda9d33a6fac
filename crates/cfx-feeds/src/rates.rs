//! Currency-code → exchange-rate mapping decoded from the rates feed.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    pub fn new(rates: BTreeMap<String, f64>) -> Self {
        Self { rates }
    }

    /// Decode either a bare `{code: rate}` object or an envelope carrying a
    /// `rates` object. Non-numeric entries are dropped.
    pub fn from_value(v: &Value) -> Result<Self, String> {
        let obj = v
            .as_object()
            .ok_or_else(|| "rates payload is not a JSON object".to_string())?;

        if obj.get("result").and_then(Value::as_str) == Some("error") {
            let kind = obj
                .get("error-type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(format!("rates provider reported error: {kind}"));
        }

        let table = match obj.get("rates") {
            Some(Value::Object(inner)) => inner,
            Some(_) => return Err("field 'rates' is not an object".to_string()),
            None => obj,
        };

        Ok(Self::new(collect_numeric(table)))
    }

    /// Rate for `code`, if the feed carried one.
    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn collect_numeric(table: &Map<String, Value>) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (code, value) in table {
        match value.as_f64() {
            Some(rate) => {
                out.insert(code.clone(), rate);
            }
            None => debug!(%code, "dropping non-numeric exchange rate"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_shape() {
        let t = RateTable::from_value(&json!({
            "result": "success",
            "base_code": "USD",
            "time_last_update_unix": 1700000000,
            "rates": {"USD": 1, "NGN": 1600.5, "EUR": 0.92}
        }))
        .unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get("NGN"), Some(1600.5));
        assert_eq!(t.get("USD"), Some(1.0));
        assert_eq!(t.get("GBP"), None);
    }

    #[test]
    fn bare_mapping_drops_non_numeric() {
        let t = RateTable::from_value(&json!({"WAK": 2.0, "BAD": "x", "NUL": null})).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("WAK"), Some(2.0));
    }

    #[test]
    fn error_envelope_and_wrong_shapes_rejected() {
        let err = RateTable::from_value(&json!({"result": "error", "error-type": "unsupported-code"}))
            .unwrap_err();
        assert!(err.contains("unsupported-code"));
        assert!(RateTable::from_value(&json!([1, 2])).is_err());
        assert!(RateTable::from_value(&json!({"rates": [1]})).is_err());
    }
}
