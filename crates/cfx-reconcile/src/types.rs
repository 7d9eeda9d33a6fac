use std::collections::BTreeMap;
use std::fmt;

use cfx_feeds::FeedError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Refresh errors
// ---------------------------------------------------------------------------

/// Run-level refresh failure. Per-record problems never surface here.
#[derive(Debug)]
pub enum RefreshError {
    /// A feed fetch failed; storage was not touched.
    Upstream(FeedError),
    /// Name lookup or batch commit failed; the batch was not committed.
    Storage(anyhow::Error),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::Upstream(e) => write!(f, "refresh aborted: {e}"),
            RefreshError::Storage(e) => write!(f, "refresh storage error: {e:#}"),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::Upstream(e) => Some(e),
            RefreshError::Storage(e) => Some(e.as_ref()),
        }
    }
}

impl From<FeedError> for RefreshError {
    fn from(e: FeedError) -> Self {
        RefreshError::Upstream(e)
    }
}

// ---------------------------------------------------------------------------
// Direct create
// ---------------------------------------------------------------------------

/// Body of a direct create request. Fields are optional so that missing keys
/// surface as a [`ValidationError`] listing every bad field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCountryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// Field name → problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn add(&mut self, field: &'static str, problem: &str) {
        self.fields.insert(field, problem.to_string());
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, (field, problem)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field} {problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTarget {
    pub name: String,
    pub population: i64,
    pub currency_code: String,
}

impl CreateCountryRequest {
    /// Check every field and report all failures together.
    pub fn validate(&self) -> Result<CreateTarget, ValidationError> {
        let mut err = ValidationError::default();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            err.add("name", "is required");
        }
        let code = self
            .currency_code
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if code.is_empty() {
            err.add("currency_code", "is required");
        }
        let population = self.population.unwrap_or(0);
        if population <= 0 {
            err.add("population", "must be positive");
        }

        if !err.is_empty() {
            return Err(err);
        }
        Ok(CreateTarget {
            name: name.to_string(),
            population,
            currency_code: code.to_uppercase(),
        })
    }
}

#[derive(Debug)]
pub enum CreateError {
    Validation(ValidationError),
    Upstream(FeedError),
    /// No upstream country matches the requested name or currency.
    NotFound {
        name: String,
        currency_code: String,
    },
    /// A record with the matched country's name is already stored.
    Conflict { name: String },
    Storage(anyhow::Error),
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::Validation(e) => write!(f, "{e}"),
            CreateError::Upstream(e) => write!(f, "create aborted: {e}"),
            CreateError::NotFound {
                name,
                currency_code,
            } => write!(
                f,
                "no upstream country matches name '{name}' or currency '{currency_code}'"
            ),
            CreateError::Conflict { name } => write!(f, "country '{name}' already exists"),
            CreateError::Storage(e) => write!(f, "create storage error: {e:#}"),
        }
    }
}

impl std::error::Error for CreateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CreateError::Validation(e) => Some(e),
            CreateError::Upstream(e) => Some(e),
            CreateError::Storage(e) => Some(e.as_ref()),
            CreateError::NotFound { .. } | CreateError::Conflict { .. } => None,
        }
    }
}

impl From<ValidationError> for CreateError {
    fn from(e: ValidationError) -> Self {
        CreateError::Validation(e)
    }
}

impl From<FeedError> for CreateError {
    fn from(e: FeedError) -> Self {
        CreateError::Upstream(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_bad_fields_reported_together() {
        let err = CreateCountryRequest::default().validate().unwrap_err();
        assert_eq!(err.fields.len(), 3);
        assert_eq!(
            err.to_string(),
            "validation failed: currency_code is required; name is required; population must be positive"
        );
    }

    #[test]
    fn valid_request_is_trimmed_and_uppercased() {
        let req = CreateCountryRequest {
            name: Some("  Ghana ".to_string()),
            population: Some(31_072_940),
            currency_code: Some(" ghs".to_string()),
        };
        let t = req.validate().unwrap();
        assert_eq!(t.name, "Ghana");
        assert_eq!(t.currency_code, "GHS");
    }

    #[test]
    fn missing_keys_deserialize_as_absent() {
        let req: CreateCountryRequest = serde_json::from_str(r#"{"name":"Chad"}"#).unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.fields.contains_key("currency_code"));
        assert!(err.fields.contains_key("population"));
        assert!(!err.fields.contains_key("name"));
    }
}
