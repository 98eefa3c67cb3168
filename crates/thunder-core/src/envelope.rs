//! Backend response envelope
//!
//! Every backend call answers with `{data?: T, errors?: [{title, status, detail}]}`.
//! An absent `errors` list and an empty one mean the same thing: success.

use serde::{Deserialize, Serialize};

/// A single error record reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(title: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    /// An internal error carrying only a detail message
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new("Internal Server Error", 500, detail)
    }
}

/// Error raised when an envelope carries a non-empty `errors` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub errors: Vec<ErrorDetail>,
}

impl std::error::Error for BackendError {}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.first() {
            Some(first) if first.title.is_empty() => write!(f, "{}", first.detail),
            Some(first) => write!(f, "{}: {}", first.title, first.detail),
            None => write!(f, "unknown backend error"),
        }
    }
}

impl BackendError {
    pub fn new(errors: Vec<ErrorDetail>) -> Self {
        Self { errors }
    }

    /// The detail message of the first reported error
    pub fn first_detail(&self) -> Option<&str> {
        self.errors.first().map(|e| e.detail.as_str())
    }
}

/// Uniform response wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            errors: None,
            data: Some(data),
        }
    }

    /// Failed response with a single error record
    pub fn error(detail: ErrorDetail) -> Self {
        Self {
            errors: Some(vec![detail]),
            data: None,
        }
    }

    /// Failed response with several error records
    pub fn errors(details: Vec<ErrorDetail>) -> Self {
        Self {
            errors: Some(details),
            data: None,
        }
    }

    /// True when the envelope reports at least one error
    pub fn is_error(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    /// Convert into a `Result`, substituting the default value for absent data.
    pub fn into_result(self) -> Result<T, BackendError>
    where
        T: Default,
    {
        match self.errors {
            Some(errors) if !errors.is_empty() => Err(BackendError::new(errors)),
            _ => Ok(self.data.unwrap_or_default()),
        }
    }
}

impl<T> From<BackendError> for Envelope<T> {
    fn from(err: BackendError) -> Self {
        Self::errors(err.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_errors_are_success() {
        let envelope: Envelope<Vec<String>> = Envelope {
            errors: Some(vec![]),
            data: Some(vec!["public".into()]),
        };
        assert!(!envelope.is_error());
        assert_eq!(envelope.into_result().unwrap(), vec!["public".to_string()]);
    }

    #[test]
    fn absent_data_defaults() {
        let envelope: Envelope<Vec<String>> = serde_json::from_str("{}").unwrap();
        assert_eq!(envelope.into_result().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn errors_win_over_data() {
        let json = r#"{"errors":[{"title":"Bad","status":500,"detail":"no driver"}],"data":["x"]}"#;
        let envelope: Envelope<Vec<String>> = serde_json::from_str(json).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.first_detail(), Some("no driver"));
        assert_eq!(err.to_string(), "Bad: no driver");
    }

    #[test]
    fn untitled_error_displays_detail_only() {
        let err = BackendError::new(vec![ErrorDetail {
            detail: "connection refused".into(),
            ..Default::default()
        }]);
        assert_eq!(err.to_string(), "connection refused");
    }
}
