use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, FieldError};

/// Field rules for a request body. Returns every violated rule, not just the first.
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;
}

/// JSON body extractor that runs `Validate` before the handler sees the value.
///
/// Runs after the auth gate, so an unauthenticated request is rejected with
/// 401 before its body is examined.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::invalid_json(rejection.body_text()))?;

        let errors = value.validate();
        if !errors.is_empty() {
            return Err(ApiError::validation_error("Validation failed", errors));
        }
        Ok(ValidatedJson(value))
    }
}

/// Present and not just whitespace
pub fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Push a `<field> is required` rule when `value` is missing or blank.
pub fn require(errors: &mut Vec<FieldError>, field: &str, label: &str, value: &Option<String>) {
    if !is_present(value) {
        errors.push(FieldError::new(field, format!("{} is required", label)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Pair {
        a: Option<String>,
        b: Option<String>,
    }

    impl Validate for Pair {
        fn validate(&self) -> Vec<FieldError> {
            let mut errors = Vec::new();
            require(&mut errors, "a", "A", &self.a);
            require(&mut errors, "b", "B", &self.b);
            errors
        }
    }

    fn json_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn blank_strings_are_not_present() {
        assert!(is_present(&Some("x".into())));
        assert!(!is_present(&Some("   ".into())));
        assert!(!is_present(&None));
    }

    #[tokio::test]
    async fn reports_every_violated_rule() {
        let err = ValidatedJson::<Pair>::from_request(json_request(r#"{"a": " "}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_json();
        let fields: Vec<_> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = ValidatedJson::<Pair>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    #[tokio::test]
    async fn valid_body_passes_through() {
        let ValidatedJson(pair) = ValidatedJson::<Pair>::from_request(json_request(r#"{"a":"1","b":"2"}"#), &())
            .await
            .unwrap();
        assert_eq!(pair.b.as_deref(), Some("2"));
    }
}
