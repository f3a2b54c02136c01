//! RFC 9457 Problem Details, the single error body the gateway emits.

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Serialize, Serializer};

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

/// Machine-readable error codes carried in [`Problem::code`].
pub mod codes {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UPSTREAM_FAILURE: &str = "UPSTREAM_FAILURE";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
}

/// RFC 9457 Problem Details for HTTP APIs.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    /// Serializes as u16.
    #[serde(serialize_with = "serialize_status_code")]
    pub status: StatusCode,
    pub detail: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationViolation>>,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationViolation {
    /// Field path, e.g. `email` or `order_lines[0].quantity`.
    pub field: String,
    pub message: String,
}

impl ValidationViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status,
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            errors: None,
        }
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_errors(mut self, errors: Vec<ValidationViolation>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", detail)
            .with_code(codes::UNAUTHENTICATED)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden", detail).with_code(codes::FORBIDDEN)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", detail).with_code(codes::NOT_FOUND)
    }

    pub fn validation(errors: Vec<ValidationViolation>) -> Self {
        let detail = match errors.as_slice() {
            [only] => format!("{}: {}", only.field, only.message),
            _ => format!("{} fields failed validation", errors.len()),
        };
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed", detail)
            .with_code(codes::VALIDATION_FAILED)
            .with_errors(errors)
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Upstream Failure", detail)
            .with_code(codes::UPSTREAM_FAILURE)
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests", detail)
            .with_code(codes::RATE_LIMITED)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut resp = axum::Json(self).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_builder_pattern() {
        let p = Problem::new(StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed", "bad input")
            .with_code(codes::VALIDATION_FAILED)
            .with_instance("/customers")
            .with_errors(vec![ValidationViolation::new("email", "is required")]);

        assert_eq!(p.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(p.code, "VALIDATION_FAILED");
        assert_eq!(p.instance, "/customers");
        assert_eq!(p.errors.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn problem_serializes_status_as_u16() {
        let p = Problem::not_found("customer 4 not found");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json.get("errors").is_none());
        assert!(json.get("instance").is_none());
    }

    #[test]
    fn single_violation_becomes_detail() {
        let p = Problem::validation(vec![ValidationViolation::new("name", "must not be blank")]);
        assert_eq!(p.detail, "name: must not be blank");
        let p = Problem::validation(vec![
            ValidationViolation::new("name", "must not be blank"),
            ValidationViolation::new("email", "is not a valid address"),
        ]);
        assert_eq!(p.detail, "2 fields failed validation");
    }

    #[test]
    fn response_uses_problem_content_type() {
        let resp = Problem::rate_limited("slow down").into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );
    }
}
