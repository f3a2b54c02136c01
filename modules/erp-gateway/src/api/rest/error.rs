//! Single place where domain failures become HTTP problems.

use erp_gateway_errors::{Problem, ValidationViolation};

use crate::domain::error::DomainError;

pub type ApiResult<T> = Result<T, Problem>;

impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { entity, key } => {
                tracing::debug!(entity, key = %key, "resource not found");
                let mut title = entity.to_owned();
                if let Some(first) = title.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                Problem::not_found(format!("{title} {key} not found"))
            }
            DomainError::Validation(violations) => Problem::validation(
                violations
                    .into_iter()
                    .map(|v| ValidationViolation::new(v.field, v.message))
                    .collect(),
            ),
            DomainError::Upstream(message) => {
                tracing::error!(error = %message, "backend call failed");
                Problem::upstream(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use erp_gateway_errors::codes;

    #[test]
    fn not_found_names_the_entity() {
        let p = Problem::from(DomainError::not_found("customer", 42));
        assert_eq!(p.status, StatusCode::NOT_FOUND);
        assert_eq!(p.detail, "Customer 42 not found");
        assert_eq!(p.code, codes::NOT_FOUND);
    }

    #[test]
    fn validation_keeps_every_violation() {
        let mut v = crate::domain::error::Violations::default();
        v.push("name", "must not be blank");
        v.push("email", "is not a valid address");
        let p = Problem::from(v.finish(()).unwrap_err());
        assert_eq!(p.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(p.errors.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn upstream_carries_backend_message() {
        let p = Problem::from(DomainError::Upstream("Odoo Server Error".to_owned()));
        assert_eq!(p.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(p.detail, "Odoo Server Error");
        assert_eq!(p.code, codes::UPSTREAM_FAILURE);
    }
}
