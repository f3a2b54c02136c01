use erp_rpc::RpcError;
use thiserror::Error;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("validation failed: {}", first_violation(.0))]
    Validation(Vec<Violation>),

    /// The backend failed, or a record written a moment ago could not be read back.
    #[error("{0}")]
    Upstream(String),
}

fn first_violation(violations: &[Violation]) -> String {
    violations
        .first()
        .map(|v| format!("{}: {}", v.field, v.message))
        .unwrap_or_default()
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![Violation {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn missing_after_write(model: &str, id: i64) -> Self {
        Self::Upstream(format!("{model} {id} was written but could not be read back"))
    }
}

impl From<RpcError> for DomainError {
    fn from(e: RpcError) -> Self {
        Self::Upstream(e.to_string())
    }
}

/// Collects field violations so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Push when `failed` holds.
    pub fn check(&mut self, failed: bool, field: impl Into<String>, message: impl Into<String>) {
        if failed {
            self.push(field, message);
        }
    }

    /// `Ok(value)` if nothing was collected.
    ///
    /// # Errors
    /// [`DomainError::Validation`] carrying every collected violation.
    pub fn finish<T>(self, value: T) -> Result<T, DomainError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(DomainError::Validation(self.0))
        }
    }
}
