use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use erp_gateway_errors::Problem;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required: missing bearer credentials")]
    MissingCredentials,

    #[error("Unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// `true` for every failure reported as 401.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::InvalidToken
                | Self::TokenExpired
                | Self::InvalidCredentials
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::UnsupportedScheme => Problem::forbidden(self.to_string()).into_response(),
            Self::Signing(_) => {
                tracing::error!(error = %self, "token signing failed");
                Problem::new(
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "token could not be issued",
                )
                .into_response()
            }
            Self::MissingCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::InvalidCredentials => {
                let mut resp = Problem::unauthenticated(self.to_string()).into_response();
                resp.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                resp
            }
        }
    }
}
