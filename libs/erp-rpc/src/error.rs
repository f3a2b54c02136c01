use thiserror::Error;

pub type RpcResult<T> = Result<T, RpcError>;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    #[error("backend login rejected for user '{username}' on database '{database}'")]
    Authentication { database: String, username: String },

    #[error("{message}")]
    Remote { code: i64, message: String },

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl RpcError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
