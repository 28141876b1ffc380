use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ballot_ledger::LedgerError;
use ballot_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing caller identity header")]
    MissingCaller,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ballot_types::TypeError> for ServerError {
    fn from(e: ballot_types::TypeError) -> Self {
        Self::InvalidIdentity(e.to_string())
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCaller => StatusCode::UNAUTHORIZED,
            Self::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) => match e {
                LedgerError::Unauthorized => StatusCode::FORBIDDEN,
                LedgerError::InvalidProposal { .. }
                | LedgerError::InvalidDelegate
                | LedgerError::IneligibleDelegate
                | LedgerError::EmptyBallot => StatusCode::UNPROCESSABLE_ENTITY,
                e if e.is_rejection() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(StoreError::HeadMoved) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCaller => "MissingCaller",
            Self::InvalidIdentity(_) => "InvalidIdentity",
            Self::Ledger(e) => e.kind(),
            Self::Store(StoreError::HeadMoved) => "StateConflict",
            Self::Store(_) => "Store",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_rejections_map_to_client_errors() {
        let cases = [
            (LedgerError::Unauthorized, StatusCode::FORBIDDEN),
            (LedgerError::AlreadyVoted, StatusCode::CONFLICT),
            (LedgerError::AlreadyEnfranchised, StatusCode::CONFLICT),
            (LedgerError::SelfDelegationCycle, StatusCode::CONFLICT),
            (
                LedgerError::DelegationChainTooLong { max: 256 },
                StatusCode::CONFLICT,
            ),
            (LedgerError::InvalidDelegate, StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::IneligibleDelegate, StatusCode::UNPROCESSABLE_ENTITY),
            (
                LedgerError::InvalidProposal { index: 4, count: 3 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (LedgerError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ServerError::from(error).status(), status);
        }
    }

    #[test]
    fn identity_errors() {
        assert_eq!(ServerError::MissingCaller.status(), StatusCode::UNAUTHORIZED);
        let e = ServerError::from(ballot_types::TypeError::EmptyIdentity);
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.kind(), "InvalidIdentity");
    }
}
