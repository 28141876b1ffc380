use async_trait::async_trait;
use axum::http::HeaderMap;
use ballot_types::ParticipantId;

use crate::error::{ServerError, ServerResult};

/// Header carrying the caller's identity: an `0x` address or a name.
pub const CALLER_HEADER: &str = "x-ballot-caller";

/// Maps request headers to the participant making the call.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<ParticipantId>;
}

/// Trusts the [`CALLER_HEADER`] as given.
pub struct HeaderAuth;

#[async_trait]
impl AuthProvider for HeaderAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> ServerResult<ParticipantId> {
        let value = headers
            .get(CALLER_HEADER)
            .ok_or(ServerError::MissingCaller)?
            .to_str()
            .map_err(|e| ServerError::InvalidIdentity(e.to_string()))?;
        Ok(ParticipantId::resolve(value)?)
    }
}
