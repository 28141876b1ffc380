use std::sync::Arc;

use ballot_ledger::{BallotReader, InMemoryBallot};
use ballot_store::{FileStateStore, StateStore};
use ballot_types::{ParticipantId, ProposalLabel};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// HTTP front end for one ballot.
pub struct BallotServer {
    config: ServerConfig,
    state: AppState,
}

impl BallotServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Open the configured ballot, deploying a new one when none is stored.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let store: Option<Arc<dyn StateStore>> = config
            .state_path
            .as_ref()
            .map(|path| Arc::new(FileStateStore::new(path)) as Arc<dyn StateStore>);

        let stored = match &store {
            Some(store) => store.open_ballot()?,
            None => None,
        };
        let ballot = match stored {
            Some(ballot) => {
                tracing::info!(receipts = ballot.receipt_count()?, "ballot restored");
                ballot
            }
            None => {
                let ballot = deploy_from_config(&config)?;
                if let Some(store) = &store {
                    store.save_if_head(&ballot.snapshot()?, None)?;
                }
                ballot
            }
        };

        let mut state = AppState::new(Arc::new(ballot));
        if let Some(store) = store {
            state = state.with_store(store);
        }
        Ok(Self::new(config, state))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("ballot server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

fn deploy_from_config(config: &ServerConfig) -> ServerResult<InMemoryBallot> {
    let administrator = config.administrator.as_deref().ok_or_else(|| {
        ServerError::Config("no stored ballot and no administrator configured".into())
    })?;
    let administrator = ParticipantId::resolve(administrator)?;
    let labels = config
        .proposals
        .iter()
        .map(|label| ProposalLabel::new(label.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Config(e.to_string()))?;
    Ok(InMemoryBallot::deploy(administrator, labels)?)
}
