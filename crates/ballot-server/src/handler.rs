use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use ballot_ledger::{Action, BallotReader, BallotWriter, Participant, Receipt, MAX_DELEGATION_DEPTH};
use ballot_types::{ParticipantId, ProposalLabel};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProposalView {
    pub index: usize,
    pub label: ProposalLabel,
    pub vote_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    #[serde(flatten)]
    pub record: Participant,
}

#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub seq: u64,
    pub action: &'static str,
    pub caller: ParticipantId,
    pub tx_hash: String,
    pub prev_hash: Option<String>,
    pub details: Action,
}

impl From<Receipt> for ReceiptView {
    fn from(r: Receipt) -> Self {
        Self {
            seq: r.seq,
            action: r.action.name(),
            caller: r.caller,
            tx_hash: r.hash_hex(),
            prev_hash: r.prev_hash.map(|h| format!("0x{}", hex::encode(h))),
            details: r.action,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RightRequest {
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// 0-based proposal index.
    pub proposal: usize,
}

#[derive(Debug, Deserialize)]
pub struct DelegationRequest {
    pub to: String,
}

type Created = (StatusCode, Json<ReceiptView>);

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let ballot = state.ballot();
    Ok(Json(json!({
        "name": "ballot-server",
        "version": env!("CARGO_PKG_VERSION"),
        "administrator": ballot.administrator()?,
        "proposals": ballot.proposals()?.len(),
        "receipts": ballot.receipt_count()?,
        "max_delegation_depth": MAX_DELEGATION_DEPTH,
    })))
}

pub async fn proposals_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<ProposalView>>> {
    let proposals = state
        .ballot()
        .proposals()?
        .into_iter()
        .enumerate()
        .map(|(index, p)| ProposalView {
            index,
            label: p.label,
            vote_count: p.vote_count,
        })
        .collect();
    Ok(Json(proposals))
}

pub async fn winner_handler(State(state): State<AppState>) -> ServerResult<Json<ProposalView>> {
    let ballot = state.ballot();
    let index = ballot.leading_proposal()?;
    let proposal = ballot
        .proposals()?
        .into_iter()
        .nth(index)
        .ok_or_else(|| ServerError::Internal(format!("leading proposal {index} missing")))?;
    Ok(Json(ProposalView {
        index,
        label: proposal.label,
        vote_count: proposal.vote_count,
    }))
}

pub async fn participant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ParticipantView>> {
    let id = ParticipantId::resolve(&id)?;
    let record = state.ballot().participant(&id)?;
    Ok(Json(ParticipantView { id, record }))
}

pub async fn receipts_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<ReceiptView>>> {
    let receipts = state.ballot().receipts()?;
    Ok(Json(receipts.into_iter().map(ReceiptView::from).collect()))
}

pub async fn grant_right_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RightRequest>,
) -> ServerResult<Created> {
    let caller = state.caller(&headers).await?;
    let target = ParticipantId::resolve(&request.target)?;
    let receipt = state.commit(|b| b.grant_right(&caller, &target)).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

pub async fn vote_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> ServerResult<Created> {
    let caller = state.caller(&headers).await?;
    let receipt = state.commit(|b| b.vote(&caller, request.proposal)).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

pub async fn delegation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DelegationRequest>,
) -> ServerResult<Created> {
    let caller = state.caller(&headers).await?;
    let to = ParticipantId::resolve(&request.to)?;
    let receipt = state.commit(|b| b.delegate(&caller, &to)).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}
