//! Credit balance, history and mutation handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use flg_core::{CreditPackage, CreditTransaction};
use flg_ledger::Receipt;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Balance in credits.
    pub balance: i64,
    /// Last change timestamp.
    pub updated_at: String,
}

/// `GET /v1/credits/balance`: creates a zero balance on first access.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state.ledger.get_or_create_balance(&caller.identity).await?;

    Ok(Json(BalanceResponse {
        balance: account.balance,
        updated_at: account.updated_at.to_rfc3339(),
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Signed amount (positive = purchase, negative = spend).
    pub amount: i64,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: &'static str,
    /// Description.
    pub description: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            transaction_type: tx.transaction_type.as_str(),
            description: tx.description.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Set when history could not be loaded and the list is empty because
    /// of it.
    pub degraded: bool,
}

/// `GET /v1/credits/transactions`
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let history = match query.limit {
        Some(limit) => state.history.list_recent(&caller.identity, limit).await?,
        None => state.history.recent(&caller.identity).await?,
    };

    Ok(Json(ListTransactionsResponse {
        degraded: history.is_degraded(),
        transactions: history
            .transactions
            .iter()
            .map(TransactionResponse::from)
            .collect(),
    }))
}

/// Package response.
#[derive(Debug, Serialize)]
pub struct PackageResponse {
    /// Credits granted.
    pub credits: i64,
    /// Price in euro cents.
    pub price_cents: i64,
    /// Price for display.
    pub price_formatted: String,
    /// Highlighted in the catalogue.
    pub popular: bool,
}

impl From<&CreditPackage> for PackageResponse {
    fn from(package: &CreditPackage) -> Self {
        Self {
            credits: package.credits,
            price_cents: package.price_cents,
            price_formatted: package.price_formatted(),
            popular: package.popular,
        }
    }
}

/// `GET /v1/credits/packages`
pub async fn list_packages() -> Json<Vec<PackageResponse>> {
    Json(
        CreditPackage::catalog()
            .iter()
            .map(PackageResponse::from)
            .collect(),
    )
}

/// Purchase or spend request.
#[derive(Debug, Deserialize)]
pub struct CreditsRequest {
    /// Number of credits, must be positive.
    pub amount: i64,
    /// Free-text description stored on the transaction.
    #[serde(default)]
    pub description: Option<String>,
}

/// Mutation response.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    /// Balance after the change.
    pub balance: i64,
    /// The recorded transaction.
    pub transaction: TransactionResponse,
}

impl From<Receipt> for ReceiptResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            balance: receipt.balance,
            transaction: TransactionResponse::from(&receipt.transaction),
        }
    }
}

/// `POST /v1/credits/purchase`
pub async fn purchase_credits(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreditsRequest>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let description = body
        .description
        .unwrap_or_else(|| format!("Purchase of {} credits", body.amount));

    let receipt = state
        .ledger
        .purchase(&caller.identity, body.amount, description)
        .await?;

    Ok(Json(ReceiptResponse::from(receipt)))
}

/// `POST /v1/credits/packages/:credits/purchase`
pub async fn purchase_package(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(credits): Path<i64>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let package = CreditPackage::find(credits)
        .ok_or_else(|| ApiError::NotFound(format!("No package of {credits} credits")))?;

    let receipt = state
        .ledger
        .purchase_package(&caller.identity, &package)
        .await?;

    Ok(Json(ReceiptResponse::from(receipt)))
}

/// `POST /v1/credits/spend`
pub async fn spend_credits(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreditsRequest>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let description = body
        .description
        .unwrap_or_else(|| format!("Spend of {} credits", body.amount));

    let receipt = state
        .ledger
        .spend(&caller.identity, body.amount, description)
        .await?;

    Ok(Json(ReceiptResponse::from(receipt)))
}
