use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::models::upstream::OrderOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TransactionStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<OrderOutcome> for TransactionStatus {
    fn from(outcome: OrderOutcome) -> Self {
        match outcome {
            OrderOutcome::Pending => Self::Pending,
            OrderOutcome::Completed => Self::Completed,
            OrderOutcome::Failed => Self::Failed,
        }
    }
}

/// An on-chain transaction whose order is being watched until it settles.
#[derive(Debug, Clone, Serialize)]
pub struct PendingTransaction {
    pub transaction_hash: String,
    pub order_id: String,
    pub environment: Environment,
    pub amount_fiat: Option<f64>,
    pub amount_crypto: Option<f64>,
    pub currency: Option<String>,
    pub token: Option<String>,
    pub status: TransactionStatus,
    /// Last status string reported by Element Pay.
    pub order_status: Option<String>,
    pub polls: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackTransactionRequest {
    pub transaction_hash: String,
    pub order_id: String,
    pub amount_fiat: Option<f64>,
    pub amount_crypto: Option<f64>,
    pub currency: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionEventKind {
    Updated,
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionEvent {
    #[serde(skip)]
    pub owner: String,
    pub kind: TransactionEventKind,
    pub transaction: PendingTransaction,
}
