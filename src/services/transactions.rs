//! Polling of submitted on-chain transactions until their order settles.
//!
//! Each tracked transaction gets its own task that asks Element Pay for the
//! order status on a fixed interval. A terminal status, cancellation, or
//! running out of polls removes it. Nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::AbortHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::clients::ElementPayClient;
use crate::clients::envelope::unwrap_data;
use crate::config::TransactionConfig;
use crate::environment::Environment;
use crate::models::{
    OrderDto, PendingTransaction, TrackTransactionRequest, TransactionEvent, TransactionEventKind,
    TransactionStatus,
};

/// Source of order status for the poller.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn fetch_order(
        &self,
        environment: Environment,
        bearer: &str,
        order_id: &str,
    ) -> anyhow::Result<OrderDto>;
}

#[async_trait]
impl OrderLookup for ElementPayClient {
    async fn fetch_order(
        &self,
        environment: Environment,
        bearer: &str,
        order_id: &str,
    ) -> anyhow::Result<OrderDto> {
        let response = self.get_order(environment, bearer, order_id).await?;
        if !response.is_success() {
            anyhow::bail!("Element Pay returned {} for order {order_id}", response.status);
        }
        if response.body.is_malformed() {
            anyhow::bail!("Element Pay returned malformed JSON for order {order_id}");
        }

        let payload = unwrap_data(response.body.into_value());
        let payload = payload.get("order").cloned().unwrap_or(payload);
        OrderDto::from_value(&payload)
            .ok_or_else(|| anyhow::anyhow!("Order {order_id} response had no order id"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Transaction {0} is already being tracked")]
    AlreadyTracked(String),

    #[error("Too many pending transactions (limit {0})")]
    TooMany(usize),

    #[error("Transaction {0} is not being tracked")]
    NotTracked(String),
}

struct TrackedEntry {
    transaction: PendingTransaction,
    handle: AbortHandle,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub max_pending_per_owner: usize,
    pub event_buffer: usize,
}

impl TrackerSettings {
    #[must_use]
    pub fn from_config(config: &TransactionConfig, event_buffer: usize) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            max_polls: config.max_polls,
            max_pending_per_owner: config.max_pending_per_user,
            event_buffer,
        }
    }
}

struct TrackerInner {
    lookup: Arc<dyn OrderLookup>,
    settings: TrackerSettings,
    /// owner -> transaction hash -> entry
    entries: Mutex<HashMap<String, HashMap<String, TrackedEntry>>>,
    events: broadcast::Sender<TransactionEvent>,
}

#[derive(Clone)]
pub struct TransactionTracker {
    inner: Arc<TrackerInner>,
}

impl TransactionTracker {
    #[must_use]
    pub fn new(lookup: Arc<dyn OrderLookup>, settings: TrackerSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));
        Self {
            inner: Arc::new(TrackerInner {
                lookup,
                settings,
                entries: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionEvent> {
        self.inner.events.subscribe()
    }

    pub async fn track(
        &self,
        owner: &str,
        environment: Environment,
        bearer: &str,
        request: TrackTransactionRequest,
    ) -> Result<PendingTransaction, TrackError> {
        let hash = request.transaction_hash.trim().to_string();
        let order_id = request.order_id.trim().to_string();
        if hash.is_empty() {
            return Err(TrackError::MissingField("transaction_hash"));
        }
        if order_id.is_empty() {
            return Err(TrackError::MissingField("order_id"));
        }

        let now = Utc::now();
        let transaction = PendingTransaction {
            transaction_hash: hash.clone(),
            order_id: order_id.clone(),
            environment,
            amount_fiat: request.amount_fiat,
            amount_crypto: request.amount_crypto,
            currency: request.currency,
            token: request.token,
            status: TransactionStatus::Pending,
            order_status: None,
            polls: 0,
            created_at: now,
            updated_at: now,
        };

        // The lock is held across the spawn so the poller cannot observe the
        // map before its own entry is inserted.
        let mut entries = self.inner.entries.lock().await;
        let tracked = entries.get(owner).map_or(0, HashMap::len);
        if entries.get(owner).is_some_and(|owned| owned.contains_key(&hash)) {
            return Err(TrackError::AlreadyTracked(hash));
        }
        if tracked >= self.inner.settings.max_pending_per_owner {
            return Err(TrackError::TooMany(self.inner.settings.max_pending_per_owner));
        }

        let inner = Arc::clone(&self.inner);
        let task_owner = owner.to_string();
        let task_hash = hash.clone();
        let bearer = bearer.to_string();
        let handle = tokio::spawn(async move {
            inner
                .run_poller(task_owner, task_hash, environment, bearer, order_id)
                .await;
        })
        .abort_handle();

        entries.entry(owner.to_string()).or_default().insert(
            hash.clone(),
            TrackedEntry {
                transaction: transaction.clone(),
                handle,
            },
        );
        drop(entries);

        info!(owner, transaction_hash = %hash, "Tracking pending transaction");
        Ok(transaction)
    }

    /// Pending transactions of `owner`, oldest first.
    pub async fn list(&self, owner: &str) -> Vec<PendingTransaction> {
        let entries = self.inner.entries.lock().await;
        let mut list: Vec<PendingTransaction> = entries
            .get(owner)
            .map(|owned| owned.values().map(|e| e.transaction.clone()).collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        list
    }

    pub async fn cancel(&self, owner: &str, hash: &str) -> Result<PendingTransaction, TrackError> {
        let entry = self
            .inner
            .remove(owner, hash)
            .await
            .ok_or_else(|| TrackError::NotTracked(hash.to_string()))?;
        entry.handle.abort();

        let mut transaction = entry.transaction;
        transaction.status = TransactionStatus::Cancelled;
        transaction.updated_at = Utc::now();

        info!(owner, transaction_hash = %hash, "Stopped tracking transaction");
        self.inner
            .publish(owner, TransactionEventKind::Finished, transaction.clone());
        Ok(transaction)
    }

    /// Stops every poller.
    pub async fn shutdown(&self) {
        let mut entries = self.inner.entries.lock().await;
        for entry in entries.values().flat_map(HashMap::values) {
            entry.handle.abort();
        }
        entries.clear();
    }
}

impl TrackerInner {
    async fn remove(&self, owner: &str, hash: &str) -> Option<TrackedEntry> {
        let mut entries = self.entries.lock().await;
        let owned = entries.get_mut(owner)?;
        let entry = owned.remove(hash);
        if owned.is_empty() {
            entries.remove(owner);
        }
        entry
    }

    fn publish(&self, owner: &str, kind: TransactionEventKind, transaction: PendingTransaction) {
        // No subscribers is fine.
        let _ = self.events.send(TransactionEvent {
            owner: owner.to_string(),
            kind,
            transaction,
        });
    }

    /// Applies one poll result. Returns `None` when the entry is gone
    /// (cancelled), which ends the poller.
    async fn record_poll(
        &self,
        owner: &str,
        hash: &str,
        polls: u32,
        order: Option<&OrderDto>,
    ) -> Option<PendingTransaction> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(owner)?.get_mut(hash)?;

        let tx = &mut entry.transaction;
        tx.polls = polls;
        tx.updated_at = Utc::now();
        if let Some(order) = order {
            tx.status = order.outcome().into();
            tx.order_status = Some(order.status.clone());
        }
        Some(tx.clone())
    }

    async fn finish(&self, owner: &str, hash: &str, status: TransactionStatus) {
        let Some(entry) = self.remove(owner, hash).await else {
            return;
        };

        let mut transaction = entry.transaction;
        transaction.status = status;
        transaction.updated_at = Utc::now();

        info!(owner, transaction_hash = %hash, status = ?status, "Transaction tracking finished");
        self.publish(owner, TransactionEventKind::Finished, transaction);
    }

    async fn run_poller(
        self: Arc<Self>,
        owner: String,
        hash: String,
        environment: Environment,
        bearer: String,
        order_id: String,
    ) {
        let period = self.settings.poll_interval;
        let mut interval = interval_at(Instant::now() + period, period);

        for attempt in 1..=self.settings.max_polls {
            interval.tick().await;

            let order = match self.lookup.fetch_order(environment, &bearer, &order_id).await {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(transaction_hash = %hash, attempt, "Order status check failed: {e:#}");
                    None
                }
            };

            let Some(snapshot) = self.record_poll(&owner, &hash, attempt, order.as_ref()).await
            else {
                debug!(transaction_hash = %hash, "Transaction no longer tracked, poller exiting");
                return;
            };

            if snapshot.status.is_terminal() {
                self.finish(&owner, &hash, snapshot.status).await;
                return;
            }

            self.publish(&owner, TransactionEventKind::Updated, snapshot);
        }

        self.finish(&owner, &hash, TransactionStatus::TimedOut).await;
    }
}
