pub mod transactions;

pub use transactions::{OrderLookup, TrackError, TrackerSettings, TransactionTracker};
