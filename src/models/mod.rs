pub mod session;
pub mod transaction;
pub mod upstream;

pub use session::{SessionSource, SessionUser, SessionView, UpstreamTokens};
pub use transaction::{
    PendingTransaction, TrackTransactionRequest, TransactionEvent, TransactionEventKind,
    TransactionStatus,
};
pub use upstream::{ApiKeyDto, DashboardSummary, LoginPayload, OrderDto, OrderOutcome, OrderPage};
