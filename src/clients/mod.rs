pub mod element_pay;
pub mod envelope;

pub use element_pay::{ElementPayClient, UpstreamBody, UpstreamError, UpstreamResponse};
