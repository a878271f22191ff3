/// Session key holding the serialized [`crate::models::SessionUser`].
pub const SESSION_USER_KEY: &str = "user";

/// Per-request override of the active sandbox/live environment.
pub const ENVIRONMENT_HEADER: &str = "x-element-environment";

/// Correlates a dashboard request with its log lines. Echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const DEMO_USER_EMAIL: &str = "demo@paydash.local";
pub const DEMO_USER_PASSWORD: &str = "demo-password";

pub const MAX_API_KEY_NAME_LEN: usize = 64;

pub const DEFAULT_ORDER_PAGE_SIZE: u32 = 20;
pub const MAX_ORDER_PAGE_SIZE: u32 = 100;
