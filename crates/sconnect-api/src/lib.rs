// sconnect-api: Async Rust client for dashboard Secure Connect site enrollment

pub mod client;
pub mod error;
pub mod link;
pub mod models;
pub mod retry;
pub mod transport;

pub use client::{API_KEY_HEADER, ClientConfig, DEFAULT_BASE_URL, PER_PAGE, SecureConnectClient};
pub use error::Error;
pub use models::{PageShape, RegionType, SiteEnrollment, SiteRecord};
pub use retry::{RetryPolicy, send_with_retry};
pub use transport::{TlsMode, TransportConfig};

// Callers need the token type to drive cancellation.
pub use tokio_util::sync::CancellationToken;
