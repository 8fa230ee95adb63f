//! Outbound HTTP: transport seam and the retrying fetcher

pub mod retry;
pub mod transport;

pub use retry::{FetchFailure, RetryingFetcher, DEFAULT_RETRY_BUDGET};
pub use transport::{ApiRequest, HttpTransport, RawResponse, ReqwestTransport, TransportError};
