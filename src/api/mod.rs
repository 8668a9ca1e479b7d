pub mod client;
pub mod config;
pub mod error;

pub use client::{ApiClient, QueryParams, RequestOptions};
pub use config::{ApiConfig, BaseKind, Endpoint};
pub use error::{ApiError, ApiResult};
