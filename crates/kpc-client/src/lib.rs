//! HTTP client for the grocery price backend.

pub mod client;
pub mod error;
pub(crate) mod retry;
mod source;

pub use client::ApiClient;
pub use error::ClientError;
