#![forbid(unsafe_code)]

mod client;
mod error;
pub mod server_timing;
mod timed;
mod types;
mod util;

pub use client::HttpClient;
pub use error::{Error, ErrorClass, Phase, Result};
pub use server_timing::{DEFAULT_METRIC as DEFAULT_SERVER_TIMING_METRIC, ServerTimingError};
pub use timed::TimedClient;
pub use types::{HttpRequest, HttpResponse, TimedTransaction, TransactionRequest};
