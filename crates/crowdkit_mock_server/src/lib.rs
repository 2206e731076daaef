//! # crowdkit mock server
//!
//! An in-memory backend speaking the same API as the real platform, for
//! testing clients without a network.
//!
//! [`MockBackend`] implements [`crowdkit_client::BlockingTransport`], so a
//! client talks to it directly. It models the parts of the server that matter
//! to client correctness:
//!
//! - find-style search with `id_gt`/`_gte`/`_lt` filters, `sort` and `limit`,
//!   answered as `{"items": [...], "has_more": bool}`
//! - synchronous and asynchronous batch creation with per-item validation
//! - operations with a log, reported `RUNNING` for a configurable number of reads
//! - idempotency: a reused operation id is answered with 409
//! - one-shot [`Fault`]s such as a response lost after the write was applied
//!
//! ## Example
//!
//! ```rust,ignore
//! use crowdkit_client::{BlockingClient, ClientConfig, Method};
//! use crowdkit_mock_server::{Fault, MockBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MockBackend::new());
//! backend.inject(Method::Post, "/v1/tasks", Fault::LostResponse);
//! let client = BlockingClient::new(ClientConfig::new("http://mock", "token"), backend.clone())?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod faults;
mod handler;
mod operations;
mod storage;

pub use backend::MockBackend;
pub use config::BackendConfig;
pub use error::{BackendError, BackendResult};
pub use faults::{Fault, FaultPlan};
pub use handler::RequestHandler;
pub use operations::OperationStore;
pub use storage::Storage;
