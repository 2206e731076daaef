//! # crowdkit client
//!
//! Typed client for a crowdsourcing platform's REST API.
//!
//! The client is built around two guarantees:
//!
//! - **Idempotent creation.** Every create call carries one operation id for
//!   all of its retries. A lost response followed by a retry resumes the
//!   operation the server already started instead of creating duplicates.
//! - **Exhaustive pagination.** [`Client::iterate_all`] walks a collection in
//!   id order with an `id_gt` cursor, yielding every matching record once.
//!   A [`ResumableCursor`] keeps that position across calls and restarts;
//!   [`Client::fetch_new`] moves it only when every page arrived.
//!
//! ## Transports
//!
//! Requests go through the [`Transport`] seam. [`MockTransport`] replays a
//! script for unit tests; with the `reqwest` feature, [`ReqwestTransport`]
//! and [`ReqwestBlockingTransport`] talk to a real server.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crowdkit_client::{BlockingClient, ClientConfig, CreateParameters, Environment, Task};
//! use crowdkit_client::ReqwestBlockingTransport;
//!
//! let config = ClientConfig::for_environment(Environment::Sandbox, token);
//! let client = BlockingClient::new(config.clone(), ReqwestBlockingTransport::new(&config)?)?;
//! let result = client.create_tasks(&tasks, CreateParameters::new())?;
//! for (index, errors) in &result.validation_errors {
//!     eprintln!("task {index} rejected: {errors:?}");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blocking;
mod client;
mod config;
mod coordinator;
mod error;
#[cfg(feature = "reqwest")]
mod http;
mod pagination;
mod retry;
mod sleep;
mod token;
mod transport;

pub use blocking::BlockingClient;
pub use client::Client;
pub use config::{
    is_server_error, ClientConfig, Environment, PaginationConfig, PollConfig, RetryConfig,
    DEFAULT_RETRY_STATUSES,
};
pub use coordinator::CreatePhase;
pub use error::{ApiError, ApiErrorKind, ClientError, ClientResult};
#[cfg(feature = "reqwest")]
pub use http::{ReqwestBlockingTransport, ReqwestTransport};
pub use pagination::{CursorState, ResumableCursor};
pub use retry::execute_with_retry;
pub use sleep::{NoSleep, Sleeper, ThreadSleeper, TokioSleeper};
pub use token::{RandomTokens, SequentialTokens, TokenGenerator};
pub use transport::{
    Blocking, BlockingTransport, Method, MockTransport, Request, Response, ResponseBody,
    Transport, TransportError, TransportErrorKind,
};

pub use crowdkit_protocol::{
    BatchCreateResult, CompareOperator, Condition, CreateParameters, Entity, FieldValidationError,
    FilterCategory, FilterCondition, Money, Operation, OperationLogItem, OperationStatus,
    OperationType, SearchRequest, SearchResult, ServerTimestamp, SortItem, SortItems, SortOrder,
    SuiteTask, Task, TaskSearchRequest, TaskSuite, TaskSuiteSearchRequest, UserBonus,
    UserBonusSearchRequest,
};
