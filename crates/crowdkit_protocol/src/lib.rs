//! # crowdkit Protocol
//!
//! Wire model and object mapper for the crowdkit API client.
//!
//! This crate provides:
//! - `structure` / `unstructure` between JSON and typed records
//! - `Operation` and `OperationLogItem` for long-running server jobs
//! - `BatchCreateResult` for per-item batch outcomes
//! - Entity records (`Task`, `TaskSuite`, `UserBonus`) and their search requests
//! - Sorting and filter-condition trees; filters are a standalone builder
//!   for callers composing audience settings and are not sent by any
//!   request here
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Exact decimals
//!
//! `Money` never passes through `f64`. The workspace enables serde_json's
//! `arbitrary_precision` feature, so no record here uses `#[serde(flatten)]`
//! or untagged enums.

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod api_error;
mod batch;
mod entity;
mod error;
mod filter;
mod mapper;
mod operation;
mod operation_log;
mod parameters;
mod search;

pub use api_error::{codes, ApiErrorBody};
pub use batch::{BatchCreateResult, FieldValidationError};
pub use entity::{Entity, SuiteTask, Task, TaskSuite, UserBonus};
pub use error::{MapError, MapResult};
pub use filter::{CompareOperator, Condition, FilterCategory, FilterCondition};
pub use mapper::{structure, unstructure, Money, ServerTimestamp};
pub use operation::{Operation, OperationStatus, OperationType, PSEUDO_OPERATION_ID};
pub use operation_log::{LogItemType, OperationLogItem, CORRELATION_KEY};
pub use parameters::CreateParameters;
pub use search::{
    QueryPairs, SearchRequest, SearchResult, SortItem, SortItems, SortOrder, TaskSearchRequest,
    TaskSuiteSearchRequest, UserBonusSearchRequest,
};
