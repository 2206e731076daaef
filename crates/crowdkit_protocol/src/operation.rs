//! Long-running server operations.

use crate::mapper::ServerTimestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the synthetic operation built for synchronous responses.
pub const PSEUDO_OPERATION_ID: &str = "PSEUDO_ID";

wire_enum! {
    /// Type of a server operation.
    OperationType {
        /// Batch creation of tasks.
        TaskBatchCreate => "TASK.BATCH_CREATE",
        /// Batch creation of task suites.
        TaskSuiteBatchCreate => "TASK_SUITE.BATCH_CREATE",
        /// Batch creation of user bonuses.
        UserBonusBatchCreate => "USER_BONUS.BATCH_CREATE",
        /// Synthetic operation wrapping a synchronous response.
        Pseudo => "PSEUDO.PSEUDO",
        /// Opening a pool.
        PoolOpen => "POOL.OPEN",
        /// Closing a pool.
        PoolClose => "POOL.CLOSE",
        /// Archiving a pool.
        PoolArchive => "POOL.ARCHIVE",
        /// Cloning a pool.
        PoolClone => "POOL.CLONE",
        /// Archiving a project.
        ProjectArchive => "PROJECT.ARCHIVE",
        /// Opening a training.
        TrainingOpen => "TRAINING.OPEN",
        /// Closing a training.
        TrainingClose => "TRAINING.CLOSE",
        /// Archiving a training.
        TrainingArchive => "TRAINING.ARCHIVE",
        /// Cloning a training.
        TrainingClone => "TRAINING.CLONE",
        /// Analytics computation.
        Analytics => "ANALYTICS",
        /// Aggregation of solutions.
        SolutionAggregate => "SOLUTION.AGGREGATE",
    }
}

wire_enum! {
    /// Status of a server operation.
    OperationStatus {
        /// Queued, not started.
        Pending => "PENDING",
        /// In progress.
        Running => "RUNNING",
        /// Finished successfully.
        Success => "SUCCESS",
        /// Finished with an error.
        Fail => "FAIL",
    }
}

impl OperationStatus {
    /// Returns true if the status will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Success | OperationStatus::Fail)
    }
}

/// A server-side handle to a long-running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID (the idempotency token for create operations).
    pub id: String,
    /// Operation type.
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Current status.
    pub status: OperationStatus,
    /// When the operation was submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted: Option<ServerTimestamp>,
    /// When the server started executing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<ServerTimestamp>,
    /// When it reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<ServerTimestamp>,
    /// Completion percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Parameters the operation was started with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// Type-specific result details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Operation {
    /// Creates an operation in the given state with no timestamps.
    pub fn new(id: impl Into<String>, op_type: OperationType, status: OperationStatus) -> Self {
        Self {
            id: id.into(),
            op_type,
            status,
            submitted: None,
            started: None,
            finished: None,
            progress: None,
            parameters: None,
            details: None,
        }
    }

    /// Builds the already-finished operation used to normalize a synchronous response.
    pub fn pseudo(op_type: OperationType) -> Self {
        let mut op = Self::new(PSEUDO_OPERATION_ID, op_type, OperationStatus::Success);
        op.progress = Some(100);
        op
    }

    /// Returns true if the operation reached a terminal status.
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if the operation finished successfully.
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }

    /// Returns true for the synthetic operation built by [`Operation::pseudo`].
    pub fn is_pseudo(&self) -> bool {
        self.id == PSEUDO_OPERATION_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{structure, unstructure};
    use serde_json::json;

    #[test]
    fn operation_type_wire_names() {
        assert_eq!(OperationType::TaskBatchCreate.as_str(), "TASK.BATCH_CREATE");
        assert_eq!(
            OperationType::from("TASK_SUITE.BATCH_CREATE"),
            OperationType::TaskSuiteBatchCreate
        );
        assert_eq!(
            OperationType::from("POOL.SOMETHING_NEW"),
            OperationType::Other("POOL.SOMETHING_NEW".into())
        );
    }

    #[test]
    fn status_terminality() {
        assert!(!OperationStatus::Pending.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(OperationStatus::Success.is_terminal());
        assert!(OperationStatus::Fail.is_terminal());
        assert!(!OperationStatus::Other("PAUSED".into()).is_terminal());
    }

    #[test]
    fn operation_from_server_json() {
        let op: Operation = structure(json!({
            "id": "7c1f",
            "type": "TASK.BATCH_CREATE",
            "status": "RUNNING",
            "submitted": "2022-05-01T10:00:00.12",
            "started": "2022-05-01T10:00:01",
            "progress": 40,
            "parameters": {"skip_invalid_items": true},
            "unexpected_field": "ignored"
        }))
        .unwrap();

        assert_eq!(op.id, "7c1f");
        assert_eq!(op.op_type, OperationType::TaskBatchCreate);
        assert_eq!(op.status, OperationStatus::Running);
        assert!(!op.is_completed());
        assert_eq!(op.progress, Some(40));
        assert_eq!(
            op.submitted.unwrap().to_canonical(),
            "2022-05-01T10:00:00.120000"
        );
    }

    #[test]
    fn unknown_type_survives_round_trip() {
        let raw = json!({"id": "1", "type": "FUTURE.KIND", "status": "SUCCESS"});
        let op: Operation = structure(raw.clone()).unwrap();
        assert_eq!(op.op_type, OperationType::Other("FUTURE.KIND".into()));
        assert_eq!(unstructure(&op).unwrap(), raw);
    }

    #[test]
    fn pseudo_operation_is_finished() {
        let op = Operation::pseudo(OperationType::UserBonusBatchCreate);
        assert!(op.is_pseudo());
        assert!(op.is_completed());
        assert!(op.is_success());
        assert_eq!(op.id, PSEUDO_OPERATION_ID);
    }
}
