//! Server-side operations and their logs.

use crowdkit_protocol::{Operation, OperationLogItem, OperationStatus, ServerTimestamp};
use std::collections::HashMap;

/// An operation with its log and the reads left before it finishes.
#[derive(Debug, Clone)]
struct StoredOperation {
    operation: Operation,
    final_status: OperationStatus,
    log: Vec<OperationLogItem>,
    running_polls: u32,
}

/// Operation registry.
///
/// Doubles as the idempotency index: an operation id can be registered once.
#[derive(Debug, Default)]
pub struct OperationStore {
    operations: HashMap<String, StoredOperation>,
}

impl OperationStore {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `id` was registered.
    pub fn contains(&self, id: &str) -> bool {
        self.operations.contains_key(id)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if no operation was registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Registers an operation whose work is already applied.
    ///
    /// It is reported `RUNNING` now and on the next `running_polls` reads,
    /// then as `final_status`.
    pub fn register(
        &mut self,
        operation: Operation,
        final_status: OperationStatus,
        log: Vec<OperationLogItem>,
        running_polls: u32,
    ) -> Operation {
        let stored = Self::started(operation, final_status, log, running_polls);
        self.insert(stored)
    }

    /// Registers an operation that is already finished, as for synchronous requests.
    pub fn register_finished(
        &mut self,
        operation: Operation,
        final_status: OperationStatus,
        log: Vec<OperationLogItem>,
    ) -> Operation {
        let mut stored = Self::started(operation, final_status, log, 0);
        Self::finish(&mut stored);
        self.insert(stored)
    }

    /// Reads an operation, advancing it toward its final status.
    pub fn read(&mut self, id: &str) -> Option<Operation> {
        let stored = self.operations.get_mut(id)?;
        if !stored.operation.is_completed() {
            if stored.running_polls > 0 {
                stored.running_polls -= 1;
                stored.operation.progress = Some(50);
            } else {
                Self::finish(stored);
            }
        }
        Some(stored.operation.clone())
    }

    /// Returns the log of an operation.
    pub fn log(&self, id: &str) -> Option<Vec<OperationLogItem>> {
        self.operations.get(id).map(|stored| stored.log.clone())
    }

    fn started(
        mut operation: Operation,
        final_status: OperationStatus,
        log: Vec<OperationLogItem>,
        running_polls: u32,
    ) -> StoredOperation {
        let now = ServerTimestamp::now();
        operation.submitted = Some(now);
        operation.started = Some(now);
        operation.status = OperationStatus::Running;
        operation.progress = Some(0);
        StoredOperation {
            operation,
            final_status,
            log,
            running_polls,
        }
    }

    fn insert(&mut self, stored: StoredOperation) -> Operation {
        let reported = stored.operation.clone();
        self.operations.insert(reported.id.clone(), stored);
        reported
    }

    fn finish(stored: &mut StoredOperation) {
        stored.operation.status = stored.final_status.clone();
        stored.operation.progress = Some(100);
        stored.operation.finished = Some(ServerTimestamp::now());
    }
}
