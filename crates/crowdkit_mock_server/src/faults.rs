//! One-shot fault injection.

use crowdkit_client::Method;
use parking_lot::Mutex;

/// A failure the backend produces instead of its normal answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer 500 without handling the request.
    ServerError,
    /// Fail to connect; the request is not handled.
    Network,
    /// Time out; the request is not handled.
    Timeout,
    /// Handle the request, then answer 500 as if the response was lost.
    LostResponse,
}

#[derive(Debug, Clone)]
struct FaultRule {
    method: Method,
    path_prefix: String,
    fault: Fault,
}

/// Queue of pending faults, each consumed by the first matching request.
#[derive(Debug, Default)]
pub struct FaultPlan {
    rules: Mutex<Vec<FaultRule>>,
}

impl FaultPlan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `fault` for the next `method` request whose path starts with `path_prefix`.
    pub fn push(&self, method: Method, path_prefix: impl Into<String>, fault: Fault) {
        self.rules.lock().push(FaultRule {
            method,
            path_prefix: path_prefix.into(),
            fault,
        });
    }

    /// Removes and returns the first fault matching the request.
    pub fn take(&self, method: Method, path: &str) -> Option<Fault> {
        let mut rules = self.rules.lock();
        let position = rules
            .iter()
            .position(|rule| rule.method == method && path.starts_with(&rule.path_prefix))?;
        Some(rules.remove(position).fault)
    }

    /// Number of faults not yet triggered.
    pub fn pending(&self) -> usize {
        self.rules.lock().len()
    }
}
