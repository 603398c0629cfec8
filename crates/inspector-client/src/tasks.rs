//! Task controller bookkeeping (§4.6).
//!
//! A [`TaskRecord`] tracks one `tasks/*`-backed tool invocation from
//! creation to its terminal status. The actor drives transitions either
//! from server-pushed notifications or from polling `tasks/get`; this
//! module only holds the resulting state and the promise callers are
//! waiting on.

use tokio::sync::oneshot;

use inspector_protocol::types::{CallToolResult, TaskStatus};
use inspector_types::InspectorError;

/// How this task's status updates are expected to arrive. Chosen once, at
/// creation, based on whether the server already pushed a progress or
/// status notification by the time the poll fallback would fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskUpdateMode {
    ServerPush,
    Polling,
}

pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub status_message: Option<String>,
    pub created_at_ms: u64,
    pub last_updated_at_ms: u64,
    pub mode: TaskUpdateMode,
    pub poll_interval_ms: u64,
    pub result: Option<CallToolResult>,
    pub(crate) next_poll_due_ms: u64,
    pub(crate) waiters: Vec<oneshot::Sender<Result<CallToolResult, InspectorError>>>,
}

impl TaskRecord {
    pub fn new(task_id: String, now_ms: u64, default_poll_interval_ms: u64) -> Self {
        Self {
            task_id,
            status: TaskStatus::Working,
            status_message: None,
            created_at_ms: now_ms,
            last_updated_at_ms: now_ms,
            mode: TaskUpdateMode::ServerPush,
            poll_interval_ms: default_poll_interval_ms,
            result: None,
            next_poll_due_ms: now_ms + default_poll_interval_ms,
            waiters: Vec::new(),
        }
    }

    /// Apply a status transition. Returns `true` if the task just became
    /// terminal (the caller should settle `waiters`).
    pub fn transition(&mut self, status: TaskStatus, message: Option<String>, now_ms: u64) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(task_id = %self.task_id, "ignoring transition on terminal task");
            return false;
        }
        self.status = status;
        self.status_message = message;
        self.last_updated_at_ms = now_ms;
        status.is_terminal()
    }

    pub fn settle(&mut self, outcome: Result<CallToolResult, InspectorError>) {
        for waiter in self.waiters.drain(..) {
            let cloned = match &outcome {
                Ok(result) => Ok(result.clone()),
                Err(err) => Err(err.clone()),
            };
            let _ = waiter.send(cloned);
        }
        if let Ok(result) = outcome {
            self.result = Some(result);
        }
    }

    /// Deterministic jitter in `[0, spread_ms)` derived from a counter so
    /// repeated polls for the same task don't all land in lockstep with
    /// other tasks' polls.
    pub fn jittered_interval(base_ms: u64, attempt: u64) -> u64 {
        let spread = (base_ms / 4).max(1);
        base_ms + (attempt.wrapping_mul(2_654_435_761) % spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_types::ErrorKind;

    fn content_result() -> CallToolResult {
        CallToolResult { content: Vec::new(), is_error: Some(false), structured_content: None }
    }

    #[test]
    fn new_record_starts_working_with_server_push_mode() {
        let record = TaskRecord::new("t1".into(), 100, 2000);
        assert_eq!(record.status, TaskStatus::Working);
        assert_eq!(record.mode, TaskUpdateMode::ServerPush);
        assert_eq!(record.next_poll_due_ms, 2100);
    }

    #[test]
    fn transition_to_terminal_status_reports_true() {
        let mut record = TaskRecord::new("t1".into(), 0, 1000);
        assert!(!record.transition(TaskStatus::Working, None, 10));
        assert!(record.transition(TaskStatus::Completed, Some("done".into()), 20));
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.status_message.as_deref(), Some("done"));
        assert_eq!(record.last_updated_at_ms, 20);
    }

    #[test]
    fn transition_after_terminal_is_ignored() {
        let mut record = TaskRecord::new("t1".into(), 0, 1000);
        record.transition(TaskStatus::Completed, None, 10);
        let changed = record.transition(TaskStatus::Failed, None, 20);
        assert!(!changed);
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.last_updated_at_ms, 10);
    }

    #[test]
    fn settle_resolves_all_waiters_and_stores_result() {
        let mut record = TaskRecord::new("t1".into(), 0, 1000);
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();
        record.waiters.push(tx1);
        record.waiters.push(tx2);

        record.settle(Ok(content_result()));

        assert!(record.waiters.is_empty());
        assert!(record.result.is_some());
        assert!(rx1.try_recv().unwrap().is_ok());
        assert!(rx2.try_recv().unwrap().is_ok());
    }

    #[test]
    fn settle_with_error_propagates_to_waiters_without_storing_result() {
        let mut record = TaskRecord::new("t1".into(), 0, 1000);
        let (tx, mut rx) = oneshot::channel();
        record.waiters.push(tx);

        record.settle(Err(InspectorError::new(ErrorKind::Timeout, "timed out")));

        assert!(record.result.is_none());
        assert!(rx.try_recv().unwrap().is_err());
    }

    #[test]
    fn jittered_interval_stays_within_spread_and_is_deterministic() {
        let base = 4000;
        let a = TaskRecord::jittered_interval(base, 3);
        let b = TaskRecord::jittered_interval(base, 3);
        assert_eq!(a, b);
        assert!(a >= base);
        assert!(a < base + base / 4);
    }
}
