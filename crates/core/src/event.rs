use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::task::{Message, Task, TaskStatus};

/// Status transition notification for a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// One entry in a task's event stream.
///
/// Per task, events are appended in production order and exactly one event
/// carries `final = true`; nothing follows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaskEvent {
    Task(Task),
    StatusUpdate(TaskStatusUpdate),
    Message(Message),
}

impl TaskEvent {
    pub fn task(task: Task) -> Self {
        TaskEvent::Task(task)
    }

    pub fn status(task_id: &str, context_id: &str, status: TaskStatus, is_final: bool) -> Self {
        TaskEvent::StatusUpdate(TaskStatusUpdate {
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
            status,
            is_final,
        })
    }

    pub fn message(message: Message) -> Self {
        TaskEvent::Message(message)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, TaskEvent::StatusUpdate(u) if u.is_final)
    }

    /// The message carried by this event, if any.
    pub fn attached_message(&self) -> Option<&Message> {
        match self {
            TaskEvent::Task(t) => t.status.message.as_ref(),
            TaskEvent::StatusUpdate(u) => u.status.message.as_ref(),
            TaskEvent::Message(m) => Some(m),
        }
    }
}

/// Ordered, append-only channel delivering task lifecycle events to the
/// caller. Injected into the dispatcher and executors so task executions
/// stay independently testable.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: TaskEvent) -> Result<()>;
}

/// Production sink backed by a bounded tokio channel. One sender per task
/// execution; the receiving end is the transport boundary.
pub struct ChannelSink {
    tx: mpsc::Sender<TaskEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TaskEvent>) -> Self {
        Self { tx }
    }

    /// Build a sink together with its receiving end.
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<TaskEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn append(&self, event: TaskEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::Sink("receiver closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;

    #[test]
    fn test_task_event_wire_shape() {
        let event = TaskEvent::task(Task::submitted("t-1", "c-1"));
        let raw = serde_json::to_value(&event).unwrap();
        assert_eq!(raw["kind"], "task");
        assert_eq!(raw["id"], "t-1");
        assert_eq!(raw["contextId"], "c-1");
        assert_eq!(raw["status"]["state"], "submitted");
    }

    #[test]
    fn test_status_update_wire_shape() {
        let msg = Message::agent("done", "c-1", "t-1");
        let event = TaskEvent::status(
            "t-1",
            "c-1",
            TaskStatus::with_message(TaskState::Completed, msg),
            true,
        );
        let raw = serde_json::to_value(&event).unwrap();
        assert_eq!(raw["kind"], "statusUpdate");
        assert_eq!(raw["taskId"], "t-1");
        assert_eq!(raw["final"], true);
        assert_eq!(raw["status"]["state"], "completed");
        assert_eq!(raw["status"]["message"]["parts"][0]["text"], "done");
    }

    #[test]
    fn test_message_event_wire_shape() {
        let event = TaskEvent::message(Message::agent("hi", "c-1", "t-1"));
        let raw = serde_json::to_value(&event).unwrap();
        assert_eq!(raw["kind"], "message");
        assert_eq!(raw["role"], "agent");
        assert_eq!(raw["taskId"], "t-1");
    }

    #[test]
    fn test_is_final_only_on_final_status_update() {
        assert!(!TaskEvent::task(Task::submitted("t", "c")).is_final());
        assert!(!TaskEvent::message(Message::agent("x", "c", "t")).is_final());
        let non_final = TaskEvent::status("t", "c", TaskStatus::new(TaskState::Working), false);
        assert!(!non_final.is_final());
        let fin = TaskEvent::status("t", "c", TaskStatus::new(TaskState::Completed), true);
        assert!(fin.is_final());
    }

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelSink::pair(8);
        sink.append(TaskEvent::task(Task::submitted("t", "c")))
            .await
            .unwrap();
        sink.append(TaskEvent::status("t", "c", TaskStatus::new(TaskState::Completed), true))
            .await
            .unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, TaskEvent::Task(_)));
        assert!(second.is_final());
    }

    #[tokio::test]
    async fn test_channel_sink_closed_receiver() {
        let (sink, rx) = ChannelSink::pair(1);
        drop(rx);
        let err = sink
            .append(TaskEvent::task(Task::submitted("t", "c")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
    }
}
