use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// `Submitted → Working → Completed` is the normal path; `Working` is
/// optional and a task may complete directly from `Submitted`. `Failed` is
/// the terminal state for an executor whose provider call errored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Working => write!(f, "working"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One segment of a message body. Text-only in this system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Part {
    Text { text: String },
}

/// Immutable message value produced by an executor (or sent by a caller).
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub context_id: String,
    pub task_id: String,
}

impl Message {
    pub fn agent(text: &str, context_id: &str, task_id: &str) -> Self {
        Self::new(Role::Agent, text, context_id, task_id)
    }

    pub fn user(text: &str, context_id: &str, task_id: &str) -> Self {
        Self::new(Role::User, text, context_id, task_id)
    }

    fn new(role: Role, text: &str, context_id: &str, task_id: &str) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            role,
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
            context_id: context_id.to_string(),
            task_id: task_id.to_string(),
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| match p {
                Part::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// State plus the optional message attached to a status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            message: Some(message),
        }
    }
}

/// One request's execution context and lifecycle. Owned exclusively by the
/// execution handling that request; discarded after the final event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
}

impl Task {
    pub fn submitted(id: &str, context_id: &str) -> Self {
        Self {
            id: id.to_string(),
            context_id: context_id.to_string(),
            status: TaskStatus::new(TaskState::Submitted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_joins_parts() {
        let mut msg = Message::agent("こんにちは", "ctx-1", "task-1");
        msg.parts.push(Part::Text {
            text: "!".to_string(),
        });
        assert_eq!(msg.text(), "こんにちは!");
        assert_eq!(msg.role, Role::Agent);
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::agent("x", "ctx", "task");
        let b = Message::agent("x", "ctx", "task");
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn test_part_wire_shape() {
        let part = Part::Text {
            text: "hello".to_string(),
        };
        let raw = serde_json::to_value(&part).unwrap();
        assert_eq!(raw["kind"], "text");
        assert_eq!(raw["text"], "hello");
    }

    #[test]
    fn test_status_omits_absent_message() {
        let raw = serde_json::to_value(TaskStatus::new(TaskState::Working)).unwrap();
        assert_eq!(raw["state"], "working");
        assert!(raw.get("message").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
    }
}
