pub mod config;
pub mod error;
pub mod event;
pub mod paths;
pub mod task;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use event::{ChannelSink, EventSink, TaskEvent, TaskStatusUpdate};
pub use paths::Paths;
pub use task::{Message, Part, Role, Task, TaskState, TaskStatus};
