use std::sync::Arc;
use tracing::info;

use kasa_core::{EventSink, Message, Result, TaskEvent, TaskState, TaskStatus};

use crate::card::AgentSkill;
use crate::dispatch::RequestContext;
use crate::oracle::Oracle;

/// Replies to a greeting in the caller's own language.
///
/// Emits exactly one message event followed by the final completed status.
/// This path intentionally never emits a submitted task event.
pub struct GreetingExecutor {
    oracle: Arc<dyn Oracle>,
}

impl GreetingExecutor {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub fn skill() -> AgentSkill {
        AgentSkill {
            id: "greetings".to_string(),
            name: "Greetings".to_string(),
            description: "Returns appropriate greetings when greeted".to_string(),
            tags: vec!["greeting".to_string(), "hello".to_string(), "hi".to_string()],
            examples: vec![
                "Hello".to_string(),
                "Hi".to_string(),
                "Good morning".to_string(),
                "Guten Tag".to_string(),
            ],
            input_modes: vec!["text".to_string()],
            output_modes: vec!["text".to_string()],
        }
    }

    pub async fn execute(
        &self,
        message: &str,
        ctx: &RequestContext,
        sink: &dyn EventSink,
    ) -> Result<()> {
        let prompt = format!(
            "You are a helpful assistant.\n\
             When greeted by a user, respond with an appropriate greeting in the same language.\n\
             \n\
             User's greeting: \"{}\"",
            message
        );

        let response = self.oracle.complete(&prompt).await?;

        info!(task_id = %ctx.task_id, response_len = response.len(), "Greeting generated");

        sink.append(TaskEvent::message(Message::agent(
            &response,
            &ctx.context_id,
            &ctx.task_id,
        )))
        .await?;

        sink.append(TaskEvent::status(
            &ctx.task_id,
            &ctx.context_id,
            TaskStatus::new(TaskState::Completed),
            true,
        ))
        .await?;

        Ok(())
    }
}
