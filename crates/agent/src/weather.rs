use std::sync::Arc;
use tracing::info;

use kasa_core::{EventSink, Message, Result, Task, TaskEvent, TaskState, TaskStatus};

use crate::card::AgentSkill;
use crate::dispatch::RequestContext;
use crate::oracle::Oracle;

/// Searches weather information for a date and location.
///
/// Always opens with a submitted task event. Requests missing either field
/// complete immediately with guidance naming exactly the missing pieces and
/// never reach the oracle; full requests emit a working progress event, run
/// one search-enabled oracle call and complete with the summary.
pub struct WeatherSearchExecutor {
    oracle: Arc<dyn Oracle>,
}

impl WeatherSearchExecutor {
    /// `oracle` is expected to have the search tool available.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub fn skill() -> AgentSkill {
        AgentSkill {
            id: "weather-search".to_string(),
            name: "Weather Search".to_string(),
            description: "Searches for weather information for a specific date and location"
                .to_string(),
            tags: vec!["weather".to_string(), "forecast".to_string(), "天気".to_string()],
            examples: vec![
                "今日の大阪の天気は?".to_string(),
                "明日の東京の天気を教えて".to_string(),
            ],
            input_modes: vec!["text".to_string()],
            output_modes: vec!["text".to_string()],
        }
    }

    pub async fn execute(
        &self,
        date: Option<&str>,
        location: Option<&str>,
        ctx: &RequestContext,
        sink: &dyn EventSink,
    ) -> Result<()> {
        sink.append(TaskEvent::task(Task::submitted(&ctx.task_id, &ctx.context_id)))
            .await?;

        let (date, location) = match (date, location) {
            (Some(date), Some(location)) => (date, location),
            _ => {
                let mut missing = Vec::new();
                if date.is_none() {
                    missing.push("日付");
                }
                if location.is_none() {
                    missing.push("地域名");
                }

                let guidance = format!(
                    "天気を検索するには{}を指定してください。例: 「今日の大阪の天気は何ですか」",
                    missing.join("と")
                );

                info!(task_id = %ctx.task_id, missing = ?missing, "Weather request incomplete");

                sink.append(TaskEvent::status(
                    &ctx.task_id,
                    &ctx.context_id,
                    TaskStatus::with_message(
                        TaskState::Completed,
                        Message::agent(&guidance, &ctx.context_id, &ctx.task_id),
                    ),
                    true,
                ))
                .await?;
                return Ok(());
            }
        };

        sink.append(TaskEvent::status(
            &ctx.task_id,
            &ctx.context_id,
            TaskStatus::with_message(
                TaskState::Working,
                Message::agent(
                    &format!("{}の{}の天気を検索します...", date, location),
                    &ctx.context_id,
                    &ctx.task_id,
                ),
            ),
            false,
        ))
        .await?;

        let prompt = format!(
            "You are an assistant that searches for weather information.\n\
             Please use the google_search tool to search for the following weather information.\n\
             \n\
             Make sure to include \"site:weathernews.jp\" in your search query.\n\
             \n\
             Date: {}\n\
             Location: {}\n\
             \n\
             Based on the search results, please provide a concise summary of the weather information.",
            date, location
        );

        let summary = self.oracle.complete(&prompt).await?;

        info!(task_id = %ctx.task_id, summary_len = summary.len(), "Weather search completed");

        sink.append(TaskEvent::status(
            &ctx.task_id,
            &ctx.context_id,
            TaskStatus::with_message(
                TaskState::Completed,
                Message::agent(&summary, &ctx.context_id, &ctx.task_id),
            ),
            true,
        ))
        .await?;

        Ok(())
    }
}
