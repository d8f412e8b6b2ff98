use std::sync::Arc;
use tracing::{info, warn};

use kasa_core::{Config, EventSink, Message, Result, Task, TaskEvent, TaskState, TaskStatus};
use kasa_providers::create_provider;

use crate::classify::{RequestClassification, RequestClassifier};
use crate::greeting::GreetingExecutor;
use crate::oracle::LlmAgent;
use crate::weather::WeatherSearchExecutor;

/// Identifiers of one request's execution. The task id is unique per
/// request; the context id is stable across a conversation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
}

impl RequestContext {
    pub fn new(task_id: &str, context_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
        }
    }

    /// Fresh task id; context id supplied by the caller or generated.
    pub fn fresh(context_id: Option<&str>) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            context_id: context_id
                .map(|c| c.to_string())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }
}

const FALLBACK_GUIDANCE: &str = "このエージェントは挨拶と天気の検索に対応しています。\
挨拶をするか、「今日の大阪の天気は何ですか」のように天気について質問してください。";

/// Classifies an incoming request and routes it to the matching executor,
/// owning the task lifecycle. Side effects flow only through the sink.
pub struct RequestDispatcher {
    classifier: RequestClassifier,
    greeting: GreetingExecutor,
    weather: WeatherSearchExecutor,
}

impl RequestDispatcher {
    pub fn new(
        classifier: RequestClassifier,
        greeting: GreetingExecutor,
        weather: WeatherSearchExecutor,
    ) -> Self {
        Self {
            classifier,
            greeting,
            weather,
        }
    }

    /// Wire up the production dispatcher: one plain agent for
    /// classification and greetings, one search-enabled agent for weather.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = create_provider(config)?;
        let plain = Arc::new(LlmAgent::without_tools(provider.clone(), config));
        let search = Arc::new(LlmAgent::with_google_search(provider, config));

        Ok(Self::new(
            RequestClassifier::new(plain.clone()),
            GreetingExecutor::new(plain),
            WeatherSearchExecutor::new(search),
        ))
    }

    pub async fn dispatch(
        &self,
        request: &str,
        ctx: &RequestContext,
        sink: &dyn EventSink,
    ) -> Result<()> {
        let classification = self.classifier.classify(request).await;

        info!(
            task_id = %ctx.task_id,
            context_id = %ctx.context_id,
            kind = classification.kind(),
            "Request classified"
        );

        let outcome = match &classification {
            RequestClassification::Greeting { message } => {
                self.greeting.execute(message, ctx, sink).await
            }
            RequestClassification::WeatherSearch { date, location } => {
                self.weather
                    .execute(date.as_deref(), location.as_deref(), ctx, sink)
                    .await
            }
            RequestClassification::Other => self.handle_other(ctx, sink).await,
        };

        if let Err(e) = outcome {
            warn!(
                task_id = %ctx.task_id,
                kind = classification.kind(),
                error = %e,
                "Executor failed, closing task as failed"
            );
            let note = Message::agent(
                &format!("リクエストの処理中にエラーが発生しました: {}", e),
                &ctx.context_id,
                &ctx.task_id,
            );
            sink.append(TaskEvent::status(
                &ctx.task_id,
                &ctx.context_id,
                TaskStatus::with_message(TaskState::Failed, note),
                true,
            ))
            .await?;
        }

        Ok(())
    }

    /// Fixed response for anything outside the supported intents.
    async fn handle_other(&self, ctx: &RequestContext, sink: &dyn EventSink) -> Result<()> {
        sink.append(TaskEvent::task(Task::submitted(&ctx.task_id, &ctx.context_id)))
            .await?;

        sink.append(TaskEvent::status(
            &ctx.task_id,
            &ctx.context_id,
            TaskStatus::with_message(
                TaskState::Completed,
                Message::agent(FALLBACK_GUIDANCE, &ctx.context_id, &ctx.task_id),
            ),
            true,
        ))
        .await?;

        Ok(())
    }
}
