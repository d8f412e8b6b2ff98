//! Shared test doubles for the agent crate.

use async_trait::async_trait;
use kasa_core::{Error, EventSink, Result, TaskEvent};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::oracle::Oracle;

/// Oracle that replays a fixed script of responses and records every
/// prompt it was asked to complete.
pub(crate) struct ScriptedOracle {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn replying(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(
                responses.iter().map(|r| Ok(r.to_string())).collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(error.to_string())])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(Error::Provider(error)),
            None => Err(Error::Provider("no scripted response left".to_string())),
        }
    }
}

/// Sink that records appended events in order.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<TaskEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn append(&self, event: TaskEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Assert the single-final invariant: exactly one final event, in last
/// position.
pub(crate) fn assert_single_final(events: &[TaskEvent]) {
    let finals = events.iter().filter(|e| e.is_final()).count();
    assert_eq!(finals, 1, "expected exactly one final event, got {}", finals);
    assert!(
        events.last().map(TaskEvent::is_final).unwrap_or(false),
        "final event must be the last event"
    );
}
