pub mod card;
pub mod classify;
pub mod dispatch;
pub mod greeting;
pub mod oracle;
pub mod weather;

#[cfg(test)]
pub(crate) mod testkit;

pub use card::{agent_card, AgentCard, AgentCapabilities, AgentSkill};
pub use classify::{RequestClassification, RequestClassifier};
pub use dispatch::{RequestContext, RequestDispatcher};
pub use greeting::GreetingExecutor;
pub use oracle::{LlmAgent, Oracle};
pub use weather::WeatherSearchExecutor;
