use std::sync::Arc;

use kasa_agent::{RequestContext, RequestDispatcher};
use kasa_core::{ChannelSink, TaskEvent, TaskState};

/// One-shot dispatch: send a message, print the event stream to stdout.
pub async fn run(message: &str, context: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let dispatcher = Arc::new(RequestDispatcher::from_config(&config)?);

    let ctx = RequestContext::fresh(context);
    let (sink, mut rx) = ChannelSink::pair(32);

    let handle = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let ctx = ctx.clone();
        let message = message.to_string();
        async move { dispatcher.dispatch(&message, &ctx, &sink).await }
    });

    while let Some(event) = rx.recv().await {
        if let Some(msg) = event.attached_message() {
            println!("{}", msg.text());
        }

        if event.is_final() {
            match &event {
                TaskEvent::StatusUpdate(u) if u.status.state == TaskState::Failed => {
                    println!("\nTask failed");
                }
                _ => println!("\nTask completed"),
            }
        }
    }

    handle.await??;
    Ok(())
}
