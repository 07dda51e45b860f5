use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::slack::{ChannelRef, ChatService};

/// Where digest segments end up. The pipeline only ever holds one sink;
/// which one is a configuration concern.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Destination label for logs.
    fn name(&self) -> &str;
    async fn send(&self, text: &str) -> Result<()>;
}

/// Posts segments to a live channel.
pub struct ChannelSink {
    service: Arc<dyn ChatService>,
    channel: ChannelRef,
}

impl ChannelSink {
    pub fn new(service: Arc<dyn ChatService>, channel: ChannelRef) -> Self {
        Self { service, channel }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    fn name(&self) -> &str {
        &self.channel.name
    }

    async fn send(&self, text: &str) -> Result<()> {
        self.service.post_message(&self.channel.id, text).await
    }
}

/// Prints segments instead of posting them; backs debug/preview mode.
pub struct ConsoleSink;

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// Attempts every segment exactly once, strictly in order. A failed
/// segment is logged and skipped; the throttle after each attempt keeps
/// the sink under its rate limit.
pub async fn deliver(sink: &dyn Sink, segments: &[String], throttle: Duration) {
    for segment in segments {
        if let Err(e) = sink.send(segment).await {
            // TODO: retry on error
            tracing::error!(
                "Failed to post to channel {}, skipped. {e:#}\nMessage: {segment}",
                sink.name(),
            );
        }
        tokio::time::sleep(throttle).await;
    }
}
