use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use futures::future::join_all;

use crate::config::DigestConfig;
use crate::deliver::{self, ChannelSink, ConsoleSink, Sink};
use crate::digest::{self, DigestIndex, LinkBlock, Message, YearBucket};
use crate::rank;
use crate::slack::{ChannelRef, ChatService};
use crate::window;

/// Looks back over prior years for the most popular messages posted on
/// the same calendar day and reposts links to them.
pub struct MemoriesBot {
    service: Arc<dyn ChatService>,
    settings: DigestConfig,
    tz: Tz,
}

impl MemoriesBot {
    pub fn new(service: Arc<dyn ChatService>, settings: DigestConfig) -> Result<Self> {
        let tz: Tz = settings
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {:?}: {e}", settings.timezone))?;
        Ok(Self {
            service,
            settings,
            tz,
        })
    }

    /// One full digest run: lookup, build, deliver. Fails only on an
    /// empty channel ID or a failed history query; everything else is
    /// logged and absorbed.
    pub async fn run(
        &self,
        source: &ChannelRef,
        destination: &ChannelRef,
        date: NaiveDate,
    ) -> Result<()> {
        if source.id.is_empty() {
            anyhow::bail!("Source channel ID cannot be an empty string");
        }
        if destination.id.is_empty() {
            anyhow::bail!("Target channel ID cannot be an empty string");
        }

        let index = self.fetch_past_popular_messages(source, date).await?;
        let segments = self.build_digest(&index, date).await;
        self.post(destination, &segments).await;
        Ok(())
    }

    /// Queries each elapsed year's window in turn, newest first. Any
    /// failed query aborts the whole lookup; the rankings must come from
    /// complete per-year data.
    async fn fetch_past_popular_messages(
        &self,
        source: &ChannelRef,
        today: NaiveDate,
    ) -> Result<DigestIndex> {
        let mut years = Vec::new();

        for window in window::year_windows(today, self.settings.start_year, self.tz) {
            tracing::info!(
                "Looking up popular messages from {} on {}",
                source.name,
                window.start.format("%Y/%m/%d"),
            );

            let oldest = window.start.timestamp().to_string();
            let latest = (window.end.timestamp() - 1).to_string();
            // TODO: retry on error
            let raw = self
                .service
                .fetch_history(&source.id, &oldest, &latest)
                .await?;

            let popular = rank::select(
                self.settings.ranking,
                &digest::normalize(&raw),
                self.settings.messages_per_bucket,
            );

            if popular.is_empty() {
                tracing::info!(" ... none");
            } else {
                tracing::info!(" ... {} message(s)", popular.len());
                years.push(YearBucket {
                    year: window.year,
                    messages: popular,
                });
            }
        }

        Ok(DigestIndex {
            source: source.clone(),
            years,
        })
    }

    /// Resolves each bucket's permalinks and assembles the segment
    /// sequence. Resolution failures only cost their own line.
    async fn build_digest(&self, index: &DigestIndex, today: NaiveDate) -> Vec<String> {
        let mut blocks = Vec::with_capacity(index.years.len());
        for bucket in &index.years {
            let links = self.resolve_links(&index.source, &bucket.messages).await;
            blocks.push(LinkBlock {
                year: bucket.year,
                links,
            });
        }
        digest::build_segments(&index.source, &blocks, today)
    }

    /// Fans out one permalink request per message and joins them all;
    /// output lines keep selection order, not completion order.
    async fn resolve_links(&self, channel: &ChannelRef, messages: &[Message]) -> String {
        let lookups = messages
            .iter()
            .map(|m| self.service.resolve_permalink(&channel.id, &m.ts));
        let results = join_all(lookups).await;

        let mut links = Vec::with_capacity(messages.len());
        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(permalink) if !permalink.is_empty() => links.push(permalink),
                // Permalinks can come back empty even for messages the
                // history query just confirmed; treat it as a miss.
                Ok(_) => tracing::error!(
                    "Empty permalink for message {}, skipped",
                    message.ts
                ),
                // TODO: retry on error
                Err(e) => tracing::error!(
                    "Failed to get permalink for message {}, skipped. Reason: {e:#}",
                    message.ts
                ),
            }
        }
        links.join("\n")
    }

    async fn post(&self, destination: &ChannelRef, segments: &[String]) {
        let sink: Box<dyn Sink> = if self.settings.debug {
            Box::new(ConsoleSink)
        } else {
            Box::new(ChannelSink::new(self.service.clone(), destination.clone()))
        };

        tracing::info!("Posting to {}...", sink.name());
        tracing::debug!("Preview:\n\n{}", segments.join("\n"));

        deliver::deliver(
            &*sink,
            segments,
            Duration::from_millis(self.settings.throttle_ms),
        )
        .await;

        tracing::info!("Done");
    }
}
