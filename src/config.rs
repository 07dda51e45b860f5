use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::rank::RankingPolicy;
use crate::slack::ChannelRef;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub digest: DigestConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlackConfig {
    /// Bot token; the SLACK_TOKEN environment variable takes precedence.
    #[serde(default)]
    pub bot_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelsConfig {
    /// Channels to look up memories in, digested one after another.
    pub from: Vec<ChannelRef>,
    /// Channel the digests are posted to.
    pub to: ChannelRef,
}

/// Everything the pipeline itself consumes. One immutable value for the
/// whole run.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_messages_per_bucket")]
    pub messages_per_bucket: usize,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub ranking: RankingPolicy,
    /// Print the digest to the console instead of posting it.
    #[serde(default)]
    pub debug: bool,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            messages_per_bucket: default_messages_per_bucket(),
            throttle_ms: default_throttle_ms(),
            timezone: default_timezone(),
            ranking: RankingPolicy::default(),
            debug: false,
        }
    }
}

fn default_start_year() -> i32 {
    2015
}

fn default_messages_per_bucket() -> usize {
    3
}

fn default_throttle_ms() -> u64 {
    100
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

pub async fn init_config_dir() -> Result<()> {
    let base = default_base_dir();
    tokio::fs::create_dir_all(&base).await?;

    let config_path = base.join("config.toml");
    if !config_path.exists() {
        tokio::fs::write(
            &config_path,
            r##"[slack]
# Or export SLACK_TOKEN instead.
# bot_token = "xoxb-YOUR_BOT_TOKEN"

[channels]
to = { id = "C00000000", name = "#memories" }

[[channels.from]]
id = "C11111111"
name = "#general"

[digest]
start_year = 2015
messages_per_bucket = 3
throttle_ms = 100
timezone = "Asia/Tokyo"
# One of: "reactions-then-files", "most-reacted", "most-reacted-chrono"
ranking = "reactions-then-files"
debug = false
"##,
        )
        .await?;
    }

    Ok(())
}

pub fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".omoide")
}

fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let config: Config = toml::from_str(
            r##"
            [slack]
            bot_token = "xoxb-test"

            [channels]
            to = { id = "def", name = "#to" }

            [[channels.from]]
            id = "abc"
            name = "#from"

            [digest]
            start_year = 2014
            messages_per_bucket = 5
            throttle_ms = 300
            timezone = "UTC"
            ranking = "most-reacted"
            debug = true
            "##,
        )
        .expect("config parses");

        assert_eq!(config.slack.bot_token.as_deref(), Some("xoxb-test"));
        assert_eq!(config.channels.from.len(), 1);
        assert_eq!(config.channels.from[0].id, "abc");
        assert_eq!(config.channels.to.name, "#to");
        assert_eq!(config.digest.start_year, 2014);
        assert_eq!(config.digest.messages_per_bucket, 5);
        assert_eq!(config.digest.throttle_ms, 300);
        assert_eq!(config.digest.ranking, RankingPolicy::MostReacted);
        assert!(config.digest.debug);
    }

    #[test]
    fn test_digest_section_is_optional_with_defaults() {
        let config: Config = toml::from_str(
            r##"
            [channels]
            to = { id = "def", name = "#to" }

            [[channels.from]]
            id = "abc"
            name = "#from"
            "##,
        )
        .expect("minimal config parses");

        assert_eq!(config.digest.start_year, 2015);
        assert_eq!(config.digest.messages_per_bucket, 3);
        assert_eq!(config.digest.timezone, "Asia/Tokyo");
        assert_eq!(config.digest.ranking, RankingPolicy::ReactionsThenFiles);
        assert!(!config.digest.debug);
        assert!(config.slack.bot_token.is_none());
    }

    #[test]
    fn test_channels_are_required() {
        assert!(toml::from_str::<Config>("[digest]\nstart_year = 2015\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.omoide/config.toml");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(
            expand_tilde("/etc/omoide.toml"),
            PathBuf::from("/etc/omoide.toml")
        );
    }
}
