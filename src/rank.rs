use std::cmp::Reverse;

use serde::Deserialize;

use crate::digest::Message;

/// Selection policy for one year's bucket. The three variants track how
/// the ranking evolved; they are not interchangeable, so the active one
/// is picked by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingPolicy {
    /// Reaction count ranks reacted messages, attachments break the
    /// rough ties between equally-interesting groups; zero-reaction
    /// messages fill any remaining slots, attachments first.
    #[default]
    ReactionsThenFiles,
    /// Reacted messages only, by reaction count.
    MostReacted,
    /// As `MostReacted`, but the kept subset is reordered
    /// chronologically for display.
    MostReactedChrono,
}

/// Orders `messages` under `policy` and keeps the first `limit`. Stable
/// throughout: ties keep their provider order.
pub fn select(policy: RankingPolicy, messages: &[Message], limit: usize) -> Vec<Message> {
    let mut selected = match policy {
        RankingPolicy::ReactionsThenFiles => reactions_then_files(messages),
        RankingPolicy::MostReacted | RankingPolicy::MostReactedChrono => most_reacted(messages),
    };
    selected.truncate(limit);

    if policy == RankingPolicy::MostReactedChrono {
        // ts is a string-encoded epoch, comparable as-is
        selected.sort_by(|a, b| a.ts.cmp(&b.ts));
    }
    selected
}

fn most_reacted(messages: &[Message]) -> Vec<Message> {
    let mut reacted: Vec<Message> = messages
        .iter()
        .filter(|m| m.reaction_count > 0)
        .cloned()
        .collect();
    reacted.sort_by_key(|m| Reverse(m.reaction_count));
    reacted
}

fn reactions_then_files(messages: &[Message]) -> Vec<Message> {
    let (reacted, unreacted): (Vec<Message>, Vec<Message>) = messages
        .iter()
        .cloned()
        .partition(|m| m.reaction_count > 0);

    let mut ordered = Vec::with_capacity(messages.len());
    for has_files in [true, false] {
        let mut group: Vec<Message> = reacted
            .iter()
            .filter(|m| m.has_files == has_files)
            .cloned()
            .collect();
        group.sort_by_key(|m| Reverse(m.reaction_count));
        ordered.extend(group);
    }
    for has_files in [true, false] {
        ordered.extend(
            unreacted
                .iter()
                .filter(|m| m.has_files == has_files)
                .cloned(),
        );
    }
    ordered
}
