use chrono::{Datelike, NaiveDate};

use crate::slack::{ChannelRef, RawMessage};
use crate::window;

/// Subtypes that mark synthetic membership events rather than content.
const MEMBERSHIP_SUBTYPES: &[&str] = &[
    "channel_join",
    "channel_leave",
    "group_join",
    "group_leave",
];

/// A provider message reduced to what ranking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub ts: String,
    pub reaction_count: u32,
    pub has_files: bool,
}

/// Selected messages for one elapsed year. Only ever built for years
/// with at least one selection.
#[derive(Debug, Clone)]
pub struct YearBucket {
    pub year: i32,
    pub messages: Vec<Message>,
}

/// The lookup phase's whole result, years most-recent first.
#[derive(Debug, Clone)]
pub struct DigestIndex {
    pub source: ChannelRef,
    pub years: Vec<YearBucket>,
}

/// One year's resolved permalinks, newline-joined. Empty when every
/// lookup in the bucket failed.
#[derive(Debug, Clone)]
pub struct LinkBlock {
    pub year: i32,
    pub links: String,
}

/// Drops membership noise and reduces the rest, preserving provider
/// order.
pub fn normalize(raw: &[RawMessage]) -> Vec<Message> {
    raw.iter()
        .filter(|m| {
            !m.subtype
                .as_deref()
                .is_some_and(|s| MEMBERSHIP_SUBTYPES.contains(&s))
        })
        .map(|m| Message {
            ts: m.ts.clone(),
            reaction_count: m.reactions.iter().flatten().map(|r| r.count).sum(),
            has_files: m.files.as_ref().is_some_and(|f| !f.is_empty()),
        })
        .collect()
}

/// Assembles the ordered segment sequence: title, then per year a
/// separator and its link block, then exactly one of the two closings.
pub fn build_segments(source: &ChannelRef, blocks: &[LinkBlock], today: NaiveDate) -> Vec<String> {
    let mut segments = Vec::with_capacity(blocks.len() * 2 + 2);

    segments.push(format!(
        "⭐️⭐️⭐️ Memories of {} for today ⭐️⭐️⭐️",
        source.name
    ));

    for block in blocks {
        let years_ago = today.year() - block.year;
        let that_day = window::same_day_in_year(today, block.year);
        segments.push(format!(
            "💭 {years_ago} year{} ago, on {}... 💭",
            if years_ago > 1 { "s" } else { "" },
            that_day.format("%Y/%m/%d"),
        ));
        segments.push(block.links.clone());
    }

    segments.push(if blocks.is_empty() {
        "😭 Alas I couldn't find any. Come back tomorrow! 😭".to_string()
    } else {
        "👋 And that's it for today! See you again tomorrow! 👋".to_string()
    });

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::Reaction;

    fn raw(ts: &str) -> RawMessage {
        RawMessage {
            ts: ts.to_string(),
            reactions: None,
            files: None,
            subtype: None,
        }
    }

    fn channel(name: &str) -> ChannelRef {
        ChannelRef {
            id: "C123".to_string(),
            name: name.to_string(),
        }
    }

    fn jan_first_2023() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date")
    }

    #[test]
    fn test_normalize_without_reactions_counts_zero() {
        let messages = normalize(&[raw("1")]);
        assert_eq!(
            messages,
            vec![Message {
                ts: "1".to_string(),
                reaction_count: 0,
                has_files: false,
            }]
        );
    }

    #[test]
    fn test_normalize_sums_reaction_counts() {
        let mut m = raw("1");
        m.reactions = Some(vec![Reaction { count: 1 }, Reaction { count: 2 }]);
        assert_eq!(normalize(&[m])[0].reaction_count, 3);
    }

    #[test]
    fn test_normalize_detects_attachments() {
        let mut with = raw("1");
        with.files = Some(vec![serde_json::json!({"id": "F1"})]);
        let mut without = raw("2");
        without.files = Some(vec![]);

        let messages = normalize(&[with, without]);
        assert!(messages[0].has_files);
        assert!(!messages[1].has_files);
    }

    #[test]
    fn test_normalize_drops_membership_events() {
        let mut join = raw("1");
        join.subtype = Some("channel_join".to_string());
        let mut leave = raw("2");
        leave.subtype = Some("group_leave".to_string());
        let mut edited = raw("3");
        edited.subtype = Some("message_changed".to_string());

        let messages = normalize(&[join, leave, edited, raw("4")]);
        let kept: Vec<&str> = messages.iter().map(|m| m.ts.as_str()).collect();
        assert_eq!(kept, vec!["3", "4"]);
    }

    #[test]
    fn test_segments_wrap_each_year_block() {
        let blocks = vec![
            LinkBlock {
                year: 2018,
                links: "link200\nlink100".to_string(),
            },
            LinkBlock {
                year: 2016,
                links: "link4".to_string(),
            },
        ];
        let segments = build_segments(&channel("#from"), &blocks, jan_first_2023());

        assert_eq!(
            segments,
            vec![
                "⭐️⭐️⭐️ Memories of #from for today ⭐️⭐️⭐️".to_string(),
                "💭 5 years ago, on 2018/01/01... 💭".to_string(),
                "link200\nlink100".to_string(),
                "💭 7 years ago, on 2016/01/01... 💭".to_string(),
                "link4".to_string(),
                "👋 And that's it for today! See you again tomorrow! 👋".to_string(),
            ]
        );
    }

    #[test]
    fn test_single_year_ago_is_not_pluralized() {
        let blocks = vec![LinkBlock {
            year: 2022,
            links: "link1".to_string(),
        }];
        let segments = build_segments(&channel("#from"), &blocks, jan_first_2023());
        assert_eq!(segments[1], "💭 1 year ago, on 2022/01/01... 💭");
    }

    #[test]
    fn test_no_blocks_yields_title_and_nothing_found() {
        let segments = build_segments(&channel("#from"), &[], jan_first_2023());
        assert_eq!(
            segments,
            vec![
                "⭐️⭐️⭐️ Memories of #from for today ⭐️⭐️⭐️".to_string(),
                "😭 Alas I couldn't find any. Come back tomorrow! 😭".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_link_block_still_occupies_a_slot() {
        let blocks = vec![LinkBlock {
            year: 2020,
            links: String::new(),
        }];
        let segments = build_segments(&channel("#from"), &blocks, jan_first_2023());
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[2], "");
        assert_eq!(
            segments[3],
            "👋 And that's it for today! See you again tomorrow! 👋"
        );
    }
}
