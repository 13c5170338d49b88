//! # Notice Module
//!
//! Renders the takedown message stored alongside each detection. The text
//! is composed once at detection time so the record shows exactly what
//! would be (or was) sent, even if the template changes later.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rendered takedown message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

/// Notice rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Hours the seller is given to remove the listing
    pub deadline_hours: i64,
    /// Whether the body mentions escalation to the marketplace
    pub mention_next_steps: bool,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            deadline_hours: 24,
            mention_next_steps: true,
        }
    }
}

/// Compose the takedown notice for one infringing listing
pub fn compose_notice(
    infringing_item_id: &str,
    your_item_url: &str,
    config: &NoticeConfig,
) -> Notice {
    compose_notice_at(Utc::now(), infringing_item_id, your_item_url, config)
}

fn compose_notice_at(
    now: DateTime<Utc>,
    infringing_item_id: &str,
    your_item_url: &str,
    config: &NoticeConfig,
) -> Notice {
    let deadline = now + Duration::hours(config.deadline_hours);
    let deadline_text = deadline.format("%Y-%m-%d %H:%M UTC");

    let subject = format!(
        "Unauthorized use of my product photos in listing {infringing_item_id}"
    );

    let mut body = format!(
        "Hello,\n\n\
         Your listing {infringing_item_id} uses one or more photos taken from my \
         listing:\n{your_item_url}\n\n\
         These photos are my own work and you do not have permission to use \
         them. Please remove the listing or replace the photos with your own \
         by {deadline_text}."
    );
    if config.mention_next_steps {
        body.push_str(
            "\n\nIf the photos are still in use after that time, I will report \
             the listing to the marketplace and pursue the matter further.",
        );
    }
    body.push_str("\n\nRegards");

    Notice { subject, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, 10, 0, 0).unwrap()
    }

    #[test]
    fn subject_names_the_infringing_listing() {
        let notice = compose_notice_at(
            fixed_now(),
            "item-42",
            "https://market.example.com/itm/mine",
            &NoticeConfig::default(),
        );
        assert!(notice.subject.contains("item-42"));
    }

    #[test]
    fn body_contains_deadline_and_source_url() {
        let notice = compose_notice_at(
            fixed_now(),
            "item-42",
            "https://market.example.com/itm/mine",
            &NoticeConfig::default(),
        );
        assert!(notice.body.contains("2026-08-31 10:00 UTC"));
        assert!(notice.body.contains("https://market.example.com/itm/mine"));
    }

    #[test]
    fn next_steps_paragraph_is_optional() {
        let config = NoticeConfig {
            deadline_hours: 48,
            mention_next_steps: false,
        };
        let notice = compose_notice_at(fixed_now(), "item-42", "url", &config);
        assert!(!notice.body.contains("report the listing"));
        assert!(notice.body.contains("2026-09-01 10:00 UTC"));
    }
}
