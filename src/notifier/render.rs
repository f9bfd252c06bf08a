//! Message rendering for alerts and status reports

use serde::{Deserialize, Serialize};

use crate::alerts::{Alert, AlertKind};
use crate::chain::format_address;
use crate::models::ValidatorSnapshot;

const COLOR_GREEN: u32 = 0x00FF00;
const COLOR_RED: u32 = 0xFF0000;
const COLOR_ORANGE: u32 = 0xFFA500;
const COLOR_GREY: u32 = 0x808080;
const COLOR_BLUE: u32 = 0x00BFFF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Transport-neutral rich message (maps onto a Discord embed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<MessageField>,
}

impl AlertMessage {
    fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            fields: Vec::new(),
        }
    }

    fn field(mut self, name: &str, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(MessageField {
            name: name.to_string(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Plain-text rendering for logs and terminals
    pub fn to_plain_text(&self) -> String {
        let mut lines = vec![self.title.clone()];
        if !self.description.is_empty() {
            lines.push(self.description.replace("**", ""));
        }
        for field in &self.fields {
            lines.push(format!("  {}: {}", field.name, field.value));
        }
        lines.join("\n")
    }
}

fn percent(value: f64) -> String {
    format!("{}%", value)
}

/// Render a fired alert
pub fn render_alert(alert: &Alert) -> AlertMessage {
    let short = format_address(&alert.address);
    let era = alert.era.to_string();
    let performance = format!("{}%", alert.era_points.performance_label());

    match &alert.kind {
        AlertKind::Joined => AlertMessage::new(
            "🆕 New Validator",
            format!("**{}** joined the active set", short),
            COLOR_GREEN,
        )
        .field("Era", era, true)
        .field("Initial Commission", percent(alert.commission), true)
        .field("Performance", performance, true),

        AlertKind::Rejoined => AlertMessage::new(
            "🔁 Validator Rejoined",
            format!("**{}** is back in the active set", short),
            COLOR_BLUE,
        )
        .field("Era", era, true)
        .field("Commission", percent(alert.commission), true)
        .field("Performance", performance, true),

        AlertKind::Slashed => {
            let (span_index, last_slash, prior) = match &alert.slashing {
                Some(info) => (
                    info.span_index.to_string(),
                    info.last_nonzero_slash.to_string(),
                    info.prior_label(),
                ),
                None => ("unknown".into(), "unknown".into(), "unknown".into()),
            };
            AlertMessage::new(
                "⚡ Validator Slashed",
                format!("**{}** has been slashed", short),
                COLOR_RED,
            )
            .field("Span Index", span_index, true)
            .field("Last Non-zero Slash", last_slash, true)
            .field("Prior Spans", prior, false)
        }

        AlertKind::Inactivity { threshold } => AlertMessage::new(
            format!("🚨 Inactivity Threshold ({}%)", threshold),
            format!("**{}** fell below {}% of era points", short, threshold),
            COLOR_ORANGE,
        )
        .field("Current Performance", performance, true)
        .field("Era", era, true),

        AlertKind::Removed => AlertMessage::new(
            "🚫 Validator Removed",
            format!("**{}** left the active set", short),
            COLOR_GREY,
        )
        .field("Final Performance", performance, true)
        .field("Last Era", era, true),
    }
}

/// Render the on-demand status report for one validator
pub fn render_status(snapshot: &ValidatorSnapshot, active: bool) -> AlertMessage {
    let identity = snapshot
        .identity
        .as_ref()
        .map(|identity| identity.label().to_string())
        .unwrap_or_else(|| "No Identity Set".to_string());

    let mut message = AlertMessage::new(
        format!(
            "📊 Validator Status - {}",
            format_address(&snapshot.address)
        ),
        String::new(),
        if active { COLOR_GREEN } else { COLOR_RED },
    )
    .field(
        "Status",
        if active { "🟢 Active" } else { "🔴 Inactive" },
        true,
    )
    .field("Commission", percent(snapshot.commission), true)
    .field(
        "Last Era Performance",
        format!("{}%", snapshot.era_points.performance_label()),
        true,
    )
    .field(
        "Total Last Era Points",
        snapshot.era_points.total.to_string(),
        true,
    )
    .field(
        "Validator Points Last Era",
        snapshot.era_points.validator_share.to_string(),
        true,
    )
    .field("Identity", identity, false);

    if let Some(info) = &snapshot.slashing {
        message = message
            .field("Last Slash Era", info.last_nonzero_slash.to_string(), true)
            .field("Slash Spans", info.prior_label(), true);
    }

    message
}

/// Mention line sent ahead of an alert when the validator has followers
pub fn mention_text(address: &str, subscribers: &[String]) -> String {
    let mentions = subscribers
        .iter()
        .map(|id| format!("<@{}>", id))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "🔔 **Validator Alert** for {}:\n{}",
        format_address(address),
        mentions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EraPoints, IdentityInfo, SlashingInfo};
    use chrono::{TimeZone, Utc};

    const ADDRESS: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    fn alert(kind: AlertKind) -> Alert {
        Alert::new(kind, ADDRESS, 120, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .with_status(5.0, EraPoints::new(1000, 50))
    }

    fn field<'a>(message: &'a AlertMessage, name: &str) -> Option<&'a str> {
        message
            .fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn join_alert_lists_era_commission_and_performance() {
        let message = render_alert(&alert(AlertKind::Joined));
        assert_eq!(message.title, "🆕 New Validator");
        assert!(message.description.contains("5GrwvaEF...utQY"));
        assert_eq!(field(&message, "Era"), Some("120"));
        assert_eq!(field(&message, "Initial Commission"), Some("5%"));
        assert_eq!(field(&message, "Performance"), Some("5.00%"));
    }

    #[test]
    fn slash_alert_includes_span_details() {
        let message = render_alert(&alert(AlertKind::Slashed).with_slashing(Some(SlashingInfo {
            span_index: 3,
            last_start: 100,
            last_nonzero_slash: 99,
            prior: vec![12, 40],
        })));
        assert_eq!(message.color, COLOR_RED);
        assert_eq!(field(&message, "Span Index"), Some("3"));
        assert_eq!(field(&message, "Last Non-zero Slash"), Some("99"));
        assert_eq!(field(&message, "Prior Spans"), Some("12, 40"));
    }

    #[test]
    fn inactivity_alert_names_threshold() {
        let message = render_alert(&alert(AlertKind::Inactivity { threshold: 25 }));
        assert_eq!(message.title, "🚨 Inactivity Threshold (25%)");
        assert_eq!(field(&message, "Current Performance"), Some("5.00%"));
    }

    #[test]
    fn status_shows_identity_and_slash_fields() {
        let snapshot = ValidatorSnapshot {
            address: ADDRESS.to_string(),
            identity: Some(IdentityInfo {
                display: Some("Alice".to_string()),
                parent: None,
            }),
            slashing: Some(SlashingInfo {
                span_index: 1,
                last_start: 5,
                last_nonzero_slash: 5,
                prior: vec![],
            }),
            commission: 10.0,
            era_points: EraPoints::new(0, 0),
        };
        let message = render_status(&snapshot, false);
        assert_eq!(field(&message, "Status"), Some("🔴 Inactive"));
        assert_eq!(field(&message, "Identity"), Some("Alice"));
        assert_eq!(field(&message, "Last Era Performance"), Some("N/A%"));
        assert_eq!(field(&message, "Last Slash Era"), Some("5"));
    }

    #[test]
    fn status_without_identity_says_so() {
        let snapshot = ValidatorSnapshot {
            address: ADDRESS.to_string(),
            identity: None,
            slashing: None,
            commission: 1.5,
            era_points: EraPoints::new(10, 5),
        };
        let message = render_status(&snapshot, true);
        assert_eq!(field(&message, "Identity"), Some("No Identity Set"));
        assert!(field(&message, "Last Slash Era").is_none());
    }

    #[test]
    fn mention_text_tags_every_subscriber() {
        let text = mention_text(ADDRESS, &["111".to_string(), "222".to_string()]);
        assert!(text.starts_with("🔔 **Validator Alert** for 5GrwvaEF...utQY:"));
        assert!(text.ends_with("<@111> <@222>"));
    }

    #[test]
    fn plain_text_strips_markdown_emphasis() {
        let text = render_alert(&alert(AlertKind::Removed)).to_plain_text();
        assert!(text.contains("5GrwvaEF...utQY left the active set"));
        assert!(text.contains("  Last Era: 120"));
    }
}
