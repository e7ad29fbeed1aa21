//! Opportunity records and chat-facing formatting.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::market::types::MarketSnapshot;

/// Cap on opportunities listed in one chat message.
const SUMMARY_CAP: usize = 10;

/// A market whose NO price sits at or below the configured threshold.
///
/// The token id is optional: an unresolved opportunity is still worth
/// alerting on but is never auto-ordered.
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// Best available market identifier.
    pub market_id: Option<String>,
    /// Market question text.
    pub question: String,
    /// Derived NO price; strictly positive and at most the threshold.
    pub no_price: Decimal,
    /// Venue token id for the NO outcome, when resolved.
    pub token_id: Option<String>,
    /// Condition id, kept for order-path resolution.
    pub condition_id: Option<String>,
    /// Market slug, kept for later resolution.
    pub slug: Option<String>,
    /// Event slug, kept for later resolution.
    pub event_slug: Option<String>,
    /// 24h volume.
    pub volume_24h: Decimal,
    /// Public market page URL.
    pub url: Option<String>,
    /// When the opportunity was discovered.
    pub discovered_at: OffsetDateTime,
}

impl Opportunity {
    /// Build an opportunity from a snapshot and its derived NO price.
    pub fn from_snapshot(snapshot: &MarketSnapshot, no_price: Decimal) -> Self {
        Self {
            market_id: snapshot.market_id().map(str::to_string),
            question: snapshot
                .question
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            no_price,
            token_id: None,
            condition_id: snapshot.condition_id.clone(),
            slug: snapshot.slug.clone(),
            event_slug: snapshot.event_slug.clone(),
            volume_24h: snapshot.volume_24h,
            url: snapshot.url(),
            discovered_at: OffsetDateTime::now_utc(),
        }
    }

    /// Identifier shown in chat and used for order-path market lookups.
    pub fn display_id(&self) -> &str {
        self.market_id.as_deref().unwrap_or("n/a")
    }
}

/// Format a capped opportunity summary for one chat message.
pub fn format_opportunities(opportunities: &[Opportunity], threshold: Decimal) -> String {
    if opportunities.is_empty() {
        return "No opportunities found.".to_string();
    }

    let mut text = format!("🔍 *Opportunities Found* (NO ≤ ${:.4})\n\n", threshold);
    for op in opportunities.iter().take(SUMMARY_CAP) {
        text.push_str(&format!(
            "• *{}*\n  NO @ ${:.4} (ID: `{}`)\n",
            op.question, op.no_price, op.display_id()
        ));
        if let Some(url) = &op.url {
            text.push_str(&format!("  [View Market]({})\n", url));
        }
        text.push('\n');
    }

    if opportunities.len() > SUMMARY_CAP {
        text.push_str(&format!(
            "(+{} more opportunities)",
            opportunities.len() - SUMMARY_CAP
        ));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opportunity(question: &str, price: Decimal) -> Opportunity {
        Opportunity {
            market_id: Some("0xabc".to_string()),
            question: question.to_string(),
            no_price: price,
            token_id: None,
            condition_id: Some("0xabc".to_string()),
            slug: Some("slug".to_string()),
            event_slug: None,
            volume_24h: dec!(0),
            url: Some("https://polymarket.com/event/slug".to_string()),
            discovered_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn empty_list_has_fixed_message() {
        assert_eq!(format_opportunities(&[], dec!(0.01)), "No opportunities found.");
    }

    #[test]
    fn summary_includes_question_price_and_url() {
        let text = format_opportunities(&[opportunity("Will X?", dec!(0.004))], dec!(0.01));
        assert!(text.contains("Will X?"));
        assert!(text.contains("$0.0040"));
        assert!(text.contains("View Market"));
        assert!(!text.contains("more opportunities"));
    }

    #[test]
    fn summary_caps_at_ten_and_counts_remainder() {
        let ops: Vec<Opportunity> = (0..14)
            .map(|i| opportunity(&format!("Q{i}"), dec!(0.005)))
            .collect();
        let text = format_opportunities(&ops, dec!(0.01));
        assert!(text.contains("Q9"));
        assert!(!text.contains("Q10"));
        assert!(text.contains("(+4 more opportunities)"));
    }
}
