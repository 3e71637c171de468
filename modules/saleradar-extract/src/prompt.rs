use saleradar_common::constants::{EXTRACTION_BODY_TRUNCATE_CHARS, EXTRACTION_MAX_TOP_LINKS};

/// Instructions sent with every extraction request. Confidence bands and
/// the is_promo_email heuristics are deliberately explicit rather than
/// left to the model's judgment — the thresholds are also used client-side
/// to decide whether a promo needs a second look (`sources debug`).
pub const SYSTEM_PROMPT: &str = r#"You extract promotional offers from retail and travel marketing emails.

Classify the message as a promo email (is_promo_email) if it advertises a
discount, sale, coupon code, or a flight/travel fare. Newsletters,
shipping notifications, and "new arrivals" announcements with no discount
are NOT promo emails.

For each offer found, extract:
- headline: the offer's main text, verbatim
- code: a coupon/promo code if present
- landing_url: the URL the offer points to
- percent_off / amount_off: numeric discount if stated
- discount_text: free-text discount description when no numeric value exists
- vertical: "flight", "retail", or "other"
- starts_at / ends_at: ISO 8601 timestamps if the offer states a window
- flight: { origins, region, price_usd } when vertical is "flight"

Confidence scoring:
- 0.8+: explicit code or numeric discount with clear terms
- 0.5-0.8: discount implied but terms are vague
- <0.5: likely not a real offer; omit it

Return strict JSON matching the ExtractionResult schema."#;

/// Truncates the message body and appends up to
/// `EXTRACTION_MAX_TOP_LINKS` links, producing the text actually sent to
/// the model alongside `SYSTEM_PROMPT`.
pub fn format_email_for_extraction(subject: Option<&str>, body: &str, top_links: &[String]) -> String {
    let mut truncated: String = body.chars().take(EXTRACTION_BODY_TRUNCATE_CHARS).collect();
    if body.chars().count() > EXTRACTION_BODY_TRUNCATE_CHARS {
        truncated.push_str("\n[TRUNCATED]");
    }

    let mut out = String::new();
    if let Some(subject) = subject {
        out.push_str("Subject: ");
        out.push_str(subject);
        out.push('\n');
    }
    out.push_str(&truncated);

    if !top_links.is_empty() {
        out.push_str("\n\nLinks:\n");
        for link in top_links.iter().take(EXTRACTION_MAX_TOP_LINKS) {
            out.push_str("- ");
            out.push_str(link);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_body() {
        let body = "a".repeat(EXTRACTION_BODY_TRUNCATE_CHARS + 500);
        let formatted = format_email_for_extraction(None, &body, &[]);
        assert!(formatted.contains("[TRUNCATED]"));
    }

    #[test]
    fn short_body_is_not_truncated() {
        let formatted = format_email_for_extraction(Some("Sale!"), "short body", &[]);
        assert!(!formatted.contains("[TRUNCATED]"));
        assert!(formatted.contains("Subject: Sale!"));
    }

    #[test]
    fn caps_links_at_max() {
        let links: Vec<String> = (0..10).map(|i| format!("https://example.com/{i}")).collect();
        let formatted = format_email_for_extraction(None, "body", &links);
        let link_lines = formatted.lines().filter(|l| l.starts_with("- ")).count();
        assert_eq!(link_lines, EXTRACTION_MAX_TOP_LINKS);
    }
}
