//! Digest HTML rendering and the notification fan-out contract.

use async_trait::async_trait;
use std::fmt::Write as _;

use crate::digest_selector::{DigestBadge, DigestItem};

pub struct RenderedDigest {
    pub html: String,
    pub item_count: usize,
}

/// Renders a flat, self-contained HTML page with one section per badge.
/// Items are assumed to already be sorted NEW, then UPDATED, then ACTIVE
/// (`DigestSelector::select` guarantees this).
pub fn render(items: &[DigestItem]) -> RenderedDigest {
    let mut html = String::new();
    html.push_str("<html><body>\n<h1>Promo Digest</h1>\n");

    for badge in [DigestBadge::New, DigestBadge::Updated, DigestBadge::Active] {
        let section: Vec<&DigestItem> = items.iter().filter(|i| i.badge == badge).collect();
        if section.is_empty() {
            continue;
        }
        let _ = writeln!(html, "<h2>{}</h2>\n<ul>", badge_label(badge));
        for item in section {
            let _ = writeln!(
                html,
                "<li><strong>{}</strong>{}</li>",
                html_escape(&item.promo.headline),
                code_suffix(item.promo.code.as_deref()),
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body></html>\n");

    RenderedDigest {
        html,
        item_count: items.len(),
    }
}

fn badge_label(badge: DigestBadge) -> &'static str {
    match badge {
        DigestBadge::New => "New",
        DigestBadge::Updated => "Updated",
        DigestBadge::Active => "Active",
    }
}

fn code_suffix(code: Option<&str>) -> String {
    match code {
        Some(code) => format!(" — code <code>{}</code>", html_escape(code)),
        None => String::new(),
    }
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A delivery backend for a rendered digest.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, digest: &RenderedDigest) -> anyhow::Result<()>;
}

/// Logs the digest rather than delivering it anywhere — stands in for a
/// desktop-notification backend, which is out of scope.
pub struct DesktopChannel;

#[async_trait]
impl NotificationChannel for DesktopChannel {
    fn name(&self) -> &'static str {
        "desktop"
    }

    async fn send(&self, digest: &RenderedDigest) -> anyhow::Result<()> {
        tracing::info!(item_count = digest.item_count, "digest ready (desktop)");
        Ok(())
    }
}

/// Posts the rendered digest to a chat webhook.
pub struct ChatChannel {
    http: reqwest::Client,
    webhook_url: String,
}

impl ChatChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationChannel for ChatChannel {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn send(&self, digest: &RenderedDigest) -> anyhow::Result<()> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "text": format!("{} new digest items", digest.item_count) }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("chat webhook returned {}", response.status());
        }
        Ok(())
    }
}

/// Email delivery is explicitly out of scope (no SMTP/OAuth wiring); this
/// stub exists so the fan-out logic — "any channel succeeding is enough"
/// — is exercised honestly rather than special-cased in tests.
pub struct EmailChannel;

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, _digest: &RenderedDigest) -> anyhow::Result<()> {
        anyhow::bail!("email delivery is not configured")
    }
}

/// Sends to every channel and returns `true` if at least one succeeded.
pub async fn fan_out(channels: &[Box<dyn NotificationChannel>], digest: &RenderedDigest) -> bool {
    let mut any_succeeded = false;
    for channel in channels {
        match channel.send(digest).await {
            Ok(()) => {
                tracing::info!(channel = channel.name(), "digest delivered");
                any_succeeded = true;
            }
            Err(e) => {
                tracing::warn!(channel = channel.name(), error = %e, "digest delivery failed");
            }
        }
    }
    any_succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use saleradar_common::domain::{Promo, PromoStatus, PromoVertical};
    use uuid::Uuid;

    fn promo(headline: &str) -> Promo {
        let now = chrono::Utc::now();
        Promo {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            base_key: format!("head:{headline}"),
            headline: headline.to_string(),
            code: None,
            landing_url: None,
            percent_off: None,
            amount_off: None,
            discount_text: None,
            vertical: PromoVertical::Retail,
            starts_at: None,
            ends_at: None,
            status: PromoStatus::Active,
            first_seen_at: now,
            last_seen_at: now,
            last_notified_at: None,
        }
    }

    #[test]
    fn render_groups_by_badge() {
        let items = vec![
            DigestItem {
                promo: promo("New Deal"),
                badge: DigestBadge::New,
            },
            DigestItem {
                promo: promo("Old Deal"),
                badge: DigestBadge::Active,
            },
        ];
        let rendered = render(&items);
        assert!(rendered.html.contains("New"));
        assert!(rendered.html.contains("New Deal"));
        assert!(rendered.html.contains("Active"));
        assert_eq!(rendered.item_count, 2);
    }

    #[test]
    fn render_escapes_headline() {
        let items = vec![DigestItem {
            promo: promo("<script>alert(1)</script>"),
            badge: DigestBadge::New,
        }];
        let rendered = render(&items);
        assert!(!rendered.html.contains("<script>"));
    }

    #[tokio::test]
    async fn fan_out_succeeds_if_any_channel_succeeds() {
        let channels: Vec<Box<dyn NotificationChannel>> = vec![Box::new(EmailChannel), Box::new(DesktopChannel)];
        let rendered = render(&[]);
        assert!(fan_out(&channels, &rendered).await);
    }

    #[tokio::test]
    async fn fan_out_fails_if_all_channels_fail() {
        let channels: Vec<Box<dyn NotificationChannel>> = vec![Box::new(EmailChannel)];
        let rendered = render(&[]);
        assert!(!fan_out(&channels, &rendered).await);
    }
}
