//! Change notifications via Telegram.
//!
//! Delivery is fire-and-forget: every failure is logged and swallowed,
//! since snapshot persistence must never depend on notification
//! success.

use reqwest::Client;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Listing, NotifyConfig};
use crate::pipeline::{ChangeSet, Direction, PriceChange};
use crate::utils::format_price;

/// Sends batched change summaries to the configured chats.
pub struct Notifier {
    client: Client,
    config: NotifyConfig,
    api_base: String,
}

impl Notifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }

    /// Override the API base URL (tests).
    #[cfg(test)]
    fn with_api_base(config: &NotifyConfig, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
            api_base: api_base.into(),
        }
    }

    /// Send one message per change category. Errors are logged only.
    pub async fn send_changes(&self, changes: &ChangeSet) {
        if self.config.token.is_empty() || self.config.chat_ids.is_empty() {
            log::warn!("Notifications enabled but token/chat_ids missing, skipping");
            return;
        }

        let max = self.config.max_items;
        if !changes.changed.is_empty() {
            self.broadcast(&format_changed(&changes.changed, max)).await;
        }
        if !changes.new_listings.is_empty() {
            self.broadcast(&format_new(&changes.new_listings, max)).await;
        }
        if !changes.removed.is_empty() {
            self.broadcast(&format_removed(&changes.removed, max)).await;
        }
    }

    async fn broadcast(&self, text: &str) {
        for chat_id in &self.config.chat_ids {
            if let Err(e) = self.send(chat_id, text).await {
                log::warn!("Failed to notify chat {}: {}", chat_id, e);
            }
        }
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.config.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(AppError::notify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::notify(format!("HTTP {}", status)));
        }
        Ok(())
    }
}

fn truncation_marker(total: usize, shown: usize) -> Option<String> {
    (total > shown).then(|| format!("...and {} more", total - shown))
}

/// "🆕 New Listings (3):" followed by one bullet line per listing.
fn format_new(listings: &[Listing], max_items: usize) -> String {
    let mut lines = vec![format!("🆕 New Listings ({}):", listings.len())];
    for listing in listings.iter().take(max_items) {
        lines.push(format!(
            "• {} - ₹{}",
            display_name(listing),
            format_price(listing.price)
        ));
    }
    if let Some(marker) = truncation_marker(listings.len(), max_items) {
        lines.push(marker);
    }
    lines.join("\n")
}

/// "📉 Price Changes (2):" with previous price and percentage per line.
fn format_changed(changes: &[PriceChange], max_items: usize) -> String {
    let mut lines = vec![format!("📉 Price Changes ({}):", changes.len())];
    for change in changes.iter().take(max_items) {
        let arrow = match change.direction {
            Direction::Decreased => "↓",
            Direction::Increased => "↑",
        };
        let percent = change
            .percent_change()
            .map(|p| format!(" ({}%)", p.abs()))
            .unwrap_or_default();
        lines.push(format!(
            "• {} - ₹{} {} from ₹{}{}",
            display_name(&change.listing),
            format_price(change.current_price),
            arrow,
            format_price(change.previous_price),
            percent
        ));
    }
    if let Some(marker) = truncation_marker(changes.len(), max_items) {
        lines.push(marker);
    }
    lines.join("\n")
}

fn format_removed(listings: &[Listing], max_items: usize) -> String {
    let mut lines = vec![format!("❌ Delisted ({}):", listings.len())];
    for listing in listings.iter().take(max_items) {
        lines.push(format!("• {}", display_name(listing)));
    }
    if let Some(marker) = truncation_marker(listings.len(), max_items) {
        lines.push(marker);
    }
    lines.join("\n")
}

fn display_name(listing: &Listing) -> &str {
    if listing.name.is_empty() {
        "Unknown"
    } else {
        &listing.name
    }
}
