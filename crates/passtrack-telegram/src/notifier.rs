//! Telegram Bot API notifier.
//!
//! Sends status cards via `sendPhoto` (multipart) and plain messages via
//! `sendMessage`. A 403 "bot was blocked by the user" response is folded
//! into [`SendOutcome::Blocked`] so callers can retire the user's orders
//! instead of treating it as a delivery failure.

use crate::images::status_image;
use crate::texts::status_caption;
use async_trait::async_trait;
use passtrack_core::config::TelegramConfig;
use passtrack_core::order::Order;
use passtrack_core::traits::{Notifier, SendOutcome, StatusMessageVariant};
use passtrack_core::user::User;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    images_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TgResponse {
    ok: bool,
    description: Option<String>,
    error_code: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, images_dir: PathBuf) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            images_dir,
        }
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> SendOutcome {
        let url = format!("{}/sendMessage", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let resp = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => return SendOutcome::Failed(format!("telegram send failed: {e}")),
        };

        classify_response(resp).await
    }

    async fn send_photo(&self, chat_id: &str, image: Vec<u8>, caption: &str) -> SendOutcome {
        let url = format!("{}/sendPhoto", self.base_url);

        let part = match reqwest::multipart::Part::bytes(image)
            .file_name("status.png")
            .mime_str("image/png")
        {
            Ok(p) => p,
            Err(e) => return SendOutcome::Failed(format!("mime error: {e}")),
        };

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("photo", part);

        let resp = match self.client.post(&url).multipart(form).send().await {
            Ok(r) => r,
            Err(e) => return SendOutcome::Failed(format!("telegram sendPhoto failed: {e}")),
        };

        classify_response(resp).await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_status(
        &self,
        user: &User,
        order: &Order,
        variant: StatusMessageVariant,
    ) -> SendOutcome {
        let image = match status_image(&self.images_dir, order.status_percent) {
            Ok(bytes) => bytes,
            Err(e) => return SendOutcome::Failed(e.to_string()),
        };

        let caption = status_caption(order, variant);
        debug!(
            "telegram: status card for {} -> user {}",
            order.short_uid, user.id
        );
        self.send_photo(&user.id, image, &caption).await
    }

    async fn send_text(&self, user: &User, text: &str) -> SendOutcome {
        self.send_message(&user.id, text).await
    }

    /// Best-effort notice to the admin chat; failures are logged only.
    async fn notify_admin(&self, text: &str) {
        if self.config.admin_chat_id.is_empty() {
            return;
        }
        match self.send_message(&self.config.admin_chat_id, text).await {
            SendOutcome::Delivered => {}
            outcome => warn!("telegram: admin notice not delivered: {outcome:?}"),
        }
    }
}

async fn classify_response(resp: reqwest::Response) -> SendOutcome {
    let status = resp.status();
    if status.is_success() {
        return SendOutcome::Delivered;
    }

    let body = resp.text().await.unwrap_or_default();
    let description = serde_json::from_str::<TgResponse>(&body)
        .ok()
        .filter(|r| !r.ok)
        .and_then(|r| {
            if r.error_code == Some(403) {
                r.description
            } else {
                None
            }
        })
        .unwrap_or_default();

    if is_blocked_description(status.as_u16(), &description) {
        return SendOutcome::Blocked;
    }

    SendOutcome::Failed(format!("telegram API error {status}: {body}"))
}

/// Telegram reports a blocked bot as 403 with a fixed description.
fn is_blocked_description(status: u16, description: &str) -> bool {
    status == 403 && description.to_lowercase().contains("blocked by the user")
}
