use crate::error::FetchError;
use crate::order::{Order, UpstreamStatus};
use crate::user::User;
use async_trait::async_trait;

/// Upstream status source — one lookup of one UID against one endpoint.
///
/// The production implementation is an HTTP client; tests script outcomes.
/// Implementations perform no side effects beyond the lookup itself and
/// never touch the order.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, endpoint: &str, uid: &str) -> Result<UpstreamStatus, FetchError>;
}

/// Outcome of one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The user has blocked the bot. The caller retires the user's orders
    /// and stops messaging them; this is not a processing error.
    Blocked,
    /// Any other delivery failure; logged, never fatal to a run.
    Failed(String),
}

/// Which template a status notification uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessageVariant {
    /// Autoupdate detected a change; appends the donate prompt.
    Changed,
    /// Plain status render for manual queries.
    Current,
    /// First subscription confirmation.
    Subscribed,
    /// The user asked to subscribe to an order they already track.
    SubscribedAlready,
}

/// Message delivery — the Telegram side of the bot, seen from the core.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Render and send the status card (photo + caption) for an order.
    async fn send_status(
        &self,
        user: &User,
        order: &Order,
        variant: StatusMessageVariant,
    ) -> SendOutcome;

    /// Send a plain text message to a user.
    async fn send_text(&self, user: &User, text: &str) -> SendOutcome;

    /// Operational notice to the admin chat, if any. Best-effort; the
    /// default implementation drops it.
    async fn notify_admin(&self, _text: &str) {}
}
