//! Caption and message templates (Russian, HTML parse mode).

use chrono_tz::Europe::Moscow;
use passtrack_core::order::Order;
use passtrack_core::traits::StatusMessageVariant;
use passtrack_core::uid::days_since_reception;

const DONATE_PROMPT: &str =
    "\n\nБот бесплатный. Поддержать проект можно командой /donate — спасибо!";

/// Placeholder shown for fields the upstream has not filled yet.
const EMPTY_FIELD: &str = "-";

/// Full caption for a status card.
pub fn status_caption(order: &Order, variant: StatusMessageVariant) -> String {
    let mut message = match variant {
        StatusMessageVariant::Changed => {
            "Статус вашего заявления изменился!\n\n".to_string()
        }
        StatusMessageVariant::Current => String::new(),
        StatusMessageVariant::Subscribed => {
            "Вы подписались на обновления заявления.\n\n".to_string()
        }
        StatusMessageVariant::SubscribedAlready => {
            "Вы уже подписаны на это заявление.\n\n".to_string()
        }
    };

    message.push_str(&order_block(order));

    if variant == StatusMessageVariant::Changed {
        message.push_str(DONATE_PROMPT);
    }

    message
}

/// The status block shared by all variants.
fn order_block(order: &Order) -> String {
    let reception = order.reception_date.as_deref().unwrap_or(EMPTY_FIELD);
    let days = order
        .reception_date
        .as_deref()
        .and_then(days_since_reception)
        .map(|d| format!(" ({d} дн. назад)"))
        .unwrap_or_default();

    let percent = order
        .status_percent
        .map(|p| p.to_string())
        .unwrap_or_else(|| EMPTY_FIELD.to_string());
    let internal = order
        .status_internal_name
        .as_deref()
        .unwrap_or(EMPTY_FIELD);
    let name = order.status_name.as_deref().unwrap_or(EMPTY_FIELD);

    let updated = order
        .updated_at
        .with_timezone(&Moscow)
        .format("%d.%m.%Y %H:%M:%S");

    format!(
        "<b>Заявление {short}</b>\n\
         Подано: {reception}{days}\n\
         Готовность: {percent}%\n\
         Статус: {internal}\n\
         Этап: {name}\n\
         Обновлено: {updated} (МСК)",
        short = order.short_uid,
    )
}

/// Operational notice for the admin chat about an autoupdate run.
pub fn admin_run_summary(summary: &str) -> String {
    format!("<b>Автообновление завершено</b>\n{summary}")
}
