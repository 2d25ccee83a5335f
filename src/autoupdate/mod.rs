//! Autoupdate — the scheduled polling batch.
//!
//! A run walks every active order strictly sequentially with a pacing
//! delay, refreshes each through the update engine, notifies owners of
//! changed orders, and folds everything into one terminal summary that is
//! emitted no matter how the run ends. Per-order failures are isolated
//! and counted; a single upstream timeout is read as systemic
//! unavailability and aborts the rest of the run.

mod counter;
mod schedule;

pub use counter::RunCounter;
pub use schedule::{next_fire, CronSchedule};

use crate::orders::OrderService;
use chrono::Utc;
use chrono_tz::Tz;
use passtrack_core::config::AutoupdateConfig;
use passtrack_core::error::PasstrackError;
use passtrack_core::order::{has_changes, Order};
use passtrack_core::traits::{Notifier, SendOutcome, StatusMessageVariant};
use passtrack_core::user::User;
use passtrack_store::Store;
use passtrack_telegram::texts::admin_run_summary;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct AutoupdateService {
    store: Store,
    orders: Arc<OrderService>,
    notifier: Arc<dyn Notifier>,
    endpoints: Vec<String>,
    order_delay: Duration,
    schedules: Vec<CronSchedule>,
    timezone: Tz,
    /// Guards against overlapping runs when triggers fire close together.
    running: AtomicBool,
}

impl AutoupdateService {
    pub fn new(
        store: Store,
        orders: Arc<OrderService>,
        notifier: Arc<dyn Notifier>,
        config: &AutoupdateConfig,
        endpoints: Vec<String>,
    ) -> Result<Self, PasstrackError> {
        let schedules = config
            .schedules
            .iter()
            .map(|expr| CronSchedule::parse(expr))
            .collect::<Result<Vec<_>, _>>()?;
        if schedules.is_empty() {
            return Err(PasstrackError::Config(
                "at least one autoupdate schedule is required".to_string(),
            ));
        }

        let timezone: Tz = config.timezone.parse().map_err(|e| {
            PasstrackError::Config(format!("bad timezone '{}': {e}", config.timezone))
        })?;

        Ok(Self {
            store,
            orders,
            notifier,
            endpoints,
            order_delay: Duration::from_millis(config.order_delay_ms),
            schedules,
            timezone,
            running: AtomicBool::new(false),
        })
    }

    pub fn schedules(&self) -> &[CronSchedule] {
        &self.schedules
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Sleep until the next trigger, run the batch, repeat.
    pub async fn run_forever(&self) -> Result<(), PasstrackError> {
        loop {
            let now = Utc::now().with_timezone(&self.timezone);
            let Some((idx, at)) = next_fire(&self.schedules, now) else {
                return Err(PasstrackError::Config(
                    "no autoupdate schedule yields a next run".to_string(),
                ));
            };

            info!(
                "autoupdate: next run at {} ({})",
                at.format("%Y-%m-%d %H:%M %Z"),
                self.schedules[idx].expression()
            );

            let wait = (at.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            self.trigger().await;
        }
    }

    /// Entry point for one trigger firing. Skips when a run is already in
    /// flight so two triggers never share the rotator or double-notify.
    pub async fn trigger(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("autoupdate: run already in progress, skipping trigger");
            return;
        }
        let counter = self.run_once().await;
        self.notifier
            .notify_admin(&admin_run_summary(&counter.summary()))
            .await;
        self.running.store(false, Ordering::SeqCst);
    }

    /// Execute one full batch. The terminal summary is emitted on every
    /// exit path: normal completion, timeout abort, or a root-level error.
    pub async fn run_once(&self) -> RunCounter {
        let mut counter = RunCounter::new(&self.endpoints);
        info!("autoupdate: run started");

        if let Err(e) = self.run_loop(&mut counter).await {
            error!("autoupdate: run aborted by root error: {e}");
        }

        counter.finish();
        info!("autoupdate: run finished | {}", counter.summary());
        counter
    }

    async fn run_loop(&self, counter: &mut RunCounter) -> Result<(), PasstrackError> {
        let orders = self.store.active_orders().await?;
        counter.orders_all = orders.len();

        // Users who blocked the bot during this run; no further sends.
        let mut blocked: HashSet<String> = HashSet::new();

        for mut order in orders {
            match self.process_order(&mut order, counter, &mut blocked).await {
                ControlFlow::Continue(()) => {}
                ControlFlow::Break(()) => break,
            }
            tokio::time::sleep(self.order_delay).await;
        }

        Ok(())
    }

    /// Check one order. Breaks the run on a systemic upstream timeout.
    async fn process_order(
        &self,
        order: &mut Order,
        counter: &mut RunCounter,
        blocked: &mut HashSet<String>,
    ) -> ControlFlow<()> {
        // Terminal orders stay in storage but leave the polling set for
        // good: no counters, no network.
        if order.is_complete() {
            debug!("autoupdate: order {} is complete, skipping", order.short_uid);
            return ControlFlow::Continue(());
        }

        let user_id = order.user_id.clone();

        match self.orders.update(order, &user_id).await {
            Err(failure) if failure.is_timeout() => {
                // One timeout means the upstream itself is likely down;
                // hammering the remaining orders would only make it worse.
                // The aborted order is not counted as checked.
                counter.orders_error += 1;
                counter.route_err(&failure.endpoint);
                error!(
                    "autoupdate: upstream timeout via {}, aborting run",
                    failure.endpoint
                );
                ControlFlow::Break(())
            }
            Err(failure) => {
                counter.orders_checked += 1;
                counter.record_user(&user_id);
                counter.orders_error += 1;
                if failure.is_not_found() {
                    counter.orders_error_not_found += 1;
                }
                counter.route_err(&failure.endpoint);
                warn!("autoupdate: order {} failed: {failure}", order.short_uid);
                ControlFlow::Continue(())
            }
            Ok(success) => {
                counter.orders_checked += 1;
                counter.record_user(&user_id);
                counter.route_ok(&success.endpoint);

                if has_changes(&success.old, order) {
                    counter.orders_updated += 1;
                    info!(
                        "autoupdate: order {} changed ({:?} -> {:?})",
                        order.short_uid, success.old.status_percent, order.status_percent
                    );
                    self.notify_change(order, blocked).await;
                } else {
                    info!("autoupdate: order {} without changes", order.short_uid);
                }
                ControlFlow::Continue(())
            }
        }
    }

    async fn notify_change(&self, order: &Order, blocked: &mut HashSet<String>) {
        if blocked.contains(&order.user_id) {
            debug!(
                "autoupdate: user {} blocked the bot earlier this run, not notifying",
                order.user_id
            );
            return;
        }

        let user = match self.store.find_user(&order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    "autoupdate: no user {} for order {}",
                    order.user_id, order.short_uid
                );
                return;
            }
            Err(e) => {
                error!("autoupdate: user lookup failed for {}: {e}", order.user_id);
                return;
            }
        };

        match self
            .notifier
            .send_status(&user, order, StatusMessageVariant::Changed)
            .await
        {
            SendOutcome::Delivered => {}
            SendOutcome::Blocked => {
                warn!(
                    "autoupdate: user {} blocked the bot, retiring their orders",
                    user.id
                );
                blocked.insert(user.id.clone());
                if let Err(e) = self.retire_blocked_user(&user).await {
                    error!("autoupdate: blocked-user cleanup failed for {}: {e}", user.id);
                }
            }
            SendOutcome::Failed(e) => {
                warn!("autoupdate: notify failed for user {}: {e}", user.id);
            }
        }
    }

    async fn retire_blocked_user(&self, user: &User) -> Result<(), PasstrackError> {
        let retired = self.orders.delete_all(user).await?;
        info!(
            "autoupdate: retired {} orders of blocked user {}",
            retired.len(),
            user.id
        );
        self.store.set_user_blocked(&user.id, true).await
    }
}

#[cfg(test)]
mod tests;
