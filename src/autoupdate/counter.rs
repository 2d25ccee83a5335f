//! Per-run counters for the autoupdate batch.
//!
//! One counter lives for exactly one run: created at start, mutated during
//! iteration, folded into the terminal summary log, then dropped.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

/// Success/error tallies for one upstream endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteTally {
    pub ok: u32,
    pub err: u32,
}

pub struct RunCounter {
    pub orders_all: usize,
    pub orders_checked: usize,
    pub orders_updated: usize,
    pub orders_error: usize,
    pub orders_error_not_found: usize,
    /// Distinct users among checked orders; computed by `finish`.
    pub users_checked: usize,
    pub duration: Duration,
    routes: BTreeMap<String, RouteTally>,
    checked_users: HashSet<String>,
    started: Instant,
}

impl RunCounter {
    /// Every configured endpoint starts with a zero tally so the summary
    /// shows idle routes too.
    pub fn new(endpoints: &[String]) -> Self {
        Self {
            orders_all: 0,
            orders_checked: 0,
            orders_updated: 0,
            orders_error: 0,
            orders_error_not_found: 0,
            users_checked: 0,
            duration: Duration::ZERO,
            routes: endpoints
                .iter()
                .map(|e| (e.clone(), RouteTally::default()))
                .collect(),
            checked_users: HashSet::new(),
            started: Instant::now(),
        }
    }

    pub fn record_user(&mut self, user_id: &str) {
        self.checked_users.insert(user_id.to_string());
    }

    pub fn route_ok(&mut self, endpoint: &str) {
        self.routes.entry(endpoint.to_string()).or_default().ok += 1;
    }

    pub fn route_err(&mut self, endpoint: &str) {
        self.routes.entry(endpoint.to_string()).or_default().err += 1;
    }

    pub fn route(&self, endpoint: &str) -> RouteTally {
        self.routes.get(endpoint).copied().unwrap_or_default()
    }

    /// Close the run: compute distinct users and elapsed time.
    pub fn finish(&mut self) {
        self.users_checked = self.checked_users.len();
        self.duration = self.started.elapsed();
    }

    /// One-line terminal summary.
    pub fn summary(&self) -> String {
        let routes = self
            .routes
            .iter()
            .map(|(url, t)| format!("{url} ok={} err={}", t.ok, t.err))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "orders: {} total, {} checked, {} updated, {} errors ({} not found) | \
             users: {} | duration: {:.1}s | routes: {routes}",
            self.orders_all,
            self.orders_checked,
            self.orders_updated,
            self.orders_error,
            self.orders_error_not_found,
            self.users_checked,
            self.duration.as_secs_f64(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_users() {
        let mut counter = RunCounter::new(&[]);
        counter.record_user("1");
        counter.record_user("2");
        counter.record_user("1");
        counter.finish();
        assert_eq!(counter.users_checked, 2);
    }

    #[test]
    fn test_route_tallies_preseeded() {
        let endpoints = vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ];
        let mut counter = RunCounter::new(&endpoints);

        counter.route_ok("https://a.example");
        counter.route_ok("https://a.example");
        counter.route_err("https://b.example");

        assert_eq!(counter.route("https://a.example"), RouteTally { ok: 2, err: 0 });
        assert_eq!(counter.route("https://b.example"), RouteTally { ok: 0, err: 1 });

        let summary = counter.summary();
        assert!(summary.contains("https://a.example ok=2 err=0"));
        assert!(summary.contains("https://b.example ok=0 err=1"));
    }

    #[test]
    fn test_summary_counts() {
        let mut counter = RunCounter::new(&[]);
        counter.orders_all = 5;
        counter.orders_checked = 4;
        counter.orders_updated = 2;
        counter.orders_error = 1;
        counter.orders_error_not_found = 1;
        counter.finish();

        let summary = counter.summary();
        assert!(summary.contains("5 total"));
        assert!(summary.contains("4 checked"));
        assert!(summary.contains("2 updated"));
        assert!(summary.contains("1 errors (1 not found)"));
    }
}
