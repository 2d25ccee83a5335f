//! Round-robin endpoint selection.

use passtrack_core::error::PasstrackError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotates through equivalent upstream endpoints.
///
/// One shared counter per run context, advanced exactly once per lookup
/// attempt — success or failure — so distribution stays fair even when
/// individual endpoints misbehave. With a single endpoint the modulo
/// degenerates to always selecting it.
pub struct ProxyRotator {
    endpoints: Vec<String>,
    index: AtomicUsize,
}

impl ProxyRotator {
    pub fn new(endpoints: Vec<String>) -> Result<Self, PasstrackError> {
        if endpoints.is_empty() {
            return Err(PasstrackError::Config(
                "at least one upstream endpoint is required".to_string(),
            ));
        }
        Ok(Self {
            endpoints,
            index: AtomicUsize::new(0),
        })
    }

    /// Pick the endpoint for the next lookup and advance the counter.
    pub fn next_endpoint(&self) -> String {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.endpoints[i % self.endpoints.len()].clone()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}
