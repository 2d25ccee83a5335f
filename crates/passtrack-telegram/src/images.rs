//! Status image lookup.
//!
//! Each completion percent has a matching PNG in the images directory;
//! anything without an exact match uses `fallback.png`. A missing fallback
//! is a deployment problem, not a per-order condition.

use passtrack_core::error::PasstrackError;
use std::path::Path;

pub const FALLBACK_IMAGE: &str = "fallback.png";

/// Read the image bytes for a completion percent.
pub fn status_image(dir: &Path, percent: Option<i64>) -> Result<Vec<u8>, PasstrackError> {
    if let Some(p) = percent {
        let exact = dir.join(format!("{p}.png"));
        if exact.exists() {
            return Ok(std::fs::read(exact)?);
        }
    }

    let fallback = dir.join(FALLBACK_IMAGE);
    if fallback.exists() {
        return Ok(std::fs::read(fallback)?);
    }

    Err(PasstrackError::Config(format!(
        "no status image for {percent:?} and no {FALLBACK_IMAGE} in {}",
        dir.display()
    )))
}
