//! Interruptible and randomized waits
//!
//! Long waits are split into slices of at most one second with a stop check
//! before each, so cancellation latency never exceeds a second.

use crate::state::StopSignal;
use crate::Result;
use rand::Rng;
use std::time::Duration;

/// Longest uninterrupted sleep
pub const SLICE: Duration = Duration::from_secs(1);

/// A uniformly random duration in `[min_ms, max_ms]`
pub fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if min_ms >= max_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Sleeps for `duration`, returning `Err(Stopped)` as soon as the signal trips
pub async fn pause(duration: Duration, stop: &StopSignal) -> Result<()> {
    stop.check()?;

    let mut remaining = duration;
    while !remaining.is_zero() {
        let slice = remaining.min(SLICE);
        tokio::time::sleep(slice).await;
        remaining -= slice;
        stop.check()?;
    }

    Ok(())
}

/// `pause` for a random duration between the two bounds
pub async fn pause_between(min_ms: u64, max_ms: u64, stop: &StopSignal) -> Result<()> {
    let duration = jitter(min_ms, max_ms);
    pause(duration, stop).await
}
