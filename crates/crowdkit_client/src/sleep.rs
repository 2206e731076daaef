//! Pluggable sleeping for retry and polling delays.

use std::future::{ready, Future, Ready};
use std::time::Duration;

/// Provides the future a client awaits between attempts.
pub trait Sleeper {
    /// Future that completes after the delay.
    type Sleep: Future<Output = ()> + Send;

    /// Returns a future completing after `dur`.
    fn sleep_for(dur: Duration) -> Self::Sleep;
}

/// Sleeps on the Tokio timer. Requires a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// Blocks the calling thread, for clients driven by `block_on`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    type Sleep = Ready<()>;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        if !dur.is_zero() {
            std::thread::sleep(dur);
        }
        ready(())
    }
}

/// Never waits. For tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    type Sleep = Ready<()>;

    fn sleep_for(_dur: Duration) -> Self::Sleep {
        ready(())
    }
}
