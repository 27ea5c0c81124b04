//! Injectable time source
//!
//! Session ids and default screenshot names are derived from the clock, so
//! tests inject a fixed clock to get reproducible identifiers instead of
//! fighting `Utc::now()`.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Time source for the agent. Production uses [`SystemClock`]; tests use
/// [`FixedClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed time for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// New session identifier: clock-derived with a short uuid suffix so two
/// sessions started within the same millisecond still get distinct ids.
pub fn session_id(clock: &dyn Clock) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session-{}-{}", clock.now().timestamp_millis(), &suffix[..8])
}

/// Default screenshot file stem when an action does not name one.
pub fn screenshot_stem(clock: &dyn Clock) -> String {
    format!("skill-{}", clock.now().timestamp_millis())
}
