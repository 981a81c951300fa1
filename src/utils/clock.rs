use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Calendar day used as the bucket key. Local to the process by default.
    fn today(&self) -> NaiveDate {
        self.time().with_timezone(&Local).date_naive()
    }

    async fn sleep(&self, duration: Duration);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub use test_clock::ManualClock;
