//! 时间源
//!
//! 缓存条目的创建时间要写入持久化快照，所以使用墙钟时间（`DateTime<Utc>`）
//! 而不是 `Instant`。测试用 `ManualClock` 控制时间推进。

use chrono::{DateTime, Utc};
use std::fmt;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

/// 测试用时间源
#[cfg(test)]
mod manual {
    use super::*;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    /// 手动时钟，克隆后共享同一时间
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        /// 推进时间
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            if let Ok(delta) = chrono::Duration::from_std(by) {
                *now += delta;
            }
        }

        pub fn set(&self, to: DateTime<Utc>) {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(Utc::now())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::default();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - start, chrono::Duration::seconds(90));

        clock.set(start);
        assert_eq!(other.now(), start);
    }
}
