//! In-Memory Request Deduper
//!
//! 同一资源（key）同时只允许一个请求在途。
//! 周期性请求遇到在途请求时直接跳过；需要最新结果的调用方可以排队等待在途请求结束。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 在途请求登记表
pub struct RequestDeduper {
    /// key -> 单许可信号量；许可被占用即表示请求在途
    slots: DashMap<String, Arc<Semaphore>>,
}

impl RequestDeduper {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    fn slot(&self, key: &str) -> Arc<Semaphore> {
        self.slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// 登记请求；key 已在途时返回 None
    ///
    /// 返回的 guard 被 drop 时解除登记
    pub fn acquire(&self, key: &str) -> Option<InFlightGuard> {
        match self.slot(key).try_acquire_owned() {
            Ok(permit) => Some(InFlightGuard::new(key, permit)),
            Err(_) => {
                tracing::debug!(key = %key, "Request already in flight, skipping");
                None
            }
        }
    }

    /// 等待该 key 的在途请求结束后登记
    ///
    /// 等待者按到达顺序获得登记；只有信号量被关闭时返回 None
    pub async fn acquire_after_in_flight(&self, key: &str) -> Option<InFlightGuard> {
        let slot = self.slot(key);
        if slot.available_permits() == 0 {
            tracing::debug!(key = %key, "Waiting for in-flight request");
        }
        let permit = slot.acquire_owned().await.ok()?;
        Some(InFlightGuard::new(key, permit))
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .map(|slot| slot.available_permits() == 0)
            .unwrap_or(false)
    }

    pub fn in_flight_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.available_permits() == 0)
            .count()
    }
}

impl Default for RequestDeduper {
    fn default() -> Self {
        Self::new()
    }
}

/// 在途请求凭据
pub struct InFlightGuard {
    key: String,
    since: DateTime<Utc>,
    _permit: OwnedSemaphorePermit,
}

impl InFlightGuard {
    fn new(key: &str, permit: OwnedSemaphorePermit) -> Self {
        Self {
            key: key.to_string(),
            since: Utc::now(),
            _permit: permit,
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let elapsed_ms = (Utc::now() - self.since).num_milliseconds();
        tracing::trace!(key = %self.key, elapsed_ms = elapsed_ms, "Request released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_second_acquire_is_rejected_until_release() {
        let deduper = RequestDeduper::new();

        let guard = deduper.acquire("/ai-control/status");
        assert!(guard.is_some());
        assert!(deduper.acquire("/ai-control/status").is_none());
        assert!(deduper.is_in_flight("/ai-control/status"));

        // 不同 key 互不影响
        assert!(deduper.acquire("/status").is_some());

        drop(guard);
        assert!(!deduper.is_in_flight("/ai-control/status"));
        assert!(deduper.acquire("/ai-control/status").is_some());
        assert_eq!(deduper.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        let deduper = Arc::new(RequestDeduper::new());
        let guard = deduper.acquire("/ai-control/status");
        assert!(guard.is_some());

        let waiter = {
            let deduper = deduper.clone();
            tokio::spawn(async move {
                let guard = deduper.acquire_after_in_flight("/ai-control/status").await;
                guard.is_some()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.await.unwrap());
        assert_eq!(deduper.in_flight_count(), 0);
    }
}
