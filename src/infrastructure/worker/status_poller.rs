//! Status Poller - 后台会话状态轮询
//!
//! 按固定间隔向服务端查询会话状态，交给协调器对账。
//! 同一时刻最多一个状态请求在途：循环内顺序等待，错过的 tick 直接跳过。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::SessionCoordinator;
use crate::domain::control::PollOutcome;

/// Poller 配置
#[derive(Debug, Clone)]
pub struct StatusPollerConfig {
    /// 轮询间隔
    pub interval: Duration,
}

impl Default for StatusPollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
        }
    }
}

/// 状态轮询器
pub struct StatusPoller {
    config: StatusPollerConfig,
    coordinator: Arc<SessionCoordinator>,
    shutdown: watch::Receiver<bool>,
}

/// 运行中的轮询器句柄
pub struct StatusPollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl StatusPollerHandle {
    /// 通知轮询器退出并等待结束，返回完成的轮询次数
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(polls) => polls,
            Err(e) => {
                tracing::error!(error = %e, "StatusPoller task failed");
                0
            }
        }
    }
}

impl StatusPoller {
    pub fn new(
        config: StatusPollerConfig,
        coordinator: Arc<SessionCoordinator>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            coordinator,
            shutdown,
        }
    }

    /// 在后台启动轮询器
    pub fn spawn(config: StatusPollerConfig, coordinator: Arc<SessionCoordinator>) -> StatusPollerHandle {
        let (tx, rx) = watch::channel(false);
        let poller = Self::new(config, coordinator, rx);
        StatusPollerHandle {
            shutdown: tx,
            task: tokio::spawn(poller.run()),
        }
    }

    /// 运行轮询循环，直到收到退出信号；返回完成的轮询次数
    pub async fn run(mut self) -> u64 {
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "StatusPoller started"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut polls: u64 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.coordinator.refresh_status().await {
                Ok(Some(outcome)) => {
                    polls += 1;
                    if consecutive_failures > 0 {
                        tracing::info!(
                            failures = consecutive_failures,
                            "Status polling recovered"
                        );
                        consecutive_failures = 0;
                    }
                    if let PollOutcome::Applied { from, to } = outcome {
                        tracing::debug!(from = %from, to = %to, "Server status applied");
                    }
                }
                Ok(None) => {
                    tracing::trace!("Status request already in flight");
                }
                Err(e) => {
                    consecutive_failures += 1;
                    // 连续失败只在首次记 warn，避免刷屏
                    if consecutive_failures == 1 {
                        tracing::warn!(error = %e, "Status poll failed");
                    } else {
                        tracing::debug!(error = %e, failures = consecutive_failures, "Status poll failed");
                    }
                }
            }
        }

        tracing::info!(polls = polls, "StatusPoller stopped");
        polls
    }
}
