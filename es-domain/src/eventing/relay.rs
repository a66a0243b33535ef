//! 发件箱中继（OutboxRelay）
//!
//! 长驻任务：按固定间隔从发件箱拉取未发布的记录，按位点顺序逐条发布到总线。
//! 一轮中遇到第一条失败即停止（保证同一聚合的事件顺序），记录失败原因，留待下一轮重试。
//!
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{EventBus, EventOutbox};
use crate::error::{DomainError, DomainResult};

/// 发件箱中继
///
/// 中继与 `save` 之间不加锁：一轮补发可能与仍在逐条发布的 `save` 重叠，
/// 两者会发布同一批尚未确认的记录，订阅方因此可能看到 v1, v2, v1, v2。
/// 这属于至少一次投递，订阅方应按 `event_id` 去重。
#[derive(Builder)]
pub struct OutboxRelay {
    event_bus: Arc<dyn EventBus>,
    outbox: Arc<dyn EventOutbox>,
    #[builder(default)]
    config: RelayConfig,
}

impl OutboxRelay {
    /// 启动周期任务，返回可用于关闭/等待的句柄
    pub fn start(self: Arc<Self>) -> RelayHandle {
        let token = CancellationToken::new();
        let interval = self.config.interval;

        let relay = self;
        let task = Self::spawn_periodic(token.clone(), interval, move |token| {
            let relay = relay.clone();
            async move {
                match relay.relay_once(&token).await {
                    Ok(0) => {}
                    Ok(n) => debug!(published = n, "outbox relayed"),
                    Err(DomainError::Cancelled) => {}
                    Err(err) => warn!(error = %err, "outbox relay sweep failed"),
                }
            }
        });

        RelayHandle {
            token,
            tasks: vec![task],
        }
    }

    /// 执行一轮补发，返回本轮成功发布的条数
    pub async fn relay_once(&self, cancel: &CancellationToken) -> DomainResult<usize> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let pending = self
            .outbox
            .fetch_unpublished(self.config.batch_size)
            .await?;
        let mut published = 0;

        for record in &pending {
            match self.event_bus.publish(record, cancel).await {
                Ok(()) => {
                    self.outbox.mark_published(&[record]).await?;
                    published += 1;
                }
                Err(err) => {
                    let reason = err.to_string();
                    warn!(
                        event_id = record.event_id(),
                        aggregate_id = record.aggregate_id(),
                        error = %reason,
                        "relay publish failed"
                    );
                    self.outbox.mark_failed(&[record], &reason).await?;
                    break;
                }
            }
        }

        Ok(published)
    }

    fn spawn_periodic<F, Fut>(
        token: CancellationToken,
        interval: Duration,
        mut f: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => f(token.clone()).await,
                }
            }
        })
    }
}

/// 中继配置
#[derive(Clone, Copy, Debug)]
pub struct RelayConfig {
    /// 两轮补发之间的间隔
    pub interval: Duration,
    /// 每轮最多拉取的记录数
    pub batch_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            batch_size: 100,
        }
    }
}

/// 中继运行句柄：Drop 时自动发出关闭信号
pub struct RelayHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
