//! 事件子系统（eventing）
//!
//! - `EventBus`：发布已落盘事件记录的协议；
//! - `EventOutbox`：发件箱协议，取出未发布记录并确认/标记失败；
//! - `InMemoryEventBus`：基于 broadcast 的内存总线（feature `eventing`）；
//! - `OutboxRelay`：周期性补发发件箱中未发布事件的中继（feature `eventing`）。
//!
pub mod bus;
pub mod outbox;

#[cfg(feature = "eventing")]
pub mod bus_inmemory;
#[cfg(feature = "eventing")]
pub mod relay;

pub use bus::EventBus;
pub use outbox::EventOutbox;

#[cfg(feature = "eventing")]
pub use bus_inmemory::InMemoryEventBus;
#[cfg(feature = "eventing")]
pub use relay::{OutboxRelay, RelayConfig, RelayHandle};
