/// Person 聚合示例
/// 演示完整生命周期：创建、改名、删除/恢复、按版本回看，以及发布失败后由中继补发
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use es_domain::aggregate::Aggregate;
use es_domain::domain_event::Metadata;
use es_domain::entity::Entity;
use es_domain::error::{DomainError, DomainResult};
use es_domain::event_codec::EventCodec;
use es_domain::eventing::{EventBus, InMemoryEventBus, OutboxRelay, RelayConfig};
use es_domain::identity::{ActorId, AggregateId};
use es_domain::persist::{
    AggregateRepository, EventRecord, EventSourcedRepository, InMemoryEventStore, LoadOptions,
};
use es_domain::value_object::Version;
use es_macros::{domain_event, entity};
use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ============================================================================
// 领域模型定义
// ============================================================================

#[domain_event]
enum PersonEvent {
    #[event(event_type = "PersonCreated")]
    Created { full_name: String },
    #[event(event_type = "PersonRenamed")]
    Renamed { full_name: String },
}

#[entity(event = PersonEvent, aggregate_type = "Person")]
struct Person {
    full_name: String,
}

impl Person {
    fn create(full_name: &str, actor: &ActorId) -> DomainResult<Self> {
        let mut person = Self::construct(AggregateId::generate())?;
        person.raise(
            PersonEvent::Created {
                full_name: full_name.to_string(),
            },
            Some(actor.clone()),
        )?;
        Ok(person)
    }

    fn rename(&mut self, full_name: &str, actor: &ActorId) -> DomainResult<()> {
        self.raise(
            PersonEvent::Renamed {
                full_name: full_name.to_string(),
            },
            Some(actor.clone()),
        )
    }
}

impl Aggregate for Person {
    fn apply(&mut self, event: &PersonEvent, _metadata: &Metadata) {
        match event {
            PersonEvent::Created { full_name } | PersonEvent::Renamed { full_name } => {
                self.full_name = full_name.clone();
            }
        }
    }
}

// ============================================================================
// 可以模拟故障的总线
// ============================================================================

struct FlakyBus {
    inner: InMemoryEventBus,
    down: AtomicBool,
}

#[async_trait]
impl EventBus for FlakyBus {
    async fn publish(&self, event: &EventRecord, cancel: &CancellationToken) -> DomainResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DomainError::EventBus {
                reason: "broker unavailable".to_string(),
            });
        }
        self.inner.publish(event, cancel).await
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Person 聚合生命周期示例 ===\n");

    let mut codec = EventCodec::new();
    codec.register::<PersonEvent>()?;

    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(FlakyBus {
        inner: InMemoryEventBus::default(),
        down: AtomicBool::new(false),
    });
    let mut subscription = bus.inner.subscribe();
    let repo = EventSourcedRepository::new(store.clone(), bus.clone(), Arc::new(codec));
    let cancel = CancellationToken::new();
    let admin = ActorId::from("admin");

    // 创建并改名
    let mut person = Person::create("Alice", &admin)?;
    person.rename("Alice Liddell", &admin)?;
    repo.save(&mut person, &cancel).await?;
    let id = person.id().clone();
    println!("已保存 {} ({})", id, person.version());

    for _ in 0..2 {
        if let Some(Ok(record)) = subscription.next().await {
            println!(
                "  收到事件 #{:?} {} v{}",
                record.sequence(),
                record.event_type(),
                record.version()
            );
        }
    }

    // 按版本回看
    let past: Option<Person> = repo
        .load(
            &id,
            LoadOptions::builder()
                .version(Version::from_value(1))
                .build(),
            &cancel,
        )
        .await?;
    if let Some(past) = past {
        println!("v1 时的姓名: {}", past.full_name);
    }

    // 删除后默认不可见
    person.delete(Some(admin.clone()))?;
    repo.save(&mut person, &cancel).await?;
    if let Some(Ok(record)) = subscription.next().await {
        println!("  收到事件 {} v{}", record.event_type(), record.version());
    }
    let hidden: Option<Person> = repo.load(&id, LoadOptions::default(), &cancel).await?;
    println!("删除后可见: {}", hidden.is_some());

    // 总线故障：事件已落盘但未发布
    bus.down.store(true, Ordering::SeqCst);
    let mut deleted: Person = repo
        .load(
            &id,
            LoadOptions::builder().include_deleted(true).build(),
            &cancel,
        )
        .await?
        .ok_or_else(|| anyhow::anyhow!("person {id} not found"))?;
    deleted.undelete(Some(admin.clone()))?;
    match repo.save(&mut deleted, &cancel).await {
        Err(DomainError::PublishFailed { unpublished, .. }) => {
            println!("发布失败，{unpublished} 条事件留在发件箱")
        }
        other => other?,
    }

    // 中继补发
    bus.down.store(false, Ordering::SeqCst);
    let relay = Arc::new(
        OutboxRelay::builder()
            .event_bus(bus.clone())
            .outbox(store.clone())
            .config(RelayConfig {
                interval: Duration::from_millis(50),
                batch_size: 100,
            })
            .build(),
    );
    let handle = relay.start();
    if let Ok(Some(Ok(record))) =
        tokio::time::timeout(Duration::from_secs(1), subscription.next()).await
    {
        println!("中继补发: {} v{}", record.event_type(), record.version());
    }
    handle.shutdown();
    handle.join().await;

    println!("未发布事件数: {}", store.unpublished_count()?);
    Ok(())
}
