//! 关系型存储的参考表结构
//!
//! 列与 [`EventRecord`](crate::persist::EventRecord) 一一对应。
//! 除 EventId 唯一外，(aggregate_type, aggregate_id, version) 同样唯一，
//! 并发写入同一聚合时由该约束检测冲突（对应 `VersionConflict`）。

pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    sequence        BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    event_id        UUID         NOT NULL,
    actor_id        VARCHAR(255),
    occurred_on     TIMESTAMPTZ  NOT NULL,
    version         BIGINT       NOT NULL,
    delete_action   VARCHAR(16)  NOT NULL DEFAULT 'None',
    aggregate_type  VARCHAR(255) NOT NULL,
    aggregate_id    VARCHAR(255) NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    event_data      TEXT         NOT NULL,
    published       BOOLEAN      NOT NULL DEFAULT FALSE,
    attempts        INTEGER      NOT NULL DEFAULT 0,
    last_error      TEXT,
    CONSTRAINT uq_events_event_id UNIQUE (event_id),
    CONSTRAINT uq_events_aggregate_version UNIQUE (aggregate_type, aggregate_id, version)
);
CREATE INDEX IF NOT EXISTS ix_events_actor_id ON events (actor_id);
CREATE INDEX IF NOT EXISTS ix_events_occurred_on ON events (occurred_on);
CREATE INDEX IF NOT EXISTS ix_events_version ON events (version);
CREATE INDEX IF NOT EXISTS ix_events_delete_action ON events (delete_action);
CREATE INDEX IF NOT EXISTS ix_events_aggregate_type ON events (aggregate_type);
CREATE INDEX IF NOT EXISTS ix_events_aggregate_id ON events (aggregate_id);
CREATE INDEX IF NOT EXISTS ix_events_aggregate ON events (aggregate_type, aggregate_id);
CREATE INDEX IF NOT EXISTS ix_events_event_type ON events (event_type);
CREATE INDEX IF NOT EXISTS ix_events_unpublished ON events (sequence) WHERE published = FALSE;
"#;
