use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AggregateRoot, AggregateState, Event, Result};

pub mod memory;
pub mod publish;

pub use memory::InMemoryStore;
pub use publish::PublishingStore;

/// The persisted stream record for one aggregate instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(rename = "aggregateID")]
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub version: i64,
    pub event_stream: Vec<Event>,
}

/// `AggregateStore` is responsible for loading and saving aggregates.
///
/// Implementations must enforce optimistic concurrency on
/// [`AggregateStore::save`]: at most one successful append per expected
/// version. A save against a stream whose stored version no longer matches
/// the aggregate's base version fails with [`crate::EsError::Concurrency`]
/// and applies nothing.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Replays the persisted stream for the aggregate's type + id onto the
    /// passed-in (empty) aggregate. Fails fast on a malformed stream rather
    /// than skipping events.
    async fn load<S: AggregateState>(&self, aggregate: &mut AggregateRoot<S>) -> Result<()>;

    /// Persists all uncommitted events appended since the last save, then
    /// commits them on the aggregate.
    async fn save<S: AggregateState>(&self, aggregate: &mut AggregateRoot<S>) -> Result<()>;

    /// Checks that a stream exists for the given stream id. Signals a
    /// missing stream with [`crate::EsError::AggregateNotFound`], which
    /// callers on the creation path treat as "safe to create new".
    async fn exists(&self, stream_id: &str) -> Result<()>;

    /// Removes the stream for the given aggregate type + entity id.
    async fn delete_aggregate(&self, aggregate_type: &str, id: &str) -> Result<()>;

    /// Returns every stream entry of the given aggregate type, ordered by
    /// stream id. Used for snapshot export and maintenance, not the hot
    /// path.
    async fn get_aggregate_type_entries(&self, aggregate_type: &str) -> Result<Vec<Entry>>;
}

/// `EventStore` is the lower-level contract for appending and reading raw
/// event streams.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends all events in the slice to their streams.
    async fn save_events(&self, events: &[Event]) -> Result<()>;

    /// Loads all events for the stream id from the store.
    async fn load_events(&self, stream_id: &str) -> Result<Vec<Event>>;
}
