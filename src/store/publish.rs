use std::sync::Arc;

use async_trait::async_trait;

use crate::{AggregateRoot, AggregateState, EventDispatcher, Result};

use super::{AggregateStore, Entry};

/// Store middleware that forwards each successful save's events to an
/// [`EventDispatcher`], synchronously, in the caller of `save`.
///
/// Dispatch happens after the append succeeds; a handler failure surfaces to
/// the caller but the events are already persisted, so projection handlers
/// must tolerate redelivery.
#[derive(Clone)]
pub struct PublishingStore<S> {
    inner: S,
    dispatcher: Arc<EventDispatcher>,
}

impl<S> PublishingStore<S> {
    pub fn new(inner: S, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { inner, dispatcher }
    }
}

#[async_trait]
impl<ST: AggregateStore> AggregateStore for PublishingStore<ST> {
    async fn load<S: AggregateState>(&self, aggregate: &mut AggregateRoot<S>) -> Result<()> {
        self.inner.load(aggregate).await
    }

    async fn save<S: AggregateState>(&self, aggregate: &mut AggregateRoot<S>) -> Result<()> {
        let pending = aggregate.uncommitted_events().to_vec();
        self.inner.save(aggregate).await?;
        self.dispatcher.publish(&pending).await
    }

    async fn exists(&self, stream_id: &str) -> Result<()> {
        self.inner.exists(stream_id).await
    }

    async fn delete_aggregate(&self, aggregate_type: &str, id: &str) -> Result<()> {
        self.inner.delete_aggregate(aggregate_type, id).await
    }

    async fn get_aggregate_type_entries(&self, aggregate_type: &str) -> Result<Vec<Entry>> {
        self.inner.get_aggregate_type_entries(aggregate_type).await
    }
}
