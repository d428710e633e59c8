use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    AGGREGATE_START_VERSION, AggregateRoot, AggregateState, EsError, Event, Result, stream_id,
};

use super::{AggregateStore, Entry, EventStore};

/// An in-memory aggregate/event store keyed by stream id.
///
/// Streams are append-only; a save never rewrites previously appended
/// events. Cloning the store shares the underlying map, so one store can
/// back many command handlers. The map lock is held only for the duration
/// of a single map operation, never across awaits.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AggregateStore for InMemoryStore {
    async fn load<S: AggregateState>(&self, aggregate: &mut AggregateRoot<S>) -> Result<()> {
        let entry = {
            let entries = self.entries.lock().expect("store map lock poisoned");
            entries
                .get(aggregate.id())
                .cloned()
                .ok_or(EsError::AggregateNotFound)?
        };

        debug!(
            stream_id = aggregate.id(),
            version = entry.version,
            events = entry.event_stream.len(),
            "loading aggregate stream"
        );

        for event in entry.event_stream {
            aggregate.raise_event(event)?;
        }
        Ok(())
    }

    async fn save<S: AggregateState>(&self, aggregate: &mut AggregateRoot<S>) -> Result<()> {
        if aggregate.uncommitted_events().is_empty() {
            return Ok(());
        }

        let expected = aggregate.base_version();
        {
            let mut entries = self.entries.lock().expect("store map lock poisoned");
            match entries.get_mut(aggregate.id()) {
                Some(entry) => {
                    if entry.version != expected {
                        return Err(EsError::Concurrency {
                            aggregate_id: aggregate.id().to_string(),
                            expected,
                            actual: entry.version,
                        });
                    }
                    entry.event_stream.extend_from_slice(aggregate.uncommitted_events());
                    entry.version = aggregate.version();
                }
                None => {
                    if expected != AGGREGATE_START_VERSION {
                        return Err(EsError::Concurrency {
                            aggregate_id: aggregate.id().to_string(),
                            expected,
                            actual: AGGREGATE_START_VERSION,
                        });
                    }
                    entries.insert(
                        aggregate.id().to_string(),
                        Entry {
                            aggregate_id: aggregate.id().to_string(),
                            aggregate_type: aggregate.aggregate_type().to_string(),
                            version: aggregate.version(),
                            event_stream: aggregate.uncommitted_events().to_vec(),
                        },
                    );
                }
            }
        }

        debug!(
            stream_id = aggregate.id(),
            version = aggregate.version(),
            appended = aggregate.uncommitted_events().len(),
            "saved aggregate stream"
        );

        aggregate.commit_events();
        Ok(())
    }

    async fn exists(&self, stream_id: &str) -> Result<()> {
        let entries = self.entries.lock().expect("store map lock poisoned");
        if entries.contains_key(stream_id) {
            Ok(())
        } else {
            Err(EsError::AggregateNotFound)
        }
    }

    async fn delete_aggregate(&self, aggregate_type: &str, id: &str) -> Result<()> {
        let key = stream_id(aggregate_type, id);
        let mut entries = self.entries.lock().expect("store map lock poisoned");
        entries.remove(&key);
        Ok(())
    }

    async fn get_aggregate_type_entries(&self, aggregate_type: &str) -> Result<Vec<Entry>> {
        let entries = self.entries.lock().expect("store map lock poisoned");
        let mut matching: Vec<Entry> = entries
            .values()
            .filter(|entry| entry.aggregate_type == aggregate_type)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.aggregate_id.cmp(&b.aggregate_id));
        Ok(matching)
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn save_events(&self, events: &[Event]) -> Result<()> {
        let mut entries = self.entries.lock().expect("store map lock poisoned");
        for event in events {
            let entry = entries
                .entry(event.aggregate_id.clone())
                .or_insert_with(|| Entry {
                    aggregate_id: event.aggregate_id.clone(),
                    aggregate_type: event.aggregate_type.clone(),
                    version: AGGREGATE_START_VERSION,
                    event_stream: Vec::new(),
                });
            entry.version = entry.version.max(event.version);
            entry.event_stream.push(event.clone());
        }
        Ok(())
    }

    async fn load_events(&self, stream_id: &str) -> Result<Vec<Event>> {
        let entries = self.entries.lock().expect("store map lock poisoned");
        entries
            .get(stream_id)
            .map(|entry| entry.event_stream.clone())
            .ok_or(EsError::AggregateNotFound)
    }
}
