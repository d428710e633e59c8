use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{EsError, Event, Result};

/// A handler for committed events, registered with an [`EventDispatcher`].
/// Projection writers and other side-effect handlers implement this.
///
/// A retried publish redelivers events, so handlers own their idempotence.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<()>;
}

/// Adapts a plain closure into an [`EventHandler`].
pub struct EventHandlerFn<F>(pub F);

#[async_trait]
impl<F> EventHandler for EventHandlerFn<F>
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    async fn handle_event(&self, event: &Event) -> Result<()> {
        (self.0)(event)
    }
}

/// In-process publish/subscribe fan-out of committed events, keyed by event
/// type.
///
/// Registration is append-only; handlers for a type run in registration
/// order. Dispatch is synchronous and fail-fast: the first handler error
/// aborts delivery of the remaining events and is returned to the caller.
/// Publish is not atomic across events and does not roll back earlier
/// successful deliveries. The lock guards the registration table only and
/// is never held across a delivery.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the given event type.
    pub fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().expect("handler table lock poisoned");
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    /// Delivers each event to every handler registered for its type,
    /// sequentially, in registration order.
    pub async fn publish(&self, events: &[Event]) -> Result<()> {
        for event in events {
            let subscribed = {
                let handlers = self.handlers.read().expect("handler table lock poisoned");
                handlers.get(&event.event_type).cloned().unwrap_or_default()
            };

            debug!(
                event_type = event.event_type,
                aggregate_id = event.aggregate_id,
                handlers = subscribed.len(),
                "dispatching event"
            );

            for handler in subscribed {
                handler.handle_event(event).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn event(event_type: &str, tag: &str) -> Event {
        Event::new(event_type, "rack", format!("rack-{tag}"), 1)
    }

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
        label: &'static str,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<()> {
            if self.fail_on == Some(event.aggregate_id.as_str()) {
                return Err(EsError::InvalidAggregate);
            }
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.aggregate_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            dispatcher.subscribe(
                "V1_RACK_CREATED",
                Arc::new(Recorder {
                    seen: seen.clone(),
                    label,
                    fail_on: None,
                }),
            );
        }

        dispatcher
            .publish(&[event("V1_RACK_CREATED", "r1")])
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:rack-r1", "second:rack-r1"]
        );
    }

    #[tokio::test]
    async fn first_handler_error_aborts_remaining_events() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe(
            "V1_RACK_CREATED",
            Arc::new(Recorder {
                seen: seen.clone(),
                label: "h",
                fail_on: Some("rack-r2"),
            }),
        );

        let err = dispatcher
            .publish(&[
                event("V1_RACK_CREATED", "r1"),
                event("V1_RACK_CREATED", "r2"),
                event("V1_RACK_CREATED", "r3"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, EsError::InvalidAggregate));
        // the first event was delivered, the third never was
        assert_eq!(*seen.lock().unwrap(), vec!["h:rack-r1"]);
    }

    #[tokio::test]
    async fn unsubscribed_types_are_ignored() {
        let dispatcher = EventDispatcher::new();
        dispatcher
            .publish(&[event("V1_RACK_CREATED", "r1")])
            .await
            .unwrap();
    }
}
