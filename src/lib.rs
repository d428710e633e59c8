//! An event-sourced aggregate engine for datacenter inventory.
//!
//! Physical inventory (datacenters, racks, pods, devices, device templates)
//! is modeled as independently versioned aggregates persisted as event
//! streams. The engine half of the crate is domain-agnostic: a generic
//! [`AggregateRoot`] state machine, an [`AggregateStore`] contract with
//! optimistic concurrency, and an [`EventDispatcher`] that fans committed
//! events out to subscribers. The domain half builds the five inventory
//! aggregates on top of it, including rack-unit slot allocation for device
//! placement.
//!
//! The typical write path:
//!
//! 1. build a command and hand it to its handler in [`commands::v1`];
//! 2. the handler loads (or constructs) the target aggregate and calls one
//!    domain method, which validates and applies exactly one event;
//! 3. the handler saves the aggregate; the store enforces the expected
//!    stream version and appends the uncommitted events;
//! 4. a [`PublishingStore`] additionally publishes the appended events to
//!    the dispatcher for projections and other side effects.

pub mod aggregate;
pub mod aggregates;
pub mod command;
pub mod commands;
pub mod datacenter;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod events;
pub mod store;

pub use aggregate::{AGGREGATE_START_VERSION, AggregateRoot, AggregateState, entity_id, stream_id};
pub use command::Command;
pub use dispatcher::{EventDispatcher, EventHandler, EventHandlerFn};
pub use error::{EsError, Result};
pub use event::Event;
pub use store::{AggregateStore, Entry, EventStore, InMemoryStore, PublishingStore};
