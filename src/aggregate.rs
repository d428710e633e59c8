use std::fmt::{self, Debug, Display, Formatter};

use crate::{EsError, Event, Result};

/// The version an aggregate has before any event was applied to it. The
/// first applied event is stamped `AGGREGATE_START_VERSION + 1`.
pub const AGGREGATE_START_VERSION: i64 = 0;

const APPLIED_EVENTS_INITIAL_CAP: usize = 10;
const UNCOMMITTED_EVENTS_INITIAL_CAP: usize = 10;

/// Builds the stream id of an aggregate instance from its type tag and
/// entity id. Stream ids are globally unique per type + instance.
pub fn stream_id(aggregate_type: &str, id: &str) -> String {
    format!("{aggregate_type}-{id}")
}

/// Strips the type prefix from a stream id, recovering the entity id.
pub fn entity_id(aggregate_type: &str, stream_id: &str) -> String {
    stream_id
        .strip_prefix(&format!("{aggregate_type}-"))
        .unwrap_or(stream_id)
        .to_string()
}

/// The domain half of an aggregate: a type tag plus the `when` function that
/// mutates type-specific state per event type.
///
/// `when` must be total over the aggregate's event-variant set: an
/// unrecognized event type is [`EsError::InvalidEventType`], never a silent
/// no-op. Implementations match on `event.event_type` and decode the payload
/// with [`Event::get_json_data`].
pub trait AggregateState: Debug + Default + Send + Sync {
    /// The aggregate type tag, also the stream-id prefix.
    const TYPE: &'static str;

    /// Applies one event to the domain state.
    fn when(&mut self, event: &Event) -> Result<()>;
}

/// Versioned, event-driven state machine; the unit of consistency.
///
/// `AggregateRoot` owns the version bookkeeping and the applied/uncommitted
/// event lists; the domain state `S` owns the type-specific fields and the
/// `when` dispatch. The same machine serves the write path ([`Self::apply`]:
/// new command, version = old + 1) and the replay path ([`Self::load`] /
/// [`Self::raise_event`]: stored stream, version carried by the event),
/// enforcing strict ordering in both directions.
#[derive(Debug)]
pub struct AggregateRoot<S: AggregateState> {
    id: String,
    version: i64,
    applied_events: Vec<Event>,
    uncommitted_events: Vec<Event>,
    with_applied_events: bool,
    state: S,
}

impl<S: AggregateState> AggregateRoot<S> {
    /// Creates an empty aggregate for the given entity id. The stream id is
    /// the entity id prefixed with the aggregate type tag.
    pub fn new(id: &str) -> Self {
        Self {
            id: stream_id(S::TYPE, id),
            version: AGGREGATE_START_VERSION,
            applied_events: Vec::with_capacity(APPLIED_EVENTS_INITIAL_CAP),
            uncommitted_events: Vec::with_capacity(UNCOMMITTED_EVENTS_INITIAL_CAP),
            with_applied_events: false,
            state: S::default(),
        }
    }

    /// The stream id of this aggregate instance.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The aggregate type tag.
    pub fn aggregate_type(&self) -> &'static str {
        S::TYPE
    }

    /// The current version of the aggregate.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// The version the persisted stream had when this instance was loaded,
    /// i.e. the expected version for an optimistic-concurrency check.
    pub fn base_version(&self) -> i64 {
        self.version - self.uncommitted_events.len() as i64
    }

    /// Read access to the domain state. Mutation happens only through
    /// `when`, driven by events.
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn applied_events(&self) -> &[Event] {
        &self.applied_events
    }

    pub fn uncommitted_events(&self) -> &[Event] {
        &self.uncommitted_events
    }

    /// Replaces the applied history wholesale. Used by stores when exporting
    /// or importing snapshots.
    pub fn set_applied_events(&mut self, events: Vec<Event>) {
        self.applied_events = events;
        self.with_applied_events = true;
    }

    pub fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }

    /// Builds a [`EsError::CommandValidation`] carrying this aggregate's
    /// stream id. Domain command methods use this for business-rule
    /// rejections.
    pub fn validation_error(&self, reason: impl Into<String>) -> EsError {
        EsError::CommandValidation {
            aggregate_id: self.id.clone(),
            reason: reason.into(),
        }
    }

    /// Constructs an event stamped with this aggregate's identity and
    /// current version. Domain event constructors start from here and fill
    /// in the payload.
    pub fn base_event(&self, event_type: impl Into<String>) -> Event {
        Event::new(event_type, S::TYPE, self.id.clone(), self.version)
    }

    /// Command path: validates the aggregate id, runs `when`, and on success
    /// stamps the event with the incremented version and buffers it as
    /// uncommitted.
    ///
    /// If `when` fails the event is discarded and neither the version nor
    /// the event lists change.
    pub fn apply(&mut self, mut event: Event) -> Result<()> {
        if event.aggregate_id != self.id {
            return Err(EsError::InvalidAggregateId);
        }

        event.aggregate_type = S::TYPE.to_string();
        self.state.when(&event)?;

        self.version += 1;
        event.version = self.version;
        self.uncommitted_events.push(event);
        Ok(())
    }

    /// Replay path: applies a persisted stream in order, advancing the
    /// version by one per event. Fails with [`EsError::InvalidAggregate`] on
    /// an aggregate-id mismatch and propagates any `when` error, leaving
    /// later events unapplied.
    pub fn load(&mut self, events: Vec<Event>) -> Result<()> {
        for event in events {
            if event.aggregate_id != self.id {
                return Err(EsError::InvalidAggregate);
            }

            self.state.when(&event)?;

            self.applied_events.push(event);
            self.with_applied_events = true;
            self.version += 1;
        }
        Ok(())
    }

    /// Replay variant for events that carry explicit version numbers
    /// assigned by the store. Requires `event.version` to be strictly
    /// greater than the current version, rejecting duplicates and
    /// out-of-order replays, and adopts the carried version on success.
    pub fn raise_event(&mut self, event: Event) -> Result<()> {
        if event.aggregate_id != self.id {
            return Err(EsError::InvalidAggregateId);
        }
        if self.version >= event.version {
            return Err(EsError::InvalidEventVersion);
        }

        self.state.when(&event)?;

        self.version = event.version;
        self.applied_events.push(event);
        self.with_applied_events = true;
        Ok(())
    }

    /// Absorbs the uncommitted buffer into the applied history. Called by
    /// stores after a successful save.
    pub fn commit_events(&mut self) {
        self.applied_events.append(&mut self.uncommitted_events);
        self.with_applied_events = true;
    }

    /// Folds uncommitted events into the applied history when the aggregate
    /// has prior history; an aggregate with no prior commits is just
    /// cleared, not snapshotted.
    pub fn to_snapshot(&mut self) {
        if self.with_applied_events {
            self.applied_events.append(&mut self.uncommitted_events);
        } else {
            self.uncommitted_events.clear();
        }
    }
}

impl<S: AggregateState> Display for AggregateRoot<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {{{}}}, Version: {{{}}}, Type: {{{}}}, AppliedEvents: {{{}}}, UncommittedEvents: {{{}}}",
            self.id,
            self.version,
            S::TYPE,
            self.applied_events.len(),
            self.uncommitted_events.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    const COUNTER_INCREMENTED: &str = "V1_COUNTER_INCREMENTED";

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct CounterIncremented {
        amount: i64,
    }

    #[derive(Debug, Default, PartialEq)]
    struct CounterState {
        total: i64,
    }

    impl AggregateState for CounterState {
        const TYPE: &'static str = "counter";

        fn when(&mut self, event: &Event) -> Result<()> {
            match event.event_type.as_str() {
                COUNTER_INCREMENTED => {
                    let data: CounterIncremented = event.get_json_data()?;
                    self.total += data.amount;
                    Ok(())
                }
                other => Err(EsError::InvalidEventType(other.to_string())),
            }
        }
    }

    type Counter = AggregateRoot<CounterState>;

    fn increment(aggregate: &Counter, amount: i64) -> Event {
        let mut event = aggregate.base_event(COUNTER_INCREMENTED);
        event
            .set_json_data(&CounterIncremented { amount })
            .unwrap();
        event
    }

    #[test]
    fn apply_stamps_gap_free_versions() {
        let mut counter = Counter::new("c1");
        assert_eq!(counter.version(), AGGREGATE_START_VERSION);

        for i in 0..5 {
            let event = increment(&counter, i);
            counter.apply(event).unwrap();
        }

        assert_eq!(counter.version(), 5);
        assert_eq!(counter.uncommitted_events().len(), 5);
        for (i, event) in counter.uncommitted_events().iter().enumerate() {
            assert_eq!(event.version, i as i64 + 1);
        }
        assert_eq!(counter.state().total, 10);
    }

    #[test]
    fn apply_rejects_foreign_aggregate_id() {
        let mut counter = Counter::new("c1");
        let other = Counter::new("c2");

        let event = increment(&other, 1);
        assert!(matches!(
            counter.apply(event),
            Err(EsError::InvalidAggregateId)
        ));
        assert_eq!(counter.version(), AGGREGATE_START_VERSION);
        assert!(counter.uncommitted_events().is_empty());
        assert!(counter.applied_events().is_empty());
    }

    #[test]
    fn failed_when_leaves_no_partial_mutation() {
        let mut counter = Counter::new("c1");
        let mut event = counter.base_event("V1_COUNTER_RENAMED");
        event.set_json_data(&CounterIncremented { amount: 1 }).unwrap();

        assert!(matches!(
            counter.apply(event),
            Err(EsError::InvalidEventType(_))
        ));
        assert_eq!(counter.version(), AGGREGATE_START_VERSION);
        assert!(counter.uncommitted_events().is_empty());
        assert_eq!(counter.state().total, 0);
    }

    #[test]
    fn load_rejects_foreign_stream() {
        let other = Counter::new("c2");
        let event = increment(&other, 1);

        let mut counter = Counter::new("c1");
        assert!(matches!(
            counter.load(vec![event]),
            Err(EsError::InvalidAggregate)
        ));
        assert!(counter.applied_events().is_empty());
    }

    #[test]
    fn replay_is_deterministic() {
        let mut source = Counter::new("c1");
        for i in 1..=4 {
            source.apply(increment(&source, i)).unwrap();
        }
        let stream: Vec<Event> = source.uncommitted_events().to_vec();

        let mut first = Counter::new("c1");
        first.load(stream.clone()).unwrap();
        let mut second = Counter::new("c1");
        second.load(stream).unwrap();

        assert_eq!(first.state(), second.state());
        assert_eq!(first.version(), second.version());
        assert_eq!(first.version(), 4);
        assert_eq!(first.applied_events().len(), 4);
    }

    #[test]
    fn raise_event_rejects_stale_versions() {
        let mut counter = Counter::new("c1");

        let mut event = increment(&counter, 2);
        event.version = 1;
        counter.raise_event(event.clone()).unwrap();
        assert_eq!(counter.version(), 1);
        assert_eq!(counter.state().total, 2);

        // same version again
        assert!(matches!(
            counter.raise_event(event.clone()),
            Err(EsError::InvalidEventVersion)
        ));

        // older version
        event.version = 0;
        assert!(matches!(
            counter.raise_event(event.clone()),
            Err(EsError::InvalidEventVersion)
        ));

        // gap-free catch-up is not required; a jump forward is accepted
        event.version = 7;
        counter.raise_event(event).unwrap();
        assert_eq!(counter.version(), 7);
    }

    #[test]
    fn commit_moves_uncommitted_into_applied() {
        let mut counter = Counter::new("c1");
        counter.apply(increment(&counter, 1)).unwrap();
        counter.apply(increment(&counter, 2)).unwrap();

        counter.commit_events();
        assert!(counter.uncommitted_events().is_empty());
        assert_eq!(counter.applied_events().len(), 2);
        assert_eq!(counter.version(), 2);
        assert_eq!(counter.base_version(), 2);
    }

    #[test]
    fn snapshot_folds_only_with_prior_history() {
        // brand-new aggregate: uncommitted events are discarded
        let mut fresh = Counter::new("c1");
        fresh.apply(increment(&fresh, 1)).unwrap();
        fresh.to_snapshot();
        assert!(fresh.uncommitted_events().is_empty());
        assert!(fresh.applied_events().is_empty());

        // aggregate with committed history: uncommitted events are folded in
        let mut seasoned = Counter::new("c2");
        seasoned.apply(increment(&seasoned, 1)).unwrap();
        seasoned.commit_events();
        seasoned.apply(increment(&seasoned, 2)).unwrap();
        seasoned.to_snapshot();
        assert!(seasoned.uncommitted_events().is_empty());
        assert_eq!(seasoned.applied_events().len(), 2);
    }

    #[test]
    fn stream_id_round_trip() {
        let counter = Counter::new("c1");
        assert_eq!(counter.id(), "counter-c1");
        assert_eq!(entity_id("counter", counter.id()), "c1");
    }
}
