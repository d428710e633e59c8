use crate::{
    AggregateRoot, AggregateState, EsError, Event, Result,
    datacenter::{Datacenter, Function, Pod},
    entity_id,
    events::v1,
    store::AggregateStore,
};

/// State of the pod aggregate.
#[derive(Debug, Default)]
pub struct PodState {
    pub pod: Pod,
}

impl AggregateState for PodState {
    const TYPE: &'static str = "pod";

    fn when(&mut self, event: &Event) -> Result<()> {
        match event.event_type.as_str() {
            v1::POD_CREATED => self.on_created(event),
            other => Err(EsError::InvalidEventType(other.to_string())),
        }
    }
}

impl PodState {
    fn on_created(&mut self, event: &Event) -> Result<()> {
        let data: v1::PodCreatedEvent = event.get_json_data()?;

        self.pod.id = entity_id(Self::TYPE, &event.aggregate_id);
        self.pod.function = data.function;
        self.pod.instance = data.instance;
        self.pod.datacenter_id = data.datacenter_id;
        self.pod.name = format!("{}{}", data.function, data.instance);
        Ok(())
    }
}

pub type PodAggregate = AggregateRoot<PodState>;

impl AggregateRoot<PodState> {
    /// Records the creation of the pod. The instance number is one past the
    /// datacenter's current count of pods with the same function.
    pub fn create_pod(&mut self, function: &str, datacenter: &Datacenter) -> Result<()> {
        if function.is_empty() {
            return Err(self.validation_error("function not specified"));
        }

        let parsed = Function::parse(function);
        if parsed == Function::Unspecified {
            return Err(self.validation_error(format!("invalid function specified: {function}")));
        }

        let instance = datacenter.num_pod_instances(parsed) + 1;

        let event = v1::new_pod_created_event(self, parsed, instance, &datacenter.id)?;
        self.apply(event)
    }
}

/// Loads the pod aggregate for the given entity id, replaying its stream.
pub async fn load_pod_aggregate(
    store: &impl AggregateStore,
    aggregate_id: &str,
) -> Result<PodAggregate> {
    let mut pod = PodAggregate::new(aggregate_id);
    store.load(&mut pod).await?;
    Ok(pod)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_derives_name_from_function_and_instance() {
        let mut datacenter = Datacenter::new("ash");
        datacenter.id = "dc1".to_string();
        datacenter.count_pod(Function::Service);

        let mut aggregate = PodAggregate::new("p1");
        aggregate.create_pod("svc", &datacenter).unwrap();

        let pod = &aggregate.state().pod;
        assert_eq!(pod.id, "p1");
        assert_eq!(pod.function, Function::Service);
        assert_eq!(pod.instance, 2);
        assert_eq!(pod.name, "service2");
        assert_eq!(pod.datacenter_id, "dc1");
        assert!(!pod.is_zero());
    }

    #[test]
    fn unknown_function_is_rejected() {
        let datacenter = Datacenter::new("ash");
        let mut aggregate = PodAggregate::new("p1");

        assert!(matches!(
            aggregate.create_pod("", &datacenter),
            Err(EsError::CommandValidation { .. })
        ));
        assert!(matches!(
            aggregate.create_pod("warehouse", &datacenter),
            Err(EsError::CommandValidation { .. })
        ));
        assert_eq!(aggregate.version(), 0);
    }
}
