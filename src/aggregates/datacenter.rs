use std::collections::HashMap;

use crate::{
    AggregateRoot, AggregateState, EsError, Event, Result,
    datacenter::{Datacenter, Function, Pod, Rack},
    entity_id,
    events::v1,
    store::AggregateStore,
};

/// State of the datacenter aggregate: the site record plus the pods and
/// racks registered to it.
#[derive(Debug, Default)]
pub struct DatacenterState {
    pub datacenter: Datacenter,
}

impl AggregateState for DatacenterState {
    const TYPE: &'static str = "datacenter";

    fn when(&mut self, event: &Event) -> Result<()> {
        match event.event_type.as_str() {
            v1::DATACENTER_CREATED => self.on_created(event),
            v1::DATACENTER_POD_ADDED => self.on_pod_added(event),
            v1::DATACENTER_RACK_ADDED => self.on_rack_added(event),
            other => Err(EsError::InvalidEventType(other.to_string())),
        }
    }
}

impl DatacenterState {
    fn on_created(&mut self, event: &Event) -> Result<()> {
        let data: v1::DatacenterCreatedEvent = event.get_json_data()?;

        self.datacenter.id = entity_id(Self::TYPE, &event.aggregate_id);
        self.datacenter.site = data.site;
        self.datacenter.building = data.building;
        self.datacenter.room = data.room;
        self.datacenter.providers = data.providers;
        Ok(())
    }

    fn on_pod_added(&mut self, event: &Event) -> Result<()> {
        let data: v1::DatacenterPodAddedEvent = event.get_json_data()?;

        let pod = Pod {
            id: data.pod_id,
            function: data.function,
            datacenter_id: self.datacenter.id.clone(),
            ..Default::default()
        };
        self.datacenter.count_pod(data.function);
        self.datacenter.pods.push(pod);
        Ok(())
    }

    fn on_rack_added(&mut self, event: &Event) -> Result<()> {
        let data: v1::DatacenterRackAddedEvent = event.get_json_data()?;

        let mut rack = Rack::default();
        rack.id = data.rack_id;
        rack.datacenter_id = self.datacenter.id.clone();
        self.datacenter.racks.push(rack);
        Ok(())
    }
}

pub type DatacenterAggregate = AggregateRoot<DatacenterState>;

impl AggregateRoot<DatacenterState> {
    /// Records the creation of the datacenter. Provider transfer speeds are
    /// kept as raw strings; validating them against a unit table is the
    /// composition root's concern.
    pub fn create_datacenter(
        &mut self,
        site: &str,
        building: &str,
        room: &str,
        providers: HashMap<String, String>,
    ) -> Result<()> {
        if site.is_empty() {
            return Err(self.validation_error("site not specified"));
        }
        let site = site.to_lowercase();
        let building = building.to_lowercase();
        let room = room.to_lowercase();

        let providers = providers
            .into_iter()
            .map(|(provider, speed)| (provider.to_lowercase(), speed))
            .collect();

        let event = v1::new_datacenter_created_event(self, &site, &building, &room, providers)?;
        self.apply(event)
    }

    /// Registers a pod with the datacenter, bumping the per-function
    /// instance counter.
    pub fn add_pod(&mut self, pod_id: &str, function: Function) -> Result<()> {
        if pod_id.is_empty() {
            return Err(self.validation_error("podId not provided"));
        }

        let event = v1::new_datacenter_pod_added_event(self, pod_id, function)?;
        self.apply(event)
    }

    /// Registers a rack with the datacenter.
    pub fn add_rack(&mut self, rack_id: &str) -> Result<()> {
        if rack_id.is_empty() {
            return Err(self.validation_error("rackId not provided"));
        }

        let event = v1::new_datacenter_rack_added_event(self, rack_id)?;
        self.apply(event)
    }
}

/// Loads the datacenter aggregate for the given entity id, replaying its
/// stream.
pub async fn load_datacenter_aggregate(
    store: &impl AggregateStore,
    aggregate_id: &str,
) -> Result<DatacenterAggregate> {
    let mut datacenter = DatacenterAggregate::new(aggregate_id);
    store.load(&mut datacenter).await?;
    Ok(datacenter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_lowercases_and_records_fields() {
        let mut aggregate = DatacenterAggregate::new("dc1");
        let providers = HashMap::from([("Lumen".to_string(), "100Gbps".to_string())]);
        aggregate
            .create_datacenter("ASH", "B2", "R7", providers)
            .unwrap();

        let dc = &aggregate.state().datacenter;
        assert_eq!(dc.id, "dc1");
        assert_eq!(dc.site, "ash");
        assert_eq!(dc.building, "b2");
        assert_eq!(dc.room, "r7");
        assert_eq!(dc.providers.get("lumen").map(String::as_str), Some("100Gbps"));
    }

    #[test]
    fn missing_site_is_rejected() {
        let mut aggregate = DatacenterAggregate::new("dc1");
        assert!(matches!(
            aggregate.create_datacenter("", "b", "r", HashMap::new()),
            Err(EsError::CommandValidation { .. })
        ));
        assert_eq!(aggregate.version(), 0);
    }

    #[test]
    fn pods_and_racks_register_with_counters() {
        let mut aggregate = DatacenterAggregate::new("dc1");
        aggregate
            .create_datacenter("ash", "b2", "r7", HashMap::new())
            .unwrap();

        aggregate.add_pod("p1", Function::Service).unwrap();
        aggregate.add_pod("p2", Function::Service).unwrap();
        aggregate.add_pod("p3", Function::Compute).unwrap();
        aggregate.add_rack("r1").unwrap();

        let dc = &aggregate.state().datacenter;
        assert_eq!(dc.pods.len(), 3);
        assert_eq!(dc.racks.len(), 1);
        assert_eq!(dc.num_pod_instances(Function::Service), 2);
        assert_eq!(dc.num_pod_instances(Function::Compute), 1);
        assert_eq!(dc.racks[0].id, "r1");
        assert_eq!(dc.racks[0].datacenter_id, "dc1");
        assert_eq!(aggregate.version(), 5);
    }

    #[test]
    fn empty_child_ids_are_rejected() {
        let mut aggregate = DatacenterAggregate::new("dc1");
        aggregate
            .create_datacenter("ash", "b2", "r7", HashMap::new())
            .unwrap();

        assert!(matches!(
            aggregate.add_pod("", Function::Service),
            Err(EsError::CommandValidation { .. })
        ));
        assert!(matches!(
            aggregate.add_rack(""),
            Err(EsError::CommandValidation { .. })
        ));
        assert_eq!(aggregate.version(), 1);
    }
}
