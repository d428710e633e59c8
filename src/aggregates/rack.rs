use crate::{
    AggregateRoot, AggregateState, EsError, Event, Result,
    datacenter::{DEFAULT_RACK_SIZE, Device, HardwareModel, Rack},
    entity_id,
    events::v1,
    store::AggregateStore,
};

/// State of the rack aggregate: the rack itself, including its slot map.
#[derive(Debug, Default)]
pub struct RackState {
    pub rack: Rack,
}

impl AggregateState for RackState {
    const TYPE: &'static str = "rack";

    fn when(&mut self, event: &Event) -> Result<()> {
        match event.event_type.as_str() {
            v1::RACK_CREATED => self.on_created(event),
            v1::DEVICE_RACKED => self.on_device_racked(event),
            other => Err(EsError::InvalidEventType(other.to_string())),
        }
    }
}

impl RackState {
    fn on_created(&mut self, event: &Event) -> Result<()> {
        let data: v1::RackCreatedEvent = event.get_json_data()?;

        self.rack.id = entity_id(Self::TYPE, &event.aggregate_id);
        self.rack.name = data.name;
        self.rack.reset(data.size);
        self.rack.datacenter_id = data.datacenter_id;
        Ok(())
    }

    fn on_device_racked(&mut self, event: &Event) -> Result<()> {
        let data: v1::DeviceRackedEvent = event.get_json_data()?;

        let device = Device {
            id: data.device_id,
            model: HardwareModel {
                form_factor: data.form_factor,
                ..Default::default()
            },
            ..Default::default()
        };

        if data.elevation == 0 {
            self.rack.rack_device(device)?;
        } else {
            self.rack.rack_device_at(device, data.elevation)?;
        }
        Ok(())
    }
}

pub type RackAggregate = AggregateRoot<RackState>;

impl AggregateRoot<RackState> {
    /// Records the creation of the rack. A zero size falls back to the
    /// default of 45 RUs.
    pub fn create_rack(&mut self, name: &str, size: usize, datacenter_id: &str) -> Result<()> {
        if name.is_empty() {
            return Err(self.validation_error("rack name not specified"));
        }
        let name = name.to_lowercase();

        let size = if size == 0 { DEFAULT_RACK_SIZE } else { size };

        if datacenter_id.is_empty() {
            return Err(self.validation_error("datacenterId not provided"));
        }

        let event = v1::new_rack_created_event(self, &name, size, datacenter_id)?;
        self.apply(event)
    }

    /// Places a device into the rack. A zero elevation means "next
    /// available, top-down"; a nonzero elevation must fit exactly there.
    pub fn add_device(
        &mut self,
        device_id: &str,
        elevation: usize,
        form_factor: usize,
    ) -> Result<()> {
        if device_id.is_empty() {
            return Err(self.validation_error("deviceId not provided"));
        }
        if form_factor == 0 {
            return Err(self.validation_error("device form factor not provided"));
        }

        let event = v1::new_device_racked_event(self, device_id, elevation, form_factor)?;
        self.apply(event)
    }
}

/// Loads the rack aggregate for the given entity id, replaying its stream.
pub async fn load_rack_aggregate(
    store: &impl AggregateStore,
    aggregate_id: &str,
) -> Result<RackAggregate> {
    let mut rack = RackAggregate::new(aggregate_id);
    store.load(&mut rack).await?;
    Ok(rack)
}
