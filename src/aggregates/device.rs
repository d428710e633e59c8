use crate::{
    AggregateRoot, AggregateState, EsError, Event, Result,
    datacenter::{Designation, Device, DeviceTemplate, Function, HardwareModel, Pod, Rack},
    entity_id,
    events::v1,
    store::AggregateStore,
};

/// State of the device aggregate.
#[derive(Debug, Default)]
pub struct DeviceState {
    pub device: Device,
}

impl AggregateState for DeviceState {
    const TYPE: &'static str = "device";

    fn when(&mut self, event: &Event) -> Result<()> {
        match event.event_type.as_str() {
            v1::DEVICE_CREATED => self.on_created(event),
            other => Err(EsError::InvalidEventType(other.to_string())),
        }
    }
}

impl DeviceState {
    fn on_created(&mut self, event: &Event) -> Result<()> {
        let data: v1::DeviceCreatedEvent = event.get_json_data()?;

        self.device.id = entity_id(Self::TYPE, &event.aggregate_id);
        self.device.hostname = data.hostname;
        self.device.elevation = data.elevation;
        self.device.designation = data.designation;
        self.device.cluster = data.cluster;
        self.device.instance = data.instance;
        self.device.categories = data.categories;
        self.device.pod_id = data.pod_id;
        self.device.rack_id = data.rack_id;
        self.device.model = HardwareModel {
            id: data.model_id,
            ..Default::default()
        };
        Ok(())
    }
}

/// Everything a device creation needs from its collaborating aggregates.
/// The hostname arrives pre-rendered; template rendering lives outside this
/// crate.
pub struct DeviceSpec<'a> {
    pub template: &'a DeviceTemplate,
    pub rack: &'a Rack,
    pub pod: Option<&'a Pod>,
    pub hostname: &'a str,
    /// Zero means "place at the next available elevation, top-down".
    pub elevation: usize,
    pub cluster: usize,
    pub designation: &'a str,
    /// The number of device instances sharing this configuration,
    /// including this one.
    pub instance: usize,
}

pub type DeviceAggregate = AggregateRoot<DeviceState>;

impl AggregateRoot<DeviceState> {
    /// Records the creation of a device from a template, validating that it
    /// fits the target rack and is consistent with its pod.
    pub fn create_device(&mut self, spec: DeviceSpec<'_>) -> Result<()> {
        let form_factor = spec.template.model.form_factor;
        if form_factor == 0 {
            return Err(self.validation_error("template form factor not provided"));
        }
        if spec.hostname.is_empty() {
            return Err(self.validation_error("hostname not provided"));
        }
        if spec.instance == 0 {
            return Err(self.validation_error("instance number not provided"));
        }

        let elevation = if spec.elevation != 0 {
            if !spec.rack.can_fit_device_at(form_factor, spec.elevation) {
                return Err(EsError::UnableToFitDevice {
                    form_factor,
                    elevation: Some(spec.elevation),
                });
            }
            spec.elevation
        } else {
            spec.rack
                .can_fit_device(form_factor)
                .ok_or(EsError::UnableToFitDevice {
                    form_factor,
                    elevation: None,
                })?
        };

        let designation = if spec.designation.is_empty() {
            Designation::Unspecified
        } else {
            let parsed = Designation::parse(spec.designation);
            if parsed == Designation::Unspecified {
                return Err(self.validation_error(format!(
                    "invalid designation specified: {}",
                    spec.designation
                )));
            }
            parsed
        };

        let pod_id = match spec.pod {
            Some(pod) => {
                if spec.template.function != Function::Unspecified
                    && pod.function != spec.template.function
                {
                    return Err(self.validation_error(format!(
                        "pod function does not match function specified by template. pod: {}, template: {}",
                        pod.function, spec.template.function
                    )));
                }
                pod.id.clone()
            }
            None => String::new(),
        };

        let event = v1::new_device_created_event(
            self,
            v1::DeviceCreatedEvent {
                hostname: spec.hostname.to_string(),
                elevation,
                designation,
                cluster: spec.cluster,
                instance: spec.instance,
                model_id: spec.template.model.id.clone(),
                categories: spec.template.categories.clone(),
                pod_id,
                rack_id: spec.rack.id.clone(),
            },
        )?;
        self.apply(event)
    }
}

/// Loads the device aggregate for the given entity id, replaying its stream.
pub async fn load_device_aggregate(
    store: &impl AggregateStore,
    aggregate_id: &str,
) -> Result<DeviceAggregate> {
    let mut device = DeviceAggregate::new(aggregate_id);
    store.load(&mut device).await?;
    Ok(device)
}
