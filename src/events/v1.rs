use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    AggregateRoot, AggregateState, Event, Result,
    datacenter::{Designation, Function},
};

pub const DATACENTER_CREATED: &str = "V1_DATACENTER_CREATED";
pub const POD_CREATED: &str = "V1_POD_CREATED";
pub const DATACENTER_POD_ADDED: &str = "V1_DATACENTER_POD_ADDED";
pub const RACK_CREATED: &str = "V1_RACK_CREATED";
pub const DATACENTER_RACK_ADDED: &str = "V1_DATACENTER_RACK_ADDED";
pub const DEVICE_CREATED: &str = "V1_DEVICE_CREATED";
pub const DEVICE_RACKED: &str = "V1_DEVICE_RACKED";
pub const DEVICE_TEMPLATE_CREATED: &str = "V1_DEVICE_TEMPLATE_CREATED";

fn new_event<S, T>(aggregate: &AggregateRoot<S>, event_type: &str, data: &T) -> Result<Event>
where
    S: AggregateState,
    T: Serialize,
{
    let mut event = aggregate.base_event(event_type);
    event.set_json_data(data)?;
    Ok(event)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatacenterCreatedEvent {
    pub site: String,
    pub building: String,
    pub room: String,
    /// Provider transfer speeds, raw strings keyed by provider name.
    pub providers: HashMap<String, String>,
}

pub fn new_datacenter_created_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    site: &str,
    building: &str,
    room: &str,
    providers: HashMap<String, String>,
) -> Result<Event> {
    let data = DatacenterCreatedEvent {
        site: site.to_string(),
        building: building.to_string(),
        room: room.to_string(),
        providers,
    };
    new_event(aggregate, DATACENTER_CREATED, &data)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PodCreatedEvent {
    pub function: Function,
    pub instance: usize,
    #[serde(rename = "datacenterId")]
    pub datacenter_id: String,
}

pub fn new_pod_created_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    function: Function,
    instance: usize,
    datacenter_id: &str,
) -> Result<Event> {
    let data = PodCreatedEvent {
        function,
        instance,
        datacenter_id: datacenter_id.to_string(),
    };
    new_event(aggregate, POD_CREATED, &data)
}

/// Carries the pod's function alongside its id so the datacenter aggregate
/// can maintain its per-function instance counters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatacenterPodAddedEvent {
    #[serde(rename = "podId")]
    pub pod_id: String,
    pub function: Function,
}

pub fn new_datacenter_pod_added_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    pod_id: &str,
    function: Function,
) -> Result<Event> {
    let data = DatacenterPodAddedEvent {
        pod_id: pod_id.to_string(),
        function,
    };
    new_event(aggregate, DATACENTER_POD_ADDED, &data)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RackCreatedEvent {
    pub name: String,
    pub size: usize,
    #[serde(rename = "datacenterId")]
    pub datacenter_id: String,
}

pub fn new_rack_created_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    name: &str,
    size: usize,
    datacenter_id: &str,
) -> Result<Event> {
    let data = RackCreatedEvent {
        name: name.to_string(),
        size,
        datacenter_id: datacenter_id.to_string(),
    };
    new_event(aggregate, RACK_CREATED, &data)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatacenterRackAddedEvent {
    #[serde(rename = "rackId")]
    pub rack_id: String,
}

pub fn new_datacenter_rack_added_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    rack_id: &str,
) -> Result<Event> {
    let data = DatacenterRackAddedEvent {
        rack_id: rack_id.to_string(),
    };
    new_event(aggregate, DATACENTER_RACK_ADDED, &data)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCreatedEvent {
    pub hostname: String,
    pub elevation: usize,
    pub designation: Designation,
    pub cluster: usize,
    pub instance: usize,
    #[serde(rename = "modelId")]
    pub model_id: String,
    pub categories: Vec<String>,
    #[serde(rename = "podId")]
    pub pod_id: String,
    #[serde(rename = "rackId")]
    pub rack_id: String,
}

pub fn new_device_created_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    data: DeviceCreatedEvent,
) -> Result<Event> {
    new_event(aggregate, DEVICE_CREATED, &data)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceRackedEvent {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Zero means "place at the next available elevation".
    pub elevation: usize,
    #[serde(rename = "formFactor")]
    pub form_factor: usize,
}

pub fn new_device_racked_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    device_id: &str,
    elevation: usize,
    form_factor: usize,
) -> Result<Event> {
    let data = DeviceRackedEvent {
        device_id: device_id.to_string(),
        elevation,
        form_factor,
    };
    new_event(aggregate, DEVICE_RACKED, &data)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceTemplateCreatedEvent {
    #[serde(rename = "modelId")]
    pub model_id: String,
    /// Slot footprint of the model, in rack units. Carried on the template
    /// so device placement never needs the hardware catalog.
    #[serde(rename = "formFactor")]
    pub form_factor: usize,
    pub variant: String,
    pub categories: Vec<String>,
    #[serde(rename = "hostnameTemplate")]
    pub hostname_template: String,
    pub alias: String,
    pub function: Function,
}

pub fn new_device_template_created_event<S: AggregateState>(
    aggregate: &AggregateRoot<S>,
    data: DeviceTemplateCreatedEvent,
) -> Result<Event> {
    new_event(aggregate, DEVICE_TEMPLATE_CREATED, &data)
}
