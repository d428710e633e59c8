//! The five aggregate types of the inventory model. Each module owns its
//! state struct, its exhaustive `when` dispatch, its domain command methods
//! (one event per method), and a `load_*` helper that replays the persisted
//! stream.

pub mod datacenter;
pub mod device;
pub mod device_template;
pub mod pod;
pub mod rack;

pub use datacenter::{DatacenterAggregate, DatacenterState, load_datacenter_aggregate};
pub use device::{DeviceAggregate, DeviceSpec, DeviceState, load_device_aggregate};
pub use device_template::{
    DeviceTemplateAggregate, DeviceTemplateState, load_device_template_aggregate,
};
pub use pod::{PodAggregate, PodState, load_pod_aggregate};
pub use rack::{RackAggregate, RackState, load_rack_aggregate};
