//! Plain domain values for physical datacenter inventory. These carry no
//! versioning of their own; the aggregates in [`crate::aggregates`] mutate
//! them through events.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

pub mod rack;

pub use rack::{DEFAULT_RACK_SIZE, Rack};

/// The role a pod (or a device template) serves in the datacenter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    #[default]
    Unspecified,
    Compute,
    Edge,
    Service,
    Storage,
}

impl Function {
    /// Parses the passed string into a `Function`. `Unspecified` is returned
    /// if the input doesn't match any valid value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "compute" | "cpu" => Self::Compute,
            "edge" => Self::Edge,
            "service" | "svc" => Self::Service,
            "storage" | "strg" => Self::Storage,
            _ => Self::Unspecified,
        }
    }

    /// The abbreviated form of the function.
    pub fn abv(&self) -> &'static str {
        match self {
            Self::Compute => "cpu",
            Self::Edge => "edge",
            Self::Service => "svc",
            Self::Storage => "strg",
            Self::Unspecified => "n/a",
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unspecified => "unspecified",
            Self::Compute => "compute",
            Self::Edge => "edge",
            Self::Service => "service",
            Self::Storage => "storage",
        };
        write!(f, "{s}")
    }
}

/// The designation given to a device (primary/secondary/unspecified).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Designation {
    #[default]
    Unspecified,
    Primary,
    Secondary,
}

impl Designation {
    /// Parses the passed string into a `Designation`. `Unspecified` is
    /// returned if the input doesn't match any valid value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "primary" | "a" => Self::Primary,
            "secondary" | "b" => Self::Secondary,
            _ => Self::Unspecified,
        }
    }

    /// The alphabetic representation of the designation: primary is `a`,
    /// secondary is `b`, unspecified is `o`.
    pub fn alpha(&self) -> &'static str {
        match self {
            Self::Primary => "a",
            Self::Secondary => "b",
            Self::Unspecified => "o",
        }
    }
}

/// The hardware model a device or template is built on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareModel {
    /// The unique identifier for the hardware model.
    pub id: String,
    pub pid: String,
    /// The number of consecutive RUs a device of this model occupies.
    pub form_factor: usize,
    pub weight: f32,
}

/// A datacenter: a site/building/room plus the racks and pods in it.
#[derive(Clone, Debug, Default)]
pub struct Datacenter {
    pub id: String,
    /// The site name of the datacenter.
    pub site: String,
    pub building: String,
    pub room: String,
    /// Provider transfer speeds, stored as raw strings; unit parsing is the
    /// caller's concern.
    pub providers: HashMap<String, String>,

    pub racks: Vec<Rack>,
    pub pods: Vec<Pod>,

    // tracks the number of pod instances per function in the datacenter
    pod_instances: HashMap<Function, usize>,
}

impl Datacenter {
    pub fn new(site: &str) -> Self {
        Self {
            site: site.to_lowercase(),
            ..Default::default()
        }
    }

    /// Returns the number of pod instances with the passed function.
    pub fn num_pod_instances(&self, function: Function) -> usize {
        self.pod_instances.get(&function).copied().unwrap_or(0)
    }

    /// Bumps the instance counter for pods of the passed function.
    pub fn count_pod(&mut self, function: Function) {
        *self.pod_instances.entry(function).or_insert(0) += 1;
    }
}

/// A logical grouping of devices sharing a function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pod {
    pub id: String,
    /// The function name concatenated with the instance number, e.g.
    /// `service1`.
    pub name: String,
    /// The number of pods with a shared function in the same datacenter.
    pub instance: usize,
    /// Pods cannot keep a `Function::Unspecified` value past creation.
    pub function: Function,
    /// The id of the datacenter the pod belongs to.
    pub datacenter_id: String,
}

impl Pod {
    pub fn is_zero(&self) -> bool {
        self.function == Function::Unspecified
    }
}

/// A racked (or rackable) device.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Device {
    pub id: String,
    pub hostname: String,
    /// The top RU this device occupies, 1-indexed from the bottom of the
    /// rack. Zero means "not yet racked".
    pub elevation: usize,
    pub designation: Designation,
    /// The cluster number of the device; zero is unclustered.
    pub cluster: usize,
    /// The number of device instances with the same configuration.
    pub instance: usize,
    pub model: HardwareModel,
    pub categories: Vec<String>,
    /// The id of the pod this device belongs to, when any.
    pub pod_id: String,
    /// The id of the rack this device is located in.
    pub rack_id: String,
}

/// A reusable recipe for creating devices of one hardware model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceTemplate {
    /// The variant of the hardware model this template produces.
    pub variant: String,
    /// The categories associated with devices created from this template.
    pub categories: Vec<String>,
    /// A template string for generating hostnames; rendering is the
    /// caller's concern.
    pub hostname_template: String,
    /// An alias used to reference this template.
    pub alias: String,
    pub function: Function,
    pub model: HardwareModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_parsing_is_lenient() {
        assert_eq!(Function::parse("CPU"), Function::Compute);
        assert_eq!(Function::parse("svc"), Function::Service);
        assert_eq!(Function::parse("warehouse"), Function::Unspecified);
        assert_eq!(Function::Storage.abv(), "strg");
        assert_eq!(Function::Service.to_string(), "service");
    }

    #[test]
    fn designation_parsing_is_lenient() {
        assert_eq!(Designation::parse("A"), Designation::Primary);
        assert_eq!(Designation::parse("b"), Designation::Secondary);
        assert_eq!(Designation::parse("tertiary"), Designation::Unspecified);
        assert_eq!(Designation::Primary.alpha(), "a");
    }

    #[test]
    fn pod_instance_counters() {
        let mut dc = Datacenter::new("ASH");
        assert_eq!(dc.site, "ash");
        assert_eq!(dc.num_pod_instances(Function::Service), 0);

        dc.count_pod(Function::Service);
        dc.count_pod(Function::Service);
        dc.count_pod(Function::Compute);
        assert_eq!(dc.num_pod_instances(Function::Service), 2);
        assert_eq!(dc.num_pod_instances(Function::Compute), 1);
        assert_eq!(dc.num_pod_instances(Function::Storage), 0);
    }

    #[test]
    fn function_serializes_as_lowercase_string() {
        let json = serde_json::to_string(&Function::Storage).unwrap();
        assert_eq!(json, "\"storage\"");
        let back: Function = serde_json::from_str("\"unspecified\"").unwrap();
        assert_eq!(back, Function::Unspecified);
    }
}
