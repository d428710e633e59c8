use crate::{EsError, Result};

use super::Device;

/// The number of RUs a rack has when no size is specified.
pub const DEFAULT_RACK_SIZE: usize = 45;

/// A rack: a fixed-length sequence of RU slots, each either empty or
/// occupied by one device.
///
/// Elevations are 1-indexed from the bottom. A device with form factor `f`
/// placed at elevation `e` occupies elevations `e - f + 1 ..= e`: the
/// recorded elevation is the top of its run. Occupied runs never overlap,
/// and every slot of a run holds the same device index.
#[derive(Clone, Debug)]
pub struct Rack {
    pub id: String,
    /// The name of the rack.
    pub name: String,
    /// The number of total RUs the rack has.
    pub size: usize,
    /// The id of the datacenter this rack belongs to.
    pub datacenter_id: String,

    devices: Vec<Device>,
    // one entry per RU, holding an index into `devices` when occupied
    slots: Vec<Option<usize>>,
}

impl Rack {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            id: String::new(),
            name: name.to_lowercase(),
            size,
            datacenter_id: String::new(),
            devices: Vec::new(),
            slots: vec![None; size],
        }
    }

    /// Resizes the rack, clearing all placements. Used when replaying the
    /// rack's creation event onto a default-constructed rack.
    pub fn reset(&mut self, size: usize) {
        self.size = size;
        self.devices.clear();
        self.slots = vec![None; size];
    }

    /// The devices racked here, in placement order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// The device occupying the given elevation, if any.
    pub fn device_at(&self, elevation: usize) -> Option<&Device> {
        if elevation == 0 || elevation > self.size {
            return None;
        }
        self.slots[elevation - 1].map(|idx| &self.devices[idx])
    }

    /// Whether the run `[elevation - form_factor + 1, elevation]` exists and
    /// is fully open. This is the strict placement check: any occupied slot
    /// in that exact range invalidates it.
    pub fn can_fit_device_at(&self, form_factor: usize, elevation: usize) -> bool {
        if form_factor == 0 || elevation < form_factor || elevation > self.size {
            return false;
        }
        self.slots[elevation - form_factor..elevation]
            .iter()
            .all(Option::is_none)
    }

    /// Scans from the top of the rack downward and returns the highest
    /// elevation with a fully open run for the given form factor. The scan
    /// starts one slot below the top of the rack, so racks fill top-down.
    pub fn can_fit_device(&self, form_factor: usize) -> Option<usize> {
        if form_factor == 0 || self.size == 0 {
            return None;
        }
        (form_factor..self.size)
            .rev()
            .find(|&elevation| self.can_fit_device_at(form_factor, elevation))
    }

    /// Puts the device into the rack at the highest open elevation and
    /// returns the elevation it was placed at. There is no undo: callers
    /// must not place speculatively.
    pub fn rack_device(&mut self, device: Device) -> Result<usize> {
        let form_factor = device.model.form_factor;
        let elevation = self
            .can_fit_device(form_factor)
            .ok_or(EsError::UnableToFitDevice {
                form_factor,
                elevation: None,
            })?;
        self.place(device, elevation);
        Ok(elevation)
    }

    /// Like [`Self::rack_device`] but fails unless the device fits exactly
    /// at the passed elevation.
    pub fn rack_device_at(&mut self, device: Device, elevation: usize) -> Result<usize> {
        let form_factor = device.model.form_factor;
        if !self.can_fit_device_at(form_factor, elevation) {
            return Err(EsError::UnableToFitDevice {
                form_factor,
                elevation: Some(elevation),
            });
        }
        self.place(device, elevation);
        Ok(elevation)
    }

    fn place(&mut self, mut device: Device, elevation: usize) {
        let form_factor = device.model.form_factor;
        device.elevation = elevation;
        self.devices.push(device);
        let idx = self.devices.len() - 1;
        for slot in &mut self.slots[elevation - form_factor..elevation] {
            *slot = Some(idx);
        }
    }
}

impl Default for Rack {
    fn default() -> Self {
        Self::new("", DEFAULT_RACK_SIZE)
    }
}
