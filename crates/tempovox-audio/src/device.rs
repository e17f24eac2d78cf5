//! Input device selection.
//!
//! Device names are resolved against the cpal host at open time. The
//! candidate ordering favours the ALSA "default" shim and the PipeWire
//! bridge before concrete hardware, which is the order that behaves best on
//! desktop Linux.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use tempovox_foundation::AudioError;

pub struct DeviceManager {
    host: Host,
    current_device: Option<Device>,
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
}

impl DeviceManager {
    pub fn new() -> Result<Self, AudioError> {
        Ok(Self {
            host: cpal::default_host(),
            current_device: None,
        })
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host.id()
    }

    pub fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        let default_name = self.default_input_device_name();
        let mut devices = Vec::new();

        if let Ok(inputs) = self.host.input_devices() {
            for device in inputs {
                if let Ok(name) = device.name() {
                    let is_default = default_name.as_deref() == Some(name.as_str());
                    devices.push(DeviceInfo { name, is_default });
                }
            }
        }

        devices
    }

    pub fn default_input_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Candidate names in priority order: ALSA "default", then "pipewire",
    /// then the OS default input, then everything else. No duplicates.
    pub fn candidate_device_names(&self) -> Vec<String> {
        let all = self.enumerate_devices();
        let mut out: Vec<String> = Vec::new();
        let mut push_unique = |name: String, out: &mut Vec<String>| {
            if !out.iter().any(|n| n == &name) {
                out.push(name);
            }
        };

        for shim in ["default", "pipewire"] {
            if all.iter().any(|d| d.name == shim) {
                push_unique(shim.to_string(), &mut out);
            }
        }
        if let Some(def) = self.default_input_device_name() {
            push_unique(def, &mut out);
        }
        for d in all {
            push_unique(d.name, &mut out);
        }

        out
    }

    pub fn open_device(&mut self, name: Option<&str>) -> Result<Device, AudioError> {
        if let Some(preferred) = name {
            if let Some(device) = self.find_device_by_name(preferred) {
                self.current_device = Some(device.clone());
                return Ok(device);
            }
            if let Some(device) = self
                .find_device_by_predicate(|n| n.to_lowercase().contains(&preferred.to_lowercase()))
            {
                tracing::warn!(
                    "device '{}' not found exactly, using closest match '{}'",
                    preferred,
                    device.name().unwrap_or_default()
                );
                self.current_device = Some(device.clone());
                return Ok(device);
            }
            // A named device that cannot be found is an error; silent
            // fallback would capture from the wrong microphone.
            return Err(AudioError::DeviceNotFound {
                name: Some(preferred.to_string()),
            });
        }

        for candidate in self.candidate_device_names() {
            if let Some(device) = self.find_device_by_name(&candidate) {
                self.current_device = Some(device.clone());
                return Ok(device);
            }
        }

        self.host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound { name: None })
            .map(|device| {
                self.current_device = Some(device.clone());
                device
            })
    }

    fn find_device_by_name(&self, name: &str) -> Option<Device> {
        self.find_device_by_predicate(|n| n == name)
    }

    fn find_device_by_predicate<F>(&self, pred: F) -> Option<Device>
    where
        F: Fn(&str) -> bool,
    {
        if let Ok(devices) = self.host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name() {
                    if pred(&name) {
                        return Some(device);
                    }
                }
            }
        }
        None
    }
}
