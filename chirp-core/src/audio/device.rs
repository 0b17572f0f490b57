//! Audio input device enumeration and selection.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Metadata about an audio input device, as reported to remote clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable enumeration index, usable as a [`DeviceSelector::Index`].
    pub id: usize,
    /// Human-readable device name reported by the OS.
    pub name: String,
    /// Maximum number of input channels.
    pub inputs: u16,
    /// Default sample rate in Hz.
    pub samplerate: u32,
}

/// Which input device a session should capture from.
///
/// On the wire this is either the string `"default"` or an integer index
/// into the `/devices` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    #[default]
    Default,
    Index(usize),
}

impl Serialize for DeviceSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeviceSelector::Default => serializer.serialize_str("default"),
            DeviceSelector::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(usize),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Index(index) => Ok(DeviceSelector::Index(index)),
            Raw::Name(name) if name == "default" => Ok(DeviceSelector::Default),
            Raw::Name(other) => Err(de::Error::custom(format!(
                "expected \"default\" or a device index, got {other:?}"
            ))),
        }
    }
}

/// List all available audio input devices on the system.
///
/// Returns an empty `Vec` if cpal is unavailable or no input device exists.
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices
            .enumerate()
            .map(|(id, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("Input Device {}", id + 1));
                let (inputs, samplerate) = device
                    .default_input_config()
                    .map(|config| (config.channels(), config.sample_rate().0))
                    .unwrap_or((0, 0));
                DeviceInfo {
                    id,
                    name,
                    inputs,
                    samplerate,
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("failed to enumerate input devices: {e}");
            vec![]
        }
    }
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    vec![]
}

#[cfg(test)]
mod tests {
    use super::DeviceSelector;

    #[test]
    fn selector_deserializes_default_keyword_and_index() {
        let default: DeviceSelector = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(default, DeviceSelector::Default);

        let indexed: DeviceSelector = serde_json::from_str("3").unwrap();
        assert_eq!(indexed, DeviceSelector::Index(3));

        assert!(serde_json::from_str::<DeviceSelector>("\"builtin\"").is_err());
    }

    #[test]
    fn selector_round_trips() {
        let json = serde_json::to_string(&DeviceSelector::Index(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&DeviceSelector::Default).unwrap();
        assert_eq!(json, "\"default\"");
    }
}
