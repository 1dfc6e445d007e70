use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// UDP port the fan listens on for command datagrams.
pub const CONTROL_PORT: u16 = 5600;

pub const MANUFACTURER: &str = "Atomberg";
pub const MODEL: &str = "Aria";
pub const SERIAL_NUMBER: &str = "Default-Serial";

#[derive(
    Copy, Clone, Debug, Default, Display, EnumString, PartialEq, Eq, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PowerState {
    On,
    #[default]
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { PowerState::On } else { PowerState::Off }
    }
}

impl From<PowerState> for bool {
    fn from(state: PowerState) -> Self {
        state.is_on()
    }
}

/// Static descriptive metadata presented to the host for each accessory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessoryInformation {
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial_number: &'static str,
}

impl AccessoryInformation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: MANUFACTURER,
            model: MODEL,
            serial_number: SERIAL_NUMBER,
        }
    }
}
