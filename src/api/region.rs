use clap::ValueEnum;
use serde::Serialize;

/// Which regional Meross cloud an account lives in.
///
/// Sign-in on the wrong region is answered with a redirect, so the default
/// only costs one extra round trip for accounts elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Eu,
    Us,
    Ap,
}

impl Region {
    pub fn host(&self) -> &'static str {
        match self {
            Region::Eu => "https://iotx-eu.meross.com",
            Region::Us => "https://iotx-us.meross.com",
            Region::Ap => "https://iotx-ap.meross.com",
        }
    }

    /// MQTT broker used when the sign-in response carries no `mqttDomain`.
    pub fn mqtt_host(&self) -> &'static str {
        match self {
            Region::Eu => "mqtt-eu.meross.com",
            Region::Us => "mqtt-us.meross.com",
            Region::Ap => "mqtt-ap.meross.com",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Region::Eu => "eu",
            Region::Us => "us",
            Region::Ap => "ap",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// App-level signing secret shipped in the official Meross app.
/// It identifies the client, not the user, and is public knowledge.
pub const APP_SECRET: &str = "23x17ahWarFH6w29";

pub const APP_TYPE: &str = "MerossIOT";
pub const APP_VERSION: &str = "0.4.4.4";
pub const USER_AGENT: &str = "MerossIOT/0.4.4.4";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region_is_eu() {
        assert_eq!(Region::default(), Region::Eu);
        assert_eq!(Region::default().host(), "https://iotx-eu.meross.com");
    }

    #[test]
    fn test_display() {
        assert_eq!(Region::Us.to_string(), "us");
        assert_eq!(Region::Ap.mqtt_host(), "mqtt-ap.meross.com");
    }
}
