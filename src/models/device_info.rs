use serde::{Deserialize, Serialize};

/// `onlineStatus` value of a reachable device.
pub const ONLINE_STATUS_ONLINE: i32 = 1;

/// One entry of the cloud device list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub uuid: String,
    pub dev_name: Option<String>,
    pub online_status: Option<i32>,
    pub device_type: Option<String>,
    pub sub_type: Option<String>,
    #[serde(rename = "fmwareVersion")]
    pub firmware_version: Option<String>,
    #[serde(rename = "hdwareVersion")]
    pub hardware_version: Option<String>,
    pub region: Option<String>,
    pub domain: Option<String>,
    #[serde(default)]
    pub channels: Vec<serde_json::Value>,
}

impl DeviceInfo {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn name(&self) -> &str {
        self.dev_name.as_deref().unwrap_or("Unknown")
    }

    pub fn is_online(&self) -> bool {
        self.online_status == Some(ONLINE_STATUS_ONLINE)
    }
}
