use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AppError;
use crate::models::device_info::DeviceInfo;
use crate::models::energy::{DailyConsumption, ElectricityReading};

/// Device records keyed by uuid.
pub type DeviceMap = BTreeMap<String, DeviceRecord>;

/// Flat per-device attributes produced by a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub name: String,
    pub uuid: String,
    pub ip: String,
    pub mac: String,
    pub online: bool,
    #[serde(rename = "type")]
    pub device_type: String,
    pub firmversion: String,
    pub hardversion: String,
    /// Only present for devices that were online during the refresh.
    #[serde(flatten)]
    pub telemetry: Option<Telemetry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// Channel 0 relay state; `null` when the device did not report it.
    pub onoff: Option<bool>,
    pub power: f64,
    pub voltage: f64,
    pub current: f64,
    pub consumption: Vec<DailyConsumption>,
    pub consumption_yesterday: f64,
}

impl Telemetry {
    pub fn new(onoff: Option<bool>, reading: ElectricityReading) -> Self {
        Self {
            onoff,
            power: reading.power,
            voltage: reading.voltage,
            current: reading.current,
            consumption: vec![],
            consumption_yesterday: 0.0,
        }
    }
}

impl DeviceRecord {
    /// Record with the attributes known from discovery alone.
    pub fn base(info: &DeviceInfo) -> Self {
        Self {
            name: info.name().to_string(),
            uuid: info.uuid.clone(),
            ip: String::new(),
            mac: String::new(),
            online: info.is_online(),
            device_type: info.device_type.clone().unwrap_or_default(),
            firmversion: info.firmware_version.clone().unwrap_or_default(),
            hardversion: info.hardware_version.clone().unwrap_or_default(),
            telemetry: None,
        }
    }

    pub fn power(&self) -> Option<f64> {
        self.telemetry.as_ref().map(|t| t.power)
    }

    pub fn consumption_yesterday(&self) -> Option<f64> {
        self.telemetry.as_ref().map(|t| t.consumption_yesterday)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, AppError> {
        // serde_json's default map is ordered, so keys come out sorted.
        Ok(serde_json::to_value(self)?)
    }
}
