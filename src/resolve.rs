use crate::error::AppError;
use crate::models::device_info::DeviceInfo;
use crate::models::device_record::{DeviceMap, DeviceRecord};

/// Which device(s) the user asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub mac: Option<String>,
}

impl DeviceSelector {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.uuid.is_none() && self.mac.is_none()
    }

    /// Human-readable form of the selector that takes precedence.
    pub fn describe(&self) -> String {
        if let Some(ref name) = self.name {
            format!("name '{}'", name)
        } else if let Some(ref uuid) = self.uuid {
            format!("uuid '{}'", uuid)
        } else if let Some(ref mac) = self.mac {
            format!("MAC '{}'", mac)
        } else {
            "all devices".to_string()
        }
    }
}

/// Result of applying a selector to the device mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    One(&'a DeviceRecord),
    All(&'a DeviceMap),
}

pub fn find_by_name<'a>(records: &'a DeviceMap, name: &str) -> Option<&'a DeviceRecord> {
    records.values().find(|r| r.name == name)
}

pub fn find_by_uuid<'a>(records: &'a DeviceMap, uuid: &str) -> Option<&'a DeviceRecord> {
    records.values().find(|r| r.uuid == uuid)
}

/// MAC comparison ignores letter case.
pub fn find_by_mac<'a>(records: &'a DeviceMap, mac: &str) -> Option<&'a DeviceRecord> {
    records
        .values()
        .find(|r| !r.mac.is_empty() && r.mac.eq_ignore_ascii_case(mac))
}

/// Apply the selector: name, then uuid, then MAC; no selector means all.
pub fn select<'a>(
    records: &'a DeviceMap,
    selector: &DeviceSelector,
) -> Result<Selection<'a>, AppError> {
    let found = if let Some(ref name) = selector.name {
        find_by_name(records, name)
    } else if let Some(ref uuid) = selector.uuid {
        find_by_uuid(records, uuid)
    } else if let Some(ref mac) = selector.mac {
        find_by_mac(records, mac)
    } else {
        return Ok(Selection::All(records));
    };

    found
        .map(Selection::One)
        .ok_or_else(|| AppError::DeviceNotFound(selector.describe()))
}

/// Pick the discovered device to switch: uuid first, then name.
pub fn resolve_target<'a>(
    devices: &'a [DeviceInfo],
    selector: &DeviceSelector,
) -> Result<&'a DeviceInfo, AppError> {
    validate_switch_selector(selector)?;

    let found = if let Some(ref uuid) = selector.uuid {
        devices.iter().find(|d| &d.uuid == uuid)
    } else if let Some(ref name) = selector.name {
        devices.iter().find(|d| d.dev_name.as_deref() == Some(name.as_str()))
    } else {
        None
    };

    found.ok_or_else(|| {
        let key = match (&selector.uuid, &selector.name) {
            (Some(uuid), _) => format!("uuid '{}'", uuid),
            (None, Some(name)) => format!("name '{}'", name),
            (None, None) => selector.describe(),
        };
        AppError::DeviceNotFound(key)
    })
}

/// Switching needs a name or uuid; a MAC is only known after a refresh.
pub fn validate_switch_selector(selector: &DeviceSelector) -> Result<(), AppError> {
    if selector.name.is_some() || selector.uuid.is_some() {
        return Ok(());
    }
    if selector.mac.is_some() {
        return Err(AppError::InvalidInput(
            "Selecting a device by MAC alone is not supported for --set_on/--set_off; use --name or --uuid".into(),
        ));
    }
    Err(AppError::InvalidInput(
        "Need at least --name, --uuid or --mac to switch a smart plug on or off".into(),
    ))
}
