//! Sequential glue between the cloud device manager and the device records:
//! refresh every device, switch one relay, and rebuild the affected records.

use chrono::NaiveDate;

use crate::error::AppError;
use crate::manager::CloudDeviceManager;
use crate::models::abilities::Abilities;
use crate::models::device_info::DeviceInfo;
use crate::models::device_record::{DeviceMap, DeviceRecord, Telemetry};
use crate::models::energy::{consumption_on_day_before, ElectricityReading};
use crate::resolve::{resolve_target, DeviceSelector};

/// Channel whose relay state and metrics are reported in a record.
pub const PRIMARY_CHANNEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    On,
    Off,
}

impl PowerAction {
    pub fn is_on(&self) -> bool {
        matches!(self, PowerAction::On)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Keep the full daily history in `consumption`.
    pub history: bool,
    /// Local date used to pick "yesterday".
    pub today: NaiveDate,
}

impl RefreshOptions {
    pub fn new(history: bool) -> Self {
        Self {
            history,
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// What one invocation does against the cloud.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub refresh: bool,
    pub action: Option<PowerAction>,
    pub channel: u8,
    pub selector: DeviceSelector,
}

impl Plan {
    pub fn needs_cloud(&self) -> bool {
        self.refresh || self.action.is_some()
    }
}

/// Build the record for one device, tolerating per-attribute failures.
pub async fn refresh_one_device<M>(
    manager: &M,
    device: &DeviceInfo,
    options: &RefreshOptions,
) -> DeviceRecord
where
    M: CloudDeviceManager + ?Sized,
{
    let mut record = DeviceRecord::base(device);
    if !device.is_online() {
        return record;
    }

    let state = match manager.system_state(device).await {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(uuid = %device.uuid, error = %e, "could not read system state");
            None
        }
    };

    if let Some(ref state) = state {
        if state.is_online() == Some(false) {
            record.online = false;
            return record;
        }
        record.ip = state.inner_ip.clone().unwrap_or_default();
        record.mac = state.mac_address.clone().unwrap_or_default();
    }
    let onoff = state.and_then(|s| s.is_on(PRIMARY_CHANNEL));

    // Unknown abilities: try every reading and let it fail on its own.
    let abilities = match manager.abilities(device).await {
        Ok(abilities) => Some(abilities),
        Err(e) => {
            tracing::warn!(uuid = %device.uuid, error = %e, "could not read abilities");
            None
        }
    };
    let supports = |check: fn(&Abilities) -> bool| abilities.as_ref().map_or(true, check);

    let reading = if !supports(Abilities::has_electricity) {
        tracing::debug!(uuid = %device.uuid, "no electricity metering");
        ElectricityReading::UNAVAILABLE
    } else {
        match manager.instant_metrics(device, PRIMARY_CHANNEL).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(uuid = %device.uuid, error = %e, "could not read instant metrics");
                ElectricityReading::UNAVAILABLE
            }
        }
    };
    let mut telemetry = Telemetry::new(onoff, reading);

    if supports(Abilities::has_consumption) {
        match manager.daily_consumption(device).await {
            Ok(history) => {
                telemetry.consumption_yesterday =
                    consumption_on_day_before(&history, options.today);
                if options.history {
                    telemetry.consumption = history;
                }
            }
            Err(e) => {
                tracing::warn!(uuid = %device.uuid, error = %e, "could not read consumption history");
            }
        }
    }

    record.telemetry = Some(telemetry);
    record
}

/// Refresh every discovered device, keyed by uuid.
pub async fn refresh_all<M>(manager: &M, devices: &[DeviceInfo], options: &RefreshOptions) -> DeviceMap
where
    M: CloudDeviceManager + ?Sized,
{
    let mut records = DeviceMap::new();
    for device in devices {
        tracing::debug!(uuid = %device.uuid, name = %device.name(), "refreshing device");
        let record = refresh_one_device(manager, device, options).await;
        records.insert(device.uuid.clone(), record);
    }
    records
}

/// Switch one relay channel, then refresh that device into `records`.
///
/// The target is refreshed even when the switch is refused or fails, so
/// the caller can still report its state alongside the error.
pub async fn set_on_off<M>(
    manager: &M,
    devices: &[DeviceInfo],
    records: &mut DeviceMap,
    selector: &DeviceSelector,
    action: PowerAction,
    channel: u8,
    options: &RefreshOptions,
) -> Result<(), AppError>
where
    M: CloudDeviceManager + ?Sized,
{
    let target = resolve_target(devices, selector)?;

    let switched = if !target.is_online() {
        Err(AppError::DeviceOffline(target.name().to_string()))
    } else {
        tracing::debug!(uuid = %target.uuid, channel, ?action, "switching relay");
        manager.set_toggle(target, channel, action.is_on()).await
    };
    if let Err(ref e) = switched {
        tracing::warn!(uuid = %target.uuid, error = %e, "could not switch relay");
    }

    let record = refresh_one_device(manager, target, options).await;
    records.insert(target.uuid.clone(), record);
    switched
}

/// Records gathered by one run, plus the switch failure if there was one.
#[derive(Debug, Default)]
pub struct Outcome {
    pub records: DeviceMap,
    pub switch_error: Option<AppError>,
}

/// Discover, then refresh and/or switch as the plan says.
///
/// Only discovery failure aborts; a failed switch is carried in the outcome.
pub async fn execute<M>(
    manager: &mut M,
    plan: &Plan,
    options: &RefreshOptions,
) -> Result<Outcome, AppError>
where
    M: CloudDeviceManager + ?Sized,
{
    let mut outcome = Outcome::default();
    if !plan.needs_cloud() {
        return Ok(outcome);
    }

    let devices = manager.discover().await?;

    if plan.refresh {
        outcome.records = refresh_all(&*manager, &devices, options).await;
    }

    if let Some(action) = plan.action {
        outcome.switch_error = set_on_off(
            &*manager,
            &devices,
            &mut outcome.records,
            &plan.selector,
            action,
            plan.channel,
            options,
        )
        .await
        .err();
    }

    Ok(outcome)
}
