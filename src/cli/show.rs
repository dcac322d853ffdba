use serde_json::Value;
use tabled::Tabled;

use crate::cli::output::render_table;
use crate::config::OutputMode;
use crate::error::AppError;
use crate::models::device_record::{DeviceMap, DeviceRecord};
use crate::resolve::{select, DeviceSelector, Selection};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "TYPE")]
    device_type: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "POWER")]
    power: String,
    #[tabled(rename = "YESTERDAY")]
    yesterday: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "UUID")]
    uuid: String,
}

impl From<&DeviceRecord> for DeviceRow {
    fn from(record: &DeviceRecord) -> Self {
        let telemetry = record.telemetry.as_ref();
        let status = match (record.online, telemetry.and_then(|t| t.onoff)) {
            (false, _) => "offline",
            (true, Some(true)) => "on",
            (true, Some(false)) => "off",
            (true, None) => "online",
        };
        Self {
            name: record.name.clone(),
            device_type: or_dash(&record.device_type),
            status: status.to_string(),
            power: telemetry
                .filter(|t| t.power >= 0.0)
                .map(|t| format!("{:.1} W", t.power))
                .unwrap_or_else(|| "-".into()),
            yesterday: telemetry
                .map(|t| format!("{:.3} kWh", t.consumption_yesterday))
                .unwrap_or_else(|| "-".into()),
            ip: or_dash(&record.ip),
            mac: or_dash(&record.mac),
            uuid: record.uuid.clone(),
        }
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Scalar output modes need exactly one device to read from.
pub fn validate(mode: OutputMode, selector: &DeviceSelector) -> Result<(), AppError> {
    match mode {
        OutputMode::Power | OutputMode::Yesterday if selector.is_empty() => {
            Err(AppError::InvalidInput(
                "--show_power and --show_yesterday need --name, --uuid or --mac".into(),
            ))
        }
        _ => Ok(()),
    }
}

/// Text to print for the chosen output mode, if any.
pub fn render(
    records: &DeviceMap,
    selector: &DeviceSelector,
    mode: OutputMode,
) -> Result<Option<String>, AppError> {
    if mode == OutputMode::Silent {
        return Ok(None);
    }
    validate(mode, selector)?;

    let selection = select(records, selector)?;
    let text = match (mode, selection) {
        (OutputMode::Power, Selection::One(record)) => {
            let power = record
                .power()
                .ok_or_else(|| AppError::DeviceOffline(record.name.clone()))?;
            (power.trunc() as i64).to_string()
        }
        (OutputMode::Yesterday, Selection::One(record)) => {
            let kwh = record
                .consumption_yesterday()
                .ok_or_else(|| AppError::DeviceOffline(record.name.clone()))?;
            (kwh.trunc() as i64).to_string()
        }
        (OutputMode::Json, selection) => {
            serde_json::to_string_pretty(&selection_json(selection)?)?
        }
        (OutputMode::Table, Selection::One(record)) => {
            render_table(&[DeviceRow::from(record)])
        }
        (OutputMode::Table, Selection::All(all)) => {
            let rows: Vec<DeviceRow> = all.values().map(DeviceRow::from).collect();
            render_table(&rows)
        }
        _ => return Ok(None),
    };
    Ok(Some(text))
}

/// `{uuid: record}` for one device, otherwise the whole mapping.
fn selection_json(selection: Selection<'_>) -> Result<Value, AppError> {
    let mut map = serde_json::Map::new();
    match selection {
        Selection::One(record) => {
            map.insert(record.uuid.clone(), record.to_json()?);
        }
        Selection::All(all) => {
            for (uuid, record) in all {
                map.insert(uuid.clone(), record.to_json()?);
            }
        }
    }
    Ok(Value::Object(map))
}
