use chrono::NaiveDate;
use serde::Serialize;

/// Instant electricity reading in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElectricityReading {
    pub power: f64,
    pub voltage: f64,
    pub current: f64,
}

impl ElectricityReading {
    /// Sentinel written to the record when the reading cannot be taken.
    pub const UNAVAILABLE: Self = Self {
        power: -1.0,
        voltage: -1.0,
        current: -1.0,
    };

    /// Parse an `Appliance.Control.Electricity` payload.
    ///
    /// Devices report milliwatts, decivolts and milliamps.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let data = payload.get("electricity")?;
        let field = |name: &str| data.get(name).and_then(|v| v.as_f64());
        Some(Self {
            power: field("power")? / 1000.0,
            voltage: field("voltage")? / 10.0,
            current: field("current")? / 1000.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyConsumption {
    pub date: NaiveDate,
    pub total_consumption_kwh: f64,
}

impl DailyConsumption {
    pub fn from_json(data: &serde_json::Value) -> Option<Self> {
        let date = data
            .get("date")
            .and_then(|v| v.as_str())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;
        let wh = data.get("value").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Some(Self {
            date,
            total_consumption_kwh: wh / 1000.0,
        })
    }

    /// Parse an `Appliance.Control.ConsumptionX` payload, skipping bad entries.
    pub fn list_from_payload(payload: &serde_json::Value) -> Vec<Self> {
        payload
            .get("consumptionx")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(Self::from_json).collect())
            .unwrap_or_default()
    }
}

/// kWh recorded for the day before `today`, or 0 when there is no entry.
pub fn consumption_on_day_before(history: &[DailyConsumption], today: NaiveDate) -> f64 {
    let Some(yesterday) = today.pred_opt() else {
        return 0.0;
    };
    history
        .iter()
        .find(|c| c.date == yesterday)
        .map(|c| c.total_consumption_kwh)
        .unwrap_or(0.0)
}
