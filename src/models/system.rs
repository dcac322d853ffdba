use serde::Serialize;

use super::device_info::ONLINE_STATUS_ONLINE;

/// The parts of an `Appliance.System.All` reply the bridge reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemState {
    pub inner_ip: Option<String>,
    pub mac_address: Option<String>,
    pub online_status: Option<i32>,
    /// Relay state per channel, from the toggle digest.
    pub channels: Vec<ChannelState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelState {
    pub channel: u8,
    pub on: bool,
}

fn onoff(value: &serde_json::Value) -> Option<bool> {
    value.get("onoff").and_then(|v| v.as_i64()).map(|v| v == 1)
}

impl SystemState {
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        let all = &payload["all"];
        let system = &all["system"];

        let text = |v: &serde_json::Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

        let digest = &all["digest"];
        let togglex = match &digest["togglex"] {
            serde_json::Value::Array(list) => Some(list.clone()),
            entry @ serde_json::Value::Object(_) => Some(vec![entry.clone()]),
            _ => None,
        };
        let channels = if let Some(list) = togglex {
            list.iter()
                .filter_map(|entry| {
                    let channel = entry.get("channel").and_then(|v| v.as_u64()).unwrap_or(0);
                    Some(ChannelState {
                        channel: u8::try_from(channel).ok()?,
                        on: onoff(entry)?,
                    })
                })
                .collect()
        } else if let Some(on) = onoff(&digest["toggle"]).or_else(|| onoff(&system["toggle"])) {
            // Single-relay plugs on the older Toggle namespace.
            vec![ChannelState { channel: 0, on }]
        } else {
            vec![]
        };

        Self {
            inner_ip: text(&system["firmware"]["innerIp"]),
            mac_address: text(&system["hardware"]["macAddress"]),
            online_status: system["online"]["status"].as_i64().map(|v| v as i32),
            channels,
        }
    }

    pub fn is_on(&self, channel: u8) -> Option<bool> {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| c.on)
    }

    /// `None` when the reply did not say.
    pub fn is_online(&self) -> Option<bool> {
        self.online_status.map(|s| s == ONLINE_STATUS_ONLINE)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_togglex_device() {
        let payload = json!({"all": {
            "system": {
                "hardware": {"type": "mss310", "version": "2.0.0", "macAddress": "48:e1:e9:aa:bb:cc"},
                "firmware": {"version": "2.1.4", "innerIp": "192.168.1.42", "server": "mqtt-eu.meross.com"},
                "online": {"status": 1}
            },
            "digest": {"togglex": [
                {"channel": 0, "onoff": 1, "lmTime": 1700000000},
                {"channel": 1, "onoff": 0, "lmTime": 1700000000}
            ]}
        }});
        let state = SystemState::from_payload(&payload);
        assert_eq!(state.inner_ip.as_deref(), Some("192.168.1.42"));
        assert_eq!(state.mac_address.as_deref(), Some("48:e1:e9:aa:bb:cc"));
        assert_eq!(state.is_online(), Some(true));
        assert_eq!(state.is_on(0), Some(true));
        assert_eq!(state.is_on(1), Some(false));
        assert_eq!(state.is_on(2), None);
    }

    #[test]
    fn test_legacy_toggle_device() {
        let payload = json!({"all": {
            "system": {"hardware": {"macAddress": "aa"}, "firmware": {}},
            "control": {},
            "digest": {"toggle": {"onoff": 0}}
        }});
        let state = SystemState::from_payload(&payload);
        assert_eq!(state.is_on(0), Some(false));
        assert!(state.inner_ip.is_none());
        assert_eq!(state.is_online(), None);
    }

    #[test]
    fn test_empty_payload() {
        let state = SystemState::from_payload(&json!({}));
        assert_eq!(state, SystemState::default());
    }
}
