use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use crate::api::client::MerossApi;
use crate::api::device_client::DeviceClient;
use crate::api::message::{
    Method, NS_CONSUMPTIONX, NS_ELECTRICITY, NS_SYSTEM_ABILITY, NS_SYSTEM_ALL, NS_TOGGLE,
};
use crate::api::region::Region;
use crate::auth::credentials::Credentials;
use crate::auth::token::CloudSession;
use crate::config::RuntimeConfig;
use crate::error::AppError;
use crate::models::abilities::Abilities;
use crate::models::device_info::DeviceInfo;
use crate::models::energy::{DailyConsumption, ElectricityReading};
use crate::models::system::SystemState;

/// Everything the bridge needs from the cloud: discovery, device state,
/// relay control and telemetry.
#[async_trait]
pub trait CloudDeviceManager: Send + Sync {
    async fn discover(&mut self) -> Result<Vec<DeviceInfo>, AppError>;

    async fn system_state(&self, device: &DeviceInfo) -> Result<SystemState, AppError>;

    async fn abilities(&self, device: &DeviceInfo) -> Result<Abilities, AppError>;

    async fn set_toggle(&self, device: &DeviceInfo, channel: u8, on: bool) -> Result<(), AppError>;

    async fn instant_metrics(
        &self,
        device: &DeviceInfo,
        channel: u8,
    ) -> Result<ElectricityReading, AppError>;

    async fn daily_consumption(
        &self,
        device: &DeviceInfo,
    ) -> Result<Vec<DailyConsumption>, AppError>;

    /// Release the device channel and end the cloud session.
    async fn close(&mut self) -> Result<(), AppError>;
}

/// Options for opening a cloud session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub api_url: String,
    pub region: Region,
    pub mfa_code: Option<String>,
    pub timeout: Duration,
}

impl ConnectOptions {
    pub fn from_config(config: &RuntimeConfig, mfa_code: Option<String>) -> Self {
        Self {
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| config.region.host().to_string()),
            region: config.region,
            mfa_code,
            timeout: config.timeout,
        }
    }
}

/// Payload switching one relay channel with the given namespace.
pub fn toggle_payload(namespace: &str, channel: u8, on: bool) -> serde_json::Value {
    let onoff = i32::from(on);
    if namespace == NS_TOGGLE {
        json!({"toggle": {"onoff": onoff, "channel": channel}})
    } else {
        json!({"togglex": {"onoff": onoff, "channel": channel}})
    }
}

pub fn electricity_payload(channel: u8) -> serde_json::Value {
    json!({"electricity": {"channel": channel}})
}

/// Broker serving a device: its own `domain`, else the account's, else the region's.
pub fn broker_host(device: &DeviceInfo, session: &CloudSession, region: Region) -> String {
    let non_empty = |d: &Option<String>| d.clone().filter(|d| !d.is_empty());
    non_empty(&device.domain)
        .or_else(|| non_empty(&session.mqtt_domain))
        .unwrap_or_else(|| region.mqtt_host().to_string())
}

/// Cloud device manager backed by the Meross HTTP API and MQTT brokers.
///
/// Devices are sharded across brokers; one client is opened per broker host
/// on first use and shared by every device on it.
pub struct MerossManager {
    api: MerossApi,
    session: CloudSession,
    region: Region,
    timeout: Duration,
    brokers: Mutex<HashMap<String, Arc<DeviceClient>>>,
}

impl MerossManager {
    /// Sign in; broker connections are opened lazily.
    pub async fn connect(
        credentials: &Credentials,
        options: &ConnectOptions,
    ) -> Result<Self, AppError> {
        let mut api = MerossApi::new(&options.api_url, options.timeout)?;
        let session = api.login(credentials, options.mfa_code.as_deref()).await?;
        tracing::debug!(user_id = %session.user_id, host = %api.host, "signed in");

        Ok(Self {
            api,
            session,
            region: options.region,
            timeout: options.timeout,
            brokers: Mutex::new(HashMap::new()),
        })
    }

    async fn client_for(&self, device: &DeviceInfo) -> Result<Arc<DeviceClient>, AppError> {
        let host = broker_host(device, &self.session, self.region);
        let mut brokers = self.brokers.lock().await;
        if let Some(client) = brokers.get(&host) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(DeviceClient::connect(&host, &self.session, self.timeout).await?);
        brokers.insert(host, Arc::clone(&client));
        Ok(client)
    }

    async fn send(
        &self,
        device: &DeviceInfo,
        method: Method,
        namespace: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        self.client_for(device)
            .await?
            .request(&device.uuid, method, namespace, payload)
            .await
    }
}

#[async_trait]
impl CloudDeviceManager for MerossManager {
    async fn discover(&mut self) -> Result<Vec<DeviceInfo>, AppError> {
        let devices = self.api.list_devices().await?;
        tracing::debug!(count = devices.len(), "discovered devices");
        Ok(devices)
    }

    async fn system_state(&self, device: &DeviceInfo) -> Result<SystemState, AppError> {
        let payload = self.send(device, Method::Get, NS_SYSTEM_ALL, json!({})).await?;
        Ok(SystemState::from_payload(&payload))
    }

    async fn abilities(&self, device: &DeviceInfo) -> Result<Abilities, AppError> {
        let payload = self
            .send(device, Method::Get, NS_SYSTEM_ABILITY, json!({}))
            .await?;
        Ok(Abilities::from_payload(&payload))
    }

    async fn set_toggle(&self, device: &DeviceInfo, channel: u8, on: bool) -> Result<(), AppError> {
        let abilities = self.abilities(device).await?;
        let namespace = abilities.toggle_namespace().ok_or_else(|| {
            AppError::InvalidInput(format!("{} has no switchable relay", device.name()))
        })?;

        self.send(device, Method::Set, namespace, toggle_payload(namespace, channel, on))
            .await?;
        Ok(())
    }

    async fn instant_metrics(
        &self,
        device: &DeviceInfo,
        channel: u8,
    ) -> Result<ElectricityReading, AppError> {
        let payload = self
            .send(device, Method::Get, NS_ELECTRICITY, electricity_payload(channel))
            .await?;
        ElectricityReading::from_payload(&payload).ok_or_else(|| AppError::Api {
            message: format!("{} returned no electricity reading", device.name()),
            error_code: None,
        })
    }

    async fn daily_consumption(
        &self,
        device: &DeviceInfo,
    ) -> Result<Vec<DailyConsumption>, AppError> {
        let payload = self
            .send(device, Method::Get, NS_CONSUMPTIONX, json!({}))
            .await?;
        Ok(DailyConsumption::list_from_payload(&payload))
    }

    async fn close(&mut self) -> Result<(), AppError> {
        for (host, client) in self.brokers.get_mut().drain() {
            match Arc::try_unwrap(client) {
                Ok(mut client) => client.shutdown().await,
                Err(_) => tracing::debug!(%host, "broker client still shared, dropping"),
            }
        }
        self.api.logout().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::message::NS_TOGGLEX;

    fn session(mqtt_domain: Option<&str>) -> CloudSession {
        serde_json::from_value(json!({
            "token": "t",
            "key": "k",
            "userid": "42",
            "email": "user@example.com",
            "domain": "https://iotx-eu.meross.com",
            "mqttDomain": mqtt_domain
        }))
        .unwrap()
    }

    fn device(domain: Option<&str>) -> DeviceInfo {
        DeviceInfo::from_json(&json!({"uuid": "u1", "domain": domain})).unwrap()
    }

    #[test]
    fn test_toggle_payload_shapes() {
        assert_eq!(
            toggle_payload(NS_TOGGLEX, 2, true),
            json!({"togglex": {"onoff": 1, "channel": 2}})
        );
        assert_eq!(
            toggle_payload(NS_TOGGLE, 0, false),
            json!({"toggle": {"onoff": 0, "channel": 0}})
        );
    }

    #[test]
    fn test_electricity_payload_carries_channel() {
        assert_eq!(
            electricity_payload(3),
            json!({"electricity": {"channel": 3}})
        );
    }

    #[test]
    fn test_broker_host_prefers_device_domain() {
        let session = session(Some("mqtt-eu-1.meross.com"));
        assert_eq!(
            broker_host(&device(Some("mqtt-eu-3.meross.com")), &session, Region::Eu),
            "mqtt-eu-3.meross.com"
        );
        assert_eq!(
            broker_host(&device(Some("")), &session, Region::Eu),
            "mqtt-eu-1.meross.com"
        );
        assert_eq!(
            broker_host(&device(None), &session, Region::Eu),
            "mqtt-eu-1.meross.com"
        );
    }

    #[test]
    fn test_broker_host_falls_back_to_region() {
        assert_eq!(
            broker_host(&device(None), &session(None), Region::Us),
            Region::Us.mqtt_host()
        );
    }

    #[test]
    fn test_connect_options_from_config() {
        let config = RuntimeConfig {
            output_mode: crate::config::OutputMode::Silent,
            region: Region::Ap,
            api_url: None,
            timeout: Duration::from_secs(4),
            history: false,
        };
        let options = ConnectOptions::from_config(&config, Some("123456".into()));
        assert_eq!(options.api_url, Region::Ap.host());
        assert_eq!(options.mfa_code.as_deref(), Some("123456"));

        let config = RuntimeConfig {
            api_url: Some("http://127.0.0.1:9000".into()),
            ..config
        };
        assert_eq!(
            ConnectOptions::from_config(&config, None).api_url,
            "http://127.0.0.1:9000"
        );
    }
}
