use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::signing::{md5_hex, message_sign};
use crate::error::AppError;

pub const NS_SYSTEM_ALL: &str = "Appliance.System.All";
pub const NS_SYSTEM_ABILITY: &str = "Appliance.System.Ability";
pub const NS_TOGGLE: &str = "Appliance.Control.Toggle";
pub const NS_TOGGLEX: &str = "Appliance.Control.ToggleX";
pub const NS_ELECTRICITY: &str = "Appliance.Control.Electricity";
pub const NS_CONSUMPTIONX: &str = "Appliance.Control.ConsumptionX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Set,
    Push,
    GetAck,
    SetAck,
    Error,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub message_id: String,
    pub namespace: String,
    pub method: Method,
    pub payload_version: i32,
    pub from: String,
    pub timestamp: i64,
    pub sign: String,
}

/// A device message: signed header plus namespace-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Message {
    pub fn build(
        namespace: &str,
        method: Method,
        payload: serde_json::Value,
        from: &str,
        key: &str,
        message_id: String,
        timestamp: i64,
    ) -> Self {
        let sign = message_sign(&message_id, key, timestamp);
        Self {
            header: Header {
                message_id,
                namespace: namespace.to_string(),
                method,
                payload_version: 1,
                from: from.to_string(),
                timestamp,
                sign,
            },
            payload,
        }
    }

    /// New request with a fresh message id and the current time.
    pub fn request(
        namespace: &str,
        method: Method,
        payload: serde_json::Value,
        from: &str,
        key: &str,
    ) -> Self {
        let message_id = md5_hex(&Uuid::new_v4().to_string());
        let timestamp = chrono::Utc::now().timestamp();
        Self::build(namespace, method, payload, from, key, message_id, timestamp)
    }

    pub fn verify(&self, key: &str) -> bool {
        self.header.sign == message_sign(&self.header.message_id, key, self.header.timestamp)
    }

    pub fn message_id(&self) -> &str {
        &self.header.message_id
    }

    /// Payload of an acknowledgement; `ERROR` replies become errors.
    pub fn into_payload(self) -> Result<serde_json::Value, AppError> {
        if self.header.method != Method::Error {
            return Ok(self.payload);
        }
        let error = self.payload.get("error").cloned().unwrap_or(json!({}));
        let code = error
            .get("code")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let detail = error
            .get("detail")
            .and_then(|v| v.as_str())
            .unwrap_or("device returned an error");
        Err(AppError::Api {
            message: format!("{}: {}", self.header.namespace, detail),
            error_code: code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case_header() {
        let msg = Message::build(
            NS_TOGGLEX,
            Method::Set,
            json!({"togglex": {"channel": 0, "onoff": 1}}),
            "/app/1-abc/subscribe",
            "key",
            "id1".into(),
            1_600_000_000,
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["header"]["messageId"], "id1");
        assert_eq!(value["header"]["method"], "SET");
        assert_eq!(value["header"]["namespace"], "Appliance.Control.ToggleX");
        assert_eq!(value["header"]["payloadVersion"], 1);
        assert_eq!(value["header"]["from"], "/app/1-abc/subscribe");
        assert_eq!(value["payload"]["togglex"]["onoff"], 1);
        assert!(msg.verify("key"));
        assert!(!msg.verify("other-key"));
    }

    #[test]
    fn test_fresh_requests_have_distinct_ids() {
        let a = Message::request(NS_SYSTEM_ALL, Method::Get, json!({}), "/app/x", "k");
        let b = Message::request(NS_SYSTEM_ALL, Method::Get, json!({}), "/app/x", "k");
        assert_eq!(a.message_id().len(), 32);
        assert_ne!(a.message_id(), b.message_id());
    }

    #[test]
    fn test_parse_ack() {
        let raw = r#"{
            "header": {
                "messageId": "m1", "namespace": "Appliance.Control.Electricity",
                "method": "GETACK", "payloadVersion": 1, "from": "/appliance/u/publish",
                "timestamp": 10, "timestampMs": 5, "sign": "s"
            },
            "payload": {"electricity": {"channel": 0, "power": 12000}}
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.header.method, Method::GetAck);
        let payload = msg.into_payload().unwrap();
        assert_eq!(payload["electricity"]["power"], 12000);
    }

    #[test]
    fn test_error_reply() {
        let raw = r#"{
            "header": {
                "messageId": "m1", "namespace": "Appliance.Control.ToggleX",
                "method": "ERROR", "payloadVersion": 1, "from": "/appliance/u/publish",
                "timestamp": 10, "sign": "s"
            },
            "payload": {"error": {"code": 5000, "detail": "unknown channel"}}
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        let err = msg.into_payload().unwrap_err();
        assert_eq!(err.to_json()["error_code"], 5000);
        assert!(err.to_string().contains("unknown channel"));
    }

    #[test]
    fn test_unknown_method() {
        let raw = r#"{"header": {"messageId": "m", "namespace": "n", "method": "DELETEACK",
            "payloadVersion": 1, "from": "f", "timestamp": 0, "sign": ""}}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.header.method, Method::Other);
        assert!(msg.payload.is_null());
    }
}
