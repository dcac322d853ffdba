use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};
use serde::Serialize;
use uuid::Uuid;

use super::region::APP_SECRET;

/// Form body of a signed cloud API request.
#[derive(Debug, Clone, Serialize)]
pub struct SignedParams {
    pub params: String,
    pub sign: String,
    pub timestamp: i64,
    pub nonce: String,
}

/// Lowercase hex MD5 of a string.
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// 16 uppercase alphanumeric characters.
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_uppercase()
}

/// Sign a JSON request body for the HTTP API.
pub fn compute_signed_params(body_json: &str, timestamp_ms: i64, nonce: &str) -> SignedParams {
    let params = STANDARD.encode(body_json.as_bytes());
    let sign = md5_hex(&format!("{}{}{}{}", APP_SECRET, timestamp_ms, nonce, params));
    SignedParams {
        params,
        sign,
        timestamp: timestamp_ms,
        nonce: nonce.to_string(),
    }
}

/// Sign a JSON request body with the current time and a fresh nonce.
pub fn get_signed_params(body_json: &str) -> SignedParams {
    let timestamp_ms = chrono::Utc::now().timestamp_millis();
    compute_signed_params(body_json, timestamp_ms, &generate_nonce())
}

/// Signature carried in the header of every device message.
pub fn message_sign(message_id: &str, key: &str, timestamp: i64) -> String {
    md5_hex(&format!("{}{}{}", message_id, key, timestamp))
}

/// Password presented to the MQTT broker.
pub fn mqtt_password(user_id: &str, key: &str) -> String {
    md5_hex(&format!("{}{}", user_id, key))
}
