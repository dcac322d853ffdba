use serde::{Deserialize, Serialize};

/// Session returned by a successful cloud sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSession {
    pub token: String,
    /// Per-account key used to sign device messages.
    pub key: String,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub email: String,
    pub domain: Option<String>,
    #[serde(rename = "mqttDomain")]
    pub mqtt_domain: Option<String>,
}
