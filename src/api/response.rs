use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub api_status: i32,
    pub info: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn successful(&self) -> bool {
        self.api_status == 0
    }

    pub fn message(&self, fallback: &str) -> String {
        self.info
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{} (apiStatus {})", fallback, self.api_status))
    }
}
