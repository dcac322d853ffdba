use std::time::Duration;

use serde_json::json;

use super::errors::*;
use super::region::{APP_TYPE, APP_VERSION, USER_AGENT};
use super::response::ApiResponse;
use super::signing::{get_signed_params, md5_hex};
use crate::auth::credentials::Credentials;
use crate::auth::token::CloudSession;
use crate::error::AppError;
use crate::models::device_info::DeviceInfo;

const PATH_SIGN_IN: &str = "/v1/Auth/signIn";
const PATH_DEVICE_LIST: &str = "/v1/Device/devList";
const PATH_LOGOUT: &str = "/v1/Profile/logout";

/// Client for the Meross cloud HTTP API (sign-in, device list, logout).
pub struct MerossApi {
    client: reqwest::Client,
    pub host: String,
    token: Option<String>,
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

fn trim_host(host: &str) -> String {
    host.trim_end_matches('/').to_string()
}

impl MerossApi {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            host: trim_host(host),
            token: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Make a signed, form-encoded API request.
    async fn request_post(
        &self,
        url_path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse, AppError> {
        let url = format!("{}{}", self.host, url_path);
        let body_json = serde_json::to_string(body)?;
        let signed = get_signed_params(&body_json);

        tracing::debug!(%url, "POST");
        if url_path != PATH_SIGN_IN {
            tracing::debug!(body = %body_json, "request body");
        }

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Basic {}", self.token.as_deref().unwrap_or_default()),
            )
            .header("vender", "meross")
            .header("AppVersion", APP_VERSION)
            .header("AppType", APP_TYPE)
            .header("AppLanguage", "EN")
            .form(&signed)
            .send()
            .await?;

        if response.status().is_success() {
            let api_response: ApiResponse = response.json().await?;
            tracing::debug!(
                api_status = api_response.api_status,
                info = ?api_response.info,
                "response"
            );
            Ok(api_response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Api {
                message: format!("{}: {}", status, body),
                error_code: None,
            })
        }
    }

    fn check_token_status(&self, response: &ApiResponse) -> Result<(), AppError> {
        if response.successful() {
            return Ok(());
        }
        if is_token_error(response.api_status) {
            return Err(AppError::TokenExpired {
                message: response.message("Session token rejected"),
                error_code: Some(response.api_status),
            });
        }
        Err(AppError::Api {
            message: response.message("Request failed"),
            error_code: Some(response.api_status),
        })
    }

    /// Sign in and keep the session token for later requests.
    ///
    /// A region redirect is followed once; afterwards `host` points at the
    /// account's own API domain.
    pub async fn login(
        &mut self,
        credentials: &Credentials,
        mfa_code: Option<&str>,
    ) -> Result<CloudSession, AppError> {
        if credentials.email.is_empty() {
            return Err(AppError::InvalidInput("Email is required".into()));
        }
        if credentials.password().is_empty() {
            return Err(AppError::InvalidInput("Password is required".into()));
        }

        let mut body = json!({
            "email": credentials.email,
            "password": md5_hex(credentials.password()),
            "encryption": 1,
            "accountCountryCode": "--",
            "agree": 0,
            "mobileInfo": {
                "deviceModel": std::env::consts::ARCH,
                "mobileOs": std::env::consts::OS,
                "mobileOsVersion": "",
                "uuid": uuid::Uuid::new_v4().to_string(),
                "carrier": "",
            },
        });
        if let Some(code) = mfa_code {
            body["mfaCode"] = json!(code);
        }

        let mut response = self.request_post(PATH_SIGN_IN, &body).await?;

        if response.api_status == ERR_REDIRECT_REGION {
            let domain = response
                .data
                .as_ref()
                .and_then(|d| d.get("domain"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| AppError::Api {
                    message: "Region redirect without a domain".into(),
                    error_code: Some(ERR_REDIRECT_REGION),
                })?;
            tracing::debug!(%domain, "redirected to account region");
            self.host = trim_host(domain);
            response = self.request_post(PATH_SIGN_IN, &body).await?;
        }

        if response.successful() {
            let data = response.data.unwrap_or_default();
            let session: CloudSession = serde_json::from_value(data)?;
            if let Some(domain) = session.domain.as_deref().filter(|d| !d.is_empty()) {
                self.host = trim_host(domain);
            }
            self.token = Some(session.token.clone());
            return Ok(session);
        }

        if response.api_status == ERR_MFA_REQUIRED {
            return Err(AppError::MfaRequired {
                email: credentials.email.clone(),
            });
        }

        if is_credentials_error(response.api_status) {
            return Err(AppError::Auth {
                message: response.message("Wrong email or password"),
                error_code: Some(response.api_status),
            });
        }

        Err(AppError::Api {
            message: response.message("Login failed"),
            error_code: Some(response.api_status),
        })
    }

    /// Devices registered to the account.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, AppError> {
        let response = self.request_post(PATH_DEVICE_LIST, &json!({})).await?;
        self.check_token_status(&response)?;

        let entries = match response.data {
            Some(serde_json::Value::Array(arr)) => arr,
            _ => return Ok(vec![]),
        };

        let mut devices = Vec::with_capacity(entries.len());
        for entry in entries {
            match DeviceInfo::from_json(&entry) {
                Some(info) => devices.push(info),
                None => tracing::warn!(%entry, "skipping unparseable device entry"),
            }
        }
        Ok(devices)
    }

    /// Invalidate the session token.
    pub async fn logout(&mut self) -> Result<(), AppError> {
        if self.token.is_none() {
            return Ok(());
        }
        let response = self.request_post(PATH_LOGOUT, &json!({})).await?;
        self.token = None;
        self.check_token_status(&response)
    }
}
