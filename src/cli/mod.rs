pub mod output;
pub mod show;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::api::region::Region;
use crate::auth::credentials::{default_config_paths, CredentialSources};
use crate::bridge::{Plan, PowerAction};
use crate::config::{OutputMode, RuntimeConfig, DEFAULT_TIMEOUT_SECS};
use crate::resolve::DeviceSelector;

#[derive(Parser, Debug)]
#[command(
    name = "meross-bridge",
    version,
    about = "Meross cloud bridge - read and switch Meross smart plugs from scripts"
)]
pub struct Cli {
    /// Refresh state of all devices from the cloud
    #[arg(long)]
    pub refresh: bool,

    /// Select device by uuid
    #[arg(long)]
    pub uuid: Option<String>,

    /// Select device by name
    #[arg(long)]
    pub name: Option<String>,

    /// Select device by MAC address
    #[arg(long)]
    pub mac: Option<String>,

    /// Relay channel to switch
    #[arg(long, default_value_t = 0)]
    pub channel: u8,

    /// Switch the selected device on
    #[arg(long = "set_on", visible_alias = "set-on", conflicts_with = "set_off")]
    pub set_on: bool,

    /// Switch the selected device off
    #[arg(long = "set_off", visible_alias = "set-off")]
    pub set_off: bool,

    /// Print current power of the selected device in watts
    #[arg(
        long = "show_power",
        visible_alias = "show-power",
        conflicts_with_all = ["show_yesterday", "show"]
    )]
    pub show_power: bool,

    /// Print yesterday's consumption of the selected device in kWh
    #[arg(
        long = "show_yesterday",
        visible_alias = "show-yesterday",
        conflicts_with = "show"
    )]
    pub show_yesterday: bool,

    /// Print device records as JSON
    #[arg(long)]
    pub show: bool,

    /// With --show, print a human-readable table instead of JSON
    #[arg(short = 't', long = "table", requires = "show")]
    pub table: bool,

    /// Include the daily consumption history in each record
    #[arg(long)]
    pub history: bool,

    /// Meross account email
    #[arg(long, env = "MEROSS_EMAIL")]
    pub email: Option<String>,

    /// Meross account password
    #[arg(long, env = "MEROSS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// INI file with a [secret] section holding email and password
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cloud region of the account
    #[arg(long, value_enum, env = "MEROSS_REGION", default_value_t = Region::Eu)]
    pub region: Region,

    /// One-time code for accounts with multi-factor authentication
    #[arg(long = "mfa-code", env = "MEROSS_MFA_CODE")]
    pub mfa_code: Option<String>,

    /// Timeout in seconds for cloud requests and device replies
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Debug output (HTTP and MQTT traffic on stderr)
    #[arg(short = 'v', long = "debug", alias = "verbose")]
    pub debug: bool,

    #[arg(long = "api-url", env = "MEROSS_API_URL", hide = true)]
    pub api_url: Option<String>,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.show_power {
            OutputMode::Power
        } else if self.show_yesterday {
            OutputMode::Yesterday
        } else if self.show && self.table {
            OutputMode::Table
        } else if self.show {
            OutputMode::Json
        } else {
            OutputMode::Silent
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            output_mode: self.output_mode(),
            region: self.region,
            api_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            history: self.history,
        }
    }

    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector {
            name: self.name.clone(),
            uuid: self.uuid.clone(),
            mac: self.mac.clone(),
        }
    }

    pub fn action(&self) -> Option<PowerAction> {
        if self.set_on {
            Some(PowerAction::On)
        } else if self.set_off {
            Some(PowerAction::Off)
        } else {
            None
        }
    }

    pub fn plan(&self) -> Plan {
        Plan {
            refresh: self.refresh,
            action: self.action(),
            channel: self.channel,
            selector: self.selector(),
        }
    }

    pub fn credential_sources(&self) -> CredentialSources {
        CredentialSources {
            email: self.email.clone(),
            password: self.password.clone(),
            config: self.config.clone(),
            default_paths: default_config_paths(),
        }
    }
}
