use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_PUSH_FILE, DEFAULT_USERS_FILE};
use crate::platform::ContractConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub platform_base_url: String,
    pub application_id: String,
    pub contract_id: String,
    /// Origin used to build absolute redirect/callback URLs. When unset the
    /// request's Host header is used, which is fine for the demo but should
    /// be pinned down in anything production-facing.
    pub public_base_url: Option<String>,
    pub users_file_path: String,
    pub poll_interval_ms: u64,
    pub push_file_path: String,
    /// Service to onboard during consent, when the contract scopes one.
    pub service_id: Option<u32>,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let platform_base_url = env::var("PLATFORM_BASE_URL")
            .unwrap_or_else(|_| "https://api.datavault.example/v1".to_string());

        let application_id =
            env::var("APPLICATION_ID").map_err(|_| "APPLICATION_ID must be set")?;
        let contract_id = env::var("CONTRACT_ID").map_err(|_| "CONTRACT_ID must be set")?;

        let public_base_url = env::var("PUBLIC_BASE_URL").ok();

        let users_file_path =
            env::var("USERS_FILE_PATH").unwrap_or_else(|_| DEFAULT_USERS_FILE.to_string());

        let poll_interval_ms = env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse()
            .map_err(|_| "Invalid POLL_INTERVAL_MS")?;

        let push_file_path =
            env::var("PUSH_FILE_PATH").unwrap_or_else(|_| DEFAULT_PUSH_FILE.to_string());

        let service_id = match env::var("SERVICE_ID") {
            Ok(raw) => Some(raw.parse().map_err(|_| "Invalid SERVICE_ID")?),
            Err(_) => None,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            server_host,
            server_port,
            platform_base_url,
            application_id,
            contract_id,
            public_base_url,
            users_file_path,
            poll_interval_ms,
            push_file_path,
            service_id,
            environment,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Contract identity presented on every platform call
    pub fn contract(&self) -> ContractConfig {
        ContractConfig {
            application_id: self.application_id.clone(),
            contract_id: self.contract_id.clone(),
        }
    }

    /// Interval between file-list polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
