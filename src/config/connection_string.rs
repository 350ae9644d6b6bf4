//! Parsing for the `Key=Value;Key=Value` connection strings handed out by the
//! Azure portal.

use crate::utils::error::{Result, ShowcaseError};
use std::collections::HashMap;

const DEV_STORAGE_ACCOUNT: &str = "devstoreaccount1";
const DEV_STORAGE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_STORAGE_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Splits a connection string into its settings. Keys are lowercased.
pub fn parse_connection_string(value: &str) -> Result<HashMap<String, String>> {
    let mut settings = HashMap::new();

    for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, val) = part
            .split_once('=')
            .ok_or_else(|| ShowcaseError::ConfigError {
                message: format!("Malformed connection string segment '{}'", part),
            })?;
        settings.insert(key.trim().to_ascii_lowercase(), val.trim().to_string());
    }

    if settings.is_empty() {
        return Err(ShowcaseError::ConfigError {
            message: "Connection string is empty".to_string(),
        });
    }

    Ok(settings)
}

fn required(settings: &HashMap<String, String>, key: &str) -> Result<String> {
    settings
        .get(&key.to_ascii_lowercase())
        .cloned()
        .ok_or_else(|| ShowcaseError::MissingConfigError {
            field: format!("connection_string.{}", key),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBusConnection {
    /// Namespace root, e.g. `https://my-ns.servicebus.windows.net`.
    pub endpoint: String,
    pub key_name: String,
    pub key: String,
}

impl ServiceBusConnection {
    pub fn from_connection_string(value: &str) -> Result<Self> {
        let settings = parse_connection_string(value)?;
        let endpoint = required(&settings, "Endpoint")?;

        Ok(Self {
            endpoint: normalize_service_bus_endpoint(&endpoint),
            key_name: required(&settings, "SharedAccessKeyName")?,
            key: required(&settings, "SharedAccessKey")?,
        })
    }
}

/// The portal hands out `sb://` endpoints; the REST surface lives on https.
pub fn normalize_service_bus_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    match endpoint.strip_prefix("sb://") {
        Some(host) => format!("https://{}", host),
        None => endpoint.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConnection {
    pub account_name: String,
    pub account_key: String,
    pub blob_endpoint: String,
}

impl StorageConnection {
    pub fn from_connection_string(value: &str) -> Result<Self> {
        let settings = parse_connection_string(value)?;

        if settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self::development());
        }

        let account_name = required(&settings, "AccountName")?;
        let account_key = required(&settings, "AccountKey")?;
        let blob_endpoint = match settings.get("blobendpoint") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                format!("{}://{}.blob.{}", protocol, account_name, suffix)
            }
        };

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
        })
    }

    /// Local storage emulator with its published well-known account.
    pub fn development() -> Self {
        Self {
            account_name: DEV_STORAGE_ACCOUNT.to_string(),
            account_key: DEV_STORAGE_KEY.to_string(),
            blob_endpoint: DEV_STORAGE_BLOB_ENDPOINT.to_string(),
        }
    }
}
