use crate::config::connection_string::{
    normalize_service_bus_endpoint, ServiceBusConnection, StorageConnection,
};
use crate::utils::error::{Result, ShowcaseError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONTAINER: &str = "files";
pub const DEFAULT_IMAGE_PATH: &str = "assets/cat.jpg";
pub const DEFAULT_COLLECTION: &str = "reservations";
pub const DEFAULT_CUSTOMER_LIMIT: usize = 10;
pub const DEFAULT_PUBLISH_DELAY_MS: u64 = 1000;
pub const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CALLBACK_PATH: &str = "/login/oauth2/code";
/// Routes the server always mounts; the login callback cannot reuse them.
pub const RESERVED_PATHS: [&str; 4] = ["/greetings", "/health", "/login", "/logout"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub sql: Option<SqlConfig>,
    pub service_bus: Option<ServiceBusConfig>,
    pub storage: Option<StorageConfig>,
    pub cosmos: Option<CosmosConfig>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Database file attached under the `SalesLT` schema.
    pub database_path: String,
    pub limit: Option<usize>,
}

impl SqlConfig {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_CUSTOMER_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBusConfig {
    pub connection_string: Option<String>,
    pub endpoint: Option<String>,
    pub shared_access_key_name: Option<String>,
    pub shared_access_key: Option<String>,
    pub topic: String,
    pub subscription: String,
    pub publish_delay_ms: Option<u64>,
    pub receive_timeout_secs: Option<u64>,
}

impl ServiceBusConfig {
    /// Explicit fields win over values read from the connection string.
    pub fn connection(&self) -> Result<ServiceBusConnection> {
        let from_string = self
            .connection_string
            .as_deref()
            .map(ServiceBusConnection::from_connection_string)
            .transpose()?;

        let endpoint = match (&self.endpoint, &from_string) {
            (Some(endpoint), _) => normalize_service_bus_endpoint(endpoint),
            (None, Some(conn)) => conn.endpoint.clone(),
            (None, None) => {
                return Err(ShowcaseError::MissingConfigError {
                    field: "service_bus.endpoint".to_string(),
                })
            }
        };
        let key_name = self
            .shared_access_key_name
            .clone()
            .or_else(|| from_string.as_ref().map(|c| c.key_name.clone()))
            .ok_or_else(|| ShowcaseError::MissingConfigError {
                field: "service_bus.shared_access_key_name".to_string(),
            })?;
        let key = self
            .shared_access_key
            .clone()
            .or_else(|| from_string.as_ref().map(|c| c.key.clone()))
            .ok_or_else(|| ShowcaseError::MissingConfigError {
                field: "service_bus.shared_access_key".to_string(),
            })?;

        Ok(ServiceBusConnection {
            endpoint,
            key_name,
            key,
        })
    }

    pub fn publish_delay_ms(&self) -> u64 {
        self.publish_delay_ms.unwrap_or(DEFAULT_PUBLISH_DELAY_MS)
    }

    pub fn receive_timeout_secs(&self) -> u64 {
        self.receive_timeout_secs
            .unwrap_or(DEFAULT_RECEIVE_TIMEOUT_SECS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub connection_string: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub endpoint: Option<String>,
    pub container: Option<String>,
    pub image_path: Option<String>,
    pub create_container: Option<bool>,
}

impl StorageConfig {
    pub fn connection(&self) -> Result<StorageConnection> {
        let from_string = self
            .connection_string
            .as_deref()
            .map(StorageConnection::from_connection_string)
            .transpose()?;

        let account_name = self
            .account_name
            .clone()
            .or_else(|| from_string.as_ref().map(|c| c.account_name.clone()))
            .ok_or_else(|| ShowcaseError::MissingConfigError {
                field: "storage.account_name".to_string(),
            })?;
        let account_key = self
            .account_key
            .clone()
            .or_else(|| from_string.as_ref().map(|c| c.account_key.clone()))
            .ok_or_else(|| ShowcaseError::MissingConfigError {
                field: "storage.account_key".to_string(),
            })?;
        let blob_endpoint = match (&self.endpoint, &from_string) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(conn)) => conn.blob_endpoint.clone(),
            (None, None) => format!("https://{}.blob.core.windows.net", account_name),
        };

        Ok(StorageConnection {
            account_name,
            account_key,
            blob_endpoint,
        })
    }

    pub fn container(&self) -> &str {
        self.container.as_deref().unwrap_or(DEFAULT_CONTAINER)
    }

    pub fn image_path(&self) -> &str {
        self.image_path.as_deref().unwrap_or(DEFAULT_IMAGE_PATH)
    }

    pub fn create_container(&self) -> bool {
        self.create_container.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosConfig {
    pub endpoint: String,
    pub key: String,
    pub database: String,
    pub collection: Option<String>,
    pub create_collection: Option<bool>,
}

impl CosmosConfig {
    pub fn collection(&self) -> &str {
        self.collection.as_deref().unwrap_or(DEFAULT_COLLECTION)
    }

    pub fn create_collection(&self) -> bool {
        self.create_collection.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub tenant_id: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub required_role: String,
    pub scopes: Option<Vec<String>>,
}

impl AuthConfig {
    pub fn authorize_endpoint(&self) -> Result<String> {
        self.endpoint(&self.authorize_url, "authorize")
    }

    pub fn token_endpoint(&self) -> Result<String> {
        self.endpoint(&self.token_url, "token")
    }

    fn endpoint(&self, explicit: &Option<String>, kind: &str) -> Result<String> {
        if let Some(url) = explicit {
            return Ok(url.clone());
        }
        let tenant = self
            .tenant_id
            .as_deref()
            .ok_or_else(|| ShowcaseError::MissingConfigError {
                field: format!("auth.tenant_id (or auth.{}_url)", kind),
            })?;
        Ok(format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/{}",
            tenant, kind
        ))
    }

    /// `openid profile` followed by any configured extras.
    pub fn scope(&self) -> String {
        let mut scopes = vec!["openid".to_string(), "profile".to_string()];
        for extra in self.scopes.iter().flatten() {
            if !scopes.contains(extra) {
                scopes.push(extra.clone());
            }
        }
        scopes.join(" ")
    }

    /// Path component of the redirect URI; the callback route is mounted here.
    pub fn callback_path(&self) -> String {
        url::Url::parse(&self.redirect_uri)
            .ok()
            .map(|u| u.path().to_string())
            .filter(|p| p.len() > 1)
            .unwrap_or_else(|| DEFAULT_CALLBACK_PATH.to_string())
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShowcaseError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShowcaseError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShowcaseError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Names of the demos this config enables, in run order.
    pub fn enabled_demos(&self) -> Vec<&'static str> {
        let mut demos = Vec::new();
        if self.sql.is_some() {
            demos.push("sql-server");
        }
        if self.service_bus.is_some() {
            demos.push("service-bus");
        }
        if self.storage.is_some() {
            demos.push("object-storage");
        }
        if self.cosmos.is_some() {
            demos.push("cosmos-db");
        }
        demos
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;

        if let Some(sql) = &self.sql {
            validation::validate_path("sql.database_path", &sql.database_path)?;
            validation::validate_range("sql.limit", sql.limit(), 1, 1000)?;
        }

        if let Some(bus) = &self.service_bus {
            let conn = bus.connection()?;
            validation::validate_url("service_bus.endpoint", &conn.endpoint)?;
            validation::validate_non_empty_string("service_bus.shared_access_key", &conn.key)?;
            validation::validate_non_empty_string("service_bus.topic", &bus.topic)?;
            validation::validate_non_empty_string("service_bus.subscription", &bus.subscription)?;
            validation::validate_range(
                "service_bus.receive_timeout_secs",
                bus.receive_timeout_secs(),
                1,
                230,
            )?;
        }

        if let Some(storage) = &self.storage {
            let conn = storage.connection()?;
            validation::validate_non_empty_string("storage.account_name", &conn.account_name)?;
            validation::validate_base64_key("storage.account_key", &conn.account_key)?;
            validation::validate_url("storage.endpoint", &conn.blob_endpoint)?;
            validation::validate_container_name("storage.container", storage.container())?;
            validation::validate_path("storage.image_path", storage.image_path())?;
        }

        if let Some(cosmos) = &self.cosmos {
            validation::validate_url("cosmos.endpoint", &cosmos.endpoint)?;
            validation::validate_base64_key("cosmos.key", &cosmos.key)?;
            validation::validate_non_empty_string("cosmos.database", &cosmos.database)?;
            validation::validate_non_empty_string("cosmos.collection", cosmos.collection())?;
        }

        if let Some(auth) = &self.auth {
            validation::validate_url("auth.authorize_url", &auth.authorize_endpoint()?)?;
            validation::validate_url("auth.token_url", &auth.token_endpoint()?)?;
            validation::validate_url("auth.redirect_uri", &auth.redirect_uri)?;
            let callback = auth.callback_path();
            if RESERVED_PATHS.contains(&callback.as_str()) {
                return Err(ShowcaseError::InvalidConfigValueError {
                    field: "auth.redirect_uri".to_string(),
                    value: auth.redirect_uri.clone(),
                    reason: format!("Callback path {} is already served by another route", callback),
                });
            }
            validation::validate_non_empty_string("auth.client_id", &auth.client_id)?;
            validation::validate_non_empty_string("auth.client_secret", &auth.client_secret)?;
            validation::validate_non_empty_string("auth.required_role", &auth.required_role)?;
        }

        Ok(())
    }
}
