use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used when building share links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default = "default_jwt_secret")]
    pub secret: String,
    #[serde(default = "default_access_token_expire")]
    pub access_token_expire_minutes: u64,
}

/// Blob store selection. `backend` is either "local" or "remote"; the remote
/// section is required only for the remote backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default)]
    pub remote: RemoteStorageConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteStorageConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
}

/// Mail relay settings. With an empty `api_url` the server runs with mail
/// disabled: share requests fail with a notification error and account mails
/// are skipped.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MailConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1420
}

fn default_public_url() -> String {
    "http://localhost:1420".to_string()
}

fn default_db_path() -> String {
    "data/filedrop.db".to_string()
}

fn default_jwt_secret() -> String {
    // Replaced by a generated secret on first boot
    "your-super-secret-key-change-it".to_string()
}

fn default_access_token_expire() -> u64 {
    60 // 1 hour
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_local_path() -> String {
    "data/uploads".to_string()
}

fn default_mail_from() -> String {
    "noreply@localhost".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            access_token_expire_minutes: default_access_token_expire(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local_path: default_local_path(),
            remote: RemoteStorageConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            jwt: JwtConfig::default(),
            storage: StorageConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        config.ensure_jwt_secret()?;
        Ok(config)
    }

    /// Ensure JWT secret is secure and persisted
    fn ensure_jwt_secret(&mut self) -> anyhow::Result<()> {
        if self.jwt.secret == default_jwt_secret() || self.jwt.secret.is_empty() {
            let secret_path = Path::new("data/.jwt_secret");

            if secret_path.exists() {
                let secret = fs::read_to_string(secret_path)?;
                self.jwt.secret = secret.trim().to_string();
                tracing::info!("Loaded persisted JWT secret from data/.jwt_secret");
            } else {
                let secret = uuid::Uuid::new_v4().to_string();

                if let Some(parent) = secret_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                fs::write(secret_path, &secret)?;
                self.jwt.secret = secret;
                tracing::info!("Generated and persisted new JWT secret to data/.jwt_secret");
            }
        }
        Ok(())
    }

    /// Load configuration from conf.ini or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["conf.ini", "config.toml", "data/conf.ini", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: FD_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("FD_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("FD_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("FD_CONF_SERVER_PUBLIC_URL") {
            self.server.public_url = val;
        }

        // Database overrides
        if let Ok(val) = env::var("FD_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // JWT overrides
        if let Ok(val) = env::var("FD_CONF_JWT_SECRET") {
            self.jwt.secret = val;
        }
        if let Ok(val) = env::var("FD_CONF_JWT_ACCESS_EXPIRE") {
            if let Ok(minutes) = val.parse() {
                self.jwt.access_token_expire_minutes = minutes;
            }
        }

        // Storage overrides
        if let Ok(val) = env::var("FD_CONF_STORAGE_BACKEND") {
            self.storage.backend = val;
        }
        if let Ok(val) = env::var("FD_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }
        if let Ok(val) = env::var("FD_CONF_STORAGE_REMOTE_BASE_URL") {
            self.storage.remote.base_url = val;
        }
        if let Ok(val) = env::var("FD_CONF_STORAGE_REMOTE_ACCESS_TOKEN") {
            self.storage.remote.access_token = val;
        }

        // Mail overrides
        if let Ok(val) = env::var("FD_CONF_MAIL_API_URL") {
            self.mail.api_url = val;
        }
        if let Ok(val) = env::var("FD_CONF_MAIL_API_TOKEN") {
            self.mail.api_token = val;
        }
        if let Ok(val) = env::var("FD_CONF_MAIL_FROM") {
            self.mail.from = val;
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        if self.storage.backend == "local" {
            fs::create_dir_all(&self.storage.local_path)?;
        }

        Ok(())
    }

    pub fn mail_enabled(&self) -> bool {
        !self.mail.api_url.is_empty()
    }
}
