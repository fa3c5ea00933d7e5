use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub models: ModelsConfig,
    pub auth: AuthConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    pub model_dir: PathBuf,
    pub pneumonia: ImageModelConfig,
    pub diabetes: TabularModelConfig,
    pub diabetes_scaler: ScalerConfig,
}

impl ModelsConfig {
    pub fn pneumonia_path(&self) -> PathBuf {
        self.model_dir.join(&self.pneumonia.onnx_file)
    }

    pub fn diabetes_path(&self) -> PathBuf {
        self.model_dir.join(&self.diabetes.onnx_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.diabetes_scaler.file)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageModelConfig {
    pub onnx_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TabularModelConfig {
    pub onnx_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_label_output")]
    pub label_output: String,
    #[serde(default = "default_probabilities_output")]
    pub probabilities_output: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScalerConfig {
    pub file: String,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_output_name() -> String {
    "output0".into()
}

fn default_label_output() -> String {
    "label".into()
}

fn default_probabilities_output() -> String {
    "probabilities".into()
}

#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_token_expiration_minutes")]
    pub token_expiration_minutes: i64,
}

fn default_token_expiration_minutes() -> i64 {
    60
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret_key.trim().is_empty() {
            return Err(
                "auth.secret_key must be supplied (set APP_AUTH__SECRET_KEY); it has no default"
                    .to_string(),
            );
        }
        if self.token_expiration_minutes <= 0 {
            return Err(format!(
                "auth.token_expiration_minutes must be positive, got {}",
                self.token_expiration_minutes
            ));
        }
        Ok(())
    }
}

// Keeps the signing secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("token_expiration_minutes", &self.token_expiration_minutes)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    config.auth.validate().map_err(config::ConfigError::Message)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert!(matches!(
            Environment::try_from("LOCAL".to_string()),
            Ok(Environment::Local)
        ));
        assert!(matches!(
            Environment::try_from("production".to_string()),
            Ok(Environment::Production)
        ));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::try_from("Debug".to_string()).unwrap().as_str(), "debug");
        assert!(LogLevel::try_from("trace".to_string()).is_err());
    }

    #[test]
    fn test_auth_secret_is_required() {
        let auth = AuthConfig {
            secret_key: "   ".to_string(),
            token_expiration_minutes: 60,
        };
        assert!(auth.validate().is_err());

        let auth = AuthConfig {
            secret_key: "s3cret".to_string(),
            token_expiration_minutes: 60,
        };
        assert!(auth.validate().is_ok());
        assert!(!format!("{:?}", auth).contains("s3cret"));
    }

    #[test]
    fn test_model_paths_join_model_dir() {
        let models = ModelsConfig {
            model_dir: PathBuf::from("/srv/models"),
            pneumonia: ImageModelConfig {
                onnx_file: "pneumonia.onnx".into(),
                num_instances: 1,
                output_name: default_output_name(),
            },
            diabetes: TabularModelConfig {
                onnx_file: "diabetes.onnx".into(),
                num_instances: 1,
                label_output: default_label_output(),
                probabilities_output: default_probabilities_output(),
            },
            diabetes_scaler: ScalerConfig {
                file: "scaler.json".into(),
            },
        };

        assert_eq!(models.pneumonia_path(), PathBuf::from("/srv/models/pneumonia.onnx"));
        assert_eq!(models.diabetes_path(), PathBuf::from("/srv/models/diabetes.onnx"));
        assert_eq!(models.scaler_path(), PathBuf::from("/srv/models/scaler.json"));
    }
}
