use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where the composition sheet lives and how to read it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
    /// Zero-based row holding the column names; rows above it are skipped
    pub header_row: usize,
    /// Field separator for delimited text sources
    pub csv_delimiter: char,
}

/// OpenAI-compatible chat endpoint used to extract services from page text
#[derive(Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

// keep the key out of startup logs
impl std::fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

const DEFAULT_DATASET: &str = "data/SINAPI_Custo_Ref_Composicoes_Analitico_SP_202412_NaoDesonerado.xlsx";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            dataset: DatasetConfig {
                path: DEFAULT_DATASET.to_string(),
                header_row: 5,
                csv_delimiter: ';',
            },
            extractor: ExtractorConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: None,
                model: DEFAULT_MODEL.to_string(),
                timeout_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from plain environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            dataset: DatasetConfig {
                path: std::env::var("SINAPI_PATH").unwrap_or(defaults.dataset.path),
                header_row: std::env::var("SINAPI_HEADER_ROW")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.dataset.header_row),
                csv_delimiter: std::env::var("SINAPI_CSV_DELIMITER")
                    .ok()
                    .and_then(|v| v.chars().next())
                    .unwrap_or(defaults.dataset.csv_delimiter),
            },
            extractor: ExtractorConfig {
                base_url: std::env::var("OPENROUTER_BASE_URL").unwrap_or(defaults.extractor.base_url),
                api_key: std::env::var("OPENROUTER_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty()),
                model: std::env::var("OPENROUTER_MODEL").unwrap_or(defaults.extractor.model),
                timeout_secs: defaults.extractor.timeout_secs,
            },
        }
    }

    /// Layers `budget.toml` (optional) and `BUDGET_*` variables over [`AppConfig::from_env`].
    ///
    /// Nested keys use a double underscore, e.g. `BUDGET_SERVER__PORT=9000`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("budget")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let base = Self::from_env();
        Config::builder()
            .add_source(Config::try_from(&base)?)
            .add_source(File::with_name(file_stem).required(false))
            .add_source(
                Environment::with_prefix("BUDGET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Delimiter as the single byte the CSV reader expects; falls back to `;`
    pub fn csv_delimiter_byte(&self) -> u8 {
        u8::try_from(self.dataset.csv_delimiter).unwrap_or(b';')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_sheet_layout() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.dataset.header_row, 5);
        assert_eq!(cfg.csv_delimiter_byte(), b';');
        assert_eq!(cfg.extractor.model, "google/gemini-2.5-flash");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("budget");
        let mut file = std::fs::File::create(dir.path().join("budget.toml")).unwrap();
        writeln!(file, "[server]\nport = 9191\n[dataset]\nheader_row = 0").unwrap();

        let cfg = AppConfig::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9191);
        assert_eq!(cfg.dataset.header_row, 0);
        assert_eq!(cfg.dataset.csv_delimiter, ';');
    }

    #[test]
    fn debug_hides_api_key() {
        let mut cfg = AppConfig::default();
        cfg.extractor.api_key = Some("sk-secret".into());
        let shown = format!("{:?}", cfg);
        assert!(!shown.contains("sk-secret"));
    }
}
