use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::home_dir::resolve_home_dir;

/// Module name of the REST host; its `bind_addr` follows `--port`.
const INGRESS_MODULE: &str = "api_ingress";

/// Main application configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Core server configuration.
    pub server: ServerConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub home_dir: String, // will be normalized to absolute path
    pub host: String,
    pub port: u16,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    pub file: String,          // "logs/api.log"
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => platform default resolved by resolve_home_dir():
            // Windows: %APPDATA%/.bookshelf
            // Unix/macOS: $HOME/.bookshelf
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8087,
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/bookshelf.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `server.home_dir` into an absolute path and creates the directory.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let config_path = config_path.as_ref();
        if !config_path.is_file() {
            bail!("config file not found: {}", config_path.display());
        }

        // Optional sections stay None unless explicitly provided by YAML/ENV.
        let base = AppConfig {
            server: ServerConfig::default(),
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path))
            // Example: APP__SERVER__PORT=8087 maps to server.port
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| format!("invalid configuration in {}", config_path.display()))?;

        normalize_home_dir_inplace(&mut config.server)
            .context("Failed to resolve server.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or create with default values.
    /// Also normalizes `server.home_dir` into an absolute path and creates the directory.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)
                    .context("Failed to resolve server.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
            let bind_addr = format!("{}:{}", self.server.host, port);
            let ingress = self
                .modules
                .entry(INGRESS_MODULE.to_string())
                .or_insert_with(|| serde_json::json!({}));
            if let Some(obj) = ingress.as_object_mut() {
                obj.insert("bind_addr".to_string(), serde_json::Value::String(bind_addr));
            }
        }

        // Set logging level based on verbose flags for "default" section.
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(), // keep
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
}

const fn default_subdir() -> &'static str {
    ".bookshelf"
}

/// Normalize `server.home_dir` and store the absolute path back.
fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let opt = if server.home_dir.trim().is_empty() {
        None
    } else {
        Some(server.home_dir.clone())
    };

    let resolved: PathBuf = resolve_home_dir(opt, default_subdir(), /*create*/ true)
        .context("home_dir normalization failed")?;

    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "yml" && ext != "yaml" {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read module config {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        bag.insert(name, serde_json::to_value(val)?);
    }
    Ok(())
}

/// Read-only view over the per-module configuration bag.
#[derive(Debug, Clone)]
pub struct AppConfigProvider(AppConfig);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(config)
    }

    pub fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// Helper: a normalized home_dir should be absolute and not start with '~'.
    fn is_normalized_path(p: &str) -> bool {
        let pb = PathBuf::from(p);
        pb.is_absolute() && !p.starts_with('~')
    }

    fn write_cfg(dir: &Path, name: &str, yaml: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, yaml).unwrap();
        p
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8087);
        // raw (not yet normalized)
        assert_eq!(config.server.home_dir, "");

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/bookshelf.log");

        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_reads_module_sections() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("home");
        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090

modules:
  book_owners:
    base_url: "https://owners.example.com"
  api_ingress:
    bind_addr: "0.0.0.0:9090"
    enable_docs: true
"#,
            home.to_string_lossy().replace('\\', "/")
        );
        let cfg_path = write_cfg(tmp.path(), "cfg.yaml", &yaml);

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(is_normalized_path(&config.server.home_dir));
        assert!(home.is_dir(), "home_dir must be created");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.modules["book_owners"]["base_url"],
            "https://owners.example.com"
        );
        assert_eq!(config.modules["api_ingress"]["enable_docs"], true);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_load_layered_missing_file_fails() {
        let err = AppConfig::load_layered("/nonexistent/bookshelf.yaml").unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let tmp = tempdir().unwrap();
        let cfg_path = write_cfg(
            tmp.path(),
            "bad.yaml",
            r#"
server:
  home_dir: "~/.bookshelf_bad"
  host: "127.0.0.1"
  port: 8087
database:
  url: "sqlite://nope"
"#,
        );
        assert!(AppConfig::load_layered(&cfg_path).is_err());
    }

    #[test]
    fn test_cli_port_override_rewrites_ingress_bind_addr() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "api_ingress".into(),
            serde_json::json!({ "bind_addr": "127.0.0.1:8087", "enable_docs": true }),
        );

        let args = CliArgs {
            port: Some(3000),
            verbose: 2,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.modules["api_ingress"]["bind_addr"], "127.0.0.1:3000");
        assert_eq!(config.modules["api_ingress"]["enable_docs"], true);

        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "trace");
    }

    #[test]
    fn test_cli_port_override_creates_ingress_section() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs {
            port: Some(4000),
            ..Default::default()
        });
        assert_eq!(config.modules["api_ingress"]["bind_addr"], "127.0.0.1:4000");
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose_level, expected_log_level) in
            [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")]
        {
            let mut config = AppConfig::default();
            let args = CliArgs {
                verbose: verbose_level,
                ..Default::default()
            };

            config.apply_cli_overrides(&args);

            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected_log_level);
        }
    }

    #[test]
    fn test_layered_config_loading_with_modules_dir() {
        let tmp = tempdir().unwrap();
        let modules_dir = tmp.path().join("modules");
        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("book_owners.yaml"),
            "base_url: \"http://localhost:5000\"\n",
        )
        .unwrap();
        fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 8087

modules_dir: "{}"

modules:
  api_ingress:
    bind_addr: "127.0.0.1:8087"
"#,
            tmp.path().join("home").to_string_lossy().replace('\\', "/"),
            modules_dir.to_string_lossy().replace('\\', "/")
        );
        let cfg_path = write_cfg(tmp.path(), "modules_dir.yaml", &yaml);

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(config.modules.contains_key("api_ingress"));
        assert_eq!(
            config.modules["book_owners"]["base_url"],
            "http://localhost:5000"
        );
        assert!(!config.modules.contains_key("notes"));
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("server:"));
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.server.port, config.server.port);
    }

    #[test]
    fn test_provider_exposes_module_sections() {
        let mut config = AppConfig::default();
        config
            .modules
            .insert("book_owners".into(), serde_json::json!({ "base_url": "http://x" }));
        let provider = AppConfigProvider::new(config);

        assert_eq!(
            provider.get_module_config("book_owners").unwrap()["base_url"],
            "http://x"
        );
        assert!(provider.get_module_config("missing").is_none());
    }
}
