//! Configuration for the demo server
//!
//! Precedence: environment variables > config file > defaults.
//!
//! The config file lives at `~/.config/inertia-demo/config.toml` and is
//! generated from `Config::default().to_toml()` on first run.

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod serialization;


use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_SSR_URL: &str = "http://127.0.0.1:13714/render";
const DEFAULT_SSR_TIMEOUT_SECS: u64 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Log Rotation
// ─────────────────────────────────────────────────────────────────────────────

/// Log file rotation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    /// Single log file
    Never,
}

impl LogRotation {
    /// Parse rotation string from config; unknown values fall back to daily
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Write JSON logs to rotating files in addition to stdout
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    /// Prefix for log file names ("inertia-demo" -> "inertia-demo.2026-01-15")
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: PathBuf::from("./logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: "inertia-demo".to_string(),
        }
    }
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<String>,
    pub file_rotation: Option<String>,
    pub file_prefix: Option<String>,
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            level: file.level.unwrap_or(defaults.level),
            file_enabled: file.file_enabled.unwrap_or(defaults.file_enabled),
            file_dir: file.file_dir.map(PathBuf::from).unwrap_or(defaults.file_dir),
            file_rotation: file
                .file_rotation
                .map(|s| LogRotation::parse(&s))
                .unwrap_or(defaults.file_rotation),
            file_prefix: file.file_prefix.unwrap_or(defaults.file_prefix),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSR Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server-side rendering backend
#[derive(Debug, Clone)]
pub struct SsrSettings {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for SsrSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_SSR_URL.to_string(),
            timeout_secs: DEFAULT_SSR_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSsr {
    pub enabled: Option<bool>,
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl SsrSettings {
    /// Create from file config; `env_url` wins over the file and enables SSR
    pub fn from_file(file: Option<FileSsr>, env_url: Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let enabled = env_url.is_some() || file.enabled.unwrap_or(defaults.enabled);
        Self {
            enabled,
            url: env_url.or(file.url).unwrap_or(defaults.url),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// HTML layout; the built-in layout is used when unset
    pub template_path: Option<PathBuf>,
    /// Build manifest hashed into the asset version when `version` is unset
    pub manifest_path: Option<PathBuf>,
    pub version: Option<String>,
    pub root_view_id: String,
    pub ssr: SsrSettings,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            template_path: None,
            manifest_path: None,
            version: None,
            root_view_id: inertia_axum::render::DEFAULT_ROOT_VIEW_ID.to_string(),
            ssr: SsrSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Values read from `INERTIA_*` environment variables
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub bind_addr: Option<String>,
    pub template_path: Option<String>,
    pub version: Option<String>,
    pub ssr_url: Option<String>,
}

impl EnvOverrides {
    /// Read the overrides from the process environment
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("INERTIA_BIND").ok(),
            template_path: std::env::var("INERTIA_TEMPLATE").ok(),
            version: std::env::var("INERTIA_VERSION").ok(),
            ssr_url: std::env::var("INERTIA_SSR_URL").ok(),
        }
    }
}

/// Configuration as loaded from TOML (all fields optional)
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub bind_addr: Option<String>,
    pub template_path: Option<String>,
    pub manifest_path: Option<String>,
    pub version: Option<String>,
    pub root_view_id: Option<String>,
    pub ssr: Option<FileSsr>,
    pub logging: Option<FileLogging>,
}

impl Config {
    /// Get the config file path (~/.config/inertia-demo/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("inertia-demo").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }

        // Config is optional; a failed write only loses the template
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A file that exists but fails to parse is fatal: running with silently
    /// ignored settings is worse than not starting.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: run `inertia-demo config --show` after fixing the file.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("Warning: Could not read config file {}: {}", path.display(), e);
                FileConfig::default()
            }
        }
    }

    /// Load configuration: env > file > defaults
    pub fn from_env() -> Self {
        Self::from_sources(Self::load_file_config(), EnvOverrides::from_env())
    }

    /// Merge env overrides over file values over defaults
    pub(crate) fn from_sources(file: FileConfig, env: EnvOverrides) -> Self {
        let defaults = Self::default();

        let bind_addr = env
            .bind_addr
            .or(file.bind_addr)
            .and_then(|addr| match addr.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    eprintln!("Warning: invalid bind address {:?}, using {}", addr, DEFAULT_BIND);
                    None
                }
            })
            .unwrap_or(defaults.bind_addr);

        let template_path = env.template_path.or(file.template_path).map(PathBuf::from);
        let version = env.version.or(file.version);
        let ssr = SsrSettings::from_file(file.ssr, env.ssr_url);

        Self {
            bind_addr,
            template_path,
            manifest_path: file.manifest_path.map(PathBuf::from),
            version,
            root_view_id: file.root_view_id.unwrap_or(defaults.root_view_id),
            ssr,
            logging: LoggingConfig::from_file(file.logging),
        }
    }
}
