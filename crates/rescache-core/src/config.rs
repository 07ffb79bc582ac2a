use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_PREFIX: &str = "rescache";
/// Sub-directory of the config home holding `<name>.json` descriptors.
const DESCRIPTOR_SUBDIR: &str = "resources";

/// Transfer parameters (optional `[fetch]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Seconds allowed for the TCP/TLS connect.
    pub connect_timeout_secs: u64,
    /// Whole-transfer timeout in seconds (None = unlimited).
    pub timeout_secs: Option<u64>,
    /// Abort when slower than this many bytes/sec for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    pub max_redirections: u32,
    /// Read chunk size in bytes.
    pub buffer_size: usize,
    /// Optional bandwidth cap in bytes per second.
    pub max_recv_speed: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: None,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            max_redirections: 10,
            buffer_size: 16 * 1024,
            max_recv_speed: None,
        }
    }
}

/// Global configuration loaded from `~/.config/rescache/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescacheConfig {
    /// Overrides the default cache root (`~/.cache/rescache`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Overrides the default descriptor root (`~/.config/rescache/resources`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Explicit directories a resolver is built from. No process-wide defaults
/// leak into the core beyond this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub cache_dir: PathBuf,
    pub descriptor_dir: PathBuf,
}

impl ResolverConfig {
    pub fn new(cache_dir: impl Into<PathBuf>, descriptor_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            descriptor_dir: descriptor_dir.into(),
        }
    }

    /// Resolve directories: explicit overrides, then the config file, then XDG defaults.
    pub fn from_config(
        cfg: &RescacheConfig,
        cache_dir: Option<&Path>,
        config_dir: Option<&Path>,
    ) -> Result<Self> {
        let cache_dir = match cache_dir.map(Path::to_path_buf).or_else(|| cfg.cache_dir.clone()) {
            Some(d) => d,
            None => default_cache_dir()?,
        };
        let descriptor_dir =
            match config_dir.map(Path::to_path_buf).or_else(|| cfg.config_dir.clone()) {
                Some(d) => d,
                None => default_descriptor_dir()?,
            };
        Ok(Self {
            cache_dir,
            descriptor_dir,
        })
    }
}

/// `$XDG_CACHE_HOME/rescache`.
pub fn default_cache_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::new()?;
    Ok(xdg_dirs.get_cache_home().join(APP_PREFIX))
}

/// `$XDG_CONFIG_HOME/rescache/resources`.
pub fn default_descriptor_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::new()?;
    Ok(xdg_dirs.get_config_home().join(APP_PREFIX).join(DESCRIPTOR_SUBDIR))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RescacheConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RescacheConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<RescacheConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: RescacheConfig = toml::from_str(&data)?;
    Ok(cfg)
}
