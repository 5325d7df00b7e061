//! Configuration management for LigaBairro using the prefer crate.
//!
//! Resolution order, lowest to highest priority: built-in defaults, the
//! config file (explicit `--config` path, one next to the data directory, or
//! discovered by prefer), environment variables, then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, Geofence};
use crate::repository::DbContext;

/// Default database filename inside the data directory.
const DEFAULT_DATABASE_FILENAME: &str = "ligabairro.db";

/// Default uploads subdirectory name.
const UPLOADS_SUBDIR: &str = "uploads";

/// Agudo, RS, Brazil.
pub const DEFAULT_CENTER_LAT: f64 = -29.6447;
pub const DEFAULT_CENTER_LNG: f64 = -53.2515;
pub const DEFAULT_RADIUS_KM: f64 = 15.0;

/// Geographic settings.
#[derive(Debug, Clone, Copy)]
pub struct GeoSettings {
    /// Town center the geofence is drawn around.
    pub center: GeoPoint,
    /// Operational radius in kilometres.
    pub radius_km: f64,
    /// Search radius used when a search gives an origin but no radius.
    pub default_search_radius_km: f64,
    /// Upper bound for client-supplied search radii.
    pub max_search_radius_km: f64,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            center: GeoPoint {
                lat: DEFAULT_CENTER_LAT,
                lng: DEFAULT_CENTER_LNG,
            },
            radius_km: DEFAULT_RADIUS_KM,
            default_search_radius_km: 5.0,
            max_search_radius_km: 50.0,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Directory where uploaded images are stored and served from.
    pub uploads_dir: PathBuf,
    pub geo: GeoSettings,
    /// Session lifetime in hours.
    pub session_ttl_hours: u64,
    /// Largest accepted upload (and request body) in bytes.
    pub max_upload_bytes: usize,
    /// Longest side of stored images in pixels.
    pub image_max_dimension: u32,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_origin: Option<String>,
    /// Buffered events per realtime room.
    pub ws_channel_capacity: usize,
    /// Lifetime of cached admin statistics in seconds.
    pub stats_cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/.local/share/ligabairro on Linux; falls back to home, then CWD.
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ligabairro");

        Self {
            uploads_dir: data_dir.join(UPLOADS_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            geo: GeoSettings::default(),
            session_ttl_hours: 720,
            max_upload_bytes: 5 * 1024 * 1024,
            image_max_dimension: 1200,
            cors_origin: None,
            ws_channel_capacity: 64,
            stats_cache_ttl_secs: 60,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            uploads_dir: data_dir.join(UPLOADS_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data and uploads directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.uploads_dir)?;
        Ok(())
    }

    /// Create a database context for these settings.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }

    pub fn geofence(&self) -> Geofence {
        Geofence::new(self.geo.center, self.geo.radius_km)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours as i64)
    }

    pub fn stats_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_cache_ttl_secs)
    }

    /// Clamp a requested search radius, falling back to the default.
    pub fn search_radius(&self, requested: Option<f64>) -> f64 {
        requested
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(self.geo.default_search_radius_km)
            .min(self.geo.max_search_radius_km)
    }
}

/// Geographic section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct GeoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_search_radius_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_search_radius_km: Option<f64>,
}

impl GeoConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Uploads directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ttl_hours: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_max_dimension: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_channel_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_cache_ttl_secs: Option<u64>,
    /// Tables serialize after plain values, so this stays last.
    #[serde(default, skip_serializing_if = "GeoConfig::is_default")]
    #[prefer(default)]
    pub geo: GeoConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        match prefer::load("ligabairro").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// TOML, YAML and JSON are recognised by extension; anything else is read as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Directory of the config file, used to resolve relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// A leading `~/` expands to the home directory.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = match (path_str.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(path_str),
        };

        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.uploads_dir = settings.data_dir.join(UPLOADS_SUBDIR);
        }
        if let Some(ref uploads_dir) = self.uploads_dir {
            settings.uploads_dir = self.resolve_path(uploads_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }

        apply_center(settings, self.geo.center_lat, self.geo.center_lng);
        if let Some(radius) = self.geo.radius_km.filter(|r| *r >= 0.0) {
            settings.geo.radius_km = radius;
        }
        if let Some(radius) = self.geo.default_search_radius_km.filter(|r| *r > 0.0) {
            settings.geo.default_search_radius_km = radius;
        }
        if let Some(radius) = self.geo.max_search_radius_km.filter(|r| *r > 0.0) {
            settings.geo.max_search_radius_km = radius;
        }

        if let Some(hours) = self.session_ttl_hours {
            settings.session_ttl_hours = hours;
        }
        if let Some(bytes) = self.max_upload_bytes {
            settings.max_upload_bytes = bytes;
        }
        if let Some(dim) = self.image_max_dimension.filter(|d| *d > 0) {
            settings.image_max_dimension = dim;
        }
        if let Some(ref origin) = self.cors_origin {
            settings.cors_origin = Some(origin.clone());
        }
        if let Some(capacity) = self.ws_channel_capacity.filter(|c| *c > 0) {
            settings.ws_channel_capacity = capacity;
        }
        if let Some(ttl) = self.stats_cache_ttl_secs {
            settings.stats_cache_ttl_secs = ttl;
        }
    }

    /// Snapshot of fully resolved settings, for `config show`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            data_dir: Some(settings.data_dir.display().to_string()),
            database: Some(settings.database_filename.clone()),
            uploads_dir: Some(settings.uploads_dir.display().to_string()),
            geo: GeoConfig {
                center_lat: Some(settings.geo.center.lat),
                center_lng: Some(settings.geo.center.lng),
                radius_km: Some(settings.geo.radius_km),
                default_search_radius_km: Some(settings.geo.default_search_radius_km),
                max_search_radius_km: Some(settings.geo.max_search_radius_km),
            },
            session_ttl_hours: Some(settings.session_ttl_hours),
            max_upload_bytes: Some(settings.max_upload_bytes),
            image_max_dimension: Some(settings.image_max_dimension),
            cors_origin: settings.cors_origin.clone(),
            ws_channel_capacity: Some(settings.ws_channel_capacity),
            stats_cache_ttl_secs: Some(settings.stats_cache_ttl_secs),
            source_path: None,
        }
    }
}

/// Move the geofence center if both coordinates are present and valid.
fn apply_center(settings: &mut Settings, lat: Option<f64>, lng: Option<f64>) {
    let (lat, lng) = (
        lat.unwrap_or(settings.geo.center.lat),
        lng.unwrap_or(settings.geo.center.lng),
    );
    match GeoPoint::new(lat, lng) {
        Ok(center) => settings.geo.center = center,
        Err(e) => tracing::warn!("Ignoring configured center: {}", e),
    }
}

/// Apply environment overrides. `lookup` is `std::env::var` outside tests.
fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());
    let get_f64 = |name: &str| {
        get(name).and_then(|raw| match raw.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring {}: '{}' is not a number", name, raw);
                None
            }
        })
    };

    if let Some(database_url) = get("DATABASE_URL") {
        tracing::debug!("Using DATABASE_URL from environment: {}", database_url);
        settings.database_url = Some(database_url);
    }
    if let Some(data_dir) = get("LIGABAIRRO_DATA_DIR") {
        settings.data_dir = PathBuf::from(data_dir);
        settings.uploads_dir = settings.data_dir.join(UPLOADS_SUBDIR);
    }

    let (lat, lng) = (
        get_f64("LIGABAIRRO_CENTER_LAT"),
        get_f64("LIGABAIRRO_CENTER_LNG"),
    );
    if lat.is_some() || lng.is_some() {
        apply_center(settings, lat, lng);
    }
    if let Some(radius) = get_f64("LIGABAIRRO_RADIUS_KM").filter(|r| *r >= 0.0) {
        settings.geo.radius_km = radius;
    }
    if let Some(origin) = get("LIGABAIRRO_CORS_ORIGIN") {
        settings.cors_origin = Some(origin);
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory (--data-dir flag).
    pub data_dir: Option<PathBuf>,
}

/// Look for `ligabairro.{toml,yaml,yml,json}` or `config.*` inside the data directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "yaml", "yml", "json"];
    let basenames = ["ligabairro", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

async fn load_file_config(options: &LoadOptions) -> Config {
    // Priority 1: explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                Config::default()
            });
    }

    // Priority 2: config inside the data dir
    if let Some(config_path) = options.data_dir.as_deref().and_then(find_config_in_dir) {
        tracing::debug!("Found config in data dir: {}", config_path.display());
        return Config::load_from_path(&config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                Config::default()
            });
    }

    // Priority 3: auto-discover via prefer
    Config::load().await
}

/// Load settings with explicit options.
/// Returns the resolved settings and the file config they were built from.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_file_config(&options).await;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = config.base_dir().unwrap_or_else(|| cwd.clone());

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());

    // --data-dir takes precedence over file and environment
    if let Some(data_dir) = options.data_dir {
        settings.data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            cwd.join(data_dir)
        };
        if config.uploads_dir.is_none() {
            settings.uploads_dir = settings.data_dir.join(UPLOADS_SUBDIR);
        }
    }

    (settings, config)
}
