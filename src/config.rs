use anyhow::{Context, Result, bail};
use axum_extra::extract::cookie::Key;
use moka::future::Cache;
use reports::PdfFonts;
use sea_orm::sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sha2::{Digest, Sha512};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::auth::session;
use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/app.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";
const DEFAULT_SESSION_LIFETIME_SECS: u64 = 3600;
/// How long dropdown values stay cached.
const DROPDOWN_CACHE_TTL: Duration = Duration::from_secs(900);

/// Runtime settings read from the environment.
#[derive(Clone)]
pub struct Settings {
    pub secret_key: String,
    pub database_url: String,
    /// Marks session cookies `Secure`.
    pub production: bool,
    pub session_lifetime: Duration,
    pub pdf_fonts: PdfFonts,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secret_key", &"[REDACTED]")
            .field("database_url", &self.database_url)
            .field("production", &self.production)
            .field("session_lifetime", &self.session_lifetime)
            .field("pdf_fonts", &self.pdf_fonts)
            .finish()
    }
}

impl Settings {
    /// Reads `SECRET_KEY` (required), `APP_ENV`, `SESSION_LIFETIME_SECS`,
    /// `PDF_FONT_DIR` and `PDF_FONT_FAMILY`.
    pub fn from_env(database_url: &str) -> Result<Self> {
        let secret_key = match std::env::var("SECRET_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("SECRET_KEY environment variable is not set"),
        };

        let production = std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let session_lifetime = match std::env::var("SESSION_LIFETIME_SECS") {
            Ok(value) => Duration::from_secs(
                value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid SESSION_LIFETIME_SECS '{}'", value))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_SESSION_LIFETIME_SECS),
        };

        let mut pdf_fonts = PdfFonts::default();
        if let Ok(dir) = std::env::var("PDF_FONT_DIR") {
            pdf_fonts.dir = PathBuf::from(dir);
        }
        if let Ok(family) = std::env::var("PDF_FONT_FAMILY") {
            pdf_fonts.family = family;
        }

        Ok(Self {
            secret_key,
            database_url: database_url.to_string(),
            production,
            session_lifetime,
            pdf_fonts,
        })
    }

    /// Cookie signing key derived from `SECRET_KEY`.
    pub fn cookie_key(&self) -> Key {
        let digest = Sha512::digest(self.secret_key.as_bytes());
        Key::from(digest.as_slice())
    }
}

/// `LOG_TO_FILE` set to `1`, `true` or `yes`.
pub fn log_to_file() -> bool {
    std::env::var("LOG_TO_FILE")
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// File path of a SQLite URL, `None` for in-memory databases.
pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Opens the pool. File databases get their directory created, and every
/// pooled connection runs in WAL mode with `synchronous=NORMAL`.
pub async fn connect_database(database_url: &str) -> Result<DatabaseConnection> {
    trace!("Entering connect_database function");
    let sqlite_file = sqlite_path(database_url);

    let url = match &sqlite_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
            if database_url.contains("mode=") {
                database_url.to_string()
            } else if database_url.contains('?') {
                format!("{}&mode=rwc", database_url)
            } else {
                format!("{}?mode=rwc", database_url)
            }
        }
        None => database_url.to_string(),
    };

    info!("Connecting to database: {}", url);
    let mut options = ConnectOptions::new(url);
    if sqlite_file.is_some() {
        options.map_sqlx_sqlite_opts(|opts| {
            opts.journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        });
        debug!("SQLite connections use WAL mode");
    }

    Ok(Database::connect(options).await?)
}

/// Assembles the shared state around an open connection.
pub fn build_app_state(db: DatabaseConnection, settings: Settings) -> AppState {
    let cache = Cache::builder()
        .max_capacity(100)
        .time_to_live(DROPDOWN_CACHE_TTL)
        .build();
    let sessions = session::new_store(settings.session_lifetime);
    let cookie_key = settings.cookie_key();

    AppState {
        db,
        cache,
        sessions,
        cookie_key,
        settings: Arc::new(settings),
    }
}

/// Initialize application configuration and state for the given database
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    let settings = Settings::from_env(database_url)?;
    debug!("Loaded settings: {:?}", settings);

    let db = connect_database(database_url).await?;
    Ok(build_app_state(db, settings))
}
