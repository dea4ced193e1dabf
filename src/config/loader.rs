//! Configuration loader with TOML parsing and environment variable overrides
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file
//! (with `${VAR}` substitution), then `ROWSHIP_<SECTION>_<KEY>` variables.

use super::schema::RowshipConfig;
use super::secret::secret_string_opt;
use crate::domain::errors::RowshipError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads and validates configuration
///
/// This function:
/// 1. Starts from defaults, or reads the TOML file when `path` is given
/// 2. Performs environment variable substitution (${VAR} syntax) on the file
/// 3. Applies environment variable overrides (ROWSHIP_* prefix)
/// 4. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced variable is unset, an override is malformed, or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use rowship::config::loader::load_config;
///
/// // Environment only
/// let config = load_config(None::<&str>).expect("Failed to load config");
/// ```
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<RowshipConfig> {
    let config = load_unvalidated(path)?;

    config.validate().map_err(|e| {
        RowshipError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Loads configuration layers without validating the result
///
/// Used for best-effort settings (such as logging) that are needed before a
/// full configuration error can be reported.
pub fn load_unvalidated<P: AsRef<Path>>(path: Option<P>) -> Result<RowshipConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path.as_ref())?,
        None => RowshipConfig::default(),
    };

    apply_env_overrides(&mut config)?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<RowshipConfig> {
    if !path.exists() {
        return Err(RowshipError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RowshipError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    toml::from_str(&contents)
        .map_err(|e| RowshipError::Configuration(format!("Failed to parse TOML: {e}")))
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| RowshipError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(RowshipError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            RowshipError::Configuration(format!("Invalid value '{raw}' for {name}: {e}"))
        }),
        None => Ok(None),
    }
}

/// Applies environment variable overrides using the ROWSHIP_* prefix
///
/// Environment variables follow the pattern ROWSHIP_<SECTION>_<KEY>, for
/// example ROWSHIP_DATABASE_HOST or ROWSHIP_EXPORT_BATCH_SIZE. A malformed
/// numeric or boolean value is a configuration error rather than silently
/// ignored.
fn apply_env_overrides(config: &mut RowshipConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_var("ROWSHIP_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Database overrides
    let db = &mut config.database;
    if let Some(val) = env_parse("ROWSHIP_DATABASE_ENGINE")? {
        db.engine = val;
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_HOST") {
        db.host = val;
    }
    if let Some(val) = env_parse("ROWSHIP_DATABASE_PORT")? {
        db.port = Some(val);
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_SOCKET_DIR") {
        db.socket_dir = Some(val).filter(|s| !s.is_empty());
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_SOCKET_PATH") {
        db.socket_path = Some(val).filter(|s| !s.is_empty());
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_USERNAME") {
        db.username = val;
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_PASSWORD") {
        db.password = secret_string_opt(Some(val));
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_NAME") {
        db.database_name = val;
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_TABLE") {
        db.table = val;
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_ID_COLUMN") {
        db.id_column = val;
    }
    if let Some(val) = env_parse("ROWSHIP_DATABASE_CONNECTION_TIMEOUT_SECONDS")? {
        db.connection_timeout_seconds = val;
    }
    if let Some(val) = env_parse("ROWSHIP_DATABASE_STATEMENT_TIMEOUT_SECONDS")? {
        db.statement_timeout_seconds = val;
    }
    if let Some(val) = env_parse("ROWSHIP_DATABASE_KEEPALIVE_IDLE_SECONDS")? {
        db.keepalive_idle_seconds = val;
    }
    if let Some(val) = env_var("ROWSHIP_DATABASE_SSL_MODE") {
        db.ssl_mode = val;
    }

    // Transfer overrides
    let transfer = &mut config.transfer;
    if let Some(val) = env_var("ROWSHIP_TRANSFER_HOST") {
        transfer.host = val;
    }
    if let Some(val) = env_parse("ROWSHIP_TRANSFER_PORT")? {
        transfer.port = val;
    }
    if let Some(val) = env_var("ROWSHIP_TRANSFER_USERNAME") {
        transfer.username = val;
    }
    if let Some(val) = env_var("ROWSHIP_TRANSFER_PASSWORD") {
        transfer.password = secret_string_opt(Some(val));
    }
    if let Some(val) = env_var("ROWSHIP_TRANSFER_KEY_PATH") {
        transfer.key_path = Some(val).filter(|s| !s.is_empty());
    }
    if let Some(val) = env_var("ROWSHIP_TRANSFER_KEY_PASSPHRASE") {
        transfer.key_passphrase = secret_string_opt(Some(val));
    }
    if let Some(val) = env_var("ROWSHIP_TRANSFER_KNOWN_HOSTS_PATH") {
        transfer.known_hosts_path = Some(val).filter(|s| !s.is_empty());
    }
    if let Some(val) = env_var("ROWSHIP_TRANSFER_REMOTE_DIR") {
        transfer.remote_dir = val;
    }
    if let Some(val) = env_parse("ROWSHIP_TRANSFER_CREATE_REMOTE_DIR")? {
        transfer.create_remote_dir = val;
    }
    if let Some(val) = env_parse("ROWSHIP_TRANSFER_TIMEOUT_SECONDS")? {
        transfer.timeout_seconds = val;
    }

    // Export overrides
    let export = &mut config.export;
    if let Some(val) = env_var("ROWSHIP_EXPORT_WORK_DIR") {
        export.work_dir = val;
    }
    if let Some(val) = env_parse("ROWSHIP_EXPORT_BATCH_SIZE")? {
        export.batch_size = val;
    }
    if let Some(val) = env_var("ROWSHIP_EXPORT_FILE_PREFIX") {
        export.file_prefix = Some(val).filter(|s| !s.is_empty());
    }
    if let Some(val) = env_var("ROWSHIP_EXPORT_CHECKPOINT_FILE") {
        export.checkpoint_file = val;
    }
    if let Some(val) = env_parse("ROWSHIP_EXPORT_KEEP_ARTIFACTS")? {
        export.keep_artifacts = val;
    }
    if let Some(val) = env_parse("ROWSHIP_EXPORT_DRY_RUN")? {
        export.dry_run = val;
    }

    // Logging overrides
    if let Some(val) = env_parse("ROWSHIP_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env_var("ROWSHIP_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env_var("ROWSHIP_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
