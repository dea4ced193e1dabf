//! Integration tests for logging functionality

use rowship::config::LoggingConfig;
use rowship::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "daily".to_string(),
    };

    let guard = init_logging("info", &config).expect("Failed to initialize logging");
    tracing::info!(target: "rowship", checkpoint = 42, "Checkpoint advanced");
    drop(guard);

    let files: Vec<_> = std::fs::read_dir(&log_path)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("rowship.log"))
        .collect();
    assert_eq!(files.len(), 1);

    let contents = std::fs::read_to_string(files[0].path()).unwrap();
    let line = contents.lines().next().expect("no log line written");
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(json["fields"]["message"], "Checkpoint advanced");
    assert_eq!(json["fields"]["checkpoint"], 42);

    // The global subscriber can only be installed once
    assert!(init_logging("info", &LoggingConfig::default()).is_err());
}
