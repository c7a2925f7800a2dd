use clap::Parser;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.collection.id = Some("journal".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = CollectionOverrides {
        collection: Some("notes".to_string()),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.collection.id, "notes");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.collection.id, DEFAULT_COLLECTION_ID);
    assert_eq!(settings.collection.store_path, PathBuf::from(DEFAULT_STORE_PATH));
    assert_eq!(settings.collection.timezone, Tz::UTC);
    assert_eq!(settings.collection.recent_entries, DEFAULT_RECENT_ENTRIES);
    assert!(settings.listeners.entry.is_empty());
    assert!(settings.request_log.path.is_none());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = CollectionOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn timezone_names_are_validated() {
    let mut raw = RawSettings::default();
    raw.collection.timezone = Some("Europe/Berlin".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.collection.timezone, chrono_tz::Europe::Berlin);

    let mut raw = RawSettings::default();
    raw.collection.timezone = Some("Mars/Olympus".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown timezone");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "collection.timezone",
            ..
        }
    ));
}

#[test]
fn collection_id_must_be_path_safe() {
    let mut raw = RawSettings::default();
    raw.collection.id = Some("../etc".to_string());
    let err = Settings::from_raw(raw).expect_err("unsafe id");
    assert!(matches!(err, LoadError::Invalid { key: "collection.id", .. }));
}

#[test]
fn recent_entries_must_be_positive() {
    let mut raw = RawSettings::default();
    raw.collection.recent_entries = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "collection.recent_entries",
            ..
        }
    ));
}

#[test]
fn blank_listener_names_are_rejected() {
    let mut raw = RawSettings::default();
    raw.listeners.entry = vec!["trace".to_string(), "  ".to_string()];
    let err = Settings::from_raw(raw).expect_err("blank name");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "listeners.entry",
            ..
        }
    ));
}

#[test]
fn config_file_layers_under_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("archivist.toml");
    std::fs::write(
        &path,
        r#"
[collection]
id = "journal"
recent_entries = 5

[listeners]
entry = ["trace"]
"#,
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "archivist",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "stats",
        "--recent-entries",
        "7",
    ]);
    let settings = load(&args).expect("valid settings");

    assert_eq!(settings.collection.id, "journal");
    assert_eq!(settings.collection.recent_entries, 7);
    assert_eq!(settings.listeners.entry, vec!["trace"]);
}

#[test]
fn parse_archive_arguments() {
    let args = CliArgs::parse_from([
        "archivist",
        "archive",
        "--date",
        "2024-02-29",
        "--timezone",
        "Asia/Tokyo",
    ]);

    match args.command.expect("archive command") {
        Command::Archive(archive) => {
            assert_eq!(archive.date.map(|date| date.to_string()).as_deref(), Some("2024-02-29"));
            assert_eq!(archive.overrides.timezone.as_deref(), Some("Asia/Tokyo"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn archive_rejects_invalid_dates() {
    let result = CliArgs::try_parse_from(["archivist", "archive", "--date", "2023-02-29"]);
    assert!(result.is_err());
}
