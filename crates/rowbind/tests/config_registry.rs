use std::fs;

use rowbind::{ConnectionConfig, DbError, DbResult, Registry, RegistryConfig, DEFAULT_CONNECTION};

#[test]
fn relative_sqlite_paths_resolve_against_the_config_file() -> DbResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("rowbind.toml");
    fs::write(
        &config_path,
        r#"
[connections.default]
driver = "sqlite"
path = "app.db"

[connections.scratch]
driver = "sqlite"
path = ":memory:"
"#,
    )
    .unwrap();

    let config = RegistryConfig::load(&config_path)?;
    let expected = dir.path().join("app.db").to_string_lossy().into_owned();
    assert_eq!(
        config.get(DEFAULT_CONNECTION),
        Some(&ConnectionConfig::Sqlite { path: expected })
    );
    assert_eq!(
        config.get("scratch"),
        Some(&ConnectionConfig::Sqlite {
            path: ":memory:".to_string()
        })
    );

    let registry = Registry::from_config(&config)?;
    assert_eq!(registry.names(), vec!["default", "scratch"]);

    let conn = registry.default_connection()?;
    assert_eq!(conn.name()?, "default");
    conn.query("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;
    assert!(dir.path().join("app.db").exists());
    Ok(())
}

#[test]
fn config_files_on_disk_are_shared_between_registries() -> DbResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shared.db");
    let config = RegistryConfig::single(
        DEFAULT_CONNECTION,
        ConnectionConfig::Sqlite {
            path: db_path.to_string_lossy().into_owned(),
        },
    );

    let first = Registry::from_config(&config)?;
    first
        .default_connection()?
        .query("CREATE TABLE notes (code TEXT PRIMARY KEY)")?;

    let second = Registry::from_config(&config)?;
    assert_eq!(second.default_connection()?.tables(true)?, vec!["notes"]);
    Ok(())
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RegistryConfig::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, DbError::Config(_)));
}

#[test]
fn parse_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[connections.default]\ndriver = \"oracle\"\n").unwrap();

    let err = RegistryConfig::load(&path).unwrap_err();
    let DbError::Config(msg) = err else {
        panic!("expected config error, got {err:?}");
    };
    assert!(msg.contains("bad.toml"), "{msg}");
}
