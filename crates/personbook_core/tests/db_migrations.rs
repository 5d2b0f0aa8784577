use personbook_core::db::migrations::{current_user_version, latest_version};
use personbook_core::db::open_db;
use personbook_core::{
    DbError, MigrationPolicy, Passphrase, PersonRepository, PersonStore, SqlitePersonRepository,
    StoreConfig,
};
use rusqlite::Connection;
use std::path::Path;

const PASSPHRASE: &str = "correct horse battery staple";

fn config(path: &Path) -> StoreConfig {
    StoreConfig::file(path, Passphrase::new(PASSPHRASE).unwrap())
}

#[test]
fn open_in_memory_applies_all_migrations() {
    let conn = open_db(&StoreConfig::in_memory(Passphrase::new("mem").unwrap())).unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_eq!(latest_version(), 2);
    assert_table_exists(&conn, "persons");
    assert_column_exists(&conn, "persons", "salary");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persons.db");

    let conn_first = open_db(&config(&path)).unwrap();
    assert_eq!(current_user_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&config(&path)).unwrap();
    assert_eq!(current_user_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "persons");
}

#[test]
fn version_one_file_gains_salary_column_with_zero_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.pragma_update(None, "key", PASSPHRASE).unwrap();
    conn.execute_batch(
        "CREATE TABLE persons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            age INTEGER NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        INSERT INTO persons (first_name, last_name, email, phone, age, address, created_at, updated_at)
        VALUES ('Old', 'Timer', 'old@x.com', '555', 70, '', 1000, 1000);
        PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let store = PersonStore::open(&config(&path)).unwrap();
    assert_eq!(store.schema_version().unwrap(), 2);

    let repo = SqlitePersonRepository::new(store);
    let migrated = repo.get_by_id(1).unwrap().expect("v1 row should survive");
    assert_eq!(migrated.first_name, "Old");
    assert_eq!(migrated.salary, 0.0);
    assert_eq!(migrated.created_at, 1000);
}

#[test]
fn newer_schema_version_fails_closed_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    write_future_version(&path, 999);

    let err = open_db(&config(&path)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    // The refused open must not have rewritten the version marker.
    let conn = keyed_connection(&path);
    assert_eq!(current_user_version(&conn).unwrap(), 999);
}

#[test]
fn destructive_policy_recreates_table_at_latest_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    write_future_version(&path, 7);

    let store = PersonStore::open(
        &config(&path).with_migration_policy(MigrationPolicy::DestructiveRecreate),
    )
    .unwrap();
    assert_eq!(store.schema_version().unwrap(), latest_version());

    let repo = SqlitePersonRepository::new(store);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn wrong_passphrase_is_access_denied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.db");

    let store = PersonStore::open(&config(&path)).unwrap();
    store.close().unwrap();

    let wrong = StoreConfig::file(&path, Passphrase::new("not the passphrase").unwrap());
    assert!(matches!(open_db(&wrong), Err(DbError::AccessDenied)));
}

#[test]
fn plaintext_file_is_access_denied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE unrelated (id INTEGER PRIMARY KEY);")
        .unwrap();
    drop(conn);

    assert!(matches!(
        PersonStore::open(&config(&path)),
        Err(DbError::AccessDenied)
    ));
}

fn write_future_version(path: &Path, version: u32) {
    let store = PersonStore::open(&config(path)).unwrap();
    store.close().unwrap();

    let conn = keyed_connection(path);
    conn.execute_batch(&format!(
        "INSERT INTO persons (first_name, last_name, email, phone, age, created_at, updated_at)
         VALUES ('Doomed', 'Row', 'd@x.com', '1', 1, 1, 1);
         PRAGMA user_version = {version};"
    ))
    .unwrap();
}

fn keyed_connection(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.pragma_update(None, "key", PASSPHRASE).unwrap();
    conn
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_column_exists(conn: &Connection, table_name: &str, column: &str) {
    let exists: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM pragma_table_info('{table_name}') WHERE name = ?1;"),
            [column],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "column {table_name}.{column} does not exist");
}
