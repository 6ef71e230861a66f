use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, EntityTrait, Schema, Statement,
};
use tracing::{debug, info};
use url::Url;

use crate::entities::{
    battle_combo, battle_combo_move, combo, combo_move, combo_tag, dance_move, goal, goal_stage,
    move_tag, tag,
};
use crate::error::AppError;

pub const SCHEMA_VERSION: i32 = 2;

/// Columns introduced after the first schema version. Databases created
/// before they existed get them through `ALTER TABLE ... ADD COLUMN`.
const ADDITIVE_COLUMNS: &[AdditiveColumn] = &[
    AdditiveColumn {
        since: 2,
        table: "battle_combos",
        column: "used",
        definition: "boolean NOT NULL DEFAULT 0",
    },
    AdditiveColumn {
        since: 2,
        table: "goal_stages",
        column: "unit",
        definition: "varchar NOT NULL DEFAULT 'reps'",
    },
];

struct AdditiveColumn {
    since: i32,
    table: &'static str,
    column: &'static str,
    definition: &'static str,
}

pub fn resolve_db_path(home: &Path) -> PathBuf {
    home.join("breakbook.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    debug!(url = %sqlite_url, "connecting to database");
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let version = user_version(db).await?;
    if version > SCHEMA_VERSION {
        return Err(AppError::InvalidInput(format!(
            "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    // Parents before children so foreign keys resolve.
    create_table(db, dance_move::Entity).await?;
    create_table(db, tag::Entity).await?;
    create_table(db, move_tag::Entity).await?;
    create_table(db, combo::Entity).await?;
    create_table(db, combo_move::Entity).await?;
    create_table(db, combo_tag::Entity).await?;
    create_table(db, battle_combo::Entity).await?;
    create_table(db, battle_combo_move::Entity).await?;
    create_table(db, goal::Entity).await?;
    create_table(db, goal_stage::Entity).await?;

    let builder = db.get_database_backend();

    let mut move_tag_index = Index::create()
        .name("idx_move_tags_tag")
        .table(move_tag::Entity)
        .col(move_tag::Column::TagId)
        .to_owned();
    move_tag_index.if_not_exists();
    db.execute(builder.build(&move_tag_index)).await?;

    let mut combo_move_index = Index::create()
        .name("idx_combo_moves_combo_order")
        .table(combo_move::Entity)
        .col(combo_move::Column::ComboId)
        .col(combo_move::Column::SortOrder)
        .to_owned();
    combo_move_index.if_not_exists();
    db.execute(builder.build(&combo_move_index)).await?;

    let mut battle_move_index = Index::create()
        .name("idx_battle_combo_moves_combo_order")
        .table(battle_combo_move::Entity)
        .col(battle_combo_move::Column::BattleComboId)
        .col(battle_combo_move::Column::SortOrder)
        .to_owned();
    battle_move_index.if_not_exists();
    db.execute(builder.build(&battle_move_index)).await?;

    let mut stage_index = Index::create()
        .name("idx_goal_stages_goal_order")
        .table(goal_stage::Entity)
        .col(goal_stage::Column::GoalId)
        .col(goal_stage::Column::SortOrder)
        .to_owned();
    stage_index.if_not_exists();
    db.execute(builder.build(&stage_index)).await?;

    if version > 0 {
        for column in ADDITIVE_COLUMNS.iter().filter(|column| column.since > version) {
            add_column_if_missing(db, column).await?;
        }
    }

    if version != SCHEMA_VERSION {
        info!(from = version, to = SCHEMA_VERSION, "schema version updated");
        set_user_version(db, SCHEMA_VERSION).await?;
    }

    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

pub async fn user_version(db: &DatabaseConnection) -> Result<i32, AppError> {
    let row = db
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA user_version;",
        ))
        .await?;
    match row {
        Some(row) => Ok(row.try_get_by_index::<i32>(0)?),
        None => Ok(0),
    }
}

async fn set_user_version(db: &DatabaseConnection, version: i32) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        format!("PRAGMA user_version = {version};"),
    ))
    .await?;
    Ok(())
}

async fn table_columns(db: &DatabaseConnection, table: &str) -> Result<Vec<String>, AppError> {
    let rows = db
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!("PRAGMA table_info({table});"),
        ))
        .await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push(row.try_get::<String>("", "name")?);
    }
    Ok(columns)
}

async fn add_column_if_missing(
    db: &DatabaseConnection,
    column: &AdditiveColumn,
) -> Result<(), AppError> {
    let existing = table_columns(db, column.table).await?;
    if existing.iter().any(|name| name == column.column) {
        return Ok(());
    }
    info!(
        table = column.table,
        column = column.column,
        "adding column for schema migration"
    );
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        format!(
            "ALTER TABLE {} ADD COLUMN {} {};",
            column.table, column.column, column.definition
        ),
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn ensure_schema_sets_user_version() {
        let dir = TempDir::new().expect("temp dir");
        let path = resolve_db_path(dir.path());
        let db = connect(&path).await.expect("connect");
        ensure_schema(&db).await.expect("schema");
        assert_eq!(user_version(&db).await.expect("version"), SCHEMA_VERSION);

        ensure_schema(&db).await.expect("schema is idempotent");
        assert_eq!(user_version(&db).await.expect("version"), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn ensure_schema_adds_columns_to_first_version_tables() {
        let dir = TempDir::new().expect("temp dir");
        let path = resolve_db_path(dir.path());
        let db = connect(&path).await.expect("connect");
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "CREATE TABLE battle_combos (id integer NOT NULL PRIMARY KEY AUTOINCREMENT, description varchar NOT NULL, energy varchar NOT NULL, status varchar NOT NULL, created_at timestamp_with_timezone_text NOT NULL, updated_at timestamp_with_timezone_text NOT NULL);",
        ))
        .await
        .expect("legacy table");
        set_user_version(&db, 1).await.expect("set version");

        ensure_schema(&db).await.expect("schema");

        let columns = table_columns(&db, "battle_combos").await.expect("columns");
        assert!(columns.iter().any(|name| name == "used"));
        assert_eq!(user_version(&db).await.expect("version"), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn ensure_schema_rejects_newer_versions() {
        let dir = TempDir::new().expect("temp dir");
        let path = resolve_db_path(dir.path());
        let db = connect(&path).await.expect("connect");
        set_user_version(&db, SCHEMA_VERSION + 1)
            .await
            .expect("set version");

        let err = ensure_schema(&db).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
