use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::entities::{
    battle_combo, battle_combo_move, combo, combo_move, combo_tag, dance_move, goal, goal_stage,
    move_tag, tag,
};
use crate::error::AppError;
use crate::model::{ComboStatus, Energy};

pub const FORMAT_VERSION: u32 = 1;

const INSERT_BATCH: usize = 200;

/// Every table of the database, as written to and read from an export file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub moves: Vec<dance_move::Model>,
    #[serde(default)]
    pub tags: Vec<tag::Model>,
    #[serde(default)]
    pub move_tags: Vec<move_tag::Model>,
    #[serde(default)]
    pub combos: Vec<combo::Model>,
    #[serde(default)]
    pub combo_moves: Vec<combo_move::Model>,
    #[serde(default)]
    pub combo_tags: Vec<combo_tag::Model>,
    #[serde(default)]
    pub battle_combos: Vec<battle_combo::Model>,
    #[serde(default)]
    pub battle_combo_moves: Vec<battle_combo_move::Model>,
    #[serde(default)]
    pub goals: Vec<goal::Model>,
    #[serde(default)]
    pub goal_stages: Vec<goal_stage::Model>,
}

impl Snapshot {
    pub fn row_count(&self) -> usize {
        self.moves.len()
            + self.tags.len()
            + self.move_tags.len()
            + self.combos.len()
            + self.combo_moves.len()
            + self.combo_tags.len()
            + self.battle_combos.len()
            + self.battle_combo_moves.len()
            + self.goals.len()
            + self.goal_stages.len()
    }
}

pub async fn export_snapshot<C: ConnectionTrait>(db: &C) -> Result<Snapshot, AppError> {
    let snapshot = load_snapshot_with_conn(db)
        .await
        .inspect_err(|err| error!(error = %err, "export failed"))?;
    info!(rows = snapshot.row_count(), "exported snapshot");
    Ok(snapshot)
}

async fn load_snapshot_with_conn<C: ConnectionTrait>(db: &C) -> Result<Snapshot, AppError> {
    Ok(Snapshot {
        format_version: FORMAT_VERSION,
        exported_at: Utc::now(),
        moves: dance_move::Entity::find()
            .order_by_asc(dance_move::Column::Id)
            .all(db)
            .await?,
        tags: tag::Entity::find()
            .order_by_asc(tag::Column::Id)
            .all(db)
            .await?,
        move_tags: move_tag::Entity::find()
            .order_by_asc(move_tag::Column::MoveId)
            .order_by_asc(move_tag::Column::TagId)
            .all(db)
            .await?,
        combos: combo::Entity::find()
            .order_by_asc(combo::Column::Id)
            .all(db)
            .await?,
        combo_moves: combo_move::Entity::find()
            .order_by_asc(combo_move::Column::Id)
            .all(db)
            .await?,
        combo_tags: combo_tag::Entity::find()
            .order_by_asc(combo_tag::Column::ComboId)
            .order_by_asc(combo_tag::Column::TagId)
            .all(db)
            .await?,
        battle_combos: battle_combo::Entity::find()
            .order_by_asc(battle_combo::Column::Id)
            .all(db)
            .await?,
        battle_combo_moves: battle_combo_move::Entity::find()
            .order_by_asc(battle_combo_move::Column::Id)
            .all(db)
            .await?,
        goals: goal::Entity::find()
            .order_by_asc(goal::Column::Id)
            .all(db)
            .await?,
        goal_stages: goal_stage::Entity::find()
            .order_by_asc(goal_stage::Column::Id)
            .all(db)
            .await?,
    })
}

/// Replaces the whole dataset with `snapshot`. Rows keep their ids and
/// timestamps. On any failure the previous data stays untouched.
pub async fn import_snapshot(db: &DatabaseConnection, snapshot: Snapshot) -> Result<(), AppError> {
    check_format_version(snapshot.format_version)
        .and_then(|()| validate_snapshot(&snapshot))
        .inspect_err(|err| error!(error = %err, "import rejected"))?;

    let rows = snapshot.row_count();
    let txn = db.begin().await?;
    let result = replace_all_with_conn(&txn, snapshot).await;
    match result {
        Ok(()) => {
            txn.commit().await?;
            info!(rows, "imported snapshot");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "import failed, rolling back");
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), AppError> {
    write_snapshot_file(path, snapshot).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "failed to write export file")
    })
}

fn write_snapshot_file(path: &Path, snapshot: &Snapshot) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut text = serde_json::to_string_pretty(snapshot)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot, AppError> {
    read_snapshot_file(path).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "failed to read export file")
    })
}

fn read_snapshot_file(path: &Path) -> Result<Snapshot, AppError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn check_format_version(version: u32) -> Result<(), AppError> {
    if version > FORMAT_VERSION {
        return Err(AppError::InvalidInput(format!(
            "export format version {version} is newer than supported version {FORMAT_VERSION}"
        )));
    }
    Ok(())
}

fn validate_snapshot(snapshot: &Snapshot) -> Result<(), AppError> {
    let mut errors = Vec::new();
    for item in &snapshot.moves {
        if item.name.trim().is_empty() {
            errors.push(format!("- move {}: blank name", item.id));
        }
    }
    // Tag names are unique ignoring case.
    let mut seen_tags: HashMap<String, i64> = HashMap::new();
    for item in &snapshot.tags {
        let key = item.name.trim().to_lowercase();
        if key.is_empty() {
            errors.push(format!("- tag {}: blank name", item.id));
            continue;
        }
        if let Some(first) = seen_tags.get(&key) {
            errors.push(format!(
                "- tag {}: name '{}' duplicates tag {first}",
                item.id, item.name
            ));
            continue;
        }
        seen_tags.insert(key, item.id);
    }
    for item in &snapshot.combos {
        check_labels(&mut errors, "combo", item.id, &item.energy, &item.status);
    }
    for item in &snapshot.battle_combos {
        check_labels(&mut errors, "battle combo", item.id, &item.energy, &item.status);
    }
    for stage in &snapshot.goal_stages {
        if stage.target_count < 1 || stage.current_count < 0 || stage.current_count > stage.target_count
        {
            errors.push(format!(
                "- stage {}: count {}/{} out of range",
                stage.id, stage.current_count, stage.target_count
            ));
        }
    }
    if errors.is_empty() {
        return Ok(());
    }
    Err(AppError::InvalidInput(format!(
        "export file has invalid rows:\n{}",
        errors.join("\n")
    )))
}

fn check_labels(errors: &mut Vec<String>, label: &str, id: i64, energy: &str, status: &str) {
    if Energy::parse(energy).is_none() {
        errors.push(format!("- {label} {id}: unknown energy '{energy}'"));
    }
    if ComboStatus::parse(status).is_none() {
        errors.push(format!("- {label} {id}: unknown status '{status}'"));
    }
}

async fn replace_all_with_conn<C: ConnectionTrait>(
    db: &C,
    snapshot: Snapshot,
) -> Result<(), AppError> {
    combo_tag::Entity::delete_many().exec(db).await?;
    combo_move::Entity::delete_many().exec(db).await?;
    move_tag::Entity::delete_many().exec(db).await?;
    battle_combo_move::Entity::delete_many().exec(db).await?;
    goal_stage::Entity::delete_many().exec(db).await?;
    combo::Entity::delete_many().exec(db).await?;
    battle_combo::Entity::delete_many().exec(db).await?;
    goal::Entity::delete_many().exec(db).await?;
    tag::Entity::delete_many().exec(db).await?;
    dance_move::Entity::delete_many().exec(db).await?;

    insert_rows(db, active_rows::<dance_move::ActiveModel, _>(snapshot.moves)).await?;
    insert_rows(db, active_rows::<tag::ActiveModel, _>(snapshot.tags)).await?;
    insert_rows(db, active_rows::<move_tag::ActiveModel, _>(snapshot.move_tags)).await?;
    insert_rows(db, active_rows::<combo::ActiveModel, _>(snapshot.combos)).await?;
    insert_rows(db, active_rows::<combo_move::ActiveModel, _>(snapshot.combo_moves)).await?;
    insert_rows(db, active_rows::<combo_tag::ActiveModel, _>(snapshot.combo_tags)).await?;
    insert_rows(db, active_rows::<battle_combo::ActiveModel, _>(snapshot.battle_combos)).await?;
    insert_rows(
        db,
        active_rows::<battle_combo_move::ActiveModel, _>(snapshot.battle_combo_moves),
    )
    .await?;
    insert_rows(db, active_rows::<goal::ActiveModel, _>(snapshot.goals)).await?;
    insert_rows(db, active_rows::<goal_stage::ActiveModel, _>(snapshot.goal_stages)).await?;
    Ok(())
}

/// Turns exported models into active models with every column set,
/// primary keys included.
fn active_rows<A, M>(models: Vec<M>) -> Vec<A>
where
    A: ActiveModelTrait + From<M>,
{
    models
        .into_iter()
        .map(|model| A::from(model).reset_all())
        .collect()
}

async fn insert_rows<C, A>(db: &C, mut rows: Vec<A>) -> Result<(), AppError>
where
    C: ConnectionTrait,
    A: ActiveModelTrait,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    while !rows.is_empty() {
        let rest = rows.split_off(rows.len().min(INSERT_BATCH));
        <A::Entity as EntityTrait>::insert_many(rows)
            .exec_without_returning(db)
            .await?;
        rows = rest;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::setup_app;
    use crate::model::{BattleComboInput, ComboInput, GoalInput, StageInput};
    use tempfile::TempDir;

    async fn seed(app: &crate::app::App) {
        app.add_tag("Power".to_string()).await.expect("tag");
        let windmill = app
            .add_move("Windmill".to_string(), vec!["Power".to_string()])
            .await
            .expect("move");
        app.add_tag("Flow".to_string()).await.expect("tag");
        let toprock = app
            .add_move("Toprock".to_string(), vec!["Flow".to_string()])
            .await
            .expect("move");
        app.add_combo(ComboInput {
            name: "Opener".to_string(),
            description: Some("start strong".to_string()),
            energy: Energy::High,
            status: ComboStatus::Ready,
            move_ids: vec![toprock.dance_move.id, windmill.dance_move.id],
            tags: vec!["Power".to_string()],
        })
        .await
        .expect("combo");
        app.add_battle_combo(BattleComboInput {
            description: "Closer".to_string(),
            energy: Energy::Medium,
            status: ComboStatus::Ready,
            moves: vec!["Freeze".to_string()],
        })
        .await
        .expect("battle");
        let goal = app
            .add_goal(GoalInput {
                title: "Flare".to_string(),
                description: None,
                stages: vec![StageInput {
                    name: "Circles".to_string(),
                    target_count: 20,
                    unit: "reps".to_string(),
                }],
            })
            .await
            .expect("goal");
        app.adjust_stage_progress(goal.stages[0].id, 7)
            .await
            .expect("progress");
    }

    #[tokio::test]
    async fn import_then_export_round_trips() {
        let (_source_dir, source) = setup_app().await;
        seed(&source).await;
        let exported = source.export_data().await.expect("export");
        assert_eq!(exported.moves.len(), 2);
        assert_eq!(exported.move_tags.len(), 2);
        assert_eq!(exported.combo_moves.len(), 2);

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("backup").join("breakbook.json");
        write_snapshot(&path, &exported).expect("write");
        let loaded = read_snapshot(&path).expect("read");
        assert_eq!(loaded, exported);

        let (_target_dir, target) = setup_app().await;
        target.add_move("Headspin".to_string(), Vec::new()).await.expect("move");
        target.import_data(loaded).await.expect("import");
        let mut again = target.export_data().await.expect("export");
        again.exported_at = exported.exported_at;
        assert_eq!(again, exported);
    }

    #[tokio::test]
    async fn rejects_newer_format_version() {
        let (_dir, app) = setup_app().await;
        let mut snapshot = app.export_data().await.expect("export");
        snapshot.format_version = FORMAT_VERSION + 1;
        let err = app.import_data(snapshot).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn failed_import_keeps_previous_data() {
        let (_dir, app) = setup_app().await;
        seed(&app).await;
        let before = app.export_data().await.expect("export");

        let mut broken = before.clone();
        broken.move_tags.push(move_tag::Model {
            move_id: 999,
            tag_id: before.tags[0].id,
        });
        assert!(app.import_data(broken).await.is_err());

        let mut after = app.export_data().await.expect("export");
        after.exported_at = before.exported_at;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn rejects_unknown_labels() {
        let (_dir, app) = setup_app().await;
        seed(&app).await;
        let mut snapshot = app.export_data().await.expect("export");
        snapshot.combos[0].energy = "extreme".to_string();
        let err = app.import_data(snapshot).await.unwrap_err();
        assert!(err.to_string().contains("unknown energy 'extreme'"));
    }

    #[tokio::test]
    async fn rejects_tags_differing_only_by_case() {
        let (_dir, app) = setup_app().await;
        seed(&app).await;
        let before = app.export_data().await.expect("export");

        let mut snapshot = before.clone();
        let mut twin = snapshot.tags[0].clone();
        twin.id = 99;
        twin.name = twin.name.to_lowercase();
        snapshot.tags.push(twin);
        let err = app.import_data(snapshot).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("name 'power' duplicates tag"));

        let mut after = app.export_data().await.expect("export");
        after.exported_at = before.exported_at;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn rejects_blank_move_and_tag_names() {
        let (_dir, app) = setup_app().await;
        seed(&app).await;
        let mut snapshot = app.export_data().await.expect("export");
        snapshot.moves[0].name = "  ".to_string();
        snapshot.tags[1].name = String::new();
        let blank_tag = snapshot.tags[1].id;
        let message = app.import_data(snapshot).await.unwrap_err().to_string();
        assert!(message.contains("blank name"));
        assert!(message.contains(&format!("- tag {blank_tag}: blank name")));
    }

    #[test]
    fn read_snapshot_reports_bad_json() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write");
        let err = read_snapshot(&path).unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
        let err = read_snapshot(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
