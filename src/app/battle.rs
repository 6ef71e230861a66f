use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

use super::{
    ensure_non_empty, finalize_transaction, join_ids, missing_ids, unique_ids, App,
    BattleComboDetail,
};
use crate::entities::{battle_combo, battle_combo_move};
use crate::error::AppError;
use crate::model::{BattleComboChanges, BattleComboInput, BattleQuery, ComboStatus, Energy};

impl App {
    pub async fn add_battle_combo(
        &self,
        input: BattleComboInput,
    ) -> Result<BattleComboDetail, AppError> {
        ensure_non_empty("battle combo description", &input.description)?;
        for name in &input.moves {
            ensure_non_empty("move name", name)?;
        }

        let txn = self.db.begin().await?;
        let result: Result<i64, AppError> = async {
            let now = Utc::now();
            let active = battle_combo::ActiveModel {
                description: Set(input.description.trim().to_string()),
                energy: Set(input.energy.as_str().to_string()),
                status: Set(input.status.as_str().to_string()),
                used: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let insert = battle_combo::Entity::insert(active).exec(&txn).await?;
            insert_battle_moves_with_conn(&txn, insert.last_insert_id, &input.moves).await?;
            Ok(insert.last_insert_id)
        }
        .await;

        let id = finalize_transaction(txn, result).await?;
        self.get_battle_detail(id).await
    }

    /// Copies a saved combo into the battle list. Move names are
    /// snapshotted; energy and status default to the saved combo's.
    pub async fn battle_from_combo(
        &self,
        combo_id: i64,
        energy: Option<Energy>,
        status: Option<ComboStatus>,
    ) -> Result<BattleComboDetail, AppError> {
        let detail = self.get_combo_detail(combo_id).await?;
        let energy = match energy {
            Some(energy) => energy,
            None => parse_energy(&detail.combo.energy)?,
        };
        let status = match status {
            Some(status) => status,
            None => parse_status(&detail.combo.status)?,
        };
        self.add_battle_combo(BattleComboInput {
            description: detail.combo.name.clone(),
            energy,
            status,
            moves: detail.moves.iter().map(|item| item.name.clone()).collect(),
        })
        .await
    }

    pub async fn get_battle_combo(&self, id: i64) -> Result<battle_combo::Model, AppError> {
        battle_combo::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("battle combo id {id}")))
    }

    pub async fn get_battle_detail(&self, id: i64) -> Result<BattleComboDetail, AppError> {
        let combo = self.get_battle_combo(id).await?;
        let mut details = self.get_battle_details(vec![combo]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("battle combo id {id}")))
    }

    pub async fn list_battle_combos(
        &self,
        query: &BattleQuery,
    ) -> Result<Vec<BattleComboDetail>, AppError> {
        let mut select = battle_combo::Entity::find();
        if let Some(energy) = query.energy {
            select = select.filter(battle_combo::Column::Energy.eq(energy.as_str()));
        }
        if let Some(status) = query.status {
            select = select.filter(battle_combo::Column::Status.eq(status.as_str()));
        }
        if let Some(used) = query.used {
            select = select.filter(battle_combo::Column::Used.eq(used));
        }
        let combos = select
            .order_by_asc(battle_combo::Column::Id)
            .all(&self.db)
            .await?;
        self.get_battle_details(combos).await
    }

    async fn get_battle_details(
        &self,
        combos: Vec<battle_combo::Model>,
    ) -> Result<Vec<BattleComboDetail>, AppError> {
        if combos.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = combos.iter().map(|combo| combo.id).collect();
        let entries = battle_combo_move::Entity::find()
            .filter(battle_combo_move::Column::BattleComboId.is_in(ids))
            .order_by_asc(battle_combo_move::Column::BattleComboId)
            .order_by_asc(battle_combo_move::Column::SortOrder)
            .order_by_asc(battle_combo_move::Column::Id)
            .all(&self.db)
            .await?;
        let mut grouped: HashMap<i64, Vec<String>> = HashMap::new();
        for entry in entries {
            grouped
                .entry(entry.battle_combo_id)
                .or_default()
                .push(entry.move_name);
        }
        Ok(combos
            .into_iter()
            .map(|combo| {
                let moves = grouped.remove(&combo.id).unwrap_or_default();
                BattleComboDetail { combo, moves }
            })
            .collect())
    }

    pub async fn update_battle_combo(
        &self,
        id: i64,
        changes: BattleComboChanges,
    ) -> Result<BattleComboDetail, AppError> {
        if let Some(description) = changes.description.as_deref() {
            ensure_non_empty("battle combo description", description)?;
        }
        if let Some(moves) = changes.moves.as_ref() {
            for name in moves {
                ensure_non_empty("move name", name)?;
            }
        }

        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            let mut active = battle_combo::ActiveModel {
                id: Set(id),
                ..Default::default()
            };
            if let Some(description) = changes.description {
                active.description = Set(description.trim().to_string());
            }
            if let Some(energy) = changes.energy {
                active.energy = Set(energy.as_str().to_string());
            }
            if let Some(status) = changes.status {
                active.status = Set(status.as_str().to_string());
            }
            active.updated_at = Set(Utc::now());
            match active.update(&txn).await {
                Ok(_) => {}
                Err(sea_orm::DbErr::RecordNotFound(_))
                | Err(sea_orm::DbErr::RecordNotUpdated) => {
                    return Err(AppError::NotFound(format!("battle combo id {id}")));
                }
                Err(err) => return Err(err.into()),
            }
            if let Some(moves) = changes.moves {
                battle_combo_move::Entity::delete_many()
                    .filter(battle_combo_move::Column::BattleComboId.eq(id))
                    .exec(&txn)
                    .await?;
                insert_battle_moves_with_conn(&txn, id, &moves).await?;
            }
            Ok(())
        }
        .await;

        finalize_transaction(txn, result).await?;
        self.get_battle_detail(id).await
    }

    pub async fn set_battle_used(&self, ids: &[i64], used: bool) -> Result<Vec<i64>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let unique = unique_ids(ids);

        let txn = self.db.begin().await?;
        let result: Result<Vec<i64>, AppError> = async {
            let combos = battle_combo::Entity::find()
                .filter(battle_combo::Column::Id.is_in(unique.clone()))
                .all(&txn)
                .await?;
            let found: HashSet<i64> = combos.iter().map(|combo| combo.id).collect();
            let missing = missing_ids(&unique, &found);
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "battle combo id(s) not found: {}",
                    join_ids(&missing)
                )));
            }
            let now = Utc::now();
            for combo in combos {
                if combo.used == used {
                    continue;
                }
                let mut active: battle_combo::ActiveModel = combo.into();
                active.used = Set(used);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            Ok(unique.clone())
        }
        .await;

        finalize_transaction(txn, result).await
    }

    /// Marks every battle combo unused again; returns how many changed.
    pub async fn reset_battle_used(&self) -> Result<u64, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            let used = battle_combo::Entity::find()
                .filter(battle_combo::Column::Used.eq(true))
                .all(&txn)
                .await?;
            let count = used.len() as u64;
            let now = Utc::now();
            for combo in used {
                let mut active: battle_combo::ActiveModel = combo.into();
                active.used = Set(false);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            Ok(count)
        }
        .await;

        let count = finalize_transaction(txn, result).await?;
        info!(count, "reset used battle combos");
        Ok(count)
    }

    /// Draws one ready, unused battle combo at random, optionally narrowed
    /// to an energy level. With `mark_used` the pick is flagged as used.
    pub async fn pick_battle_combo<R: Rng>(
        &self,
        energy: Option<Energy>,
        mark_used: bool,
        rng: &mut R,
    ) -> Result<Option<BattleComboDetail>, AppError> {
        let candidates = self
            .list_battle_combos(&BattleQuery {
                energy,
                status: Some(ComboStatus::Ready),
                used: Some(false),
            })
            .await?;
        let Some(picked) = candidates.choose(rng).cloned() else {
            return Ok(None);
        };
        if !mark_used {
            return Ok(Some(picked));
        }
        self.set_battle_used(&[picked.combo.id], true).await?;
        Ok(Some(self.get_battle_detail(picked.combo.id).await?))
    }

    pub async fn delete_battle_combos(&self, ids: &[i64]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let unique = unique_ids(ids);

        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            ensure_battle_combos_exist_with_conn(&txn, &unique).await?;
            let deleted = battle_combo::Entity::delete_many()
                .filter(battle_combo::Column::Id.is_in(unique.clone()))
                .exec(&txn)
                .await?;
            Ok(deleted.rows_affected)
        }
        .await;

        finalize_transaction(txn, result).await
    }
}

fn parse_energy(value: &str) -> Result<Energy, AppError> {
    Energy::parse(value).ok_or_else(|| {
        AppError::InvalidInput(format!("invalid energy '{value}', expected low|medium|high"))
    })
}

fn parse_status(value: &str) -> Result<ComboStatus, AppError> {
    ComboStatus::parse(value).ok_or_else(|| {
        AppError::InvalidInput(format!("invalid status '{value}', expected training|ready"))
    })
}

async fn insert_battle_moves_with_conn<C: ConnectionTrait>(
    db: &C,
    battle_combo_id: i64,
    moves: &[String],
) -> Result<(), AppError> {
    for (idx, name) in moves.iter().enumerate() {
        let entry = battle_combo_move::ActiveModel {
            battle_combo_id: Set(battle_combo_id),
            move_name: Set(name.trim().to_string()),
            sort_order: Set((idx + 1) as i32),
            ..Default::default()
        };
        battle_combo_move::Entity::insert(entry).exec(db).await?;
    }
    Ok(())
}

async fn ensure_battle_combos_exist_with_conn<C: ConnectionTrait>(
    db: &C,
    ids: &[i64],
) -> Result<(), AppError> {
    let found: HashSet<i64> = battle_combo::Entity::find()
        .filter(battle_combo::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|combo| combo.id)
        .collect();
    let missing = missing_ids(ids, &found);
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "battle combo id(s) not found: {}",
            join_ids(&missing)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::setup_app;
    use crate::model::ComboInput;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn battle_input(description: &str, energy: Energy, status: ComboStatus) -> BattleComboInput {
        BattleComboInput {
            description: description.to_string(),
            energy,
            status,
            moves: vec!["Toprock".to_string(), "Windmill".to_string()],
        }
    }

    #[tokio::test]
    async fn battle_combo_keeps_move_order() {
        let (_dir, app) = setup_app().await;
        let detail = app
            .add_battle_combo(battle_input("Opener", Energy::High, ComboStatus::Ready))
            .await
            .expect("battle combo");
        assert_eq!(detail.moves, vec!["Toprock", "Windmill"]);
        assert!(!detail.combo.used);
    }

    #[tokio::test]
    async fn battle_from_combo_copies_names() {
        let (_dir, app) = setup_app().await;
        let moves = app
            .add_moves_batch(vec!["Flare".to_string(), "Airchair".to_string()])
            .await
            .expect("moves");
        let combo = app
            .add_combo(ComboInput {
                name: "Power set".to_string(),
                description: None,
                energy: Energy::High,
                status: ComboStatus::Ready,
                move_ids: vec![moves[1].id, moves[0].id],
                tags: Vec::new(),
            })
            .await
            .expect("combo");

        let battle = app
            .battle_from_combo(combo.combo.id, None, None)
            .await
            .expect("battle");
        assert_eq!(battle.combo.description, "Power set");
        assert_eq!(battle.combo.energy, "high");
        assert_eq!(battle.combo.status, "ready");
        assert_eq!(battle.moves, vec!["Airchair", "Flare"]);

        app.rename_move(moves[0].id, "Flares".to_string())
            .await
            .expect("rename");
        let reloaded = app.get_battle_detail(battle.combo.id).await.expect("detail");
        assert_eq!(reloaded.moves, vec!["Airchair", "Flare"]);
    }

    #[tokio::test]
    async fn used_flags_and_reset() {
        let (_dir, app) = setup_app().await;
        let first = app
            .add_battle_combo(battle_input("One", Energy::Low, ComboStatus::Ready))
            .await
            .expect("battle");
        let second = app
            .add_battle_combo(battle_input("Two", Energy::High, ComboStatus::Ready))
            .await
            .expect("battle");

        app.set_battle_used(&[first.combo.id, second.combo.id], true)
            .await
            .expect("mark used");
        let used = app
            .list_battle_combos(&BattleQuery {
                used: Some(true),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(used.len(), 2);

        let reset = app.reset_battle_used().await.expect("reset");
        assert_eq!(reset, 2);
        let unused = app
            .list_battle_combos(&BattleQuery {
                used: Some(false),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(unused.len(), 2);

        let err = app.set_battle_used(&[first.combo.id, 99], true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn pick_only_draws_ready_unused_combos() {
        let (_dir, app) = setup_app().await;
        app.add_battle_combo(battle_input("Training", Energy::High, ComboStatus::Training))
            .await
            .expect("battle");
        let ready = app
            .add_battle_combo(battle_input("Ready", Energy::High, ComboStatus::Ready))
            .await
            .expect("battle");
        app.add_battle_combo(battle_input("Calm", Energy::Low, ComboStatus::Ready))
            .await
            .expect("battle");

        let mut rng = StdRng::seed_from_u64(9);
        let picked = app
            .pick_battle_combo(Some(Energy::High), true, &mut rng)
            .await
            .expect("pick")
            .expect("candidate");
        assert_eq!(picked.combo.id, ready.combo.id);
        assert!(picked.combo.used);

        let none_left = app
            .pick_battle_combo(Some(Energy::High), true, &mut rng)
            .await
            .expect("pick");
        assert!(none_left.is_none());
    }

    #[tokio::test]
    async fn update_battle_combo_replaces_moves() {
        let (_dir, app) = setup_app().await;
        let detail = app
            .add_battle_combo(battle_input("Opener", Energy::Medium, ComboStatus::Training))
            .await
            .expect("battle");
        let updated = app
            .update_battle_combo(
                detail.combo.id,
                BattleComboChanges {
                    status: Some(ComboStatus::Ready),
                    moves: Some(vec!["6-step".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.combo.status, "ready");
        assert_eq!(updated.moves, vec!["6-step"]);

        let err = app
            .update_battle_combo(500, BattleComboChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_battle_combos_cascades_moves() {
        let (_dir, app) = setup_app().await;
        let detail = app
            .add_battle_combo(battle_input("Opener", Energy::Medium, ComboStatus::Ready))
            .await
            .expect("battle");
        let deleted = app
            .delete_battle_combos(&[detail.combo.id, detail.combo.id])
            .await
            .expect("delete");
        assert_eq!(deleted, 1);
        let remaining = battle_combo_move::Entity::find()
            .all(&app.db)
            .await
            .expect("entries");
        assert!(remaining.is_empty());
    }
}
