use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

use super::moves::{find_tags_by_names_with_conn, sort_tags};
use super::{
    ensure_non_empty, finalize_transaction, join_ids, missing_ids, normalize_optional, unique_ids,
    App, ComboDetail,
};
use crate::entities::{combo, combo_move, combo_tag, dance_move, tag};
use crate::error::AppError;
use crate::generator::{
    self, carries_tags, normalize_tag_names, GeneratedCombo, RandomRequest,
};
use crate::model::{ComboChanges, ComboInput, ComboQuery, ComboStatus, Energy, TagMatch};

impl App {
    pub async fn add_combo(&self, input: ComboInput) -> Result<ComboDetail, AppError> {
        ensure_non_empty("combo name", &input.name)?;
        if input.move_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "combo requires at least one move".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let result: Result<i64, AppError> = async {
            let tags = find_tags_by_names_with_conn(&txn, &input.tags).await?;
            ensure_moves_exist_with_conn(&txn, &input.move_ids).await?;

            let now = Utc::now();
            let active = combo::ActiveModel {
                name: Set(input.name.trim().to_string()),
                description: Set(normalize_optional(input.description)),
                energy: Set(input.energy.as_str().to_string()),
                status: Set(input.status.as_str().to_string()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let insert = combo::Entity::insert(active).exec(&txn).await?;
            let combo_id = insert.last_insert_id;
            insert_combo_moves_with_conn(&txn, combo_id, &input.move_ids).await?;
            insert_combo_tags_with_conn(&txn, combo_id, &tags).await?;
            Ok(combo_id)
        }
        .await;

        let combo_id = finalize_transaction(txn, result).await?;
        self.get_combo_detail(combo_id).await
    }

    /// Persists a generator result as a saved combo, keeping its order.
    pub async fn save_generated(
        &self,
        name: String,
        generated: &GeneratedCombo,
        tags: Vec<String>,
    ) -> Result<ComboDetail, AppError> {
        self.add_combo(ComboInput {
            name,
            description: None,
            energy: Energy::Medium,
            status: ComboStatus::Training,
            move_ids: generated.move_ids(),
            tags,
        })
        .await
    }

    /// Draws a random combo from the moves carrying `tags`.
    pub async fn generate_random_combo<R: Rng>(
        &self,
        tags: &[String],
        tag_match: TagMatch,
        request: &RandomRequest,
        rng: &mut R,
    ) -> Result<GeneratedCombo, AppError> {
        let catalog = self.moves_with_tags().await?;
        let pool = generator::filter_pool(&catalog, tags, tag_match);
        Ok(generator::generate_random(&pool, request, rng)?)
    }

    /// Builds a combo with one move per tag in `sequence`.
    pub async fn generate_structured_combo<R: Rng>(
        &self,
        sequence: &[String],
        rng: &mut R,
    ) -> Result<GeneratedCombo, AppError> {
        let catalog = self.moves_with_tags().await?;
        Ok(generator::generate_structured(&catalog, sequence, rng)?)
    }

    pub async fn get_combo(&self, id: i64) -> Result<combo::Model, AppError> {
        combo::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("combo id {id}")))
    }

    pub async fn get_combo_detail(&self, id: i64) -> Result<ComboDetail, AppError> {
        let combo = self.get_combo(id).await?;
        let mut details = self.get_combo_details(vec![combo]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("combo id {id}")))
    }

    pub async fn list_combos(&self, query: &ComboQuery) -> Result<Vec<ComboDetail>, AppError> {
        let mut select = combo::Entity::find();
        if let Some(energy) = query.energy {
            select = select.filter(combo::Column::Energy.eq(energy.as_str()));
        }
        if let Some(status) = query.status {
            select = select.filter(combo::Column::Status.eq(status.as_str()));
        }
        let combos = select
            .order_by_desc(combo::Column::UpdatedAt)
            .order_by_asc(combo::Column::Id)
            .all(&self.db)
            .await?;
        let mut details = self.get_combo_details(combos).await?;
        let wanted = normalize_tag_names(&query.tags);
        details.retain(|detail| carries_tags(&detail.tags, &wanted, query.tag_match));
        Ok(details)
    }

    async fn get_combo_details(
        &self,
        combos: Vec<combo::Model>,
    ) -> Result<Vec<ComboDetail>, AppError> {
        if combos.is_empty() {
            return Ok(Vec::new());
        }
        let combo_ids: Vec<i64> = combos.iter().map(|combo| combo.id).collect();

        let entries = combo_move::Entity::find()
            .filter(combo_move::Column::ComboId.is_in(combo_ids.clone()))
            .order_by_asc(combo_move::Column::ComboId)
            .order_by_asc(combo_move::Column::SortOrder)
            .order_by_asc(combo_move::Column::Id)
            .all(&self.db)
            .await?;
        let move_ids = unique_ids(&entries.iter().map(|entry| entry.move_id).collect::<Vec<_>>());
        let moves: HashMap<i64, dance_move::Model> = if move_ids.is_empty() {
            HashMap::new()
        } else {
            dance_move::Entity::find()
                .filter(dance_move::Column::Id.is_in(move_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|item| (item.id, item))
                .collect()
        };

        let links = combo_tag::Entity::find()
            .filter(combo_tag::Column::ComboId.is_in(combo_ids))
            .all(&self.db)
            .await?;
        let tag_ids = unique_ids(&links.iter().map(|link| link.tag_id).collect::<Vec<_>>());
        let tags: HashMap<i64, tag::Model> = if tag_ids.is_empty() {
            HashMap::new()
        } else {
            tag::Entity::find()
                .filter(tag::Column::Id.is_in(tag_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|tag| (tag.id, tag))
                .collect()
        };

        let mut moves_by_combo: HashMap<i64, Vec<dance_move::Model>> = HashMap::new();
        for entry in entries {
            if let Some(item) = moves.get(&entry.move_id) {
                moves_by_combo
                    .entry(entry.combo_id)
                    .or_default()
                    .push(item.clone());
            }
        }
        let mut tags_by_combo: HashMap<i64, Vec<tag::Model>> = HashMap::new();
        for link in links {
            if let Some(tag) = tags.get(&link.tag_id) {
                tags_by_combo
                    .entry(link.combo_id)
                    .or_default()
                    .push(tag.clone());
            }
        }

        Ok(combos
            .into_iter()
            .map(|combo| {
                let moves = moves_by_combo.remove(&combo.id).unwrap_or_default();
                let mut tags = tags_by_combo.remove(&combo.id).unwrap_or_default();
                sort_tags(&mut tags);
                ComboDetail { combo, moves, tags }
            })
            .collect())
    }

    pub async fn update_combo(
        &self,
        id: i64,
        changes: ComboChanges,
    ) -> Result<combo::Model, AppError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_non_empty("combo name", name)?;
        }

        let mut active = combo::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        if let Some(energy) = changes.energy {
            active.energy = Set(energy.as_str().to_string());
        }
        if let Some(status) = changes.status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("combo id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn set_combo_moves(
        &self,
        id: i64,
        move_ids: &[i64],
    ) -> Result<ComboDetail, AppError> {
        if move_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "combo requires at least one move".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            ensure_combo_exists_with_conn(&txn, id).await?;
            ensure_moves_exist_with_conn(&txn, move_ids).await?;
            combo_move::Entity::delete_many()
                .filter(combo_move::Column::ComboId.eq(id))
                .exec(&txn)
                .await?;
            insert_combo_moves_with_conn(&txn, id, move_ids).await?;
            touch_combo_with_conn(&txn, id).await
        }
        .await;

        finalize_transaction(txn, result).await?;
        self.get_combo_detail(id).await
    }

    pub async fn set_combo_tags(&self, id: i64, names: &[String]) -> Result<ComboDetail, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            ensure_combo_exists_with_conn(&txn, id).await?;
            let tags = find_tags_by_names_with_conn(&txn, names).await?;
            combo_tag::Entity::delete_many()
                .filter(combo_tag::Column::ComboId.eq(id))
                .exec(&txn)
                .await?;
            insert_combo_tags_with_conn(&txn, id, &tags).await?;
            touch_combo_with_conn(&txn, id).await
        }
        .await;

        finalize_transaction(txn, result).await?;
        self.get_combo_detail(id).await
    }

    pub async fn delete_combo(&self, id: i64) -> Result<(), AppError> {
        let result = combo::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("combo id {id}")));
        }
        info!(combo_id = id, "deleted combo");
        Ok(())
    }
}

/// Renumbers a combo's entries to `1..n`, keeping their relative order.
pub(super) async fn normalize_combo_moves_with_conn<C: ConnectionTrait>(
    db: &C,
    combo_id: i64,
) -> Result<(), AppError> {
    let entries = combo_move::Entity::find()
        .filter(combo_move::Column::ComboId.eq(combo_id))
        .order_by_asc(combo_move::Column::SortOrder)
        .order_by_asc(combo_move::Column::Id)
        .all(db)
        .await?;
    let mut changed = false;
    for (idx, entry) in entries.into_iter().enumerate() {
        let desired = (idx + 1) as i32;
        if entry.sort_order != desired {
            let mut active: combo_move::ActiveModel = entry.into();
            active.sort_order = Set(desired);
            active.update(db).await?;
            changed = true;
        }
    }
    if changed {
        touch_combo_with_conn(db, combo_id).await?;
    }
    Ok(())
}

async fn insert_combo_moves_with_conn<C: ConnectionTrait>(
    db: &C,
    combo_id: i64,
    move_ids: &[i64],
) -> Result<(), AppError> {
    for (idx, move_id) in move_ids.iter().enumerate() {
        let entry = combo_move::ActiveModel {
            combo_id: Set(combo_id),
            move_id: Set(*move_id),
            sort_order: Set((idx + 1) as i32),
            ..Default::default()
        };
        combo_move::Entity::insert(entry).exec(db).await?;
    }
    Ok(())
}

async fn insert_combo_tags_with_conn<C: ConnectionTrait>(
    db: &C,
    combo_id: i64,
    tags: &[tag::Model],
) -> Result<(), AppError> {
    for tag in tags {
        let link = combo_tag::ActiveModel {
            combo_id: Set(combo_id),
            tag_id: Set(tag.id),
        };
        combo_tag::Entity::insert(link)
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Combos may repeat a move, so duplicates in `move_ids` are fine; only
/// unknown ids are rejected.
async fn ensure_moves_exist_with_conn<C: ConnectionTrait>(
    db: &C,
    move_ids: &[i64],
) -> Result<(), AppError> {
    let unique = unique_ids(move_ids);
    let found: HashSet<i64> = dance_move::Entity::find()
        .filter(dance_move::Column::Id.is_in(unique.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    let missing = missing_ids(&unique, &found);
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "move id(s) not found: {}",
            join_ids(&missing)
        )));
    }
    Ok(())
}

async fn ensure_combo_exists_with_conn<C: ConnectionTrait>(
    db: &C,
    combo_id: i64,
) -> Result<(), AppError> {
    combo::Entity::find_by_id(combo_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("combo id {combo_id}")))?;
    Ok(())
}

async fn touch_combo_with_conn<C: ConnectionTrait>(db: &C, combo_id: i64) -> Result<(), AppError> {
    let active = combo::ActiveModel {
        id: Set(combo_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}
