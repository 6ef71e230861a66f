use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

use super::combos::normalize_combo_moves_with_conn;
use super::{
    ensure_non_empty, finalize_transaction, join_ids, missing_ids, unique_ids, App, MoveDetail,
    TagSummary,
};
use crate::entities::{combo_move, dance_move, move_tag, tag};
use crate::error::AppError;
use crate::generator::{carries_tags, normalize_tag_names};
use crate::model::MoveQuery;

impl App {
    pub async fn add_move(
        &self,
        name: String,
        tag_names: Vec<String>,
    ) -> Result<MoveDetail, AppError> {
        self.add_moves_with_tags(vec![name], tag_names)
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("move not found after insert".to_string()))
    }

    /// Creates every named move with the same tags in one transaction.
    /// Nothing is created when any name is blank or any tag is unknown.
    pub async fn add_moves_with_tags(
        &self,
        names: Vec<String>,
        tag_names: Vec<String>,
    ) -> Result<Vec<MoveDetail>, AppError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        for name in &names {
            ensure_non_empty("move name", name)?;
        }

        let txn = self.db.begin().await?;
        let result: Result<Vec<MoveDetail>, AppError> = async {
            let mut tags = find_tags_by_names_with_conn(&txn, &tag_names).await?;
            sort_tags(&mut tags);
            let now = Utc::now();
            let mut created = Vec::with_capacity(names.len());
            for name in &names {
                let dance_move = insert_move_with_conn(&txn, name, now).await?;
                link_move_tags_with_conn(&txn, dance_move.id, &tags).await?;
                created.push(MoveDetail {
                    dance_move,
                    tags: tags.clone(),
                });
            }
            Ok(created)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn add_moves_batch(
        &self,
        names: Vec<String>,
    ) -> Result<Vec<dance_move::Model>, AppError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        for name in &names {
            ensure_non_empty("move name", name)?;
        }

        let txn = self.db.begin().await?;
        let result: Result<Vec<dance_move::Model>, AppError> = async {
            let now = Utc::now();
            let mut created = Vec::with_capacity(names.len());
            for name in &names {
                created.push(insert_move_with_conn(&txn, name, now).await?);
            }
            Ok(created)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn get_move(&self, id: i64) -> Result<dance_move::Model, AppError> {
        dance_move::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("move id {id}")))
    }

    pub async fn get_move_detail(&self, id: i64) -> Result<MoveDetail, AppError> {
        let dance_move = self.get_move(id).await?;
        let mut grouped = tags_for_moves_with_conn(&self.db, &[id]).await?;
        let tags = grouped.remove(&id).unwrap_or_default();
        Ok(MoveDetail { dance_move, tags })
    }

    /// Every move with its tags, ordered by name.
    pub async fn moves_with_tags(&self) -> Result<Vec<MoveDetail>, AppError> {
        let moves = dance_move::Entity::find()
            .order_by_asc(dance_move::Column::Name)
            .order_by_asc(dance_move::Column::Id)
            .all(&self.db)
            .await?;
        let move_ids: Vec<i64> = moves.iter().map(|item| item.id).collect();
        let mut grouped = tags_for_moves_with_conn(&self.db, &move_ids).await?;
        Ok(moves
            .into_iter()
            .map(|dance_move| {
                let tags = grouped.remove(&dance_move.id).unwrap_or_default();
                MoveDetail { dance_move, tags }
            })
            .collect())
    }

    pub async fn list_moves(&self, query: &MoveQuery) -> Result<Vec<MoveDetail>, AppError> {
        let search = query
            .search
            .as_deref()
            .map(|text| text.trim().to_lowercase())
            .filter(|text| !text.is_empty());
        let wanted = normalize_tag_names(&query.tags);
        let mut details = self.moves_with_tags().await?;
        details.retain(|detail| {
            let name_matches = search
                .as_deref()
                .map(|text| detail.dance_move.name.to_lowercase().contains(text))
                .unwrap_or(true);
            name_matches && carries_tags(&detail.tags, &wanted, query.tag_match)
        });
        Ok(details)
    }

    pub async fn rename_move(&self, id: i64, name: String) -> Result<dance_move::Model, AppError> {
        ensure_non_empty("move name", &name)?;
        let active = dance_move::ActiveModel {
            id: Set(id),
            name: Set(name.trim().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("move id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes moves. Their tag links and saved-combo entries go with them
    /// through the foreign keys; tags and combos themselves stay.
    pub async fn delete_moves(&self, ids: &[i64]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let unique = unique_ids(ids);

        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            let existing: HashSet<i64> = dance_move::Entity::find()
                .filter(dance_move::Column::Id.is_in(unique.clone()))
                .all(&txn)
                .await?
                .into_iter()
                .map(|item| item.id)
                .collect();
            let missing = missing_ids(&unique, &existing);
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "move id(s) not found: {}",
                    join_ids(&missing)
                )));
            }

            let entries = combo_move::Entity::find()
                .filter(combo_move::Column::MoveId.is_in(unique.clone()))
                .all(&txn)
                .await?;
            let combo_ids = unique_ids(
                &entries
                    .iter()
                    .map(|entry| entry.combo_id)
                    .collect::<Vec<_>>(),
            );

            let deleted = dance_move::Entity::delete_many()
                .filter(dance_move::Column::Id.is_in(unique.clone()))
                .exec(&txn)
                .await?;
            for combo_id in &combo_ids {
                normalize_combo_moves_with_conn(&txn, *combo_id).await?;
            }
            Ok(deleted.rows_affected)
        }
        .await;

        let deleted = finalize_transaction(txn, result).await?;
        info!(count = deleted, ids = %join_ids(&unique), "deleted moves");
        Ok(deleted)
    }

    pub async fn tag_move(&self, move_id: i64, names: &[String]) -> Result<MoveDetail, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            ensure_move_exists_with_conn(&txn, move_id).await?;
            let tags = find_tags_by_names_with_conn(&txn, names).await?;
            link_move_tags_with_conn(&txn, move_id, &tags).await?;
            touch_move_with_conn(&txn, move_id).await
        }
        .await;
        finalize_transaction(txn, result).await?;
        self.get_move_detail(move_id).await
    }

    pub async fn untag_move(
        &self,
        move_id: i64,
        names: &[String],
    ) -> Result<MoveDetail, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            ensure_move_exists_with_conn(&txn, move_id).await?;
            let tags = find_tags_by_names_with_conn(&txn, names).await?;
            let tag_ids: Vec<i64> = tags.iter().map(|tag| tag.id).collect();
            if !tag_ids.is_empty() {
                move_tag::Entity::delete_many()
                    .filter(move_tag::Column::MoveId.eq(move_id))
                    .filter(move_tag::Column::TagId.is_in(tag_ids))
                    .exec(&txn)
                    .await?;
            }
            touch_move_with_conn(&txn, move_id).await
        }
        .await;
        finalize_transaction(txn, result).await?;
        self.get_move_detail(move_id).await
    }

    pub async fn set_move_tags(
        &self,
        move_id: i64,
        names: &[String],
    ) -> Result<MoveDetail, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            ensure_move_exists_with_conn(&txn, move_id).await?;
            let tags = find_tags_by_names_with_conn(&txn, names).await?;
            move_tag::Entity::delete_many()
                .filter(move_tag::Column::MoveId.eq(move_id))
                .exec(&txn)
                .await?;
            link_move_tags_with_conn(&txn, move_id, &tags).await?;
            touch_move_with_conn(&txn, move_id).await
        }
        .await;
        finalize_transaction(txn, result).await?;
        self.get_move_detail(move_id).await
    }

    pub async fn add_tag(&self, name: String) -> Result<tag::Model, AppError> {
        ensure_non_empty("tag name", &name)?;
        let name = name.trim().to_string();

        let txn = self.db.begin().await?;
        let result: Result<tag::Model, AppError> = async {
            ensure_tag_name_available_with_conn(&txn, &name, None).await?;
            let active = tag::ActiveModel {
                name: Set(name),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            let insert = tag::Entity::insert(active).exec(&txn).await?;
            tag::Entity::find_by_id(insert.last_insert_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("tag not found after insert".to_string()))
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn get_tag(&self, id: i64) -> Result<tag::Model, AppError> {
        tag::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tag id {id}")))
    }

    pub async fn list_tags(&self) -> Result<Vec<TagSummary>, AppError> {
        let tags = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .order_by_asc(tag::Column::Id)
            .all(&self.db)
            .await?;
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for link in move_tag::Entity::find().all(&self.db).await? {
            *counts.entry(link.tag_id).or_default() += 1;
        }
        Ok(tags
            .into_iter()
            .map(|tag| {
                let move_count = counts.get(&tag.id).copied().unwrap_or(0);
                TagSummary { tag, move_count }
            })
            .collect())
    }

    pub async fn rename_tag(&self, id: i64, name: String) -> Result<tag::Model, AppError> {
        ensure_non_empty("tag name", &name)?;
        let name = name.trim().to_string();

        let txn = self.db.begin().await?;
        let result: Result<tag::Model, AppError> = async {
            ensure_tag_name_available_with_conn(&txn, &name, Some(id)).await?;
            let active = tag::ActiveModel {
                id: Set(id),
                name: Set(name),
                ..Default::default()
            };
            match active.update(&txn).await {
                Ok(model) => Ok(model),
                Err(sea_orm::DbErr::RecordNotFound(_))
                | Err(sea_orm::DbErr::RecordNotUpdated) => {
                    Err(AppError::NotFound(format!("tag id {id}")))
                }
                Err(err) => Err(err.into()),
            }
        }
        .await;

        finalize_transaction(txn, result).await
    }

    /// Removes a tag and, through the foreign keys, its move and combo links.
    pub async fn delete_tag(&self, id: i64) -> Result<(), AppError> {
        let result = tag::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("tag id {id}")));
        }
        info!(tag_id = id, "deleted tag");
        Ok(())
    }
}

/// Resolves tag names case-insensitively, keeping the requested order and
/// dropping duplicates. Unknown names are reported together.
pub(super) async fn find_tags_by_names_with_conn<C: ConnectionTrait>(
    db: &C,
    names: &[String],
) -> Result<Vec<tag::Model>, AppError> {
    if names.iter().all(|name| name.trim().is_empty()) {
        return Ok(Vec::new());
    }
    let all = tag::Entity::find().all(db).await?;
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if !seen.insert(lowered.clone()) {
            continue;
        }
        match all.iter().find(|tag| tag.name.to_lowercase() == lowered) {
            Some(tag) => found.push(tag.clone()),
            None => missing.push(trimmed.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "tag(s) not found: {}",
            missing.join(", ")
        )));
    }
    Ok(found)
}

pub(super) async fn tags_for_moves_with_conn<C: ConnectionTrait>(
    db: &C,
    move_ids: &[i64],
) -> Result<HashMap<i64, Vec<tag::Model>>, AppError> {
    let mut grouped: HashMap<i64, Vec<tag::Model>> = HashMap::new();
    if move_ids.is_empty() {
        return Ok(grouped);
    }
    let links = move_tag::Entity::find()
        .filter(move_tag::Column::MoveId.is_in(move_ids.to_vec()))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(grouped);
    }
    let tag_ids = unique_ids(&links.iter().map(|link| link.tag_id).collect::<Vec<_>>());
    let tags: HashMap<i64, tag::Model> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|tag| (tag.id, tag))
        .collect();
    for link in links {
        if let Some(tag) = tags.get(&link.tag_id) {
            grouped.entry(link.move_id).or_default().push(tag.clone());
        }
    }
    for items in grouped.values_mut() {
        sort_tags(items);
    }
    Ok(grouped)
}

pub(super) fn sort_tags(tags: &mut [tag::Model]) {
    tags.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
}

async fn ensure_tag_name_available_with_conn<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except_id: Option<i64>,
) -> Result<(), AppError> {
    let lowered = name.to_lowercase();
    let clash = tag::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .find(|tag| Some(tag.id) != except_id && tag.name.to_lowercase() == lowered);
    if let Some(existing) = clash {
        return Err(AppError::InvalidInput(format!(
            "tag '{}' already exists (tag id {})",
            existing.name, existing.id
        )));
    }
    Ok(())
}

async fn ensure_move_exists_with_conn<C: ConnectionTrait>(
    db: &C,
    move_id: i64,
) -> Result<(), AppError> {
    dance_move::Entity::find_by_id(move_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("move id {move_id}")))?;
    Ok(())
}

async fn insert_move_with_conn<C: ConnectionTrait>(
    db: &C,
    name: &str,
    now: DateTime<Utc>,
) -> Result<dance_move::Model, AppError> {
    let active = dance_move::ActiveModel {
        name: Set(name.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let insert = dance_move::Entity::insert(active).exec(db).await?;
    dance_move::Entity::find_by_id(insert.last_insert_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("move not found after insert".to_string()))
}

async fn link_move_tags_with_conn<C: ConnectionTrait>(
    db: &C,
    move_id: i64,
    tags: &[tag::Model],
) -> Result<(), AppError> {
    if tags.is_empty() {
        return Ok(());
    }
    let existing: HashSet<i64> = move_tag::Entity::find()
        .filter(move_tag::Column::MoveId.eq(move_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.tag_id)
        .collect();
    for tag in tags {
        if existing.contains(&tag.id) {
            continue;
        }
        let link = move_tag::ActiveModel {
            move_id: Set(move_id),
            tag_id: Set(tag.id),
        };
        move_tag::Entity::insert(link).exec_without_returning(db).await?;
    }
    Ok(())
}

async fn touch_move_with_conn<C: ConnectionTrait>(db: &C, move_id: i64) -> Result<(), AppError> {
    let active = dance_move::ActiveModel {
        id: Set(move_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::setup_app;
    use crate::model::TagMatch;
    use sea_orm::PaginatorTrait;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn add_move_links_requested_tags() {
        let (_dir, app) = setup_app().await;
        app.add_tag("Power".to_string()).await.expect("tag");
        app.add_tag("Spin".to_string()).await.expect("tag");

        let detail = app
            .add_move("Windmill".to_string(), names(&["spin", "POWER"]))
            .await
            .expect("add move");
        let tag_names: Vec<&str> = detail.tags.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(tag_names, vec!["Power", "Spin"]);

        let reloaded = app
            .get_move_detail(detail.dance_move.id)
            .await
            .expect("detail");
        assert_eq!(reloaded.tags.len(), 2);
    }

    #[tokio::test]
    async fn add_move_with_unknown_tag_creates_nothing() {
        let (_dir, app) = setup_app().await;
        let err = app
            .add_move("Flare".to_string(), names(&["Power"]))
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(message) => assert!(message.contains("Power")),
            other => panic!("unexpected error: {other}"),
        }
        let count = dance_move::Entity::find()
            .count(&app.db)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn add_move_rejects_blank_name() {
        let (_dir, app) = setup_app().await;
        let err = app.add_move("  ".to_string(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn add_moves_with_tags_is_all_or_nothing() {
        let (_dir, app) = setup_app().await;
        app.add_tag("Power".to_string()).await.expect("tag");

        let err = app
            .add_moves_with_tags(names(&["Windmill", " "]), names(&["Power"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let err = app
            .add_moves_with_tags(names(&["Windmill", "Flare"]), names(&["Power", "Spin"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let count = dance_move::Entity::find()
            .count(&app.db)
            .await
            .expect("count");
        assert_eq!(count, 0);

        let created = app
            .add_moves_with_tags(names(&["Windmill", "Flare"]), names(&["power"]))
            .await
            .expect("add moves");
        assert_eq!(created.len(), 2);
        for detail in &created {
            let reloaded = app
                .get_move_detail(detail.dance_move.id)
                .await
                .expect("detail");
            assert_eq!(reloaded.tags.len(), 1);
            assert_eq!(reloaded.tags[0].name, "Power");
        }
    }

    #[tokio::test]
    async fn deleting_move_removes_links_but_keeps_tags() {
        let (_dir, app) = setup_app().await;
        let tag = app.add_tag("Power".to_string()).await.expect("tag");
        let detail = app
            .add_move("Windmill".to_string(), names(&["Power"]))
            .await
            .expect("move");

        app.delete_moves(&[detail.dance_move.id])
            .await
            .expect("delete move");

        let links = move_tag::Entity::find()
            .count(&app.db)
            .await
            .expect("count links");
        assert_eq!(links, 0);
        let kept = app.get_tag(tag.id).await.expect("tag kept");
        assert_eq!(kept.name, "Power");
    }

    #[tokio::test]
    async fn deleting_tag_removes_links_but_keeps_moves() {
        let (_dir, app) = setup_app().await;
        let tag = app.add_tag("Power".to_string()).await.expect("tag");
        app.add_tag("Spin".to_string()).await.expect("tag");
        let detail = app
            .add_move("Windmill".to_string(), names(&["Power", "Spin"]))
            .await
            .expect("move");

        app.delete_tag(tag.id).await.expect("delete tag");

        let reloaded = app
            .get_move_detail(detail.dance_move.id)
            .await
            .expect("move kept");
        let tag_names: Vec<&str> = reloaded.tags.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(tag_names, vec!["Spin"]);
    }

    #[tokio::test]
    async fn delete_moves_errors_on_missing_ids() {
        let (_dir, app) = setup_app().await;
        let created = app
            .add_moves_batch(names(&["Windmill"]))
            .await
            .expect("moves");
        let err = app.delete_moves(&[created[0].id, 999]).await.unwrap_err();
        match err {
            AppError::NotFound(message) => assert!(message.contains("999")),
            other => panic!("unexpected error: {other}"),
        }
        app.get_move(created[0].id).await.expect("move still exists");
    }

    #[tokio::test]
    async fn tag_names_are_unique_ignoring_case() {
        let (_dir, app) = setup_app().await;
        app.add_tag("Power".to_string()).await.expect("tag");
        let err = app.add_tag(" power ".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let other = app.add_tag("Footwork".to_string()).await.expect("tag");
        let err = app
            .rename_tag(other.id, "POWER".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let renamed = app
            .rename_tag(other.id, "footwork".to_string())
            .await
            .expect("case change of own name");
        assert_eq!(renamed.name, "footwork");
    }

    #[tokio::test]
    async fn list_moves_filters_by_search_and_tags() {
        let (_dir, app) = setup_app().await;
        app.add_tag("Power".to_string()).await.expect("tag");
        app.add_tag("Freeze".to_string()).await.expect("tag");
        app.add_move("Windmill".to_string(), names(&["Power"]))
            .await
            .expect("move");
        app.add_move("Airchair".to_string(), names(&["Power", "Freeze"]))
            .await
            .expect("move");
        app.add_move("Baby freeze".to_string(), names(&["Freeze"]))
            .await
            .expect("move");

        let all_tags = app
            .list_moves(&MoveQuery {
                tags: names(&["power", "freeze"]),
                tag_match: TagMatch::All,
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(all_tags.len(), 1);
        assert_eq!(all_tags[0].dance_move.name, "Airchair");

        let searched = app
            .list_moves(&MoveQuery {
                search: Some("FREEZE".to_string()),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].dance_move.name, "Baby freeze");
    }

    #[tokio::test]
    async fn set_and_untag_move_tags() {
        let (_dir, app) = setup_app().await;
        app.add_tag("Power".to_string()).await.expect("tag");
        app.add_tag("Spin".to_string()).await.expect("tag");
        let detail = app
            .add_move("Headspin".to_string(), Vec::new())
            .await
            .expect("move");
        let id = detail.dance_move.id;

        let tagged = app.tag_move(id, &names(&["Spin"])).await.expect("tag");
        assert_eq!(tagged.tags.len(), 1);
        let tagged = app
            .tag_move(id, &names(&["spin", "Power"]))
            .await
            .expect("tag again");
        assert_eq!(tagged.tags.len(), 2);

        let untagged = app.untag_move(id, &names(&["power"])).await.expect("untag");
        assert_eq!(untagged.tags.len(), 1);
        assert_eq!(untagged.tags[0].name, "Spin");

        let replaced = app.set_move_tags(id, &[]).await.expect("clear");
        assert!(replaced.tags.is_empty());
    }

    #[tokio::test]
    async fn list_tags_counts_moves() {
        let (_dir, app) = setup_app().await;
        app.add_tag("Power".to_string()).await.expect("tag");
        app.add_tag("Toprock".to_string()).await.expect("tag");
        app.add_move("Windmill".to_string(), names(&["Power"]))
            .await
            .expect("move");
        app.add_move("Flare".to_string(), names(&["Power"]))
            .await
            .expect("move");

        let summaries = app.list_tags().await.expect("tags");
        let counts: Vec<(&str, usize)> = summaries
            .iter()
            .map(|summary| (summary.tag.name.as_str(), summary.move_count))
            .collect();
        assert_eq!(counts, vec![("Power", 2), ("Toprock", 0)]);
    }

    #[tokio::test]
    async fn rename_move_reports_missing_id() {
        let (_dir, app) = setup_app().await;
        let err = app
            .rename_move(42, "Windmill".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
