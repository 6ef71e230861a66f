use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

use super::{ensure_non_empty, finalize_transaction, normalize_optional, App, GoalDetail};
use crate::entities::{goal, goal_stage};
use crate::error::AppError;
use crate::model::{GoalChanges, GoalInput, StageChanges, StageInput};

impl App {
    pub async fn add_goal(&self, input: GoalInput) -> Result<GoalDetail, AppError> {
        ensure_non_empty("goal title", &input.title)?;
        for stage in &input.stages {
            validate_stage_input(stage)?;
        }

        let txn = self.db.begin().await?;
        let result: Result<i64, AppError> = async {
            let now = Utc::now();
            let active = goal::ActiveModel {
                title: Set(input.title.trim().to_string()),
                description: Set(normalize_optional(input.description)),
                archived: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let insert = goal::Entity::insert(active).exec(&txn).await?;
            let goal_id = insert.last_insert_id;
            for (idx, stage) in input.stages.iter().enumerate() {
                insert_stage_with_conn(&txn, goal_id, stage, (idx + 1) as i32).await?;
            }
            Ok(goal_id)
        }
        .await;

        let id = finalize_transaction(txn, result).await?;
        self.get_goal_detail(id).await
    }

    /// Lists goals newest first. `None` returns archived and active goals.
    pub async fn list_goals(&self, archived: Option<bool>) -> Result<Vec<GoalDetail>, AppError> {
        let mut select = goal::Entity::find();
        if let Some(archived) = archived {
            select = select.filter(goal::Column::Archived.eq(archived));
        }
        let goals = select
            .order_by_desc(goal::Column::UpdatedAt)
            .order_by_desc(goal::Column::Id)
            .all(&self.db)
            .await?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = goals.iter().map(|goal| goal.id).collect();
        let stages = goal_stage::Entity::find()
            .filter(goal_stage::Column::GoalId.is_in(ids))
            .order_by_asc(goal_stage::Column::GoalId)
            .order_by_asc(goal_stage::Column::SortOrder)
            .order_by_asc(goal_stage::Column::Id)
            .all(&self.db)
            .await?;
        let mut grouped: HashMap<i64, Vec<goal_stage::Model>> = HashMap::new();
        for stage in stages {
            grouped.entry(stage.goal_id).or_default().push(stage);
        }
        Ok(goals
            .into_iter()
            .map(|goal| {
                let stages = grouped.remove(&goal.id).unwrap_or_default();
                GoalDetail { goal, stages }
            })
            .collect())
    }

    pub async fn get_goal(&self, id: i64) -> Result<goal::Model, AppError> {
        goal::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    pub async fn get_goal_detail(&self, id: i64) -> Result<GoalDetail, AppError> {
        let goal = self.get_goal(id).await?;
        let stages = stages_for_goal_with_conn(&self.db, id).await?;
        Ok(GoalDetail { goal, stages })
    }

    pub async fn update_goal(&self, id: i64, changes: GoalChanges) -> Result<goal::Model, AppError> {
        if let Some(title) = changes.title.as_deref() {
            ensure_non_empty("goal title", title)?;
        }
        let mut active = goal::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(title) = changes.title {
            active.title = Set(title.trim().to_string());
        }
        if changes.description.is_some() {
            active.description = Set(normalize_optional(changes.description));
        }
        active.updated_at = Set(Utc::now());
        update_goal_active(active, id, &self.db).await
    }

    pub async fn set_goal_archived(&self, id: i64, archived: bool) -> Result<goal::Model, AppError> {
        let active = goal::ActiveModel {
            id: Set(id),
            archived: Set(archived),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        update_goal_active(active, id, &self.db).await
    }

    pub async fn delete_goal(&self, id: i64) -> Result<(), AppError> {
        let result = goal::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("goal id {id}")));
        }
        info!(goal_id = id, "deleted goal");
        Ok(())
    }

    pub async fn add_stage(
        &self,
        goal_id: i64,
        input: StageInput,
    ) -> Result<goal_stage::Model, AppError> {
        validate_stage_input(&input)?;

        let txn = self.db.begin().await?;
        let result: Result<goal_stage::Model, AppError> = async {
            if goal::Entity::find_by_id(goal_id).one(&txn).await?.is_none() {
                return Err(AppError::NotFound(format!("goal id {goal_id}")));
            }
            let stages = stages_for_goal_with_conn(&txn, goal_id).await?;
            let sort_order = stages
                .iter()
                .map(|stage| stage.sort_order)
                .max()
                .unwrap_or(0)
                + 1;
            let stage_id = insert_stage_with_conn(&txn, goal_id, &input, sort_order).await?;
            touch_goal_with_conn(&txn, goal_id).await?;
            goal_stage::Entity::find_by_id(stage_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("stage id {stage_id}")))
        }
        .await;

        finalize_transaction(txn, result).await
    }

    /// Applies stage edits. An explicit `current_count` outside
    /// `0..=target_count` is rejected; lowering the target pulls an
    /// existing count down with it.
    pub async fn update_stage(
        &self,
        id: i64,
        changes: StageChanges,
    ) -> Result<goal_stage::Model, AppError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_non_empty("stage name", name)?;
        }
        if let Some(unit) = changes.unit.as_deref() {
            ensure_non_empty("stage unit", unit)?;
        }
        if let Some(target) = changes.target_count {
            ensure_positive_target(target)?;
        }

        let txn = self.db.begin().await?;
        let result: Result<goal_stage::Model, AppError> = async {
            let stage = goal_stage::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("stage id {id}")))?;
            let target = changes.target_count.unwrap_or(stage.target_count);
            let current = match changes.current_count {
                Some(current) if current < 0 || current > target => {
                    return Err(AppError::InvalidInput(format!(
                        "current count {current} must be between 0 and {target}"
                    )));
                }
                Some(current) => current,
                None => stage.current_count.min(target),
            };

            let goal_id = stage.goal_id;
            let mut active: goal_stage::ActiveModel = stage.into();
            if let Some(name) = changes.name {
                active.name = Set(name.trim().to_string());
            }
            if let Some(unit) = changes.unit {
                active.unit = Set(unit.trim().to_string());
            }
            active.target_count = Set(target);
            active.current_count = Set(current);
            let updated = active.update(&txn).await?;
            touch_goal_with_conn(&txn, goal_id).await?;
            Ok(updated)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    /// Moves a stage's count by `delta`, clamped into `0..=target_count`.
    pub async fn adjust_stage_progress(
        &self,
        id: i64,
        delta: i32,
    ) -> Result<goal_stage::Model, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<goal_stage::Model, AppError> = async {
            let stage = goal_stage::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("stage id {id}")))?;
            let current = clamp_progress(stage.current_count, delta, stage.target_count);
            if current == stage.current_count {
                return Ok(stage);
            }
            let goal_id = stage.goal_id;
            let mut active: goal_stage::ActiveModel = stage.into();
            active.current_count = Set(current);
            let updated = active.update(&txn).await?;
            touch_goal_with_conn(&txn, goal_id).await?;
            Ok(updated)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn delete_stage(&self, id: i64) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            let stage = goal_stage::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("stage id {id}")))?;
            goal_stage::Entity::delete_by_id(id).exec(&txn).await?;
            let remaining = stages_for_goal_with_conn(&txn, stage.goal_id).await?;
            for (idx, item) in remaining.into_iter().enumerate() {
                let desired = (idx + 1) as i32;
                if item.sort_order != desired {
                    let mut active: goal_stage::ActiveModel = item.into();
                    active.sort_order = Set(desired);
                    active.update(&txn).await?;
                }
            }
            touch_goal_with_conn(&txn, stage.goal_id).await?;
            Ok(())
        }
        .await;

        finalize_transaction(txn, result).await
    }
}

fn clamp_progress(current: i32, delta: i32, target: i32) -> i32 {
    current.saturating_add(delta).clamp(0, target.max(0))
}

fn validate_stage_input(input: &StageInput) -> Result<(), AppError> {
    ensure_non_empty("stage name", &input.name)?;
    ensure_non_empty("stage unit", &input.unit)?;
    ensure_positive_target(input.target_count)
}

fn ensure_positive_target(target: i32) -> Result<(), AppError> {
    if target < 1 {
        return Err(AppError::InvalidInput(format!(
            "target count must be at least 1, got {target}"
        )));
    }
    Ok(())
}

async fn insert_stage_with_conn<C: ConnectionTrait>(
    db: &C,
    goal_id: i64,
    input: &StageInput,
    sort_order: i32,
) -> Result<i64, AppError> {
    let active = goal_stage::ActiveModel {
        goal_id: Set(goal_id),
        name: Set(input.name.trim().to_string()),
        target_count: Set(input.target_count),
        current_count: Set(0),
        unit: Set(input.unit.trim().to_string()),
        sort_order: Set(sort_order),
        ..Default::default()
    };
    let insert = goal_stage::Entity::insert(active).exec(db).await?;
    Ok(insert.last_insert_id)
}

async fn stages_for_goal_with_conn<C: ConnectionTrait>(
    db: &C,
    goal_id: i64,
) -> Result<Vec<goal_stage::Model>, AppError> {
    Ok(goal_stage::Entity::find()
        .filter(goal_stage::Column::GoalId.eq(goal_id))
        .order_by_asc(goal_stage::Column::SortOrder)
        .order_by_asc(goal_stage::Column::Id)
        .all(db)
        .await?)
}

async fn touch_goal_with_conn<C: ConnectionTrait>(db: &C, goal_id: i64) -> Result<(), AppError> {
    let active = goal::ActiveModel {
        id: Set(goal_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    update_goal_active(active, goal_id, db).await.map(|_| ())
}

async fn update_goal_active<C: ConnectionTrait>(
    active: goal::ActiveModel,
    id: i64,
    db: &C,
) -> Result<goal::Model, AppError> {
    match active.update(db).await {
        Ok(model) => Ok(model),
        Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
            Err(AppError::NotFound(format!("goal id {id}")))
        }
        Err(err) => Err(err.into()),
    }
}
