mod battle;
mod combos;
mod goals;
mod moves;

use std::collections::HashSet;

use sea_orm::{DatabaseConnection, DatabaseTransaction};

use crate::entities::{battle_combo, combo, dance_move, goal, goal_stage, tag};
use crate::error::AppError;
use crate::transfer::{self, Snapshot};

pub struct App {
    db: DatabaseConnection,
}

#[derive(Clone, Debug)]
pub struct MoveDetail {
    pub dance_move: dance_move::Model,
    pub tags: Vec<tag::Model>,
}

#[derive(Clone, Debug)]
pub struct TagSummary {
    pub tag: tag::Model,
    pub move_count: usize,
}

#[derive(Clone, Debug)]
pub struct ComboDetail {
    pub combo: combo::Model,
    pub moves: Vec<dance_move::Model>,
    pub tags: Vec<tag::Model>,
}

#[derive(Clone, Debug)]
pub struct BattleComboDetail {
    pub combo: battle_combo::Model,
    pub moves: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GoalDetail {
    pub goal: goal::Model,
    pub stages: Vec<goal_stage::Model>,
}

impl GoalDetail {
    /// Returns `(current, target)` summed over every stage.
    pub fn progress(&self) -> (i64, i64) {
        self.stages.iter().fold((0, 0), |(current, target), stage| {
            (
                current + i64::from(stage.current_count.min(stage.target_count)),
                target + i64::from(stage.target_count),
            )
        })
    }

    pub fn percent(&self) -> u8 {
        let (current, target) = self.progress();
        if target == 0 {
            return 0;
        }
        ((current * 100) / target) as u8
    }

    pub fn is_complete(&self) -> bool {
        !self.stages.is_empty()
            && self
                .stages
                .iter()
                .all(|stage| stage.current_count >= stage.target_count)
    }
}

impl App {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn export_data(&self) -> Result<Snapshot, AppError> {
        transfer::export_snapshot(&self.db).await
    }

    pub async fn import_data(&self, snapshot: Snapshot) -> Result<(), AppError> {
        transfer::import_snapshot(&self.db, snapshot).await
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        if seen.insert(*id) {
            unique.push(*id);
        }
    }
    unique
}

fn missing_ids(requested: &[i64], found: &HashSet<i64>) -> Vec<i64> {
    requested
        .iter()
        .cloned()
        .filter(|id| !found.contains(id))
        .collect()
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
