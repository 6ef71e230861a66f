use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::battle_combo_move;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "battle_combos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub description: String,
    pub energy: String,
    pub status: String,
    pub used: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    BattleComboMove,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::BattleComboMove => Entity::has_many(battle_combo_move::Entity).into(),
        }
    }
}

impl Related<battle_combo_move::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BattleComboMove.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
