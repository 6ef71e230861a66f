use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{combo_move, combo_tag};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "combos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub energy: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    ComboMove,
    ComboTag,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::ComboMove => Entity::has_many(combo_move::Entity).into(),
            Self::ComboTag => Entity::has_many(combo_tag::Entity).into(),
        }
    }
}

impl Related<combo_move::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ComboMove.def()
    }
}

impl Related<combo_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ComboTag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
