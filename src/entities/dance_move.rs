use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{combo_move, move_tag};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "moves")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    MoveTag,
    ComboMove,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::MoveTag => Entity::has_many(move_tag::Entity).into(),
            Self::ComboMove => Entity::has_many(combo_move::Entity).into(),
        }
    }
}

impl Related<move_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MoveTag.def()
    }
}

impl Related<combo_move::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ComboMove.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
