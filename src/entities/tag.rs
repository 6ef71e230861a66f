use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{combo_tag, move_tag};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    MoveTag,
    ComboTag,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::MoveTag => Entity::has_many(move_tag::Entity).into(),
            Self::ComboTag => Entity::has_many(combo_tag::Entity).into(),
        }
    }
}

impl Related<move_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MoveTag.def()
    }
}

impl Related<combo_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ComboTag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
