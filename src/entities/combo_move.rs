use sea_orm::entity::prelude::*;
use sea_orm::sea_query::ForeignKeyAction;
use serde::{Deserialize, Serialize};

use super::{combo, dance_move};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "combo_moves")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub combo_id: i64,
    pub move_id: i64,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Combo,
    Move,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Combo => Entity::belongs_to(combo::Entity)
                .from(Column::ComboId)
                .to(combo::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
            Self::Move => Entity::belongs_to(dance_move::Entity)
                .from(Column::MoveId)
                .to(dance_move::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
        }
    }
}

impl Related<combo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Combo.def()
    }
}

impl Related<dance_move::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Move.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
