use sea_orm::entity::prelude::*;
use sea_orm::sea_query::ForeignKeyAction;
use serde::{Deserialize, Serialize};

use super::battle_combo;

/// Move names are copied in; they do not follow later renames in the catalog.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "battle_combo_moves")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub battle_combo_id: i64,
    pub move_name: String,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    BattleCombo,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::BattleCombo => Entity::belongs_to(battle_combo::Entity)
                .from(Column::BattleComboId)
                .to(battle_combo::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
        }
    }
}

impl Related<battle_combo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BattleCombo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
