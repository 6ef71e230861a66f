use sea_orm::entity::prelude::*;
use sea_orm::sea_query::ForeignKeyAction;
use serde::{Deserialize, Serialize};

use super::{combo, tag};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "combo_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub combo_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Combo,
    Tag,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Combo => Entity::belongs_to(combo::Entity)
                .from(Column::ComboId)
                .to(combo::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
            Self::Tag => Entity::belongs_to(tag::Entity)
                .from(Column::TagId)
                .to(tag::Column::Id)
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

impl Related<tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
