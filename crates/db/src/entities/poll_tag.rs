//! Poll tag entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub tag: i32,

    #[sea_orm(indexed)]
    pub guild_id: i64,

    pub name: String,

    /// Channel polls with this tag are posted to
    pub channel_id: i64,

    #[sea_orm(nullable)]
    pub colour: Option<i32>,

    pub persistent: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll::Entity")]
    Polls,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Polls.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
