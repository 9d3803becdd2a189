//! Poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Guild (Discord snowflake) the poll belongs to
    #[sea_orm(indexed)]
    pub guild_id: i64,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Ordered answer options; the length is fixed once published
    pub choices: Vec<String>,

    pub published: bool,

    pub active: bool,

    pub show_question: bool,

    pub show_options: bool,

    /// Whether per-choice tallies are visible to non-managers
    pub show_voting: bool,

    #[sea_orm(nullable)]
    pub tag: Option<i32>,

    /// Scheduled post time, the chronological sort key
    #[sea_orm(nullable)]
    pub time: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub num: Option<i32>,

    #[sea_orm(nullable)]
    pub image: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub thread_question: Option<String>,

    pub fallback: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll_tag::Entity",
        from = "Column::Tag",
        to = "super::poll_tag::Column::Tag",
        on_delete = "SetNull"
    )]
    Tag,

    #[sea_orm(has_many = "super::poll_vote::Entity")]
    Votes,
}

impl Related<super::poll_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl Related<super::poll_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
