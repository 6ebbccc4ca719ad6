//! Thread entity - a conversation container.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "threads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Conversation subject line
    #[sea_orm(column_type = "Text")]
    pub subject: String,

    pub created_at: DateTimeWithTimeZone,

    /// Last activity timestamp; touched whenever a message is posted
    #[sea_orm(indexed)]
    pub updated_at: DateTimeWithTimeZone,

    /// Archive tombstone. NULL = active, Some = archived (never hard-deleted)
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message::Entity")]
    Message,

    #[sea_orm(has_many = "super::participant::Entity")]
    Participant,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
