use crate::ids::UserId;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: UserId,
    /// Id handed out by the identity provider.
    #[sea_orm(unique)]
    pub external_id: String,
    #[sea_orm(unique)]
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: Option<String>,
    pub onboarded: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tred::Entity")]
    Tred,
    #[sea_orm(has_many = "super::user_tred::Entity")]
    UserTred,
}

impl Related<super::tred::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tred.def()
    }
}

impl Related<super::user_tred::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserTred.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
