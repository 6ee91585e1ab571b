use crate::ids::{TredId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tred")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: TredId,
    pub text: String,
    pub author_id: UserId,
    // NULL for top-level posts. Not a foreign key; subtree deletion walks
    // this column and may leave it pointing at a removed tred.
    pub parent_id: Option<TredId>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
