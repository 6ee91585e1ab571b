use crate::ids::TredId;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One entry of a tred's ordered `children` list.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tred_child")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub parent_id: TredId,
    pub child_id: TredId,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
