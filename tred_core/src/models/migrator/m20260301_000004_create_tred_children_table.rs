use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TredChild::Table)
                    .col(pk_auto(TredChild::Id))
                    .col(uuid(TredChild::ParentId))
                    .col(uuid(TredChild::ChildId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tred_children_parent_id")
                    .table(TredChild::Table)
                    .col(TredChild::ParentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TredChild::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TredChild {
    Table,
    Id,
    ParentId,
    ChildId,
}
