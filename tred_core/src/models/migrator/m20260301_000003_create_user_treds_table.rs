use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_users_table::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserTred::Table)
                    .col(pk_auto(UserTred::Id))
                    .col(uuid(UserTred::UserId))
                    .col(uuid(UserTred::TredId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user-tred-user_id")
                            .from(UserTred::Table, UserTred::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_treds_user_id")
                    .table(UserTred::Table)
                    .col(UserTred::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserTred::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum UserTred {
    Table,
    Id,
    UserId,
    TredId,
}
