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
                    .table(Tred::Table)
                    .col(pk_uuid(Tred::Id))
                    .col(text(Tred::Text))
                    .col(uuid(Tred::AuthorId))
                    // No foreign key: the parent may already be gone.
                    .col(uuid_null(Tred::ParentId))
                    .col(timestamp_with_time_zone(Tred::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tred-author_id")
                            .from(Tred::Table, Tred::AuthorId)
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
                    .name("idx_treds_author_id")
                    .table(Tred::Table)
                    .col(Tred::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Feed ordering
        manager
            .create_index(
                Index::create()
                    .name("idx_treds_created_at")
                    .table(Tred::Table)
                    .col(Tred::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Top-level filter and descendant lookups during deletion
        manager
            .create_index(
                Index::create()
                    .name("idx_treds_parent_id")
                    .table(Tred::Table)
                    .col(Tred::ParentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tred::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tred {
    Table,
    Id,
    Text,
    AuthorId,
    ParentId,
    CreatedAt,
}
