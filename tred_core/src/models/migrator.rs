use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users_table;
mod m20260301_000002_create_treds_table;
mod m20260301_000003_create_user_treds_table;
mod m20260301_000004_create_tred_children_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users_table::Migration),
            Box::new(m20260301_000002_create_treds_table::Migration),
            Box::new(m20260301_000003_create_user_treds_table::Migration),
            Box::new(m20260301_000004_create_tred_children_table::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{Database, DbErr};

    #[tokio::test]
    async fn test_migrations_okay() -> Result<(), DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        let schema_manager = SchemaManager::new(&db);

        Migrator::refresh(&db).await?;

        assert!(schema_manager.has_table("user").await?);
        assert!(schema_manager.has_table("tred").await?);
        assert!(schema_manager.has_table("user_tred").await?);
        assert!(schema_manager.has_table("tred_child").await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_migrations_roll_back() -> Result<(), DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        let schema_manager = SchemaManager::new(&db);

        Migrator::up(&db, None).await?;
        Migrator::down(&db, None).await?;

        assert!(!schema_manager.has_table("tred").await?);
        assert!(!schema_manager.has_table("user").await?);

        Ok(())
    }
}
