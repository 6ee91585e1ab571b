use chrono::Utc;

use crate::{
    entity::prelude::*,
    ids::{TredId, UserId},
    models::migrator::Migrator,
};
use sea_orm_migration::MigratorTrait;

/// Fresh in-memory SQLite database with every migration applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Inserts a user whose external id is `ext-{username}`.
pub async fn insert_user(db: &DatabaseConnection, username: &str, onboarded: bool) -> UserModel {
    let now = Utc::now();
    let user = UserActiveModel {
        id: Set(UserId::new()),
        external_id: Set(format!("ext-{username}")),
        username: Set(username.to_string()),
        name: Set(format!("{username} name")),
        bio: Set(String::new()),
        image: Set(None),
        onboarded: Set(onboarded),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user.insert(db).await.expect("Failed to insert user")
}

/// Inserts a tred and its reference link the same way the services do:
/// top-level treds go into the author's list, replies into the parent's.
pub async fn insert_tred(
    db: &DatabaseConnection,
    author: &UserModel,
    parent: Option<&TredModel>,
    text: &str,
) -> TredModel {
    let tred = TredActiveModel {
        id: Set(TredId::new()),
        text: Set(text.to_string()),
        author_id: Set(author.id),
        parent_id: Set(parent.map(|p| p.id)),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert tred");

    match parent {
        Some(parent) => {
            TredChildActiveModel {
                id: NotSet,
                parent_id: Set(parent.id),
                child_id: Set(tred.id),
            }
            .insert(db)
            .await
            .expect("Failed to link child");
        }
        None => {
            UserTredActiveModel {
                id: NotSet,
                user_id: Set(author.id),
                tred_id: Set(tred.id),
            }
            .insert(db)
            .await
            .expect("Failed to link tred to author");
        }
    }

    tred
}

pub async fn tred_count(db: &DatabaseConnection) -> u64 {
    Tred::find().count(db).await.expect("Failed to count treds")
}
