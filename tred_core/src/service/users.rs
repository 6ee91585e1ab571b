use std::collections::HashMap;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::{check_len, ValidationError},
    ids::{TredId, UserId},
    service::{
        access::{AccessError, AccessGate, AuthIdentity},
        revalidate::Revalidator,
        thread::{populate, TredNode},
    },
};

const USERNAME_LEN: (usize, usize) = (3, 30);
const NAME_LEN: (usize, usize) = (3, 30);
const BIO_MAX_LEN: usize = 1000;

#[derive(Debug, Error)]
pub enum UsersServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("failed to update user: {0}")]
    UpdateFailed(#[source] DbErr),

    #[error("user not found")]
    UserNotFound,

    #[error("username already taken")]
    UsernameTaken,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

impl From<UsersServiceError> for ResourceError {
    fn from(error: UsersServiceError) -> Self {
        match error {
            UsersServiceError::DbError(error) => ResourceError::infra(error),
            UsersServiceError::UpdateFailed(_) => ResourceError::infra(error),
            UsersServiceError::Access(AccessError::DbError(error)) => ResourceError::infra(error),
            UsersServiceError::UserNotFound => ResourceError::app(error),
            UsersServiceError::UsernameTaken => ResourceError::app(error),
            UsersServiceError::Invalid(_) => ResourceError::app(error),
            UsersServiceError::Access(_) => ResourceError::app(error),
        }
    }
}

/// Profile fields submitted by the onboarding form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingForm {
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: Option<String>,
}

/// Initial values for the onboarding form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingDraft {
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: Option<String>,
}

impl OnboardingDraft {
    /// Stored profile values win; the identity provider's display name and
    /// avatar fill whatever is missing.
    pub fn new(identity: &AuthIdentity, existing: Option<&UserModel>) -> Self {
        match existing {
            Some(user) => Self {
                external_id: identity.external_id.clone(),
                username: user.username.clone(),
                name: user.name.clone(),
                bio: user.bio.clone(),
                image: user.image.clone().or_else(|| identity.image_url.clone()),
            },
            None => Self {
                external_id: identity.external_id.clone(),
                username: String::new(),
                name: identity.name.clone().unwrap_or_default(),
                bio: String::new(),
                image: identity.image_url.clone(),
            },
        }
    }
}

#[derive(Clone)]
pub struct UsersService {
    db: DatabaseConnection,
    gate: AccessGate,
    revalidator: Revalidator,
}

impl UsersService {
    pub fn new(db: DatabaseConnection, revalidator: Revalidator) -> Self {
        Self {
            gate: AccessGate::new(db.clone()),
            db,
            revalidator,
        }
    }

    pub async fn _fetch_user(&self, external_id: &str) -> Result<Option<UserModel>, UsersServiceError> {
        Ok(User::find()
            .filter(UserColumn::ExternalId.eq(external_id))
            .one(&self.db)
            .await?)
    }

    /// Create or update the caller's profile and mark it onboarded.
    pub async fn _onboard(
        &self,
        identity: &AuthIdentity,
        form: OnboardingForm,
        path: &str,
    ) -> Result<UserModel, UsersServiceError> {
        let username = form.username.trim().to_lowercase();
        check_len("username", &username, USERNAME_LEN.0, Some(USERNAME_LEN.1))?;
        check_len("name", &form.name, NAME_LEN.0, Some(NAME_LEN.1))?;
        check_len("bio", &form.bio, 0, Some(BIO_MAX_LEN))?;

        let existing = self._fetch_user(&identity.external_id).await?;

        let holder = User::find()
            .filter(UserColumn::Username.eq(username.as_str()))
            .one(&self.db)
            .await?;
        if let Some(holder) = holder {
            if existing.as_ref().map(|user| user.id) != Some(holder.id) {
                return Err(UsersServiceError::UsernameTaken);
            }
        }

        let now = Utc::now();
        let image = form.image.or_else(|| identity.image_url.clone());

        let saved = match existing {
            Some(user) => {
                let mut user: UserActiveModel = user.into();
                user.username = Set(username);
                user.name = Set(form.name);
                user.bio = Set(form.bio);
                user.image = Set(image);
                user.onboarded = Set(true);
                user.updated_at = Set(now);
                user.update(&self.db).await
            }
            None => {
                UserActiveModel {
                    id: Set(UserId::new()),
                    external_id: Set(identity.external_id.clone()),
                    username: Set(username),
                    name: Set(form.name),
                    bio: Set(form.bio),
                    image: Set(image),
                    onboarded: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&self.db)
                .await
            }
        };

        let user = saved.map_err(|err| {
            error!(external_id = %identity.external_id, error = %err, "failed to update user");
            UsersServiceError::UpdateFailed(err)
        })?;

        info!(user_id = %user.id, username = %user.username, "user onboarded");
        self.revalidator.revalidate(path);
        Ok(user)
    }

    /// Raw `treds` list of a user, in insertion order. May contain ids of
    /// deleted treds.
    pub async fn _tred_ids(&self, user_id: UserId) -> Result<Vec<TredId>, UsersServiceError> {
        Ok(UserTred::find()
            .filter(UserTredColumn::UserId.eq(user_id))
            .order_by_asc(UserTredColumn::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.tred_id)
            .collect())
    }

    /// The user's treds in list order, each with one level of replies.
    pub async fn _fetch_user_treds(
        &self,
        user_id: UserId,
    ) -> Result<Vec<TredNode>, UsersServiceError> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(UsersServiceError::UserNotFound)?;

        let ids = self._tred_ids(user_id).await?;

        let mut found: HashMap<TredId, TredModel> = Tred::find()
            .filter(TredColumn::Id.is_in(ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|tred| (tred.id, tred))
            .collect();

        let ordered = ids.iter().filter_map(|id| found.remove(id)).collect();

        Ok(populate(&self.db, ordered, 1).await?)
    }
}

#[zel_service(name = "users")]
trait Users {
    #[doc = "Local profile of the calling peer, if it has one"]
    #[method(name = "me")]
    async fn me(&self) -> Result<Option<UserModel>, ResourceError>;

    #[doc = "Prefilled values for the onboarding form"]
    #[method(name = "onboarding_draft")]
    async fn onboarding_draft(&self) -> Result<OnboardingDraft, ResourceError>;

    #[doc = "Create or update the calling peer's profile"]
    #[method(name = "onboard")]
    async fn onboard(&self, form: OnboardingForm, path: String) -> Result<UserModel, ResourceError>;

    #[doc = "A user's treds with one level of replies"]
    #[method(name = "user_treds")]
    async fn user_treds(&self, user_id: UserId) -> Result<Vec<TredNode>, ResourceError>;
}

#[async_trait]
impl UsersServer for UsersService {
    async fn me(&self, ctx: RequestContext) -> Result<Option<UserModel>, ResourceError> {
        let identity = AuthIdentity::from_request(&ctx);
        Ok(self._fetch_user(&identity.external_id).await?)
    }

    async fn onboarding_draft(&self, ctx: RequestContext) -> Result<OnboardingDraft, ResourceError> {
        let identity = AuthIdentity::from_request(&ctx);
        let existing = self._fetch_user(&identity.external_id).await?;
        Ok(OnboardingDraft::new(&identity, existing.as_ref()))
    }

    async fn onboard(
        &self,
        ctx: RequestContext,
        form: OnboardingForm,
        path: String,
    ) -> Result<UserModel, ResourceError> {
        let identity = AuthIdentity::from_request(&ctx);
        Ok(self._onboard(&identity, form, &path).await?)
    }

    async fn user_treds(
        &self,
        ctx: RequestContext,
        user_id: UserId,
    ) -> Result<Vec<TredNode>, ResourceError> {
        let identity = AuthIdentity::from_request(&ctx);
        self.gate
            .require_onboarded(Some(&identity))
            .await
            .map_err(UsersServiceError::from)?;
        Ok(self._fetch_user_treds(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::thread::Reply;
    use crate::test_utils::{insert_tred, insert_user, setup_test_db};

    async fn setup_test_service() -> (UsersService, DatabaseConnection) {
        let db = setup_test_db().await;
        let service = UsersService::new(db.clone(), Revalidator::new());
        (service, db)
    }

    fn form(username: &str) -> OnboardingForm {
        OnboardingForm {
            username: username.to_string(),
            name: "Some Name".to_string(),
            bio: "hello".to_string(),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_onboard_creates_user() {
        let (service, _db) = setup_test_service().await;
        let mut rx = service.revalidator.subscribe();
        let identity = AuthIdentity {
            external_id: "peer-1".to_string(),
            name: Some("Peer".to_string()),
            image_url: Some("https://img/peer.png".to_string()),
        };

        let user = service
            ._onboard(&identity, form("  NewUser "), "/onboarding")
            .await
            .expect("Failed to onboard");

        assert_eq!(user.external_id, "peer-1");
        assert_eq!(user.username, "newuser");
        assert_eq!(user.image.as_deref(), Some("https://img/peer.png"));
        assert!(user.onboarded);
        assert_eq!(rx.recv().await.unwrap(), "/onboarding");

        let fetched = service._fetch_user("peer-1").await.unwrap();
        assert_eq!(fetched, Some(user));
    }

    #[tokio::test]
    async fn test_onboard_updates_existing_profile() {
        let (service, db) = setup_test_service().await;
        let pending = insert_user(&db, "pending", false).await;
        let identity = AuthIdentity::new(pending.external_id.clone());

        let user = service
            ._onboard(&identity, form("pending"), "/profile/edit")
            .await
            .unwrap();

        assert_eq!(user.id, pending.id);
        assert_eq!(user.name, "Some Name");
        assert!(user.onboarded);
        assert!(user.updated_at >= pending.updated_at);
    }

    #[tokio::test]
    async fn test_onboard_rejects_taken_username() {
        let (service, db) = setup_test_service().await;
        insert_user(&db, "alice", true).await;

        let result = service
            ._onboard(&AuthIdentity::new("peer-2"), form("Alice"), "/")
            .await;

        assert!(matches!(result, Err(UsersServiceError::UsernameTaken)));
        assert_eq!(service._fetch_user("peer-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_onboard_validates_fields() {
        let (service, _db) = setup_test_service().await;
        let identity = AuthIdentity::new("peer-3");

        let short = service._onboard(&identity, form("ab"), "/").await;
        assert!(matches!(
            short,
            Err(UsersServiceError::Invalid(ValidationError::TooShort {
                field: "username",
                ..
            }))
        ));

        let mut long_bio = form("valid");
        long_bio.bio = "x".repeat(BIO_MAX_LEN + 1);
        let long = service._onboard(&identity, long_bio, "/").await;
        assert!(matches!(
            long,
            Err(UsersServiceError::Invalid(ValidationError::TooLong { field: "bio", .. }))
        ));
    }

    #[test]
    fn test_draft_prefers_stored_profile() {
        let identity = AuthIdentity {
            external_id: "peer".to_string(),
            name: Some("Display".to_string()),
            image_url: Some("avatar".to_string()),
        };

        let fresh = OnboardingDraft::new(&identity, None);
        assert_eq!(fresh.name, "Display");
        assert_eq!(fresh.username, "");
        assert_eq!(fresh.image.as_deref(), Some("avatar"));

        let now = Utc::now();
        let stored = UserModel {
            id: UserId::new(),
            external_id: "peer".to_string(),
            username: "stored".to_string(),
            name: "Stored Name".to_string(),
            bio: "bio".to_string(),
            image: None,
            onboarded: false,
            created_at: now,
            updated_at: now,
        };
        let draft = OnboardingDraft::new(&identity, Some(&stored));
        assert_eq!(draft.username, "stored");
        assert_eq!(draft.name, "Stored Name");
        assert_eq!(draft.image.as_deref(), Some("avatar"));
    }

    #[tokio::test]
    async fn test_user_treds_skip_deleted_but_ids_remain() {
        let (service, db) = setup_test_service().await;
        let user = insert_user(&db, "alice", true).await;
        let first = insert_tred(&db, &user, None, "first").await;
        let gone = insert_tred(&db, &user, None, "gone").await;
        let last = insert_tred(&db, &user, None, "last").await;
        let reply = insert_tred(&db, &user, Some(&first), "reply").await;

        Tred::delete_by_id(gone.id).exec(&db).await.unwrap();

        let treds = service._fetch_user_treds(user.id).await.unwrap();
        let ids: Vec<TredId> = treds.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first.id, last.id]);
        assert_eq!(
            treds[0].children.iter().map(Reply::id).collect::<Vec<_>>(),
            vec![reply.id]
        );

        assert_eq!(
            service._tred_ids(user.id).await.unwrap(),
            vec![first.id, gone.id, last.id]
        );
    }

    #[tokio::test]
    async fn test_user_treds_unknown_user() {
        let (service, _db) = setup_test_service().await;

        let result = service._fetch_user_treds(UserId::new()).await;
        assert!(matches!(result, Err(UsersServiceError::UserNotFound)));
    }
}
