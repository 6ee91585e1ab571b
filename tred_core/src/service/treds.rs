use std::collections::HashSet;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{error, info};
use zel_core::prelude::*;

use crate::{
    config::Limits,
    entity::prelude::*,
    error::{check_len, ValidationError},
    ids::{TredId, UserId},
    service::{
        access::{can_delete, AccessError, AccessGate, AuthIdentity},
        revalidate::Revalidator,
        thread::{populate, FeedPage, TredNode},
    },
};

/// Replies populated under each feed post.
const FEED_REPLY_DEPTH: usize = 1;

#[derive(Debug, Error)]
pub enum TredsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("failed to create tred: {0}")]
    CreateFailed(#[source] DbErr),

    #[error("failed to add comment: {0}")]
    CommentFailed(#[source] DbErr),

    #[error("tred not found")]
    TredNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid page {0}")]
    InvalidPage(u64),

    #[error("not allowed to delete this tred")]
    DeleteForbidden,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

impl From<TredsServiceError> for ResourceError {
    fn from(error: TredsServiceError) -> Self {
        match error {
            TredsServiceError::DbError(error) => ResourceError::infra(error),
            TredsServiceError::CreateFailed(_) => ResourceError::infra(error),
            TredsServiceError::CommentFailed(_) => ResourceError::infra(error),
            TredsServiceError::Access(AccessError::DbError(error)) => ResourceError::infra(error),
            TredsServiceError::TredNotFound => ResourceError::app(error),
            TredsServiceError::UserNotFound => ResourceError::app(error),
            TredsServiceError::InvalidPage(_) => ResourceError::app(error),
            TredsServiceError::DeleteForbidden => ResourceError::app(error),
            TredsServiceError::Invalid(_) => ResourceError::app(error),
            TredsServiceError::Access(_) => ResourceError::app(error),
        }
    }
}

#[derive(Clone)]
pub struct TredsService {
    db: DatabaseConnection,
    gate: AccessGate,
    revalidator: Revalidator,
    limits: Limits,
}

impl TredsService {
    pub fn new(db: DatabaseConnection, revalidator: Revalidator, limits: Limits) -> Self {
        Self {
            gate: AccessGate::new(db.clone()),
            db,
            revalidator,
            limits,
        }
    }

    /// Page `page` (1-based) of top-level treds, newest first.
    pub async fn _fetch_feed(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<FeedPage, TredsServiceError> {
        if page == 0 {
            return Err(TredsServiceError::InvalidPage(page));
        }
        let skip = (page - 1)
            .checked_mul(page_size)
            .ok_or(TredsServiceError::InvalidPage(page))?;

        let top_level = Tred::find().filter(TredColumn::ParentId.is_null());

        let total = top_level.clone().count(&self.db).await?;

        let posts = top_level
            .order_by_desc(TredColumn::CreatedAt)
            .order_by_desc(TredColumn::Id)
            .offset(skip)
            .limit(page_size)
            .all(&self.db)
            .await?;
        let returned = posts.len() as u64;

        let posts = populate(&self.db, posts, FEED_REPLY_DEPTH).await?;

        Ok(FeedPage {
            posts,
            is_next: total > skip + returned,
        })
    }

    /// Create a top-level tred and append it to the author's list
    pub async fn _create_tred(
        &self,
        text: String,
        author_id: UserId,
        path: &str,
    ) -> Result<TredModel, TredsServiceError> {
        check_len("tred", &text, self.limits.min_text_len, None)?;
        self.ensure_user(author_id).await?;

        let tred = self
            .insert_top_level(text, author_id)
            .await
            .map_err(|err| {
                error!(%author_id, error = %err, "failed to create tred");
                TredsServiceError::CreateFailed(err)
            })?;

        self.revalidator.revalidate(path);
        Ok(tred)
    }

    async fn insert_top_level(&self, text: String, author_id: UserId) -> Result<TredModel, DbErr> {
        let txn = self.db.begin().await?;

        let tred = TredActiveModel {
            id: Set(TredId::new()),
            text: Set(text),
            author_id: Set(author_id),
            parent_id: Set(None),
            created_at: Set(Utc::now()),
        };
        let tred = Tred::insert(tred).exec_with_returning(&txn).await?;

        let link = UserTredActiveModel {
            id: NotSet,
            user_id: Set(author_id),
            tred_id: Set(tred.id),
        };
        UserTred::insert(link).exec(&txn).await?;

        txn.commit().await?;
        Ok(tred)
    }

    pub async fn _get_tred(&self, tred_id: TredId) -> Result<TredModel, TredsServiceError> {
        Tred::find_by_id(tred_id)
            .one(&self.db)
            .await?
            .ok_or(TredsServiceError::TredNotFound)
    }

    /// A tred with `limits.thread_depth` levels of replies populated.
    pub async fn _fetch_tred(&self, tred_id: TredId) -> Result<TredNode, TredsServiceError> {
        let tred = self._get_tred(tred_id).await?;

        populate(&self.db, vec![tred], self.limits.thread_depth)
            .await?
            .pop()
            .ok_or(TredsServiceError::TredNotFound)
    }

    /// Reply to `parent_id` and append the reply to the parent's children
    pub async fn _add_comment(
        &self,
        parent_id: TredId,
        text: String,
        author_id: UserId,
        path: &str,
    ) -> Result<TredModel, TredsServiceError> {
        check_len("comment", &text, self.limits.min_text_len, None)?;
        let parent = self._get_tred(parent_id).await?;
        self.ensure_user(author_id).await?;

        let comment = self
            .insert_reply(&parent, text, author_id)
            .await
            .map_err(|err| {
                error!(%parent_id, error = %err, "failed to add comment");
                TredsServiceError::CommentFailed(err)
            })?;

        self.revalidator.revalidate(path);
        Ok(comment)
    }

    async fn insert_reply(
        &self,
        parent: &TredModel,
        text: String,
        author_id: UserId,
    ) -> Result<TredModel, DbErr> {
        let txn = self.db.begin().await?;

        let comment = TredActiveModel {
            id: Set(TredId::new()),
            text: Set(text),
            author_id: Set(author_id),
            parent_id: Set(Some(parent.id)),
            created_at: Set(Utc::now()),
        };
        let comment = Tred::insert(comment).exec_with_returning(&txn).await?;

        let link = TredChildActiveModel {
            id: NotSet,
            parent_id: Set(parent.id),
            child_id: Set(comment.id),
        };
        TredChild::insert(link).exec(&txn).await?;

        txn.commit().await?;
        Ok(comment)
    }

    /// Delete a tred together with every descendant. Returns the number of
    /// treds removed.
    ///
    /// Descendants come from `parent_id` lookups, one query per level, so a
    /// stale `children` list cannot leave replies behind. The deleted ids are
    /// left in the parent's `children` and the author's `treds`.
    pub async fn _delete_tred(&self, tred_id: TredId, path: &str) -> Result<u64, TredsServiceError> {
        let target = self._get_tred(tred_id).await?;

        let mut doomed: HashSet<TredId> = HashSet::from([target.id]);
        let mut frontier = vec![target.id];

        while !frontier.is_empty() {
            let children = Tred::find()
                .filter(TredColumn::ParentId.is_in(frontier))
                .all(&self.db)
                .await?;

            frontier = children
                .into_iter()
                .map(|child| child.id)
                .filter(|id| doomed.insert(*id))
                .collect();
        }

        let removed = Tred::delete_many()
            .filter(TredColumn::Id.is_in(doomed))
            .exec(&self.db)
            .await?
            .rows_affected;

        info!(%tred_id, removed, "deleted tred subtree");
        self.revalidator.revalidate(path);
        Ok(removed)
    }

    /// Check that `viewer` may delete `tred_id` from the page at `path`.
    pub async fn _authorize_delete(
        &self,
        viewer: &UserModel,
        tred_id: TredId,
        path: &str,
    ) -> Result<(), TredsServiceError> {
        let target = self._get_tred(tred_id).await?;
        let author = User::find_by_id(target.author_id)
            .one(&self.db)
            .await?
            .ok_or(TredsServiceError::UserNotFound)?;

        if can_delete(&viewer.external_id, &author.external_id, path) {
            Ok(())
        } else {
            Err(TredsServiceError::DeleteForbidden)
        }
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<(), TredsServiceError> {
        let exists = User::find_by_id(user_id).one(&self.db).await?.is_some();
        if exists {
            Ok(())
        } else {
            Err(TredsServiceError::UserNotFound)
        }
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserModel, TredsServiceError> {
        let identity = AuthIdentity::from_request(ctx);
        Ok(self.gate.require_onboarded(Some(&identity)).await?)
    }
}

#[zel_service(name = "treds")]
trait Treds {
    #[doc = "Page of top-level treds, newest first"]
    #[method(name = "fetch_feed")]
    async fn fetch_feed(&self, page: u64) -> Result<FeedPage, ResourceError>;

    #[doc = "Create a top-level tred as the calling user"]
    #[method(name = "create_tred")]
    async fn create_tred(&self, text: String, path: String) -> Result<TredModel, ResourceError>;

    #[doc = "Get a tred with its populated reply tree"]
    #[method(name = "fetch_tred")]
    async fn fetch_tred(&self, tred_id: TredId) -> Result<TredNode, ResourceError>;

    #[doc = "Reply to a tred as the calling user"]
    #[method(name = "add_comment")]
    async fn add_comment(
        &self,
        parent_id: TredId,
        text: String,
        path: String,
    ) -> Result<TredModel, ResourceError>;

    #[doc = "Delete a tred and all of its replies (author only)"]
    #[method(name = "delete_tred")]
    async fn delete_tred(&self, tred_id: TredId, path: String) -> Result<u64, ResourceError>;
}

#[async_trait]
impl TredsServer for TredsService {
    async fn fetch_feed(&self, _ctx: RequestContext, page: u64) -> Result<FeedPage, ResourceError> {
        Ok(self._fetch_feed(page, self.limits.feed_page_size).await?)
    }

    async fn create_tred(
        &self,
        ctx: RequestContext,
        text: String,
        path: String,
    ) -> Result<TredModel, ResourceError> {
        let user = self.caller(&ctx).await?;
        Ok(self._create_tred(text, user.id, &path).await?)
    }

    async fn fetch_tred(
        &self,
        ctx: RequestContext,
        tred_id: TredId,
    ) -> Result<TredNode, ResourceError> {
        self.caller(&ctx).await?;
        Ok(self._fetch_tred(tred_id).await?)
    }

    async fn add_comment(
        &self,
        ctx: RequestContext,
        parent_id: TredId,
        text: String,
        path: String,
    ) -> Result<TredModel, ResourceError> {
        let user = self.caller(&ctx).await?;
        Ok(self._add_comment(parent_id, text, user.id, &path).await?)
    }

    async fn delete_tred(
        &self,
        ctx: RequestContext,
        tred_id: TredId,
        path: String,
    ) -> Result<u64, ResourceError> {
        let user = self.caller(&ctx).await?;
        self._authorize_delete(&user, tred_id, &path).await?;
        Ok(self._delete_tred(tred_id, &path).await?)
    }
}
