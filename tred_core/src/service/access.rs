use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use zel_core::prelude::*;

use crate::entity::prelude::*;

pub const HOME_PATH: &str = "/";
pub const ONBOARDING_PATH: &str = "/onboarding";

/// Identity vouched for by the identity provider. Over RPC this is the
/// remote peer key of the connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub external_id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

impl AuthIdentity {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: None,
            image_url: None,
        }
    }

    pub fn from_request(ctx: &RequestContext) -> Self {
        Self::new(ctx.connection().remote_id().to_string())
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("sign in required")]
    Unauthenticated,

    #[error("onboarding required")]
    NotOnboarded,
}

/// Where a caller stands in the sign in / onboarding sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    NeedsOnboarding(AuthIdentity),
    Ready(UserModel),
}

impl Access {
    /// Page the caller has to be sent to before anything else renders.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Access::NeedsOnboarding(_) => Some(ONBOARDING_PATH),
            Access::Anonymous | Access::Ready(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    db: DatabaseConnection,
}

impl AccessGate {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn resolve(&self, identity: Option<&AuthIdentity>) -> Result<Access, DbErr> {
        let Some(identity) = identity else {
            return Ok(Access::Anonymous);
        };

        let user = User::find()
            .filter(UserColumn::ExternalId.eq(identity.external_id.as_str()))
            .one(&self.db)
            .await?;

        Ok(match user {
            Some(user) if user.onboarded => Access::Ready(user),
            _ => Access::NeedsOnboarding(identity.clone()),
        })
    }

    /// The local profile of an onboarded caller, or why there is none.
    pub async fn require_onboarded(
        &self,
        identity: Option<&AuthIdentity>,
    ) -> Result<UserModel, AccessError> {
        match self.resolve(identity).await? {
            Access::Ready(user) => Ok(user),
            Access::Anonymous => {
                warn!("rejected anonymous caller");
                Err(AccessError::Unauthenticated)
            }
            Access::NeedsOnboarding(identity) => {
                warn!(external_id = %identity.external_id, "rejected caller without onboarding");
                Err(AccessError::NotOnboarded)
            }
        }
    }
}

/// Delete is offered only to the author, and never on the home feed.
pub fn can_delete(viewer_external_id: &str, author_external_id: &str, current_path: &str) -> bool {
    viewer_external_id == author_external_id && current_path != HOME_PATH
}
