use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    entity::prelude::*,
    ids::{TredId, UserId},
};

/// Public fields of a tred author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: UserId,
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&UserModel> for AuthorView {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// An entry of a tred's `children` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Populated(Box<TredNode>),
    /// Below the population depth; only the id is known.
    Reference(TredId),
}

impl Reply {
    pub fn id(&self) -> TredId {
        match self {
            Reply::Populated(node) => node.id,
            Reply::Reference(id) => *id,
        }
    }

    pub fn as_node(&self) -> Option<&TredNode> {
        match self {
            Reply::Populated(node) => Some(node),
            Reply::Reference(_) => None,
        }
    }
}

/// A tred with its author and (part of) its reply tree filled in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TredNode {
    pub id: TredId,
    pub text: String,
    pub author: AuthorView,
    pub parent_id: Option<TredId>,
    pub created_at: DateTime<Utc>,
    pub children: Vec<Reply>,
}

impl TredNode {
    pub fn reply_count(&self) -> usize {
        self.children.len()
    }
}

/// One page of the home feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<TredNode>,
    pub is_next: bool,
}

/// Fills in authors and `depth` levels of children below each root.
///
/// Runs one query per level for links, one per level for treds, and one for
/// all authors. Links whose tred no longer exists are dropped from populated
/// levels; on the last level every link is returned as a [`Reply::Reference`].
/// Root order is preserved.
pub(crate) async fn populate<C>(
    db: &C,
    roots: Vec<TredModel>,
    depth: usize,
) -> Result<Vec<TredNode>, DbErr>
where
    C: ConnectionTrait,
{
    let mut levels: Vec<Vec<TredModel>> = vec![roots];
    let mut links: HashMap<TredId, Vec<TredId>> = HashMap::new();

    for level in 0..=depth {
        let ids: Vec<TredId> = levels[level].iter().map(|tred| tred.id).collect();
        if ids.is_empty() {
            break;
        }

        let rows = TredChild::find()
            .filter(TredChildColumn::ParentId.is_in(ids))
            .order_by_asc(TredChildColumn::Id)
            .all(db)
            .await?;

        let mut child_ids = Vec::with_capacity(rows.len());
        for row in rows {
            links.entry(row.parent_id).or_default().push(row.child_id);
            child_ids.push(row.child_id);
        }

        if level == depth || child_ids.is_empty() {
            break;
        }

        let children = Tred::find()
            .filter(TredColumn::Id.is_in(child_ids))
            .all(db)
            .await?;
        levels.push(children);
    }

    let author_ids: Vec<UserId> = levels.iter().flatten().map(|t| t.author_id).collect();
    let authors: HashMap<UserId, AuthorView> = User::find()
        .filter(UserColumn::Id.is_in(author_ids))
        .all(db)
        .await?
        .iter()
        .map(|user| (user.id, AuthorView::from(user)))
        .collect();

    let mut below: HashMap<TredId, TredNode> = HashMap::new();
    let mut populated = Vec::new();

    for (level, treds) in levels.into_iter().enumerate().rev() {
        let mut nodes = Vec::with_capacity(treds.len());

        for tred in treds {
            let child_ids = links.remove(&tred.id).unwrap_or_default();
            let children = if level < depth {
                child_ids
                    .into_iter()
                    .filter_map(|id| below.remove(&id))
                    .map(|node| Reply::Populated(Box::new(node)))
                    .collect()
            } else {
                child_ids.into_iter().map(Reply::Reference).collect()
            };

            let author = authors.get(&tred.author_id).cloned().ok_or_else(|| {
                DbErr::RecordNotFound(format!("author {} of tred {}", tred.author_id, tred.id))
            })?;

            nodes.push(TredNode {
                id: tred.id,
                text: tred.text,
                author,
                parent_id: tred.parent_id,
                created_at: tred.created_at,
                children,
            });
        }

        if level == 0 {
            populated = nodes;
        } else {
            below = nodes.into_iter().map(|node| (node.id, node)).collect();
        }
    }

    Ok(populated)
}
