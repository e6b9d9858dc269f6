use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role names required by a path or held by a principal.
///
/// An empty set on the "required" side means the path is public.
pub type RoleSet = BTreeSet<String>;

/// An authenticated identity as stored in the session under `user`.
///
/// The gate only checks presence and hands it to the collaborators; what the
/// fields mean is up to the `Authenticator` that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub roles: RoleSet,
}

impl Principal {
    pub fn new<I, S>(id: Uuid, username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// True when at least one of `required` is held.
    pub fn has_any_role(&self, required: &RoleSet) -> bool {
        !self.roles.is_disjoint(required)
    }
}

/// Build a `RoleSet` from anything string-like.
pub fn role_set<I, S>(roles: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    roles.into_iter().map(Into::into).collect()
}
