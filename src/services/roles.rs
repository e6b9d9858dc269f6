//! Path-based role rules and the role authorizer.

use axum::http::request::Parts;
use regex::Regex;

use crate::services::directory::RoleRuleEntry;
use crate::shield::{Authorizer, AuthzError, Principal, RoleResolver, RoleSet, role_set};

struct RoleRule {
    pattern: Regex,
    roles: RoleSet,
}

/// Ordered regex rules over the request path; the first match decides.
/// Paths no rule matches are public.
pub struct RouteRoles {
    rules: Vec<RoleRule>,
}

impl RouteRoles {
    pub fn new(entries: &[RoleRuleEntry]) -> Result<Self, regex::Error> {
        let rules = entries
            .iter()
            .map(|entry| {
                Ok(RoleRule {
                    pattern: Regex::new(&entry.pattern)?,
                    roles: role_set(entry.roles.iter().cloned()),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { rules })
    }

    pub fn roles_for_path(&self, path: &str) -> RoleSet {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(path))
            .map(|rule| rule.roles.clone())
            .unwrap_or_default()
    }
}

impl RoleResolver for RouteRoles {
    fn roles_for(&self, parts: &Parts) -> RoleSet {
        self.roles_for_path(parts.uri.path())
    }
}

/// Grants access when the principal holds any of the required roles.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    denied_target: Option<String>,
}

impl RoleAuthorizer {
    pub fn new(denied_target: Option<String>) -> Self {
        Self { denied_target }
    }
}

impl Authorizer for RoleAuthorizer {
    fn authorize(&self, principal: &Principal, required: &RoleSet) -> Result<(), AuthzError> {
        if principal.has_any_role(required) {
            return Ok(());
        }

        tracing::info!(
            user = %principal.username,
            required = ?required,
            "access denied: missing role"
        );

        match &self.denied_target {
            Some(location) => Err(AuthzError::Redirect {
                location: location.clone(),
            }),
            None => Err(AuthzError::Forbidden),
        }
    }
}
