//! Connection identity types.
//!
//! Every persistent connection carries an `Identity` resolved once at
//! connect time. Authentication failure is not fatal there: the gateway
//! degrades to `Anonymous` and room authorization pattern-matches on the
//! variant when a join is requested.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::UserId;

/// Role of an authenticated platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Doctor,
    Patient,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Doctor => "doctor",
            UserRole::Patient => "patient",
            UserRole::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// The actor attached to a connection.
///
/// `Anonymous` connections stay open but fail every room join; this is the
/// tagged replacement for the "null user" the platform's earlier transport
/// layer passed around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated { id: UserId, role: UserRole },
    Anonymous,
}

impl Identity {
    /// Creates an authenticated identity.
    pub fn authenticated(id: UserId, role: UserRole) -> Self {
        Identity::Authenticated { id, role }
    }

    /// Returns the user id when authenticated.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Identity::Authenticated { id, .. } => Some(id),
            Identity::Anonymous => None,
        }
    }

    /// Returns the role when authenticated.
    pub fn role(&self) -> Option<UserRole> {
        match self {
            Identity::Authenticated { role, .. } => Some(*role),
            Identity::Anonymous => None,
        }
    }

    /// Returns true when this identity refers to the given user.
    pub fn is_user(&self, user: &UserId) -> bool {
        matches!(self, Identity::Authenticated { id, .. } if id == user)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Authenticated { id, role } => write!(f, "{}({})", id, role),
            Identity::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Authenticated user as produced by the session validator.
///
/// Provider-agnostic: any token scheme can populate this through the
/// `SessionValidator` port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the auth provider.
    pub id: UserId,

    /// Platform role carried in the token claims.
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, role: UserRole) -> Self {
        Self { id, role }
    }

    /// Converts into the connection-level identity.
    pub fn into_identity(self) -> Identity {
        Identity::Authenticated {
            id: self.id,
            role: self.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_identity_exposes_id_and_role() {
        let identity = Identity::authenticated(UserId::new("user-1"), UserRole::Doctor);

        assert_eq!(identity.user_id(), Some(&UserId::new("user-1")));
        assert_eq!(identity.role(), Some(UserRole::Doctor));
    }

    #[test]
    fn anonymous_identity_has_no_id_or_role() {
        assert_eq!(Identity::Anonymous.user_id(), None);
        assert_eq!(Identity::Anonymous.role(), None);
    }

    #[test]
    fn is_user_matches_only_same_id() {
        let identity = Identity::authenticated(UserId::new("user-1"), UserRole::Patient);

        assert!(identity.is_user(&UserId::new("user-1")));
        assert!(!identity.is_user(&UserId::new("user-2")));
        assert!(!Identity::Anonymous.is_user(&UserId::new("user-1")));
    }

    #[test]
    fn authenticated_user_converts_into_identity() {
        let user = AuthenticatedUser::new(UserId::new("user-9"), UserRole::Admin);
        let identity = user.into_identity();

        assert!(identity.is_user(&UserId::new("user-9")));
        assert_eq!(identity.role(), Some(UserRole::Admin));
    }

    #[test]
    fn role_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&UserRole::Doctor).unwrap(),
            "\"doctor\""
        );
        assert_eq!(
            serde_json::to_string(&UserRole::Patient).unwrap(),
            "\"patient\""
        );
    }

    #[test]
    fn identity_display_is_stable() {
        let identity = Identity::authenticated(UserId::new("u1"), UserRole::Doctor);
        assert_eq!(format!("{}", identity), "u1(doctor)");
        assert_eq!(format!("{}", Identity::Anonymous), "anonymous");
    }
}
