//! Configurable in-memory session validator for tests and local wiring.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, UserRole};
use crate::ports::SessionValidator;

/// Maps fixed token strings to users; everything else is rejected.
#[derive(Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `user` with `role`.
    pub fn allow(&self, token: impl Into<String>, user: impl Into<String>, role: UserRole) {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                token.into(),
                AuthenticatedUser::new(UserId::new(user), role),
            );
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allowed_token_resolves() {
        let validator = MockSessionValidator::new();
        validator.allow("t-1", "doc", UserRole::Doctor);

        let user = validator.validate("t-1").await.unwrap();
        assert_eq!(user.id, UserId::new("doc"));
        assert_eq!(user.role, UserRole::Doctor);
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let validator = MockSessionValidator::new();
        assert!(matches!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }
}
