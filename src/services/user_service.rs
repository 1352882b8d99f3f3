use std::sync::Arc;
use uuid::Uuid;

use crate::database::repository::StudyRepository;
use crate::error::{Error, Result};
use crate::models::user::{NewUser, User};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::issue_token;

pub const DEFAULT_ROLE: &str = "student";

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub expires_in_seconds: i64,
    pub user: User,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn StudyRepository>,
    jwt_secret: String,
    token_ttl_minutes: i64,
}

impl UserService {
    pub fn new(store: Arc<dyn StudyRepository>, jwt_secret: String, token_ttl_minutes: i64) -> Self {
        Self {
            store,
            jwt_secret,
            token_ttl_minutes,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<User> {
        let role = role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE)
            .to_lowercase();

        let user = self
            .store
            .create_user(NewUser {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password_hash: hash_password(password)?,
                role,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let invalid = || Error::Unauthorized("Invalid username or password".to_string());

        let user = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            tracing::warn!(username = %user.username, "failed login attempt");
            return Err(invalid());
        }

        self.store.record_login(user.id).await?;
        let access_token = issue_token(&self.jwt_secret, user.id, &user.role, self.token_ttl_minutes)?;

        Ok(Session {
            access_token,
            expires_in_seconds: self.token_ttl_minutes * 60,
            user,
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.store.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::utils::token::verify_token;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()), "s3cret".into(), 60)
    }

    #[tokio::test]
    async fn register_then_login_issues_token() {
        let svc = service();
        let user = svc
            .register("mia", "mia@example.com", "secret123", None)
            .await
            .unwrap();
        assert_eq!(user.role, "student");
        assert_ne!(user.password_hash, "secret123");

        let session = svc.login("mia", "secret123").await.unwrap();
        let claims = verify_token("s3cret", &session.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(session.expires_in_seconds, 3600);
        assert!(svc.get_user(user.id).await.unwrap().last_login.is_some());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_unauthorized() {
        let svc = service();
        svc.register("mia", "mia@example.com", "secret123", Some("Teacher"))
            .await
            .unwrap();

        assert!(matches!(svc.login("mia", "nope").await, Err(Error::Unauthorized(_))));
        assert!(matches!(svc.login("leo", "secret123").await, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_validation_error() {
        let svc = service();
        svc.register("mia", "mia@example.com", "secret123", None)
            .await
            .unwrap();
        let err = svc
            .register("mia", "other@example.com", "secret456", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
