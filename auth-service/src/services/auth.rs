use std::sync::Arc;

use crate::{
    config::PasswordHashConfig,
    dtos::auth::{AuthResponse, LoginRequest, RegisterRequest},
    models::{NewUser, RefreshSession, User, DEFAULT_ROLE},
    services::{
        CredentialStore, EmailProvider, JwtService, ServiceError, SessionStore, TokenClaims,
    },
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

/// Register, activate, login, logout and refresh flows.
///
/// Every user holds at most one refresh session: issuing tokens overwrites
/// the previous session, so a refresh token stops working as soon as a newer
/// one is issued for the same user.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    password_hash: PasswordHashConfig,
    api_url: String,
    /// Verified against on unknown emails so both login failures cost one
    /// Argon2 run.
    decoy_hash: Option<Arc<PasswordHashString>>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        password_hash: PasswordHashConfig,
        api_url: String,
    ) -> Self {
        let decoy = Password::new(uuid::Uuid::new_v4().to_string());
        let decoy_hash = match hash_password(&decoy, &password_hash) {
            Ok(hash) => Some(Arc::new(hash)),
            Err(e) => {
                tracing::warn!(error = %e, "Could not prepare decoy password hash");
                None
            }
        };

        Self {
            users,
            sessions,
            email,
            jwt,
            password_hash,
            api_url,
            decoy_hash,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        if self.users.find_user_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::UserAlreadyExists);
        }

        let role = self
            .users
            .find_role_by_name(DEFAULT_ROLE)
            .await?
            .ok_or_else(|| {
                tracing::error!(role = DEFAULT_ROLE, "Default role is missing from the store");
                ServiceError::DefaultRoleMissing(DEFAULT_ROLE.to_string())
            })?;

        let password = Password::new(req.password);
        let cost = self.password_hash.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &cost))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::Error::new(e)))??;

        let user = self
            .users
            .create_user_with_role(NewUser::new(req.email, password_hash.into_string()), &role)
            .await?;

        tracing::info!(user_id = user.id, "User registered");

        self.send_activation_mail(user.email.clone(), self.activation_url(&user.activation_link));

        self.issue_tokens(&user).await
    }

    pub async fn activate(&self, link: &str) -> Result<(), ServiceError> {
        let user = self
            .users
            .find_user_by_activation_link(link)
            .await?
            .ok_or(ServiceError::InvalidActivationLink)?;

        self.users.activate_user(user.id).await?;

        tracing::info!(user_id = user.id, "User activated");
        Ok(())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let password = Password::new(req.password);

        let Some(user) = self.users.find_user_by_email(&req.email).await? else {
            if let Some(decoy) = self.decoy_hash.clone() {
                let _ = self.check_password(password, decoy).await;
            }
            return Err(ServiceError::InvalidCredentials);
        };

        let stored = Arc::new(PasswordHashString::new(user.password.clone()));
        if !self.check_password(password, stored).await? {
            tracing::info!(user_id = user.id, "Login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, "User logged in");
        self.issue_tokens(&user).await
    }

    /// Delete the session holding `refresh_token` and return it.
    pub async fn logout(&self, refresh_token: &str) -> Result<RefreshSession, ServiceError> {
        let session = self.sessions.remove_token(refresh_token).await?;
        tracing::info!(user_id = session.user_id, "User logged out");
        Ok(session)
    }

    /// Exchange a refresh token for a new pair, revoking the presented one.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<AuthResponse, ServiceError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::Unauthorized)?;

        let claims = self.jwt.validate_refresh_token(token);
        let session = self.sessions.find_token(token).await?;

        // A valid signature alone is not enough: the token must also be the
        // one currently stored for its user.
        let claims = match (claims, session) {
            (Some(claims), Some(session)) if session.user_id == claims.user.id => claims,
            (claims, session) => {
                tracing::warn!(
                    signature_valid = claims.is_some(),
                    session_found = session.is_some(),
                    "Refresh rejected"
                );
                return Err(ServiceError::Unauthorized);
            }
        };

        // The token can be weeks old; profile and roles come from the store.
        let user = self
            .users
            .find_user_by_id(claims.user.id)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        let profile = user.profile();
        let tokens = self.jwt.generate_tokens(&profile)?;

        // Compare-and-swap: a token that was rotated or revoked since the
        // lookup above is not honoured, so each refresh token works once.
        if self
            .sessions
            .rotate_token(user.id, token, &tokens.refresh_token)
            .await?
            .is_none()
        {
            tracing::warn!(user_id = user.id, "Refresh lost a race with another rotation");
            return Err(ServiceError::Unauthorized);
        }

        tracing::info!(user_id = user.id, "Token refreshed for user");
        Ok(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: profile,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Option<TokenClaims> {
        self.jwt.validate_access_token(token)
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        self.users.health_check().await
    }

    async fn issue_tokens(&self, user: &User) -> Result<AuthResponse, ServiceError> {
        let profile = user.profile();
        let tokens = self.jwt.generate_tokens(&profile)?;

        self.sessions
            .save_token(user.id, &tokens.refresh_token)
            .await?;

        Ok(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: profile,
        })
    }

    async fn check_password(
        &self,
        password: Password,
        stored: Arc<PasswordHashString>,
    ) -> Result<bool, ServiceError> {
        tokio::task::spawn_blocking(move || verify_password(&password, &stored).is_ok())
            .await
            .map_err(|e| ServiceError::Internal(anyhow::Error::new(e)))
    }

    fn activation_url(&self, activation_link: &str) -> String {
        format!(
            "{}/api/auth/activate/{}",
            self.api_url.trim_end_matches('/'),
            activation_link
        )
    }

    /// Fire and forget: delivery problems are logged, never returned.
    fn send_activation_mail(&self, to: String, link: String) {
        let email = Arc::clone(&self.email);
        tokio::spawn(async move {
            if let Err(e) = email.send_activation_email(&to, &link).await {
                tracing::error!(error = %e, to = %to, "Failed to send activation email");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::{InMemoryStore, MockEmailService};

    fn service() -> (AuthService, Arc<InMemoryStore>, Arc<MockEmailService>) {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(MockEmailService::new());
        let jwt = JwtService::new(&JwtConfig {
            secret: "unit-test-secret-unit-test-secret".to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 30,
        });
        let service = AuthService::new(
            store.clone(),
            store.clone(),
            email.clone(),
            jwt,
            PasswordHashConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            "http://api.local/".to_string(),
        );
        (service, store, email)
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_returns_profile_and_session() {
        let (service, store, _) = service();

        let res = service.register(register_req("a@example.com")).await.unwrap();

        assert_eq!(res.user.email, "a@example.com");
        assert!(!res.user.is_activated);
        assert_eq!(res.user.roles, vec!["USER".to_string()]);
        let session = store.session_for_user(res.user.id).unwrap();
        assert!(session.matches(&res.refresh_token));
    }

    #[tokio::test]
    async fn test_register_stores_hashed_password() {
        let (service, store, _) = service();
        service.register(register_req("a@example.com")).await.unwrap();

        let user = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_ne!(user.password, "secret1");
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_activation_url_format() {
        let (service, _, _) = service();
        assert_eq!(
            service.activation_url("abc"),
            "http://api.local/api/auth/activate/abc"
        );
    }

    #[tokio::test]
    async fn test_register_without_seeded_role_fails() {
        let store = Arc::new(InMemoryStore::empty());
        let (template, _, email) = service();
        let service = AuthService {
            users: store.clone(),
            sessions: store.clone(),
            email,
            ..template
        };

        let err = service.register(register_req("a@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::DefaultRoleMissing(_)));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_rejects_empty_token() {
        let (service, _, _) = service();

        assert!(matches!(
            service.refresh(None).await,
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            service.refresh(Some("")).await,
            Err(ServiceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_access_token_carries_profile() {
        let (service, _, _) = service();
        let res = service.register(register_req("a@example.com")).await.unwrap();

        let claims = service.validate_access_token(&res.access_token).unwrap();
        assert_eq!(claims.user, res.user);
    }
}
