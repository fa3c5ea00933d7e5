//! User registration, login and access token issuance.

mod password;
mod store;
mod token;

pub use store::{InMemoryUserStore, StoreError, UserRecord, UserStore};
pub use token::{Claims, TokenIssuer};

use crate::config::AuthConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email já registrado")]
    EmailAlreadyRegistered,
    #[error("Credenciais inválidas")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidInput(String),
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("failed to issue token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    }
}

pub struct CredentialService {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

impl CredentialService {
    pub fn new(store: Arc<dyn UserStore>, auth_config: &AuthConfig) -> Self {
        Self {
            store,
            tokens: TokenIssuer::new(&auth_config.secret_key, auth_config.token_expiration_minutes),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn register(&self, request: RegisterRequest) -> Result<UserRecord, AuthError> {
        let name = request.name.trim();
        let email = normalize_email(&request.email);
        if name.is_empty() {
            return Err(AuthError::InvalidInput("name must not be empty".to_string()));
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::InvalidInput("email must be a valid address".to_string()));
        }
        if request.password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }
        if self.store.find_by_email(&email).is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = password::hash_password(&request.password)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash,
            created_at: Utc::now(),
        };

        self.store.insert(user.clone()).map_err(|e| match e {
            StoreError::DuplicateEmail(_) => AuthError::EmailAlreadyRegistered,
        })?;
        tracing::info!(user_id = %user.id, "Registered user");

        Ok(user)
    }

    pub fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let email = normalize_email(&request.email);
        let user = self
            .store
            .find_by_email(&email)
            .ok_or(AuthError::InvalidCredentials)?;
        if !password::verify_password(&request.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.issue(&user.email)?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CredentialService {
        let auth_config = AuthConfig {
            secret_key: "test-secret".to_string(),
            token_expiration_minutes: 60,
        };
        CredentialService::new(Arc::new(InMemoryUserStore::new()), &auth_config)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ana".to_string(),
            email: email.to_string(),
            password: "s3nha".to_string(),
        }
    }

    #[test]
    fn test_register_then_login() {
        let service = service();
        let user = service.register(register_request("Ana@Example.com ")).unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_ne!(user.password_hash, "s3nha");

        let token = service
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "s3nha".to_string(),
            })
            .unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(
            service.tokens().verify(&token.access_token).unwrap().sub,
            "ana@example.com"
        );
    }

    #[test]
    fn test_duplicate_email() {
        let service = service();
        service.register(register_request("ana@example.com")).unwrap();

        let err = service
            .register(register_request("ANA@example.com"))
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyRegistered));
        assert_eq!(err.to_string(), "Email já registrado");
    }

    #[test]
    fn test_wrong_password_and_unknown_email_look_the_same() {
        let service = service();
        service.register(register_request("ana@example.com")).unwrap();

        let wrong_password = service
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "nope".to_string(),
            })
            .unwrap_err();
        let unknown_email = service
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "s3nha".to_string(),
            })
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), "Credenciais inválidas");
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    }

    #[test]
    fn test_register_validates_input() {
        let service = service();
        let mut request = register_request("not-an-email");
        assert!(matches!(
            service.register(request.clone()),
            Err(AuthError::InvalidInput(_))
        ));

        request.email = "ana@example.com".to_string();
        request.name = "  ".to_string();
        assert!(matches!(
            service.register(request),
            Err(AuthError::InvalidInput(_))
        ));
    }
}
