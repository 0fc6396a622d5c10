use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{ActiveValue, prelude::*};

use crate::{EngineError, ResultEngine, users};

use super::Engine;

impl Engine {
    /// Register a user. The password is stored as an argon2 hash.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::InvalidName(
                "username must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(EngineError::InvalidName(
                "password must not be empty".to_string(),
            ));
        }
        if users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| EngineError::InvalidName(format!("cannot hash password: {err}")))?
            .to_string();

        users::ActiveModel {
            username: ActiveValue::Set(username.to_string()),
            password_hash: ActiveValue::Set(password_hash),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;
        Ok(())
    }

    /// Check `username`/`password`. Unknown users and wrong passwords give
    /// the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<()> {
        let unauthorized = || EngineError::Unauthorized("invalid credentials".to_string());

        let user = users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(unauthorized)?;
        let parsed = PasswordHash::new(&user.password_hash).map_err(|_| unauthorized())?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| unauthorized())
    }
}
