use crate::errors::KeyHourError;
use crate::model::{Role, User};
use crate::store::Store;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use eyre::{Result, eyre};
use tracing::{info, warn};

/// Hash a password with Argon2id and a fresh random salt. The result is
/// a PHC string which embeds the salt and parameters.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| eyre!("cannot hash password: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// The authenticated user on whose behalf actions run.
#[derive(Clone, Debug)]
pub struct Session {
    user: User,
}

impl Session {
    pub(crate) fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.is(Role::Admin)
    }

    pub fn require(&self, role: Role) -> Result<(), KeyHourError> {
        self.require_any(&[role])
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), KeyHourError> {
        if roles.contains(&self.user.role) {
            Ok(())
        } else {
            Err(KeyHourError::Forbidden(format!(
                "{} is a {}",
                self.user.email, self.user.role
            )))
        }
    }
}

pub async fn login(store: &mut Store, email: &str, password: &str) -> Result<Session> {
    let email = email.trim();
    if email.is_empty() {
        return Err(KeyHourError::MissingField("email").into());
    }
    if password.is_empty() {
        return Err(KeyHourError::MissingField("password").into());
    }
    match store.user_by_email(email).await? {
        Some(user) if verify_password(password, &user.password_hash) => {
            info!(email, role = %user.role, "logged in");
            Ok(Session::new(user))
        }
        _ => {
            warn!(email, "rejected login");
            Err(KeyHourError::InvalidCredentials.into())
        }
    }
}
