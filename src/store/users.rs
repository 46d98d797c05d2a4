use super::{Store, changed};
use crate::errors::KeyHourError;
use crate::model::{Role, User, UserId};
use eyre::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: row.try_get::<String, _>("role")?.parse()?,
        percentage: row.try_get("percentage")?,
    })
}

impl Store {
    pub async fn insert_user(
        &mut self,
        email: &str,
        password_hash: &str,
        role: Role,
        percentage: i64,
    ) -> Result<UserId> {
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, role, percentage) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(percentage)
        .execute(&mut self.conn)
        .await;
        match result {
            Ok(result) => {
                debug!(email, %role, "user created");
                Ok(UserId(result.last_insert_rowid()))
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(KeyHourError::EmailTaken(email.to_owned()).into())
            }
            Err(e) => Err(e).context("cannot insert user"),
        }
    }

    pub async fn user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        sqlx::query("SELECT id, email, password_hash, role, percentage FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut self.conn)
            .await
            .context("cannot load user")?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    /// All users, or only those with the given role, sorted by email.
    pub async fn users(&mut self, role: Option<Role>) -> Result<Vec<User>> {
        sqlx::query(
            "SELECT id, email, password_hash, role, percentage FROM users
             WHERE ?1 IS NULL OR role = ?1 ORDER BY email",
        )
        .bind(role.map(Role::as_str))
        .map(|row: SqliteRow| user_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load users")?
        .into_iter()
        .collect()
    }

    pub async fn set_percentage(&mut self, email: &str, percentage: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET percentage = ? WHERE email = ?")
            .bind(percentage)
            .bind(email)
            .execute(&mut self.conn)
            .await
            .context("cannot update percentage")?;
        Ok(changed(&result))
    }

    pub async fn set_password_hash(&mut self, email: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE email = ?")
            .bind(password_hash)
            .bind(email)
            .execute(&mut self.conn)
            .await
            .context("cannot update password")?;
        Ok(changed(&result))
    }
}
