use super::{Store, changed, now};
use crate::model::{Notification, NotificationId};
use eyre::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    Ok(Notification {
        id: NotificationId(row.try_get("id")?),
        recipient: row.try_get("recipient")?,
        text: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
        read: row.try_get::<i64, _>("read")? != 0,
        compliance_year: row.try_get("compliance_year")?,
    })
}

impl Store {
    pub async fn insert_notification(
        &mut self,
        recipient: &str,
        text: &str,
        compliance_year: Option<i32>,
    ) -> Result<NotificationId> {
        let result = sqlx::query(
            "INSERT INTO notifications (recipient, body, created_at, read, compliance_year)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(recipient)
        .bind(text)
        .bind(now())
        .bind(compliance_year)
        .execute(&mut self.conn)
        .await
        .context("cannot insert notification")?;
        debug!(recipient, text, "notification created");
        Ok(NotificationId(result.last_insert_rowid()))
    }

    pub async fn notification(&mut self, id: NotificationId) -> Result<Option<Notification>> {
        sqlx::query(
            "SELECT id, recipient, body, created_at, read, compliance_year FROM notifications
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&mut self.conn)
        .await
        .context("cannot load notification")?
        .map(|row| notification_from_row(&row))
        .transpose()
    }

    /// Notifications of a user, newest first.
    pub async fn notifications_for(
        &mut self,
        recipient: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        sqlx::query(
            "SELECT id, recipient, body, created_at, read, compliance_year FROM notifications
             WHERE recipient = ? AND (read = 0 OR NOT ?)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(recipient)
        .bind(unread_only)
        .map(|row: SqliteRow| notification_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load notifications")?
        .into_iter()
        .collect()
    }

    pub async fn mark_notification_read(&mut self, id: NotificationId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
            .bind(id.0)
            .execute(&mut self.conn)
            .await
            .context("cannot mark notification as read")?;
        Ok(changed(&result))
    }

    pub async fn has_unread_compliance_notice(
        &mut self,
        recipient: &str,
        year: i32,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications
             WHERE recipient = ? AND compliance_year = ? AND read = 0",
        )
        .bind(recipient)
        .bind(year)
        .fetch_one(&mut self.conn)
        .await
        .context("cannot look for compliance notices")?;
        Ok(count > 0)
    }
}
