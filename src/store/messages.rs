use super::{Store, now};
use crate::model::{Message, MessageId, ProjectId};
use eyre::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::trace;

fn message_from_row(row: &SqliteRow) -> Result<Message> {
    Ok(Message {
        id: MessageId(row.try_get("id")?),
        project: row.try_get::<Option<i64>, _>("project_id")?.map(ProjectId),
        sender: row.try_get("sender")?,
        receiver: row.try_get("receiver")?,
        text: row.try_get("body")?,
        sent_at: row.try_get("sent_at")?,
    })
}

impl Store {
    pub async fn insert_message(
        &mut self,
        project: Option<ProjectId>,
        sender: &str,
        receiver: Option<&str>,
        text: &str,
    ) -> Result<MessageId> {
        let result = sqlx::query(
            "INSERT INTO messages (project_id, sender, receiver, body, sent_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(project.map(|p| p.0))
        .bind(sender)
        .bind(receiver)
        .bind(text)
        .bind(now())
        .execute(&mut self.conn)
        .await
        .context("cannot insert message")?;
        trace!(sender, ?receiver, ?project, "message stored");
        Ok(MessageId(result.last_insert_rowid()))
    }

    /// Messages posted on a project, oldest first.
    pub async fn project_messages(&mut self, project: ProjectId) -> Result<Vec<Message>> {
        sqlx::query(
            "SELECT id, project_id, sender, receiver, body, sent_at FROM messages
             WHERE project_id = ? ORDER BY id",
        )
        .bind(project.0)
        .map(|row: SqliteRow| message_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load project messages")?
        .into_iter()
        .collect()
    }

    /// Direct messages exchanged between two users, oldest first.
    pub async fn conversation(&mut self, first: &str, second: &str) -> Result<Vec<Message>> {
        sqlx::query(
            "SELECT id, project_id, sender, receiver, body, sent_at FROM messages
             WHERE project_id IS NULL
               AND ((sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1))
             ORDER BY id",
        )
        .bind(first)
        .bind(second)
        .map(|row: SqliteRow| message_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load conversation")?
        .into_iter()
        .collect()
    }
}
