//! Actions available to each kind of user. Every function takes the
//! session of the user performing it and refuses actions outside of
//! that user's role.

use crate::auth::Session;
use crate::errors::KeyHourError;
use crate::model::{Message, MessageId, Notification, NotificationId, Project, ProjectId};
use crate::store::Store;
use chrono::NaiveDate;
use eyre::Result;
use tracing::info;

pub mod admin;
pub mod student;
pub mod supervisor;

/// Return the trimmed value of a form field, refusing blank ones.
pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, KeyHourError> {
    let value = value.trim();
    if value.is_empty() {
        Err(KeyHourError::MissingField(field))
    } else {
        Ok(value)
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, KeyHourError> {
    let value = required("date", value)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| KeyHourError::invalid("date", value))
}

/// Parse a positive number of hours.
pub fn parse_hours(field: &'static str, value: &str) -> Result<f64, KeyHourError> {
    let value = required(field, value)?;
    match value.parse::<f64>() {
        Ok(hours) if hours.is_finite() && hours > 0.0 => Ok(hours),
        _ => Err(KeyHourError::invalid(field, value)),
    }
}

async fn existing_project(store: &mut Store, id: ProjectId) -> Result<Project> {
    store
        .project(id)
        .await?
        .ok_or_else(|| KeyHourError::not_found("project", id).into())
}

/// A project and the number of seats already taken in it.
pub async fn project_seats(store: &mut Store, id: ProjectId) -> Result<(Project, i64)> {
    let project = existing_project(store, id).await?;
    let taken = store.accepted_count(project.id).await?;
    Ok((project, taken))
}

/// Notifications of the session user, newest first.
pub async fn notifications(
    store: &mut Store,
    session: &Session,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    store.notifications_for(session.email(), unread_only).await
}

pub async fn mark_read(store: &mut Store, session: &Session, id: NotificationId) -> Result<()> {
    match store.notification(id).await? {
        Some(notification) if notification.recipient == session.email() => {
            store.mark_notification_read(id).await?;
            Ok(())
        }
        _ => Err(KeyHourError::not_found("notification", id).into()),
    }
}

/// Send a message to another user, outside of any project.
pub async fn send_direct_message(
    store: &mut Store,
    session: &Session,
    receiver: &str,
    text: &str,
) -> Result<MessageId> {
    let receiver = required("receiver", receiver)?;
    let text = required("message", text)?;
    if store.user_by_email(receiver).await?.is_none() {
        return Err(KeyHourError::not_found("user", receiver).into());
    }
    let id = store
        .insert_message(None, session.email(), Some(receiver), text)
        .await?;
    info!(sender = session.email(), receiver, "direct message sent");
    Ok(id)
}

/// Direct messages between the session user and someone else.
pub async fn conversation(
    store: &mut Store,
    session: &Session,
    other: &str,
) -> Result<Vec<Message>> {
    store.conversation(session.email(), other.trim()).await
}
