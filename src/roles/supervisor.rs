use super::{existing_project, required};
use crate::auth::Session;
use crate::errors::KeyHourError;
use crate::model::{
    Application, ApplicationId, ApplicationStatus, HourId, HourStatus, LoggedHour, Message,
    MessageId, Project, ProjectId, Role,
};
use crate::store::{AcceptOutcome, Store};
use eyre::Result;
use tracing::{debug, info, warn};

/// Load a project the session user is allowed to manage: its
/// supervisor, or any administrator.
async fn managed_project(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
) -> Result<Project> {
    session.require_any(&[Role::Supervisor, Role::Admin])?;
    let project = existing_project(store, project).await?;
    if session.is_admin() || project.supervisor == session.email() {
        Ok(project)
    } else {
        warn!(
            user = session.email(),
            project = %project,
            "not the supervisor of this project"
        );
        let reason = format!("{} does not supervise {}", session.email(), project.name);
        Err(KeyHourError::Forbidden(reason).into())
    }
}

async fn managed_application(
    store: &mut Store,
    session: &Session,
    id: ApplicationId,
) -> Result<(Application, Project)> {
    let application = store
        .application(id)
        .await?
        .ok_or_else(|| KeyHourError::not_found("application", id))?;
    let project = managed_project(store, session, application.project).await?;
    Ok((application, project))
}

pub async fn my_projects(store: &mut Store, session: &Session) -> Result<Vec<Project>> {
    session.require(Role::Supervisor)?;
    store.projects_supervised_by(session.email()).await
}

pub async fn project_applications(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
) -> Result<Vec<Application>> {
    let project = managed_project(store, session, project).await?;
    store.applications_for_project(project.id).await
}

/// Accept an application if the project still has a free seat, and
/// let the student know.
pub async fn accept_application(
    store: &mut Store,
    session: &Session,
    id: ApplicationId,
) -> Result<()> {
    let (application, project) = managed_application(store, session, id).await?;
    match store.accept_within_quota(id).await? {
        AcceptOutcome::Accepted => {
            let text = format!("You have been accepted in project {}", project.name);
            store
                .insert_notification(&application.student, &text, None)
                .await?;
            info!(
                application = %id,
                student = %application.student,
                project = %project,
                "application accepted"
            );
            Ok(())
        }
        AcceptOutcome::AlreadyAccepted => Ok(()),
        AcceptOutcome::Full => Err(KeyHourError::NoSeatsAvailable(project.name).into()),
    }
}

/// Reject an application. A reason is mandatory and is passed on to
/// the student.
pub async fn reject_application(
    store: &mut Store,
    session: &Session,
    id: ApplicationId,
    reason: &str,
) -> Result<()> {
    let reason = required("reason", reason)?;
    let (application, project) = managed_application(store, session, id).await?;
    if application.status == ApplicationStatus::Rejected {
        debug!(application = %id, "application already rejected");
        return Ok(());
    }
    store.reject_application(id, reason).await?;
    let text = format!(
        "Your application to project {} has been rejected: {reason}",
        project.name
    );
    store
        .insert_notification(&application.student, &text, None)
        .await?;
    info!(
        application = %id,
        student = %application.student,
        project = %project,
        "application rejected"
    );
    Ok(())
}

/// Hours logged on the projects the session user manages.
pub async fn hours_for_review(
    store: &mut Store,
    session: &Session,
) -> Result<Vec<(LoggedHour, String)>> {
    session.require_any(&[Role::Supervisor, Role::Admin])?;
    let supervisor = if session.is_admin() {
        None
    } else {
        Some(session.email())
    };
    store.hours_for_review(supervisor).await
}

async fn review_hours(
    store: &mut Store,
    session: &Session,
    id: HourId,
    status: HourStatus,
) -> Result<()> {
    let record = store
        .hour(id)
        .await?
        .ok_or_else(|| KeyHourError::not_found("hours record", id))?;
    // Carried over hours belong to no project and are never reviewed.
    let project = record
        .project
        .ok_or_else(|| KeyHourError::Forbidden(format!("record {id} is a carry-over")))?;
    let project = managed_project(store, session, project).await?;
    if record.status == status {
        debug!(record = %id, %status, "hours already reviewed");
        return Ok(());
    }
    store.set_hour_status(id, status).await?;
    let verb = match status {
        HourStatus::Approved => "approved",
        HourStatus::Rejected => "rejected",
        HourStatus::Pending => "reset to pending",
    };
    let text = format!(
        "{:.1} hours on project {} ({}) {verb}",
        record.quantity, project.name, record.date
    );
    store
        .insert_notification(&record.student, &text, None)
        .await?;
    info!(record = %id, student = %record.student, %status, "hours reviewed");
    Ok(())
}

pub async fn approve_hours(store: &mut Store, session: &Session, id: HourId) -> Result<()> {
    review_hours(store, session, id, HourStatus::Approved).await
}

pub async fn reject_hours(store: &mut Store, session: &Session, id: HourId) -> Result<()> {
    review_hours(store, session, id, HourStatus::Rejected).await
}

/// Post on a managed project. Project posts from supervisors have no
/// single receiver.
pub async fn send_project_message(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
    text: &str,
) -> Result<MessageId> {
    let text = required("message", text)?;
    let project = managed_project(store, session, project).await?;
    store
        .insert_message(Some(project.id), session.email(), None, text)
        .await
}

pub async fn project_messages(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
) -> Result<Vec<Message>> {
    let project = managed_project(store, session, project).await?;
    store.project_messages(project.id).await
}
