use super::{existing_project, parse_date, parse_hours, required};
use crate::auth::Session;
use crate::errors::KeyHourError;
use crate::model::{
    Application, ApplicationId, ApplicationStatus, HourId, HourStatus, LoggedHour, Message,
    MessageId, NewHours, Project, ProjectFilter, ProjectId, ProjectStatus, Role,
};
use crate::stats::{self, HoursSummary};
use crate::store::Store;
use eyre::Result;
use tracing::info;

/// Projects a student may apply to.
pub async fn list_open_projects(store: &mut Store, session: &Session) -> Result<Vec<Project>> {
    session.require(Role::Student)?;
    store
        .projects(ProjectFilter::Only(ProjectStatus::Active))
        .await
}

/// A project and the state of the student's application to it.
pub async fn project_detail(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
) -> Result<(Project, Option<ApplicationStatus>)> {
    session.require(Role::Student)?;
    let project = existing_project(store, project).await?;
    let status = store
        .application_for(project.id, session.email())
        .await?
        .map(|a| a.status);
    Ok((project, status))
}

pub async fn apply(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
) -> Result<ApplicationId> {
    session.require(Role::Student)?;
    let project = existing_project(store, project).await?;
    if !project.is_active() {
        return Err(KeyHourError::ProjectNotOpen(project.name).into());
    }
    let id = store.insert_application(project.id, session.email()).await?;
    info!(student = session.email(), project = %project, "applied to project");
    Ok(id)
}

/// Applications of the student with their project name. Rejected ones
/// carry the supervisor's reason.
pub async fn my_applications(
    store: &mut Store,
    session: &Session,
) -> Result<Vec<(Application, String)>> {
    session.require(Role::Student)?;
    store.applications_of_student(session.email()).await
}

pub async fn accepted_projects(store: &mut Store, session: &Session) -> Result<Vec<Project>> {
    session.require(Role::Student)?;
    store.accepted_projects(session.email()).await
}

/// Check that the student is a member of the project and return it.
async fn membership(store: &mut Store, session: &Session, project: ProjectId) -> Result<Project> {
    let project = existing_project(store, project).await?;
    if store.is_accepted(project.id, session.email()).await? {
        Ok(project)
    } else {
        Err(KeyHourError::NotAccepted(project.name).into())
    }
}

/// Log hours spent on a project, pending supervisor approval. The
/// fields come straight from the form and are validated here.
pub async fn log_hours(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
    date: &str,
    description: &str,
    quantity: &str,
) -> Result<HourId> {
    session.require(Role::Student)?;
    let date = parse_date(date)?;
    let description = required("description", description)?;
    let quantity = parse_hours("hours", quantity)?;
    let project = membership(store, session, project).await?;
    let id = store
        .insert_hours(&NewHours {
            student: session.email().to_owned(),
            project: Some(project.id),
            date,
            description: description.to_owned(),
            quantity,
            status: HourStatus::Pending,
            carried_from: None,
        })
        .await?;
    info!(student = session.email(), project = %project, quantity, "hours logged");
    Ok(id)
}

pub async fn my_hours(
    store: &mut Store,
    session: &Session,
) -> Result<Vec<(LoggedHour, Option<String>)>> {
    session.require(Role::Student)?;
    store.hours_of_student(session.email()).await
}

/// Post on a project chat. The message is addressed to the supervisor.
pub async fn send_project_message(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
    text: &str,
) -> Result<MessageId> {
    session.require(Role::Student)?;
    let text = required("message", text)?;
    let project = membership(store, session, project).await?;
    let supervisor = Some(project.supervisor.as_str());
    store
        .insert_message(Some(project.id), session.email(), supervisor, text)
        .await
}

pub async fn project_messages(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
) -> Result<Vec<Message>> {
    session.require(Role::Student)?;
    let project = membership(store, session, project).await?;
    store.project_messages(project.id).await
}

pub async fn my_summary(store: &mut Store, session: &Session, year: i32) -> Result<HoursSummary> {
    session.require(Role::Student)?;
    stats::summary_for(store, session.user(), year).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::refusal;
    use crate::store::testing;

    #[tokio::test]
    async fn test_apply_once_to_active_projects() {
        let mut store = testing::store().await;
        let ana = testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        let boss = testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        let library = testing::project(&mut store, "Library", "boss@key.edu", 3).await;
        store
            .set_project_status(library, ProjectStatus::Finished)
            .await
            .unwrap();

        let open = list_open_projects(&mut store, &ana).await.unwrap();
        let open = open.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(open, vec![garden]);

        apply(&mut store, &ana, garden).await.unwrap();
        let err = apply(&mut store, &ana, garden).await.unwrap_err();
        assert_eq!(refusal(&err), Some(&KeyHourError::AlreadyApplied));
        let err = apply(&mut store, &ana, library).await.unwrap_err();
        assert_eq!(
            refusal(&err),
            Some(&KeyHourError::ProjectNotOpen("Library".to_owned()))
        );
        let err = apply(&mut store, &ana, ProjectId(99)).await.unwrap_err();
        assert!(matches!(refusal(&err), Some(KeyHourError::NotFound { .. })));
        let err = apply(&mut store, &boss, garden).await.unwrap_err();
        assert!(matches!(refusal(&err), Some(KeyHourError::Forbidden(_))));

        let (project, status) = project_detail(&mut store, &ana, garden).await.unwrap();
        assert_eq!(project.name, "Garden");
        assert_eq!(status, Some(ApplicationStatus::Pending));
        let mine = my_applications(&mut store, &ana).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].0.rejection_reason, None);

        let application = mine[0].0.id;
        store
            .reject_application(application, "no gardening experience")
            .await
            .unwrap();
        let (rejected, name) = my_applications(&mut store, &ana).await.unwrap().remove(0);
        assert_eq!(name, "Garden");
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("no gardening experience")
        );
    }

    #[tokio::test]
    async fn test_log_hours_requires_acceptance() {
        let mut store = testing::store().await;
        let ana = testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        let application = apply(&mut store, &ana, garden).await.unwrap();

        let err = log_hours(&mut store, &ana, garden, "2025-05-04", "weeding", "3")
            .await
            .unwrap_err();
        assert_eq!(
            refusal(&err),
            Some(&KeyHourError::NotAccepted("Garden".to_owned()))
        );

        store.accept_within_quota(application).await.unwrap();
        assert_eq!(accepted_projects(&mut store, &ana).await.unwrap().len(), 1);
        let err = log_hours(&mut store, &ana, garden, "2025-05-04", "", "3")
            .await
            .unwrap_err();
        let missing = KeyHourError::MissingField("description");
        assert_eq!(refusal(&err), Some(&missing));
        let err = log_hours(&mut store, &ana, garden, "2025-05-04", "weeding", "-2")
            .await
            .unwrap_err();
        assert_eq!(refusal(&err), Some(&KeyHourError::invalid("hours", "-2")));
        let err = log_hours(&mut store, &ana, garden, "04/05/2025", "weeding", "3")
            .await
            .unwrap_err();
        let invalid = KeyHourError::invalid("date", "04/05/2025");
        assert_eq!(refusal(&err), Some(&invalid));

        let id = log_hours(&mut store, &ana, garden, "2025-05-04", " weeding ", "3.5")
            .await
            .unwrap();
        let record = store.hour(id).await.unwrap().unwrap();
        assert_eq!(record.status, HourStatus::Pending);
        assert_eq!(record.year, 2025);
        assert_eq!(record.description, "weeding");
        assert_eq!(record.quantity, 3.5);
        let mine = my_hours(&mut store, &ana).await.unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_project_chat_goes_to_supervisor() {
        let mut store = testing::store().await;
        let ana = testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        let application = apply(&mut store, &ana, garden).await.unwrap();
        assert!(
            send_project_message(&mut store, &ana, garden, "hello")
                .await
                .is_err()
        );
        store.accept_within_quota(application).await.unwrap();
        send_project_message(&mut store, &ana, garden, "hello")
            .await
            .unwrap();
        let chat = project_messages(&mut store, &ana, garden).await.unwrap();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].receiver.as_deref(), Some("boss@key.edu"));
    }
}
