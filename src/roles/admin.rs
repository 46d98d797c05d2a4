use super::{existing_project, required, supervisor};
use crate::auth::{Session, hash_password};
use crate::compliance::{self, ComplianceReport};
use crate::errors::KeyHourError;
use crate::model::{
    MessageId, NewProject, Project, ProjectFilter, ProjectId, ProjectStatus, Role, User, UserId,
};
use crate::stats::{self, HoursSummary};
use crate::store::Store;
use eyre::Result;
use tracing::info;

/// Changes to apply to a project. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quota: Option<i64>,
    pub supervisor: Option<String>,
    pub granted_hours: Option<f64>,
    pub status: Option<ProjectStatus>,
}

fn check_quota(quota: i64) -> Result<i64, KeyHourError> {
    if quota < 0 {
        Err(KeyHourError::invalid("quota", quota.to_string()))
    } else {
        Ok(quota)
    }
}

fn check_granted_hours(hours: f64) -> Result<f64, KeyHourError> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(hours)
    } else {
        Err(KeyHourError::invalid("granted hours", hours.to_string()))
    }
}

async fn check_supervisor(store: &mut Store, email: &str) -> Result<String> {
    let email = required("supervisor", email)?;
    match store.user_by_email(email).await? {
        Some(user) if user.is(Role::Supervisor) => Ok(user.email),
        Some(_) => Err(KeyHourError::invalid("supervisor", email).into()),
        None => Err(KeyHourError::not_found("user", email).into()),
    }
}

pub async fn create_project(
    store: &mut Store,
    session: &Session,
    name: &str,
    description: &str,
    quota: i64,
    supervisor: &str,
    granted_hours: f64,
) -> Result<ProjectId> {
    session.require(Role::Admin)?;
    let project = NewProject {
        name: required("name", name)?.to_owned(),
        description: required("description", description)?.to_owned(),
        granted_hours: check_granted_hours(granted_hours)?,
        quota: check_quota(quota)?,
        supervisor: check_supervisor(store, supervisor).await?,
    };
    let id = store.insert_project(&project).await?;
    info!(project = %id, name = %project.name, supervisor = %project.supervisor, "project created");
    Ok(id)
}

pub async fn edit_project(
    store: &mut Store,
    session: &Session,
    id: ProjectId,
    changes: ProjectChanges,
) -> Result<Project> {
    session.require(Role::Admin)?;
    let mut project = existing_project(store, id).await?;
    if let Some(name) = changes.name {
        project.name = required("name", &name)?.to_owned();
    }
    if let Some(description) = changes.description {
        project.description = required("description", &description)?.to_owned();
    }
    if let Some(quota) = changes.quota {
        project.quota = check_quota(quota)?;
    }
    if let Some(supervisor) = changes.supervisor {
        project.supervisor = check_supervisor(store, &supervisor).await?;
    }
    if let Some(granted_hours) = changes.granted_hours {
        project.granted_hours = check_granted_hours(granted_hours)?;
    }
    if let Some(status) = changes.status {
        project.status = status;
    }
    store.update_project(&project).await?;
    info!(project = %project, status = %project.status, "project updated");
    Ok(project)
}

async fn set_status(
    store: &mut Store,
    session: &Session,
    id: ProjectId,
    status: ProjectStatus,
) -> Result<()> {
    session.require(Role::Admin)?;
    if !store.set_project_status(id, status).await? {
        return Err(KeyHourError::not_found("project", id).into());
    }
    info!(project = %id, %status, "project status changed");
    Ok(())
}

pub async fn finish_project(store: &mut Store, session: &Session, id: ProjectId) -> Result<()> {
    set_status(store, session, id, ProjectStatus::Finished).await
}

pub async fn cancel_project(store: &mut Store, session: &Session, id: ProjectId) -> Result<()> {
    set_status(store, session, id, ProjectStatus::Cancelled).await
}

pub async fn list_projects(
    store: &mut Store,
    session: &Session,
    filter: ProjectFilter,
) -> Result<Vec<Project>> {
    session.require(Role::Admin)?;
    store.projects(filter).await
}

/// Projects which are no longer active, with their accepted students.
pub async fn project_history(
    store: &mut Store,
    session: &Session,
) -> Result<Vec<(Project, Vec<String>)>> {
    session.require(Role::Admin)?;
    let mut history = Vec::new();
    for project in store.projects(ProjectFilter::History).await? {
        let participants = store.accepted_students(project.id).await?;
        history.push((project, participants));
    }
    Ok(history)
}

pub async fn create_user(
    store: &mut Store,
    session: &Session,
    email: &str,
    password: &str,
    role: Role,
    percentage: i64,
) -> Result<UserId> {
    session.require(Role::Admin)?;
    add_user(store, email, password, role, percentage).await
}

/// Create an account without checking who asks for it. Used by
/// `create_user` and when seeding an empty database.
pub async fn add_user(
    store: &mut Store,
    email: &str,
    password: &str,
    role: Role,
    percentage: i64,
) -> Result<UserId> {
    let email = required("email", email)?;
    let password = required("password", password)?;
    if !email.contains('@') {
        return Err(KeyHourError::invalid("email", email).into());
    }
    if percentage < 0 {
        return Err(KeyHourError::invalid("percentage", percentage.to_string()).into());
    }
    let hash = hash_password(password)?;
    let id = store.insert_user(email, &hash, role, percentage).await?;
    info!(email, %role, percentage, "user created");
    Ok(id)
}

pub async fn list_users(
    store: &mut Store,
    session: &Session,
    role: Option<Role>,
) -> Result<Vec<User>> {
    session.require(Role::Admin)?;
    store.users(role).await
}

pub async fn set_percentage(
    store: &mut Store,
    session: &Session,
    email: &str,
    percentage: i64,
) -> Result<()> {
    session.require(Role::Admin)?;
    if percentage < 0 {
        return Err(KeyHourError::invalid("percentage", percentage.to_string()).into());
    }
    if !store.set_percentage(email, percentage).await? {
        return Err(KeyHourError::not_found("user", email).into());
    }
    info!(email, percentage, "percentage updated");
    Ok(())
}

/// Replace the password of a user. Users may change their own password,
/// administrators anybody's.
pub async fn reset_password(
    store: &mut Store,
    session: &Session,
    email: &str,
    password: &str,
) -> Result<()> {
    if email != session.email() {
        session.require(Role::Admin)?;
    }
    let password = required("password", password)?;
    let hash = hash_password(password)?;
    if !store.set_password_hash(email, &hash).await? {
        return Err(KeyHourError::not_found("user", email).into());
    }
    info!(email, by = session.email(), "password changed");
    Ok(())
}

pub async fn hours_overview(
    store: &mut Store,
    session: &Session,
    year: i32,
) -> Result<Vec<HoursSummary>> {
    session.require(Role::Admin)?;
    stats::hours_overview(store, year).await
}

pub async fn run_compliance(
    store: &mut Store,
    session: &Session,
    year: i32,
    carry_over: bool,
) -> Result<ComplianceReport> {
    session.require(Role::Admin)?;
    compliance::check_annual_compliance(store, year, carry_over).await
}

/// Post on any project. Administrator posts have no single receiver.
pub async fn send_project_message(
    store: &mut Store,
    session: &Session,
    project: ProjectId,
    text: &str,
) -> Result<MessageId> {
    session.require(Role::Admin)?;
    supervisor::send_project_message(store, session, project, text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::login;
    use crate::errors::refusal;
    use crate::model::ApplicationStatus;
    use crate::roles::{student, supervisor};
    use crate::store::testing;

    #[tokio::test]
    async fn test_create_project_checks_fields() {
        let mut store = testing::store().await;
        let admin = testing::session(&mut store, "admin@key.edu", Role::Admin, 0).await;
        let ana = testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;

        let err = create_project(&mut store, &admin, "", "d", 3, "boss@key.edu", 5.0)
            .await
            .unwrap_err();
        assert_eq!(refusal(&err), Some(&KeyHourError::MissingField("name")));
        let err = create_project(&mut store, &admin, "Garden", "d", -1, "boss@key.edu", 5.0)
            .await
            .unwrap_err();
        assert_eq!(refusal(&err), Some(&KeyHourError::invalid("quota", "-1")));
        let err = create_project(&mut store, &admin, "Garden", "d", 3, "ana@key.edu", 5.0)
            .await
            .unwrap_err();
        assert_eq!(
            refusal(&err),
            Some(&KeyHourError::invalid("supervisor", "ana@key.edu"))
        );
        let err = create_project(&mut store, &ana, "Garden", "d", 3, "boss@key.edu", 5.0)
            .await
            .unwrap_err();
        assert!(matches!(refusal(&err), Some(KeyHourError::Forbidden(_))));

        let id = create_project(
            &mut store,
            &admin,
            " Garden ",
            "Weeding",
            3,
            "boss@key.edu",
            5.0,
        )
        .await
        .unwrap();
        let project = store.project(id).await.unwrap().unwrap();
        assert_eq!(project.name, "Garden");
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[tokio::test]
    async fn test_edit_and_history() {
        let mut store = testing::store().await;
        let admin = testing::session(&mut store, "admin@key.edu", Role::Admin, 0).await;
        let boss = testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        let ana = testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 1).await;
        let library = testing::project(&mut store, "Library", "boss@key.edu", 1).await;
        let application = student::apply(&mut store, &ana, garden).await.unwrap();
        supervisor::accept_application(&mut store, &boss, application)
            .await
            .unwrap();

        let project = edit_project(
            &mut store,
            &admin,
            garden,
            ProjectChanges {
                quota: Some(4),
                granted_hours: Some(12.5),
                ..ProjectChanges::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(project.quota, 4);
        assert_eq!(project.name, "Garden");

        finish_project(&mut store, &admin, garden).await.unwrap();
        cancel_project(&mut store, &admin, library).await.unwrap();
        let err = finish_project(&mut store, &admin, ProjectId(99))
            .await
            .unwrap_err();
        assert!(matches!(refusal(&err), Some(KeyHourError::NotFound { .. })));

        let history = project_history(&mut store, &admin).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].0.status, ProjectStatus::Finished);
        assert_eq!(history[0].1, vec!["ana@key.edu"]);
        assert!(history[1].1.is_empty());
        let active = ProjectFilter::Only(ProjectStatus::Active);
        let active = list_projects(&mut store, &admin, active).await.unwrap();
        assert!(active.is_empty());
        let status = store
            .application(application)
            .await
            .unwrap()
            .unwrap()
            .status;
        assert_eq!(status, ApplicationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_edit_keeps_quota_above_accepted() {
        let mut store = testing::store().await;
        let admin = testing::session(&mut store, "admin@key.edu", Role::Admin, 0).await;
        let boss = testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 2).await;
        for email in ["ana@key.edu", "bob@key.edu"] {
            let student = testing::session(&mut store, email, Role::Student, 40).await;
            let application = student::apply(&mut store, &student, garden).await.unwrap();
            supervisor::accept_application(&mut store, &boss, application)
                .await
                .unwrap();
        }

        let shrink = ProjectChanges {
            quota: Some(1),
            ..ProjectChanges::default()
        };
        let err = edit_project(&mut store, &admin, garden, shrink)
            .await
            .unwrap_err();
        assert_eq!(
            refusal(&err),
            Some(&KeyHourError::QuotaBelowAccepted {
                quota: 1,
                accepted: 2
            })
        );
        let project = store.project(garden).await.unwrap().unwrap();
        assert_eq!(project.quota, 2);
        assert_eq!(store.accepted_count(garden).await.unwrap(), 2);

        // Closing the project while full is still allowed.
        let close = ProjectChanges {
            quota: Some(2),
            status: Some(ProjectStatus::Finished),
            ..ProjectChanges::default()
        };
        let project = edit_project(&mut store, &admin, garden, close)
            .await
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Finished);
    }

    #[tokio::test]
    async fn test_users() {
        let mut store = testing::store().await;
        let admin = testing::session(&mut store, "admin@key.edu", Role::Admin, 0).await;
        create_user(&mut store, &admin, "ana@key.edu", "1234", Role::Student, 40)
            .await
            .unwrap();
        let err = create_user(&mut store, &admin, "not-an-email", "1234", Role::Student, 40)
            .await
            .unwrap_err();
        assert_eq!(
            refusal(&err),
            Some(&KeyHourError::invalid("email", "not-an-email"))
        );
        set_percentage(&mut store, &admin, "ana@key.edu", 80)
            .await
            .unwrap();
        let unknown = set_percentage(&mut store, &admin, "ghost@key.edu", 80).await;
        assert!(unknown.is_err());

        let ana = login(&mut store, "ana@key.edu", "1234").await.unwrap();
        assert_eq!(ana.user().percentage, 80);
        reset_password(&mut store, &ana, "ana@key.edu", "s3cret")
            .await
            .unwrap();
        let err = reset_password(&mut store, &ana, "admin@key.edu", "x")
            .await
            .unwrap_err();
        assert!(matches!(refusal(&err), Some(KeyHourError::Forbidden(_))));
        assert!(login(&mut store, "ana@key.edu", "1234").await.is_err());
        login(&mut store, "ana@key.edu", "s3cret").await.unwrap();

        let students = list_users(&mut store, &admin, Some(Role::Student)).await;
        let students = students.unwrap();
        assert_eq!(students.len(), 1);
        assert!(students[0].password_hash.starts_with("$argon2"));
    }
}
