use super::projects::project_from_row;
use super::{Store, changed, now};
use crate::errors::KeyHourError;
use crate::model::{Application, ApplicationId, ApplicationStatus, Project, ProjectId};
use eyre::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};
use tracing::{debug, trace};

const APPLICATION_COLUMNS: &str = "a.id, a.project_id, a.student, a.status, a.submitted_at,
     a.responded_at, a.rejection_reason";

/// Result of trying to accept an application against the project quota.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AcceptOutcome {
    Accepted,
    AlreadyAccepted,
    Full,
}

fn application_from_row(row: &SqliteRow) -> Result<Application> {
    Ok(Application {
        id: ApplicationId(row.try_get("id")?),
        project: ProjectId(row.try_get("project_id")?),
        student: row.try_get("student")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        submitted_at: row.try_get("submitted_at")?,
        responded_at: row.try_get("responded_at")?,
        rejection_reason: row.try_get("rejection_reason")?,
    })
}

impl Store {
    /// Record a pending application. The (project, student) pair is
    /// unique, a second attempt is refused.
    pub async fn insert_application(
        &mut self,
        project: ProjectId,
        student: &str,
    ) -> Result<ApplicationId> {
        let result = sqlx::query(
            "INSERT INTO applications (project_id, student, status, submitted_at)
             VALUES (?, ?, 'pending', ?)",
        )
        .bind(project.0)
        .bind(student)
        .bind(now())
        .execute(&mut self.conn)
        .await;
        match result {
            Ok(result) => {
                let id = ApplicationId(result.last_insert_rowid());
                debug!(application = %id, %project, student, "application submitted");
                Ok(id)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(KeyHourError::AlreadyApplied.into())
            }
            Err(e) => Err(e).context("cannot insert application"),
        }
    }

    pub async fn application(&mut self, id: ApplicationId) -> Result<Option<Application>> {
        sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications a WHERE a.id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&mut self.conn)
        .await
        .context("cannot load application")?
        .map(|row| application_from_row(&row))
        .transpose()
    }

    pub async fn application_for(
        &mut self,
        project: ProjectId,
        student: &str,
    ) -> Result<Option<Application>> {
        sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications a
             WHERE a.project_id = ? AND a.student = ?"
        ))
        .bind(project.0)
        .bind(student)
        .fetch_optional(&mut self.conn)
        .await
        .context("cannot load application")?
        .map(|row| application_from_row(&row))
        .transpose()
    }

    /// Applications to a project, newest first.
    pub async fn applications_for_project(
        &mut self,
        project: ProjectId,
    ) -> Result<Vec<Application>> {
        sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications a
             WHERE a.project_id = ? ORDER BY a.submitted_at DESC, a.id DESC"
        ))
        .bind(project.0)
        .map(|row: SqliteRow| application_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load applications")?
        .into_iter()
        .collect()
    }

    /// Applications of a student together with the project name, newest
    /// first.
    pub async fn applications_of_student(
        &mut self,
        student: &str,
    ) -> Result<Vec<(Application, String)>> {
        sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS}, p.name
             FROM applications a JOIN projects p ON a.project_id = p.id
             WHERE a.student = ? ORDER BY a.submitted_at DESC, a.id DESC"
        ))
        .bind(student)
        .map(|row: SqliteRow| -> Result<(Application, String)> {
            Ok((application_from_row(&row)?, row.try_get("name")?))
        })
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load student applications")?
        .into_iter()
        .collect()
    }

    pub async fn accepted_count(&mut self, project: ProjectId) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE project_id = ? AND status = 'accepted'",
        )
        .bind(project.0)
        .fetch_one(&mut self.conn)
        .await
        .context("cannot count accepted applications")
    }

    /// Emails of the students accepted in a project.
    pub async fn accepted_students(&mut self, project: ProjectId) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT student FROM applications
             WHERE project_id = ? AND status = 'accepted' ORDER BY student",
        )
        .bind(project.0)
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load accepted students")
    }

    /// Projects in which a student has been accepted.
    pub async fn accepted_projects(&mut self, student: &str) -> Result<Vec<Project>> {
        sqlx::query(
            "SELECT p.id, p.name, p.description, p.granted_hours, p.quota, p.supervisor,
                    p.status, p.created_at
             FROM applications a JOIN projects p ON a.project_id = p.id
             WHERE a.student = ? AND a.status = 'accepted' ORDER BY p.id",
        )
        .bind(student)
        .map(|row: SqliteRow| project_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load accepted projects")?
        .into_iter()
        .collect()
    }

    pub async fn is_accepted(&mut self, project: ProjectId, student: &str) -> Result<bool> {
        Ok(self
            .application_for(project, student)
            .await?
            .is_some_and(|a| a.is_accepted()))
    }

    /// Accept an application unless its project has no seat left. The
    /// count and the update run in the same transaction.
    pub async fn accept_within_quota(&mut self, id: ApplicationId) -> Result<AcceptOutcome> {
        let mut trans = self.conn.begin().await?;
        let row = sqlx::query(
            "SELECT a.status, p.quota,
                    (SELECT COUNT(*) FROM applications o
                     WHERE o.project_id = a.project_id AND o.status = 'accepted') AS accepted
             FROM applications a JOIN projects p ON a.project_id = p.id
             WHERE a.id = ?",
        )
        .bind(id.0)
        .fetch_optional(&mut *trans)
        .await
        .context("cannot load application quota")?
        .ok_or_else(|| KeyHourError::not_found("application", id))?;
        let status: ApplicationStatus = row.try_get::<String, _>("status")?.parse()?;
        let quota: i64 = row.try_get("quota")?;
        let accepted: i64 = row.try_get("accepted")?;
        trace!(application = %id, quota, accepted, %status, "checking seats");
        let outcome = if status == ApplicationStatus::Accepted {
            AcceptOutcome::AlreadyAccepted
        } else if accepted >= quota {
            AcceptOutcome::Full
        } else {
            sqlx::query(
                "UPDATE applications
                 SET status = 'accepted', responded_at = ?, rejection_reason = NULL
                 WHERE id = ?",
            )
            .bind(now())
            .bind(id.0)
            .execute(&mut *trans)
            .await
            .context("cannot accept application")?;
            AcceptOutcome::Accepted
        };
        trans
            .commit()
            .await
            .context("error when committing transaction")?;
        Ok(outcome)
    }

    /// Reject an application, recording why and when.
    pub async fn reject_application(&mut self, id: ApplicationId, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE applications
             SET status = 'rejected', responded_at = ?, rejection_reason = ?
             WHERE id = ?",
        )
        .bind(now())
        .bind(reason)
        .bind(id.0)
        .execute(&mut self.conn)
        .await
        .context("cannot reject application")?;
        Ok(changed(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::AcceptOutcome;
    use crate::errors::{KeyHourError, refusal};
    use crate::model::{ApplicationId, ApplicationStatus, Role};
    use crate::store::testing;

    #[tokio::test]
    async fn test_unique_per_project_and_student() {
        let mut store = testing::store().await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        let library = testing::project(&mut store, "Library", "boss@key.edu", 3).await;
        store
            .insert_application(garden, "ana@key.edu")
            .await
            .unwrap();
        store
            .insert_application(library, "ana@key.edu")
            .await
            .unwrap();
        let err = store
            .insert_application(garden, "ana@key.edu")
            .await
            .unwrap_err();
        assert_eq!(refusal(&err), Some(&KeyHourError::AlreadyApplied));
        let applications = store.applications_of_student("ana@key.edu").await.unwrap();
        assert_eq!(applications.len(), 2);
        assert_eq!(applications[0].1, "Library");
        assert_eq!(applications[0].0.responded_at, None);
    }

    #[tokio::test]
    async fn test_accept_within_quota() {
        let mut store = testing::store().await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        testing::session(&mut store, "bob@key.edu", Role::Student, 40).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 1).await;
        let ana = store
            .insert_application(garden, "ana@key.edu")
            .await
            .unwrap();
        let bob = store
            .insert_application(garden, "bob@key.edu")
            .await
            .unwrap();

        let outcome = store.accept_within_quota(ana).await.unwrap();
        assert_eq!(outcome, AcceptOutcome::Accepted);
        let outcome = store.accept_within_quota(ana).await.unwrap();
        assert_eq!(outcome, AcceptOutcome::AlreadyAccepted);
        let outcome = store.accept_within_quota(bob).await.unwrap();
        assert_eq!(outcome, AcceptOutcome::Full);
        assert_eq!(store.accepted_count(garden).await.unwrap(), 1);
        let pending = store.application(bob).await.unwrap().unwrap();
        assert_eq!(pending.status, ApplicationStatus::Pending);

        // Rejecting an accepted student frees the seat.
        assert!(store.reject_application(ana, "moved away").await.unwrap());
        let outcome = store.accept_within_quota(bob).await.unwrap();
        assert_eq!(outcome, AcceptOutcome::Accepted);
        let accepted = store.accepted_students(garden).await.unwrap();
        assert_eq!(accepted, vec!["bob@key.edu"]);
        assert!(store.is_accepted(garden, "bob@key.edu").await.unwrap());
        assert!(!store.is_accepted(garden, "ana@key.edu").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejection_is_recorded() {
        let mut store = testing::store().await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 1).await;
        let id = store
            .insert_application(garden, "ana@key.edu")
            .await
            .unwrap();

        assert!(store.reject_application(id, "too young").await.unwrap());
        let application = store.application(id).await.unwrap().unwrap();
        assert_eq!(application.status, ApplicationStatus::Rejected);
        assert_eq!(application.rejection_reason.as_deref(), Some("too young"));
        assert!(application.responded_at.is_some());

        // Accepting later clears the reason.
        store.accept_within_quota(id).await.unwrap();
        let application = store.application(id).await.unwrap().unwrap();
        assert_eq!(application.rejection_reason, None);
        let unknown = store.reject_application(ApplicationId(42), "x").await;
        assert!(!unknown.unwrap());
    }

    #[tokio::test]
    async fn test_accept_unknown_application() {
        let mut store = testing::store().await;
        let err = store
            .accept_within_quota(ApplicationId(42))
            .await
            .unwrap_err();
        assert!(matches!(refusal(&err), Some(KeyHourError::NotFound { .. })));
    }
}
