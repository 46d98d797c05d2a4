use super::{Store, changed, now};
use crate::errors::KeyHourError;
use crate::model::{NewProject, Project, ProjectFilter, ProjectId, ProjectStatus};
use eyre::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};
use tracing::{debug, trace};

const PROJECT_COLUMNS: &str =
    "id, name, description, granted_hours, quota, supervisor, status, created_at";

pub(super) fn project_from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: ProjectId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        granted_hours: row.try_get("granted_hours")?,
        quota: row.try_get("quota")?,
        supervisor: row.try_get("supervisor")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

impl Store {
    pub async fn insert_project(&mut self, project: &NewProject) -> Result<ProjectId> {
        let result = sqlx::query(
            "INSERT INTO projects
                 (name, description, granted_hours, quota, supervisor, status, created_at)
             VALUES (?, ?, ?, ?, ?, 'active', ?)",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.granted_hours)
        .bind(project.quota)
        .bind(&project.supervisor)
        .bind(now())
        .execute(&mut self.conn)
        .await
        .context("cannot insert project")?;
        let id = ProjectId(result.last_insert_rowid());
        debug!(project = %id, name = %project.name, "project created");
        Ok(id)
    }

    pub async fn project(&mut self, id: ProjectId) -> Result<Option<Project>> {
        sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&mut self.conn)
            .await
            .context("cannot load project")?
            .map(|row| project_from_row(&row))
            .transpose()
    }

    pub async fn projects(&mut self, filter: ProjectFilter) -> Result<Vec<Project>> {
        let (condition, status) = match filter {
            ProjectFilter::All => ("1 = 1", None),
            ProjectFilter::Only(status) => ("status = ?", Some(status)),
            ProjectFilter::History => ("status != ?", Some(ProjectStatus::Active)),
        };
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE {condition} ORDER BY id");
        let mut query = sqlx::query(&sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        query
            .map(|row: SqliteRow| project_from_row(&row))
            .fetch_all(&mut self.conn)
            .await
            .context("cannot load projects")?
            .into_iter()
            .collect()
    }

    pub async fn projects_supervised_by(&mut self, supervisor: &str) -> Result<Vec<Project>> {
        sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE supervisor = ? ORDER BY id"
        ))
        .bind(supervisor)
        .map(|row: SqliteRow| project_from_row(&row))
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load supervised projects")?
        .into_iter()
        .collect()
    }

    /// Write back every editable field of `project`. The quota may not
    /// drop below the number of students already accepted; the count and
    /// the update run in the same transaction.
    pub async fn update_project(&mut self, project: &Project) -> Result<bool> {
        let mut trans = self.conn.begin().await?;
        let accepted: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE project_id = ? AND status = 'accepted'",
        )
        .bind(project.id.0)
        .fetch_one(&mut *trans)
        .await
        .context("cannot count accepted applications")?;
        trace!(project = %project.id, quota = project.quota, accepted, "checking new quota");
        if project.quota < accepted {
            return Err(KeyHourError::QuotaBelowAccepted {
                quota: project.quota,
                accepted,
            }
            .into());
        }
        let result = sqlx::query(
            "UPDATE projects SET name = ?, description = ?, granted_hours = ?, quota = ?,
             supervisor = ?, status = ? WHERE id = ?",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.granted_hours)
        .bind(project.quota)
        .bind(&project.supervisor)
        .bind(project.status.as_str())
        .bind(project.id.0)
        .execute(&mut *trans)
        .await
        .context("cannot update project")?;
        trans
            .commit()
            .await
            .context("error when committing transaction")?;
        Ok(changed(&result))
    }

    pub async fn set_project_status(
        &mut self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE projects SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&mut self.conn)
            .await
            .context("cannot update project status")?;
        Ok(changed(&result))
    }
}
