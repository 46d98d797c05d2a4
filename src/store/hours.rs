use super::{Store, changed};
use crate::model::{HourId, HourStatus, LoggedHour, NewHours, ProjectId};
use chrono::Datelike;
use eyre::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

const HOUR_COLUMNS: &str = "h.id, h.student, h.project_id, h.date, h.description, h.quantity,
     h.status, h.year, h.carried_from";

fn hour_from_row(row: &SqliteRow) -> Result<LoggedHour> {
    Ok(LoggedHour {
        id: HourId(row.try_get("id")?),
        student: row.try_get("student")?,
        project: row.try_get::<Option<i64>, _>("project_id")?.map(ProjectId),
        date: row.try_get("date")?,
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        year: row.try_get("year")?,
        carried_from: row.try_get("carried_from")?,
    })
}

impl Store {
    /// Insert a record; its year is the year of its date.
    pub async fn insert_hours(&mut self, hours: &NewHours) -> Result<HourId> {
        let result = sqlx::query(
            "INSERT INTO logged_hours
             (student, project_id, date, description, quantity, status, year, carried_from)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&hours.student)
        .bind(hours.project.map(|p| p.0))
        .bind(hours.date)
        .bind(&hours.description)
        .bind(hours.quantity)
        .bind(hours.status.as_str())
        .bind(hours.date.year())
        .bind(hours.carried_from)
        .execute(&mut self.conn)
        .await
        .context("cannot insert hours")?;
        let id = HourId(result.last_insert_rowid());
        debug!(
            record = %id,
            student = %hours.student,
            quantity = hours.quantity,
            "hours recorded"
        );
        Ok(id)
    }

    pub async fn hour(&mut self, id: HourId) -> Result<Option<LoggedHour>> {
        sqlx::query(&format!("SELECT {HOUR_COLUMNS} FROM logged_hours h WHERE h.id = ?"))
            .bind(id.0)
            .fetch_optional(&mut self.conn)
            .await
            .context("cannot load hours")?
            .map(|row| hour_from_row(&row))
            .transpose()
    }

    /// Records of a student with the project name, newest first.
    pub async fn hours_of_student(
        &mut self,
        student: &str,
    ) -> Result<Vec<(LoggedHour, Option<String>)>> {
        sqlx::query(&format!(
            "SELECT {HOUR_COLUMNS}, p.name FROM logged_hours h
             LEFT JOIN projects p ON h.project_id = p.id
             WHERE h.student = ? ORDER BY h.date DESC, h.id DESC"
        ))
        .bind(student)
        .map(|row: SqliteRow| -> Result<(LoggedHour, Option<String>)> {
            Ok((hour_from_row(&row)?, row.try_get("name")?))
        })
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load student hours")?
        .into_iter()
        .collect()
    }

    /// Records logged against projects, restricted to the projects of a
    /// supervisor when one is given, newest year then newest date first.
    pub async fn hours_for_review(
        &mut self,
        supervisor: Option<&str>,
    ) -> Result<Vec<(LoggedHour, String)>> {
        sqlx::query(&format!(
            "SELECT {HOUR_COLUMNS}, p.name FROM logged_hours h
             JOIN projects p ON h.project_id = p.id
             WHERE ?1 IS NULL OR p.supervisor = ?1
             ORDER BY h.year DESC, h.date DESC, h.id DESC"
        ))
        .bind(supervisor)
        .map(|row: SqliteRow| -> Result<(LoggedHour, String)> {
            Ok((hour_from_row(&row)?, row.try_get("name")?))
        })
        .fetch_all(&mut self.conn)
        .await
        .context("cannot load hours to review")?
        .into_iter()
        .collect()
    }

    pub async fn set_hour_status(&mut self, id: HourId, status: HourStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE logged_hours SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&mut self.conn)
            .await
            .context("cannot update hours")?;
        Ok(changed(&result))
    }

    /// Sum of the approved hours of a student for one year.
    pub async fn approved_hours_for_year(&mut self, student: &str, year: i32) -> Result<f64> {
        sqlx::query_scalar(
            "SELECT TOTAL(quantity) FROM logged_hours
             WHERE student = ? AND year = ? AND status = 'approved'",
        )
        .bind(student)
        .bind(year)
        .fetch_one(&mut self.conn)
        .await
        .context("cannot sum approved hours")
    }

    /// Sum of the approved hours of a student for every year up to and
    /// including `year`.
    pub async fn approved_hours_up_to(&mut self, student: &str, year: i32) -> Result<f64> {
        sqlx::query_scalar(
            "SELECT TOTAL(quantity) FROM logged_hours
             WHERE student = ? AND year <= ? AND status = 'approved'",
        )
        .bind(student)
        .bind(year)
        .fetch_one(&mut self.conn)
        .await
        .context("cannot sum cumulative hours")
    }

    /// Hours already carried over from `year` into the following one.
    pub async fn carried_over_from(&mut self, student: &str, year: i32) -> Result<f64> {
        sqlx::query_scalar(
            "SELECT TOTAL(quantity) FROM logged_hours
             WHERE student = ? AND carried_from = ? AND status = 'approved'",
        )
        .bind(student)
        .bind(year)
        .fetch_one(&mut self.conn)
        .await
        .context("cannot sum carried over hours")
    }
}
