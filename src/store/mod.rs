use eyre::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteQueryResult};
use sqlx::{Connection, SqliteConnection};
use std::str::FromStr;
use tracing::{debug, info};

pub use self::applications::AcceptOutcome;

mod applications;
mod hours;
mod messages;
mod notifications;
mod projects;
mod schema;
mod users;

/// Repository over the local SQLite file. Every query is parameterized
/// and lives in one of the submodules, grouped by table.
pub struct Store {
    conn: SqliteConnection,
}

impl Store {
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .wrap_err_with(|| format!("invalid database url {url}"))?
            .create_if_missing(true)
            .foreign_keys(true);
        let conn = SqliteConnection::connect_with(&options)
            .await
            .wrap_err_with(|| format!("cannot open database {url}"))?;
        debug!(url, "database opened");
        Ok(Self { conn })
    }

    /// Create missing tables. Safe to run on every start.
    pub async fn migrate(&mut self) -> Result<()> {
        let mut trans = self.conn.begin().await?;
        for statement in schema::TABLES {
            sqlx::query(statement)
                .execute(&mut *trans)
                .await
                .context("cannot create tables")?;
        }
        trans
            .commit()
            .await
            .context("error when committing schema")?;
        info!("database schema is up to date");
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await.context("cannot close database")
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn changed(result: &SqliteQueryResult) -> bool {
    result.rows_affected() > 0
}
