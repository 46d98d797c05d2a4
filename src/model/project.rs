use crate::errors::KeyHourError;
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = KeyHourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('#')
            .parse()
            .map(ProjectId)
            .map_err(|_| KeyHourError::invalid("project", s))
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProjectStatus {
    Active,
    Finished,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Finished => "finished",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = KeyHourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "finished" => Ok(ProjectStatus::Finished),
            "cancelled" | "canceled" => Ok(ProjectStatus::Cancelled),
            _ => Err(KeyHourError::invalid("project status", s)),
        }
    }
}

/// Which projects a listing shows.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ProjectFilter {
    #[default]
    All,
    Only(ProjectStatus),
    /// Every project which is no longer active.
    History,
}

impl FromStr for ProjectFilter {
    type Err = KeyHourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ProjectFilter::All),
            "history" => Ok(ProjectFilter::History),
            other => other
                .parse()
                .map(ProjectFilter::Only)
                .map_err(|_| KeyHourError::invalid("project filter", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub granted_hours: f64,
    pub quota: i64,
    pub supervisor: String,
    pub status: ProjectStatus,
    pub created_at: NaiveDateTime,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Fields of a project which does not exist yet.
#[derive(Clone, Debug)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub granted_hours: f64,
    pub quota: i64,
    pub supervisor: String,
}
