use super::ProjectId;
use crate::errors::KeyHourError;
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = KeyHourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(KeyHourError::invalid("application status", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Application {
    pub id: ApplicationId,
    pub project: ProjectId,
    pub student: String,
    pub status: ApplicationStatus,
    pub submitted_at: NaiveDateTime,
    /// When a supervisor last accepted or rejected the application.
    pub responded_at: Option<NaiveDateTime>,
    pub rejection_reason: Option<String>,
}

impl Application {
    pub fn is_accepted(&self) -> bool {
        self.status == ApplicationStatus::Accepted
    }
}
