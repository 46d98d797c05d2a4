use super::ProjectId;
use crate::errors::KeyHourError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HourId(pub i64);

impl fmt::Display for HourId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HourStatus {
    Pending,
    Approved,
    Rejected,
}

impl HourStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HourStatus::Pending => "pending",
            HourStatus::Approved => "approved",
            HourStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for HourStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HourStatus {
    type Err = KeyHourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(HourStatus::Pending),
            "approved" => Ok(HourStatus::Approved),
            "rejected" => Ok(HourStatus::Rejected),
            _ => Err(KeyHourError::invalid("hour status", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggedHour {
    pub id: HourId,
    pub student: String,
    /// `None` for hours carried over from a previous year.
    pub project: Option<ProjectId>,
    pub date: NaiveDate,
    pub description: String,
    pub quantity: f64,
    pub status: HourStatus,
    pub year: i32,
    pub carried_from: Option<i32>,
}

/// A record about to be inserted.
#[derive(Clone, Debug)]
pub struct NewHours {
    pub student: String,
    pub project: Option<ProjectId>,
    pub date: NaiveDate,
    pub description: String,
    pub quantity: f64,
    pub status: HourStatus,
    pub carried_from: Option<i32>,
}
