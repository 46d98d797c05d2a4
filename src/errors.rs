use thiserror::Error;

/// Refusals reported to the user as-is. Anything else travels as an
/// `eyre::Report`.
#[derive(Debug, Error, PartialEq)]
pub enum KeyHourError {
    #[error("please fill in the {0} field")]
    MissingField(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("permission denied: {0}")]
    Forbidden(String),
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },
    #[error("a user with email {0} already exists")]
    EmailTaken(String),
    #[error("you already applied to this project")]
    AlreadyApplied,
    #[error("project {0} is not open for applications")]
    ProjectNotOpen(String),
    #[error("no seats available in project {0}")]
    NoSeatsAvailable(String),
    #[error("you are not accepted in project {0}")]
    NotAccepted(String),
    #[error("quota {quota} is below the {accepted} students already accepted")]
    QuotaBelowAccepted { quota: i64, accepted: i64 },
}

impl KeyHourError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }

    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }
}

/// Return the refusal carried by a report, if any.
#[cfg(test)]
pub fn refusal(report: &eyre::Report) -> Option<&KeyHourError> {
    report.downcast_ref::<KeyHourError>()
}
