use chrono::NaiveDateTime;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: String,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub read: bool,
    /// Set on notices emitted by the annual compliance check.
    pub compliance_year: Option<i32>,
}
