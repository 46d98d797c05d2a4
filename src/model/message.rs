use super::ProjectId;
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A chat line, either posted on a project or sent directly to a user.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: MessageId,
    pub project: Option<ProjectId>,
    pub sender: String,
    pub receiver: Option<String>,
    pub text: String,
    pub sent_at: NaiveDateTime,
}
