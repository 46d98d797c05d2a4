pub use self::application::{Application, ApplicationId, ApplicationStatus};
pub use self::hours::{HourId, HourStatus, LoggedHour, NewHours};
pub use self::message::{Message, MessageId};
pub use self::notification::{Notification, NotificationId};
pub use self::project::{NewProject, Project, ProjectFilter, ProjectId, ProjectStatus};
pub use self::user::{Role, User, UserId};

mod application;
mod hours;
mod message;
mod notification;
mod project;
mod user;
