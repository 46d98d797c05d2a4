use crate::model::{ProjectFilter, ProjectId, ProjectStatus, Role};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, author, about)]
pub struct Cli {
    /// Use FILE instead of keyhours.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,
    /// Set verbosity level
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbosity: u8,
    /// Email of the user performing the action
    #[arg(short, long, env = "KEYHOURS_USER")]
    pub user: Option<String>,
    #[arg(short, long, env = "KEYHOURS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database tables and the seed users of the configuration
    Init,
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Application(ApplicationCommand),
    #[command(subcommand)]
    Hours(HoursCommand),
    #[command(subcommand)]
    Message(MessageCommand),
    #[command(subcommand)]
    Notification(NotificationCommand),
    /// Flag students below their required hours and carry surplus over
    Compliance {
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    Add {
        email: String,
        password: String,
        #[arg(long, default_value = "student")]
        role: Role,
        /// Required hours per year
        #[arg(long, default_value_t = 0)]
        percentage: i64,
    },
    List {
        #[arg(long)]
        role: Option<Role>,
    },
    SetPercentage {
        email: String,
        percentage: i64,
    },
    /// Change a password, by default the one of the current user
    Passwd {
        new_password: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Projects visible to the current user
    List {
        /// all, active, finished, cancelled or history
        #[arg(long, default_value = "all")]
        filter: ProjectFilter,
    },
    Show {
        project: ProjectId,
    },
    Create {
        name: String,
        description: String,
        #[arg(long)]
        quota: i64,
        #[arg(long)]
        supervisor: String,
        /// Hours granted for taking part
        #[arg(long)]
        hours: f64,
    },
    Edit {
        project: ProjectId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        quota: Option<i64>,
        #[arg(long)]
        supervisor: Option<String>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        status: Option<ProjectStatus>,
    },
    Finish {
        project: ProjectId,
    },
    Cancel {
        project: ProjectId,
    },
    /// Finished and cancelled projects with their participants
    History,
    Apply {
        project: ProjectId,
    },
    Applications {
        project: ProjectId,
    },
    /// Accepted projects of a student, supervised projects of a supervisor
    Mine,
}

#[derive(Debug, Subcommand)]
pub enum ApplicationCommand {
    List,
    Accept { id: i64 },
    /// Reject an application, telling the student why
    Reject { id: i64, reason: String },
}

#[derive(Debug, Subcommand)]
pub enum HoursCommand {
    Log {
        project: ProjectId,
        /// Date in YYYY-MM-DD format
        date: String,
        quantity: String,
        description: String,
    },
    List,
    /// Hours logged on supervised projects
    Review,
    Approve { id: i64 },
    Reject { id: i64 },
    Summary {
        #[arg(long)]
        year: Option<i32>,
        /// Export the summary of every student to FILE
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MessageCommand {
    Send {
        receiver: String,
        text: String,
    },
    /// Show the chat of a project, posting TEXT first if given
    Project {
        project: ProjectId,
        text: Option<String>,
    },
    Conversation {
        user: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    List {
        #[arg(long)]
        unread: bool,
    },
    Read { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "keyhours", "-vv", "-u", "ana@key.edu", "-p", "1234", "hours", "log", "#3",
            "2025-05-04", "2.5", "weeding",
        ])
        .unwrap();
        assert_eq!(cli.verbosity, 2);
        assert_eq!(cli.user.as_deref(), Some("ana@key.edu"));
        match cli.command {
            Command::Hours(HoursCommand::Log { project, quantity, .. }) => {
                assert_eq!(project, ProjectId(3));
                assert_eq!(quantity, "2.5");
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::try_parse_from(["keyhours", "project", "list", "--filter", "history"]);
        let cli = cli.unwrap();
        assert!(matches!(
            cli.command,
            Command::Project(ProjectCommand::List {
                filter: ProjectFilter::History
            })
        ));
        let cli = Cli::try_parse_from(["keyhours", "user", "list", "--role", "janitor"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from([
            "keyhours", "application", "reject", "4", "no seat left",
        ]);
        match cli.unwrap().command {
            Command::Application(ApplicationCommand::Reject { id, reason }) => {
                assert_eq!(id, 4);
                assert_eq!(reason, "no seat left");
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::try_parse_from(["keyhours", "application", "reject", "4"]);
        assert!(cli.is_err());
    }
}
