use crate::auth::Session;
use crate::cli::{
    ApplicationCommand, Cli, Command, HoursCommand, MessageCommand, NotificationCommand,
    ProjectCommand, UserCommand,
};
use crate::config::{Config, get_config};
use crate::model::{ApplicationId, HourId, NotificationId, Role};
use crate::roles::admin::{self, ProjectChanges};
use crate::roles::{student, supervisor};
use crate::store::Store;
use chrono::Datelike;
use clap::Parser;
use eyre::{Context, Result};
use std::path::Path;
use tracing::{Level, info};

mod auth;
mod cli;
mod compliance;
mod config;
mod display;
mod errors;
mod model;
mod report;
mod roles;
mod stats;
mod store;

const DEFAULT_CONFIG: &str = "keyhours.toml";
const DEFAULT_DATABASE: &str = "sqlite://keyhours.db";

fn load_config(file_name: Option<&str>) -> Result<Config> {
    match file_name {
        Some(file_name) => Config::load(file_name),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Create the accounts listed in the configuration which do not exist yet.
async fn seed(store: &mut Store, config: &Config) -> Result<()> {
    for user in config.seed_users()? {
        if store.user_by_email(&user.email).await?.is_some() {
            continue;
        }
        let role: Role = user.role.parse()?;
        admin::add_user(store, &user.email, &user.password, role, user.percentage).await?;
    }
    Ok(())
}

async fn users(store: &mut Store, session: &Session, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Add {
            email,
            password,
            role,
            percentage,
        } => {
            admin::create_user(store, session, &email, &password, role, percentage).await?;
            println!("Created {role} {email}");
        }
        UserCommand::List { role } => {
            display::display_users(&admin::list_users(store, session, role).await?);
        }
        UserCommand::SetPercentage { email, percentage } => {
            admin::set_percentage(store, session, &email, percentage).await?;
        }
        UserCommand::Passwd {
            new_password,
            email,
        } => {
            let email = email.unwrap_or_else(|| session.email().to_owned());
            admin::reset_password(store, session, &email, &new_password).await?;
        }
    }
    Ok(())
}

async fn projects(store: &mut Store, session: &Session, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::List { filter } => {
            let projects = match session.role() {
                Role::Student => student::list_open_projects(store, session).await?,
                Role::Supervisor => supervisor::my_projects(store, session).await?,
                Role::Admin => admin::list_projects(store, session, filter).await?,
            };
            display::display_projects(&projects);
        }
        ProjectCommand::Show { project } => {
            let application = if session.role() == Role::Student {
                student::project_detail(store, session, project).await?.1
            } else {
                None
            };
            let (project, taken) = roles::project_seats(store, project).await?;
            display::display_project(&project, taken, application);
        }
        ProjectCommand::Create {
            name,
            description,
            quota,
            supervisor,
            hours,
        } => {
            let id = admin::create_project(
                store,
                session,
                &name,
                &description,
                quota,
                &supervisor,
                hours,
            )
            .await?;
            println!("Created project {id}");
        }
        ProjectCommand::Edit {
            project,
            name,
            description,
            quota,
            supervisor,
            hours,
            status,
        } => {
            let changes = ProjectChanges {
                name,
                description,
                quota,
                supervisor,
                granted_hours: hours,
                status,
            };
            let project = admin::edit_project(store, session, project, changes).await?;
            display::display_projects(&[project]);
        }
        ProjectCommand::Finish { project } => {
            admin::finish_project(store, session, project).await?;
        }
        ProjectCommand::Cancel { project } => {
            admin::cancel_project(store, session, project).await?;
        }
        ProjectCommand::History => {
            display::display_history(&admin::project_history(store, session).await?);
        }
        ProjectCommand::Apply { project } => {
            let id = student::apply(store, session, project).await?;
            println!("Application {id} submitted");
        }
        ProjectCommand::Applications { project } => {
            let applications = supervisor::project_applications(store, session, project).await?;
            display::display_applications(&applications);
        }
        ProjectCommand::Mine => {
            let projects = match session.role() {
                Role::Supervisor => supervisor::my_projects(store, session).await?,
                _ => student::accepted_projects(store, session).await?,
            };
            display::display_projects(&projects);
        }
    }
    Ok(())
}

async fn applications(
    store: &mut Store,
    session: &Session,
    command: ApplicationCommand,
) -> Result<()> {
    match command {
        ApplicationCommand::List => {
            let applications = student::my_applications(store, session).await?;
            display::display_student_applications(&applications);
        }
        ApplicationCommand::Accept { id } => {
            supervisor::accept_application(store, session, ApplicationId(id)).await?;
        }
        ApplicationCommand::Reject { id, reason } => {
            supervisor::reject_application(store, session, ApplicationId(id), &reason).await?;
        }
    }
    Ok(())
}

async fn hours(store: &mut Store, session: &Session, command: HoursCommand) -> Result<()> {
    match command {
        HoursCommand::Log {
            project,
            date,
            quantity,
            description,
        } => {
            let id =
                student::log_hours(store, session, project, &date, &description, &quantity).await?;
            println!("Hours {id} logged, waiting for approval");
        }
        HoursCommand::List => display::display_hours(&student::my_hours(store, session).await?),
        HoursCommand::Review => {
            display::display_review(&supervisor::hours_for_review(store, session).await?);
        }
        HoursCommand::Approve { id } => {
            supervisor::approve_hours(store, session, HourId(id)).await?;
        }
        HoursCommand::Reject { id } => {
            supervisor::reject_hours(store, session, HourId(id)).await?;
        }
        HoursCommand::Summary { year, csv } => {
            let year = year.unwrap_or_else(current_year);
            let summaries = if session.role() == Role::Student {
                let summary = student::my_summary(store, session, year).await?;
                display::display_summary(&summary);
                vec![summary]
            } else {
                let summaries = admin::hours_overview(store, session, year).await?;
                display::display_overview(&summaries);
                summaries
            };
            if let Some(path) = csv {
                report::export_summaries(&path, &summaries)?;
                info!(path = %path.display(), "summary exported");
            }
        }
    }
    Ok(())
}

async fn messages(store: &mut Store, session: &Session, command: MessageCommand) -> Result<()> {
    match command {
        MessageCommand::Send { receiver, text } => {
            roles::send_direct_message(store, session, &receiver, &text).await?;
        }
        MessageCommand::Project { project, text } => {
            let messages = match session.role() {
                Role::Student => {
                    if let Some(text) = text {
                        student::send_project_message(store, session, project, &text).await?;
                    }
                    student::project_messages(store, session, project).await?
                }
                Role::Supervisor | Role::Admin => {
                    if let Some(text) = text {
                        if session.is_admin() {
                            admin::send_project_message(store, session, project, &text).await?;
                        } else {
                            supervisor::send_project_message(store, session, project, &text)
                                .await?;
                        }
                    }
                    supervisor::project_messages(store, session, project).await?
                }
            };
            display::display_messages(&messages);
        }
        MessageCommand::Conversation { user } => {
            display::display_messages(&roles::conversation(store, session, &user).await?);
        }
    }
    Ok(())
}

async fn notifications(
    store: &mut Store,
    session: &Session,
    command: NotificationCommand,
) -> Result<()> {
    match command {
        NotificationCommand::List { unread } => {
            let notifications = roles::notifications(store, session, unread).await?;
            display::display_notifications(&notifications);
        }
        NotificationCommand::Read { id } => {
            roles::mark_read(store, session, NotificationId(id)).await?;
        }
    }
    Ok(())
}

async fn run(store: &mut Store, config: &Config, cli: Cli) -> Result<()> {
    if let Command::Init = cli.command {
        return seed(store, config).await;
    }
    let session = auth::login(
        store,
        cli.user.as_deref().unwrap_or_default(),
        cli.password.as_deref().unwrap_or_default(),
    )
    .await?;
    match cli.command {
        Command::Init => Ok(()),
        Command::User(command) => users(store, &session, command).await,
        Command::Project(command) => projects(store, &session, command).await,
        Command::Application(command) => applications(store, &session, command).await,
        Command::Hours(command) => hours(store, &session, command).await,
        Command::Message(command) => messages(store, &session, command).await,
        Command::Notification(command) => notifications(store, &session, command).await,
        Command::Compliance { year } => {
            let carry_over = get_config(config, "compliance", "carry_over")
                .map(|value| value.parse::<bool>())
                .transpose()
                .context("invalid compliance.carry_over setting")?
                .unwrap_or(true);
            let year = year.unwrap_or_else(current_year);
            let report = admin::run_compliance(store, &session, year, carry_over).await?;
            display::display_compliance(&report);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let level = match cli.verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let config = load_config(cli.config.as_deref())?;
    let url =
        get_config(&config, "database", "url").unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
    let mut store = Store::open(&url).await?;
    store.migrate().await?;
    let result = run(&mut store, &config, cli).await;
    store.close().await?;
    result
}
