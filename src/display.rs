use crate::compliance::ComplianceReport;
use crate::model::{
    Application, ApplicationStatus, LoggedHour, Message, Notification, Project, Role, User,
};
use crate::stats::HoursSummary;

fn hours_line(record: &LoggedHour, project: Option<&str>) -> String {
    let project = match (project, record.carried_from) {
        (Some(name), _) => name.to_owned(),
        (None, Some(year)) => format!("carried over from {year}"),
        (None, None) => "no project".to_owned(),
    };
    format!(
        "{} {} {:.1} h [{}] {}: {}",
        record.id, record.date, record.quantity, record.status, project, record.description
    )
}

fn application_line(application: &Application, project: &str) -> String {
    let mut line = format!(
        "{} {} ({}) [{}]",
        application.id, project, application.project, application.status
    );
    if let Some(at) = application.responded_at {
        line.push_str(&format!(" on {}", at.format("%Y-%m-%d")));
    }
    if let Some(reason) = &application.rejection_reason {
        line.push_str(&format!(": {reason}"));
    }
    line
}

fn seats(taken: i64, quota: i64) -> String {
    format!("{taken}/{quota} seats")
}

pub fn display_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects.");
        return;
    }
    for p in projects {
        println!(
            "  - {} [{}] {:.1} h, supervised by {}",
            p, p.status, p.granted_hours, p.supervisor
        );
    }
}

pub fn display_project(project: &Project, accepted: i64, application: Option<ApplicationStatus>) {
    println!("{}:", project);
    println!("  {}", project.description);
    println!("  - status: {}", project.status);
    println!("  - supervisor: {}", project.supervisor);
    println!("  - granted hours: {:.1}", project.granted_hours);
    println!("  - {}", seats(accepted, project.quota));
    println!("  - created: {}", project.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(status) = application {
        println!("  - your application: {status}");
    }
}

pub fn display_history(history: &[(Project, Vec<String>)]) {
    for (project, participants) in history {
        println!("{} [{}]:", project, project.status);
        if participants.is_empty() {
            println!("  (no participants)");
        }
        for student in participants {
            println!("  - {student}");
        }
        println!();
    }
}

pub fn display_applications(applications: &[Application]) {
    for a in applications {
        println!(
            "  - {} {} [{}] submitted {}",
            a.id,
            a.student,
            a.status,
            a.submitted_at.format("%Y-%m-%d")
        );
    }
}

pub fn display_student_applications(applications: &[(Application, String)]) {
    for (a, project) in applications {
        println!("  - {}", application_line(a, project));
    }
}

pub fn display_hours(hours: &[(LoggedHour, Option<String>)]) {
    for (record, project) in hours {
        println!("  - {}", hours_line(record, project.as_deref()));
    }
}

/// Hours waiting for review, grouped by year.
pub fn display_review(hours: &[(LoggedHour, String)]) {
    let mut year = None;
    for (record, project) in hours {
        if year != Some(record.year) {
            if year.is_some() {
                println!();
            }
            println!("{}:", record.year);
            year = Some(record.year);
        }
        println!(
            "  - {} ({})",
            hours_line(record, Some(project.as_str())),
            record.student
        );
    }
}

pub fn display_messages(messages: &[Message]) {
    for m in messages {
        print!(
            "{} [{}] {}",
            m.id,
            m.sent_at.format("%Y-%m-%d %H:%M"),
            m.sender
        );
        if let Some(receiver) = &m.receiver {
            print!(" -> {receiver}");
        }
        if let Some(project) = m.project {
            print!(" on project {project}");
        }
        println!(": {}", m.text);
    }
}

pub fn display_notifications(notifications: &[Notification]) {
    for n in notifications {
        print!(
            "  {} {} {}",
            if n.read { " " } else { "*" },
            n.id,
            n.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(year) = n.compliance_year {
            print!(" (key hours {year})");
        }
        println!(": {}", n.text);
    }
}

pub fn display_users(users: &[User]) {
    for u in users {
        print!("  - {} {} [{}]", u.id, u.email, u.role);
        if u.is(Role::Student) {
            print!(" {}%", u.percentage);
        }
        println!();
    }
}

pub fn display_summary(summary: &HoursSummary) {
    println!("Key hours for {} in {}:", summary.student, summary.year);
    println!("  - required: {:.1}", summary.required);
    println!("  - approved: {:.1}", summary.approved);
    println!("  - cumulative: {:.1}", summary.cumulative);
    println!("  - missing: {:.1}", summary.missing);
}

pub fn display_overview(summaries: &[HoursSummary]) {
    let compliant = summaries.iter().filter(|s| s.is_compliant()).count();
    for s in summaries {
        println!(
            "  - {}: {:.1}/{:.1} (cumulative {:.1}){}",
            s.student,
            s.approved,
            s.required,
            s.cumulative,
            if s.is_compliant() {
                String::new()
            } else {
                format!(" missing {:.1}", s.missing)
            }
        );
    }
    println!("Students compliant/total: {}/{}", compliant, summaries.len());
}

pub fn display_compliance(report: &ComplianceReport) {
    if !report.flagged.is_empty() {
        println!("Below required hours in {}:", report.year);
        for s in &report.flagged {
            println!(
                "  - {}: {:.1}/{:.1} (missing {:.1})",
                s.student, s.approved, s.required, s.missing
            );
        }
    }
    if !report.carried.is_empty() {
        println!("Carried over into {}:", report.year + 1);
        for c in &report.carried {
            println!("  - {}: {:.1} h", c.student, c.hours);
        }
    }
    if report.flagged.is_empty() && report.carried.is_empty() {
        println!("Nothing to report for {}.", report.year);
    }
}
