//! End of year reconciliation of the hours of every student.

use crate::model::{HourStatus, NewHours, Role};
use crate::store::Store;
use chrono::NaiveDate;
use eyre::{Result, eyre};
use tracing::{debug, info, warn};

/// Differences below this amount of hours are rounding noise.
const EPSILON: f64 = 0.0001;

/// A student who did not reach the required hours.
#[derive(Clone, Debug, PartialEq)]
pub struct Shortfall {
    pub student: String,
    pub required: f64,
    pub approved: f64,
    pub missing: f64,
}

/// Surplus hours moved into the following year.
#[derive(Clone, Debug, PartialEq)]
pub struct CarryOver {
    pub student: String,
    pub hours: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplianceReport {
    pub year: i32,
    pub flagged: Vec<Shortfall>,
    pub carried: Vec<CarryOver>,
}

/// Flag every student below the required hours for `year` and, when
/// `carry_over` is set, move surplus hours into the next year. Running
/// it again does not repeat unread notices nor carry the same surplus
/// twice.
pub async fn check_annual_compliance(
    store: &mut Store,
    year: i32,
    carry_over: bool,
) -> Result<ComplianceReport> {
    let mut report = ComplianceReport {
        year,
        ..ComplianceReport::default()
    };
    for student in store.users(Some(Role::Student)).await? {
        let required = student.required_hours();
        let approved = store.approved_hours_for_year(&student.email, year).await?;
        if approved < required {
            let missing = required - approved;
            if store
                .has_unread_compliance_notice(&student.email, year)
                .await?
            {
                debug!(student = %student, year, "compliance notice already pending");
            } else {
                let text = format!(
                    "Key hours {year}: {required:.1} required, {approved:.1} done, \
                     {missing:.1} missing"
                );
                store
                    .insert_notification(&student.email, &text, Some(year))
                    .await?;
            }
            warn!(student = %student, year, required, approved, "required hours not reached");
            report.flagged.push(Shortfall {
                student: student.email,
                required,
                approved,
                missing,
            });
        } else if carry_over && approved > required {
            let surplus = approved - required;
            let remaining = surplus - store.carried_over_from(&student.email, year).await?;
            if remaining <= EPSILON {
                continue;
            }
            let date = NaiveDate::from_ymd_opt(year + 1, 1, 1)
                .ok_or_else(|| eyre!("year {} is out of range", year + 1))?;
            store
                .insert_hours(&NewHours {
                    student: student.email.clone(),
                    project: None,
                    date,
                    description: format!("Carried over from {year} (surplus: {surplus:.1} h)"),
                    quantity: remaining,
                    status: HourStatus::Approved,
                    carried_from: Some(year),
                })
                .await?;
            info!(student = %student, year, hours = remaining, "surplus carried over");
            report.carried.push(CarryOver {
                student: student.email,
                hours: remaining,
            });
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectId;
    use crate::store::testing;

    async fn approved(
        store: &mut Store,
        student: &str,
        project: ProjectId,
        date: &str,
        quantity: f64,
    ) {
        store
            .insert_hours(&NewHours {
                student: student.to_owned(),
                project: Some(project),
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                description: "work".to_owned(),
                quantity,
                status: HourStatus::Approved,
                carried_from: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_flag_without_duplicate_notices() {
        let mut store = testing::store().await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        approved(&mut store, "ana@key.edu", garden, "2025-04-01", 15.0).await;

        let report = check_annual_compliance(&mut store, 2025, true)
            .await
            .unwrap();
        assert_eq!(
            report.flagged,
            vec![Shortfall {
                student: "ana@key.edu".to_owned(),
                required: 40.0,
                approved: 15.0,
                missing: 25.0,
            }]
        );
        assert!(report.carried.is_empty());
        let notices = store.notifications_for("ana@key.edu", false).await.unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].compliance_year, Some(2025));
        assert!(notices[0].text.contains("25.0 missing"));

        check_annual_compliance(&mut store, 2025, true)
            .await
            .unwrap();
        let all = store.notifications_for("ana@key.edu", false).await;
        assert_eq!(all.unwrap().len(), 1);
        // Once read, the next run sends a fresh notice.
        store.mark_notification_read(notices[0].id).await.unwrap();
        check_annual_compliance(&mut store, 2025, true)
            .await
            .unwrap();
        let unread = store.notifications_for("ana@key.edu", true).await;
        assert_eq!(unread.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_carry_over_is_idempotent() {
        let mut store = testing::store().await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        testing::session(&mut store, "ana@key.edu", Role::Student, 40).await;
        testing::session(&mut store, "bob@key.edu", Role::Student, 10).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        approved(&mut store, "ana@key.edu", garden, "2025-04-01", 52.5).await;
        approved(&mut store, "bob@key.edu", garden, "2025-04-01", 10.0).await;

        let report = check_annual_compliance(&mut store, 2025, true)
            .await
            .unwrap();
        assert!(report.flagged.is_empty());
        assert_eq!(
            report.carried,
            vec![CarryOver {
                student: "ana@key.edu".to_owned(),
                hours: 12.5,
            }]
        );
        let next_year = store.approved_hours_for_year("ana@key.edu", 2026).await;
        assert_eq!(next_year.unwrap(), 12.5);
        let (record, project) = store
            .hours_of_student("ana@key.edu")
            .await
            .unwrap()
            .remove(0);
        assert_eq!(record.carried_from, Some(2025));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(project, None);

        let again = check_annual_compliance(&mut store, 2025, true)
            .await
            .unwrap();
        assert!(again.carried.is_empty());
        let next_year = store.approved_hours_for_year("ana@key.edu", 2026).await;
        assert_eq!(next_year.unwrap(), 12.5);

        // More hours approved later are carried over on the next run.
        approved(&mut store, "ana@key.edu", garden, "2025-12-01", 2.0).await;
        let later = check_annual_compliance(&mut store, 2025, true)
            .await
            .unwrap();
        assert_eq!(later.carried[0].hours, 2.0);
        let carried = store.carried_over_from("ana@key.edu", 2025).await;
        assert_eq!(carried.unwrap(), 14.5);
    }

    #[tokio::test]
    async fn test_carry_over_disabled() {
        let mut store = testing::store().await;
        testing::session(&mut store, "boss@key.edu", Role::Supervisor, 0).await;
        testing::session(&mut store, "ana@key.edu", Role::Student, 10).await;
        let garden = testing::project(&mut store, "Garden", "boss@key.edu", 3).await;
        approved(&mut store, "ana@key.edu", garden, "2025-04-01", 30.0).await;
        let report = check_annual_compliance(&mut store, 2025, false)
            .await
            .unwrap();
        let empty = ComplianceReport {
            year: 2025,
            ..ComplianceReport::default()
        };
        assert_eq!(report, empty);
        let next_year = store.approved_hours_for_year("ana@key.edu", 2026).await;
        assert_eq!(next_year.unwrap(), 0.0);
    }
}
