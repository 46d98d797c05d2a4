use crate::model::{Role, User};
use crate::store::Store;
use eyre::Result;
use serde::Serialize;

/// Hours of one student for one year.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HoursSummary {
    #[serde(rename = "email")]
    pub student: String,
    pub percentage: i64,
    pub year: i32,
    pub required: f64,
    pub approved: f64,
    pub cumulative: f64,
    pub missing: f64,
}

impl HoursSummary {
    pub fn is_compliant(&self) -> bool {
        self.approved >= self.required
    }
}

pub async fn summary_for(store: &mut Store, student: &User, year: i32) -> Result<HoursSummary> {
    let approved = store.approved_hours_for_year(&student.email, year).await?;
    let cumulative = store.approved_hours_up_to(&student.email, year).await?;
    let required = student.required_hours();
    Ok(HoursSummary {
        student: student.email.clone(),
        percentage: student.percentage,
        year,
        required,
        approved,
        cumulative,
        missing: (required - approved).max(0.0),
    })
}

/// One summary per student, sorted by email.
pub async fn hours_overview(store: &mut Store, year: i32) -> Result<Vec<HoursSummary>> {
    let mut summaries = Vec::new();
    for student in store.users(Some(Role::Student)).await? {
        summaries.push(summary_for(store, &student, year).await?);
    }
    Ok(summaries)
}
