use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApplicationStatus {
    Applied,
    Interview,
    Rejected,
    Offer,
    #[serde(rename = "Followed Up")]
    FollowedUp,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interview,
        ApplicationStatus::Rejected,
        ApplicationStatus::Offer,
        ApplicationStatus::FollowedUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::FollowedUp => "Followed Up",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// The persisted fields of one job application: exactly one ledger CSV row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub date: NaiveDate,
    pub platform: String,
    pub company: String,
    pub job_link: String,
    pub status: ApplicationStatus,
    pub notes: String,
    /// Relative path of the uploaded resume, e.g. `uploaded_resumes/<file>`.
    pub resume: Option<String>,
}

/// An application held in the in-memory ledger.
/// `id` is assigned on creation or load and is not written to the CSV.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApplicationRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub application: Application,
}

impl ApplicationRecord {
    pub fn new(application: Application) -> Self {
        Self {
            id: Uuid::new_v4(),
            application,
        }
    }
}

/// Fields editable after logging. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationUpdate {
    pub platform: Option<String>,
    pub company: Option<String>,
    pub job_link: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub notes: Option<String>,
}

impl ApplicationUpdate {
    pub fn apply(self, app: &mut Application) {
        if let Some(platform) = self.platform {
            app.platform = platform;
        }
        if let Some(company) = self.company {
            app.company = company;
        }
        if let Some(job_link) = self.job_link {
            app.job_link = job_link;
        }
        if let Some(status) = self.status {
            app.status = status;
        }
        if let Some(notes) = self.notes {
            app.notes = notes;
        }
    }
}
