use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Ticket is in the recruiter queue.
    Pending,
    ValidationPending,
    Validated,
    ValidationFailed,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::ValidationPending => "validation_pending",
            ApplicationStatus::Validated => "validated",
            ApplicationStatus::ValidationFailed => "validation_failed",
        }
    }

    /// Edges of the recruitment workflow. `ValidationFailed` is only left by
    /// submitting a new handle, which creates a fresh record.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (ValidationPending, Validated)
                | (ValidationPending, ValidationFailed)
                | (Validated, Pending)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "validation_pending" => Ok(ApplicationStatus::ValidationPending),
            "validated" => Ok(ApplicationStatus::Validated),
            "validation_failed" => Ok(ApplicationStatus::ValidationFailed),
            other => Err(Error::Internal(format!("Unknown application status: {}", other))),
        }
    }
}

/// Fields scraped from the applicant's citizen profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub real_name: Option<String>,
    pub title: Option<String>,
    pub org_name: Option<String>,
    pub org_sid: Option<String>,
    pub org_rank: Option<String>,
    pub enlisted_date: Option<String>,
    pub location: Option<String>,
    pub fluency: Option<String>,
    pub profile_image_url: Option<String>,
    pub org_logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub recruit_id: Option<String>,
    pub recruiter_id: Option<String>,
    pub handle: Option<String>,
    pub validation_code: Option<String>,
    pub status: ApplicationStatus,
    pub profile: ProfileFields,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.recruit_id.as_deref() == Some(user_id)
    }
}

/// Row shape of the `applications` table.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub recruit_id: Option<String>,
    pub recruiter_id: Option<String>,
    pub handle: Option<String>,
    pub validation_code: Option<String>,
    pub status: String,
    pub real_name: Option<String>,
    pub title: Option<String>,
    pub org_name: Option<String>,
    pub org_sid: Option<String>,
    pub org_rank: Option<String>,
    pub enlisted_date: Option<String>,
    pub location: Option<String>,
    pub fluency: Option<String>,
    pub profile_image_url: Option<String>,
    pub org_logo_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            recruit_id: row.recruit_id,
            recruiter_id: row.recruiter_id,
            handle: row.handle,
            validation_code: row.validation_code,
            status: row.status.parse()?,
            profile: ProfileFields {
                real_name: row.real_name,
                title: row.title,
                org_name: row.org_name,
                org_sid: row.org_sid,
                org_rank: row.org_rank,
                enlisted_date: row.enlisted_date,
                location: row.location,
                fluency: row.fluency,
                profile_image_url: row.profile_image_url,
                org_logo_url: row.org_logo_url,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub recruit_id: String,
    pub recruiter_id: Option<String>,
    pub handle: Option<String>,
    pub validation_code: Option<String>,
    pub status: ApplicationStatus,
}

/// Lookup criteria; `None` means "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub id: Uuid,
    pub recruit_id: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id,
            recruit_id: None,
            status: None,
        }
    }

    pub fn owned(id: Uuid, recruit_id: &str, status: ApplicationStatus) -> Self {
        Self {
            id,
            recruit_id: Some(recruit_id.to_string()),
            status: Some(status),
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        application.id == self.id
            && self
                .recruit_id
                .as_deref()
                .map_or(true, |rid| application.is_owned_by(rid))
            && self.status.map_or(true, |s| application.status == s)
    }
}

/// Partial update. `recruiter_id: Some(None)` clears the recruiter.
#[derive(Debug, Clone, Default)]
pub struct ApplicationUpdate {
    pub status: Option<ApplicationStatus>,
    pub recruiter_id: Option<Option<String>>,
    pub profile: Option<ProfileFields>,
}

impl ApplicationUpdate {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_profile(mut self, profile: ProfileFields) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn clear_recruiter(mut self) -> Self {
        self.recruiter_id = Some(None);
        self
    }

    pub fn apply_to(&self, application: &mut Application) {
        if let Some(status) = self.status {
            application.status = status;
        }
        if let Some(recruiter_id) = &self.recruiter_id {
            application.recruiter_id = recruiter_id.clone();
        }
        if let Some(profile) = &self.profile {
            application.profile = profile.clone();
        }
    }
}
