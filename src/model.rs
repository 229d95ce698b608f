use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};

/// The data of a time report, as aggregated by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeReportInput {
    pub title: String,
    pub date_range: String,
    pub user: ReportUser,
    pub projects: Vec<ProjectTimeEntry>,
    pub summary: TimeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUser {
    pub name: String,
    pub email: String,
}

/// The hours logged on one project, with its tasks in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTimeEntry {
    pub name: String,
    pub total_hours: f64,
    pub tasks_completed: u32,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub title: String,
    pub status: String,
    pub hours: f64,
    #[serde(default, with = "timestamp::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSummary {
    pub total_hours: f64,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    /// Percentage, shown as-is even when above 100.
    pub productivity: f64,
}

/// The data of a project report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReportInput {
    pub name: String,
    pub status: String,
    #[serde(with = "timestamp")]
    pub start_date: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub due_date: OffsetDateTime,
    pub progress: f64,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub in_progress_tasks: u32,
    pub pending_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    pub role: String,
}

impl TimeReportInput {
    /// Parses a time report from its JSON representation.
    pub fn from_json_slice(json: &[u8]) -> Result<Self, ContextError> {
        serde_json::from_slice(json).map_err(|error| {
            ContextError::with_error(
                ErrorKind::InvalidInput,
                "Failed to parse the time report data",
                &error,
            )
        })
    }
}

impl ProjectReportInput {
    /// Parses a project report from its JSON representation and validates it.
    pub fn from_json_slice(json: &[u8]) -> Result<Self, ContextError> {
        let input: ProjectReportInput = serde_json::from_slice(json).map_err(|error| {
            ContextError::with_error(
                ErrorKind::InvalidInput,
                "Failed to parse the project report data",
                &error,
            )
        })?;
        input.validate()?;

        Ok(input)
    }

    /// Rejects the values which cannot be displayed meaningfully.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.name.trim().is_empty() {
            return Err(ContextError::with_context(
                ErrorKind::InvalidInput,
                "The project name must not be empty",
            ));
        }
        if !self.progress.is_finite() {
            return Err(ContextError::with_context(
                ErrorKind::InvalidInput,
                format!(
                    "The progress of the project {:?} is not a number: {}",
                    self.name, self.progress
                ),
            ));
        }

        Ok(())
    }
}

/// (De)serialization of timestamps, accepting either RFC 3339 date-times or bare
/// `YYYY-MM-DD` dates (taken as midnight UTC), and always writing RFC 3339.
pub(crate) mod timestamp {
    use serde::{de, Deserialize as _, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{Date, OffsetDateTime};

    pub(crate) fn parse(value: &str) -> Option<OffsetDateTime> {
        if let Ok(date_time) = OffsetDateTime::parse(value, &Rfc3339) {
            return Some(date_time);
        }
        Date::parse(value, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(|date| date.midnight().assume_utc())
    }

    pub fn serialize<S: Serializer>(
        value: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse(&value).ok_or_else(|| {
            de::Error::custom(format!(
                "invalid timestamp {:?}, expected an RFC 3339 date-time or a YYYY-MM-DD date",
                value
            ))
        })
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(value) => parse(&value).map(Some).ok_or_else(|| {
                    de::Error::custom(format!(
                        "invalid timestamp {:?}, expected an RFC 3339 date-time or a YYYY-MM-DD date",
                        value
                    ))
                }),
                None => Ok(None),
            }
        }
    }
}
