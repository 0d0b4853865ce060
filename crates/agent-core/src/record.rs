//! Terminal result records
//!
//! A [`ResultRecord`] is written once by the task runner and read many times
//! afterwards. Exactly one of `report_text` and `failure_reason` is set; the
//! constructors and the deserializer both enforce this.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TaskKind;

/// Terminal status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The task reached `Finalize` with a producer message
    Completed,
    /// The task crashed, timed out, or never produced anything
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Completed => f.write_str("completed"),
            TaskStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Durable, immutable outcome of one task execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr", into = "RecordRepr")]
pub struct ResultRecord {
    task_id: TaskKind,
    subject: String,
    as_of: NaiveDate,
    produced_at: DateTime<Utc>,
    outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Report(String),
    Failure(String),
}

impl ResultRecord {
    /// A completed record carrying the final report
    pub fn completed(
        task_id: TaskKind,
        subject: impl Into<String>,
        as_of: NaiveDate,
        report_text: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            subject: subject.into(),
            as_of,
            produced_at: Utc::now(),
            outcome: Outcome::Report(report_text.into()),
        }
    }

    /// A failed record carrying the reason
    pub fn failed(
        task_id: TaskKind,
        subject: impl Into<String>,
        as_of: NaiveDate,
        failure_reason: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            subject: subject.into(),
            as_of,
            produced_at: Utc::now(),
            outcome: Outcome::Failure(failure_reason.into()),
        }
    }

    /// Override the production timestamp
    pub fn with_produced_at(mut self, produced_at: DateTime<Utc>) -> Self {
        self.produced_at = produced_at;
        self
    }

    pub fn task_id(&self) -> TaskKind {
        self.task_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn status(&self) -> TaskStatus {
        match self.outcome {
            Outcome::Report(_) => TaskStatus::Completed,
            Outcome::Failure(_) => TaskStatus::Failed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TaskStatus::Completed
    }

    /// The final report, present only on completed records
    pub fn report_text(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Report(text) => Some(text),
            Outcome::Failure(_) => None,
        }
    }

    /// Why the task failed, present only on failed records
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Report(_) => None,
            Outcome::Failure(reason) => Some(reason),
        }
    }
}

/// On-disk shape of a record
#[derive(Serialize, Deserialize)]
struct RecordRepr {
    task_id: TaskKind,
    subject: String,
    as_of: NaiveDate,
    produced_at: DateTime<Utc>,
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

impl TryFrom<RecordRepr> for ResultRecord {
    type Error = String;

    fn try_from(repr: RecordRepr) -> std::result::Result<Self, Self::Error> {
        let outcome = match (repr.status, repr.report_text, repr.failure_reason) {
            (TaskStatus::Completed, Some(text), None) => Outcome::Report(text),
            (TaskStatus::Failed, None, Some(reason)) => Outcome::Failure(reason),
            (status, _, _) => {
                return Err(format!(
                    "a {status} record must carry exactly one of report_text (completed) or failure_reason (failed)"
                ));
            }
        };

        Ok(Self {
            task_id: repr.task_id,
            subject: repr.subject,
            as_of: repr.as_of,
            produced_at: repr.produced_at,
            outcome,
        })
    }
}

impl From<ResultRecord> for RecordRepr {
    fn from(record: ResultRecord) -> Self {
        let status = record.status();
        let (report_text, failure_reason) = match record.outcome {
            Outcome::Report(text) => (Some(text), None),
            Outcome::Failure(reason) => (None, Some(reason)),
        };
        Self {
            task_id: record.task_id,
            subject: record.subject,
            as_of: record.as_of,
            produced_at: record.produced_at,
            status,
            report_text,
            failure_reason,
        }
    }
}
