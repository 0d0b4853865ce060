//! Batch requests and validated batch plans

use agent_core::{Error, Result, TaskKind, TaskSpec, parse_date};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Raw, unvalidated batch parameters as given on the command line
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Subject under analysis
    pub subject: String,
    /// Analysis date (`YYYY-MM-DD`); today when unset
    pub as_of: Option<String>,
    /// Task identifiers in run order; every known task when empty
    pub task_ids: Vec<String>,
}

impl BatchRequest {
    /// Request covering every known task for `subject` today
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Set the analysis date
    pub fn as_of(mut self, date: impl Into<String>) -> Self {
        self.as_of = Some(date.into());
        self
    }

    /// Set the task identifiers
    pub fn tasks<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// A validated batch: known, de-duplicated tasks for one subject and date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    subject: String,
    as_of: NaiveDate,
    task_ids: Vec<TaskKind>,
    output_root: PathBuf,
}

impl BatchPlan {
    /// Validate `request` for a batch writing under `output_root`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty or unsafe subject, an
    /// unparseable date, an unknown task identifier or a duplicate.
    pub fn from_request(request: &BatchRequest, output_root: &Path) -> Result<Self> {
        let subject = normalize_subject(&request.subject)?;

        let as_of = match request.as_of.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => Local::now().date_naive(),
        };

        let task_ids = if request.task_ids.is_empty() {
            TaskKind::ALL.to_vec()
        } else {
            let mut seen = HashSet::new();
            let mut ids = Vec::with_capacity(request.task_ids.len());
            for raw in &request.task_ids {
                let kind: TaskKind = raw.parse()?;
                if !seen.insert(kind) {
                    return Err(Error::Config(format!("duplicate task '{kind}'")));
                }
                ids.push(kind);
            }
            ids
        };

        Ok(Self {
            subject,
            as_of,
            task_ids,
            output_root: output_root.to_path_buf(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn task_ids(&self) -> &[TaskKind] {
        &self.task_ids
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// One task spec per planned task, in plan order
    pub fn specs(&self) -> impl Iterator<Item = TaskSpec> + '_ {
        self.task_ids
            .iter()
            .map(|kind| TaskSpec::new(*kind, self.subject.clone(), self.as_of))
    }
}

/// Trim and upper-case a subject, rejecting values unusable as a directory name
pub fn normalize_subject(raw: &str) -> Result<String> {
    let subject = raw.trim().to_uppercase();
    if subject.is_empty() {
        return Err(Error::Config("subject must not be empty".to_string()));
    }
    if subject.contains(['/', '\\']) || subject.contains("..") {
        return Err(Error::Config(format!(
            "subject '{subject}' is not a valid path component"
        )));
    }
    Ok(subject)
}
