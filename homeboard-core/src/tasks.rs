//! The household task list.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HomeboardResult;
use crate::persist::{decode_records, read_if_exists};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Med,
    High,
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Importance::Low => write!(f, "low"),
            Importance::Med => write!(f, "med"),
            Importance::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub importance: Option<Importance>,
}

/// Reads `sample_tasks.json`. Tasks are read-only here.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TaskStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> HomeboardResult<Vec<Task>> {
        match read_if_exists(&self.path)? {
            Some(content) => decode_records(&content, "task"),
            None => {
                debug!(path = %self.path.display(), "no task file");
                Ok(Vec::new())
            }
        }
    }

    pub fn due_today(&self, today: NaiveDate) -> HomeboardResult<Vec<Task>> {
        self.filtered(|due| due == today)
    }

    pub fn overdue(&self, today: NaiveDate) -> HomeboardResult<Vec<Task>> {
        self.filtered(|due| due < today)
    }

    /// Due between today and a week from today, both inclusive.
    pub fn this_week(&self, today: NaiveDate) -> HomeboardResult<Vec<Task>> {
        let end = today + TimeDelta::days(7);
        self.filtered(|due| today <= due && due <= end)
    }

    fn filtered(&self, keep: impl Fn(NaiveDate) -> bool) -> HomeboardResult<Vec<Task>> {
        Ok(self.load()?.into_iter().filter(|task| keep(task.due_date)).collect())
    }
}
