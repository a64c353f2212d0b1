//! Document skeletons used as seeds when adding new nodes to a job.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::JobSpecError;
use crate::model::{JobSpec, Service, Task, TaskGroup};

const JOB_TEMPLATE: &str = include_str!("../templates/job.json");
const GROUP_TEMPLATE: &str = include_str!("../templates/group.json");
const TASK_TEMPLATE: &str = include_str!("../templates/task.json");
const SERVICE_TEMPLATE: &str = include_str!("../templates/service.json");

/// The four skeletons a job document is assembled from.
///
/// Each accessor hands out a fresh deep copy, so mutating a node never
/// leaks back into the skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    job: JobSpec,
    group: TaskGroup,
    task: Task,
    service: Service,
}

impl Templates {
    /// The skeletons compiled into the crate.
    pub fn builtin() -> Self {
        Self::from_sources(JOB_TEMPLATE, GROUP_TEMPLATE, TASK_TEMPLATE, SERVICE_TEMPLATE)
            .expect("embedded job templates are valid")
    }

    /// Load skeletons from `dir`, falling back to the built-in skeleton for
    /// any of `job.json`, `group.json`, `task.json` or `service.json` that is absent.
    pub fn from_dir(dir: &Path) -> Result<Self, JobSpecError> {
        let job = read_or_builtin(dir, "job", JOB_TEMPLATE)?;
        let group = read_or_builtin(dir, "group", GROUP_TEMPLATE)?;
        let task = read_or_builtin(dir, "task", TASK_TEMPLATE)?;
        let service = read_or_builtin(dir, "service", SERVICE_TEMPLATE)?;
        Self::from_sources(&job, &group, &task, &service)
    }

    fn from_sources(job: &str, group: &str, task: &str, service: &str) -> Result<Self, JobSpecError> {
        Ok(Self {
            job: parse("job", job)?,
            group: parse("group", group)?,
            task: parse("task", task)?,
            service: parse("service", service)?,
        })
    }

    pub fn job(&self) -> JobSpec {
        self.job.clone()
    }

    pub fn group(&self) -> TaskGroup {
        self.group.clone()
    }

    pub fn task(&self) -> Task {
        self.task.clone()
    }

    pub fn service(&self) -> Service {
        self.service.clone()
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse<T: DeserializeOwned>(name: &'static str, source: &str) -> Result<T, JobSpecError> {
    serde_json::from_str(source).map_err(|source| JobSpecError::Template { name, source })
}

fn read_or_builtin(dir: &Path, name: &str, builtin: &str) -> Result<String, JobSpecError> {
    let path = dir.join(format!("{name}.json"));
    if !path.exists() {
        return Ok(builtin.to_string());
    }
    tracing::debug!(path = %path.display(), "loading job template override");
    fs::read_to_string(&path).map_err(|source| JobSpecError::Io { path, source })
}
