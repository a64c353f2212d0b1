//! Typed job document tree: job → groups → tasks → services.
//!
//! Field names follow the scheduler's PascalCase wire format. Every struct
//! keeps the fields it does not model in a flattened `extra` map, so a
//! fetched job survives a fetch → mutate → submit cycle untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::lookup::Named;

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Root of a job document, in the shape accepted by the submit endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "Job")]
    pub job: Job,
}

/// Scheduler mode for a job.
///
/// Types this crate does not know are carried as [`JobType::Other`] so a
/// fetched job is never rejected for its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    #[default]
    Service,
    Batch,
    System,
    Sysbatch,
    Other(String),
}

impl JobType {
    pub fn as_str(&self) -> &str {
        match self {
            JobType::Service => "service",
            JobType::Batch => "batch",
            JobType::System => "system",
            JobType::Sysbatch => "sysbatch",
            JobType::Other(name) => name,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for JobType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "service" => JobType::Service,
            "batch" => JobType::Batch,
            "system" => JobType::System,
            "sysbatch" => JobType::Sysbatch,
            _ => JobType::Other(s),
        }
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        match job_type {
            JobType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Strict parse for user input; only the known types are accepted.
impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match JobType::from(s.to_string()) {
            JobType::Other(other) => Err(format!(
                "unknown job type '{other}' (expected service, batch, system or sysbatch)"
            )),
            known => Ok(known),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Type", default)]
    pub job_type: JobType,

    #[serde(rename = "Update", default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateStrategy>,

    /// Opaque placement rules, interpreted only by the scheduler.
    #[serde(rename = "Constraints", default, deserialize_with = "nullable")]
    pub constraints: Vec<Value>,

    #[serde(rename = "TaskGroups", default, deserialize_with = "nullable")]
    pub task_groups: Vec<TaskGroup>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rolling update policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStrategy {
    #[serde(rename = "MaxParallel", default)]
    pub max_parallel: u32,

    /// Delay between update batches, in nanoseconds.
    #[serde(rename = "Stagger", default)]
    pub stagger: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Count", default)]
    pub count: u32,

    #[serde(
        rename = "RestartPolicy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub restart_policy: Option<RestartPolicy>,

    #[serde(
        rename = "EphemeralDisk",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ephemeral_disk: Option<EphemeralDisk>,

    #[serde(rename = "Constraints", default, deserialize_with = "nullable")]
    pub constraints: Vec<Value>,

    #[serde(rename = "Tasks", default, deserialize_with = "nullable")]
    pub tasks: Vec<Task>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Named for TaskGroup {
    fn name(&self) -> &str {
        &self.name
    }
}

/// What the scheduler does once restart attempts run out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    #[default]
    Delay,
    Fail,
}

impl FromStr for RestartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delay" => Ok(RestartMode::Delay),
            "fail" => Ok(RestartMode::Fail),
            other => Err(format!("unknown restart mode '{other}'")),
        }
    }
}

/// Restart policy of a group. Durations are nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicy {
    #[serde(rename = "Interval", default)]
    pub interval: u64,

    #[serde(rename = "Attempts", default)]
    pub attempts: u32,

    #[serde(rename = "Delay", default)]
    pub delay: u64,

    #[serde(rename = "Mode", default)]
    pub mode: RestartMode,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EphemeralDisk {
    #[serde(rename = "SizeMB", default)]
    pub size_mb: u32,

    #[serde(rename = "Migrate", default)]
    pub migrate: bool,

    #[serde(rename = "Sticky", default)]
    pub sticky: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Driver", default)]
    pub driver: String,

    /// Driver configuration. Holds `image`, and optionally `volumes` and `port_map`.
    #[serde(rename = "Config", default, deserialize_with = "nullable")]
    pub config: Map<String, Value>,

    #[serde(rename = "Env", default, deserialize_with = "nullable")]
    pub env: BTreeMap<String, Value>,

    #[serde(rename = "Resources", default, deserialize_with = "nullable")]
    pub resources: Resources,

    #[serde(rename = "LogConfig", default, skip_serializing_if = "Option::is_none")]
    pub log_config: Option<LogConfig>,

    #[serde(rename = "Constraints", default, deserialize_with = "nullable")]
    pub constraints: Vec<Value>,

    #[serde(rename = "Services", default, deserialize_with = "nullable")]
    pub services: Vec<Service>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Named for Task {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// CPU share in MHz.
    #[serde(rename = "CPU", default)]
    pub cpu: u32,

    #[serde(rename = "MemoryMB", default)]
    pub memory_mb: u32,

    #[serde(rename = "Networks", default, deserialize_with = "nullable")]
    pub networks: Vec<NetworkResource>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkResource {
    #[serde(rename = "MBits", default)]
    pub mbits: u32,

    #[serde(rename = "ReservedPorts", default, deserialize_with = "nullable")]
    pub reserved_ports: Vec<Port>,

    #[serde(rename = "DynamicPorts", default, deserialize_with = "nullable")]
    pub dynamic_ports: Vec<Port>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Port {
    #[serde(rename = "Label")]
    pub label: String,

    /// Host port number; 0 asks the scheduler to pick one.
    #[serde(rename = "Value", default)]
    pub value: u16,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Port {
    pub fn new(label: impl Into<String>, value: u16) -> Self {
        Self {
            label: label.into(),
            value,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(rename = "MaxFiles", default)]
    pub max_files: u32,

    #[serde(rename = "MaxFileSizeMB", default)]
    pub max_file_size_mb: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "PortLabel", default)]
    pub port_label: String,

    #[serde(rename = "Tags", default, deserialize_with = "nullable")]
    pub tags: Vec<String>,

    /// Health checks, passed through without validation.
    #[serde(rename = "Checks", default, deserialize_with = "nullable")]
    pub checks: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Named for Service {
    fn name(&self) -> &str {
        &self.name
    }
}
