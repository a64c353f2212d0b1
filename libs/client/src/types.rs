//! Response shapes returned by the scheduler API.
//!
//! Only the fields the toolkit reads are typed; everything else is kept in
//! `extra` so nothing is lost when a response is printed or re-serialized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A blocking-query response: the payload plus the cursor for the next query.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingResponse<T> {
    /// Value of the scheduler's index header; 0 if absent.
    pub index: u64,
    pub value: T,
}

/// One entry of `GET /v1/jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Type", default)]
    pub job_type: String,

    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "Priority", default)]
    pub priority: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Evaluation receipt returned by submit and delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalResponse {
    #[serde(rename = "EvalID", default)]
    pub eval_id: String,

    #[serde(rename = "EvalCreateIndex", default)]
    pub eval_create_index: u64,

    #[serde(rename = "JobModifyIndex", default)]
    pub job_modify_index: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One allocation of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "NodeID", default)]
    pub node_id: String,

    #[serde(rename = "JobID", default)]
    pub job_id: String,

    #[serde(rename = "TaskGroup", default)]
    pub task_group: String,

    #[serde(rename = "DesiredStatus", default)]
    pub desired_status: String,

    #[serde(rename = "ClientStatus", default)]
    pub client_status: String,

    #[serde(rename = "CreateIndex", default)]
    pub create_index: u64,

    #[serde(rename = "ModifyIndex", default)]
    pub modify_index: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The allocations of a job, with a helper to project one field across all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationList {
    pub allocations: Vec<Allocation>,
}

impl AllocationList {
    /// Collect `field` (wire name, e.g. `"ClientStatus"`) from every allocation.
    ///
    /// Allocations without the field contribute `null`, keeping positions aligned.
    pub fn property(&self, field: &str) -> Vec<Value> {
        self.allocations
            .iter()
            .map(|alloc| {
                serde_json::to_value(alloc)
                    .ok()
                    .and_then(|value| value.get(field).cloned())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Allocation> {
        self.allocations.iter()
    }
}

impl From<Vec<Allocation>> for AllocationList {
    fn from(allocations: Vec<Allocation>) -> Self {
        Self { allocations }
    }
}

impl IntoIterator for AllocationList {
    type Item = Allocation;
    type IntoIter = std::vec::IntoIter<Allocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.allocations.into_iter()
    }
}

/// One entry of `GET /v1/nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Datacenter", default)]
    pub datacenter: String,

    #[serde(rename = "NodeClass", default)]
    pub node_class: String,

    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "Drain", default)]
    pub drain: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
