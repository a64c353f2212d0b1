//! Mutation and query API over a single job document.
//!
//! Every operation aimed at a group, task or service resolves its target by
//! name first (see [`crate::lookup`]). A missing target is reported as
//! [`JobSpecError::NotFound`] and leaves the document untouched; use
//! [`crate::ResultExt::ignore_missing`] to get the lenient no-op behaviour.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{JobSpecError, NodeKind};
use crate::lookup::{find_by_name, find_by_name_mut};
use crate::model::{
    EphemeralDisk, JobSpec, JobType, LogConfig, NetworkResource, Port, RestartMode,
    RestartPolicy, Service, Task, TaskGroup, UpdateStrategy,
};
use crate::templates::Templates;

/// Driver config key holding the docker image.
const IMAGE_KEY: &str = "image";
/// Driver config key holding host volume mounts.
const VOLUMES_KEY: &str = "volumes";
/// Driver config key holding the single consolidated port mapping table.
const PORT_MAP_KEY: &str = "port_map";

/// How a port is allocated on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// A fixed host port.
    Static(u16),
    /// A scheduler-assigned host port, optionally mapped to a container port.
    Dynamic { mapped: Option<u16> },
}

/// A job document together with the skeletons used to grow it.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    spec: JobSpec,
    templates: Arc<Templates>,
}

impl JobTemplate {
    /// Start a new job from the built-in job skeleton.
    pub fn new(name: &str) -> Self {
        Self::with_templates(name, Arc::new(Templates::builtin()))
    }

    /// Start a new job from a caller-supplied skeleton set.
    pub fn with_templates(name: &str, templates: Arc<Templates>) -> Self {
        let mut spec = templates.job();
        spec.job.id = name.to_string();
        spec.job.name = name.to_string();
        Self { spec, templates }
    }

    /// Wrap an existing document, e.g. one fetched from the scheduler.
    pub fn from_spec(spec: JobSpec) -> Self {
        Self::from_spec_with_templates(spec, Arc::new(Templates::builtin()))
    }

    pub fn from_spec_with_templates(spec: JobSpec, templates: Arc<Templates>) -> Self {
        Self { spec, templates }
    }

    /// Parse a `{"Job": {...}}` document.
    pub fn from_json(json: &str) -> Result<Self, JobSpecError> {
        Ok(Self::from_spec(serde_json::from_str(json)?))
    }

    pub fn to_json(&self) -> Result<String, JobSpecError> {
        Ok(serde_json::to_string(&self.spec)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, JobSpecError> {
        Ok(serde_json::to_string_pretty(&self.spec)?)
    }

    /// Borrowed view of the live document.
    pub fn job(&self) -> &JobSpec {
        &self.spec
    }

    /// Deep copy of the document, detached from later mutations.
    pub fn snapshot(&self) -> JobSpec {
        self.spec.clone()
    }

    pub fn into_spec(self) -> JobSpec {
        self.spec
    }

    pub fn id(&self) -> &str {
        &self.spec.job.id
    }

    // ---------------------------------------------------------------------
    // Job level
    // ---------------------------------------------------------------------

    pub fn set_type(&mut self, job_type: JobType) {
        self.spec.job.job_type = job_type;
    }

    pub fn set_update(&mut self, max_parallel: u32, stagger: Duration) {
        let update = self
            .spec
            .job
            .update
            .get_or_insert_with(UpdateStrategy::default);
        update.max_parallel = max_parallel;
        update.stagger = nanos(stagger);
    }

    /// Append a new group seeded from the group skeleton.
    ///
    /// Returns false and changes nothing if a group with this name exists.
    pub fn add_group(&mut self, name: &str) -> bool {
        if find_by_name(&self.spec.job.task_groups, name).is_some() {
            debug!(group = name, "group already exists, skipping");
            return false;
        }
        let mut group = self.templates.group();
        group.name = name.to_string();
        self.spec.job.task_groups.push(group);
        true
    }

    pub fn group(&self, group: &str) -> Result<&TaskGroup, JobSpecError> {
        find_by_name(&self.spec.job.task_groups, group)
            .ok_or_else(|| JobSpecError::not_found(NodeKind::Group, group))
    }

    pub fn task(&self, group: &str, task: &str) -> Result<&Task, JobSpecError> {
        find_by_name(&self.group(group)?.tasks, task)
            .ok_or_else(|| JobSpecError::not_found(NodeKind::Task, task))
    }

    pub fn service(&self, group: &str, task: &str, service: &str) -> Result<&Service, JobSpecError> {
        find_by_name(&self.task(group, task)?.services, service)
            .ok_or_else(|| JobSpecError::not_found(NodeKind::Service, service))
    }

    fn group_mut(&mut self, group: &str) -> Result<&mut TaskGroup, JobSpecError> {
        find_by_name_mut(&mut self.spec.job.task_groups, group)
            .ok_or_else(|| JobSpecError::not_found(NodeKind::Group, group))
    }

    fn task_mut(&mut self, group: &str, task: &str) -> Result<&mut Task, JobSpecError> {
        find_by_name_mut(&mut self.group_mut(group)?.tasks, task)
            .ok_or_else(|| JobSpecError::not_found(NodeKind::Task, task))
    }

    fn service_mut(
        &mut self,
        group: &str,
        task: &str,
        service: &str,
    ) -> Result<&mut Service, JobSpecError> {
        find_by_name_mut(&mut self.task_mut(group, task)?.services, service)
            .ok_or_else(|| JobSpecError::not_found(NodeKind::Service, service))
    }

    // ---------------------------------------------------------------------
    // Group level
    // ---------------------------------------------------------------------

    /// Append a task seeded from the task skeleton. Duplicate names are allowed.
    pub fn add_task(&mut self, group: &str, name: &str) -> Result<(), JobSpecError> {
        let mut task = self.templates.task();
        task.name = name.to_string();
        self.group_mut(group)?.tasks.push(task);
        Ok(())
    }

    pub fn count(&self, group: &str) -> Result<u32, JobSpecError> {
        Ok(self.group(group)?.count)
    }

    pub fn set_count(&mut self, group: &str, count: u32) -> Result<(), JobSpecError> {
        self.group_mut(group)?.count = count;
        Ok(())
    }

    /// Replace the group's restart policy. Fields not modelled here are kept.
    pub fn set_restart_policy(
        &mut self,
        group: &str,
        interval: Duration,
        attempts: u32,
        delay: Duration,
        mode: RestartMode,
    ) -> Result<(), JobSpecError> {
        let policy = &mut self.group_mut(group)?.restart_policy;
        let extra = policy.take().map(|old| old.extra).unwrap_or_default();
        *policy = Some(RestartPolicy {
            interval: nanos(interval),
            attempts,
            delay: nanos(delay),
            mode,
            extra,
        });
        Ok(())
    }

    pub fn set_ephemeral_disk(
        &mut self,
        group: &str,
        size_mb: u32,
        migrate: bool,
        sticky: bool,
    ) -> Result<(), JobSpecError> {
        let disk = self
            .group_mut(group)?
            .ephemeral_disk
            .get_or_insert_with(EphemeralDisk::default);
        disk.size_mb = size_mb;
        disk.migrate = migrate;
        disk.sticky = sticky;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Task level
    // ---------------------------------------------------------------------

    pub fn set_image(&mut self, group: &str, task: &str, image: &str) -> Result<(), JobSpecError> {
        self.task_mut(group, task)?
            .config
            .insert(IMAGE_KEY.to_string(), Value::from(image));
        Ok(())
    }

    /// Add a port to the task's first network block.
    ///
    /// A dynamic port with a mapped number also records `label -> number`
    /// in the sole element of the driver's `port_map` list.
    pub fn add_port(
        &mut self,
        group: &str,
        task: &str,
        label: &str,
        kind: PortKind,
    ) -> Result<(), JobSpecError> {
        let task = self.task_mut(group, task)?;
        match kind {
            PortKind::Static(number) => {
                primary_network(task)?
                    .reserved_ports
                    .push(Port::new(label, number));
            }
            PortKind::Dynamic { mapped } => {
                primary_network(task)?.dynamic_ports.push(Port::new(label, 0));
                if let Some(number) = mapped {
                    map_port(&mut task.config, label, number);
                }
            }
        }
        Ok(())
    }

    /// Insert or overwrite one environment variable. The value must be a
    /// string, number or boolean.
    pub fn add_env(
        &mut self,
        group: &str,
        task: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), JobSpecError> {
        let value = value.into();
        if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
            return Err(JobSpecError::InvalidEnv {
                key: key.to_string(),
                value,
            });
        }
        self.task_mut(group, task)?
            .env
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Mount a host path into the container.
    pub fn add_volume(&mut self, group: &str, task: &str, path: &str) -> Result<(), JobSpecError> {
        let config = &mut self.task_mut(group, task)?.config;
        let volumes = config
            .entry(VOLUMES_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        match volumes {
            Value::Array(list) => list.push(Value::from(path)),
            other => *other = Value::Array(vec![Value::from(path)]),
        }
        Ok(())
    }

    pub fn set_cpu(&mut self, group: &str, task: &str, mhz: u32) -> Result<(), JobSpecError> {
        self.task_mut(group, task)?.resources.cpu = mhz;
        Ok(())
    }

    pub fn set_memory(&mut self, group: &str, task: &str, mb: u32) -> Result<(), JobSpecError> {
        self.task_mut(group, task)?.resources.memory_mb = mb;
        Ok(())
    }

    /// Set the bandwidth of the task's first network block.
    pub fn set_mbits(&mut self, group: &str, task: &str, mbits: u32) -> Result<(), JobSpecError> {
        primary_network(self.task_mut(group, task)?)?.mbits = mbits;
        Ok(())
    }

    /// Set log rotation: how many files to keep and the size of each.
    pub fn set_logs(
        &mut self,
        group: &str,
        task: &str,
        max_files: u32,
        max_file_size_mb: u32,
    ) -> Result<(), JobSpecError> {
        let logs = self
            .task_mut(group, task)?
            .log_config
            .get_or_insert_with(LogConfig::default);
        logs.max_files = max_files;
        logs.max_file_size_mb = max_file_size_mb;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Service level
    // ---------------------------------------------------------------------

    /// Append a service seeded from the service skeleton. Duplicate names are allowed.
    pub fn add_service(&mut self, group: &str, task: &str, name: &str) -> Result<(), JobSpecError> {
        let mut service = self.templates.service();
        service.name = name.to_string();
        self.task_mut(group, task)?.services.push(service);
        Ok(())
    }

    pub fn add_tag(
        &mut self,
        group: &str,
        task: &str,
        service: &str,
        tag: &str,
    ) -> Result<(), JobSpecError> {
        self.service_mut(group, task, service)?
            .tags
            .push(tag.to_string());
        Ok(())
    }

    pub fn set_port_label(
        &mut self,
        group: &str,
        task: &str,
        service: &str,
        port_label: &str,
    ) -> Result<(), JobSpecError> {
        self.service_mut(group, task, service)?.port_label = port_label.to_string();
        Ok(())
    }

    /// Append a health check. The check object is not validated.
    pub fn add_check(
        &mut self,
        group: &str,
        task: &str,
        service: &str,
        check: Value,
    ) -> Result<(), JobSpecError> {
        self.service_mut(group, task, service)?.checks.push(check);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Constraints
    // ---------------------------------------------------------------------

    /// Append a constraint at job, group or task level.
    ///
    /// - no group: job level
    /// - group only: that group
    /// - group and task: that task
    ///
    /// A task given without a group is ignored and the constraint lands on
    /// the job. Empty names count as absent.
    pub fn add_constraint(
        &mut self,
        constraint: Value,
        group: Option<&str>,
        task: Option<&str>,
    ) -> Result<(), JobSpecError> {
        let group = group.filter(|g| !g.is_empty());
        let task = task.filter(|t| !t.is_empty());

        match (group, task) {
            (None, task) => {
                if let Some(task) = task {
                    debug!(task, "constraint names a task but no group, placing at job level");
                }
                self.spec.job.constraints.push(constraint);
            }
            (Some(group), None) => self.group_mut(group)?.constraints.push(constraint),
            (Some(group), Some(task)) => self.task_mut(group, task)?.constraints.push(constraint),
        }
        Ok(())
    }
}

/// Network operations only support the first network block of a task.
fn primary_network(task: &mut Task) -> Result<&mut NetworkResource, JobSpecError> {
    let name = task.name.clone();
    task.resources
        .networks
        .first_mut()
        .ok_or(JobSpecError::MissingNetwork { task: name })
}

/// Record `label -> number` in the single mapping table inside
/// `Config.port_map`, creating the list on first use.
fn map_port(config: &mut Map<String, Value>, label: &str, number: u16) {
    let list = config
        .entry(PORT_MAP_KEY)
        .or_insert_with(|| Value::Array(vec![Value::Object(Map::new())]));
    if let Some(Value::Object(table)) = list.as_array_mut().and_then(|items| items.first_mut()) {
        table.insert(label.to_string(), Value::from(number));
        return;
    }

    debug!(existing = %list, "resetting malformed port_map");
    let mut table = Map::new();
    table.insert(label.to_string(), Value::from(number));
    *list = Value::Array(vec![Value::Object(table)]);
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::error::ResultExt;

    fn web() -> JobTemplate {
        let mut tpl = JobTemplate::new("web");
        tpl.add_group("api");
        tpl.add_task("api", "server").unwrap();
        tpl
    }

    #[test]
    fn new_job_sets_id_and_name() {
        let tpl = JobTemplate::new("web");
        assert_eq!(tpl.job().job.id, "web");
        assert_eq!(tpl.job().job.name, "web");
        assert!(tpl.job().job.task_groups.is_empty());
    }

    #[test]
    fn scenario_web_api_server() {
        let mut tpl = web();
        assert_eq!(tpl.count("api").unwrap(), 1);
        tpl.set_image("api", "server", "nginx:latest").unwrap();
        tpl.add_port("api", "server", "http", PortKind::Static(8080))
            .unwrap();

        let doc = serde_json::to_value(tpl.job()).unwrap();
        let task = &doc["Job"]["TaskGroups"][0]["Tasks"][0];
        assert_eq!(task["Config"]["image"], "nginx:latest");
        assert_eq!(
            task["Resources"]["Networks"][0]["ReservedPorts"][0],
            json!({"Label": "http", "Value": 8080})
        );
    }

    #[test]
    fn duplicate_group_is_ignored_but_tasks_and_services_duplicate() {
        let mut tpl = web();
        assert!(!tpl.add_group("api"));
        assert_eq!(tpl.job().job.task_groups.len(), 1);

        tpl.add_task("api", "server").unwrap();
        assert_eq!(tpl.group("api").unwrap().tasks.len(), 2);

        tpl.add_service("api", "server", "http").unwrap();
        tpl.add_service("api", "server", "http").unwrap();
        assert_eq!(tpl.task("api", "server").unwrap().services.len(), 2);
        assert_eq!(tpl.group("api").unwrap().tasks[0].services.len(), 0);
    }

    #[test]
    fn mutators_target_last_duplicate_task() {
        let mut tpl = web();
        tpl.add_task("api", "server").unwrap();
        tpl.set_cpu("api", "server", 750).unwrap();

        let tasks = &tpl.group("api").unwrap().tasks;
        assert_eq!(tasks[0].resources.cpu, 100);
        assert_eq!(tasks[1].resources.cpu, 750);
    }

    #[test]
    fn missing_targets_leave_document_untouched() {
        let mut tpl = web();
        let before = tpl.snapshot();

        let err = tpl.add_task("db", "postgres").unwrap_err();
        assert!(matches!(err, JobSpecError::NotFound { kind: NodeKind::Group, .. }));
        assert!(tpl.set_count("db", 3).ignore_missing().unwrap().is_none());
        assert!(tpl.set_image("api", "worker", "busybox").is_err());
        assert!(tpl.add_tag("api", "server", "missing", "v1").is_err());
        assert!(tpl.count("db").is_err());

        assert_eq!(tpl.snapshot(), before);
    }

    #[test]
    fn set_count_and_update() {
        let mut tpl = web();
        tpl.set_count("api", 4).unwrap();
        tpl.set_type(JobType::Batch);
        tpl.set_update(2, Duration::from_secs(30));

        assert_eq!(tpl.count("api").unwrap(), 4);
        assert_eq!(tpl.job().job.job_type, JobType::Batch);
        let update = tpl.job().job.update.as_ref().unwrap();
        assert_eq!(update.max_parallel, 2);
        assert_eq!(update.stagger, 30_000_000_000);
    }

    #[test]
    fn restart_policy_is_replaced_wholesale() {
        let mut tpl = web();
        tpl.set_restart_policy(
            "api",
            Duration::from_secs(60),
            3,
            Duration::from_secs(5),
            RestartMode::Fail,
        )
        .unwrap();

        let policy = tpl.group("api").unwrap().restart_policy.clone().unwrap();
        assert_eq!(
            policy,
            RestartPolicy {
                interval: 60_000_000_000,
                attempts: 3,
                delay: 5_000_000_000,
                mode: RestartMode::Fail,
                extra: Map::new(),
            }
        );
    }

    #[test]
    fn ephemeral_disk_and_logs() {
        let mut tpl = web();
        tpl.set_ephemeral_disk("api", 1024, true, true).unwrap();
        tpl.set_logs("api", "server", 3, 20).unwrap();

        let disk = tpl.group("api").unwrap().ephemeral_disk.clone().unwrap();
        assert_eq!((disk.size_mb, disk.migrate, disk.sticky), (1024, true, true));
        let logs = tpl.task("api", "server").unwrap().log_config.clone().unwrap();
        assert_eq!((logs.max_files, logs.max_file_size_mb), (3, 20));
    }

    #[test]
    fn dynamic_port_without_mapping_leaves_config_alone() {
        let mut tpl = web();
        let config_before = tpl.task("api", "server").unwrap().config.clone();

        tpl.add_port("api", "server", "metrics", PortKind::Dynamic { mapped: None })
            .unwrap();

        let task = tpl.task("api", "server").unwrap();
        assert_eq!(
            task.resources.networks[0].dynamic_ports,
            vec![Port::new("metrics", 0)]
        );
        assert_eq!(task.config, config_before);
    }

    #[test]
    fn dynamic_ports_share_one_port_map_entry() {
        let mut tpl = web();
        tpl.add_port("api", "server", "http", PortKind::Dynamic { mapped: Some(80) })
            .unwrap();
        tpl.add_port("api", "server", "https", PortKind::Dynamic { mapped: Some(443) })
            .unwrap();

        let task = tpl.task("api", "server").unwrap();
        assert_eq!(task.config["port_map"], json!([{"http": 80, "https": 443}]));
        assert_eq!(task.resources.networks[0].dynamic_ports.len(), 2);
        assert!(task.resources.networks[0].reserved_ports.is_empty());
    }

    #[test]
    fn malformed_port_map_is_replaced() {
        let mut tpl = web();
        tpl.task_mut("api", "server")
            .unwrap()
            .config
            .insert("port_map".into(), json!({"http": 80}));

        tpl.add_port("api", "server", "db", PortKind::Dynamic { mapped: Some(5432) })
            .unwrap();
        assert_eq!(
            tpl.task("api", "server").unwrap().config["port_map"],
            json!([{"db": 5432}])
        );
    }

    #[test]
    fn network_operations_require_a_network_block() {
        let mut tpl = web();
        tpl.group_mut("api").unwrap().tasks[0]
            .resources
            .networks
            .clear();

        let err = tpl.set_mbits("api", "server", 50).unwrap_err();
        assert!(matches!(err, JobSpecError::MissingNetwork { .. }));
        let err = tpl
            .add_port("api", "server", "http", PortKind::Static(80))
            .unwrap_err();
        assert!(matches!(err, JobSpecError::MissingNetwork { .. }));
        assert!(tpl
            .set_mbits("api", "server", 50)
            .ignore_missing()
            .is_err());
    }

    #[test]
    fn set_mbits_touches_first_network_only() {
        let mut tpl = web();
        tpl.group_mut("api").unwrap().tasks[0]
            .resources
            .networks
            .push(NetworkResource::default());
        tpl.set_mbits("api", "server", 25).unwrap();

        let networks = &tpl.task("api", "server").unwrap().resources.networks;
        assert_eq!(networks[0].mbits, 25);
        assert_eq!(networks[1].mbits, 0);
    }

    #[test]
    fn env_volumes_and_resources() {
        let mut tpl = web();
        tpl.add_env("api", "server", "PORT", "${NOMAD_PORT_http}").unwrap();
        tpl.add_env("api", "server", "WORKERS", 4).unwrap();
        tpl.add_env("api", "server", "PORT", "8080").unwrap();
        tpl.add_volume("api", "server", "/data:/data").unwrap();
        tpl.add_volume("api", "server", "/logs:/logs").unwrap();
        tpl.set_cpu("api", "server", 500).unwrap();
        tpl.set_memory("api", "server", 512).unwrap();

        let err = tpl
            .add_env("api", "server", "HOSTS", json!(["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, JobSpecError::InvalidEnv { ref key, .. } if key == "HOSTS"));
        assert!(tpl.add_env("api", "server", "UNSET", Value::Null).is_err());

        let task = tpl.task("api", "server").unwrap();
        assert!(!task.env.contains_key("HOSTS"));
        assert_eq!(task.env["PORT"], "8080");
        assert_eq!(task.env["WORKERS"], 4);
        assert_eq!(task.config["volumes"], json!(["/data:/data", "/logs:/logs"]));
        assert_eq!(task.resources.cpu, 500);
        assert_eq!(task.resources.memory_mb, 512);
    }

    #[test]
    fn service_tags_labels_and_checks() {
        let mut tpl = web();
        tpl.add_service("api", "server", "web-http").unwrap();
        tpl.add_tag("api", "server", "web-http", "urlprefix-/").unwrap();
        tpl.set_port_label("api", "server", "web-http", "http").unwrap();
        let check = json!({"Type": "http", "Path": "/health", "Interval": 10_000_000_000u64});
        tpl.add_check("api", "server", "web-http", check.clone()).unwrap();

        let service = tpl.service("api", "server", "web-http").unwrap();
        assert_eq!(service.tags, vec!["urlprefix-/".to_string()]);
        assert_eq!(service.port_label, "http");
        assert_eq!(service.checks, vec![check]);
    }

    #[derive(Debug, PartialEq)]
    enum Level {
        Job,
        Group,
        Task,
    }

    #[rstest]
    #[case(None, None, Level::Job)]
    #[case(Some("api"), None, Level::Group)]
    #[case(Some("api"), Some("server"), Level::Task)]
    #[case(None, Some("server"), Level::Job)]
    #[case(Some(""), Some("server"), Level::Job)]
    fn constraint_placement(
        #[case] group: Option<&str>,
        #[case] task: Option<&str>,
        #[case] expected: Level,
    ) {
        let mut tpl = web();
        let constraint = json!({"LTarget": "${attr.kernel.name}", "RTarget": "linux", "Operand": "="});
        tpl.add_constraint(constraint.clone(), group, task).unwrap();

        let job = &tpl.job().job;
        let at = |level: Level| match level {
            Level::Job => &job.constraints,
            Level::Group => &job.task_groups[0].constraints,
            Level::Task => &job.task_groups[0].tasks[0].constraints,
        };
        for level in [Level::Job, Level::Group, Level::Task] {
            let expect_here = level == expected;
            assert_eq!(at(level).contains(&constraint), expect_here);
        }
    }

    #[test]
    fn constraint_on_missing_group_is_not_found() {
        let mut tpl = web();
        let err = tpl
            .add_constraint(json!({"Operand": "distinct_hosts"}), Some("db"), None)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(tpl.job().job.constraints.is_empty());
    }

    #[test]
    fn json_round_trip_is_structurally_identical() {
        let mut tpl = web();
        tpl.set_image("api", "server", "nginx:latest").unwrap();
        tpl.add_port("api", "server", "http", PortKind::Dynamic { mapped: Some(80) })
            .unwrap();
        tpl.add_service("api", "server", "web").unwrap();
        tpl.add_constraint(json!({"Operand": "distinct_hosts"}), None, None)
            .unwrap();

        let json = tpl.to_json().unwrap();
        let parsed = JobTemplate::from_json(&json).unwrap();
        assert_eq!(parsed.job(), tpl.job());
        assert_eq!(
            serde_json::from_str::<Value>(&json).unwrap(),
            serde_json::to_value(parsed.job()).unwrap()
        );
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut tpl = web();
        let snapshot = tpl.snapshot();
        tpl.set_count("api", 9).unwrap();
        assert_eq!(snapshot.job.task_groups[0].count, 1);
    }
}
