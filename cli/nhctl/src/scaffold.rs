//! `nh jobs init`: assemble a job document from the skeletons and flags.

use std::sync::Arc;

use clap::Args;
use nh_jobspec::{JobSpecError, JobTemplate, JobType, PortKind, Templates};
use serde_json::json;

/// Flags describing a single-group, single-task job.
#[derive(Debug, Args)]
pub struct ScaffoldArgs {
    /// Job name, also used as its ID.
    pub name: String,

    /// Scheduler type (service, batch, system, sysbatch).
    #[arg(long = "type", default_value = "service")]
    pub job_type: JobType,

    /// Task group name.
    #[arg(long, default_value = "app")]
    pub group: String,

    /// Number of group instances.
    #[arg(long)]
    pub count: Option<u32>,

    /// Task name (defaults to the job name).
    #[arg(long)]
    pub task: Option<String>,

    /// Docker image to run.
    #[arg(long)]
    pub image: Option<String>,

    /// Static host port, as LABEL=PORT. Repeatable.
    #[arg(long = "port", value_parser = parse_static_port)]
    pub ports: Vec<(String, u16)>,

    /// Scheduler-assigned port, as LABEL or LABEL=CONTAINER_PORT. Repeatable.
    #[arg(long = "dynamic-port", value_parser = parse_dynamic_port)]
    pub dynamic_ports: Vec<(String, Option<u16>)>,

    /// Environment variable, as KEY=VALUE. Repeatable.
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Host path to mount into the container. Repeatable.
    #[arg(long = "volume")]
    pub volumes: Vec<String>,

    /// CPU in MHz.
    #[arg(long)]
    pub cpu: Option<u32>,

    /// Memory in MB.
    #[arg(long)]
    pub memory: Option<u32>,

    /// Register a service bound to the first port label.
    #[arg(long)]
    pub service: Option<String>,

    /// Tag for the service. Repeatable.
    #[arg(long = "tag", requires = "service")]
    pub tags: Vec<String>,

    /// Job-level placement rule, as ATTRIBUTE OPERATOR VALUE. Repeatable.
    #[arg(long = "constraint", num_args = 3, value_names = ["ATTRIBUTE", "OPERATOR", "VALUE"])]
    pub constraints: Vec<String>,
}

impl ScaffoldArgs {
    pub fn build(&self, templates: Templates) -> Result<JobTemplate, JobSpecError> {
        let group = self.group.as_str();
        let task = self.task.as_deref().unwrap_or(&self.name);

        let mut job = JobTemplate::with_templates(&self.name, Arc::new(templates));
        job.set_type(self.job_type.clone());
        job.add_group(group);
        job.add_task(group, task)?;

        if let Some(count) = self.count {
            job.set_count(group, count)?;
        }
        if let Some(image) = &self.image {
            job.set_image(group, task, image)?;
        }
        for (label, number) in &self.ports {
            job.add_port(group, task, label, PortKind::Static(*number))?;
        }
        for (label, mapped) in &self.dynamic_ports {
            job.add_port(group, task, label, PortKind::Dynamic { mapped: *mapped })?;
        }
        for (key, value) in &self.env {
            job.add_env(group, task, key, value.as_str())?;
        }
        for path in &self.volumes {
            job.add_volume(group, task, path)?;
        }
        if let Some(cpu) = self.cpu {
            job.set_cpu(group, task, cpu)?;
        }
        if let Some(memory) = self.memory {
            job.set_memory(group, task, memory)?;
        }

        if let Some(service) = &self.service {
            job.add_service(group, task, service)?;
            if let Some(label) = self.first_port_label() {
                job.set_port_label(group, task, service, label)?;
            }
            for tag in &self.tags {
                job.add_tag(group, task, service, tag)?;
            }
        }

        for rule in self.constraints.chunks_exact(3) {
            let constraint = json!({
                "LTarget": rule[0],
                "Operand": rule[1],
                "RTarget": rule[2],
            });
            job.add_constraint(constraint, None, None)?;
        }

        Ok(job)
    }

    fn first_port_label(&self) -> Option<&str> {
        self.ports
            .first()
            .map(|(label, _)| label.as_str())
            .or_else(|| self.dynamic_ports.first().map(|(label, _)| label.as_str()))
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn parse_port_number(label: &str, raw: &str) -> Result<u16, String> {
    raw.parse()
        .map_err(|_| format!("port '{label}' has an invalid number '{raw}'"))
}

fn parse_static_port(raw: &str) -> Result<(String, u16), String> {
    let (label, number) = parse_key_value(raw).map_err(|_| format!("expected LABEL=PORT, got '{raw}'"))?;
    Ok((label.clone(), parse_port_number(&label, &number)?))
}

fn parse_dynamic_port(raw: &str) -> Result<(String, Option<u16>), String> {
    match raw.split_once('=') {
        None if !raw.is_empty() => Ok((raw.to_string(), None)),
        Some((label, number)) if !label.is_empty() => {
            Ok((label.to_string(), Some(parse_port_number(label, number)?)))
        }
        _ => Err(format!("expected LABEL or LABEL=PORT, got '{raw}'")),
    }
}
