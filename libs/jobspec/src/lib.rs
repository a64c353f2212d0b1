//! # nh-jobspec
//!
//! Job specification documents for a Nomad-style cluster scheduler.
//!
//! A job document is a tree:
//!
//! ```text
//! Job ─┬─ Constraints
//!      └─ TaskGroups ─┬─ Constraints
//!                     └─ Tasks ─┬─ Config / Env / Resources / LogConfig
//!                               ├─ Constraints
//!                               └─ Services ── Tags / Checks
//! ```
//!
//! New nodes are seeded from JSON skeletons ([`Templates`]) and then shaped
//! through [`JobTemplate`], which addresses groups, tasks and services by
//! name. When names collide, the most recently added node wins.
//!
//! ## Example
//!
//! ```
//! use nh_jobspec::{JobTemplate, PortKind};
//!
//! let mut job = JobTemplate::new("web");
//! job.add_group("api");
//! job.add_task("api", "server").unwrap();
//! job.set_image("api", "server", "nginx:latest").unwrap();
//! job.add_port("api", "server", "http", PortKind::Static(8080)).unwrap();
//!
//! assert_eq!(job.count("api").unwrap(), 1);
//! ```

mod error;
pub mod lookup;
mod model;
mod template;
mod templates;

pub use error::{JobSpecError, NodeKind, ResultExt};
pub use lookup::Named;
pub use model::*;
pub use template::{JobTemplate, PortKind};
pub use templates::Templates;
