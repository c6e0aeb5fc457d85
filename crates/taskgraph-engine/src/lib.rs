//! The Task Graph Builder (C4): BFS expansion of `(package, task)` entry
//! points — by way of the Pipeline Resolver (C2) and the Workspace Model
//! (C1) — into a DAG of task nodes rooted at a synthetic sentinel.

mod builder;
mod engine;
mod error;
mod node;

pub use builder::GraphBuilder;
pub use engine::{Building, Built, Engine};
pub use error::BuilderError;
pub use node::TaskNode;
