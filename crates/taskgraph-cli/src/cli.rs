use clap::Parser;

/// Runs one or more tasks across the workspace's packages.
///
/// This binary is a thin demonstration of wiring the Workspace Model,
/// Pipeline Resolver, Filter, Task Graph Builder, and Scheduler together;
/// see spec §1 — real flag parsing depth, process execution, and caching
/// are out of the core's scope and are not fully re-implemented here.
#[derive(Debug, Parser)]
#[command(name = "taskgraph", version, about)]
pub struct Args {
    /// Task names to run, e.g. `build test`.
    #[arg(required = true)]
    pub tasks: Vec<String>,

    /// Path to the workspace manifest (see `manifest::load`).
    #[arg(long, default_value = "workspace.json")]
    pub workspace: camino::Utf8PathBuf,

    /// `--filter` selector, repeatable; see `taskgraph_scope::TargetSelector`.
    #[arg(long = "filter", short = 'F')]
    pub filters: Vec<String>,

    /// Only keep a dependency edge whose task also appears in `tasks`
    /// (spec §4.4 step 4).
    #[arg(long)]
    pub tasks_only: bool,

    /// Unbounded concurrency, sibling order unspecified (spec §4.6).
    #[arg(long)]
    pub parallel: bool,

    /// Maximum simultaneous task visits; ignored when `--parallel` is set.
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Keep running unaffected tasks after a failure, instead of halting.
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Repeatable; raises the default log level (`-v`, `-vv`, `-vvv`).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
