use clap::Parser;
use taskgraph_cli::{cli::Args, logging, run};

fn main() -> miette::Result<()> {
    let args = Args::parse();
    logging::init(args.verbosity);
    run(args).map(|_| ()).map_err(miette::Report::new)
}
