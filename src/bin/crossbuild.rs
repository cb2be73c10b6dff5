use std::process::ExitCode;

use clap::Parser;
use crossbuild::logging;
use crossbuild::BuildError;
use tracing::debug;

mod workflows;

use workflows::{BuildArgs, CliArgs, Commands};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    logging::init(logging::resolve_level(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));
    debug!(?args, "crossbuild v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match &args.command {
        None => workflows::build(&BuildArgs::default()),
        Some(Commands::Build(build_args)) => workflows::build(build_args),
        Some(Commands::Plan(selection)) => workflows::plan(selection),
        Some(Commands::List(project)) => workflows::list(project),
        Some(Commands::Clean(project)) => workflows::clean(project),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            // Exit with the failing toolchain's own code where there is one.
            let code = err
                .downcast_ref::<BuildError>()
                .map_or(1, BuildError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
