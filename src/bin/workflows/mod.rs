mod cli;
mod commands;

pub(crate) use cli::{BuildArgs, CliArgs, Commands};
pub(crate) use commands::{build, clean, list, plan};
