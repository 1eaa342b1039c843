mod cli;
mod commands;
mod common;
mod config;
mod error;
mod package;
mod platform;
mod ui;

use clap::Parser;

use crate::cli::Cli;
use crate::ui::prelude::*;

fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    ui::init(cli.output, !cli.no_color);
    emit(Level::Debug, "debug.enabled", "Debug mode is on", None);

    if let Err(e) = commands::dispatch(cli) {
        emit(
            Level::Error,
            "error.fatal",
            &format!("{} Error: {:#}", char::from(NerdFont::CrossCircle), e),
            None,
        );
        std::process::exit(1);
    }
}
