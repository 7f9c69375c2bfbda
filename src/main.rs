mod catalog;
mod cli;
mod config;
mod engine;
mod esm;
mod groups;
mod profiles;
mod registry;
mod session;
mod settings;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
