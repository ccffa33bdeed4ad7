use clap::{ArgAction, Parser, Subcommand};

use crate::cli::{
    auth::AuthCommand, categories::CategoriesCommand, geocode::GeocodeCommand,
    reports::ReportsCommand,
};

pub(crate) fn get_args() -> CliOpts {
    CliOpts::parse()
}

#[derive(Debug, Parser)]
#[command(name = "smartwayz", version = clap::crate_version!())]
pub(crate) struct CliOpts {
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    subcmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in, register and manage the stored session.
    Auth(AuthCommand),

    /// Browse report categories and subcategories.
    Categories(CategoriesCommand),

    /// List, inspect and submit reports.
    Reports(ReportsCommand),

    /// Turn coordinates into an address.
    Geocode(GeocodeCommand),
}

impl CliOpts {
    pub(crate) fn verbose(&self) -> u8 {
        self.verbose
    }

    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            Command::Auth(cmd) => cmd.run().await,
            Command::Categories(cmd) => cmd.run().await,
            Command::Reports(cmd) => cmd.run().await,
            Command::Geocode(cmd) => cmd.run().await,
        }
    }
}
