use clap::{Args, Subcommand};
use smartwayz_client::{NewReport, ReportFilter, ResourceApi};
use smartwayz_core::{CategoryId, Coordinates, ReportId, SubCategoryId, UserId};

use crate::cli::common::{
    authenticated_client, build_manager, build_resolver, load_api_config, print_report,
};

#[derive(Debug, Args)]
pub(crate) struct ReportsCommand {
    #[command(subcommand)]
    subcmd: ReportsSubcommand,
}

#[derive(Debug, Subcommand)]
enum ReportsSubcommand {
    /// List reports visible to the signed in user.
    List(ListCommand),

    /// Show one report.
    Show(ShowCommand),

    /// Submit a new report at the given location.
    Submit(SubmitCommand),
}

impl ReportsCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            ReportsSubcommand::List(cmd) => cmd.run().await,
            ReportsSubcommand::Show(cmd) => cmd.run().await,
            ReportsSubcommand::Submit(cmd) => cmd.run().await,
        }
    }
}

#[derive(Debug, Args)]
struct ListCommand {
    #[arg(long)]
    category: Option<u64>,

    #[arg(long)]
    citizen: Option<u64>,
}

impl ListCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let client = authenticated_client(&manager).await?;

        let reports = ResourceApi::new(client.as_ref())
            .list_reports(&ReportFilter {
                citizen: self.citizen.map(UserId),
                category: self.category.map(CategoryId),
                sub_category: None,
            })
            .await?;

        if reports.is_empty() {
            println!("No reports.");
        }
        for report in &reports {
            print_report(report);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
struct ShowCommand {
    id: u64,
}

impl ShowCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let client = authenticated_client(&manager).await?;

        let report = ResourceApi::new(client.as_ref())
            .get_report(ReportId(self.id))
            .await?;
        print_report(&report);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct SubmitCommand {
    #[arg(long)]
    category: u64,

    #[arg(long)]
    sub_category: Option<u64>,

    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    #[arg(long)]
    description: Option<String>,
}

impl SubmitCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let location = Coordinates::new(self.lat, self.lon)?;
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let client = authenticated_client(&manager).await?;

        let address = build_resolver(&config)?.resolve(location).await;
        println!("Address: {} (via {})", address.address, address.source);

        let mut report = NewReport::new(CategoryId(self.category), location);
        if let Some(sub_category) = self.sub_category {
            report = report.with_sub_category(SubCategoryId(sub_category));
        }
        if let Some(description) = &self.description {
            report = report.with_description(description.clone());
        }

        let created = ResourceApi::new(client.as_ref())
            .create_report(&report)
            .await?;
        println!("Submitted.");
        print_report(&created);
        Ok(())
    }
}
