use clap::{Args, Subcommand};
use smartwayz_client::{ResourceApi, SubCategory};
use smartwayz_core::CategoryId;

use crate::cli::common::{build_manager, load_api_config};

#[derive(Debug, Args)]
pub(crate) struct CategoriesCommand {
    #[command(subcommand)]
    subcmd: CategoriesSubcommand,
}

#[derive(Debug, Subcommand)]
enum CategoriesSubcommand {
    /// List report categories.
    List(ListCommand),

    /// List subcategories, optionally for one category.
    Subcategories(SubcategoriesCommand),
}

impl CategoriesCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            CategoriesSubcommand::List(cmd) => cmd.run().await,
            CategoriesSubcommand::Subcategories(cmd) => cmd.run().await,
        }
    }
}

#[derive(Debug, Args)]
struct ListCommand {}

impl ListCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let client = manager.client();

        let categories = ResourceApi::new(client.as_ref()).list_categories().await?;
        if categories.is_empty() {
            println!("No categories.");
        }
        for category in categories {
            match category.subcategories_count {
                Some(count) => println!("{:>4}  {} ({count} subcategories)", category.id.0, category.name),
                None => println!("{:>4}  {}", category.id.0, category.name),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
struct SubcategoriesCommand {
    #[arg(long)]
    category: Option<u64>,
}

impl SubcategoriesCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let client = manager.client();
        let api = ResourceApi::new(client.as_ref());

        let subcategories = match self.category.map(CategoryId) {
            Some(category) => {
                let listing = api.category_subcategories(category).await?;
                println!("Category: {}", listing.category.name);
                listing.subcategories
            }
            None => api.list_subcategories().await?,
        };

        print_subcategories(&subcategories);
        Ok(())
    }
}

fn print_subcategories(subcategories: &[SubCategory]) {
    if subcategories.is_empty() {
        println!("No subcategories.");
    }
    for sub in subcategories {
        println!(
            "{:>4}  {:<20} {}",
            sub.id.0,
            sub.code,
            sub.display_name()
        );
    }
}
