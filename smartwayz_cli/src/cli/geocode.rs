use clap::Args;
use smartwayz_core::Coordinates;

use crate::cli::common::{build_resolver, load_api_config};

#[derive(Debug, Args)]
pub(crate) struct GeocodeCommand {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

impl GeocodeCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let location = Coordinates::new(self.lat, self.lon)?;
        let config = load_api_config()?;
        let resolver = build_resolver(&config)?;
        log::debug!("geocoding chain: {}", resolver.provider_names().join(" -> "));

        let result = resolver.resolve(location).await;
        println!("{}", result.address);
        println!("Source: {}", result.source);
        Ok(())
    }
}
