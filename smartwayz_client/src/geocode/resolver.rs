use std::{fmt, sync::Arc};

use smartwayz_core::Coordinates;

use super::providers::{
    BackendProxyProvider, BigDataCloudProvider, GeocodeProvider, OpenCageProvider,
};
use crate::{
    config::{ApiConfig, GeocodeConfig},
    transport::HttpTransport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressSource {
    Provider(&'static str),
    /// Every provider failed; the address is built from the coordinates.
    Coordinates,
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(name) => f.write_str(name),
            Self::Coordinates => f.write_str("coordinates"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeocodeResult {
    pub address: String,
    pub source: AddressSource,
}

/// Tries providers strictly one after another and stops at the first
/// usable address.
pub struct GeocodeResolver {
    providers: Vec<Box<dyn GeocodeProvider>>,
}

impl GeocodeResolver {
    pub fn new(providers: Vec<Box<dyn GeocodeProvider>>) -> Self {
        Self { providers }
    }

    /// Backend proxy, then BigDataCloud, then OpenCage.
    pub fn standard(
        api: &ApiConfig,
        geocode: &GeocodeConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self::new(vec![
            Box::new(BackendProxyProvider::new(api, Arc::clone(&transport))),
            Box::new(BigDataCloudProvider::new(geocode, Arc::clone(&transport))),
            Box::new(OpenCageProvider::new(geocode, transport)),
        ])
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    pub async fn resolve(&self, coordinates: Coordinates) -> GeocodeResult {
        for provider in &self.providers {
            let name = provider.name();
            if !provider.is_configured() {
                log::debug!("skipping {name} geocoding: not configured");
                continue;
            }

            log::debug!("trying {name} geocoding");
            match provider.resolve(coordinates).await {
                Ok(address) if !address.trim().is_empty() => {
                    log::debug!("{name} geocoding succeeded");
                    return GeocodeResult {
                        address: address.trim().to_owned(),
                        source: AddressSource::Provider(name),
                    };
                }
                Ok(_) => log::warn!("{name} geocoding returned an empty address"),
                Err(err) => log::warn!("{name} geocoding failed: {:?}", err.display_chain()),
            }
        }

        log::info!("all geocoding providers failed, using coordinates");
        GeocodeResult {
            address: coordinates.fallback_label(),
            source: AddressSource::Coordinates,
        }
    }
}
