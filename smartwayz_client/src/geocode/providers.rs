use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use smartwayz_core::Coordinates;
use url::Url;

use crate::{
    ClientError, ClientResult,
    config::{ApiConfig, GeocodeConfig},
    routes,
    transport::{HttpRequest, HttpResponse, HttpTransport, Method},
};

/// One way of turning coordinates into a human readable address.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Providers that need credentials report `false` when they have none
    /// and are skipped without counting as a failure.
    fn is_configured(&self) -> bool {
        true
    }

    async fn resolve(&self, coordinates: Coordinates) -> ClientResult<String>;
}

/// The backend's own `/geocoding/reverse/` proxy.
pub struct BackendProxyProvider {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl BackendProxyProvider {
    pub fn new(api: &ApiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            endpoint: format!("{}{}", api.normalized_base_url(), routes::GEOCODE_REVERSE),
        }
    }
}

#[derive(Deserialize)]
struct ProxyAnswer {
    #[serde(default)]
    address: Option<String>,
}

#[async_trait]
impl GeocodeProvider for BackendProxyProvider {
    fn name(&self) -> &'static str {
        "backend-proxy"
    }

    async fn resolve(&self, coordinates: Coordinates) -> ClientResult<String> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
            ],
        )?;
        let answer: ProxyAnswer = fetch(self.transport.as_ref(), url).await?;
        answer
            .address
            .ok_or_else(|| ClientError::message("no address found"))
    }
}

/// BigDataCloud's keyless client-side reverse geocoder.
pub struct BigDataCloudProvider {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    locality_language: String,
}

impl BigDataCloudProvider {
    pub fn new(config: &GeocodeConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            endpoint: config.bigdatacloud_url.clone(),
            locality_language: config.locality_language.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BigDataCloudAnswer {
    #[serde(default)]
    locality_info: Option<LocalityInfo>,
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    principal_subdivision: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
}

#[derive(Deserialize)]
struct LocalityInfo {
    #[serde(default)]
    administrative: Vec<AdministrativeArea>,
}

#[derive(Deserialize)]
struct AdministrativeArea {
    #[serde(default)]
    name: Option<String>,
}

impl BigDataCloudAnswer {
    /// Street, district, city, province, country; most specific first.
    fn address(&self) -> Option<String> {
        let admin = |index: usize| {
            self.locality_info
                .as_ref()
                .and_then(|info| info.administrative.get(index))
                .and_then(|area| area.name.as_deref())
        };
        let locality = non_blank(self.locality.as_deref()).or(non_blank(self.city.as_deref()));

        let parts: Vec<&str> = [
            admin(6),
            admin(5),
            locality,
            self.principal_subdivision.as_deref(),
            self.country_name.as_deref(),
        ]
        .into_iter()
        .filter_map(non_blank)
        .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

#[async_trait]
impl GeocodeProvider for BigDataCloudProvider {
    fn name(&self) -> &'static str {
        "bigdatacloud"
    }

    async fn resolve(&self, coordinates: Coordinates) -> ClientResult<String> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("localityLanguage", self.locality_language.clone()),
            ],
        )?;
        let answer: BigDataCloudAnswer = fetch(self.transport.as_ref(), url).await?;
        answer
            .address()
            .ok_or_else(|| ClientError::message("no address found"))
    }
}

/// OpenCage forward/reverse geocoder; needs an API key.
pub struct OpenCageProvider {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenCageProvider {
    pub fn new(config: &GeocodeConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            endpoint: config.opencage_url.clone(),
            api_key: config.opencage_key().map(str::to_owned),
        }
    }
}

#[derive(Deserialize)]
struct OpenCageAnswer {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Deserialize)]
struct OpenCageResult {
    #[serde(default)]
    formatted: Option<String>,
}

#[async_trait]
impl GeocodeProvider for OpenCageProvider {
    fn name(&self) -> &'static str {
        "opencage"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn resolve(&self, coordinates: Coordinates) -> ClientResult<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ClientError::InvalidConfig("opencage api key is not configured"));
        };
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                (
                    "q",
                    format!("{} {}", coordinates.latitude, coordinates.longitude),
                ),
                ("key", api_key.to_owned()),
            ],
        )?;
        let answer: OpenCageAnswer = fetch(self.transport.as_ref(), url).await?;
        answer
            .results
            .into_iter()
            .next()
            .and_then(|result| result.formatted)
            .ok_or_else(|| ClientError::message("no address found"))
    }
}

async fn fetch<T>(transport: &dyn HttpTransport, url: Url) -> ClientResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let response: HttpResponse = transport
        .send(HttpRequest::new(Method::Get, url.as_str()))
        .await?;
    if !response.is_success() {
        return Err(ClientError::Api {
            status: response.status,
            message: response.error_message(),
        });
    }
    response.json()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
