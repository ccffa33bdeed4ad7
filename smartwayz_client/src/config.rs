use url::Url;

use crate::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_BIGDATACLOUD_URL: &str =
    "https://api.bigdatacloud.net/data/reverse-geocode-client";
pub const DEFAULT_OPENCAGE_URL: &str = "https://api.opencagedata.com/geocode/v1/json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig("base_url must be set"));
        }
        let parsed = Url::parse(self.base_url.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(
                "api base url must use http or https",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ClientError::InvalidConfig("user_agent must be set"));
        }
        Ok(())
    }

    /// Base url without a trailing slash, ready for `/path/` endpoints.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_owned()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_API_URL,
            concat!("smartwayz/", env!("CARGO_PKG_VERSION")),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeocodeConfig {
    pub bigdatacloud_url: String,
    pub opencage_url: String,
    pub opencage_api_key: Option<String>,
    pub locality_language: String,
}

impl GeocodeConfig {
    pub fn with_opencage_api_key(mut self, api_key: Option<String>) -> Self {
        self.opencage_api_key = api_key;
        self
    }

    pub fn opencage_key(&self) -> Option<&str> {
        self.opencage_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            bigdatacloud_url: DEFAULT_BIGDATACLOUD_URL.to_owned(),
            opencage_url: DEFAULT_OPENCAGE_URL.to_owned(),
            opencage_api_key: None,
            locality_language: "en".to_owned(),
        }
    }
}
