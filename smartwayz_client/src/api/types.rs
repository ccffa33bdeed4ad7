use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use smartwayz_core::{CategoryId, Coordinates, ReportId, SubCategoryId, Timestamp, UserId};

use crate::ClientResult;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "report_type")]
    pub name: String,
    #[serde(default)]
    pub subcategories_count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    #[serde(rename = "report_type")]
    pub category: CategoryId,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(rename = "sub_category")]
    pub code: String,
    #[serde(rename = "sub_category_display", default)]
    pub label: Option<String>,
}

impl SubCategory {
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.code)
    }
}

/// `GET /categories/{id}/subcategories/` answers with the parent alongside
/// its children.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CategoryWithSubcategories {
    pub category: Category,
    pub subcategories: Vec<SubCategory>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Report {
    pub id: ReportId,
    #[serde(default)]
    pub citizen: Option<UserId>,
    #[serde(default)]
    pub citizen_name: Option<String>,
    #[serde(rename = "report_type")]
    pub category: CategoryId,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub sub_category: Option<SubCategoryId>,
    #[serde(deserialize_with = "decimal")]
    pub latitude: f64,
    #[serde(deserialize_with = "decimal")]
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl Report {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Body for creating or replacing a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewReport {
    #[serde(rename = "report_type")]
    pub category: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<SubCategoryId>,
    #[serde(serialize_with = "six_places")]
    pub latitude: f64,
    #[serde(serialize_with = "six_places")]
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewReport {
    pub fn new(category: CategoryId, location: Coordinates) -> Self {
        Self {
            category,
            sub_category: None,
            latitude: location.latitude,
            longitude: location.longitude,
            description: None,
        }
    }

    pub fn with_sub_category(mut self, sub_category: SubCategoryId) -> Self {
        self.sub_category = Some(sub_category);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    pub fn validate(&self) -> ClientResult<()> {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
        .validate()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub citizen: Option<UserId>,
    pub category: Option<CategoryId>,
    pub sub_category: Option<SubCategoryId>,
}

impl ReportFilter {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(citizen) = self.citizen {
            pairs.push(("citizen_id", citizen.to_string()));
        }
        if let Some(category) = self.category {
            pairs.push(("category", category.to_string()));
        }
        if let Some(sub_category) = self.sub_category {
            pairs.push(("sub_category", sub_category.to_string()));
        }
        pairs
    }
}

/// List endpoints may or may not be paginated.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Paginated { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Self::Paginated { results } => results,
            Self::Bare(items) => items,
        }
    }
}

/// Write endpoints wrap the record in `{success, message, data}`; reads
/// return it bare.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(item) => item,
        }
    }
}

fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    match Decimal::deserialize(deserializer)? {
        Decimal::Number(value) => Ok(value),
        Decimal::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid decimal `{text}`"))),
    }
}

// The backend stores coordinates as decimals with six places and rejects
// anything longer.
fn six_places<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{value:.6}"))
}
