use serde_json::Value;
use smartwayz_core::{CategoryId, ReportId, SubCategoryId};
use url::form_urlencoded;

use super::types::{
    Category, CategoryWithSubcategories, ListResponse, NewReport, Payload, Report, ReportFilter,
    SubCategory,
};
use crate::{
    ClientResult, routes, session_client::SessionClient, token_store::TokenStore,
    transport::HttpTransport,
};

/// Typed calls over the backend's category, subcategory and report routes.
pub struct ResourceApi<'a, H, S>
where
    H: HttpTransport,
    S: TokenStore + Send + Sync,
{
    client: &'a SessionClient<H, S>,
}

impl<'a, H, S> ResourceApi<'a, H, S>
where
    H: HttpTransport,
    S: TokenStore + Send + Sync,
{
    pub fn new(client: &'a SessionClient<H, S>) -> Self {
        Self { client }
    }

    pub async fn list_categories(&self) -> ClientResult<Vec<Category>> {
        let list: ListResponse<Category> = self.client.get(routes::CATEGORIES).await?;
        Ok(list.into_items())
    }

    pub async fn get_category(&self, id: CategoryId) -> ClientResult<Category> {
        self.client
            .get(&format!("{}{id}/", routes::CATEGORIES))
            .await
    }

    pub async fn category_subcategories(
        &self,
        id: CategoryId,
    ) -> ClientResult<CategoryWithSubcategories> {
        self.client
            .get(&format!("{}{id}/subcategories/", routes::CATEGORIES))
            .await
    }

    pub async fn list_subcategories(&self) -> ClientResult<Vec<SubCategory>> {
        let list: ListResponse<SubCategory> = self.client.get(routes::SUBCATEGORIES).await?;
        Ok(list.into_items())
    }

    pub async fn subcategories_for(&self, category: CategoryId) -> ClientResult<Vec<SubCategory>> {
        let endpoint = with_query(
            routes::SUBCATEGORIES,
            &[("category", category.to_string())],
        );
        let list: ListResponse<SubCategory> = self.client.get(&endpoint).await?;
        Ok(list.into_items())
    }

    pub async fn get_subcategory(&self, id: SubCategoryId) -> ClientResult<SubCategory> {
        self.client
            .get(&format!("{}{id}/", routes::SUBCATEGORIES))
            .await
    }

    pub async fn create_report(&self, report: &NewReport) -> ClientResult<Report> {
        report.validate()?;
        let created: Payload<Report> = self.client.post(routes::REPORTS, report).await?;
        let created = created.into_inner();
        log::info!("submitted report {}", created.id);
        Ok(created)
    }

    pub async fn list_reports(&self, filter: &ReportFilter) -> ClientResult<Vec<Report>> {
        let endpoint = with_query(routes::REPORTS, &filter.query_pairs());
        let list: ListResponse<Report> = self.client.get(&endpoint).await?;
        Ok(list.into_items())
    }

    pub async fn get_report(&self, id: ReportId) -> ClientResult<Report> {
        self.client.get(&format!("{}{id}/", routes::REPORTS)).await
    }

    pub async fn update_report(&self, id: ReportId, report: &NewReport) -> ClientResult<Report> {
        report.validate()?;
        let updated: Payload<Report> = self
            .client
            .put(&format!("{}{id}/", routes::REPORTS), report)
            .await?;
        Ok(updated.into_inner())
    }

    pub async fn delete_report(&self, id: ReportId) -> ClientResult<()> {
        let _: Value = self
            .client
            .delete(&format!("{}{id}/", routes::REPORTS))
            .await?;
        Ok(())
    }
}

fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_owned();
    }
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
    format!("{path}?{}", query.finish())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use smartwayz_core::{CategoryId, Coordinates, ReportId, UserId};

    use super::ResourceApi;
    use crate::{
        ClientError, ClientResult,
        api::{NewReport, ReportFilter},
        auth::{CredentialPair, StoredSession},
        config::ApiConfig,
        session_client::SessionClient,
        token_store::MemoryTokenStore,
        transport::{HttpRequest, HttpResponse, HttpTransport},
    };

    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
            self.requests.lock().expect("lock").push(request);
            self.responses
                .lock()
                .expect("lock")
                .pop_front()
                .ok_or_else(|| ClientError::transport("no response scripted"))
        }
    }

    fn client(
        transport: &Arc<ScriptedTransport>,
        responses: Vec<Value>,
    ) -> SessionClient<Arc<ScriptedTransport>, MemoryTokenStore> {
        transport.responses.lock().expect("lock").extend(
            responses
                .into_iter()
                .map(|body| HttpResponse::from_json(200, &body)),
        );
        let client = SessionClient::new(
            &ApiConfig::new("http://backend.test/api/", "tests"),
            Arc::clone(transport),
            MemoryTokenStore::new(),
        )
        .expect("valid config");
        client
            .install_session(StoredSession::new(
                CredentialPair::new("access-1", "refresh-1"),
                None,
            ))
            .expect("install");
        client
    }

    #[tokio::test]
    async fn categories_are_read_from_paginated_lists() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(
            &transport,
            vec![json!({"count": 1, "results": [{"id": 1, "report_type": "Hazard", "subcategories_count": 11}]})],
        );

        let categories = ResourceApi::new(&client)
            .list_categories()
            .await
            .expect("categories");

        assert_eq!(categories[0].name, "Hazard");
        let sent = transport.requests.lock().expect("lock");
        assert_eq!(sent[0].url, "http://backend.test/api/categories/");
        assert_eq!(sent[0].bearer_token(), None);
    }

    #[tokio::test]
    async fn report_filters_become_query_parameters() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(&transport, vec![json!([])]);

        let reports = ResourceApi::new(&client)
            .list_reports(&ReportFilter {
                citizen: Some(UserId(3)),
                category: Some(CategoryId(2)),
                sub_category: None,
            })
            .await
            .expect("reports");

        assert!(reports.is_empty());
        let sent = transport.requests.lock().expect("lock");
        assert_eq!(
            sent[0].url,
            "http://backend.test/api/reports/?citizen_id=3&category=2"
        );
        assert_eq!(sent[0].bearer_token(), Some("access-1"));
    }

    #[tokio::test]
    async fn created_report_is_unwrapped_from_the_envelope() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(
            &transport,
            vec![json!({
                "success": true,
                "message": "Report created successfully.",
                "data": {"id": 12, "report_type": 1, "latitude": "14.599512", "longitude": "120.984222"}
            })],
        );

        let report = ResourceApi::new(&client)
            .create_report(
                &NewReport::new(
                    CategoryId(1),
                    Coordinates {
                        latitude: 14.599512,
                        longitude: 120.984222,
                    },
                )
                .with_description("Pothole near the school"),
            )
            .await
            .expect("created");

        assert_eq!(report.id, ReportId(12));
        let sent = transport.requests.lock().expect("lock");
        assert_eq!(
            sent[0].body.as_ref().and_then(|body| body.get("description")),
            Some(&json!("Pothole near the school"))
        );
    }

    #[tokio::test]
    async fn invalid_report_is_rejected_before_sending() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client(&transport, Vec::new());

        let err = ResourceApi::new(&client)
            .create_report(&NewReport::new(
                CategoryId(1),
                Coordinates {
                    latitude: 0.0,
                    longitude: 200.0,
                },
            ))
            .await
            .expect_err("should be rejected");

        assert!(matches!(err, ClientError::Coordinates(_)));
        assert!(transport.requests.lock().expect("lock").is_empty());
    }
}
