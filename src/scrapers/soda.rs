use crate::error::{Result, ScrapeError};
use crate::models::{QueryParameters, Table};
use crate::scrapers::traits::Transport;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RESOURCE: &str = "resource";
pub const DEFAULT_FORMAT: &str = "json";

/// Fetch helper for Socrata (SODA) open data portals
pub struct Soda {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl Soda {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query_url(&self, data_id: &str, resource: &str, format: &str) -> String {
        format!("{}/{}/{}.{}", self.base_url, resource, data_id, format)
    }

    /// URL of a dataset's JSON resource endpoint
    pub fn dataset_url(&self, data_id: &str) -> String {
        self.query_url(data_id, DEFAULT_RESOURCE, DEFAULT_FORMAT)
    }

    /// Fetch a dataset whose body is a flat array of records
    pub async fn get_dataset(&self, data_id: &str, resource: &str, format: &str) -> Result<Table> {
        let url = self.query_url(data_id, resource, format);
        info!("Fetching SODA dataset {}", url);

        let body = self.transport.get_json(&url, &QueryParameters::new()).await?;
        records_to_table(body)
    }
}

/// Rows from a JSON array of objects
pub fn records_to_table(body: Value) -> Result<Table> {
    let Value::Array(items) = body else {
        return Err(ScrapeError::UnexpectedResponse(
            "expected a JSON array of records".into(),
        ));
    };

    let rows = items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(ScrapeError::UnexpectedResponse(format!(
                "expected record object, got {}",
                other
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Table::from_records(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::mock::MockTransport;
    use serde_json::json;

    #[test]
    fn builds_dataset_url() {
        let soda = Soda::new("https://example.org", Arc::new(MockTransport::default()));
        assert_eq!(
            soda.dataset_url("abcd-1234"),
            "https://example.org/resource/abcd-1234.json"
        );
        assert_eq!(
            soda.query_url("abcd-1234", "api/views", "csv"),
            "https://example.org/api/views/abcd-1234.csv"
        );
    }

    #[tokio::test]
    async fn get_dataset_parses_records() {
        let transport = Arc::new(MockTransport::new(vec![json!([
            {"jurisdiction": "Ohio", "_1st_dose_allocations": "1000"},
            {"jurisdiction": "Texas", "_1st_dose_allocations": "2500"},
        ])]));
        let soda = Soda::new("https://data.cdc.gov", transport.clone());

        let table = soda
            .get_dataset("saz5-9hgg", DEFAULT_RESOURCE, DEFAULT_FORMAT)
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "jurisdiction"), &json!("Texas"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "https://data.cdc.gov/resource/saz5-9hgg.json");
        assert!(requests[0].1.is_empty());
    }

    #[test]
    fn non_array_body_is_rejected() {
        assert!(matches!(
            records_to_table(json!({"error": true})),
            Err(ScrapeError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            records_to_table(json!([1, 2])),
            Err(ScrapeError::UnexpectedResponse(_))
        ));
    }
}
