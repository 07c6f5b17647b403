//! Exchange-rate fetcher backed by dolarapi.com.
//!
//! One request returns every quoted rate kind; the `casa` field names the
//! market and is mapped to an [`IndexType`]. The API's own update timestamp
//! drives `value_date` so re-fetching within a day stays idempotent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::indices::{CountryCode, IndexFetcher, IndexObservation, IndexType};

const DEFAULT_BASE_URL: &str = "https://dolarapi.com/v1";
const SOURCE: &str = "dolarapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SUPPORTED: [IndexType; 3] = [
    IndexType::ExchangeBlue,
    IndexType::ExchangeMep,
    IndexType::ExchangeOfficial,
];

/// One quoted rate in the API response.
#[derive(Debug, Deserialize)]
struct RateItem {
    casa: Option<String>,
    /// Sell price; the one leases adjust against.
    venta: Option<Decimal>,
    #[serde(rename = "fechaActualizacion")]
    fecha_actualizacion: Option<DateTime<Utc>>,
}

/// Maps the API's market names onto index types. Unknown names are dropped.
fn index_type_for_casa(casa: &str) -> Option<IndexType> {
    match casa {
        "blue" => Some(IndexType::ExchangeBlue),
        "bolsa" => Some(IndexType::ExchangeMep),
        "oficial" => Some(IndexType::ExchangeOfficial),
        _ => None,
    }
}

pub struct DolarApiFetcher {
    client: Client,
    base_url: String,
    country: CountryCode,
}

impl DolarApiFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("default reqwest client"),
            base_url: DEFAULT_BASE_URL.to_string(),
            country: "AR".parse().expect("static country code"),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_rates(&self) -> anyhow::Result<Vec<IndexObservation>> {
        let url = format!("{}/dolares", self.base_url);
        let items: Vec<serde_json::Value> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut results = Vec::new();
        for raw in items {
            let item: RateItem = match serde_json::from_value(raw.clone()) {
                Ok(item) => item,
                Err(e) => {
                    debug!(error = %e, "skipping malformed rate entry");
                    continue;
                }
            };

            let Some(index_type) = item.casa.as_deref().and_then(index_type_for_casa) else {
                debug!(casa = ?item.casa, "dropping unmapped rate kind");
                continue;
            };
            let Some(venta) = item.venta else {
                debug!(index_type = %index_type, "dropping rate entry without sell price");
                continue;
            };

            let value_date = item
                .fecha_actualizacion
                .map(|ts| ts.date_naive())
                .unwrap_or_else(|| Utc::now().date_naive());

            info!(index_type = %index_type, value = %venta, date = %value_date, "fetched exchange rate");
            results.push(IndexObservation {
                index_type,
                country: self.country.clone(),
                value_date,
                value: venta,
                source: SOURCE.to_string(),
                raw_response: Some(raw.to_string()),
                created_at: Utc::now(),
            });
        }

        Ok(results)
    }
}

impl Default for DolarApiFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IndexFetcher for DolarApiFetcher {
    fn supported_index_types(&self) -> &[IndexType] {
        &SUPPORTED
    }

    fn country(&self) -> &CountryCode {
        &self.country
    }

    async fn fetch_latest(&self) -> Vec<IndexObservation> {
        match self.fetch_rates().await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "failed to fetch exchange rates");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        SOURCE
    }
}
