//! Consumer-price-index fetcher backed by the ArgentinaDatos API.
//!
//! A single request returns the full monthly series; each entry is the
//! month's percentage change, not an absolute level.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::indices::{CountryCode, IndexFetcher, IndexObservation, IndexType};

const DEFAULT_BASE_URL: &str = "https://api.argentinadatos.com/v1";
const SOURCE: &str = "argentinadatos.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SUPPORTED: [IndexType; 1] = [IndexType::ConsumerPrice];

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    fecha: Option<NaiveDate>,
    valor: Option<Decimal>,
}

pub struct ArgentinaDatosFetcher {
    client: Client,
    base_url: String,
    country: CountryCode,
}

impl ArgentinaDatosFetcher {
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

    async fn fetch_series(&self) -> anyhow::Result<Vec<IndexObservation>> {
        let url = format!("{}/finanzas/indices/inflacion", self.base_url);
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
            let entry: SeriesEntry = match serde_json::from_value(raw.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping malformed series entry");
                    continue;
                }
            };

            let (Some(fecha), Some(valor)) = (entry.fecha, entry.valor) else {
                debug!("skipping series entry without date or value");
                continue;
            };

            results.push(IndexObservation {
                index_type: IndexType::ConsumerPrice,
                country: self.country.clone(),
                value_date: fecha,
                value: valor,
                source: SOURCE.to_string(),
                raw_response: Some(raw.to_string()),
                created_at: Utc::now(),
            });
        }

        results.sort_by_key(|obs| obs.value_date);
        info!(rows = results.len(), "fetched consumer-price series");
        Ok(results)
    }
}

impl Default for ArgentinaDatosFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IndexFetcher for ArgentinaDatosFetcher {
    fn supported_index_types(&self) -> &[IndexType] {
        &SUPPORTED
    }

    fn country(&self) -> &CountryCode {
        &self.country
    }

    async fn fetch_latest(&self) -> Vec<IndexObservation> {
        let mut all = self.fetch_all_historical().await;
        match all.pop() {
            Some(latest) => vec![latest],
            None => Vec::new(),
        }
    }

    async fn fetch_all_historical(&self) -> Vec<IndexObservation> {
        match self.fetch_series().await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "failed to fetch consumer-price series");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_series_entry() {
        let entry: SeriesEntry =
            serde_json::from_str(r#"{"fecha": "2025-05-01", "valor": 1.5}"#).unwrap();
        assert_eq!(entry.fecha, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert_eq!(entry.valor.unwrap().to_string(), "1.5");
    }

    #[test]
    fn tolerates_missing_fields() {
        let entry: SeriesEntry = serde_json::from_str(r#"{"fecha": "2025-05-01"}"#).unwrap();
        assert!(entry.valor.is_none());
    }
}
