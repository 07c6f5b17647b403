//! Rental-contract-index fetcher backed by the central bank's daily
//! spreadsheet.
//!
//! The source is a legacy binary `.xls` workbook rather than an API: sheet 0
//! carries the date in column 0 and the index level in column 1, with data
//! starting at row index 2. Cell encodings vary across publication years, so
//! dates may arrive as native datetime cells, `dd/MM/yyyy` (or ISO) text, or
//! a raw serial number, and values as numbers or comma-decimal text. Rows
//! that fail to parse are skipped individually.

use std::io::Cursor;
use std::time::Duration as StdDuration;

use calamine::{Data, Reader, Xls};
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::indices::{CountryCode, IndexFetcher, IndexObservation, IndexType};

const DEFAULT_URL: &str = "https://www.bcra.gob.ar/Pdfs/PublicacionesEstadisticas/diar_icl.xls";
const SOURCE: &str = "bcra.gob.ar";
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(60);

const SUPPORTED: [IndexType; 1] = [IndexType::RentalContract];

/// Rows before this index are headers.
const FIRST_DATA_ROW: usize = 2;

pub struct BcraIclFetcher {
    client: Client,
    url: String,
    country: CountryCode,
}

impl BcraIclFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("default reqwest client"),
            url: DEFAULT_URL.to_string(),
            country: "AR".parse().expect("static country code"),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn fetch_workbook(&self) -> anyhow::Result<Vec<IndexObservation>> {
        let bytes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        info!(bytes = bytes.len(), "downloaded rental-contract index workbook");

        let mut workbook = Xls::new(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow::anyhow!("workbook has no sheets"))??;

        let mut results = Vec::new();
        for (row_num, row) in range.rows().enumerate().skip(FIRST_DATA_ROW) {
            match parse_row(row) {
                Some((value_date, value)) => results.push(IndexObservation {
                    index_type: IndexType::RentalContract,
                    country: self.country.clone(),
                    value_date,
                    value,
                    source: SOURCE.to_string(),
                    raw_response: None,
                    created_at: Utc::now(),
                }),
                None => {
                    debug!(row = row_num, "skipping unparseable workbook row");
                }
            }
        }

        results.sort_by_key(|obs| obs.value_date);
        info!(rows = results.len(), "parsed rental-contract index history");
        Ok(results)
    }
}

impl Default for BcraIclFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IndexFetcher for BcraIclFetcher {
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
        match self.fetch_workbook().await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "failed to fetch rental-contract index workbook");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        SOURCE
    }
}

fn parse_row(row: &[Data]) -> Option<(NaiveDate, Decimal)> {
    let date = parse_date_cell(row.first()?)?;
    let value = parse_value_cell(row.get(1)?)?;
    Some((date, value))
}

fn parse_date_cell(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => date_from_serial(dt.as_f64()),
        Data::Float(serial) => date_from_serial(*serial),
        Data::Int(serial) => date_from_serial(*serial as f64),
        Data::String(s) => parse_date_text(s),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.contains('/') {
        return NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").ok();
    }
    trimmed.parse().ok()
}

/// Spreadsheet date serials count days from 1899-12-30.
fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

fn parse_value_cell(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Float(v) => Decimal::try_from(*v).ok(),
        Data::Int(v) => Some(Decimal::from(*v)),
        Data::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}
