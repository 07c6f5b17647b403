use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::NaiveDate;

use super::{CountryCode, IndexObservation, IndexType};

/// Persistence contract for index time series.
///
/// All queries are scoped by (index_type, country). Implementations own the
/// uniqueness invariant: at most one observation per (type, country, date).
/// `insert` must refuse a duplicate key rather than overwrite or append, so
/// two concurrent refreshes that both pass an `exists` check still end up
/// with a single row.
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Observation with the maximum value_date, if any.
    async fn get_latest(
        &self,
        index_type: IndexType,
        country: &CountryCode,
    ) -> Result<Option<IndexObservation>>;

    /// Exact-date lookup.
    async fn get_at_date(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        date: NaiveDate,
    ) -> Result<Option<IndexObservation>>;

    /// Observation with the maximum value_date on or before `target`.
    ///
    /// This is the temporal join used for interval endpoints that fall on
    /// days without a published value (weekends, holidays).
    async fn get_closest_on_or_before(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        target: NaiveDate,
    ) -> Result<Option<IndexObservation>>;

    /// All observations with value_date in [from, to], descending by date.
    async fn get_range(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IndexObservation>>;

    /// The latest observation per distinct index type present for `country`.
    async fn get_all_latest(&self, country: &CountryCode) -> Result<Vec<IndexObservation>>;

    async fn exists(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        date: NaiveDate,
    ) -> Result<bool>;

    /// Appends `observation` unless its key is already present.
    ///
    /// Returns whether a row was actually added.
    async fn insert(&self, observation: &IndexObservation) -> Result<bool>;
}

type SeriesKey = (IndexType, String);

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct MemoryIndexStore {
    series: tokio::sync::Mutex<HashMap<SeriesKey, BTreeMap<NaiveDate, IndexObservation>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(index_type: IndexType, country: &CountryCode) -> SeriesKey {
        (index_type, country.as_str().to_string())
    }
}

#[async_trait::async_trait]
impl IndexStore for MemoryIndexStore {
    async fn get_latest(
        &self,
        index_type: IndexType,
        country: &CountryCode,
    ) -> Result<Option<IndexObservation>> {
        let series = self.series.lock().await;
        Ok(series
            .get(&Self::key(index_type, country))
            .and_then(|s| s.last_key_value())
            .map(|(_, obs)| obs.clone()))
    }

    async fn get_at_date(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        date: NaiveDate,
    ) -> Result<Option<IndexObservation>> {
        let series = self.series.lock().await;
        Ok(series
            .get(&Self::key(index_type, country))
            .and_then(|s| s.get(&date))
            .cloned())
    }

    async fn get_closest_on_or_before(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        target: NaiveDate,
    ) -> Result<Option<IndexObservation>> {
        let series = self.series.lock().await;
        Ok(series
            .get(&Self::key(index_type, country))
            .and_then(|s| s.range(..=target).next_back())
            .map(|(_, obs)| obs.clone()))
    }

    async fn get_range(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IndexObservation>> {
        let series = self.series.lock().await;
        Ok(series
            .get(&Self::key(index_type, country))
            .map(|s| {
                s.range(from..=to)
                    .rev()
                    .map(|(_, obs)| obs.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_all_latest(&self, country: &CountryCode) -> Result<Vec<IndexObservation>> {
        let series = self.series.lock().await;
        let mut latest: Vec<IndexObservation> = series
            .iter()
            .filter(|((_, c), _)| c == country.as_str())
            .filter_map(|(_, s)| s.last_key_value().map(|(_, obs)| obs.clone()))
            .collect();
        latest.sort_by_key(|obs| obs.index_type.as_str());
        Ok(latest)
    }

    async fn exists(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        date: NaiveDate,
    ) -> Result<bool> {
        let series = self.series.lock().await;
        Ok(series
            .get(&Self::key(index_type, country))
            .is_some_and(|s| s.contains_key(&date)))
    }

    async fn insert(&self, observation: &IndexObservation) -> Result<bool> {
        let mut series = self.series.lock().await;
        let entry = series
            .entry(Self::key(observation.index_type, &observation.country))
            .or_default();
        if entry.contains_key(&observation.value_date) {
            return Ok(false);
        }
        entry.insert(observation.value_date, observation.clone());
        Ok(true)
    }
}
