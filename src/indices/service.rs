use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};

use super::{CountryCode, IndexFetcher, IndexObservation, IndexStore, IndexType};

/// Scale used for adjustment factors.
const FACTOR_SCALE: u32 = 6;
/// Scale used for percentage changes and monetary amounts.
const AMOUNT_SCALE: u32 = 2;

/// Outcome of one refresh or backfill pass, for operator logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Observations returned by fetchers.
    pub fetched: usize,
    /// Observations actually added to the store.
    pub inserted: usize,
}

impl RefreshSummary {
    fn absorb(&mut self, other: RefreshSummary) {
        self.fetched += other.fetched;
        self.inserted += other.inserted;
    }
}

/// Orchestrates fetchers against the store and computes adjustment values.
///
/// Holds no business state of its own. Missing data degrades to the identity
/// factor (or a zero change) instead of failing, because the results feed
/// multiplicatively into rent amounts; those fallbacks log as warnings so
/// "series not populated yet" stays distinguishable from real faults.
pub struct IndexService {
    store: Arc<dyn IndexStore>,
    fetchers: Vec<Arc<dyn IndexFetcher>>,
    clock: Arc<dyn Clock>,
}

impl IndexService {
    pub fn new(store: Arc<dyn IndexStore>, fetchers: Vec<Arc<dyn IndexFetcher>>) -> Self {
        Self {
            store,
            fetchers,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Read accessors over the store.
    pub async fn latest(
        &self,
        country: &CountryCode,
        index_type: IndexType,
    ) -> Result<Option<IndexObservation>> {
        self.store.get_latest(index_type, country).await
    }

    pub async fn at_date(
        &self,
        country: &CountryCode,
        index_type: IndexType,
        date: NaiveDate,
    ) -> Result<Option<IndexObservation>> {
        self.store.get_at_date(index_type, country, date).await
    }

    pub async fn closest_on_or_before(
        &self,
        country: &CountryCode,
        index_type: IndexType,
        target: NaiveDate,
    ) -> Result<Option<IndexObservation>> {
        self.store
            .get_closest_on_or_before(index_type, country, target)
            .await
    }

    /// History in [from, to], descending by date.
    pub async fn history(
        &self,
        country: &CountryCode,
        index_type: IndexType,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IndexObservation>> {
        self.store.get_range(index_type, country, from, to).await
    }

    /// Latest observation per index type present for `country`.
    pub async fn all_latest(&self, country: &CountryCode) -> Result<Vec<IndexObservation>> {
        self.store.get_all_latest(country).await
    }

    /// Multiplicative factor reflecting index movement between two dates.
    ///
    /// Interval endpoints use the closest published value on or before each
    /// date. A missing endpoint or a zero from-value yields the identity
    /// factor rather than an error.
    pub async fn adjustment_factor(
        &self,
        country: &CountryCode,
        index_type: IndexType,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Decimal> {
        if index_type == IndexType::None {
            return Ok(Decimal::ONE);
        }

        let from_value = self
            .closest_on_or_before(country, index_type, from_date)
            .await?;
        let to_value = self
            .closest_on_or_before(country, index_type, to_date)
            .await?;

        let (Some(from_value), Some(to_value)) = (from_value, to_value) else {
            warn!(
                %country,
                index_type = %index_type,
                %from_date,
                %to_date,
                reason = "no data",
                "cannot compute adjustment factor, returning identity"
            );
            return Ok(Decimal::ONE);
        };

        if from_value.value.is_zero() {
            warn!(
                %country,
                index_type = %index_type,
                %from_date,
                reason = "zero from-value",
                "cannot compute adjustment factor, returning identity"
            );
            return Ok(Decimal::ONE);
        }

        Ok(round_half_up(
            to_value.value / from_value.value,
            FACTOR_SCALE,
        ))
    }

    /// Percentage change between now and one year ago.
    ///
    /// Consumer-price observations are monthly percentage changes, so the
    /// trailing year compounds them; every other index is a plain ratio of
    /// levels. Missing data yields zero.
    pub async fn annual_percentage_change(
        &self,
        country: &CountryCode,
        index_type: IndexType,
    ) -> Result<Decimal> {
        if index_type == IndexType::None {
            return Ok(Decimal::ZERO);
        }

        let today = self.clock.today();
        let one_year_ago = minus_months(today, 12);

        if index_type == IndexType::ConsumerPrice {
            let history = self
                .history(country, index_type, one_year_ago, today)
                .await?;
            if history.is_empty() {
                warn!(
                    %country,
                    reason = "no data",
                    "no consumer-price history for annual change, returning zero"
                );
                return Ok(Decimal::ZERO);
            }

            let mut accumulated = Decimal::ONE;
            for obs in &history {
                accumulated *= Decimal::ONE + obs.value / Decimal::ONE_HUNDRED;
            }
            return Ok(round_half_up(
                (accumulated - Decimal::ONE) * Decimal::ONE_HUNDRED,
                AMOUNT_SCALE,
            ));
        }

        let current = self.latest(country, index_type).await?;
        let year_ago = self
            .closest_on_or_before(country, index_type, one_year_ago)
            .await?;

        let (Some(current), Some(year_ago)) = (current, year_ago) else {
            warn!(
                %country,
                index_type = %index_type,
                reason = "no data",
                "cannot compute annual change, returning zero"
            );
            return Ok(Decimal::ZERO);
        };

        if year_ago.value.is_zero() {
            return Ok(Decimal::ZERO);
        }

        Ok(round_half_up(
            (current.value / year_ago.value - Decimal::ONE) * Decimal::ONE_HUNDRED,
            AMOUNT_SCALE,
        ))
    }

    /// Percentage change between now and one month ago.
    ///
    /// The latest consumer-price observation already is the monthly change,
    /// so it is returned directly; every other index is a ratio of levels.
    pub async fn monthly_percentage_change(
        &self,
        country: &CountryCode,
        index_type: IndexType,
    ) -> Result<Decimal> {
        if index_type == IndexType::None {
            return Ok(Decimal::ZERO);
        }

        if index_type == IndexType::ConsumerPrice {
            let Some(latest) = self.latest(country, index_type).await? else {
                warn!(
                    %country,
                    reason = "no data",
                    "no consumer-price value for monthly change, returning zero"
                );
                return Ok(Decimal::ZERO);
            };
            return Ok(round_half_up(latest.value, AMOUNT_SCALE));
        }

        let today = self.clock.today();
        let one_month_ago = minus_months(today, 1);

        let current = self.latest(country, index_type).await?;
        let month_ago = self
            .closest_on_or_before(country, index_type, one_month_ago)
            .await?;

        let (Some(current), Some(month_ago)) = (current, month_ago) else {
            warn!(
                %country,
                index_type = %index_type,
                reason = "no data",
                "cannot compute monthly change, returning zero"
            );
            return Ok(Decimal::ZERO);
        };

        if month_ago.value.is_zero() {
            return Ok(Decimal::ZERO);
        }

        Ok(round_half_up(
            (current.value / month_ago.value - Decimal::ONE) * Decimal::ONE_HUNDRED,
            AMOUNT_SCALE,
        ))
    }

    /// Applies the adjustment factor for [from_date, to_date] to a base
    /// amount, rounded to cents. Non-positive amounts and the `None` index
    /// pass through unchanged.
    pub async fn adjusted_amount(
        &self,
        base_amount: Decimal,
        country: &CountryCode,
        index_type: IndexType,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Decimal> {
        if base_amount <= Decimal::ZERO || index_type == IndexType::None {
            return Ok(base_amount);
        }

        let factor = self
            .adjustment_factor(country, index_type, from_date, to_date)
            .await?;
        let adjusted = round_half_up(base_amount * factor, AMOUNT_SCALE);

        info!(
            %country,
            index_type = %index_type,
            base = %base_amount,
            factor = %factor,
            adjusted = %adjusted,
            %from_date,
            %to_date,
            "computed adjusted amount"
        );

        Ok(adjusted)
    }

    /// Fetches the latest observations from every fetcher registered for
    /// `country` and stores the ones not seen before.
    ///
    /// A fetcher returning nothing (including after an internal failure) or a
    /// store error for one fetcher does not block the others.
    pub async fn refresh(&self, country: &CountryCode) -> RefreshSummary {
        info!(%country, "refreshing indices");
        let mut summary = RefreshSummary::default();

        for fetcher in &self.fetchers {
            if fetcher.country() != country {
                continue;
            }

            let observations = fetcher.fetch_latest().await;
            match self.store_new(&observations).await {
                Ok(inserted) => {
                    info!(
                        fetcher = fetcher.name(),
                        fetched = observations.len(),
                        inserted,
                        "refresh pass complete"
                    );
                    summary.absorb(RefreshSummary {
                        fetched: observations.len(),
                        inserted,
                    });
                }
                Err(e) => {
                    error!(fetcher = fetcher.name(), error = %e, "failed to store refreshed observations");
                }
            }
        }

        summary
    }

    /// Refreshes every country any registered fetcher covers.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let countries: BTreeSet<CountryCode> = self
            .fetchers
            .iter()
            .map(|f| f.country().clone())
            .collect();

        let mut summary = RefreshSummary::default();
        for country in countries {
            summary.absorb(self.refresh(&country).await);
        }
        summary
    }

    /// One-time historical population: pulls the full series from every
    /// fetcher and stores what is missing. Fully idempotent.
    pub async fn backfill(&self) -> RefreshSummary {
        info!("backfilling historical index data");
        let mut summary = RefreshSummary::default();

        for fetcher in &self.fetchers {
            let observations = fetcher.fetch_all_historical().await;
            match self.store_new(&observations).await {
                Ok(inserted) => {
                    info!(
                        fetcher = fetcher.name(),
                        fetched = observations.len(),
                        inserted,
                        "backfill pass complete"
                    );
                    summary.absorb(RefreshSummary {
                        fetched: observations.len(),
                        inserted,
                    });
                }
                Err(e) => {
                    error!(fetcher = fetcher.name(), error = %e, "failed to store backfilled observations");
                }
            }
        }

        info!(
            fetched = summary.fetched,
            inserted = summary.inserted,
            "backfill complete"
        );
        summary
    }

    async fn store_new(&self, observations: &[IndexObservation]) -> Result<usize> {
        let mut inserted = 0;
        for obs in observations {
            if self
                .store
                .exists(obs.index_type, &obs.country, obs.value_date)
                .await?
            {
                debug!(
                    index_type = %obs.index_type,
                    country = %obs.country,
                    date = %obs.value_date,
                    "observation already stored"
                );
                continue;
            }
            if self.store.insert(obs).await? {
                inserted += 1;
                debug!(
                    index_type = %obs.index_type,
                    country = %obs.country,
                    date = %obs.value_date,
                    value = %obs.value,
                    "stored new observation"
                );
            } else {
                // Lost a race with a concurrent refresh; the row is there.
                debug!(
                    index_type = %obs.index_type,
                    country = %obs.country,
                    date = %obs.value_date,
                    "observation inserted concurrently"
                );
            }
        }
        Ok(inserted)
    }
}

fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Calendar-aware month subtraction, clamping to the last day of shorter
/// months (e.g. Mar 31 minus one month is Feb 28/29).
fn minus_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
