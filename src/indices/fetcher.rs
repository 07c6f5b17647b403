use super::{CountryCode, IndexObservation, IndexType};

/// Capability contract for one external index source.
///
/// Fetch methods never fail: transport and parse problems are logged inside
/// the fetcher and surface as an empty result, so one broken source cannot
/// poison a refresh cycle that covers several.
#[async_trait::async_trait]
pub trait IndexFetcher: Send + Sync {
    /// Index types this source publishes.
    fn supported_index_types(&self) -> &[IndexType];

    /// Country the published series apply to.
    fn country(&self) -> &CountryCode;

    /// The most recent available observation(s).
    async fn fetch_latest(&self) -> Vec<IndexObservation>;

    /// The full available history.
    ///
    /// Sources without a bulk endpoint fall back to the latest value.
    async fn fetch_all_historical(&self) -> Vec<IndexObservation> {
        self.fetch_latest().await
    }

    fn name(&self) -> &str;
}
