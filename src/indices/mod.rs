mod fetcher;
pub mod fetchers;
mod jsonl_store;
mod model;
mod service;
mod store;

pub use fetcher::IndexFetcher;
pub use jsonl_store::JsonlIndexStore;
pub use model::{
    CountryCode, IndexObservation, IndexType, ParseCountryCodeError, ParseIndexTypeError,
};
pub use service::{IndexService, RefreshSummary};
pub use store::{IndexStore, MemoryIndexStore};
