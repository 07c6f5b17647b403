use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{CountryCode, IndexObservation, IndexStore, IndexType};

/// Append-only JSONL store: one file per (country, index type) series.
///
/// Layout: `<base>/series/<COUNTRY>/<INDEX_TYPE>.jsonl`, one observation per
/// line. Reads load the whole series and filter in memory; index series are
/// small (daily points at most). A process-wide write lock makes the
/// check-and-append in [`IndexStore::insert`] atomic, so the per-date
/// uniqueness invariant holds on disk.
pub struct JsonlIndexStore {
    base_path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlIndexStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn series_file(&self, index_type: IndexType, country: &CountryCode) -> PathBuf {
        self.base_path
            .join("series")
            .join(country.as_str())
            .join(format!("{}.jsonl", index_type.as_str()))
    }

    fn country_dir(&self, country: &CountryCode) -> PathBuf {
        self.base_path.join("series").join(country.as_str())
    }

    async fn read_series(
        &self,
        index_type: IndexType,
        country: &CountryCode,
    ) -> Result<Vec<IndexObservation>> {
        let path = self.series_file(index_type, country);
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()))
            }
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: IndexObservation = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        items.sort_by_key(|obs| obs.value_date);
        Ok(items)
    }

    async fn append(&self, observation: &IndexObservation) -> Result<()> {
        let path = self.series_file(observation.index_type, &observation.country);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create series directory")?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {} for append", path.display()))?;

        let line = serde_json::to_string(observation).context("Failed to serialize observation")?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IndexStore for JsonlIndexStore {
    async fn get_latest(
        &self,
        index_type: IndexType,
        country: &CountryCode,
    ) -> Result<Option<IndexObservation>> {
        let series = self.read_series(index_type, country).await?;
        Ok(series.into_iter().next_back())
    }

    async fn get_at_date(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        date: NaiveDate,
    ) -> Result<Option<IndexObservation>> {
        let series = self.read_series(index_type, country).await?;
        Ok(series.into_iter().find(|obs| obs.value_date == date))
    }

    async fn get_closest_on_or_before(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        target: NaiveDate,
    ) -> Result<Option<IndexObservation>> {
        let series = self.read_series(index_type, country).await?;
        Ok(series
            .into_iter()
            .filter(|obs| obs.value_date <= target)
            .next_back())
    }

    async fn get_range(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IndexObservation>> {
        let series = self.read_series(index_type, country).await?;
        let mut in_range: Vec<IndexObservation> = series
            .into_iter()
            .filter(|obs| obs.value_date >= from && obs.value_date <= to)
            .collect();
        in_range.reverse();
        Ok(in_range)
    }

    async fn get_all_latest(&self, country: &CountryCode) -> Result<Vec<IndexObservation>> {
        let dir = self.country_dir(country);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", dir.display())),
        };

        let mut latest = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(index_type) = stem.parse::<IndexType>() else {
                tracing::warn!(file = %path.display(), "skipping unrecognized series file");
                continue;
            };
            if let Some(obs) = self.get_latest(index_type, country).await? {
                latest.push(obs);
            }
        }
        latest.sort_by_key(|obs| obs.index_type.as_str());
        Ok(latest)
    }

    async fn exists(
        &self,
        index_type: IndexType,
        country: &CountryCode,
        date: NaiveDate,
    ) -> Result<bool> {
        Ok(self.get_at_date(index_type, country, date).await?.is_some())
    }

    async fn insert(&self, observation: &IndexObservation) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self
            .exists(
                observation.index_type,
                &observation.country,
                observation.value_date,
            )
            .await?
        {
            return Ok(false);
        }
        self.append(observation).await?;
        Ok(true)
    }
}
