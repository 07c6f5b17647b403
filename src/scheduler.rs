//! Timezone-aware refresh scheduling.
//!
//! Each job sleeps until its next occurrence, runs the service operation,
//! and goes back to sleep; a failed run is logged and never stops the loop.
//! Occurrences land on the hour in the configured local timezone, optionally
//! restricted to business days.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::config::ScheduleConfig;
use crate::indices::{CountryCode, IndexService};

/// When a job fires within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// On the hour, every hour in [start_hour, end_hour] inclusive.
    HourlyBetween { start_hour: u32, end_hour: u32 },
    /// Once a day at the given hour.
    DailyAt { hour: u32 },
}

impl Cadence {
    fn hours(&self) -> std::ops::RangeInclusive<u32> {
        match *self {
            Cadence::HourlyBetween {
                start_hour,
                end_hour,
            } => start_hour..=end_hour,
            Cadence::DailyAt { hour } => hour..=hour,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: &'static str,
    pub cadence: Cadence,
    pub weekdays_only: bool,
}

/// First on-the-hour occurrence of `spec` strictly after `after`.
///
/// Returns `None` only for degenerate specs (empty hour range); ambiguous or
/// skipped local times around a DST transition resolve to the earliest valid
/// instant on a later scan step.
pub fn next_occurrence(spec: &JobSpec, after: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = after.timezone();
    // Two weeks is enough to clear any run of weekend days and DST gaps.
    for day_offset in 0..=14i64 {
        let date = after.date_naive() + Duration::days(day_offset);
        if spec.weekdays_only && is_weekend(date.weekday()) {
            continue;
        }
        for hour in spec.cadence.hours() {
            let Some(candidate) = tz
                .with_ymd_and_hms(date.year(), date.month(), date.day(), hour, 0, 0)
                .earliest()
            else {
                continue;
            };
            if candidate > after {
                return Some(candidate);
            }
        }
    }
    None
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

enum JobAction {
    Refresh(CountryCode),
}

struct Job {
    spec: JobSpec,
    action: JobAction,
}

/// Process-scoped job runner. Holds no business state, only registrations;
/// the service is shared behind an `Arc`.
pub struct RefreshScheduler {
    service: Arc<IndexService>,
    tz: Tz,
    jobs: Vec<Job>,
    backfill_delay: Option<std::time::Duration>,
}

impl RefreshScheduler {
    /// Standard job table: exchange rates hourly within business hours on
    /// business days, the rental-contract index daily on business days, the
    /// consumer-price index daily every day (its publication date varies
    /// month to month), plus a one-shot backfill shortly after startup.
    pub fn from_config(
        service: Arc<IndexService>,
        schedule: &ScheduleConfig,
        country: CountryCode,
    ) -> anyhow::Result<Self> {
        let tz: Tz = schedule
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {e}", schedule.timezone))?;

        let jobs = vec![
            Job {
                spec: JobSpec {
                    name: "exchange-rates",
                    cadence: Cadence::HourlyBetween {
                        start_hour: schedule.exchange_start_hour,
                        end_hour: schedule.exchange_end_hour,
                    },
                    weekdays_only: true,
                },
                action: JobAction::Refresh(country.clone()),
            },
            Job {
                spec: JobSpec {
                    name: "rental-contract-index",
                    cadence: Cadence::DailyAt {
                        hour: schedule.rental_contract_hour,
                    },
                    weekdays_only: true,
                },
                action: JobAction::Refresh(country.clone()),
            },
            Job {
                spec: JobSpec {
                    name: "consumer-price-index",
                    cadence: Cadence::DailyAt {
                        hour: schedule.consumer_price_hour,
                    },
                    weekdays_only: false,
                },
                action: JobAction::Refresh(country),
            },
        ];

        let backfill_delay = schedule
            .backfill_on_start
            .then(|| std::time::Duration::from_secs(schedule.backfill_delay_secs));

        Ok(Self {
            service,
            tz,
            jobs,
            backfill_delay,
        })
    }

    /// Runs every registered job until the future is dropped.
    pub async fn run(self) {
        let mut handles = Vec::new();

        if let Some(delay) = self.backfill_delay {
            let service = self.service.clone();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let summary = service.backfill().await;
                info!(
                    fetched = summary.fetched,
                    inserted = summary.inserted,
                    "startup backfill finished"
                );
            }));
        }

        for job in self.jobs {
            let service = self.service.clone();
            let tz = self.tz;
            handles.push(tokio::spawn(run_job(service, tz, job)));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler task aborted");
            }
        }
    }
}

async fn run_job(service: Arc<IndexService>, tz: Tz, job: Job) {
    loop {
        let now = Utc::now().with_timezone(&tz);
        let Some(next) = next_occurrence(&job.spec, now) else {
            error!(job = job.spec.name, "job has no next occurrence, stopping");
            return;
        };

        let wait = (next - now).to_std().unwrap_or_default();
        info!(job = job.spec.name, next = %next, "job scheduled");
        tokio::time::sleep(wait).await;

        info!(job = job.spec.name, "job running");
        match &job.action {
            JobAction::Refresh(country) => {
                let summary = service.refresh(country).await;
                info!(
                    job = job.spec.name,
                    fetched = summary.fetched,
                    inserted = summary.inserted,
                    "job finished"
                );
            }
        }
    }
}
