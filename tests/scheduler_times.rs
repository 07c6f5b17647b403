use chrono::TimeZone;
use chrono_tz::America::Argentina::Buenos_Aires;
use chrono_tz::Tz;
use rentindex::scheduler::{next_occurrence, Cadence, JobSpec};

// 2025-06-06 is a Friday, 2025-06-07 a Saturday, 2025-06-09 a Monday.

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::DateTime<Tz> {
    Buenos_Aires.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn hourly_business_hours() -> JobSpec {
    JobSpec {
        name: "exchange-rates",
        cadence: Cadence::HourlyBetween {
            start_hour: 10,
            end_hour: 18,
        },
        weekdays_only: true,
    }
}

#[test]
fn hourly_job_fires_on_the_next_hour_within_range() {
    let next = next_occurrence(&hourly_business_hours(), at(2025, 6, 6, 17, 30)).unwrap();
    assert_eq!(next, at(2025, 6, 6, 18, 0));
}

#[test]
fn hourly_job_is_strictly_after_the_reference_instant() {
    let next = next_occurrence(&hourly_business_hours(), at(2025, 6, 6, 10, 0)).unwrap();
    assert_eq!(next, at(2025, 6, 6, 11, 0));
}

#[test]
fn hourly_job_past_closing_waits_for_the_next_business_day() {
    let next = next_occurrence(&hourly_business_hours(), at(2025, 6, 6, 18, 30)).unwrap();
    assert_eq!(next, at(2025, 6, 9, 10, 0));
}

#[test]
fn weekday_job_skips_the_weekend() {
    let spec = JobSpec {
        name: "rental-contract-index",
        cadence: Cadence::DailyAt { hour: 10 },
        weekdays_only: true,
    };
    let next = next_occurrence(&spec, at(2025, 6, 7, 12, 0)).unwrap();
    assert_eq!(next, at(2025, 6, 9, 10, 0));
}

#[test]
fn daily_job_runs_through_the_weekend() {
    let spec = JobSpec {
        name: "consumer-price-index",
        cadence: Cadence::DailyAt { hour: 17 },
        weekdays_only: false,
    };
    let next = next_occurrence(&spec, at(2025, 6, 6, 17, 0)).unwrap();
    assert_eq!(next, at(2025, 6, 7, 17, 0));
}

#[test]
fn daily_job_fires_later_the_same_day_when_still_due() {
    let spec = JobSpec {
        name: "consumer-price-index",
        cadence: Cadence::DailyAt { hour: 17 },
        weekdays_only: false,
    };
    let next = next_occurrence(&spec, at(2025, 6, 6, 9, 15)).unwrap();
    assert_eq!(next, at(2025, 6, 6, 17, 0));
}
