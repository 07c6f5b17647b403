use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rentindex::clock::FixedClock;
use rentindex::indices::{
    CountryCode, IndexObservation, IndexService, IndexStore, IndexType, MemoryIndexStore,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ar() -> CountryCode {
    "AR".parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn obs(ty: IndexType, on: NaiveDate, value: Decimal) -> IndexObservation {
    IndexObservation {
        index_type: ty,
        country: ar(),
        value_date: on,
        value,
        source: "test".to_string(),
        raw_response: None,
        created_at: Utc::now(),
    }
}

/// Service over a seeded in-memory store, with "today" fixed.
async fn service_with(
    seed: Vec<IndexObservation>,
    today: NaiveDate,
) -> Result<IndexService> {
    let store = Arc::new(MemoryIndexStore::new());
    for observation in &seed {
        assert!(store.insert(observation).await?);
    }
    Ok(IndexService::new(store, Vec::new()).with_clock(Arc::new(FixedClock::on_date(today))))
}

#[tokio::test]
async fn none_index_factor_is_exactly_one() -> Result<()> {
    // Stored data must not matter for the sentinel type.
    let service = service_with(
        vec![obs(IndexType::ExchangeOfficial, date(2025, 1, 1), dec!(900))],
        date(2025, 7, 15),
    )
    .await?;

    let factor = service
        .adjustment_factor(&ar(), IndexType::None, date(2025, 1, 1), date(2025, 7, 1))
        .await?;
    assert_eq!(factor, Decimal::ONE);
    Ok(())
}

#[tokio::test]
async fn missing_data_degrades_to_identity_factor() -> Result<()> {
    let service = service_with(Vec::new(), date(2025, 7, 15)).await?;
    let factor = service
        .adjustment_factor(
            &ar(),
            IndexType::ExchangeBlue,
            date(2025, 1, 1),
            date(2025, 7, 1),
        )
        .await?;
    assert_eq!(factor, Decimal::ONE);
    Ok(())
}

#[tokio::test]
async fn zero_from_value_degrades_to_identity_factor() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::RentalContract, date(2025, 1, 1), dec!(0)),
            obs(IndexType::RentalContract, date(2025, 7, 1), dec!(5)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let factor = service
        .adjustment_factor(
            &ar(),
            IndexType::RentalContract,
            date(2025, 1, 1),
            date(2025, 7, 1),
        )
        .await?;
    assert_eq!(factor, Decimal::ONE);
    Ok(())
}

#[tokio::test]
async fn factor_is_ratio_rounded_to_six_digits() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::ExchangeOfficial, date(2025, 1, 1), dec!(900)),
            obs(IndexType::ExchangeOfficial, date(2025, 1, 31), dec!(950)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let factor = service
        .adjustment_factor(
            &ar(),
            IndexType::ExchangeOfficial,
            date(2025, 1, 1),
            date(2025, 1, 31),
        )
        .await?;
    assert_eq!(factor, dec!(1.055556));
    Ok(())
}

#[tokio::test]
async fn factor_endpoints_use_closest_prior_values() -> Result<()> {
    // Both endpoints fall on dates without a published value.
    let service = service_with(
        vec![
            obs(IndexType::ExchangeOfficial, date(2025, 1, 3), dec!(900)),
            obs(IndexType::ExchangeOfficial, date(2025, 1, 30), dec!(950)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let factor = service
        .adjustment_factor(
            &ar(),
            IndexType::ExchangeOfficial,
            date(2025, 1, 5),
            date(2025, 2, 1),
        )
        .await?;
    assert_eq!(factor, dec!(1.055556));
    Ok(())
}

#[tokio::test]
async fn factor_rounds_midpoint_up_at_six_digits() -> Result<()> {
    // 2000001 / 2000000 is exactly 1.0000005.
    let service = service_with(
        vec![
            obs(IndexType::RentalContract, date(2025, 1, 1), dec!(2000000)),
            obs(IndexType::RentalContract, date(2025, 2, 1), dec!(2000001)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let factor = service
        .adjustment_factor(
            &ar(),
            IndexType::RentalContract,
            date(2025, 1, 1),
            date(2025, 2, 1),
        )
        .await?;
    assert_eq!(factor, dec!(1.000001));
    Ok(())
}

#[tokio::test]
async fn annual_change_compounds_consumer_price_months() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::ConsumerPrice, date(2025, 5, 1), dec!(2.0)),
            obs(IndexType::ConsumerPrice, date(2025, 6, 1), dec!(3.0)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    // (1.02 * 1.03 - 1) * 100 = 5.06
    let change = service
        .annual_percentage_change(&ar(), IndexType::ConsumerPrice)
        .await?;
    assert_eq!(change, dec!(5.06));
    Ok(())
}

#[tokio::test]
async fn annual_change_excludes_months_older_than_a_year() -> Result<()> {
    let service = service_with(
        vec![
            // Outside the trailing year; must not be compounded.
            obs(IndexType::ConsumerPrice, date(2024, 6, 1), dec!(10.0)),
            obs(IndexType::ConsumerPrice, date(2025, 5, 1), dec!(2.0)),
            obs(IndexType::ConsumerPrice, date(2025, 6, 1), dec!(3.0)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let change = service
        .annual_percentage_change(&ar(), IndexType::ConsumerPrice)
        .await?;
    assert_eq!(change, dec!(5.06));
    Ok(())
}

#[tokio::test]
async fn annual_change_is_simple_ratio_for_level_indices() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::RentalContract, date(2024, 7, 1), dec!(100)),
            obs(IndexType::RentalContract, date(2025, 7, 1), dec!(125)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let change = service
        .annual_percentage_change(&ar(), IndexType::RentalContract)
        .await?;
    assert_eq!(change, dec!(25.00));
    Ok(())
}

#[tokio::test]
async fn annual_change_missing_history_is_zero() -> Result<()> {
    let service = service_with(Vec::new(), date(2025, 7, 15)).await?;
    assert_eq!(
        service
            .annual_percentage_change(&ar(), IndexType::ConsumerPrice)
            .await?,
        Decimal::ZERO
    );
    assert_eq!(
        service
            .annual_percentage_change(&ar(), IndexType::ExchangeBlue)
            .await?,
        Decimal::ZERO
    );
    Ok(())
}

#[tokio::test]
async fn monthly_change_returns_consumer_price_value_directly() -> Result<()> {
    // The stored value already is the month's percentage change; no ratio.
    let service = service_with(
        vec![obs(IndexType::ConsumerPrice, date(2025, 6, 1), dec!(2.345))],
        date(2025, 7, 15),
    )
    .await?;

    let change = service
        .monthly_percentage_change(&ar(), IndexType::ConsumerPrice)
        .await?;
    assert_eq!(change, dec!(2.35));
    Ok(())
}

#[tokio::test]
async fn monthly_change_is_ratio_for_level_indices() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::ExchangeOfficial, date(2025, 6, 10), dec!(1000)),
            obs(IndexType::ExchangeOfficial, date(2025, 7, 10), dec!(1100)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let change = service
        .monthly_percentage_change(&ar(), IndexType::ExchangeOfficial)
        .await?;
    assert_eq!(change, dec!(10.00));
    Ok(())
}

#[tokio::test]
async fn adjusted_amount_applies_factor_rounded_to_cents() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::ExchangeOfficial, date(2025, 1, 1), dec!(900)),
            obs(IndexType::ExchangeOfficial, date(2025, 1, 31), dec!(950)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    // 1000 * 1.055556 = 1055.556 -> 1055.56
    let adjusted = service
        .adjusted_amount(
            dec!(1000),
            &ar(),
            IndexType::ExchangeOfficial,
            date(2025, 1, 1),
            date(2025, 1, 31),
        )
        .await?;
    assert_eq!(adjusted, dec!(1055.56));
    Ok(())
}

#[tokio::test]
async fn adjusted_amount_passes_through_none_and_non_positive() -> Result<()> {
    let service = service_with(
        vec![
            obs(IndexType::ExchangeOfficial, date(2025, 1, 1), dec!(900)),
            obs(IndexType::ExchangeOfficial, date(2025, 1, 31), dec!(950)),
        ],
        date(2025, 7, 15),
    )
    .await?;

    let base = dec!(1000);
    assert_eq!(
        service
            .adjusted_amount(
                base,
                &ar(),
                IndexType::None,
                date(2025, 1, 1),
                date(2025, 1, 31)
            )
            .await?,
        base
    );
    assert_eq!(
        service
            .adjusted_amount(
                dec!(0),
                &ar(),
                IndexType::ExchangeOfficial,
                date(2025, 1, 1),
                date(2025, 1, 31)
            )
            .await?,
        dec!(0)
    );
    assert_eq!(
        service
            .adjusted_amount(
                dec!(-50),
                &ar(),
                IndexType::ExchangeOfficial,
                date(2025, 1, 1),
                date(2025, 1, 31)
            )
            .await?,
        dec!(-50)
    );
    Ok(())
}
