//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each item has an ease factor (EF) that adjusts based on performance
//! - Quality 1-2: reset interval and repetitions, EF drops by a flat 0.15
//! - Quality 3-5: increase interval progressively (1 day → 6 days → interval × EF)
//! - EF has a minimum value of 1.3
//!
//! `today` is always supplied by the caller; nothing in here reads a clock.

use super::quality::Quality;
use super::schedule_record::{INITIAL_EASE_FACTOR, MIN_EASE_FACTOR, ScheduleRecord};
use chrono::{Days, NaiveDate};

/// EF penalty applied on every failed review.
pub const FAILURE_EASE_PENALTY: f64 = 0.15;

/// Upper bound on a scheduled interval (100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Computes the schedule that follows a review of `item_id` rated `quality`
/// on `today`. `prior` is `None` for an item that was never reviewed.
///
/// The interval is shortened when `today + interval` would pass
/// `NaiveDate::MAX`, so `next_review_date == today + interval` holds for any
/// `today` before `NaiveDate::MAX`. A review dated `NaiveDate::MAX` itself
/// cannot be scheduled later and keeps `next_review_date` at that date.
pub fn update(
    prior: Option<&ScheduleRecord>,
    item_id: &str,
    quality: Quality,
    today: NaiveDate,
) -> ScheduleRecord {
    let Some(prior) = prior else {
        let repetitions = if quality.is_pass() { 1 } else { 0 };
        return scheduled(item_id, 1, INITIAL_EASE_FACTOR, repetitions, today);
    };

    if !quality.is_pass() {
        // History beyond the ease factor is discarded
        let ease = floor_ease(prior.ease_factor - FAILURE_EASE_PENALTY);
        return scheduled(item_id, 1, ease, 0, today);
    }

    // Interval is chosen from the repetition count before it is incremented
    let interval = match prior.repetitions {
        0 => 1,
        1 => 6,
        _ => grow_interval(prior.interval, prior.ease_factor),
    };

    let q = f64::from(quality.value());
    let ease = floor_ease(prior.ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)));

    scheduled(
        item_id,
        interval,
        ease,
        prior.repetitions.saturating_add(1),
        today,
    )
}

/// Interval each rating would produce if the item were reviewed on `today`.
pub fn preview_intervals(prior: Option<&ScheduleRecord>, today: NaiveDate) -> Vec<(Quality, u32)> {
    let item_id = prior.map(|p| p.item_id.as_str()).unwrap_or("preview");
    Quality::all()
        .map(|q| (q, update(prior, item_id, q, today).interval))
        .collect()
}

/// Format an interval in days as a short human-readable string.
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

fn floor_ease(ease: f64) -> f64 {
    if ease.is_nan() {
        return MIN_EASE_FACTOR;
    }
    ease.max(MIN_EASE_FACTOR)
}

fn grow_interval(interval: u32, ease: f64) -> u32 {
    let grown = (f64::from(interval) * ease).round();
    if grown.is_nan() || grown < 1.0 {
        return 1;
    }
    grown.min(f64::from(MAX_INTERVAL_DAYS)) as u32
}

fn scheduled(
    item_id: &str,
    interval: u32,
    ease_factor: f64,
    repetitions: u32,
    today: NaiveDate,
) -> ScheduleRecord {
    // Never schedule past the last representable date
    let days_left = u32::try_from((NaiveDate::MAX - today).num_days()).unwrap_or(u32::MAX);
    let interval = interval.min(days_left).max(1);
    let next_review_date = today
        .checked_add_days(Days::new(u64::from(interval)))
        .unwrap_or(NaiveDate::MAX);

    ScheduleRecord {
        item_id: item_id.to_string(),
        next_review_date,
        interval,
        ease_factor,
        repetitions,
        last_review_date: Some(today),
    }
}
