//! Behavioural tests for pool resolution, rotation and scheduling
//!
//! These exercise the public API the way a host daemon uses it.

use chrono::{DateTime, FixedOffset, TimeZone};
use muse::rotation::{random_index, window_start, CURSOR_KEY, CURSOR_TTL_DAYS};
use muse::schedule::first_delay_ms;
use muse::{
    ContentConfig, DayPartHours, Engine, FileStore, ManualClock, MemoryStore, MuseConfig,
    PersistenceStore, PoolResolver, RotationSelector, RotationState, ScheduleConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tempfile::tempdir;

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .unwrap()
}

fn schedule(max_items: usize, random: bool) -> ScheduleConfig {
    ScheduleConfig {
        max_items_per_day: max_items,
        random,
        ..ScheduleConfig::default()
    }
}

fn memory_store() -> MemoryStore {
    MemoryStore::new(Arc::new(ManualClock::new(utc(2024, 6, 1, 12))))
}

#[test]
fn random_selection_never_repeats_immediately() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut previous = None;
    for _ in 0..2_000 {
        let index = random_index(4, previous, &mut rng);
        assert!(index < 4);
        assert_ne!(Some(index), previous);
        previous = Some(index);
    }

    for _ in 0..20 {
        assert_eq!(random_index(1, Some(0), &mut rng), 0);
    }
}

#[test]
fn random_selector_never_repeats_through_engine_state() {
    let items: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let pool: Vec<&str> = items.iter().map(String::as_str).collect();
    let mut selector = RotationSelector::with_rng(memory_store(), StdRng::seed_from_u64(9));
    let schedule = schedule(5, true);

    let mut state = RotationState::default();
    let mut last_item = String::new();
    for _ in 0..200 {
        let selection = selector.select(&pool, &schedule, 40, state);
        assert_ne!(selection.item, last_item);
        last_item = selection.item;
        state = selection.state;
    }
}

#[test]
fn sequential_selection_covers_window_then_wraps() {
    let items: Vec<String> = (0..5).map(|i| format!("q{}", i)).collect();
    let pool: Vec<&str> = items.iter().map(String::as_str).collect();
    let mut selector = RotationSelector::with_rng(memory_store(), StdRng::seed_from_u64(1));
    let schedule = schedule(5, false);

    let mut state = RotationState::default();
    let mut indices = Vec::new();
    for _ in 0..6 {
        let selection = selector.select(&pool, &schedule, 77, state);
        indices.push(selection.index.unwrap());
        state = selection.state;
    }
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 0]);
}

#[test]
fn window_is_stable_within_a_day() {
    let first = window_start(15, 5, 100);
    for _ in 0..10 {
        assert_eq!(window_start(15, 5, 100), first);
    }

    // factor 3: days congruent mod 3 share a window
    assert_eq!(window_start(15, 5, 100), window_start(15, 5, 103));
    assert_ne!(window_start(15, 5, 100), window_start(15, 5, 101));
    assert_eq!(window_start(15, 5, 100), Some(5));
}

#[test]
fn stored_cursor_is_read_back_minus_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(utc(2024, 6, 1, 12)));

    FileStore::new(&path, clock.clone())
        .set(CURSOR_KEY, "3", CURSOR_TTL_DAYS)
        .unwrap();

    let selector = RotationSelector::new(FileStore::new(&path, clock));
    let state = selector.hydrate(RotationState::default(), 5);
    assert_eq!(state.last_index_used, 2);
}

#[test]
fn restart_continues_after_last_shown_item() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(utc(2024, 1, 2, 10)));

    let mut config = MuseConfig::default();
    config.schedule.max_items_per_day = 4;
    config.compliments =
        ContentConfig::from_json_str(r#"{"anytime": ["a", "b", "c", "d"]}"#).unwrap();

    let mut first_run = Engine::new(&config, FileStore::new(&path, clock.clone()), clock.clone());
    assert_eq!(first_run.next_item(), "a");
    assert_eq!(first_run.next_item(), "b");
    drop(first_run);

    let mut second_run = Engine::new(&config, FileStore::new(&path, clock.clone()), clock);
    assert_eq!(second_run.next_item(), "c");
}

#[test]
fn corrupt_cursor_starts_fresh() {
    let store = memory_store();
    store.set(CURSOR_KEY, "not-a-number", CURSOR_TTL_DAYS).unwrap();
    let selector = RotationSelector::new(store);
    assert_eq!(selector.hydrate(RotationState::default(), 5).last_index_used, -1);
}

#[test]
fn hourly_interval_aligns_to_the_hour() {
    let t = 1_704_067_200_000_i64 + 900_000; // 2024-01-01 00:15 UTC
    assert_eq!(t % 3_600_000, 900_000);
    assert_eq!(first_delay_ms(3_600_000, t), 2_700_000);
}

#[test]
fn morning_bucket_wins_in_the_morning() {
    let hours = DayPartHours {
        morning_start: 3,
        morning_end: 12,
        ..DayPartHours::default()
    };
    let resolver = PoolResolver::new(hours, Some("2000-06-15".into()));
    let content = ContentConfig::from_json_str(
        r#"{"morning": ["m"], "afternoon": ["a"], "evening": ["e"], "anytime": ["any"]}"#,
    )
    .unwrap();

    let pool = resolver.resolve(&utc(2024, 6, 1, 10), &content, None);
    assert!(pool.contains(&"m"));
    assert!(!pool.contains(&"a"));
    assert!(!pool.contains(&"e"));
}

#[test]
fn date_pattern_matches_mock_date_at_any_hour() {
    let resolver = PoolResolver::new(DayPartHours::default(), Some("2024-01-01".into()));
    let content = ContentConfig::from_json_str(
        r#"{"anytime": ["any"], "evening": ["e"], "\\d{4}-01-01": ["Happy new year!"]}"#,
    )
    .unwrap();

    for hour in [0, 6, 13, 21] {
        let pool = resolver.resolve(&utc(2024, 7, 4, hour), &content, None);
        assert_eq!(pool.last(), Some(&"Happy new year!"));
    }
}

#[test]
fn undersized_pool_yields_empty_string() {
    let mut config = MuseConfig::default();
    config.schedule.max_items_per_day = 5;
    config.compliments = ContentConfig::from_json_str(r#"{"anytime": ["x", "y", "z"]}"#).unwrap();

    let clock = Arc::new(ManualClock::new(utc(2024, 6, 1, 12)));
    let mut engine = Engine::new(&config, MemoryStore::new(clock.clone()), clock);
    assert_eq!(engine.next_item(), "");
    assert_eq!(engine.next_item(), "");
}
