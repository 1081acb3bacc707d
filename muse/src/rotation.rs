//! Rotation through the daily window of a pool
//!
//! Each calendar day addresses a contiguous slice ("window") of
//! `max_items_per_day` items inside the pool:
//!
//! ```text
//! factor = pool_len / max_items_per_day
//! start  = (day_of_year % factor) * max_items_per_day
//! item   = pool[start + index]
//! ```
//!
//! `index` walks the window in order (sequential mode) or is drawn at random
//! without repeating the previous draw (random mode). The sequential cursor
//! is written to the [`PersistenceStore`] after every step so a restart
//! continues where the last run stopped.

use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::store::PersistenceStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Store key of the sequential cursor
pub const CURSOR_KEY: &str = "lastQuoteIndex";

/// Cursor lifetime in the store
pub const CURSOR_TTL_DAYS: u32 = 365;

/// Rotation cursor threaded through every selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Last sequential index shown, `-1` before the first one
    pub last_index_used: i64,
    /// Previous random draw; never persisted
    pub last_random_index: Option<usize>,
    /// Whether the cursor has been read back from the store
    pub hydrated: bool,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            last_index_used: -1,
            last_random_index: None,
            hydrated: false,
        }
    }
}

/// Result of one selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Chosen text, empty when nothing could be chosen
    pub item: String,
    /// Window-relative index, `None` when the pool was too small
    pub index: Option<usize>,
    pub state: RotationState,
}

/// First pool position of today's window
///
/// `None` when the pool cannot fill a single window.
pub fn window_start(pool_len: usize, max_items: usize, day_of_year: u32) -> Option<usize> {
    if max_items == 0 {
        return None;
    }
    let factor = pool_len / max_items;
    if factor == 0 {
        return None;
    }
    Some((day_of_year as usize % factor) * max_items)
}

/// Uniform index in `0..len` that differs from `previous`
pub fn random_index<R: Rng + ?Sized>(len: usize, previous: Option<usize>, rng: &mut R) -> usize {
    if len <= 1 {
        return 0;
    }
    loop {
        let index = rng.gen_range(0..len);
        if Some(index) != previous {
            return index;
        }
    }
}

/// Sequential step; wraps to 0 after the last window slot
pub fn next_sequential(last_index_used: i64, max_items: usize) -> usize {
    if last_index_used >= max_items as i64 - 1 {
        0
    } else {
        (last_index_used + 1) as usize
    }
}

/// Pick an item without touching the store
///
/// A pool smaller than one window, or an index past the end of the pool,
/// yields an empty item and leaves the cursor unchanged.
pub fn choose<R: Rng + ?Sized>(
    pool: &[&str],
    schedule: &ScheduleConfig,
    day_of_year: u32,
    state: RotationState,
    rng: &mut R,
) -> Selection {
    let max_items = schedule.max_items_per_day;

    let Some(start) = window_start(pool.len(), max_items, day_of_year) else {
        debug!(
            "Pool of {} items cannot fill a window of {}",
            pool.len(),
            max_items
        );
        return Selection {
            item: String::new(),
            index: None,
            state,
        };
    };

    let (index, state) = if schedule.random {
        let index = random_index(max_items, state.last_random_index, rng);
        (
            index,
            RotationState {
                last_random_index: Some(index),
                ..state
            },
        )
    } else {
        let index = next_sequential(state.last_index_used, max_items);
        (
            index,
            RotationState {
                last_index_used: index as i64,
                ..state
            },
        )
    };

    let item = pool
        .get(start + index)
        .map(|s| s.to_string())
        .unwrap_or_default();

    Selection {
        item,
        index: Some(index),
        state,
    }
}

/// Interpret a stored cursor; anything unusable starts fresh
fn parse_cursor(raw: &str, max_items: usize) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(stored) => {
            let last = stored - 1;
            if last < -1 || last >= max_items as i64 {
                -1
            } else {
                last
            }
        }
        Err(_) => -1,
    }
}

/// Selector that hydrates and persists the sequential cursor
pub struct RotationSelector<S> {
    store: S,
    rng: StdRng,
}

impl<S: PersistenceStore> RotationSelector<S> {
    pub fn new(store: S) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Selector with a fixed random source
    pub fn with_rng(store: S, rng: StdRng) -> Self {
        Self { store, rng }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Restore the cursor from the store once per process
    pub fn hydrate(&self, state: RotationState, max_items: usize) -> RotationState {
        if state.hydrated {
            return state;
        }

        let last_index_used = match self.store.get(CURSOR_KEY) {
            Ok(Some(raw)) => parse_cursor(&raw, max_items),
            Ok(None) => -1,
            Err(e) => {
                warn!("Could not read rotation cursor, starting fresh: {}", e);
                -1
            }
        };

        debug!("Rotation cursor hydrated at {}", last_index_used);

        RotationState {
            last_index_used,
            hydrated: true,
            ..state
        }
    }

    /// Write the cursor so the next run resumes after the last shown item
    pub fn persist(&self, state: &RotationState) -> Result<()> {
        let value = (state.last_index_used + 1).to_string();
        self.store.set(CURSOR_KEY, &value, CURSOR_TTL_DAYS)
    }

    /// Hydrate, choose and, in sequential mode, persist before returning
    pub fn select(
        &mut self,
        pool: &[&str],
        schedule: &ScheduleConfig,
        day_of_year: u32,
        state: RotationState,
    ) -> Selection {
        let state = self.hydrate(state, schedule.max_items_per_day);
        let selection = choose(pool, schedule, day_of_year, state, &mut self.rng);

        if !schedule.random && selection.index.is_some() {
            if let Err(e) = self.persist(&selection.state) {
                warn!("Failed to persist rotation cursor: {}", e);
            }
        }

        selection
    }

    /// Forget the stored cursor
    pub fn reset(&self) -> Result<RotationState> {
        self.store.erase(CURSOR_KEY)?;
        Ok(RotationState {
            hydrated: true,
            ..RotationState::default()
        })
    }
}
