//! Per-tick orchestration
//!
//! [`Engine`] ties the pool resolver, the rotation selector and the clock
//! together; [`RenderTick`] hands each selection to a [`Renderer`] on the
//! schedule.

use crate::clock::Clock;
use crate::config::{ContentConfig, MuseConfig, ScheduleConfig};
use crate::error::Result;
use crate::pool::{DayPart, PoolResolver};
use crate::rotation::{RotationSelector, RotationState};
use crate::schedule::TickHandler;
use crate::store::PersistenceStore;
use crate::weather::ContextUpdate;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Engine shared between the schedule and the IPC server
pub type SharedEngine<S> = Arc<RwLock<Engine<S>>>;

/// Rotation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    Sequential,
    Random,
}

/// Snapshot of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Item shown by the last tick
    pub current: String,
    pub category: Option<String>,
    pub mode: RotationMode,
    pub last_index_used: i64,
    pub max_items_per_day: usize,
    /// Size of the pool right now
    pub pool_size: usize,
    pub day_of_year: u32,
    pub day_part: DayPart,
    pub date: String,
    pub ticks: u64,
}

/// Content rotation engine
pub struct Engine<S> {
    content: Arc<ContentConfig>,
    schedule: ScheduleConfig,
    resolver: PoolResolver,
    selector: RotationSelector<S>,
    state: RotationState,
    clock: Arc<dyn Clock>,
    category: Option<String>,
    current: String,
    ticks: u64,
}

impl<S: PersistenceStore> Engine<S> {
    pub fn new(config: &MuseConfig, store: S, clock: Arc<dyn Clock>) -> Self {
        Self::with_selector(config, RotationSelector::new(store), clock)
    }

    /// Engine with a prepared selector (e.g., a seeded random source)
    pub fn with_selector(
        config: &MuseConfig,
        selector: RotationSelector<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            content: Arc::new(config.compliments.clone()),
            schedule: config.schedule.clone(),
            resolver: PoolResolver::new(config.day_parts, config.schedule.mock_date.clone()),
            selector,
            state: RotationState::default(),
            clock,
            category: None,
            current: String::new(),
            ticks: 0,
        }
    }

    /// Run one selection cycle and return the chosen text
    ///
    /// Never fails: an empty or undersized pool yields an empty string.
    pub fn next_item(&mut self) -> String {
        let now = self.clock.now();
        let content = Arc::clone(&self.content);
        let pool = self.resolver.resolve(&now, &content, self.category.as_deref());

        let selection = self
            .selector
            .select(&pool, &self.schedule, now.ordinal(), self.state);

        self.state = selection.state;
        self.ticks += 1;

        if selection.item.is_empty() {
            warn!(
                "Nothing to show: pool of {} items for a window of {}",
                pool.len(),
                self.schedule.max_items_per_day
            );
        } else {
            debug!("Selected {:?} (index {:?})", selection.item, selection.index);
        }

        self.current = selection.item.clone();
        selection.item
    }

    /// Text chosen by the last tick
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn set_category(&mut self, category: Option<String>) {
        debug!("Category set to {:?}", category);
        self.category = category;
    }

    /// Apply a context update from the host
    pub fn apply(&mut self, update: &ContextUpdate) {
        let category = update.category();
        if category.is_none() {
            debug!("No category for {:?}", update);
        }
        self.set_category(category.map(str::to_string));
    }

    /// Swap in a new content table as a whole
    pub fn replace_content(&mut self, content: Arc<ContentConfig>) {
        info!("Content replaced: {} items", content.item_count());
        self.content = content;
    }

    pub fn content(&self) -> Arc<ContentConfig> {
        Arc::clone(&self.content)
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn rotation_state(&self) -> RotationState {
        self.state
    }

    /// Erase the stored cursor and start the window over
    pub fn reset_rotation(&mut self) -> Result<()> {
        self.state = self.selector.reset()?;
        info!("Rotation cursor reset");
        Ok(())
    }

    pub fn status(&self) -> EngineStatus {
        let now = self.clock.now();
        let pool_size = self
            .resolver
            .resolve(&now, &self.content, self.category.as_deref())
            .len();

        EngineStatus {
            current: self.current.clone(),
            category: self.category.clone(),
            mode: if self.schedule.random {
                RotationMode::Random
            } else {
                RotationMode::Sequential
            },
            last_index_used: self.state.last_index_used,
            max_items_per_day: self.schedule.max_items_per_day,
            pool_size,
            day_of_year: now.ordinal(),
            day_part: self.resolver.day_part(&now),
            date: self.resolver.active_date(&now),
            ticks: self.ticks,
        }
    }
}

/// Split text on its line-break marker
pub fn split_segments(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Presentation collaborator
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, segments: &[&str], fade: Duration);
}

/// Tick that selects the next item and renders it
pub struct RenderTick<S, R> {
    engine: SharedEngine<S>,
    renderer: R,
    fade: Duration,
}

impl<S, R> RenderTick<S, R> {
    pub fn new(engine: SharedEngine<S>, renderer: R, fade: Duration) -> Self {
        Self {
            engine,
            renderer,
            fade,
        }
    }
}

impl<S: PersistenceStore + 'static, R: Renderer> TickHandler for RenderTick<S, R> {
    async fn on_tick(&mut self) {
        let text = self.engine.write().await.next_item();
        self.renderer.render(&split_segments(&text), self.fade);
    }
}
