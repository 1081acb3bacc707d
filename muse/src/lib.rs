//! # Muse
//!
//! Time-aware content rotation for DaemonOS.
//!
//! ## Features
//!
//! - **Time-of-day buckets**: morning, afternoon and evening content
//! - **Context categories**: content keyed by the current weather
//! - **Date patterns**: regular-expression keys matched against the date
//! - **Daily windows**: a different slice of the pool every day
//! - **Rotation**: sequential with a persisted cursor, or random without
//!   immediate repeats
//! - **Aligned ticks**: minute, hour and day intervals land on the boundary

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod pool;
pub mod remote;
pub mod rotation;
pub mod schedule;
pub mod store;
pub mod weather;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ContentConfig, DayPartHours, MuseConfig, ScheduleConfig};
pub use engine::{Engine, EngineStatus, RenderTick, Renderer, SharedEngine};
pub use error::{MuseError, Result};
pub use pool::{DayPart, PoolResolver};
pub use rotation::{RotationSelector, RotationState, Selection};
pub use schedule::{Alignment, ScheduleAligner, ScheduleHandle, TickHandler};
pub use store::{FileStore, MemoryStore, PersistenceStore};
pub use weather::ContextUpdate;
