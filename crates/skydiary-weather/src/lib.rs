//! Weather resolution for SkyDiary
//!
//! Fetches current conditions from OpenWeatherMap and resolves per-date
//! snapshots through a persistent cache.

pub mod cache;
pub mod provider;
pub mod types;

pub use cache::{SnapshotStore, WeatherCache};
pub use provider::{OpenWeatherProvider, WeatherSource};
pub use types::*;
