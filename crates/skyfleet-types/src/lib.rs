//! Platform-agnostic types for balloon fleet snapshots and forecasts.
//!
//! This crate provides the data shapes shared by the trajectory engine
//! (skyfleet-core) and any presentation layer built on top of it.
//!
//! # Features
//!
//! - Positional object identity ([`ObjectKey`])
//! - Snapshot parsing from the hourly fleet feed
//! - Forecast payload parsing with array-length validation
//! - Error types for data parsing
//!
//! # Example
//!
//! ```
//! use skyfleet_types::{ObjectKey, Snapshot};
//!
//! let snapshot = Snapshot::from_json(b"[[10.0, 20.0, 12.5], [-3.5, 151.2, 9.1]]").unwrap();
//! assert_eq!(snapshot.len(), 2);
//! let (key, position) = snapshot.iter().next().unwrap();
//! assert_eq!(key, ObjectKey::new(0));
//! assert_eq!(position.lat, 10.0);
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    ForecastPayload, HourlyConditions, HourlySeries, HourlyUnits, ObjectKey, Position, Snapshot,
};
