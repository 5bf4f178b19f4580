//! Current-weather collection library.
//!
//! Provides the three stages of the collection pipeline and the contract
//! that composes them:
//!
//! - [`source`]: fetch raw provider responses per coordinate
//! - [`transform`]: normalize responses into flat records
//! - [`publish`]: write one immutable NDJSON batch per run
//! - [`pipeline`]: fetch → transform → publish with observation hooks
//!
//! The library takes fully-resolved configuration; it never reads the
//! environment or the file system.

pub mod observer;
pub mod pipeline;
pub mod publish;
pub mod source;
pub mod transform;

// Re-exports
pub use observer::{MetricsObserver, RunObserver, Step};
pub use pipeline::{Pipeline, RunReport};
pub use publish::{BatchPublisher, PublishOutcome};
pub use source::{ObservationSource, OpenWeatherClient, RawObservation, RequestMeta, SourceConfig};
pub use transform::{transform, transform_at};
