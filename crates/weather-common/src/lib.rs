//! Common types and utilities shared across the weather products services.

pub mod batch;
pub mod coordinate;
pub mod error;
pub mod record;
pub mod secrets;

pub use batch::{decode_batch, encode_batch, encode_record};
pub use coordinate::{Coordinate, Units};
pub use error::{WeatherError, WeatherResult};
pub use record::{record_id, NormalizedRecord, ID_LENGTH, SOURCE_TAG};
pub use secrets::{load_env_file, resolve_secret};
