//! fh-core: shared foundation for floorheat.
//!
//! Contains:
//! - numeric (Real + float helpers for clamping, rounding and parsing readings)
//! - clock (wall clock abstraction, manual clock for tests and replay)
//! - ids (room identifiers)
//! - error (shared error types)

pub mod clock;
pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use clock::{Clock, ManualClock, SystemClock, Timestamp, hours_between};
pub use error::{CoreError, CoreResult};
pub use ids::{RoomId, slugify};
pub use numeric::*;
