//! Location-derived metadata for installations.
//!
//! Both lookups degrade to `None` on any failure: a missing timezone or place
//! name never blocks registering an installation.

pub mod geocoder;
pub mod timezone;

pub use geocoder::PlaceResolver;
pub use timezone::{parse_zone, to_local, TimezoneResolver};
