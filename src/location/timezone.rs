use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

/// Offline coordinate → IANA timezone lookup.
///
/// Loading the polygon set takes a noticeable moment, so build one per process
/// and share it.
pub struct TimezoneResolver {
    finder: DefaultFinder,
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }

    /// Resolve the IANA zone containing a point.
    ///
    /// Returns `None` for out-of-range coordinates, points the dataset does not
    /// cover, or names `chrono-tz` does not know.
    #[must_use]
    pub fn resolve(&self, latitude: f64, longitude: f64) -> Option<String> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        let name = self.finder.get_tz_name(longitude, latitude);
        match parse_zone(name) {
            Some(tz) => Some(tz.name().to_string()),
            None => {
                tracing::debug!(latitude, longitude, zone = %name, "No usable timezone for coordinates");
                None
            }
        }
    }
}

/// Parse an IANA zone name; blank or unknown names yield `None`.
#[must_use]
pub fn parse_zone(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>().ok()
}

/// Project a UTC instant into a zone for display.
#[must_use]
pub fn to_local(instant: DateTime<Utc>, zone: &str) -> Option<DateTime<FixedOffset>> {
    parse_zone(zone).map(|tz| instant.with_timezone(&tz).fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_zone_rejects_blank_and_unknown() {
        assert!(parse_zone("").is_none());
        assert!(parse_zone("   ").is_none());
        assert!(parse_zone("Mars/Olympus_Mons").is_none());
        assert_eq!(parse_zone(" Asia/Shanghai ").map(|tz| tz.name()), Some("Asia/Shanghai"));
    }

    #[test]
    fn to_local_applies_offset_without_moving_instant() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let local = to_local(instant, "Asia/Shanghai").unwrap();

        assert_eq!(local.offset().local_minus_utc(), 8 * 3600);
        assert_eq!(local.to_rfc3339(), "2026-03-01T12:00:00+08:00");
        assert_eq!(local.with_timezone(&Utc), instant);
    }

    #[test]
    fn to_local_follows_dst() {
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap();

        let winter_local = to_local(winter, "Europe/Zurich").unwrap();
        let summer_local = to_local(summer, "Europe/Zurich").unwrap();

        assert_eq!(winter_local.offset().local_minus_utc(), 3600);
        assert_eq!(summer_local.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn to_local_invalid_zone_is_none() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        assert!(to_local(instant, "Not/AZone").is_none());
    }

    #[test]
    fn resolver_finds_shanghai() {
        let resolver = TimezoneResolver::new();
        assert_eq!(resolver.resolve(31.23, 121.47).as_deref(), Some("Asia/Shanghai"));
    }

    #[test]
    fn resolver_rejects_out_of_range() {
        let resolver = TimezoneResolver::new();
        assert!(resolver.resolve(91.0, 0.0).is_none());
        assert!(resolver.resolve(0.0, -181.0).is_none());
    }

    #[test]
    fn resolver_never_panics_on_open_ocean() {
        let resolver = TimezoneResolver::new();
        // Either an Etc/ zone or nothing, but always parseable if present.
        if let Some(name) = resolver.resolve(-40.0, -130.0) {
            assert!(parse_zone(&name).is_some());
        }
    }
}
