use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raised when the static navigation setup is unusable.
///
/// These are only ever produced while constructing transforms, routes, or sessions, and are never
/// retried: a configuration that fails once will fail every time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("geographic bounds have no positive {axis} span (north-east {north_east}, south-west {south_west})")]
    DegenerateBounds {
        axis: &'static str,
        north_east: f64,
        south_west: f64,
    },
    #[error("plane size must be finite and positive, got {width}x{height}")]
    InvalidPlaneSize { width: f64, height: f64 },
    #[error("coordinate ({lat}, {lng}) is outside [-90, 90] x [-180, 180]")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("route to destination {destination:?} has no waypoints")]
    EmptyRoute { destination: String },
    #[error("destination {0:?} is defined more than once")]
    DuplicateDestination(String),
    #[error("smoothing window must be longer than 0ms")]
    InvalidSmoothingWindow,
    #[error("meters-to-pixels scale must be finite and positive, got {0}")]
    InvalidScale(f64),
    #[error("arrival radius must be finite and not negative, got {0}m")]
    InvalidArrivalRadius(f64),
}

/// Failure reported by a [`GeolocationSource`](crate::GeolocationSource).
///
/// A session never returns these; it records the most recent one in its
/// [snapshot](crate::TrackingSnapshot::last_error) so that callers can show a non-fatal notice
/// while tracking continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LocationError {
    #[error("access to device location was denied")]
    PermissionDenied,
    #[error("device location is currently unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a location fix")]
    Timeout,
}

impl LocationError {
    /// Whether the next successful fix is expected to happen without outside intervention.
    ///
    /// A denied permission has to be re-requested by the embedding application.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, LocationError};
    use rstest::rstest;

    #[rstest]
    #[case(LocationError::PermissionDenied, false)]
    #[case(LocationError::PositionUnavailable, true)]
    #[case(LocationError::Timeout, true)]
    fn transient_classification(#[case] error: LocationError, #[case] transient: bool) {
        assert_eq!(error.is_transient(), transient);
    }

    #[test]
    fn config_error_messages() {
        insta::assert_snapshot!(
            ConfigError::EmptyRoute { destination: "A1".into() },
            @r#"route to destination "A1" has no waypoints"#
        );
        insta::assert_snapshot!(
            ConfigError::InvalidPlaneSize { width: 0., height: 10. },
            @"plane size must be finite and positive, got 0x10"
        );
    }
}
