//! This library tracks a person walking through a building and tells them where they are on the
//! building's floor plan and how far along their route they have come.
//!
//! The floor plan is a plain 2D image in its own units (say, SVG pixels) that knows nothing about
//! the world. A [`GeoTransform`] ties it to the ground by stretching a rectangular region of
//! latitude and longitude ([`GeoBounds`]) over the whole plan, so that a [`GeoPoint`] can be
//! turned into a [`PlanePoint`] and back. On top of that:
//!
//! - [`PositionSmoother`] averages noisy GPS fixes over a short time window.
//! - [`OffsiteFallbackMapper`] keeps the pointer moving sensibly while the user is outside the
//!   building, instead of pinning it to an edge of the plan.
//! - [`Route`] computes which waypoint a user is at, how far along they are, and what to do next.
//! - [`LiveTrackingSession`] puts all of the above together behind a small state machine that
//!   consumes fixes from any [`GeolocationSource`].
//! - [`NavigationConfig`] and [`Directory`] hold the static description of a building and the
//!   destinations in it.
//!
//! Geographic distances are great-circle distances on a spherical Earth, and the offsite fallback
//! uses an equirectangular approximation. Both are plenty for walking distances, and neither is a
//! survey-grade geodetic computation.
//!
//! # Examples
//!
//! Platform bindings implement [`GeolocationSource`] and push fixes into the channel they are
//! given; the session picks them up on [`pump`](LiveTrackingSession::pump).
//!
//! ```
//! use std::sync::mpsc::Sender;
//! use wayfinder::{
//!     GeolocationSource, GpsFix, LiveTrackingSession, LocationError, LocationEvent,
//!     NavigationConfig, SubscriptionHandle, TrackingState,
//! };
//!
//! // stands in for the device's location service
//! struct Replay(Vec<Sender<LocationEvent>>);
//!
//! impl GeolocationSource for Replay {
//!     fn subscribe(&mut self, events: Sender<LocationEvent>) -> SubscriptionHandle {
//!         self.0.push(events);
//!         SubscriptionHandle::new(self.0.len() as u64)
//!     }
//!
//!     fn unsubscribe(&mut self, _: SubscriptionHandle) {
//!         self.0.clear();
//!     }
//!
//!     fn get_once(&mut self) -> Result<GpsFix, LocationError> {
//!         Err(LocationError::PositionUnavailable)
//!     }
//! }
//!
//! let config = NavigationConfig::data_center();
//! let directory = config.directory()?;
//! let route = directory.get_route("A1").expect("the demo building has cabinet A1");
//!
//! let mut session = LiveTrackingSession::new(&config.session_config()?, Replay(Vec::new()));
//! session.start();
//! assert_eq!(session.state(), TrackingState::Acquiring);
//!
//! // the user is standing at the start of the route
//! let fix = GpsFix {
//!     geo: route.waypoints()[0].geo,
//!     accuracy: None,
//!     timestamp_ms: 0,
//! };
//! session.source().0[0].send(fix.into()).expect("the session is listening");
//! session.pump();
//!
//! let position = session.snapshot().position.expect("a fix was delivered");
//! assert!(position.within_bounds);
//! println!("draw the user at {}", position.plane);
//!
//! let progress = session.progress(route).expect("a fix was delivered");
//! assert_eq!(progress.closest_index, 0);
//! assert_eq!(
//!     progress.next_instruction.as_deref(),
//!     Some("Walk towards & take right turn")
//! );
//!
//! session.stop();
//! assert!(session.source().0.is_empty());
//! # Ok::<(), wayfinder::ConfigError>(())
//! ```
//!
//! # Logging
//!
//! The library emits [`tracing`] events (session lifecycle at `info`, state changes and offsite
//! calibration at `debug`, source failures at `warn`) but never installs a subscriber.

mod config;
mod directory;
mod error;
mod geodedic;
mod offsite;
mod plane;
mod route;
mod session;
mod smoothing;
mod source;
mod transform;

pub(crate) type Point2 = nalgebra::Point2<f64>;

pub use config::{DestinationConfig, Location, NavigationConfig, WaypointConfig};
pub use directory::{Destination, DestinationStatus, Directory, Priority};
pub use error::{ConfigError, LocationError};
pub use geodedic::{haversine_distance, Components, GeoPoint, LatLng, EARTH_RADIUS_METERS};
pub use offsite::{OffsiteFallbackMapper, ReferenceAnchor};
pub use plane::{plane_distance, PlanePoint, PlaneSize};
pub use route::{ClosestWaypoint, Route, RouteProgress, RouteWaypoint};
pub use session::{
    LiveTrackingSession, SessionConfig, TrackedPosition, TrackingSnapshot, TrackingState,
    DEFAULT_ARRIVAL_RADIUS_METERS,
};
pub use smoothing::{GpsFix, PositionSmoother, SmoothedFix, DEFAULT_SMOOTHING_WINDOW};
pub use source::{GeolocationSource, LocationEvent, SubscriptionHandle};
pub use transform::{GeoBounds, GeoTransform};
