//! Live tracking of one user against one floor plan.
//!
//! A [`LiveTrackingSession`] owns everything that accumulates while tracking: the smoothing
//! buffer, the offsite calibration, the subscription on the [`GeolocationSource`], and the last
//! published position. Nothing here is shared between sessions, so tracking several destinations
//! at once means running several sessions.
//!
//! ```text
//!            start()              first fix
//!   Idle ───────────▶ Acquiring ───────────▶ Active ◀──┐
//!    ▲                    │                    │       │ next fix
//!    │ stop()             └──── source error ──┴─▶ Error
//!    └──────────────── (from any state) ───────────────┘
//! ```

use crate::error::{ConfigError, LocationError};
use crate::geodedic::GeoPoint;
use crate::offsite::{OffsiteFallbackMapper, ReferenceAnchor};
use crate::plane::PlanePoint;
use crate::route::{Route, RouteProgress};
use crate::smoothing::{GpsFix, PositionSmoother, DEFAULT_SMOOTHING_WINDOW};
use crate::source::{GeolocationSource, LocationEvent, SubscriptionHandle};
use crate::transform::GeoTransform;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use tracing::{debug, info, warn};
use uom::si::f64::Length;
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default for [`SessionConfig::arrival_radius`].
pub const DEFAULT_ARRIVAL_RADIUS_METERS: f64 = 5.;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrackingState {
    /// Not tracking; no position is available.
    #[default]
    Idle,
    /// Subscribed, but no fix has arrived yet.
    Acquiring,
    Active,
    /// The source reported a failure. Tracking resumes with the next fix.
    Error,
}

/// A fully-processed position, as published to consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackedPosition {
    /// The smoothed location.
    pub geo: GeoPoint,
    /// Where to draw the user on the plan. Always on the plane.
    pub plane: PlanePoint,
    pub accuracy: Option<Length>,
    /// Whether `geo` is inside the building bounds. If not, `plane` came from the offsite
    /// fallback.
    pub within_bounds: bool,
    /// How many raw fixes went into `geo`.
    pub sample_count: usize,
}

/// Read-only view of a session for display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingSnapshot {
    pub state: TrackingState,
    /// Always `None` while [`TrackingState::Idle`].
    pub position: Option<TrackedPosition>,
    /// The most recent source failure since the last successful fix.
    pub last_error: Option<LocationError>,
}

/// Static inputs for a [`LiveTrackingSession`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    transform: GeoTransform,
    anchor: ReferenceAnchor,
    meters_to_pixels: f64,
    smoothing_window: Duration,
    arrival_radius: Length,
}

impl SessionConfig {
    /// Uses the default smoothing window and the transform's own scale for offsite movement.
    #[must_use]
    pub fn new(transform: GeoTransform, anchor: ReferenceAnchor) -> Self {
        Self {
            meters_to_pixels: transform.pixels_per_meter(),
            transform,
            anchor,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            arrival_radius: Length::new::<meter>(DEFAULT_ARRIVAL_RADIUS_METERS),
        }
    }

    /// Overrides how many plane units one meter of offsite movement moves the pointer.
    pub fn with_meters_to_pixels(mut self, scale: f64) -> Result<Self, ConfigError> {
        if !(scale.is_finite() && scale > 0.) {
            return Err(ConfigError::InvalidScale(scale));
        }
        self.meters_to_pixels = scale;
        Ok(self)
    }

    pub fn with_smoothing_window(mut self, window: Duration) -> Result<Self, ConfigError> {
        if window.is_zero() {
            return Err(ConfigError::InvalidSmoothingWindow);
        }
        self.smoothing_window = window;
        Ok(self)
    }

    /// How close to the last waypoint counts as having arrived.
    pub fn with_arrival_radius(mut self, radius: Length) -> Result<Self, ConfigError> {
        let meters = radius.get::<meter>();
        if !(meters.is_finite() && meters >= 0.) {
            return Err(ConfigError::InvalidArrivalRadius(meters));
        }
        self.arrival_radius = radius;
        Ok(self)
    }

    #[must_use]
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[must_use]
    pub fn anchor(&self) -> &ReferenceAnchor {
        &self.anchor
    }

    #[must_use]
    pub fn meters_to_pixels(&self) -> f64 {
        self.meters_to_pixels
    }

    #[must_use]
    pub fn smoothing_window(&self) -> Duration {
        self.smoothing_window
    }

    #[must_use]
    pub fn arrival_radius(&self) -> Length {
        self.arrival_radius
    }
}

struct Subscription {
    handle: SubscriptionHandle,
    events: Receiver<LocationEvent>,
}

pub struct LiveTrackingSession<S: GeolocationSource> {
    transform: GeoTransform,
    smoother: PositionSmoother,
    offsite: OffsiteFallbackMapper,
    source: S,
    subscription: Option<Subscription>,
    arrival_radius: Length,
    /// Newest fix timestamp seen since the last reset.
    latest_ms: u64,
    state: TrackingState,
    position: Option<TrackedPosition>,
    last_error: Option<LocationError>,
}

impl<S: GeolocationSource> LiveTrackingSession<S> {
    /// Creates an idle session. Nothing is requested from `source` until [`start`](Self::start).
    pub fn new(config: &SessionConfig, source: S) -> Self {
        Self {
            transform: config.transform,
            smoother: PositionSmoother::new(config.smoothing_window),
            offsite: OffsiteFallbackMapper::new(
                config.anchor,
                config.meters_to_pixels,
                *config.transform.plane(),
            ),
            source,
            subscription: None,
            arrival_radius: config.arrival_radius,
            latest_ms: 0,
            state: TrackingState::Idle,
            position: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> TrackingState {
        self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            state: self.state,
            position: self.position,
            last_error: self.last_error,
        }
    }

    #[must_use]
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Subscribes to the source and starts from a clean slate.
    ///
    /// Does nothing if the session is already running (in any state other than
    /// [`TrackingState::Idle`]), so there is never more than one subscription.
    pub fn start(&mut self) {
        if self.state != TrackingState::Idle {
            debug!(state = ?self.state, "start ignored, session already running");
            return;
        }

        self.reset();
        let (sender, events) = mpsc::channel();
        let handle = self.source.subscribe(sender);
        self.subscription = Some(Subscription { handle, events });
        info!(subscription = handle.id(), "tracking started");
        self.transition(TrackingState::Acquiring);
    }

    /// Releases the subscription and forgets everything accumulated so far.
    ///
    /// Safe to call in any state, any number of times.
    pub fn stop(&mut self) {
        if let Some(Subscription { handle, .. }) = self.subscription.take() {
            self.source.unsubscribe(handle);
            info!(subscription = handle.id(), "tracking stopped");
        }
        self.reset();
        self.transition(TrackingState::Idle);
    }

    fn reset(&mut self) {
        self.smoother.clear();
        self.offsite.reset();
        self.latest_ms = 0;
        self.position = None;
        self.last_error = None;
    }

    fn transition(&mut self, next: TrackingState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "tracking state changed");
            self.state = next;
        }
    }

    /// Processes every event the source has delivered since the last call, in order.
    ///
    /// Returns the number of events processed.
    pub fn pump(&mut self) -> usize {
        let Some(subscription) = &self.subscription else {
            return 0;
        };
        let events: Vec<LocationEvent> = subscription.events.try_iter().collect();
        for event in &events {
            match *event {
                LocationEvent::Fix(fix) => {
                    self.on_fix(fix);
                }
                LocationEvent::Error(error) => self.on_source_error(error),
            }
        }
        events.len()
    }

    /// Folds `fix` into the smoothed estimate and publishes the resulting position.
    ///
    /// Fixes arriving while idle are dropped. The smoothing window always trails the newest
    /// timestamp seen so far, so a fix delivered late falls out of it rather than dragging the
    /// window back.
    pub fn on_fix(&mut self, fix: GpsFix) -> Option<TrackedPosition> {
        if self.state == TrackingState::Idle {
            warn!(timestamp_ms = fix.timestamp_ms, "dropping fix received while idle");
            return None;
        }

        if fix.timestamp_ms < self.latest_ms {
            debug!(
                timestamp_ms = fix.timestamp_ms,
                latest_ms = self.latest_ms,
                "fix arrived out of order"
            );
        }
        self.latest_ms = self.latest_ms.max(fix.timestamp_ms);
        self.smoother.push(fix);
        let smoothed = self.smoother.average(self.latest_ms)?;

        let within_bounds = self.transform.is_within_bounds(&smoothed.geo);
        let plane = if within_bounds {
            self.offsite.reset();
            self.transform.clamp_to_plane(self.transform.to_plane(&smoothed.geo))
        } else {
            self.offsite.map_offsite(&smoothed.geo)
        };

        let position = TrackedPosition {
            geo: smoothed.geo,
            plane,
            accuracy: smoothed.accuracy,
            within_bounds,
            sample_count: smoothed.sample_count,
        };
        self.position = Some(position);
        self.last_error = None;
        self.transition(TrackingState::Active);
        Some(position)
    }

    /// Records a source failure.
    ///
    /// Smoothing history and offsite calibration are kept so that tracking picks up where it
    /// left off with the next fix; stale samples age out of the window on their own.
    pub fn on_source_error(&mut self, error: LocationError) {
        if self.state == TrackingState::Idle {
            warn!(%error, "dropping source error received while idle");
            return;
        }

        warn!(%error, transient = error.is_transient(), "location source failed");
        self.last_error = Some(error);
        self.transition(TrackingState::Error);
    }

    /// Asks the source for a single fix and processes it like a delivered one.
    ///
    /// Does not touch the source while idle.
    pub fn request_fix(&mut self) -> Option<TrackedPosition> {
        if self.state == TrackingState::Idle {
            return None;
        }
        match self.source.get_once() {
            Ok(fix) => self.on_fix(fix),
            Err(error) => {
                self.on_source_error(error);
                None
            }
        }
    }

    /// Progress along `route` from the latest published position.
    #[must_use]
    pub fn progress(&self, route: &Route) -> Option<RouteProgress> {
        self.position.map(|position| route.progress(&position.geo))
    }

    #[must_use]
    pub fn next_instruction<'r>(&self, route: &'r Route) -> Option<&'r str> {
        self.position.and_then(|position| route.next_instruction(&position.geo))
    }

    /// Whether the latest position is within the arrival radius of the route's last waypoint.
    #[must_use]
    pub fn has_arrived(&self, route: &Route) -> bool {
        self.position
            .is_some_and(|position| route.has_arrived(&position.geo, self.arrival_radius))
    }
}

impl<S: GeolocationSource> Drop for LiveTrackingSession<S> {
    fn drop(&mut self) {
        if let Some(Subscription { handle, .. }) = self.subscription.take() {
            self.source.unsubscribe(handle);
        }
    }
}
