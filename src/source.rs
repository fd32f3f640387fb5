//! The seam between the tracking core and whatever produces location fixes.
//!
//! Platform bindings (a browser's geolocation API, a serial GNSS receiver, a replay file) live
//! outside this crate and implement [`GeolocationSource`]. Fixes are pushed rather than polled:
//! on [`subscribe`](GeolocationSource::subscribe) the source is handed the sending half of a
//! channel and delivers [`LocationEvent`]s into it whenever it has something to report. The
//! session drains the other half with [`LiveTrackingSession::pump`](crate::LiveTrackingSession::pump).

use crate::error::LocationError;
use crate::smoothing::GpsFix;
use std::sync::mpsc::Sender;

/// Something a [`GeolocationSource`] reports to its subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    Fix(GpsFix),
    Error(LocationError),
}

impl From<GpsFix> for LocationEvent {
    fn from(fix: GpsFix) -> Self {
        Self::Fix(fix)
    }
}

impl From<LocationError> for LocationEvent {
    fn from(error: LocationError) -> Self {
        Self::Error(error)
    }
}

impl From<Result<GpsFix, LocationError>> for LocationEvent {
    fn from(result: Result<GpsFix, LocationError>) -> Self {
        match result {
            Ok(fix) => Self::Fix(fix),
            Err(error) => Self::Error(error),
        }
    }
}

/// Identifies one live subscription on a [`GeolocationSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A provider of location fixes.
///
/// Implementations own their own timeout and retry policy; the tracking core only reacts to what
/// they deliver.
pub trait GeolocationSource {
    /// Starts delivering events into `events` until [`unsubscribe`](Self::unsubscribe) is called
    /// with the returned handle.
    ///
    /// Sending into a channel whose receiver has been dropped fails; sources should treat that as
    /// the subscriber having gone away.
    fn subscribe(&mut self, events: Sender<LocationEvent>) -> SubscriptionHandle;

    /// Stops delivery for `handle`. Unknown or already-released handles are ignored.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);

    /// Produces a single fix outside of any subscription.
    fn get_once(&mut self) -> Result<GpsFix, LocationError>;
}

impl<S: GeolocationSource + ?Sized> GeolocationSource for Box<S> {
    fn subscribe(&mut self, events: Sender<LocationEvent>) -> SubscriptionHandle {
        (**self).subscribe(events)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        (**self).unsubscribe(handle);
    }

    fn get_once(&mut self) -> Result<GpsFix, LocationError> {
        (**self).get_once()
    }
}
