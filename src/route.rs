//! Static routes and how far along one a position is.
//!
//! Progress is derived from the waypoint closest to the position rather than from a true
//! projection onto the polyline: the closest waypoint gives the completed legs, and the distance
//! walked from it, as a fraction of the following leg, gives the partial one. Positions far off
//! to the side of a leg therefore count as further along than they are.

use crate::error::ConfigError;
use crate::geodedic::GeoPoint;
use crate::plane::PlanePoint;
use crate::transform::GeoTransform;
use uom::si::f64::Length;
use uom::si::length::meter;
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteWaypoint {
    pub geo: GeoPoint,
    /// What to tell the user when this waypoint is the next one to reach.
    pub instruction: String,
}

impl RouteWaypoint {
    pub fn new(geo: GeoPoint, instruction: impl Into<String>) -> Self {
        Self {
            geo,
            instruction: instruction.into(),
        }
    }
}

/// An ordered, non-empty list of waypoints leading to a destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    destination: String,
    waypoints: Vec<RouteWaypoint>,
}

/// The waypoint nearest to some position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestWaypoint {
    pub index: usize,
    pub distance: Length,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteProgress {
    pub closest_index: usize,
    /// In [0, 100].
    pub progress_percent: f64,
    /// Distance to the waypoint after the closest one (or to the last one, once there).
    pub distance_to_next: Length,
    /// `None` once the closest waypoint is the destination itself.
    pub next_instruction: Option<String>,
}

impl Route {
    /// Fails if `waypoints` is empty.
    pub fn new(
        destination: impl Into<String>,
        waypoints: Vec<RouteWaypoint>,
    ) -> Result<Self, ConfigError> {
        let destination = destination.into();
        if waypoints.is_empty() {
            return Err(ConfigError::EmptyRoute { destination });
        }
        Ok(Self {
            destination,
            waypoints,
        })
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    #[must_use]
    pub fn waypoints(&self) -> &[RouteWaypoint] {
        &self.waypoints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always `false`; routes are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }

    /// Finds the waypoint nearest to `position` by great-circle distance.
    ///
    /// Ties go to the earliest waypoint.
    #[must_use]
    pub fn closest_waypoint(&self, position: &GeoPoint) -> ClosestWaypoint {
        let mut closest = ClosestWaypoint {
            index: 0,
            distance: position.haversine_distance(&self.waypoints[0].geo),
        };
        for (index, waypoint) in self.waypoints.iter().enumerate().skip(1) {
            let distance = position.haversine_distance(&waypoint.geo);
            // strict comparison keeps the first of equally-close waypoints
            if distance < closest.distance {
                closest = ClosestWaypoint { index, distance };
            }
        }
        closest
    }

    pub fn progress(&self, position: &GeoPoint) -> RouteProgress {
        let ClosestWaypoint { index, .. } = self.closest_waypoint(position);
        let last = self.last_index();
        let next = (index + 1).min(last);

        let progress_percent = if last == 0 {
            100.
        } else {
            let segment = if index < last {
                let from = &self.waypoints[index].geo;
                let leg = from.haversine_distance(&self.waypoints[index + 1].geo);
                if leg > Length::ZERO {
                    (from.haversine_distance(position) / leg).value.clamp(0., 1.)
                } else {
                    0.
                }
            } else {
                0.
            };
            ((index as f64 + segment) / last as f64 * 100.).clamp(0., 100.)
        };

        RouteProgress {
            closest_index: index,
            progress_percent,
            distance_to_next: position.haversine_distance(&self.waypoints[next].geo),
            next_instruction: self.instruction_after(index).map(str::to_owned),
        }
    }

    /// The instruction for the waypoint after the closest one, or `None` if the closest one is
    /// the destination (ie, the user has arrived).
    #[must_use]
    pub fn next_instruction(&self, position: &GeoPoint) -> Option<&str> {
        self.instruction_after(self.closest_waypoint(position).index)
    }

    fn instruction_after(&self, index: usize) -> Option<&str> {
        (index < self.last_index()).then(|| self.waypoints[index + 1].instruction.as_str())
    }

    /// Whether `position` is within `radius` of the waypoint at `index`.
    ///
    /// Returns `false` for indices past the end of the route.
    #[must_use]
    pub fn has_reached(&self, index: usize, position: &GeoPoint, radius: Length) -> bool {
        self.waypoints
            .get(index)
            .is_some_and(|waypoint| position.haversine_distance(&waypoint.geo) <= radius)
    }

    #[must_use]
    pub fn has_arrived(&self, position: &GeoPoint, radius: Length) -> bool {
        self.has_reached(self.last_index(), position, radius)
    }

    /// Sum of the great-circle lengths of all legs.
    #[must_use]
    pub fn total_length(&self) -> Length {
        self.waypoints
            .windows(2)
            .map(|leg| leg[0].geo.haversine_distance(&leg[1].geo))
            .fold(Length::ZERO, |total, leg| total + leg)
    }

    /// The waypoints as a polyline on the floor plan.
    #[must_use]
    pub fn plane_path(&self, transform: &GeoTransform) -> Vec<PlanePoint> {
        transform.path_to_plane(self.waypoints.iter().map(|waypoint| &waypoint.geo))
    }
}

impl RouteProgress {
    /// Progress rounded to whole percent, as shown to users.
    #[must_use]
    pub fn rounded_percent(&self) -> u8 {
        // the clamp above guarantees this fits
        self.progress_percent.round() as u8
    }

    #[must_use]
    pub fn distance_to_next_meters(&self) -> f64 {
        self.distance_to_next.get::<meter>()
    }
}
