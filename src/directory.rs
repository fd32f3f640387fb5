//! The set of places a user can be guided to.

use crate::error::ConfigError;
use crate::geodedic::GeoPoint;
use crate::plane::PlanePoint;
use crate::route::Route;
use crate::transform::GeoTransform;
use std::collections::HashSet;
use uom::si::f64::Length;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DestinationStatus {
    #[default]
    Active,
    /// Still listed, but currently being worked on.
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A cabinet (or any other target) together with the route leading to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub description: String,
    pub zone: String,
    pub status: DestinationStatus,
    pub priority: Priority,
    /// Where the destination physically is. Not necessarily the last waypoint, which is where
    /// the user stands when they get there.
    pub location: GeoPoint,
    pub route: Route,
}

impl Destination {
    /// A destination located at the end of its route, with no description or zone.
    #[must_use]
    pub fn at_route_end(route: Route) -> Self {
        let location = route.waypoints()[route.len() - 1].geo;
        Self {
            id: route.destination().to_owned(),
            name: route.destination().to_owned(),
            description: String::new(),
            zone: String::new(),
            status: DestinationStatus::default(),
            priority: Priority::default(),
            location,
            route,
        }
    }

    #[must_use]
    pub fn distance_from(&self, position: &GeoPoint) -> Length {
        position.haversine_distance(&self.location)
    }
}

/// Destinations by id, in the order they were defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    transform: GeoTransform,
    destinations: Vec<Destination>,
}

impl Directory {
    /// Fails if two destinations share an id.
    pub fn new(
        transform: GeoTransform,
        destinations: impl IntoIterator<Item = Destination>,
    ) -> Result<Self, ConfigError> {
        let destinations: Vec<Destination> = destinations.into_iter().collect();
        let mut seen = HashSet::with_capacity(destinations.len());
        for destination in &destinations {
            if !seen.insert(destination.id.as_str()) {
                return Err(ConfigError::DuplicateDestination(destination.id.clone()));
            }
        }
        Ok(Self {
            transform,
            destinations,
        })
    }

    #[must_use]
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn get_route(&self, id: &str) -> Option<&Route> {
        self.get(id).map(|d| &d.route)
    }

    /// The route to `id` in plane coordinates, for drawing on the floor plan.
    #[must_use]
    pub fn get_plane_route(&self, id: &str) -> Option<Vec<PlanePoint>> {
        self.get_route(id).map(|route| route.plane_path(&self.transform))
    }

    /// Ground distance from `position` to the destination itself.
    #[must_use]
    pub fn distance_to(&self, id: &str, position: &GeoPoint) -> Option<Length> {
        self.get(id).map(|d| d.distance_from(position))
    }

    /// Walking length of the route to `id`.
    #[must_use]
    pub fn route_length(&self, id: &str) -> Option<Length> {
        self.get_route(id).map(Route::total_length)
    }

    pub fn in_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a Destination> + 'a {
        self.destinations.iter().filter(move |d| d.zone == zone)
    }

    pub fn with_status(
        &self,
        status: DestinationStatus,
    ) -> impl Iterator<Item = &Destination> + '_ {
        self.destinations.iter().filter(move |d| d.status == status)
    }

    /// The destination whose location is closest to `position`, if there are any.
    #[must_use]
    pub fn nearest(&self, position: &GeoPoint) -> Option<&Destination> {
        self.destinations
            .iter()
            .map(|d| (d, d.distance_from(position)))
            .min_by(|(_, a), (_, b)| a.value.total_cmp(&b.value))
            .map(|(d, _)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> + '_ {
        self.destinations.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
