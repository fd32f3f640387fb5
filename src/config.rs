//! Static navigation setup: the building, its floor plan, and the destinations in it.
//!
//! A [`NavigationConfig`] is plain data, typically deserialized from a file. Nothing is checked
//! until one of [`NavigationConfig::session_config`], [`NavigationConfig::directory`], or
//! [`NavigationConfig::validate`] turns it into runtime types.
//!
//! Route waypoints (and the reference anchor) may be given either geographically or as points on
//! the floor plan, whichever the floor plan was surveyed in:
//!
//! ```yaml
//! waypoints:
//!   - at: { lat: 28.4586, lng: 77.0261 }
//!     instruction: Starting point
//!   - at: [246.949, 78.878]
//!     instruction: Turn right again
//! ```

use crate::directory::{Destination, DestinationStatus, Directory, Priority};
use crate::error::ConfigError;
use crate::geodedic::{Components, GeoPoint};
use crate::offsite::ReferenceAnchor;
use crate::plane::{PlanePoint, PlaneSize};
use crate::route::{Route, RouteWaypoint};
use crate::session::{SessionConfig, DEFAULT_ARRIVAL_RADIUS_METERS};
use crate::smoothing::DEFAULT_SMOOTHING_WINDOW;
use crate::transform::{GeoBounds, GeoTransform};
use std::time::Duration;
use uom::si::f64::Length;
use uom::si::length::meter;

#[cfg(feature = "serde")]
use crate::geodedic::LatLng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A location given in whichever coordinate system is at hand.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawLocation", into = "RawLocation")
)]
pub enum Location {
    /// `[x, y]` on the floor plan.
    Plane(PlanePoint),
    /// `{ lat, lng }` in degrees.
    Geo(GeoPoint),
}

impl Location {
    /// Resolves the location to a geographic one.
    ///
    /// Fails if a plane point lies so far off the floor plan that it has no valid latitude or
    /// longitude.
    pub fn to_geo(&self, transform: &GeoTransform) -> Result<GeoPoint, ConfigError> {
        match self {
            Self::Geo(geo) => Ok(*geo),
            Self::Plane(point) => {
                let geo = transform.to_geo(point);
                GeoPoint::build(Components {
                    latitude: geo.latitude(),
                    longitude: geo.longitude(),
                })
                .ok_or(ConfigError::InvalidCoordinate {
                    lat: geo.lat(),
                    lng: geo.lng(),
                })
            }
        }
    }
}

// `{ lat, lng }` is range-checked only after the variant is chosen.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawLocation {
    // NOTE: must stay ahead of `Geo`, which would otherwise also accept `[lat, lng]` sequences.
    Plane(PlanePoint),
    Geo(LatLng),
}

#[cfg(feature = "serde")]
impl TryFrom<RawLocation> for Location {
    type Error = ConfigError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        match raw {
            RawLocation::Plane(point) => Ok(Self::Plane(point)),
            RawLocation::Geo(lat_lng) => GeoPoint::try_from(lat_lng).map(Self::Geo),
        }
    }
}

#[cfg(feature = "serde")]
impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        match location {
            Location::Plane(point) => RawLocation::Plane(point),
            Location::Geo(geo) => RawLocation::Geo(geo.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaypointConfig {
    pub at: Location,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DestinationConfig {
    pub id: String,
    /// Defaults to the id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub zone: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: DestinationStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: Priority,
    /// Where the destination itself is. Defaults to the last waypoint.
    #[cfg_attr(feature = "serde", serde(default))]
    pub location: Option<Location>,
    pub waypoints: Vec<WaypointConfig>,
}

impl DestinationConfig {
    fn build(&self, transform: &GeoTransform) -> Result<Destination, ConfigError> {
        let waypoints = self
            .waypoints
            .iter()
            .map(|w| Ok(RouteWaypoint::new(w.at.to_geo(transform)?, w.instruction.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let route = Route::new(self.id.clone(), waypoints)?;

        let mut destination = Destination::at_route_end(route);
        if let Some(name) = &self.name {
            destination.name.clone_from(name);
        }
        destination.description.clone_from(&self.description);
        destination.zone.clone_from(&self.zone);
        destination.status = self.status;
        destination.priority = self.priority;
        if let Some(location) = &self.location {
            destination.location = location.to_geo(transform)?;
        }
        Ok(destination)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationConfig {
    /// The geographic region covered by the floor plan.
    pub bounds: GeoBounds,
    pub plane: PlaneSize,
    /// Where offsite tracking starts on the plan. Defaults to the start of the first
    /// destination's route, or to the center of the plan if there are no destinations.
    #[cfg_attr(feature = "serde", serde(default))]
    pub anchor: Option<Location>,
    #[cfg_attr(feature = "serde", serde(default = "default_smoothing_window_ms"))]
    pub smoothing_window_ms: u64,
    /// Plane units per meter of offsite movement. Defaults to the scale of the floor plan.
    #[cfg_attr(feature = "serde", serde(default))]
    pub meters_to_pixels: Option<f64>,
    /// In meters.
    #[cfg_attr(feature = "serde", serde(default = "default_arrival_radius"))]
    pub arrival_radius: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub destinations: Vec<DestinationConfig>,
}

fn default_smoothing_window_ms() -> u64 {
    DEFAULT_SMOOTHING_WINDOW.as_millis() as u64
}

fn default_arrival_radius() -> f64 {
    DEFAULT_ARRIVAL_RADIUS_METERS
}

impl NavigationConfig {
    /// A configuration with the given building and no destinations.
    #[must_use]
    pub fn new(bounds: GeoBounds, plane: PlaneSize) -> Self {
        Self {
            bounds,
            plane,
            anchor: None,
            smoothing_window_ms: default_smoothing_window_ms(),
            meters_to_pixels: None,
            arrival_radius: default_arrival_radius(),
            destinations: Vec::new(),
        }
    }

    #[must_use]
    pub fn transform(&self) -> GeoTransform {
        GeoTransform::new(self.bounds, self.plane)
    }

    /// The anchor for offsite tracking, resolved against the transform.
    pub fn reference_anchor(&self) -> Result<ReferenceAnchor, ConfigError> {
        let transform = self.transform();
        let geo = match self.anchor.or_else(|| {
            self.destinations
                .first()
                .and_then(|d| d.waypoints.first())
                .map(|w| w.at)
        }) {
            Some(at) => at.to_geo(&transform)?,
            None => transform.center(),
        };
        Ok(ReferenceAnchor::at(geo, &transform))
    }

    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let mut config = SessionConfig::new(self.transform(), self.reference_anchor()?)
            .with_smoothing_window(Duration::from_millis(self.smoothing_window_ms))?
            .with_arrival_radius(Length::new::<meter>(self.arrival_radius))?;
        if let Some(scale) = self.meters_to_pixels {
            config = config.with_meters_to_pixels(scale)?;
        }
        Ok(config)
    }

    pub fn directory(&self) -> Result<Directory, ConfigError> {
        let transform = self.transform();
        let destinations = self
            .destinations
            .iter()
            .map(|d| d.build(&transform))
            .collect::<Result<Vec<_>, _>>()?;
        Directory::new(transform, destinations)
    }

    /// Checks everything [`session_config`](Self::session_config) and
    /// [`directory`](Self::directory) would.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session_config()?;
        self.directory()?;
        Ok(())
    }

    /// The demo data center floor plan with cabinet A1.
    #[must_use]
    pub fn data_center() -> Self {
        // the literals below are all in range
        let geo = GeoPoint::from_degrees_unchecked;
        let plane = |x, y| Location::Plane(PlanePoint::new(x, y));
        let waypoint = |x, y, instruction: &str| WaypointConfig {
            at: plane(x, y),
            instruction: instruction.to_owned(),
        };

        Self {
            anchor: Some(plane(235.238, 110.773)),
            destinations: vec![DestinationConfig {
                id: "A1".into(),
                name: Some("Cabinet A1".into()),
                description: "Server Rack A1 - Primary Storage".into(),
                zone: "Zone A".into(),
                status: DestinationStatus::Active,
                priority: Priority::High,
                location: Some(Location::Geo(geo(28.4594, 77.0264))),
                waypoints: vec![
                    waypoint(235.238, 110.773, "Starting point"),
                    waypoint(236.491, 79.910, "Walk towards & take right turn"),
                    waypoint(246.949, 78.878, "Turn right again"),
                    waypoint(246.850, 146.939, "Go straight & take a left turn"),
                    waypoint(350.813, 146.665, "You've reached the destination"),
                ],
            }],
            ..Self::new(
                GeoBounds::from_corners_unchecked(
                    geo(28.4595, 77.0266),
                    geo(28.4585, 77.0256),
                ),
                PlaneSize::new_unchecked(815.4284, 333.55614),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Location, NavigationConfig};
    use crate::directory::DestinationStatus;
    use crate::error::ConfigError;
    use crate::plane::PlanePoint;
    use crate::transform::tests::{data_center, geo};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;
    use std::time::Duration;
    use uom::si::length::meter;

    #[test]
    fn demo_building_is_valid() {
        let config = NavigationConfig::data_center();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.transform(), data_center());

        let session = config.session_config().unwrap();
        assert_eq!(session.smoothing_window(), Duration::from_millis(800));
        assert_eq!(session.arrival_radius().get::<meter>(), 5.);
        assert_relative_eq!(session.meters_to_pixels(), config.transform().pixels_per_meter());
        assert_abs_diff_eq!(
            session.anchor().plane,
            PlanePoint::new(235.238, 110.773),
            epsilon = 1e-6
        );
    }

    #[test]
    fn demo_route_draws_where_it_was_surveyed() {
        let directory = NavigationConfig::data_center().directory().unwrap();
        let a1 = directory.get("A1").unwrap();
        assert_eq!(a1.name, "Cabinet A1");
        assert_eq!(a1.status, DestinationStatus::Active);
        assert_eq!(a1.location, geo(28.4594, 77.0264));

        let path = directory.get_plane_route("A1").unwrap();
        assert_abs_diff_eq!(path[0], PlanePoint::new(235.238, 110.773), epsilon = 1e-6);
        assert_abs_diff_eq!(path[4], PlanePoint::new(350.813, 146.665), epsilon = 1e-6);
        assert_eq!(
            directory.get_route("A1").unwrap().waypoints()[1].instruction,
            "Walk towards & take right turn"
        );
    }

    #[test]
    fn anchor_defaults() {
        let mut config = NavigationConfig::data_center();
        config.anchor = None;
        // start of the first route
        assert_abs_diff_eq!(
            config.reference_anchor().unwrap().plane,
            PlanePoint::new(235.238, 110.773),
            epsilon = 1e-6
        );

        config.destinations.clear();
        assert_abs_diff_eq!(
            config.reference_anchor().unwrap().plane,
            config.plane.center(),
            epsilon = 1e-6
        );
    }

    #[rstest]
    #[case::zero_window(|c: &mut NavigationConfig| c.smoothing_window_ms = 0, ConfigError::InvalidSmoothingWindow)]
    #[case::zero_scale(|c: &mut NavigationConfig| c.meters_to_pixels = Some(0.), ConfigError::InvalidScale(0.))]
    #[case::negative_radius(|c: &mut NavigationConfig| c.arrival_radius = -1., ConfigError::InvalidArrivalRadius(-1.))]
    #[case::empty_route(
        |c: &mut NavigationConfig| c.destinations[0].waypoints.clear(),
        ConfigError::EmptyRoute { destination: "A1".into() }
    )]
    #[case::duplicate(
        |c: &mut NavigationConfig| c.destinations.push(c.destinations[0].clone()),
        ConfigError::DuplicateDestination("A1".into())
    )]
    fn invalid_configurations(
        #[case] break_it: fn(&mut NavigationConfig),
        #[case] expected: ConfigError,
    ) {
        let mut config = NavigationConfig::data_center();
        break_it(&mut config);
        assert_eq!(config.validate(), Err(expected));
    }

    // far enough off the plan that the latitude leaves [-90, 90]
    fn off_the_map() -> Location {
        Location::Plane(PlanePoint::new(0., -1.0e8))
    }

    #[rstest]
    #[case::waypoint(|c: &mut NavigationConfig| c.destinations[0].waypoints[1].at = off_the_map())]
    #[case::cabinet(|c: &mut NavigationConfig| c.destinations[0].location = Some(off_the_map()))]
    #[case::anchor(|c: &mut NavigationConfig| c.anchor = Some(off_the_map()))]
    #[case::default_anchor(|c: &mut NavigationConfig| {
        c.anchor = None;
        c.destinations[0].waypoints[0].at = off_the_map();
    })]
    fn off_plan_locations_are_rejected(#[case] break_it: fn(&mut NavigationConfig)) {
        let mut config = NavigationConfig::data_center();
        break_it(&mut config);
        let Err(ConfigError::InvalidCoordinate { lat, .. }) = config.validate() else {
            panic!("unexpected result: {:?}", config.validate());
        };
        assert!(lat > 90., "{lat} should be north of the pole");
    }

    #[test]
    fn plane_points_just_off_the_plan_are_fine() {
        // routes may start outside the building, eg in the car park
        let transform = data_center();
        let geo = Location::Plane(PlanePoint::new(-50., 400.))
            .to_geo(&transform)
            .unwrap();
        assert!(!transform.is_within_bounds(&geo));
        assert_abs_diff_eq!(
            transform.to_plane(&geo),
            PlanePoint::new(-50., 400.),
            epsilon = 1e-6
        );
    }

    #[cfg(feature = "serde")]
    mod yaml {
        use super::super::{Location, NavigationConfig};
        use crate::directory::{DestinationStatus, Priority};
        use crate::plane::PlanePoint;
        use crate::transform::tests::geo;
        use approx::assert_abs_diff_eq;

        const BUILDING: &str = r#"
bounds:
  north_east: { lat: 28.4595, lng: 77.0266 }
  south_west: { lat: 28.4585, lng: 77.0256 }
plane: { width: 815.4284, height: 333.55614 }
meters_to_pixels: 4.0
destinations:
  - id: B2
    name: Cabinet B2
    zone: Zone B
    status: maintenance
    priority: medium
    waypoints:
      - at: { lat: 28.4586, lng: 77.0261 }
        instruction: Start from main entrance
      - at: [400.0, 250.0]
        instruction: Cabinet B2 reached!
"#;

        #[test]
        fn parse_yaml() {
            let config: NavigationConfig = serde_yaml::from_str(BUILDING).unwrap();
            assert_eq!(config.smoothing_window_ms, 800);
            assert_eq!(config.arrival_radius, 5.);
            assert_eq!(config.anchor, None);
            assert_eq!(config.meters_to_pixels, Some(4.));

            let b2 = &config.destinations[0];
            assert_eq!(b2.status, DestinationStatus::Maintenance);
            assert_eq!(b2.priority, Priority::Medium);
            assert_eq!(b2.description, "");
            assert_eq!(b2.waypoints[0].at, Location::Geo(geo(28.4586, 77.0261)));
            assert_eq!(
                b2.waypoints[1].at,
                Location::Plane(PlanePoint::new(400., 250.))
            );

            let directory = config.directory().unwrap();
            let path = directory.get_plane_route("B2").unwrap();
            assert_abs_diff_eq!(path[1], PlanePoint::new(400., 250.), epsilon = 1e-6);
            assert_eq!(config.session_config().unwrap().meters_to_pixels(), 4.);
        }

        #[test]
        fn yaml_roundtrip() {
            let config = NavigationConfig::data_center();
            let ser = serde_yaml::to_string(&config).unwrap();
            let de = serde_yaml::from_str::<NavigationConfig>(&ser).unwrap();

            assert_eq!(de.plane, config.plane);
            assert_eq!(de.anchor, config.anchor);
            // plane waypoints survive as written
            assert_eq!(de.destinations[0].waypoints, config.destinations[0].waypoints);
            assert_abs_diff_eq!(
                de.bounds.north_east(),
                config.bounds.north_east(),
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(
                de.bounds.south_west(),
                config.bounds.south_west(),
                epsilon = 1e-12
            );
            let Some(Location::Geo(location)) = de.destinations[0].location else {
                panic!("cabinet location should stay geographic");
            };
            assert_abs_diff_eq!(location, geo(28.4594, 77.0264), epsilon = 1e-12);
        }

        #[test]
        fn short_plane_points_are_not_mistaken_for_coordinates() {
            let at: Location = serde_yaml::from_str("[50.0, 60.0]").unwrap();
            assert_eq!(at, Location::Plane(PlanePoint::new(50., 60.)));
            let at: Location = serde_yaml::from_str("{ lat: 50.0, lng: 60.0 }").unwrap();
            assert_eq!(at, Location::Geo(geo(50., 60.)));
        }

        #[test]
        fn invalid_bounds_are_rejected_while_parsing() {
            let flipped = BUILDING.replace("lat: 28.4595", "lat: 28.4580");
            let err = serde_yaml::from_str::<NavigationConfig>(&flipped).unwrap_err();
            assert!(
                err.to_string().contains("no positive latitude span"),
                "unexpected error: {err}"
            );
        }

        #[test]
        fn out_of_range_waypoints_are_rejected_while_parsing() {
            let broken = BUILDING.replace("lat: 28.4586", "lat: 128.4586");
            let err = serde_yaml::from_str::<NavigationConfig>(&broken).unwrap_err();
            assert!(
                err.to_string()
                    .contains("coordinate (128.4586, 77.0261) is outside [-90, 90] x [-180, 180]"),
                "unexpected error: {err}"
            );
        }

        #[test]
        fn unknown_status_is_rejected() {
            let broken = BUILDING.replace("maintenance", "retired");
            assert!(serde_yaml::from_str::<NavigationConfig>(&broken).is_err());
        }
    }
}
