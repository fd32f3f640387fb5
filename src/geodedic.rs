use crate::error::ConfigError;
use std::fmt;
use std::fmt::Display;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::meter,
};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mean radius of the earth used for great-circle distances.
#[doc(alias = "R")]
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Equirectangular approximation of one degree of arc at the surface. These are only accurate
// across small (building-scale) extents.
#[doc(alias = "meters per degree longitude")]
pub(crate) const METERS_PER_DEGREE_LNG_AT_EQUATOR: f64 = 111_320.0;
#[doc(alias = "meters per degree latitude")]
pub(crate) const METERS_PER_DEGREE_LAT: f64 = 111_132.0;

/// An Earth-bound location as reported by a geolocation source.
///
/// Latitude is in [-90°, 90°] and longitude in [-180°, 180°] whenever the value was built through
/// [`GeoPoint::build`] or [`GeoPoint::from_degrees`]. Points produced by
/// [`GeoTransform::to_geo`](crate::GeoTransform::to_geo) for plane points far off the floor plan
/// are the exception, since that transform is defined everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "LatLng", into = "LatLng")
)]
pub struct GeoPoint {
    latitude: Angle,
    longitude: Angle,
}

impl GeoPoint {
    /// Constructs a location from latitude and longitude.
    ///
    /// Returns `None` if the latitude is not in [-90°, 90°] or the longitude is not in
    /// [-180°, 180°].
    #[must_use]
    pub fn build(
        Components {
            latitude,
            longitude,
        }: Components,
    ) -> Option<Self> {
        let lat = latitude.get::<degree>();
        let lng = longitude.get::<degree>();
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }

    /// Constructs a location from latitude and longitude given in degrees.
    ///
    /// Prefer [`GeoPoint::build`] when the angles are already typed.
    #[must_use]
    pub fn from_degrees(lat: f64, lng: f64) -> Option<Self> {
        Self::build(Components {
            latitude: Angle::new::<degree>(lat),
            longitude: Angle::new::<degree>(lng),
        })
    }

    pub(crate) fn from_degrees_unchecked(lat: f64, lng: f64) -> Self {
        Self {
            latitude: Angle::new::<degree>(lat),
            longitude: Angle::new::<degree>(lng),
        }
    }

    /// Returns the angle north of the equator ("northing").
    #[must_use]
    pub fn latitude(&self) -> Angle {
        self.latitude
    }

    /// Returns the angle east of the prime meridian ("easting").
    #[must_use]
    pub fn longitude(&self) -> Angle {
        self.longitude
    }

    pub(crate) fn lat(&self) -> f64 {
        self.latitude.get::<degree>()
    }

    pub(crate) fn lng(&self) -> f64 {
        self.longitude.get::<degree>()
    }

    /// Computes the [great-circle distance] between the two locations on the surface of the
    /// earth, treating it as a sphere of radius [`EARTH_RADIUS_METERS`].
    ///
    /// The result is symmetric in its arguments and exactly zero for identical points.
    ///
    /// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
    #[doc(alias = "great_circle_distance")]
    #[must_use]
    pub fn haversine_distance(&self, other: &GeoPoint) -> Length {
        let angle = central_angle_by_haversine(
            self.latitude,
            other.latitude,
            self.longitude,
            other.longitude,
        );

        Length::new::<meter>(angle.get::<radian>() * EARTH_RADIUS_METERS)
    }

    /// Returns the (east, north) displacement in meters from `self` to `other` on a local tangent
    /// plane, using the equirectangular approximation at the mean latitude of the two points.
    ///
    /// This is only meaningful for points a few hundred meters apart.
    #[must_use]
    pub fn local_offset_to(&self, other: &GeoPoint) -> (Length, Length) {
        let mean_lat = ((self.lat() + other.lat()) / 2.).to_radians();
        let east = (other.lng() - self.lng()) * METERS_PER_DEGREE_LNG_AT_EQUATOR * mean_lat.cos();
        let north = (other.lat() - self.lat()) * METERS_PER_DEGREE_LAT;
        (Length::new::<meter>(east), Length::new::<meter>(north))
    }
}

/// Great-circle distance between two locations.
///
/// Shorthand for [`GeoPoint::haversine_distance`].
#[must_use]
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> Length {
    a.haversine_distance(b)
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.lat();
        let lng = self.lng();
        let ns = if lat.is_sign_negative() { 'S' } else { 'N' };
        let ew = if lng.is_sign_negative() { 'W' } else { 'E' };
        write!(f, "{:.6}°{ns}, {:.6}°{ew}", lat.abs(), lng.abs())
    }
}

/// Computes the central angle between the given lat/lon points.
///
/// To turn this angle into [great-circle distance], multiply this value by the radius of the
/// sphere (ie, of the earth).
///
/// The current implementation computes this [using the haversine formula][haversine] in its
/// `atan2` form.
///
/// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
/// [haversine]: https://en.wikipedia.org/wiki/Haversine_formula#Formulation
pub(crate) fn central_angle_by_haversine(
    lat_a: Angle,
    lat_b: Angle,
    lon_a: Angle,
    lon_b: Angle,
) -> Angle {
    let lat_a = lat_a.get::<radian>(); // φ1
    let lat_b = lat_b.get::<radian>(); // φ2
    let lon_a = lon_a.get::<radian>(); // λ1
    let lon_b = lon_b.get::<radian>(); // λ2
    let delta_lat = lat_b - lat_a;
    let delta_lon = lon_b - lon_a;

    // NOTE: the `1 - cos(Δ)` form cancels catastrophically for the few-meter distances between
    // waypoints, so stick with squared half-angle sines.
    let a = (delta_lat / 2.).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.).sin().powi(2);
    // rounding can push `a` a hair outside [0, 1] for (near-)antipodal points
    let a = a.clamp(0., 1.);
    Angle::new::<radian>(2. * a.sqrt().atan2((1. - a).sqrt()))
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for GeoPoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        // degrees; 1e-9° is roughly 0.1mm on the ground
        1e-9
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.lat().abs_diff_eq(&other.lat(), epsilon)
            && self.lng().abs_diff_eq(&other.lng(), epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for GeoPoint {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.lat().relative_eq(&other.lat(), epsilon, max_relative)
            && self.lng().relative_eq(&other.lng(), epsilon, max_relative)
    }
}

/// Argument type for [`GeoPoint::build`].
#[derive(Debug, Default)]
#[must_use]
pub struct Components {
    /// The latitude angle of the proposed [`GeoPoint`].
    ///
    /// The latitude must be in [-90°,90°]. If it is not, [`GeoPoint::build`] returns `None`.
    pub latitude: Angle,

    /// The longitude angle of the proposed [`GeoPoint`].
    ///
    /// The longitude must be in [-180°,180°]. If it is not, [`GeoPoint::build`] returns `None`.
    pub longitude: Angle,
}

/// Wire form of a [`GeoPoint`]: plain degrees, as they appear in configuration files.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl TryFrom<LatLng> for GeoPoint {
    type Error = ConfigError;

    fn try_from(LatLng { lat, lng }: LatLng) -> Result<Self, Self::Error> {
        GeoPoint::from_degrees(lat, lng).ok_or(ConfigError::InvalidCoordinate { lat, lng })
    }
}

impl From<GeoPoint> for LatLng {
    fn from(geo: GeoPoint) -> Self {
        LatLng {
            lat: geo.lat(),
            lng: geo.lng(),
        }
    }
}
