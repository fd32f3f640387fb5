//! Mapping between geographic locations and the floor plan.
//!
//! A [`GeoTransform`] stretches a rectangular latitude/longitude region ([`GeoBounds`]) over the
//! whole floor plan ([`PlaneSize`]). The mapping is a pure axis-aligned affine map, so it is
//! defined (and invertible) for every point, not only for those inside the bounds. Latitude grows
//! northwards while plane Y grows downwards, so the Y axis is flipped.
//!
//! ```
//! use wayfinder::{GeoBounds, GeoPoint, GeoTransform, PlaneSize};
//!
//! let bounds = GeoBounds::new(
//!     GeoPoint::from_degrees(28.4595, 77.0266).expect("in range"),
//!     GeoPoint::from_degrees(28.4585, 77.0256).expect("in range"),
//! )?;
//! let transform = GeoTransform::new(bounds, PlaneSize::new(815.4284, 333.55614)?);
//!
//! // the north-west corner of the bounds is the top-left corner of the plan
//! let corner = transform.to_plane(&GeoPoint::from_degrees(28.4595, 77.0256).expect("in range"));
//! assert!(corner.x().abs() < 1e-6 && corner.y().abs() < 1e-6);
//! # Ok::<(), wayfinder::ConfigError>(())
//! ```

use crate::error::ConfigError;
use crate::geodedic::GeoPoint;
use crate::plane::{PlanePoint, PlaneSize};
use uom::si::f64::Length;
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The rectangular geographic region that is mapped onto the floor plan.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawGeoBounds", into = "RawGeoBounds")
)]
pub struct GeoBounds {
    north_east: GeoPoint,
    south_west: GeoPoint,
}

impl GeoBounds {
    pub(crate) fn from_corners_unchecked(north_east: GeoPoint, south_west: GeoPoint) -> Self {
        Self {
            north_east,
            south_west,
        }
    }

    /// Constructs bounds from their north-east and south-west corners.
    ///
    /// Fails if the region has no positive extent along either axis, since nothing could be
    /// mapped onto the plane from such a region.
    pub fn new(north_east: GeoPoint, south_west: GeoPoint) -> Result<Self, ConfigError> {
        // written negated so that NaN spans are rejected as well
        if !(north_east.lat() > south_west.lat()) {
            return Err(ConfigError::DegenerateBounds {
                axis: "latitude",
                north_east: north_east.lat(),
                south_west: south_west.lat(),
            });
        }
        if !(north_east.lng() > south_west.lng()) {
            return Err(ConfigError::DegenerateBounds {
                axis: "longitude",
                north_east: north_east.lng(),
                south_west: south_west.lng(),
            });
        }
        Ok(Self {
            north_east,
            south_west,
        })
    }

    #[must_use]
    pub fn north_east(&self) -> GeoPoint {
        self.north_east
    }

    #[must_use]
    pub fn south_west(&self) -> GeoPoint {
        self.south_west
    }

    fn lat_span(&self) -> f64 {
        self.north_east.lat() - self.south_west.lat()
    }

    fn lng_span(&self) -> f64 {
        self.north_east.lng() - self.south_west.lng()
    }

    /// Inclusive containment check on both axes.
    #[must_use]
    pub fn contains(&self, geo: &GeoPoint) -> bool {
        (self.south_west.lat()..=self.north_east.lat()).contains(&geo.lat())
            && (self.south_west.lng()..=self.north_east.lng()).contains(&geo.lng())
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::from_degrees_unchecked(
            (self.north_east.lat() + self.south_west.lat()) / 2.,
            (self.north_east.lng() + self.south_west.lng()) / 2.,
        )
    }

    /// Moves `geo` onto the nearest point inside the bounds.
    #[must_use]
    pub fn clamp(&self, geo: &GeoPoint) -> GeoPoint {
        GeoPoint::from_degrees_unchecked(
            geo.lat().clamp(self.south_west.lat(), self.north_east.lat()),
            geo.lng().clamp(self.south_west.lng(), self.north_east.lng()),
        )
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct RawGeoBounds {
    north_east: GeoPoint,
    south_west: GeoPoint,
}

impl TryFrom<RawGeoBounds> for GeoBounds {
    type Error = ConfigError;

    fn try_from(raw: RawGeoBounds) -> Result<Self, Self::Error> {
        GeoBounds::new(raw.north_east, raw.south_west)
    }
}

impl From<GeoBounds> for RawGeoBounds {
    fn from(bounds: GeoBounds) -> Self {
        RawGeoBounds {
            north_east: bounds.north_east,
            south_west: bounds.south_west,
        }
    }
}

/// Bidirectional map between [`GeoPoint`]s inside some [`GeoBounds`] and [`PlanePoint`]s on a
/// floor plan of a given [`PlaneSize`].
///
/// Both inputs are validated on construction, so every method here is infallible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    bounds: GeoBounds,
    plane: PlaneSize,
}

impl GeoTransform {
    #[must_use]
    pub fn new(bounds: GeoBounds, plane: PlaneSize) -> Self {
        Self { bounds, plane }
    }

    #[must_use]
    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    #[must_use]
    pub fn plane(&self) -> &PlaneSize {
        &self.plane
    }

    /// Maps a geographic location onto the plane.
    ///
    /// Locations outside the bounds map to points outside the plane; use
    /// [`GeoTransform::clamp_to_plane`] if that is not wanted.
    #[must_use]
    pub fn to_plane(&self, geo: &GeoPoint) -> PlanePoint {
        let norm_x = (geo.lng() - self.bounds.south_west.lng()) / self.bounds.lng_span();
        let norm_y = (self.bounds.north_east.lat() - geo.lat()) / self.bounds.lat_span();
        PlanePoint::new(norm_x * self.plane.width(), norm_y * self.plane.height())
    }

    /// Exact inverse of [`GeoTransform::to_plane`].
    #[must_use]
    pub fn to_geo(&self, point: &PlanePoint) -> GeoPoint {
        let norm_x = point.x() / self.plane.width();
        let norm_y = point.y() / self.plane.height();
        GeoPoint::from_degrees_unchecked(
            self.bounds.north_east.lat() - norm_y * self.bounds.lat_span(),
            self.bounds.south_west.lng() + norm_x * self.bounds.lng_span(),
        )
    }

    #[must_use]
    pub fn clamp_to_plane(&self, point: PlanePoint) -> PlanePoint {
        self.plane.clamp(point)
    }

    #[must_use]
    pub fn is_within_bounds(&self, geo: &GeoPoint) -> bool {
        self.bounds.contains(geo)
    }

    #[must_use]
    pub fn is_within_plane(&self, point: &PlanePoint) -> bool {
        self.plane.contains(point)
    }

    #[must_use]
    pub fn clamp_to_bounds(&self, geo: &GeoPoint) -> GeoPoint {
        self.bounds.clamp(geo)
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        self.bounds.center()
    }

    /// Ground extent of the bounds as (west-east width, south-north height), measured along the
    /// southern and western edges.
    #[must_use]
    pub fn dimensions(&self) -> (Length, Length) {
        let sw = self.bounds.south_west;
        let ne = self.bounds.north_east;
        let width = sw.haversine_distance(&GeoPoint::from_degrees_unchecked(sw.lat(), ne.lng()));
        let height = sw.haversine_distance(&GeoPoint::from_degrees_unchecked(ne.lat(), sw.lng()));
        (width, height)
    }

    /// Meters of ground covered by one plane unit along (x, y).
    #[must_use]
    pub fn meters_per_pixel(&self) -> (f64, f64) {
        let (width, height) = self.dimensions();
        (
            width.get::<meter>() / self.plane.width(),
            height.get::<meter>() / self.plane.height(),
        )
    }

    /// Plane units per meter of ground, averaged over both axes.
    ///
    /// Floor plans are rarely drawn to exactly the same scale along both axes; this is the
    /// isotropic scale used when a single factor is needed.
    #[must_use]
    pub fn pixels_per_meter(&self) -> f64 {
        let (x, y) = self.meters_per_pixel();
        (1. / x + 1. / y) / 2.
    }

    pub fn path_to_plane<'a>(
        &self,
        path: impl IntoIterator<Item = &'a GeoPoint>,
    ) -> Vec<PlanePoint> {
        path.into_iter().map(|geo| self.to_plane(geo)).collect()
    }

    pub fn path_to_geo<'a>(&self, path: impl IntoIterator<Item = &'a PlanePoint>) -> Vec<GeoPoint> {
        path.into_iter().map(|point| self.to_geo(point)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{GeoBounds, GeoTransform};
    use crate::error::ConfigError;
    use crate::geodedic::GeoPoint;
    use crate::plane::{PlanePoint, PlaneSize};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use quickcheck::quickcheck;
    use rstest::rstest;
    use uom::si::length::meter;

    pub(crate) fn geo(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::from_degrees(lat, lng).expect("test coordinates are in range")
    }

    pub(crate) fn data_center() -> GeoTransform {
        GeoTransform::new(
            GeoBounds::new(geo(28.4595, 77.0266), geo(28.4585, 77.0256)).unwrap(),
            PlaneSize::new(815.4284, 333.55614).unwrap(),
        )
    }

    #[test]
    fn midpoint_maps_to_plane_center() {
        let transform = data_center();
        let center = transform.to_plane(&geo(28.4590, 77.0261));
        assert_abs_diff_eq!(center, PlanePoint::new(407.71, 166.78), epsilon = 0.5);
        assert_abs_diff_eq!(center, transform.plane().center(), epsilon = 1e-6);
        assert_abs_diff_eq!(transform.center(), geo(28.4590, 77.0261), epsilon = 1e-9);
    }

    #[rstest]
    // north-west is the top-left corner
    #[case(geo(28.4595, 77.0256), PlanePoint::new(0., 0.))]
    #[case(geo(28.4595, 77.0266), PlanePoint::new(815.4284, 0.))]
    #[case(geo(28.4585, 77.0256), PlanePoint::new(0., 333.55614))]
    #[case(geo(28.4585, 77.0266), PlanePoint::new(815.4284, 333.55614))]
    fn corners_map_to_corners(#[case] input: GeoPoint, #[case] expected: PlanePoint) {
        assert_abs_diff_eq!(data_center().to_plane(&input), expected, epsilon = 1e-6);
    }

    #[test]
    fn outside_bounds_is_not_clamped() {
        let transform = data_center();
        let north_of_building = geo(28.4600, 77.0261);
        let point = transform.to_plane(&north_of_building);
        assert!(point.y() < 0.);
        assert!(!transform.is_within_bounds(&north_of_building));
        assert!(!transform.is_within_plane(&point));

        let clamped = transform.clamp_to_plane(point);
        assert_abs_diff_eq!(clamped, PlanePoint::new(point.x(), 0.), epsilon = 1e-9);
        assert_abs_diff_eq!(
            transform.clamp_to_bounds(&north_of_building),
            geo(28.4595, 77.0261),
            epsilon = 1e-12
        );
    }

    #[rstest]
    #[case(geo(28.4595, 77.0266), true)]
    #[case(geo(28.4585, 77.0256), true)]
    #[case(geo(28.4590, 77.0261), true)]
    #[case(geo(28.45951, 77.0261), false)]
    #[case(geo(28.4590, 77.02559), false)]
    fn within_bounds_is_inclusive(#[case] input: GeoPoint, #[case] expected: bool) {
        assert_eq!(data_center().is_within_bounds(&input), expected);
    }

    #[rstest]
    #[case(geo(28.4595, 77.0266), geo(28.4595, 77.0256), "longitude")]
    #[case(geo(28.4585, 77.0266), geo(28.4585, 77.0256), "latitude")]
    #[case(geo(28.4585, 77.0266), geo(28.4595, 77.0256), "latitude")]
    fn degenerate_bounds_are_rejected(
        #[case] north_east: GeoPoint,
        #[case] south_west: GeoPoint,
        #[case] expected_axis: &str,
    ) {
        match GeoBounds::new(north_east, south_west) {
            Err(ConfigError::DegenerateBounds { axis, .. }) => assert_eq!(axis, expected_axis),
            other => panic!("expected degenerate bounds, got {other:?}"),
        }
    }

    fn try_roundtrip(geo: GeoPoint) {
        let transform = data_center();
        let back = transform.to_geo(&transform.to_plane(&geo));
        assert_abs_diff_eq!(back, geo, epsilon = 1e-9);
    }

    quickcheck! {
        fn geo_plane_roundtrip(geo: GeoPoint) -> () {
            try_roundtrip(geo);
        }
    }

    #[rstest]
    #[case(geo(28.4590, 77.0261))]
    #[case(geo(90., 180.))]
    #[case(geo(-90., -180.))]
    #[case(geo(0., 0.))]
    fn roundtrip_far_from_bounds(#[case] input: GeoPoint) {
        try_roundtrip(input);
    }

    #[test]
    fn scale_of_the_data_center() {
        let transform = data_center();
        let (width, height) = transform.dimensions();
        // ~0.001° in each direction at 28.46°N
        assert_relative_eq!(width.get::<meter>(), 97.75, epsilon = 0.05);
        assert_relative_eq!(height.get::<meter>(), 111.19, epsilon = 0.05);

        let (x, y) = transform.meters_per_pixel();
        assert_relative_eq!(x, width.get::<meter>() / 815.4284);
        assert_relative_eq!(y, height.get::<meter>() / 333.55614);
        assert_relative_eq!(transform.pixels_per_meter(), (1. / x + 1. / y) / 2.);
    }

    #[test]
    fn paths_convert_pointwise() {
        let transform = data_center();
        let path = [PlanePoint::new(235.238, 110.773), PlanePoint::new(350.813, 146.665)];
        let geo_path = transform.path_to_geo(&path);
        let back = transform.path_to_plane(&geo_path);
        assert_eq!(back.len(), 2);
        for (a, b) in back.iter().zip(&path) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }
}
