//! Plane positions for fixes outside the building.
//!
//! Clamping an offsite fix onto the plan pins the pointer to an edge and hides any movement. The
//! [`OffsiteFallbackMapper`] instead pins the _first_ offsite fix to a designated reference point
//! on the plan (typically the route start) and moves the pointer from there by the ground
//! distance walked since, using an equirectangular approximation. This is advisory feedback for
//! the user, not a geodetically exact position.

use crate::geodedic::GeoPoint;
use crate::plane::{PlanePoint, PlaneSize};
use crate::transform::GeoTransform;
use tracing::debug;
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A fixed pairing of a ground location with a point on the floor plan.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceAnchor {
    pub geo: GeoPoint,
    pub plane: PlanePoint,
}

impl ReferenceAnchor {
    /// Anchors `geo` to wherever `transform` puts it on the plane.
    #[must_use]
    pub fn at(geo: GeoPoint, transform: &GeoTransform) -> Self {
        Self {
            geo,
            plane: transform.to_plane(&geo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    locked_geo: GeoPoint,
    locked_plane: PlanePoint,
}

#[derive(Debug, Clone)]
pub struct OffsiteFallbackMapper {
    anchor: ReferenceAnchor,
    meters_to_pixels: f64,
    plane: PlaneSize,
    calibration: Option<Calibration>,
}

impl OffsiteFallbackMapper {
    #[must_use]
    pub fn new(anchor: ReferenceAnchor, meters_to_pixels: f64, plane: PlaneSize) -> Self {
        Self {
            anchor,
            meters_to_pixels,
            plane,
            calibration: None,
        }
    }

    #[must_use]
    pub fn anchor(&self) -> &ReferenceAnchor {
        &self.anchor
    }

    #[must_use]
    pub fn meters_to_pixels(&self) -> f64 {
        self.meters_to_pixels
    }

    /// Maps an offsite location onto the plane.
    ///
    /// The first call after construction or [`reset`](Self::reset) locks `geo` to the anchor's
    /// plane point and returns that point. Later calls offset from there by the east/north
    /// ground distance to the locked location. The result is always on the plane.
    pub fn map_offsite(&mut self, geo: &GeoPoint) -> PlanePoint {
        let anchor = self.anchor;
        let calibration = *self.calibration.get_or_insert_with(|| {
            debug!(%geo, plane = %anchor.plane, "locking offsite calibration");
            Calibration {
                locked_geo: *geo,
                locked_plane: anchor.plane,
            }
        });

        let (east, north) = calibration.locked_geo.local_offset_to(geo);
        let x = calibration.locked_plane.x() + east.get::<meter>() * self.meters_to_pixels;
        // plane Y grows southwards
        let y = calibration.locked_plane.y() - north.get::<meter>() * self.meters_to_pixels;
        self.plane.clamp(PlanePoint::new(x, y))
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn reset(&mut self) {
        if self.calibration.take().is_some() {
            debug!("offsite calibration cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OffsiteFallbackMapper, ReferenceAnchor};
    use crate::geodedic::{GeoPoint, METERS_PER_DEGREE_LAT, METERS_PER_DEGREE_LNG_AT_EQUATOR};
    use crate::plane::{PlanePoint, PlaneSize};
    use crate::transform::tests::{data_center, geo};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const SCALE: f64 = 4.;

    fn mapper() -> OffsiteFallbackMapper {
        let transform = data_center();
        OffsiteFallbackMapper::new(
            ReferenceAnchor::at(geo(28.4590, 77.0261), &transform),
            SCALE,
            *transform.plane(),
        )
    }

    // 5m north of the given location
    fn five_meters_north(of: GeoPoint) -> GeoPoint {
        geo(of.lat() + 5. / METERS_PER_DEGREE_LAT, of.lng())
    }

    #[test]
    fn first_offsite_fix_lands_on_the_anchor() {
        let mut mapper = mapper();
        assert!(!mapper.is_calibrated());
        let point = mapper.map_offsite(&geo(28.4700, 77.0400));
        assert!(mapper.is_calibrated());
        assert_abs_diff_eq!(point, mapper.anchor().plane, epsilon = 1e-9);
    }

    #[test]
    fn movement_after_leaving_is_tracked_not_frozen() {
        let mut mapper = mapper();
        let exit = geo(28.4700, 77.0400);
        let anchor = mapper.map_offsite(&exit);

        let moved = mapper.map_offsite(&five_meters_north(exit));
        assert_relative_eq!(anchor.y() - moved.y(), 5. * SCALE, epsilon = 1e-6);
        assert_relative_eq!(moved.x(), anchor.x(), epsilon = 1e-6);
        assert_relative_eq!(moved.distance_to(&anchor), 5. * SCALE, epsilon = 1e-6);
    }

    #[test]
    fn east_moves_right() {
        let mut mapper = mapper();
        let exit = geo(28.4700, 77.0400);
        let anchor = mapper.map_offsite(&exit);

        let mean_lat = exit.lat().to_radians();
        let step = 3. / (METERS_PER_DEGREE_LNG_AT_EQUATOR * mean_lat.cos());
        let moved = mapper.map_offsite(&geo(exit.lat(), exit.lng() + step));
        assert_relative_eq!(moved.x() - anchor.x(), 3. * SCALE, epsilon = 1e-6);
        assert_relative_eq!(moved.y(), anchor.y(), epsilon = 1e-6);
    }

    #[test]
    fn result_is_clamped_to_the_plane() {
        let mut mapper = OffsiteFallbackMapper::new(
            ReferenceAnchor {
                geo: geo(0., 0.),
                plane: PlanePoint::new(10., 10.),
            },
            SCALE,
            PlaneSize::new(100., 100.).unwrap(),
        );
        let exit = geo(1., 1.);
        mapper.map_offsite(&exit);
        // 5km south-west
        let far = mapper.map_offsite(&geo(0.955, 0.955));
        assert_eq!(far, PlanePoint::new(0., 100.));
    }

    #[test]
    fn reset_reanchors_the_next_excursion() {
        let mut mapper = mapper();
        let first = geo(28.4700, 77.0400);
        mapper.map_offsite(&first);
        mapper.map_offsite(&five_meters_north(first));

        mapper.reset();
        assert!(!mapper.is_calibrated());

        let second = geo(28.4400, 77.0100);
        let point = mapper.map_offsite(&second);
        assert_abs_diff_eq!(point, mapper.anchor().plane, epsilon = 1e-9);
    }
}
