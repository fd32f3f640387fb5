use crate::error::ConfigError;
use crate::Point2;
use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point on the floor plan, in plane (pixel) units.
///
/// The origin is the top-left corner of the plan and Y grows _downwards_, following screen
/// conventions. Note that this is the opposite direction of growing latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
// no need for the "point": indirection
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PlanePoint {
    pub(crate) point: Point2,
}

impl PlanePoint {
    pub(crate) fn from_nalgebra_point(point: Point2) -> Self {
        Self { point }
    }

    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self::from_nalgebra_point(Point2::new(x, y))
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.point.x
    }

    #[must_use]
    pub fn y(&self) -> f64 {
        self.point.y
    }

    /// Euclidean distance to `other` in plane units.
    #[must_use]
    pub fn distance_to(&self, other: &PlanePoint) -> f64 {
        nalgebra::distance(&self.point, &other.point)
    }
}

/// Euclidean distance between two plane points.
///
/// Shorthand for [`PlanePoint::distance_to`].
#[must_use]
pub fn plane_distance(a: &PlanePoint, b: &PlanePoint) -> f64 {
    a.distance_to(b)
}

impl Display for PlanePoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.point.x, self.point.y)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for PlanePoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        // half a pixel is as precise as anyone looking at the plan will notice
        0.5
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        // NOTE: component-wise, not the length of the difference
        self.point.abs_diff_eq(&other.point, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for PlanePoint {
    fn default_max_relative() -> Self::Epsilon {
        Point2::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.point.relative_eq(&other.point, epsilon, max_relative)
    }
}

/// Extent of the floor plan, spanning `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawPlaneSize", into = "RawPlaneSize")
)]
pub struct PlaneSize {
    width: f64,
    height: f64,
}

impl PlaneSize {
    /// Both dimensions must be finite and strictly positive.
    pub fn new(width: f64, height: f64) -> Result<Self, ConfigError> {
        if !(width.is_finite() && height.is_finite() && width > 0. && height > 0.) {
            return Err(ConfigError::InvalidPlaneSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub(crate) const fn new_unchecked(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[must_use]
    pub fn center(&self) -> PlanePoint {
        PlanePoint::new(self.width / 2., self.height / 2.)
    }

    /// Clamps `point` into `[0, width] x [0, height]`.
    #[must_use]
    pub fn clamp(&self, point: PlanePoint) -> PlanePoint {
        PlanePoint::new(
            point.x().clamp(0., self.width),
            point.y().clamp(0., self.height),
        )
    }

    /// Inclusive containment check.
    #[must_use]
    pub fn contains(&self, point: &PlanePoint) -> bool {
        (0.0..=self.width).contains(&point.x()) && (0.0..=self.height).contains(&point.y())
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct RawPlaneSize {
    width: f64,
    height: f64,
}

impl TryFrom<RawPlaneSize> for PlaneSize {
    type Error = ConfigError;

    fn try_from(RawPlaneSize { width, height }: RawPlaneSize) -> Result<Self, Self::Error> {
        PlaneSize::new(width, height)
    }
}

impl From<PlaneSize> for RawPlaneSize {
    fn from(PlaneSize { width, height }: PlaneSize) -> Self {
        RawPlaneSize { width, height }
    }
}
