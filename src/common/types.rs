//! Common types used throughout landmark_slam

use crate::common::angle::normalize_angle;
use nalgebra::Matrix2;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

/// 2D pose (position + heading)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, yaw: 0.0 }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Control input for a differential drive robot: per-step wheel arc lengths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelControl {
    pub left: f64,
    pub right: f64,
}

impl WheelControl {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }
}

/// A single range/bearing observation of a landmark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBearing {
    pub range: f64,
    pub bearing: f64,
}

impl RangeBearing {
    pub fn new(range: f64, bearing: f64) -> Self {
        Self { range, bearing }
    }
}

/// Principal-axis summary of a 2x2 positional covariance block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorEllipse {
    /// Pointing direction of the major axis, in (-pi, pi]
    pub angle: f64,
    /// Standard deviation along the major axis
    pub stddev_major: f64,
    /// Standard deviation along the minor axis
    pub stddev_minor: f64,
}

impl ErrorEllipse {
    /// Decompose a 2x2 covariance block into its principal axes.
    ///
    /// Eigenvalues are sorted so that `stddev_major >= stddev_minor`. Tiny
    /// negative eigenvalues from roundoff are clamped to zero. The axis angle
    /// is defined up to sign since eigenvectors carry no orientation.
    pub fn from_covariance(covariance: &Matrix2<f64>) -> Self {
        let eigen = covariance.symmetric_eigen();
        let (major, minor) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };
        let axis = eigen.eigenvectors.column(major);
        ErrorEllipse {
            angle: normalize_angle(axis[1].atan2(axis[0])),
            stddev_major: eigen.eigenvalues[major].max(0.0).sqrt(),
            stddev_minor: eigen.eigenvalues[minor].max(0.0).sqrt(),
        }
    }
}
