//! Range/bearing observation model and its Jacobian
//!
//! The ranging sensor sits a fixed longitudinal offset ahead of the robot's
//! rotation center, so heading enters the model twice: through the bearing
//! and through the offset sensor position.

use crate::common::angle::normalize_angle;
use crate::common::types::{Point2D, Pose2D, RangeBearing};
use nalgebra::Matrix2x3;

/// Predict the (range, bearing) observation of a landmark from a pose.
pub fn observation_model(
    pose: &Pose2D,
    landmark: &Point2D,
    scanner_displacement: f64,
) -> RangeBearing {
    let dx = landmark.x - (pose.x + scanner_displacement * pose.yaw.cos());
    let dy = landmark.y - (pose.y + scanner_displacement * pose.yaw.sin());
    RangeBearing::new(
        (dx * dx + dy * dy).sqrt(),
        normalize_angle(dy.atan2(dx) - pose.yaw),
    )
}

/// Jacobian of the observation with respect to the pose.
///
/// The landmark's own partials are the negated x/y columns of this matrix;
/// the filter assembles them when it builds the joint Jacobian.
pub fn jacobian_state(
    pose: &Pose2D,
    landmark: &Point2D,
    scanner_displacement: f64,
) -> Matrix2x3<f64> {
    let cos_yaw = pose.yaw.cos();
    let sin_yaw = pose.yaw.sin();
    let d = scanner_displacement;
    let dx = landmark.x - (pose.x + d * cos_yaw);
    let dy = landmark.y - (pose.y + d * sin_yaw);
    let q = dx * dx + dy * dy;
    let sqrt_q = q.sqrt();
    Matrix2x3::new(
        -dx / sqrt_q, -dy / sqrt_q, (dx * sin_yaw - dy * cos_yaw) * d / sqrt_q,
        dy / q, -dx / q, -1.0 - d / q * (dx * cos_yaw + dy * sin_yaw),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_observation_ahead() {
        let pose = Pose2D::origin();
        let landmark = Point2D::new(1.0, 0.0);
        let obs = observation_model(&pose, &landmark, 0.0);
        assert!((obs.range - 1.0).abs() < 1e-12);
        assert!(obs.bearing.abs() < 1e-12);
    }

    #[test]
    fn test_observation_scanner_offset() {
        // The sensor sits 0.3 ahead of the rotation center, shortening the range.
        let pose = Pose2D::origin();
        let landmark = Point2D::new(1.0, 0.0);
        let obs = observation_model(&pose, &landmark, 0.3);
        assert!((obs.range - 0.7).abs() < 1e-12);
        assert!(obs.bearing.abs() < 1e-12);
    }

    #[test]
    fn test_observation_side() {
        let pose = Pose2D::new(2.0, 1.0, PI / 2.0);
        let landmark = Point2D::new(2.0, 4.0);
        let obs = observation_model(&pose, &landmark, 0.0);
        assert!((obs.range - 3.0).abs() < 1e-12);
        assert!(obs.bearing.abs() < 1e-12);
    }

    #[test]
    fn test_bearing_wrap() {
        // Heading just below pi, landmark slightly clockwise of straight
        // behind: the raw difference falls below -pi and must wrap positive.
        let pose = Pose2D::new(0.0, 0.0, 3.1);
        let landmark = Point2D::new(1.0, -0.1);
        let obs = observation_model(&pose, &landmark, 0.0);
        assert!(obs.bearing > -PI && obs.bearing <= PI);
        assert!(obs.bearing > 3.0);
    }

    #[test]
    fn test_jacobian_against_finite_differences() {
        let pose = Pose2D::new(1.2, -0.4, 0.9);
        let landmark = Point2D::new(4.0, 2.5);
        let d = 0.3;
        let jac = jacobian_state(&pose, &landmark, d);

        let step = 1e-6;
        for component in 0..3 {
            let mut plus = pose;
            let mut minus = pose;
            match component {
                0 => {
                    plus.x += step;
                    minus.x -= step;
                }
                1 => {
                    plus.y += step;
                    minus.y -= step;
                }
                _ => {
                    plus.yaw += step;
                    minus.yaw -= step;
                }
            }
            let op = observation_model(&plus, &landmark, d);
            let om = observation_model(&minus, &landmark, d);
            let dr = (op.range - om.range) / (2.0 * step);
            let da = (op.bearing - om.bearing) / (2.0 * step);
            assert!(
                (dr - jac[(0, component)]).abs() < 1e-4,
                "range partial {}: {} vs {}",
                component,
                dr,
                jac[(0, component)]
            );
            assert!(
                (da - jac[(1, component)]).abs() < 1e-4,
                "bearing partial {}: {} vs {}",
                component,
                da,
                jac[(1, component)]
            );
        }
    }
}
