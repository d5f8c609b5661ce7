//! Differential-drive motion model and its Jacobians
//!
//! The state transition takes the per-step arc lengths traveled by the left
//! and right wheels. Equal arc lengths are handled by a dedicated straight
//! branch so the turn-radius formulas never divide by zero.

use crate::common::angle::normalize_angle;
use crate::common::types::{Pose2D, WheelControl};
use nalgebra::{Matrix3, Matrix3x2};

/// Propagate a pose by one control step.
///
/// For unequal wheel arcs the robot moves on a circular arc with turn angle
/// `alpha = (r - l) / w` and left-wheel radius `l / alpha`; for equal arcs it
/// moves straight ahead. The new heading is wrapped into (-pi, pi].
pub fn motion_model(pose: &Pose2D, control: &WheelControl, robot_width: f64) -> Pose2D {
    let (l, r) = (control.left, control.right);
    let w = robot_width;
    let yaw = pose.yaw;
    if r != l {
        let alpha = (r - l) / w;
        let rad = l / alpha;
        Pose2D::new(
            pose.x + (rad + w / 2.0) * ((yaw + alpha).sin() - yaw.sin()),
            pose.y + (rad + w / 2.0) * (-(yaw + alpha).cos() + yaw.cos()),
            normalize_angle(yaw + alpha),
        )
    } else {
        Pose2D::new(pose.x + l * yaw.cos(), pose.y + l * yaw.sin(), yaw)
    }
}

/// Jacobian of the state transition with respect to the pose.
///
/// Only the heading column carries off-identity terms; x and y do not feed
/// back into the transition.
pub fn jacobian_state(pose: &Pose2D, control: &WheelControl, robot_width: f64) -> Matrix3<f64> {
    let (l, r) = (control.left, control.right);
    let w = robot_width;
    let yaw = pose.yaw;
    if r != l {
        let alpha = (r - l) / w;
        let yaw_new = yaw + alpha;
        let rpw2 = l / alpha + w / 2.0;
        Matrix3::new(
            1.0, 0.0, rpw2 * (yaw_new.cos() - yaw.cos()),
            0.0, 1.0, rpw2 * (yaw_new.sin() - yaw.sin()),
            0.0, 0.0, 1.0,
        )
    } else {
        Matrix3::new(
            1.0, 0.0, -l * yaw.sin(),
            0.0, 1.0, l * yaw.cos(),
            0.0, 0.0, 1.0,
        )
    }
}

/// Jacobian of the state transition with respect to the control.
///
/// The heading row is constant: d yaw'/d l = -1/w and d yaw'/d r = 1/w in
/// both branches. The translation rows use the straight-motion limit when
/// the wheel arcs are equal.
pub fn jacobian_control(pose: &Pose2D, control: &WheelControl, robot_width: f64) -> Matrix3x2<f64> {
    let (l, r) = (control.left, control.right);
    let w = robot_width;
    let yaw = pose.yaw;
    let (dg1dl, dg1dr, dg2dl, dg2dr) = if r != l {
        let rml = r - l;
        let rml2 = rml * rml;
        let yaw_new = yaw + rml / w;
        (
            w * r / rml2 * (yaw_new.sin() - yaw.sin()) - (r + l) / (2.0 * rml) * yaw_new.cos(),
            -w * l / rml2 * (yaw_new.sin() - yaw.sin()) + (r + l) / (2.0 * rml) * yaw_new.cos(),
            w * r / rml2 * (-yaw_new.cos() + yaw.cos()) - (r + l) / (2.0 * rml) * yaw_new.sin(),
            -w * l / rml2 * (-yaw_new.cos() + yaw.cos()) + (r + l) / (2.0 * rml) * yaw_new.sin(),
        )
    } else {
        (
            0.5 * (yaw.cos() + l / w * yaw.sin()),
            0.5 * (-l / w * yaw.sin() + yaw.cos()),
            0.5 * (yaw.sin() - l / w * yaw.cos()),
            0.5 * (l / w * yaw.cos() + yaw.sin()),
        )
    };
    Matrix3x2::new(
        dg1dl, dg1dr,
        dg2dl, dg2dr,
        -1.0 / w, 1.0 / w,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const W: f64 = 155.0;

    #[test]
    fn test_straight_motion() {
        let pose = Pose2D::origin();
        let control = WheelControl::new(100.0, 100.0);
        let new_pose = motion_model(&pose, &control, W);
        assert_eq!(new_pose.x, 100.0);
        assert_eq!(new_pose.y, 0.0);
        assert_eq!(new_pose.yaw, 0.0);
    }

    #[test]
    fn test_turning_motion() {
        let pose = Pose2D::new(10.0, -5.0, 0.4);
        let control = WheelControl::new(100.0, 120.0);
        let new_pose = motion_model(&pose, &control, W);

        let alpha = (120.0 - 100.0) / W;
        let rad = 100.0 / alpha;
        let expected_x = 10.0 + (rad + W / 2.0) * ((0.4_f64 + alpha).sin() - 0.4_f64.sin());
        let expected_y = -5.0 + (rad + W / 2.0) * (-(0.4_f64 + alpha).cos() + 0.4_f64.cos());
        let expected_yaw = 0.4 + alpha;
        assert!((new_pose.x - expected_x).abs() < 1e-9);
        assert!((new_pose.y - expected_y).abs() < 1e-9);
        assert!((new_pose.yaw - expected_yaw).abs() < 1e-9);
    }

    #[test]
    fn test_heading_wrap() {
        let pose = Pose2D::new(0.0, 0.0, 3.1);
        let control = WheelControl::new(100.0, 120.0);
        let new_pose = motion_model(&pose, &control, W);
        assert!(new_pose.yaw > -PI && new_pose.yaw <= PI);
        // 3.1 + 20/155 crosses pi and wraps negative.
        assert!(new_pose.yaw < 0.0);
    }

    fn finite_difference_state(
        pose: &Pose2D,
        control: &WheelControl,
        component: usize,
        step: f64,
    ) -> [f64; 3] {
        let mut plus = *pose;
        let mut minus = *pose;
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
        let gp = motion_model(&plus, control, W);
        let gm = motion_model(&minus, control, W);
        [
            (gp.x - gm.x) / (2.0 * step),
            (gp.y - gm.y) / (2.0 * step),
            (gp.yaw - gm.yaw) / (2.0 * step),
        ]
    }

    fn finite_difference_control(
        pose: &Pose2D,
        control: &WheelControl,
        component: usize,
        step: f64,
    ) -> [f64; 3] {
        let mut plus = *control;
        let mut minus = *control;
        if component == 0 {
            plus.left += step;
            minus.left -= step;
        } else {
            plus.right += step;
            minus.right -= step;
        }
        let gp = motion_model(pose, &plus, W);
        let gm = motion_model(pose, &minus, W);
        [
            (gp.x - gm.x) / (2.0 * step),
            (gp.y - gm.y) / (2.0 * step),
            (gp.yaw - gm.yaw) / (2.0 * step),
        ]
    }

    fn assert_close(numeric: f64, analytic: f64) {
        let tolerance = 1e-4 * analytic.abs().max(1.0);
        assert!(
            (numeric - analytic).abs() < tolerance,
            "numeric {} vs analytic {}",
            numeric,
            analytic
        );
    }

    #[test]
    fn test_jacobian_state_turning_branch() {
        let pose = Pose2D::new(3.0, 7.0, 0.7);
        let control = WheelControl::new(100.0, 120.0);
        let jac = jacobian_state(&pose, &control, W);
        for component in 0..3 {
            let column = finite_difference_state(&pose, &control, component, 1e-5);
            for (row, value) in column.iter().enumerate() {
                assert_close(*value, jac[(row, component)]);
            }
        }
    }

    #[test]
    fn test_jacobian_state_straight_branch() {
        let pose = Pose2D::new(3.0, 7.0, 0.7);
        let control = WheelControl::new(100.0, 100.0);
        let jac = jacobian_state(&pose, &control, W);
        for component in 0..3 {
            let column = finite_difference_state(&pose, &control, component, 1e-5);
            for (row, value) in column.iter().enumerate() {
                assert_close(*value, jac[(row, component)]);
            }
        }
    }

    #[test]
    fn test_jacobian_control_turning_branch() {
        let pose = Pose2D::new(3.0, 7.0, 0.7);
        let control = WheelControl::new(100.0, 120.0);
        let jac = jacobian_control(&pose, &control, W);
        for component in 0..2 {
            let column = finite_difference_control(&pose, &control, component, 1e-5);
            for (row, value) in column.iter().enumerate() {
                assert_close(*value, jac[(row, component)]);
            }
        }
    }

    #[test]
    fn test_jacobian_control_straight_branch() {
        let pose = Pose2D::new(3.0, 7.0, 0.7);
        let control = WheelControl::new(100.0, 100.0);
        let jac = jacobian_control(&pose, &control, W);
        // A perturbed wheel arc puts the evaluation on the turning branch
        // with a near-infinite turn radius; a larger step keeps the
        // cancellation in sin(yaw + alpha) - sin(yaw) benign.
        for component in 0..2 {
            let column = finite_difference_control(&pose, &control, component, 1e-3);
            for (row, value) in column.iter().enumerate() {
                assert_close(*value, jac[(row, component)]);
            }
        }
    }
}
