//! EKF SLAM with incremental state augmentation
//!
//! The filter owns a joint state vector [x, y, yaw, lm1_x, lm1_y, ...] and
//! its covariance. Landmarks are appended as they are first observed; their
//! indices are stable handles, never reused or compacted.

use crate::common::angle::normalize_angle;
use crate::common::error::{SlamError, SlamResult};
use crate::common::types::{ErrorEllipse, Point2D, Pose2D, RangeBearing, WheelControl};
use crate::models::{measurement, motion};
use crate::slam::alignment::SimilarityTransform;
use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Vector2};

/// Pose block size [x, y, yaw]
pub const POSE_SIZE: usize = 3;
/// Landmark block size [x, y]
pub const LANDMARK_SIZE: usize = 2;

/// Variance assigned to each axis of a freshly admitted landmark
const NEW_LANDMARK_VARIANCE: f64 = 1e10;

/// Configuration for the EKF SLAM estimator, fixed at construction
#[derive(Debug, Clone)]
pub struct EkfSlamConfig {
    /// Wheel separation of the differential drive base
    pub robot_width: f64,
    /// Longitudinal offset of the ranging sensor from the rotation center
    pub scanner_displacement: f64,
    /// Control noise factor proportional to the distance traveled per wheel
    pub control_motion_factor: f64,
    /// Additional control noise factor for differential turning (slip)
    pub control_turn_factor: f64,
    /// Standard deviation of range measurements
    pub measurement_distance_stddev: f64,
    /// Standard deviation of bearing measurements
    pub measurement_angle_stddev: f64,
}

impl Default for EkfSlamConfig {
    fn default() -> Self {
        Self {
            robot_width: 155.0,
            scanner_displacement: 30.0,
            control_motion_factor: 0.35,
            control_turn_factor: 0.6,
            measurement_distance_stddev: 600.0,
            measurement_angle_stddev: 45.0_f64.to_radians(),
        }
    }
}

/// EKF SLAM estimator
///
/// State vector: [x, y, yaw, lm1_x, lm1_y, lm2_x, lm2_y, ...]
pub struct EkfSlam {
    state: DVector<f64>,
    covariance: DMatrix<f64>,
    n_landmarks: usize,
    config: EkfSlamConfig,
}

impl EkfSlam {
    /// Create a new estimator from an initial pose and pose covariance.
    pub fn new(
        initial_pose: Pose2D,
        initial_covariance: Matrix3<f64>,
        config: EkfSlamConfig,
    ) -> Self {
        let state = DVector::from_vec(vec![initial_pose.x, initial_pose.y, initial_pose.yaw]);
        let mut covariance = DMatrix::zeros(POSE_SIZE, POSE_SIZE);
        covariance
            .fixed_view_mut::<POSE_SIZE, POSE_SIZE>(0, 0)
            .copy_from(&initial_covariance);
        EkfSlam {
            state,
            covariance,
            n_landmarks: 0,
            config,
        }
    }

    /// Current robot pose estimate
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.state[0], self.state[1], self.state[2])
    }

    /// Number of admitted landmarks
    pub fn n_landmarks(&self) -> usize {
        self.n_landmarks
    }

    /// Position estimate of landmark `index`
    pub fn landmark(&self, index: usize) -> Option<Point2D> {
        if index < self.n_landmarks {
            let j = POSE_SIZE + LANDMARK_SIZE * index;
            Some(Point2D::new(self.state[j], self.state[j + 1]))
        } else {
            None
        }
    }

    /// Position estimates of all landmarks, in admission order
    pub fn landmarks(&self) -> Vec<Point2D> {
        (0..self.n_landmarks)
            .map(|i| {
                let j = POSE_SIZE + LANDMARK_SIZE * i;
                Point2D::new(self.state[j], self.state[j + 1])
            })
            .collect()
    }

    /// Joint state vector (pose followed by landmark positions)
    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    /// Joint covariance matrix
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Error ellipse of the positional pose uncertainty
    pub fn pose_error_ellipse(&self) -> ErrorEllipse {
        let block = self.covariance.fixed_view::<2, 2>(0, 0).clone_owned();
        ErrorEllipse::from_covariance(&block)
    }

    /// Standard deviation of the heading estimate
    pub fn heading_stddev(&self) -> f64 {
        self.covariance[(2, 2)].max(0.0).sqrt()
    }

    /// Error ellipses of all landmark position estimates, in admission order
    pub fn landmark_error_ellipses(&self) -> Vec<ErrorEllipse> {
        (0..self.n_landmarks)
            .map(|i| {
                let j = POSE_SIZE + LANDMARK_SIZE * i;
                let block = self.covariance.fixed_view::<2, 2>(j, j).clone_owned();
                ErrorEllipse::from_covariance(&block)
            })
            .collect()
    }

    /// Prediction step: propagate pose mean and joint covariance by one
    /// control input.
    ///
    /// Landmarks do not move, so the full-state transition Jacobian is the
    /// identity outside the pose block and the covariance update reduces to
    /// the pose block and the pose-landmark cross blocks.
    pub fn predict(&mut self, control: &WheelControl) {
        let w = self.config.robot_width;
        let pose = self.pose();
        let g3 = motion::jacobian_state(&pose, control, w);
        let v = motion::jacobian_control(&pose, control, w);

        // Control noise grows with distance traveled and with differential
        // turning.
        let turn = control.left - control.right;
        let left_var = (self.config.control_motion_factor * control.left).powi(2)
            + (self.config.control_turn_factor * turn).powi(2);
        let right_var = (self.config.control_motion_factor * control.right).powi(2)
            + (self.config.control_turn_factor * turn).powi(2);
        let control_covariance = Matrix2::from_diagonal(&Vector2::new(left_var, right_var));
        let r3 = v * control_covariance * v.transpose();

        let p_rr = self
            .covariance
            .fixed_view::<POSE_SIZE, POSE_SIZE>(0, 0)
            .clone_owned();
        let p_rr_new = g3 * p_rr * g3.transpose() + r3;
        self.covariance
            .fixed_view_mut::<POSE_SIZE, POSE_SIZE>(0, 0)
            .copy_from(&p_rr_new);

        for i in 0..self.n_landmarks {
            let j = POSE_SIZE + LANDMARK_SIZE * i;
            let p_rm = self
                .covariance
                .fixed_view::<POSE_SIZE, LANDMARK_SIZE>(0, j)
                .clone_owned();
            let p_rm_new = g3 * p_rm;
            self.covariance
                .fixed_view_mut::<POSE_SIZE, LANDMARK_SIZE>(0, j)
                .copy_from(&p_rm_new);
            self.covariance
                .fixed_view_mut::<LANDMARK_SIZE, POSE_SIZE>(j, 0)
                .copy_from(&p_rm_new.transpose());
        }

        let new_pose = motion::motion_model(&pose, control, w);
        self.state[0] = new_pose.x;
        self.state[1] = new_pose.y;
        self.state[2] = new_pose.yaw;
    }

    /// Admit a new landmark at a world-frame initial position estimate.
    ///
    /// The mean grows by two entries and the covariance by two rows and
    /// columns; the new diagonal block is effectively uninformative and all
    /// cross terms start at zero. Returns the landmark's stable index.
    pub fn add_landmark(&mut self, position: Point2D) -> usize {
        let index = self.n_landmarks;
        let old_dim = self.state.len();
        let new_dim = old_dim + LANDMARK_SIZE;

        let mut state = DVector::zeros(new_dim);
        state.rows_mut(0, old_dim).copy_from(&self.state);
        state[old_dim] = position.x;
        state[old_dim + 1] = position.y;

        let mut covariance = DMatrix::zeros(new_dim, new_dim);
        covariance
            .view_mut((0, 0), (old_dim, old_dim))
            .copy_from(&self.covariance);
        covariance[(old_dim, old_dim)] = NEW_LANDMARK_VARIANCE;
        covariance[(old_dim + 1, old_dim + 1)] = NEW_LANDMARK_VARIANCE;

        self.state = state;
        self.covariance = covariance;
        self.n_landmarks += 1;
        index
    }

    /// Correction step: fuse one observation of an already-admitted landmark.
    ///
    /// `landmark_index` must come from a previous [`add_landmark`] call;
    /// passing an out-of-range index is a caller bug and panics. A singular
    /// innovation covariance is unrecoverable and surfaces as
    /// [`SlamError::NumericalError`].
    ///
    /// [`add_landmark`]: EkfSlam::add_landmark
    pub fn correct(&mut self, measurement: &RangeBearing, landmark_index: usize) -> SlamResult<()> {
        assert!(
            landmark_index < self.n_landmarks,
            "landmark index {} out of range (have {})",
            landmark_index,
            self.n_landmarks
        );
        let dim = self.state.len();
        let d = self.config.scanner_displacement;
        let pose = self.pose();
        let j = POSE_SIZE + LANDMARK_SIZE * landmark_index;
        let landmark = Point2D::new(self.state[j], self.state[j + 1]);

        // Moving the landmark has the opposite effect of moving the pose by
        // the same delta, so the landmark columns are the negated x/y
        // columns of the pose Jacobian.
        let h3 = measurement::jacobian_state(&pose, &landmark, d);
        let mut h = DMatrix::zeros(2, dim);
        h.fixed_view_mut::<2, POSE_SIZE>(0, 0).copy_from(&h3);
        let h_landmark = -h3.fixed_columns::<LANDMARK_SIZE>(0).clone_owned();
        h.fixed_view_mut::<2, LANDMARK_SIZE>(0, j)
            .copy_from(&h_landmark);

        let q = Matrix2::from_diagonal(&Vector2::new(
            self.config.measurement_distance_stddev.powi(2),
            self.config.measurement_angle_stddev.powi(2),
        ));
        let s_dyn = &h * &self.covariance * h.transpose();
        let s = Matrix2::new(s_dyn[(0, 0)], s_dyn[(0, 1)], s_dyn[(1, 0)], s_dyn[(1, 1)]) + q;
        let s_inv = s.try_inverse().ok_or_else(|| {
            SlamError::NumericalError("innovation covariance is singular".to_string())
        })?;
        let k = &self.covariance
            * h.transpose()
            * DMatrix::from_fn(2, 2, |row, col| s_inv[(row, col)]);

        let predicted = measurement::observation_model(&pose, &landmark, d);
        let innovation = DVector::from_vec(vec![
            measurement.range - predicted.range,
            normalize_angle(measurement.bearing - predicted.bearing),
        ]);

        self.state += &k * innovation;
        self.state[2] = normalize_angle(self.state[2]);

        let i_kh = DMatrix::identity(dim, dim) - &k * &h;
        self.covariance = &i_kh * &self.covariance;
        // Keep symmetry against accumulated roundoff.
        self.covariance = (&self.covariance + self.covariance.transpose()) * 0.5;
        Ok(())
    }

    /// Re-anchor the pose with a similarity transform fitted over matched
    /// landmark pairs.
    ///
    /// Only the pose mean moves. The covariance is left as-is, so the pose
    /// uncertainty reported right after a re-anchoring is understated.
    pub fn correct_pose(&mut self, transform: &SimilarityTransform) {
        let position = transform.apply(Point2D::new(self.state[0], self.state[1]));
        self.state[0] = position.x;
        self.state[1] = position.y;
        self.state[2] = normalize_angle(self.state[2] + transform.rotation_angle());
    }
}
