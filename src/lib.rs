//! landmark_slam - EKF-based landmark SLAM for differential drive robots
//!
//! This crate estimates a robot's pose together with the positions of a
//! growing set of point landmarks from wheel odometry and range/bearing
//! observations, using an Extended Kalman Filter with incremental state
//! augmentation. A closed-form similarity alignment of matched landmark
//! pairs re-anchors the pose against the map when odometry drift builds up.

// Core modules
pub mod common;

// Estimator modules
pub mod models;
pub mod slam;

// Re-export common types for convenience
pub use common::{normalize_angle, ErrorEllipse, Point2D, Pose2D, RangeBearing, WheelControl};
pub use common::{SlamError, SlamResult};
pub use slam::{estimate_transform, EkfSlam, EkfSlamConfig, SimilarityTransform};
