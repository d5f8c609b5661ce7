// SLAM estimator module

pub mod alignment;
pub mod ekf_slam;

// Re-exports
pub use alignment::{estimate_transform, SimilarityTransform};
pub use ekf_slam::{EkfSlam, EkfSlamConfig, LANDMARK_SIZE, POSE_SIZE};
