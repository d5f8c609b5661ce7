// Landmark SLAM demo
//
// Simulates a differential drive robot circling a field of cylinder
// landmarks. Each step runs the full estimation sequence: predict from
// noisy wheel controls, re-anchor the pose against well-matched landmarks,
// admit newly seen landmarks, then fuse each observation.

use gnuplot::{AxesCommon, Caption, Color, Figure, PointSize, PointSymbol};
use landmark_slam::models::{measurement, motion};
use landmark_slam::{
    estimate_transform, EkfSlam, EkfSlamConfig, Point2D, Pose2D, RangeBearing, WheelControl,
};
use nalgebra::Matrix3;
use ordered_float::OrderedFloat;
use rand_distr::{Distribution, Normal};

// Simulation parameters
const N_STEPS: usize = 600;
const MAX_RANGE: f64 = 8.0; // maximum observation range [m]

// Data association parameters
const ASSOCIATION_GATE: f64 = 1.0; // matching gate radius [m]
const REANCHOR_GATE: f64 = 0.4; // per-axis gate for alignment pairs [m]

/// One simulated observation, tagged with its matched landmark (or None)
struct Observation {
    measurement: RangeBearing,
    world: Point2D,
    matched: Option<usize>,
}

fn demo_config() -> EkfSlamConfig {
    EkfSlamConfig {
        robot_width: 0.5,
        scanner_displacement: 0.1,
        control_motion_factor: 0.05,
        control_turn_factor: 0.1,
        measurement_distance_stddev: 0.1,
        measurement_angle_stddev: 2.0_f64.to_radians(),
    }
}

/// World position of an observation, seen from the given pose.
fn observed_world_position(pose: &Pose2D, obs: &RangeBearing, scanner_displacement: f64) -> Point2D {
    let heading = pose.yaw + obs.bearing;
    Point2D::new(
        pose.x + scanner_displacement * pose.yaw.cos() + obs.range * heading.cos(),
        pose.y + scanner_displacement * pose.yaw.sin() + obs.range * heading.sin(),
    )
}

/// Simulate noisy range/bearing observations of all landmarks in range.
fn simulate_observations(
    true_pose: &Pose2D,
    landmarks: &[(f64, f64)],
    config: &EkfSlamConfig,
) -> Vec<RangeBearing> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut rng = rand::thread_rng();
    let mut observations = Vec::new();
    for &(x, y) in landmarks {
        let truth = measurement::observation_model(
            true_pose,
            &Point2D::new(x, y),
            config.scanner_displacement,
        );
        if truth.range <= MAX_RANGE {
            observations.push(RangeBearing::new(
                truth.range + normal.sample(&mut rng) * config.measurement_distance_stddev,
                truth.bearing + normal.sample(&mut rng) * config.measurement_angle_stddev,
            ));
        }
    }
    observations
}

/// Match an observed world position against the filter's landmarks.
fn associate(filter: &EkfSlam, world: Point2D) -> Option<usize> {
    (0..filter.n_landmarks())
        .map(|i| (i, filter.landmark(i).unwrap().distance(&world)))
        .min_by_key(|&(_, d)| OrderedFloat(d))
        .filter(|&(_, d)| d < ASSOCIATION_GATE)
        .map(|(i, _)| i)
}

fn main() {
    println!("Landmark SLAM demo");

    let config = demo_config();

    // Cylinder landmark positions [x, y]
    let landmarks: Vec<(f64, f64)> = vec![
        (2.0, 1.0),
        (6.0, 3.0),
        (5.0, 8.0),
        (0.0, 11.0),
        (-4.0, 8.0),
        (-5.0, 3.0),
        (1.0, 5.0),
    ];

    // Constant left turn on a circle of roughly 5 m radius.
    let control = WheelControl::new(0.050, 0.055);

    let mut filter = EkfSlam::new(Pose2D::origin(), Matrix3::zeros(), config.clone());
    let mut true_pose = Pose2D::origin();
    let mut dr_pose = Pose2D::origin(); // dead reckoning

    let mut h_true: Vec<(f64, f64)> = vec![(0.0, 0.0)];
    let mut h_dr: Vec<(f64, f64)> = vec![(0.0, 0.0)];
    let mut h_est: Vec<(f64, f64)> = vec![(0.0, 0.0)];

    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut reanchor_count = 0;

    for _ in 0..N_STEPS {
        true_pose = motion::motion_model(&true_pose, &control, config.robot_width);

        // Per-wheel noise, matching the filter's control noise model.
        let turn = control.left - control.right;
        let left_stddev = ((config.control_motion_factor * control.left).powi(2)
            + (config.control_turn_factor * turn).powi(2))
        .sqrt();
        let right_stddev = ((config.control_motion_factor * control.right).powi(2)
            + (config.control_turn_factor * turn).powi(2))
        .sqrt();
        let noisy_control = WheelControl::new(
            control.left + normal.sample(&mut rand::thread_rng()) * left_stddev,
            control.right + normal.sample(&mut rand::thread_rng()) * right_stddev,
        );
        dr_pose = motion::motion_model(&dr_pose, &noisy_control, config.robot_width);

        filter.predict(&noisy_control);

        // Associate against the predicted pose.
        let observations: Vec<Observation> = simulate_observations(&true_pose, &landmarks, &config)
            .into_iter()
            .map(|m| {
                let world = observed_world_position(&filter.pose(), &m, config.scanner_displacement);
                Observation {
                    measurement: m,
                    world,
                    matched: associate(&filter, world),
                }
            })
            .collect();

        // Re-anchor the pose over well-matched pairs before fusing.
        let mut observed_positions = Vec::new();
        let mut mapped_positions = Vec::new();
        for obs in &observations {
            if let Some(index) = obs.matched {
                let mapped = filter.landmark(index).unwrap();
                if (obs.world.x - mapped.x).abs() < REANCHOR_GATE
                    && (obs.world.y - mapped.y).abs() < REANCHOR_GATE
                {
                    observed_positions.push(obs.world);
                    mapped_positions.push(mapped);
                }
            }
        }
        if let Some(transform) = estimate_transform(&observed_positions, &mapped_positions, true) {
            filter.correct_pose(&transform);
            reanchor_count += 1;
        }

        for obs in &observations {
            let index = match obs.matched {
                Some(index) => index,
                None => filter.add_landmark(obs.world),
            };
            filter
                .correct(&obs.measurement, index)
                .expect("correction failed");
        }

        h_true.push((true_pose.x, true_pose.y));
        h_dr.push((dr_pose.x, dr_pose.y));
        let pose = filter.pose();
        h_est.push((pose.x, pose.y));
    }

    let pose = filter.pose();
    let ellipse = filter.pose_error_ellipse();
    println!("Done after {} steps ({} re-anchorings).", N_STEPS, reanchor_count);
    println!(
        "Final pose: ({:.3}, {:.3}, {:.3}), true: ({:.3}, {:.3}, {:.3})",
        pose.x, pose.y, pose.yaw, true_pose.x, true_pose.y, true_pose.yaw
    );
    println!(
        "Pose uncertainty: angle {:.3}, stddevs ({:.3}, {:.3}), heading stddev {:.3}",
        ellipse.angle,
        ellipse.stddev_major,
        ellipse.stddev_minor,
        filter.heading_stddev()
    );

    println!("\nLandmark estimates ({} mapped):", filter.n_landmarks());
    let ellipses = filter.landmark_error_ellipses();
    for (i, (estimate, ellipse)) in filter.landmarks().iter().zip(ellipses.iter()).enumerate() {
        let nearest = landmarks
            .iter()
            .map(|&truth| estimate.distance(&truth.into()))
            .min_by_key(|&d| OrderedFloat(d))
            .unwrap();
        println!(
            "  LM{}: ({:.3}, {:.3}), error {:.3} m, stddevs ({:.3}, {:.3})",
            i, estimate.x, estimate.y, nearest, ellipse.stddev_major, ellipse.stddev_minor
        );
    }

    // Final plot
    std::fs::create_dir_all("img").unwrap_or_default();
    let mut fig = Figure::new();

    let true_x: Vec<f64> = h_true.iter().map(|p| p.0).collect();
    let true_y: Vec<f64> = h_true.iter().map(|p| p.1).collect();
    let dr_x: Vec<f64> = h_dr.iter().map(|p| p.0).collect();
    let dr_y: Vec<f64> = h_dr.iter().map(|p| p.1).collect();
    let est_x: Vec<f64> = h_est.iter().map(|p| p.0).collect();
    let est_y: Vec<f64> = h_est.iter().map(|p| p.1).collect();
    let lm_x: Vec<f64> = landmarks.iter().map(|p| p.0).collect();
    let lm_y: Vec<f64> = landmarks.iter().map(|p| p.1).collect();
    let est_lm_x: Vec<f64> = filter.landmarks().iter().map(|p| p.x).collect();
    let est_lm_y: Vec<f64> = filter.landmarks().iter().map(|p| p.y).collect();

    fig.axes2d()
        .set_title("Landmark SLAM", &[])
        .set_x_label("x [m]", &[])
        .set_y_label("y [m]", &[])
        .points(
            &lm_x,
            &lm_y,
            &[
                Caption("True Landmarks"),
                Color("black"),
                PointSymbol('*'),
                PointSize(2.0),
            ],
        )
        .points(
            &est_lm_x,
            &est_lm_y,
            &[
                Caption("Est. Landmarks"),
                Color("cyan"),
                PointSymbol('O'),
                PointSize(1.5),
            ],
        )
        .lines(&true_x, &true_y, &[Caption("True"), Color("blue")])
        .lines(&dr_x, &dr_y, &[Caption("Dead Reckoning"), Color("yellow")])
        .lines(&est_x, &est_y, &[Caption("Estimate"), Color("green")]);

    match fig.save_to_svg("./img/landmark_slam.svg", 640, 480) {
        Ok(_) => println!("\nPlot saved to ./img/landmark_slam.svg"),
        Err(e) => eprintln!("Failed to save SVG: {:?}", e),
    }
}
