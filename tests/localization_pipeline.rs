//! Localization Pipeline Integration Tests
//!
//! Drives the scan pipeline end to end against a recorded odometry history
//! and a synthetic wall distance field:
//! - Startup sequence (odometry reference, then population seeding)
//! - Motion gate behavior below and above the thresholds
//! - Measurement reweighting against the wall and estimate selection
//! - Deferred and expired scan handling through the shared state wrapper
//!
//! Run with: `cargo test --test localization_pipeline`

use approx::assert_relative_eq;
use dhruva_mcl::{
    CycleReport, DistanceField, FilterConfig, LaserScan, Localizer, LocalizerConfig, MapPose,
    Point2D, Pose2D, PoseMatch, RobotFrameScan, ScanOutcome, SharedLocalizer, Stage, Timestamped,
    TransformProvider,
};
use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, TAU};

// ============================================================================
// Test Harness
// ============================================================================

/// Transform provider over a recorded odometry history, matching scans the
/// way a live transform stack would.
struct ReplayTransforms {
    history: VecDeque<(u64, Pose2D)>,
    corrections: Vec<MapPose>,
}

impl ReplayTransforms {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            corrections: Vec::new(),
        }
    }

    fn push_odometry(&mut self, timestamp_us: u64, pose: Pose2D) {
        self.history.push_back((timestamp_us, pose));
    }
}

impl TransformProvider for ReplayTransforms {
    type OdomPose = Pose2D;

    fn matching_pose(
        &self,
        _odom_frame: &str,
        _base_frame: &str,
        timestamp_us: u64,
    ) -> PoseMatch<Pose2D> {
        let (Some(&(oldest, _)), Some(&(newest, _))) =
            (self.history.front(), self.history.back())
        else {
            return PoseMatch::Pending;
        };
        if timestamp_us > newest {
            return PoseMatch::Pending;
        }
        if timestamp_us < oldest {
            return PoseMatch::Expired;
        }
        match self.history.iter().rev().find(|(t, _)| *t <= timestamp_us) {
            Some(&(_, pose)) => PoseMatch::Matched(pose),
            None => PoseMatch::Pending,
        }
    }

    fn scan_to_robot_frame(&self, scan: &LaserScan, _base_frame: &str) -> RobotFrameScan {
        let bearings = (0..scan.ranges.len()).map(|i| scan.angle_at(i)).collect();
        RobotFrameScan::new(scan.ranges.clone(), bearings)
    }

    fn pose_to_xy_theta(&self, pose: &Pose2D) -> Pose2D {
        *pose
    }

    fn correct_map_to_odom(
        &mut self,
        _map_frame: &str,
        _odom_frame: &str,
        best: &MapPose,
        _odom: &Pose2D,
    ) {
        self.corrections.push(*best);
    }
}

/// Distance field for a single wall plane at a fixed x.
struct WallField {
    wall_x: f32,
}

impl DistanceField for WallField {
    fn closest_obstacle_distances(&self, points: &[Point2D]) -> Vec<Option<f32>> {
        points
            .iter()
            .map(|p| Some((self.wall_x - p.x).abs()))
            .collect()
    }
}

fn test_localizer(wall_x: f32) -> Localizer<ReplayTransforms, WallField> {
    let config = LocalizerConfig {
        filter: FilterConfig {
            seed: 11,
            ..Default::default()
        },
        ..Default::default()
    };
    Localizer::new(config, ReplayTransforms::new(), WallField { wall_x })
        .expect("default config should validate")
}

fn scan_with_ranges(ranges: Vec<f32>, timestamp_us: u64) -> Timestamped<LaserScan> {
    let increment = TAU / ranges.len().max(1) as f32;
    let scan = LaserScan::new(0.0, TAU, increment, 0.15, 12.0, ranges);
    Timestamped::new(scan, timestamp_us)
}

fn consume(
    loc: &mut Localizer<ReplayTransforms, WallField>,
    scan: &Timestamped<LaserScan>,
) -> CycleReport {
    match loc.process_scan(scan) {
        ScanOutcome::Processed(report) => report,
        other => panic!("scan at {}us not consumed: {other:?}", scan.timestamp_us),
    }
}

// ============================================================================
// Test: Startup Sequence
// ============================================================================

#[test]
fn test_startup_records_odometry_then_seeds() {
    let mut loc = test_localizer(3.3);

    loc.transforms_mut()
        .push_odometry(100_000, Pose2D::new(2.0, 0.0, 0.0));
    let r1 = consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));

    assert_eq!(r1.stage, Stage::AwaitingSeed);
    assert!(!r1.pipeline_ran);
    assert!(r1.particles.is_empty());
    assert!(r1.best_pose.is_none());

    // Robot holds still; the second scan seeds around the same pose
    loc.transforms_mut()
        .push_odometry(200_000, Pose2D::new(2.0, 0.0, 0.0));
    let r2 = consume(&mut loc, &scan_with_ranges(vec![1.0], 200_000));

    assert_eq!(r2.stage, Stage::Tracking);
    assert!(!r2.pipeline_ran);
    assert_eq!(r2.particles.len(), 100);
    for p in &r2.particles {
        assert_eq!(p.x, 2.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.w, 1.0);
    }

    // Headings fan over the full circle starting at the mean heading
    assert_eq!(r2.particles[0].theta, 0.0);
    assert_relative_eq!(r2.particles[99].theta, 99.0 * (TAU / 100.0), epsilon = 1e-4);

    // Seeding produces the first estimate and pushes a correction
    let best = r2.best_pose.expect("seeding should produce an estimate");
    assert_relative_eq!(best.position.x, 2.0);
    assert_eq!(loc.transforms().corrections.len(), 1);
}

#[test]
fn test_every_consumed_scan_reports() {
    let mut loc = test_localizer(3.3);
    let start = Pose2D::new(2.0, 0.0, 0.0);
    let poses = [
        start,                              // records the reference
        start,                              // seeds
        Pose2D::new(2.1, 0.05, 0.1),        // below every gate threshold
        Pose2D::new(2.35, 0.05, 0.1),       // 0.25m past the reference
        Pose2D::new(2.40, 0.05, 0.1),       // below the advanced reference
    ];

    let mut pipeline_runs = Vec::new();
    for (i, pose) in poses.iter().enumerate() {
        let timestamp_us = (i as u64 + 1) * 100_000;
        loc.transforms_mut().push_odometry(timestamp_us, *pose);
        let report = consume(&mut loc, &scan_with_ranges(vec![1.0], timestamp_us));
        assert_eq!(report.timestamp_us, timestamp_us);
        pipeline_runs.push(report.pipeline_ran);

        // Once seeded, every report carries an estimate
        if i >= 1 {
            assert!(report.best_pose.is_some(), "no estimate after scan {i}");
        }
    }

    assert_eq!(pipeline_runs, vec![false, false, false, true, false]);
}

// ============================================================================
// Test: Motion Gate
// ============================================================================

#[test]
fn test_gate_blocks_small_motion() {
    let mut loc = test_localizer(3.3);
    let start = Pose2D::new(2.0, 0.0, 0.0);

    loc.transforms_mut().push_odometry(100_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));
    loc.transforms_mut().push_odometry(200_000, start);
    let seeded = consume(&mut loc, &scan_with_ranges(vec![1.0], 200_000));

    // 0.15m / 0.1rad is inside the 0.2m / pi/6 gate
    loc.transforms_mut()
        .push_odometry(300_000, Pose2D::new(2.15, 0.1, 0.1));
    let held = consume(&mut loc, &scan_with_ranges(vec![1.0], 300_000));

    assert!(!held.pipeline_ran);
    assert_eq!(held.particles, seeded.particles);
}

#[test]
fn test_gate_reference_stays_at_first_pose_through_seeding() {
    let mut loc = test_localizer(3.3);

    // Reference recorded at x=2.0, seeding happens at x=2.15 without
    // advancing the reference
    loc.transforms_mut()
        .push_odometry(100_000, Pose2D::new(2.0, 0.0, 0.0));
    consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));
    loc.transforms_mut()
        .push_odometry(200_000, Pose2D::new(2.15, 0.0, 0.0));
    consume(&mut loc, &scan_with_ranges(vec![1.0], 200_000));

    // x=2.25 is 0.1m past the seed pose but 0.25m past the reference
    loc.transforms_mut()
        .push_odometry(300_000, Pose2D::new(2.25, 0.0, 0.0));
    let report = consume(&mut loc, &scan_with_ranges(vec![1.0], 300_000));
    assert!(report.pipeline_ran, "gate should compare against the first recorded pose");
}

// ============================================================================
// Test: Measurement Update
// ============================================================================

#[test]
fn test_pipeline_weighs_particles_against_the_wall() {
    let mut loc = test_localizer(3.3);
    let start = Pose2D::new(2.0, 0.0, 0.0);

    loc.transforms_mut().push_odometry(100_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));
    loc.transforms_mut().push_odometry(200_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 200_000));

    // 0.25m forward exceeds the gate; each particle advances 0.25m along
    // its own heading, spreading the population over a circle
    loc.transforms_mut()
        .push_odometry(300_000, Pose2D::new(2.25, 0.0, 0.0));
    let report = consume(&mut loc, &scan_with_ranges(vec![1.0], 300_000));
    assert!(report.pipeline_ran);

    // The particle that drove straight at the wall sits 1.05m from it,
    // closest to the observed 1.0m range, so it becomes the estimate
    let best = report.best_pose.expect("pipeline should refresh the estimate");
    assert_relative_eq!(best.position.x, 2.25, epsilon = 1e-3);
    assert_relative_eq!(best.position.y, 0.0, epsilon = 1e-3);

    // Weights are normalized and concentrated, not uniform
    let total: f64 = report.particles.iter().map(|p| p.w).sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    let max_w = report.particles.iter().map(|p| p.w).fold(0.0_f64, f64::max);
    assert!(
        max_w > 1.0 / 100.0,
        "measurement update left weights uniform: max {max_w}"
    );

    // One correction from seeding, one from this update
    assert_eq!(loc.transforms().corrections.len(), 2);
    assert_relative_eq!(loc.transforms().corrections[1].position.x, 2.25, epsilon = 1e-3);
}

#[test]
fn test_observed_range_is_scan_minimum() {
    let mut loc = test_localizer(3.0);
    let start = Pose2D::new(2.0, 0.0, 0.0);

    loc.transforms_mut().push_odometry(100_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));
    loc.transforms_mut().push_odometry(200_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 200_000));

    loc.transforms_mut()
        .push_odometry(300_000, Pose2D::new(2.25, 0.0, 0.0));
    let report = consume(
        &mut loc,
        &scan_with_ranges(vec![1.4, 0.9, 2.0], 300_000),
    );
    assert!(report.pipeline_ran);

    // The shortest return is 0.9m, putting the best-matching particle
    // 2.1m from the origin rather than at the ring's leading edge
    let best = report.best_pose.expect("pipeline should refresh the estimate");
    assert_relative_eq!(best.position.x, 2.1064, epsilon = 1e-3);
}

#[test]
fn test_filter_tracks_motion_toward_the_wall() {
    let mut loc = test_localizer(3.3);
    let mut truth_x = 2.0_f32;

    loc.transforms_mut()
        .push_odometry(100_000, Pose2D::new(truth_x, 0.0, 0.0));
    consume(&mut loc, &scan_with_ranges(vec![1.3], 100_000));
    loc.transforms_mut()
        .push_odometry(200_000, Pose2D::new(truth_x, 0.0, 0.0));
    consume(&mut loc, &scan_with_ranges(vec![1.3], 200_000));

    // Drive at the wall in 0.25m gate-firing hops. The simulated sensor
    // carries a 1cm bias so no particle ever matches exactly
    for hop in 1..=3u64 {
        truth_x += 0.25;
        let timestamp_us = (hop + 2) * 100_000;
        let observed = 3.3 - truth_x + 0.01;

        loc.transforms_mut()
            .push_odometry(timestamp_us, Pose2D::new(truth_x, 0.0, 0.0));
        let report = consume(&mut loc, &scan_with_ranges(vec![observed], timestamp_us));
        assert!(report.pipeline_ran, "hop {hop} did not fire the gate");

        let best = report.best_pose.expect("pipeline should refresh the estimate");
        let error = (best.position.x - truth_x).abs();
        assert!(
            error < 0.05,
            "hop {hop}: estimate x={:.3} drifted {error:.3}m from truth x={truth_x:.3}",
            best.position.x
        );
    }

    // Seed correction plus one per hop
    assert_eq!(loc.transforms().corrections.len(), 4);
}

// ============================================================================
// Test: Scan Matching Through Shared State
// ============================================================================

#[test]
fn test_deferred_scan_consumed_after_odometry_catches_up() {
    let localizer = test_localizer(3.3);
    let mut shared = SharedLocalizer::new(localizer);

    shared
        .localizer_mut()
        .transforms_mut()
        .push_odometry(100_000, Pose2D::identity());

    // Scan stamped ahead of the newest odometry sample waits in the slot
    shared.scan_received(scan_with_ranges(vec![1.0], 150_000));
    assert!(shared.poll().is_none());
    assert!(shared.has_pending_scan());

    // Odometry catches up; the same scan is consumed on the next poll
    shared
        .localizer_mut()
        .transforms_mut()
        .push_odometry(200_000, Pose2D::identity());
    let report = shared.poll().expect("deferred scan should be consumed");
    assert_eq!(report.timestamp_us, 150_000);
    assert_eq!(report.stage, Stage::AwaitingSeed);
    assert!(!shared.has_pending_scan());
}

#[test]
fn test_expired_scan_dropped_for_good() {
    let localizer = test_localizer(3.3);
    let mut shared = SharedLocalizer::new(localizer);

    shared
        .localizer_mut()
        .transforms_mut()
        .push_odometry(100_000, Pose2D::identity());
    shared
        .localizer_mut()
        .transforms_mut()
        .push_odometry(200_000, Pose2D::identity());

    // Older than anything in the history: discarded, not retried
    shared.scan_received(scan_with_ranges(vec![1.0], 50_000));
    assert!(shared.poll().is_none());
    assert!(!shared.has_pending_scan());
    assert_eq!(shared.localizer().stage(), Stage::AwaitingOdometry);
}

// ============================================================================
// Test: Initial Pose Requests
// ============================================================================

#[test]
fn test_initial_pose_relocates_population() {
    let mut loc = test_localizer(3.3);
    let start = Pose2D::new(2.0, 0.0, 0.0);

    loc.transforms_mut().push_odometry(100_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));
    loc.transforms_mut().push_odometry(200_000, start);
    consume(&mut loc, &scan_with_ranges(vec![1.0], 200_000));

    loc.set_initial_pose(Some(Pose2D::new(4.0, 1.0, FRAC_PI_2)))
        .expect("explicit mean never needs odometry");

    assert_eq!(loc.particles().len(), 100);
    for p in loc.particles() {
        assert_eq!(p.x, 4.0);
        assert_eq!(p.y, 1.0);
    }
    let best = loc.best_pose().expect("re-seeding should refresh the estimate");
    assert_relative_eq!(best.position.x, 4.0);
    assert_relative_eq!(best.yaw(), FRAC_PI_2, epsilon = 1e-5);
}

#[test]
fn test_initial_pose_defaults_to_last_matched_odometry() {
    let mut loc = test_localizer(3.3);

    loc.transforms_mut()
        .push_odometry(100_000, Pose2D::new(1.5, -0.5, 0.2));
    consume(&mut loc, &scan_with_ranges(vec![1.0], 100_000));

    loc.set_initial_pose(None)
        .expect("a consumed scan should have recorded an odometry pose");
    assert_eq!(loc.particles().len(), 100);
    for p in loc.particles() {
        assert_eq!(p.x, 1.5);
        assert_eq!(p.y, -0.5);
    }
}
