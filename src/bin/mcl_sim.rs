//! mcl-sim localization demo
//!
//! Drives a simulated robot around a rectangular room, feeds its drifting
//! odometry and ray-cast wall scans to the Monte Carlo localizer, and logs
//! how well the filter tracks the ground-truth pose.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --bin mcl-sim
//!
//! # With custom config file
//! cargo run --bin mcl-sim -- --config mcl-sim.toml
//!
//! # With command line overrides
//! cargo run --bin mcl-sim -- --steps 1000 --seed 42
//! ```

use dhruva_mcl::{
    CycleReport, DistanceField, FilterConfig, LaserScan, Localizer, LocalizerConfig,
    LocalizerThread, LocalizerThreadConfig, MapPose, Point2D, Pose2D, PoseMatch, RobotFrameScan,
    Timestamped, TransformProvider, create_shared_localizer, create_snapshot_channel, math,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Simulated time per drive-loop step, in microseconds.
const STEP_US: u64 = 100_000;

/// Simulated time per drive-loop step, in seconds.
const STEP_DT: f32 = 0.1;

/// Number of odometry samples kept for scan matching.
const ODOM_HISTORY_LEN: usize = 64;

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    room: RoomConfig,
    #[serde(default)]
    robot: RobotConfig,
    #[serde(default)]
    sim: SimConfig,
    #[serde(default)]
    filter: FilterSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RoomConfig {
    width: f32,
    height: f32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            width: 6.0,
            height: 4.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RobotConfig {
    speed_mps: f32,
    turn_rate_radps: f32,
    odom_slip: f32,
    gyro_bias_radps: f32,
    range_noise_m: f32,
    beam_count: usize,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            speed_mps: 0.3,
            turn_rate_radps: 0.25,
            odom_slip: 0.05,
            gyro_bias_radps: 0.01,
            range_noise_m: 0.02,
            beam_count: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SimConfig {
    steps: u32,
    scan_period_steps: u32,
    seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: 400,
            scan_period_steps: 2,
            seed: 7,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterSection {
    num_particles: usize,
    d_thresh: f32,
    a_thresh: f32,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            num_particles: 100,
            d_thresh: 0.2,
            a_thresh: std::f32::consts::FRAC_PI_6,
        }
    }
}

/// Command line arguments
struct Args {
    config_path: Option<String>,
    steps: Option<u32>,
    seed: Option<u64>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args {
        config_path: None,
        steps: None,
        seed: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--steps" | "-n" => {
                if i + 1 < args.len() {
                    result.steps = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if i + 1 < args.len() {
                    result.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("mcl-sim - Monte Carlo localization demo in a rectangular room");
    println!();
    println!("USAGE:");
    println!("    mcl-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (mcl-sim.toml)");
    println!("    -n, --steps <COUNT>     Simulation steps to run (400)");
    println!("    -s, --seed <SEED>       Random seed, 0 for OS entropy (7)");
    println!("    -h, --help              Print help information");
}

fn load_config(args: &Args) -> Config {
    let config = match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => {
                    eprintln!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    eprintln!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                eprintln!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            // Try default paths
            for path in &["mcl-sim.toml", "/etc/mcl-sim.toml"] {
                if let Ok(contents) = fs::read_to_string(path)
                    && let Ok(cfg) = toml::from_str(&contents)
                {
                    eprintln!("Loaded config from {}", path);
                    return apply_overrides(cfg, args);
                }
            }
            Config::default()
        }
    };

    apply_overrides(config, args)
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(steps) = args.steps {
        config.sim.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.sim.seed = seed;
    }
    config
}

/// Axis-aligned rectangular room.
///
/// Inside the room the distance field reports the range to the nearest
/// wall; outside it reports the distance back to the room boundary.
#[derive(Debug, Clone, Copy)]
struct RoomField {
    width: f32,
    height: f32,
}

impl RoomField {
    fn wall_distance(&self, p: &Point2D) -> f32 {
        let outside_x = (-p.x).max(p.x - self.width).max(0.0);
        let outside_y = (-p.y).max(p.y - self.height).max(0.0);
        if outside_x > 0.0 || outside_y > 0.0 {
            (outside_x * outside_x + outside_y * outside_y).sqrt()
        } else {
            p.x.min(self.width - p.x).min(p.y).min(self.height - p.y)
        }
    }

    /// Range from (x, y) along `heading` to the first wall hit.
    fn ray_to_wall(&self, x: f32, y: f32, heading: f32) -> f32 {
        let (dy, dx) = heading.sin_cos();
        let tx = if dx > 0.0 {
            (self.width - x) / dx
        } else if dx < 0.0 {
            -x / dx
        } else {
            f32::INFINITY
        };
        let ty = if dy > 0.0 {
            (self.height - y) / dy
        } else if dy < 0.0 {
            -y / dy
        } else {
            f32::INFINITY
        };
        tx.min(ty)
    }
}

impl DistanceField for RoomField {
    fn closest_obstacle_distances(&self, points: &[Point2D]) -> Vec<Option<f32>> {
        points.iter().map(|p| Some(self.wall_distance(p))).collect()
    }
}

/// Transform provider backed by the simulator's odometry stream.
struct SimTransforms {
    history: VecDeque<(u64, Pose2D)>,
    map_to_odom: Pose2D,
}

impl SimTransforms {
    fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(ODOM_HISTORY_LEN),
            map_to_odom: Pose2D::identity(),
        }
    }

    fn push_odometry(&mut self, timestamp_us: u64, pose: Pose2D) {
        self.history.push_back((timestamp_us, pose));
        while self.history.len() > ODOM_HISTORY_LEN {
            self.history.pop_front();
        }
    }

    /// Odometry pose lifted into the map frame through the correction.
    fn robot_in_map(&self, odom: &Pose2D) -> Pose2D {
        self.map_to_odom.compose(odom)
    }
}

impl TransformProvider for SimTransforms {
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
        odom: &Pose2D,
    ) {
        let best_xy = Pose2D::new(best.position.x, best.position.y, best.yaw());
        self.map_to_odom = best_xy.compose(&odom.inverse());
    }
}

/// Ground-truth robot plus its drifting odometry estimate.
struct Simulator {
    true_pose: Pose2D,
    odom_pose: Pose2D,
    speed_mps: f32,
    turn_rate_radps: f32,
    odom_slip: f32,
    gyro_bias_radps: f32,
    range_noise_m: f32,
    beam_count: usize,
    rng: StdRng,
}

impl Simulator {
    fn new(config: &Config) -> Self {
        let start = Pose2D::new(config.room.width / 2.0, config.room.height / 2.0, 0.0);
        let rng = if config.sim.seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(config.sim.seed)
        };

        Self {
            true_pose: start,
            odom_pose: start,
            speed_mps: config.robot.speed_mps,
            turn_rate_radps: config.robot.turn_rate_radps,
            odom_slip: config.robot.odom_slip,
            gyro_bias_radps: config.robot.gyro_bias_radps,
            range_noise_m: config.robot.range_noise_m,
            beam_count: config.robot.beam_count,
            rng,
        }
    }

    /// Advance ground truth and odometry by `dt` seconds.
    fn step(&mut self, dt: f32) {
        let advance = Pose2D::new(self.speed_mps * dt, 0.0, self.turn_rate_radps * dt);
        self.true_pose = self.true_pose.compose(&advance);

        // Odometry sees the same motion through wheel slip and gyro bias
        let slip = 1.0 + self.odom_slip * (self.rng.random::<f32>() - 0.5);
        let drifted = Pose2D::new(
            self.speed_mps * dt * slip,
            0.0,
            (self.turn_rate_radps + self.gyro_bias_radps) * dt,
        );
        self.odom_pose = self.odom_pose.compose(&drifted);
    }

    /// Ray-cast a full-circle scan from the true pose.
    fn simulate_scan(&mut self, field: &RoomField, timestamp_us: u64) -> Timestamped<LaserScan> {
        let increment = std::f32::consts::TAU / self.beam_count as f32;
        let mut ranges = Vec::with_capacity(self.beam_count);
        for i in 0..self.beam_count {
            let heading = self.true_pose.theta + i as f32 * increment;
            let hit = field.ray_to_wall(self.true_pose.x, self.true_pose.y, heading);
            let noise = self.range_noise_m * (self.rng.random::<f32>() - 0.5);
            ranges.push(hit + noise);
        }

        let scan = LaserScan::new(0.0, std::f32::consts::TAU, increment, 0.15, 12.0, ranges);
        // The lidar stamps mid-spin, half a step after the odometry sample
        Timestamped::new(scan, timestamp_us + STEP_US / 2)
    }
}

/// Position and absolute heading error between two poses.
fn pose_error(a: &Pose2D, b: &Pose2D) -> (f32, f32) {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (
        (dx * dx + dy * dy).sqrt(),
        math::angle_diff(a.theta, b.theta).abs(),
    )
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    // Parse arguments and load config
    let args = parse_args();
    let config = load_config(&args);

    log::info!("mcl-sim starting...");
    log::info!("  Room: {}x{} m", config.room.width, config.room.height);
    log::info!("  Particles: {}", config.filter.num_particles);
    log::info!(
        "  Steps: {} ({:.0}s sim time)",
        config.sim.steps,
        config.sim.steps as f32 * STEP_DT
    );
    log::info!("  Seed: {}", config.sim.seed);

    let field = RoomField {
        width: config.room.width,
        height: config.room.height,
    };

    let localizer_config = LocalizerConfig {
        d_thresh: config.filter.d_thresh,
        a_thresh: config.filter.a_thresh,
        filter: FilterConfig {
            num_particles: config.filter.num_particles,
            seed: config.sim.seed,
            ..Default::default()
        },
        ..Default::default()
    };

    let localizer = match Localizer::new(localizer_config, SimTransforms::new(), field) {
        Ok(localizer) => localizer,
        Err(e) => {
            log::error!("Failed to build localizer: {}", e);
            std::process::exit(1);
        }
    };

    let shared = create_shared_localizer(localizer);
    let (snapshot_tx, snapshot_rx) = create_snapshot_channel();
    let running = Arc::new(AtomicBool::new(true));

    let localizer_thread = LocalizerThread::spawn(
        LocalizerThreadConfig {
            poll_interval: Duration::from_millis(1),
        },
        shared.clone(),
        snapshot_tx,
        running.clone(),
    );

    let mut sim = Simulator::new(&config);
    let mut consumed = 0u64;
    let mut updates = 0u64;
    let mut last_report: Option<CycleReport> = None;

    for step in 0..config.sim.steps {
        let timestamp_us = (step as u64 + 1) * STEP_US;
        sim.step(STEP_DT);

        {
            let mut guard = shared.lock().unwrap();
            guard
                .localizer_mut()
                .transforms_mut()
                .push_odometry(timestamp_us, sim.odom_pose);
            if step % config.sim.scan_period_steps == 0 {
                guard.scan_received(sim.simulate_scan(&field, timestamp_us));
            }
        }

        while let Ok(report) = snapshot_rx.try_recv() {
            consumed += 1;
            if report.pipeline_ran {
                updates += 1;
            }
            log::debug!(
                "Cycle at {}us: stage={:?} pipeline_ran={} particles={}",
                report.timestamp_us,
                report.stage,
                report.pipeline_ran,
                report.particles.len()
            );
            last_report = Some(report);
        }

        if (step + 1) % 100 == 0 {
            let estimate = match last_report.as_ref().and_then(|r| r.best_pose) {
                Some(best) => {
                    let est = Pose2D::new(best.position.x, best.position.y, best.yaw());
                    let (pos_err, yaw_err) = pose_error(&est, &sim.true_pose);
                    format!("estimate err {:.3}m {:.1}°", pos_err, yaw_err.to_degrees())
                }
                None => "no estimate yet".to_string(),
            };
            log::info!(
                "Step {}: true x={:.3}m y={:.3}m θ={:.1}° | {} | {} scans {} updates",
                step + 1,
                sim.true_pose.x,
                sim.true_pose.y,
                sim.true_pose.theta.to_degrees(),
                estimate,
                consumed,
                updates
            );
        }

        std::thread::sleep(Duration::from_millis(3));
    }

    // Let the localizer drain the final scan before stopping
    std::thread::sleep(Duration::from_millis(20));
    running.store(false, Ordering::Relaxed);
    if localizer_thread.join().is_err() {
        log::error!("Localizer thread panicked");
    }

    while let Ok(report) = snapshot_rx.try_recv() {
        consumed += 1;
        if report.pipeline_ran {
            updates += 1;
        }
        last_report = Some(report);
    }

    log::info!(
        "Simulation finished: {} scans consumed, {} filter updates",
        consumed,
        updates
    );

    let guard = shared.lock().unwrap();
    match guard.localizer().best_pose() {
        Some(best) => {
            let est = Pose2D::new(best.position.x, best.position.y, best.yaw());
            let (pos_err, yaw_err) = pose_error(&est, &sim.true_pose);
            log::info!(
                "  Best particle: x={:.3}m y={:.3}m θ={:.1}° (err {:.3}m, {:.1}°)",
                est.x,
                est.y,
                est.theta.to_degrees(),
                pos_err,
                yaw_err.to_degrees()
            );

            let corrected = guard.localizer().transforms().robot_in_map(&sim.odom_pose);
            let (pos_err, yaw_err) = pose_error(&corrected, &sim.true_pose);
            log::info!(
                "  Corrected odometry: x={:.3}m y={:.3}m (err {:.3}m, {:.1}°)",
                corrected.x,
                corrected.y,
                pos_err,
                yaw_err.to_degrees()
            );

            let (pos_err, yaw_err) = pose_error(&sim.odom_pose, &sim.true_pose);
            log::info!(
                "  Raw odometry error: {:.3}m, {:.1}°",
                pos_err,
                yaw_err.to_degrees()
            );
        }
        None => log::info!("  No pose estimate produced"),
    }

    log::info!("mcl-sim shutdown complete");
}
