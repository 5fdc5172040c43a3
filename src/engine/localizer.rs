//! Scan-driven Monte Carlo localization engine.
//!
//! Consumes timestamped laser scans, walks the filter through its motion,
//! measurement, estimate and resampling steps, and reports a population
//! snapshot for every scan it consumes.

use thiserror::Error;

use crate::core::types::{LaserScan, MapPose, Pose2D, Timestamped};
use crate::filter::{DistanceField, FilterConfig, OdometryTracker, Particle, ParticleFilter};

use super::{PoseMatch, TransformProvider};

/// Localizer errors.
#[derive(Error, Debug)]
pub enum LocalizerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No odometry pose received yet")]
    NoOdometryReference,
}

/// Configuration for the localization engine.
#[derive(Debug, Clone)]
pub struct LocalizerConfig {
    /// Frame the particle population and pose estimate live in.
    pub map_frame: String,

    /// Frame the odometry source integrates in.
    pub odom_frame: String,

    /// Frame of the robot base; scans are expressed here before the
    /// measurement update.
    pub base_frame: String,

    /// Linear motion along either axis (meters) the robot must exceed
    /// before a scan triggers a filter update.
    /// Typical: 0.2
    pub d_thresh: f32,

    /// Angular motion (radians) the robot must exceed before a scan
    /// triggers a filter update.
    /// Typical: pi/6
    pub a_thresh: f32,

    /// Particle filter configuration.
    pub filter: FilterConfig,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            map_frame: "map".to_string(),
            odom_frame: "odom".to_string(),
            base_frame: "base_footprint".to_string(),
            d_thresh: 0.2,
            a_thresh: std::f32::consts::FRAC_PI_6,
            filter: FilterConfig::default(),
        }
    }
}

impl LocalizerConfig {
    /// Check the configuration for values the filter cannot run with.
    pub fn validate(&self) -> Result<(), LocalizerError> {
        if self.filter.num_particles == 0 {
            return Err(LocalizerError::InvalidConfig(
                "num_particles must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.filter.tail_percentile) {
            return Err(LocalizerError::InvalidConfig(
                "tail_percentile must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Startup progress of the localizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No odometry reference recorded yet.
    AwaitingOdometry,
    /// Odometry reference recorded, particle population not seeded.
    AwaitingSeed,
    /// Population seeded; scans update the filter once the robot has
    /// moved far enough.
    Tracking,
}

/// Snapshot of the localizer after consuming a scan.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Timestamp of the consumed scan, in microseconds.
    pub timestamp_us: u64,

    /// Startup progress after this scan.
    pub stage: Stage,

    /// The particle population, in the map frame.
    pub particles: Vec<Particle>,

    /// Latest pose estimate, if the population has ever been seeded.
    pub best_pose: Option<MapPose>,

    /// Whether this scan drove the full update pipeline, as opposed to
    /// only record keeping.
    pub pipeline_ran: bool,
}

/// What became of a scan handed to [`Localizer::process_scan`].
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The scan was consumed; the report describes the resulting state.
    Processed(CycleReport),
    /// No odometry pose covers the scan yet; retry the same scan later.
    Deferred,
    /// The scan can never be matched and was discarded.
    Dropped,
}

/// Monte Carlo localization engine.
///
/// Owns the particle filter, the odometry motion gate and the map distance
/// field, and delegates frame bookkeeping to a [`TransformProvider`].
pub struct Localizer<TF: TransformProvider, DF: DistanceField> {
    config: LocalizerConfig,
    filter: ParticleFilter,
    tracker: OdometryTracker,
    transforms: TF,
    map: DF,
    /// Odometry pose of the most recently consumed scan.
    last_odom_pose: Option<TF::OdomPose>,
    best_pose: Option<MapPose>,
}

impl<TF, DF> Localizer<TF, DF>
where
    TF: TransformProvider,
    DF: DistanceField,
{
    /// Create a localizer from a validated configuration.
    pub fn new(config: LocalizerConfig, transforms: TF, map: DF) -> Result<Self, LocalizerError> {
        config.validate()?;
        let filter = ParticleFilter::new(config.filter.clone());

        Ok(Self {
            config,
            filter,
            tracker: OdometryTracker::new(),
            transforms,
            map,
            last_odom_pose: None,
            best_pose: None,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Startup progress.
    pub fn stage(&self) -> Stage {
        if !self.tracker.has_reference() {
            Stage::AwaitingOdometry
        } else if !self.filter.is_seeded() {
            Stage::AwaitingSeed
        } else {
            Stage::Tracking
        }
    }

    /// Current particle population.
    pub fn particles(&self) -> &[Particle] {
        self.filter.particles()
    }

    /// Latest pose estimate, if any.
    pub fn best_pose(&self) -> Option<MapPose> {
        self.best_pose
    }

    /// The transform provider.
    pub fn transforms(&self) -> &TF {
        &self.transforms
    }

    /// Mutable access to the transform provider.
    pub fn transforms_mut(&mut self) -> &mut TF {
        &mut self.transforms
    }

    /// Consume one timestamped scan.
    ///
    /// A scan is consumed only when the transform provider can match it to
    /// an odometry pose. Consumed scans always produce a [`CycleReport`];
    /// which steps ran depends on startup progress and the motion gate.
    pub fn process_scan(&mut self, scan: &Timestamped<LaserScan>) -> ScanOutcome {
        let pose = match self.transforms.matching_pose(
            &self.config.odom_frame,
            &self.config.base_frame,
            scan.timestamp_us,
        ) {
            PoseMatch::Matched(pose) => pose,
            PoseMatch::Pending => return ScanOutcome::Deferred,
            PoseMatch::Expired => {
                log::debug!(
                    "Dropping scan at {}us: transform history no longer covers it",
                    scan.timestamp_us
                );
                return ScanOutcome::Dropped;
            }
        };

        let robot_scan = self
            .transforms
            .scan_to_robot_frame(&scan.data, &self.config.base_frame);
        let odom_xy_theta = self.transforms.pose_to_xy_theta(&pose);
        self.last_odom_pose = Some(pose);

        let mut pipeline_ran = false;
        if !self.tracker.has_reference() {
            self.tracker.advance(odom_xy_theta);
        } else if !self.filter.is_seeded() {
            self.seed_around(&odom_xy_theta);
        } else if self
            .tracker
            .moved_beyond(&odom_xy_theta, self.config.d_thresh, self.config.a_thresh)
        {
            if let Some(delta) = self.tracker.advance(odom_xy_theta) {
                self.filter.apply_motion(&delta);
            }
            match robot_scan.min_range() {
                Some(observed) => self.filter.reweight(observed, &self.map),
                None => log::debug!(
                    "Scan at {}us has no returns in the robot frame, keeping weights",
                    scan.timestamp_us
                ),
            }
            self.refresh_estimate();
            self.filter.resample();
            pipeline_ran = true;
        }

        ScanOutcome::Processed(self.report(scan.timestamp_us, pipeline_ran))
    }

    /// Re-seed the population around an explicit mean pose, or around the
    /// odometry pose of the last consumed scan when `mean` is `None`.
    pub fn set_initial_pose(&mut self, mean: Option<Pose2D>) -> Result<(), LocalizerError> {
        let mean = match mean {
            Some(mean) => mean,
            None => match &self.last_odom_pose {
                Some(odom) => self.transforms.pose_to_xy_theta(odom),
                None => return Err(LocalizerError::NoOdometryReference),
            },
        };
        self.seed_around(&mean);
        Ok(())
    }

    fn seed_around(&mut self, mean: &Pose2D) {
        self.filter.seed(mean);
        self.refresh_estimate();
    }

    /// Adopt the highest-weight particle as the pose estimate and push the
    /// matching map->odom correction into the transform provider.
    fn refresh_estimate(&mut self) {
        let Some(best) = self.filter.best_particle() else {
            return;
        };
        let pose = best.as_pose();

        match &self.last_odom_pose {
            Some(odom) => self.transforms.correct_map_to_odom(
                &self.config.map_frame,
                &self.config.odom_frame,
                &pose,
                odom,
            ),
            None => {
                log::warn!("Cannot correct map->odom transform: no odometry pose received")
            }
        }
        self.best_pose = Some(pose);
    }

    fn report(&self, timestamp_us: u64, pipeline_ran: bool) -> CycleReport {
        CycleReport {
            timestamp_us,
            stage: self.stage(),
            particles: self.filter.particles().to_vec(),
            best_pose: self.best_pose,
            pipeline_ran,
        }
    }
}
