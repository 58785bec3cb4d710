use serde::{Deserialize, Serialize};

use crate::dataset::DisplayMode;
use crate::error::ConfigError;

/// Engine configuration, computed once at construction and threaded through
/// every component. All sections fall back to their defaults when omitted from
/// a config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    pub display_mode: DisplayMode,
    pub physics: PhysicsConfig,
    pub scheduler: SchedulerConfig,
    pub connectors: ConnectorConfig,
    pub highlight: HighlightConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
}

impl EngineConfig {
    /// Checks every bound the engine clamps against or divides by. Run before
    /// any component is built from the config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        self.scheduler.validate()?;
        self.connectors.validate()?;
        self.highlight.validate()?;
        self.camera.validate()?;
        non_negative("scene.galaxy_spin", self.scene.galaxy_spin)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn within(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn ordered(
    (low_field, low): (&'static str, f32),
    (high_field, high): (&'static str, f32),
) -> Result<(), ConfigError> {
    if low < high {
        Ok(())
    } else {
        Err(ConfigError::Inverted {
            low_field,
            low,
            high_field,
            high,
        })
    }
}

fn at_least_one(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimensions {
    Two,
    #[default]
    Three,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub dimensions: Dimensions,
    pub repulsion: f32,
    pub barnes_hut_theta: f32,
    pub repulsion_distance_min: f32,
    pub link_distance: f32,
    pub link_stiffness: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub collision_iterations: usize,
    pub center_strength: f32,
    pub radial_target: f32,
    pub radial_strength: f32,
    pub radial_hard_margin: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub shell_radius_min: f32,
    pub shell_radius_range: f32,
    pub warmup_ticks: usize,
    pub reheat_alpha: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::Three,
            repulsion: 120.0,
            barnes_hut_theta: 0.9,
            repulsion_distance_min: 1.0,
            link_distance: 80.0,
            link_stiffness: 0.6,
            collision_padding: 2.0,
            collision_strength: 1.0,
            collision_iterations: 3,
            center_strength: 0.08,
            radial_target: 180.0,
            radial_strength: 0.1,
            radial_hard_margin: 0.05,
            alpha_decay: 0.02,
            alpha_min: 0.001,
            velocity_decay: 0.6,
            shell_radius_min: 90.0,
            shell_radius_range: 90.0,
            warmup_ticks: 50,
            reheat_alpha: 0.3,
        }
    }
}

impl PhysicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("physics.repulsion", self.repulsion)?;
        non_negative("physics.barnes_hut_theta", self.barnes_hut_theta)?;
        positive("physics.repulsion_distance_min", self.repulsion_distance_min)?;
        positive("physics.link_distance", self.link_distance)?;
        non_negative("physics.link_stiffness", self.link_stiffness)?;
        non_negative("physics.collision_padding", self.collision_padding)?;
        within("physics.collision_strength", self.collision_strength, 0.0, 1.0)?;
        non_negative("physics.center_strength", self.center_strength)?;
        positive("physics.radial_target", self.radial_target)?;
        non_negative("physics.radial_strength", self.radial_strength)?;
        non_negative("physics.radial_hard_margin", self.radial_hard_margin)?;
        within("physics.alpha_decay", self.alpha_decay, 0.0, 1.0)?;
        within("physics.alpha_min", self.alpha_min, 0.0, 1.0)?;
        within("physics.velocity_decay", self.velocity_decay, 0.0, 1.0)?;
        non_negative("physics.shell_radius_min", self.shell_radius_min)?;
        non_negative("physics.shell_radius_range", self.shell_radius_range)?;
        within("physics.reheat_alpha", self.reheat_alpha, 0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tier_budgets: [usize; 3],
    pub fps_low: f32,
    pub fps_high: f32,
    pub fps_window_secs: f32,
    pub scale_min: f32,
    pub scale_max: f32,
    pub scale_down_factor: f32,
    pub scale_up_factor: f32,
    pub cull_distance: f32,
    pub cull_factor: f32,
    pub throttle_node_threshold: usize,
    pub throttle_interval: u32,
    pub position_ease: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tier_budgets: [1_500, 10_000, 25_000],
            fps_low: 48.0,
            fps_high: 58.0,
            fps_window_secs: 1.0,
            scale_min: 0.3,
            scale_max: 1.0,
            scale_down_factor: 0.9,
            scale_up_factor: 1.05,
            cull_distance: 750.0,
            cull_factor: 0.1,
            throttle_node_threshold: 50,
            throttle_interval: 3,
            position_ease: 0.1,
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("scheduler.fps_low", self.fps_low)?;
        ordered(
            ("scheduler.fps_low", self.fps_low),
            ("scheduler.fps_high", self.fps_high),
        )?;
        positive("scheduler.fps_window_secs", self.fps_window_secs)?;
        within("scheduler.scale_min", self.scale_min, f32::MIN_POSITIVE, 1.0)?;
        within("scheduler.scale_max", self.scale_max, f32::MIN_POSITIVE, 1.0)?;
        if self.scale_min > self.scale_max {
            return Err(ConfigError::Inverted {
                low_field: "scheduler.scale_min",
                low: self.scale_min,
                high_field: "scheduler.scale_max",
                high: self.scale_max,
            });
        }
        within("scheduler.scale_down_factor", self.scale_down_factor, f32::MIN_POSITIVE, 1.0)?;
        within("scheduler.scale_up_factor", self.scale_up_factor, 1.0, 10.0)?;
        positive("scheduler.cull_distance", self.cull_distance)?;
        within("scheduler.cull_factor", self.cull_factor, 0.0, 1.0)?;
        at_least_one("scheduler.throttle_interval", self.throttle_interval as usize)?;
        within("scheduler.position_ease", self.position_ease, 0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub density: f32,
    pub count_min: usize,
    pub count_max: usize,
    pub tube_radius: f32,
    pub speed_min: f32,
    pub speed_range: f32,
    pub scale_min: f32,
    pub scale_range: f32,
    pub particle_size: f32,
    pub hover_speed_multiplier: f32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            density: 1.2,
            count_min: 60,
            count_max: 180,
            tube_radius: 3.0,
            speed_min: 0.01,
            speed_range: 0.03,
            scale_min: 0.8,
            scale_range: 0.7,
            particle_size: 0.35,
            hover_speed_multiplier: 4.0,
        }
    }
}

impl ConnectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("connectors.density", self.density)?;
        if self.count_min > self.count_max {
            return Err(ConfigError::Inverted {
                low_field: "connectors.count_min",
                low: self.count_min as f32,
                high_field: "connectors.count_max",
                high: self.count_max as f32,
            });
        }
        non_negative("connectors.tube_radius", self.tube_radius)?;
        non_negative("connectors.speed_min", self.speed_min)?;
        non_negative("connectors.speed_range", self.speed_range)?;
        non_negative("connectors.scale_min", self.scale_min)?;
        non_negative("connectors.scale_range", self.scale_range)?;
        positive("connectors.particle_size", self.particle_size)?;
        positive("connectors.hover_speed_multiplier", self.hover_speed_multiplier)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub ease: f32,
    pub hover_scale: f32,
    pub neighbor_scale: f32,
    pub dimmed_scale: f32,
    pub selected_scale: f32,
    pub hover_emissive: f32,
    pub neighbor_emissive: f32,
    pub dimmed_emissive: f32,
    pub selected_emissive: f32,
    pub idle_emissive: f32,
    pub dimmed_opacity: f32,
    pub edge_idle_opacity: f32,
    pub edge_dimmed_opacity: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            ease: 0.1,
            hover_scale: 1.8,
            neighbor_scale: 1.3,
            dimmed_scale: 0.6,
            selected_scale: 1.5,
            hover_emissive: 1.5,
            neighbor_emissive: 0.5,
            dimmed_emissive: 0.1,
            selected_emissive: 0.8,
            idle_emissive: 0.05,
            dimmed_opacity: 0.3,
            edge_idle_opacity: 0.85,
            edge_dimmed_opacity: 0.1,
        }
    }
}

impl HighlightConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        within("highlight.ease", self.ease, 0.0, 1.0)?;
        for (field, value) in [
            ("highlight.hover_scale", self.hover_scale),
            ("highlight.neighbor_scale", self.neighbor_scale),
            ("highlight.dimmed_scale", self.dimmed_scale),
            ("highlight.selected_scale", self.selected_scale),
        ] {
            positive(field, value)?;
        }
        for (field, value) in [
            ("highlight.hover_emissive", self.hover_emissive),
            ("highlight.neighbor_emissive", self.neighbor_emissive),
            ("highlight.dimmed_emissive", self.dimmed_emissive),
            ("highlight.selected_emissive", self.selected_emissive),
            ("highlight.idle_emissive", self.idle_emissive),
        ] {
            non_negative(field, value)?;
        }
        for (field, value) in [
            ("highlight.dimmed_opacity", self.dimmed_opacity),
            ("highlight.edge_idle_opacity", self.edge_idle_opacity),
            ("highlight.edge_dimmed_opacity", self.edge_dimmed_opacity),
        ] {
            within(field, value, 0.0, 1.0)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub overview_eye: [f32; 3],
    pub overview_target: [f32; 3],
    pub standoff: f32,
    pub flight_secs: f32,
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 3_000.0,
            overview_eye: [0.0, 40.0, 380.0],
            overview_target: [0.0, 0.0, 0.0],
            standoff: 80.0,
            flight_secs: 1.5,
            damping: 0.05,
            min_distance: 20.0,
            max_distance: 1_500.0,
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        within("camera.fov_y_degrees", self.fov_y_degrees, 1.0, 179.0)?;
        positive("camera.near", self.near)?;
        positive("camera.far", self.far)?;
        ordered(("camera.near", self.near), ("camera.far", self.far))?;
        positive("camera.min_distance", self.min_distance)?;
        positive("camera.max_distance", self.max_distance)?;
        ordered(
            ("camera.min_distance", self.min_distance),
            ("camera.max_distance", self.max_distance),
        )?;
        non_negative("camera.standoff", self.standoff)?;
        positive("camera.flight_secs", self.flight_secs)?;
        within("camera.damping", self.damping, 0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Rotation of the whole node group about the vertical axis.
    pub galaxy_spin: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self { galaxy_spin: 0.025 }
    }
}
