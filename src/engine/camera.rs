use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use super::config::CameraConfig;
use super::picking::Ray;
use super::scheduler::frame_ease;

const POLAR_MARGIN: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    pub fn overview(config: &CameraConfig) -> Self {
        Self {
            eye: Vec3::from_array(config.overview_eye),
            target: Vec3::from_array(config.overview_target),
        }
    }

    /// Pose that frames `world_position` from `standoff` units further out
    /// along its direction from the origin.
    pub fn framing(world_position: Vec3, standoff: f32) -> Self {
        let direction = world_position.try_normalize().unwrap_or(Vec3::Z);
        Self {
            eye: world_position + direction * standoff,
            target: world_position,
        }
    }

    fn lerp(self, other: Self, amount: f32) -> Self {
        Self {
            eye: self.eye.lerp(other.eye, amount),
            target: self.target.lerp(other.target, amount),
        }
    }
}

pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightAnimation {
    pub from: CameraPose,
    pub to: CameraPose,
    pub elapsed_secs: f32,
    pub duration_secs: f32,
    /// Node selected when the flight lands.
    pub select_on_arrival: Option<usize>,
}

impl FlightAnimation {
    fn progress(&self) -> f32 {
        if self.duration_secs <= f32::EPSILON {
            return 1.0;
        }
        (self.elapsed_secs / self.duration_secs).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightArrival {
    pub select: Option<usize>,
}

/// One frame of orbit input. Rotation is in radians, pan in world units along
/// the camera's right/up axes, zoom in log-distance units (positive moves out).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrbitInput {
    pub rotate: Vec2,
    pub pan: Vec2,
    pub zoom: f32,
}

#[derive(Clone, Debug)]
pub struct CameraController {
    config: CameraConfig,
    pose: CameraPose,
    aspect: f32,
    pending: OrbitInput,
    flight: Option<FlightAnimation>,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            pose: CameraPose::overview(&config),
            aspect: 16.0 / 9.0,
            pending: OrbitInput::default(),
            flight: None,
        }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    pub fn flight(&self) -> Option<&FlightAnimation> {
        self.flight.as_ref()
    }

    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Queues damped orbit input. Returns `false` when a flight owns the
    /// camera and the input was dropped.
    pub fn orbit(&mut self, input: OrbitInput) -> bool {
        if self.flight.is_some() {
            return false;
        }

        self.pending.rotate += input.rotate;
        self.pending.pan += input.pan;
        self.pending.zoom += input.zoom;
        true
    }

    /// Starts a flight from the current pose. Any running flight is replaced.
    pub fn begin_flight(&mut self, to: CameraPose, select_on_arrival: Option<usize>) {
        self.pending = OrbitInput::default();
        self.flight = Some(FlightAnimation {
            from: self.pose,
            to,
            elapsed_secs: 0.0,
            duration_secs: self.config.flight_secs,
            select_on_arrival,
        });
    }

    pub fn reset(&mut self) {
        self.begin_flight(CameraPose::overview(&self.config), None);
    }

    pub fn update(&mut self, dt_secs: f32) -> Option<FlightArrival> {
        if let Some(flight) = self.flight.as_mut() {
            flight.elapsed_secs += dt_secs.max(0.0);
            let progress = flight.progress();
            self.pose = flight.from.lerp(flight.to, ease_in_out_cubic(progress));

            if progress >= 1.0 {
                let arrival = FlightArrival {
                    select: flight.select_on_arrival,
                };
                self.pose = flight.to;
                self.flight = None;
                return Some(arrival);
            }
            return None;
        }

        self.apply_damped_orbit(dt_secs);
        None
    }

    fn apply_damped_orbit(&mut self, dt_secs: f32) {
        let factor = frame_ease(self.config.damping, dt_secs);
        let idle = self.pending.rotate.length_squared() < 1e-12
            && self.pending.pan.length_squared() < 1e-12
            && self.pending.zoom.abs() < 1e-6;
        if factor <= 0.0 || idle {
            return;
        }

        let rotate = self.pending.rotate * factor;
        let pan = self.pending.pan * factor;
        let zoom = self.pending.zoom * factor;
        self.pending.rotate -= rotate;
        self.pending.pan -= pan;
        self.pending.zoom -= zoom;

        let (right, up) = self.screen_axes();
        let shift = right * pan.x + up * pan.y;
        let target = self.pose.target + shift;

        let offset = self.pose.eye - self.pose.target;
        let radius = offset.length().max(f32::EPSILON);
        let azimuth = offset.x.atan2(offset.z) + rotate.x;
        let polar = ((offset.y / radius).clamp(-1.0, 1.0).acos() + rotate.y)
            .clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
        let radius = (radius * zoom.exp()).clamp(self.config.min_distance, self.config.max_distance);

        let offset = Vec3::new(
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.cos(),
        );
        self.pose = CameraPose {
            eye: target + offset,
            target,
        };
    }

    fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.pose.target - self.pose.eye)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        (right, up)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.pose.eye, self.pose.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.config.fov_y_degrees.to_radians(),
            self.aspect,
            self.config.near,
            self.config.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray through a point given in normalized device coordinates
    /// (`-1..1`, y up).
    pub fn screen_ray(&self, ndc: Vec2) -> Option<Ray> {
        let inverse = self.view_projection().inverse();
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(self.pose.eye, far - self.pose.eye)
    }

    /// Normalized device coordinates and depth of a world point, or `None`
    /// when it is behind the camera.
    pub fn project(&self, world: Vec3) -> Option<Vec3> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= self.config.near {
            return None;
        }
        Some(clip.xyz() / clip.w)
    }

    /// Screen pixels per world unit at `world`, for a viewport of
    /// `viewport_height` pixels.
    pub fn pixels_per_unit(&self, world: Vec3, viewport_height: f32) -> f32 {
        let distance = self.pose.eye.distance(world).max(self.config.near);
        let half_fov = (self.config.fov_y_degrees.to_radians() * 0.5).tan();
        viewport_height / (2.0 * distance * half_fov)
    }

    pub fn distance_to(&self, world: Vec3) -> f32 {
        self.pose.eye.distance(world)
    }
}
