use std::collections::VecDeque;
use std::fmt;
use std::fs;

use tracing::{debug, info, warn};

use super::config::SchedulerConfig;

/// Renderer capability reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureLevel {
    /// Baseline GL-class rendering.
    Basic,
    /// Instancing, float textures and compute-class features.
    Modern,
}

/// Hardware hints gathered once at engine construction. `None` means the hint
/// could not be detected.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceHints {
    pub logical_cores: Option<usize>,
    pub memory_gib: Option<f32>,
    pub feature_level: Option<FeatureLevel>,
}

impl DeviceHints {
    pub fn detect(feature_level: Option<FeatureLevel>) -> Self {
        let logical_cores = std::thread::available_parallelism()
            .map(|cores| cores.get())
            .map_err(|err| warn!(%err, "could not detect logical core count"))
            .ok();

        Self {
            logical_cores,
            memory_gib: detect_memory_gib(),
            feature_level,
        }
    }
}

fn detect_memory_gib() -> Option<f32> {
    let meminfo = fs::read_to_string("/proc/meminfo")
        .map_err(|err| debug!(%err, "no /proc/meminfo, memory hint unavailable"))
        .ok()?;
    parse_meminfo_gib(&meminfo)
}

fn parse_meminfo_gib(meminfo: &str) -> Option<f32> {
    let line = meminfo.lines().find(|line| line.starts_with("MemTotal:"))?;
    let kib = line
        .split_whitespace()
        .nth(1)
        .and_then(|value| value.parse::<u64>().ok())?;
    Some((kib as f64 / (1024.0 * 1024.0)) as f32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceTier {
    Low,
    Medium,
    High,
}

impl DeviceTier {
    pub fn classify(hints: DeviceHints) -> Self {
        let (Some(cores), Some(memory), Some(level)) =
            (hints.logical_cores, hints.memory_gib, hints.feature_level)
        else {
            warn!(?hints, "device capability detection incomplete, using low tier");
            return Self::Low;
        };

        if level == FeatureLevel::Modern && memory >= 4.0 && cores >= 6 {
            Self::High
        } else if memory <= 2.0 || cores <= 4 {
            Self::Low
        } else {
            Self::Medium
        }
    }

    pub fn budget(self, config: &SchedulerConfig) -> usize {
        config.tier_budgets[self as usize]
    }
}

impl fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Frame-rate statistics over the most recent `window_secs` of frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameWindow {
    /// Frames divided by the time they took.
    pub average_fps: f32,
    /// Rate implied by the longest frame in the window.
    pub slowest_fps: f32,
}

/// Sliding window over recent frame times. Reports once the window spans at
/// least `window_secs`, then on every following frame.
#[derive(Clone, Debug, Default)]
pub struct FrameRateMonitor {
    window_secs: f64,
    frame_times: VecDeque<f64>,
    elapsed_secs: f64,
    last_average: Option<f32>,
}

impl FrameRateMonitor {
    pub fn new(window_secs: f32) -> Self {
        Self {
            window_secs: f64::from(window_secs.max(0.05)),
            ..Self::default()
        }
    }

    pub fn record(&mut self, dt_secs: f32) -> Option<FrameWindow> {
        if !dt_secs.is_finite() || dt_secs <= f32::EPSILON {
            return None;
        }

        let dt = f64::from(dt_secs);
        self.frame_times.push_back(dt);
        self.elapsed_secs += dt;
        while self.frame_times.len() > 1 {
            let Some(&oldest) = self.frame_times.front() else {
                break;
            };
            if self.elapsed_secs - oldest + 1e-6 < self.window_secs {
                break;
            }
            self.frame_times.pop_front();
            self.elapsed_secs -= oldest;
        }

        if self.elapsed_secs + 1e-6 < self.window_secs {
            return None;
        }

        let average = (self.frame_times.len() as f64 / self.elapsed_secs) as f32;
        let longest = self.frame_times.iter().copied().fold(0.0_f64, f64::max);
        self.last_average = Some(average);
        Some(FrameWindow {
            average_fps: average,
            slowest_fps: (1.0 / longest) as f32,
        })
    }

    /// Drops the buffered frames so the next report covers only new ones.
    pub fn restart(&mut self) {
        self.frame_times.clear();
        self.elapsed_secs = 0.0;
    }

    pub fn last_average(&self) -> Option<f32> {
        self.last_average
    }
}

/// Decides how many connector particles are drawn and how often the layout
/// ticks, from the device tier and observed frame rate.
#[derive(Clone, Debug)]
pub struct AdaptiveScheduler {
    config: SchedulerConfig,
    tier: DeviceTier,
    budget: usize,
    global_scale: f32,
    normalization: f32,
    monitor: FrameRateMonitor,
    frame_index: u64,
}

impl AdaptiveScheduler {
    pub fn new(config: SchedulerConfig, hints: DeviceHints) -> Self {
        let tier = DeviceTier::classify(hints);
        let budget = tier.budget(&config);
        info!(%tier, budget, "render tier selected");

        Self {
            config,
            tier,
            budget,
            global_scale: config.scale_max,
            normalization: 1.0,
            monitor: FrameRateMonitor::new(config.fps_window_secs),
            frame_index: 0,
        }
    }

    pub fn tier(&self) -> DeviceTier {
        self.tier
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn global_scale(&self) -> f32 {
        self.global_scale
    }

    pub fn normalization(&self) -> f32 {
        self.normalization
    }

    pub fn smoothed_fps(&self) -> Option<f32> {
        self.monitor.last_average()
    }

    /// Pre-normalizes the per-edge base counts against the tier budget so that
    /// a global scale of 1.0 already fits.
    pub fn plan(&mut self, base_counts: &[usize]) {
        let total = base_counts.iter().sum::<usize>();
        self.normalization = if total == 0 {
            1.0
        } else {
            (self.budget as f32 / total as f32).min(1.0)
        };
        self.frame_index = 0;
        debug!(
            total,
            budget = self.budget,
            normalization = self.normalization,
            "connector budget planned"
        );
    }

    /// Feeds one frame's duration. The scale shrinks when the window's mean
    /// rate is below `fps_low` and grows when even its slowest frame beat
    /// `fps_high`. After a step the window refills before the next one.
    /// Returns the mean rate when a step was taken.
    pub fn record_frame(&mut self, dt_secs: f32) -> Option<f32> {
        let window = self.monitor.record(dt_secs)?;
        let factor = if window.average_fps < self.config.fps_low {
            self.config.scale_down_factor
        } else if window.slowest_fps > self.config.fps_high {
            self.config.scale_up_factor
        } else {
            return None;
        };

        let previous = self.global_scale;
        self.global_scale = (self.global_scale * factor)
            .clamp(self.config.scale_min, self.config.scale_max);
        self.monitor.restart();

        if (self.global_scale - previous).abs() > f32::EPSILON {
            debug!(
                fps = window.average_fps,
                scale = self.global_scale,
                "global draw scale adjusted"
            );
        }
        Some(window.average_fps)
    }

    /// Advances the frame counter and reports whether the layout should tick
    /// this frame.
    pub fn should_tick_simulation(&mut self, node_count: usize) -> bool {
        let frame = self.frame_index;
        self.frame_index += 1;

        if node_count <= self.config.throttle_node_threshold {
            return true;
        }
        frame % u64::from(self.config.throttle_interval.max(1)) == 0
    }

    pub fn cull_factor(&self, source_distance: f32, target_distance: f32) -> f32 {
        if source_distance > self.config.cull_distance
            && target_distance > self.config.cull_distance
        {
            self.config.cull_factor
        } else {
            1.0
        }
    }

    pub fn rendered_count(&self, base_count: usize, cull_factor: f32) -> usize {
        let scaled = base_count as f32 * self.normalization * self.global_scale * cull_factor;
        (scaled.max(0.0).floor() as usize).min(base_count)
    }

    pub fn position_ease(&self, dt_secs: f32) -> f32 {
        frame_ease(self.config.position_ease, dt_secs)
    }

    #[cfg(test)]
    pub(crate) fn set_global_scale(&mut self, scale: f32) {
        self.global_scale = scale;
    }
}

/// Frame-rate independent form of a per-60Hz-frame easing rate.
pub fn frame_ease(rate: f32, dt_secs: f32) -> f32 {
    let steps = (dt_secs * 60.0).clamp(0.0, 10.0);
    1.0 - (1.0 - rate.clamp(0.0, 1.0)).powf(steps)
}
