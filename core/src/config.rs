//! Tunable parameters for the navigation engine, loadable from TOML.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`NavigationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document was not valid TOML or did not match the expected shape.
    #[error("failed to parse navigation config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A field held a value outside of its supported range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable explanation of the violated constraint.
        reason: &'static str,
    },
}

/// Complete set of tunables consumed by the grid, pathfinding and agent systems.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Grid construction parameters.
    pub grid: GridSettings,
    /// Simulation clock parameters.
    pub timing: TimingSettings,
    /// Search bounds and cost tuning.
    pub pathfinding: PathfindingSettings,
    /// Request manager throughput.
    pub requests: RequestSettings,
    /// Agent decision and movement tuning.
    pub agents: AgentTuning,
}

/// `[grid]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Edge length of the square grid in cells.
    pub size: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { size: 64 }
    }
}

/// `[timing]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Number of fixed updates simulated per second.
    pub fixed_updates_per_second: u32,
    /// Number of fixed updates between two agent decision ticks.
    pub actor_tick_rate: u32,
}

impl TimingSettings {
    /// Duration of one fixed update in seconds.
    #[must_use]
    pub fn fixed_delta_seconds(&self) -> f32 {
        1.0 / self.fixed_updates_per_second.max(1) as f32
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            fixed_updates_per_second: 60,
            actor_tick_rate: 10,
        }
    }
}

/// `[pathfinding]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingSettings {
    /// Capacity of both the open and the closed set of a single search.
    pub heap_capacity: usize,
    /// Extra cost per agent standing in a neighbour cell.
    pub congestion_penalty: u32,
}

impl Default for PathfindingSettings {
    fn default() -> Self {
        Self {
            heap_capacity: 2048,
            congestion_penalty: 8,
        }
    }
}

/// `[requests]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Capacity of the inbound request channel.
    pub queue_capacity: usize,
    /// Searches executed per fixed update in cooperative mode.
    pub requests_per_tick: usize,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            requests_per_tick: 8,
        }
    }
}

/// `[agents]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Failed steps tolerated before a forced repath.
    pub path_wait_tries: u32,
    /// Forced repaths tolerated before the agent gives up.
    pub path_repath_tries: u32,
    /// Growth of the goal search radius after each failed search.
    pub goal_search_step: u32,
    /// Maximum goal search radius.
    pub goal_search_distance: u32,
    /// Chebyshev distance at which an agent interacts with its goal.
    pub interaction_range: u32,
    /// Speed of the visual position interpolation, in cells per second factor.
    pub movement_interpolation: f32,
    /// Whether agents may step through occupied cells when the path beyond is clear.
    pub allow_pass_through: bool,
    /// Radius of the incidental goal search run after every successful step.
    pub microsearch_radius: u32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            path_wait_tries: 8,
            path_repath_tries: 2,
            goal_search_step: 5,
            goal_search_distance: 20,
            interaction_range: 1,
            movement_interpolation: 1.0,
            allow_pass_through: true,
            microsearch_radius: 2,
        }
    }
}

impl NavigationConfig {
    /// Parses a TOML document and validates the resulting configuration.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: NavigationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every cross-field and range constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.grid.size > 0, "grid.size", "must be greater than zero")?;
        ensure(
            self.timing.fixed_updates_per_second > 0,
            "timing.fixed_updates_per_second",
            "must be greater than zero",
        )?;
        ensure(
            self.timing.actor_tick_rate > 0,
            "timing.actor_tick_rate",
            "must be greater than zero",
        )?;
        ensure(
            self.pathfinding.heap_capacity > 0,
            "pathfinding.heap_capacity",
            "must be greater than zero",
        )?;
        ensure(
            self.requests.queue_capacity > 0,
            "requests.queue_capacity",
            "must be greater than zero",
        )?;
        ensure(
            self.agents.goal_search_step > 0,
            "agents.goal_search_step",
            "must be greater than zero",
        )?;
        ensure(
            self.agents.goal_search_step <= self.agents.goal_search_distance,
            "agents.goal_search_step",
            "must not exceed agents.goal_search_distance",
        )?;
        ensure(
            self.agents.movement_interpolation.is_finite()
                && self.agents.movement_interpolation >= 0.0,
            "agents.movement_interpolation",
            "must be a finite, non-negative number",
        )?;
        Ok(())
    }
}

fn ensure(condition: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason })
    }
}
