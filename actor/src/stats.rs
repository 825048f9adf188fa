//! Actor statistics tracking and persistence.
//!
//! This module provides statistics tracking for the actor, including:
//! - Episode counts and outcomes from the planning seat's point of view
//! - Search effort (number of planning calls, time spent, simulator steps)
//! - Episode timing information
//!
//! Stats are written to a JSON file at the end of a run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Aggregated actor statistics, designed for lock-free updates.
#[derive(Debug)]
pub struct ActorStats {
    /// Number of episodes completed
    episodes_completed: AtomicU32,
    /// Total real steps across all episodes
    total_steps: AtomicU64,
    /// Episodes the planning seat finished with a positive reward
    wins: AtomicU32,
    /// Episodes the planning seat finished with a negative reward
    losses: AtomicU32,
    /// Episodes the planning seat finished with zero reward
    draws: AtomicU32,
    /// Sum of final rewards (f64 bits)
    total_reward: AtomicU64,
    /// Wall-clock time spent inside episodes (microseconds)
    episode_time_us: AtomicU64,
    /// Start time for rate calculations
    start_time: Instant,
    /// Path to write stats file
    stats_path: String,
    /// Environment ID
    env_id: String,
    /// Selection algorithm name
    algorithm: String,
    /// Planning calls performed
    searches: AtomicU64,
    /// Total time spent planning (microseconds)
    search_time_us: AtomicU64,
    /// Simulator steps taken inside searches
    search_env_steps: AtomicU64,
}

/// Serializable stats for JSON output.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActorStatsSnapshot {
    pub env_id: String,
    pub algorithm: String,
    pub episodes_completed: u32,
    pub total_steps: u64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub avg_reward: f64,
    pub avg_episode_length: f64,
    pub avg_step_ms: f64,
    pub searches: u64,
    pub avg_search_us: f64,
    pub avg_search_env_steps: f64,
    pub episodes_per_second: f64,
    pub runtime_seconds: f64,
    pub timestamp: u64,
}

fn add_f64(cell: &AtomicU64, value: f64) {
    // The closure never returns None, so the update always succeeds
    let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        Some((f64::from_bits(bits) + value).to_bits())
    });
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl ActorStats {
    /// Create new stats tracker.
    pub fn new(data_dir: &str, env_id: &str, algorithm: &str) -> Self {
        let stats_path = format!("{}/actor_stats.json", data_dir);

        // Ensure data directory exists
        if let Err(e) = fs::create_dir_all(data_dir) {
            warn!("Failed to create data directory: {}", e);
        }

        Self {
            episodes_completed: AtomicU32::new(0),
            total_steps: AtomicU64::new(0),
            wins: AtomicU32::new(0),
            losses: AtomicU32::new(0),
            draws: AtomicU32::new(0),
            total_reward: AtomicU64::new(0f64.to_bits()),
            episode_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
            stats_path,
            env_id: env_id.to_string(),
            algorithm: algorithm.to_string(),
            searches: AtomicU64::new(0),
            search_time_us: AtomicU64::new(0),
            search_env_steps: AtomicU64::new(0),
        }
    }

    /// Record a completed episode.
    pub fn record_episode(&self, steps: u32, final_reward: f32, elapsed: Duration) {
        self.episodes_completed.fetch_add(1, Ordering::Relaxed);
        self.total_steps.fetch_add(steps as u64, Ordering::Relaxed);
        self.episode_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        add_f64(&self.total_reward, final_reward as f64);

        if final_reward > 0.0 {
            self.wins.fetch_add(1, Ordering::Relaxed);
        } else if final_reward < 0.0 {
            self.losses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.draws.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record search effort for an episode.
    pub fn record_search_stats(&self, searches: u32, search_time_us: u64, env_steps: u64) {
        self.searches.fetch_add(searches as u64, Ordering::Relaxed);
        self.search_time_us
            .fetch_add(search_time_us, Ordering::Relaxed);
        self.search_env_steps
            .fetch_add(env_steps, Ordering::Relaxed);
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> ActorStatsSnapshot {
        let episodes = self.episodes_completed.load(Ordering::Relaxed);
        let total_steps = self.total_steps.load(Ordering::Relaxed);
        let runtime = self.start_time.elapsed().as_secs_f64();
        let searches = self.searches.load(Ordering::Relaxed);
        let total_reward = f64::from_bits(self.total_reward.load(Ordering::Relaxed));
        let episode_ms = self.episode_time_us.load(Ordering::Relaxed) as f64 / 1000.0;

        ActorStatsSnapshot {
            env_id: self.env_id.clone(),
            algorithm: self.algorithm.clone(),
            episodes_completed: episodes,
            total_steps,
            wins: self.wins.load(Ordering::Relaxed),
            losses: self.losses.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            avg_reward: ratio(total_reward, episodes as f64),
            avg_episode_length: ratio(total_steps as f64, episodes as f64),
            avg_step_ms: ratio(episode_ms, total_steps as f64),
            searches,
            avg_search_us: ratio(
                self.search_time_us.load(Ordering::Relaxed) as f64,
                searches as f64,
            ),
            avg_search_env_steps: ratio(
                self.search_env_steps.load(Ordering::Relaxed) as f64,
                searches as f64,
            ),
            episodes_per_second: ratio(episodes as f64, runtime),
            runtime_seconds: runtime,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Write stats to JSON file (atomic write-then-rename).
    pub fn write_stats(&self) {
        let snapshot = self.snapshot();

        // Serialize to JSON
        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize actor stats: {}", e);
                return;
            }
        };

        // Write to temp file then rename (atomic on most filesystems)
        let temp_path = format!("{}.tmp", self.stats_path);
        match fs::File::create(&temp_path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(json.as_bytes()) {
                    warn!("Failed to write actor stats: {}", e);
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to create temp stats file: {}", e);
                return;
            }
        }

        if let Err(e) = fs::rename(&temp_path, &self.stats_path) {
            warn!("Failed to rename stats file: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        debug!("Wrote actor stats to {}", self.stats_path);
    }

    pub fn stats_path(&self) -> &str {
        &self.stats_path
    }
}
