//! Configuration for the `wsi-tilecache` diagnostic tool.
//!
//! Options come from command-line arguments via clap, with environment
//! variable fallbacks using the `WSI_` prefix and sensible defaults for
//! everything.
//!
//! # Environment Variables
//!
//! - `WSI_CACHE_CAPACITY` - Shared cache capacity (default: 32MB)
//! - `WSI_SWAP_CAPACITY` - Capacity of every other replacement cache (default: 8MB)
//! - `WSI_STRESS_SLIDES` - Number of simulated slide handles (default: 4)
//! - `WSI_STRESS_READERS` - Number of reader workers (default: 8)
//! - `WSI_STRESS_READS` - Tile reads per reader (default: 5000)
//! - `WSI_SWAP_INTERVAL_MS` - Delay between cache swaps (default: 2)
//!
//! Sizes accept a plain byte count or a unit suffix: `B`, `KB`/`KiB`,
//! `MB`/`MiB`, `GB`/`GiB` (all powers of 1024).

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::SizeParseError;

// =============================================================================
// Default Values
// =============================================================================

/// Default capacity of the alternate cache swapped in during stress runs.
pub const DEFAULT_SWAP_CAPACITY: usize = 8 * 1024 * 1024;

/// Default number of simulated slide handles.
pub const DEFAULT_SLIDES: usize = 4;

/// Default number of pyramid levels per simulated slide.
pub const DEFAULT_LEVELS: usize = 3;

/// Default number of reader workers.
pub const DEFAULT_READERS: usize = 8;

/// Default number of tile reads per reader.
pub const DEFAULT_READS_PER_READER: usize = 5000;

/// Default number of tiles per side of each simulated level.
pub const DEFAULT_GRID: u32 = 16;

/// Largest accepted grid side; keeps per-level tile counts addressable.
pub const MAX_GRID: u32 = 1 << 16;

/// Default tile edge in pixels (tiles are RGBA).
pub const DEFAULT_TILE_EDGE: u32 = 256;

/// Default delay between cache swaps in milliseconds.
pub const DEFAULT_SWAP_INTERVAL_MS: u64 = 2;

// =============================================================================
// Size Parsing
// =============================================================================

/// Parse a human-readable byte size such as `"32MB"`, `"512KiB"` or `"4096"`.
pub fn parse_size(input: &str) -> Result<usize, SizeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: usize = number
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber(number.to_string()))?;

    let multiplier: usize = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(SizeParseError::UnknownUnit(other.to_string())),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| SizeParseError::Overflow(trimmed.to_string()))
}

/// Format a byte count for display.
pub fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    const GIB: usize = 1024 * MIB;

    if bytes >= GIB && bytes % GIB == 0 {
        format!("{}GB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{}B", bytes)
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Tile Cache - diagnostics for the shared decoded-tile cache.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-tilecache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Hammer a shared cache from many readers while swapping it out.
    Stress(StressConfig),

    /// Replay sequential inserts and show which tiles stay resident.
    Simulate(SimulateConfig),
}

/// Output format for reports.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Options for the `stress` command.
#[derive(Args, Debug, Clone)]
pub struct StressConfig {
    /// Capacity of the shared cache every slide starts on.
    #[arg(long, default_value = "32MB", value_parser = parse_size, env = "WSI_CACHE_CAPACITY")]
    pub capacity: usize,

    /// Capacity of every other replacement cache swapped in.
    #[arg(long, default_value = "8MB", value_parser = parse_size, env = "WSI_SWAP_CAPACITY")]
    pub swap_capacity: usize,

    /// Number of simulated slide handles.
    #[arg(long, default_value_t = DEFAULT_SLIDES, env = "WSI_STRESS_SLIDES")]
    pub slides: usize,

    /// Number of pyramid levels per slide.
    #[arg(long, default_value_t = DEFAULT_LEVELS)]
    pub levels: usize,

    /// Number of reader workers.
    #[arg(long, default_value_t = DEFAULT_READERS, env = "WSI_STRESS_READERS")]
    pub readers: usize,

    /// Tile reads performed by each reader.
    #[arg(long, default_value_t = DEFAULT_READS_PER_READER, env = "WSI_STRESS_READS")]
    pub reads: usize,

    /// Tiles per side of each level.
    #[arg(long, default_value_t = DEFAULT_GRID)]
    pub grid: u32,

    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_EDGE)]
    pub tile_edge: u32,

    /// Delay between cache swaps in milliseconds (0 disables swapping).
    #[arg(long, default_value_t = DEFAULT_SWAP_INTERVAL_MS, env = "WSI_SWAP_INTERVAL_MS")]
    pub swap_interval_ms: u64,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl StressConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.slides == 0 {
            return Err("slides must be greater than 0".to_string());
        }
        if self.levels == 0 {
            return Err("levels must be greater than 0".to_string());
        }
        if self.readers == 0 {
            return Err("readers must be greater than 0".to_string());
        }
        if self.reads == 0 {
            return Err("reads must be greater than 0".to_string());
        }
        if self.grid == 0 || self.grid > MAX_GRID {
            return Err(format!("grid must be between 1 and {} tiles", MAX_GRID));
        }
        if self.tile_edge == 0 || self.tile_edge > 4096 {
            return Err("tile_edge must be between 1 and 4096 pixels".to_string());
        }
        Ok(())
    }

    /// Size of one decoded RGBA tile in bytes.
    pub fn tile_bytes(&self) -> usize {
        self.tile_edge as usize * self.tile_edge as usize * 4
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            swap_capacity: DEFAULT_SWAP_CAPACITY,
            slides: DEFAULT_SLIDES,
            levels: DEFAULT_LEVELS,
            readers: DEFAULT_READERS,
            reads: DEFAULT_READS_PER_READER,
            grid: DEFAULT_GRID,
            tile_edge: DEFAULT_TILE_EDGE,
            swap_interval_ms: DEFAULT_SWAP_INTERVAL_MS,
            format: OutputFormat::Text,
        }
    }
}

/// Options for the `simulate` command.
#[derive(Args, Debug, Clone)]
pub struct SimulateConfig {
    /// Cache capacity.
    #[arg(long, default_value = "1000", value_parser = parse_size, env = "WSI_CACHE_CAPACITY")]
    pub capacity: usize,

    /// Size of every inserted tile.
    #[arg(long, default_value = "100", value_parser = parse_size)]
    pub tile_size: usize,

    /// Number of distinct tiles to insert.
    #[arg(long, default_value_t = 11)]
    pub tiles: usize,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl SimulateConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tiles == 0 {
            return Err("tiles must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
