pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;
/// Largest slice of time simulated in one pass; longer deltas are split.
pub const MAX_SUBSTEP_MS: u64 = 16;

pub const TILE_SIZE: f64 = 8.0;
pub const HALF_TILE: f64 = TILE_SIZE / 2.0;
/// Nudge past a tile edge when travelling left or up so the floor-based
/// tile lookup lands in the tile being entered.
pub const EDGE_EPSILON: f64 = 1e-6;

/// 100% speed, in pixels per second.
pub const FULL_SPEED_PX_PER_SEC: f64 = 75.757_576_25;
pub const EYES_SPEED_PCT: u32 = 150;

pub const PELLET_SCORE_MULTIPLIER: i32 = 10;
pub const GHOST_BONUS_BASE: i32 = 100;
pub const EXTRA_LIFE_SCORE: i32 = 10_000;
pub const DEFAULT_STARTING_LIVES: i32 = 3;

pub const FRUIT_PELLET_THRESHOLDS: [u32; 2] = [70, 170];
pub const FRUIT_DURATION_MS: u64 = 9_500;
pub const FRUIT_ROW: i32 = 17;

pub const FRIGHT_BLINK_INTERVAL_MS: u64 = 233;

pub const READY_LOCK_MS: u64 = 2_000;
pub const GHOST_EATEN_LOCK_MS: u64 = 1_000;
pub const DEATH_LOCK_MS: u64 = 1_500;
pub const LEVEL_COMPLETE_LOCK_MS: u64 = 2_000;

/// Global pen counter thresholds for roles B, C and D after a life is lost.
pub const GLOBAL_PEN_LIMITS: [u32; 3] = [7, 17, 32];

/// Tiles where ghosts outside fright may not pick "up".
pub const NO_UP_TURN_TILES: [(i32, i32); 4] = [(12, 11), (15, 11), (12, 23), (15, 23)];

pub const PLAYER_START: (f64, f64) = (14.0 * TILE_SIZE, 23.0 * TILE_SIZE + HALF_TILE);

/// Euclidean radius (tiles) inside which role D gives up the chase.
pub const SHY_GHOST_RADIUS: i32 = 8;

pub fn speed_px_per_ms(percent: u32) -> f64 {
    FULL_SPEED_PX_PER_SEC * percent as f64 / 100.0 / 1000.0
}
