use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{FruitKind, GhostRole};

const CLASSIC_LEVEL_COUNT: u32 = 21;

/// Speeds in percent of full speed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpeeds {
    pub player: u32,
    pub player_fright: u32,
    pub ghost: u32,
    pub ghost_fright: u32,
    pub ghost_tunnel: u32,
    pub elroy: [u32; 2],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    pub fruit: FruitKind,
    pub speeds: LevelSpeeds,
    /// Pellets-remaining thresholds for elroy levels 1 and 2.
    pub elroy_dots: [u32; 2],
    pub fright_ms: u64,
    pub fright_blinks: u32,
    /// Alternating scatter/chase durations, scatter first.
    pub scatter_chase_ms: Vec<u64>,
    pub pen_force_ms: u64,
    /// Personal pen dot limits indexed by ghost role.
    pub pen_dot_limits: [u32; 4],
}

impl LevelData {
    pub fn pen_dot_limit(&self, role: GhostRole) -> u32 {
        self.pen_dot_limits[role.index()]
    }
}

#[derive(Debug, Error)]
pub enum LevelTableError {
    #[error("failed to read level table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid level table json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level table has no rows")]
    Empty,
    #[error("level {level} has an empty scatter/chase schedule")]
    EmptySchedule { level: usize },
    #[error("level {level} elroy thresholds must satisfy dots1 >= dots2")]
    ElroyOrder { level: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LevelData>", into = "Vec<LevelData>")]
pub struct LevelTable {
    levels: Vec<LevelData>,
}

impl LevelTable {
    pub fn classic() -> Self {
        Self {
            levels: (1..=CLASSIC_LEVEL_COUNT).map(classic_row).collect(),
        }
    }

    pub fn new(levels: Vec<LevelData>) -> Result<Self, LevelTableError> {
        let table = Self { levels };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LevelTableError> {
        let levels: Vec<LevelData> = serde_json::from_str(raw)?;
        Self::new(levels)
    }

    pub fn load(path: &Path) -> Result<Self, LevelTableError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Row for a 1-based level; levels past the end reuse the last row.
    pub fn row(&self, level: u32) -> &LevelData {
        let idx = (level.max(1) as usize - 1).min(self.levels.len().saturating_sub(1));
        &self.levels[idx]
    }

    fn validate(&self) -> Result<(), LevelTableError> {
        if self.levels.is_empty() {
            return Err(LevelTableError::Empty);
        }
        for (idx, row) in self.levels.iter().enumerate() {
            if row.scatter_chase_ms.is_empty() {
                return Err(LevelTableError::EmptySchedule { level: idx + 1 });
            }
            if row.elroy_dots[0] < row.elroy_dots[1] {
                return Err(LevelTableError::ElroyOrder { level: idx + 1 });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<LevelData>> for LevelTable {
    type Error = LevelTableError;

    fn try_from(levels: Vec<LevelData>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<LevelTable> for Vec<LevelData> {
    fn from(table: LevelTable) -> Self {
        table.levels
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::classic()
    }
}

fn classic_row(level: u32) -> LevelData {
    let fruit = match level {
        1 => FruitKind::Cherry,
        2 => FruitKind::Strawberry,
        3 | 4 => FruitKind::Peach,
        5 | 6 => FruitKind::Apple,
        7 | 8 => FruitKind::Grapes,
        9 | 10 => FruitKind::Galaxian,
        11 | 12 => FruitKind::Bell,
        _ => FruitKind::Key,
    };

    let speeds = match level {
        1 => LevelSpeeds {
            player: 80,
            player_fright: 90,
            ghost: 75,
            ghost_fright: 50,
            ghost_tunnel: 40,
            elroy: [80, 85],
        },
        2..=4 => LevelSpeeds {
            player: 90,
            player_fright: 95,
            ghost: 85,
            ghost_fright: 55,
            ghost_tunnel: 45,
            elroy: [90, 95],
        },
        5..=20 => LevelSpeeds {
            player: 100,
            player_fright: 100,
            ghost: 95,
            ghost_fright: 60,
            ghost_tunnel: 50,
            elroy: [100, 105],
        },
        _ => LevelSpeeds {
            player: 90,
            player_fright: 90,
            ghost: 95,
            ghost_fright: 60,
            ghost_tunnel: 50,
            elroy: [100, 105],
        },
    };

    let elroy_dots = match level {
        1 => [20, 10],
        2 => [30, 15],
        3..=5 => [40, 20],
        6..=8 => [50, 25],
        9..=11 => [60, 30],
        12..=14 => [80, 40],
        15..=18 => [100, 50],
        _ => [120, 60],
    };

    let (fright_secs, fright_blinks) = match level {
        1 => (6, 5),
        2 => (5, 5),
        3 => (4, 5),
        4 => (3, 5),
        5 => (2, 5),
        6 => (5, 5),
        7 | 8 => (2, 5),
        9 => (1, 3),
        10 => (5, 5),
        11 => (2, 5),
        12 | 13 => (1, 3),
        14 => (3, 5),
        15 | 16 => (1, 3),
        17 => (0, 0),
        18 => (1, 3),
        _ => (0, 0),
    };

    let scatter_chase_ms = match level {
        1 => vec![7_000, 20_000, 7_000, 20_000, 5_000, 20_000, 5_000],
        2..=4 => vec![7_000, 20_000, 7_000, 20_000, 5_000, 1_033_000, 17],
        _ => vec![5_000, 20_000, 5_000, 20_000, 5_000, 1_037_000, 17],
    };

    let pen_dot_limits = match level {
        1 => [0, 0, 30, 60],
        2 => [0, 0, 0, 50],
        _ => [0, 0, 0, 0],
    };

    LevelData {
        fruit,
        speeds,
        elroy_dots,
        fright_ms: fright_secs * 1_000,
        fright_blinks,
        scatter_chase_ms,
        pen_force_ms: if level <= 4 { 4_000 } else { 3_000 },
        pen_dot_limits,
    }
}
