use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Enumeration order of the turn table; also the ghost tie-break order.
    pub const TURN_ORDER: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn vector(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn is_perpendicular_to(self, other: Direction) -> bool {
        (self.is_vertical() && other.is_horizontal()) || (self.is_horizontal() && other.is_vertical())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction, tiles: i32) -> Self {
        let (dx, dy) = dir.vector();
        Self {
            x: self.x + dx * tiles,
            y: self.y + dy * tiles,
        }
    }

    pub fn distance_sq(self, other: Tile) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostRole {
    Shadow,
    Speedy,
    Bashful,
    Pokey,
}

impl GhostRole {
    pub const ALL: [GhostRole; 4] = [
        GhostRole::Shadow,
        GhostRole::Speedy,
        GhostRole::Bashful,
        GhostRole::Pokey,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Shadow => 0,
            Self::Speedy => 1,
            Self::Bashful => 2,
            Self::Pokey => 3,
        }
    }

    pub fn scatter_corner(self) -> Tile {
        match self {
            Self::Shadow => Tile::new(25, -3),
            Self::Speedy => Tile::new(2, -3),
            Self::Bashful => Tile::new(27, 32),
            Self::Pokey => Tile::new(0, 32),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Scatter,
    Chase,
    Blue,
    White,
    Eyes,
}

impl GhostMode {
    pub fn is_frightened(self) -> bool {
        matches!(self, Self::Blue | Self::White)
    }
}

/// Where a ghost is relative to the pen; anything but `Outside` is driven
/// by a scripted path instead of tile-by-tile steering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPlace {
    Outside,
    InPen,
    LeavingPen,
    EnteringPen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PelletKind {
    Pill,
    Energizer,
}

impl PelletKind {
    pub fn value(self) -> i32 {
        match self {
            Self::Pill => 1,
            Self::Energizer => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FruitKind {
    Cherry,
    Strawberry,
    Peach,
    Apple,
    Grapes,
    Galaxian,
    Bell,
    Key,
}

impl FruitKind {
    pub fn points(self) -> i32 {
        match self {
            Self::Cherry => 100,
            Self::Strawberry => 300,
            Self::Peach => 500,
            Self::Apple => 700,
            Self::Grapes => 1_000,
            Self::Galaxian => 2_000,
            Self::Bell => 3_000,
            Self::Key => 5_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub tile: Tile,
    pub x: f64,
    pub y: f64,
    pub dir: Direction,
    #[serde(rename = "nextDir")]
    pub next_dir: Direction,
    pub cornering: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostView {
    pub role: GhostRole,
    pub tile: Tile,
    pub x: f64,
    pub y: f64,
    pub dir: Direction,
    pub mode: GhostMode,
    pub place: GhostPlace,
    #[serde(rename = "elroyLevel")]
    pub elroy_level: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FruitView {
    pub kind: FruitKind,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "remainingMs")]
    pub remaining_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MazeInit {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: f64,
    pub tiles: Vec<String>,
    pub pellets: Vec<Tile>,
    pub energizers: Vec<Tile>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PelletEaten {
        x: i32,
        y: i32,
        kind: PelletKind,
        points: i32,
    },
    FrightStarted {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    FrightEnded,
    ModeSwitched {
        mode: GhostMode,
    },
    GhostEaten {
        role: GhostRole,
        bonus: i32,
    },
    GhostReleased {
        role: GhostRole,
    },
    GhostRevived {
        role: GhostRole,
    },
    FruitSpawned {
        fruit: FruitView,
    },
    FruitEaten {
        kind: FruitKind,
        points: i32,
    },
    FruitExpired,
    ExtraLife {
        lives: i32,
    },
    LifeLost {
        lives: i32,
    },
    LevelComplete {
        level: u32,
    },
    LevelStarted {
        level: u32,
    },
    GameOver {
        #[serde(rename = "finalScore")]
        final_score: i32,
    },
    Anomaly {
        message: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub level: u32,
    pub score: i32,
    pub lives: i32,
    pub paused: bool,
    pub locked: bool,
    #[serde(rename = "globalMode")]
    pub global_mode: GhostMode,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub fruit: Option<FruitView>,
    #[serde(rename = "pelletsRemaining")]
    pub pellets_remaining: u32,
    pub consumed: Vec<Tile>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    #[serde(rename = "finalScore")]
    pub final_score: i32,
    #[serde(rename = "levelReached")]
    pub level_reached: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "pelletsEaten")]
    pub pellets_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    pub fruits_eaten: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
    pub ended: bool,
}
