use serde::{Deserialize, Serialize};

use crate::constants::{
    speed_px_per_ms, DEATH_LOCK_MS, DEFAULT_STARTING_LIVES, EDGE_EPSILON, EXTRA_LIFE_SCORE,
    EYES_SPEED_PCT, FRIGHT_BLINK_INTERVAL_MS, FRUIT_DURATION_MS, FRUIT_PELLET_THRESHOLDS,
    FRUIT_ROW, GHOST_EATEN_LOCK_MS, GLOBAL_PEN_LIMITS, HALF_TILE, LEVEL_COMPLETE_LOCK_MS,
    NO_UP_TURN_TILES, PELLET_SCORE_MULTIPLIER, PLAYER_START, READY_LOCK_MS, SHY_GHOST_RADIUS,
    TILE_SIZE,
};
use crate::levels::{LevelData, LevelTable};
use crate::maze::{Maze, PenGeometry};
use crate::rng::Rng;
use crate::types::{
    Direction, FruitKind, FruitView, GameSummary, GhostMode, GhostPlace, GhostRole, GhostView,
    MazeInit, PelletKind, PlayerView, RuntimeEvent, Snapshot, Tile,
};

mod food;
mod ghost_system;
mod mode_scheduler;
mod motion;
mod pen_release;
mod scoring_system;
mod utils;

use self::food::{FoodGrid, Fruit};
use self::ghost_system::{exit_path, Ghost};
use self::mode_scheduler::ModeScheduler;
use self::motion::{Agent, MotionEvent};
use self::pen_release::PenRelease;
use self::utils::{elroy_level_for, ghost_bonus, substeps};

/// Upper bound on motion events handled for one agent in one sub-step.
const MAX_MOTION_EVENTS: usize = 32;

/// What happens once an animation lock runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Continuation {
    Resume,
    ResetLife,
    NextLevel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct AnimationLock {
    remaining_ms: u64,
    then: Continuation,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct RunStats {
    pellets: u32,
    ghosts: u32,
    fruits: u32,
    lives_lost: u32,
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub seed: u32,
    pub start_level: u32,
    pub starting_lives: i32,
    pub level_table: LevelTable,
    /// Ready pause before each life and level; 0 starts play immediately.
    pub ready_ms: u64,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            start_level: 1,
            starting_lives: DEFAULT_STARTING_LIVES,
            level_table: LevelTable::classic(),
            ready_ms: READY_LOCK_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEngine {
    #[serde(skip, default = "Maze::classic")]
    maze: Maze,
    levels: LevelTable,
    ready_ms: u64,
    rng: Rng,

    level: u32,
    score: i32,
    lives: i32,
    extra_life_awarded: bool,

    player: Agent,
    ghosts: Vec<Ghost>,
    food: FoodGrid,
    fruit: Option<Fruit>,
    fruits_spawned: usize,

    scheduler: ModeScheduler,
    pen: PenRelease,
    elroy_suspended: bool,
    kill_chain: u32,
    lock: Option<AnimationLock>,
    level_cleared: bool,

    paused: bool,
    ended: bool,
    events: Vec<RuntimeEvent>,
    stats: RunStats,
    elapsed_ms: u64,
    tick_counter: u64,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions) -> Self {
        let maze = Maze::classic();
        let level = options.start_level.max(1);
        let (px, py) = PLAYER_START;
        let player = Agent::new(&maze, px, py, Direction::Left);
        let ghosts = GhostRole::ALL
            .iter()
            .map(|role| Ghost::start(*role, &maze, GhostMode::Scatter))
            .collect();
        let food = FoodGrid::from_maze(&maze);

        let mut engine = Self {
            maze,
            levels: options.level_table,
            ready_ms: options.ready_ms,
            rng: Rng::new(options.seed),
            level,
            score: 0,
            lives: options.starting_lives,
            extra_life_awarded: false,
            player,
            ghosts,
            food,
            fruit: None,
            fruits_spawned: 0,
            scheduler: ModeScheduler::new(),
            pen: PenRelease::personal(),
            elroy_suspended: false,
            kill_chain: 0,
            lock: None,
            level_cleared: false,
            paused: false,
            ended: false,
            events: vec![RuntimeEvent::LevelStarted { level }],
            stats: RunStats::default(),
            elapsed_ms: 0,
            tick_counter: 0,
        };
        engine.lock(engine.ready_ms, Continuation::Resume);
        engine
    }

    fn level_data(&self) -> &LevelData {
        self.levels.row(self.level)
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.ended || self.paused {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        for slice in substeps(dt_ms) {
            if self.ended {
                break;
            }
            self.substep(slice);
        }
    }

    fn substep(&mut self, dt_ms: u64) {
        if self.lock.is_some() {
            self.advance_lock(dt_ms);
            return;
        }

        self.update_scheduler(dt_ms);
        self.propagate_modes();
        let player_before = self.player.tile;
        let ghosts_before: Vec<Tile> = self.ghosts.iter().map(|ghost| ghost.agent.tile).collect();
        self.move_player(dt_ms);
        self.move_ghosts(dt_ms);
        self.eat_pellet_under_player();
        self.update_fruit(dt_ms);
        if self.resolve_ghost_collisions(player_before, &ghosts_before) {
            return;
        }
        self.update_pen(dt_ms);
        self.check_level_complete();
    }

    fn lock(&mut self, ms: u64, then: Continuation) {
        if ms == 0 {
            self.lock = None;
            self.run_continuation(then);
            return;
        }
        self.lock = Some(AnimationLock {
            remaining_ms: ms,
            then,
        });
    }

    fn advance_lock(&mut self, dt_ms: u64) {
        let Some(lock) = self.lock.as_mut() else {
            return;
        };
        lock.remaining_ms = lock.remaining_ms.saturating_sub(dt_ms);
        if lock.remaining_ms > 0 {
            return;
        }
        let then = lock.then;
        self.lock = None;
        self.run_continuation(then);
    }

    fn run_continuation(&mut self, then: Continuation) {
        match then {
            Continuation::Resume => {}
            Continuation::ResetLife => self.reset_life(),
            Continuation::NextLevel => self.next_level(),
        }
    }

    fn reset_agents(&mut self) {
        let (px, py) = PLAYER_START;
        self.player = Agent::new(&self.maze, px, py, Direction::Left);
        let mode = self.scheduler.scheduled_mode();
        self.ghosts = GhostRole::ALL
            .iter()
            .map(|role| Ghost::start(*role, &self.maze, mode))
            .collect();
    }

    fn reset_life(&mut self) {
        self.scheduler = ModeScheduler::new();
        self.reset_agents();
        self.pen.switch_to_global();
        self.elroy_suspended = true;
        self.fruit = None;
        self.kill_chain = 0;
        self.lock(self.ready_ms, Continuation::Resume);
    }

    fn next_level(&mut self) {
        self.level += 1;
        self.food = FoodGrid::from_maze(&self.maze);
        self.scheduler = ModeScheduler::new();
        self.reset_agents();
        self.pen = PenRelease::personal();
        self.elroy_suspended = false;
        self.fruit = None;
        self.fruits_spawned = 0;
        self.kill_chain = 0;
        self.level_cleared = false;
        self.events.push(RuntimeEvent::LevelStarted { level: self.level });
        self.lock(self.ready_ms, Continuation::Resume);
    }

    /// Queues a turn request; `Direction::None` clears it.
    pub fn receive_input(&mut self, dir: Direction) {
        if self.ended {
            return;
        }
        self.player.next_dir = dir;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// With `drain` set, pending events and consumed tiles are handed out
    /// and cleared; otherwise events are left queued for the next drain.
    pub fn build_snapshot(&mut self, drain: bool) -> Snapshot {
        let (consumed, events) = if drain {
            (self.food.drain_consumed(), std::mem::take(&mut self.events))
        } else {
            (self.food.consumed().to_vec(), Vec::new())
        };
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            level: self.level,
            score: self.score,
            lives: self.lives,
            paused: self.paused,
            locked: self.is_locked(),
            global_mode: self.scheduler.global_mode(),
            player: self.player(),
            ghosts: self.ghosts(),
            fruit: self.fruit(),
            pellets_remaining: self.food.remaining(),
            consumed,
            events,
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            final_score: self.score,
            level_reached: self.level,
            duration_ms: self.elapsed_ms,
            pellets_eaten: self.stats.pellets,
            ghosts_eaten: self.stats.ghosts,
            fruits_eaten: self.stats.fruits,
            lives_lost: self.stats.lives_lost,
            ended: self.ended,
        }
    }

    pub fn maze_init(&self) -> MazeInit {
        self.maze.to_maze_init()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn pellets_remaining(&self) -> u32 {
        self.food.remaining()
    }

    pub fn pellet_at(&self, tile: Tile) -> Option<PelletKind> {
        self.food.pellet_at(tile)
    }

    pub fn energizers(&self) -> &[Tile] {
        self.food.energizers()
    }

    pub fn player(&self) -> PlayerView {
        PlayerView {
            tile: self.player.tile,
            x: self.player.x,
            y: self.player.y,
            dir: self.player.dir,
            next_dir: self.player.next_dir,
            cornering: self.player.cornering,
        }
    }

    pub fn ghosts(&self) -> Vec<GhostView> {
        let elroy = self.elroy_level();
        self.ghosts.iter().map(|ghost| ghost.view(elroy)).collect()
    }

    pub fn fruit(&self) -> Option<FruitView> {
        self.fruit.as_ref().map(Fruit::view)
    }

    pub fn global_mode(&self) -> GhostMode {
        self.scheduler.global_mode()
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}
