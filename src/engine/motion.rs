use super::*;

/// Why `Agent::advance` stopped consuming its distance budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum MotionEvent {
    ReachedCenter,
    EnteredTile,
    CornerCompleted,
    Blocked,
    Exhausted,
}

/// Pixel-space position locked to the tile grid. `tile` is always the floor
/// of the pixel position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(super) struct Agent {
    pub(super) tile: Tile,
    pub(super) x: f64,
    pub(super) y: f64,
    pub(super) dir: Direction,
    pub(super) next_dir: Direction,
    pub(super) cornering: bool,
}

impl Agent {
    pub(super) fn new(maze: &Maze, x: f64, y: f64, dir: Direction) -> Self {
        Self {
            tile: maze.tile_at(x, y),
            x,
            y,
            dir,
            next_dir: Direction::None,
            cornering: false,
        }
    }

    pub(super) fn sync_tile(&mut self, maze: &Maze) {
        self.x = maze.wrap_tunnel_x(self.x);
        self.tile = maze.tile_at(self.x, self.y);
    }

    pub(super) fn is_centered(&self, maze: &Maze) -> bool {
        let (cx, cy) = maze.tile_center(self.tile);
        self.x == cx && self.y == cy
    }

    /// Signed distance to the tile centre along `dir`; positive while approaching it.
    pub(super) fn ahead_of_center(&self, maze: &Maze, dir: Direction) -> f64 {
        let (cx, cy) = maze.tile_center(self.tile);
        match dir {
            Direction::Right => cx - self.x,
            Direction::Left => self.x - cx,
            Direction::Down => cy - self.y,
            Direction::Up => self.y - cy,
            Direction::None => 0.0,
        }
    }

    fn cross_offset(&self, maze: &Maze, dir: Direction) -> f64 {
        let (cx, cy) = maze.tile_center(self.tile);
        if dir.is_horizontal() {
            self.y - cy
        } else if dir.is_vertical() {
            self.x - cx
        } else {
            0.0
        }
    }

    pub(super) fn step_along(&mut self, dir: Direction, distance: f64) {
        let (dx, dy) = dir.vector();
        self.x += dx as f64 * distance;
        self.y += dy as f64 * distance;
    }

    fn cross_edge(&mut self, maze: &Maze, dir: Direction) {
        let (cx, cy) = maze.tile_center(self.tile);
        match dir {
            Direction::Right => self.x = cx + HALF_TILE,
            Direction::Left => self.x = cx - HALF_TILE - EDGE_EPSILON,
            Direction::Down => self.y = cy + HALF_TILE,
            Direction::Up => self.y = cy - HALF_TILE - EDGE_EPSILON,
            Direction::None => {}
        }
        self.sync_tile(maze);
    }

    /// Moves until the first motion event or until `budget` pixels are spent.
    pub(super) fn advance(&mut self, maze: &Maze, budget: &mut f64) -> MotionEvent {
        if self.dir == Direction::None {
            return MotionEvent::Blocked;
        }
        if *budget <= 0.0 {
            return MotionEvent::Exhausted;
        }
        if self.cornering {
            return self.advance_corner(maze, budget);
        }

        let ahead = self.ahead_of_center(maze, self.dir);
        if ahead > 0.0 {
            if *budget < ahead {
                self.step_along(self.dir, *budget);
                *budget = 0.0;
                self.sync_tile(maze);
                return MotionEvent::Exhausted;
            }
            *budget -= ahead;
            let (cx, cy) = maze.tile_center(self.tile);
            self.x = cx;
            self.y = cy;
            return MotionEvent::ReachedCenter;
        }

        if !maze.is_open(maze.neighbor(self.tile, self.dir)) {
            return MotionEvent::Blocked;
        }
        let edge = HALF_TILE + ahead;
        if *budget < edge {
            self.step_along(self.dir, *budget);
            *budget = 0.0;
            self.sync_tile(maze);
            return MotionEvent::Exhausted;
        }
        *budget -= edge;
        self.cross_edge(maze, self.dir);
        MotionEvent::EnteredTile
    }

    /// Diagonal cornering: travel along the new direction while closing the
    /// offset on the old axis. Entering a new tile takes priority.
    fn advance_corner(&mut self, maze: &Maze, budget: &mut f64) -> MotionEvent {
        let offset = self.cross_offset(maze, self.dir);
        let edge = HALF_TILE + self.ahead_of_center(maze, self.dir);
        let step = budget.min(offset.abs()).min(edge.max(0.0));

        self.step_along(self.dir, step);
        let closing = if offset > 0.0 { -step } else { step };
        if self.dir.is_horizontal() {
            self.y += closing;
        } else {
            self.x += closing;
        }
        *budget -= step;

        let corner_done = step >= offset.abs();
        if corner_done {
            let (cx, cy) = maze.tile_center(self.tile);
            if self.dir.is_horizontal() {
                self.y = cy;
            } else {
                self.x = cx;
            }
            self.cornering = false;
        }
        if step >= edge {
            self.cross_edge(maze, self.dir);
            return MotionEvent::EnteredTile;
        }
        self.sync_tile(maze);
        if corner_done {
            MotionEvent::CornerCompleted
        } else {
            MotionEvent::Exhausted
        }
    }

    /// Applies the pending turn request where it is legal. Reversals are
    /// immediate, other turns need a turn-table entry for the current tile
    /// and corner when requested off-centre. A request that is illegal at a
    /// centre is dropped.
    pub(super) fn try_turn(&mut self, maze: &Maze) -> bool {
        let want = self.next_dir;
        if want == Direction::None {
            return false;
        }
        if want == self.dir {
            self.next_dir = Direction::None;
            return false;
        }
        if self.cornering {
            return false;
        }

        let centered = self.is_centered(maze);
        if self.dir != Direction::None && want == self.dir.opposite() {
            self.next_dir = Direction::None;
            if centered && !maze.is_open(maze.neighbor(self.tile, want)) {
                return false;
            }
            self.dir = want;
            return true;
        }

        if maze.turns_at(self.tile).contains(&want) {
            self.next_dir = Direction::None;
            self.cornering = !centered && self.dir.is_perpendicular_to(want);
            if !centered && !self.cornering {
                let (cx, cy) = maze.tile_center(self.tile);
                self.x = cx;
                self.y = cy;
            }
            self.dir = want;
            return true;
        }

        if centered {
            self.next_dir = Direction::None;
        }
        false
    }

    /// Reverses in place unless the agent is mid-corner.
    pub(super) fn reverse(&mut self) -> bool {
        if self.cornering || self.dir == Direction::None {
            return false;
        }
        self.dir = self.dir.opposite();
        self.next_dir = Direction::None;
        true
    }
}

impl GameEngine {
    pub(super) fn player_speed(&self) -> f64 {
        let speeds = &self.level_data().speeds;
        if self.scheduler.fright_active() {
            speed_px_per_ms(speeds.player_fright)
        } else {
            speed_px_per_ms(speeds.player)
        }
    }

    pub(super) fn move_player(&mut self, dt_ms: u64) {
        let mut budget = dt_ms as f64 * self.player_speed();
        self.player.try_turn(&self.maze);
        for _ in 0..MAX_MOTION_EVENTS {
            match self.player.advance(&self.maze, &mut budget) {
                MotionEvent::Exhausted => break,
                MotionEvent::Blocked => {
                    if !self.player.try_turn(&self.maze) {
                        break;
                    }
                }
                MotionEvent::ReachedCenter
                | MotionEvent::EnteredTile
                | MotionEvent::CornerCompleted => {
                    self.player.try_turn(&self.maze);
                }
            }
        }
    }
}
