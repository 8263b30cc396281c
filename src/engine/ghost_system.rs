use super::*;

/// One straight leg of a scripted pen manoeuvre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(super) struct PathLeg {
    pub(super) dir: Direction,
    pub(super) stop_at: f64,
}

#[derive(Clone, Copy, Debug)]
enum Waypoint {
    Horizontal(f64),
    Vertical(f64),
}

fn build_path(mut x: f64, mut y: f64, waypoints: &[Waypoint]) -> Vec<PathLeg> {
    let mut legs = Vec::new();
    for waypoint in waypoints {
        match *waypoint {
            Waypoint::Horizontal(stop_at) if stop_at != x => {
                let dir = if stop_at < x { Direction::Left } else { Direction::Right };
                legs.push(PathLeg { dir, stop_at });
                x = stop_at;
            }
            Waypoint::Vertical(stop_at) if stop_at != y => {
                let dir = if stop_at < y { Direction::Up } else { Direction::Down };
                legs.push(PathLeg { dir, stop_at });
                y = stop_at;
            }
            _ => {}
        }
    }
    legs
}

pub(super) fn home_slot_x(role: GhostRole, pen: &PenGeometry) -> f64 {
    match role {
        GhostRole::Shadow | GhostRole::Speedy => pen.slots[1],
        GhostRole::Bashful => pen.slots[0],
        GhostRole::Pokey => pen.slots[2],
    }
}

pub(super) fn exit_path(x: f64, y: f64, pen: &PenGeometry) -> Vec<PathLeg> {
    build_path(
        x,
        y,
        &[
            Waypoint::Vertical(pen.home_y),
            Waypoint::Horizontal(pen.door_x),
            Waypoint::Vertical(pen.exit_y),
        ],
    )
}

pub(super) fn entry_path(role: GhostRole, x: f64, y: f64, pen: &PenGeometry) -> Vec<PathLeg> {
    build_path(
        x,
        y,
        &[
            Waypoint::Vertical(pen.exit_y),
            Waypoint::Horizontal(pen.door_x),
            Waypoint::Vertical(pen.home_y),
            Waypoint::Horizontal(home_slot_x(role, pen)),
        ],
    )
}

/// Tile `tiles` ahead of the player, shifted left as well when facing up.
fn ahead_of_player(player: Tile, facing: Direction, tiles: i32) -> Tile {
    let ahead = player.offset(facing, tiles);
    if facing == Direction::Up {
        Tile::new(ahead.x - tiles, ahead.y)
    } else {
        ahead
    }
}

pub(super) fn chase_target(
    role: GhostRole,
    own: Tile,
    player: Tile,
    facing: Direction,
    shadow: Tile,
) -> Tile {
    match role {
        GhostRole::Shadow => player,
        GhostRole::Speedy => ahead_of_player(player, facing, 4),
        GhostRole::Bashful => {
            let pivot = ahead_of_player(player, facing, 2);
            Tile::new(2 * pivot.x - shadow.x, 2 * pivot.y - shadow.y)
        }
        GhostRole::Pokey => {
            if own.distance_sq(player) > (SHY_GHOST_RADIUS * SHY_GHOST_RADIUS) as i64 {
                player
            } else {
                role.scatter_corner()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct TurnChoice {
    pub(super) dir: Direction,
    pub(super) fallback: bool,
}

/// Picks the exit from `tile` for a ghost travelling `dir`. Reversing is
/// only allowed when nothing else is legal.
pub(super) fn pick_turn(
    maze: &Maze,
    tile: Tile,
    dir: Direction,
    mode: GhostMode,
    target: Tile,
    rng: &mut Rng,
) -> TurnChoice {
    let restricted = !mode.is_frightened()
        && mode != GhostMode::Eyes
        && NO_UP_TURN_TILES.contains(&(tile.x, tile.y));
    let exits = maze.turns_at(tile);
    let mut candidates: Vec<Direction> = exits
        .iter()
        .copied()
        .filter(|candidate| *candidate != dir.opposite())
        .filter(|candidate| !(restricted && *candidate == Direction::Up))
        .collect();
    let fallback = candidates.is_empty();
    if fallback {
        candidates = exits.to_vec();
    }

    let chosen = if mode.is_frightened() {
        rng.pick(&candidates)
    } else {
        let mut best: Option<(Direction, i64)> = None;
        for candidate in &candidates {
            let distance = maze.neighbor(tile, *candidate).distance_sq(target);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((*candidate, distance));
            }
        }
        best.map(|(candidate, _)| candidate)
    };

    TurnChoice {
        dir: chosen.unwrap_or(Direction::None),
        fallback,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(super) struct Ghost {
    pub(super) role: GhostRole,
    pub(super) agent: Agent,
    pub(super) mode: GhostMode,
    pub(super) place: GhostPlace,
    pub(super) frightened: bool,
    pub(super) path: Vec<PathLeg>,
}

impl Ghost {
    pub(super) fn start(role: GhostRole, maze: &Maze, mode: GhostMode) -> Self {
        let pen = maze.pen();
        let (x, y, dir, place) = match role {
            GhostRole::Shadow => (pen.door_x, pen.exit_y, Direction::Left, GhostPlace::Outside),
            GhostRole::Speedy => (pen.slots[1], pen.home_y, Direction::Down, GhostPlace::InPen),
            GhostRole::Bashful => (pen.slots[0], pen.home_y, Direction::Up, GhostPlace::InPen),
            GhostRole::Pokey => (pen.slots[2], pen.home_y, Direction::Up, GhostPlace::InPen),
        };
        Self {
            role,
            agent: Agent::new(maze, x, y, dir),
            mode,
            place,
            frightened: false,
            path: Vec::new(),
        }
    }

    pub(super) fn view(&self, elroy_level: u8) -> GhostView {
        GhostView {
            role: self.role,
            tile: self.agent.tile,
            x: self.agent.x,
            y: self.agent.y,
            dir: self.agent.dir,
            mode: self.mode,
            place: self.place,
            elroy_level: if self.role == GhostRole::Shadow {
                elroy_level
            } else {
                0
            },
        }
    }

    /// Walks the scripted legs; true once every leg is done.
    pub(super) fn follow_path(&mut self, maze: &Maze, budget: &mut f64) -> bool {
        while let Some(leg) = self.path.first().copied() {
            self.agent.dir = leg.dir;
            let current = if leg.dir.is_horizontal() {
                self.agent.x
            } else {
                self.agent.y
            };
            let distance = (leg.stop_at - current).abs();
            if *budget < distance {
                self.agent.step_along(leg.dir, *budget);
                *budget = 0.0;
                self.agent.sync_tile(maze);
                return false;
            }
            *budget -= distance;
            if leg.dir.is_horizontal() {
                self.agent.x = leg.stop_at;
            } else {
                self.agent.y = leg.stop_at;
            }
            self.agent.sync_tile(maze);
            self.path.remove(0);
        }
        true
    }

    /// Caged ghosts bounce half a tile above and below the home row.
    pub(super) fn bob(&mut self, maze: &Maze, mut budget: f64) {
        let home_y = maze.pen().home_y;
        if !self.agent.dir.is_vertical() {
            self.agent.dir = Direction::Up;
        }
        for _ in 0..MAX_MOTION_EVENTS {
            if budget <= 0.0 {
                break;
            }
            let bound = if self.agent.dir == Direction::Up {
                home_y - HALF_TILE
            } else {
                home_y + HALF_TILE
            };
            let distance = (bound - self.agent.y).abs();
            if budget < distance {
                self.agent.step_along(self.agent.dir, budget);
                break;
            }
            budget -= distance;
            self.agent.y = bound;
            self.agent.dir = self.agent.dir.opposite();
        }
        self.agent.sync_tile(maze);
    }
}

impl GameEngine {
    pub(super) fn elroy_level(&self) -> u8 {
        if self.elroy_suspended {
            return 0;
        }
        elroy_level_for(self.food.remaining(), self.level_data().elroy_dots)
    }

    fn shadow_tile(&self) -> Tile {
        self.ghosts
            .iter()
            .find(|ghost| ghost.role == GhostRole::Shadow)
            .map(|ghost| ghost.agent.tile)
            .unwrap_or(self.player.tile)
    }

    pub(super) fn ghost_target(&self, idx: usize) -> Tile {
        let ghost = &self.ghosts[idx];
        let elroy = ghost.role == GhostRole::Shadow && self.elroy_level() > 0;
        match ghost.mode {
            GhostMode::Eyes => self.maze.pen().entry_tiles[0],
            GhostMode::Scatter if !elroy => ghost.role.scatter_corner(),
            _ => {
                let facing = if self.player.dir == Direction::None {
                    Direction::Left
                } else {
                    self.player.dir
                };
                chase_target(
                    ghost.role,
                    ghost.agent.tile,
                    self.player.tile,
                    facing,
                    self.shadow_tile(),
                )
            }
        }
    }

    pub(super) fn ghost_speed(&self, idx: usize) -> f64 {
        let speeds = &self.level_data().speeds;
        let ghost = &self.ghosts[idx];
        let percent = if ghost.mode == GhostMode::Eyes {
            EYES_SPEED_PCT
        } else if ghost.place != GhostPlace::Outside {
            speeds.ghost_tunnel
        } else if ghost.mode.is_frightened() {
            speeds.ghost_fright
        } else if self.maze.is_tunnel(ghost.agent.tile) {
            speeds.ghost_tunnel
        } else if ghost.role == GhostRole::Shadow && self.elroy_level() > 0 {
            speeds.elroy[self.elroy_level() as usize - 1]
        } else {
            speeds.ghost
        };
        speed_px_per_ms(percent)
    }

    fn choose_ghost_turn(&mut self, idx: usize) -> Direction {
        let target = self.ghost_target(idx);
        let ghost = &self.ghosts[idx];
        let (tile, dir, mode, role) = (ghost.agent.tile, ghost.agent.dir, ghost.mode, ghost.role);
        let choice = pick_turn(&self.maze, tile, dir, mode, target, &mut self.rng);
        if choice.fallback {
            self.events.push(RuntimeEvent::Anomaly {
                message: format!(
                    "{role:?} had no forward exit at ({},{}); reversing",
                    tile.x, tile.y
                ),
            });
        }
        choice.dir
    }

    /// Mode switches turn every roaming ghost around, except eyes and
    /// ghosts that are mid-corner.
    pub(super) fn reverse_ghosts(&mut self) {
        for ghost in &mut self.ghosts {
            if ghost.place != GhostPlace::Outside || ghost.mode == GhostMode::Eyes {
                continue;
            }
            ghost.agent.reverse();
        }
    }

    pub(super) fn move_ghosts(&mut self, dt_ms: u64) {
        for idx in 0..self.ghosts.len() {
            match self.ghosts[idx].place {
                GhostPlace::InPen => {
                    let budget = dt_ms as f64 * self.ghost_speed(idx);
                    self.ghosts[idx].bob(&self.maze, budget);
                }
                GhostPlace::LeavingPen => {
                    let mut budget = dt_ms as f64 * self.ghost_speed(idx);
                    if self.ghosts[idx].follow_path(&self.maze, &mut budget) {
                        self.finish_leaving_pen(idx);
                    }
                }
                GhostPlace::EnteringPen => {
                    let mut budget = dt_ms as f64 * self.ghost_speed(idx);
                    if self.ghosts[idx].follow_path(&self.maze, &mut budget) {
                        self.revive_ghost(idx);
                    }
                }
                GhostPlace::Outside => self.steer_ghost(idx, dt_ms),
            }
        }
    }

    fn steer_ghost(&mut self, idx: usize, dt_ms: u64) {
        let mut remaining_ms = dt_ms as f64;
        for _ in 0..MAX_MOTION_EVENTS {
            if self.ghosts[idx].place != GhostPlace::Outside {
                break;
            }
            let speed = self.ghost_speed(idx);
            if speed <= 0.0 || remaining_ms <= 0.0 {
                break;
            }
            let mut budget = remaining_ms * speed;
            let event = self.ghosts[idx].agent.advance(&self.maze, &mut budget);
            remaining_ms = budget / speed;
            match event {
                MotionEvent::EnteredTile => self.on_ghost_entered_tile(idx),
                MotionEvent::ReachedCenter => self.on_ghost_centered(idx),
                MotionEvent::Blocked => {
                    self.on_ghost_centered(idx);
                    let agent = &self.ghosts[idx].agent;
                    if agent.dir == Direction::None
                        || !self.maze.is_open(self.maze.neighbor(agent.tile, agent.dir))
                    {
                        break;
                    }
                }
                MotionEvent::CornerCompleted => {}
                MotionEvent::Exhausted => break,
            }
        }
    }

    fn on_ghost_entered_tile(&mut self, idx: usize) {
        let tile = self.ghosts[idx].agent.tile;
        if self.ghosts[idx].mode == GhostMode::Eyes && self.maze.pen().entry_tiles.contains(&tile) {
            self.start_entering_pen(idx);
            return;
        }

        let choice = self.choose_ghost_turn(idx);
        let agent = &mut self.ghosts[idx].agent;
        agent.next_dir = choice;
        if choice == Direction::None || choice == agent.dir {
            return;
        }
        agent.cornering = agent.dir.is_perpendicular_to(choice) && !agent.is_centered(&self.maze);
        agent.dir = choice;
    }

    fn on_ghost_centered(&mut self, idx: usize) {
        let agent = &self.ghosts[idx].agent;
        let planned = agent.next_dir != Direction::None
            && self.maze.is_open(self.maze.neighbor(agent.tile, agent.dir));
        if planned {
            self.ghosts[idx].agent.next_dir = Direction::None;
            return;
        }
        let choice = self.choose_ghost_turn(idx);
        let agent = &mut self.ghosts[idx].agent;
        agent.next_dir = Direction::None;
        if choice != Direction::None {
            agent.dir = choice;
        }
    }

    fn start_entering_pen(&mut self, idx: usize) {
        let pen = *self.maze.pen();
        let ghost = &mut self.ghosts[idx];
        ghost.place = GhostPlace::EnteringPen;
        ghost.agent.cornering = false;
        ghost.agent.next_dir = Direction::None;
        ghost.path = entry_path(ghost.role, ghost.agent.x, ghost.agent.y, &pen);
    }

    fn revive_ghost(&mut self, idx: usize) {
        let pen = *self.maze.pen();
        let mode = self.scheduler.scheduled_mode();
        let ghost = &mut self.ghosts[idx];
        ghost.mode = mode;
        ghost.frightened = false;
        ghost.place = GhostPlace::LeavingPen;
        ghost.path = exit_path(ghost.agent.x, ghost.agent.y, &pen);
        let role = ghost.role;
        self.events.push(RuntimeEvent::GhostRevived { role });
    }

    fn finish_leaving_pen(&mut self, idx: usize) {
        let ghost = &mut self.ghosts[idx];
        ghost.place = GhostPlace::Outside;
        ghost.path.clear();
        ghost.agent.dir = Direction::Left;
        ghost.agent.next_dir = Direction::None;
        ghost.agent.cornering = false;
        if ghost.role == GhostRole::Pokey {
            self.elroy_suspended = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_targets_the_player_tile() {
        let player = Tile::new(10, 20);
        let target = chase_target(GhostRole::Shadow, Tile::new(1, 1), player, Direction::Left, player);
        assert_eq!(target, player);
    }

    #[test]
    fn speedy_leads_by_four_with_the_upward_quirk() {
        let player = Tile::new(10, 20);
        let shadow = Tile::new(0, 0);
        let own = Tile::new(5, 5);
        assert_eq!(
            chase_target(GhostRole::Speedy, own, player, Direction::Right, shadow),
            Tile::new(14, 20)
        );
        assert_eq!(
            chase_target(GhostRole::Speedy, own, player, Direction::Down, shadow),
            Tile::new(10, 24)
        );
        assert_eq!(
            chase_target(GhostRole::Speedy, own, player, Direction::Up, shadow),
            Tile::new(6, 16)
        );
    }

    #[test]
    fn bashful_reflects_shadow_through_the_pivot() {
        let player = Tile::new(10, 20);
        let shadow = Tile::new(4, 20);
        assert_eq!(
            chase_target(GhostRole::Bashful, Tile::new(0, 0), player, Direction::Right, shadow),
            Tile::new(20, 20)
        );
        // Facing up the pivot is (8, 18), two up and two left of the player.
        assert_eq!(
            chase_target(GhostRole::Bashful, Tile::new(0, 0), player, Direction::Up, shadow),
            Tile::new(12, 16)
        );
    }

    #[test]
    fn pokey_retreats_inside_eight_tiles() {
        let player = Tile::new(10, 20);
        let shadow = Tile::new(0, 0);
        assert_eq!(
            chase_target(GhostRole::Pokey, Tile::new(10, 11), player, Direction::Left, shadow),
            player
        );
        assert_eq!(
            chase_target(GhostRole::Pokey, Tile::new(10, 12), player, Direction::Left, shadow),
            GhostRole::Pokey.scatter_corner()
        );
    }

    #[test]
    fn greedy_turn_prefers_the_closest_exit_and_breaks_ties_in_order() {
        let maze = Maze::classic();
        let mut rng = Rng::new(1);
        let tile = Tile::new(6, 5);
        let up = pick_turn(&maze, tile, Direction::Right, GhostMode::Chase, Tile::new(6, 0), &mut rng);
        assert_eq!(up.dir, Direction::Up);
        assert!(!up.fallback);

        // (6,4) and (6,6) are equally far from (0,5); Up is enumerated first.
        let tie = pick_turn(&maze, tile, Direction::Right, GhostMode::Chase, Tile::new(0, 5), &mut rng);
        assert_eq!(tie.dir, Direction::Up);
    }

    #[test]
    fn reverse_is_never_chosen_when_another_exit_exists() {
        let maze = Maze::classic();
        let mut rng = Rng::new(1);
        let choice = pick_turn(
            &maze,
            Tile::new(6, 5),
            Direction::Right,
            GhostMode::Chase,
            Tile::new(0, 5),
            &mut rng,
        );
        assert_ne!(choice.dir, Direction::Left);
    }

    #[test]
    fn no_up_zone_is_ignored_only_when_frightened() {
        let maze = Maze::classic();
        let mut rng = Rng::new(3);
        let tile = Tile::new(12, 11);
        assert!(maze.turns_at(tile).contains(&Direction::Up));
        let choice = pick_turn(&maze, tile, Direction::Right, GhostMode::Chase, Tile::new(12, 0), &mut rng);
        assert_ne!(choice.dir, Direction::Up);

        let eyes = pick_turn(&maze, tile, Direction::Right, GhostMode::Eyes, Tile::new(12, 0), &mut rng);
        assert_eq!(eyes.dir, Direction::Up);
    }

    #[test]
    fn dead_end_falls_back_to_reversal() {
        let maze = Maze::parse(&["#####", "#. .#", "##-##", "#####"]).expect("maze parses");
        let mut rng = Rng::new(1);
        let choice = pick_turn(
            &maze,
            Tile::new(1, 1),
            Direction::Left,
            GhostMode::Chase,
            Tile::new(3, 1),
            &mut rng,
        );
        assert!(choice.fallback);
        assert_eq!(choice.dir, Direction::Right);
    }

    #[test]
    fn frightened_turns_are_random_but_legal() {
        let maze = Maze::classic();
        let mut rng = Rng::new(9);
        let mut seen = Vec::new();
        for _ in 0..64 {
            let choice = pick_turn(&maze, Tile::new(6, 5), Direction::Right, GhostMode::Blue, Tile::new(0, 0), &mut rng);
            assert_ne!(choice.dir, Direction::Left);
            if !seen.contains(&choice.dir) {
                seen.push(choice.dir);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn pen_scripts_follow_the_door_geometry() {
        let maze = Maze::classic();
        let pen = maze.pen();
        let exit = exit_path(pen.slots[0], pen.home_y - 2.0, pen);
        assert_eq!(
            exit,
            vec![
                PathLeg { dir: Direction::Down, stop_at: 116.0 },
                PathLeg { dir: Direction::Right, stop_at: 112.0 },
                PathLeg { dir: Direction::Up, stop_at: 92.0 },
            ]
        );
        let entry = entry_path(GhostRole::Pokey, 108.0, 92.0, pen);
        assert_eq!(
            entry,
            vec![
                PathLeg { dir: Direction::Right, stop_at: 112.0 },
                PathLeg { dir: Direction::Down, stop_at: 116.0 },
                PathLeg { dir: Direction::Right, stop_at: 128.0 },
            ]
        );
    }

    #[test]
    fn following_a_path_keeps_the_tile_in_sync() {
        let maze = Maze::classic();
        let mut ghost = Ghost::start(GhostRole::Bashful, &maze, GhostMode::Scatter);
        ghost.path = exit_path(ghost.agent.x, ghost.agent.y, maze.pen());
        let mut done = false;
        for _ in 0..100 {
            let mut budget = 1.5;
            done = ghost.follow_path(&maze, &mut budget);
            assert_eq!(ghost.agent.tile, maze.tile_at(ghost.agent.x, ghost.agent.y));
            if done {
                break;
            }
        }
        assert!(done);
        assert_eq!((ghost.agent.x, ghost.agent.y), (112.0, 92.0));
    }

    #[test]
    fn caged_ghosts_stay_within_half_a_tile_of_home() {
        let maze = Maze::classic();
        let mut ghost = Ghost::start(GhostRole::Pokey, &maze, GhostMode::Scatter);
        for _ in 0..200 {
            ghost.bob(&maze, 0.7);
            assert!((ghost.agent.y - maze.pen().home_y).abs() <= HALF_TILE);
        }
    }
}
