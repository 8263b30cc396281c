use std::collections::VecDeque;

use crate::engine::GameEngine;
use crate::maze::Maze;
use crate::rng::Rng;
use crate::types::{Direction, FruitView, GhostMode, GhostPlace, GhostView, Tile};

const DANGER_RADIUS: i32 = 4;
const HUNT_RADIUS: i32 = 6;

fn manhattan(a: Tile, b: Tile) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

fn is_roaming(ghost: &GhostView) -> bool {
    matches!(ghost.place, GhostPlace::Outside | GhostPlace::LeavingPen)
}

fn is_dangerous(ghost: &GhostView) -> bool {
    is_roaming(ghost) && !ghost.mode.is_frightened() && ghost.mode != GhostMode::Eyes
}

/// Breadth-first walk over open tiles that remembers which first move
/// reaches each tile.
struct FirstSteps {
    width: i32,
    steps: Vec<Option<(u32, Direction)>>,
    order: Vec<Tile>,
}

impl FirstSteps {
    fn explore(maze: &Maze, start: Tile) -> Self {
        let width = maze.width();
        let mut steps = vec![None; (width * maze.height()) as usize];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        let Some(start_idx) = index(maze, start) else {
            return Self { width, steps, order };
        };
        steps[start_idx] = Some((0, Direction::None));
        queue.push_back(start);

        while let Some(tile) = queue.pop_front() {
            let Some((dist, first)) = index(maze, tile).and_then(|idx| steps[idx]) else {
                continue;
            };
            for dir in Direction::TURN_ORDER {
                let next = maze.neighbor(tile, dir);
                if !maze.is_open(next) {
                    continue;
                }
                let Some(next_idx) = index(maze, next) else {
                    continue;
                };
                if steps[next_idx].is_some() {
                    continue;
                }
                let first = if first == Direction::None { dir } else { first };
                steps[next_idx] = Some((dist + 1, first));
                order.push(next);
                queue.push_back(next);
            }
        }
        Self { width, steps, order }
    }

    fn first_step_to(&self, tile: Tile) -> Option<(u32, Direction)> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width {
            return None;
        }
        self.steps.get((tile.y * self.width + tile.x) as usize).copied().flatten()
    }

    /// Closest reachable tile matching `wanted`, in breadth-first order.
    fn nearest(&self, wanted: impl Fn(Tile) -> bool) -> Option<(Tile, u32, Direction)> {
        self.order.iter().find(|tile| wanted(**tile)).and_then(|tile| {
            self.first_step_to(*tile)
                .map(|(dist, dir)| (*tile, dist, dir))
        })
    }
}

fn index(maze: &Maze, tile: Tile) -> Option<usize> {
    if tile.x < 0 || tile.y < 0 || tile.x >= maze.width() || tile.y >= maze.height() {
        return None;
    }
    Some((tile.y * maze.width() + tile.x) as usize)
}

/// Scripted player used by the batch runner and demo sessions. It only
/// produces direction requests; the engine decides whether they apply.
#[derive(Clone, Debug)]
pub struct Autopilot {
    rng: Rng,
}

impl Autopilot {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: Rng::new(seed),
        }
    }

    pub fn decide(&mut self, engine: &GameEngine) -> Direction {
        let player = engine.player();
        let ghosts = engine.ghosts();
        let fruit = engine.fruit();
        self.choose(
            engine.maze(),
            player.tile,
            &ghosts,
            fruit.as_ref(),
            |tile| engine.pellet_at(tile).is_some(),
        )
    }

    fn choose(
        &mut self,
        maze: &Maze,
        from: Tile,
        ghosts: &[GhostView],
        fruit: Option<&FruitView>,
        has_pellet: impl Fn(Tile) -> bool,
    ) -> Direction {
        let danger = ghosts
            .iter()
            .filter(|ghost| is_dangerous(ghost))
            .map(|ghost| manhattan(from, ghost.tile))
            .min();
        if danger.is_some_and(|dist| dist <= DANGER_RADIUS) {
            return self.choose_escape_direction(maze, from, ghosts);
        }

        let steps = FirstSteps::explore(maze, from);
        let prey = ghosts
            .iter()
            .filter(|ghost| is_roaming(ghost) && ghost.mode.is_frightened())
            .filter(|ghost| manhattan(from, ghost.tile) <= HUNT_RADIUS)
            .filter_map(|ghost| steps.first_step_to(ghost.tile))
            .min_by_key(|(dist, _)| *dist);
        if let Some((_, dir)) = prey {
            return dir;
        }

        let pellet = steps.nearest(&has_pellet);
        let fruit_step = fruit
            .map(|fruit| maze.tile_at(fruit.x, fruit.y))
            .and_then(|tile| steps.first_step_to(tile));
        match (pellet, fruit_step) {
            (Some((_, pellet_dist, _)), Some((fruit_dist, dir))) if fruit_dist < pellet_dist => dir,
            (None, Some((_, dir))) => dir,
            (Some((_, _, dir)), _) => dir,
            (None, None) => self.wander(maze, from),
        }
    }

    fn choose_escape_direction(&mut self, maze: &Maze, from: Tile, ghosts: &[GhostView]) -> Direction {
        let mut best = Direction::None;
        let mut best_score = f32::NEG_INFINITY;
        for dir in Direction::TURN_ORDER {
            let next = maze.neighbor(from, dir);
            if !maze.is_open(next) {
                continue;
            }
            let dist = ghosts
                .iter()
                .filter(|ghost| is_dangerous(ghost))
                .map(|ghost| manhattan(next, ghost.tile))
                .min()
                .unwrap_or(99);
            let score = dist as f32 + self.rng.next_f32() * 0.2;
            if score > best_score {
                best_score = score;
                best = dir;
            }
        }
        if best == Direction::None {
            self.wander(maze, from)
        } else {
            best
        }
    }

    fn wander(&mut self, maze: &Maze, from: Tile) -> Direction {
        let exits: Vec<Direction> = Direction::TURN_ORDER
            .into_iter()
            .filter(|dir| maze.is_open(maze.neighbor(from, *dir)))
            .collect();
        self.rng.pick(&exits).unwrap_or(Direction::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameEngineOptions;

    fn ghost(tile: Tile, mode: GhostMode) -> GhostView {
        GhostView {
            role: crate::types::GhostRole::Shadow,
            tile,
            x: tile.x as f64 * 8.0 + 4.0,
            y: tile.y as f64 * 8.0 + 4.0,
            dir: Direction::Left,
            mode,
            place: GhostPlace::Outside,
            elroy_level: 0,
        }
    }

    #[test]
    fn heads_for_the_nearest_pellet() {
        let engine = GameEngine::new(GameEngineOptions::default());
        let mut autopilot = Autopilot::new(1);
        assert_eq!(autopilot.decide(&engine), Direction::Right);
    }

    #[test]
    fn runs_from_a_close_chaser() {
        let maze = Maze::classic();
        let mut autopilot = Autopilot::new(1);
        let chaser = ghost(Tile::new(9, 5), GhostMode::Chase);
        let dir = autopilot.choose(&maze, Tile::new(7, 5), &[chaser], None, |_| true);
        assert_eq!(dir, Direction::Left);
    }

    #[test]
    fn ignores_eyes_and_caged_ghosts() {
        let maze = Maze::classic();
        let mut autopilot = Autopilot::new(1);
        let eyes = ghost(Tile::new(8, 5), GhostMode::Eyes);
        let mut caged = ghost(Tile::new(6, 5), GhostMode::Chase);
        caged.place = GhostPlace::InPen;
        let pellet = Tile::new(4, 5);
        let dir = autopilot.choose(&maze, Tile::new(7, 5), &[eyes, caged], None, |tile| tile == pellet);
        assert_eq!(dir, Direction::Left);
    }

    #[test]
    fn hunts_a_nearby_frightened_ghost() {
        let maze = Maze::classic();
        let mut autopilot = Autopilot::new(1);
        let prey = ghost(Tile::new(11, 5), GhostMode::Blue);
        let pellet = Tile::new(1, 5);
        let dir = autopilot.choose(&maze, Tile::new(7, 5), &[prey], None, |tile| tile == pellet);
        assert_eq!(dir, Direction::Right);
    }

    #[test]
    fn prefers_fruit_when_it_is_closer() {
        let maze = Maze::classic();
        let mut autopilot = Autopilot::new(1);
        let fruit = FruitView {
            kind: crate::types::FruitKind::Cherry,
            x: 84.0,
            y: 44.0,
            remaining_ms: 1_000,
        };
        let pellet = Tile::new(1, 5);
        let dir = autopilot.choose(&maze, Tile::new(7, 5), &[], Some(&fruit), |tile| tile == pellet);
        assert_eq!(dir, Direction::Right);

        let far_fruit = FruitView { x: 212.0, ..fruit };
        let dir = autopilot.choose(&maze, Tile::new(7, 5), &[], Some(&far_fruit), |tile| tile == pellet);
        assert_eq!(dir, Direction::Left);
    }

    #[test]
    fn wanders_when_the_board_is_empty() {
        let maze = Maze::classic();
        let mut autopilot = Autopilot::new(4);
        let dir = autopilot.choose(&maze, Tile::new(7, 5), &[], None, |_| false);
        assert!(maze.is_open(maze.neighbor(Tile::new(7, 5), dir)));
    }
}
