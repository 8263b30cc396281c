use super::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(super) struct FoodGrid {
    width: i32,
    height: i32,
    cells: Vec<Option<PelletKind>>,
    total: u32,
    remaining: u32,
    energizers: Vec<Tile>,
    consumed: Vec<Tile>,
}

impl FoodGrid {
    pub(super) fn from_maze(maze: &Maze) -> Self {
        let width = maze.width();
        let height = maze.height();
        let mut cells = vec![None; (width * height) as usize];
        let mut energizers = Vec::new();
        for (tile, kind) in maze.initial_pellets() {
            cells[(tile.y * width + tile.x) as usize] = Some(*kind);
            if *kind == PelletKind::Energizer {
                energizers.push(*tile);
            }
        }
        let total = maze.initial_pellets().len() as u32;
        Self {
            width,
            height,
            cells,
            total,
            remaining: total,
            energizers,
            consumed: Vec::new(),
        }
    }

    fn index(&self, tile: Tile) -> Option<usize> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height {
            return None;
        }
        Some((tile.y * self.width + tile.x) as usize)
    }

    pub(super) fn pellet_at(&self, tile: Tile) -> Option<PelletKind> {
        self.index(tile).and_then(|idx| self.cells[idx])
    }

    pub(super) fn eat(&mut self, tile: Tile) -> Option<PelletKind> {
        let idx = self.index(tile)?;
        let kind = self.cells[idx].take()?;
        self.remaining -= 1;
        if kind == PelletKind::Energizer {
            self.energizers.retain(|candidate| *candidate != tile);
        }
        self.consumed.push(tile);
        Some(kind)
    }

    pub(super) fn remaining(&self) -> u32 {
        self.remaining
    }

    pub(super) fn eaten(&self) -> u32 {
        self.total - self.remaining
    }

    /// Energizers still on the board.
    pub(super) fn energizers(&self) -> &[Tile] {
        &self.energizers
    }

    pub(super) fn drain_consumed(&mut self) -> Vec<Tile> {
        std::mem::take(&mut self.consumed)
    }

    pub(super) fn consumed(&self) -> &[Tile] {
        &self.consumed
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(super) struct Fruit {
    pub(super) kind: FruitKind,
    pub(super) x: f64,
    pub(super) y: f64,
    pub(super) remaining_ms: u64,
}

impl Fruit {
    pub(super) fn view(&self) -> FruitView {
        FruitView {
            kind: self.kind,
            x: self.x,
            y: self.y,
            remaining_ms: self.remaining_ms,
        }
    }
}

impl GameEngine {
    pub(super) fn maybe_spawn_fruit(&mut self) {
        let eaten = self.food.eaten();
        let Some(threshold) = FRUIT_PELLET_THRESHOLDS.get(self.fruits_spawned) else {
            return;
        };
        if eaten < *threshold {
            return;
        }
        self.fruits_spawned += 1;
        let fruit = Fruit {
            kind: self.level_data().fruit,
            x: self.maze.pen().door_x,
            y: FRUIT_ROW as f64 * TILE_SIZE + HALF_TILE,
            remaining_ms: FRUIT_DURATION_MS,
        };
        self.events.push(RuntimeEvent::FruitSpawned {
            fruit: fruit.view(),
        });
        self.fruit = Some(fruit);
    }

    pub(super) fn update_fruit(&mut self, dt_ms: u64) {
        let Some(fruit) = self.fruit.as_mut() else {
            return;
        };

        let same_row = self.player.tile.y == FRUIT_ROW;
        if same_row && (self.player.x - fruit.x).abs() <= HALF_TILE {
            let kind = fruit.kind;
            let points = kind.points();
            self.fruit = None;
            self.stats.fruits += 1;
            self.events.push(RuntimeEvent::FruitEaten { kind, points });
            self.add_score(points);
            return;
        }

        fruit.remaining_ms = fruit.remaining_ms.saturating_sub(dt_ms);
        if fruit.remaining_ms == 0 {
            self.fruit = None;
            self.events.push(RuntimeEvent::FruitExpired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eating_clears_the_cell_once() {
        let maze = Maze::classic();
        let mut food = FoodGrid::from_maze(&maze);
        assert_eq!(food.remaining(), 244);
        assert_eq!(food.energizers().len(), 4);

        assert_eq!(food.eat(Tile::new(1, 3)), Some(PelletKind::Energizer));
        assert_eq!(food.eat(Tile::new(1, 3)), None);
        assert_eq!(food.remaining(), 243);
        assert_eq!(food.eaten(), 1);
        assert_eq!(food.energizers().len(), 3);
        assert_eq!(food.pellet_at(Tile::new(1, 1)), Some(PelletKind::Pill));
    }

    #[test]
    fn empty_and_out_of_range_tiles_yield_nothing() {
        let maze = Maze::classic();
        let mut food = FoodGrid::from_maze(&maze);
        assert_eq!(food.eat(Tile::new(0, 0)), None);
        assert_eq!(food.eat(Tile::new(-3, 50)), None);
        assert_eq!(food.eat(Tile::new(13, 11)), None);
        assert_eq!(food.remaining(), 244);
    }

    #[test]
    fn consumed_tiles_drain_once() {
        let maze = Maze::classic();
        let mut food = FoodGrid::from_maze(&maze);
        food.eat(Tile::new(1, 1));
        food.eat(Tile::new(2, 1));
        assert_eq!(food.consumed().len(), 2);
        assert_eq!(food.drain_consumed(), vec![Tile::new(1, 1), Tile::new(2, 1)]);
        assert!(food.drain_consumed().is_empty());
    }
}
