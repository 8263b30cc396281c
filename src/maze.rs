use std::collections::{BTreeSet, VecDeque};

use thiserror::Error;

use crate::constants::{HALF_TILE, TILE_SIZE};
use crate::types::{Direction, MazeInit, PelletKind, Tile};

pub const CLASSIC_LAYOUT: [&str; 31] = [
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.##### ## #####.######",
    "######.##### ## #####.######",
    "######.##          ##.######",
    "######.## ###--### ##.######",
    "######.## #pppppp# ##.######",
    "tttttt.   #pppppp#   .tttttt",
    "######.## #pppppp# ##.######",
    "######.## ######## ##.######",
    "######.##          ##.######",
    "######.## ######## ##.######",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#.####.#####.##.#####.####.#",
    "#o..##.......  .......##..o#",
    "###.##.##.########.##.##.###",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Wall,
    Path,
    PelletPath,
    Intersection,
    IntersectionWithPellet,
    Tunnel,
    PenDoor,
    Pen,
}

impl CellKind {
    fn is_open(self) -> bool {
        matches!(
            self,
            Self::Path
                | Self::PelletPath
                | Self::Intersection
                | Self::IntersectionWithPellet
                | Self::Tunnel
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze layout is empty")]
    Empty,
    #[error("row {row} has width {found}, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at ({x},{y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("maze has no pen door")]
    MissingPenDoor,
    #[error("pen door cells must sit on one row")]
    ScatteredPenDoor,
}

/// Pixel anchors of the ghost pen, all derived from the door cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenGeometry {
    pub door_x: f64,
    pub exit_y: f64,
    pub home_y: f64,
    /// Home slot x positions: left, centre, right.
    pub slots: [f64; 3],
    /// Open tiles directly above the door; eyes reaching either start the entry script.
    pub entry_tiles: [Tile; 2],
}

#[derive(Clone, Debug)]
pub struct Maze {
    width: i32,
    height: i32,
    rows: Vec<String>,
    cells: Vec<CellKind>,
    turns: Vec<Vec<Direction>>,
    pellet_cells: Vec<Option<PelletKind>>,
    pellets: Vec<(Tile, PelletKind)>,
    pen: PenGeometry,
}

impl Maze {
    pub fn classic() -> Self {
        Self::parse(&CLASSIC_LAYOUT).expect("classic layout is valid")
    }

    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, MazeError> {
        let rows: Vec<String> = rows.iter().map(|row| row.as_ref().to_string()).collect();
        let Some(first) = rows.first() else {
            return Err(MazeError::Empty);
        };
        let width = first.chars().count();
        if width == 0 {
            return Err(MazeError::Empty);
        }

        let mut glyph_cells = Vec::with_capacity(width * rows.len());
        let mut pellets = Vec::new();
        let mut door_cells = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(MazeError::Ragged {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let tile = Tile::new(x as i32, y as i32);
                let kind = match glyph {
                    '#' => CellKind::Wall,
                    ' ' => CellKind::Path,
                    't' => CellKind::Tunnel,
                    'p' => CellKind::Pen,
                    '-' => {
                        door_cells.push(tile);
                        CellKind::PenDoor
                    }
                    '.' => {
                        pellets.push((tile, PelletKind::Pill));
                        CellKind::PelletPath
                    }
                    'o' => {
                        pellets.push((tile, PelletKind::Energizer));
                        CellKind::PelletPath
                    }
                    _ => return Err(MazeError::UnknownGlyph { glyph, x, y }),
                };
                glyph_cells.push(kind);
            }
        }

        let pen = pen_geometry(&door_cells)?;
        let mut pellet_cells = vec![None; glyph_cells.len()];
        for (tile, kind) in &pellets {
            pellet_cells[tile.y as usize * width + tile.x as usize] = Some(*kind);
        }
        let mut maze = Self {
            width: width as i32,
            height: rows.len() as i32,
            rows,
            cells: glyph_cells,
            turns: Vec::new(),
            pellet_cells,
            pellets,
            pen,
        };
        maze.build_turn_table();
        Ok(maze)
    }

    fn build_turn_table(&mut self) {
        let mut turns = vec![Vec::new(); self.cells.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                let tile = Tile::new(x, y);
                if !self.is_open(tile) {
                    continue;
                }
                let exits: Vec<Direction> = Direction::TURN_ORDER
                    .into_iter()
                    .filter(|dir| self.is_open(self.neighbor(tile, *dir)))
                    .collect();
                let corner = exits.iter().any(|a| exits.iter().any(|b| a.is_perpendicular_to(*b)));
                let idx = self.index(tile);
                if corner {
                    self.cells[idx] = match self.cells[idx] {
                        CellKind::PelletPath => CellKind::IntersectionWithPellet,
                        CellKind::Path => CellKind::Intersection,
                        other => other,
                    };
                }
                turns[idx] = exits;
            }
        }
        self.turns = turns;
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pixel_width(&self) -> f64 {
        self.width as f64 * TILE_SIZE
    }

    pub fn pen(&self) -> &PenGeometry {
        &self.pen
    }

    pub fn initial_pellets(&self) -> &[(Tile, PelletKind)] {
        &self.pellets
    }

    fn index(&self, tile: Tile) -> usize {
        (tile.y * self.width + tile.x) as usize
    }

    fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    pub fn cell(&self, tile: Tile) -> CellKind {
        if !self.in_bounds(tile) {
            return CellKind::Wall;
        }
        self.cells[self.index(tile)]
    }

    pub fn is_wall(&self, tile: Tile) -> bool {
        self.cell(tile) == CellKind::Wall
    }

    /// Open to free-roaming agents; the pen and its door are script-only.
    pub fn is_open(&self, tile: Tile) -> bool {
        self.cell(tile).is_open()
    }

    pub fn is_tunnel(&self, tile: Tile) -> bool {
        self.cell(tile) == CellKind::Tunnel
    }

    pub fn is_intersection(&self, tile: Tile) -> bool {
        matches!(
            self.cell(tile),
            CellKind::Intersection | CellKind::IntersectionWithPellet
        )
    }

    /// Whether the layout placed a pellet here; live state belongs to the food grid.
    pub fn has_pellet(&self, tile: Tile) -> bool {
        self.pellet_at(tile).is_some()
    }

    pub fn pellet_at(&self, tile: Tile) -> Option<PelletKind> {
        if !self.in_bounds(tile) {
            return None;
        }
        self.pellet_cells[self.index(tile)]
    }

    pub fn turns_at(&self, tile: Tile) -> &[Direction] {
        if !self.in_bounds(tile) {
            return &[];
        }
        &self.turns[self.index(tile)]
    }

    pub fn tile_center(&self, tile: Tile) -> (f64, f64) {
        (
            tile.x as f64 * TILE_SIZE + HALF_TILE,
            tile.y as f64 * TILE_SIZE + HALF_TILE,
        )
    }

    pub fn wrap_tunnel_x(&self, x: f64) -> f64 {
        let span = self.pixel_width();
        if x < 0.0 {
            x + span
        } else if x >= span {
            x - span
        } else {
            x
        }
    }

    pub fn tile_at(&self, x: f64, y: f64) -> Tile {
        Tile::new((x / TILE_SIZE).floor() as i32, (y / TILE_SIZE).floor() as i32)
    }

    /// Adjacent tile; columns wrap so tunnel exits meet.
    pub fn neighbor(&self, tile: Tile, dir: Direction) -> Tile {
        let next = tile.offset(dir, 1);
        Tile::new(next.x.rem_euclid(self.width), next.y)
    }

    pub fn open_tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| Tile::new(x, y)))
            .filter(|tile| self.is_open(*tile))
    }

    pub fn reachable_from(&self, start: Tile) -> BTreeSet<Tile> {
        let mut seen = BTreeSet::new();
        if !self.is_open(start) {
            return seen;
        }
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(tile) = queue.pop_front() {
            for dir in self.turns_at(tile) {
                let next = self.neighbor(tile, *dir);
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    pub fn to_maze_init(&self) -> MazeInit {
        MazeInit {
            width: self.width,
            height: self.height,
            tile_size: TILE_SIZE,
            tiles: self.rows.clone(),
            pellets: self
                .pellets
                .iter()
                .filter(|(_, kind)| *kind == PelletKind::Pill)
                .map(|(tile, _)| *tile)
                .collect(),
            energizers: self
                .pellets
                .iter()
                .filter(|(_, kind)| *kind == PelletKind::Energizer)
                .map(|(tile, _)| *tile)
                .collect(),
        }
    }
}

fn pen_geometry(door_cells: &[Tile]) -> Result<PenGeometry, MazeError> {
    let Some(first) = door_cells.first() else {
        return Err(MazeError::MissingPenDoor);
    };
    if door_cells.iter().any(|tile| tile.y != first.y) {
        return Err(MazeError::ScatteredPenDoor);
    }
    let min_x = door_cells.iter().map(|tile| tile.x).min().unwrap_or(first.x);
    let max_x = door_cells.iter().map(|tile| tile.x).max().unwrap_or(first.x);
    let door_row = first.y;
    let door_x = (min_x + max_x + 1) as f64 * TILE_SIZE / 2.0;
    Ok(PenGeometry {
        door_x,
        exit_y: (door_row - 1) as f64 * TILE_SIZE + HALF_TILE,
        home_y: (door_row + 2) as f64 * TILE_SIZE + HALF_TILE,
        slots: [door_x - 2.0 * TILE_SIZE, door_x, door_x + 2.0 * TILE_SIZE],
        entry_tiles: [Tile::new(min_x, door_row - 1), Tile::new(max_x, door_row - 1)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_layout_counts_pellets() {
        let maze = Maze::classic();
        assert_eq!(maze.width(), 28);
        assert_eq!(maze.height(), 31);
        let energizers = maze
            .initial_pellets()
            .iter()
            .filter(|(_, kind)| *kind == PelletKind::Energizer)
            .count();
        assert_eq!(maze.initial_pellets().len(), 244);
        assert_eq!(energizers, 4);
        assert_eq!(maze.pellet_at(Tile::new(1, 3)), Some(PelletKind::Energizer));
        assert!(maze.has_pellet(Tile::new(1, 1)));
        assert!(!maze.has_pellet(Tile::new(13, 11)));
    }

    #[test]
    fn classic_layout_is_mirror_symmetric() {
        for row in CLASSIC_LAYOUT {
            let mirrored: String = row.chars().rev().collect();
            assert_eq!(row, mirrored);
        }
    }

    #[test]
    fn every_open_tile_is_reachable_from_player_start() {
        let maze = Maze::classic();
        let reachable = maze.reachable_from(Tile::new(14, 23));
        for tile in maze.open_tiles() {
            assert!(reachable.contains(&tile), "unreachable tile {tile:?}");
        }
        for (tile, _) in maze.initial_pellets() {
            assert!(reachable.contains(tile));
        }
    }

    #[test]
    fn intersections_have_turn_entries() {
        let maze = Maze::classic();
        let mut count = 0;
        for tile in maze.open_tiles() {
            if maze.is_intersection(tile) {
                count += 1;
                assert!(!maze.turns_at(tile).is_empty());
            }
        }
        assert!(count > 0);
        assert!(maze.is_intersection(Tile::new(6, 5)));
        assert_eq!(
            maze.turns_at(Tile::new(6, 5)),
            &[Direction::Up, Direction::Left, Direction::Down, Direction::Right]
        );
        assert!(!maze.is_intersection(Tile::new(3, 5)));
    }

    #[test]
    fn tunnel_wraps_both_ways() {
        let maze = Maze::classic();
        assert!(maze.is_tunnel(Tile::new(0, 14)));
        assert!(maze.is_tunnel(Tile::new(27, 14)));
        assert_eq!(maze.neighbor(Tile::new(0, 14), Direction::Left), Tile::new(27, 14));
        assert_eq!(maze.neighbor(Tile::new(27, 14), Direction::Right), Tile::new(0, 14));
        assert!(maze.turns_at(Tile::new(0, 14)).contains(&Direction::Left));
        assert_eq!(maze.wrap_tunnel_x(-1.0), 223.0);
        assert_eq!(maze.wrap_tunnel_x(224.0), 0.0);
        assert_eq!(maze.wrap_tunnel_x(100.0), 100.0);
    }

    #[test]
    fn out_of_bounds_is_not_traversable() {
        let maze = Maze::classic();
        assert!(maze.is_wall(Tile::new(-1, 5)));
        assert!(maze.is_wall(Tile::new(3, 40)));
        assert!(!maze.is_open(Tile::new(3, -1)));
        assert!(maze.turns_at(Tile::new(99, 99)).is_empty());
    }

    #[test]
    fn pen_geometry_comes_from_door_cells() {
        let maze = Maze::classic();
        let pen = maze.pen();
        assert_eq!(pen.door_x, 112.0);
        assert_eq!(pen.exit_y, 92.0);
        assert_eq!(pen.home_y, 116.0);
        assert_eq!(pen.slots, [96.0, 112.0, 128.0]);
        assert_eq!(pen.entry_tiles, [Tile::new(13, 11), Tile::new(14, 11)]);
        assert!(!maze.is_open(Tile::new(13, 12)));
        assert!(!maze.is_wall(Tile::new(13, 12)));
    }

    #[test]
    fn tile_center_and_lookup_agree() {
        let maze = Maze::classic();
        let (x, y) = maze.tile_center(Tile::new(14, 23));
        assert_eq!((x, y), (116.0, 188.0));
        assert_eq!(maze.tile_at(x, y), Tile::new(14, 23));
        assert_eq!(maze.tile_at(112.0, 188.0), Tile::new(14, 23));
        assert_eq!(maze.tile_at(111.9, 188.0), Tile::new(13, 23));
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        let empty: [&str; 0] = [];
        assert_eq!(Maze::parse(&empty).err(), Some(MazeError::Empty));
        assert_eq!(
            Maze::parse(&["###", "##"]).err(),
            Some(MazeError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            Maze::parse(&["#x#"]).err(),
            Some(MazeError::UnknownGlyph {
                glyph: 'x',
                x: 1,
                y: 0
            })
        );
        assert_eq!(Maze::parse(&["#.#"]).err(), Some(MazeError::MissingPenDoor));
    }

    #[test]
    fn maze_init_lists_pills_and_energizers_separately() {
        let init = Maze::classic().to_maze_init();
        assert_eq!(init.pellets.len(), 240);
        assert_eq!(init.energizers.len(), 4);
        assert_eq!(init.tiles.len(), 31);
        assert_eq!(init.tile_size, TILE_SIZE);
    }
}
