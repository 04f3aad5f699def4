//! Static road topology
//!
//! The grid is carved once at construction and only read afterwards. Every
//! query is a bounds-checked lookup; anything outside the grid is "not road".

use rand::Rng;

use super::types::{GridPos, Heading};

pub const GRID_SIZE: i32 = 20;

/// Share of the non-road cells that are decorated as buildings
const BUILDING_DENSITY: f64 = 0.1;

/// Vertical lanes as (column, direction of travel)
const VERTICAL_LANES: [(i32, Heading); 4] = [
    (5, Heading::South),
    (6, Heading::North),
    (10, Heading::South),
    (11, Heading::North),
];

/// Horizontal lanes as (row, direction of travel)
const HORIZONTAL_LANES: [(i32, Heading); 2] = [(10, Heading::West), (11, Heading::East)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Road,
    Intersection,
    Building,
    Grass,
}

/// Inclusive bounding rectangle of an intersection block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Bounds {
    pub fn contains(&self, pos: GridPos) -> bool {
        (self.x_min..=self.x_max).contains(&pos.x) && (self.y_min..=self.y_max).contains(&pos.y)
    }
}

/// A lane end where new cars appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPoint {
    pub position: GridPos,
    pub heading: Heading,
}

#[derive(Debug, Clone)]
pub struct Map {
    width: i32,
    height: i32,
    /// Row-major cell kinds
    cells: Vec<CellKind>,
    intersection_cells: Vec<GridPos>,
    blocks: Vec<Bounds>,
    spawn_points: Vec<SpawnPoint>,
}

impl Map {
    /// Carve the fixed road layout. The RNG only decides where the cosmetic
    /// buildings go.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let width = GRID_SIZE;
        let height = GRID_SIZE;
        let mut cells = Vec::with_capacity((width * height) as usize);
        for _ in 0..width * height {
            let kind = if rng.random_bool(BUILDING_DENSITY) {
                CellKind::Building
            } else {
                CellKind::Grass
            };
            cells.push(kind);
        }

        let mut map = Self {
            width,
            height,
            cells,
            intersection_cells: Vec::new(),
            blocks: Vec::new(),
            spawn_points: Vec::new(),
        };

        for &(row, _) in &HORIZONTAL_LANES {
            for x in 0..width {
                map.set(GridPos::new(x, row), CellKind::Road);
            }
        }
        for &(column, _) in &VERTICAL_LANES {
            for y in 0..height {
                map.set(GridPos::new(column, y), CellKind::Road);
            }
        }

        // Each two-lane vertical road crosses the horizontal road in a 2x2 block
        for pair in VERTICAL_LANES.chunks(2) {
            let bounds = Bounds {
                x_min: pair[0].0,
                x_max: pair[1].0,
                y_min: HORIZONTAL_LANES[0].0,
                y_max: HORIZONTAL_LANES[1].0,
            };
            for y in bounds.y_min..=bounds.y_max {
                for x in bounds.x_min..=bounds.x_max {
                    let pos = GridPos::new(x, y);
                    map.set(pos, CellKind::Intersection);
                    map.intersection_cells.push(pos);
                }
            }
            map.blocks.push(bounds);
        }

        map.spawn_points = vec![
            SpawnPoint {
                position: GridPos::new(0, 11),
                heading: Heading::East,
            },
            SpawnPoint {
                position: GridPos::new(width - 1, 10),
                heading: Heading::West,
            },
            SpawnPoint {
                position: GridPos::new(10, 0),
                heading: Heading::South,
            },
            SpawnPoint {
                position: GridPos::new(11, height - 1),
                heading: Heading::North,
            },
            SpawnPoint {
                position: GridPos::new(5, 0),
                heading: Heading::South,
            },
            SpawnPoint {
                position: GridPos::new(6, height - 1),
                heading: Heading::North,
            },
        ];

        map
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    fn set(&mut self, pos: GridPos, kind: CellKind) {
        if let Some(index) = self.index(pos) {
            self.cells[index] = kind;
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        (0..self.width).contains(&pos.x) && (0..self.height).contains(&pos.y)
    }

    pub fn cell(&self, pos: GridPos) -> Option<CellKind> {
        self.index(pos).map(|index| self.cells[index])
    }

    /// True for both plain road and intersection cells
    pub fn is_road(&self, pos: GridPos) -> bool {
        matches!(
            self.cell(pos),
            Some(CellKind::Road) | Some(CellKind::Intersection)
        )
    }

    pub fn is_intersection(&self, pos: GridPos) -> bool {
        self.cell(pos) == Some(CellKind::Intersection)
    }

    /// Headings a car may leave this cell in. Plain road cells carry one lane
    /// direction, intersection cells the union of both crossing lanes.
    pub fn allowed_exit_directions(&self, pos: GridPos) -> Vec<Heading> {
        if !self.is_road(pos) {
            return Vec::new();
        }

        let vertical = VERTICAL_LANES
            .iter()
            .find(|(column, _)| *column == pos.x)
            .map(|(_, heading)| *heading);
        let horizontal = HORIZONTAL_LANES
            .iter()
            .find(|(row, _)| *row == pos.y)
            .map(|(_, heading)| *heading);

        vertical.into_iter().chain(horizontal).collect()
    }

    pub fn intersection_cells(&self) -> &[GridPos] {
        &self.intersection_cells
    }

    /// Bounding rectangles of the intersection blocks, in id order
    pub fn blocks(&self) -> &[Bounds] {
        &self.blocks
    }

    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }
}
