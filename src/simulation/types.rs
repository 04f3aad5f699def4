//! Core types for the grid traffic simulation
//!
//! Plain value types shared by the map, the lights and the cars.

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub usize);

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectionId(pub usize);

/// A cell coordinate on the grid. `(0, 0)` is the top-left corner and `y`
/// grows southwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in the given direction
    pub fn step(self, heading: Heading) -> GridPos {
        let (dx, dy) = heading.delta();
        GridPos::new(self.x + dx, self.y + dy)
    }
}

/// Which flow a light gates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// Direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    North,
    South,
    East,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::South, Heading::East, Heading::West];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::South => (0, 1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Heading::North | Heading::South => Axis::Vertical,
            Heading::East | Heading::West => Axis::Horizontal,
        }
    }

    pub fn opposite(self) -> Heading {
        match self {
            Heading::North => Heading::South,
            Heading::South => Heading::North,
            Heading::East => Heading::West,
            Heading::West => Heading::East,
        }
    }

    /// The heading reached by turning right
    pub fn right(self) -> Heading {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }

    pub fn left(self) -> Heading {
        self.right().opposite()
    }

    pub fn is_perpendicular_to(self, other: Heading) -> bool {
        self.axis() != other.axis()
    }

    /// Classify `next` relative to this heading. `None` means a U-turn.
    pub fn turn_to(self, next: Heading) -> Option<Turn> {
        if next == self {
            Some(Turn::Straight)
        } else if next == self.right() {
            Some(Turn::Right)
        } else if next == self.left() {
            Some(Turn::Left)
        } else {
            None
        }
    }

    /// Single-character arrow used by the terminal map
    pub fn arrow(self) -> char {
        match self {
            Heading::North => '^',
            Heading::South => 'v',
            Heading::East => '>',
            Heading::West => '<',
        }
    }
}

/// A manoeuvre relative to the current heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Straight,
    Left,
    Right,
}

/// Ticks a car must spend inside an intersection before it may ignore a
/// blocking car that sits outside any intersection
pub const FOLLOWING_OVERRIDE_TICKS: u32 = 3;

/// Ticks a car must spend inside an intersection before it reroutes onto any
/// free exit
pub const DEADLOCK_ESCAPE_TICKS: u32 = 5;

/// Cells counted on each approach by the queue observation
pub const QUEUE_WINDOW_CELLS: i32 = 5;

/// Seconds of history kept by the rolling statistics
pub const ROLLING_WINDOW_SECONDS: usize = 10;
