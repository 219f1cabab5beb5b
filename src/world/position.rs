use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub u16);

/// One grid cell of one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub map: MapId,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellDelta {
    pub dx: i16,
    pub dy: i16,
}

impl Cell {
    pub fn new(map: MapId, x: u16, y: u16) -> Self {
        Self { map, x, y }
    }

    pub fn offset(self, delta: CellDelta) -> Option<Self> {
        let x = i32::from(self.x) + i32::from(delta.dx);
        let y = i32::from(self.y) + i32::from(delta.dy);

        if x < 0 || y < 0 {
            return None;
        }

        if x > i32::from(u16::MAX) || y > i32::from(u16::MAX) {
            return None;
        }

        Some(Self {
            map: self.map,
            x: x as u16,
            y: y as u16,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        self.offset(direction.delta())
    }

    /// Delta from `self` to `other`; `None` across maps.
    pub fn delta_to(self, other: Cell) -> Option<CellDelta> {
        if self.map != other.map {
            return None;
        }
        let dx = i32::from(other.x) - i32::from(self.x);
        let dy = i32::from(other.y) - i32::from(self.y);
        Some(CellDelta {
            dx: dx.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
            dy: dy.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
        })
    }
}

impl CellDelta {
    pub const ZERO: Self = Self { dx: 0, dy: 0 };

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

impl Direction {
    pub fn delta(self) -> CellDelta {
        match self {
            Direction::North => CellDelta { dx: 0, dy: -1 },
            Direction::East => CellDelta { dx: 1, dy: 0 },
            Direction::South => CellDelta { dx: 0, dy: 1 },
            Direction::West => CellDelta { dx: -1, dy: 0 },
            Direction::Northeast => CellDelta { dx: 1, dy: -1 },
            Direction::Northwest => CellDelta { dx: -1, dy: -1 },
            Direction::Southeast => CellDelta { dx: 1, dy: 1 },
            Direction::Southwest => CellDelta { dx: -1, dy: 1 },
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Northeast
                | Direction::Northwest
                | Direction::Southeast
                | Direction::Southwest
        )
    }
}
