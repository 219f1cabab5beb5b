use crate::world::position::{Direction, CellDelta};

/// Filled square of side `2 * radius + 1`, row-major from the top-left corner.
pub fn square_offsets(radius: u8) -> Vec<CellDelta> {
    let radius_i = i16::from(radius);
    let mut offsets = Vec::with_capacity(((2 * radius_i + 1) * (2 * radius_i + 1)) as usize);
    for dy in -radius_i..=radius_i {
        for dx in -radius_i..=radius_i {
            offsets.push(CellDelta { dx, dy });
        }
    }
    offsets
}

pub fn circle_offsets(radius: u8) -> Vec<CellDelta> {
    if radius == 0 {
        return vec![CellDelta::ZERO];
    }

    let radius_i = i16::from(radius);
    let mut offsets = Vec::new();
    for dy in -radius_i..=radius_i {
        for dx in -radius_i..=radius_i {
            if (dx * dx + dy * dy) <= radius_i * radius_i {
                offsets.push(CellDelta { dx, dy });
            }
        }
    }
    offsets
}

/// Straight wall of `2 * half_length + 1` cells through the origin, running
/// perpendicular to `facing`.
pub fn wall_offsets(facing: Direction, half_length: u8) -> Vec<CellDelta> {
    let facing = facing.delta();
    let (step_x, step_y) = (-facing.dy, facing.dx);
    let half = i16::from(half_length);
    (-half..=half)
        .map(|i| CellDelta {
            dx: step_x * i,
            dy: step_y * i,
        })
        .collect()
}

/// Offsets as given, without duplicates, keeping first-seen order.
pub fn explicit_offsets(cells: &[(i16, i16)]) -> Vec<CellDelta> {
    let mut offsets: Vec<CellDelta> = Vec::with_capacity(cells.len());
    for &(dx, dy) in cells {
        let delta = CellDelta { dx, dy };
        if !offsets.contains(&delta) {
            offsets.push(delta);
        }
    }
    offsets
}
