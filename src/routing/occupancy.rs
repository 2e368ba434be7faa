use crate::geometry::Point;

use super::HashSet;

/// Sparse record of grid cells already holding a search waypoint.
#[derive(Debug)]
pub(crate) struct OccupancyGrid {
    grid_size: f64,
    claimed: HashSet<(i64, i64)>,
}

impl OccupancyGrid {
    pub fn new(grid_size: f64) -> Self {
        OccupancyGrid {
            grid_size,
            claimed: HashSet::default(),
        }
    }

    fn cell(&self, point: &Point) -> (i64, i64) {
        (
            (point.x / self.grid_size).floor() as i64,
            (point.y / self.grid_size).floor() as i64,
        )
    }

    /// Claims the cell holding `point`. Returns `false` when it was taken.
    pub fn claim(&mut self, point: &Point) -> bool {
        let cell = self.cell(point);
        self.claimed.insert(cell)
    }
}
