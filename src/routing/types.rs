use std::path::PathBuf;
use std::time::Duration;

use crate::geometry::{Direction, Point, Rect};
use crate::host::{LinkId, NodeId};

/// Where routed wires are drawn relative to node bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PresentationMode {
    Off,
    #[default]
    UnderContent,
    OverContent,
}

#[derive(Clone, PartialEq, Debug)]
pub struct RoutingConfig {
    pub grid_size: f64,
    /// Open-set pops allowed per route search.
    pub iteration_budget: usize,
    /// Wall-clock allowance for one recompute slice.
    pub time_budget: Duration,
    pub corner_price: f64,
    pub overlap_price_factor: f64,
    pub wrong_direction_cells: u32,
    pub line_overshoot_cells: u32,
    pub max_node_distance_cells: u32,
    pub max_path_distance_cells: u32,
    pub corner_radius: f64,
    /// Recomputes slower than this are debounced instead of run on draw.
    pub immediate_recompute_limit: Duration,
    pub enabled: bool,
    pub mode: PresentationMode,
    pub trace: bool,
    pub trace_path: Option<PathBuf>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            grid_size: 5.0,
            iteration_budget: 800,
            time_budget: Duration::from_millis(5),
            corner_price: 10.0,
            overlap_price_factor: 50.0,
            wrong_direction_cells: 60,
            line_overshoot_cells: 20,
            max_node_distance_cells: 20,
            max_path_distance_cells: 20,
            corner_radius: 10.0,
            immediate_recompute_limit: Duration::from_millis(100),
            enabled: true,
            mode: PresentationMode::UnderContent,
            trace: false,
            trace_path: None,
        }
    }
}

impl RoutingConfig {
    /// Defaults, with tracing switched on when `CIRCUIT_LINES_TRACE_JSON`
    /// names a file to dump the search trace into.
    pub fn from_env() -> Self {
        let trace_path = std::env::var_os("CIRCUIT_LINES_TRACE_JSON").map(PathBuf::from);
        RoutingConfig {
            trace: trace_path.is_some(),
            trace_path,
            ..Default::default()
        }
    }

    pub(crate) fn wrong_direction_distance(&self) -> f64 {
        self.wrong_direction_cells as f64 * self.grid_size
    }

    pub(crate) fn line_overshoot(&self) -> f64 {
        self.line_overshoot_cells as f64 * self.grid_size
    }

    pub(crate) fn max_node_distance(&self) -> f64 {
        self.max_node_distance_cells as f64 * self.grid_size
    }

    pub(crate) fn max_path_distance(&self) -> f64 {
        self.max_path_distance_cells as f64 * self.grid_size
    }
}

/// A cached wire: waypoints from the source connection point to the target
/// connection point, plus the endpoints it belongs to.
#[derive(Clone, PartialEq, Debug)]
pub struct RoutedPath {
    pub link: LinkId,
    pub points: Vec<Point>,
    pub source_node: NodeId,
    pub source_slot: usize,
    pub target_node: NodeId,
    pub target_slot: usize,
    pub bounds: Rect,
}

impl RoutedPath {
    pub fn new(
        link: LinkId,
        points: Vec<Point>,
        source: (NodeId, usize),
        target: (NodeId, usize),
    ) -> Self {
        let bounds = Rect::enclosing(&points).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        RoutedPath {
            link,
            points,
            source_node: source.0,
            source_slot: source.1,
            target_node: target.0,
            target_slot: target.1,
            bounds,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).map(|window| (window[0], window[1]))
    }

    /// True when this wire leaves the same output slot or enters the same
    /// input slot.
    pub fn shares_endpoint_with(&self, source: (NodeId, usize), target: (NodeId, usize)) -> bool {
        (self.source_node, self.source_slot) == source || (self.target_node, self.target_slot) == target
    }
}

/// Drops zero-length steps and interior points collinear with both
/// neighbours. The first and last point are always kept.
pub fn collapse_collinear(points: &[Point]) -> Vec<Point> {
    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if deduped.last() != Some(point) {
            deduped.push(*point);
        }
    }
    if deduped.len() < 3 {
        return deduped;
    }

    let mut result: Vec<Point> = Vec::with_capacity(deduped.len());
    result.push(deduped[0]);
    for index in 1..deduped.len() - 1 {
        let Some(&previous) = result.last() else {
            continue;
        };
        let current = deduped[index];
        let next = deduped[index + 1];
        let collinear = (previous.x == current.x && current.x == next.x)
            || (previous.y == current.y && current.y == next.y);
        if !collinear {
            result.push(current);
        }
    }
    result.push(deduped[deduped.len() - 1]);
    result.dedup();
    result
}

/// True when every step is a non-empty horizontal or vertical segment.
pub fn is_manhattan(points: &[Point]) -> bool {
    points
        .windows(2)
        .all(|window| Direction::between(&window[0], &window[1]).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collinear_and_duplicate_points_are_removed() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(20.0, 30.0),
        ];
        assert_eq!(
            collapse_collinear(&points),
            vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(20.0, 30.0)]
        );
    }

    #[test]
    fn backtracking_step_collapses_into_one_segment() {
        let points = [Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(10.0, 0.0)];
        assert_eq!(
            collapse_collinear(&points),
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]
        );
    }

    #[test]
    fn manhattan_check_rejects_diagonals_and_repeats() {
        assert!(is_manhattan(&[Point::new(0.0, 0.0), Point::new(0.0, 5.0), Point::new(5.0, 5.0)]));
        assert!(!is_manhattan(&[Point::new(0.0, 0.0), Point::new(5.0, 5.0)]));
        assert!(!is_manhattan(&[Point::new(0.0, 0.0), Point::new(0.0, 0.0)]));
    }

    #[test]
    fn default_distances_scale_with_grid() {
        let config = RoutingConfig::default();
        assert_eq!(config.iteration_budget, 800);
        assert_eq!(config.wrong_direction_distance(), 300.0);
        assert_eq!(config.line_overshoot(), 100.0);
    }
}
