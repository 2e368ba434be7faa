use std::cmp::Ordering;

use rstar::{RTree, RTreeObject, AABB};

use crate::clipping::{clip_segment, ClipResult};
use crate::geometry::{BoundingBox, Point, Rect};
use crate::host::NodeId;

/// A node body that wires route around.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub node: NodeId,
    /// Node bounds grown by a grid cell and snapped to the grid.
    pub area: Rect,
    /// Position in top-to-bottom scan order.
    pub order: usize,
}

impl RTreeObject for Obstacle {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.area.top_left(), self.area.bottom_right())
    }
}

/// An obstacle crossed by a segment, with the point where the segment
/// first touches it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockingObstacle<'a> {
    pub obstacle: &'a Obstacle,
    pub entry: Point,
    pub exit: Point,
}

#[derive(Debug)]
pub struct ObstacleMap {
    obstacles: Vec<Obstacle>,
    tree: RTree<Obstacle>,
    grid_size: f64,
}

impl ObstacleMap {
    /// Inflates every node rectangle and orders the result by top edge.
    pub fn build(nodes: impl IntoIterator<Item = (NodeId, Rect)>, grid_size: f64) -> Self {
        let mut obstacles: Vec<Obstacle> = nodes
            .into_iter()
            .map(|(node, bounds)| Obstacle {
                node,
                area: bounds.inflate_to_grid(grid_size),
                order: 0,
            })
            .collect();
        obstacles.sort_by(|a, b| a.area.top.total_cmp(&b.area.top));
        for (order, obstacle) in obstacles.iter_mut().enumerate() {
            obstacle.order = order;
        }

        let tree = RTree::bulk_load(obstacles.clone());
        ObstacleMap {
            obstacles,
            tree,
            grid_size,
        }
    }

    pub fn empty(grid_size: f64) -> Self {
        ObstacleMap::build(std::iter::empty(), grid_size)
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Obstacles in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn get(&self, node: NodeId) -> Option<&Obstacle> {
        self.obstacles.iter().find(|obstacle| obstacle.node == node)
    }

    /// Obstacles whose area touches `region`, in scan order.
    pub fn intersecting(&self, region: &Rect) -> Vec<&Obstacle> {
        let envelope = AABB::from_corners(region.top_left(), region.bottom_right());
        let mut found: Vec<&Obstacle> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .collect();
        found.sort_by_key(|obstacle| obstacle.order);
        found
    }

    /// The first obstacle in scan order whose area strictly contains `point`.
    pub fn point_inside_obstacle(&self, point: &Point) -> Option<&Obstacle> {
        let envelope = AABB::from_point(*point);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|obstacle| obstacle.area.contains_strict(point))
            .min_by_key(|obstacle| obstacle.order)
    }

    /// The obstacle the segment `start -> end` runs into first.
    ///
    /// Candidates are ordered by how far along the segment they are entered,
    /// then by the distance of their center from `start`, then by scan order.
    pub fn nearest_blocking_obstacle(&self, start: &Point, end: &Point) -> Option<BlockingObstacle<'_>> {
        let envelope = AABB::from_corners(*start, *end);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|obstacle| match clip_segment(*start, *end, &obstacle.area) {
                ClipResult::Inside(clipped) => Some(BlockingObstacle {
                    obstacle,
                    entry: clipped.start,
                    exit: clipped.end,
                }),
                ClipResult::Outside => None,
            })
            .min_by(|a, b| compare_blocking(start, a, b))
    }
}

fn compare_blocking(start: &Point, a: &BlockingObstacle<'_>, b: &BlockingObstacle<'_>) -> Ordering {
    let entry_a = start.manhattan_distance(&a.entry);
    let entry_b = start.manhattan_distance(&b.entry);
    entry_a
        .total_cmp(&entry_b)
        .then_with(|| {
            let center_a = start.distance(&a.obstacle.area.center());
            let center_b = start.distance(&b.obstacle.area.center());
            center_a.total_cmp(&center_b)
        })
        .then_with(|| a.obstacle.order.cmp(&b.obstacle.order))
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn map() -> ObstacleMap {
        ObstacleMap::build(
            [
                (1, Rect::from_xywh(40.0, -20.0, 20.0, 40.0)),
                (2, Rect::from_xywh(200.0, -100.0, 50.0, 50.0)),
                (3, Rect::from_xywh(120.0, -20.0, 20.0, 40.0)),
            ],
            5.0,
        )
    }

    #[rstest]
    fn obstacles_are_sorted_by_top(map: ObstacleMap) {
        let nodes: Vec<NodeId> = map.iter().map(|obstacle| obstacle.node).collect();
        assert_eq!(nodes, vec![2, 1, 3]);
        assert_eq!(map.get(1).map(|obstacle| obstacle.area), Some(Rect::new(36.0, -24.0, 64.0, 24.0)));
    }

    #[rstest]
    #[case(Point::new(50.0, 0.0), Some(1))]
    #[case(Point::new(36.0, 0.0), None)]
    #[case(Point::new(35.0, 0.0), None)]
    #[case(Point::new(225.0, -75.0), Some(2))]
    fn point_inside_is_strict(map: ObstacleMap, #[case] point: Point, #[case] expected: Option<NodeId>) {
        assert_eq!(
            map.point_inside_obstacle(&point).map(|obstacle| obstacle.node),
            expected
        );
    }

    #[rstest]
    fn first_obstacle_along_the_segment_blocks(map: ObstacleMap) {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(300.0, 0.0);
        let blocking = map
            .nearest_blocking_obstacle(&start, &end)
            .expect("the segment crosses two obstacles");
        assert_eq!(blocking.obstacle.node, 1);
        assert_eq!(blocking.entry, Point::new(36.0, 0.0));

        let reversed = map
            .nearest_blocking_obstacle(&end, &start)
            .expect("the segment crosses two obstacles");
        assert_eq!(reversed.obstacle.node, 3);
    }

    #[rstest]
    fn segment_passing_between_obstacles_is_clear(map: ObstacleMap) {
        let start = Point::new(0.0, 30.0);
        let end = Point::new(300.0, 30.0);
        assert!(map.nearest_blocking_obstacle(&start, &end).is_none());
    }
}
