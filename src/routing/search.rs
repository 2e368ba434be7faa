//! Best-first orthogonal route search.
//!
//! The open set holds two kinds of candidates. A confirmed candidate is a
//! priced waypoint the route can actually reach. A provisional candidate is an
//! unchecked stop on a directional probe; popping one resolves the whole probe
//! against the obstacles and turns the reachable stops into confirmed
//! candidates. The heuristic is not admissible, so the search is bounded by an
//! iteration budget instead of relying on optimality.

use std::cmp::{Ordering, Reverse};

use priority_queue::PriorityQueue;

use crate::error::RoutingError;
use crate::geometry::{snap_down, snap_up, Direction, Orientation, Point, Rect};

use super::obstacles::ObstacleMap;
use super::occupancy::OccupancyGrid;
use super::trace::{SearchTrace, TracedCandidate};
use super::types::{collapse_collinear, RoutingConfig};
use super::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Lowest total first, then lowest estimate, then insertion order.
type Priority = Reverse<(Cost, Cost, u64)>;

/// A straight piece of an already routed wire.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Span {
    /// Coordinate shared by both ends.
    fixed: f64,
    low: f64,
    high: f64,
}

/// Segments of wires that are already routed, split by orientation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutedSegments {
    horizontal: Vec<Span>,
    vertical: Vec<Span>,
}

impl RoutedSegments {
    /// Collects the segments of every path with a bend. Straight two-point
    /// wires are ignored.
    pub fn from_paths<'p>(paths: impl IntoIterator<Item = &'p [Point]>) -> Self {
        let mut segments = RoutedSegments::default();
        for points in paths {
            if points.len() <= 2 {
                continue;
            }
            for window in points.windows(2) {
                let (a, b) = (window[0], window[1]);
                if a.x == b.x && a.y != b.y {
                    segments.vertical.push(Span {
                        fixed: a.x,
                        low: a.y.min(b.y),
                        high: a.y.max(b.y),
                    });
                } else if a.y == b.y && a.x != b.x {
                    segments.horizontal.push(Span {
                        fixed: a.y,
                        low: a.x.min(b.x),
                        high: a.x.max(b.x),
                    });
                }
            }
        }
        segments
    }

    pub fn len(&self) -> usize {
        self.horizontal.len() + self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }

    /// Segments running along `orientation`.
    fn along(&self, orientation: Orientation) -> &[Span] {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CandidateKind {
    Confirmed,
    Provisional { group: usize, direction: Direction },
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    position: Point,
    /// Predecessor for confirmed candidates, probe origin for provisional ones.
    origin: Point,
    cost: f64,
    estimate: f64,
    kind: CandidateKind,
}

#[derive(Clone, Copy, Debug)]
struct Visit {
    from: Point,
    cost: f64,
}

fn perpendicular_distance(value: f64, low: f64, high: f64) -> f64 {
    if value >= low && value <= high {
        0.0
    } else {
        (value - low).abs().min((value - high).abs())
    }
}

fn point_on_line(origin: &Point, orientation: Orientation, along: f64) -> Point {
    match orientation {
        Orientation::Horizontal => Point::new(along, origin.y),
        Orientation::Vertical => Point::new(origin.x, along),
    }
}

struct RouteSearch<'a> {
    start: Point,
    end: Point,
    obstacles: &'a ObstacleMap,
    segments: &'a RoutedSegments,
    config: &'a RoutingConfig,
    candidates: Vec<Candidate>,
    open: PriorityQueue<usize, Priority>,
    groups: HashMap<usize, Vec<usize>>,
    visited: HashMap<Point, Visit>,
    explored: HashMap<(Point, Direction), f64>,
    occupancy: OccupancyGrid,
    best: Option<f64>,
    sequence: u64,
    next_group: usize,
    trace: Option<&'a mut SearchTrace>,
}

impl<'a> RouteSearch<'a> {
    fn new(
        start: Point,
        end: Point,
        obstacles: &'a ObstacleMap,
        segments: &'a RoutedSegments,
        config: &'a RoutingConfig,
        trace: Option<&'a mut SearchTrace>,
    ) -> Self {
        RouteSearch {
            start,
            end,
            obstacles,
            segments,
            config,
            candidates: Vec::new(),
            open: PriorityQueue::new(),
            groups: HashMap::default(),
            visited: HashMap::default(),
            explored: HashMap::default(),
            occupancy: OccupancyGrid::new(config.grid_size),
            best: None,
            sequence: 0,
            next_group: 0,
            trace,
        }
    }

    fn run(mut self) -> Result<Option<Vec<Point>>, RoutingError> {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.begin(self.start, self.end);
        }

        // The first leg is treated as a continuation of a rightward move.
        let lead_in = Point::new(self.start.x - 1.0, self.start.y);
        self.visited.insert(
            self.start,
            Visit {
                from: lead_in,
                cost: 0.0,
            },
        );
        self.occupancy.claim(&self.start);
        let estimate = self.heuristic(&self.start);
        self.push(Candidate {
            position: self.start,
            origin: lead_in,
            cost: 0.0,
            estimate,
            kind: CandidateKind::Confirmed,
        });

        let mut iterations = 0;
        while iterations < self.config.iteration_budget {
            let Some((id, Reverse((total, _, _)))) = self.open.pop() else {
                break;
            };
            if self.best.map_or(false, |best| total.0 >= best) {
                break;
            }
            iterations += 1;
            self.expand(id);
        }

        let result = match self.best {
            Some(_) => Some(self.reconstruct()?),
            None => None,
        };
        tracing::trace!(
            iterations,
            candidates = self.candidates.len(),
            found = result.is_some(),
            "route search finished"
        );
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.result = result.clone();
        }
        Ok(result)
    }

    fn heuristic(&self, position: &Point) -> f64 {
        let distance = position.manhattan_distance(&self.end);
        if position.x != self.end.x && position.y != self.end.y {
            distance + self.config.corner_price
        } else {
            distance
        }
    }

    fn push(&mut self, candidate: Candidate) -> Option<usize> {
        let total = candidate.cost + candidate.estimate;
        if self.best.map_or(false, |best| total >= best) {
            return None;
        }
        let id = self.candidates.len();
        self.candidates.push(candidate);
        self.open
            .push(id, Reverse((Cost(total), Cost(candidate.estimate), self.sequence)));
        self.sequence += 1;

        if let Some(trace) = self.trace.as_deref_mut() {
            trace.record_candidate(TracedCandidate {
                position: candidate.position,
                from: candidate.origin,
                cost: candidate.cost,
                estimate: candidate.estimate,
                confirmed: candidate.kind == CandidateKind::Confirmed,
            });
        }
        Some(id)
    }

    fn expand(&mut self, id: usize) {
        let candidate = self.candidates[id];
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.record_expansion(candidate.position);
        }
        match candidate.kind {
            CandidateKind::Confirmed => self.expand_confirmed(&candidate),
            CandidateKind::Provisional { group, direction } => {
                self.expand_provisional(id, &candidate, group, direction)
            }
        }
    }

    fn probe_targets(&self, position: &Point) -> Vec<Point> {
        let far = self.config.wrong_direction_distance();
        if position.is_axis_aligned_with(&self.end) {
            let toward = if position.x == self.end.x {
                Point::new(position.x, self.end.y)
            } else {
                Point::new(self.end.x, position.y)
            };
            let forward = Direction::between(position, &toward);
            let mut targets = vec![toward];
            for direction in [Direction::Down, Direction::Right, Direction::Up, Direction::Left] {
                if Some(direction) != forward {
                    targets.push(direction.step(position, far));
                }
            }
            targets
        } else {
            let dir_x = (self.end.x - position.x).signum();
            let dir_y = (self.end.y - position.y).signum();
            vec![
                Point::new(self.end.x, position.y),
                Point::new(position.x, self.end.y),
                Point::new(position.x, position.y - far * dir_y),
                Point::new(position.x - far * dir_x, position.y),
            ]
        }
    }

    fn expand_confirmed(&mut self, candidate: &Candidate) {
        let position = candidate.position;
        let Some(visit) = self.visited.get(&position).copied() else {
            return;
        };
        if candidate.cost > visit.cost {
            // A cheaper arrival at this waypoint was queued after this one.
            return;
        }
        if position == self.end {
            self.best = Some(self.best.map_or(visit.cost, |best| best.min(visit.cost)));
            return;
        }

        let incoming = Direction::between(&visit.from, &position);
        for target in self.probe_targets(&position) {
            let Some(direction) = Direction::between(&position, &target) else {
                continue;
            };
            if incoming.map(|incoming| incoming.opposite()) == Some(direction) {
                continue;
            }
            if let Some(&explored_cost) = self.explored.get(&(position, direction)) {
                if explored_cost <= visit.cost {
                    continue;
                }
            }
            self.explored.insert((position, direction), visit.cost);

            let reach = visit.cost + position.manhattan_distance(&target);
            if let Some(existing) = self.visited.get(&target) {
                if existing.cost <= reach {
                    continue;
                }
            }

            let corner = if Some(direction) != incoming {
                self.config.corner_price
            } else {
                0.0
            };
            let group = self.next_group;
            self.next_group += 1;
            let mut members = Vec::new();
            for stop in self.stops_on_line(&position, &target, direction) {
                let estimate = position.manhattan_distance(&stop) + corner + self.heuristic(&stop);
                let pushed = self.push(Candidate {
                    position: stop,
                    origin: position,
                    cost: visit.cost,
                    estimate,
                    kind: CandidateKind::Provisional { group, direction },
                });
                members.extend(pushed);
            }
            if !members.is_empty() {
                self.groups.insert(group, members);
            }
        }
    }

    /// Every point on the probe line where a route may want to turn: the
    /// probe target, just outside the edges of nearby obstacles, and on either
    /// side of routed wires crossing the line. Sorted by distance from
    /// `origin`.
    fn stops_on_line(&self, origin: &Point, target: &Point, direction: Direction) -> Vec<Point> {
        let grid = self.config.grid_size;
        let orientation = direction.orientation();
        let sign = direction.sign();
        let origin_along = origin.coord(orientation);
        let across = origin.coord(orientation.perpendicular());
        let limit = (target.coord(orientation) - origin_along).abs() + self.config.line_overshoot();

        let mut alongs: Vec<f64> = Vec::new();

        let node_reach = self.config.max_node_distance();
        let near_end = origin_along - sign * grid;
        let far_end = origin_along + sign * (limit + grid);
        let strip = match orientation {
            Orientation::Horizontal => Rect::new(
                near_end.min(far_end),
                across - node_reach,
                near_end.max(far_end),
                across + node_reach,
            ),
            Orientation::Vertical => Rect::new(
                across - node_reach,
                near_end.min(far_end),
                across + node_reach,
                near_end.max(far_end),
            ),
        };
        for obstacle in self.obstacles.intersecting(&strip) {
            let (low, high) = obstacle.area.span(orientation.perpendicular());
            if perpendicular_distance(across, low, high) > node_reach {
                continue;
            }
            let (near, far) = obstacle.area.span(orientation);
            alongs.push(snap_down(near, grid));
            alongs.push(snap_up(far, grid));
        }

        let path_reach = self.config.max_path_distance();
        for span in self.segments.along(orientation.perpendicular()) {
            if perpendicular_distance(across, span.low, span.high) > path_reach {
                continue;
            }
            alongs.push(((span.fixed / grid).floor() - 1.0) * grid);
            alongs.push(((span.fixed / grid).ceil() + 1.0) * grid);
        }

        let mut stops = vec![*target];
        for along in alongs {
            let offset = (along - origin_along) * sign;
            if offset <= 0.0 || offset > limit {
                continue;
            }
            stops.push(point_on_line(origin, orientation, along));
        }
        stops.sort_by(|a, b| {
            origin
                .manhattan_distance(a)
                .total_cmp(&origin.manhattan_distance(b))
        });
        stops.dedup();
        stops
    }

    /// The last grid line before `entry` when travelling from `origin`.
    fn stop_before(&self, origin: &Point, entry: &Point, direction: Direction) -> Option<Point> {
        let grid = self.config.grid_size;
        let orientation = direction.orientation();
        let along = entry.coord(orientation);
        let snapped = if direction.sign() > 0.0 {
            let snapped = snap_down(along, grid);
            if snapped >= along {
                snapped - grid
            } else {
                snapped
            }
        } else {
            let snapped = snap_up(along, grid);
            if snapped <= along {
                snapped + grid
            } else {
                snapped
            }
        };
        let offset = (snapped - origin.coord(orientation)) * direction.sign();
        (offset > 0.0).then(|| point_on_line(origin, orientation, snapped))
    }

    fn expand_provisional(&mut self, id: usize, candidate: &Candidate, group: usize, direction: Direction) {
        let members = self.groups.remove(&group).unwrap_or_else(|| vec![id]);
        for member in &members {
            if *member != id {
                self.open.remove(member);
            }
        }

        let origin = candidate.origin;
        let Some(visit) = self.visited.get(&origin).copied() else {
            return;
        };
        let mut stops: Vec<Point> = members
            .iter()
            .map(|member| self.candidates[*member].position)
            .collect();
        let Some(&furthest) = stops.last() else {
            return;
        };

        if let Some(blocking) = self.obstacles.nearest_blocking_obstacle(&origin, &furthest) {
            if blocking.entry == origin {
                return;
            }
            let limit = origin.manhattan_distance(&blocking.entry);
            stops.retain(|stop| origin.manhattan_distance(stop) < limit);
            if let Some(before) = self.stop_before(&origin, &blocking.entry, direction) {
                stops.push(before);
                stops.sort_by(|a, b| {
                    origin
                        .manhattan_distance(a)
                        .total_cmp(&origin.manhattan_distance(b))
                });
                stops.dedup();
            }
        }

        let orientation = direction.orientation();
        let corner = if Direction::between(&visit.from, &origin) != Some(direction) {
            self.config.corner_price
        } else {
            0.0
        };
        let across = origin.coord(orientation.perpendicular());
        let adjacent = self.config.grid_size / 2.0;
        let parallel: Vec<(f64, f64)> = self
            .segments
            .along(orientation)
            .iter()
            .filter(|span| (span.fixed - across).abs() <= adjacent)
            .map(|span| (span.low, span.high))
            .collect();

        let mut overlap = 0.0;
        let mut previous = origin.coord(orientation);
        for stop in stops {
            let along = stop.coord(orientation);
            let (low, high) = (previous.min(along), previous.max(along));
            overlap += parallel
                .iter()
                .map(|(span_low, span_high)| (span_high.min(high) - span_low.max(low)).max(0.0))
                .sum::<f64>();
            previous = along;

            let cost = visit.cost
                + origin.manhattan_distance(&stop)
                + corner
                + overlap * self.config.overlap_price_factor;
            self.confirm(stop, origin, cost);
        }
    }

    fn confirm(&mut self, position: Point, from: Point, cost: f64) {
        let estimate = self.heuristic(&position);
        if self.best.map_or(false, |best| cost + estimate >= best) {
            return;
        }
        match self.visited.get(&position) {
            Some(existing) if existing.cost <= cost => return,
            Some(_) => {}
            None => {
                let claimed = self.occupancy.claim(&position);
                if !claimed && position != self.end {
                    return;
                }
            }
        }
        self.visited.insert(position, Visit { from, cost });
        self.push(Candidate {
            position,
            origin: from,
            cost,
            estimate,
            kind: CandidateKind::Confirmed,
        });
    }

    fn reconstruct(&self) -> Result<Vec<Point>, RoutingError> {
        let mut path = vec![self.end];
        let mut current = self.end;
        while current != self.start {
            let visit = self
                .visited
                .get(&current)
                .filter(|_| path.len() <= self.visited.len())
                .ok_or(RoutingError::BrokenPredecessorChain {
                    x: current.x,
                    y: current.y,
                })?;
            current = visit.from;
            path.push(current);
        }
        path.reverse();
        Ok(collapse_collinear(&path))
    }
}

/// Searches for a Manhattan route from `start` to `end` that avoids
/// `obstacles` and keeps clear of `existing` wires.
///
/// Returns `Ok(None)` when no route completes within the iteration budget.
/// The returned waypoints always begin at `start` and end at `end`.
pub fn route(
    start: Point,
    end: Point,
    obstacles: &ObstacleMap,
    existing: &RoutedSegments,
    config: &RoutingConfig,
    trace: Option<&mut SearchTrace>,
) -> Result<Option<Vec<Point>>, RoutingError> {
    if !start.is_finite() || !end.is_finite() {
        return Err(RoutingError::NonFiniteCoordinate);
    }
    if start == end {
        return Ok(None);
    }
    RouteSearch::new(start, end, obstacles, existing, config, trace).run()
}
