use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::error::RoutingError;
use crate::geometry::{snap_down, snap_up, Point};
use crate::host::{HostGraph, LinkId, SlotKind};

use super::cache::PathCache;
use super::obstacles::ObstacleMap;
use super::search::route;
use super::trace::{build_pass_trace, SearchTrace};
use super::tracker::ChangeTracker;
use super::types::{collapse_collinear, RoutedPath, RoutingConfig};

/// Counts describing what a pass found to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub changed_nodes: usize,
    pub changed_links: usize,
    pub removed_links: usize,
    pub dirty: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing changed and nothing was pending.
    Unchanged,
    Complete { routed: usize },
    /// The slice ran out of time; call `run_slice` again to continue.
    Yielded { remaining: usize },
    /// The pass could not start, see the log for the reason.
    Aborted,
}

/// The dirty links of a pass that have not been routed yet.
#[derive(Clone, Debug, Default)]
pub struct RecomputeTask {
    queue: VecDeque<LinkId>,
    elapsed: Duration,
    routed: usize,
}

impl RecomputeTask {
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn routed(&self) -> usize {
        self.routed
    }

    /// Time spent routing so far, summed over every slice.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

fn checked_config(mut config: RoutingConfig) -> RoutingConfig {
    if !(config.grid_size.is_finite() && config.grid_size > 0.0) {
        let fallback = RoutingConfig::default().grid_size;
        warn!(grid_size = config.grid_size, fallback, "grid size must be positive, using the default");
        config.grid_size = fallback;
    }
    config
}

/// Out of the source node, along to the target's row, into the target node.
/// When both connection points coincide the legs are kept uncollapsed so the
/// wire still has two or more points.
fn fallback_route(source: Point, source_projection: Point, target_projection: Point, target: Point) -> Vec<Point> {
    let legs = [
        source,
        source_projection,
        Point::new(source_projection.x, target.y),
        target_projection,
        target,
    ];
    let collapsed = collapse_collinear(&legs);
    if collapsed.len() >= 2 {
        return collapsed;
    }
    let mut points = legs.to_vec();
    points.dedup();
    points
}

/// Keeps the wire of every link in a host graph up to date.
///
/// A pass starts with [`LinkRouter::begin_pass`], which snapshots the
/// obstacles and decides which links are dirty, and is then driven by
/// [`LinkRouter::run_slice`] until it completes.
#[derive(Debug)]
pub struct LinkRouter {
    config: RoutingConfig,
    obstacles: ObstacleMap,
    cache: PathCache,
    tracker: ChangeTracker,
    task: Option<RecomputeTask>,
    traces: IndexMap<LinkId, SearchTrace>,
    last_calc_time: Duration,
}

impl Default for LinkRouter {
    fn default() -> Self {
        LinkRouter::new(RoutingConfig::default())
    }
}

impl LinkRouter {
    /// Creates a router with an empty cache. A grid size that is not a
    /// positive number is replaced by the default one.
    pub fn new(config: RoutingConfig) -> Self {
        let config = checked_config(config);
        LinkRouter {
            obstacles: ObstacleMap::empty(config.grid_size),
            config,
            cache: PathCache::new(),
            tracker: ChangeTracker::new(),
            task: None,
            traces: IndexMap::new(),
            last_calc_time: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Replaces the configuration. Every wire is routed again on the next
    /// pass.
    pub fn set_config(&mut self, config: RoutingConfig) {
        self.config = checked_config(config);
        self.reset();
    }

    /// Drops every cached wire and snapshot.
    pub fn reset(&mut self) {
        self.obstacles = ObstacleMap::empty(self.config.grid_size);
        self.cache.clear();
        self.tracker.reset();
        self.task = None;
        self.traces.clear();
    }

    pub fn obstacles(&self) -> &ObstacleMap {
        &self.obstacles
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn paths(&self) -> impl Iterator<Item = &RoutedPath> {
        self.cache.iter()
    }

    pub fn path(&self, link: LinkId) -> Option<&RoutedPath> {
        self.cache.get(link)
    }

    /// Duration of the last pass that ran to completion.
    pub fn last_calc_time(&self) -> Duration {
        self.last_calc_time
    }

    pub fn has_pending(&self) -> bool {
        self.task.is_some()
    }

    pub fn pending(&self) -> Option<&RecomputeTask> {
        self.task.as_ref()
    }

    /// Search traces of the current pass, populated when `config.trace` is set.
    pub fn traces(&self) -> &IndexMap<LinkId, SearchTrace> {
        &self.traces
    }

    /// Rebuilds the obstacle map from the host, diffs it against the previous
    /// pass and queues every dirty link. Links still queued from a yielded
    /// pass are kept at the front of the queue.
    pub fn begin_pass<H: HostGraph + ?Sized>(&mut self, host: &H) -> Result<PassSummary, RoutingError> {
        let links = host.links().ok_or(RoutingError::MissingLinkTable)?;

        let grid_size = self.config.grid_size;
        self.obstacles = ObstacleMap::build(
            host.execution_order().into_iter().filter_map(|node| {
                host.node_bounds(node)
                    .filter(|bounds| bounds.is_finite())
                    .map(|bounds| (node, bounds))
            }),
            grid_size,
        );
        let changes = self.tracker.diff(&self.obstacles, &links, &mut self.cache);
        let summary = PassSummary {
            changed_nodes: changes.changed_nodes.len(),
            changed_links: changes.changed_links.len(),
            removed_links: changes.removed_links.len(),
            dirty: changes.dirty.len(),
        };
        debug!(
            changed_nodes = summary.changed_nodes,
            changed_links = summary.changed_links,
            removed_links = summary.removed_links,
            dirty = summary.dirty,
            "routing pass started"
        );

        let residue = self.task.take();
        if residue.is_none() {
            if changes.dirty.is_empty() {
                return Ok(summary);
            }
            self.traces.clear();
        }

        let present: IndexSet<LinkId> = links.iter().map(|(link, _)| *link).collect();
        let mut task = residue.unwrap_or_default();
        let mut queued: IndexSet<LinkId> = task
            .queue
            .drain(..)
            .filter(|link| present.contains(link))
            .collect();
        queued.extend(changes.dirty);
        task.queue = queued.into_iter().collect();

        if !task.queue.is_empty() {
            self.task = Some(task);
        }
        Ok(summary)
    }

    /// Routes queued links until `budget` is spent. At least one link is
    /// routed per call, so every slice makes progress.
    pub fn run_slice<H: HostGraph + ?Sized>(&mut self, host: &H, budget: Duration) -> PassOutcome {
        let Some(mut task) = self.task.take() else {
            return PassOutcome::Unchanged;
        };

        let started = Instant::now();
        while let Some(link) = task.queue.pop_front() {
            self.refresh_link(host, link);
            task.routed += 1;
            if started.elapsed() >= budget {
                break;
            }
        }
        task.elapsed += started.elapsed();

        if !task.queue.is_empty() {
            let remaining = task.queue.len();
            debug!(routed = task.routed, remaining, "routing slice yielded");
            self.task = Some(task);
            return PassOutcome::Yielded { remaining };
        }

        self.last_calc_time = task.elapsed;
        debug!(
            routed = task.routed,
            elapsed_us = task.elapsed.as_micros() as u64,
            "routing pass complete"
        );
        if self.config.trace {
            if let Some(path) = self.config.trace_path.clone() {
                if let Err(error) = self.write_trace(&path) {
                    warn!(%error, "could not write routing trace");
                }
            }
        }
        PassOutcome::Complete { routed: task.routed }
    }

    /// Starts a pass and runs its first slice within `config.time_budget`.
    pub fn recompute<H: HostGraph + ?Sized>(&mut self, host: &H) -> PassOutcome {
        match self.begin_pass(host) {
            Ok(_) => self.run_slice(host, self.config.time_budget),
            Err(error) => {
                warn!(%error, "routing pass aborted");
                PassOutcome::Aborted
            }
        }
    }

    /// Starts a pass and routes every dirty link without yielding.
    pub fn recompute_to_completion<H: HostGraph + ?Sized>(&mut self, host: &H) -> PassOutcome {
        if let Err(error) = self.begin_pass(host) {
            warn!(%error, "routing pass aborted");
            return PassOutcome::Aborted;
        }
        self.run_slice(host, Duration::MAX)
    }

    fn refresh_link<H: HostGraph + ?Sized>(&mut self, host: &H, link: LinkId) {
        match self.route_link(host, link) {
            Ok(path) => {
                self.cache.insert(path);
            }
            Err(error) => {
                warn!(link, %error, "link not routed");
                self.cache.remove(link);
            }
        }
    }

    /// Computes the wire for one link against the current obstacle map and
    /// cache. Falls back to a fixed three-leg route when the search cannot
    /// improve on it.
    pub fn route_link<H: HostGraph + ?Sized>(&mut self, host: &H, link: LinkId) -> Result<RoutedPath, RoutingError> {
        let dangling = || RoutingError::DanglingLink(link);

        let endpoints = host.link(link).ok_or_else(dangling)?;
        let source_area = self.obstacles.get(endpoints.origin_id).ok_or_else(dangling)?.area;
        let target_area = self.obstacles.get(endpoints.target_id).ok_or_else(dangling)?.area;
        if !host.owns_output_link(endpoints.origin_id, link) {
            return Err(dangling());
        }
        let source = host
            .slot_position(endpoints.origin_id, SlotKind::Output, endpoints.origin_slot)
            .filter(Point::is_finite)
            .ok_or_else(dangling)?;
        let target = host
            .slot_position(endpoints.target_id, SlotKind::Input, endpoints.target_slot)
            .filter(Point::is_finite)
            .ok_or_else(dangling)?;

        let grid_size = self.config.grid_size;
        let source_projection = Point::new(snap_up(source_area.right, grid_size), source.y);
        let target_projection = Point::new(snap_down(target_area.left, grid_size), target.y);
        let source_key = (endpoints.origin_id, endpoints.origin_slot);
        let target_key = (endpoints.target_id, endpoints.target_slot);

        let blocked = self
            .obstacles
            .point_inside_obstacle(&source_projection)
            .or_else(|| self.obstacles.point_inside_obstacle(&target_projection))
            .map(|obstacle| obstacle.node);

        let found = match blocked {
            Some(node) => {
                debug!(link, node, "connection point is covered by a node");
                None
            }
            None => {
                let existing = self.cache.segments_excluding(source_key, target_key);
                let mut trace = self.config.trace.then(SearchTrace::default);
                let result = route(
                    source_projection,
                    target_projection,
                    &self.obstacles,
                    &existing,
                    &self.config,
                    trace.as_mut(),
                );
                if let Some(trace) = trace {
                    self.traces.insert(link, trace);
                }
                match result {
                    Ok(path) => path,
                    Err(error) => {
                        warn!(link, %error, "route search failed");
                        None
                    }
                }
            }
        };

        let routed = found.filter(|path| path.len() > 2).and_then(|path| {
            let mut points = Vec::with_capacity(path.len() + 2);
            points.push(source);
            points.extend(path);
            points.push(target);
            let points = collapse_collinear(&points);
            (points.len() >= 2).then_some(points)
        });
        let points = match routed {
            Some(points) => {
                debug!(link, waypoints = points.len(), "route found");
                points
            }
            None => {
                debug!(link, "using fallback route");
                fallback_route(source, source_projection, target_projection, target)
            }
        };
        Ok(RoutedPath::new(link, points, source_key, target_key))
    }

    /// Writes obstacles, cached wires and the search traces of the last pass
    /// as pretty-printed JSON.
    pub fn write_trace(&self, path: &Path) -> Result<(), RoutingError> {
        let trace = build_pass_trace(&self.obstacles, self.cache.iter(), self.traces.iter());
        let serialized = serde_json::to_string_pretty(&trace)?;
        fs::write(path, serialized).map_err(|source| RoutingError::TraceIo {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::geometry::Rect;
    use crate::host::GraphSnapshot;
    use crate::routing::types::is_manhattan;

    #[fixture]
    fn graph() -> GraphSnapshot {
        let mut graph = GraphSnapshot::new();
        graph
            .add_node(1, Rect::from_xywh(0.0, 0.0, 100.0, 60.0), 0, 1)
            .add_node(2, Rect::from_xywh(300.0, 100.0, 100.0, 60.0), 1, 0);
        graph.connect_with_id(10, 1, 0, 2, 0);
        graph
    }

    #[rstest]
    fn first_pass_routes_every_link(graph: GraphSnapshot) {
        let mut router = LinkRouter::default();
        let outcome = router.recompute_to_completion(&graph);
        assert_eq!(outcome, PassOutcome::Complete { routed: 1 });

        let path = router.path(10).expect("link 10 is routed");
        assert_eq!(path.points.first(), Some(&Point::new(100.0, 10.0)));
        assert_eq!(path.points.last(), Some(&Point::new(300.0, 110.0)));
        assert!(is_manhattan(&path.points));
        assert!(!router.has_pending());
    }

    #[rstest]
    fn unchanged_graph_is_not_routed_again(graph: GraphSnapshot) {
        let mut router = LinkRouter::default();
        router.recompute_to_completion(&graph);
        let before = router.path(10).cloned();
        assert_eq!(router.recompute(&graph), PassOutcome::Unchanged);
        assert_eq!(router.path(10).cloned(), before);
    }

    #[test]
    fn missing_link_table_aborts() {
        let graph = GraphSnapshot::without_link_table();
        let mut router = LinkRouter::default();
        assert!(matches!(router.begin_pass(&graph), Err(RoutingError::MissingLinkTable)));
        assert_eq!(router.recompute(&graph), PassOutcome::Aborted);
    }

    #[rstest]
    fn link_missing_from_outputs_is_dangling(mut graph: GraphSnapshot) {
        let mut router = LinkRouter::default();
        router.recompute_to_completion(&graph);
        graph.detach_output(10);
        router.begin_pass(&graph).unwrap();
        assert!(matches!(
            router.route_link(&graph, 10),
            Err(RoutingError::DanglingLink(10))
        ));
    }

    #[rstest]
    fn covered_connection_point_uses_fallback(mut graph: GraphSnapshot) {
        // Node 3 sits right where the wire would leave node 1.
        graph.add_node(3, Rect::from_xywh(102.0, -20.0, 40.0, 100.0), 0, 0);
        let mut router = LinkRouter::default();
        router.begin_pass(&graph).unwrap();
        let path = router.route_link(&graph, 10).unwrap();
        assert_eq!(
            path.points,
            vec![
                Point::new(100.0, 10.0),
                Point::new(105.0, 10.0),
                Point::new(105.0, 110.0),
                Point::new(300.0, 110.0),
            ]
        );
    }

    #[test]
    fn coincident_connection_points_keep_a_two_point_wire() {
        let mut graph = GraphSnapshot::new();
        graph
            .add_node(1, Rect::from_xywh(0.0, 0.0, 100.0, 60.0), 0, 1)
            .add_node(2, Rect::from_xywh(100.0, 0.0, 100.0, 60.0), 1, 0);
        let link = graph.connect(1, 0, 2, 0);

        let mut router = LinkRouter::default();
        assert_eq!(router.recompute_to_completion(&graph), PassOutcome::Complete { routed: 1 });
        let path = router.path(link).expect("link is routed");
        assert_eq!(
            path.points,
            vec![
                Point::new(100.0, 10.0),
                Point::new(105.0, 10.0),
                Point::new(95.0, 10.0),
                Point::new(100.0, 10.0),
            ]
        );
        assert!(is_manhattan(&path.points));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f64::NAN)]
    fn unusable_grid_size_falls_back_to_default(graph: GraphSnapshot, #[case] grid_size: f64) {
        let config = RoutingConfig {
            grid_size,
            ..Default::default()
        };
        let mut router = LinkRouter::new(config);
        assert_eq!(router.config().grid_size, RoutingConfig::default().grid_size);
        assert_eq!(router.recompute_to_completion(&graph), PassOutcome::Complete { routed: 1 });
        let path = router.path(10).expect("link 10 is routed");
        assert!(path.points.iter().all(Point::is_finite));
        assert!(is_manhattan(&path.points));

        router.set_config(RoutingConfig {
            grid_size,
            ..Default::default()
        });
        assert_eq!(router.config().grid_size, RoutingConfig::default().grid_size);
    }

    #[rstest]
    fn zero_budget_yields_between_links(mut graph: GraphSnapshot) {
        graph
            .add_node(3, Rect::from_xywh(0.0, 200.0, 100.0, 60.0), 0, 1)
            .add_node(4, Rect::from_xywh(300.0, 300.0, 100.0, 60.0), 1, 0);
        graph.connect_with_id(11, 3, 0, 4, 0);

        let mut router = LinkRouter::default();
        router.begin_pass(&graph).unwrap();
        assert_eq!(router.run_slice(&graph, Duration::ZERO), PassOutcome::Yielded { remaining: 1 });
        assert_eq!(router.pending().map(RecomputeTask::routed), Some(1));
        assert_eq!(router.run_slice(&graph, Duration::ZERO), PassOutcome::Complete { routed: 2 });
        assert_eq!(router.run_slice(&graph, Duration::ZERO), PassOutcome::Unchanged);
        assert_eq!(router.cache().len(), 2);
    }

    #[rstest]
    fn traces_are_collected_when_enabled(graph: GraphSnapshot) {
        let config = RoutingConfig {
            trace: true,
            ..Default::default()
        };
        let mut router = LinkRouter::new(config);
        router.recompute_to_completion(&graph);
        let trace = router.traces().get(&10).expect("search was traced");
        assert!(trace.iterations > 0);
    }
}
