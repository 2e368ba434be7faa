use indexmap::{IndexMap, IndexSet};

use crate::geometry::Rect;
use crate::host::{LinkEndpoints, LinkId, NodeId};

use super::cache::PathCache;
use super::obstacles::ObstacleMap;

/// Links whose wires have to be routed again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirtySet {
    links: IndexSet<LinkId>,
}

impl DirtySet {
    pub fn new() -> Self {
        DirtySet::default()
    }

    pub fn insert(&mut self, link: LinkId) -> bool {
        self.links.insert(link)
    }

    pub fn contains(&self, link: LinkId) -> bool {
        self.links.contains(&link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.links.iter().copied()
    }
}

impl FromIterator<LinkId> for DirtySet {
    fn from_iter<T: IntoIterator<Item = LinkId>>(iter: T) -> Self {
        DirtySet {
            links: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DirtySet {
    type Item = LinkId;
    type IntoIter = indexmap::set::IntoIter<LinkId>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

/// What changed in the host graph since the previous pass.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub changed_nodes: IndexSet<NodeId>,
    pub changed_links: IndexSet<LinkId>,
    pub removed_links: Vec<LinkId>,
    /// Area around the changes; cached wires touching it are re-routed.
    pub region: Option<Rect>,
    pub dirty: DirtySet,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed_nodes.is_empty() && self.changed_links.is_empty()
    }
}

fn extend_region(region: &mut Option<Rect>, rect: &Rect) {
    *region = Some(match region {
        Some(current) => current.union(rect),
        None => *rect,
    });
}

/// Remembers obstacle areas and link endpoints between passes.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    node_areas: IndexMap<NodeId, Rect>,
    link_pairs: IndexMap<LinkId, (NodeId, NodeId)>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        ChangeTracker::default()
    }

    /// Forgets every snapshot, so the next pass treats everything as new.
    pub fn reset(&mut self) {
        self.node_areas.clear();
        self.link_pairs.clear();
    }

    pub fn tracked_links(&self) -> usize {
        self.link_pairs.len()
    }

    /// Compares the current obstacles and link table with the previous pass,
    /// drops cache entries for links and nodes that disappeared, and works out
    /// which links need new wires. The result lists dirty links in link table
    /// order.
    pub fn diff(
        &mut self,
        obstacles: &ObstacleMap,
        links: &[(LinkId, LinkEndpoints)],
        cache: &mut PathCache,
    ) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut changed_areas: Vec<Rect> = Vec::new();

        let removed_nodes: Vec<NodeId> = self
            .node_areas
            .keys()
            .copied()
            .filter(|node| obstacles.get(*node).is_none())
            .collect();
        for node in removed_nodes {
            if let Some(area) = self.node_areas.shift_remove(&node) {
                changed_areas.push(area);
            }
            changes.changed_nodes.insert(node);
        }
        for obstacle in obstacles.iter() {
            let previous = self.node_areas.insert(obstacle.node, obstacle.area);
            if previous != Some(obstacle.area) {
                changes.changed_nodes.insert(obstacle.node);
                changed_areas.push(obstacle.area);
                changed_areas.extend(previous);
            }
        }

        let current: IndexSet<LinkId> = links.iter().map(|(link, _)| *link).collect();
        for (link, endpoints) in links {
            let pair = (endpoints.origin_id, endpoints.target_id);
            if self.link_pairs.insert(*link, pair) != Some(pair) {
                changes.changed_links.insert(*link);
            }
        }
        let removed_links: Vec<LinkId> = self
            .link_pairs
            .keys()
            .copied()
            .filter(|link| !current.contains(link))
            .collect();
        for link in removed_links {
            self.link_pairs.shift_remove(&link);
            cache.remove(link);
            changes.removed_links.push(link);
        }
        cache.retain(|path| {
            current.contains(&path.link)
                && obstacles.get(path.source_node).is_some()
                && obstacles.get(path.target_node).is_some()
        });

        if changes.is_empty() {
            return changes;
        }

        let mut directly_dirty: IndexSet<LinkId> = IndexSet::new();
        for (link, endpoints) in links {
            if changes.changed_links.contains(link)
                || changes.changed_nodes.contains(&endpoints.origin_id)
                || changes.changed_nodes.contains(&endpoints.target_id)
            {
                directly_dirty.insert(*link);
            }
        }

        let mut region: Option<Rect> = None;
        for link in &directly_dirty {
            if let Some(path) = cache.get(*link) {
                extend_region(&mut region, &path.bounds);
            }
        }
        for area in &changed_areas {
            extend_region(&mut region, area);
        }

        let mut nearby: IndexSet<LinkId> = IndexSet::new();
        if let Some(region) = &region {
            for path in cache.iter() {
                if path.bounds.intersects(region) {
                    nearby.insert(path.link);
                }
            }
        }

        changes.dirty = links
            .iter()
            .map(|(link, _)| *link)
            .filter(|link| directly_dirty.contains(link) || nearby.contains(link))
            .collect();
        changes.region = region;
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::routing::types::RoutedPath;

    const GRID: f64 = 5.0;

    fn endpoints(origin_id: NodeId, target_id: NodeId) -> LinkEndpoints {
        LinkEndpoints {
            origin_id,
            origin_slot: 0,
            target_id,
            target_slot: 0,
        }
    }

    fn layout(extra_x: f64) -> ObstacleMap {
        ObstacleMap::build(
            [
                (1, Rect::from_xywh(0.0, 0.0, 100.0, 60.0)),
                (2, Rect::from_xywh(300.0, 0.0, 100.0, 60.0)),
                (3, Rect::from_xywh(0.0, 400.0, 100.0, 60.0)),
                (4, Rect::from_xywh(300.0, 400.0, 100.0, 60.0)),
                (5, Rect::from_xywh(extra_x, 800.0, 50.0, 50.0)),
            ],
            GRID,
        )
    }

    fn cached(link: LinkId, from: (NodeId, f64), to: (NodeId, f64)) -> RoutedPath {
        RoutedPath::new(
            link,
            vec![Point::new(100.0, from.1), Point::new(300.0, to.1)],
            (from.0, 0),
            (to.0, 0),
        )
    }

    fn seeded() -> (ChangeTracker, PathCache, Vec<(LinkId, LinkEndpoints)>) {
        let mut tracker = ChangeTracker::new();
        let mut cache = PathCache::new();
        let links = vec![(10, endpoints(1, 2)), (11, endpoints(3, 4))];
        let first = tracker.diff(&layout(600.0), &links, &mut cache);
        assert_eq!(first.dirty.iter().collect::<Vec<_>>(), vec![10, 11]);
        cache.insert(cached(10, (1, 10.0), (2, 10.0)));
        cache.insert(cached(11, (3, 410.0), (4, 410.0)));
        (tracker, cache, links)
    }

    #[test]
    fn unchanged_graph_has_nothing_dirty() {
        let (mut tracker, mut cache, links) = seeded();
        let changes = tracker.diff(&layout(600.0), &links, &mut cache);
        assert!(changes.is_empty());
        assert!(changes.dirty.is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn moving_an_isolated_node_dirties_nothing_far_away() {
        let (mut tracker, mut cache, links) = seeded();
        let changes = tracker.diff(&layout(700.0), &links, &mut cache);
        assert_eq!(changes.changed_nodes.iter().copied().collect::<Vec<_>>(), vec![5]);
        assert!(changes.dirty.is_empty());
    }

    #[test]
    fn node_moved_onto_a_wire_dirties_it() {
        let (mut tracker, mut cache, links) = seeded();
        let obstacles = ObstacleMap::build(
            [
                (1, Rect::from_xywh(0.0, 0.0, 100.0, 60.0)),
                (2, Rect::from_xywh(300.0, 0.0, 100.0, 60.0)),
                (3, Rect::from_xywh(0.0, 400.0, 100.0, 60.0)),
                (4, Rect::from_xywh(300.0, 400.0, 100.0, 60.0)),
                (5, Rect::from_xywh(180.0, -10.0, 40.0, 40.0)),
            ],
            GRID,
        );
        let changes = tracker.diff(&obstacles, &links, &mut cache);
        assert!(changes.changed_links.is_empty());
        assert!(changes.dirty.contains(10));
    }

    #[test]
    fn moving_an_endpoint_node_dirties_its_links() {
        let (mut tracker, mut cache, links) = seeded();
        let obstacles = ObstacleMap::build(
            [
                (1, Rect::from_xywh(0.0, 20.0, 100.0, 60.0)),
                (2, Rect::from_xywh(300.0, 0.0, 100.0, 60.0)),
                (3, Rect::from_xywh(0.0, 400.0, 100.0, 60.0)),
                (4, Rect::from_xywh(300.0, 400.0, 100.0, 60.0)),
                (5, Rect::from_xywh(600.0, 800.0, 50.0, 50.0)),
            ],
            GRID,
        );
        let changes = tracker.diff(&obstacles, &links, &mut cache);
        assert!(changes.dirty.contains(10));
        assert!(!changes.dirty.contains(11));
    }

    #[test]
    fn removed_link_leaves_the_cache() {
        let (mut tracker, mut cache, _) = seeded();
        let links = vec![(11, endpoints(3, 4))];
        let changes = tracker.diff(&layout(600.0), &links, &mut cache);
        assert_eq!(changes.removed_links, vec![10]);
        assert!(!cache.contains(10));
        assert!(cache.contains(11));
        assert_eq!(tracker.tracked_links(), 1);
    }

    #[test]
    fn rewired_link_is_dirty() {
        let (mut tracker, mut cache, _) = seeded();
        let links = vec![(10, endpoints(1, 4)), (11, endpoints(3, 4))];
        let changes = tracker.diff(&layout(600.0), &links, &mut cache);
        assert_eq!(changes.changed_links.iter().copied().collect::<Vec<_>>(), vec![10]);
        assert!(changes.dirty.contains(10));
    }
}
