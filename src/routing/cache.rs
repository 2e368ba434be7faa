use indexmap::IndexMap;

use crate::host::{LinkId, NodeId};

use super::search::RoutedSegments;
use super::types::RoutedPath;

/// Routed wires keyed by link, in the order they were first routed.
#[derive(Clone, Debug, Default)]
pub struct PathCache {
    paths: IndexMap<LinkId, RoutedPath>,
}

impl PathCache {
    pub fn new() -> Self {
        PathCache::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, link: LinkId) -> Option<&RoutedPath> {
        self.paths.get(&link)
    }

    pub fn contains(&self, link: LinkId) -> bool {
        self.paths.contains_key(&link)
    }

    /// Stores a path, replacing the previous one for the same link in place.
    pub fn insert(&mut self, path: RoutedPath) -> Option<RoutedPath> {
        self.paths.insert(path.link, path)
    }

    pub fn remove(&mut self, link: LinkId) -> Option<RoutedPath> {
        self.paths.shift_remove(&link)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&RoutedPath) -> bool) {
        self.paths.retain(|_, path| keep(path));
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutedPath> {
        self.paths.values()
    }

    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.paths.keys().copied()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Segments of every cached wire the search for a new wire between
    /// `source` and `target` has to steer around. Wires leaving the same
    /// output slot or entering the same input slot may bundle freely.
    pub fn segments_excluding(&self, source: (NodeId, usize), target: (NodeId, usize)) -> RoutedSegments {
        RoutedSegments::from_paths(
            self.paths
                .values()
                .filter(|path| !path.shares_endpoint_with(source, target))
                .map(|path| path.points.as_slice()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn bent(link: LinkId, source: (NodeId, usize), target: (NodeId, usize), y: f64) -> RoutedPath {
        RoutedPath::new(
            link,
            vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(50.0, y)],
            source,
            target,
        )
    }

    #[test]
    fn replacing_a_path_keeps_its_position() {
        let mut cache = PathCache::new();
        cache.insert(bent(1, (1, 0), (2, 0), 10.0));
        cache.insert(bent(2, (3, 0), (4, 0), 20.0));
        cache.insert(bent(1, (1, 0), (2, 0), 30.0));
        assert_eq!(cache.links().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(cache.get(1).map(|path| path.bounds.bottom), Some(30.0));
    }

    #[test]
    fn wires_sharing_a_slot_are_excluded() {
        let mut cache = PathCache::new();
        cache.insert(bent(1, (1, 0), (2, 0), 10.0));
        cache.insert(bent(2, (1, 0), (5, 1), 20.0));
        cache.insert(bent(3, (6, 0), (2, 0), 30.0));
        cache.insert(bent(4, (7, 0), (8, 0), 40.0));

        let segments = cache.segments_excluding((1, 0), (2, 0));
        assert_eq!(segments.len(), 2);
        assert_eq!(cache.segments_excluding((9, 0), (9, 1)).len(), 8);
    }
}
