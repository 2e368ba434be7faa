use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasherDefault;

mod cache;
mod edge_router;
mod obstacles;
mod occupancy;
mod search;
mod trace;
mod tracker;
mod types;

// Fixed-key hashing keeps iteration order identical between runs.
pub(crate) type StableHasher = BuildHasherDefault<DefaultHasher>;
pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, StableHasher>;
pub(crate) type HashSet<K> = hashbrown::HashSet<K, StableHasher>;

pub use cache::PathCache;
pub use edge_router::{LinkRouter, PassOutcome, PassSummary, RecomputeTask};
pub use obstacles::{BlockingObstacle, Obstacle, ObstacleMap};
pub use search::{route, RoutedSegments};
pub use trace::{SearchTrace, TracedCandidate};
pub use tracker::{ChangeSet, ChangeTracker, DirtySet};
pub use types::{collapse_collinear, is_manhattan, PresentationMode, RoutedPath, RoutingConfig};
