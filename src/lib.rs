//! Orthogonal wire routing for node-graph editors.
//!
//! [`routing::LinkRouter`] keeps one Manhattan wire per link of a
//! [`host::HostGraph`], re-routing only the links affected by node and link
//! changes. [`circuit::CircuitLines`] wraps it for hosts that call in from
//! their draw loop.

pub mod circuit;
pub mod clipping;
pub mod error;
pub mod geometry;
pub mod host;
pub mod lib_tracing;
pub mod render;
pub mod routing;
pub mod scheduler;

#[cfg(feature = "python")]
mod python;

pub use circuit::{CircuitLines, DrawOutput};
pub use error::RoutingError;
pub use geometry::{Point, Rect};
pub use host::{GraphSnapshot, HostGraph, LinkEndpoints, LinkId, NodeId, SlotKind};
pub use routing::{LinkRouter, PassOutcome, RoutingConfig};
