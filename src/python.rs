use std::path::PathBuf;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::RoutingError;
use crate::geometry::{Point, Rect};
use crate::host::{GraphSnapshot, LinkId, NodeId};
use crate::lib_tracing;
use crate::routing::{LinkRouter, PassOutcome, RoutingConfig};

fn to_py_err(error: RoutingError) -> PyErr {
    PyRuntimeError::new_err(error.to_string())
}

fn waypoints(points: &[Point]) -> Vec<(f64, f64)> {
    points.iter().map(|point| (point.x, point.y)).collect()
}

/// Routes links between rectangular nodes. Nodes and links are registered
/// incrementally; `route` only recomputes what changed since the last call.
#[pyclass(name = "LinkRouter")]
pub struct PyLinkRouter {
    graph: GraphSnapshot,
    router: LinkRouter,
}

#[pymethods]
impl PyLinkRouter {
    #[new]
    #[pyo3(signature = (grid_size = 5.0, iteration_budget = 800))]
    fn new(grid_size: f64, iteration_budget: usize) -> PyResult<Self> {
        if !(grid_size.is_finite() && grid_size > 0.0) {
            return Err(PyValueError::new_err("grid_size must be a positive number"));
        }
        let config = RoutingConfig {
            grid_size,
            iteration_budget,
            ..RoutingConfig::from_env()
        };
        Ok(PyLinkRouter {
            graph: GraphSnapshot::new(),
            router: LinkRouter::new(config),
        })
    }

    #[pyo3(signature = (node, x, y, width, height, inputs = 1, outputs = 1))]
    fn add_node(&mut self, node: NodeId, x: f64, y: f64, width: f64, height: f64, inputs: usize, outputs: usize) {
        self.graph
            .add_node(node, Rect::from_xywh(x, y, width, height), inputs, outputs);
    }

    fn move_node(&mut self, node: NodeId, x: f64, y: f64, width: f64, height: f64) {
        self.graph.move_node(node, Rect::from_xywh(x, y, width, height));
    }

    fn remove_node(&mut self, node: NodeId) {
        self.graph.remove_node(node);
    }

    fn connect(&mut self, origin: NodeId, origin_slot: usize, target: NodeId, target_slot: usize) -> LinkId {
        self.graph.connect(origin, origin_slot, target, target_slot)
    }

    fn remove_link(&mut self, link: LinkId) {
        self.graph.remove_link(link);
    }

    /// Brings every wire up to date and returns `(link, waypoints)` pairs.
    fn route(&mut self) -> PyResult<Vec<(LinkId, Vec<(f64, f64)>)>> {
        if self.router.recompute_to_completion(&self.graph) == PassOutcome::Aborted {
            return Err(to_py_err(RoutingError::MissingLinkTable));
        }
        Ok(self
            .router
            .paths()
            .map(|path| (path.link, waypoints(&path.points)))
            .collect())
    }

    fn path(&self, link: LinkId) -> Option<Vec<(f64, f64)>> {
        self.router.path(link).map(|path| waypoints(&path.points))
    }

    fn write_trace(&self, path: PathBuf) -> PyResult<()> {
        self.router.write_trace(&path).map_err(to_py_err)
    }
}

#[pyfunction]
#[pyo3(signature = (log_file = None))]
fn init_tracing(log_file: Option<PathBuf>) -> PyResult<()> {
    lib_tracing::init_tracing(log_file.as_deref()).map_err(to_py_err)
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyLinkRouter>()?;
    m.add_function(wrap_pyfunction!(init_tracing, m)?)?;
    Ok(())
}
