use serde_json::json;

use crate::geometry::Point;
use crate::host::LinkId;

use super::obstacles::ObstacleMap;
use super::types::RoutedPath;

/// One candidate the search put into its open set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TracedCandidate {
    pub position: Point,
    pub from: Point,
    pub cost: f64,
    pub estimate: f64,
    pub confirmed: bool,
}

/// Everything a single route search looked at, for overlay drawing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchTrace {
    pub start: Option<Point>,
    pub end: Option<Point>,
    pub candidates: Vec<TracedCandidate>,
    pub expanded: Vec<Point>,
    pub iterations: usize,
    pub result: Option<Vec<Point>>,
}

fn point_json(point: &Point) -> serde_json::Value {
    json!({ "x": point.x, "y": point.y })
}

impl SearchTrace {
    pub(crate) fn begin(&mut self, start: Point, end: Point) {
        self.start = Some(start);
        self.end = Some(end);
        self.candidates.clear();
        self.expanded.clear();
        self.iterations = 0;
        self.result = None;
    }

    pub(crate) fn record_candidate(&mut self, candidate: TracedCandidate) {
        self.candidates.push(candidate);
    }

    pub(crate) fn record_expansion(&mut self, position: Point) {
        self.iterations += 1;
        self.expanded.push(position);
    }

    pub fn to_json(&self) -> serde_json::Value {
        let candidates: Vec<serde_json::Value> = self
            .candidates
            .iter()
            .map(|candidate| {
                json!({
                    "position": point_json(&candidate.position),
                    "from": point_json(&candidate.from),
                    "cost": candidate.cost,
                    "estimate": candidate.estimate,
                    "confirmed": candidate.confirmed,
                })
            })
            .collect();

        json!({
            "start": self.start.as_ref().map(point_json),
            "end": self.end.as_ref().map(point_json),
            "iterations": self.iterations,
            "expanded": self.expanded.iter().map(point_json).collect::<Vec<_>>(),
            "candidates": candidates,
            "result": self
                .result
                .as_ref()
                .map(|points| points.iter().map(point_json).collect::<Vec<_>>()),
        })
    }
}

/// Serialises a full pass: obstacles, final wires and per-link search traces.
pub(crate) fn build_pass_trace<'a>(
    obstacles: &ObstacleMap,
    paths: impl IntoIterator<Item = &'a RoutedPath>,
    traces: impl IntoIterator<Item = (&'a LinkId, &'a SearchTrace)>,
) -> serde_json::Value {
    let grid_size = obstacles.grid_size();
    let obstacles: Vec<serde_json::Value> = obstacles
        .iter()
        .map(|obstacle| {
            json!({
                "node": obstacle.node,
                "order": obstacle.order,
                "area": {
                    "left": obstacle.area.left,
                    "top": obstacle.area.top,
                    "right": obstacle.area.right,
                    "bottom": obstacle.area.bottom,
                },
            })
        })
        .collect();

    let paths: Vec<serde_json::Value> = paths
        .into_iter()
        .map(|path| {
            json!({
                "link": path.link,
                "source": { "node": path.source_node, "slot": path.source_slot },
                "target": { "node": path.target_node, "slot": path.target_slot },
                "points": path.points.iter().map(point_json).collect::<Vec<_>>(),
            })
        })
        .collect();

    let searches: Vec<serde_json::Value> = traces
        .into_iter()
        .map(|(link, trace)| json!({ "link": link, "trace": trace.to_json() }))
        .collect();

    json!({
        "grid_size": grid_size,
        "obstacles": obstacles,
        "paths": paths,
        "searches": searches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_json_lists_candidates_and_result() {
        let mut trace = SearchTrace::default();
        trace.begin(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        trace.record_expansion(Point::new(0.0, 0.0));
        trace.record_candidate(TracedCandidate {
            position: Point::new(10.0, 0.0),
            from: Point::new(0.0, 0.0),
            cost: 10.0,
            estimate: 0.0,
            confirmed: true,
        });
        trace.result = Some(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);

        let value = trace.to_json();
        assert_eq!(value["iterations"], 1);
        assert_eq!(value["candidates"][0]["position"]["x"], 10.0);
        assert_eq!(value["result"][1]["x"], 10.0);
        assert_eq!(value["end"]["y"], 0.0);
    }
}
