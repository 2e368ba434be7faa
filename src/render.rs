//! Turns routed wires into stroke commands for the host's canvas.

use crate::geometry::Point;
use crate::host::HostGraph;
use crate::routing::RoutedPath;

/// Horizontal distance of a slot badge from the wire end.
pub const BADGE_OFFSET: f64 = 25.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Quadratic curve through a corner of the wire.
    QuadTo { control: Point, to: Point },
}

/// Slot number drawn on a highlighted wire.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotBadge {
    pub position: Point,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkStroke {
    pub link: u64,
    pub commands: Vec<PathCommand>,
    /// Colour reported by the host, `None` when it has no colour for the link.
    pub color: Option<String>,
    /// Either end of the link is on a selected node.
    pub highlighted: bool,
    pub badges: Vec<SlotBadge>,
}

fn towards(from: &Point, to: &Point, distance: f64) -> Point {
    let length = from.distance(to);
    if length == 0.0 {
        return *from;
    }
    *from + (*to - *from) * (distance / length)
}

/// Draws the waypoints as straight runs joined by rounded corners. Both sides
/// of a corner are cut back by the same amount: `radius`, or half of the
/// shorter adjacent segment when that is smaller.
pub fn stroke_commands(points: &[Point], radius: f64) -> Vec<PathCommand> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut commands = vec![PathCommand::MoveTo(*first)];
    for index in 0..points.len().saturating_sub(1) {
        let previous = points[index];
        let corner = points[index + 1];
        let Some(next) = points.get(index + 2) else {
            commands.push(PathCommand::LineTo(corner));
            continue;
        };

        let shorter = previous.distance(&corner).min(corner.distance(next));
        let cut = radius.min(shorter / 2.0);
        commands.push(PathCommand::LineTo(towards(&corner, &previous, cut)));
        commands.push(PathCommand::QuadTo {
            control: corner,
            to: towards(&corner, next, cut),
        });
    }
    commands
}

/// Builds one stroke per cached wire with at least two waypoints.
pub fn link_strokes<'a, H: HostGraph + ?Sized>(
    host: &H,
    paths: impl IntoIterator<Item = &'a RoutedPath>,
    radius: f64,
) -> Vec<LinkStroke> {
    paths
        .into_iter()
        .filter(|path| path.points.len() >= 2)
        .map(|path| {
            let source_selected = host.is_selected(path.source_node);
            let highlighted = source_selected || host.is_selected(path.target_node);
            let mut badges = Vec::new();
            if highlighted {
                let slot = if source_selected {
                    path.source_slot
                } else {
                    path.target_slot
                };
                let label = (slot + 1).to_string();
                if let (Some(start), Some(end)) = (path.points.first(), path.points.last()) {
                    badges.push(SlotBadge {
                        position: Point::new(start.x + BADGE_OFFSET, start.y),
                        label: label.clone(),
                    });
                    badges.push(SlotBadge {
                        position: Point::new(end.x - BADGE_OFFSET, end.y),
                        label,
                    });
                }
            }
            LinkStroke {
                link: path.link,
                commands: stroke_commands(&path.points, radius),
                color: host.link_color(path.link).map(str::to_string),
                highlighted,
                badges,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::host::GraphSnapshot;

    #[test]
    fn short_leg_shrinks_both_sides_of_its_corners() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 8.0),
            Point::new(100.0, 8.0),
        ];
        let commands = stroke_commands(&points, 10.0);
        assert_eq!(
            commands,
            vec![
                PathCommand::MoveTo(Point::new(0.0, 0.0)),
                PathCommand::LineTo(Point::new(46.0, 0.0)),
                PathCommand::QuadTo {
                    control: Point::new(50.0, 0.0),
                    to: Point::new(50.0, 4.0),
                },
                PathCommand::LineTo(Point::new(50.0, 4.0)),
                PathCommand::QuadTo {
                    control: Point::new(50.0, 8.0),
                    to: Point::new(54.0, 8.0),
                },
                PathCommand::LineTo(Point::new(100.0, 8.0)),
            ]
        );
    }

    #[test]
    fn long_legs_use_the_full_radius() {
        let points = [Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(50.0, 40.0)];
        assert_eq!(
            stroke_commands(&points, 10.0),
            vec![
                PathCommand::MoveTo(Point::new(0.0, 0.0)),
                PathCommand::LineTo(Point::new(40.0, 0.0)),
                PathCommand::QuadTo {
                    control: Point::new(50.0, 0.0),
                    to: Point::new(50.0, 10.0),
                },
                PathCommand::LineTo(Point::new(50.0, 40.0)),
            ]
        );
    }

    #[test]
    fn selected_wires_carry_slot_badges() {
        let mut graph = GraphSnapshot::new();
        graph
            .add_node(1, Rect::from_xywh(0.0, 0.0, 100.0, 60.0), 0, 2)
            .add_node(2, Rect::from_xywh(300.0, 0.0, 100.0, 60.0), 1, 0)
            .set_default_color("#9a9");
        let link = graph.connect(1, 1, 2, 0);
        graph.select(1);

        let path = RoutedPath::new(
            link,
            vec![Point::new(100.0, 30.0), Point::new(300.0, 30.0)],
            (1, 1),
            (2, 0),
        );
        let strokes = link_strokes(&graph, [&path], 10.0);

        assert_eq!(strokes.len(), 1);
        let stroke = &strokes[0];
        assert!(stroke.highlighted);
        assert_eq!(stroke.color.as_deref(), Some("#9a9"));
        assert_eq!(
            stroke.badges,
            vec![
                SlotBadge {
                    position: Point::new(125.0, 30.0),
                    label: "2".to_string(),
                },
                SlotBadge {
                    position: Point::new(275.0, 30.0),
                    label: "2".to_string(),
                },
            ]
        );
    }
}
