//! Parametric (Liang-Barsky) clipping of a segment against an axis-aligned
//! rectangle. Every obstacle intersection test in the router goes through
//! [`clip_segment`].

use crate::geometry::{Point, Rect};

const EPSILON: f64 = 1e-6;

/// The part of a segment that lies within a rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClippedSegment {
    pub start: Point,
    pub end: Point,
    /// Parameter along the input segment where it enters the rectangle.
    pub entry: f64,
    /// Parameter along the input segment where it leaves the rectangle.
    pub exit: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipResult {
    Inside(ClippedSegment),
    Outside,
}

impl ClipResult {
    pub fn is_inside(&self) -> bool {
        matches!(self, ClipResult::Inside(_))
    }
}

/// Narrows `[entry, exit]` against one rectangle edge. Returns `false` when the
/// segment misses the half-plane entirely.
fn clip_parameter(numerator: f64, denominator: f64, entry: &mut f64, exit: &mut f64) -> bool {
    if denominator.abs() < EPSILON {
        return numerator < 0.0;
    }
    let t = numerator / denominator;
    if denominator > 0.0 {
        if t > *exit {
            return false;
        }
        if t > *entry {
            *entry = t;
        }
    } else {
        if t < *entry {
            return false;
        }
        if t < *exit {
            *exit = t;
        }
    }
    true
}

/// Clips the segment `start -> end` against `rect`.
///
/// A segment shorter than the tolerance on both axes is treated as a point and
/// tested inclusively against the rectangle.
pub fn clip_segment(start: Point, end: Point, rect: &Rect) -> ClipResult {
    let dx = end.x - start.x;
    let dy = end.y - start.y;

    if dx.abs() < EPSILON && dy.abs() < EPSILON && rect.contains(&start) {
        return ClipResult::Inside(ClippedSegment {
            start,
            end,
            entry: 0.0,
            exit: 1.0,
        });
    }

    let mut entry = 0.0;
    let mut exit = 1.0;
    if clip_parameter(rect.left - start.x, dx, &mut entry, &mut exit)
        && clip_parameter(start.x - rect.right, -dx, &mut entry, &mut exit)
        && clip_parameter(rect.top - start.y, dy, &mut entry, &mut exit)
        && clip_parameter(start.y - rect.bottom, -dy, &mut entry, &mut exit)
    {
        let clipped_end = if exit < 1.0 {
            Point::new(start.x + exit * dx, start.y + exit * dy)
        } else {
            end
        };
        let clipped_start = if entry > 0.0 {
            Point::new(start.x + entry * dx, start.y + entry * dy)
        } else {
            start
        };
        return ClipResult::Inside(ClippedSegment {
            start: clipped_start,
            end: clipped_end,
            entry,
            exit,
        });
    }

    ClipResult::Outside
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn unit_box() -> Rect {
        Rect::new(10.0, 10.0, 20.0, 20.0)
    }

    #[test]
    fn crossing_segment_is_clipped_to_box_edges() {
        let result = clip_segment(Point::new(0.0, 15.0), Point::new(30.0, 15.0), &unit_box());
        let ClipResult::Inside(clipped) = result else {
            panic!("expected the segment to cross the box");
        };
        assert_eq!(clipped.start, Point::new(10.0, 15.0));
        assert_eq!(clipped.end, Point::new(20.0, 15.0));
        assert!((clipped.entry - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn segment_starting_inside_keeps_its_start() {
        let result = clip_segment(Point::new(15.0, 15.0), Point::new(15.0, 40.0), &unit_box());
        let ClipResult::Inside(clipped) = result else {
            panic!("expected the segment to start inside the box");
        };
        assert_eq!(clipped.start, Point::new(15.0, 15.0));
        assert_eq!(clipped.end, Point::new(15.0, 20.0));
        assert_eq!(clipped.entry, 0.0);
    }

    #[rstest]
    #[case(Point::new(0.0, 0.0), Point::new(30.0, 0.0))]
    #[case(Point::new(0.0, 25.0), Point::new(30.0, 25.0))]
    #[case(Point::new(5.0, 0.0), Point::new(5.0, 30.0))]
    #[case(Point::new(0.0, 15.0), Point::new(9.0, 15.0))]
    fn segments_missing_the_box_are_outside(#[case] start: Point, #[case] end: Point) {
        assert_eq!(clip_segment(start, end, &unit_box()), ClipResult::Outside);
    }

    #[rstest]
    #[case(Point::new(15.0, 15.0), true)]
    #[case(Point::new(10.0, 12.0), true)]
    #[case(Point::new(25.0, 15.0), false)]
    fn degenerate_segment_is_a_point_test(#[case] point: Point, #[case] inside: bool) {
        assert_eq!(clip_segment(point, point, &unit_box()).is_inside(), inside);
    }
}
