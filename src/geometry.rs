use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Sub};

/// Anything with an axis-aligned extent.
pub trait BoundingBox {
    fn top_left(&self) -> Point;
    fn bottom_right(&self) -> Point;
}

/// A canvas position. Equality and hashing use the exact bit pattern of both
/// coordinates (with `-0.0` folded into `0.0`), so points can key search maps.
#[derive(Clone, Copy, Debug, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn manhattan_distance(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let x_diff = self.x - other.x;
        let y_diff = self.y - other.y;
        (x_diff.powi(2) + y_diff.powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// True when the two points share at least one coordinate.
    pub fn is_axis_aligned_with(&self, other: &Point) -> bool {
        self.x == other.x || self.y == other.y
    }

    pub fn coord(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }

    pub(crate) fn key(&self) -> (u64, u64) {
        (canonical_bits(self.x), canonical_bits(self.y))
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, factor: f64) -> Point {
        Point {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl rstar::Point for Point {
    type Scalar = f64;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Point {
            x: generator(0),
            y: generator(1),
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            _ => unreachable!("points are two dimensional"),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => unreachable!("points are two dimensional"),
        }
    }
}

/// Axis-aligned rectangle stored as its four edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a rectangle from a host-style `(x, y, width, height)` box.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect::new(x, y, x + width, y + height)
    }

    /// Smallest rectangle containing every point, `None` for an empty input.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Rect> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for point in points {
            rect.left = rect.left.min(point.x);
            rect.top = rect.top.min(point.y);
            rect.right = rect.right.max(point.x);
            rect.bottom = rect.bottom.max(point.y);
        }
        Some(rect)
    }

    pub fn is_finite(&self) -> bool {
        self.top_left().is_finite() && self.bottom_right().is_finite()
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2.0,
            self.top + self.height() / 2.0,
        )
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Inclusive overlap test; rectangles sharing an edge intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }

    /// Exclusive containment: points on the border are outside.
    pub fn contains_strict(&self, point: &Point) -> bool {
        point.x > self.left && point.x < self.right && point.y > self.top && point.y < self.bottom
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Grows the rectangle by one grid cell per side, snapped outward, and
    /// pulls each edge in by one unit (a fifth of a cell on finer grids) so
    /// grid lines run clear of the obstacle.
    pub fn inflate_to_grid(&self, grid_size: f64) -> Rect {
        let inset = (grid_size * 0.2).min(1.0);
        Rect::new(
            ((self.left / grid_size).floor() - 1.0) * grid_size + inset,
            ((self.top / grid_size).floor() - 1.0) * grid_size + inset,
            ((self.right / grid_size).ceil() + 1.0) * grid_size - inset,
            ((self.bottom / grid_size).ceil() + 1.0) * grid_size - inset,
        )
    }

    /// The `[low, high]` span of the rectangle along an axis.
    pub fn span(&self, orientation: Orientation) -> (f64, f64) {
        match orientation {
            Orientation::Horizontal => (self.left, self.right),
            Orientation::Vertical => (self.top, self.bottom),
        }
    }
}

impl BoundingBox for Rect {
    fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    fn bottom_right(&self) -> Point {
        Point::new(self.right, self.bottom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn perpendicular(&self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Direction of travel from `from` to `to`, `None` unless the move is a
    /// non-degenerate axis-aligned step.
    pub fn between(from: &Point, to: &Point) -> Option<Direction> {
        if from.y == to.y && from.x != to.x {
            Some(if to.x > from.x {
                Direction::Right
            } else {
                Direction::Left
            })
        } else if from.x == to.x && from.y != to.y {
            Some(if to.y > from.y {
                Direction::Down
            } else {
                Direction::Up
            })
        } else {
            None
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn orientation(&self) -> Orientation {
        match self {
            Direction::Up | Direction::Down => Orientation::Vertical,
            Direction::Left | Direction::Right => Orientation::Horizontal,
        }
    }

    /// `+1.0` when travel increases the coordinate on the travel axis.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Down | Direction::Right => 1.0,
            Direction::Up | Direction::Left => -1.0,
        }
    }

    /// The point `distance` units away from `from` in this direction.
    pub fn step(&self, from: &Point, distance: f64) -> Point {
        match self.orientation() {
            Orientation::Horizontal => Point::new(from.x + self.sign() * distance, from.y),
            Orientation::Vertical => Point::new(from.x, from.y + self.sign() * distance),
        }
    }
}

pub fn snap_down(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).floor() * grid_size
}

pub fn snap_up(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).ceil() * grid_size
}
