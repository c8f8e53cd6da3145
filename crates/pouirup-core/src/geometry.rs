// pouirup Geometry
// 2D vectors for pointer and finger motion

use std::ops::{Add, Div, Sub};

/// A 2D vector. Used both as a position and as a displacement.
///
/// The vertical axis grows downward, matching screen and touchpad
/// coordinates, so a positive `y` displacement is a downward motion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

/// A point: pixels for the cursor, inches for trackpad fingers.
pub type Position = Vector2;

/// Difference between two positions.
pub type Displacement = Vector2;

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length
    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Angle from the positive x axis in radians, in `(-π, π]`
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Arithmetic mean of a set of vectors, `None` when empty
    pub fn mean<I: IntoIterator<Item = Vector2>>(vectors: I) -> Option<Vector2> {
        let mut sum = Vector2::ZERO;
        let mut count = 0usize;
        for v in vectors {
            sum = sum + v;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Div<f64> for Vector2 {
    type Output = Vector2;

    fn div(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x / rhs, self.y / rhs)
    }
}
