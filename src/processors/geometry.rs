//! Geometric primitives for text-line polygons.
//!
//! This module provides the point and polygon types exchanged between the
//! detection capability, the box filter, and the recognition capability,
//! along with the few measurements the pipeline needs (extents, centroid,
//! area, perimeter).

use imageproc::contours::Contour;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A polygon represented by an ordered collection of points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    /// The points that define the polygon, in drawing order.
    pub points: Vec<Point>,
}

impl BoundingBox {
    /// Creates a new bounding box from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned rectangle from corner coordinates.
    ///
    /// # Arguments
    ///
    /// * `x1` - The x-coordinate of the top-left corner.
    /// * `y1` - The y-coordinate of the top-left corner.
    /// * `x2` - The x-coordinate of the bottom-right corner.
    /// * `y2` - The y-coordinate of the bottom-right corner.
    ///
    /// # Returns
    ///
    /// A new `BoundingBox` with four points in clockwise order starting top-left.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let points = vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ];
        Self { points }
    }

    /// Creates a bounding box from an imageproc contour.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|p| Point::new(p.x as f32, p.y as f32))
            .collect();
        Self { points }
    }

    /// Returns a copy with every coordinate truncated toward zero.
    ///
    /// Recognition receives integer pixel polygons.
    pub fn truncated(&self) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x.trunc(), p.y.trunc()))
                .collect(),
        )
    }

    /// Calculates the area of the polygon using the shoelace formula.
    ///
    /// Returns 0.0 if the polygon has fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// Calculates the perimeter of the polygon.
    pub fn perimeter(&self) -> f32 {
        let mut perimeter = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let dx = self.points[j].x - self.points[i].x;
            let dy = self.points[j].y - self.points[i].y;
            perimeter += (dx * dx + dy * dy).sqrt();
        }
        perimeter
    }

    /// Gets the minimum x-coordinate, or 0.0 if there are no points.
    pub fn x_min(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f32::INFINITY, f32::min)
    }

    /// Gets the minimum y-coordinate, or 0.0 if there are no points.
    pub fn y_min(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min)
    }

    /// Gets the maximum x-coordinate, or 0.0 if there are no points.
    pub fn x_max(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Gets the maximum y-coordinate, or 0.0 if there are no points.
    pub fn y_max(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Gets the vertex centroid (mean of the points).
    pub fn center(&self) -> Point {
        if self.points.is_empty() {
            return Point::new(0.0, 0.0);
        }
        let sum_x: f32 = self.points.iter().map(|p| p.x).sum();
        let sum_y: f32 = self.points.iter().map(|p| p.y).sum();
        let count = self.points.len() as f32;
        Point::new(sum_x / count, sum_y / count)
    }

    /// Returns the axis-aligned extent clamped to a `width` x `height` image,
    /// as integer `(x0, y0, x1, y1)` with exclusive right/bottom edges.
    ///
    /// Returns `None` when the clamped extent is empty.
    pub fn clamped_rect(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.points.is_empty() || width == 0 || height == 0 {
            return None;
        }

        let x0 = self.x_min().max(0.0).floor() as u32;
        let y0 = self.y_min().max(0.0).floor() as u32;
        let x1 = (self.x_max().max(0.0).ceil() as u32).min(width);
        let y1 = (self.y_max().max(0.0).ceil() as u32).min(height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_extents() {
        let bbox = BoundingBox::from_coords(10.0, 20.0, 100.0, 80.0);
        assert_eq!(bbox.x_min(), 10.0);
        assert_eq!(bbox.y_min(), 20.0);
        assert_eq!(bbox.x_max(), 100.0);
        assert_eq!(bbox.y_max(), 80.0);
        assert_eq!(bbox.area(), 90.0 * 60.0);
        assert_eq!(bbox.perimeter(), 2.0 * (90.0 + 60.0));
    }

    #[test]
    fn test_center_is_vertex_mean() {
        let bbox = BoundingBox::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 4.0),
            Point::new(0.0, 4.0),
        ]);
        assert_eq!(bbox.center(), Point::new(5.0, 2.0));
    }

    #[test]
    fn test_truncated_drops_fraction() {
        let bbox = BoundingBox::new(vec![Point::new(1.9, 2.2), Point::new(5.5, 2.7)]);
        let truncated = bbox.truncated();
        assert_eq!(truncated.points[0], Point::new(1.0, 2.0));
        assert_eq!(truncated.points[1], Point::new(5.0, 2.0));
    }

    #[test]
    fn test_clamped_rect() {
        let bbox = BoundingBox::from_coords(-5.0, 2.5, 120.0, 9.2);
        assert_eq!(bbox.clamped_rect(100, 50), Some((0, 2, 100, 10)));

        let outside = BoundingBox::from_coords(200.0, 0.0, 300.0, 10.0);
        assert_eq!(outside.clamped_rect(100, 50), None);
        assert_eq!(BoundingBox::new(Vec::new()).clamped_rect(100, 50), None);
    }
}
