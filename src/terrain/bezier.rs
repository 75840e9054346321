//! Smooth curves through feature polylines
//!
//! Paths are stored as sequences of cubic Bézier segments obtained from a
//! Catmull-Rom spline through the cell sites, so renderers can draw rivers
//! without re-deriving control points.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One cubic Bézier segment
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    /// Segment start
    pub start: DVec2,
    /// First control point
    pub control1: DVec2,
    /// Second control point
    pub control2: DVec2,
    /// Segment end
    pub end: DVec2,
}

impl CubicSegment {
    /// Evaluate the segment at `t` in `[0, 1]`
    pub fn point_at(&self, t: f64) -> DVec2 {
        let u = 1.0 - t;
        self.start * (u * u * u)
            + self.control1 * (3.0 * u * u * t)
            + self.control2 * (3.0 * u * t * t)
            + self.end * (t * t * t)
    }
}

/// A chain of cubic segments
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BezierCurve {
    /// Segments in path order; each starts where the previous one ends
    pub segments: Vec<CubicSegment>,
}

impl BezierCurve {
    /// Catmull-Rom smoothing through `points`
    ///
    /// The curve passes through every input point. Fewer than two points give
    /// an empty curve.
    pub fn through(points: &[DVec2]) -> Self {
        if points.len() < 2 {
            return Self::default();
        }

        let last = points.len() - 1;
        let at = |i: usize| points[i.min(last)];
        let segments = (0..last)
            .map(|i| {
                let p0 = at(i.saturating_sub(1));
                let p1 = at(i);
                let p2 = at(i + 1);
                let p3 = at(i + 2);
                CubicSegment {
                    start: p1,
                    control1: p1 + (p2 - p0) / 6.0,
                    control2: p2 - (p3 - p1) / 6.0,
                    end: p2,
                }
            })
            .collect();

        Self { segments }
    }

    /// True when the curve has no segments
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Flattened control points: start, then (control1, control2, end) per segment
    pub fn control_points(&self) -> Vec<DVec2> {
        let mut points = Vec::with_capacity(self.segments.len() * 3 + 1);
        if let Some(first) = self.segments.first() {
            points.push(first.start);
        }
        for segment in &self.segments {
            points.extend([segment.control1, segment.control2, segment.end]);
        }
        points
    }

    /// Sample `steps` points per segment plus the final end point
    pub fn sample(&self, steps: usize) -> Vec<DVec2> {
        let steps = steps.max(1);
        let mut points = Vec::with_capacity(self.segments.len() * steps + 1);
        for segment in &self.segments {
            for step in 0..steps {
                points.push(segment.point_at(step as f64 / steps as f64));
            }
        }
        if let Some(last) = self.segments.last() {
            points.push(last.end);
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_passes_through_points() {
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 5.0),
            DVec2::new(20.0, 0.0),
            DVec2::new(30.0, 10.0),
        ];
        let curve = BezierCurve::through(&points);

        assert_eq!(curve.segments.len(), 3);
        for (segment, pair) in curve.segments.iter().zip(points.windows(2)) {
            assert_eq!(segment.start, pair[0]);
            assert_eq!(segment.end, pair[1]);
            assert!((segment.point_at(0.0) - pair[0]).length() < 1e-12);
            assert!((segment.point_at(1.0) - pair[1]).length() < 1e-12);
        }
        assert_eq!(curve.control_points().len(), 10);
        assert_eq!(curve.sample(4).len(), 13);
    }

    #[test]
    fn test_short_input() {
        assert!(BezierCurve::through(&[]).is_empty());
        assert!(BezierCurve::through(&[DVec2::ONE]).is_empty());
        assert!(BezierCurve::default().control_points().is_empty());
    }

    #[test]
    fn test_straight_line_stays_straight() {
        let curve = BezierCurve::through(&[
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(2.0, 0.0),
        ]);
        for point in curve.sample(8) {
            assert!(point.y.abs() < 1e-12);
        }
    }
}
