use crate::graph::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A cubic bezier curve segment defined by four control points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub start: Vec2,
    pub control1: Vec2,
    pub control2: Vec2,
    pub end: Vec2,
}

impl CubicBezier {
    /// Vertical S-curve from `start` down (or up) to `end`: both control points
    /// sit on the horizontal line half-way between the endpoints, so a link
    /// leaves and enters its nodes vertically.
    pub fn vertical(start: Vec2, end: Vec2) -> Self {
        let mid_y = (start.y + end.y) / 2.0;
        Self {
            start,
            control1: Vec2::new(start.x, mid_y),
            control2: Vec2::new(end.x, mid_y),
            end,
        }
    }

    /// Sample the curve at parameter t [0, 1]
    pub fn sample(&self, t: f32) -> Vec2 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = self.start.x * mt3
            + 3.0 * self.control1.x * mt2 * t
            + 3.0 * self.control2.x * mt * t2
            + self.end.x * t3;
        let y = self.start.y * mt3
            + 3.0 * self.control1.y * mt2 * t
            + 3.0 * self.control2.y * mt * t2
            + self.end.y * t3;

        Vec2::new(x, y)
    }

    /// Minimum distance from a point to the curve, by uniform sampling.
    /// Renderers use this for link hit-testing.
    pub fn point_distance(&self, point: Vec2, num_samples: usize) -> f32 {
        let samples = num_samples.max(2);
        (0..=samples)
            .map(|i| self.sample(i as f32 / samples as f32).distance(point))
            .fold(f32::INFINITY, f32::min)
    }
}

/// Geometry of one rendered link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkPath {
    Straight { from: Vec2, to: Vec2 },
    Curve(CubicBezier),
}

impl LinkPath {
    pub fn start(&self) -> Vec2 {
        match self {
            Self::Straight { from, .. } => *from,
            Self::Curve(curve) => curve.start,
        }
    }

    pub fn end(&self) -> Vec2 {
        match self {
            Self::Straight { to, .. } => *to,
            Self::Curve(curve) => curve.end,
        }
    }

    /// SVG path data, e.g. `M10,20L30,40`.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Straight { from, to } => {
                let _ = write!(out, "M{},{}L{},{}", from.x, from.y, to.x, to.y);
            }
            Self::Curve(c) => {
                let _ = write!(
                    out,
                    "M{},{}C{},{} {},{} {},{}",
                    c.start.x,
                    c.start.y,
                    c.control1.x,
                    c.control1.y,
                    c.control2.x,
                    c.control2.y,
                    c.end.x,
                    c.end.y
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point_strategy() -> impl Strategy<Value = Vec2> {
        (-1000.0f32..1000.0, -1000.0f32..1000.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    #[test]
    fn test_svg_output() {
        let straight = LinkPath::Straight {
            from: Vec2::new(0.0, 0.0),
            to: Vec2::new(10.0, 20.0),
        };
        assert_eq!(straight.to_svg(), "M0,0L10,20");

        let curve = LinkPath::Curve(CubicBezier::vertical(
            Vec2::new(100.0, 60.0),
            Vec2::new(50.0, 180.0),
        ));
        assert_eq!(curve.to_svg(), "M100,60C100,120 50,120 50,180");
    }

    proptest! {
        /// Curves are anchored exactly at their endpoints.
        #[test]
        fn prop_vertical_curve_endpoints(start in point_strategy(), end in point_strategy()) {
            let curve = CubicBezier::vertical(start, end);
            prop_assert!(curve.sample(0.0).distance(start) < 0.01);
            prop_assert!(curve.sample(1.0).distance(end) < 0.01);
            prop_assert!(curve.point_distance(start, 20) < 0.01);
        }

        /// The curve never leaves the vertical band between its endpoints.
        #[test]
        fn prop_vertical_curve_stays_in_band(
            start in point_strategy(),
            end in point_strategy(),
            t in 0.0f32..=1.0
        ) {
            let curve = CubicBezier::vertical(start, end);
            let p = curve.sample(t);
            let (lo, hi) = if start.y <= end.y { (start.y, end.y) } else { (end.y, start.y) };
            prop_assert!(p.y >= lo - 0.5 && p.y <= hi + 0.5);
        }
    }
}
