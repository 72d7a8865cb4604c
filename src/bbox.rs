//! Bounding box accumulation.

use crate::geometry::{Affine, Vec2};

/// Axis-aligned box, empty until the first point is included.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    extent: Option<(Vec2, Vec2)>,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.extent.is_none()
    }

    pub fn include_point(&mut self, p: Vec2) {
        self.extent = Some(match self.extent {
            None => (p, p),
            Some((min, max)) => (min.min(p), max.max(p)),
        });
    }

    pub fn include_points(&mut self, points: impl IntoIterator<Item = Vec2>) {
        for p in points {
            self.include_point(p);
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> BoundingBox {
        let m = Vec2::new(margin, margin);
        BoundingBox {
            extent: self.extent.map(|(min, max)| (min - m, max + m)),
        }
    }

    pub fn union(&mut self, other: &BoundingBox) {
        if let Some((min, max)) = other.extent {
            self.include_point(min);
            self.include_point(max);
        }
    }

    pub fn min(&self) -> Option<Vec2> {
        self.extent.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<Vec2> {
        self.extent.map(|(_, max)| max)
    }

    /// The box of this box's corners mapped through `m`.
    pub fn transformed(&self, m: Affine) -> BoundingBox {
        let mut out = BoundingBox::new();
        if let Some((min, max)) = self.extent {
            out.include_points([
                m.apply(min),
                m.apply(Vec2::new(max.x, min.y)),
                m.apply(max),
                m.apply(Vec2::new(min.x, max.y)),
            ]);
        }
        out
    }
}

/// Points of the path under construction, kept in device space so that
/// `include_path` stays correct across transform changes mid-path.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathExtent {
    points: BoundingBox,
    commands: usize,
}

impl PathExtent {
    pub fn add_point(&mut self, p: Vec2) {
        self.points.include_point(p);
    }

    pub fn add_command(&mut self) {
        self.commands += 1;
    }

    pub fn commands(&self) -> usize {
        self.commands
    }

    pub fn extent(&self) -> &BoundingBox {
        &self.points
    }

    pub fn clear(&mut self) {
        *self = PathExtent::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_first_point() {
        let b = BoundingBox::new();
        assert!(b.is_empty());
        assert_eq!(b.min(), None);
        assert_eq!(b.max(), None);
    }

    #[test]
    fn box_is_tightest_enclosure() {
        let pts = [
            Vec2::new(3.0, -1.0),
            Vec2::new(-2.5, 4.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(7.25, 2.0),
        ];
        let mut b = BoundingBox::new();
        b.include_points(pts);
        let min_x = pts.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_y = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(b.min(), Some(Vec2::new(min_x, -1.0)));
        assert_eq!(b.max(), Some(Vec2::new(7.25, max_y)));
    }

    #[test]
    fn flipped_transform_keeps_min_below_max() {
        let mut b = BoundingBox::new();
        b.include_points([Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0)]);
        let t = b.transformed(Affine::scaling(1.0, -1.0));
        assert_eq!(t.min(), Some(Vec2::new(0.0, -5.0)));
        assert_eq!(t.max(), Some(Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn union_and_expand() {
        let mut a = BoundingBox::new();
        a.include_point(Vec2::new(1.0, 1.0));
        let mut b = BoundingBox::new();
        b.include_point(Vec2::new(3.0, -2.0));
        a.union(&b);
        let e = a.expanded(0.5);
        assert_eq!(e.min(), Some(Vec2::new(0.5, -2.5)));
        assert_eq!(e.max(), Some(Vec2::new(3.5, 1.5)));
    }
}
