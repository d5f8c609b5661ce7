//! Closed-form 2D similarity alignment of paired point sets
//!
//! Fits scale, rotation and translation between matched point lists in one
//! pass (absolute orientation, least squares). The SLAM loop uses it to
//! re-anchor a drifted pose against landmarks it has already mapped.

use crate::common::types::Point2D;

/// Minimum number of correspondences for a well-posed fit
const MIN_PAIRS: usize = 3;

/// A 2D similarity transform: uniform scale, rotation, then translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    pub scale: f64,
    pub cos: f64,
    pub sin: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SimilarityTransform {
    /// Map a point through the transform.
    pub fn apply(&self, p: Point2D) -> Point2D {
        let sc = self.scale * self.cos;
        let ss = self.scale * self.sin;
        Point2D::new(
            sc * p.x - ss * p.y + self.tx,
            ss * p.x + sc * p.y + self.ty,
        )
    }

    /// Rotation angle of the transform.
    pub fn rotation_angle(&self) -> f64 {
        self.sin.atan2(self.cos)
    }
}

fn centroid(points: &[Point2D]) -> Point2D {
    if points.is_empty() {
        return Point2D::origin();
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2D::new(sx / n, sy / n)
}

/// Estimate the similarity transform mapping `source` onto `target`.
///
/// The lists are paired by index and both need at least three points. With
/// `fix_scale` the scale is pinned to 1 and only rotation and translation
/// are fitted. Returns `None` when the problem is degenerate: too few
/// pairs, a point set collapsed onto its centroid, or no resolvable
/// rotation. The fitted translation maps the source centroid onto the
/// target centroid exactly.
pub fn estimate_transform(
    source: &[Point2D],
    target: &[Point2D],
    fix_scale: bool,
) -> Option<SimilarityTransform> {
    if source.len() < MIN_PAIRS || target.len() < MIN_PAIRS {
        return None;
    }
    debug_assert_eq!(source.len(), target.len());

    let sc = centroid(source);
    let tc = centroid(target);

    let mut cs = 0.0;
    let mut ss = 0.0;
    let mut rr = 0.0;
    let mut ll = 0.0;
    for (s, t) in source.iter().zip(target.iter()) {
        let lx = s.x - sc.x;
        let ly = s.y - sc.y;
        let rx = t.x - tc.x;
        let ry = t.y - tc.y;
        cs += rx * lx + ry * ly;
        ss += -rx * ly + ry * lx;
        rr += rx * rx + ry * ry;
        ll += lx * lx + ly * ly;
    }

    if rr == 0.0 || ll == 0.0 {
        return None;
    }
    let scale = if fix_scale { 1.0 } else { (rr / ll).sqrt() };

    let norm = (cs * cs + ss * ss).sqrt();
    if norm == 0.0 {
        return None;
    }
    let cos = cs / norm;
    let sin = ss / norm;

    let tx = tc.x - scale * (cos * sc.x - sin * sc.y);
    let ty = tc.y - scale * (sin * sc.x + cos * sc.y);

    Some(SimilarityTransform {
        scale,
        cos,
        sin,
        tx,
        ty,
    })
}
