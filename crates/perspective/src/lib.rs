//! Perspective mapping from the camera image plane to a metric ground plane
//!
//! A fixed calibration quadrilateral in the camera image is mapped onto an
//! axis-aligned metric rectangle (a road strip seen from above). The mapping
//! is a 3x3 homography computed once at startup; applying it to a tracked
//! anchor point yields a position whose distances approximate real-world
//! distances, which is what makes speed estimation possible.
//!
//! # Example
//! ```
//! use speed_overlay_common::Point2D;
//! use speed_overlay_perspective::{PerspectiveMapper, SourceRegion, TargetPlane};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let region = SourceRegion::new([
//!     Point2D::new(1252.0, 787.0),
//!     Point2D::new(2298.0, 803.0),
//!     Point2D::new(5039.0, 2159.0),
//!     Point2D::new(-550.0, 2159.0),
//! ])?;
//! let plane = TargetPlane::new(25.0, 250.0)?;
//! let mapper = PerspectiveMapper::new(&region, &plane)?;
//!
//! let ground = mapper.transform_point(Point2D::new(1252.0, 787.0))?;
//! assert!(ground.x.abs() < 1e-3 && ground.y.abs() < 1e-3);
//! # Ok(())
//! # }
//! ```

pub mod plugin;

pub use plugin::GroundProjectionPlugin;

use serde::{Deserialize, Serialize};
use speed_overlay_common::Point2D;
use thiserror::Error;
use tracing::debug;

/// Tolerance below which a cross product or pivot is treated as zero
const GEOMETRY_EPS: f64 = 1e-9;

/// Perspective mapping errors
#[derive(Debug, Error)]
pub enum PerspectiveError {
    /// The source or target quadrilateral admits no finite homography
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A point mapped to a near-zero homogeneous weight
    #[error("Degenerate projection at point ({x}, {y})")]
    DegenerateProjection { x: f64, y: f64 },
}

/// Calibration loaded at startup (YAML via the CLI)
///
/// Defaults match the reference highway calibration: a narrow 25x250 unit
/// strip approximating one road lane length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Source quadrilateral corners in pixel space (TL, TR, BR, BL)
    pub source_quad: [[f64; 2]; 4],
    /// Target plane width in metric units
    pub target_width: f64,
    /// Target plane height in metric units
    pub target_height: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            source_quad: [
                [1252.0, 787.0],
                [2298.0, 803.0],
                [5039.0, 2159.0],
                [-550.0, 2159.0],
            ],
            target_width: 25.0,
            target_height: 250.0,
        }
    }
}

impl CalibrationConfig {
    /// Build a mapper from this calibration, failing fast on bad geometry
    pub fn build_mapper(&self) -> Result<PerspectiveMapper, PerspectiveError> {
        let corners = [
            Point2D::new(self.source_quad[0][0], self.source_quad[0][1]),
            Point2D::new(self.source_quad[1][0], self.source_quad[1][1]),
            Point2D::new(self.source_quad[2][0], self.source_quad[2][1]),
            Point2D::new(self.source_quad[3][0], self.source_quad[3][1]),
        ];
        let region = SourceRegion::new(corners)?;
        let plane = TargetPlane::new(self.target_width, self.target_height)?;
        PerspectiveMapper::new(&region, &plane)
    }
}

/// An ordered quadrilateral in image pixel space (TL, TR, BR, BL)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceRegion {
    corners: [Point2D; 4],
}

impl SourceRegion {
    /// Validate and construct a source region.
    ///
    /// Rejects quads with three consecutive collinear corners or (near-)zero
    /// area, since no finite homography exists for them.
    pub fn new(corners: [Point2D; 4]) -> Result<Self, PerspectiveError> {
        validate_quad(&corners, "source region")?;
        Ok(Self { corners })
    }

    pub fn corners(&self) -> &[Point2D; 4] {
        &self.corners
    }

    /// Signed area (shoelace); the sign encodes winding order
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.corners)
    }
}

/// An axis-aligned metric rectangle the source region is mapped onto
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetPlane {
    width: f64,
    height: f64,
}

impl TargetPlane {
    pub fn new(width: f64, height: f64) -> Result<Self, PerspectiveError> {
        if !(width > 1.0 && height > 1.0) || !width.is_finite() || !height.is_finite() {
            return Err(PerspectiveError::InvalidGeometry(format!(
                "target plane dimensions must exceed 1 unit, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Corners in the same winding order as the source region (TL, TR, BR, BL)
    pub fn corners(&self) -> [Point2D; 4] {
        [
            Point2D::new(0.0, 0.0),
            Point2D::new(self.width - 1.0, 0.0),
            Point2D::new(self.width - 1.0, self.height - 1.0),
            Point2D::new(0.0, self.height - 1.0),
        ]
    }
}

/// An immutable 3x3 homography in row-major order
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    m: [[f64; 3]; 3],
}

impl PerspectiveTransform {
    /// Compute the homography mapping each `src` corner onto the matching
    /// `dst` corner, by direct linear transform: eight unknowns (h9 = 1),
    /// two equations per correspondence, solved with Gaussian elimination.
    pub fn from_quads(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Result<Self, PerspectiveError> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (xp, yp) = (dst[i].x, dst[i].y);

            a[i * 2] = [x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y];
            b[i * 2] = xp;

            a[i * 2 + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y];
            b[i * 2 + 1] = yp;
        }

        let h = solve_linear_system(&mut a, &mut b)?;

        Ok(Self {
            m: [
                [h[0], h[1], h[2]],
                [h[3], h[4], h[5]],
                [h[6], h[7], 1.0],
            ],
        })
    }

    /// Apply the homography to one point and normalize by the homogeneous
    /// weight. A near-zero weight means the point lies on the horizon line
    /// of the mapping and has no finite image.
    pub fn apply(&self, p: Point2D) -> Result<Point2D, PerspectiveError> {
        let w = self.m[2][0] * p.x + self.m[2][1] * p.y + self.m[2][2];
        if w.abs() < GEOMETRY_EPS {
            return Err(PerspectiveError::DegenerateProjection { x: p.x, y: p.y });
        }

        let x = (self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2]) / w;
        let y = (self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2]) / w;
        Ok(Point2D::new(x, y))
    }

    /// Row-major matrix entries
    pub fn matrix(&self) -> &[[f64; 3]; 3] {
        &self.m
    }
}

/// Maps pixel-space points onto the calibrated metric ground plane
#[derive(Debug, Clone)]
pub struct PerspectiveMapper {
    transform: PerspectiveTransform,
}

impl PerspectiveMapper {
    /// Build the mapper for a calibration pair.
    ///
    /// The two quadrilaterals must be listed in the same winding order;
    /// a mismatch would silently mirror the ground plane, so it is rejected
    /// here instead.
    pub fn new(region: &SourceRegion, plane: &TargetPlane) -> Result<Self, PerspectiveError> {
        let target_corners = plane.corners();

        let src_area = region.signed_area();
        let dst_area = signed_area(&target_corners);
        if src_area.signum() != dst_area.signum() {
            return Err(PerspectiveError::InvalidGeometry(
                "source region and target plane have opposite winding orders".to_string(),
            ));
        }

        let transform = PerspectiveTransform::from_quads(region.corners(), &target_corners)?;
        debug!(
            "Perspective mapper ready: {:?} -> {}x{} plane",
            region.corners(),
            plane.width(),
            plane.height()
        );

        Ok(Self { transform })
    }

    /// Map a single pixel-space point to the metric plane
    pub fn transform_point(&self, p: Point2D) -> Result<Point2D, PerspectiveError> {
        self.transform.apply(p)
    }

    /// Map a batch of points, preserving count and order.
    ///
    /// Fails on the first degenerate point; callers that want per-point
    /// degradation use [`transform_point`](Self::transform_point) instead.
    pub fn transform_points(&self, points: &[Point2D]) -> Result<Vec<Point2D>, PerspectiveError> {
        let mut out = Vec::with_capacity(points.len());
        for p in points {
            out.push(self.transform.apply(*p)?);
        }
        Ok(out)
    }

    pub fn transform(&self) -> &PerspectiveTransform {
        &self.transform
    }
}

/// Shoelace signed area of a quadrilateral
fn signed_area(corners: &[Point2D; 4]) -> f64 {
    let mut sum = 0.0;
    for i in 0..4 {
        let p = corners[i];
        let q = corners[(i + 1) % 4];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// Reject quads that cannot anchor a homography
fn validate_quad(corners: &[Point2D; 4], what: &str) -> Result<(), PerspectiveError> {
    for p in corners {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(PerspectiveError::InvalidGeometry(format!(
                "{what} has a non-finite corner ({}, {})",
                p.x, p.y
            )));
        }
    }

    // No three consecutive corners may be collinear
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let c = corners[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if cross.abs() < GEOMETRY_EPS {
            return Err(PerspectiveError::InvalidGeometry(format!(
                "{what} has collinear corners at indices {}, {}, {}",
                i,
                (i + 1) % 4,
                (i + 2) % 4
            )));
        }
    }

    if signed_area(corners).abs() < GEOMETRY_EPS {
        return Err(PerspectiveError::InvalidGeometry(format!(
            "{what} has zero area"
        )));
    }

    Ok(())
}

/// Solve an 8x8 linear system using Gaussian elimination with partial
/// pivoting. A vanishing pivot means the corner correspondences are
/// degenerate and the system has no unique solution.
fn solve_linear_system(
    a: &mut [[f64; 8]; 8],
    b: &mut [f64; 8],
) -> Result<[f64; 8], PerspectiveError> {
    let n = 8;

    for col in 0..n {
        // Find pivot
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..n {
            if a[row][col].abs() > max_val {
                max_val = a[row][col].abs();
                max_row = row;
            }
        }

        if max_val < GEOMETRY_EPS {
            return Err(PerspectiveError::InvalidGeometry(
                "corner correspondences produce a singular system".to_string(),
            ));
        }

        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        // Eliminate below the pivot
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = [0.0f64; 8];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }

    Ok(x)
}
