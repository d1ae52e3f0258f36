//! Adaptive flattening of glyph outlines into polygons.

use crate::Vertex;

/// Subdivision depth cap: 2^16 segments for a single curve are plenty,
/// and it stops runaway recursion on degenerate control points.
const MAX_SUBDIVISION_DEPTH: u8 = 16;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Flattened outline: all contour points back to back,
/// plus one length per contour.
pub struct Windings {
    pub points: Vec<Point>,
    pub contour_lengths: Vec<usize>,
}

/// Converts an outline into line contours.
///
/// `objspace_flatness` is the maximum allowed deviation from the true
/// curve, in font units, which keeps the result scale-invariant.
pub fn flatten_curves(vertices: &[Vertex], objspace_flatness: f32) -> Option<Windings> {
    let objspace_flatness_squared = objspace_flatness * objspace_flatness;

    let mut windings = Windings {
        points: Vec::new(),
        contour_lengths: Vec::new(),
    };

    let mut start = 0usize;
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    for vertex in vertices {
        match *vertex {
            Vertex::MoveTo { x: vx, y: vy } => {
                // Start the next contour.
                if !windings.points.is_empty() || !windings.contour_lengths.is_empty() {
                    windings.contour_lengths.push(windings.points.len() - start);
                }

                start = windings.points.len();
                x = vx;
                y = vy;
                windings.points.push(Point { x, y });
            }
            Vertex::LineTo { x: vx, y: vy } => {
                x = vx;
                y = vy;
                windings.points.push(Point { x, y });
            }
            Vertex::QuadTo { x1, y1, x: vx, y: vy } => {
                tesselate_curve(
                    &mut windings.points,
                    x,
                    y,
                    x1,
                    y1,
                    vx,
                    vy,
                    objspace_flatness_squared,
                    0,
                );
                x = vx;
                y = vy;
            }
            Vertex::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x: vx,
                y: vy,
            } => {
                tesselate_cubic(
                    &mut windings.points,
                    x,
                    y,
                    x1,
                    y1,
                    x2,
                    y2,
                    vx,
                    vy,
                    objspace_flatness_squared,
                    0,
                );
                x = vx;
                y = vy;
            }
        }
    }

    if windings.points.is_empty() {
        return None;
    }

    windings.contour_lengths.push(windings.points.len() - start);
    Some(windings)
}

/// Subdivides a quadratic curve until the midpoint error is small enough.
#[allow(clippy::too_many_arguments)]
fn tesselate_curve(
    points: &mut Vec<Point>,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    objspace_flatness_squared: f32,
    depth: u8,
) {
    // Midpoint of the curve versus midpoint of the chord.
    let mx = (x0 + 2.0 * x1 + x2) / 4.0;
    let my = (y0 + 2.0 * y1 + y2) / 4.0;
    let dx = (x0 + x2) / 2.0 - mx;
    let dy = (y0 + y2) / 2.0 - my;

    if depth > MAX_SUBDIVISION_DEPTH {
        return;
    }

    if dx * dx + dy * dy > objspace_flatness_squared {
        tesselate_curve(
            points,
            x0,
            y0,
            (x0 + x1) / 2.0,
            (y0 + y1) / 2.0,
            mx,
            my,
            objspace_flatness_squared,
            depth + 1,
        );
        tesselate_curve(
            points,
            mx,
            my,
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0,
            x2,
            y2,
            objspace_flatness_squared,
            depth + 1,
        );
    } else {
        points.push(Point { x: x2, y: y2 });
    }
}

/// Subdivides a cubic curve.
///
/// The flatness measure compares the control polygon length against the
/// chord length, which overestimates the true error but is cheap and
/// behaves well in practice.
#[allow(clippy::too_many_arguments)]
fn tesselate_cubic(
    points: &mut Vec<Point>,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    x3: f32,
    y3: f32,
    objspace_flatness_squared: f32,
    depth: u8,
) {
    let dx0 = x1 - x0;
    let dy0 = y1 - y0;
    let dx1 = x2 - x1;
    let dy1 = y2 - y1;
    let dx2 = x3 - x2;
    let dy2 = y3 - y2;
    let dx = x3 - x0;
    let dy = y3 - y0;
    let longlen = (dx0 * dx0 + dy0 * dy0).sqrt()
        + (dx1 * dx1 + dy1 * dy1).sqrt()
        + (dx2 * dx2 + dy2 * dy2).sqrt();
    let shortlen = (dx * dx + dy * dy).sqrt();
    let flatness_squared = longlen * longlen - shortlen * shortlen;

    if depth > MAX_SUBDIVISION_DEPTH {
        return;
    }

    if flatness_squared > objspace_flatness_squared {
        let x01 = (x0 + x1) / 2.0;
        let y01 = (y0 + y1) / 2.0;
        let x12 = (x1 + x2) / 2.0;
        let y12 = (y1 + y2) / 2.0;
        let x23 = (x2 + x3) / 2.0;
        let y23 = (y2 + y3) / 2.0;

        let xa = (x01 + x12) / 2.0;
        let ya = (y01 + y12) / 2.0;
        let xb = (x12 + x23) / 2.0;
        let yb = (y12 + y23) / 2.0;

        let mx = (xa + xb) / 2.0;
        let my = (ya + yb) / 2.0;

        tesselate_cubic(
            points,
            x0,
            y0,
            x01,
            y01,
            xa,
            ya,
            mx,
            my,
            objspace_flatness_squared,
            depth + 1,
        );
        tesselate_cubic(
            points,
            mx,
            my,
            xb,
            yb,
            x23,
            y23,
            x3,
            y3,
            objspace_flatness_squared,
            depth + 1,
        );
    } else {
        points.push(Point { x: x3, y: y3 });
    }
}
