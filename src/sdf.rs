//! Signed distance field generation.
//!
//! Distances are measured against the raw outline, lines and quadratic
//! curves, not against a flattened polygon. The sign comes from a
//! non-zero winding test along a horizontal ray.

use crate::raster::{GlyphBitmap, PixelRect};
use crate::{Font, GlyphId, Vertex};

/// A segment with pre-scaled coordinates and a precomputed factor:
/// the reciprocal length for lines, the reciprocal squared acceleration
/// for quadratics.
enum Segment {
    Line {
        // (x0, y0) is the segment end, matching the orientation the
        // distance formulas below were derived in.
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        inv_dist: f32,
    },
    Quad {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        a_inv: f32,
    },
}

/// An outline segment in font units, for the winding test.
enum RawSegment {
    Line { x0: f32, y0: f32, x1: f32, y1: f32 },
    Quad { x0: f32, y0: f32, cx: f32, cy: f32, x1: f32, y1: f32 },
}

impl<'a> Font<'a> {
    /// Renders a glyph as a signed distance field.
    ///
    /// Each output byte is `onedge_value + pixel_dist_scale * distance`
    /// clamped to 0..=255, with the distance measured in pixels, negative
    /// outside the glyph. `padding` extends the bitmap box so the field
    /// has room to fall off.
    ///
    /// Returns `None` for empty glyphs and a zero scale.
    pub fn glyph_sdf(
        &self,
        scale: f32,
        glyph_id: GlyphId,
        padding: i32,
        onedge_value: u8,
        pixel_dist_scale: f32,
    ) -> Option<GlyphBitmap> {
        if scale == 0.0 {
            return None;
        }

        let bounds = self.glyph_bitmap_box_subpixel(glyph_id, scale, scale, 0.0, 0.0);
        if bounds.x0 == bounds.x1 || bounds.y0 == bounds.y1 {
            return None;
        }

        let shape = self.glyph_shape(glyph_id);
        render_sdf(&shape, scale, bounds, padding, onedge_value, pixel_dist_scale)
    }

    /// [`glyph_sdf`](Self::glyph_sdf) for the glyph a code point maps to.
    #[inline]
    pub fn codepoint_sdf(
        &self,
        scale: f32,
        code_point: u32,
        padding: i32,
        onedge_value: u8,
        pixel_dist_scale: f32,
    ) -> Option<GlyphBitmap> {
        self.glyph_sdf(
            scale,
            self.glyph_index(code_point),
            padding,
            onedge_value,
            pixel_dist_scale,
        )
    }
}

fn render_sdf(
    shape: &[Vertex],
    scale: f32,
    bounds: PixelRect,
    padding: i32,
    onedge_value: u8,
    pixel_dist_scale: f32,
) -> Option<GlyphBitmap> {
    let ix0 = bounds.x0 - padding;
    let iy0 = bounds.y0 - padding;
    let ix1 = bounds.x1 + padding;
    let iy1 = bounds.y1 + padding;
    let w = (ix1 - ix0).max(0) as u32;
    let h = (iy1 - iy0).max(0) as u32;
    if w == 0 || h == 0 {
        return None;
    }

    let scale_x = scale;
    // Invert for y-down bitmaps.
    let scale_y = -scale;

    let (segments, raw_segments) = build_segments(shape, scale_x, scale_y);

    let mut pixels = vec![0u8; w as usize * h as usize];
    for y in iy0..iy1 {
        for x in ix0..ix1 {
            let sx = x as f32 + 0.5;
            let sy = y as f32 + 0.5;
            let x_gspace = sx / scale_x;
            let y_gspace = sy / scale_y;

            let winding = compute_crossings_x(x_gspace, y_gspace, &raw_segments);
            let mut min_dist = 999999.0f32;

            for segment in &segments {
                match *segment {
                    Segment::Line { x0, y0, x1, y1, inv_dist } => {
                        // The segment end is always a candidate.
                        let dist2 = (x0 - sx) * (x0 - sx) + (y0 - sy) * (y0 - sy);
                        if dist2 < min_dist * min_dist {
                            min_dist = dist2.sqrt();
                        }

                        // Perpendicular distance, valid only when the foot
                        // of the perpendicular lies inside the segment.
                        let dist =
                            ((x1 - x0) * (y0 - sy) - (y1 - y0) * (x0 - sx)).abs() * inv_dist;
                        if dist < min_dist {
                            let dx = x1 - x0;
                            let dy = y1 - y0;
                            let px = x0 - sx;
                            let py = y0 - sy;
                            let t = -(px * dx + py * dy) / (dx * dx + dy * dy);
                            if (0.0..=1.0).contains(&t) {
                                min_dist = dist;
                            }
                        }
                    }
                    Segment::Quad { x0, y0, x1, y1, x2, y2, a_inv } => {
                        let box_x0 = x0.min(x1).min(x2);
                        let box_y0 = y0.min(y1).min(y2);
                        let box_x1 = x0.max(x1).max(x2);
                        let box_y1 = y0.max(y1).max(y2);
                        // Coarse culling against the control box.
                        if sx > box_x0 - min_dist
                            && sx < box_x1 + min_dist
                            && sy > box_y0 - min_dist
                            && sy < box_y1 + min_dist
                        {
                            let ax = x1 - x0;
                            let ay = y1 - y0;
                            let bx = x0 - 2.0 * x1 + x2;
                            let by = y0 - 2.0 * y1 + y2;
                            let mx = x0 - sx;
                            let my = y0 - sy;

                            let mut res = [0.0f32; 3];
                            let num;
                            if a_inv == 0.0 {
                                // The curve is degenerate: the cubic's
                                // leading term vanishes, leaving
                                // a quadratic in t.
                                let a = 3.0 * (ax * bx + ay * by);
                                let b = 2.0 * (ax * ax + ay * ay) + (mx * bx + my * by);
                                let c = mx * ax + my * ay;
                                if a == 0.0 {
                                    if b != 0.0 {
                                        res[0] = -c / b;
                                        num = 1;
                                    } else {
                                        num = 0;
                                    }
                                } else {
                                    let discriminant = b * b - 4.0 * a * c;
                                    if discriminant < 0.0 {
                                        num = 0;
                                    } else {
                                        let root = discriminant.sqrt();
                                        res[0] = (-b - root) / (2.0 * a);
                                        res[1] = (-b + root) / (2.0 * a);
                                        num = 2;
                                    }
                                }
                            } else {
                                let b = 3.0 * (ax * bx + ay * by) * a_inv;
                                let c = (2.0 * (ax * ax + ay * ay) + (mx * bx + my * by)) * a_inv;
                                let d = (mx * ax + my * ay) * a_inv;
                                num = solve_cubic(b, c, d, &mut res);
                            }

                            let dist2 = (x0 - sx) * (x0 - sx) + (y0 - sy) * (y0 - sy);
                            if dist2 < min_dist * min_dist {
                                min_dist = dist2.sqrt();
                            }

                            for &t in res.iter().take(num) {
                                if (0.0..=1.0).contains(&t) {
                                    let it = 1.0 - t;
                                    let px = it * it * x0 + 2.0 * t * it * x1 + t * t * x2;
                                    let py = it * it * y0 + 2.0 * t * it * y1 + t * t * y2;
                                    let dist2 =
                                        (px - sx) * (px - sx) + (py - sy) * (py - sy);
                                    if dist2 < min_dist * min_dist {
                                        min_dist = dist2.sqrt();
                                    }
                                }
                            }
                        }
                    }
                }
            }

            let signed = if winding == 0 { -min_dist } else { min_dist };
            let val = onedge_value as f32 + pixel_dist_scale * signed;
            let index = (y - iy0) as usize * w as usize + (x - ix0) as usize;
            pixels[index] = val.max(0.0).min(255.0) as u8;
        }
    }

    Some(GlyphBitmap {
        pixels,
        width: w,
        height: h,
        xoff: ix0,
        yoff: iy0,
    })
}

fn build_segments(shape: &[Vertex], scale_x: f32, scale_y: f32) -> (Vec<Segment>, Vec<RawSegment>) {
    let mut segments = Vec::new();
    let mut raw_segments = Vec::new();

    let mut cx = 0.0f32;
    let mut cy = 0.0f32;
    for vertex in shape {
        match *vertex {
            Vertex::MoveTo { x, y } => {
                cx = x;
                cy = y;
            }
            Vertex::LineTo { x, y } => {
                let x0 = x * scale_x;
                let y0 = y * scale_y;
                let x1 = cx * scale_x;
                let y1 = cy * scale_y;
                let dist = ((x1 - x0) * (x1 - x0) + (y1 - y0) * (y1 - y0)).sqrt();
                segments.push(Segment::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    inv_dist: if dist == 0.0 { 0.0 } else { 1.0 / dist },
                });
                raw_segments.push(RawSegment::Line {
                    x0: cx,
                    y0: cy,
                    x1: x,
                    y1: y,
                });
                cx = x;
                cy = y;
            }
            Vertex::QuadTo { x1, y1, x, y } => {
                let sx2 = cx * scale_x;
                let sy2 = cy * scale_y;
                let sx1 = x1 * scale_x;
                let sy1 = y1 * scale_y;
                let sx0 = x * scale_x;
                let sy0 = y * scale_y;
                let bx = sx0 - 2.0 * sx1 + sx2;
                let by = sy0 - 2.0 * sy1 + sy2;
                let len2 = bx * bx + by * by;
                segments.push(Segment::Quad {
                    x0: sx0,
                    y0: sy0,
                    x1: sx1,
                    y1: sy1,
                    x2: sx2,
                    y2: sy2,
                    a_inv: if len2 != 0.0 { 1.0 / len2 } else { 0.0 },
                });
                raw_segments.push(RawSegment::Quad {
                    x0: cx,
                    y0: cy,
                    cx: x1,
                    cy: y1,
                    x1: x,
                    y1: y,
                });
                cx = x;
                cy = y;
            }
            Vertex::CurveTo { x, y, .. } => {
                // Cubic segments are not measured; only their endpoints
                // advance the pen. TrueType outlines never produce them.
                cx = x;
                cy = y;
            }
        }
    }

    (segments, raw_segments)
}

/// Counts signed crossings of a leftward horizontal ray ending at `(x, y)`.
fn compute_crossings_x(x: f32, mut y: f32, segments: &[RawSegment]) -> i32 {
    // Nudge the ray off coincident vertices.
    let y_frac = y % 1.0;
    if y_frac < 0.01 {
        y += 0.01;
    } else if y_frac > 0.99 {
        y -= 0.01;
    }

    let mut winding = 0i32;
    for segment in segments {
        match *segment {
            RawSegment::Line { x0, y0, x1, y1 } => {
                winding += line_crossing(x, y, x0, y0, x1, y1);
            }
            RawSegment::Quad { x0, y0, cx, cy, x1, y1 } => {
                let ax = x0.min(cx).min(x1);
                let ay = y0.min(cy).min(y1);
                let by = y0.max(cy).max(y1);
                if y > ay && y < by && x > ax {
                    if (x0 == cx && y0 == cy) || (cx == x1 && cy == y1) {
                        // A degenerate curve is a line.
                        winding += line_crossing(x, y, x0, y0, x1, y1);
                    } else {
                        let mut hits = [[0.0f32; 2]; 2];
                        let num = ray_intersect_bezier(
                            [x, y],
                            [1.0, 0.0],
                            [x0, y0],
                            [cx, cy],
                            [x1, y1],
                            &mut hits,
                        );
                        if num >= 1 && hits[0][0] < 0.0 {
                            winding += if hits[0][1] < 0.0 { -1 } else { 1 };
                        }
                        if num >= 2 && hits[1][0] < 0.0 {
                            winding += if hits[1][1] < 0.0 { -1 } else { 1 };
                        }
                    }
                }
            }
        }
    }

    winding
}

fn line_crossing(x: f32, y: f32, x0: f32, y0: f32, x1: f32, y1: f32) -> i32 {
    if y > y0.min(y1) && y < y0.max(y1) && x > x0.min(x1) {
        let x_inter = (y - y0) / (y1 - y0) * (x1 - x0) + x0;
        if x_inter < x {
            return if y0 < y1 { 1 } else { -1 };
        }
    }

    0
}

/// Intersects a ray with a quadratic curve.
///
/// Each hit stores the signed distance along the ray and the sign of the
/// curve's crossing direction.
fn ray_intersect_bezier(
    orig: [f32; 2],
    ray: [f32; 2],
    q0: [f32; 2],
    q1: [f32; 2],
    q2: [f32; 2],
    hits: &mut [[f32; 2]; 2],
) -> usize {
    let q0perp = q0[1] * ray[0] - q0[0] * ray[1];
    let q1perp = q1[1] * ray[0] - q1[0] * ray[1];
    let q2perp = q2[1] * ray[0] - q2[0] * ray[1];
    let roperp = orig[1] * ray[0] - orig[0] * ray[1];

    let a = q0perp - 2.0 * q1perp + q2perp;
    let b = q1perp - q0perp;
    let c = q0perp - roperp;

    let mut s0 = 0.0f32;
    let mut s1 = 0.0f32;
    let mut num_s = 0usize;

    if a != 0.0 {
        let discr = b * b - a * c;
        if discr > 0.0 {
            let rcpna = -1.0 / a;
            let d = discr.sqrt();
            s0 = (b + d) * rcpna;
            s1 = (b - d) * rcpna;
            if (0.0..=1.0).contains(&s0) {
                num_s = 1;
            }
            if d > 0.0 && (0.0..=1.0).contains(&s1) {
                if num_s == 0 {
                    s0 = s1;
                }
                num_s += 1;
            }
        }
    } else {
        // 2*b*s + c = 0
        if b != 0.0 {
            s0 = c / (-2.0 * b);
            if (0.0..=1.0).contains(&s0) {
                num_s = 1;
            }
        }
    }

    if num_s == 0 {
        return 0;
    }

    let rcp_len2 = 1.0 / (ray[0] * ray[0] + ray[1] * ray[1]);
    let rayn_x = ray[0] * rcp_len2;
    let rayn_y = ray[1] * rcp_len2;

    let q0d = q0[0] * rayn_x + q0[1] * rayn_y;
    let q1d = q1[0] * rayn_x + q1[1] * rayn_y;
    let q2d = q2[0] * rayn_x + q2[1] * rayn_y;
    let rod = orig[0] * rayn_x + orig[1] * rayn_y;

    let q10d = q1d - q0d;
    let q20d = q2d - q0d;
    let q0rd = q0d - rod;

    hits[0][0] = q0rd + s0 * (2.0 - 2.0 * s0) * q10d + s0 * s0 * q20d;
    hits[0][1] = a * s0 + b;

    if num_s > 1 {
        hits[1][0] = q0rd + s1 * (2.0 - 2.0 * s1) * q10d + s1 * s1 * q20d;
        hits[1][1] = a * s1 + b;
        2
    } else {
        1
    }
}

fn cube_root(x: f32) -> f32 {
    if x < 0.0 {
        -(-x).powf(1.0 / 3.0)
    } else {
        x.powf(1.0 / 3.0)
    }
}

/// Solves `t^3 + a*t^2 + b*t + c = 0`.
///
/// Cardano's formula for a single real root, the trigonometric branch
/// for three. The discriminant split is tuned for stability; candidates
/// outside 0..=1 are filtered by the caller.
fn solve_cubic(a: f32, b: f32, c: f32, r: &mut [f32; 3]) -> usize {
    let s = -a / 3.0;
    let p = b - a * a / 3.0;
    let q = a * (2.0 * a * a - 9.0 * b) / 27.0 + c;
    let p3 = p * p * p;
    let d = q * q + 4.0 * p3 / 27.0;

    if d >= 0.0 {
        let z = d.sqrt();
        let u = cube_root((-q + z) / 2.0);
        let v = cube_root((-q - z) / 2.0);
        r[0] = s + u + v;
        1
    } else {
        // p3 is negative here, since d is.
        let u = (-p / 3.0).sqrt();
        let arg = (-(-27.0 / p3).sqrt() * q / 2.0).max(-1.0).min(1.0);
        let v = arg.acos() / 3.0;
        let m = v.cos();
        let n = v.sin() * 1.732_050_8;
        r[0] = s + u * 2.0 * m;
        r[1] = s - u * (m + n);
        r[2] = s - u * (m - n);
        3
    }
}
