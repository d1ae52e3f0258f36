//! The analytic anti-aliased scanline rasterizer.
//!
//! Outlines are flattened into polygon contours, the contours are blown
//! out into an edge list, and each output row integrates the exact signed
//! trapezoid area every active edge contributes to every pixel it crosses.
//! The winding rule is non-zero.

use crate::flatten::{self, Point};
use crate::{Font, GlyphId, Vertex, DEFAULT_FLATNESS};

/// An integer pixel-space bounding box, `x1`/`y1` exclusive.
///
/// All zeros for glyphs without an outline.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[allow(missing_docs)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    /// Box width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        (self.x1 - self.x0).max(0) as u32
    }

    /// Box height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        (self.y1 - self.y0).max(0) as u32
    }
}

/// An 8-bit coverage bitmap owned by the engine.
///
/// 0 is fully transparent, 255 fully covered. `xoff`/`yoff` position the
/// bitmap's top-left corner relative to the glyph origin, y growing down.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct GlyphBitmap {
    /// Row-major pixels, `width * height` bytes.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Horizontal offset from the glyph origin.
    pub xoff: i32,
    /// Vertical offset from the glyph origin.
    pub yoff: i32,
}

/// A caller-owned output target.
#[derive(Debug)]
pub struct BitmapView<'a> {
    pub(crate) pixels: &'a mut [u8],
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) stride: usize,
}

impl<'a> BitmapView<'a> {
    /// Wraps caller memory as a render target.
    ///
    /// Returns `None` when the buffer is too small for
    /// `stride * (height - 1) + width` bytes.
    pub fn new(pixels: &'a mut [u8], width: u32, height: u32, stride: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            return Some(BitmapView {
                pixels,
                width,
                height,
                stride,
            });
        }

        if stride < width as usize {
            return None;
        }

        let required = stride * (height as usize - 1) + width as usize;
        if pixels.len() < required {
            return None;
        }

        Some(BitmapView {
            pixels,
            width,
            height,
            stride,
        })
    }
}

struct Edge {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    invert: bool,
}

/// An edge intersecting the current scanline.
///
/// `fx` is the x position at the current row top, advanced by `fdx`
/// per row. `direction` carries the winding sign.
#[derive(Clone, Copy)]
struct ActiveEdge {
    fx: f32,
    fdx: f32,
    fdy: f32,
    direction: f32,
    sy: f32,
    ey: f32,
}

impl ActiveEdge {
    fn new(e: &Edge, off_x: i32, start_point: f32) -> Self {
        let dxdy = (e.x1 - e.x0) / (e.y1 - e.y0);
        ActiveEdge {
            fx: e.x0 + dxdy * (start_point - e.y0) - off_x as f32,
            fdx: dxdy,
            fdy: if dxdy != 0.0 { 1.0 / dxdy } else { 0.0 },
            direction: if e.invert { 1.0 } else { -1.0 },
            sy: e.y0,
            ey: e.y1,
        }
    }
}

/// Rasterizes an outline into the target bitmap.
///
/// Coordinates are mapped as `x * scale_x + shift_x` and, when `invert`
/// is set for the usual y-down bitmap, `y * -scale_y + shift_y`.
/// `off_x`/`off_y` position the target inside that pixel space.
pub fn rasterize(
    target: &mut BitmapView,
    vertices: &[Vertex],
    flatness_in_pixels: f32,
    scale_x: f32,
    scale_y: f32,
    shift_x: f32,
    shift_y: f32,
    off_x: i32,
    off_y: i32,
    invert: bool,
) {
    if target.width == 0 || target.height == 0 {
        return;
    }

    // The flatness threshold lives in object space so the subdivision
    // depth adapts to the render scale.
    let scale = scale_x.max(scale_y);
    if scale <= 0.0 {
        return;
    }

    let windings = match flatten::flatten_curves(vertices, flatness_in_pixels / scale) {
        Some(windings) => windings,
        None => return,
    };

    rasterize_windings(
        target, &windings.points, &windings.contour_lengths, scale_x, scale_y, shift_x, shift_y,
        off_x, off_y, invert,
    );
}

#[allow(clippy::too_many_arguments)]
fn rasterize_windings(
    target: &mut BitmapView,
    points: &[Point],
    contour_lengths: &[usize],
    scale_x: f32,
    scale_y: f32,
    shift_x: f32,
    shift_y: f32,
    off_x: i32,
    off_y: i32,
    invert: bool,
) {
    let y_scale_inv = if invert { -scale_y } else { scale_y };

    let mut edges = Vec::with_capacity(points.len() + 1);
    let mut m = 0;
    for &count in contour_lengths {
        let contour = match points.get(m..m + count) {
            Some(contour) => contour,
            None => return,
        };
        m += count;

        if count < 2 {
            continue;
        }

        let mut j = count - 1;
        for k in 0..count {
            // Horizontal edges never contribute.
            if contour[j].y == contour[k].y {
                j = k;
                continue;
            }

            // Direction is judged in target space, after a possible y flip.
            let ascending = if invert {
                contour[j].y > contour[k].y
            } else {
                contour[j].y < contour[k].y
            };
            let (a, b) = if ascending { (j, k) } else { (k, j) };

            edges.push(Edge {
                x0: contour[a].x * scale_x + shift_x,
                y0: contour[a].y * y_scale_inv + shift_y,
                x1: contour[b].x * scale_x + shift_x,
                y1: contour[b].y * y_scale_inv + shift_y,
                invert: ascending,
            });

            j = k;
        }
    }

    edges.sort_unstable_by(|a, b| a.y0.partial_cmp(&b.y0).unwrap_or(core::cmp::Ordering::Equal));

    // A sentinel stops the insertion scan past the last row.
    edges.push(Edge {
        x0: 0.0,
        y0: (off_y + target.height as i32) as f32 + 1.0,
        x1: 0.0,
        y1: 0.0,
        invert: false,
    });

    rasterize_sorted_edges(target, &edges, off_x, off_y);
}

fn rasterize_sorted_edges(target: &mut BitmapView, edges: &[Edge], off_x: i32, off_y: i32) {
    let w = target.width as usize;

    // Per-row exact coverage plus a running "everything to the right
    // is filled" delta buffer, one entry wider.
    let mut scanline = vec![0.0f32; w];
    let mut scanline2 = vec![0.0f32; w + 1];

    // The active edge pool lives for the whole call.
    let mut active: Vec<ActiveEdge> = Vec::new();

    let mut e = 0usize;
    let mut y = off_y;
    for j in 0..target.height as usize {
        let scan_y_top = y as f32;
        let scan_y_bottom = scan_y_top + 1.0;

        scanline.iter_mut().for_each(|v| *v = 0.0);
        scanline2.iter_mut().for_each(|v| *v = 0.0);

        // Retire edges that end above this scanline.
        active.retain(|z| z.ey > scan_y_top);

        // Admit edges that start before its bottom.
        while edges[e].y0 <= scan_y_bottom {
            if edges[e].y0 != edges[e].y1 {
                let mut z = ActiveEdge::new(&edges[e], off_x, scan_y_top);
                if j == 0 && off_y != 0 && z.ey < scan_y_top {
                    // Subpixel positioning can push an edge end a hair
                    // above the first scanline.
                    z.ey = scan_y_top;
                }
                active.push(z);
            }
            e += 1;
        }

        for z in &active {
            fill_active_edge(&mut scanline, &mut scanline2, w, z, scan_y_top);
        }

        // Emit the row: running sum over the fill deltas, plus the
        // per-pixel area, scaled to a byte.
        let mut sum = 0.0f32;
        let row = j * target.stride;
        for i in 0..w {
            sum += scanline2[i];
            let k = (scanline[i] + sum).abs() * 255.0 + 0.5;
            target.pixels[row + i] = (k as i32).min(255) as u8;
        }

        for z in &mut active {
            z.fx += z.fdx;
        }

        y += 1;
    }
}

// The area of a trapezoid with two horizontal sides of the given widths.
#[inline]
fn sized_trapezoid_area(height: f32, top_width: f32, bottom_width: f32) -> f32 {
    (top_width + bottom_width) / 2.0 * height
}

#[inline]
fn position_trapezoid_area(height: f32, tx0: f32, tx1: f32, bx0: f32, bx1: f32) -> f32 {
    sized_trapezoid_area(height, tx1 - tx0, bx1 - bx0)
}

#[inline]
fn sized_triangle_area(height: f32, width: f32) -> f32 {
    height * width / 2.0
}

/// Integrates one active edge's contribution to one scanline.
///
/// `fill` is one entry wider than `scanline`: `fill[i + 1]` says the area
/// right of pixel `i` gains the given winding from this row downward.
fn fill_active_edge(scanline: &mut [f32], fill: &mut [f32], len: usize, e: &ActiveEdge, y_top: f32) {
    let y_bottom = y_top + 1.0;
    debug_assert!(e.ey >= y_top);

    if e.fdx == 0.0 {
        let x0 = e.fx;
        if x0 < len as f32 {
            if x0 >= 0.0 {
                handle_clipped_edge(scanline, x0 as usize, e, x0, y_top, x0, y_bottom);
                handle_clipped_edge(fill, x0 as usize + 1, e, x0, y_top, x0, y_bottom);
            } else {
                handle_clipped_edge(fill, 0, e, x0, y_top, x0, y_bottom);
            }
        }
        return;
    }

    let mut x0 = e.fx;
    let mut dx = e.fdx;
    let xb = x0 + dx;
    let mut dy = e.fdy;
    debug_assert!(e.sy <= y_bottom && e.ey >= y_top);

    // Clip the segment to this scanline when it starts or ends inside it.
    let (x_top, sy0) = if e.sy > y_top {
        (x0 + dx * (e.sy - y_top), e.sy)
    } else {
        (x0, y_top)
    };
    let (x_bottom, sy1) = if e.ey < y_bottom {
        (x0 + dx * (e.ey - y_top), e.ey)
    } else {
        (xb, y_bottom)
    };

    if x_top >= 0.0 && x_bottom >= 0.0 && x_top < len as f32 && x_bottom < len as f32 {
        // From here on, no x range checks are needed.
        if x_top as usize == x_bottom as usize {
            // Simple case, the edge spans only one pixel.
            let x = x_top as usize;
            let height = (sy1 - sy0) * e.direction;
            scanline[x] +=
                position_trapezoid_area(height, x_top, x as f32 + 1.0, x_bottom, x as f32 + 1.0);
            // Everything right of this pixel is filled.
            fill[x + 1] += height;
            return;
        }

        // The edge covers two or more pixels.
        let (mut x_top, mut x_bottom, mut sy0, mut sy1) = (x_top, x_bottom, sy0, sy1);
        if x_top > x_bottom {
            // Flip the scanline vertically; the signed area is the same.
            let t = sy0;
            sy0 = y_bottom - (sy1 - y_top);
            sy1 = y_bottom - (t - y_top);
            core::mem::swap(&mut x_top, &mut x_bottom);
            dx = -dx;
            dy = -dy;
            x0 = xb;
        }
        debug_assert!(dy >= 0.0);
        debug_assert!(dx >= 0.0);

        let x1 = x_top as usize;
        let x2 = x_bottom as usize;
        // The y where the edge crosses into the second pixel.
        let mut y_crossing = y_top + dy * (x1 as f32 + 1.0 - x0);
        // The y where it enters the last pixel.
        let mut y_final = y_top + dy * (x2 as f32 - x0);

        // When x_bottom sits right at a pixel boundary, y_crossing can
        // overshoot the row.
        if y_crossing > y_bottom {
            y_crossing = y_bottom;
        }

        let sign = e.direction;

        // The area covered from sy0 to y_crossing.
        let mut area = sign * (y_crossing - sy0);

        // The triangle in the first pixel.
        scanline[x1] += sized_triangle_area(area, x1 as f32 + 1.0 - x_top);

        if y_final > y_bottom {
            y_final = y_bottom;
            let denom = x2 as f32 - (x1 as f32 + 1.0);
            if denom != 0.0 {
                dy = (y_final - y_crossing) / denom;
            }
        }

        // Middle pixels: the covered area grows linearly per column.
        let step = sign * dy;
        for x in x1 + 1..x2 {
            scanline[x] += area + step / 2.0;
            area += step;
        }
        y_crossing = y_final;

        // The last pixel: the accumulated trapezoid plus the remainder
        // below the crossing point.
        scanline[x2] += area
            + sign
                * position_trapezoid_area(
                    sy1 - y_crossing,
                    x2 as f32,
                    x2 as f32 + 1.0,
                    x_bottom,
                    x2 as f32 + 1.0,
                );

        fill[x2 + 1] += sign * (sy1 - sy0);
    } else {
        // The edge leaves the horizontal bounds, possibly only because
        // x_top/x_bottom are extrapolated to the row borders. Clip it
        // against every pixel, the slow way.
        for x in 0..len {
            // The edge can intersect a pixel's left and right borders;
            // split at those crossings and let the clipper sort out
            // each piece.
            let px1 = x as f32;
            let px2 = x as f32 + 1.0;
            let x3 = xb;
            let y3 = y_bottom;

            // x = x0 + dx * (y - y_top), so y = (x - x0) / dx + y_top.
            let ya = (px1 - x0) / dx + y_top;
            let yb2 = (px2 - x0) / dx + y_top;

            if x0 < px1 && x3 > px2 {
                // Three pieces descending to the right.
                handle_clipped_edge(scanline, x, e, x0, y_top, px1, ya);
                handle_clipped_edge(scanline, x, e, px1, ya, px2, yb2);
                handle_clipped_edge(scanline, x, e, px2, yb2, x3, y3);
            } else if x3 < px1 && x0 > px2 {
                // Three pieces descending to the left.
                handle_clipped_edge(scanline, x, e, x0, y_top, px2, yb2);
                handle_clipped_edge(scanline, x, e, px2, yb2, px1, ya);
                handle_clipped_edge(scanline, x, e, px1, ya, x3, y3);
            } else if x0 < px1 && x3 > px1 {
                // Two pieces crossing the left border.
                handle_clipped_edge(scanline, x, e, x0, y_top, px1, ya);
                handle_clipped_edge(scanline, x, e, px1, ya, x3, y3);
            } else if x3 < px1 && x0 > px1 {
                handle_clipped_edge(scanline, x, e, x0, y_top, px1, ya);
                handle_clipped_edge(scanline, x, e, px1, ya, x3, y3);
            } else if x0 < px2 && x3 > px2 {
                // Two pieces crossing the right border.
                handle_clipped_edge(scanline, x, e, x0, y_top, px2, yb2);
                handle_clipped_edge(scanline, x, e, px2, yb2, x3, y3);
            } else if x3 < px2 && x0 > px2 {
                handle_clipped_edge(scanline, x, e, x0, y_top, px2, yb2);
                handle_clipped_edge(scanline, x, e, px2, yb2, x3, y3);
            } else {
                // One piece.
                handle_clipped_edge(scanline, x, e, x0, y_top, x3, y3);
            }
        }
    }
}

/// Adds the coverage a clipped edge piece contributes to pixel `x` of `buf`.
fn handle_clipped_edge(
    buf: &mut [f32],
    x: usize,
    e: &ActiveEdge,
    mut x0: f32,
    mut y0: f32,
    mut x1: f32,
    mut y1: f32,
) {
    if y0 == y1 {
        return;
    }

    debug_assert!(y0 < y1);
    debug_assert!(e.sy <= e.ey);
    if y0 > e.ey || y1 < e.sy {
        return;
    }

    if y0 < e.sy {
        x0 += (x1 - x0) * (e.sy - y0) / (y1 - y0);
        y0 = e.sy;
    }
    if y1 > e.ey {
        x1 += (x1 - x0) * (e.ey - y1) / (y1 - y0);
        y1 = e.ey;
    }

    let xf = x as f32;
    if x0 <= xf && x1 <= xf {
        buf[x] += e.direction * (y1 - y0);
    } else if x0 >= xf + 1.0 && x1 >= xf + 1.0 {
        // Entirely right of the pixel.
    } else {
        // Coverage is one minus the average x position inside the pixel.
        buf[x] += e.direction * (y1 - y0) * (1.0 - ((x0 - xf) + (x1 - xf)) / 2.0);
    }
}

impl<'a> Font<'a> {
    /// Computes the pixel-space bounding box a glyph renders into.
    #[inline]
    pub fn glyph_bitmap_box(&self, glyph_id: GlyphId, scale_x: f32, scale_y: f32) -> PixelRect {
        self.glyph_bitmap_box_subpixel(glyph_id, scale_x, scale_y, 0.0, 0.0)
    }

    /// Like [`glyph_bitmap_box`](Self::glyph_bitmap_box), with a subpixel shift.
    pub fn glyph_bitmap_box_subpixel(
        &self,
        glyph_id: GlyphId,
        scale_x: f32,
        scale_y: f32,
        shift_x: f32,
        shift_y: f32,
    ) -> PixelRect {
        let bbox = match self.glyph_box(glyph_id) {
            Some(bbox) => bbox,
            // An empty glyph, e.g. a space.
            None => return PixelRect::default(),
        };

        // The y axis flips: font units grow up, bitmaps grow down.
        PixelRect {
            x0: (bbox.x_min as f32 * scale_x + shift_x).floor() as i32,
            y0: (-bbox.y_max as f32 * scale_y + shift_y).floor() as i32,
            x1: (bbox.x_max as f32 * scale_x + shift_x).ceil() as i32,
            y1: (-bbox.y_min as f32 * scale_y + shift_y).ceil() as i32,
        }
    }

    /// Bitmap box for the glyph the code point maps to.
    #[inline]
    pub fn codepoint_bitmap_box(&self, code_point: u32, scale_x: f32, scale_y: f32) -> PixelRect {
        self.glyph_bitmap_box(self.glyph_index(code_point), scale_x, scale_y)
    }

    /// Rasterizes a glyph into a freshly allocated bitmap.
    ///
    /// A `0x0` bitmap with zero offsets for empty or out-of-range glyphs.
    #[inline]
    pub fn rasterize_glyph(&self, glyph_id: GlyphId, scale_x: f32, scale_y: f32) -> GlyphBitmap {
        self.rasterize_glyph_subpixel(glyph_id, scale_x, scale_y, 0.0, 0.0)
    }

    /// Rasterizes the glyph a code point maps to.
    #[inline]
    pub fn rasterize_codepoint(&self, code_point: u32, scale_x: f32, scale_y: f32) -> GlyphBitmap {
        self.rasterize_glyph(self.glyph_index(code_point), scale_x, scale_y)
    }

    /// Like [`rasterize_glyph`](Self::rasterize_glyph), with a subpixel shift.
    pub fn rasterize_glyph_subpixel(
        &self,
        glyph_id: GlyphId,
        mut scale_x: f32,
        mut scale_y: f32,
        shift_x: f32,
        shift_y: f32,
    ) -> GlyphBitmap {
        if scale_x == 0.0 {
            scale_x = scale_y;
        }
        if scale_y == 0.0 {
            if scale_x == 0.0 {
                return GlyphBitmap::default();
            }
            scale_y = scale_x;
        }

        let bounds =
            self.glyph_bitmap_box_subpixel(glyph_id, scale_x, scale_y, shift_x, shift_y);
        let width = bounds.width();
        let height = bounds.height();
        if width == 0 || height == 0 {
            return GlyphBitmap::default();
        }

        let mut pixels = vec![0u8; width as usize * height as usize];
        let mut target = BitmapView {
            pixels: &mut pixels,
            width,
            height,
            stride: width as usize,
        };

        let shape = self.glyph_shape(glyph_id);
        rasterize(
            &mut target,
            &shape,
            DEFAULT_FLATNESS,
            scale_x,
            scale_y,
            shift_x,
            shift_y,
            bounds.x0,
            bounds.y0,
            true,
        );

        GlyphBitmap {
            pixels,
            width,
            height,
            xoff: bounds.x0,
            yoff: bounds.y0,
        }
    }

    /// Rasterizes a glyph into caller memory.
    ///
    /// The glyph is positioned so that its bitmap box lands at the target
    /// origin; rows and columns that don't fit are clipped.
    #[inline]
    pub fn rasterize_glyph_into(
        &self,
        target: &mut BitmapView,
        glyph_id: GlyphId,
        scale_x: f32,
        scale_y: f32,
    ) {
        self.rasterize_glyph_subpixel_into(target, glyph_id, scale_x, scale_y, 0.0, 0.0)
    }

    /// Like [`rasterize_glyph_into`](Self::rasterize_glyph_into),
    /// with a subpixel shift.
    pub fn rasterize_glyph_subpixel_into(
        &self,
        target: &mut BitmapView,
        glyph_id: GlyphId,
        scale_x: f32,
        scale_y: f32,
        shift_x: f32,
        shift_y: f32,
    ) {
        let bounds =
            self.glyph_bitmap_box_subpixel(glyph_id, scale_x, scale_y, shift_x, shift_y);
        if bounds.width() == 0 || bounds.height() == 0 {
            return;
        }

        let shape = self.glyph_shape(glyph_id);
        rasterize(
            target,
            &shape,
            DEFAULT_FLATNESS,
            scale_x,
            scale_y,
            shift_x,
            shift_y,
            bounds.x0,
            bounds.y0,
            true,
        );
    }

    /// Renders an oversampled glyph and box-filters it in place.
    ///
    /// The target must be large enough for the oversampled box; the
    /// `oversample_x`/`oversample_y` kernels shrink the usable render
    /// area by `oversample - 1` pixels per axis. Returns the subpixel
    /// shift the filtered bitmap carries.
    #[allow(clippy::too_many_arguments)]
    pub fn rasterize_glyph_subpixel_prefilter_into(
        &self,
        target: &mut BitmapView,
        glyph_id: GlyphId,
        scale_x: f32,
        scale_y: f32,
        shift_x: f32,
        shift_y: f32,
        oversample_x: u32,
        oversample_y: u32,
    ) -> (f32, f32) {
        let sub_width = target.width.saturating_sub(oversample_x.saturating_sub(1));
        let sub_height = target.height.saturating_sub(oversample_y.saturating_sub(1));
        {
            let mut sub_target = BitmapView {
                pixels: &mut *target.pixels,
                width: sub_width,
                height: sub_height,
                stride: target.stride,
            };
            self.rasterize_glyph_subpixel_into(
                &mut sub_target,
                glyph_id,
                scale_x,
                scale_y,
                shift_x,
                shift_y,
            );
        }

        if oversample_x > 1 {
            crate::atlas::h_prefilter(
                target.pixels,
                target.width,
                target.height,
                target.stride,
                oversample_x,
            );
        }

        if oversample_y > 1 {
            crate::atlas::v_prefilter(
                target.pixels,
                target.width,
                target.height,
                target.stride,
                oversample_y,
            );
        }

        (
            crate::atlas::oversample_shift(oversample_x),
            crate::atlas::oversample_shift(oversample_y),
        )
    }
}
