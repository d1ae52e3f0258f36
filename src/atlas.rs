//! Glyph atlas baking.
//!
//! The pipeline has three phases: gather one padded rectangle per
//! requested glyph, pack the rectangles into the atlas, then render each
//! glyph into its slot. Oversampled ranges are rendered at an integer
//! multiple of the target size and box-filtered in place, which buys
//! subpixel positioning quality for small text.

use crate::raster::BitmapView;
use crate::Font;

const MAX_OVERSAMPLE: u32 = 8;
const OVER_MASK: usize = MAX_OVERSAMPLE as usize - 1;

/// A glyph baked by [`bake_font_bitmap`].
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct BakedChar {
    /// Atlas rectangle.
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,

    /// Pen-relative offset of the rectangle's top-left corner.
    pub xoff: f32,
    pub yoff: f32,

    /// Pen advance in pixels.
    pub xadvance: f32,
}

/// The result of [`bake_font_bitmap`].
#[derive(Clone, Debug)]
pub struct BakedFontBitmap {
    /// The atlas, `width * height` bytes of coverage.
    pub pixels: Vec<u8>,
    /// Atlas width in pixels.
    pub width: u32,
    /// Atlas height in pixels.
    pub height: u32,
    /// One entry per baked character; shorter than requested when
    /// the atlas ran out of room.
    pub chars: Vec<BakedChar>,
    /// First unused row; useful to crop the atlas.
    pub rows_used: u32,
}

/// Bakes a run of consecutive code points into a fresh atlas.
///
/// This is the one-shot legacy path: no oversampling, no packing
/// strategy, just left-to-right rows. `chars` covers
/// `first_codepoint..first_codepoint + num_chars`, in order, truncated
/// at the first glyph that doesn't fit.
pub fn bake_font_bitmap(
    font: &Font,
    pixel_height: f32,
    width: u32,
    height: u32,
    first_codepoint: u32,
    num_chars: usize,
) -> BakedFontBitmap {
    let mut pixels = vec![0u8; width as usize * height as usize];
    let scale = font.scale_for_pixel_height(pixel_height);
    let mut chars = Vec::with_capacity(num_chars);

    // Leave a one-pixel border around everything.
    let mut x = 1i32;
    let mut y = 1i32;
    let mut bottom_y = 1i32;

    for i in 0..num_chars {
        let glyph = font.glyph_index(first_codepoint + i as u32);
        let advance = font
            .glyph_hor_metrics(glyph)
            .map(|m| m.advance)
            .unwrap_or(0);
        let bounds = font.glyph_bitmap_box(glyph, scale, scale);
        let gw = bounds.width() as i32;
        let gh = bounds.height() as i32;

        if x + gw + 1 >= width as i32 {
            // Advance to the next row.
            y = bottom_y;
            x = 1;
        }
        if y + gh + 1 >= height as i32 {
            break;
        }

        if gw > 0 && gh > 0 {
            let start = y as usize * width as usize + x as usize;
            let mut target = BitmapView {
                pixels: &mut pixels[start..],
                width: gw as u32,
                height: gh as u32,
                stride: width as usize,
            };
            font.rasterize_glyph_into(&mut target, glyph, scale, scale);
        }

        chars.push(BakedChar {
            x0: x as u16,
            y0: y as u16,
            x1: (x + gw) as u16,
            y1: (y + gh) as u16,
            xoff: bounds.x0 as f32,
            yoff: bounds.y0 as f32,
            xadvance: scale * advance as f32,
        });

        x += gw + 1;
        if y + gh + 1 > bottom_y {
            bottom_y = y + gh + 1;
        }
    }

    BakedFontBitmap {
        pixels,
        width,
        height,
        chars,
        rows_used: bottom_y as u32,
    }
}

/// A textured quad ready for rendering, with atlas UVs.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[allow(missing_docs)]
pub struct AlignedQuad {
    pub x0: f32,
    pub y0: f32,
    pub s0: f32,
    pub t0: f32,
    pub x1: f32,
    pub y1: f32,
    pub s1: f32,
    pub t1: f32,
}

/// Emits the quad for a baked character and advances the pen.
///
/// Quad corners are snapped to integer positions, which is the right
/// choice for unfiltered, non-oversampled atlases.
pub fn baked_quad(
    chars: &[BakedChar],
    atlas_width: u32,
    atlas_height: u32,
    char_index: usize,
    x_pos: &mut f32,
    y_pos: f32,
) -> Option<AlignedQuad> {
    let b = chars.get(char_index)?;
    let ipw = 1.0 / atlas_width as f32;
    let iph = 1.0 / atlas_height as f32;

    let round_x = (*x_pos + b.xoff + 0.5).floor();
    let round_y = (y_pos + b.yoff + 0.5).floor();

    let quad = AlignedQuad {
        x0: round_x,
        y0: round_y,
        s0: b.x0 as f32 * ipw,
        t0: b.y0 as f32 * iph,
        x1: round_x + (b.x1 - b.x0) as f32,
        y1: round_y + (b.y1 - b.y0) as f32,
        s1: b.x1 as f32 * ipw,
        t1: b.y1 as f32 * iph,
    };

    *x_pos += b.xadvance;
    Some(quad)
}

/// A glyph packed by [`Packer::pack_font_ranges`].
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct PackedChar {
    /// Atlas rectangle.
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,

    /// Pen-relative offset of the quad's top-left corner,
    /// including the oversampling subpixel shift.
    pub xoff: f32,
    pub yoff: f32,

    /// Pen-relative offset of the quad's bottom-right corner.
    pub xoff2: f32,
    pub yoff2: f32,

    /// Pen advance in pixels.
    pub xadvance: f32,
}

/// Emits the quad for a packed character and advances the pen.
///
/// With `align_to_integer` the quad is snapped to whole pixels;
/// oversampled atlases are better served unsnapped.
#[allow(clippy::too_many_arguments)]
pub fn packed_quad(
    chars: &[PackedChar],
    atlas_width: u32,
    atlas_height: u32,
    char_index: usize,
    x_pos: &mut f32,
    y_pos: f32,
    align_to_integer: bool,
) -> Option<AlignedQuad> {
    let b = chars.get(char_index)?;
    let ipw = 1.0 / atlas_width as f32;
    let iph = 1.0 / atlas_height as f32;

    let quad = if align_to_integer {
        let x = (*x_pos + b.xoff + 0.5).floor();
        let y = (y_pos + b.yoff + 0.5).floor();
        AlignedQuad {
            x0: x,
            y0: y,
            x1: x + b.xoff2 - b.xoff,
            y1: y + b.yoff2 - b.yoff,
            s0: b.x0 as f32 * ipw,
            t0: b.y0 as f32 * iph,
            s1: b.x1 as f32 * ipw,
            t1: b.y1 as f32 * iph,
        }
    } else {
        AlignedQuad {
            x0: *x_pos + b.xoff,
            y0: y_pos + b.yoff,
            x1: *x_pos + b.xoff2,
            y1: y_pos + b.yoff2,
            s0: b.x0 as f32 * ipw,
            t0: b.y0 as f32 * iph,
            s1: b.x1 as f32 * ipw,
            t1: b.y1 as f32 * iph,
        }
    };

    *x_pos += b.xadvance;
    Some(quad)
}

/// The size glyphs of a range are rendered at.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FontSize {
    /// Ascent minus descent maps to this many pixels.
    PixelHeight(f32),
    /// The EM square maps to this many pixels.
    EmPixels(f32),
}

impl FontSize {
    fn scale(self, font: &Font) -> f32 {
        match self {
            FontSize::PixelHeight(height) => font.scale_for_pixel_height(height),
            FontSize::EmPixels(pixels) => font.scale_for_em_to_pixels(pixels),
        }
    }
}

/// The code points of a pack range.
#[derive(Clone, Copy, Debug)]
pub enum Codepoints<'a> {
    /// A contiguous run starting at `first`.
    Range {
            first: u32,
            count: usize,
    },
    /// An explicit, possibly sparse list.
    List(&'a [u32]),
}

impl Codepoints<'_> {
    fn len(&self) -> usize {
        match *self {
            Codepoints::Range { count, .. } => count,
            Codepoints::List(list) => list.len(),
        }
    }

    fn get(&self, index: usize) -> u32 {
        match *self {
            Codepoints::Range { first, .. } => first + index as u32,
            Codepoints::List(list) => list[index],
        }
    }
}

/// A run of code points to pack at one size.
#[derive(Clone, Copy, Debug)]
pub struct PackRange<'a> {
    /// Render size for the whole range.
    pub font_size: FontSize,
    /// Which code points to pack.
    pub codepoints: Codepoints<'a>,
}

/// A rectangle going through gather, pack and render.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct PackRect {
    /// Requested width; zero for skipped glyphs.
    pub w: i32,
    /// Requested height.
    pub h: i32,
    /// Assigned position.
    pub x: i32,
    pub y: i32,
    /// Whether the packer found room.
    pub was_packed: bool,
}

/// A packing strategy.
///
/// Implementations must keep the rectangles in their original order,
/// since they correspond positionally to gathered glyphs.
pub trait RectPacker {
    /// Assigns positions to `rects`, marking `was_packed` accordingly.
    ///
    /// Packer state persists across calls, so several batches can share
    /// one atlas.
    fn pack_rects(&mut self, width: u32, height: u32, rects: &mut [PackRect]);
}

/// The default packer: a plain row fitter.
///
/// Keeps a cursor and the current row's bottom; a rectangle that doesn't
/// fit the row starts a new one. Once a rectangle misses vertically,
/// everything after it is left unpacked.
#[derive(Clone, Copy, Debug, Default)]
pub struct RowPacker {
    x: i32,
    y: i32,
    bottom_y: i32,
}

impl RectPacker for RowPacker {
    fn pack_rects(&mut self, width: u32, height: u32, rects: &mut [PackRect]) {
        let mut failed = false;
        for rect in rects.iter_mut() {
            if failed {
                rect.was_packed = false;
                continue;
            }

            if self.x + rect.w > width as i32 {
                self.x = 0;
                self.y = self.bottom_y;
            }

            if self.y + rect.h > height as i32 {
                failed = true;
                rect.was_packed = false;
                continue;
            }

            rect.x = self.x;
            rect.y = self.y;
            rect.was_packed = true;
            self.x += rect.w;
            if self.y + rect.h > self.bottom_y {
                self.bottom_y = self.y + rect.h;
            }
        }
    }
}

/// An atlas packing session.
///
/// Owns the atlas pixels and a [`RectPacker`]; multiple
/// [`pack_font_ranges`](Self::pack_font_ranges) calls accumulate into
/// the same atlas.
#[derive(Debug)]
pub struct Packer<P: RectPacker = RowPacker> {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    padding: u32,
    skip_missing: bool,
    h_oversample: u32,
    v_oversample: u32,
    packer: P,
}

impl Packer<RowPacker> {
    /// Creates a packing session with the default row packer
    /// and a one-pixel padding.
    pub fn new(width: u32, height: u32) -> Self {
        Packer::with_packer(width, height, RowPacker::default())
    }
}

impl<P: RectPacker> Packer<P> {
    /// Creates a packing session with a custom packing strategy.
    pub fn with_packer(width: u32, height: u32, packer: P) -> Self {
        Packer {
            pixels: vec![0; width as usize * height as usize],
            width,
            height,
            padding: 1,
            skip_missing: false,
            h_oversample: 1,
            v_oversample: 1,
            packer,
        }
    }

    /// Sets the oversampling for subsequent packing, clamped to 1..=8.
    pub fn set_oversampling(&mut self, h: u32, v: u32) {
        self.h_oversample = h.max(1).min(MAX_OVERSAMPLE);
        self.v_oversample = v.max(1).min(MAX_OVERSAMPLE);
    }

    /// Whether code points without a glyph are skipped instead of
    /// being rendered as the missing-glyph box.
    pub fn set_skip_missing(&mut self, skip: bool) {
        self.skip_missing = skip;
    }

    /// Sets the blank border around every packed glyph.
    pub fn set_padding(&mut self, padding: u32) {
        self.padding = padding;
    }

    /// The atlas pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the session, releasing the atlas.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Atlas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Atlas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packs and renders all ranges: gather, pack, render.
    ///
    /// Returns one `Vec<PackedChar>` per range, positionally matching
    /// the range's code points, and whether every glyph found room.
    /// Skipped and unpacked glyphs keep a zeroed `PackedChar`.
    pub fn pack_font_ranges(
        &mut self,
        font: &Font,
        ranges: &[PackRange],
    ) -> (Vec<Vec<PackedChar>>, bool) {
        let mut rects = self.gather_rects(font, ranges);
        self.pack_rects(&mut rects);
        self.render_into_rects(font, ranges, &rects)
    }

    /// Phase one: one padded rectangle per requested code point.
    ///
    /// The first missing code point still gets a rectangle, so the
    /// missing-glyph box renders once and later misses reuse it, unless
    /// skipping is enabled.
    pub fn gather_rects(&self, font: &Font, ranges: &[PackRange]) -> Vec<PackRect> {
        let mut rects = Vec::new();
        let mut missing_glyph_added = false;
        for range in ranges {
            let scale = range.font_size.scale(font);
            for i in 0..range.codepoints.len() {
                let glyph = font.glyph_index(range.codepoints.get(i));
                let mut rect = PackRect::default();
                if !(glyph.0 == 0 && (self.skip_missing || missing_glyph_added)) {
                    let bounds = font.glyph_bitmap_box_subpixel(
                        glyph,
                        scale * self.h_oversample as f32,
                        scale * self.v_oversample as f32,
                        0.0,
                        0.0,
                    );
                    rect.w = bounds.x1 - bounds.x0
                        + self.padding as i32
                        + self.h_oversample as i32
                        - 1;
                    rect.h = bounds.y1 - bounds.y0
                        + self.padding as i32
                        + self.v_oversample as i32
                        - 1;
                    if glyph.0 == 0 {
                        missing_glyph_added = true;
                    }
                }
                rects.push(rect);
            }
        }

        rects
    }

    /// Phase two: assign atlas positions.
    pub fn pack_rects(&mut self, rects: &mut [PackRect]) {
        self.packer.pack_rects(self.width, self.height, rects)
    }

    /// Phase three: render the packed glyphs and produce their records.
    pub fn render_into_rects(
        &mut self,
        font: &Font,
        ranges: &[PackRange],
        rects: &[PackRect],
    ) -> (Vec<Vec<PackedChar>>, bool) {
        let mut all_packed = true;
        let mut results = Vec::with_capacity(ranges.len());
        let mut missing_char: Option<PackedChar> = None;
        let mut k = 0usize;

        let recip_h = 1.0 / self.h_oversample as f32;
        let recip_v = 1.0 / self.v_oversample as f32;
        let sub_x = oversample_shift(self.h_oversample);
        let sub_y = oversample_shift(self.v_oversample);
        let pad = self.padding as i32;

        for range in ranges {
            let scale = range.font_size.scale(font);
            let mut chars = vec![PackedChar::default(); range.codepoints.len()];

            for (i, out) in chars.iter_mut().enumerate() {
                let rect = match rects.get(k) {
                    Some(rect) => *rect,
                    None => {
                        all_packed = false;
                        continue;
                    }
                };
                k += 1;

                if rect.was_packed && rect.w != 0 && rect.h != 0 {
                    // A packer must keep rectangles inside the atlas.
                    if rect.x < 0
                        || rect.y < 0
                        || rect.x + rect.w > self.width as i32
                        || rect.y + rect.h > self.height as i32
                    {
                        all_packed = false;
                        continue;
                    }

                    let glyph = font.glyph_index(range.codepoints.get(i));

                    // Pad on the left and top.
                    let x = rect.x + pad;
                    let y = rect.y + pad;
                    let w = rect.w - pad;
                    let h = rect.h - pad;

                    let advance = font
                        .glyph_hor_metrics(glyph)
                        .map(|m| m.advance)
                        .unwrap_or(0);
                    let bounds = font.glyph_bitmap_box(
                        glyph,
                        scale * self.h_oversample as f32,
                        scale * self.v_oversample as f32,
                    );

                    let start = y as usize * self.width as usize + x as usize;
                    let mut target = BitmapView {
                        pixels: &mut self.pixels[start..],
                        width: (w - self.h_oversample as i32 + 1).max(0) as u32,
                        height: (h - self.v_oversample as i32 + 1).max(0) as u32,
                        stride: self.width as usize,
                    };
                    font.rasterize_glyph_into(
                        &mut target,
                        glyph,
                        scale * self.h_oversample as f32,
                        scale * self.v_oversample as f32,
                    );

                    let filter_region = y as usize * self.width as usize + x as usize;
                    if self.h_oversample > 1 {
                        h_prefilter(
                            &mut self.pixels[filter_region..],
                            w as u32,
                            h as u32,
                            self.width as usize,
                            self.h_oversample,
                        );
                    }
                    if self.v_oversample > 1 {
                        v_prefilter(
                            &mut self.pixels[filter_region..],
                            w as u32,
                            h as u32,
                            self.width as usize,
                            self.v_oversample,
                        );
                    }

                    *out = PackedChar {
                        x0: x as u16,
                        y0: y as u16,
                        x1: (x + w) as u16,
                        y1: (y + h) as u16,
                        xadvance: scale * advance as f32,
                        xoff: bounds.x0 as f32 * recip_h + sub_x,
                        yoff: bounds.y0 as f32 * recip_v + sub_y,
                        xoff2: (bounds.x0 + w) as f32 * recip_h + sub_x,
                        yoff2: (bounds.y0 + h) as f32 * recip_v + sub_y,
                    };

                    if glyph.0 == 0 {
                        missing_char = Some(*out);
                    }
                } else if rect.was_packed && rect.w == 0 && rect.h == 0 {
                    // Either a skipped code point or a repeat miss that
                    // reuses the already-rendered missing-glyph box.
                    if let Some(missing) = missing_char {
                        *out = missing;
                    }
                } else {
                    all_packed = false;
                }
            }

            results.push(chars);
        }

        (results, all_packed)
    }
}

/// The subpixel shift a box filter of the given width introduces.
pub(crate) fn oversample_shift(oversample: u32) -> f32 {
    if oversample == 0 {
        return 0.0;
    }

    // The prefilter shifts the image to the right, so the quad must
    // start that much further left.
    -((oversample - 1) as f32) / (2.0 * oversample as f32)
}

/// Horizontal sliding-average filter of width `kernel_width`.
///
/// The rightmost `kernel_width - 1` columns of each row must be blank;
/// they become the filter's fade-out tail.
pub(crate) fn h_prefilter(pixels: &mut [u8], w: u32, h: u32, stride: usize, kernel_width: u32) {
    if kernel_width <= 1 {
        return;
    }

    let kw = kernel_width.min(MAX_OVERSAMPLE) as usize;
    for j in 0..h as usize {
        let row = &mut pixels[j * stride..j * stride + w as usize];
        match kw {
            2 => filter_row::<2>(row),
            3 => filter_row::<3>(row),
            4 => filter_row::<4>(row),
            5 => filter_row::<5>(row),
            _ => filter_row_any(row, kw),
        }
    }
}

/// Vertical counterpart of [`h_prefilter`].
pub(crate) fn v_prefilter(pixels: &mut [u8], w: u32, h: u32, stride: usize, kernel_width: u32) {
    if kernel_width <= 1 {
        return;
    }

    let kw = kernel_width.min(MAX_OVERSAMPLE) as usize;
    for i in 0..w as usize {
        match kw {
            2 => filter_column::<2>(pixels, i, h as usize, stride),
            3 => filter_column::<3>(pixels, i, h as usize, stride),
            4 => filter_column::<4>(pixels, i, h as usize, stride),
            5 => filter_column::<5>(pixels, i, h as usize, stride),
            _ => filter_column_any(pixels, i, h as usize, stride, kw),
        }
    }
}

// The fixed-width variants let the compiler turn the division into
// a multiplication.
fn filter_row<const KW: usize>(row: &mut [u8]) {
    let mut buffer = [0u8; MAX_OVERSAMPLE as usize];
    let safe_w = row.len() as isize - KW as isize;
    let mut total = 0u32;

    let mut i = 0usize;
    while (i as isize) <= safe_w {
        total = total + row[i] as u32 - buffer[i & OVER_MASK] as u32;
        buffer[(i + KW) & OVER_MASK] = row[i];
        row[i] = (total / KW as u32) as u8;
        i += 1;
    }

    while i < row.len() {
        total -= buffer[i & OVER_MASK] as u32;
        row[i] = (total / KW as u32) as u8;
        i += 1;
    }
}

fn filter_row_any(row: &mut [u8], kw: usize) {
    let mut buffer = [0u8; MAX_OVERSAMPLE as usize];
    let safe_w = row.len() as isize - kw as isize;
    let mut total = 0u32;

    let mut i = 0usize;
    while (i as isize) <= safe_w {
        total = total + row[i] as u32 - buffer[i & OVER_MASK] as u32;
        buffer[(i + kw) & OVER_MASK] = row[i];
        row[i] = (total / kw as u32) as u8;
        i += 1;
    }

    while i < row.len() {
        total -= buffer[i & OVER_MASK] as u32;
        row[i] = (total / kw as u32) as u8;
        i += 1;
    }
}

fn filter_column<const KW: usize>(pixels: &mut [u8], column: usize, h: usize, stride: usize) {
    let mut buffer = [0u8; MAX_OVERSAMPLE as usize];
    let safe_h = h as isize - KW as isize;
    let mut total = 0u32;

    let mut j = 0usize;
    while (j as isize) <= safe_h {
        let p = pixels[j * stride + column] as u32;
        total = total + p - buffer[j & OVER_MASK] as u32;
        buffer[(j + KW) & OVER_MASK] = p as u8;
        pixels[j * stride + column] = (total / KW as u32) as u8;
        j += 1;
    }

    while j < h {
        total -= buffer[j & OVER_MASK] as u32;
        pixels[j * stride + column] = (total / KW as u32) as u8;
        j += 1;
    }
}

fn filter_column_any(pixels: &mut [u8], column: usize, h: usize, stride: usize, kw: usize) {
    let mut buffer = [0u8; MAX_OVERSAMPLE as usize];
    let safe_h = h as isize - kw as isize;
    let mut total = 0u32;

    let mut j = 0usize;
    while (j as isize) <= safe_h {
        let p = pixels[j * stride + column] as u32;
        total = total + p - buffer[j & OVER_MASK] as u32;
        buffer[(j + kw) & OVER_MASK] = p as u8;
        pixels[j * stride + column] = (total / kw as u32) as u8;
        j += 1;
    }

    while j < h {
        total -= buffer[j & OVER_MASK] as u32;
        pixels[j * stride + column] = (total / kw as u32) as u8;
        j += 1;
    }
}
