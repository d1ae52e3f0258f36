// https://docs.microsoft.com/en-us/typography/opentype/spec/glyf

use crate::parser::{F2DOT14, LazyArray16, Stream};
use crate::{Font, GlyphId, OutlineBuilder, Rect};

// OpenType puts no limit on component nesting; this one bounds recursion
// on malformed or cyclic component graphs.
const MAX_COMPONENT_DEPTH: u8 = 32;

// https://docs.microsoft.com/en-us/typography/opentype/spec/glyf#simple-glyph-description
mod simple_flags {
    pub const ON_CURVE_POINT: u8 = 1 << 0;
    pub const X_SHORT_VECTOR: u8 = 1 << 1;
    pub const Y_SHORT_VECTOR: u8 = 1 << 2;
    pub const REPEAT_FLAG: u8 = 1 << 3;
    pub const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR: u8 = 1 << 4;
    pub const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR: u8 = 1 << 5;
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/glyf#composite-glyph-description
mod composite_flags {
    pub const ARG_1_AND_2_ARE_WORDS: u16 = 1 << 0;
    pub const ARGS_ARE_XY_VALUES: u16 = 1 << 1;
    pub const WE_HAVE_A_SCALE: u16 = 1 << 3;
    pub const MORE_COMPONENTS: u16 = 1 << 5;
    pub const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 1 << 6;
    pub const WE_HAVE_A_TWO_BY_TWO: u16 = 1 << 7;
}

/// Reads the glyph's bounding box from its header.
pub fn bounding_box(data: &[u8]) -> Option<Rect> {
    let mut s = Stream::new(data);
    s.skip::<i16>(); // numberOfContours
    Some(Rect {
        x_min: s.read()?,
        y_min: s.read()?,
        x_max: s.read()?,
        y_max: s.read()?,
    })
}

/// Checks that the glyph describes no contours.
///
/// The caller is expected to have already handled the empty `loca` range.
pub fn is_empty(data: &[u8]) -> bool {
    match Stream::read_at::<i16>(data, 0) {
        Some(n) => n == 0,
        None => true,
    }
}

/// Outlines a glyph.
///
/// Returns `None` when the glyph header is malformed. A failure inside
/// a composite component only skips that component.
pub fn outline(
    font: &Font,
    data: &[u8],
    depth: u8,
    builder: &mut dyn OutlineBuilder,
) -> Option<()> {
    if depth >= MAX_COMPONENT_DEPTH {
        warn!("composite glyph nesting is too deep");
        return None;
    }

    let mut s = Stream::new(data);
    let number_of_contours: i16 = s.read()?;
    s.advance(8); // bbox

    if number_of_contours > 0 {
        parse_simple_outline(s.tail()?, number_of_contours as u16, builder)
    } else if number_of_contours < 0 {
        parse_composite_outline(font, s.tail()?, depth, builder)
    } else {
        // An empty glyph.
        Some(())
    }
}

#[derive(Clone, Copy, Debug)]
struct GlyphPoint {
    x: i16,
    y: i16,
    on_curve_point: bool,
}

fn parse_simple_outline(
    glyph_data: &[u8],
    number_of_contours: u16,
    builder: &mut dyn OutlineBuilder,
) -> Option<()> {
    let mut s = Stream::new(glyph_data);
    let endpoints: LazyArray16<u16> = s.read_array16(number_of_contours)?;

    let points_total = {
        let last_point = endpoints.last()?;
        // Prevent overflow.
        if last_point == core::u16::MAX {
            return Some(());
        }

        last_point + 1
    };

    // Skip instructions, they only matter for hinting.
    let instructions_len: u16 = s.read()?;
    s.advance(instructions_len as usize);

    let flags_offset = s.offset();
    let x_coords_len = resolve_x_coords_len(&mut s, points_total)?;
    let x_coords_offset = s.offset();
    let y_coords_offset = x_coords_offset + x_coords_len as usize;

    let mut points = GlyphPoints {
        flags: Stream::new(glyph_data.get(flags_offset..x_coords_offset)?),
        x_coords: Stream::new(glyph_data.get(x_coords_offset..y_coords_offset)?),
        y_coords: Stream::new(glyph_data.get(y_coords_offset..)?),
        points_left: points_total,
        flag_repeats: 0,
        last_flags: 0,
        x: 0,
        y: 0,
    };

    let mut total = 0u16;
    let mut last = 0u16;
    for n in endpoints {
        if n < last {
            // Endpoints must be in an increasing order.
            break;
        }
        last = n;

        if n == core::u16::MAX {
            break;
        }

        let n = n + 1 - total;

        // A contour must have at least two points.
        if n >= 2 {
            parse_contour(points.by_ref().take(n as usize), builder);
        }

        total += n;
    }

    Some(())
}

/// Resolves the length of the x coordinates array.
///
/// It depends on the flag bytes, so all of them have to be processed first.
fn resolve_x_coords_len(s: &mut Stream, points_total: u16) -> Option<u16> {
    use simple_flags::*;

    let mut flags_left = points_total;
    let mut x_coords_len = 0u16;
    while flags_left > 0 {
        let flags: u8 = s.read()?;

        // The number of times a glyph point repeats.
        let repeats = if flags & REPEAT_FLAG != 0 {
            s.read::<u8>()? as u16 + 1
        } else {
            1
        };

        if flags & X_SHORT_VECTOR != 0 {
            // Coordinate is 1 byte long.
            x_coords_len = x_coords_len.checked_add(repeats)?;
        } else if flags & X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR == 0 {
            // Coordinate is 2 bytes long.
            x_coords_len = x_coords_len.checked_add(repeats.checked_mul(2)?)?;
        }

        if repeats > flags_left {
            flags_left = 0;
        } else {
            flags_left -= repeats;
        }
    }

    Some(x_coords_len)
}

#[derive(Clone, Copy, Debug)]
struct Point {
    x: f32,
    y: f32,
}

impl Point {
    #[inline]
    fn lerp(self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }
}

fn parse_contour(
    points: core::iter::Take<&mut GlyphPoints>,
    builder: &mut dyn OutlineBuilder,
) {
    let mut first_oncurve: Option<Point> = None;
    let mut first_offcurve: Option<Point> = None;
    let mut last_offcurve: Option<Point> = None;
    for point in points {
        let p = Point {
            x: point.x as f32,
            y: point.y as f32,
        };
        if first_oncurve.is_none() {
            if point.on_curve_point {
                first_oncurve = Some(p);
                builder.move_to(p.x, p.y);
            } else {
                // A contour that starts off-curve is rotated so that its
                // emitted start lies on the curve.
                match first_offcurve {
                    Some(offcurve) => {
                        let mid = offcurve.lerp(p, 0.5);
                        first_oncurve = Some(mid);
                        last_offcurve = Some(p);
                        builder.move_to(mid.x, mid.y);
                    }
                    None => {
                        first_offcurve = Some(p);
                    }
                }
            }
        } else {
            match (last_offcurve, point.on_curve_point) {
                (Some(offcurve), true) => {
                    last_offcurve = None;
                    builder.quad_to(offcurve.x, offcurve.y, p.x, p.y);
                }
                (Some(offcurve), false) => {
                    // Two consecutive off-curve points imply
                    // an on-curve midpoint.
                    last_offcurve = Some(p);
                    let mid = offcurve.lerp(p, 0.5);
                    builder.quad_to(offcurve.x, offcurve.y, mid.x, mid.y);
                }
                (None, true) => {
                    builder.line_to(p.x, p.y);
                }
                (None, false) => {
                    last_offcurve = Some(p);
                }
            }
        }
    }

    // Synthesize the closing segment.
    loop {
        match (first_offcurve, last_offcurve) {
            (Some(offcurve1), Some(offcurve2)) => {
                last_offcurve = None;
                let mid = offcurve2.lerp(offcurve1, 0.5);
                builder.quad_to(offcurve2.x, offcurve2.y, mid.x, mid.y);
            }
            (Some(offcurve1), None) => {
                if let Some(p) = first_oncurve {
                    builder.quad_to(offcurve1.x, offcurve1.y, p.x, p.y);
                }
                break;
            }
            (None, Some(offcurve2)) => {
                if let Some(p) = first_oncurve {
                    builder.quad_to(offcurve2.x, offcurve2.y, p.x, p.y);
                }
                break;
            }
            (None, None) => {
                if let Some(p) = first_oncurve {
                    builder.line_to(p.x, p.y);
                }
                break;
            }
        }
    }

    builder.close();
}

fn parse_composite_outline(
    font: &Font,
    glyph_data: &[u8],
    depth: u8,
    builder: &mut dyn OutlineBuilder,
) -> Option<()> {
    use composite_flags::*;

    let mut s = Stream::new(glyph_data);
    let flags: u16 = s.read()?;
    let glyph_id: GlyphId = s.read()?;

    let mut ts = Transform::default();

    if flags & ARGS_ARE_XY_VALUES != 0 {
        if flags & ARG_1_AND_2_ARE_WORDS != 0 {
            ts.e = s.read::<i16>()? as f32;
            ts.f = s.read::<i16>()? as f32;
        } else {
            ts.e = s.read::<i8>()? as f32;
            ts.f = s.read::<i8>()? as f32;
        }
    } else {
        // Matched-point placement. Not supported; the arguments are
        // consumed and the component is placed untranslated.
        if flags & ARG_1_AND_2_ARE_WORDS != 0 {
            s.advance(4);
        } else {
            s.advance(2);
        }
    }

    if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
        ts.a = s.read::<F2DOT14>()?.0;
        ts.b = s.read::<F2DOT14>()?.0;
        ts.c = s.read::<F2DOT14>()?.0;
        ts.d = s.read::<F2DOT14>()?.0;
    } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
        ts.a = s.read::<F2DOT14>()?.0;
        ts.d = s.read::<F2DOT14>()?.0;
    } else if flags & WE_HAVE_A_SCALE != 0 {
        ts.a = s.read::<F2DOT14>()?.0;
        ts.d = ts.a;
    }

    if let Some(child_data) = font.glyph_data(glyph_id) {
        if ts.is_default() {
            let _ = outline(font, child_data, depth + 1, builder);
        } else {
            let mut transformed = TransformedBuilder { builder, ts };
            let _ = outline(font, child_data, depth + 1, &mut transformed);
        }
    }

    if flags & MORE_COMPONENTS != 0 {
        parse_composite_outline(font, s.tail()?, depth, builder)?;
    }

    Some(())
}

/// A composite component transform.
///
/// Applied as `x' = m·(a·x + c·y + e)`, `y' = n·(b·x + d·y + f)` where
/// `m` and `n` are the column norms. The translation is scaled as well;
/// fonts are authored against this exact behavior.
#[derive(Clone, Copy, Debug)]
struct Transform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Transform {
    #[inline]
    fn default() -> Self {
        Transform {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl Transform {
    fn is_default(&self) -> bool {
        // A direct float comparison is fine in our case.
        self.a == 1.0
            && self.b == 0.0
            && self.c == 0.0
            && self.d == 1.0
            && self.e == 0.0
            && self.f == 0.0
    }

    fn apply_to(&self, x: &mut f32, y: &mut f32) {
        let m = (self.a * self.a + self.b * self.b).sqrt();
        let n = (self.c * self.c + self.d * self.d).sqrt();
        let tx = *x;
        let ty = *y;
        *x = m * (self.a * tx + self.c * ty + self.e);
        *y = n * (self.b * tx + self.d * ty + self.f);
    }
}

struct TransformedBuilder<'a> {
    builder: &'a mut dyn OutlineBuilder,
    ts: Transform,
}

impl OutlineBuilder for TransformedBuilder<'_> {
    fn move_to(&mut self, mut x: f32, mut y: f32) {
        self.ts.apply_to(&mut x, &mut y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, mut x: f32, mut y: f32) {
        self.ts.apply_to(&mut x, &mut y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, mut x1: f32, mut y1: f32, mut x: f32, mut y: f32) {
        self.ts.apply_to(&mut x1, &mut y1);
        self.ts.apply_to(&mut x, &mut y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, mut x1: f32, mut y1: f32, mut x2: f32, mut y2: f32, mut x: f32, mut y: f32) {
        self.ts.apply_to(&mut x1, &mut y1);
        self.ts.apply_to(&mut x2, &mut y2);
        self.ts.apply_to(&mut x, &mut y);
        self.builder.curve_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

struct GlyphPoints<'a> {
    flags: Stream<'a>,
    x_coords: Stream<'a>,
    y_coords: Stream<'a>,
    points_left: u16,
    flag_repeats: u8,
    last_flags: u8,
    x: i16,
    y: i16,
}

impl<'a> Iterator for GlyphPoints<'a> {
    type Item = GlyphPoint;

    fn next(&mut self) -> Option<Self::Item> {
        use simple_flags::*;

        if self.points_left == 0 {
            return None;
        }

        if self.flag_repeats == 0 {
            self.last_flags = self.flags.read()?;
            if self.last_flags & REPEAT_FLAG != 0 {
                self.flag_repeats = self.flags.read()?;
            }
        } else {
            self.flag_repeats -= 1;
        }

        let x = glyph_coord(
            self.last_flags,
            X_SHORT_VECTOR,
            X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR,
            &mut self.x_coords,
        )?;
        self.x = self.x.wrapping_add(x);

        let y = glyph_coord(
            self.last_flags,
            Y_SHORT_VECTOR,
            Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR,
            &mut self.y_coords,
        )?;
        self.y = self.y.wrapping_add(y);

        self.points_left -= 1;

        Some(GlyphPoint {
            x: self.x,
            y: self.y,
            on_curve_point: self.last_flags & ON_CURVE_POINT != 0,
        })
    }
}

fn glyph_coord(
    flags: u8,
    short_vector: u8,
    is_same_or_positive_short_vector: u8,
    coords: &mut Stream,
) -> Option<i16> {
    let flags = (
        flags & short_vector != 0,
        flags & is_same_or_positive_short_vector != 0,
    );

    Some(match flags {
        (true, true) => coords.read::<u8>()? as i16,
        (true, false) => -(coords.read::<u8>()? as i16),
        // Keep the previous coordinate.
        (false, true) => 0,
        (false, false) => coords.read::<i16>()?,
    })
}
