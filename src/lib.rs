/*!
A safe TrueType/OpenType font engine: parsing, anti-aliased rasterization,
signed distance fields and atlas baking.

The engine operates on a caller-supplied byte buffer holding a single font
or a font collection. Every read from that buffer is bounds-checked, so
malformed and adversarial fonts degrade into empty results instead of
faulting.

## Features

- (`cmap`) Code point to glyph index mapping, subtable formats 0, 4, 6, 12 and 13.
- (`glyf`/`loca`) TrueType outlines, including composite glyphs.
- (`CFF `) OpenType outlines via a Type 2 charstring interpreter,
  including CID-keyed fonts.
- (`hmtx`, `hhea`, `OS/2`, `head`) Glyph and font metrics.
- (`kern`, `GPOS`) Pair kerning from both sources.
- (`name`) Name records and family-name font matching.
- (`SVG `) Per-glyph SVG document lookup.
- An analytic scanline rasterizer producing exact per-pixel coverage.
- A signed-distance-field generator.
- A glyph atlas baker with oversampling.

## Example

```no_run
let data = std::fs::read("font.ttf").unwrap();
let font = ttf_raster::Font::from_data(&data, 0).unwrap();
let glyph = font.glyph_index('A' as u32);
let scale = font.scale_for_pixel_height(24.0);
let bitmap = font.rasterize_glyph(glyph, scale, scale);
assert_eq!(bitmap.pixels.len(), (bitmap.width * bitmap.height) as usize);
```

## Error handling

Parsing errors surface from [`Font::from_data`] as [`Error`]. After a
successful init, per-glyph queries never fail hard: an unknown code point
maps to glyph 0, an invalid glyph index produces empty outlines, zero
metrics and empty bitmaps.
*/

#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

macro_rules! warn {
    ($($arg:tt)+) => {
        log::warn!($($arg)+)
    };
}

mod atlas;
mod cff;
mod cmap;
mod flatten;
mod glyf;
mod gpos;
mod head;
mod hhea;
mod hmtx;
mod kern;
mod loca;
mod maxp;
mod name;
mod os2;
mod parser;
mod raster;
mod sdf;
mod svg;

use core::fmt;
use core::num::NonZeroU16;

use parser::{FromData, Stream};

pub use atlas::{
    bake_font_bitmap, baked_quad, packed_quad, AlignedQuad, BakedChar, BakedFontBitmap,
    Codepoints, FontSize, PackRange, PackRect, PackedChar, Packer, RectPacker, RowPacker,
};
pub use cff::CFFError;
pub use hmtx::HorizontalMetrics;
pub use kern::KerningPair;
pub use name::{compare_utf8_to_utf16_be, find_matching_font, FontStyle, Name, Names};
pub use raster::{rasterize, BitmapView, GlyphBitmap, PixelRect};

/// Glyph outlines are flattened with this tolerance, in pixels,
/// unless stated otherwise.
pub const DEFAULT_FLATNESS: f32 = 0.35;

/// A type-safe wrapper for a glyph index.
///
/// Glyph 0 is the `.notdef` glyph by convention.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct GlyphId(pub u16);

impl FromData for GlyphId {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(GlyphId)
    }
}

/// A rectangle in font units.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[allow(missing_docs)]
pub struct Rect {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

/// Font-wide vertical metrics in font units.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct VerticalMetrics {
    /// Distance from the baseline to the visual top.
    pub ascent: i16,

    /// Distance from the baseline to the visual bottom. Usually negative.
    pub descent: i16,

    /// Extra space between lines.
    pub line_gap: i16,
}

/// A table name, used by error values.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum TableName {
    CharacterToGlyphIndexMapping,
    CompactFontFormat,
    GlyphData,
    Header,
    HorizontalHeader,
    HorizontalMetrics,
    IndexToLocation,
    MaximumProfile,
}

impl TableName {
    fn tag(self) -> &'static str {
        match self {
            TableName::CharacterToGlyphIndexMapping => "cmap",
            TableName::CompactFontFormat => "CFF ",
            TableName::GlyphData => "glyf",
            TableName::Header => "head",
            TableName::HorizontalHeader => "hhea",
            TableName::HorizontalMetrics => "hmtx",
            TableName::IndexToLocation => "loca",
            TableName::MaximumProfile => "maxp",
        }
    }
}

/// A font parsing error.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Error {
    /// The buffer doesn't start with a known font or collection magic.
    UnknownMagic,

    /// A font collection doesn't have a font at the requested index.
    FontIndexOutOfBounds,

    /// One of the required tables is missing or malformed.
    ///
    /// `glyf` and `CFF ` are each required only when the other one is absent.
    TableMissing(TableName),

    /// The font directory itself is truncated.
    MalformedFont,

    /// The CFF table cannot be used for outlining.
    CFF(CFFError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnknownMagic => write!(f, "unknown font magic"),
            Error::FontIndexOutOfBounds => write!(f, "font index is out of bounds"),
            Error::TableMissing(name) => {
                write!(f, "the {} table is missing or malformed", name.tag())
            }
            Error::MalformedFont => write!(f, "the font directory is malformed"),
            Error::CFF(e) => write!(f, "CFF error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// A specialized `Result` for font parsing.
pub type Result<T> = core::result::Result<T, Error>;

/// A trait for glyph outline construction.
///
/// Coordinates are in font units, y grows upwards.
pub trait OutlineBuilder {
    /// Appends a MoveTo segment. Start of a contour.
    fn move_to(&mut self, x: f32, y: f32);

    /// Appends a LineTo segment.
    fn line_to(&mut self, x: f32, y: f32);

    /// Appends a quadratic curve segment.
    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32);

    /// Appends a cubic curve segment.
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32);

    /// Ends the current contour.
    ///
    /// Contours are already geometrically closed when this is called:
    /// the last emitted point coincides with the contour start.
    fn close(&mut self);
}

/// A glyph outline segment.
///
/// A contour starts with `MoveTo` and is closed geometrically: its last
/// segment ends exactly on the contour's start point.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum Vertex {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    QuadTo { x1: f32, y1: f32, x: f32, y: f32 },
    CurveTo { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
}

impl Vertex {
    /// The segment's end point.
    #[inline]
    pub fn end_point(&self) -> (f32, f32) {
        match *self {
            Vertex::MoveTo { x, y } => (x, y),
            Vertex::LineTo { x, y } => (x, y),
            Vertex::QuadTo { x, y, .. } => (x, y),
            Vertex::CurveTo { x, y, .. } => (x, y),
        }
    }
}

/// Collects an outline into a vertex list.
struct ShapeBuilder {
    vertices: Vec<Vertex>,
}

impl OutlineBuilder for ShapeBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.vertices.push(Vertex::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.vertices.push(Vertex::LineTo { x, y });
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.vertices.push(Vertex::QuadTo { x1, y1, x, y });
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.vertices.push(Vertex::CurveTo { x1, y1, x2, y2, x, y });
    }

    fn close(&mut self) {}
}

/// Tracks the tight bounding box of an outline without storing it.
pub(crate) struct BboxBuilder {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub has_points: bool,
}

impl BboxBuilder {
    pub fn new() -> Self {
        BboxBuilder {
            x_min: core::f32::MAX,
            y_min: core::f32::MAX,
            x_max: core::f32::MIN,
            y_max: core::f32::MIN,
            has_points: false,
        }
    }

    fn add(&mut self, x: f32, y: f32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
        self.has_points = true;
    }

    pub fn to_rect(&self) -> Option<Rect> {
        if !self.has_points {
            return None;
        }

        Some(Rect {
            x_min: self.x_min as i16,
            y_min: self.y_min as i16,
            x_max: self.x_max as i16,
            y_max: self.y_max as i16,
        })
    }
}

impl OutlineBuilder for BboxBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.add(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.add(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.add(x1, y1);
        self.add(x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.add(x1, y1);
        self.add(x2, y2);
        self.add(x, y);
    }

    fn close(&mut self) {}
}

const SFNT_VERSION_TRUE_TYPE: u32 = 0x0001_0000;
const SFNT_VERSION_OPEN_TYPE: u32 = 0x4F54_544F; // OTTO
const SFNT_VERSION_APPLE_TRUE: u32 = 0x7472_7565; // true
const SFNT_VERSION_TRUE_TYPE_1: u32 = 0x3100_0000; // '1', 0, 0, 0
const SFNT_VERSION_TYP1: u32 = 0x7479_7031; // typ1
const COLLECTION_MAGIC: u32 = 0x7474_6366; // ttcf

fn is_font_magic(magic: u32) -> bool {
    magic == SFNT_VERSION_TRUE_TYPE
        || magic == SFNT_VERSION_OPEN_TYPE
        || magic == SFNT_VERSION_APPLE_TRUE
        || magic == SFNT_VERSION_TRUE_TYPE_1
        // An SFNT wrapper around PostScript Type 1 data. Recognized here,
        // rejected later by the required-tables check.
        || magic == SFNT_VERSION_TYP1
}

/// Returns the number of fonts stored in the buffer.
///
/// 1 for a plain font, the collection size for a TrueType collection and
/// `None` when the header is not recognized.
pub fn number_of_fonts(data: &[u8]) -> Option<u32> {
    let magic: u32 = Stream::read_at(data, 0)?;
    if magic == COLLECTION_MAGIC {
        Stream::read_at(data, 8)
    } else if is_font_magic(magic) {
        Some(1)
    } else {
        None
    }
}

/// Returns the byte offset of the `index`-th font in the buffer.
///
/// For a plain font only index 0 is valid and maps to offset 0.
pub fn font_offset_for_index(data: &[u8], index: u32) -> Option<u32> {
    let magic: u32 = Stream::read_at(data, 0)?;
    if magic == COLLECTION_MAGIC {
        let num_fonts: u32 = Stream::read_at(data, 8)?;
        if index >= num_fonts {
            return None;
        }

        // The offset array starts right after the collection header.
        Stream::read_at(data, 12 + index as usize * 4)
    } else if is_font_magic(magic) && index == 0 {
        Some(0)
    } else {
        None
    }
}

/// Finds a table by tag in a font starting at `font_offset`,
/// without building a whole `Font`.
pub(crate) fn find_table<'a>(data: &'a [u8], font_offset: u32, tag: &[u8; 4]) -> Option<&'a [u8]> {
    let mut s = Stream::new_at(data, font_offset as usize)?;
    s.skip::<u32>(); // magic
    let num_tables: u16 = s.read()?;
    s.advance(6); // searchRange + entrySelector + rangeShift
    let tables = s.read_array16::<TableRecord>(num_tables)?;

    for table in tables {
        if &table.tag == tag {
            let start = table.offset as usize;
            let end = start.checked_add(table.length as usize)?;
            return data.get(start..end);
        }
    }

    None
}

#[derive(Clone, Copy)]
struct TableRecord {
    tag: [u8; 4],
    offset: u32,
    length: u32,
}

impl FromData for TableRecord {
    const SIZE: usize = 16;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let tag = s.read_bytes(4)?;
        s.skip::<u32>(); // checksum
        Some(TableRecord {
            tag: [tag[0], tag[1], tag[2], tag[3]],
            offset: s.read()?,
            length: s.read()?,
        })
    }
}

/// Which source the glyph outlines come from.
#[derive(Clone, Copy, PartialEq, Debug)]
enum OutlineSource {
    TrueType,
    CompactFontFormat,
}

/// A font handle.
///
/// Immutable once created; all queries borrow the original byte buffer.
/// Can be freely shared between threads.
#[derive(Clone)]
pub struct Font<'a> {
    cmap_subtable: &'a [u8],
    head: head::Table<'a>,
    hhea: hhea::Table<'a>,
    hmtx: hmtx::Table<'a>,
    os_2: Option<os2::Table<'a>>,
    glyf: Option<&'a [u8]>,
    loca: Option<loca::Table<'a>>,
    cff: Option<cff::Metadata<'a>>,
    kern: Option<&'a [u8]>,
    gpos: Option<&'a [u8]>,
    name: Option<&'a [u8]>,
    svg: Option<svg::DocumentList<'a>>,
    number_of_glyphs: NonZeroU16,
    outline_source: OutlineSource,
}

impl<'a> Font<'a> {
    /// Creates a `Font` from a raw buffer.
    ///
    /// `index` selects a font inside a TrueType collection;
    /// for a plain font it must be 0.
    ///
    /// Required tables: `head`, `hhea`, `hmtx`, `maxp`, `cmap` and either
    /// `glyf`+`loca` or a usable `CFF `. Optional tables with invalid data
    /// are skipped.
    pub fn from_data(data: &'a [u8], index: u32) -> Result<Self> {
        let magic: u32 = Stream::read_at(data, 0).ok_or(Error::UnknownMagic)?;
        if !is_font_magic(magic) && magic != COLLECTION_MAGIC {
            return Err(Error::UnknownMagic);
        }

        let offset = font_offset_for_index(data, index).ok_or(Error::FontIndexOutOfBounds)?;
        let table_data = data.get(offset as usize..).ok_or(Error::FontIndexOutOfBounds)?;

        let mut s = Stream::new(table_data);
        let sfnt_version: u32 = s.read().ok_or(Error::MalformedFont)?;
        if !is_font_magic(sfnt_version) {
            return Err(Error::UnknownMagic);
        }

        let num_tables: u16 = s.read().ok_or(Error::MalformedFont)?;
        s.advance(6); // searchRange + entrySelector + rangeShift
        let tables = s
            .read_array16::<TableRecord>(num_tables)
            .ok_or(Error::MalformedFont)?;

        let mut cmap_data = None;
        let mut cff_data = None;
        let mut glyf = None;
        let mut gpos = None;
        let mut head_data = None;
        let mut hhea_data = None;
        let mut hmtx_data = None;
        let mut kern = None;
        let mut loca_data = None;
        let mut maxp_data = None;
        let mut name = None;
        let mut os_2 = None;
        let mut svg_data = None;
        for table in tables {
            // Table lengths come from the directory, never from the tables.
            // Offsets are absolute within the whole buffer, which is what
            // lets collection fonts share tables.
            let start = table.offset as usize;
            let end = match start.checked_add(table.length as usize) {
                Some(end) => end,
                None => continue,
            };
            let range = start..end;

            match &table.tag {
                b"CFF " => cff_data = data.get(range),
                b"GPOS" => gpos = data.get(range),
                b"OS/2" => os_2 = data.get(range).and_then(os2::Table::parse),
                b"SVG " => svg_data = data.get(range),
                b"cmap" => cmap_data = data.get(range),
                b"glyf" => glyf = data.get(range),
                b"head" => head_data = data.get(range).and_then(head::Table::parse),
                b"hhea" => hhea_data = data.get(range).and_then(hhea::Table::parse),
                b"hmtx" => hmtx_data = data.get(range),
                b"kern" => kern = data.get(range),
                b"loca" => loca_data = data.get(range),
                b"maxp" => maxp_data = data.get(range),
                b"name" => name = data.get(range),
                _ => {}
            }
        }

        let head = head_data.ok_or(Error::TableMissing(TableName::Header))?;
        let hhea = hhea_data.ok_or(Error::TableMissing(TableName::HorizontalHeader))?;
        let number_of_glyphs = maxp_data
            .and_then(maxp::parse)
            .ok_or(Error::TableMissing(TableName::MaximumProfile))?;

        let hmtx = hmtx_data
            .and_then(|data| hmtx::Table::parse(data, hhea.number_of_h_metrics(), number_of_glyphs))
            .ok_or(Error::TableMissing(TableName::HorizontalMetrics))?;

        let cmap_subtable = cmap_data
            .and_then(cmap::find_subtable)
            .ok_or(Error::TableMissing(TableName::CharacterToGlyphIndexMapping))?;

        let loca = match (glyf, loca_data) {
            (Some(_), Some(loca_data)) => {
                let format = match head.index_to_loc_format() {
                    0 => loca::IndexToLocationFormat::Short,
                    1 => loca::IndexToLocationFormat::Long,
                    _ => return Err(Error::TableMissing(TableName::IndexToLocation)),
                };
                Some(
                    loca::Table::parse(loca_data, number_of_glyphs, format)
                        .ok_or(Error::TableMissing(TableName::IndexToLocation))?,
                )
            }
            (Some(_), None) => return Err(Error::TableMissing(TableName::IndexToLocation)),
            (None, _) => None,
        };

        let (cff, outline_source) = if loca.is_some() {
            // A CFF table next to glyf is ignored; glyf wins.
            (None, OutlineSource::TrueType)
        } else {
            let cff_data = cff_data.ok_or(Error::TableMissing(TableName::CompactFontFormat))?;
            let metadata = cff::parse_metadata(cff_data).map_err(Error::CFF)?;
            (Some(metadata), OutlineSource::CompactFontFormat)
        };

        let svg = svg_data.and_then(svg::DocumentList::parse);

        Ok(Font {
            cmap_subtable,
            head,
            hhea,
            hmtx,
            os_2,
            glyf,
            loca,
            cff,
            kern,
            gpos,
            name,
            svg,
            number_of_glyphs,
            outline_source,
        })
    }

    /// Returns the total number of glyphs. Never zero.
    #[inline]
    pub fn number_of_glyphs(&self) -> u16 {
        self.number_of_glyphs.get()
    }

    /// Returns font's units per EM.
    ///
    /// `None` when the value is outside the 16..=16384 range.
    #[inline]
    pub fn units_per_em(&self) -> Option<u16> {
        let num = self.head.units_per_em();
        if (16..=16384).contains(&num) {
            Some(num)
        } else {
            None
        }
    }

    /// Resolves the glyph index for a code point.
    ///
    /// Returns glyph 0, the `.notdef` glyph, for an unmapped code point.
    /// The result is always below [`number_of_glyphs`](Self::number_of_glyphs).
    pub fn glyph_index(&self, code_point: u32) -> GlyphId {
        match cmap::glyph_index(self.cmap_subtable, code_point) {
            Some(id) if id.0 < self.number_of_glyphs.get() => id,
            _ => GlyphId(0),
        }
    }

    #[inline]
    fn is_valid_glyph(&self, glyph_id: GlyphId) -> bool {
        glyph_id.0 < self.number_of_glyphs.get()
    }

    /// Returns glyph's horizontal metrics.
    pub fn glyph_hor_metrics(&self, glyph_id: GlyphId) -> Option<HorizontalMetrics> {
        if !self.is_valid_glyph(glyph_id) {
            return None;
        }

        self.hmtx.get(glyph_id)
    }

    /// Returns horizontal metrics for the glyph the code point maps to.
    #[inline]
    pub fn codepoint_hor_metrics(&self, code_point: u32) -> Option<HorizontalMetrics> {
        self.glyph_hor_metrics(self.glyph_index(code_point))
    }

    /// Returns the `hhea` vertical metrics.
    #[inline]
    pub fn vertical_metrics(&self) -> VerticalMetrics {
        VerticalMetrics {
            ascent: self.hhea.ascender(),
            descent: self.hhea.descender(),
            line_gap: self.hhea.line_gap(),
        }
    }

    /// Returns the typographic metrics from `OS/2`, when present.
    #[inline]
    pub fn typographic_metrics(&self) -> Option<VerticalMetrics> {
        self.os_2.map(|table| table.typographic_metrics())
    }

    /// Returns the font-wide bounding box from `head`.
    #[inline]
    pub fn global_bounding_box(&self) -> Rect {
        self.head.global_bounding_box()
    }

    /// Returns the glyph's tight bounding box in font units.
    ///
    /// For TrueType outlines the box is read from the glyph header.
    /// For CFF the charstring is executed in bounds mode.
    pub fn glyph_box(&self, glyph_id: GlyphId) -> Option<Rect> {
        if !self.is_valid_glyph(glyph_id) {
            return None;
        }

        match self.outline_source {
            OutlineSource::TrueType => {
                let data = self.glyph_data(glyph_id)?;
                glyf::bounding_box(data)
            }
            OutlineSource::CompactFontFormat => {
                let mut builder = BboxBuilder::new();
                let metadata = self.cff.as_ref()?;
                cff::outline(metadata, glyph_id, &mut builder).ok()?;
                builder.to_rect()
            }
        }
    }

    /// Returns the bounding box of the glyph the code point maps to.
    #[inline]
    pub fn codepoint_box(&self, code_point: u32) -> Option<Rect> {
        self.glyph_box(self.glyph_index(code_point))
    }

    /// Checks whether the glyph has no outline at all.
    pub fn is_glyph_empty(&self, glyph_id: GlyphId) -> bool {
        if !self.is_valid_glyph(glyph_id) {
            return true;
        }

        match self.outline_source {
            OutlineSource::TrueType => match self.glyph_data(glyph_id) {
                Some(data) => glyf::is_empty(data),
                None => true,
            },
            OutlineSource::CompactFontFormat => {
                let mut builder = BboxBuilder::new();
                match self.cff.as_ref() {
                    Some(metadata) => match cff::outline(metadata, glyph_id, &mut builder) {
                        Ok(()) => !builder.has_points,
                        Err(_) => true,
                    },
                    None => true,
                }
            }
        }
    }

    fn glyph_data(&self, glyph_id: GlyphId) -> Option<&'a [u8]> {
        let range = self.loca?.glyph_range(glyph_id)?;
        self.glyf?.get(range)
    }

    /// Outlines a glyph into `builder` and returns its tight bounding box.
    ///
    /// Returns `None` when the glyph has no outline or the glyph index
    /// is out of range.
    pub fn outline_glyph(
        &self,
        glyph_id: GlyphId,
        builder: &mut dyn OutlineBuilder,
    ) -> Option<Rect> {
        if !self.is_valid_glyph(glyph_id) {
            return None;
        }

        match self.outline_source {
            OutlineSource::TrueType => {
                let data = self.glyph_data(glyph_id)?;
                let bbox = glyf::bounding_box(data);
                glyf::outline(self, data, 0, builder)?;
                bbox
            }
            OutlineSource::CompactFontFormat => {
                let metadata = self.cff.as_ref()?;
                let mut bbox = BboxBuilder::new();
                let mut dual = DualBuilder {
                    builder,
                    bbox: &mut bbox,
                };
                cff::outline(metadata, glyph_id, &mut dual).ok()?;
                bbox.to_rect()
            }
        }
    }

    /// Returns the glyph outline as a vertex list.
    ///
    /// An empty vector for empty and out-of-range glyphs.
    pub fn glyph_shape(&self, glyph_id: GlyphId) -> Vec<Vertex> {
        let mut builder = ShapeBuilder { vertices: Vec::new() };
        if self.outline_glyph(glyph_id, &mut builder).is_none() {
            return Vec::new();
        }

        builder.vertices
    }

    /// Returns the outline of the glyph the code point maps to.
    #[inline]
    pub fn codepoint_shape(&self, code_point: u32) -> Vec<Vertex> {
        self.glyph_shape(self.glyph_index(code_point))
    }

    /// Returns the kerning between two glyphs, in font units.
    ///
    /// GPOS pair adjustments and the `kern` table both contribute.
    /// 0 when the font has neither.
    pub fn glyph_kern_advance(&self, left: GlyphId, right: GlyphId) -> i16 {
        if !self.is_valid_glyph(left) || !self.is_valid_glyph(right) {
            return 0;
        }

        let mut advance = 0i16;
        if let Some(data) = self.gpos {
            advance = advance.saturating_add(gpos::glyphs_kerning(data, left, right).unwrap_or(0));
        }

        if let Some(data) = self.kern {
            advance = advance.saturating_add(kern::glyphs_kerning(data, left, right).unwrap_or(0));
        }

        advance
    }

    /// Returns the kerning between the glyphs two code points map to.
    #[inline]
    pub fn codepoint_kern_advance(&self, left: u32, right: u32) -> i16 {
        self.glyph_kern_advance(self.glyph_index(left), self.glyph_index(right))
    }

    /// Dumps the `kern` table's first horizontal format 0 subtable.
    ///
    /// Empty when the font has no such subtable.
    pub fn kerning_pairs(&self) -> Vec<KerningPair> {
        self.kern.map(kern::pairs).unwrap_or_default()
    }

    /// Computes a scale factor to produce a font whose "height",
    /// ascent minus descent, is `pixels` tall.
    pub fn scale_for_pixel_height(&self, pixels: f32) -> f32 {
        let height = self.hhea.ascender() as f32 - self.hhea.descender() as f32;
        if height == 0.0 {
            return 0.0;
        }

        pixels / height
    }

    /// Computes a scale factor to produce a font whose EM size
    /// is `pixels` tall.
    pub fn scale_for_em_to_pixels(&self, pixels: f32) -> f32 {
        let units_per_em = self.head.units_per_em();
        if units_per_em == 0 {
            return 0.0;
        }

        pixels / units_per_em as f32
    }

    /// Returns the SVG document covering the glyph, when the font has one.
    pub fn glyph_svg(&self, glyph_id: GlyphId) -> Option<&'a [u8]> {
        self.svg?.find(glyph_id)
    }

    /// Returns an iterator over name records.
    pub fn names(&self) -> Names<'a> {
        name::names(self.name.unwrap_or(&[]))
    }

    /// Returns the raw data of a name record matching all four identifiers.
    ///
    /// Strings for Windows platforms are UTF-16BE.
    pub fn name_string(
        &self,
        platform_id: u16,
        encoding_id: u16,
        language_id: u16,
        name_id: u16,
    ) -> Option<&'a [u8]> {
        name::name_string(self.name?, platform_id, encoding_id, language_id, name_id)
    }
}

impl fmt::Debug for Font<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Font()")
    }
}

/// Forwards an outline to a client builder while tracking its bounding box.
struct DualBuilder<'a, 'b> {
    builder: &'a mut dyn OutlineBuilder,
    bbox: &'b mut BboxBuilder,
}

impl OutlineBuilder for DualBuilder<'_, '_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.bbox.move_to(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.bbox.line_to(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.bbox.quad_to(x1, y1, x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.bbox.curve_to(x1, y1, x2, y2, x, y);
        self.builder.curve_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
