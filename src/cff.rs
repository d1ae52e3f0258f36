// Useful links:
// http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5176.CFF.pdf
// http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5177.Type2.pdf

use core::fmt;

use crate::parser::Stream;
use crate::{GlyphId, OutlineBuilder};

// Limits according to the Adobe Technical Note #5176, chapter 4 DICT Data.
const MAX_OPERANDS_LEN: usize = 48;

// Limits according to the Adobe Technical Note #5177 Appendix B.
const SUBR_NESTING_LIMIT: u8 = 10;
const MAX_ARGUMENTS_STACK_LEN: usize = 48;

const TWO_BYTE_OPERATOR_MARK: u8 = 12;

// Top DICT operators.
const CHAR_STRINGS_OP: u16 = 17;
const PRIVATE_OP: u16 = 18;
const CHAR_STRING_TYPE_OP: u16 = 1206;
const FD_ARRAY_OP: u16 = 1236;
const FD_SELECT_OP: u16 = 1237;

// Private DICT operators.
const SUBRS_OP: u16 = 19;

/// A list of errors that can occur during CFF table parsing
/// and charstring execution.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CFFError {
    /// The table doesn't have any charstrings.
    NoCharStrings,

    /// Only Type 2 charstrings are supported.
    UnsupportedCharStringType,

    /// The glyph has no charstring.
    MissingGlyph,

    /// An invalid operand occurred.
    InvalidOperand,

    /// A reserved operator occurred.
    InvalidOperator,

    /// An unsupported operator occurred.
    UnsupportedOperator,

    /// Failed to parse a float number.
    InvalidFloat,

    /// The `OffSize` value must be in the 1..=4 range.
    InvalidOffsetSize,

    /// A subroutine with an out-of-range index was called.
    InvalidSubroutineIndex,

    /// Subroutine nesting is limited to 10.
    NestingLimitReached,

    /// The arguments stack is limited to 48 values.
    ArgumentsStackLimitReached,

    /// An operator expected a different amount of arguments on the stack.
    InvalidArgumentsStackLength,
}

impl fmt::Display for CFFError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CFFError::NoCharStrings => write!(f, "table doesn't have any charstrings"),
            CFFError::UnsupportedCharStringType => write!(f, "charstring type is not 2"),
            CFFError::MissingGlyph => write!(f, "glyph has no charstring"),
            CFFError::InvalidOperand => write!(f, "an invalid operand occurred"),
            CFFError::InvalidOperator => write!(f, "an invalid operator occurred"),
            CFFError::UnsupportedOperator => write!(f, "an unsupported operator occurred"),
            CFFError::InvalidFloat => write!(f, "failed to parse a float number"),
            CFFError::InvalidOffsetSize => write!(f, "OffSize with an invalid value occurred"),
            CFFError::InvalidSubroutineIndex => write!(f, "an invalid subroutine index"),
            CFFError::NestingLimitReached => write!(f, "subroutine nesting limit reached"),
            CFFError::ArgumentsStackLimitReached => write!(f, "arguments stack limit reached"),
            CFFError::InvalidArgumentsStackLength => {
                write!(f, "an invalid amount of items are in an arguments stack")
            }
        }
    }
}

impl std::error::Error for CFFError {}

/// Everything the charstring machine needs, resolved once at init.
#[derive(Clone, Default, Debug)]
pub(crate) struct Metadata<'a> {
    // The whole table; Private DICT offsets inside Font DICTs
    // are relative to it.
    table: &'a [u8],
    char_strings: DataIndex<'a>,
    global_subrs: DataIndex<'a>,
    local_subrs: DataIndex<'a>,
    font_dicts: DataIndex<'a>,
    fd_select: &'a [u8],
}

pub(crate) fn parse_metadata(data: &[u8]) -> Result<Metadata, CFFError> {
    let mut s = Stream::new(data);

    // Parse Header.
    let major: u8 = s.read().ok_or(CFFError::NoCharStrings)?;
    s.skip::<u8>(); // minor
    let header_size: u8 = s.read().ok_or(CFFError::NoCharStrings)?;
    s.skip::<u8>(); // absolute offset size

    if major != 1 {
        return Err(CFFError::NoCharStrings);
    }

    // Jump to the Name INDEX. It's not necessarily right after the header.
    if header_size as usize > s.offset() {
        s.advance(header_size as usize - s.offset());
    }

    skip_index(&mut s)?;

    let top_dict = parse_top_dict(&mut s)?;

    if top_dict.char_string_type != 2 {
        return Err(CFFError::UnsupportedCharStringType);
    }

    skip_index(&mut s)?; // String INDEX.

    // The Global Subroutines INDEX immediately follows the String INDEX.
    let global_subrs = parse_index(&mut s)?;

    let char_strings = {
        let mut s = Stream::new_at(data, top_dict.char_strings_offset)
            .ok_or(CFFError::NoCharStrings)?;
        parse_index(&mut s)?
    };

    if char_strings.len() == 0 {
        return Err(CFFError::NoCharStrings);
    }

    let local_subrs = match top_dict.private_dict_range.clone() {
        Some(range) => {
            let dict_data = data.get(range.clone()).ok_or(CFFError::NoCharStrings)?;
            match parse_private_dict(dict_data) {
                Some(subrs_offset) => {
                    // 'The local subroutines offset is relative to the
                    // beginning of the Private DICT data.'
                    let start = range
                        .start
                        .checked_add(subrs_offset)
                        .ok_or(CFFError::NoCharStrings)?;
                    let mut s =
                        Stream::new_at(data, start).ok_or(CFFError::NoCharStrings)?;
                    parse_index(&mut s)?
                }
                None => DataIndex::default(),
            }
        }
        None => DataIndex::default(),
    };

    let font_dicts = match top_dict.fd_array_offset {
        Some(offset) => {
            let mut s = Stream::new_at(data, offset).ok_or(CFFError::NoCharStrings)?;
            parse_index(&mut s)?
        }
        None => DataIndex::default(),
    };

    let fd_select = match top_dict.fd_select_offset {
        Some(offset) => data.get(offset..).unwrap_or(&[]),
        None => &[],
    };

    Ok(Metadata {
        table: data,
        char_strings,
        global_subrs,
        local_subrs,
        font_dicts,
        fd_select,
    })
}

/// Outlines a glyph by executing its charstring.
pub(crate) fn outline(
    metadata: &Metadata,
    glyph_id: GlyphId,
    builder: &mut dyn OutlineBuilder,
) -> Result<(), CFFError> {
    let data = metadata
        .char_strings
        .get(glyph_id.0)
        .ok_or(CFFError::MissingGlyph)?;

    // CID-keyed fonts store local subroutines per Font DICT.
    let local_subrs = if !metadata.fd_select.is_empty() {
        cid_local_subrs(metadata, glyph_id).unwrap_or_default()
    } else {
        metadata.local_subrs
    };

    let mut ctx = CharStringContext {
        global_subrs: metadata.global_subrs,
        local_subrs,
        is_first_move_to: true,
        width_parsed: false,
        stems_len: 0,
    };

    let mut inner = Pen {
        builder,
        first_x: 0.0,
        first_y: 0.0,
    };

    let mut stack = ArgumentsStack::new();
    let _ = execute(&mut ctx, data, 0.0, 0.0, &mut stack, 0, &mut inner)?;
    Ok(())
}

/// Resolves local subroutines through `FDSelect` and the matching Font DICT.
fn cid_local_subrs<'a>(metadata: &Metadata<'a>, glyph_id: GlyphId) -> Option<DataIndex<'a>> {
    let fd = fd_index(metadata.fd_select, glyph_id)?;
    let font_dict = metadata.font_dicts.get(fd as u16)?;

    // A Font DICT holds a Private DICT, whose offset is relative
    // to the start of the whole table.
    let range = parse_font_dict(font_dict)?;
    let dict_data = metadata.table.get(range.clone())?;
    let subrs_offset = parse_private_dict(dict_data)?;
    let start = range.start.checked_add(subrs_offset)?;
    let mut s = Stream::new_at(metadata.table, start)?;
    parse_index(&mut s).ok()
}

/// Maps a glyph to its Font DICT index. `FDSelect` formats 0 and 3.
fn fd_index(data: &[u8], glyph_id: GlyphId) -> Option<u8> {
    let mut s = Stream::new(data);
    let format: u8 = s.read()?;
    match format {
        0 => Stream::read_at(data, 1 + glyph_id.0 as usize),
        3 => {
            let number_of_ranges: u16 = s.read()?;
            if number_of_ranges == 0 {
                return None;
            }

            let ranges = s.read_array16::<FdSelectRange>(number_of_ranges)?;
            let sentinel: u16 = s.read()?;
            if glyph_id.0 >= sentinel {
                return None;
            }

            // The last range whose `first` is not above the glyph.
            let mut left = 0u16;
            let mut right = number_of_ranges;
            while left < right {
                let mid = (left + right) / 2;
                if ranges.get(mid)?.first <= glyph_id.0 {
                    left = mid + 1;
                } else {
                    right = mid;
                }
            }

            if left == 0 {
                return None;
            }

            Some(ranges.get(left - 1)?.fd)
        }
        _ => None,
    }
}

#[derive(Clone, Copy)]
struct FdSelectRange {
    first: u16,
    fd: u8,
}

impl crate::parser::FromData for FdSelectRange {
    const SIZE: usize = 3;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(FdSelectRange {
            first: s.read()?,
            fd: s.read()?,
        })
    }
}

struct TopDict {
    char_strings_offset: usize,
    private_dict_range: Option<core::ops::Range<usize>>,
    char_string_type: i32,
    fd_array_offset: Option<usize>,
    fd_select_offset: Option<usize>,
}

fn parse_top_dict(s: &mut Stream) -> Result<TopDict, CFFError> {
    let index = parse_index(s)?;

    // The Top DICT INDEX should have only one dictionary.
    let data = index.get(0).ok_or(CFFError::NoCharStrings)?;

    let mut top_dict = TopDict {
        char_strings_offset: 0,
        private_dict_range: None,
        char_string_type: 2,
        fd_array_offset: None,
        fd_select_offset: None,
    };

    let mut dict_parser = DictionaryParser::new(data);
    while let Some(operator) = dict_parser.parse_next() {
        match operator {
            CHAR_STRINGS_OP => {
                dict_parser.parse_operands()?;
                let operands = dict_parser.operands();
                if operands.len() == 1 {
                    top_dict.char_strings_offset = operands[0].as_i32() as usize;
                }
            }
            PRIVATE_OP => {
                dict_parser.parse_operands()?;
                let operands = dict_parser.operands();
                if operands.len() == 2 {
                    let len = operands[0].as_i32() as usize;
                    let start = operands[1].as_i32() as usize;
                    if let Some(end) = start.checked_add(len) {
                        top_dict.private_dict_range = Some(start..end);
                    }
                }
            }
            CHAR_STRING_TYPE_OP => {
                dict_parser.parse_operands()?;
                let operands = dict_parser.operands();
                if operands.len() == 1 {
                    top_dict.char_string_type = operands[0].as_i32();
                }
            }
            FD_ARRAY_OP => {
                dict_parser.parse_operands()?;
                let operands = dict_parser.operands();
                if operands.len() == 1 {
                    top_dict.fd_array_offset = Some(operands[0].as_i32() as usize);
                }
            }
            FD_SELECT_OP => {
                dict_parser.parse_operands()?;
                let operands = dict_parser.operands();
                if operands.len() == 1 {
                    top_dict.fd_select_offset = Some(operands[0].as_i32() as usize);
                }
            }
            _ => {}
        }
    }

    // Without charstrings there is nothing to parse.
    if top_dict.char_strings_offset == 0 {
        return Err(CFFError::NoCharStrings);
    }

    Ok(top_dict)
}

/// Returns the local subroutines offset, when the Private DICT defines one.
fn parse_private_dict(data: &[u8]) -> Option<usize> {
    let mut dict_parser = DictionaryParser::new(data);
    while let Some(operator) = dict_parser.parse_next() {
        if operator == SUBRS_OP {
            dict_parser.parse_operands().ok()?;
            let operands = dict_parser.operands();
            if operands.len() == 1 {
                return Some(operands[0].as_i32() as usize);
            }

            break;
        }
    }

    None
}

/// Returns the Private DICT range from a Font DICT.
fn parse_font_dict(data: &[u8]) -> Option<core::ops::Range<usize>> {
    let mut dict_parser = DictionaryParser::new(data);
    while let Some(operator) = dict_parser.parse_next() {
        if operator == PRIVATE_OP {
            dict_parser.parse_operands().ok()?;
            let operands = dict_parser.operands();
            if operands.len() == 2 {
                let len = operands[0].as_i32() as usize;
                let start = operands[1].as_i32() as usize;
                let end = start.checked_add(len)?;
                return Some(start..end);
            }

            break;
        }
    }

    None
}

struct CharStringContext<'a> {
    global_subrs: DataIndex<'a>,
    local_subrs: DataIndex<'a>,
    is_first_move_to: bool,
    width_parsed: bool,
    stems_len: u32,
}

/// Forwards segments while maintaining the implicit-close invariant:
/// every contour's last point coincides with its first.
struct Pen<'a> {
    builder: &'a mut dyn OutlineBuilder,
    first_x: f32,
    first_y: f32,
}

impl Pen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.first_x = x;
        self.first_y = y;
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.curve_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self, x: f32, y: f32) {
        if x != self.first_x || y != self.first_y {
            self.builder.line_to(self.first_x, self.first_y);
        }

        self.builder.close();
    }
}

fn execute(
    ctx: &mut CharStringContext,
    char_string: &[u8],
    mut x: f32,
    mut y: f32,
    stack: &mut ArgumentsStack,
    depth: u8,
    pen: &mut Pen,
) -> Result<(f32, f32), CFFError> {
    let mut s = Stream::new(char_string);

    while !s.at_end() {
        let op: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
        match op {
            0 | 2 | 9 | 13 | 15 | 16 | 17 => {
                // Reserved.
                return Err(CFFError::InvalidOperator);
            }
            1 | 3 | 18 | 23 => {
                // |- y dy {dya dyb}* hstem (1) |-
                // |- x dx {dxa dxb}* vstem (3) |-
                // |- y dy {dya dyb}* hstemhm (18) |-
                // |- x dx {dxa dxb}* vstemhm (23) |-

                // If the stack length is odd, the first value is a width.
                let len = if stack.len() & 1 == 1 && !ctx.width_parsed {
                    ctx.width_parsed = true;
                    stack.len() - 1
                } else {
                    stack.len()
                };

                ctx.stems_len += len as u32 >> 1;

                // Hints only matter for hinting.
                stack.clear();
            }
            19 | 20 => {
                // |- hintmask (19 + mask) |-
                // |- cntrmask (20 + mask) |-

                let mut len = stack.len();
                stack.clear();

                if len & 1 == 1 && !ctx.width_parsed {
                    len -= 1;
                    ctx.width_parsed = true;
                }

                // Implicit vstem hints.
                ctx.stems_len += len as u32 >> 1;

                s.advance(((ctx.stems_len + 7) >> 3) as usize);
            }
            21 => {
                // |- dx1 dy1 rmoveto (21) |-

                let mut i = 0;
                if stack.len() == 3 && !ctx.width_parsed {
                    i += 1;
                    ctx.width_parsed = true;
                } else if stack.len() != 2 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                if ctx.is_first_move_to {
                    ctx.is_first_move_to = false;
                } else {
                    pen.close(x, y);
                }

                x += stack.at(i);
                y += stack.at(i + 1);
                pen.move_to(x, y);

                stack.clear();
            }
            22 => {
                // |- dx1 hmoveto (22) |-

                let mut i = 0;
                if stack.len() == 2 && !ctx.width_parsed {
                    i += 1;
                    ctx.width_parsed = true;
                } else if stack.len() != 1 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                if ctx.is_first_move_to {
                    ctx.is_first_move_to = false;
                } else {
                    pen.close(x, y);
                }

                x += stack.at(i);
                pen.move_to(x, y);

                stack.clear();
            }
            4 => {
                // |- dy1 vmoveto (4) |-

                let mut i = 0;
                if stack.len() == 2 && !ctx.width_parsed {
                    i += 1;
                    ctx.width_parsed = true;
                } else if stack.len() != 1 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                if ctx.is_first_move_to {
                    ctx.is_first_move_to = false;
                } else {
                    pen.close(x, y);
                }

                y += stack.at(i);
                pen.move_to(x, y);

                stack.clear();
            }
            5 => {
                // |- {dxa dya}+ rlineto (5) |-

                if stack.len() & 1 == 1 || stack.is_empty() {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                let mut i = 0;
                while i < stack.len() {
                    x += stack.at(i);
                    y += stack.at(i + 1);
                    pen.line_to(x, y);
                    i += 2;
                }

                stack.clear();
            }
            6 | 7 => {
                // |- dx1 {dya dxb}* hlineto (6) |-
                // |- dy1 {dxa dyb}* vlineto (7) |-

                if stack.is_empty() {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                let mut horizontal = op == 6;
                for i in 0..stack.len() {
                    if horizontal {
                        x += stack.at(i);
                    } else {
                        y += stack.at(i);
                    }
                    horizontal = !horizontal;
                    pen.line_to(x, y);
                }

                stack.clear();
            }
            8 => {
                // |- {dxa dya dxb dyb dxc dyc}+ rrcurveto (8) |-

                if stack.len() % 6 != 0 || stack.is_empty() {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                let mut i = 0;
                while i < stack.len() {
                    let x1 = x + stack.at(i);
                    let y1 = y + stack.at(i + 1);
                    let x2 = x1 + stack.at(i + 2);
                    let y2 = y1 + stack.at(i + 3);
                    x = x2 + stack.at(i + 4);
                    y = y2 + stack.at(i + 5);

                    pen.curve_to(x1, y1, x2, y2, x, y);
                    i += 6;
                }

                stack.clear();
            }
            24 => {
                // |- {dxa dya dxb dyb dxc dyc}+ dxd dyd rcurveline (24) |-

                if stack.len() < 8 || (stack.len() - 2) % 6 != 0 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                let mut i = 0;
                while i < stack.len() - 2 {
                    let x1 = x + stack.at(i);
                    let y1 = y + stack.at(i + 1);
                    let x2 = x1 + stack.at(i + 2);
                    let y2 = y1 + stack.at(i + 3);
                    x = x2 + stack.at(i + 4);
                    y = y2 + stack.at(i + 5);

                    pen.curve_to(x1, y1, x2, y2, x, y);
                    i += 6;
                }

                x += stack.at(i);
                y += stack.at(i + 1);
                pen.line_to(x, y);

                stack.clear();
            }
            25 => {
                // |- {dxa dya}+ dxb dyb dxc dyc dxd dyd rlinecurve (25) |-

                if stack.len() < 8 || (stack.len() - 6) & 1 == 1 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                let mut i = 0;
                while i < stack.len() - 6 {
                    x += stack.at(i);
                    y += stack.at(i + 1);
                    pen.line_to(x, y);
                    i += 2;
                }

                let x1 = x + stack.at(i);
                let y1 = y + stack.at(i + 1);
                let x2 = x1 + stack.at(i + 2);
                let y2 = y1 + stack.at(i + 3);
                x = x2 + stack.at(i + 4);
                y = y2 + stack.at(i + 5);
                pen.curve_to(x1, y1, x2, y2, x, y);

                stack.clear();
            }
            26 => {
                // |- dx1? {dya dxb dyb dyc}+ vvcurveto (26) |-

                let mut i = 0;

                // An odd argument count means a leading off-axis delta.
                if stack.len() & 1 == 1 {
                    x += stack.at(0);
                    i += 1;
                }

                if (stack.len() - i) % 4 != 0 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                while i < stack.len() {
                    let x1 = x;
                    let y1 = y + stack.at(i);
                    let x2 = x1 + stack.at(i + 1);
                    let y2 = y1 + stack.at(i + 2);
                    x = x2;
                    y = y2 + stack.at(i + 3);

                    pen.curve_to(x1, y1, x2, y2, x, y);
                    i += 4;
                }

                stack.clear();
            }
            27 => {
                // |- dy1? {dxa dxb dyb dxc}+ hhcurveto (27) |-

                let mut i = 0;

                if stack.len() & 1 == 1 {
                    y += stack.at(0);
                    i += 1;
                }

                if (stack.len() - i) % 4 != 0 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                while i < stack.len() {
                    let x1 = x + stack.at(i);
                    let y1 = y;
                    let x2 = x1 + stack.at(i + 1);
                    let y2 = y1 + stack.at(i + 2);
                    x = x2 + stack.at(i + 3);
                    y = y2;

                    pen.curve_to(x1, y1, x2, y2, x, y);
                    i += 4;
                }

                stack.clear();
            }
            30 | 31 => {
                // |- dy1 dx2 dy2 dx3 {dxa dxb dyb dyc dyd dxe dye dxf}* dyf? vhcurveto (30) |-
                // |- dx1 dx2 dy2 dy3 {dya dxb dyb dxc dxd dxe dye dyf}* dxf? hvcurveto (31) |-

                if stack.len() < 4 || stack.len() % 8 > 1 && stack.len() % 8 != 4 && stack.len() % 8 != 5 {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                let mut horizontal = op == 31;
                let mut i = 0;
                while i < stack.len() {
                    if stack.len() - i < 4 {
                        return Err(CFFError::InvalidArgumentsStackLength);
                    }

                    let last = stack.len() - i == 5;
                    if horizontal {
                        let x1 = x + stack.at(i);
                        let y1 = y;
                        let x2 = x1 + stack.at(i + 1);
                        let y2 = y1 + stack.at(i + 2);
                        y = y2 + stack.at(i + 3);
                        x = x2 + if last { stack.at(i + 4) } else { 0.0 };
                        pen.curve_to(x1, y1, x2, y2, x, y);
                    } else {
                        let x1 = x;
                        let y1 = y + stack.at(i);
                        let x2 = x1 + stack.at(i + 1);
                        let y2 = y1 + stack.at(i + 2);
                        x = x2 + stack.at(i + 3);
                        y = y2 + if last { stack.at(i + 4) } else { 0.0 };
                        pen.curve_to(x1, y1, x2, y2, x, y);
                    }

                    horizontal = !horizontal;
                    i += if last { 5 } else { 4 };
                }

                stack.clear();
            }
            10 => {
                // subr# callsubr (10) -

                if stack.is_empty() {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                if depth == SUBR_NESTING_LIMIT {
                    return Err(CFFError::NestingLimitReached);
                }

                let bias = calc_subroutine_bias(ctx.local_subrs.len());
                let index = stack.pop() as i32 + bias as i32;
                let char_string = u16_index(index)
                    .and_then(|index| ctx.local_subrs.get(index))
                    .ok_or(CFFError::InvalidSubroutineIndex)?;
                let pos = execute(ctx, char_string, x, y, stack, depth + 1, pen)?;
                x = pos.0;
                y = pos.1;
            }
            29 => {
                // globalsubr# callgsubr (29) -

                if stack.is_empty() {
                    return Err(CFFError::InvalidArgumentsStackLength);
                }

                if depth == SUBR_NESTING_LIMIT {
                    return Err(CFFError::NestingLimitReached);
                }

                let bias = calc_subroutine_bias(ctx.global_subrs.len());
                let index = stack.pop() as i32 + bias as i32;
                let char_string = u16_index(index)
                    .and_then(|index| ctx.global_subrs.get(index))
                    .ok_or(CFFError::InvalidSubroutineIndex)?;
                let pos = execute(ctx, char_string, x, y, stack, depth + 1, pen)?;
                x = pos.0;
                y = pos.1;
            }
            11 => {
                // - return (11) -
                break;
            }
            14 => {
                // - endchar (14) |-

                if !stack.is_empty() && !ctx.width_parsed {
                    stack.clear();
                    ctx.width_parsed = true;
                }

                if !ctx.is_first_move_to {
                    ctx.is_first_move_to = true;
                    pen.close(x, y);
                }

                break;
            }
            TWO_BYTE_OPERATOR_MARK => {
                let op2: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
                match op2 {
                    34 => {
                        // |- dx1 dx2 dy2 dx3 dx4 dx5 dx6 hflex (12 34) |-

                        if stack.len() != 7 {
                            return Err(CFFError::InvalidArgumentsStackLength);
                        }

                        let dx1 = x + stack.at(0);
                        let dy1 = y;
                        let dx2 = dx1 + stack.at(1);
                        let dy2 = dy1 + stack.at(2);
                        let dx3 = dx2 + stack.at(3);
                        let dy3 = dy2;
                        let dx4 = dx3 + stack.at(4);
                        let dy4 = dy2;
                        let dx5 = dx4 + stack.at(5);
                        let dy5 = y;
                        x = dx5 + stack.at(6);
                        pen.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        pen.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    35 => {
                        // |- dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 dx6 dy6 fd flex (12 35) |-

                        if stack.len() != 13 {
                            return Err(CFFError::InvalidArgumentsStackLength);
                        }

                        let dx1 = x + stack.at(0);
                        let dy1 = y + stack.at(1);
                        let dx2 = dx1 + stack.at(2);
                        let dy2 = dy1 + stack.at(3);
                        let dx3 = dx2 + stack.at(4);
                        let dy3 = dy2 + stack.at(5);
                        let dx4 = dx3 + stack.at(6);
                        let dy4 = dy3 + stack.at(7);
                        let dx5 = dx4 + stack.at(8);
                        let dy5 = dy4 + stack.at(9);
                        x = dx5 + stack.at(10);
                        y = dy5 + stack.at(11);
                        // The flex depth is ignored; both curves are always
                        // rendered as curves.
                        pen.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        pen.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    36 => {
                        // |- dx1 dy1 dx2 dy2 dx3 dx4 dx5 dy5 dx6 hflex1 (12 36) |-

                        if stack.len() != 9 {
                            return Err(CFFError::InvalidArgumentsStackLength);
                        }

                        let dx1 = x + stack.at(0);
                        let dy1 = y + stack.at(1);
                        let dx2 = dx1 + stack.at(2);
                        let dy2 = dy1 + stack.at(3);
                        let dx3 = dx2 + stack.at(4);
                        let dy3 = dy2;
                        let dx4 = dx3 + stack.at(5);
                        let dy4 = dy2;
                        let dx5 = dx4 + stack.at(6);
                        let dy5 = dy4 + stack.at(7);
                        x = dx5 + stack.at(8);
                        pen.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        pen.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    37 => {
                        // |- dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 d6 flex1 (12 37) |-

                        if stack.len() != 11 {
                            return Err(CFFError::InvalidArgumentsStackLength);
                        }

                        let dx1 = x + stack.at(0);
                        let dy1 = y + stack.at(1);
                        let dx2 = dx1 + stack.at(2);
                        let dy2 = dy1 + stack.at(3);
                        let dx3 = dx2 + stack.at(4);
                        let dy3 = dy2 + stack.at(5);
                        let dx4 = dx3 + stack.at(6);
                        let dy4 = dy3 + stack.at(7);
                        let dx5 = dx4 + stack.at(8);
                        let dy5 = dy4 + stack.at(9);

                        if (dx5 - x).abs() > (dy5 - y).abs() {
                            x = dx5 + stack.at(10);
                        } else {
                            y = dy5 + stack.at(10);
                        }

                        pen.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        pen.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    _ => {
                        return Err(CFFError::UnsupportedOperator);
                    }
                }
            }
            28 => {
                // Two-byte signed integer.
                let n: i16 = s.read().ok_or(CFFError::InvalidOperand)?;
                stack.push(n as f32)?;
            }
            32..=246 => {
                stack.push(op as f32 - 139.0)?;
            }
            247..=250 => {
                let b1: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
                let n = (op as i32 - 247) * 256 + b1 as i32 + 108;
                stack.push(n as f32)?;
            }
            251..=254 => {
                let b1: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
                let n = -(op as i32 - 251) * 256 - b1 as i32 - 108;
                stack.push(n as f32)?;
            }
            255 => {
                // A 16.16 fixed point number.
                let n: i32 = s.read().ok_or(CFFError::InvalidOperand)?;
                stack.push(n as f32 / 65536.0)?;
            }
        }
    }

    Ok((x, y))
}

#[inline]
fn u16_index(index: i32) -> Option<u16> {
    use core::convert::TryFrom;
    u16::try_from(index).ok()
}

// Adobe Technical Note #5176, Chapter 16 "Local / Global Subrs INDEXes"
#[inline]
fn calc_subroutine_bias(len: u16) -> u16 {
    if len < 1240 {
        107
    } else if len < 33900 {
        1131
    } else {
        32768
    }
}

fn parse_index<'a>(s: &mut Stream<'a>) -> Result<DataIndex<'a>, CFFError> {
    let count: u16 = s.read().ok_or(CFFError::NoCharStrings)?;
    if count == 0 || count == core::u16::MAX {
        return Ok(DataIndex::default());
    }

    let offset_size = parse_offset_size(s)?;
    let offsets_len = (count as u32 + 1) * offset_size as u32;
    let offsets = VarOffsets {
        data: s
            .read_bytes(offsets_len as usize)
            .ok_or(CFFError::NoCharStrings)?,
        offset_size,
    };

    match offsets.last() {
        Some(last_offset) => {
            let data = s
                .read_bytes(last_offset as usize)
                .ok_or(CFFError::NoCharStrings)?;
            Ok(DataIndex { data, offsets })
        }
        None => Ok(DataIndex::default()),
    }
}

fn skip_index(s: &mut Stream) -> Result<(), CFFError> {
    let count: u16 = s.read().ok_or(CFFError::NoCharStrings)?;
    if count == 0 || count == core::u16::MAX {
        return Ok(());
    }

    let offset_size = parse_offset_size(s)?;
    let offsets_len = (count as u32 + 1) * offset_size as u32;
    let offsets = VarOffsets {
        data: s
            .read_bytes(offsets_len as usize)
            .ok_or(CFFError::NoCharStrings)?,
        offset_size,
    };

    if let Some(last_offset) = offsets.last() {
        s.advance(last_offset as usize);
    }

    Ok(())
}

fn parse_offset_size(s: &mut Stream) -> Result<u8, CFFError> {
    let n: u8 = s.read().ok_or(CFFError::InvalidOffsetSize)?;
    if (1..=4).contains(&n) {
        Ok(n)
    } else {
        Err(CFFError::InvalidOffsetSize)
    }
}

#[derive(Clone, Copy, Default, Debug)]
struct VarOffsets<'a> {
    data: &'a [u8],
    offset_size: u8,
}

impl<'a> VarOffsets<'a> {
    fn get(&self, index: u16) -> Option<u32> {
        if index >= self.len() {
            return None;
        }

        let start = index as usize * self.offset_size as usize;
        let mut s = Stream::new_at(self.data, start)?;
        let n: u32 = match self.offset_size {
            1 => s.read::<u8>()? as u32,
            2 => s.read::<u16>()? as u32,
            3 => s.read::<crate::parser::U24>()?.0,
            4 => s.read::<u32>()?,
            _ => return None,
        };

        // INDEX offsets are one-based.
        n.checked_sub(1)
    }

    #[inline]
    fn last(&self) -> Option<u32> {
        if self.len() != 0 {
            self.get(self.len() - 1)
        } else {
            None
        }
    }

    #[inline]
    fn len(&self) -> u16 {
        if self.offset_size == 0 {
            return 0;
        }

        (self.data.len() / self.offset_size as usize) as u16
    }
}

#[derive(Clone, Copy, Default, Debug)]
struct DataIndex<'a> {
    data: &'a [u8],
    offsets: VarOffsets<'a>,
}

impl<'a> DataIndex<'a> {
    #[inline]
    fn len(&self) -> u16 {
        // The last offset points past the end of the data.
        self.offsets.len().saturating_sub(1)
    }

    fn get(&self, index: u16) -> Option<&'a [u8]> {
        if index == core::u16::MAX || index + 1 >= self.offsets.len() {
            return None;
        }

        let start = self.offsets.get(index)? as usize;
        let end = self.offsets.get(index + 1)? as usize;
        self.data.get(start..end)
    }
}

struct DictionaryParser<'a> {
    data: &'a [u8],
    offset: usize,
    // Offset to the last operands start.
    operands_offset: usize,
    operands: [Number; MAX_OPERANDS_LEN],
    operands_len: u8,
}

impl<'a> DictionaryParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        DictionaryParser {
            data,
            offset: 0,
            operands_offset: 0,
            operands: [Number::Integer(0); MAX_OPERANDS_LEN],
            operands_len: 0,
        }
    }

    fn parse_next(&mut self) -> Option<u16> {
        let mut s = Stream::new_at(self.data, self.offset)?;
        self.operands_offset = self.offset;
        while !s.at_end() {
            let b: u8 = s.read()?;
            // 0..=21 bytes are operators.
            if b <= 21 {
                let mut operator = b as u16;

                // Two-byte operators are stored as 1200 + the second byte
                // to remain readable: 12 3 becomes 1203.
                if b == TWO_BYTE_OPERATOR_MARK {
                    operator = 1200 + s.read::<u8>()? as u16;
                }

                self.offset = s.offset();
                return Some(operator);
            } else {
                skip_number(b, &mut s)?;
            }
        }

        None
    }

    /// Parses operands of the current operator.
    ///
    /// In a DICT, operands come before the operator, so an operator has to
    /// be found first, and only the operands of interesting operators are
    /// actually parsed.
    fn parse_operands(&mut self) -> Result<(), CFFError> {
        let mut s =
            Stream::new_at(self.data, self.operands_offset).ok_or(CFFError::InvalidOperand)?;
        self.operands_len = 0;
        while !s.at_end() {
            let b: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
            if b <= 21 {
                break;
            }

            let op = parse_number(b, &mut s)?;
            self.operands[self.operands_len as usize] = op;
            self.operands_len += 1;

            if self.operands_len >= MAX_OPERANDS_LEN as u8 {
                break;
            }
        }

        Ok(())
    }

    #[inline]
    fn operands(&self) -> &[Number] {
        &self.operands[..self.operands_len as usize]
    }
}

// Adobe Technical Note #5177, Table 3 Operand Encoding
fn parse_number(b0: u8, s: &mut Stream) -> Result<Number, CFFError> {
    match b0 {
        28 => {
            let n: i16 = s.read().ok_or(CFFError::InvalidOperand)?;
            Ok(Number::Integer(n as i32))
        }
        29 => {
            let n: i32 = s.read().ok_or(CFFError::InvalidOperand)?;
            Ok(Number::Integer(n))
        }
        30 => parse_float(s),
        32..=246 => Ok(Number::Integer(b0 as i32 - 139)),
        247..=250 => {
            let b1: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
            Ok(Number::Integer((b0 as i32 - 247) * 256 + b1 as i32 + 108))
        }
        251..=254 => {
            let b1: u8 = s.read().ok_or(CFFError::InvalidOperand)?;
            Ok(Number::Integer(-(b0 as i32 - 251) * 256 - b1 as i32 - 108))
        }
        _ => Err(CFFError::InvalidOperand),
    }
}

const FLOAT_STACK_LEN: usize = 64;
const END_OF_FLOAT_FLAG: u8 = 0xf;

// Reals are nibble-encoded BCD strings.
fn parse_float(s: &mut Stream) -> Result<Number, CFFError> {
    let mut data = [0u8; FLOAT_STACK_LEN];
    let mut idx = 0;

    loop {
        let b1: u8 = s.read().ok_or(CFFError::InvalidFloat)?;
        let nibble1 = b1 >> 4;
        let nibble2 = b1 & 15;

        if nibble1 == END_OF_FLOAT_FLAG {
            break;
        }

        idx = parse_float_nibble(nibble1, idx, &mut data)?;

        if nibble2 == END_OF_FLOAT_FLAG {
            break;
        }

        idx = parse_float_nibble(nibble2, idx, &mut data)?;
    }

    let s = core::str::from_utf8(&data[..idx]).map_err(|_| CFFError::InvalidFloat)?;
    let n = s.parse().map_err(|_| CFFError::InvalidFloat)?;
    Ok(Number::Float(n))
}

// Adobe Technical Note #5176, Table 5 Nibble Definitions
fn parse_float_nibble(nibble: u8, mut idx: usize, data: &mut [u8]) -> Result<usize, CFFError> {
    if idx == FLOAT_STACK_LEN {
        return Err(CFFError::InvalidFloat);
    }

    match nibble {
        0..=9 => {
            data[idx] = b'0' + nibble;
        }
        10 => {
            data[idx] = b'.';
        }
        11 => {
            data[idx] = b'E';
        }
        12 => {
            if idx + 1 == FLOAT_STACK_LEN {
                return Err(CFFError::InvalidFloat);
            }

            data[idx] = b'E';
            idx += 1;
            data[idx] = b'-';
        }
        14 => {
            data[idx] = b'-';
        }
        _ => {
            return Err(CFFError::InvalidFloat);
        }
    }

    idx += 1;
    Ok(idx)
}

// Like `parse_number`, but without the actual parsing.
fn skip_number(b0: u8, s: &mut Stream) -> Option<()> {
    match b0 {
        28 => s.skip::<u16>(),
        29 => s.skip::<u32>(),
        30 => {
            while !s.at_end() {
                let b1: u8 = s.read()?;
                let nibble1 = b1 >> 4;
                let nibble2 = b1 & 15;
                if nibble1 == END_OF_FLOAT_FLAG || nibble2 == END_OF_FLOAT_FLAG {
                    break;
                }
            }
        }
        32..=246 => {}
        247..=250 => s.skip::<u8>(),
        251..=254 => s.skip::<u8>(),
        _ => return None,
    }

    Some(())
}

#[derive(Clone, Copy, Debug)]
enum Number {
    Integer(i32),
    Float(f32),
}

impl Number {
    #[inline]
    fn as_i32(&self) -> i32 {
        match *self {
            Number::Integer(n) => n,
            Number::Float(n) => n as i32,
        }
    }
}

struct ArgumentsStack {
    data: [f32; MAX_ARGUMENTS_STACK_LEN],
    len: usize,
}

impl ArgumentsStack {
    #[inline]
    fn new() -> Self {
        ArgumentsStack {
            data: [0.0; MAX_ARGUMENTS_STACK_LEN],
            len: 0,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn push(&mut self, n: f32) -> Result<(), CFFError> {
        if self.len == MAX_ARGUMENTS_STACK_LEN {
            Err(CFFError::ArgumentsStackLimitReached)
        } else {
            self.data[self.len] = n;
            self.len += 1;
            Ok(())
        }
    }

    #[inline]
    fn at(&self, index: usize) -> f32 {
        self.data[index]
    }

    #[inline]
    fn pop(&mut self) -> f32 {
        debug_assert!(!self.is_empty());
        self.len -= 1;
        self.data[self.len]
    }

    #[inline]
    fn clear(&mut self) {
        self.len = 0;
    }
}
