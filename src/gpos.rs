// https://docs.microsoft.com/en-us/typography/opentype/spec/gpos
//
// Only the slice of GPOS a text-layout-free engine can honor is read:
// Pair Adjustment lookups (type 2) carrying a plain x-advance on the
// first glyph, which is how fonts express kerning there.

use crate::parser::{FromData, Offset16, Stream};
use crate::GlyphId;

// The only value record layout honored: an x-advance on the first glyph
// and nothing on the second.
const X_ADVANCE_VALUE_FORMATS: (u16, u16) = (0x0004, 0x0000);

/// Returns the pair-adjustment x-advance for a glyph pair.
pub(crate) fn glyphs_kerning(data: &[u8], left: GlyphId, right: GlyphId) -> Option<i16> {
    let mut s = Stream::new(data);
    let major_version: u16 = s.read()?;
    let minor_version: u16 = s.read()?;
    if major_version != 1 || minor_version != 0 {
        return None;
    }

    s.skip::<u16>(); // scriptListOffset
    s.skip::<u16>(); // featureListOffset
    let lookup_list_offset: Offset16 = s.read()?;

    let lookup_list = data.get(lookup_list_offset.0 as usize..)?;
    let mut s = Stream::new(lookup_list);
    let lookup_count: u16 = s.read()?;
    let lookup_offsets = s.read_array16::<Offset16>(lookup_count)?;

    for lookup_offset in lookup_offsets {
        let lookup = lookup_list.get(lookup_offset.0 as usize..)?;
        let mut s = Stream::new(lookup);
        let lookup_type: u16 = s.read()?;
        s.skip::<u16>(); // lookupFlag
        let subtable_count: u16 = s.read()?;
        let subtable_offsets = s.read_array16::<Offset16>(subtable_count)?;

        // Pair Adjustment Positioning.
        if lookup_type != 2 {
            continue;
        }

        for subtable_offset in subtable_offsets {
            let subtable = lookup.get(subtable_offset.0 as usize..)?;
            if let Some(value) = parse_pair_adjustment(subtable, left, right) {
                return Some(value);
            }
        }
    }

    None
}

fn parse_pair_adjustment(data: &[u8], left: GlyphId, right: GlyphId) -> Option<i16> {
    let mut s = Stream::new(data);
    let format: u16 = s.read()?;
    let coverage_offset: Offset16 = s.read()?;
    let coverage_index = coverage_index(data.get(coverage_offset.0 as usize..)?, left)?;

    let value_format1: u16 = s.read()?;
    let value_format2: u16 = s.read()?;
    if (value_format1, value_format2) != X_ADVANCE_VALUE_FORMATS {
        warn!("unsupported GPOS pair value formats: ({:#06x}, {:#06x})", value_format1, value_format2);
        return None;
    }

    match format {
        1 => {
            // Explicit pair sets, one per covered first glyph.
            let pair_set_count: u16 = s.read()?;
            if coverage_index >= pair_set_count {
                return None;
            }

            let pair_set_offsets = s.read_array16::<Offset16>(pair_set_count)?;
            let pair_set = data.get(pair_set_offsets.get(coverage_index)?.0 as usize..)?;

            let mut s = Stream::new(pair_set);
            let pair_value_count: u16 = s.read()?;
            let pairs = s.read_array16::<PairValueRecord>(pair_value_count)?;
            pairs
                .binary_search_by(|record| record.second_glyph.cmp(&right.0))
                .map(|(_, record)| record.x_advance)
        }
        2 => {
            // Class-based pairs.
            let class_def1_offset: Offset16 = s.read()?;
            let class_def2_offset: Offset16 = s.read()?;
            let class1_count: u16 = s.read()?;
            let class2_count: u16 = s.read()?;

            let class1 = glyph_class(data.get(class_def1_offset.0 as usize..)?, left)?;
            let class2 = glyph_class(data.get(class_def2_offset.0 as usize..)?, right)?;
            if class1 >= class1_count || class2 >= class2_count {
                return None;
            }

            let records = s.read_array16::<i16>(class1_count.checked_mul(class2_count)?)?;
            let value = records.get(class1 * class2_count + class2)?;
            if value != 0 {
                Some(value)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[derive(Clone, Copy)]
struct PairValueRecord {
    second_glyph: u16,
    x_advance: i16,
}

impl FromData for PairValueRecord {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(PairValueRecord {
            second_glyph: s.read()?,
            x_advance: s.read()?,
        })
    }
}

/// Returns the coverage index of a glyph, when covered.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table
fn coverage_index(data: &[u8], glyph_id: GlyphId) -> Option<u16> {
    let mut s = Stream::new(data);
    let format: u16 = s.read()?;
    match format {
        1 => {
            let count: u16 = s.read()?;
            let glyphs = s.read_array16::<u16>(count)?;
            glyphs
                .binary_search(&glyph_id.0)
                .map(|(index, _)| index)
        }
        2 => {
            let count: u16 = s.read()?;
            let ranges = s.read_array16::<RangeRecord>(count)?;
            ranges
                .binary_search_by(|range| {
                    use core::cmp::Ordering;
                    if glyph_id.0 < range.start {
                        Ordering::Greater
                    } else if glyph_id.0 > range.end {
                        Ordering::Less
                    } else {
                        Ordering::Equal
                    }
                })
                .map(|(_, range)| range.value + (glyph_id.0 - range.start))
        }
        _ => None,
    }
}

/// Returns the glyph's class.
///
/// Glyphs outside any range belong to class 0.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table
fn glyph_class(data: &[u8], glyph_id: GlyphId) -> Option<u16> {
    let mut s = Stream::new(data);
    let format: u16 = s.read()?;
    match format {
        1 => {
            let start_glyph: u16 = s.read()?;
            let count: u16 = s.read()?;
            let classes = s.read_array16::<u16>(count)?;
            match glyph_id.0.checked_sub(start_glyph) {
                Some(index) => Some(classes.get(index).unwrap_or(0)),
                None => Some(0),
            }
        }
        2 => {
            let count: u16 = s.read()?;
            let ranges = s.read_array16::<RangeRecord>(count)?;
            let class = ranges
                .binary_search_by(|range| {
                    use core::cmp::Ordering;
                    if glyph_id.0 < range.start {
                        Ordering::Greater
                    } else if glyph_id.0 > range.end {
                        Ordering::Less
                    } else {
                        Ordering::Equal
                    }
                })
                .map(|(_, range)| range.value);
            Some(class.unwrap_or(0))
        }
        _ => None,
    }
}

/// A range of glyphs mapping to consecutive coverage indices
/// or to a single class value.
#[derive(Clone, Copy)]
struct RangeRecord {
    start: u16,
    end: u16,
    value: u16,
}

impl FromData for RangeRecord {
    const SIZE: usize = 6;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(RangeRecord {
            start: s.read()?,
            end: s.read()?,
            value: s.read()?,
        })
    }
}
