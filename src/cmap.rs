// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap

use crate::parser::{FromData, Stream};
use crate::GlyphId;

#[derive(Clone, Copy)]
struct EncodingRecord {
    platform_id: u16,
    encoding_id: u16,
    offset: u32,
}

impl FromData for EncodingRecord {
    const SIZE: usize = 8;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(EncodingRecord {
            platform_id: s.read()?,
            encoding_id: s.read()?,
            offset: s.read()?,
        })
    }
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/name#windows-encoding-ids
const WINDOWS_UNICODE_BMP_ENCODING_ID: u16 = 1;
const WINDOWS_UNICODE_FULL_ENCODING_ID: u16 = 10;

const PLATFORM_ID_UNICODE: u16 = 0;
const PLATFORM_ID_WINDOWS: u16 = 3;

/// Selects a Unicode subtable from the whole `cmap` table.
///
/// Records are ranked: Windows/Unicode-BMP first, then Windows/Unicode-full,
/// then any Unicode-platform record. Records with an unsupported subtable
/// format are skipped, so a font with only a Mixed Coverage subtable
/// is rejected at init.
pub fn find_subtable<'a>(data: &'a [u8]) -> Option<&'a [u8]> {
    let mut s = Stream::new(data);
    s.skip::<u16>(); // version
    let count: u16 = s.read()?;
    let records = s.read_array16::<EncodingRecord>(count)?;

    let mut best: Option<(u8, &'a [u8])> = None;
    for record in records {
        let rank = match (record.platform_id, record.encoding_id) {
            (PLATFORM_ID_WINDOWS, WINDOWS_UNICODE_BMP_ENCODING_ID) => 2,
            (PLATFORM_ID_WINDOWS, WINDOWS_UNICODE_FULL_ENCODING_ID) => 1,
            (PLATFORM_ID_UNICODE, _) => 0,
            _ => continue,
        };

        let subtable = match data.get(record.offset as usize..) {
            Some(subtable) => subtable,
            None => continue,
        };

        match Stream::read_at::<u16>(subtable, 0) {
            Some(0) | Some(4) | Some(6) | Some(12) | Some(13) => {}
            _ => continue,
        }

        if best.map_or(true, |(best_rank, _)| rank > best_rank) {
            best = Some((rank, subtable));
        }
    }

    best.map(|(_, subtable)| subtable)
}

/// Maps a code point via the selected subtable.
///
/// An absent mapping is `None`; the caller substitutes glyph 0.
pub fn glyph_index(subtable: &[u8], code_point: u32) -> Option<GlyphId> {
    let format: u16 = Stream::read_at(subtable, 0)?;
    match format {
        0 => parse_byte_encoding_table(subtable, code_point),
        4 => parse_segment_mapping_to_delta_values(subtable, code_point),
        6 => parse_trimmed_table_mapping(subtable, code_point),
        12 => parse_segmented_coverage(subtable, code_point),
        13 => parse_many_to_one_range_mappings(subtable, code_point),
        _ => None,
    }
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-0-byte-encoding-table
fn parse_byte_encoding_table(data: &[u8], code_point: u32) -> Option<GlyphId> {
    let length: u16 = Stream::read_at(data, 2)?;

    // The glyph array starts after the three u16 header fields,
    // so only `length - 6` code points are actually mapped.
    if code_point < (length as u32).saturating_sub(6) {
        let glyph: u8 = Stream::read_at(data, 6 + code_point as usize)?;
        Some(GlyphId(glyph as u16))
    } else {
        None
    }
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-4-segment-mapping-to-delta-values
fn parse_segment_mapping_to_delta_values(data: &[u8], code_point: u32) -> Option<GlyphId> {
    // This subtable supports code points only in a u16 range.
    if code_point > 0xFFFF {
        return None;
    }

    let code_point = code_point as u16;

    let mut s = Stream::new(data);
    s.advance(6); // format + length + language
    let seg_count_x2: u16 = s.read()?;
    if seg_count_x2 < 2 {
        return None;
    }

    let seg_count = seg_count_x2 / 2;
    s.advance(6); // searchRange + entrySelector + rangeShift
    let end_codes = s.read_array16::<u16>(seg_count)?;
    s.skip::<u16>(); // reservedPad
    let start_codes = s.read_array16::<u16>(seg_count)?;
    let id_deltas = s.read_array16::<i16>(seg_count)?;
    let id_range_offset_pos = s.offset();
    let id_range_offsets = s.read_array16::<u16>(seg_count)?;

    // A custom binary search: find the first segment with `endCode >= code_point`,
    // then reject it when its `startCode` is above the code point.
    let mut start = 0;
    let mut end = seg_count;
    while end > start {
        let index = (start + end) / 2;
        let end_value = end_codes.get(index)?;
        if end_value >= code_point {
            let start_value = start_codes.get(index)?;
            if start_value > code_point {
                end = index;
            } else {
                let id_range_offset = id_range_offsets.get(index)?;
                let id_delta = id_deltas.get(index)?;
                if id_range_offset == 0 {
                    let glyph = code_point.wrapping_add(id_delta as u16);
                    return non_zero_glyph(glyph);
                }

                let delta = (code_point as u32 - start_value as u32) * 2;
                if delta > core::u16::MAX as u32 {
                    return None;
                }

                // 'The value of the idRangeOffset is the number of bytes
                // past the actual location of the idRangeOffset.'
                let pos = (id_range_offset_pos + index as usize * 2) as u16;
                let pos = pos.wrapping_add(delta as u16).wrapping_add(id_range_offset);
                let glyph: u16 = Stream::read_at(data, pos as usize)?;
                if glyph == 0 {
                    return None;
                }

                let glyph = glyph.wrapping_add(id_delta as u16);
                return non_zero_glyph(glyph);
            }
        } else {
            start = index + 1;
        }
    }

    None
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-6-trimmed-table-mapping
fn parse_trimmed_table_mapping(data: &[u8], code_point: u32) -> Option<GlyphId> {
    if code_point > 0xFFFF {
        return None;
    }

    let mut s = Stream::new(data);
    s.advance(6); // format + length + language
    let first_code_point: u16 = s.read()?;
    let count: u16 = s.read()?;
    let glyphs = s.read_array16::<u16>(count)?;

    let index = (code_point as u16).checked_sub(first_code_point)?;
    glyphs.get(index).and_then(non_zero_glyph)
}

#[derive(Clone, Copy)]
struct SequentialMapGroup {
    start_char_code: u32,
    end_char_code: u32,
    start_glyph_id: u32,
}

impl FromData for SequentialMapGroup {
    const SIZE: usize = 12;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(SequentialMapGroup {
            start_char_code: s.read()?,
            end_char_code: s.read()?,
            start_glyph_id: s.read()?,
        })
    }
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-12-segmented-coverage
fn parse_segmented_coverage(data: &[u8], code_point: u32) -> Option<GlyphId> {
    let group = find_map_group(data, code_point)?;
    let id = group
        .start_glyph_id
        .checked_add(code_point - group.start_char_code)?;
    non_zero_glyph(id as u16)
}

// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-13-many-to-one-range-mappings
fn parse_many_to_one_range_mappings(data: &[u8], code_point: u32) -> Option<GlyphId> {
    // Every code point in a group maps to the same glyph.
    let group = find_map_group(data, code_point)?;
    non_zero_glyph(group.start_glyph_id as u16)
}

fn find_map_group(data: &[u8], code_point: u32) -> Option<SequentialMapGroup> {
    let mut s = Stream::new(data);
    s.advance(12); // format + reserved + length + language
    let count: u32 = s.read()?;
    let groups = s.read_array32::<SequentialMapGroup>(count)?;
    groups
        .binary_search_by(|group| {
            use core::cmp::Ordering;
            if code_point < group.start_char_code {
                Ordering::Greater
            } else if code_point > group.end_char_code {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        })
        .map(|(_, group)| group)
}

#[inline]
fn non_zero_glyph(id: u16) -> Option<GlyphId> {
    if id != 0 {
        Some(GlyphId(id))
    } else {
        None
    }
}
