// https://docs.microsoft.com/en-us/typography/opentype/spec/kern

use crate::parser::{FromData, LazyArray16, Stream};
use crate::GlyphId;

/// A kerning pair from the `kern` table.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct KerningPair {
    /// The left glyph.
    pub left: GlyphId,

    /// The right glyph.
    pub right: GlyphId,

    /// The advance adjustment in font units. Negative pulls glyphs together.
    pub value: i16,
}

struct KerningRecord {
    // The two glyph ids merged, which is the table's sort key.
    pair: u32,
    value: i16,
}

impl FromData for KerningRecord {
    const SIZE: usize = 6;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(KerningRecord {
            pair: s.read()?,
            value: s.read()?,
        })
    }
}

/// Positions the stream at the first subtable's pair list.
///
/// Only the first subtable is used, and only when it is horizontal
/// and format 0.
fn first_horizontal_subtable<'a>(data: &'a [u8]) -> Option<LazyArray16<'a, KerningRecord>> {
    let mut s = Stream::new(data);
    let version: u16 = s.read()?;
    if version != 0 {
        return None;
    }

    let number_of_subtables: u16 = s.read()?;
    if number_of_subtables == 0 {
        return None;
    }

    s.skip::<u16>(); // subtable version
    s.skip::<u16>(); // length
    let coverage: u16 = s.read()?;

    // Bit 0 is the horizontal flag, the high byte is the format.
    let format = (coverage >> 8) as u8;
    let is_horizontal = coverage & 0x0001 != 0;
    if !is_horizontal || format != 0 {
        return None;
    }

    let number_of_pairs: u16 = s.read()?;
    s.advance(6); // searchRange + entrySelector + rangeShift
    s.read_array16(number_of_pairs)
}

/// Returns the kerning for a glyph pair.
pub(crate) fn glyphs_kerning(data: &[u8], left: GlyphId, right: GlyphId) -> Option<i16> {
    let pairs = first_horizontal_subtable(data)?;
    let needle = (left.0 as u32) << 16 | right.0 as u32;
    pairs
        .binary_search_by(|record| record.pair.cmp(&needle))
        .map(|(_, record)| record.value)
}

/// Dumps all pairs of the first horizontal format 0 subtable.
pub(crate) fn pairs(data: &[u8]) -> Vec<KerningPair> {
    let records = match first_horizontal_subtable(data) {
        Some(records) => records,
        None => return Vec::new(),
    };

    records
        .into_iter()
        .map(|record| KerningPair {
            left: GlyphId((record.pair >> 16) as u16),
            right: GlyphId(record.pair as u16),
            value: record.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // A kern table with two pairs: (1, 2) -> -80 and (1, 3) -> 20.
    const DATA: &[u8] = &[
        0x00, 0x00, // version: 0
        0x00, 0x01, // numTables: 1
        0x00, 0x00, // subtable version: 0
        0x00, 0x20, // length: 32
        0x00, 0x01, // coverage: horizontal, format 0
        0x00, 0x02, // numPairs: 2
        0x00, 0x0C, // searchRange
        0x00, 0x01, // entrySelector
        0x00, 0x00, // rangeShift
        // Pair (1, 2) -> -80
        0x00, 0x01, 0x00, 0x02, 0xFF, 0xB0,
        // Pair (1, 3) -> 20
        0x00, 0x01, 0x00, 0x03, 0x00, 0x14,
    ];

    #[test]
    fn binary_search() {
        assert_eq!(glyphs_kerning(DATA, GlyphId(1), GlyphId(2)), Some(-80));
        assert_eq!(glyphs_kerning(DATA, GlyphId(1), GlyphId(3)), Some(20));
        assert_eq!(glyphs_kerning(DATA, GlyphId(2), GlyphId(1)), None);
        assert_eq!(glyphs_kerning(DATA, GlyphId(0), GlyphId(0)), None);
    }

    #[test]
    fn dump_pairs() {
        let pairs = pairs(DATA);
        assert_eq!(
            pairs,
            &[
                KerningPair {
                    left: GlyphId(1),
                    right: GlyphId(2),
                    value: -80
                },
                KerningPair {
                    left: GlyphId(1),
                    right: GlyphId(3),
                    value: 20
                },
            ]
        );
    }

    #[test]
    fn vertical_subtable_is_ignored() {
        let mut data = DATA.to_vec();
        data[9] = 0x00; // coverage: no horizontal bit
        assert_eq!(glyphs_kerning(&data, GlyphId(1), GlyphId(2)), None);
        assert!(pairs(&data).is_empty());
    }

    #[test]
    fn format2_subtable_is_ignored() {
        let mut data = DATA.to_vec();
        data[8] = 0x02; // coverage: format 2
        assert_eq!(glyphs_kerning(&data, GlyphId(1), GlyphId(2)), None);
    }

    #[test]
    fn truncated() {
        assert_eq!(glyphs_kerning(&DATA[..10], GlyphId(1), GlyphId(2)), None);
    }
}
