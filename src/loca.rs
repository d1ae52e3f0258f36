// https://docs.microsoft.com/en-us/typography/opentype/spec/loca

use core::num::NonZeroU16;
use core::ops::Range;

use crate::parser::{LazyArray16, Stream};
use crate::GlyphId;

/// An index to location format from `head`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum IndexToLocationFormat {
    Short,
    Long,
}

/// The [Index to Location Table](https://docs.microsoft.com/en-us/typography/opentype/spec/loca).
#[derive(Clone, Copy)]
pub enum Table<'a> {
    /// Short offsets, stored divided by two.
    Short(LazyArray16<'a, u16>),
    /// Long offsets.
    Long(LazyArray16<'a, u32>),
}

impl<'a> Table<'a> {
    pub fn parse(
        data: &'a [u8],
        number_of_glyphs: NonZeroU16,
        format: IndexToLocationFormat,
    ) -> Option<Self> {
        // The number of offsets is `maxp.numGlyphs + 1`.
        //
        // Check for overflow first.
        let total = if number_of_glyphs.get() == core::u16::MAX {
            number_of_glyphs.get()
        } else {
            number_of_glyphs.get() + 1
        };

        let mut s = Stream::new(data);
        match format {
            IndexToLocationFormat::Short => Some(Table::Short(s.read_array16(total)?)),
            IndexToLocationFormat::Long => Some(Table::Long(s.read_array16(total)?)),
        }
    }

    #[inline]
    fn len(&self) -> u16 {
        match self {
            Table::Short(array) => array.len(),
            Table::Long(array) => array.len(),
        }
    }

    /// Returns the glyph's range inside the `glyf` table.
    ///
    /// An empty or reversed range means an empty glyph.
    pub fn glyph_range(&self, glyph_id: GlyphId) -> Option<Range<usize>> {
        let glyph_id = glyph_id.0;
        if glyph_id == core::u16::MAX {
            return None;
        }

        // Glyph ID must be smaller than the total number of offsets.
        if glyph_id + 1 >= self.len() {
            return None;
        }

        let range = match self {
            Table::Short(array) => {
                // 'The actual local offset divided by 2 is stored.'
                array.get(glyph_id)? as usize * 2..array.get(glyph_id + 1)? as usize * 2
            }
            Table::Long(array) => {
                array.get(glyph_id)? as usize..array.get(glyph_id + 1)? as usize
            }
        };

        if range.start >= range.end {
            // 'The offsets must be in ascending order.'
            // Equal adjacent offsets mean an empty glyph.
            None
        } else {
            Some(range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: u16) -> NonZeroU16 {
        NonZeroU16::new(n).unwrap()
    }

    #[test]
    fn short_offsets() {
        let data = &[
            0x00, 0x00, // offset [0]: 0
            0x00, 0x05, // offset [1]: 10
            0x00, 0x05, // offset [2]: 10
            0x00, 0x08, // offset [3]: 16
        ];

        let table = Table::parse(data, nz(3), IndexToLocationFormat::Short).unwrap();
        assert_eq!(table.glyph_range(GlyphId(0)), Some(0..10));
        // Empty glyph.
        assert_eq!(table.glyph_range(GlyphId(1)), None);
        assert_eq!(table.glyph_range(GlyphId(2)), Some(10..16));
        assert_eq!(table.glyph_range(GlyphId(3)), None);
    }

    #[test]
    fn long_offsets() {
        let data = &[
            0x00, 0x00, 0x00, 0x00, // offset [0]: 0
            0x00, 0x00, 0x00, 0x0A, // offset [1]: 10
        ];

        let table = Table::parse(data, nz(1), IndexToLocationFormat::Long).unwrap();
        assert_eq!(table.glyph_range(GlyphId(0)), Some(0..10));
        assert_eq!(table.glyph_range(GlyphId(1)), None);
    }

    #[test]
    fn unordered_offsets() {
        let data = &[
            0x00, 0x0A, // offset [0]: 20
            0x00, 0x00, // offset [1]: 0
        ];

        let table = Table::parse(data, nz(1), IndexToLocationFormat::Short).unwrap();
        assert_eq!(table.glyph_range(GlyphId(0)), None);
    }
}
