// https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx

use core::num::NonZeroU16;

use crate::parser::{FromData, LazyArray16, Stream};
use crate::GlyphId;

/// Glyph's horizontal metrics.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct HorizontalMetrics {
    /// The advance width in font units.
    pub advance: u16,

    /// The left side bearing in font units.
    pub left_side_bearing: i16,
}

impl FromData for HorizontalMetrics {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(HorizontalMetrics {
            advance: s.read()?,
            left_side_bearing: s.read()?,
        })
    }
}

/// The [Horizontal Metrics Table](https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx).
#[derive(Clone, Copy)]
pub struct Table<'a> {
    metrics: LazyArray16<'a, HorizontalMetrics>,
    // 'The table directory may be followed by an array for the left side bearing
    // values of the remaining glyphs.'
    bearings: LazyArray16<'a, i16>,
}

impl<'a> Table<'a> {
    pub fn parse(
        data: &'a [u8],
        number_of_h_metrics: u16,
        number_of_glyphs: NonZeroU16,
    ) -> Option<Self> {
        if number_of_h_metrics == 0 {
            return None;
        }

        let mut s = Stream::new(data);
        let metrics = s.read_array16(number_of_h_metrics)?;

        let bearings_count = number_of_glyphs.get().checked_sub(number_of_h_metrics);
        let bearings = match bearings_count {
            Some(count) if count != 0 => s.read_array16(count)?,
            _ => LazyArray16::default(),
        };

        Some(Table { metrics, bearings })
    }

    /// Returns metrics for the glyph.
    ///
    /// Glyphs past `numberOfHMetrics` share the advance of the last
    /// long record and carry only a bearing.
    pub fn get(&self, glyph_id: GlyphId) -> Option<HorizontalMetrics> {
        if let Some(metrics) = self.metrics.get(glyph_id.0) {
            return Some(metrics);
        }

        let index = glyph_id.0.checked_sub(self.metrics.len())?;
        let left_side_bearing = self.bearings.get(index)?;
        let advance = self.metrics.last()?.advance;
        Some(HorizontalMetrics {
            advance,
            left_side_bearing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: u16) -> NonZeroU16 {
        NonZeroU16::new(n).unwrap()
    }

    #[test]
    fn simple() {
        let data = &[
            0x01, 0xF4, // advance: 500
            0x00, 0x0A, // lsb: 10
            0x02, 0x58, // advance: 600
            0xFF, 0xF6, // lsb: -10
        ];

        let table = Table::parse(data, 2, nz(2)).unwrap();
        assert_eq!(
            table.get(GlyphId(0)),
            Some(HorizontalMetrics { advance: 500, left_side_bearing: 10 })
        );
        assert_eq!(
            table.get(GlyphId(1)),
            Some(HorizontalMetrics { advance: 600, left_side_bearing: -10 })
        );
        assert_eq!(table.get(GlyphId(2)), None);
    }

    #[test]
    fn trailing_bearings() {
        let data = &[
            0x01, 0xF4, // advance: 500
            0x00, 0x0A, // lsb: 10
            0x00, 0x14, // lsb [1]: 20
            0x00, 0x1E, // lsb [2]: 30
        ];

        let table = Table::parse(data, 1, nz(3)).unwrap();
        assert_eq!(
            table.get(GlyphId(2)),
            Some(HorizontalMetrics { advance: 500, left_side_bearing: 30 })
        );
    }

    #[test]
    fn no_metrics() {
        assert!(Table::parse(&[], 0, nz(1)).is_none());
    }
}
