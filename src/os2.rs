// https://docs.microsoft.com/en-us/typography/opentype/spec/os2

use crate::parser::Stream;
use crate::VerticalMetrics;

/// The [OS/2 and Windows Metrics Table](https://docs.microsoft.com/en-us/typography/opentype/spec/os2).
///
/// Only the typographic metrics are of interest here.
#[derive(Clone, Copy)]
pub struct Table<'a> {
    data: &'a [u8],
}

impl<'a> Table<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        // sTypoLineGap is the last field we read.
        if data.len() < 74 {
            return None;
        }

        Some(Table { data })
    }

    /// sTypoAscender / sTypoDescender / sTypoLineGap.
    pub fn typographic_metrics(&self) -> VerticalMetrics {
        VerticalMetrics {
            ascent: Stream::read_at(self.data, 68).unwrap_or(0),
            descent: Stream::read_at(self.data, 70).unwrap_or(0),
            line_gap: Stream::read_at(self.data, 72).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typographic_metrics() {
        let mut data = vec![0u8; 78];
        data[68] = 0x02; // sTypoAscender: 750
        data[69] = 0xEE;
        data[70] = 0xFF; // sTypoDescender: -250
        data[71] = 0x06;
        data[73] = 0x64; // sTypoLineGap: 100

        let table = Table::parse(&data).unwrap();
        let metrics = table.typographic_metrics();
        assert_eq!(metrics.ascent, 750);
        assert_eq!(metrics.descent, -250);
        assert_eq!(metrics.line_gap, 100);
    }

    #[test]
    fn too_short() {
        assert!(Table::parse(&[0; 68]).is_none());
    }
}
