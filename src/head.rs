// https://docs.microsoft.com/en-us/typography/opentype/spec/head

use crate::parser::Stream;
use crate::Rect;

/// The [Font Header Table](https://docs.microsoft.com/en-us/typography/opentype/spec/head).
#[derive(Clone, Copy)]
pub struct Table<'a> {
    data: &'a [u8],
}

impl<'a> Table<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        // indexToLocFormat is the last field we care about.
        if data.len() < 52 {
            return None;
        }

        Some(Table { data })
    }

    #[inline]
    pub fn units_per_em(&self) -> u16 {
        Stream::read_at(self.data, 18).unwrap_or(0)
    }

    /// The global font bounding box in font units.
    #[inline]
    pub fn global_bounding_box(&self) -> Rect {
        Rect {
            x_min: Stream::read_at(self.data, 36).unwrap_or(0),
            y_min: Stream::read_at(self.data, 38).unwrap_or(0),
            x_max: Stream::read_at(self.data, 40).unwrap_or(0),
            y_max: Stream::read_at(self.data, 42).unwrap_or(0),
        }
    }

    /// The `macStyle` bit field. Bit 0 is bold, bit 1 is italic, bit 2 is underline.
    #[inline]
    pub fn mac_style(&self) -> u16 {
        Stream::read_at(self.data, 44).unwrap_or(0)
    }

    /// 0 for short (`u16 * 2`) `loca` offsets, 1 for long (`u32`) ones.
    #[inline]
    pub fn index_to_loc_format(&self) -> u16 {
        Stream::read_at(self.data, 50).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short() {
        assert!(Table::parse(&[0; 50]).is_none());
        assert!(Table::parse(&[0; 52]).is_some());
    }

    #[test]
    fn fields() {
        let mut data = vec![0u8; 54];
        data[18] = 0x03; // unitsPerEm: 1000
        data[19] = 0xE8;
        data[37] = 0x0A; // xMin: 10
        data[43] = 0x14; // yMax: 20
        data[45] = 0x03; // macStyle: bold | italic
        data[51] = 0x01; // indexToLocFormat: long

        let table = Table::parse(&data).unwrap();
        assert_eq!(table.units_per_em(), 1000);
        assert_eq!(table.global_bounding_box().x_min, 10);
        assert_eq!(table.global_bounding_box().y_max, 20);
        assert_eq!(table.mac_style(), 3);
        assert_eq!(table.index_to_loc_format(), 1);
    }
}
