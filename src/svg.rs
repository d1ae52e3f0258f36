// https://docs.microsoft.com/en-us/typography/opentype/spec/svg

use crate::parser::{FromData, LazyArray16, Stream};
use crate::GlyphId;

#[derive(Clone, Copy, Debug)]
struct DocumentRecord {
    start_glyph_id: u16,
    end_glyph_id: u16,
    offset: u32,
    length: u32,
}

impl FromData for DocumentRecord {
    const SIZE: usize = 12;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(DocumentRecord {
            start_glyph_id: s.read()?,
            end_glyph_id: s.read()?,
            offset: s.read()?,
            length: s.read()?,
        })
    }
}

/// The SVG document list, resolved at font init.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DocumentList<'a> {
    // From the start of the document list, where record offsets
    // are relative to.
    data: &'a [u8],
    records: LazyArray16<'a, DocumentRecord>,
}

impl<'a> DocumentList<'a> {
    pub fn parse(table: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(table);
        s.skip::<u16>(); // version
        let doc_list_offset: u32 = s.read()?;

        let data = table.get(doc_list_offset as usize..)?;
        let mut s = Stream::new(data);
        let count: u16 = s.read()?;
        let records = s.read_array16(count)?;

        Some(DocumentList { data, records })
    }

    /// Returns the document covering the glyph.
    pub fn find(&self, glyph_id: GlyphId) -> Option<&'a [u8]> {
        for record in self.records {
            if (record.start_glyph_id..=record.end_glyph_id).contains(&glyph_id.0) {
                let start = record.offset as usize;
                let end = start.checked_add(record.length as usize)?;
                return self.data.get(start..end);
            }
        }

        None
    }
}
