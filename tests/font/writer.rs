//! Helpers to assemble synthetic fonts in memory.

#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum TtfType {
    Raw(&'static [u8]),
    TrueTypeMagic,
    OpenTypeMagic,
    FontCollectionMagic,
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    UInt32(u32),
    Tag(&'static str),
}

pub fn convert(values: &[TtfType]) -> Vec<u8> {
    let mut data = Vec::with_capacity(256);
    for v in values {
        convert_type(*v, &mut data);
    }

    data
}

fn convert_type(value: TtfType, data: &mut Vec<u8>) {
    match value {
        TtfType::Raw(bytes) => data.extend_from_slice(bytes),
        TtfType::TrueTypeMagic => data.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]),
        TtfType::OpenTypeMagic => data.extend_from_slice(&[0x4F, 0x54, 0x54, 0x4F]),
        TtfType::FontCollectionMagic => data.extend_from_slice(b"ttcf"),
        TtfType::Int8(n) => data.extend_from_slice(&n.to_be_bytes()),
        TtfType::UInt8(n) => data.extend_from_slice(&n.to_be_bytes()),
        TtfType::Int16(n) => data.extend_from_slice(&n.to_be_bytes()),
        TtfType::UInt16(n) => data.extend_from_slice(&n.to_be_bytes()),
        TtfType::UInt32(n) => data.extend_from_slice(&n.to_be_bytes()),
        TtfType::Tag(tag) => data.extend_from_slice(tag.as_bytes()),
    }
}

/// Assembles an SFNT wrapper around the given tables.
///
/// `base_offset` is where this font will sit inside a larger buffer;
/// directory offsets are absolute, which is what lets collections work.
pub fn build_font_at(magic: TtfType, tables: &[(&[u8; 4], Vec<u8>)], base_offset: u32) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let mut data = convert(&[
        magic,
        TtfType::UInt16(num_tables),
        TtfType::UInt16(0), // searchRange
        TtfType::UInt16(0), // entrySelector
        TtfType::UInt16(0), // rangeShift
    ]);

    let mut offset = base_offset + 12 + 16 * num_tables as u32;
    for (tag, table) in tables {
        data.extend_from_slice(*tag);
        data.extend_from_slice(&0u32.to_be_bytes()); // checksum
        data.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(&(table.len() as u32).to_be_bytes());
        offset += table.len() as u32;
    }

    for (_, table) in tables {
        data.extend_from_slice(table);
    }

    data
}

pub fn build_font(tables: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    build_font_at(TtfType::TrueTypeMagic, tables, 0)
}

/// Wraps fonts into a TrueType collection.
pub fn build_collection(fonts: &[&[(&[u8; 4], Vec<u8>)]]) -> Vec<u8> {
    let num_fonts = fonts.len() as u32;
    let mut data = convert(&[
        TtfType::FontCollectionMagic,
        TtfType::UInt16(1), // majorVersion
        TtfType::UInt16(0), // minorVersion
        TtfType::UInt32(num_fonts),
    ]);

    let offsets_start = data.len();
    data.extend(core::iter::repeat(0).take(num_fonts as usize * 4));

    for (i, tables) in fonts.iter().enumerate() {
        let offset = data.len() as u32;
        data[offsets_start + i * 4..offsets_start + i * 4 + 4]
            .copy_from_slice(&offset.to_be_bytes());
        let font = build_font_at(TtfType::TrueTypeMagic, tables, offset);
        data.extend_from_slice(&font);
    }

    data
}

pub fn head_table(units_per_em: u16, index_to_loc_format: u16, mac_style: u16) -> Vec<u8> {
    let mut data = vec![0u8; 54];
    data[18..20].copy_from_slice(&units_per_em.to_be_bytes());
    // Font bounding box: (0, -200) .. (1000, 800).
    data[36..38].copy_from_slice(&0i16.to_be_bytes());
    data[38..40].copy_from_slice(&(-200i16).to_be_bytes());
    data[40..42].copy_from_slice(&1000i16.to_be_bytes());
    data[42..44].copy_from_slice(&800i16.to_be_bytes());
    data[44..46].copy_from_slice(&mac_style.to_be_bytes());
    data[50..52].copy_from_slice(&index_to_loc_format.to_be_bytes());
    data
}

pub fn hhea_table(ascender: i16, descender: i16, line_gap: i16, num_h_metrics: u16) -> Vec<u8> {
    let mut data = vec![0u8; 36];
    data[4..6].copy_from_slice(&ascender.to_be_bytes());
    data[6..8].copy_from_slice(&descender.to_be_bytes());
    data[8..10].copy_from_slice(&line_gap.to_be_bytes());
    data[34..36].copy_from_slice(&num_h_metrics.to_be_bytes());
    data
}

pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    convert(&[
        TtfType::UInt32(0x00010000),
        TtfType::UInt16(num_glyphs),
    ])
}

/// Long metrics for every glyph.
pub fn hmtx_table(metrics: &[(u16, i16)]) -> Vec<u8> {
    let mut data = Vec::new();
    for &(advance, lsb) in metrics {
        data.extend_from_slice(&advance.to_be_bytes());
        data.extend_from_slice(&lsb.to_be_bytes());
    }

    data
}

/// A cmap with a single Windows/Unicode-BMP format 4 subtable.
pub fn cmap_table(mappings: &[(u16, u16)]) -> Vec<u8> {
    // One segment per mapping plus the sentinel.
    let seg_count = mappings.len() as u16 + 1;

    let mut sub = convert(&[
        TtfType::UInt16(4), // format
        TtfType::UInt16(16 + seg_count * 8), // length
        TtfType::UInt16(0), // language
        TtfType::UInt16(seg_count * 2),
        TtfType::UInt16(0), // searchRange
        TtfType::UInt16(0), // entrySelector
        TtfType::UInt16(0), // rangeShift
    ]);
    for &(code, _) in mappings {
        sub.extend_from_slice(&code.to_be_bytes()); // endCode
    }
    sub.extend_from_slice(&0xFFFFu16.to_be_bytes());
    sub.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
    for &(code, _) in mappings {
        sub.extend_from_slice(&code.to_be_bytes()); // startCode
    }
    sub.extend_from_slice(&0xFFFFu16.to_be_bytes());
    for &(code, glyph) in mappings {
        sub.extend_from_slice(&glyph.wrapping_sub(code).to_be_bytes()); // idDelta
    }
    sub.extend_from_slice(&1u16.to_be_bytes()); // sentinel delta wraps to 0
    for _ in 0..seg_count {
        sub.extend_from_slice(&0u16.to_be_bytes()); // idRangeOffset
    }

    let mut data = convert(&[
        TtfType::UInt16(0), // version
        TtfType::UInt16(1), // numTables
        TtfType::UInt16(3), // platformId: Windows
        TtfType::UInt16(1), // encodingId: Unicode BMP
        TtfType::UInt32(12), // offset
    ]);
    data.extend_from_slice(&sub);
    data
}

/// A simple one-contour glyph: an axis-aligned rectangle.
pub fn rect_glyph(x0: i16, y0: i16, x1: i16, y1: i16) -> Vec<u8> {
    let mut data = convert(&[
        TtfType::Int16(1), // numberOfContours
        TtfType::Int16(x0),
        TtfType::Int16(y0),
        TtfType::Int16(x1),
        TtfType::Int16(y1),
        TtfType::UInt16(3), // endPtsOfContours
        TtfType::UInt16(0), // instructionLength
    ]);

    // Four on-curve points with 16-bit deltas.
    for _ in 0..4 {
        data.push(0x01); // on-curve, long x, long y
    }
    for dx in [x0, x1 - x0, 0, x0 - x1] {
        data.extend_from_slice(&dx.to_be_bytes());
    }
    for dy in [y0, 0, y1 - y0, 0] {
        data.extend_from_slice(&dy.to_be_bytes());
    }

    data
}

/// Builds `glyf` and a short-format `loca` from per-glyph data.
///
/// An empty entry produces an empty glyph.
pub fn glyf_and_loca(glyphs: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let mut glyf = Vec::new();
    let mut loca = Vec::new();
    for glyph in glyphs {
        loca.extend_from_slice(&((glyf.len() / 2) as u16).to_be_bytes());
        glyf.extend_from_slice(glyph);
        // Short offsets store the halved value, so keep entries even.
        if glyf.len() & 1 == 1 {
            glyf.push(0);
        }
    }
    loca.extend_from_slice(&((glyf.len() / 2) as u16).to_be_bytes());

    (glyf, loca)
}

pub fn kern_table(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
    let mut data = convert(&[
        TtfType::UInt16(0), // version
        TtfType::UInt16(1), // numTables
        TtfType::UInt16(0), // subtable version
        TtfType::UInt16(14 + pairs.len() as u16 * 6), // length
        TtfType::UInt16(0x0001), // coverage: horizontal, format 0
        TtfType::UInt16(pairs.len() as u16),
        TtfType::UInt16(0), // searchRange
        TtfType::UInt16(0), // entrySelector
        TtfType::UInt16(0), // rangeShift
    ]);
    for &(left, right, value) in pairs {
        data.extend_from_slice(&left.to_be_bytes());
        data.extend_from_slice(&right.to_be_bytes());
        data.extend_from_slice(&value.to_be_bytes());
    }

    data
}

pub fn name_table(entries: &[(u16, &str)]) -> Vec<u8> {
    let count = entries.len() as u16;
    let mut storage = Vec::new();
    let mut records = Vec::new();
    for &(name_id, value) in entries {
        let encoded: Vec<u8> = value
            .encode_utf16()
            .flat_map(|u| u.to_be_bytes())
            .collect();
        records.extend_from_slice(&3u16.to_be_bytes()); // platform: Windows
        records.extend_from_slice(&1u16.to_be_bytes()); // encoding: Unicode BMP
        records.extend_from_slice(&0x409u16.to_be_bytes());
        records.extend_from_slice(&name_id.to_be_bytes());
        records.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        records.extend_from_slice(&(storage.len() as u16).to_be_bytes());
        storage.extend_from_slice(&encoded);
    }

    let mut data = convert(&[
        TtfType::UInt16(0),
        TtfType::UInt16(count),
        TtfType::UInt16(6 + count * 12),
    ]);
    data.extend_from_slice(&records);
    data.extend_from_slice(&storage);
    data
}

/// A minimal CFF table with one charstring per glyph.
pub fn cff_table(char_strings: &[&[u8]]) -> Vec<u8> {
    fn push_index(out: &mut Vec<u8>, entries: &[&[u8]]) {
        out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
        if entries.is_empty() {
            return;
        }

        out.push(1); // offSize
        let mut offset = 1u32;
        out.push(offset as u8);
        for entry in entries {
            offset += entry.len() as u32;
            out.push(offset as u8);
        }
        for entry in entries {
            out.extend_from_slice(entry);
        }
    }

    // header (4) + name INDEX (6) + top DICT INDEX (9) + string INDEX (2)
    // + empty global subr INDEX (2).
    let cs_offset = 23u16;
    let mut top_dict = vec![28];
    top_dict.extend_from_slice(&cs_offset.to_be_bytes());
    top_dict.push(17); // CharStrings operator

    let mut data = vec![
        0x01, 0x00, // version 1.0
        0x04, // headerSize
        0x01, // offSize
    ];
    push_index(&mut data, &[b"A"]); // Name INDEX
    push_index(&mut data, &[&top_dict]); // Top DICT INDEX
    push_index(&mut data, &[]); // String INDEX
    push_index(&mut data, &[]); // Global Subr INDEX
    assert_eq!(data.len(), cs_offset as usize);
    push_index(&mut data, char_strings);
    data
}

/// The standard test font: four glyphs, kerning and names.
///
/// - glyph 0: `.notdef`, a 50..450 x 0..700 rectangle
/// - glyph 1: 'A', a 0..500 x 0..500 rectangle
/// - glyph 2: 'V', a 100..400 x 0..600 rectangle
/// - glyph 3: ' ', no outline
pub fn test_font_tables() -> Vec<(&'static [u8; 4], Vec<u8>)> {
    let (glyf, loca) = glyf_and_loca(&[
        rect_glyph(50, 0, 450, 700),
        rect_glyph(0, 0, 500, 500),
        rect_glyph(100, 0, 400, 600),
        Vec::new(),
    ]);

    vec![
        (b"head", head_table(1000, 0, 0)),
        (b"hhea", hhea_table(800, -200, 90, 4)),
        (b"maxp", maxp_table(4)),
        (b"hmtx", hmtx_table(&[(500, 50), (520, 0), (510, 100), (250, 0)])),
        (b"cmap", cmap_table(&[(' ' as u16, 3), ('A' as u16, 1), ('V' as u16, 2)])),
        (b"loca", loca),
        (b"glyf", glyf),
        (b"kern", kern_table(&[(1, 2, -80)])),
        (
            b"name",
            name_table(&[(1, "Test Family"), (2, "Regular")]),
        ),
    ]
}
