mod writer;

use ttf_raster::{
    bake_font_bitmap, baked_quad, font_offset_for_index, number_of_fonts, Codepoints, Error,
    Font, FontSize, FontStyle, GlyphId, PackRange, Packer, TableName, Vertex,
};
use writer::*;

fn test_font_data() -> Vec<u8> {
    build_font(&test_font_tables())
}

#[test]
fn empty_font() {
    assert_eq!(Font::from_data(&[], 0).unwrap_err(), Error::UnknownMagic);
}

#[test]
fn unknown_magic() {
    let data = convert(&[
        TtfType::Raw(&[0xFF, 0xFF, 0xFF, 0xFF]),
        TtfType::UInt16(0),
    ]);
    assert_eq!(Font::from_data(&data, 0).unwrap_err(), Error::UnknownMagic);
}

#[test]
fn incomplete_header() {
    let data = convert(&[
        TtfType::TrueTypeMagic,
        TtfType::UInt16(0), // numTables
        TtfType::UInt16(0), // searchRange
        TtfType::UInt16(0), // entrySelector
        TtfType::UInt16(0), // rangeShift
    ]);

    for i in 4..data.len() {
        assert!(Font::from_data(&data[0..i], 0).is_err());
    }
}

#[test]
fn zero_tables() {
    let data = convert(&[
        TtfType::TrueTypeMagic,
        TtfType::UInt16(0),
        TtfType::UInt16(0),
        TtfType::UInt16(0),
        TtfType::UInt16(0),
    ]);

    assert_eq!(
        Font::from_data(&data, 0).unwrap_err(),
        Error::TableMissing(TableName::Header)
    );
}

#[test]
fn missing_tables_are_reported() {
    let mut tables = test_font_tables();
    tables.retain(|(tag, _)| *tag != b"hmtx");
    let data = build_font(&tables);
    assert_eq!(
        Font::from_data(&data, 0).unwrap_err(),
        Error::TableMissing(TableName::HorizontalMetrics)
    );

    let mut tables = test_font_tables();
    tables.retain(|(tag, _)| *tag != b"cmap");
    let data = build_font(&tables);
    assert_eq!(
        Font::from_data(&data, 0).unwrap_err(),
        Error::TableMissing(TableName::CharacterToGlyphIndexMapping)
    );

    // glyf without loca is unusable.
    let mut tables = test_font_tables();
    tables.retain(|(tag, _)| *tag != b"loca");
    let data = build_font(&tables);
    assert_eq!(
        Font::from_data(&data, 0).unwrap_err(),
        Error::TableMissing(TableName::IndexToLocation)
    );

    // Neither glyf nor CFF.
    let mut tables = test_font_tables();
    tables.retain(|(tag, _)| *tag != b"glyf");
    let data = build_font(&tables);
    assert_eq!(
        Font::from_data(&data, 0).unwrap_err(),
        Error::TableMissing(TableName::CompactFontFormat)
    );
}

#[test]
fn truncation_never_panics() {
    let data = test_font_data();
    for len in 0..data.len() {
        // Init either fails or yields a usable handle.
        if let Ok(font) = Font::from_data(&data[..len], 0) {
            assert!(font.number_of_glyphs() >= 1);
            let _ = font.glyph_index('A' as u32);
            let _ = font.glyph_shape(GlyphId(1));
        }
    }
}

#[test]
fn basic_properties() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    assert_eq!(font.number_of_glyphs(), 4);
    assert_eq!(font.units_per_em(), Some(1000));

    let metrics = font.vertical_metrics();
    assert_eq!(metrics.ascent, 800);
    assert_eq!(metrics.descent, -200);
    assert_eq!(metrics.line_gap, 90);
    assert_eq!(font.typographic_metrics(), None);

    let bbox = font.global_bounding_box();
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (0, -200, 1000, 800));

    assert_eq!(font.scale_for_pixel_height(100.0), 0.1);
    assert_eq!(font.scale_for_em_to_pixels(500.0), 0.5);
}

#[test]
fn glyph_lookup() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    assert_eq!(font.glyph_index('A' as u32), GlyphId(1));
    assert_eq!(font.glyph_index('V' as u32), GlyphId(2));
    assert_eq!(font.glyph_index(' ' as u32), GlyphId(3));
    // Unmapped code points fall back to .notdef.
    assert_eq!(font.glyph_index('B' as u32), GlyphId(0));
    assert_eq!(font.glyph_index(0xFFFF), GlyphId(0));
    assert_eq!(font.glyph_index(0x10FFFF), GlyphId(0));
}

#[test]
fn glyph_index_stays_in_range() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    for code_point in (0..0x11000).step_by(7) {
        assert!(font.glyph_index(code_point).0 < font.number_of_glyphs());
    }
}

#[test]
fn horizontal_metrics() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let m = font.glyph_hor_metrics(GlyphId(1)).unwrap();
    assert_eq!((m.advance, m.left_side_bearing), (520, 0));

    let m = font.codepoint_hor_metrics('V' as u32).unwrap();
    assert_eq!((m.advance, m.left_side_bearing), (510, 100));

    // Out of range.
    assert_eq!(font.glyph_hor_metrics(GlyphId(4)), None);
}

#[test]
fn glyph_boxes() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let bbox = font.glyph_box(GlyphId(1)).unwrap();
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (0, 0, 500, 500));

    let bbox = font.codepoint_box('V' as u32).unwrap();
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (100, 0, 400, 600));

    assert_eq!(font.glyph_box(GlyphId(3)), None);
    assert_eq!(font.glyph_box(GlyphId(99)), None);
}

#[test]
fn empty_glyph_is_empty_everywhere() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let space = font.glyph_index(' ' as u32);
    assert!(font.is_glyph_empty(space));
    assert!(font.glyph_shape(space).is_empty());

    let bitmap = font.rasterize_glyph(space, 0.1, 0.1);
    assert_eq!((bitmap.width, bitmap.height), (0, 0));
    assert_eq!((bitmap.xoff, bitmap.yoff), (0, 0));
    assert!(bitmap.pixels.is_empty());

    // Out-of-range glyphs behave the same.
    assert!(font.is_glyph_empty(GlyphId(100)));
    assert!(font.glyph_shape(GlyphId(100)).is_empty());
}

#[test]
fn glyph_shape_square() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let shape = font.glyph_shape(GlyphId(1));
    assert_eq!(
        shape,
        &[
            Vertex::MoveTo { x: 0.0, y: 0.0 },
            Vertex::LineTo { x: 500.0, y: 0.0 },
            Vertex::LineTo { x: 500.0, y: 500.0 },
            Vertex::LineTo { x: 0.0, y: 500.0 },
            Vertex::LineTo { x: 0.0, y: 0.0 },
        ]
    );
}

#[test]
fn kerning() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    assert_eq!(font.codepoint_kern_advance('A' as u32, 'V' as u32), -80);
    assert_eq!(font.glyph_kern_advance(GlyphId(1), GlyphId(2)), -80);
    assert_eq!(font.glyph_kern_advance(GlyphId(2), GlyphId(1)), 0);

    // The table dump round-trips the same triple.
    let pairs = font.kerning_pairs();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].left, GlyphId(1));
    assert_eq!(pairs[0].right, GlyphId(2));
    assert_eq!(pairs[0].value, -80);
}

#[test]
fn no_kerning_sources_means_zero() {
    let mut tables = test_font_tables();
    tables.retain(|(tag, _)| *tag != b"kern");
    let data = build_font(&tables);
    let font = Font::from_data(&data, 0).unwrap();

    for a in 0..4u16 {
        for b in 0..4u16 {
            assert_eq!(font.glyph_kern_advance(GlyphId(a), GlyphId(b)), 0);
        }
    }
    assert!(font.kerning_pairs().is_empty());
}

#[test]
fn gpos_and_kern_both_contribute() {
    // The GPOS table from the unit-level fixtures: pair (1, 2) -> -50.
    let gpos: Vec<u8> = vec![
        0x00, 0x01, 0x00, 0x00, // version 1.0
        0x00, 0x0A, 0x00, 0x0A, 0x00, 0x0C, // list offsets
        0x00, 0x00, // empty script/feature list
        0x00, 0x01, 0x00, 0x04, // lookup list
        0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x08, // lookup
        0x00, 0x01, 0x00, 0x0C, 0x00, 0x04, 0x00, 0x00, // pair subtable
        0x00, 0x01, 0x00, 0x12, // pair set count + offset
        0x00, 0x01, 0x00, 0x01, 0x00, 0x01, // coverage: glyph 1
        0x00, 0x01, 0x00, 0x02, 0xFF, 0xCE, // pair (.., 2) -> -50
    ];

    let mut tables = test_font_tables();
    tables.push((b"GPOS", gpos));
    let data = build_font(&tables);
    let font = Font::from_data(&data, 0).unwrap();

    // kern says -80, GPOS says -50; both sources contribute.
    assert_eq!(font.glyph_kern_advance(GlyphId(1), GlyphId(2)), -130);
}

#[test]
fn bitmap_box_and_render() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    // The 500-unit square at 0.01 maps exactly to 5x5 pixels.
    let bounds = font.glyph_bitmap_box(GlyphId(1), 0.01, 0.01);
    assert_eq!((bounds.x0, bounds.y0, bounds.x1, bounds.y1), (0, -5, 5, 0));

    let bitmap = font.rasterize_glyph(GlyphId(1), 0.01, 0.01);
    assert_eq!((bitmap.width, bitmap.height), (5, 5));
    assert_eq!((bitmap.xoff, bitmap.yoff), (0, -5));
    assert!(bitmap.pixels.iter().all(|&p| p == 255));
}

#[test]
fn bitmap_box_scales_linearly() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    for k in 1..8 {
        let scale = 0.01 * k as f32;
        let bounds = font.glyph_bitmap_box(GlyphId(2), scale, scale);
        // glyph 2 is the 100..400 x 0..600 rectangle.
        assert_eq!(bounds.x0, (100.0 * scale).floor() as i32);
        assert_eq!(bounds.y0, (-600.0 * scale).floor() as i32);
        assert_eq!(bounds.x1, (400.0 * scale).ceil() as i32);
        assert_eq!(bounds.y1, (0.0 * scale).ceil() as i32);
    }
}

#[test]
fn render_into_caller_memory() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let mut pixels = vec![0u8; 8 * 8];
    let mut target = ttf_raster::BitmapView::new(&mut pixels, 5, 5, 8).unwrap();
    font.rasterize_glyph_into(&mut target, GlyphId(1), 0.01, 0.01);

    for y in 0..8 {
        for x in 0..8 {
            let expected = if x < 5 && y < 5 { 255 } else { 0 };
            assert_eq!(pixels[y * 8 + x], expected, "at ({}, {})", x, y);
        }
    }
}

#[test]
fn sdf_signs() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    // The 'A' square at scale 0.02 is 10x10 pixels.
    let sdf = font.glyph_sdf(0.02, GlyphId(1), 4, 128, 64.0).unwrap();
    assert_eq!((sdf.width, sdf.height), (18, 18));

    let value = |x: i32, y: i32| -> u8 {
        sdf.pixels[((y - sdf.yoff) * sdf.width as i32 + (x - sdf.xoff)) as usize]
    };

    // Half a pixel outside the top edge.
    assert_eq!(value(5, -11), 128 - 32);
    // Half a pixel inside.
    assert_eq!(value(5, -10), 128 + 32);
    // Deep inside clamps high, far outside clamps low.
    assert_eq!(value(5, -5), 255);
    assert_eq!(value(5, -14), 0);

    // The empty glyph has no field at all.
    assert_eq!(font.glyph_sdf(0.02, GlyphId(3), 4, 128, 64.0), None);
}

#[test]
fn cff_outlines() {
    // 0 0 rmoveto 500 hlineto 500 vlineto -500 hlineto endchar.
    // 500 is encoded as (248, 136), -500 as (252, 136).
    let square_cs: &[u8] = &[
        139, 139, 21, // 0 0 rmoveto
        248, 136, 6, // 500 hlineto
        248, 136, 7, // 500 vlineto
        252, 136, 6, // -500 hlineto
        14, // endchar
    ];
    // A blank .notdef: no moveto at all.
    let notdef_cs: &[u8] = &[14];

    let tables: Vec<(&[u8; 4], Vec<u8>)> = vec![
        (b"head", head_table(1000, 0, 0)),
        (b"hhea", hhea_table(800, -200, 90, 2)),
        (b"maxp", maxp_table(2)),
        (b"hmtx", hmtx_table(&[(500, 0), (520, 0)])),
        (b"cmap", cmap_table(&[('A' as u16, 1)])),
        (b"CFF ", cff_table(&[notdef_cs, square_cs])),
    ];
    let data = build_font_at(TtfType::OpenTypeMagic, &tables, 0);
    let font = Font::from_data(&data, 0).unwrap();

    let shape = font.codepoint_shape('A' as u32);
    assert_eq!(
        shape,
        &[
            Vertex::MoveTo { x: 0.0, y: 0.0 },
            Vertex::LineTo { x: 500.0, y: 0.0 },
            Vertex::LineTo { x: 500.0, y: 500.0 },
            Vertex::LineTo { x: 0.0, y: 500.0 },
            Vertex::LineTo { x: 0.0, y: 0.0 },
        ]
    );

    // The box comes from running the charstring in bounds mode.
    let bbox = font.glyph_box(GlyphId(1)).unwrap();
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (0, 0, 500, 500));

    // And it rasterizes just like the TrueType square.
    let bitmap = font.rasterize_glyph(GlyphId(1), 0.01, 0.01);
    assert_eq!((bitmap.width, bitmap.height), (5, 5));
    assert!(bitmap.pixels.iter().all(|&p| p == 255));

    // The .notdef charstring draws nothing.
    assert!(font.is_glyph_empty(GlyphId(0)));
}

#[test]
fn collection_indexing() {
    let font1 = test_font_tables();
    let mut font2 = test_font_tables();
    // Distinguish the second font by its ascender.
    font2[1] = (b"hhea", hhea_table(700, -300, 0, 4));

    let data = build_collection(&[&font1, &font2]);

    assert_eq!(number_of_fonts(&data), Some(2));
    assert!(font_offset_for_index(&data, 0).is_some());
    assert!(font_offset_for_index(&data, 1).is_some());
    assert_eq!(font_offset_for_index(&data, 2), None);

    let first = Font::from_data(&data, 0).unwrap();
    assert_eq!(first.vertical_metrics().ascent, 800);

    let second = Font::from_data(&data, 1).unwrap();
    assert_eq!(second.vertical_metrics().ascent, 700);

    assert_eq!(
        Font::from_data(&data, 2).unwrap_err(),
        Error::FontIndexOutOfBounds
    );

    // Both parsed fonts answer queries.
    assert_eq!(first.glyph_index('A' as u32), GlyphId(1));
    assert_eq!(second.glyph_index('A' as u32), GlyphId(1));
}

#[test]
fn plain_font_counts_as_one() {
    let data = test_font_data();
    assert_eq!(number_of_fonts(&data), Some(1));
    assert_eq!(font_offset_for_index(&data, 0), Some(0));
    assert_eq!(font_offset_for_index(&data, 1), None);
    assert_eq!(number_of_fonts(&[0xDE, 0xAD, 0xBE, 0xEF]), None);
}

#[test]
fn bake_and_quads() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let baked = bake_font_bitmap(&font, 32.0, 128, 128, 'A' as u32, 2);
    assert_eq!(baked.chars.len(), 2);
    assert!(baked.rows_used > 1);
    assert!(baked.pixels.iter().any(|&p| p != 0));

    // Baked rectangles never overlap.
    let a = &baked.chars[0];
    let b = &baked.chars[1];
    let disjoint = a.x1 <= b.x0 || b.x1 <= a.x0 || a.y1 <= b.y0 || b.y1 <= a.y0;
    assert!(disjoint);

    // The pen advances by each glyph's advance.
    let mut x = 0.0f32;
    let quad = baked_quad(&baked.chars, 128, 128, 0, &mut x, 0.0).unwrap();
    assert_eq!(x, a.xadvance);
    assert!(quad.s0 < quad.s1 && quad.t0 < quad.t1);

    baked_quad(&baked.chars, 128, 128, 1, &mut x, 0.0).unwrap();
    assert_eq!(x, a.xadvance + b.xadvance);
}

#[test]
fn atlas_overflow_truncates() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let baked = bake_font_bitmap(&font, 64.0, 40, 40, 'A' as u32, 10);
    assert!(baked.chars.len() < 10);
}

#[test]
fn pack_font_ranges() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let mut packer = Packer::new(256, 256);
    packer.set_oversampling(2, 2);
    let ranges = [PackRange {
        font_size: FontSize::PixelHeight(24.0),
        codepoints: Codepoints::List(&['A' as u32, 'V' as u32]),
    }];

    let (results, all_packed) = packer.pack_font_ranges(&font, &ranges);
    assert!(all_packed);
    assert_eq!(results.len(), 1);
    let chars = &results[0];
    assert_eq!(chars.len(), 2);

    for c in chars {
        assert!(c.x1 > c.x0 && c.y1 > c.y0);
        assert!((c.x1 as u32) <= 256 && (c.y1 as u32) <= 256);
        assert!(c.xadvance > 0.0);
        // The oversampling subpixel shift is folded into the offsets.
        assert!(c.xoff2 > c.xoff);
    }

    // The two rectangles don't overlap.
    let (a, b) = (&chars[0], &chars[1]);
    let disjoint = a.x1 <= b.x0 || b.x1 <= a.x0 || a.y1 <= b.y0 || b.y1 <= a.y0;
    assert!(disjoint);

    assert!(packer.pixels().iter().any(|&p| p != 0));

    // Every rendered byte is a valid coverage value by construction,
    // and something actually landed inside each glyph's slot.
    let w = packer.width() as usize;
    for c in chars {
        let mut any = false;
        for y in c.y0 as usize..c.y1 as usize {
            for x in c.x0 as usize..c.x1 as usize {
                any |= packer.pixels()[y * w + x] != 0;
            }
        }
        assert!(any);
    }
}

#[test]
fn pack_skip_missing() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let mut packer = Packer::new(128, 128);
    packer.set_skip_missing(true);
    let ranges = [PackRange {
        font_size: FontSize::PixelHeight(20.0),
        // 'B' has no glyph.
        codepoints: Codepoints::List(&['A' as u32, 'B' as u32]),
    }];

    let (results, _) = packer.pack_font_ranges(&font, &ranges);
    let chars = &results[0];
    assert!(chars[0].x1 > chars[0].x0);
    // The missing code point was skipped entirely.
    assert_eq!(chars[1], ttf_raster::PackedChar::default());
}

#[test]
fn pack_missing_reuses_notdef() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let mut packer = Packer::new(256, 256);
    let ranges = [PackRange {
        font_size: FontSize::PixelHeight(20.0),
        // Two missing code points; the box is rendered once.
        codepoints: Codepoints::List(&['B' as u32, 'C' as u32]),
    }];

    let (results, all_packed) = packer.pack_font_ranges(&font, &ranges);
    assert!(all_packed);
    let chars = &results[0];
    assert!(chars[0].x1 > chars[0].x0);
    assert_eq!(chars[0], chars[1]);
}

#[test]
fn name_strings_and_matching() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let family: Vec<u8> = "Test Family"
        .encode_utf16()
        .flat_map(|u| u.to_be_bytes())
        .collect();
    assert_eq!(font.name_string(3, 1, 0x409, 1), Some(family.as_slice()));
    assert_eq!(font.name_string(3, 1, 0x409, 99), None);

    let names: Vec<_> = font.names().collect();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0].name_id, 1);

    use ttf_raster::find_matching_font;
    assert_eq!(
        find_matching_font(&data, "Test Family Regular", FontStyle::DONT_CARE),
        Some(0)
    );
    assert_eq!(
        find_matching_font(&data, "Other Family", FontStyle::DONT_CARE),
        None
    );
    // With a style request, only the family name is compared,
    // but the style bits must match.
    assert_eq!(
        find_matching_font(&data, "Test Family", FontStyle::BOLD),
        None
    );
}

#[test]
fn matching_respects_mac_style() {
    let mut tables = test_font_tables();
    tables[0] = (b"head", head_table(1000, 0, 1)); // bold
    let data = build_font(&tables);

    use ttf_raster::find_matching_font;
    assert_eq!(
        find_matching_font(&data, "Test Family", FontStyle::BOLD),
        Some(0)
    );
    assert_eq!(
        find_matching_font(&data, "Test Family", FontStyle::ITALIC),
        None
    );
}

#[test]
fn svg_documents() {
    let svg_doc = b"<svg></svg>";
    let mut svg = convert(&[
        TtfType::UInt16(0), // version
        TtfType::UInt32(10), // offset to document list
        TtfType::UInt32(0), // reserved
        // Document list.
        TtfType::UInt16(1),
        TtfType::UInt16(1), // startGlyphID
        TtfType::UInt16(2), // endGlyphID
        TtfType::UInt32(14), // doc offset (from list start)
        TtfType::UInt32(svg_doc.len() as u32),
    ]);
    svg.extend_from_slice(svg_doc);

    let mut tables = test_font_tables();
    tables.push((b"SVG ", svg));
    let data = build_font(&tables);
    let font = Font::from_data(&data, 0).unwrap();

    assert_eq!(font.glyph_svg(GlyphId(1)), Some(svg_doc.as_ref()));
    assert_eq!(font.glyph_svg(GlyphId(2)), Some(svg_doc.as_ref()));
    assert_eq!(font.glyph_svg(GlyphId(0)), None);
    assert_eq!(font.glyph_svg(GlyphId(3)), None);
}

#[test]
fn subpixel_shift_moves_coverage() {
    let data = test_font_data();
    let font = Font::from_data(&data, 0).unwrap();

    let plain = font.rasterize_glyph_subpixel(GlyphId(1), 0.01, 0.01, 0.0, 0.0);
    let shifted = font.rasterize_glyph_subpixel(GlyphId(1), 0.01, 0.01, 0.5, 0.0);

    // A half-pixel shift grows the box by one column.
    assert_eq!(shifted.width, plain.width + 1);
    // The first and last columns carry the partial coverage.
    let w = shifted.width as usize;
    assert!(shifted.pixels[0] > 0 && shifted.pixels[0] < 255);
    assert!(shifted.pixels[w - 1] > 0 && shifted.pixels[w - 1] < 255);
}
