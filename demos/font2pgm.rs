//! Rasterizes a line of text into a binary PGM image.
//!
//! Usage: font2pgm font.ttf out.pgm --text "Hello" --size 64

fn main() {
    if let Err(e) = process() {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn process() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = pico_args::Arguments::from_env();
    let text: String = args
        .opt_value_from_str("--text")?
        .unwrap_or_else(|| "The quick brown fox".to_string());
    let size: f32 = args.opt_value_from_str("--size")?.unwrap_or(64.0);
    let font_path: std::path::PathBuf = args.free_from_str()?;
    let pgm_path: std::path::PathBuf = args.free_from_str()?;

    let font_data = std::fs::read(font_path)?;
    let font = ttf_raster::Font::from_data(&font_data, 0)?;

    let scale = font.scale_for_pixel_height(size);
    let metrics = font.vertical_metrics();
    let baseline = (metrics.ascent as f32 * scale).ceil() as i32;
    let height = (size + 2.0).ceil() as i32;

    // First pass: measure.
    let mut width = 2.0f32;
    let mut prev: Option<ttf_raster::GlyphId> = None;
    for c in text.chars() {
        let glyph = font.glyph_index(c as u32);
        if let Some(prev) = prev {
            width += font.glyph_kern_advance(prev, glyph) as f32 * scale;
        }
        let advance = font.glyph_hor_metrics(glyph).map(|m| m.advance).unwrap_or(0);
        width += advance as f32 * scale;
        prev = Some(glyph);
    }
    let width = width.ceil() as i32 + 2;

    // Second pass: render.
    let mut pixels = vec![0u8; (width * height) as usize];
    let mut pen_x = 1.0f32;
    let mut prev: Option<ttf_raster::GlyphId> = None;
    for c in text.chars() {
        let glyph = font.glyph_index(c as u32);
        if let Some(prev) = prev {
            pen_x += font.glyph_kern_advance(prev, glyph) as f32 * scale;
        }

        let bitmap = font.rasterize_glyph_subpixel(glyph, scale, scale, pen_x.fract(), 0.0);
        let origin_x = pen_x.floor() as i32 + bitmap.xoff;
        let origin_y = baseline + bitmap.yoff;
        for row in 0..bitmap.height as i32 {
            for column in 0..bitmap.width as i32 {
                let x = origin_x + column;
                let y = origin_y + row;
                if x < 0 || y < 0 || x >= width || y >= height {
                    continue;
                }

                let src = bitmap.pixels[(row * bitmap.width as i32 + column) as usize];
                let dst = &mut pixels[(y * width + x) as usize];
                *dst = (*dst).max(src);
            }
        }

        let advance = font.glyph_hor_metrics(glyph).map(|m| m.advance).unwrap_or(0);
        pen_x += advance as f32 * scale;
        prev = Some(glyph);
    }

    let mut out = format!("P5\n{} {}\n255\n", width, height).into_bytes();
    out.extend_from_slice(&pixels);
    std::fs::write(pgm_path, out)?;
    Ok(())
}
