//! Dumps every glyph of a font as an SVG grid.
//!
//! Usage: font2svg font.ttf out.svg

use std::fmt::Write;

const FONT_SIZE: f32 = 128.0;
const COLUMNS: u16 = 25;

fn main() {
    if let Err(e) = process() {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn process() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = pico_args::Arguments::from_env();
    let font_path: std::path::PathBuf = args.free_from_str()?;
    let svg_path: std::path::PathBuf = args.free_from_str()?;

    let font_data = std::fs::read(font_path)?;
    let font = ttf_raster::Font::from_data(&font_data, 0)?;
    let units_per_em = font.units_per_em().ok_or("invalid units per em")?;
    let scale = FONT_SIZE / units_per_em as f32;

    let metrics = font.vertical_metrics();
    let cell_size = (metrics.ascent as f32 - metrics.descent as f32) * scale;
    let rows = (font.number_of_glyphs() as u32 + COLUMNS as u32 - 1) / COLUMNS as u32;

    let mut w = xmlwriter::XmlWriter::new(xmlwriter::Options::default());
    w.start_element("svg");
    w.write_attribute("xmlns", "http://www.w3.org/2000/svg");
    w.write_attribute_fmt(
        "viewBox",
        format_args!(
            "0 0 {} {}",
            cell_size * COLUMNS as f32,
            cell_size * rows as f32
        ),
    );

    for id in 0..font.number_of_glyphs() {
        let column = id % COLUMNS;
        let row = id / COLUMNS;
        let dx = column as f32 * cell_size;
        let dy = row as f32 * cell_size + metrics.ascent as f32 * scale;

        let shape = font.glyph_shape(ttf_raster::GlyphId(id));
        if shape.is_empty() {
            continue;
        }

        let mut path = String::new();
        for vertex in &shape {
            match *vertex {
                ttf_raster::Vertex::MoveTo { x, y } => {
                    write!(path, "M {} {} ", dx + x * scale, dy - y * scale)?
                }
                ttf_raster::Vertex::LineTo { x, y } => {
                    write!(path, "L {} {} ", dx + x * scale, dy - y * scale)?
                }
                ttf_raster::Vertex::QuadTo { x1, y1, x, y } => write!(
                    path,
                    "Q {} {} {} {} ",
                    dx + x1 * scale,
                    dy - y1 * scale,
                    dx + x * scale,
                    dy - y * scale
                )?,
                ttf_raster::Vertex::CurveTo { x1, y1, x2, y2, x, y } => write!(
                    path,
                    "C {} {} {} {} {} {} ",
                    dx + x1 * scale,
                    dy - y1 * scale,
                    dx + x2 * scale,
                    dy - y2 * scale,
                    dx + x * scale,
                    dy - y * scale
                )?,
            }
        }
        path.push('Z');

        w.start_element("path");
        w.write_attribute("d", &path);
        w.end_element();
    }

    std::fs::write(svg_path, w.end_document())?;
    Ok(())
}
