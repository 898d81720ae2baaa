use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::report::ReportTable;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 14.0;
const TITLE_SIZE: f32 = 16.0;
const HEADER_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 9.0;
const ROW_HEIGHT_MM: f32 = 7.0;

/// Large tables are split into fixed-size page chunks.
pub const ROWS_PER_PAGE: usize = 30;

/// Split rows into page-sized chunks. An empty table still gets one page so
/// the title and headers render.
pub fn paginate(rows: &[Vec<String>], rows_per_page: usize) -> Vec<&[Vec<String>]> {
    if rows.is_empty() {
        return vec![&[]];
    }
    rows.chunks(rows_per_page).collect()
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn draw_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    cells: &[String],
    size: f32,
    y: f32,
    column_width: f32,
) {
    let max_chars = (column_width / 2.0) as usize;
    for (index, cell) in cells.iter().enumerate() {
        let x = MARGIN_MM + index as f32 * column_width;
        layer.use_text(truncate(cell, max_chars), size, Mm(x), Mm(y), font);
    }
}

/// Render a report table into a paginated A4 PDF at `path`.
pub fn export_table(table: &ReportTable, path: &Path) -> anyhow::Result<()> {
    let columns = table.headers.len().max(1);
    let column_width = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / columns as f32;

    let pages = paginate(&table.rows, ROWS_PER_PAGE);
    let page_count = pages.len();

    let (doc, first_page, first_layer) = PdfDocument::new(
        table.title.clone(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("failed to load builtin font")?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .context("failed to load builtin font")?;

    for (page_index, rows) in pages.iter().enumerate() {
        let layer = if page_index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 6.0;
        layer.use_text(table.title.clone(), TITLE_SIZE, Mm(MARGIN_MM), Mm(y), &bold);
        y -= ROW_HEIGHT_MM * 1.5;

        draw_row(&layer, &bold, &table.headers, HEADER_SIZE, y, column_width);
        y -= ROW_HEIGHT_MM;

        if rows.is_empty() {
            layer.use_text("No records found.", BODY_SIZE, Mm(MARGIN_MM), Mm(y), &font);
        }
        for row in rows.iter() {
            draw_row(&layer, &font, row, BODY_SIZE, y, column_width);
            y -= ROW_HEIGHT_MM;
        }

        layer.use_text(
            format!("Page {} of {}", page_index + 1, page_count),
            BODY_SIZE,
            Mm(MARGIN_MM),
            Mm(MARGIN_MM / 2.0),
            &font,
        );
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .context("failed to write PDF")?;
    log::info!("exported {} ({} pages) to {}", table.title, page_count, path.display());
    Ok(())
}
