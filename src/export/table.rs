//! Table grid rendering

use crate::direction::TextDirection;

use super::blocks::Ink;
use super::layout::{LayoutEngine, PaintStyle, TextStyle};
use super::metrics::{clip_text, text_width, wrap_text, FontFace};

/// Cell padding, mm
pub const CELL_PADDING: f32 = 1.5;
/// Grid line width, mm
const GRID_LINE: f32 = 0.2;

/// Draw a table with equal column widths.
///
/// The header row is filled and bold; body rows alternate between tinted
/// and plain. Rows never split across pages: a row taller than a page is
/// truncated to the lines that fit.
pub fn render_table(
    engine: &mut LayoutEngine,
    headers: &[String],
    rows: &[Vec<String>],
    ink: &Ink,
    size: f32,
) {
    let columns = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));
    if columns == 0 {
        return;
    }
    let column_width = engine.content_width() / columns as f32;

    if !headers.is_empty() {
        let style = TextStyle::new(FontFace::Bold, size, ink.text).with_leading(1.3);
        draw_row(engine, headers, columns, column_width, &style, ink, Some(ink.header_fill));
    }

    let style = TextStyle::new(FontFace::Regular, size, ink.text).with_leading(1.3);
    for (i, row) in rows.iter().enumerate() {
        let fill = (i % 2 == 0).then_some(ink.stripe_fill);
        draw_row(engine, row, columns, column_width, &style, ink, fill);
    }
}

fn draw_row(
    engine: &mut LayoutEngine,
    cells: &[String],
    columns: usize,
    column_width: f32,
    style: &TextStyle,
    ink: &Ink,
    fill: Option<crate::theme::Rgb>,
) {
    let line_height = style.line_height();
    let text_box = (column_width - 2.0 * CELL_PADDING).max(1.0);
    let max_lines = ((engine.geometry().content_height() - 2.0 * CELL_PADDING) / line_height)
        .floor()
        .max(1.0) as usize;

    let mut wrapped: Vec<Vec<String>> = (0..columns)
        .map(|c| {
            let text = cells.get(c).map(String::as_str).unwrap_or_default();
            wrap_text(text, style.face, style.size, text_box)
        })
        .collect();
    for lines in &mut wrapped {
        if lines.len() > max_lines {
            lines.truncate(max_lines);
            if let Some(last) = lines.last_mut() {
                *last = clip_text(last, style.face, style.size, text_box);
            }
        }
    }

    let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let row_height = line_count as f32 * line_height + 2.0 * CELL_PADDING;

    engine.check_page_break(row_height);
    let top = engine.cursor().y;
    let left = engine.left();
    let width = column_width * columns as f32;

    engine.set_stroke(ink.border);
    engine.set_line_width(GRID_LINE);
    match fill {
        Some(color) => {
            engine.set_fill(color);
            engine.rect(left, top, width, row_height, PaintStyle::FillStroke);
        }
        None => engine.rect(left, top, width, row_height, PaintStyle::Stroke),
    }
    for c in 1..columns {
        let x = left + column_width * c as f32;
        engine.line(x, top, x, top + row_height);
    }

    let rtl = engine.direction() == TextDirection::Rtl;
    for (c, lines) in wrapped.iter().enumerate() {
        // RTL tables read right to left
        let slot = if rtl { columns - 1 - c } else { c };
        let cell_left = left + column_width * slot as f32 + CELL_PADDING;
        for (n, line) in lines.iter().enumerate() {
            let x = if rtl {
                cell_left + text_box - text_width(line, style.face, style.size)
            } else {
                cell_left
            };
            let line_top = top + CELL_PADDING + n as f32 * line_height;
            engine.text_at(line, style, x, line_top);
        }
    }

    engine.advance(row_height);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::layout::DrawOp;
    use crate::export::types::PageGeometry;
    use crate::theme::Theme;

    fn ink() -> Ink {
        Ink::from_palette(&Theme::default().palette())
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn rects(engine: LayoutEngine) -> Vec<PaintStyle> {
        engine
            .finish()
            .ops
            .into_iter()
            .filter_map(|p| match p.op {
                DrawOp::Rect { style, .. } => Some(style),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_header_and_striped_rows() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        let rows = vec![strings(&["1", "2"]), strings(&["3", "4"]), strings(&["5", "6"])];
        render_table(&mut engine, &strings(&["A", "B"]), &rows, &ink(), 10.0);

        assert_eq!(
            rects(engine),
            vec![
                PaintStyle::FillStroke,
                PaintStyle::FillStroke,
                PaintStyle::Stroke,
                PaintStyle::FillStroke,
            ]
        );
    }

    #[test]
    fn test_header_is_bold() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        render_table(&mut engine, &strings(&["Name"]), &[strings(&["x"])], &ink(), 10.0);
        let doc = engine.finish();
        let fonts: Vec<FontFace> = doc
            .ops
            .iter()
            .filter_map(|p| match p.op {
                DrawOp::SetFont { face, .. } => Some(face),
                _ => None,
            })
            .collect();
        assert_eq!(fonts, vec![FontFace::Bold, FontFace::Regular]);
    }

    #[test]
    fn test_ragged_rows_use_widest_column_count() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        render_table(&mut engine, &[], &[strings(&["a"]), strings(&["b", "c", "d"])], &ink(), 10.0);
        let dividers = engine
            .finish()
            .ops
            .iter()
            .filter(|p| matches!(p.op, DrawOp::Line { .. }))
            .count();
        // two dividers per row for three columns
        assert_eq!(dividers, 4);
    }

    #[test]
    fn test_rows_break_to_next_page() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        let rows: Vec<Vec<String>> = (0..80).map(|i| vec![format!("row {}", i)]).collect();
        render_table(&mut engine, &strings(&["n"]), &rows, &ink(), 10.0);
        let doc = engine.finish();
        assert!(doc.pages >= 2);

        let bottom = doc.geometry.bottom();
        for p in &doc.ops {
            if let DrawOp::Rect { y, height, .. } = p.op {
                assert!(y + height <= bottom + 1e-3);
            }
        }
    }

    #[test]
    fn test_empty_table_draws_nothing() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        render_table(&mut engine, &[], &[], &ink(), 10.0);
        assert!(engine.finish().ops.is_empty());
    }

    #[test]
    fn test_rtl_cells_right_aligned() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Rtl);
        render_table(&mut engine, &strings(&["a", "b"]), &[], &ink(), 10.0);
        let xs: Vec<f32> = engine
            .finish()
            .ops
            .iter()
            .filter_map(|p| match p.op {
                DrawOp::Text { x, .. } => Some(x),
                _ => None,
            })
            .collect();
        // first column lands in the right half
        assert!(xs[0] > 105.0);
        assert!(xs[1] < 105.0);
    }
}
