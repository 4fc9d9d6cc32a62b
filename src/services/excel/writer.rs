use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::error::AppError;
use crate::models::{CellValue, SummarySheet, SummaryWorkbook};

const HEADER_FILL: u32 = 0x1F4E78;
const WHITE: u32 = 0xFFFFFF;
const MIN_COL_WIDTH: usize = 10;
const MAX_COL_WIDTH: usize = 30;
// xlsx paper size code for A4
const PAPER_A4: u8 = 9;

/// Reusable formats for one output workbook.
struct SheetFormats {
    title: Format,
    header: Format,
    header_first: Format,
    data: Format,
    data_first: Format,
}

fn create_formats() -> SheetFormats {
    let title = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    let header = Format::new()
        .set_bold()
        .set_font_color(WHITE)
        .set_background_color(HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    // the label column gets a heavier left edge
    let header_first = header.clone().set_border_left(FormatBorder::Medium);

    let data = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let data_first = data.clone().set_border_left(FormatBorder::Medium);

    SheetFormats {
        title,
        header,
        header_first,
        data,
        data_first,
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    format: &Format,
) -> Result<(), XlsxError> {
    match cell {
        CellValue::Empty => worksheet.write_blank(row, col, format)?,
        CellValue::Text(s) => worksheet.write_string_with_format(row, col, s, format)?,
        CellValue::Number(n) => worksheet.write_number_with_format(row, col, *n, format)?,
        CellValue::Date(_) => {
            worksheet.write_string_with_format(row, col, &cell.display(), format)?
        }
        CellValue::Formula(f) => {
            worksheet.write_formula_with_format(row, col, f.as_str(), format)?
        }
    };
    Ok(())
}

/// Render one summary sheet: merged title row, styled header/data/totals
/// grid, auto-sized columns, portrait A4 print setup with the title and
/// header rows repeated on every page.
fn write_sheet(
    workbook: &mut Workbook,
    sheet: &SummarySheet,
    formats: &SheetFormats,
) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.name)?;
    worksheet.set_portrait();
    worksheet.set_paper_size(PAPER_A4);
    worksheet.set_repeat_rows(0, 1)?;

    let ncols = sheet.rows.first().map_or(0, Vec::len);

    // title row, merged across all surviving columns
    if ncols > 1 {
        worksheet.merge_range(0, 0, 0, (ncols - 1) as u16, &sheet.title, &formats.title)?;
    } else {
        worksheet.write_string_with_format(0, 0, &sheet.title, &formats.title)?;
    }

    let totals_idx = sheet.rows.len() - 1;
    for (i, row) in sheet.rows.iter().enumerate() {
        let styled_row = i == 0 || i == totals_idx;
        for (j, cell) in row.iter().enumerate() {
            let format = match (styled_row, j == 0) {
                (true, true) => &formats.header_first,
                (true, false) => &formats.header,
                (false, true) => &formats.data_first,
                (false, false) => &formats.data,
            };
            write_cell(worksheet, (i + 1) as u32, j as u16, cell, format)?;
        }
    }

    // widths track the longest rendered value, clamped; the title only
    // counts toward its anchor column
    for col in 0..ncols {
        let mut max_len = if col == 0 { sheet.title.chars().count() } else { 0 };
        for row in &sheet.rows {
            if let Some(cell) = row.get(col) {
                max_len = max_len.max(cell.display().chars().count());
            }
        }
        let width = (max_len + 2).clamp(MIN_COL_WIDTH, MAX_COL_WIDTH);
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

/// Serialize the summary into an xlsx buffer.
pub fn write_workbook(summary: &SummaryWorkbook) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let formats = create_formats();

    for sheet in &summary.sheets {
        write_sheet(&mut workbook, sheet, &formats)
            .map_err(|e| AppError::RenderError(format!("Failed to render sheet {}: {}", sheet.name, e)))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| AppError::RenderError(format!("Failed to create Excel: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SheetData, WorkbookData};
    use crate::services::excel::pipeline::summarize_workbook;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample_summary() -> SummaryWorkbook {
        let workbook = WorkbookData {
            sheets: vec![SheetData {
                name: "cse".to_string(),
                rows: vec![
                    vec![
                        text("Student Code"),
                        text("Name"),
                        text("Total Classes"),
                        text("Total Present"),
                        text("Present %"),
                    ],
                    vec![
                        text("BWU/01"),
                        text("Asha"),
                        CellValue::Number(20.0),
                        CellValue::Number(18.0),
                        text("90%"),
                    ],
                ],
            }],
        };
        summarize_workbook(&workbook)
    }

    #[test]
    fn writes_valid_xlsx_buffer() {
        let summary = sample_summary();
        let buffer = write_workbook(&summary).expect("render succeeds");

        // XLSX files start with PK (ZIP header)
        assert!(buffer.len() > 100);
        assert_eq!(&buffer[0..2], b"PK");
    }

    #[test]
    fn renders_every_summary_sheet() {
        let mut summary = sample_summary();
        let mut second = summary.sheets[0].clone();
        second.name = "ME".to_string();
        second.title = "me".to_string();
        summary.sheets.push(second);

        let buffer = write_workbook(&summary).expect("render succeeds");
        assert_eq!(&buffer[0..2], b"PK");
    }

    #[test]
    fn duplicate_sheet_names_surface_as_render_errors() {
        let mut summary = sample_summary();
        let second = summary.sheets[0].clone();
        summary.sheets.push(second);

        assert!(write_workbook(&summary).is_err());
    }

    #[test]
    fn single_column_sheet_renders_without_merge() {
        let summary = SummaryWorkbook {
            sheets: vec![SummarySheet {
                title: "EE".to_string(),
                name: "EE".to_string(),
                rows: vec![vec![text("Student Code")], vec![text("Total")]],
            }],
        };
        let buffer = write_workbook(&summary).expect("render succeeds");
        assert_eq!(&buffer[0..2], b"PK");
    }
}
