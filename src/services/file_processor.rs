use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use std::io::Cursor;

use crate::error::AppError;
use crate::models::{CellValue, SheetData, WorkbookData};
use crate::services::excel::{pipeline, writer};

/// Full run over one uploaded workbook: parse, summarize every sheet,
/// render the styled output buffer. Fails hard when the file is unreadable
/// or when not a single sheet carries a Student Code header.
pub fn format_workbook(file_data: Bytes) -> Result<Vec<u8>, AppError> {
    tracing::info!("Processing attendance workbook");
    let workbook = load_workbook(file_data)?;
    let sheet_count = workbook.sheets.len();

    let summary = pipeline::summarize_workbook(&workbook);
    if summary.sheets.is_empty() {
        tracing::error!("No valid data found in Excel file after processing all sheets");
        return Err(AppError::FileProcessingError(
            "No sheet with a Student Code header found".to_string(),
        ));
    }
    tracing::info!("Summarized {} of {} sheets", summary.sheets.len(), sheet_count);

    writer::write_workbook(&summary)
}

/// Parse an xlsx payload into the in-memory workbook model. Formulas come
/// back as their last-computed values; unreadable worksheets are skipped
/// with a warning, an unreadable file is an error.
pub fn load_workbook(file_data: Bytes) -> Result<WorkbookData, AppError> {
    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| AppError::ParseError(format!("Failed to open Excel file: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        match workbook.worksheet_range(sheet_name) {
            Ok(range) => {
                let rows: Vec<Vec<CellValue>> = range
                    .rows()
                    .map(|row| row.iter().map(convert_cell).collect())
                    .collect();
                sheets.push(SheetData {
                    name: sheet_name.clone(),
                    rows,
                });
            }
            Err(e) => {
                tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
                continue;
            }
        }
    }

    Ok(WorkbookData { sheets })
}

fn convert_cell(value: &Data) -> CellValue {
    match value {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        // booleans keep their spreadsheet display form
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let result = format_workbook(Bytes::from_static(b"not a zip archive"));
        assert!(matches!(result, Err(AppError::ParseError(_))));
    }

    #[test]
    fn workbook_without_headers_is_rejected() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "no header here").unwrap();
        let input = workbook.save_to_buffer().unwrap();

        let result = format_workbook(Bytes::from(input));
        assert!(matches!(result, Err(AppError::FileProcessingError(_))));
    }

    #[test]
    fn format_round_trip() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("cse").unwrap();
        let headers = [
            "Student Code",
            "Name",
            "Group",
            "Total Classes",
            "Total Present",
            "Present %",
        ];
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }
        worksheet.write_string(1, 0, "BWU/01").unwrap();
        worksheet.write_string(1, 1, "Asha").unwrap();
        worksheet.write_string(1, 2, "A").unwrap();
        worksheet.write_number(1, 3, 20.0).unwrap();
        worksheet.write_number(1, 4, 18.0).unwrap();
        worksheet.write_string(1, 5, "stale").unwrap();
        worksheet.write_string(2, 0, "Signature").unwrap();
        let input = workbook.save_to_buffer().unwrap();

        let output = format_workbook(Bytes::from(input)).expect("formatting succeeds");
        let parsed = load_workbook(Bytes::from(output)).expect("output parses");

        assert_eq!(parsed.sheets.len(), 1);
        assert_eq!(parsed.sheets[0].name, "CSE");

        // title, header, one student, totals; Group column gone
        let rows = &parsed.sheets[0].rows;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][0], CellValue::Text("Student Code".to_string()));
        assert_eq!(rows[2][0], CellValue::Text("BWU/01".to_string()));
        assert_eq!(rows[2][4], CellValue::Text("90%".to_string()));
        assert_eq!(rows[3][0], CellValue::Text("Total".to_string()));
        assert!(!rows[1]
            .iter()
            .any(|cell| cell == &CellValue::Text("Group".to_string())));
    }

    #[test]
    fn cell_conversion() {
        assert_eq!(convert_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(
            convert_cell(&Data::String("BWU/01".to_string())),
            CellValue::Text("BWU/01".to_string())
        );
        assert_eq!(convert_cell(&Data::Float(18.0)), CellValue::Number(18.0));
        assert_eq!(convert_cell(&Data::Int(20)), CellValue::Number(20.0));
        assert_eq!(
            convert_cell(&Data::Bool(true)),
            CellValue::Text("TRUE".to_string())
        );
    }
}
