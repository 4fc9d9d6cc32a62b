use super::utils::{column_letter, is_date_or_group};
use crate::models::{
    CellValue, ColumnRoles, SheetData, SummarySheet, SummaryWorkbook, WorkbookData,
};

const STUDENT_CODE_HEADER: &str = "student code";
const STUDENT_CODE_PREFIX: &str = "BWU/";

/// Offset between a trimmed-grid row index and its 1-based row number in
/// the rendered sheet: the merged title row occupies row 1, so the header
/// lands on row 2 and data starts on row 3.
const TITLE_ROW_OFFSET: usize = 2;

/// Drop every column that is blank in all rows. Returns an empty grid when
/// nothing survives, so callers can skip the sheet outright.
pub fn prune_blank_columns(rows: &[Vec<CellValue>]) -> Vec<Vec<CellValue>> {
    let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let keep: Vec<usize> = (0..width)
        .filter(|&col| {
            rows.iter()
                .any(|row| !row.get(col).map_or(true, CellValue::is_blank))
        })
        .collect();

    if keep.is_empty() {
        return Vec::new();
    }

    rows.iter()
        .map(|row| {
            keep.iter()
                .map(|&col| row.get(col).cloned().unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect()
}

/// Locate the header row and the student-code column within it: the first
/// row containing a cell whose trimmed, case-folded text is exactly
/// "student code".
pub fn find_header(rows: &[Vec<CellValue>]) -> Option<(usize, usize)> {
    rows.iter().enumerate().find_map(|(row_idx, row)| {
        row.iter()
            .position(|cell| cell.display().trim().to_lowercase() == STUDENT_CODE_HEADER)
            .map(|col_idx| (row_idx, col_idx))
    })
}

/// Keep the header row through the last row whose student-code cell starts
/// with the `BWU/` prefix. Footer rows (signatures, remarks) fall off the
/// end; when no row carries the prefix the result is the header alone.
pub fn trim_rows(
    rows: &[Vec<CellValue>],
    header_idx: usize,
    code_col: usize,
) -> Vec<Vec<CellValue>> {
    let mut last = header_idx;
    for (idx, row) in rows.iter().enumerate().skip(header_idx + 1) {
        let code = row.get(code_col).map(CellValue::display).unwrap_or_default();
        if code.trim().starts_with(STUDENT_CODE_PREFIX) {
            last = idx;
        }
    }
    rows[header_idx..=last].to_vec()
}

/// Remove every column whose header matches the date/group heuristic.
pub fn drop_date_group_columns(rows: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
    if rows.is_empty() {
        return rows;
    }
    let keep: Vec<usize> = rows[0]
        .iter()
        .enumerate()
        .filter(|(_, header)| !is_date_or_group(header))
        .map(|(idx, _)| idx)
        .collect();

    rows.iter()
        .map(|row| {
            keep.iter()
                .map(|&col| row.get(col).cloned().unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect()
}

/// First matching column wins, left to right, for each role.
pub fn resolve_columns(headers: &[CellValue]) -> ColumnRoles {
    let lowered: Vec<String> = headers
        .iter()
        .map(|header| header.display().to_lowercase())
        .collect();

    ColumnRoles {
        student_code: lowered
            .iter()
            .position(|h| h.trim() == STUDENT_CODE_HEADER),
        present_pct: lowered.iter().position(|h| h.contains("present %")),
        total_present: lowered.iter().position(|h| h.contains("total present")),
        total_classes: lowered.iter().position(|h| h.contains("total classes")),
    }
}

/// Rewrite each data row's Present % cell from the two totals columns.
/// Parse failures and zero divisors keep the original cell; unresolved
/// roles make the whole stage a no-op.
pub fn recalc_percentages(mut rows: Vec<Vec<CellValue>>, roles: &ColumnRoles) -> Vec<Vec<CellValue>> {
    let (Some(pct_col), Some(tp_col), Some(tc_col)) =
        (roles.present_pct, roles.total_present, roles.total_classes)
    else {
        return rows;
    };

    for row in rows.iter_mut().skip(1) {
        let tp = row.get(tp_col).and_then(CellValue::as_number);
        let tc = row.get(tc_col).and_then(CellValue::as_number);
        if let (Some(tp), Some(tc)) = (tp, tc) {
            if tc != 0.0 {
                if let Some(cell) = row.get_mut(pct_col) {
                    *cell = CellValue::Text(format!("{}%", (tp / tc * 100.0).round() as i64));
                }
            }
        }
    }
    rows
}

/// Synthesize the totals row: a "Total" label, SUM formulas over the data
/// rows for the two totals columns, and a ROUND formula over the totals
/// cells for the Present % column. Cell references are 1-based against the
/// rendered layout (title row 1, header row 2, data from row 3).
pub fn build_totals_row(rows: &[Vec<CellValue>], roles: &ColumnRoles) -> Vec<CellValue> {
    let totals_row = rows.len() + TITLE_ROW_OFFSET;
    let headers = rows.first().map(Vec::as_slice).unwrap_or_default();

    let mut cells = vec![CellValue::Text("Total".to_string())];
    for (idx, header) in headers.iter().enumerate().skip(1) {
        let header_text = header.display().to_lowercase();
        let letter = column_letter(idx + 1);

        let cell = if header_text.contains("total present") || header_text.contains("total classes")
        {
            CellValue::Formula(format!("=SUM({letter}3:{letter}{})", totals_row - 1))
        } else if header_text.contains("present %") {
            match (roles.total_present, roles.total_classes) {
                (Some(tp), Some(tc)) => CellValue::Formula(format!(
                    "=ROUND(({tp_ref}{row}/{tc_ref}{row})*100,0)&\"%\"",
                    tp_ref = column_letter(tp + 1),
                    tc_ref = column_letter(tc + 1),
                    row = totals_row,
                )),
                _ => CellValue::Empty,
            }
        } else {
            CellValue::Empty
        };
        cells.push(cell);
    }
    cells
}

/// Run the full per-sheet transformation. Returns `None` when the sheet has
/// no usable columns or no "Student Code" header.
pub fn summarize_sheet(sheet: &SheetData) -> Option<SummarySheet> {
    let rows = prune_blank_columns(&sheet.rows);
    if rows.is_empty() {
        return None;
    }

    let (header_idx, code_col) = find_header(&rows)?;
    let trimmed = trim_rows(&rows, header_idx, code_col);
    let trimmed = drop_date_group_columns(trimmed);

    let roles = resolve_columns(&trimmed[0]);
    let trimmed = recalc_percentages(trimmed, &roles);

    let totals = build_totals_row(&trimmed, &roles);
    let mut rows = trimmed;
    rows.push(totals);

    Some(SummarySheet {
        title: sheet.name.clone(),
        name: sheet.name.to_uppercase(),
        rows,
    })
}

/// Transform every sheet of the workbook, keeping input order. Sheets
/// without a detectable header contribute nothing.
pub fn summarize_workbook(workbook: &WorkbookData) -> SummaryWorkbook {
    let sheets = workbook
        .sheets
        .iter()
        .filter_map(|sheet| match summarize_sheet(sheet) {
            Some(summary) => {
                tracing::info!(
                    "Summarized sheet {}: {} rows, {} columns",
                    sheet.name,
                    summary.rows.len(),
                    summary.rows.first().map_or(0, Vec::len)
                );
                Some(summary)
            }
            None => {
                tracing::warn!("Sheet {} has no Student Code header, skipping", sheet.name);
                None
            }
        })
        .collect();

    SummaryWorkbook { sheets }
}
