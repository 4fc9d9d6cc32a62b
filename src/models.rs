use chrono::NaiveDateTime;

/// A single cell of a parsed workbook. Input formulas arrive pre-evaluated,
/// so `Formula` only ever appears in output grids (totals row).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Formula(String),
}

impl CellValue {
    /// Blank for pruning purposes: absent, empty string, or whitespace-only.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual rendering, used for header matching, the date/group
    /// heuristic and column-width measurement.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Formula(f) => f.clone(),
        }
    }

    /// Numeric reading for the percentage recomputation: numbers pass
    /// through, text cells get a trimmed f64 parse, everything else fails.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

/// One raw input sheet: name plus its grid of cells.
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// A parsed input workbook, sheets in file order.
#[derive(Debug, Clone)]
pub struct WorkbookData {
    pub sheets: Vec<SheetData>,
}

/// Indices of the semantically relevant columns of a trimmed sheet.
/// Any of them may be unresolved; dependent stages degrade gracefully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRoles {
    pub student_code: Option<usize>,
    pub present_pct: Option<usize>,
    pub total_present: Option<usize>,
    pub total_classes: Option<usize>,
}

/// A fully transformed sheet ready for rendering. `rows[0]` is the header
/// row, the last row is the synthesized totals row.
#[derive(Debug, Clone)]
pub struct SummarySheet {
    /// Original sheet name, shown in the merged title row.
    pub title: String,
    /// Output sheet name (original, uppercased).
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone)]
pub struct SummaryWorkbook {
    pub sheets: Vec<SummarySheet>,
}
