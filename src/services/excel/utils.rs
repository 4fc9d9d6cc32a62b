use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CellValue;

static NON_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid filename regex"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Heuristic for columns that carry per-session dates or group labels
/// rather than student data: anything mentioning "group", or anything with
/// a digit next to a date/time separator.
pub fn is_date_or_group(value: &CellValue) -> bool {
    let val = value.display().to_lowercase();
    val.contains("group")
        || (val.chars().any(|c| c.is_ascii_digit())
            && (val.contains('/')
                || val.contains('-')
                || val.contains(':')
                || val.matches('-').count() >= 2))
}

/// 1-based column index to spreadsheet letters: 1 -> A, 26 -> Z, 27 -> AA.
pub fn column_letter(mut column: usize) -> String {
    let mut letters = String::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters
}

/// Strip everything outside `[\w\s-]`, then collapse whitespace runs to `_`.
pub fn sanitize_filename(name: &str) -> String {
    let stripped = NON_FILENAME_CHARS.replace_all(name, "");
    WHITESPACE_RUNS.replace_all(stripped.trim(), "_").into_owned()
}

/// Timestamped name for a formatted workbook, derived from the uploaded
/// filename's stem.
pub fn output_filename(original: &str) -> String {
    let stem = std::path::Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attendance".to_string());
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("Formatted_{}_{}.xlsx", sanitize_filename(&stem), timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("".to_string()).is_blank());
        assert!(CellValue::Text(" ".to_string()).is_blank());
        assert!(!CellValue::Text("x".to_string()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn date_or_group_detection() {
        assert!(is_date_or_group(&CellValue::Text("Group".to_string())));
        assert!(is_date_or_group(&CellValue::Text("Group A".to_string())));
        assert!(is_date_or_group(&CellValue::Text("01/02".to_string())));
        assert!(is_date_or_group(&CellValue::Text("2024-01-05 00:00:00".to_string())));
        assert!(is_date_or_group(&CellValue::Text("10:30".to_string())));

        assert!(!is_date_or_group(&CellValue::Text("Student Code".to_string())));
        assert!(!is_date_or_group(&CellValue::Text("Total Present".to_string())));
        assert!(!is_date_or_group(&CellValue::Text("Present %".to_string())));
        assert!(!is_date_or_group(&CellValue::Empty));
        // a dash without any digit is not a date
        assert!(!is_date_or_group(&CellValue::Text("Roll-call".to_string())));
        // a bare number without a separator is not a date
        assert!(!is_date_or_group(&CellValue::Number(42.0)));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(28), "AB");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(53), "BA");
    }

    #[test]
    fn filename_sanitization() {
        assert_eq!(sanitize_filename("CSE Attendance (March)"), "CSE_Attendance_March");
        assert_eq!(sanitize_filename("a  b\tc"), "a_b_c");
        assert_eq!(sanitize_filename("report-2024"), "report-2024");
    }

    #[test]
    fn output_filename_shape() {
        let name = output_filename("My Report.xlsx");
        assert!(name.starts_with("Formatted_My_Report_"));
        assert!(name.ends_with(".xlsx"));
    }

    #[test]
    fn number_parsing() {
        assert_eq!(CellValue::Number(18.0).as_number(), Some(18.0));
        assert_eq!(CellValue::Text("20".to_string()).as_number(), Some(20.0));
        assert_eq!(CellValue::Text(" 7.5 ".to_string()).as_number(), Some(7.5));
        assert_eq!(CellValue::Text("n/a".to_string()).as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }
}
