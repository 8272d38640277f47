use std::io::Cursor;

use calamine::{Data, Reader};

use crate::services::import::parser::ImportError;

pub(crate) fn rows_from_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader =
        csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(ImportError::UnreadableCsv)?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(rows)
}

pub(crate) fn rows_from_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| ImportError::UnreadableWorkbook(err.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::UnreadableWorkbook("workbook has no sheets".to_string()))?
        .map_err(|err| ImportError::UnreadableWorkbook(err.to_string()))?;

    Ok(range.rows().map(|row| row.iter().map(cell_to_string).collect()).collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        // spreadsheet numbers arrive as floats; order numbers and answers
        // must not render as "1.0"
        Data::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value.as_f64().to_string(),
        Data::DateTimeIso(value) => value.clone(),
        Data::DurationIso(value) => value.clone(),
        Data::Error(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_keep_ragged_widths() {
        let csv = "a,b,c\n1,2\nx,y,z,w\n";
        let rows = rows_from_csv(csv.as_bytes()).expect("csv");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["a", "b", "c"]);
        assert_eq!(rows[1], vec!["1", "2"]);
        assert_eq!(rows[2], vec!["x", "y", "z", "w"]);
    }

    #[test]
    fn csv_preserves_quoted_commas() {
        let csv = "no,question\n1,\"What, exactly?\"\n";
        let rows = rows_from_csv(csv.as_bytes()).expect("csv");
        assert_eq!(rows[1][1], "What, exactly?");
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        let err = rows_from_workbook(b"definitely not a spreadsheet").unwrap_err();
        assert!(matches!(err, ImportError::UnreadableWorkbook(_)));
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(3.5)), "3.5");
        assert_eq!(cell_to_string(&Data::String("B".to_string())), "B");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
