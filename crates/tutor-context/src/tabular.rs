use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

/// Shape and preview of a CSV upload. Quoted cells may hold commas, doubled
/// quotes and line breaks; rows of uneven length are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSummary {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub preview: Vec<String>,
}

impl CsvSummary {
    /// `Ok(None)` when there is no header row.
    pub fn parse(content: &str, preview_rows: usize) -> csv::Result<Option<Self>> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.iter().all(String::is_empty) {
            return Ok(None);
        }

        let mut row_count = 0;
        let mut preview = Vec::with_capacity(preview_rows);
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            if preview.len() < preview_rows {
                preview.push(preview_line(&record)?);
            }
            row_count += 1;
        }

        Ok(Some(Self {
            columns,
            row_count,
            preview,
        }))
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Columns ({}): {}\nRows: {}",
            self.columns.len(),
            self.columns.join(", "),
            self.row_count
        );
        if !self.preview.is_empty() {
            out.push_str(&format!("\nFirst {} rows:\n", self.preview.len()));
            out.push_str(&self.preview.join("\n"));
        }
        out
    }
}

// Re-quoted so a preview row reads as the record it came from.
fn preview_line(record: &StringRecord) -> csv::Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(record)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_header() {
        let summary = CsvSummary::parse("\"last, first\",\"say \"\"hi\"\"\",age\n\"Doe, J\",x,3\n", 5)
            .unwrap()
            .unwrap();
        assert_eq!(summary.columns, vec!["last, first", "say \"hi\"", "age"]);
        assert_eq!(summary.row_count, 1);
        assert_eq!(summary.preview, vec!["\"Doe, J\",x,3"]);
    }

    #[test]
    fn test_quoted_line_break_stays_in_one_row() {
        let summary = CsvSummary::parse("id,note\n1,\"line one\nline two\"\n2,x\n", 5)
            .unwrap()
            .unwrap();
        assert_eq!(summary.columns, vec!["id", "note"]);
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.preview[0], "1,\"line one\nline two\"");
        assert_eq!(summary.preview[1], "2,x");
    }

    #[test]
    fn test_blank_lines_crlf_and_ragged_rows() {
        let summary = CsvSummary::parse("\u{feff}a,b\r\n1,2\r\n\r\n3,4,5\r\n", 1)
            .unwrap()
            .unwrap();
        assert_eq!(summary.columns, vec!["a", "b"]);
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.preview, vec!["1,2"]);
    }

    #[test]
    fn test_header_only() {
        let summary = CsvSummary::parse("x,y,z", 3).unwrap().unwrap();
        assert_eq!(summary.row_count, 0);
        assert_eq!(summary.render(), "Columns (3): x, y, z\nRows: 0");
    }

    #[test]
    fn test_empty_input() {
        assert!(CsvSummary::parse("\n\n", 3).unwrap().is_none());
        assert!(CsvSummary::parse("", 3).unwrap().is_none());
    }
}
