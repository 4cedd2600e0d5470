//! Export rendering: record sequences to delimited text or spreadsheet
//! bytes, and bundling of multiple artifacts into one downloadable zip.

use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(anyhow!(
                "unsupported export format '{}' (expected csv or xlsx)",
                other
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

pub fn render(records: &[Record], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Xlsx => to_xlsx(records),
    }
}

/// Union of column names over all records, in first-seen order. Branch
/// outputs carry slightly different image columns, so the header cannot
/// come from the first record alone.
fn collect_columns(records: &[Record]) -> Vec<String> {
    let mut columns: IndexMap<String, ()> = IndexMap::new();
    for record in records {
        for column in record.columns() {
            columns.entry(column.to_string()).or_insert(());
        }
    }
    columns.into_keys().collect()
}

pub fn to_csv(records: &[Record]) -> Result<Vec<u8>> {
    let columns = collect_columns(records);
    if columns.is_empty() {
        return Err(anyhow!("nothing to export: no columns found"));
    }
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&columns)
        .with_context(|| "failed to write csv header")?;
    for record in records {
        let row: Vec<&str> = columns.iter().map(|column| record.get(column)).collect();
        writer
            .write_record(&row)
            .with_context(|| "failed to write csv row")?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow!("failed to flush csv output: {}", err))
}

/// Minimal single-sheet workbook with inline strings; no shared-string
/// table, no styles.
pub fn to_xlsx(records: &[Record]) -> Result<Vec<u8>> {
    let columns = collect_columns(records);
    if columns.is_empty() {
        return Err(anyhow!("nothing to export: no columns found"));
    }

    let mut sheet_rows: Vec<Vec<&str>> = Vec::with_capacity(records.len() + 1);
    sheet_rows.push(columns.iter().map(String::as_str).collect());
    for record in records {
        sheet_rows.push(columns.iter().map(|column| record.get(column)).collect());
    }
    let sheet = render_sheet_xml(&sheet_rows)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("xl/workbook.xml", WORKBOOK_XML.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_slice()),
    ] {
        writer
            .start_file(name, options)
            .with_context(|| format!("failed to start xlsx entry '{}'", name))?;
        writer
            .write_all(content)
            .with_context(|| format!("failed to write xlsx entry '{}'", name))?;
    }
    Ok(writer
        .finish()
        .with_context(|| "failed to finalize xlsx output")?
        .into_inner())
}

fn render_sheet_xml(rows: &[Vec<&str>]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute((
        "xmlns",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    ));
    writer.write_event(Event::Start(worksheet))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    for (row_number, row) in rows.iter().enumerate() {
        let mut row_start = BytesStart::new("row");
        row_start.push_attribute(("r", (row_number + 1).to_string().as_str()));
        writer.write_event(Event::Start(row_start))?;
        for (column_number, value) in row.iter().enumerate() {
            let mut cell = BytesStart::new("c");
            cell.push_attribute((
                "r",
                format!("{}{}", column_letters(column_number), row_number + 1).as_str(),
            ));
            cell.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(cell))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

/// Spreadsheet column letters for a 0-based index (0 -> A, 26 -> AA).
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Packages named artifacts into one downloadable zip.
pub fn bundle(files: &IndexMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    if files.is_empty() {
        return Err(anyhow!("nothing to bundle"));
    }
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, content) in files {
        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("failed to start bundle entry '{}'", name))?;
        writer
            .write_all(content)
            .with_context(|| format!("failed to write bundle entry '{}'", name))?;
    }
    Ok(writer
        .finish()
        .with_context(|| "failed to finalize bundle")?
        .into_inner())
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Sheet1" sheetId="1" r:id="rId1"/>
  </sheets>
</workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest;

    fn records() -> Vec<Record> {
        vec![
            Record::from_iter([("SKU", "A1"), ("Title", "one"), ("image1", "u1")]),
            Record::from_iter([("SKU", "A2"), ("Title", "two"), ("image2", "u2")]),
        ]
    }

    #[test]
    fn csv_header_is_the_column_union() {
        let bytes = to_csv(&records()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "SKU,Title,image1,image2");
        assert_eq!(lines.next().unwrap(), "A1,one,u1,");
        assert_eq!(lines.next().unwrap(), "A2,two,,u2");
    }

    #[test]
    fn csv_round_trips_through_ingest() {
        let bytes = to_csv(&records()).unwrap();
        let parsed = ingest::parse(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].get("Title"), "one");
        assert_eq!(parsed[1].get("image2"), "u2");
    }

    #[test]
    fn xlsx_round_trips_through_ingest() {
        let bytes = to_xlsx(&records()).unwrap();
        assert!(bytes.starts_with(b"PK"));
        let parsed = ingest::parse(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].get("SKU"), "A1");
        assert_eq!(parsed[1].get("image2"), "u2");
    }

    #[test]
    fn column_letters_cover_two_letter_range() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
    }

    #[test]
    fn bundle_refuses_empty_input() {
        assert!(bundle(&IndexMap::new()).is_err());
        let mut files = IndexMap::new();
        files.insert("Title.csv".to_string(), b"row_index,SKU,Title\n".to_vec());
        let bytes = bundle(&files).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_record_set_is_an_export_error() {
        assert!(to_csv(&[]).is_err());
    }
}
