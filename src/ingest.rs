//! Tabular ingestion: raw file bytes to an ordered record sequence.
//!
//! Column names come from the first row; every cell is a string; fully
//! empty rows are skipped. Cells absent from a row stay absent on the
//! record rather than blank, so downstream drop rules can tell the two
//! apart.

use anyhow::{Context, Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::record::Record;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Parses delimited-text or spreadsheet bytes into records, sniffing the
/// container from the leading bytes.
pub fn parse(bytes: &[u8]) -> Result<Vec<Record>> {
    if bytes.starts_with(ZIP_MAGIC) {
        parse_xlsx(bytes)
    } else {
        parse_csv(bytes)
    }
}

pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .with_context(|| "failed to read csv header row")?
        .clone();
    if headers.is_empty() {
        return Err(anyhow!("csv input has no header row"));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| "failed to parse csv row")?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut record = Record::new();
        for (position, cell) in row.iter().enumerate() {
            let Some(column) = headers.get(position) else {
                break;
            };
            record.set(column, cell);
        }
        records.push(record);
    }
    Ok(records)
}

pub fn parse_xlsx(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).with_context(|| "failed to read xlsx container")?;

    let shared = match read_zip_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_name = first_worksheet_name(&archive)
        .ok_or_else(|| anyhow!("xlsx container has no worksheet"))?;
    let sheet_xml = read_zip_entry(&mut archive, &sheet_name)?
        .ok_or_else(|| anyhow!("failed to read worksheet '{}'", sheet_name))?;
    let rows = parse_worksheet(&sheet_xml, &shared)?;

    rows_to_records(rows)
}

fn rows_to_records(rows: Vec<Vec<Option<String>>>) -> Result<Vec<Record>> {
    let mut iter = rows.into_iter();
    let headers: Vec<String> = loop {
        let Some(row) = iter.next() else {
            return Err(anyhow!("spreadsheet has no header row"));
        };
        if row.iter().flatten().any(|cell| !cell.trim().is_empty()) {
            break row
                .into_iter()
                .map(|cell| cell.unwrap_or_default())
                .collect();
        }
    };

    let mut records = Vec::new();
    for row in iter {
        if !row.iter().flatten().any(|cell| !cell.trim().is_empty()) {
            continue;
        }
        let mut record = Record::new();
        for (position, cell) in row.into_iter().enumerate() {
            let (Some(column), Some(value)) = (headers.get(position), cell) else {
                continue;
            };
            if column.is_empty() {
                continue;
            }
            record.set(column.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

fn first_worksheet_name(archive: &ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    if archive
        .file_names()
        .any(|name| name == "xl/worksheets/sheet1.xml")
    {
        return Some("xl/worksheets/sheet1.xml".to_string());
    }
    let mut candidates: Vec<&str> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/") && name.ends_with(".xml"))
        .collect();
    candidates.sort_unstable();
    candidates.first().map(|name| name.to_string())
}

fn read_zip_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(anyhow!("failed to open zip entry '{}': {}", name, err)),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .with_context(|| format!("failed to read zip entry '{}'", name))?;
    Ok(Some(data))
}

/// Shared-string table: one entry per `<si>`, rich-text runs concatenated.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                current.push_str(&e.unescape()?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(anyhow!("failed to parse shared strings: {}", err)),
        }
        buf.clear();
    }
    Ok(strings)
}

fn parse_worksheet(xml: &[u8], shared: &[String]) -> Result<Vec<Vec<Option<String>>>> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut buf = Vec::new();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut current_row: Vec<Option<String>> = Vec::new();
    let mut cell_column: usize = 0;
    let mut cell_type = String::new();
    let mut cell_text = String::new();
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"row" => current_row = Vec::new(),
                b"c" => {
                    cell_type.clear();
                    cell_text.clear();
                    cell_column = current_row.len();
                    for attr in e.attributes() {
                        let attr =
                            attr.map_err(|err| anyhow!("bad worksheet attribute: {}", err))?;
                        match attr.key.as_ref() {
                            b"r" => {
                                if let Some(column) =
                                    column_from_ref(&String::from_utf8_lossy(&attr.value))
                                {
                                    cell_column = column;
                                }
                            }
                            b"t" => {
                                cell_type = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"row" => rows.push(std::mem::take(&mut current_row)),
                b"c" => {
                    let value = resolve_cell(&cell_type, &cell_text, shared);
                    place_cell(&mut current_row, cell_column, value);
                }
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_value || in_inline_text => {
                cell_text.push_str(&e.unescape()?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(anyhow!("failed to parse worksheet: {}", err)),
        }
        buf.clear();
    }
    Ok(rows)
}

fn resolve_cell(cell_type: &str, text: &str, shared: &[String]) -> Option<String> {
    if cell_type == "s" {
        let index = text.trim().parse::<usize>().ok()?;
        return shared.get(index).cloned();
    }
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn place_cell(row: &mut Vec<Option<String>>, column: usize, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    while row.len() <= column {
        row.push(None);
    }
    row[column] = Some(value);
}

/// 0-based column index from a cell reference like `C5`.
fn column_from_ref(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_become_columns() {
        let bytes = b"SKU,Price,Stock\nA1,10,5\nA2,20,6\n";
        let records = parse(bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("SKU"), "A1");
        assert_eq!(records[1].get("Stock"), "6");
    }

    #[test]
    fn csv_empty_rows_are_skipped() {
        let bytes = b"SKU,Price\nA1,10\n,\n ,\nA2,20\n";
        let records = parse_csv(bytes).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn csv_short_rows_leave_columns_absent() {
        let bytes = b"SKU,Price,Stock\nA1,10\n";
        let records = parse_csv(bytes).unwrap();
        assert!(!records[0].contains("Stock"));
        assert_eq!(records[0].get("Price"), "10");
    }

    #[test]
    fn csv_quoted_cells_keep_embedded_separators() {
        let bytes = b"SKU,Name\nA1,\"Widget, large\"\n";
        let records = parse_csv(bytes).unwrap();
        assert_eq!(records[0].get("Name"), "Widget, large");
    }

    #[test]
    fn column_refs_decode_to_positions() {
        assert_eq!(column_from_ref("A1"), Some(0));
        assert_eq!(column_from_ref("C5"), Some(2));
        assert_eq!(column_from_ref("AA2"), Some(26));
        assert_eq!(column_from_ref("7"), None);
    }

    #[test]
    fn worksheet_rows_resolve_shared_and_inline_strings() {
        let shared = vec!["SKU".to_string(), "Name".to_string(), "A1".to_string()];
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2" t="inlineStr"><is><t>Widget</t></is></c></row>
            <row r="3"><c r="A3"><v>42</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &shared).unwrap();
        let records = rows_to_records(rows).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("SKU"), "A1");
        assert_eq!(records[0].get("Name"), "Widget");
        assert_eq!(records[1].get("SKU"), "42");
        assert!(!records[1].contains("Name"));
    }

    #[test]
    fn sparse_cells_respect_their_column_reference() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>SKU</t></is></c><c r="C1" t="inlineStr"><is><t>Color</t></is></c></row>
            <row r="2"><c r="A2" t="inlineStr"><is><t>A9</t></is></c><c r="C2" t="inlineStr"><is><t>red</t></is></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0][1], None);
        let records = rows_to_records(rows).unwrap();
        assert_eq!(records[0].get("Color"), "red");
    }
}
