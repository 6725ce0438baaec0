//! Workbook reader.
//!
//! Reads the subset of Office Open XML spreadsheets this crate's writer
//! produces, and tolerates the same subset in workbooks produced by other
//! software: fixed part names, an optional shared-string table, an
//! optional styles part, and cells addressed in `A1` or `R1C1` form.

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

use crate::column::parse_cell_reference;
use crate::error::WorkbookError;
use crate::style;
use crate::value::{hex_to_bytes, CellValue};
use crate::writer::CellGrid;

/// Reads every worksheet out of an Office Open XML workbook, in the order
/// they're listed in the workbook part.
pub fn read<R: Read + Seek>(reader: R) -> Result<Vec<(String, CellGrid)>, WorkbookError> {
    let mut archive = zip::ZipArchive::new(reader)?;

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| WorkbookError::MissingPart("xl/workbook.xml".to_string()))?;
    let sheet_list = parse_workbook_sheets(&workbook_xml)?;

    let rels_xml = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let rel_targets = rels_xml.as_deref().map(parse_relationships).transpose()?.unwrap_or_default();

    let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let (num_formats, cell_xfs) = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_styles(&xml)?,
        None => (HashMap::new(), Vec::new()),
    };

    let mut sheets = Vec::with_capacity(sheet_list.len());
    for (name, r_id) in sheet_list {
        let target = rel_targets
            .get(&r_id)
            .ok_or_else(|| WorkbookError::MissingPart(format!("relationship {r_id} for sheet {name}")))?;
        let part_name = normalize_part_path(target);
        let sheet_xml = read_part(&mut archive, &part_name)?
            .ok_or_else(|| WorkbookError::MissingPart(part_name.clone()))?;
        let grid = parse_worksheet(&sheet_xml, &shared_strings, &num_formats, &cell_xfs)?;
        sheets.push((name, grid));
    }

    Ok(sheets)
}

/// As [`read`], opening a workbook file at `path`.
pub fn read_path<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<(String, CellGrid)>, WorkbookError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| WorkbookError::Io { path: path.to_path_buf(), source })?;
    read(std::io::BufReader::new(file))
}

fn normalize_part_path(target: &str) -> String {
    if target.starts_with("xl/") || target.starts_with('/') {
        target.trim_start_matches('/').to_string()
    } else {
        format!("xl/{target}")
    }
}

fn read_part<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Result<Option<String>, WorkbookError> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(WorkbookError::Zip(e)),
    };
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(|source| WorkbookError::Io { path: name.into(), source })?;
    Ok(Some(text))
}

fn xml_reader(xml: &str) -> XmlReader<&[u8]> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    reader
}

fn attr_value(tag: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    tag.attributes().flatten().find(|a| a.key.as_ref() == key).map(|a| a.unescape_value().unwrap_or_default().into_owned())
}

fn parse_workbook_sheets(xml: &str) -> Result<Vec<(String, String)>, WorkbookError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|source| WorkbookError::Xml { part: "xl/workbook.xml".into(), source })? {
            Event::Empty(tag) | Event::Start(tag) if tag.name().as_ref() == b"sheet" => {
                let name = attr_value(&tag, b"name").unwrap_or_default();
                let r_id = attr_value(&tag, b"r:id").unwrap_or_default();
                sheets.push((name, r_id));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, WorkbookError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut rels = HashMap::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|source| WorkbookError::Xml { part: "xl/_rels/workbook.xml.rels".into(), source })?
        {
            Event::Empty(tag) | Event::Start(tag) if tag.name().as_ref() == b"Relationship" => {
                let id = attr_value(&tag, b"Id").unwrap_or_default();
                let target = attr_value(&tag, b"Target").unwrap_or_default();
                rels.insert(id, target);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, WorkbookError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut depth_in_si = false;
    let mut current = String::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|source| WorkbookError::Xml { part: "xl/sharedStrings.xml".into(), source })?
        {
            Event::Start(tag) if tag.name().as_ref() == b"si" => {
                depth_in_si = true;
                current.clear();
            }
            Event::End(tag) if tag.name().as_ref() == b"si" => {
                depth_in_si = false;
                strings.push(std::mem::take(&mut current));
            }
            Event::Text(text) if depth_in_si => {
                current.push_str(&text.unescape().unwrap_or_default());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// `cellXfs[i]` is the number-format id a cell's `s` attribute of `i`
/// resolves to.
type CellXfs = Vec<u32>;

fn parse_styles(xml: &str) -> Result<(HashMap<u32, String>, CellXfs), WorkbookError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut num_formats = HashMap::new();
    let mut cell_xfs = Vec::new();
    let mut in_cell_xfs = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(|source| WorkbookError::Xml { part: "xl/styles.xml".into(), source })? {
            Event::Empty(tag) | Event::Start(tag) if tag.name().as_ref() == b"numFmt" => {
                let id: u32 = attr_value(&tag, b"numFmtId").and_then(|v| v.parse().ok()).unwrap_or(0);
                let code = attr_value(&tag, b"formatCode").unwrap_or_default();
                num_formats.insert(id, code);
            }
            Event::Start(tag) if tag.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(tag) if tag.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Empty(tag) | Event::Start(tag) if in_cell_xfs && tag.name().as_ref() == b"xf" => {
                let id: u32 = attr_value(&tag, b"numFmtId").and_then(|v| v.parse().ok()).unwrap_or(0);
                cell_xfs.push(id);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok((num_formats, cell_xfs))
}

fn format_code_for(style_idx: u32, num_formats: &HashMap<u32, String>, cell_xfs: &CellXfs) -> String {
    let format_id = cell_xfs.get(style_idx as usize).copied().unwrap_or(0);
    if let Some(code) = style::builtin_format_code(format_id) {
        return code.to_string();
    }
    num_formats.get(&format_id).cloned().unwrap_or_else(|| "General".to_string())
}

fn decode_numeric(text: &str, format_code: &str) -> CellValue {
    let parsed: f64 = text.trim().parse().unwrap_or(f64::NAN);
    if style::is_date_time_format(format_code) {
        CellValue::DateTime(parsed)
    } else if style::forbids_decimal_point(format_code) && !text.contains('.') {
        CellValue::Int(parsed as i64)
    } else {
        CellValue::Float(parsed)
    }
}

fn decode_error(text: &str) -> CellValue {
    match text.trim() {
        "#N/A" => CellValue::Absent,
        _ => CellValue::Float(f64::NAN),
    }
}

fn parse_worksheet(
    xml: &str,
    shared_strings: &[String],
    num_formats: &HashMap<u32, String>,
    cell_xfs: &CellXfs,
) -> Result<CellGrid, WorkbookError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut grid = CellGrid::new();

    let mut cell_ref: Option<(u32, u32)> = None;
    let mut cell_type = String::new();
    let mut style_idx: u32 = 0;
    let mut value_text = String::new();
    let mut in_value = false;
    let mut in_inline_string = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|source| WorkbookError::Xml { part: "worksheet".into(), source })?
        {
            Event::Start(tag) | Event::Empty(tag) if tag.name().as_ref() == b"c" => {
                let r = attr_value(&tag, b"r").unwrap_or_default();
                cell_ref = Some(parse_cell_reference(&r)?);
                cell_type = attr_value(&tag, b"t").unwrap_or_default();
                style_idx = attr_value(&tag, b"s").and_then(|v| v.parse().ok()).unwrap_or(0);
                value_text.clear();
            }
            Event::Start(tag) if tag.name().as_ref() == b"v" => {
                in_value = true;
                value_text.clear();
            }
            Event::End(tag) if tag.name().as_ref() == b"v" => {
                in_value = false;
            }
            Event::Start(tag) if tag.name().as_ref() == b"t" && cell_type == "inlineStr" => {
                in_inline_string = true;
                value_text.clear();
            }
            Event::End(tag) if tag.name().as_ref() == b"t" => {
                in_inline_string = false;
            }
            Event::Text(text) if in_value || in_inline_string => {
                value_text.push_str(&text.unescape().unwrap_or_default());
            }
            Event::End(tag) if tag.name().as_ref() == b"c" => {
                if let Some((row, col)) = cell_ref.take() {
                    if !value_text.is_empty() || cell_type == "b" || cell_type == "e" {
                        let value = match cell_type.as_str() {
                            "e" => decode_error(&value_text),
                            "b" => CellValue::Bool(value_text.trim() == "1"),
                            "s" => {
                                let idx: usize = value_text.trim().parse().unwrap_or(0);
                                let text = shared_strings.get(idx).cloned().unwrap_or_default();
                                let format_code = format_code_for(style_idx, num_formats, cell_xfs);
                                if style::is_bytes_format(&format_code) {
                                    CellValue::Bytes(hex_to_bytes(&text))
                                } else {
                                    CellValue::Str(text)
                                }
                            }
                            "str" | "inlineStr" => CellValue::Str(value_text.clone()),
                            _ => {
                                let format_code = format_code_for(style_idx, num_formats, cell_xfs);
                                decode_numeric(&value_text, &format_code)
                            }
                        };
                        grid.insert((row, col), value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(grid)
}
