//! Workbook writer.
//!
//! Single pass per sheet; shared strings, number formats and the
//! cell-style pool are accumulated while cells are emitted and the parts
//! that depend on them (`sharedStrings.xml`, `styles.xml`, the workbook
//! relationships) are written last, once their contents are fully known.
//! Zip entries are stored uncompressed, matching the writer this is
//! grounded on: faster to write, and more compressible later if the whole
//! data directory is archived outside.

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::column::cell_reference;
use crate::error::WorkbookError;
use crate::style::{self, Style};
use crate::value::{bytes_to_hex, format_float, CellValue};

/// A worksheet's sparse cell grid, ordered by `(row, column)`. Iterating a
/// `BTreeMap` already yields cells in the writer's required non-decreasing
/// row / strictly increasing column order.
pub type CellGrid = BTreeMap<(u32, u32), CellValue>;

/// Per-cell styling hook: called once per populated cell with the sheet
/// name, zero-based row and column, and the value about to be written. The
/// callback mutates an initially-reset style object; its `number_format`,
/// if set, overrides the writer's own default for the value's type.
///
/// Row-wide and column-wide defaults are queried separately, once per
/// distinct column (`row == -1`) and once per distinct row (`column ==
/// -1`), at the start of each sheet, with `value` set to [`CellValue::Absent`].
/// A per-cell invocation that leaves `number_format` unset falls back to
/// its column default, then its row default, then the writer's own
/// type-based default.
pub type Styler<'a> = dyn FnMut(&mut Style, &str, i64, i64, &CellValue) + 'a;

/// Writes `sheets` (in order) as an Office Open XML workbook to `writer`.
pub fn write<W: Write + Seek>(writer: W, sheets: &[(String, CellGrid)]) -> Result<(), WorkbookError> {
    write_styled(writer, sheets, None)
}

/// As [`write`], writing to a file at `path` (truncating it if it exists).
pub fn write_path<P: AsRef<std::path::Path>>(path: P, sheets: &[(String, CellGrid)]) -> Result<(), WorkbookError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|source| WorkbookError::Io { path: path.to_path_buf(), source })?;
    write(std::io::BufWriter::new(file), sheets)
}

/// As [`write`], with a per-cell styler callback.
pub fn write_styled<W: Write + Seek>(
    writer: W,
    sheets: &[(String, CellGrid)],
    mut styler: Option<&mut Styler<'_>>,
) -> Result<(), WorkbookError> {
    let mut shared_strings: Vec<String> = Vec::new();
    let mut shared_string_index: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

    let mut custom_formats: Vec<String> = Vec::new();
    let mut custom_format_index: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

    // xf (style) pool: index 0 is the fixed General default; subsequent
    // entries map 1:1 to a distinct number format id.
    let mut style_format_ids: Vec<u32> = Vec::new();
    let mut style_index_of_format_id: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();

    let mut intern_string = |s: &str| -> u32 {
        if let Some(&i) = shared_string_index.get(s) {
            return i;
        }
        let i = shared_strings.len() as u32;
        shared_strings.push(s.to_string());
        shared_string_index.insert(s.to_string(), i);
        i
    };

    let mut format_id_for_code = |code: &str| -> u32 {
        if let Some(id) = style::builtin_format_code_id(code) {
            return id;
        }
        if let Some(&id) = custom_format_index.get(code) {
            return id;
        }
        let id = 164 + custom_formats.len() as u32;
        custom_formats.push(code.to_string());
        custom_format_index.insert(code.to_string(), id);
        id
    };

    let mut style_index_for_format_id = |format_id: u32| -> u32 {
        if format_id == 0 {
            return 0;
        }
        if let Some(&idx) = style_index_of_format_id.get(&format_id) {
            return idx;
        }
        let idx = 1 + style_format_ids.len() as u32;
        style_format_ids.push(format_id);
        style_index_of_format_id.insert(format_id, idx);
        idx
    };

    let mut sheet_bodies: Vec<String> = Vec::with_capacity(sheets.len());

    for (sheet_name, grid) in sheets {
        let mut body = String::new();
        body.push_str(SHEET_HEADER);

        // Row/column-wide defaults, queried once per distinct index before
        // any cell is emitted, per the styler's row=-1/column=-1 contract.
        let mut column_defaults: std::collections::HashMap<u32, Style> = std::collections::HashMap::new();
        let mut row_defaults: std::collections::HashMap<u32, Style> = std::collections::HashMap::new();
        if let Some(cb) = styler.as_mut() {
            let columns: std::collections::BTreeSet<u32> = grid.keys().map(|&(_, col)| col).collect();
            for col in columns {
                let mut style = Style::default();
                cb(&mut style, sheet_name, -1, col as i64, &CellValue::Absent);
                column_defaults.insert(col, style);
            }
            let rows: std::collections::BTreeSet<u32> = grid.keys().map(|&(row, _)| row).collect();
            for row in rows {
                let mut style = Style::default();
                cb(&mut style, sheet_name, row as i64, -1, &CellValue::Absent);
                row_defaults.insert(row, style);
            }
        }

        let mut last: Option<(u32, u32)> = None;
        let mut row_open: Option<u32> = None;

        for (&(row, col), value) in grid.iter() {
            if let Some((pr, pc)) = last {
                if row < pr || (row == pr && col <= pc) {
                    return Err(WorkbookError::OutOfOrder { row, column: col });
                }
            }
            last = Some((row, col));

            if row_open != Some(row) {
                if row_open.is_some() {
                    body.push_str("</row>");
                }
                body.push_str(&format!("<row r=\"{}\">", row + 1));
                row_open = Some(row);
            }

            let mut style = Style::default();
            if let Some(cb) = styler.as_mut() {
                cb(&mut style, sheet_name, row as i64, col as i64, value);
            }
            if style.number_format.is_none() {
                style.number_format = row_defaults.get(&row).and_then(|s| s.number_format.clone());
            }
            if style.number_format.is_none() {
                style.number_format = column_defaults.get(&col).and_then(|s| s.number_format.clone());
            }
            if style.number_format.is_none() {
                style.number_format = default_format_for(value);
            }

            let format_id = style.number_format.as_deref().map(|c| format_id_for_code(c)).unwrap_or(0);
            let style_idx = style_index_for_format_id(format_id);

            let reference = cell_reference(row, col);
            let cell_xml = cell_to_xml(value, style_idx, &mut intern_string);
            body.push_str(&format!("<c r=\"{reference}\" {cell_xml}</c>"));
        }
        if row_open.is_some() {
            body.push_str("</row>");
        }
        body.push_str("</sheetData></worksheet>");
        sheet_bodies.push(body);
    }

    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml(sheets.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(PACKAGE_RELS_XML.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(sheets).as_bytes())?;

    for (i, body) in sheet_bodies.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(body.as_bytes())?;
    }

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels_xml(sheets.len()).as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(styles_xml(&custom_formats, &style_format_ids).as_bytes())?;

    // Written last: only known fully once every cell has been emitted.
    zip.start_file("xl/sharedStrings.xml", options)?;
    zip.write_all(shared_strings_xml(&shared_strings).as_bytes())?;

    zip.finish()?;
    Ok(())
}

fn default_format_for(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Int(_) => Some(style::INTEGER_FORMAT_CODE.to_string()),
        CellValue::DateTime(_) => Some(style::DATE_TIME_FORMAT_CODE.to_string()),
        CellValue::Bytes(_) => Some(style::BYTES_FORMAT_CODE.to_string()),
        _ => None,
    }
}

fn cell_to_xml(value: &CellValue, style_idx: u32, intern: &mut impl FnMut(&str) -> u32) -> String {
    let s_attr = if style_idx == 0 { String::new() } else { format!("s=\"{style_idx}\" ") };
    match value {
        CellValue::Absent => format!("{s_attr}t=\"e\"><v>#N/A</v>"),
        CellValue::Bool(b) => format!("{s_attr}t=\"b\"><v>{}</v>", if *b { 1 } else { 0 }),
        CellValue::Int(i) => format!("{s_attr}><v>{i}</v>"),
        CellValue::Float(f) if f.is_nan() => format!("{s_attr}t=\"e\"><v>#NUM!</v>"),
        CellValue::Float(f) if f.is_infinite() => format!("{s_attr}t=\"e\"><v>#DIV/0!</v>"),
        CellValue::Float(f) => format!("{s_attr}><v>{}</v>", format_float(*f)),
        CellValue::DateTime(days) => format!("{s_attr}><v>{}</v>", format_float(*days)),
        CellValue::Str(text) => {
            let idx = intern(text);
            format!("{s_attr}t=\"s\"><v>{idx}</v>")
        }
        CellValue::Bytes(bytes) => {
            let idx = intern(&bytes_to_hex(bytes));
            format!("{s_attr}t=\"s\"><v>{idx}</v>")
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

const SHEET_HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
    "<sheetData>",
);

const PACKAGE_RELS_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" ",
    "Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" ",
    "Target=\"xl/workbook.xml\"/></Relationships>",
);

fn content_types_xml(sheet_count: usize) -> String {
    let overrides: String = (1..=sheet_count)
        .map(|i| {
            format!(
                "<Override PartName=\"/xl/worksheets/sheet{i}.xml\" \
                 ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         {overrides}\
         <Override PartName=\"/xl/styles.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
         <Override PartName=\"/xl/sharedStrings.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>\
         </Types>"
    )
}

fn workbook_xml(sheets: &[(String, CellGrid)]) -> String {
    let entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>", xml_escape(name), i + 1, i + 1))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <workbookPr/><sheets>{entries}</sheets><calcPr calcId=\"114514\"/></workbook>"
    )
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let sheet_rels: String = (1..=sheet_count)
        .map(|i| {
            format!(
                "<Relationship Id=\"rId{i}\" \
                 Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
                 Target=\"worksheets/sheet{i}.xml\"/>"
            )
        })
        .collect();
    let styles_id = sheet_count + 1;
    let strings_id = sheet_count + 2;
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         {sheet_rels}\
         <Relationship Id=\"rId{styles_id}\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\
         <Relationship Id=\"rId{strings_id}\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\" \
         Target=\"sharedStrings.xml\"/>\
         </Relationships>"
    )
}

fn shared_strings_xml(pool: &[String]) -> String {
    let items: String = pool.iter().map(|s| format!("<si><t>{}</t></si>", xml_escape(s))).collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <sst uniqueCount=\"{0}\" count=\"{0}\" \
         xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xml:space=\"preserve\">{1}</sst>",
        pool.len(),
        items
    )
}

fn styles_xml(custom_formats: &[String], style_format_ids: &[u32]) -> String {
    let num_fmts: String = custom_formats
        .iter()
        .enumerate()
        .map(|(i, code)| format!("<numFmt numFmtId=\"{}\" formatCode=\"{}\"/>", 164 + i, xml_escape(code)))
        .collect();

    let xfs: String = style_format_ids
        .iter()
        .map(|id| format!("<xf numFmtId=\"{id}\" fontId=\"0\" fillId=\"0\" borderId=\"0\" applyNumberFormat=\"1\"/>"))
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <numFmts count=\"{}\">{num_fmts}</numFmts>\
         <fonts count=\"1\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
         <fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill>\
         <fill><patternFill patternType=\"gray125\"/></fill></fills>\
         <borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
         <cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
         <cellXfs count=\"{}\">\
         <xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>\
         {xfs}\
         </cellXfs>\
         </styleSheet>",
        custom_formats.len(),
        1 + style_format_ids.len(),
    )
}
