//! Workbook implementation for XLS files

use std::io::Cursor;

use crate::ole::codepage;
use crate::ole::file::{OleError, OleFile};
use crate::ole::xls::cell::CellValue;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::records::{
    id, read_u16, BofRecord, BoundSheetRecord, CellRecord, Record, RecordIter, RowRecord,
    SharedStringTable, StringDecoder, BOF_GLOBALS, SHEET_TYPE_WORKSHEET,
};
use crate::ole::xls::worksheet::XlsWorksheet;

/// Parsed XLS workbook
///
/// All worksheets are decoded eagerly; the container is dropped once the
/// workbook stream has been read.
#[derive(Debug, Clone)]
pub struct XlsWorkbook {
    sheets: Vec<XlsWorksheet>,
    codepage: u16,
}

/// Workbook-level state gathered from the globals substream
struct Globals {
    decoder: StringDecoder,
    bound_sheets: Vec<BoundSheetRecord>,
    sst: SharedStringTable,
}

impl XlsWorkbook {
    /// Parse a workbook from the raw bytes of an `.xls` file.
    ///
    /// `fallback_codepage` decodes 8-bit strings when the workbook has no
    /// CODEPAGE record (or names one that cannot be decoded).
    pub fn from_bytes(bytes: &[u8], fallback_codepage: u16) -> XlsResult<Self> {
        if codepage::codepage_to_encoding(fallback_codepage).is_none() {
            return Err(XlsError::UnsupportedCodepage(fallback_codepage));
        }

        let mut ole = OleFile::open(Cursor::new(bytes))?;
        let stream = match ole.open_stream("Workbook") {
            Ok(stream) => stream,
            Err(OleError::StreamNotFound(_)) => match ole.open_stream("Book") {
                Ok(stream) => stream,
                Err(OleError::StreamNotFound(_)) => return Err(XlsError::MissingWorkbookStream),
                Err(e) => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        };

        Self::from_stream(&stream, fallback_codepage)
    }

    /// Parse an already extracted BIFF workbook stream
    pub fn from_stream(stream: &[u8], fallback_codepage: u16) -> XlsResult<Self> {
        let globals = parse_globals(stream, fallback_codepage)?;

        let mut sheets = Vec::with_capacity(globals.bound_sheets.len());
        for bound in &globals.bound_sheets {
            if bound.sheet_type != SHEET_TYPE_WORKSHEET {
                tracing::debug!(sheet = %bound.name, kind = bound.sheet_type, "skipping non-worksheet");
                continue;
            }
            sheets.push(parse_worksheet(stream, bound, &globals)?);
        }

        Ok(XlsWorkbook {
            sheets,
            codepage: globals.decoder.codepage,
        })
    }

    /// Worksheets in workbook order
    pub fn sheets(&self) -> &[XlsWorksheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(XlsWorksheet::name).collect()
    }

    /// Codepage used for 8-bit strings
    pub fn codepage(&self) -> u16 {
        self.codepage
    }
}

fn parse_globals(stream: &[u8], fallback_codepage: u16) -> XlsResult<Globals> {
    let mut records = RecordIter::new(stream);

    let first = records
        .next()
        .ok_or(XlsError::UnexpectedEndOfStream("workbook globals"))??;
    if first.record_type != id::BOF {
        return Err(XlsError::InvalidRecord {
            record_type: first.record_type,
            message: "workbook stream does not start with BOF".to_string(),
        });
    }
    let bof = BofRecord::parse(first.data)?;
    if bof.substream != BOF_GLOBALS {
        return Err(XlsError::InvalidRecord {
            record_type: id::BOF,
            message: format!("expected globals substream, found 0x{:04X}", bof.substream),
        });
    }

    let mut decoder = StringDecoder {
        version: bof.version,
        codepage: fallback_codepage,
    };
    let mut bound_sheets = Vec::new();
    let mut sst_segments: Vec<&[u8]> = Vec::new();
    let mut in_sst = false;

    for record in records {
        let record = record?;
        if in_sst && record.record_type == id::CONTINUE {
            sst_segments.push(record.data);
            continue;
        }
        in_sst = false;

        match record.record_type {
            id::CODEPAGE => {
                let declared = read_u16(record.data, 0)?;
                if codepage::codepage_to_encoding(declared).is_some() {
                    decoder.codepage = declared;
                } else {
                    tracing::warn!(declared, fallback = fallback_codepage, "unsupported CODEPAGE, using fallback");
                }
            }
            id::BOUNDSHEET => bound_sheets.push(BoundSheetRecord::parse(record.data, &decoder)?),
            id::SST => {
                sst_segments.clear();
                sst_segments.push(record.data);
                in_sst = true;
            }
            id::EOF => break,
            _ => {}
        }
    }

    let sst = SharedStringTable::parse(&sst_segments, &decoder);
    Ok(Globals {
        decoder,
        bound_sheets,
        sst,
    })
}

fn parse_worksheet(
    stream: &[u8],
    bound: &BoundSheetRecord,
    globals: &Globals,
) -> XlsResult<XlsWorksheet> {
    let position = bound.position as usize;
    if position >= stream.len() {
        return Err(XlsError::InvalidRecord {
            record_type: id::BOUNDSHEET,
            message: format!("sheet '{}' starts beyond the stream", bound.name),
        });
    }

    let mut sheet = XlsWorksheet::new(bound.name.clone());
    let mut records = RecordIter::at(stream, position);

    match records.next() {
        Some(Ok(Record {
            record_type: id::BOF,
            ..
        })) => {}
        Some(Err(e)) => return Err(e),
        _ => {
            return Err(XlsError::InvalidRecord {
                record_type: id::BOUNDSHEET,
                message: format!("sheet '{}' does not start with BOF", bound.name),
            });
        }
    }

    // FORMULA cell waiting for its STRING record
    let mut pending: Option<(u32, u16)> = None;

    for record in records {
        let record = record?;
        match record.record_type {
            id::EOF => break,
            id::ROW => {
                let row = RowRecord::parse(record.data)?;
                sheet.declare_row(row.row, row.col_end);
            }
            id::STRING => {
                if let Some((row, col)) = pending.take() {
                    let (text, _) = globals.decoder.unicode_string(record.data, 0)?;
                    sheet.set_cell(row, col, CellValue::from(text.as_str()));
                }
            }
            _ => {
                for cell in CellRecord::parse(&record, &globals.decoder)? {
                    apply_cell(&mut sheet, cell, &globals.sst, &mut pending);
                }
            }
        }
    }

    Ok(sheet)
}

fn apply_cell(
    sheet: &mut XlsWorksheet,
    cell: CellRecord,
    sst: &SharedStringTable,
    pending: &mut Option<(u32, u16)>,
) {
    match cell {
        CellRecord::Blank { row, col } => sheet.set_cell(row, col, CellValue::Empty),
        CellRecord::Text { row, col, text } => sheet.set_cell(row, col, CellValue::Text(text)),
        CellRecord::SharedString { row, col, index } => {
            let value = match sst.strings.get(index as usize) {
                Some(text) => CellValue::Text(text.clone()),
                None => {
                    tracing::debug!(row, col, index, "SST index out of range");
                    CellValue::Empty
                }
            };
            sheet.set_cell(row, col, value);
        }
        CellRecord::Number { row, col, value } => sheet.set_cell(row, col, CellValue::Number(value)),
        CellRecord::Bool { row, col, value } => sheet.set_cell(row, col, CellValue::Bool(value)),
        CellRecord::Error { row, col, code } => sheet.set_cell(row, col, CellValue::Error(code)),
        CellRecord::PendingString { row, col } => {
            sheet.set_cell(row, col, CellValue::Empty);
            *pending = Some((row, col));
        }
    }
}
