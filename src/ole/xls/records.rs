//! BIFF record parsing for XLS files
//!
//! This module handles the parsing of BIFF (Binary Interchange File Format)
//! records used in Excel XLS files. Only the records that carry cell text,
//! numbers and sheet layout are decoded; formatting, drawing and formula
//! token records are skipped.

use crate::ole::codepage;
use crate::ole::xls::error::{XlsError, XlsResult};

/// BIFF record identifiers understood by the reader
pub mod id {
    pub const FORMULA: u16 = 0x0006;
    pub const EOF: u16 = 0x000A;
    pub const CONTINUE: u16 = 0x003C;
    pub const CODEPAGE: u16 = 0x0042;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const MULRK: u16 = 0x00BD;
    pub const MULBLANK: u16 = 0x00BE;
    pub const RSTRING: u16 = 0x00D6;
    pub const SST: u16 = 0x00FC;
    pub const LABELSST: u16 = 0x00FD;
    pub const BLANK: u16 = 0x0201;
    pub const NUMBER: u16 = 0x0203;
    pub const LABEL: u16 = 0x0204;
    pub const BOOLERR: u16 = 0x0205;
    pub const STRING: u16 = 0x0207;
    pub const ROW: u16 = 0x0208;
    pub const RK: u16 = 0x027E;
    pub const BOF: u16 = 0x0809;
}

/// BOF substream type of the workbook globals
pub const BOF_GLOBALS: u16 = 0x0005;

/// BOUNDSHEET type byte of an ordinary worksheet
pub const SHEET_TYPE_WORKSHEET: u8 = 0x00;

/// A BIFF record borrowed from the workbook stream
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub record_type: u16,
    pub data: &'a [u8],
}

/// Iterator over BIFF records in a stream
///
/// A truncated record header or body yields one error and ends iteration.
pub struct RecordIter<'a> {
    stream: &'a [u8],
    pos: usize,
}

impl<'a> RecordIter<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self::at(stream, 0)
    }

    /// Start iterating at a byte offset (BOUNDSHEET positions)
    pub fn at(stream: &'a [u8], pos: usize) -> Self {
        RecordIter { stream, pos }
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = XlsResult<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.stream.len() {
            return None;
        }

        let header = match self.stream.get(self.pos..self.pos + 4) {
            Some(header) => header,
            None => {
                self.pos = self.stream.len();
                return Some(Err(XlsError::UnexpectedEndOfStream("record header")));
            }
        };
        let record_type = u16::from_le_bytes([header[0], header[1]]);
        let data_len = u16::from_le_bytes([header[2], header[3]]) as usize;

        let start = self.pos + 4;
        let Some(data) = self.stream.get(start..start + data_len) else {
            self.pos = self.stream.len();
            return Some(Err(XlsError::UnexpectedEndOfStream("record body")));
        };
        self.pos = start + data_len;

        Some(Ok(Record { record_type, data }))
    }
}

/// BIFF versions supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiffVersion {
    /// Excel 5.0/95: 8-bit strings in the workbook codepage
    Biff5,
    /// Excel 97-2003: Unicode strings and a shared string table
    Biff8,
}

/// BOF (Beginning of File) record
#[derive(Debug, Clone)]
pub struct BofRecord {
    pub version: BiffVersion,
    pub substream: u16,
}

impl BofRecord {
    pub fn parse(data: &[u8]) -> XlsResult<Self> {
        let raw_version = read_u16(data, 0)?;
        let substream = read_u16(data, 2)?;

        let version = match raw_version {
            0x0500 => BiffVersion::Biff5,
            0x0600 => BiffVersion::Biff8,
            other => return Err(XlsError::UnsupportedBiffVersion(other)),
        };

        Ok(BofRecord { version, substream })
    }
}

/// BoundSheet8 record (worksheet metadata)
#[derive(Debug, Clone)]
pub struct BoundSheetRecord {
    /// Stream offset of the sheet's BOF record
    pub position: u32,
    pub sheet_type: u8,
    pub name: String,
}

impl BoundSheetRecord {
    pub fn parse(data: &[u8], decoder: &StringDecoder) -> XlsResult<Self> {
        let position = read_u32(data, 0)?;
        let sheet_type = *data.get(5).ok_or(XlsError::InvalidLength {
            expected: 6,
            found: data.len(),
        })?;
        let (name, _) = decoder.short_string(data, 6)?;

        Ok(BoundSheetRecord {
            position,
            sheet_type,
            name,
        })
    }
}

/// ROW record: the declared column extent of one row
#[derive(Debug, Clone, Copy)]
pub struct RowRecord {
    pub row: u32,
    /// One past the last defined column
    pub col_end: u16,
}

impl RowRecord {
    pub fn parse(data: &[u8]) -> XlsResult<Self> {
        Ok(RowRecord {
            row: read_u16(data, 0)? as u32,
            col_end: read_u16(data, 4)?,
        })
    }
}

/// Decoded value-bearing cell records
#[derive(Debug, Clone, PartialEq)]
pub enum CellRecord {
    Blank { row: u32, col: u16 },
    Text { row: u32, col: u16, text: String },
    SharedString { row: u32, col: u16, index: u32 },
    Number { row: u32, col: u16, value: f64 },
    Bool { row: u32, col: u16, value: bool },
    Error { row: u32, col: u16, code: u8 },
    /// FORMULA whose string result follows in a STRING record
    PendingString { row: u32, col: u16 },
}

impl CellRecord {
    /// Decode one cell record; MULRK and MULBLANK expand to several cells.
    /// Returns an empty vector for records that carry no cell.
    pub fn parse(record: &Record<'_>, decoder: &StringDecoder) -> XlsResult<Vec<CellRecord>> {
        let data = record.data;
        let cells = match record.record_type {
            id::BLANK => vec![CellRecord::Blank {
                row: read_u16(data, 0)? as u32,
                col: read_u16(data, 2)?,
            }],
            id::MULBLANK => {
                let row = read_u16(data, 0)? as u32;
                let first = read_u16(data, 2)?;
                let last = read_u16(data, data.len().saturating_sub(2))?;
                (first..=last.max(first))
                    .map(|col| CellRecord::Blank { row, col })
                    .collect()
            }
            id::LABEL | id::RSTRING => {
                let (text, _) = decoder.unicode_string(data, 6)?;
                vec![CellRecord::Text {
                    row: read_u16(data, 0)? as u32,
                    col: read_u16(data, 2)?,
                    text,
                }]
            }
            id::LABELSST => vec![CellRecord::SharedString {
                row: read_u16(data, 0)? as u32,
                col: read_u16(data, 2)?,
                index: read_u32(data, 6)?,
            }],
            id::NUMBER => vec![CellRecord::Number {
                row: read_u16(data, 0)? as u32,
                col: read_u16(data, 2)?,
                value: read_f64(data, 6)?,
            }],
            id::RK => vec![CellRecord::Number {
                row: read_u16(data, 0)? as u32,
                col: read_u16(data, 2)?,
                value: rk_to_f64(read_u32(data, 6)?),
            }],
            id::MULRK => {
                let row = read_u16(data, 0)? as u32;
                let first = read_u16(data, 2)?;
                let count = data.len().saturating_sub(6) / 6;
                let mut cells = Vec::with_capacity(count);
                for i in 0..count {
                    // no column past 0xFFFF
                    let Some(col) = u16::try_from(i).ok().and_then(|i| first.checked_add(i)) else {
                        break;
                    };
                    // each entry: xf (2 bytes) + rk (4 bytes)
                    let rk = read_u32(data, 4 + i * 6 + 2)?;
                    cells.push(CellRecord::Number {
                        row,
                        col,
                        value: rk_to_f64(rk),
                    });
                }
                cells
            }
            id::BOOLERR => {
                let row = read_u16(data, 0)? as u32;
                let col = read_u16(data, 2)?;
                let value = read_u8(data, 6)?;
                if read_u8(data, 7)? == 0 {
                    vec![CellRecord::Bool { row, col, value: value != 0 }]
                } else {
                    vec![CellRecord::Error { row, col, code: value }]
                }
            }
            id::FORMULA => vec![parse_formula_result(data)?],
            _ => Vec::new(),
        };
        Ok(cells)
    }
}

/// Interpret the cached result of a FORMULA record
fn parse_formula_result(data: &[u8]) -> XlsResult<CellRecord> {
    let row = read_u16(data, 0)? as u32;
    let col = read_u16(data, 2)?;
    let result = data.get(6..14).ok_or(XlsError::InvalidLength {
        expected: 14,
        found: data.len(),
    })?;

    // 0xFFFF in the top two bytes marks a non-numeric result
    if result[6] != 0xFF || result[7] != 0xFF {
        return Ok(CellRecord::Number {
            row,
            col,
            value: read_f64(result, 0)?,
        });
    }

    Ok(match result[0] {
        0x00 => CellRecord::PendingString { row, col },
        0x01 => CellRecord::Bool {
            row,
            col,
            value: result[2] != 0,
        },
        0x02 => CellRecord::Error {
            row,
            col,
            code: result[2],
        },
        _ => CellRecord::Text {
            row,
            col,
            text: String::new(),
        },
    })
}

/// Convert RK value to f64
///
/// Bit 0 divides by 100, bit 1 selects a 30-bit signed integer instead of
/// the high 30 bits of an IEEE 754 double.
pub fn rk_to_f64(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };

    if rk & 0x01 != 0 { value / 100.0 } else { value }
}

/// String decoding rules for one workbook
#[derive(Debug, Clone, Copy)]
pub struct StringDecoder {
    pub version: BiffVersion,
    pub codepage: u16,
}

impl StringDecoder {
    /// Decode 8-bit characters.
    ///
    /// BIFF8 "compressed" strings are UTF-16 code units with the high byte
    /// dropped, i.e. Latin-1. BIFF5 strings use the workbook codepage.
    pub fn compressed(&self, bytes: &[u8]) -> String {
        match self.version {
            BiffVersion::Biff8 => bytes.iter().map(|&b| b as char).collect(),
            BiffVersion::Biff5 => codepage::decode_bytes(bytes, self.codepage)
                .unwrap_or_else(|| bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// String with a 16-bit character count (LABEL, STRING)
    pub fn unicode_string(&self, data: &[u8], offset: usize) -> XlsResult<(String, usize)> {
        let cch = read_u16(data, offset)? as usize;
        self.counted_string(data, offset + 2, cch)
    }

    /// String with an 8-bit character count (BOUNDSHEET names)
    pub fn short_string(&self, data: &[u8], offset: usize) -> XlsResult<(String, usize)> {
        let cch = read_u8(data, offset)? as usize;
        self.counted_string(data, offset + 1, cch)
    }

    /// Returns the string and the offset just past it
    fn counted_string(&self, data: &[u8], offset: usize, cch: usize) -> XlsResult<(String, usize)> {
        if self.version == BiffVersion::Biff5 {
            let bytes = slice(data, offset, cch)?;
            return Ok((self.compressed(bytes), offset + cch));
        }

        let flags = read_u8(data, offset)?;
        let mut pos = offset + 1;
        let mut runs = 0usize;
        let mut ext = 0usize;
        if flags & 0x08 != 0 {
            runs = read_u16(data, pos)? as usize;
            pos += 2;
        }
        if flags & 0x04 != 0 {
            ext = read_u32(data, pos)? as usize;
            pos += 4;
        }

        let text = if flags & 0x01 != 0 {
            let bytes = slice(data, pos, cch * 2)?;
            pos += cch * 2;
            codepage::decode_utf16le(bytes)
        } else {
            let bytes = slice(data, pos, cch)?;
            pos += cch;
            self.compressed(bytes)
        };

        Ok((text, pos + runs * 4 + ext))
    }
}

/// SST (Shared String Table) record
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    pub strings: Vec<String>,
}

impl SharedStringTable {
    /// Parse the SST body and its CONTINUE records.
    ///
    /// Parsing stops quietly at the first malformed entry; cells pointing past
    /// the decoded strings render as empty.
    pub fn parse(segments: &[&[u8]], decoder: &StringDecoder) -> Self {
        let mut reader = ContinuedReader::new(segments);
        let mut strings = Vec::new();

        let unique = match (reader.read_u32(), reader.read_u32()) {
            (Some(_total), Some(unique)) => unique as usize,
            _ => return SharedStringTable { strings },
        };

        strings.reserve(unique.min(65_536));
        for _ in 0..unique {
            match reader.read_sst_entry(decoder) {
                Some(s) => strings.push(s),
                None => {
                    tracing::debug!(
                        parsed = strings.len(),
                        expected = unique,
                        "SST truncated"
                    );
                    break;
                }
            }
        }

        SharedStringTable { strings }
    }
}

/// Byte reader over an SST record followed by its CONTINUE records
///
/// Character data split across a record boundary restarts with a one-byte
/// option flag that may switch between 8-bit and 16-bit characters.
struct ContinuedReader<'a> {
    segments: &'a [&'a [u8]],
    seg: usize,
    pos: usize,
}

impl<'a> ContinuedReader<'a> {
    fn new(segments: &'a [&'a [u8]]) -> Self {
        ContinuedReader {
            segments,
            seg: 0,
            pos: 0,
        }
    }

    fn current(&self) -> &'a [u8] {
        self.segments.get(self.seg).copied().unwrap_or(&[])
    }

    fn read_u8(&mut self) -> Option<u8> {
        while self.pos >= self.current().len() {
            if self.seg + 1 >= self.segments.len() {
                return None;
            }
            self.seg += 1;
            self.pos = 0;
        }
        let byte = self.current()[self.pos];
        self.pos += 1;
        Some(byte)
    }

    fn read_u16(&mut self) -> Option<u16> {
        Some(u16::from_le_bytes([self.read_u8()?, self.read_u8()?]))
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    fn skip(&mut self, mut n: usize) -> Option<()> {
        while n > 0 {
            let avail = self.current().len().saturating_sub(self.pos);
            if avail == 0 {
                if self.seg + 1 >= self.segments.len() {
                    return None;
                }
                self.seg += 1;
                self.pos = 0;
                continue;
            }
            let step = avail.min(n);
            self.pos += step;
            n -= step;
        }
        Some(())
    }

    fn read_sst_entry(&mut self, decoder: &StringDecoder) -> Option<String> {
        let cch = self.read_u16()? as usize;
        let flags = self.read_u8()?;
        let runs = if flags & 0x08 != 0 { self.read_u16()? as usize } else { 0 };
        let ext = if flags & 0x04 != 0 { self.read_u32()? as usize } else { 0 };

        let mut text = String::with_capacity(cch);
        let mut wide = flags & 0x01 != 0;
        let mut remaining = cch;

        loop {
            let data = self.current();
            let avail = data.len().saturating_sub(self.pos);
            let width = if wide { 2 } else { 1 };
            let take = remaining.min(avail / width);
            let bytes = &data[self.pos..self.pos + take * width];
            if wide {
                text.push_str(&codepage::decode_utf16le(bytes));
            } else {
                text.push_str(&decoder.compressed(bytes));
            }
            self.pos += take * width;
            remaining -= take;

            if remaining == 0 {
                break;
            }
            if self.seg + 1 >= self.segments.len() {
                return None;
            }
            self.seg += 1;
            self.pos = 0;
            wide = self.read_u8()? & 0x01 != 0;
        }

        self.skip(runs * 4 + ext)?;
        Some(text)
    }
}

#[inline]
fn slice(data: &[u8], offset: usize, len: usize) -> XlsResult<&[u8]> {
    data.get(offset..offset + len).ok_or(XlsError::InvalidLength {
        expected: offset + len,
        found: data.len(),
    })
}

#[inline]
fn read_u8(data: &[u8], offset: usize) -> XlsResult<u8> {
    Ok(slice(data, offset, 1)?[0])
}

#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> XlsResult<u16> {
    let b = slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> XlsResult<u32> {
    let b = slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
fn read_f64(data: &[u8], offset: usize) -> XlsResult<f64> {
    let b = slice(data, offset, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(b);
    Ok(f64::from_le_bytes(raw))
}
