//! In-memory BIFF8 workbook writer for tests
//!
//! Produces the smallest structure the reader accepts: a version 3 compound
//! file with 512-byte sectors holding one stream, and a BIFF8 workbook with
//! a shared string table, ROW records, LABELSST and NUMBER cells.

use crate::ole::consts::{ENDOFCHAIN, FREESECT, MAGIC, NOSTREAM, STGTY_ROOT, STGTY_STREAM};
use crate::ole::xls::records::id;

const SECTOR: usize = 512;
const FATSECT: u32 = 0xFFFF_FFFD;
const MINI_CUTOFF: usize = 4096;

/// Wrap `payload` as the only top-level stream of a compound file.
///
/// Payloads below the mini stream cutoff are zero-padded to it so the stream
/// always lives in regular sectors.
pub(crate) fn compound_file(name: &str, payload: &[u8]) -> Vec<u8> {
    let size = payload.len().max(MINI_CUTOFF);
    let data_sectors = size.div_ceil(SECTOR);
    let per_fat = SECTOR / 4;

    let mut fat_sectors = 1;
    while fat_sectors * per_fat < fat_sectors + 1 + data_sectors {
        fat_sectors += 1;
    }
    let dir_sector = fat_sectors as u32;
    let first_data = dir_sector + 1;

    let mut out = Vec::with_capacity(SECTOR * (2 + fat_sectors + data_sectors));

    // header
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[0u8; 16]);
    put_u16(&mut out, 0x003E);
    put_u16(&mut out, 3);
    put_u16(&mut out, 0xFFFE);
    put_u16(&mut out, 9);
    put_u16(&mut out, 6);
    out.extend_from_slice(&[0u8; 6]);
    put_u32(&mut out, 0);
    put_u32(&mut out, fat_sectors as u32);
    put_u32(&mut out, dir_sector);
    put_u32(&mut out, 0);
    put_u32(&mut out, MINI_CUTOFF as u32);
    put_u32(&mut out, ENDOFCHAIN);
    put_u32(&mut out, 0);
    put_u32(&mut out, ENDOFCHAIN);
    put_u32(&mut out, 0);
    for i in 0..109 {
        put_u32(&mut out, if i < fat_sectors { i as u32 } else { FREESECT });
    }
    debug_assert_eq!(out.len(), SECTOR);

    // FAT
    let mut fat = vec![FREESECT; fat_sectors * per_fat];
    for entry in fat.iter_mut().take(fat_sectors) {
        *entry = FATSECT;
    }
    fat[dir_sector as usize] = ENDOFCHAIN;
    for i in 0..data_sectors {
        let sector = first_data as usize + i;
        fat[sector] = if i + 1 == data_sectors {
            ENDOFCHAIN
        } else {
            sector as u32 + 1
        };
    }
    for entry in fat {
        put_u32(&mut out, entry);
    }

    // directory
    dir_entry(&mut out, "Root Entry", STGTY_ROOT, 1, ENDOFCHAIN, 0);
    dir_entry(&mut out, name, STGTY_STREAM, NOSTREAM, first_data, size as u64);
    dir_entry(&mut out, "", 0, NOSTREAM, FREESECT, 0);
    dir_entry(&mut out, "", 0, NOSTREAM, FREESECT, 0);

    // stream data
    out.extend_from_slice(payload);
    out.resize(SECTOR * (2 + fat_sectors + data_sectors), 0);
    out
}

fn dir_entry(out: &mut Vec<u8>, name: &str, kind: u8, child: u32, start: u32, size: u64) {
    let mut raw = [0u8; 128];
    let units: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in units.iter().take(31).enumerate() {
        raw[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    let name_len = if name.is_empty() { 0 } else { (units.len().min(31) + 1) * 2 };
    raw[64..66].copy_from_slice(&(name_len as u16).to_le_bytes());
    raw[66] = kind;
    raw[67] = 1;
    raw[68..72].copy_from_slice(&NOSTREAM.to_le_bytes());
    raw[72..76].copy_from_slice(&NOSTREAM.to_le_bytes());
    raw[76..80].copy_from_slice(&child.to_le_bytes());
    raw[116..120].copy_from_slice(&start.to_le_bytes());
    raw[120..128].copy_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&raw);
}

#[derive(Default)]
struct SheetSpec {
    name: String,
    texts: Vec<(u32, u16, String)>,
    numbers: Vec<(u32, u16, f64)>,
}

/// Builder for BIFF8 workbooks
#[derive(Default)]
pub(crate) struct WorkbookBuilder {
    sheets: Vec<SheetSpec>,
}

impl WorkbookBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a sheet; empty strings leave the cell absent
    pub(crate) fn sheet<S: AsRef<str>>(mut self, name: &str, rows: &[Vec<S>]) -> Self {
        let mut spec = SheetSpec {
            name: name.to_string(),
            ..SheetSpec::default()
        };
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.as_ref().is_empty() {
                    spec.texts.push((r as u32, c as u16, text.as_ref().to_string()));
                }
            }
        }
        self.sheets.push(spec);
        self
    }

    /// Add a NUMBER cell to the last sheet
    pub(crate) fn number(mut self, row: u32, col: u16, value: f64) -> Self {
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.numbers.push((row, col, value));
        }
        self
    }

    /// Full `.xls` file bytes
    pub(crate) fn build(&self) -> Vec<u8> {
        compound_file("Workbook", &self.stream())
    }

    /// Raw BIFF8 workbook stream
    pub(crate) fn stream(&self) -> Vec<u8> {
        let mut sst: Vec<&str> = Vec::new();
        for sheet in &self.sheets {
            for (_, _, text) in &sheet.texts {
                if !sst.contains(&text.as_str()) {
                    sst.push(text);
                }
            }
        }

        let substreams: Vec<Vec<u8>> = self
            .sheets
            .iter()
            .map(|sheet| sheet_substream(sheet, &sst))
            .collect();

        // globals with placeholder sheet offsets, patched below
        let mut globals = Vec::new();
        record(&mut globals, id::BOF, &bof(0x0005));
        record(&mut globals, id::CODEPAGE, &1200u16.to_le_bytes());
        let mut patch_at = Vec::new();
        for sheet in &self.sheets {
            // position (patched), visible, worksheet
            let mut data = vec![0u8; 6];
            let units: Vec<u16> = sheet.name.encode_utf16().collect();
            data.push(units.len() as u8);
            data.push(0x01);
            for unit in units {
                data.extend_from_slice(&unit.to_le_bytes());
            }
            patch_at.push(globals.len() + 4);
            record(&mut globals, id::BOUNDSHEET, &data);
        }
        let mut sst_data = Vec::new();
        put_u32(&mut sst_data, sst.len() as u32);
        put_u32(&mut sst_data, sst.len() as u32);
        for text in &sst {
            wide_string(&mut sst_data, text);
        }
        record(&mut globals, id::SST, &sst_data);
        record(&mut globals, id::EOF, &[]);

        let mut offset = globals.len();
        for (patch, substream) in patch_at.into_iter().zip(&substreams) {
            globals[patch..patch + 4].copy_from_slice(&(offset as u32).to_le_bytes());
            offset += substream.len();
        }

        let mut stream = globals;
        for substream in substreams {
            stream.extend_from_slice(&substream);
        }
        stream
    }
}

fn sheet_substream(sheet: &SheetSpec, sst: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    record(&mut out, id::BOF, &bof(0x0010));

    let mut extents: Vec<(u32, u16)> = Vec::new();
    let cells = sheet
        .texts
        .iter()
        .map(|(r, c, _)| (*r, *c))
        .chain(sheet.numbers.iter().map(|(r, c, _)| (*r, *c)));
    for (row, col) in cells {
        match extents.iter_mut().find(|(r, _)| *r == row) {
            Some((_, end)) => *end = (*end).max(col + 1),
            None => extents.push((row, col + 1)),
        }
    }
    extents.sort_unstable();
    for (row, end) in extents {
        let mut data = Vec::new();
        put_u16(&mut data, row as u16);
        put_u16(&mut data, 0);
        put_u16(&mut data, end);
        data.extend_from_slice(&[0u8; 10]);
        record(&mut out, id::ROW, &data);
    }

    for (row, col, text) in &sheet.texts {
        let index = sst.iter().position(|s| s == text).unwrap_or(0);
        let mut data = Vec::new();
        put_u16(&mut data, *row as u16);
        put_u16(&mut data, *col);
        put_u16(&mut data, 0x0F);
        put_u32(&mut data, index as u32);
        record(&mut out, id::LABELSST, &data);
    }
    for (row, col, value) in &sheet.numbers {
        let mut data = Vec::new();
        put_u16(&mut data, *row as u16);
        put_u16(&mut data, *col);
        put_u16(&mut data, 0x0F);
        data.extend_from_slice(&value.to_le_bytes());
        record(&mut out, id::NUMBER, &data);
    }

    record(&mut out, id::EOF, &[]);
    out
}

fn bof(substream: u16) -> Vec<u8> {
    let mut data = Vec::new();
    put_u16(&mut data, 0x0600);
    put_u16(&mut data, substream);
    put_u16(&mut data, 0x0DBB);
    put_u16(&mut data, 0x07CC);
    put_u32(&mut data, 0);
    put_u32(&mut data, 0x0006);
    data
}

fn wide_string(out: &mut Vec<u8>, text: &str) {
    let units: Vec<u16> = text.encode_utf16().collect();
    put_u16(out, units.len() as u16);
    out.push(0x01);
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

fn record(out: &mut Vec<u8>, record_type: u16, data: &[u8]) {
    put_u16(out, record_type);
    put_u16(out, data.len() as u16);
    out.extend_from_slice(data);
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
