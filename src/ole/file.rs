use super::consts::*;
use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
/// Based on Microsoft OLE2 specification.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    /// Left sibling SID
    sid_left: U32<LE>,
    /// Right sibling SID
    sid_right: U32<LE>,
    /// Child SID
    sid_child: U32<LE>,
    /// CLSID (16 bytes)
    clsid: [u8; 16],
    /// State bits
    state_bits: U32<LE>,
    /// Creation time (FILETIME)
    creation_time: U64<LE>,
    /// Modified time (FILETIME)
    modified_time: U64<LE>,
    /// Starting sector
    start_sector: U32<LE>,
    /// Stream size
    stream_size: U64<LE>,
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (UTF-16 decoded to UTF-8)
    pub name: String,
    /// Entry type (stream, storage, root, etc.)
    pub entry_type: u8,
    /// Index of left sibling in red-black tree
    pub sid_left: u32,
    /// Index of right sibling in red-black tree
    pub sid_right: u32,
    /// Index of child node in red-black tree
    pub sid_child: u32,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
}

/// Error types for OLE file parsing
#[derive(Debug, Error)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Not an OLE file")]
    NotOleFile,
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),
    #[error("Stream not found: {0}")]
    StreamNotFound(String),
}

/// OLE2 structured storage reader
///
/// Only what a workbook reader needs is loaded: the FAT, the MiniFAT and the
/// flat directory. Streams are materialised on request.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    /// Total file size in bytes
    file_size: u64,
    /// Sector size (512 or 4096 bytes)
    sector_size: usize,
    /// Mini sector size (typically 64 bytes)
    mini_sector_size: usize,
    /// Streams below this size live in the mini stream
    mini_stream_cutoff: u32,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    /// All directory entries indexed by SID; index 0 is the root
    entries: Vec<DirectoryEntry>,
    /// Mini stream data (loaded on demand)
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(OleError::NotOleFile);
        }

        let dll_version = header_u16(&header, 0x1A);
        let byte_order = header_u16(&header, 0x1C);
        let sector_shift = header_u16(&header, 0x1E);
        let mini_sector_shift = header_u16(&header, 0x20);
        let first_dir_sector = header_u32(&header, 0x30);
        let mini_stream_cutoff = header_u32(&header, 0x38);
        let first_minifat_sector = header_u32(&header, 0x3C);
        let num_minifat_sectors = header_u32(&header, 0x40);
        let first_difat_sector = header_u32(&header, 0x44);
        let num_difat_sectors = header_u32(&header, 0x48);

        if byte_order != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }
        if !(7..=16).contains(&sector_shift) || mini_sector_shift > sector_shift {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported sector shift {}",
                sector_shift
            )));
        }

        let sector_size = 1usize << sector_shift;
        let mini_sector_size = 1usize << mini_sector_shift;

        if (dll_version == 3 && sector_size != 512) || (dll_version == 4 && sector_size != 4096) {
            return Err(OleError::InvalidFormat("Sector size mismatch".to_string()));
        }

        let mut ole = OleFile {
            reader,
            file_size,
            sector_size,
            mini_sector_size,
            mini_stream_cutoff,
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header, first_difat_sector, num_difat_sectors)?;
        ole.load_directory(first_dir_sector)?;
        if num_minifat_sectors > 0 && first_minifat_sector != ENDOFCHAIN {
            ole.load_minifat(first_minifat_sector)?;
        }

        Ok(ole)
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// First 109 FAT sector indexes are stored in the header, additional
    /// indexes are stored in DIFAT sectors.
    fn load_fat(
        &mut self,
        header: &[u8; HEADER_SIZE],
        first_difat_sector: u32,
        num_difat_sectors: u32,
    ) -> Result<(), OleError> {
        let mut fat_sectors = Vec::new();
        for i in 0..HEADER_DIFAT_ENTRIES {
            let sector = header_u32(header, 0x4C + i * 4);
            if sector == FREESECT || sector == ENDOFCHAIN {
                break;
            }
            fat_sectors.push(sector);
        }

        // a FAT can never need more sectors than the file holds
        let max_sectors = (self.file_size / self.sector_size as u64) as usize;
        let mut visited = HashSet::new();
        let mut difat_sector = first_difat_sector;
        let entries_per_sector = (self.sector_size / 4) - 1; // last slot points to the next DIFAT sector
        for _ in 0..num_difat_sectors {
            if difat_sector > MAXREGSECT {
                break;
            }
            if !visited.insert(difat_sector) {
                return Err(OleError::CorruptedFile(format!(
                    "DIFAT chain loops back to sector {difat_sector}"
                )));
            }
            let sector_data = self.read_sector(difat_sector)?;
            for i in 0..entries_per_sector {
                let sector = sector_u32(&sector_data, i * 4);
                if sector == FREESECT || sector == ENDOFCHAIN {
                    break;
                }
                fat_sectors.push(sector);
            }
            if fat_sectors.len() > max_sectors {
                return Err(OleError::CorruptedFile(format!(
                    "{} FAT sectors declared in a file of {} sectors",
                    fat_sectors.len(),
                    max_sectors
                )));
            }
            difat_sector = sector_u32(&sector_data, entries_per_sector * 4);
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for &sector_id in &fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            self.fat
                .extend((0..entries_per_sector).map(|i| sector_u32(&sector_data, i * 4)));
        }

        Ok(())
    }

    /// Load the Mini FAT (for small streams)
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_stream_from_fat(first_minifat_sector)?;
        self.minifat = minifat_data
            .chunks_exact(4)
            .map(|chunk| sector_u32(chunk, 0))
            .collect();
        Ok(())
    }

    /// Load every directory entry; the tree is walked lazily by name lookups
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_stream_from_fat(first_dir_sector)?;
        let mut entries = Vec::with_capacity(dir_data.len() / DIRENTRY_SIZE);
        for chunk in dir_data.chunks_exact(DIRENTRY_SIZE) {
            entries.push(self.parse_directory_entry(chunk)?);
        }
        if entries.first().map(|root| root.entry_type) != Some(STGTY_ROOT) {
            return Err(OleError::CorruptedFile("Missing root entry".to_string()));
        }
        self.entries = entries;
        Ok(())
    }

    /// Parse a single directory entry from 128 bytes
    fn parse_directory_entry(&self, data: &[u8]) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::InvalidFormat("Failed to parse directory entry".to_string()))?;

        let name_len = raw.name_len.get() as usize;
        let name = decode_utf16le_name(&raw.name[0..name_len.saturating_sub(2).min(64)]);

        // 512-byte sector files only use the low 32 bits of the size
        let size = if self.sector_size == 512 {
            raw.stream_size.get() & 0xFFFFFFFF
        } else {
            raw.stream_size.get()
        };

        Ok(DirectoryEntry {
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
        })
    }

    /// Read a single sector from the file
    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        // Sector position in file: (sector_id + 1) * sector_size
        let position = ((sector_id as u64) + 1) * (self.sector_size as u64);
        if position + self.sector_size as u64 > self.file_size {
            return Err(OleError::CorruptedFile(format!(
                "Sector {} lies beyond the end of the file",
                sector_id
            )));
        }
        self.reader.seek(SeekFrom::Start(position))?;

        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a stream by following the FAT chain
    fn read_stream_from_fat(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut remaining = self.fat.len().max(1);

        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in FAT".to_string(),
                ));
            }
            if remaining == 0 {
                return Err(OleError::CorruptedFile("Cyclic FAT chain".to_string()));
            }
            remaining -= 1;

            let sector_data = self.read_sector(sector)?;
            data.extend_from_slice(&sector_data);
            sector = self.fat[sector as usize];
        }

        Ok(data)
    }

    /// Read a stream by following the MiniFAT chain
    fn read_stream_from_minifat(
        &mut self,
        start_sector: u32,
        size: u64,
    ) -> Result<Vec<u8>, OleError> {
        if self.ministream.is_none() {
            let root_start = self.entries[0].start_sector;
            let root_size = self.entries[0].size as usize;
            let mut ministream = self.read_stream_from_fat(root_start)?;
            ministream.truncate(root_size);
            self.ministream = Some(ministream);
        }
        let Some(ministream) = self.ministream.as_ref() else {
            return Err(OleError::CorruptedFile("No mini stream".to_string()));
        };

        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut remaining = self.minifat.len().max(1);

        while sector != ENDOFCHAIN {
            if sector as usize >= self.minifat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in MiniFAT".to_string(),
                ));
            }
            if remaining == 0 {
                return Err(OleError::CorruptedFile("Cyclic MiniFAT chain".to_string()));
            }
            remaining -= 1;

            let position = (sector as usize) * self.mini_sector_size;
            if position + self.mini_sector_size > ministream.len() {
                return Err(OleError::CorruptedFile(
                    "Mini sector out of bounds".to_string(),
                ));
            }
            data.extend_from_slice(&ministream[position..position + self.mini_sector_size]);
            sector = self.minifat[sector as usize];
        }

        data.truncate(size as usize);
        Ok(data)
    }

    /// Names of the streams directly under the root storage
    pub fn stream_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited = vec![false; self.entries.len()];
        self.walk_siblings(self.entries[0].sid_child, &mut visited, &mut |entry| {
            if entry.entry_type == STGTY_STREAM {
                names.push(entry.name.clone());
            }
            false
        });
        names
    }

    /// Open a top-level stream by name (case-insensitive) and return its contents
    pub fn open_stream(&mut self, name: &str) -> Result<Vec<u8>, OleError> {
        let entry = self
            .find_root_child(name)
            .ok_or_else(|| OleError::StreamNotFound(name.to_string()))?;

        if entry.entry_type != STGTY_STREAM {
            return Err(OleError::InvalidFormat(format!("'{}' is not a stream", name)));
        }

        if entry.size < self.mini_stream_cutoff as u64 {
            self.read_stream_from_minifat(entry.start_sector, entry.size)
        } else {
            let mut data = self.read_stream_from_fat(entry.start_sector)?;
            data.truncate(entry.size as usize);
            Ok(data)
        }
    }

    fn find_root_child(&self, name: &str) -> Option<DirectoryEntry> {
        let wanted = name.to_lowercase();
        let mut found = None;
        let mut visited = vec![false; self.entries.len()];
        self.walk_siblings(self.entries[0].sid_child, &mut visited, &mut |entry| {
            if entry.name.to_lowercase() == wanted {
                found = Some(entry.clone());
                return true;
            }
            false
        });
        found
    }

    /// In-order walk of one red-black sibling tree; `visit` returns true to stop
    fn walk_siblings<F>(&self, sid: u32, visited: &mut [bool], visit: &mut F) -> bool
    where
        F: FnMut(&DirectoryEntry) -> bool,
    {
        if sid == NOSTREAM || sid as usize >= self.entries.len() || visited[sid as usize] {
            return false;
        }
        visited[sid as usize] = true;
        let entry = &self.entries[sid as usize];

        self.walk_siblings(entry.sid_left, visited, visit)
            || visit(entry)
            || self.walk_siblings(entry.sid_right, visited, visit)
    }
}

#[inline]
fn header_u16(header: &[u8], offset: usize) -> u16 {
    U16::<LE>::read_from_bytes(&header[offset..offset + 2])
        .map(|v| v.get())
        .unwrap_or(0)
}

#[inline]
fn header_u32(header: &[u8], offset: usize) -> u32 {
    sector_u32(header, offset)
}

#[inline]
fn sector_u32(data: &[u8], offset: usize) -> u32 {
    data.get(offset..offset + 4)
        .and_then(|bytes| U32::<LE>::read_from_bytes(bytes).ok())
        .map(|v| v.get())
        .unwrap_or(FREESECT)
}

/// Decode a UTF-16LE directory name, dropping trailing NULs
fn decode_utf16le_name(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

/// Check if a file/data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && &data[0..8] == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::testing::compound_file;
    use std::io::Cursor;

    #[test]
    fn test_rejects_short_input() {
        let err = OleFile::open(Cursor::new(vec![0u8; 100])).unwrap_err();
        assert!(matches!(err, OleError::NotOleFile));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = OleFile::open(Cursor::new(vec![0u8; 4096])).unwrap_err();
        assert!(matches!(err, OleError::NotOleFile));
    }

    #[test]
    fn test_reads_large_stream_from_fat() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let bytes = compound_file("Workbook", &payload);
        assert!(is_ole_file(&bytes));

        let mut ole = OleFile::open(Cursor::new(bytes)).unwrap();
        assert_eq!(ole.stream_names(), vec!["Workbook".to_string()]);
        assert_eq!(ole.open_stream("workbook").unwrap(), payload);
    }

    #[test]
    fn test_self_referencing_difat_is_corrupt() {
        let mut bytes = compound_file("Workbook", &[0u8; 4096]);
        // sector 2 (a data sector) becomes a DIFAT sector pointing at itself
        bytes[0x44..0x48].copy_from_slice(&2u32.to_le_bytes());
        bytes[0x48..0x4C].copy_from_slice(&2000u32.to_le_bytes());
        let next_slot = 3 * 512 + 508;
        bytes[next_slot..next_slot + 4].copy_from_slice(&2u32.to_le_bytes());
        for i in 0..127 {
            let at = 3 * 512 + i * 4;
            bytes[at..at + 4].copy_from_slice(&FREESECT.to_le_bytes());
        }

        let err = OleFile::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, OleError::CorruptedFile(_)));
    }

    #[test]
    fn test_oversized_difat_is_corrupt() {
        let mut bytes = compound_file("Workbook", &[0u8; 4096]);
        // 127 FAT sector ids from one DIFAT sector in an 11-sector file
        bytes[0x44..0x48].copy_from_slice(&2u32.to_le_bytes());
        bytes[0x48..0x4C].copy_from_slice(&1u32.to_le_bytes());

        let err = OleFile::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, OleError::CorruptedFile(_)));
    }

    #[test]
    fn test_missing_stream() {
        let bytes = compound_file("Workbook", &[0u8; 4096]);
        let mut ole = OleFile::open(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            ole.open_stream("Book"),
            Err(OleError::StreamNotFound(_))
        ));
    }
}
