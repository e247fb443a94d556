use std::str::FromStr;
use std::fmt;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::img::DiskKind;

pub const SECTOR_SIZE: usize = 256;
pub const MAX_NAME_LEN: usize = 16;
pub const CHANNELS: usize = 16;
pub const COMMAND_CHANNEL: usize = 15;
/// names and ids are padded with shifted space
pub const PAD: u8 = 0xa0;
pub const CLOSED_FLAG: u8 = 0x80;
pub const LOCKED_FLAG: u8 = 0x40;
pub const TYPE_MASK: u8 = 0x07;

/// Status codes of CBM DOS.  The discriminant is the number the drive reports,
/// the `Display` trait gives the text the drive reports.
#[derive(thiserror::Error,Debug,Clone,Copy,PartialEq,Eq,FromPrimitive)]
pub enum DosError {
    #[error(" OK")]
    Ok = 0,
    #[error("FILES SCRATCHED")]
    FilesScratched = 1,
    #[error("READ ERROR")]
    HeaderNotFound = 20,
    #[error("READ ERROR")]
    NoSync = 21,
    #[error("READ ERROR")]
    DataNotFound = 22,
    #[error("READ ERROR")]
    DataChecksum = 23,
    #[error("READ ERROR")]
    ByteDecoding = 24,
    #[error("WRITE ERROR")]
    WriteVerify = 25,
    #[error("WRITE PROTECT ON")]
    WriteProtect = 26,
    #[error("READ ERROR")]
    HeaderChecksum = 27,
    #[error("WRITE ERROR")]
    LongData = 28,
    #[error("DISK ID MISMATCH")]
    IdMismatch = 29,
    #[error("SYNTAX ERROR")]
    Syntax = 30,
    #[error("SYNTAX ERROR")]
    InvalidCommand = 31,
    #[error("SYNTAX ERROR")]
    LongLine = 32,
    #[error("SYNTAX ERROR")]
    InvalidFilename = 33,
    #[error("SYNTAX ERROR")]
    NoFilename = 34,
    #[error("WRITE FILE OPEN")]
    WriteFileOpen = 60,
    #[error("FILE NOT OPEN")]
    FileNotOpen = 61,
    #[error("FILE NOT FOUND")]
    FileNotFound = 62,
    #[error("FILE EXISTS")]
    FileExists = 63,
    #[error("FILE TYPE MISMATCH")]
    FileTypeMismatch = 64,
    #[error("NO BLOCK")]
    NoBlock = 65,
    #[error("ILLEGAL TRACK OR SECTOR")]
    IllegalTrackSector = 66,
    #[error("ILLEGAL SYSTEM T OR S")]
    IllegalSystemTrackSector = 67,
    #[error("NO CHANNEL")]
    NoChannel = 70,
    #[error("DISK FULL")]
    DiskFull = 72,
    #[error("CBM DOS")]
    DosVersion = 73,
    #[error("DRIVE NOT READY")]
    NotReady = 74
}

impl DosError {
    pub fn code(&self) -> u8 {
        *self as u8
    }
    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_u8(code)
    }
    /// Interpret the error byte that some images store for every block.
    pub fn from_error_info(info: u8) -> Self {
        let code = match info {
            0x02 => 20,
            0x03 => 21,
            0x04 => 22,
            0x05 => 23,
            0x07 => 25,
            0x08 => 26,
            0x09 => 27,
            0x0a => 28,
            0x0b => 29,
            0x0f => 74,
            0x10 => 24,
            _ => 0
        };
        Self::from_u8(code).unwrap_or(Self::Ok)
    }
}

/// A DOS error together with the block where it happened, if any.
/// This is what the internal operations of the drive return, the track and sector
/// end up in the error channel message.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct Fault {
    pub err: DosError,
    pub track: usize,
    pub sector: usize
}

impl Fault {
    pub fn at(err: DosError,track: usize,sector: usize) -> Self {
        Self { err, track, sector }
    }
}

impl From<DosError> for Fault {
    fn from(err: DosError) -> Self {
        Self { err, track: 0, sector: 0 }
    }
}

/// Status reported to the bus for open, write, and close.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Status {
    Ok,
    Error,
    /// the request itself was malformed, e.g., opening a data channel with no name
    NoDevice
}

/// Outcome of reading one byte from a channel.  End of file is never
/// confused with a data byte.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ReadResult {
    Data(u8),
    Eof,
    Error
}

/// File types as stored in the low 3 bits of the directory type byte
#[derive(Debug,Clone,Copy,PartialEq,Eq,FromPrimitive)]
pub enum FileType {
    Del = 0,
    Seq = 1,
    Prg = 2,
    Usr = 3,
    Rel = 4,
    Cbm = 5,
    Djj = 6,
    Fab = 7
}

impl FileType {
    pub fn from_type_byte(typ: u8) -> Self {
        Self::from_u8(typ & TYPE_MASK).unwrap_or(Self::Del)
    }
    /// The letter used in a filename option, e.g., `NAME,S,W`
    pub fn from_letter(c: u8) -> Option<Self> {
        match c {
            b'S' => Some(Self::Seq),
            b'P' => Some(Self::Prg),
            b'U' => Some(Self::Usr),
            b'L' => Some(Self::Rel),
            b'C' => Some(Self::Cbm),
            b'J' => Some(Self::Djj),
            b'F' => Some(Self::Fab),
            _ => None
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Del => "DEL",
            Self::Seq => "SEQ",
            Self::Prg => "PRG",
            Self::Usr => "USR",
            Self::Rel => "REL",
            Self::Cbm => "CBM",
            Self::Djj => "DJJ",
            Self::Fab => "FAB"
        };
        write!(f,"{}",s)
    }
}

impl FromStr for FileType {
    type Err = DosError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s.to_lowercase().as_str() {
            "del" => Ok(Self::Del),
            "seq" => Ok(Self::Seq),
            "prg" => Ok(Self::Prg),
            "usr" => Ok(Self::Usr),
            "rel" => Ok(Self::Rel),
            _ => Err(DosError::FileTypeMismatch)
        }
    }
}

/// The DOS flavors, each with its own placement of the header, BAM, and directory
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum DosFormat {
    D1541,
    D2040,
    D1571,
    D1581,
    D8050,
    D8250
}

impl DosFormat {
    pub fn from_kind(kind: DiskKind) -> Self {
        match kind {
            DiskKind::CBM1541 => Self::D1541,
            DiskKind::CBM2040 => Self::D2040,
            DiskKind::CBM1571 => Self::D1571,
            DiskKind::CBM1581 => Self::D1581,
            DiskKind::CBM8050 => Self::D8050,
            DiskKind::CBM8250 => Self::D8250
        }
    }
    pub fn kind(&self) -> DiskKind {
        match self {
            Self::D1541 => DiskKind::CBM1541,
            Self::D2040 => DiskKind::CBM2040,
            Self::D1571 => DiskKind::CBM1571,
            Self::D1581 => DiskKind::CBM1581,
            Self::D8050 => DiskKind::CBM8050,
            Self::D8250 => DiskKind::CBM8250
        }
    }
    /// Track holding the header and directory
    pub fn dir_track(&self) -> usize {
        match self {
            Self::D1581 => 40,
            Self::D8050 | Self::D8250 => 39,
            _ => 18
        }
    }
    /// First sector of the directory chain on the directory track
    pub fn first_dir_sector(&self) -> usize {
        match self {
            Self::D1581 => 3,
            _ => 1
        }
    }
    /// Offset of the disk name within the header sector
    pub fn name_offset(&self) -> usize {
        match self {
            Self::D1581 => 0x04,
            Self::D8050 | Self::D8250 => 0x06,
            _ => 0x90
        }
    }
    /// Offset of the 2 byte disk id, which is followed by a pad and the DOS type
    pub fn id_offset(&self) -> usize {
        self.name_offset() + 18
    }
    /// Number of bytes filled with pad when the header is created
    pub fn pad_len(&self) -> usize {
        match self {
            Self::D1581 => 25,
            _ => 27
        }
    }
    /// Format byte at offset 2 of the header, followed by the DOS type
    pub fn format_byte(&self) -> u8 {
        match self {
            Self::D1581 => b'D',
            Self::D8050 | Self::D8250 => b'C',
            _ => b'A'
        }
    }
    pub fn dos_version(&self) -> &'static str {
        match self {
            Self::D1541 => "CBM DOS V2.6 1541",
            Self::D2040 => "CBM DOS V1.2 2040",
            Self::D1571 => "CBM DOS V3.0 1571",
            Self::D1581 => "COPYRIGHT CBM DOS V10 1581",
            Self::D8050 => "CBM DOS V2.7 8050",
            Self::D8250 => "CBM DOS V2.7 8250"
        }
    }
}

#[test]
fn error_info_codes() {
    assert_eq!(DosError::from_error_info(0x01),DosError::Ok);
    assert_eq!(DosError::from_error_info(0x05),DosError::DataChecksum);
    assert_eq!(DosError::from_error_info(0x10),DosError::ByteDecoding);
    assert_eq!(DosError::from_error_info(0x0f),DosError::NotReady);
    assert_eq!(DosError::from_code(72),Some(DosError::DiskFull));
    assert_eq!(DosError::DiskFull.to_string(),"DISK FULL");
}
