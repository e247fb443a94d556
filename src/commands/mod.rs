//! # CLI Subcommands
//! 
//! Contains modules that run the subcommands.
//! Every subcommand that touches an image attaches it to a fresh `Drive`
//! and goes through the DOS, the same way a program on the computer would.

pub mod mkdsk;
pub mod put;
pub mod get;
pub mod stat;
pub mod modify;
pub mod completions;

use std::str::FromStr;
use log::error;
use crate::fs::cbm::types::{DosError,FileType};
use crate::fs::Drive;
use crate::DYNERR;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Item type is unknown")]
    UnknownItemType,
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("Input source could not be interpreted")]
    UnknownFormat
}

/// Things that can be copied in or out of a disk image.
/// The file types map to the DOS type letter.
#[derive(PartialEq,Clone,Copy,Debug)]
pub enum ItemType {
    Program,
    Sequential,
    User,
    Sector
}

impl ItemType {
    /// File type as known to the DOS, if this is a file
    pub fn file_type(&self) -> Option<FileType> {
        match self {
            Self::Program => Some(FileType::Prg),
            Self::Sequential => Some(FileType::Seq),
            Self::User => Some(FileType::Usr),
            Self::Sector => None
        }
    }
}

impl FromStr for ItemType {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "prg" => Ok(Self::Program),
            "seq" => Ok(Self::Sequential),
            "usr" => Ok(Self::User),
            "sec" => Ok(Self::Sector),
            _ => Err(CommandError::UnknownItemType)
        }
    }
}

/// Parse `<track>,<sector>`
pub fn parse_sector(s: &str) -> Result<[usize;2],CommandError> {
    let fields: Vec<&str> = s.split(',').map(|f| f.trim()).collect();
    if fields.len() != 2 {
        error!("sector address should be <track>,<sector>");
        return Err(CommandError::InvalidCommand);
    }
    match (usize::from_str(fields[0]),usize::from_str(fields[1])) {
        (Ok(t),Ok(s)) if t < 256 && s < 256 => Ok([t,s]),
        _ => {
            error!("could not parse sector address {}",s);
            Err(CommandError::OutOfRange)
        }
    }
}

/// Turn an error channel message such as `62,FILE NOT FOUND,00,00` into a `Result`.
/// Codes below 20 are informational, e.g., 01 after scratching.
pub fn check_status(msg: &str) -> Result<String,DYNERR> {
    let code = match msg.get(0..2).and_then(|s| u8::from_str(s).ok()) {
        Some(c) => c,
        None => {
            error!("could not interpret drive status {}",msg);
            return Err(Box::new(CommandError::UnknownFormat));
        }
    };
    if code >= 20 {
        eprintln!("{}",msg.trim_end());
        return match DosError::from_code(code) {
            Some(err) => Err(Box::new(err)),
            None => Err(Box::new(CommandError::UnknownFormat))
        };
    }
    Ok(msg.to_string())
}

/// Error for a drive operation that did not succeed, falling back to not-ready
/// if the drive never latched anything
pub fn drive_error(drive: &Drive) -> DYNERR {
    match drive.status_code() {
        DosError::Ok => Box::new(DosError::NotReady),
        code => {
            eprintln!("{}",drive.status().trim_end());
            Box::new(code)
        }
    }
}

#[test]
fn sector_addresses() {
    assert_eq!(parse_sector("18,0").unwrap(),[18,0]);
    assert_eq!(parse_sector(" 1 , 20 ").unwrap(),[1,20]);
    assert!(parse_sector("18").is_err());
    assert!(parse_sector("18,x").is_err());
}

#[test]
fn status_messages() {
    assert_eq!(check_status("00, OK,00,00").unwrap(),"00, OK,00,00");
    assert!(check_status("01,FILES SCRATCHED,03,00").is_ok());
    assert!(check_status("62,FILE NOT FOUND,00,00").is_err());
    assert!(check_status("").is_err());
}
