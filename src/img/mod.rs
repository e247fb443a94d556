//! # Disk Image Module
//! 
//! Disk images are represented by objects implementing the `DiskImage` trait.
//! The object type is named for the disk image type that it handles, e.g., `X64`.
//! This object is the sector backend of a drive: it knows where a given track and
//! sector lives in the image, and nothing about directories or files.
//! 
//! ## Geometry
//! 
//! Commodore drives use zoned recording, so the number of sectors on a track depends on
//! the track.  The tables and the linear sector arithmetic live in `geometry`.  Tracks and
//! sectors are numbered the way CBM DOS numbers them, i.e., tracks start at 1 and sectors at 0.
//! 
//! ## Identification
//! 
//! Most Commodore images are bare sector dumps, so the image type is inferred from the size
//! of the data, or from a magic header where one exists.  The heuristics are in `probe`.
//! 
//! ## Relation to File Systems
//! 
//! The `DiskImage` trait object serves as the underlying storage for `fs::cbm::Drive`.
//! The drive works by reading sectors from, or writing sectors to, the disk image.

pub mod geometry;
pub mod probe;
pub mod dsk_cbm;
pub mod x64;
pub mod g64;
pub mod gcr;

use std::str::FromStr;
use std::fmt;
use crate::{STDRESULT,DYNERR};

/// Enumerates disk image errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("unknown kind of disk")]
    UnknownDiskKind,
    #[error("unknown image type")]
    UnknownImageType,
    #[error("track count did not match request")]
    TrackCountMismatch,
    #[error("geometric coordinate out of range")]
    GeometryMismatch,
	#[error("image size did not match the request")]
	ImageSizeMismatch,
    #[error("image type not compatible with request")]
    ImageTypeMismatch,
    #[error("unable to access track")]
    TrackAccess,
    #[error("image is write protected")]
    WriteProtect
}

/// Errors pertaining to GCR encoding
#[derive(thiserror::Error,Debug)]
pub enum NibbleError {
    #[error("could not interpret track data")]
    BadTrack,
    #[error("invalid byte while decoding")]
    InvalidByte,
    #[error("bad checksum found in a sector")]
    BadChecksum,
    #[error("could not find sync mark")]
    SyncNotFound,
    #[error("sector not found")]
    SectorNotFound
}

/// The drive families, each with its own zone table.
/// The DOS that runs on the drive is selected by this as well.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiskKind {
    /// 1541 single sided 5.25 inch, 35 tracks (up to 42 on extended images)
    CBM1541,
    /// 2040/3040 single sided 5.25 inch, DOS 1 zone table
    CBM2040,
    /// 1571 double sided 5.25 inch, 70 tracks
    CBM1571,
    /// 1581 double sided 3.5 inch, 80 logical tracks of 40 sectors
    CBM1581,
    /// 8050 single sided 5.25 inch, 77 tracks
    CBM8050,
    /// 8250 double sided 5.25 inch, 154 tracks
    CBM8250
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiskImageType {
    D64,
    D67,
    D71,
    D80,
    D81,
    D82,
    X64,
    G64
}

impl DiskImageType {
    /// The drive family that reads this kind of image
    pub fn disk_kind(&self) -> DiskKind {
        match self {
            Self::D64 | Self::X64 | Self::G64 => DiskKind::CBM1541,
            Self::D67 => DiskKind::CBM2040,
            Self::D71 => DiskKind::CBM1571,
            Self::D80 => DiskKind::CBM8050,
            Self::D81 => DiskKind::CBM1581,
            Self::D82 => DiskKind::CBM8250
        }
    }
}

impl FromStr for DiskImageType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "d64" => Ok(Self::D64),
            "d67" => Ok(Self::D67),
            "d71" => Ok(Self::D71),
            "d80" => Ok(Self::D80),
            "d81" => Ok(Self::D81),
            "d82" => Ok(Self::D82),
            "x64" => Ok(Self::X64),
            "g64" => Ok(Self::G64),
            _ => Err(Error::UnknownImageType)
        }
    }
}

impl fmt::Display for DiskImageType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::D64 => write!(f,"d64"),
            Self::D67 => write!(f,"d67"),
            Self::D71 => write!(f,"d71"),
            Self::D80 => write!(f,"d80"),
            Self::D81 => write!(f,"d81"),
            Self::D82 => write!(f,"d82"),
            Self::X64 => write!(f,"x64"),
            Self::G64 => write!(f,"g64")
        }
    }
}

impl FromStr for DiskKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "1541" => Ok(Self::CBM1541),
            "2040" => Ok(Self::CBM2040),
            "1571" => Ok(Self::CBM1571),
            "1581" => Ok(Self::CBM1581),
            "8050" => Ok(Self::CBM8050),
            "8250" => Ok(Self::CBM8250),
            _ => Err(Error::UnknownDiskKind)
        }
    }
}

/// Allows the disk kind to be displayed to the console using `println!`.  This also
/// derives `to_string`, so the enum can be converted to `String`.
impl fmt::Display for DiskKind {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CBM1541 => write!(f,"1541"),
            Self::CBM2040 => write!(f,"2040"),
            Self::CBM1571 => write!(f,"1571"),
            Self::CBM1581 => write!(f,"1581"),
            Self::CBM8050 => write!(f,"8050"),
            Self::CBM8250 => write!(f,"8250")
        }
    }
}

/// The main trait for working with any kind of disk image.
/// The corresponding trait object serves as storage for `fs::cbm::Drive`.
/// Reading can mutate the object because the image may be caching
/// decoded tracks.
pub trait DiskImage {
    /// Get the count of tracks, numbered from 1
    fn track_count(&self) -> usize;
    fn kind(&self) -> DiskKind;
    fn what_am_i(&self) -> DiskImageType;
    fn file_extensions(&self) -> Vec<String>;
    /// Get the integrated storage capacity of all sectors
    fn byte_capacity(&self) -> usize {
        geometry::total_blocks(self.kind(),self.track_count()) * geometry::SECTOR_SIZE
    }
    fn is_read_only(&self) -> bool;
    /// Attaching a read-only image makes the drive refuse every write
    fn set_read_only(&mut self,read_only: bool);
    fn to_bytes(&mut self) -> Vec<u8>;
    /// Read a 256 byte sector; out of range requests are an error
    fn read_sector(&mut self,track: usize,sector: usize) -> Result<Vec<u8>,DYNERR>;
    /// Write a sector, the data is padded or truncated to 256 bytes
    fn write_sector(&mut self,track: usize,sector: usize,dat: &[u8]) -> STDRESULT;
    /// The raw error-info byte recorded for this sector, if the image carries any
    fn sector_error(&self,_track: usize,_sector: usize) -> Option<u8> {
        None
    }
    /// Write the disk geometry into a JSON string
    fn export_geometry(&self,indent: Option<u16>) -> Result<String,DYNERR> {
        geometry_json(self.kind(),self.what_am_i(),self.track_count(),indent)
    }
}

fn geometry_json(kind: DiskKind,typ: DiskImageType,tracks: usize,indent: Option<u16>) -> Result<String,DYNERR> {
    let mut root = json::JsonValue::new_object();
    root["image"] = json::JsonValue::String(typ.to_string());
    root["drive"] = json::JsonValue::String(kind.to_string());
    root["blocks"] = json::JsonValue::Number(geometry::total_blocks(kind,tracks).into());
    let mut trk_ary = json::JsonValue::new_array();
    for track in 1..tracks+1 {
        let mut trk_obj = json::JsonValue::new_object();
        trk_obj["track"] = json::JsonValue::Number(track.into());
        trk_obj["sectors"] = json::JsonValue::Number(geometry::sector_count(kind,track).into());
        trk_obj["first_block"] = json::JsonValue::Number(geometry::linear_address(kind,track,0)?.into());
        trk_ary.push(trk_obj)?;
    }
    root["tracks"] = trk_ary;
    if let Some(spaces) = indent {
        Ok(json::stringify_pretty(root,spaces))
    } else {
        Ok(json::stringify(root))
    }
}

/// If a data source is smaller than `quantum` bytes, pad it with zeros.
/// If it is larger, do not include the extra bytes.
pub fn quantize_block(src: &[u8],quantum: usize) -> Vec<u8> {
	let mut padded: Vec<u8> = Vec::new();
	for i in 0..quantum {
		if i<src.len() {
			padded.push(src[i])
		} else {
			padded.push(0);
		}
	}
    return padded;
}
