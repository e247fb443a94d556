//! ## Support for X64 images
//! 
//! An X64 image is a 64 byte header followed by a 1541 sector dump, in the same order as D64.
//! The header records the version of the container, the device type, the track count
//! (zero meaning 35), and a label.

use std::io::Cursor;
use binrw::BinRead;
use log::{trace,error};
use crate::img;
use crate::img::{geometry,DiskKind,DiskImageType};
use crate::{STDRESULT,DYNERR};

pub const HEADER_LEN: usize = 64;
const SECTOR_SIZE: usize = geometry::SECTOR_SIZE;
const VERSION_MAJOR: u8 = 1;
const VERSION_MINOR: u8 = 2;
const DEVICE_1541: u8 = 1;

pub fn file_extensions() -> Vec<String> {
    vec!["x64".to_string()]
}

#[derive(BinRead,Debug,Clone)]
#[br(little, magic = b"C\x15\x41\x64")]
pub struct Header {
    pub version_major: u8,
    pub version_minor: u8,
    pub device_type: u8,
    pub max_tracks: u8,
    pub sides: u8,
    pub error_block: u8,
    #[br(pad_before = 22, count = 31)]
    pub label: Vec<u8>
}

impl Header {
    pub fn from_bytes(buf: &[u8]) -> Result<Self,binrw::Error> {
        Self::read(&mut Cursor::new(buf))
    }
}

/// Wrapper for X64 data.
pub struct X64 {
    header: Vec<u8>,
    tracks: usize,
    read_only: bool,
    data: Vec<u8>
}

impl X64 {
    pub fn create(tracks: usize,label: &str) -> Result<Self,img::Error> {
        if tracks < 35 || tracks > geometry::max_tracks(DiskKind::CBM1541) {
            return Err(img::Error::TrackCountMismatch);
        }
        let mut header = vec![0;HEADER_LEN];
        header[0..4].copy_from_slice(&[b'C',0x15,0x41,0x64]);
        header[4] = VERSION_MAJOR;
        header[5] = VERSION_MINOR;
        header[6] = DEVICE_1541;
        header[7] = tracks as u8;
        let label_bytes = label.as_bytes();
        for i in 0..usize::min(31,label_bytes.len()) {
            header[32+i] = label_bytes[i];
        }
        Ok(Self {
            header,
            tracks,
            read_only: false,
            data: vec![0;geometry::total_blocks(DiskKind::CBM1541,tracks)*SECTOR_SIZE]
        })
    }
    pub fn from_bytes(buf: &[u8]) -> Result<Self,img::Error> {
        let info = img::probe::probe(buf)?;
        if info.typ != DiskImageType::X64 {
            return Err(img::Error::ImageTypeMismatch);
        }
        let data_len = geometry::total_blocks(DiskKind::CBM1541,info.tracks)*SECTOR_SIZE;
        if buf.len() < HEADER_LEN + data_len {
            error!("X64 image is truncated");
            return Err(img::Error::ImageSizeMismatch);
        }
        Ok(Self {
            header: buf[0..HEADER_LEN].to_vec(),
            tracks: info.tracks,
            read_only: false,
            data: buf[HEADER_LEN..HEADER_LEN+data_len].to_vec()
        })
    }
    /// The label stored in the header, NUL bytes removed
    pub fn label(&self) -> String {
        let bytes: Vec<u8> = self.header[32..63].iter().copied().filter(|b| *b!=0).collect();
        String::from_utf8_lossy(&bytes).to_string()
    }
    fn offset(&self,track: usize,sector: usize) -> Result<usize,DYNERR> {
        if track > self.tracks {
            error!("exceeded bounds: track {} sector {}",track,sector);
            return Err(Box::new(img::Error::GeometryMismatch));
        }
        match geometry::linear_address(DiskKind::CBM1541,track,sector) {
            Ok(block) => Ok(block*SECTOR_SIZE),
            Err(e) => {
                error!("exceeded bounds: track {} sector {}",track,sector);
                Err(Box::new(e))
            }
        }
    }
}

impl img::DiskImage for X64 {
    fn track_count(&self) -> usize {
        self.tracks
    }
    fn kind(&self) -> DiskKind {
        DiskKind::CBM1541
    }
    fn what_am_i(&self) -> DiskImageType {
        DiskImageType::X64
    }
    fn file_extensions(&self) -> Vec<String> {
        file_extensions()
    }
    fn is_read_only(&self) -> bool {
        self.read_only
    }
    fn set_read_only(&mut self,read_only: bool) {
        self.read_only = read_only;
    }
    fn to_bytes(&mut self) -> Vec<u8> {
        [self.header.clone(),self.data.clone()].concat()
    }
    fn read_sector(&mut self,track: usize,sector: usize) -> Result<Vec<u8>,DYNERR> {
        trace!("read {},{}",track,sector);
        let offset = self.offset(track,sector)?;
        Ok(self.data[offset..offset+SECTOR_SIZE].to_vec())
    }
    fn write_sector(&mut self,track: usize,sector: usize,dat: &[u8]) -> STDRESULT {
        trace!("write {},{}",track,sector);
        if self.read_only {
            return Err(Box::new(img::Error::WriteProtect));
        }
        let offset = self.offset(track,sector)?;
        self.data[offset..offset+SECTOR_SIZE].copy_from_slice(&img::quantize_block(dat,SECTOR_SIZE));
        Ok(())
    }
}

#[test]
fn header_round_trip() {
    let mut img = X64::create(35,"TEST LABEL").expect("create failed");
    let bytes = img::DiskImage::to_bytes(&mut img);
    let header = Header::from_bytes(&bytes).expect("header not parsed");
    assert_eq!(header.max_tracks,35);
    assert_eq!(&header.label[0..10],b"TEST LABEL");
    let reloaded = X64::from_bytes(&bytes).expect("not identified");
    assert_eq!(reloaded.label(),"TEST LABEL");
}
