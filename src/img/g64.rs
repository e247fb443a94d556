//! ## Support for GCR track images (G64)
//! 
//! A G64 image stores the raw GCR bytes of every half track, as a 1541 would see them
//! passing under the head.  Only standard 1541 sector layouts are decoded; the tracks
//! are kept as they are found, and a sector write re-encodes just that sector's data block.
//! 
//! The header is followed by a table of half track offsets and a table of speed zones.
//! Each track is stored as a 16 bit length followed by the track bytes.

use std::io::Cursor;
use binrw::BinRead;
use log::{trace,error};
use crate::img;
use crate::img::{geometry,gcr,DiskImage,DiskKind,DiskImageType};
use crate::{STDRESULT,DYNERR};

pub const MAX_TRACK_LEN: u16 = 7928;
const HEADER_LEN: usize = 12;
const STANDARD_HALF_TRACKS: u8 = 84;

pub fn file_extensions() -> Vec<String> {
    vec!["g64".to_string()]
}

#[derive(BinRead,Debug,Clone)]
#[br(little, magic = b"GCR-1541")]
pub struct Header {
    pub version: u8,
    pub half_tracks: u8,
    pub max_track_len: u16,
    #[br(count = half_tracks)]
    pub track_offsets: Vec<u32>,
    #[br(count = half_tracks)]
    pub speed_zones: Vec<u32>
}

impl Header {
    pub fn from_bytes(buf: &[u8]) -> Result<Self,binrw::Error> {
        Self::read(&mut Cursor::new(buf))
    }
}

/// speed zone and nominal track length for a 1541 track
fn zone_params(track: usize) -> (u32,usize) {
    match track {
        t if t <= 17 => (3,7692),
        t if t <= 24 => (2,7142),
        t if t <= 30 => (1,6666),
        _ => (0,6250)
    }
}

/// Wrapper for G64 data.
pub struct G64 {
    header: Header,
    read_only: bool,
    data: Vec<u8>
}

impl G64 {
    /// Create a low level formatted image with `tracks` tracks.
    /// The `id` is written into every sector header.
    pub fn create(tracks: usize,id: [u8;2]) -> Self {
        let half_tracks = STANDARD_HALF_TRACKS as usize;
        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(b"GCR-1541");
        data.push(0);
        data.push(STANDARD_HALF_TRACKS);
        data.extend_from_slice(&u16::to_le_bytes(MAX_TRACK_LEN));
        let table_end = HEADER_LEN + 8 * half_tracks;
        let mut offsets = vec![0u32;half_tracks];
        let mut speeds = vec![0u32;half_tracks];
        let mut track_data: Vec<u8> = Vec::new();
        for track in 1..tracks+1 {
            let (speed,len) = zone_params(track);
            offsets[(track-1)*2] = (table_end + track_data.len()) as u32;
            speeds[(track-1)*2] = speed;
            let mut buf = gcr::format_track(track as u8,geometry::sector_count(DiskKind::CBM1541,track),id,len);
            track_data.extend_from_slice(&u16::to_le_bytes(len as u16));
            buf.resize(MAX_TRACK_LEN as usize,0);
            track_data.append(&mut buf);
        }
        for off in &offsets {
            data.extend_from_slice(&u32::to_le_bytes(*off));
        }
        for speed in &speeds {
            data.extend_from_slice(&u32::to_le_bytes(*speed));
        }
        data.append(&mut track_data);
        Self {
            header: Header {
                version: 0,
                half_tracks: STANDARD_HALF_TRACKS,
                max_track_len: MAX_TRACK_LEN,
                track_offsets: offsets,
                speed_zones: speeds
            },
            read_only: false,
            data
        }
    }
    pub fn from_bytes(buf: &[u8]) -> Result<Self,img::Error> {
        let info = img::probe::probe(buf)?;
        if info.typ != DiskImageType::G64 {
            return Err(img::Error::ImageTypeMismatch);
        }
        match Header::from_bytes(buf) {
            Ok(header) => Ok(Self {
                header,
                read_only: false,
                data: buf.to_vec()
            }),
            Err(_) => Err(img::Error::ImageTypeMismatch)
        }
    }
    /// Get the byte range of a full track's GCR data within the image
    fn track_range(&self,track: usize) -> Result<std::ops::Range<usize>,DYNERR> {
        let idx = (track-1)*2;
        let offset = match self.header.track_offsets.get(idx) {
            Some(0) | None => {
                error!("track {} is not present in GCR image",track);
                return Err(Box::new(img::Error::TrackAccess));
            },
            Some(o) => *o as usize
        };
        if offset + 2 > self.data.len() {
            return Err(Box::new(img::Error::TrackAccess));
        }
        let len = u16::from_le_bytes([self.data[offset],self.data[offset+1]]) as usize;
        if len > MAX_TRACK_LEN as usize || offset + 2 + len > self.data.len() {
            error!("track field length {} is not supported",len);
            return Err(Box::new(img::Error::TrackAccess));
        }
        Ok(offset+2..offset+2+len)
    }
    fn check_coordinates(&self,track: usize,sector: usize) -> STDRESULT {
        if track < 1 || track > self.track_count() || sector >= geometry::sector_count(DiskKind::CBM1541,track) {
            error!("exceeded bounds: track {} sector {}",track,sector);
            return Err(Box::new(img::Error::GeometryMismatch));
        }
        Ok(())
    }
}

impl img::DiskImage for G64 {
    /// Highest full track that is present in the image
    fn track_count(&self) -> usize {
        let max = usize::min(self.header.half_tracks as usize / 2,geometry::max_tracks(DiskKind::CBM1541));
        (1..max+1).filter(|t| self.header.track_offsets.get((t-1)*2).map_or(false,|o| *o != 0)).max().unwrap_or(0)
    }
    fn kind(&self) -> DiskKind {
        DiskKind::CBM1541
    }
    fn what_am_i(&self) -> DiskImageType {
        DiskImageType::G64
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
        self.data.clone()
    }
    fn read_sector(&mut self,track: usize,sector: usize) -> Result<Vec<u8>,DYNERR> {
        trace!("read {},{}",track,sector);
        self.check_coordinates(track,sector)?;
        let rng = self.track_range(track)?;
        match gcr::decode_sector(&self.data[rng],track as u8,sector as u8) {
            Ok(dat) => Ok(dat),
            Err(e) => {
                error!("cannot find track {} sector {} within GCR image",track,sector);
                Err(Box::new(e))
            }
        }
    }
    fn write_sector(&mut self,track: usize,sector: usize,dat: &[u8]) -> STDRESULT {
        trace!("write {},{}",track,sector);
        if self.read_only {
            return Err(Box::new(img::Error::WriteProtect));
        }
        self.check_coordinates(track,sector)?;
        let rng = self.track_range(track)?;
        let padded = img::quantize_block(dat,geometry::SECTOR_SIZE);
        match gcr::encode_sector(&mut self.data[rng],track as u8,sector as u8,&padded) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("cannot write track {} sector {} within GCR image",track,sector);
                Err(Box::new(e))
            }
        }
    }
}

#[test]
fn created_image_probes() {
    let mut img = G64::create(35,[0x30,0x30]);
    let bytes = img::DiskImage::to_bytes(&mut img);
    let info = img::probe::probe(&bytes).unwrap();
    assert_eq!(info.typ,DiskImageType::G64);
    assert_eq!(info.tracks,42);
    assert_eq!(img::DiskImage::track_count(&img),35);
}
