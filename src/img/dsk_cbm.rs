//! ## Support for flat Commodore images (D64,D67,D71,D80,D81,D82)
//! 
//! These are a simple sequential dump of the decoded sectors, in linear block order.
//! A D64 may be followed by one error byte per block, recording the status the original
//! drive reported for that block when the image was made.

use log::{trace,error};
use crate::img;
use crate::img::{geometry,DiskImage,DiskKind,DiskImageType};
use crate::{STDRESULT,DYNERR};

const SECTOR_SIZE: usize = geometry::SECTOR_SIZE;

pub fn file_extensions() -> Vec<String> {
    vec!["d64".to_string(),"d67".to_string(),"d71".to_string(),"d80".to_string(),"d81".to_string(),"d82".to_string()]
}

/// Wrapper for flat image data.
pub struct Dsk {
    typ: DiskImageType,
    tracks: usize,
    read_only: bool,
    data: Vec<u8>,
    errors: Option<Vec<u8>>
}

impl Dsk {
    /// Create a blank image.  Only a D64 can have other than the standard number of tracks.
    pub fn create(typ: DiskImageType,tracks: usize) -> Result<Self,img::Error> {
        let kind = typ.disk_kind();
        match typ {
            DiskImageType::D64 if tracks >= 35 && tracks <= geometry::max_tracks(kind) => {},
            DiskImageType::D67 | DiskImageType::D71 | DiskImageType::D80 |
            DiskImageType::D81 | DiskImageType::D82 if tracks == geometry::max_tracks(kind) => {},
            DiskImageType::X64 | DiskImageType::G64 => return Err(img::Error::ImageTypeMismatch),
            _ => return Err(img::Error::TrackCountMismatch)
        }
        Ok(Self {
            typ,
            tracks,
            read_only: false,
            data: vec![0;geometry::total_blocks(kind,tracks)*SECTOR_SIZE],
            errors: None
        })
    }
    pub fn from_bytes(buf: &[u8]) -> Result<Self,img::Error> {
        let info = img::probe::probe(buf)?;
        match info.typ {
            DiskImageType::X64 | DiskImageType::G64 => return Err(img::Error::ImageTypeMismatch),
            _ => {}
        }
        let data_len = geometry::total_blocks(info.typ.disk_kind(),info.tracks)*SECTOR_SIZE;
        Ok(Self {
            typ: info.typ,
            tracks: info.tracks,
            read_only: false,
            data: buf[0..data_len].to_vec(),
            errors: match info.error_info {
                true => Some(buf[data_len..].to_vec()),
                false => None
            }
        })
    }
    fn offset(&self,track: usize,sector: usize) -> Result<usize,DYNERR> {
        if track > self.tracks {
            error!("exceeded bounds: track {} sector {}",track,sector);
            return Err(Box::new(img::Error::GeometryMismatch));
        }
        match geometry::linear_address(self.kind(),track,sector) {
            Ok(block) => Ok(block*SECTOR_SIZE),
            Err(e) => {
                error!("exceeded bounds: track {} sector {}",track,sector);
                Err(Box::new(e))
            }
        }
    }
}

impl img::DiskImage for Dsk {
    fn track_count(&self) -> usize {
        self.tracks
    }
    fn kind(&self) -> DiskKind {
        self.typ.disk_kind()
    }
    fn what_am_i(&self) -> DiskImageType {
        self.typ
    }
    fn file_extensions(&self) -> Vec<String> {
        vec![self.typ.to_string()]
    }
    fn is_read_only(&self) -> bool {
        self.read_only
    }
    fn set_read_only(&mut self,read_only: bool) {
        self.read_only = read_only;
    }
    fn to_bytes(&mut self) -> Vec<u8> {
        let mut ans = self.data.clone();
        if let Some(errors) = &self.errors {
            ans.extend_from_slice(errors);
        }
        ans
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
        let padded = img::quantize_block(dat,SECTOR_SIZE);
        self.data[offset..offset+SECTOR_SIZE].copy_from_slice(&padded);
        Ok(())
    }
    fn sector_error(&self,track: usize,sector: usize) -> Option<u8> {
        match (&self.errors,geometry::linear_address(self.kind(),track,sector)) {
            (Some(errors),Ok(block)) => errors.get(block).copied(),
            _ => None
        }
    }
}
