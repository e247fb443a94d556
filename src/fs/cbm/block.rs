//! Block access on behalf of the DOS.
//! 
//! Errors coming from the image layer are translated into the DOS error that a
//! real drive would report for the same condition.

use log::{trace,debug};
use crate::img::{self,DiskImage,NibbleError};
use crate::DYNERR;
use super::types::*;

/// Translate an image layer error into a DOS error code
fn dos_error(e: &DYNERR) -> DosError {
    if let Some(err) = e.downcast_ref::<img::Error>() {
        return match err {
            img::Error::GeometryMismatch => DosError::IllegalTrackSector,
            img::Error::WriteProtect => DosError::WriteProtect,
            img::Error::TrackAccess => DosError::NoSync,
            _ => DosError::NotReady
        };
    }
    if let Some(err) = e.downcast_ref::<NibbleError>() {
        return match err {
            NibbleError::SyncNotFound | NibbleError::BadTrack => DosError::NoSync,
            NibbleError::SectorNotFound => DosError::HeaderNotFound,
            NibbleError::BadChecksum => DosError::DataChecksum,
            NibbleError::InvalidByte => DosError::ByteDecoding
        };
    }
    DosError::NotReady
}

/// Read a block.  A block flagged in the image's error information fails with the flagged code.
pub fn read_block(img: &mut dyn DiskImage,track: usize,sector: usize) -> Result<Vec<u8>,Fault> {
    if let Some(info) = img.sector_error(track,sector) {
        let err = DosError::from_error_info(info);
        if err != DosError::Ok {
            debug!("error info {} flagged at {},{}",err.code(),track,sector);
            return Err(Fault::at(err,track,sector));
        }
    }
    match img.read_sector(track,sector) {
        Ok(buf) => {
            trace!("read {},{}",track,sector);
            let mut ans = buf;
            ans.resize(SECTOR_SIZE,0);
            Ok(ans)
        },
        Err(e) => {
            debug!("read {},{} failed: {}",track,sector,e);
            Err(Fault::at(dos_error(&e),track,sector))
        }
    }
}

/// Write a block, the buffer should hold 256 bytes
pub fn write_block(img: &mut dyn DiskImage,track: usize,sector: usize,dat: &[u8]) -> Result<(),Fault> {
    if img.is_read_only() {
        return Err(Fault::at(DosError::WriteProtect,track,sector));
    }
    match img.write_sector(track,sector,dat) {
        Ok(()) => {
            trace!("write {},{}",track,sector);
            Ok(())
        },
        Err(e) => {
            debug!("write {},{} failed: {}",track,sector,e);
            Err(Fault::at(dos_error(&e),track,sector))
        }
    }
}
