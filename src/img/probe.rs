//! # Format Prober
//! 
//! Identifies the image type from the raw bytes.  Flat images carry no signature, so they are
//! recognized by exact size.  GCR and X64 images are recognized by their headers.
//! The candidates are tried in a fixed order and the first match wins, so the answer depends
//! only on the bytes.

use log::{debug,trace};
use super::{geometry,DiskKind,DiskImageType,Error};
use super::{g64,x64};

const D67_SIZE: usize = 690 * 256;
const D71_SIZE: usize = 1366 * 256;
const D81_SIZE: usize = 3200 * 256;
const D80_SIZE: usize = 2083 * 256;
const D82_SIZE: usize = 4166 * 256;

/// What the prober learned about an image
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub struct ProbeInfo {
    pub typ: DiskImageType,
    /// tracks as numbered by DOS, starting from 1
    pub tracks: usize,
    /// whether one error byte per block follows the sector data
    pub error_info: bool
}

impl ProbeInfo {
    fn new(typ: DiskImageType,tracks: usize,error_info: bool) -> Self {
        Self { typ, tracks, error_info }
    }
}

/// Test for a flat 1541 image with 35 to 42 tracks, with or without error bytes.
fn probe_d64(len: usize) -> Option<ProbeInfo> {
    for tracks in 35..43 {
        let blocks = geometry::total_blocks(DiskKind::CBM1541,tracks);
        if len == blocks * 256 {
            return Some(ProbeInfo::new(DiskImageType::D64,tracks,false));
        }
        if len == blocks * 257 {
            return Some(ProbeInfo::new(DiskImageType::D64,tracks,true));
        }
    }
    None
}

/// Identify the image type and track count.  Returns an error if nothing matches.
pub fn probe(dat: &[u8]) -> Result<ProbeInfo,Error> {
    let len = dat.len();
    trace!("probing {} bytes",len);
    if let Some(info) = probe_d64(len) {
        return Ok(info);
    }
    let fixed = [
        (D67_SIZE,DiskImageType::D67),
        (D71_SIZE,DiskImageType::D71),
        (D81_SIZE,DiskImageType::D81),
        (D80_SIZE,DiskImageType::D80),
        (D82_SIZE,DiskImageType::D82)
    ];
    for (size,typ) in fixed {
        if len == size {
            return Ok(ProbeInfo::new(typ,geometry::max_tracks(typ.disk_kind()),false));
        }
    }
    match g64::Header::from_bytes(dat) {
        Ok(header) => {
            if header.version != 0 {
                debug!("GCR image has wrong version {}",header.version);
            } else if header.half_tracks < 70 || header.half_tracks > 168 {
                debug!("GCR image has invalid number of half tracks {}",header.half_tracks);
            } else if header.max_track_len != g64::MAX_TRACK_LEN {
                debug!("GCR image has invalid track field size {}",header.max_track_len);
            } else {
                return Ok(ProbeInfo::new(DiskImageType::G64,header.half_tracks as usize/2,false));
            }
        },
        Err(e) => trace!("not GCR: {}",e)
    }
    match x64::Header::from_bytes(dat) {
        Ok(header) => {
            let tracks = match header.max_tracks {
                0 => 35,
                t => t as usize
            };
            if tracks < 35 || tracks > geometry::max_tracks(DiskKind::CBM1541) {
                debug!("X64 image has invalid track count {}",tracks);
            } else {
                return Ok(ProbeInfo::new(DiskImageType::X64,tracks,false));
            }
        },
        Err(e) => trace!("not X64: {}",e)
    }
    return Err(Error::UnknownImageType);
}

#[test]
fn d64_sizes() {
    assert_eq!(probe(&vec![0;174848]).unwrap(),ProbeInfo::new(DiskImageType::D64,35,false));
    assert_eq!(probe(&vec![0;175531]).unwrap(),ProbeInfo::new(DiskImageType::D64,35,true));
    assert_eq!(probe(&vec![0;196608]).unwrap(),ProbeInfo::new(DiskImageType::D64,40,false));
    assert_eq!(probe(&vec![0;197376]).unwrap(),ProbeInfo::new(DiskImageType::D64,40,true));
    assert!(probe(&vec![0;174847]).is_err());
}

#[test]
fn fixed_sizes() {
    assert_eq!(probe(&vec![0;D71_SIZE]).unwrap().typ,DiskImageType::D71);
    assert_eq!(probe(&vec![0;D81_SIZE]).unwrap().tracks,80);
    assert_eq!(probe(&vec![0;D82_SIZE]).unwrap().tracks,154);
}
