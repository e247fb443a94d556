//! # Track and Sector Arithmetic
//! 
//! Static zone tables for every supported drive, and the mapping from a DOS track and sector
//! to the linear block number used by flat images.  Double sided drives other than the 1581
//! store side two as a second copy of the side one zone table, which follows all of side one
//! in the image.

use log::error;
use super::{DiskKind,Error};

pub const SECTOR_SIZE: usize = 256;

/// (last track of zone, sectors per track) for the 1541
const ZONES_1541: [(usize,usize);4] = [(17,21),(24,19),(30,18),(42,17)];
/// (last track of zone, sectors per track) for the 2040 running DOS 1
const ZONES_2040: [(usize,usize);4] = [(17,21),(24,20),(30,18),(35,17)];
/// (last track of zone, sectors per track) for the 8050, also each side of the 8250
const ZONES_8050: [(usize,usize);4] = [(39,29),(53,27),(64,25),(77,23)];
const SECTORS_1581: usize = 40;

fn zone_lookup(zones: &[(usize,usize)],track: usize) -> usize {
    for (last,sectors) in zones {
        if track <= *last {
            return *sectors;
        }
    }
    0
}

/// Highest track number that can be addressed for this kind of disk
pub fn max_tracks(kind: DiskKind) -> usize {
    match kind {
        DiskKind::CBM1541 => 42,
        DiskKind::CBM2040 => 35,
        DiskKind::CBM1571 => 70,
        DiskKind::CBM1581 => 80,
        DiskKind::CBM8050 => 77,
        DiskKind::CBM8250 => 154
    }
}

/// Track count of a freshly formatted disk of this kind
pub fn nominal_tracks(kind: DiskKind) -> usize {
    match kind {
        DiskKind::CBM1541 => 35,
        k => max_tracks(k)
    }
}

/// Number of sectors on `track`, or 0 if the track does not exist on this kind of disk.
pub fn sector_count(kind: DiskKind,track: usize) -> usize {
    if track < 1 || track > max_tracks(kind) {
        error!("track {} out of range for {}",track,kind);
        return 0;
    }
    match kind {
        DiskKind::CBM1541 => zone_lookup(&ZONES_1541,track),
        DiskKind::CBM2040 => zone_lookup(&ZONES_2040,track),
        DiskKind::CBM1571 if track > 35 => zone_lookup(&ZONES_1541,track-35),
        DiskKind::CBM1571 => zone_lookup(&ZONES_1541,track),
        DiskKind::CBM1581 => SECTORS_1581,
        DiskKind::CBM8050 => zone_lookup(&ZONES_8050,track),
        DiskKind::CBM8250 if track > 77 => zone_lookup(&ZONES_8050,track-77),
        DiskKind::CBM8250 => zone_lookup(&ZONES_8050,track)
    }
}

/// Total number of blocks on the first `tracks` tracks
pub fn total_blocks(kind: DiskKind,tracks: usize) -> usize {
    let end = usize::min(tracks,max_tracks(kind));
    (1..end+1).map(|t| sector_count(kind,t)).sum()
}

/// Map track and sector to the linear block number, i.e., the index of the sector
/// in a flat image.  Any coordinate outside the zone table is an error.
pub fn linear_address(kind: DiskKind,track: usize,sector: usize) -> Result<usize,Error> {
    if track < 1 || track > max_tracks(kind) || sector >= sector_count(kind,track) {
        return Err(Error::GeometryMismatch);
    }
    let (side_kind,side_track,side_offset) = match kind {
        DiskKind::CBM1581 => return Ok((track-1)*SECTORS_1581 + sector),
        DiskKind::CBM1571 if track > 35 => (DiskKind::CBM1541,track-35,total_blocks(DiskKind::CBM1541,35)),
        DiskKind::CBM1571 => (DiskKind::CBM1541,track,0),
        DiskKind::CBM8250 if track > 77 => (DiskKind::CBM8050,track-77,total_blocks(DiskKind::CBM8050,77)),
        DiskKind::CBM8250 => (DiskKind::CBM8050,track,0),
        k => (k,track,0)
    };
    Ok(side_offset + total_blocks(side_kind,side_track-1) + sector)
}

#[test]
fn documented_totals() {
    assert_eq!(total_blocks(DiskKind::CBM1541,35),683);
    assert_eq!(total_blocks(DiskKind::CBM1541,40),768);
    assert_eq!(total_blocks(DiskKind::CBM1541,42),802);
    assert_eq!(total_blocks(DiskKind::CBM2040,35),690);
    assert_eq!(total_blocks(DiskKind::CBM1571,70),1366);
    assert_eq!(total_blocks(DiskKind::CBM1581,80),3200);
    assert_eq!(total_blocks(DiskKind::CBM8050,77),2083);
    assert_eq!(total_blocks(DiskKind::CBM8250,154),4166);
}

#[test]
fn side_two_offsets() {
    assert_eq!(linear_address(DiskKind::CBM1571,36,0).unwrap(),683);
    assert_eq!(linear_address(DiskKind::CBM1571,53,0).unwrap(),683+357);
    assert_eq!(linear_address(DiskKind::CBM8250,78,0).unwrap(),2083);
    assert_eq!(linear_address(DiskKind::CBM1581,40,3).unwrap(),39*40+3);
    assert_eq!(linear_address(DiskKind::CBM1541,18,0).unwrap(),357);
}

#[test]
fn out_of_range() {
    assert_eq!(sector_count(DiskKind::CBM1541,0),0);
    assert_eq!(sector_count(DiskKind::CBM1541,43),0);
    assert!(linear_address(DiskKind::CBM1541,0,0).is_err());
    assert!(linear_address(DiskKind::CBM1541,18,19).is_err());
    assert!(linear_address(DiskKind::CBM2040,36,0).is_err());
    assert!(linear_address(DiskKind::CBM1581,1,40).is_err());
}
