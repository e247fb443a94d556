//! # Block Availability Map
//! 
//! The BAM is held in memory as the header sector plus the sectors holding the bitmaps,
//! exactly as they appear on disk.  Every DOS flavor stores, for each track, a count of free
//! sectors followed by a bitmap with bit `s%8` of byte `s/8` set when sector `s` is free.
//! Only the placement of these entries differs.
//! 
//! Allocation spirals outward from the directory track, which is never handed out for file data.

use log::{debug,trace};
use crate::img::{geometry,DiskImage};
use super::types::*;
use super::block;

/// Location of one track's entry within the BAM sectors
struct Entry {
    /// which of the BAM sectors
    blk: usize,
    /// offset of the free count
    count: usize,
    /// offset of the bitmap
    map: usize,
    /// bytes in the bitmap
    map_len: usize,
    /// the count lives elsewhere than the bitmap (1571 side two)
    count_blk: usize
}

/// In-memory copy of the BAM sectors
#[derive(Clone)]
pub struct Bam {
    fmt: DosFormat,
    tracks: usize,
    locs: Vec<[usize;2]>,
    blocks: Vec<Vec<u8>>
}

/// Sectors holding the header and the bitmaps, header first
fn bam_locations(fmt: DosFormat) -> Vec<[usize;2]> {
    match fmt {
        DosFormat::D1541 | DosFormat::D2040 => vec![[18,0]],
        DosFormat::D1571 => vec![[18,0],[53,0]],
        DosFormat::D1581 => vec![[40,0],[40,1],[40,2]],
        DosFormat::D8050 => vec![[39,0],[38,0],[38,3]],
        DosFormat::D8250 => vec![[39,0],[38,0],[38,3],[38,6],[38,9]]
    }
}

/// Track ranges [lo,hi) of the 8050/8250 bitmap sectors
fn ieee_ranges(fmt: DosFormat) -> Vec<[usize;2]> {
    match fmt {
        DosFormat::D8050 => vec![[1,51],[51,79]],
        _ => vec![[1,51],[51,101],[101,151],[151,155]]
    }
}

impl Bam {
    /// Wrap BAM sectors that were read from the disk, in the order given by `locations`
    pub fn from_blocks(fmt: DosFormat,tracks: usize,blocks: Vec<Vec<u8>>) -> Self {
        Self {
            fmt,
            tracks,
            locs: bam_locations(fmt),
            blocks
        }
    }
    /// Read the BAM sectors from the disk
    pub fn load(img: &mut dyn DiskImage,fmt: DosFormat) -> Result<Self,Fault> {
        let mut blocks = Vec::new();
        for [t,s] in bam_locations(fmt) {
            blocks.push(block::read_block(img,t,s)?);
        }
        Ok(Self::from_blocks(fmt,img.track_count(),blocks))
    }
    /// Write the BAM sectors to the disk
    pub fn flush(&self,img: &mut dyn DiskImage) -> Result<(),Fault> {
        for ([t,s],buf) in self.blocks() {
            block::write_block(img,t,s,buf)?;
        }
        Ok(())
    }
    /// Where the BAM sectors live for this format
    pub fn locations(fmt: DosFormat) -> Vec<[usize;2]> {
        bam_locations(fmt)
    }
    /// Create the BAM of a freshly formatted disk, all sectors allocated.
    /// Run validation afterwards to free the sectors.
    pub fn create_empty(fmt: DosFormat,tracks: usize,name: &[u8],id: &[u8]) -> Self {
        let locs = bam_locations(fmt);
        let mut blocks = vec![vec![0;SECTOR_SIZE];locs.len()];
        let hdr = &mut blocks[0];
        let name_off = fmt.name_offset();
        let id_off = fmt.id_offset();
        match fmt {
            DosFormat::D8050 | DosFormat::D8250 => {
                hdr[0] = 38;
                hdr[1] = 0;
            },
            _ => {
                hdr[0] = fmt.dir_track() as u8;
                hdr[1] = fmt.first_dir_sector() as u8;
            }
        }
        hdr[2] = fmt.format_byte();
        if fmt == DosFormat::D1571 {
            hdr[3] = 0x80;
        }
        for i in 0..fmt.pad_len() {
            hdr[name_off + i] = PAD;
        }
        for i in 0..usize::min(name.len(),MAX_NAME_LEN) {
            hdr[name_off + i] = name[i];
        }
        for i in 0..usize::min(id.len(),2) {
            hdr[id_off + i] = id[i];
        }
        hdr[id_off + 3] = b'0' + match fmt {
            DosFormat::D1581 => 3,
            _ => 2
        };
        hdr[id_off + 4] = fmt.format_byte();
        match fmt {
            DosFormat::D1581 => {
                blocks[1][0] = 40;
                blocks[1][1] = 2;
                blocks[2][0] = 0;
                blocks[2][1] = 0xff;
                for b in 1..3 {
                    blocks[b][2] = b'D';
                    blocks[b][3] = 0xbb;
                    blocks[b][4] = id.get(0).copied().unwrap_or(PAD);
                    blocks[b][5] = id.get(1).copied().unwrap_or(PAD);
                    blocks[b][6] = 0xc0;
                }
            },
            DosFormat::D8050 | DosFormat::D8250 => {
                let ranges = ieee_ranges(fmt);
                for b in 1..blocks.len() {
                    let next = match b+1 < locs.len() {
                        true => locs[b+1],
                        false => [fmt.dir_track(),fmt.first_dir_sector()]
                    };
                    blocks[b][0] = next[0] as u8;
                    blocks[b][1] = next[1] as u8;
                    blocks[b][2] = b'C';
                    blocks[b][4] = ranges[b-1][0] as u8;
                    blocks[b][5] = ranges[b-1][1] as u8;
                }
            },
            _ => {}
        }
        Self { fmt, tracks, locs, blocks }
    }
    pub fn blocks(&self) -> impl Iterator<Item = ([usize;2],&Vec<u8>)> {
        self.locs.iter().copied().zip(self.blocks.iter())
    }
    pub fn header(&self) -> &[u8] {
        &self.blocks[0]
    }
    pub fn format(&self) -> DosFormat {
        self.fmt
    }
    pub fn tracks(&self) -> usize {
        self.tracks
    }
    /// Disk name with padding, as stored
    pub fn disk_name(&self) -> Vec<u8> {
        let off = self.fmt.name_offset();
        self.blocks[0][off..off+MAX_NAME_LEN].to_vec()
    }
    /// Disk id, pad, and DOS type, as shown in a listing
    pub fn disk_id(&self) -> Vec<u8> {
        let off = self.fmt.id_offset();
        self.blocks[0][off..off+5].to_vec()
    }
    fn entry(&self,track: usize) -> Option<Entry> {
        if track < 1 || track > self.tracks {
            return None;
        }
        let simple = |blk: usize,count: usize,map_len: usize| Some(Entry { blk, count, map: count+1, map_len, count_blk: blk });
        match self.fmt {
            DosFormat::D1541 | DosFormat::D2040 | DosFormat::D1571 if track <= 35 => simple(0,4+4*(track-1),3),
            DosFormat::D1541 if track <= 40 => simple(0,0xc0+4*(track-36),3),
            DosFormat::D1571 if track <= 70 => Some(Entry {
                blk: 1,
                count: 0xdd+track-36,
                map: 3*(track-36),
                map_len: 3,
                count_blk: 0
            }),
            DosFormat::D1581 if track <= 40 => simple(1,0x10+6*(track-1),5),
            DosFormat::D1581 => simple(2,0x10+6*(track-41),5),
            DosFormat::D8050 | DosFormat::D8250 => {
                for (i,[lo,hi]) in ieee_ranges(self.fmt).into_iter().enumerate() {
                    if track >= lo && track < hi {
                        return simple(i+1,6+5*(track-lo),4);
                    }
                }
                None
            },
            _ => None
        }
    }
    /// Test whether a sector is free.  Tracks without a BAM entry are never free.
    pub fn is_free(&self,track: usize,sector: usize) -> bool {
        if sector >= geometry::sector_count(self.fmt.kind(),track) {
            return false;
        }
        match self.entry(track) {
            Some(e) => self.blocks[e.blk][e.map + sector/8] & (1 << (sector%8)) != 0,
            None => false
        }
    }
    /// Mark a sector used, returns false if it was not free
    pub fn allocate(&mut self,track: usize,sector: usize) -> bool {
        if !self.is_free(track,sector) {
            return false;
        }
        if let Some(e) = self.entry(track) {
            self.blocks[e.blk][e.map + sector/8] &= !(1 << (sector%8));
            self.blocks[e.count_blk][e.count] = self.blocks[e.count_blk][e.count].wrapping_sub(1);
            trace!("allocate {},{}",track,sector);
            return true;
        }
        false
    }
    /// Mark a sector free, returns false if it was already free or has no entry
    pub fn free(&mut self,track: usize,sector: usize) -> bool {
        if sector >= geometry::sector_count(self.fmt.kind(),track) || self.is_free(track,sector) {
            return false;
        }
        if let Some(e) = self.entry(track) {
            self.blocks[e.blk][e.map + sector/8] |= 1 << (sector%8);
            self.blocks[e.count_blk][e.count] = self.blocks[e.count_blk][e.count].wrapping_add(1);
            trace!("free {},{}",track,sector);
            return true;
        }
        false
    }
    /// Mark every sector used
    pub fn clear(&mut self) {
        for track in 1..self.tracks+1 {
            if let Some(e) = self.entry(track) {
                self.blocks[e.count_blk][e.count] = 0;
                for i in 0..e.map_len {
                    self.blocks[e.blk][e.map + i] = 0;
                }
            }
        }
    }
    /// Mark every sector that has a BAM entry free
    pub fn free_all(&mut self) {
        for track in 1..self.tracks+1 {
            for sector in 0..geometry::sector_count(self.fmt.kind(),track) {
                self.free(track,sector);
            }
        }
    }
    /// Free sectors on a track according to the stored count
    pub fn free_on_track(&self,track: usize) -> usize {
        match self.entry(track) {
            Some(e) => self.blocks[e.count_blk][e.count] as usize,
            None => 0
        }
    }
    /// Free blocks as shown in a listing, the system tracks do not count
    pub fn blocks_free(&self) -> usize {
        let mut ans = 0;
        for track in 1..self.tracks+1 {
            if track == self.fmt.dir_track() || (self.fmt == DosFormat::D1571 && track == 53) {
                continue;
            }
            ans += self.free_on_track(track);
        }
        ans
    }
    /// How far allocation may move from the directory track
    fn disk_half(&self) -> usize {
        let center = self.fmt.dir_track();
        usize::max(center - 1,self.tracks.saturating_sub(center))
    }
    fn alloc_on_track(&mut self,track: usize) -> Option<[usize;2]> {
        if track == self.fmt.dir_track() {
            return None;
        }
        for sector in 0..geometry::sector_count(self.fmt.kind(),track) {
            if self.allocate(track,sector) {
                return Some([track,sector]);
            }
        }
        None
    }
    /// Allocate a sector on the directory track for extending the directory,
    /// searching from `after` with an interleave of 3.
    pub fn alloc_dir_sector(&mut self,after: usize) -> Option<[usize;2]> {
        let track = self.fmt.dir_track();
        let count = geometry::sector_count(self.fmt.kind(),track);
        for i in 0..count {
            let sector = (after + 3 + i) % count;
            if self.allocate(track,sector) {
                return Some([track,sector]);
            }
        }
        None
    }
    /// Allocate the first sector of a file, nearest the directory track
    pub fn alloc_first_free(&mut self) -> Option<[usize;2]> {
        let center = self.fmt.dir_track();
        for d in 1..self.disk_half()+1 {
            if d < center {
                if let Some(ts) = self.alloc_on_track(center - d) {
                    return Some(ts);
                }
            }
            if center + d <= self.tracks {
                if let Some(ts) = self.alloc_on_track(center + d) {
                    return Some(ts);
                }
            }
        }
        debug!("no free sector for first block");
        None
    }
    /// Allocate the next sector of a file whose last sector is on `track`.
    /// Stays on the same side of the directory track, moving away from it,
    /// and then tries the other side.
    pub fn alloc_next_free(&mut self,track: usize) -> Option<[usize;2]> {
        let center = self.fmt.dir_track() as isize;
        let (mut dir,mut d) = match (track as isize) < center {
            true => (-1,center - track as isize),
            false => (1,track as isize - center)
        };
        let half = self.disk_half() as isize;
        for _side in 0..2 {
            while d <= half {
                let t = center + dir * d;
                if t < 1 || t > self.tracks as isize {
                    break;
                }
                if let Some(ts) = self.alloc_on_track(t as usize) {
                    return Some(ts);
                }
                d += 1;
            }
            dir = -dir;
            d = 1;
        }
        debug!("no free sector after track {}",track);
        None
    }
}

#[cfg(test)]
fn formatted(fmt: DosFormat,tracks: usize) -> Bam {
    let mut bam = Bam::create_empty(fmt,tracks,b"TEST",b"01");
    bam.free_all();
    bam
}

#[test]
fn free_counts() {
    assert_eq!(formatted(DosFormat::D1541,35).blocks_free(),683-19);
    assert_eq!(formatted(DosFormat::D1571,70).blocks_free(),1366-38);
    assert_eq!(formatted(DosFormat::D1581,80).blocks_free(),3200-40);
    assert_eq!(formatted(DosFormat::D8050,77).blocks_free(),2083-29);
}

#[test]
fn allocation_order() {
    let mut bam = formatted(DosFormat::D1541,35);
    assert_eq!(bam.alloc_first_free(),Some([17,0]));
    assert_eq!(bam.alloc_next_free(17),Some([17,1]));
    for _i in 0..19 {
        bam.alloc_next_free(17);
    }
    assert_eq!(bam.alloc_next_free(17),Some([16,0]));
    assert!(!bam.is_free(17,5));
    assert!(bam.free(17,5));
    assert!(!bam.free(17,5));
    assert_eq!(bam.free_on_track(17),1);
}

#[test]
fn other_side_after_exhaustion() {
    let mut bam = formatted(DosFormat::D1541,35);
    for track in 1..18 {
        for sector in 0..21 {
            bam.allocate(track,sector);
        }
    }
    assert_eq!(bam.alloc_next_free(1),Some([19,0]));
}
