//! # CBM directory structures
//! 
//! The directory is a chain of sectors on the directory track, each holding 8 slots of 32 bytes.
//! The first two bytes of the sector are the link to the next sector, which overlap the first
//! two bytes of slot 0, so only bytes 2..32 of each slot belong to the entry.
//! 
//! The directory is loaded as a whole and scanned in memory.  A scan is a plain iterator
//! borrowing the directory, so it cannot outlive or overlap a modification.

use bit_vec::BitVec;
use a2kit_macro::{DiskStruct,DiskStructError};
use a2kit_macro_derive::DiskStruct;
use log::{trace,warn};
use crate::img::{geometry,DiskImage};
use super::types::*;
use super::block;

pub const SLOT_SIZE: usize = 32;
pub const SLOTS_PER_SECTOR: usize = 8;

/// A 32 byte directory slot.  The link is only meaningful in slot 0 of a sector,
/// where it is the link to the next directory sector.
#[derive(DiskStruct,Clone,PartialEq,Debug)]
pub struct DirectorySlot {
    pub link: [u8;2],
    /// file type in bits 0-2, locked bit 6, closed bit 7
    pub typ: u8,
    pub first: [u8;2],
    pub name: [u8;16],
    /// side sector of a REL file
    pub side: [u8;2],
    pub rel_len: u8,
    pub unused: [u8;6],
    pub blocks: [u8;2]
}

impl DirectorySlot {
    /// Create an unclosed entry with no blocks
    pub fn create(typ: FileType,name: &[u8]) -> Self {
        let mut ans = Self::new();
        ans.typ = typ as u8;
        ans.name = [PAD;16];
        for i in 0..usize::min(name.len(),MAX_NAME_LEN) {
            ans.name[i] = name[i];
        }
        ans
    }
    /// Copy the entry into a directory sector, leaving the link bytes alone
    pub fn write_into(&self,buf: &mut [u8],index: usize) {
        let offset = index * SLOT_SIZE;
        buf[offset+2..offset+SLOT_SIZE].copy_from_slice(&self.to_bytes()[2..]);
    }
    pub fn is_empty(&self) -> bool {
        self.typ == 0
    }
    pub fn is_closed(&self) -> bool {
        self.typ & CLOSED_FLAG > 0
    }
    pub fn is_locked(&self) -> bool {
        self.typ & LOCKED_FLAG > 0
    }
    pub fn file_type(&self) -> FileType {
        FileType::from_type_byte(self.typ)
    }
    pub fn first_block(&self) -> [usize;2] {
        [self.first[0] as usize,self.first[1] as usize]
    }
    pub fn set_first_block(&mut self,ts: [usize;2]) {
        self.first = [ts[0] as u8,ts[1] as u8];
    }
    pub fn block_count(&self) -> usize {
        u16::from_le_bytes(self.blocks) as usize
    }
    pub fn set_block_count(&mut self,count: usize) {
        self.blocks = u16::to_le_bytes(count as u16);
    }
}

/// Where a slot lives: index of the sector in the chain and index of the slot in the sector
#[derive(Clone,Copy,PartialEq,Debug)]
pub struct SlotAddr {
    pub sector: usize,
    pub index: usize
}

pub struct DirSector {
    pub ts: [usize;2],
    pub buf: Vec<u8>
}

/// Test a padded 16 byte name against a pattern.
/// `?` matches any character, `*` matches whatever remains, and an empty pattern matches anything.
pub fn name_matches(pattern: &[u8],name: &[u8]) -> bool {
    if pattern.len() == 0 {
        return true;
    }
    for i in 0..MAX_NAME_LEN {
        if i >= pattern.len() {
            return name[i] == PAD;
        }
        match pattern[i] {
            b'*' => return true,
            b'?' => continue,
            c if c == name[i] => continue,
            _ => return false
        }
    }
    true
}

/// The directory chain, as loaded from the disk
pub struct Directory {
    fmt: DosFormat,
    sectors: Vec<DirSector>
}

impl Directory {
    /// Follow the directory chain.  The chain ends at a zero link, an invalid link, or a repeated sector.
    pub fn load(img: &mut dyn DiskImage,fmt: DosFormat) -> Result<Self,Fault> {
        let kind = fmt.kind();
        let mut visited = BitVec::from_elem(geometry::total_blocks(kind,img.track_count()),false);
        let mut sectors: Vec<DirSector> = Vec::new();
        let mut ts = [fmt.dir_track(),fmt.first_dir_sector()];
        loop {
            let idx = match geometry::linear_address(kind,ts[0],ts[1]) {
                Ok(i) if i < visited.len() => i,
                _ => {
                    warn!("directory link out of range: {},{}",ts[0],ts[1]);
                    break;
                }
            };
            if visited.get(idx) == Some(true) {
                warn!("directory chain revisits {},{}",ts[0],ts[1]);
                break;
            }
            visited.set(idx,true);
            let buf = block::read_block(img,ts[0],ts[1])?;
            let next = [buf[0] as usize,buf[1] as usize];
            sectors.push(DirSector { ts, buf });
            if next[0] == 0 {
                break;
            }
            ts = next;
        }
        trace!("directory has {} sectors",sectors.len());
        Ok(Self { fmt, sectors })
    }
    /// Directory of a freshly formatted disk
    pub fn create(fmt: DosFormat) -> Self {
        let mut buf = vec![0;SECTOR_SIZE];
        buf[1] = 0xff;
        Self {
            fmt,
            sectors: vec![DirSector { ts: [fmt.dir_track(),fmt.first_dir_sector()], buf }]
        }
    }
    pub fn sectors(&self) -> &Vec<DirSector> {
        &self.sectors
    }
    pub fn format(&self) -> DosFormat {
        self.fmt
    }
    pub fn slot(&self,addr: SlotAddr) -> DirectorySlot {
        let offset = addr.index * SLOT_SIZE;
        DirectorySlot::from_bytes(&self.sectors[addr.sector].buf[offset..offset+SLOT_SIZE].to_vec()).expect("slot size")
    }
    /// Update a slot in memory, returns the block that has to be written
    pub fn put(&mut self,addr: SlotAddr,slot: &DirectorySlot) -> [usize;2] {
        slot.write_into(&mut self.sectors[addr.sector].buf,addr.index);
        self.sectors[addr.sector].ts
    }
    /// Write one directory sector back to the disk
    pub fn flush_sector(&self,img: &mut dyn DiskImage,sector: usize) -> Result<(),Fault> {
        let sec = &self.sectors[sector];
        block::write_block(img,sec.ts[0],sec.ts[1],&sec.buf)
    }
    /// Every slot in chain order
    pub fn all(&self) -> impl Iterator<Item = (SlotAddr,DirectorySlot)> + '_ {
        (0..self.sectors.len()).flat_map(move |s| (0..SLOTS_PER_SECTOR).map(move |i| {
            let addr = SlotAddr { sector: s, index: i };
            (addr,self.slot(addr))
        }))
    }
    /// Scan for entries matching the pattern.  With no type filter every non-empty entry
    /// except DEL is visited, with a filter only entries of that type are visited.
    pub fn scan<'a>(&'a self,pattern: &'a [u8],filter: Option<FileType>) -> impl Iterator<Item = (SlotAddr,DirectorySlot)> + 'a {
        self.all().filter(move |(_,slot)| {
            if slot.is_empty() || !name_matches(pattern,&slot.name) {
                return false;
            }
            match filter {
                Some(typ) => slot.file_type() == typ,
                None => slot.file_type() != FileType::Del
            }
        })
    }
    /// Entries shown in a listing, i.e., every non-empty slot matching the pattern
    pub fn entries<'a>(&'a self,pattern: &'a [u8]) -> impl Iterator<Item = (SlotAddr,DirectorySlot)> + 'a {
        self.all().filter(move |(_,slot)| !slot.is_empty() && name_matches(pattern,&slot.name))
    }
    /// First slot that is not in use
    pub fn empty_slot(&self) -> Option<SlotAddr> {
        self.all().find(|(_,slot)| slot.is_empty()).map(|(addr,_)| addr)
    }
    /// Link a new sector to the end of the chain, returns the index of the new sector.
    /// Both the old last sector and the new sector have to be flushed.
    pub fn extend(&mut self,ts: [usize;2]) -> usize {
        if let Some(last) = self.sectors.last_mut() {
            last.buf[0] = ts[0] as u8;
            last.buf[1] = ts[1] as u8;
        }
        let mut buf = vec![0;SECTOR_SIZE];
        buf[1] = 0xff;
        self.sectors.push(DirSector { ts, buf });
        self.sectors.len() - 1
    }
    /// Blocks used by the directory chain
    pub fn chain(&self) -> Vec<[usize;2]> {
        self.sectors.iter().map(|s| s.ts).collect()
    }
}

#[test]
fn matching() {
    let mut name = [PAD;16];
    name[0..5].copy_from_slice(b"HELLO");
    assert!(name_matches(b"",&name));
    assert!(name_matches(b"HELLO",&name));
    assert!(name_matches(b"H*",&name));
    assert!(name_matches(b"H?LLO",&name));
    assert!(!name_matches(b"HELL",&name));
    assert!(!name_matches(b"HELLO2",&name));
    assert!(!name_matches(b"?ELL",&name));
    assert!(name_matches(b"*",&name));
}

#[test]
fn slot_bytes() {
    let mut slot = DirectorySlot::create(FileType::Prg,b"GAME");
    slot.set_first_block([17,0]);
    slot.set_block_count(300);
    let mut buf = vec![0;SECTOR_SIZE];
    buf[32] = 0x12;
    slot.write_into(&mut buf,1);
    assert_eq!(buf[32],0x12);
    assert_eq!(buf[34],2);
    assert_eq!(&buf[35..37],&[17,0]);
    assert_eq!(&buf[37..41],b"GAME");
    assert_eq!(buf[41],PAD);
    assert_eq!(&buf[62..64],&[44,1]);
    let read_back = DirectorySlot::from_bytes(&buf[32..64].to_vec()).expect("slot size");
    assert_eq!(read_back.link,[0x12,0]);
    assert_eq!(read_back.name,slot.name);
    assert_eq!(read_back.block_count(),300);
    assert_eq!(read_back.len(),SLOT_SIZE);
}

#[test]
fn scan_skips_deleted() {
    let mut dir = Directory::create(DosFormat::D1541);
    let mut a = DirectorySlot::create(FileType::Prg,b"A");
    a.typ |= CLOSED_FLAG;
    let mut b = DirectorySlot::create(FileType::Seq,b"B");
    b.typ = CLOSED_FLAG;
    dir.put(SlotAddr { sector: 0, index: 0 },&a);
    dir.put(SlotAddr { sector: 0, index: 1 },&b);
    assert_eq!(dir.scan(b"",None).count(),1);
    assert_eq!(dir.scan(b"B",Some(FileType::Del)).count(),1);
    assert_eq!(dir.entries(b"").count(),2);
    assert_eq!(dir.empty_slot(),Some(SlotAddr { sector: 0, index: 2 }));
}
