//! # Channels
//! 
//! Each of the 16 secondary addresses has its own channel.  A channel is created by OPEN,
//! carries its own buffer and cursor, and goes back to `NotInUse` on CLOSE.
//! Secondary address 15 is always the command channel.
//! 
//! Sequential files are chains of sectors.  Bytes 0 and 1 of each sector link to the next
//! sector, except in the last sector, where byte 0 is 0 and byte 1 is the index of the
//! last valid byte.

use log::{debug,trace};
use crate::img::DiskImage;
use super::types::*;
use super::bam::Bam;
use super::directory::{Directory,DirectorySlot,SlotAddr};
use super::block;

/// Reading a sector chain
pub struct SeqReader {
    buf: Vec<u8>,
    cursor: usize,
    ts: [usize;2]
}

impl SeqReader {
    /// Load the first sector of the chain
    pub fn open(img: &mut dyn DiskImage,ts: [usize;2]) -> Result<Self,Fault> {
        let buf = block::read_block(img,ts[0],ts[1])?;
        Ok(Self { buf, cursor: 2, ts })
    }
    /// Index of the last valid byte in the buffer
    fn last(&self) -> usize {
        match self.buf[0] {
            0 => self.buf[1] as usize,
            _ => SECTOR_SIZE - 1
        }
    }
    /// Next byte, or None at the end of the chain
    pub fn next(&mut self,img: &mut dyn DiskImage) -> Result<Option<u8>,Fault> {
        if self.cursor > self.last() {
            if self.buf[0] == 0 {
                return Ok(None);
            }
            let next = [self.buf[0] as usize,self.buf[1] as usize];
            trace!("follow {},{} -> {},{}",self.ts[0],self.ts[1],next[0],next[1]);
            self.buf = block::read_block(img,next[0],next[1])?;
            self.ts = next;
            self.cursor = 2;
            if self.cursor > self.last() {
                return Ok(None);
            }
        }
        self.cursor += 1;
        Ok(Some(self.buf[self.cursor-1]))
    }
}

/// Writing a new file.  The sector holding the buffer is only allocated when
/// the buffer has to go to the disk, so the slot's first block is 0,0 until then.
pub struct SeqWriter {
    slot: DirectorySlot,
    buf: Vec<u8>,
    cursor: usize,
    ts: Option<[usize;2]>,
    chain: Vec<[usize;2]>
}

impl SeqWriter {
    pub fn new(slot: DirectorySlot) -> Self {
        Self {
            slot,
            buf: vec![0;SECTOR_SIZE],
            cursor: 2,
            ts: None,
            chain: Vec::new()
        }
    }
    pub fn slot(&self) -> &DirectorySlot {
        &self.slot
    }
    /// Sectors allocated so far
    pub fn chain(&self) -> &Vec<[usize;2]> {
        &self.chain
    }
    /// Sector for the current buffer, allocating it if necessary
    fn current(&mut self,bam: &mut Bam) -> Result<[usize;2],Fault> {
        if let Some(ts) = self.ts {
            return Ok(ts);
        }
        match bam.alloc_first_free() {
            Some(ts) => {
                self.slot.set_first_block(ts);
                self.chain.push(ts);
                self.ts = Some(ts);
                Ok(ts)
            },
            None => Err(Fault::from(DosError::DiskFull))
        }
    }
    /// Append a byte.  When the buffer is full it is linked to a newly allocated sector
    /// and written.  If no sector is left the byte is refused and the buffer is kept.
    pub fn push(&mut self,img: &mut dyn DiskImage,bam: &mut Bam,val: u8) -> Result<(),Fault> {
        if self.cursor >= SECTOR_SIZE {
            let ts = self.current(bam)?;
            let next = match bam.alloc_next_free(ts[0]) {
                Some(next) => next,
                None => return Err(Fault::from(DosError::DiskFull))
            };
            self.chain.push(next);
            self.buf[0] = next[0] as u8;
            self.buf[1] = next[1] as u8;
            block::write_block(img,ts[0],ts[1],&self.buf)?;
            self.ts = Some(next);
            self.buf = vec![0;SECTOR_SIZE];
            self.cursor = 2;
        }
        self.buf[self.cursor] = val;
        self.cursor += 1;
        Ok(())
    }
    /// Write the last sector, put the closed entry in the directory, and write the BAM.
    pub fn finish(&mut self,img: &mut dyn DiskImage,bam: &mut Bam) -> Result<(),Fault> {
        let ts = self.current(bam)?;
        self.buf[0] = 0;
        self.buf[1] = (self.cursor - 1) as u8;
        block::write_block(img,ts[0],ts[1],&self.buf)?;
        let mut dir = Directory::load(img,bam.format())?;
        let addr = match dir.empty_slot() {
            Some(addr) => addr,
            None => {
                let last = dir.sectors().last().map(|s| s.ts[1]).unwrap_or(0);
                let new_ts = match bam.alloc_dir_sector(last) {
                    Some(ts) => ts,
                    None => return Err(Fault::from(DosError::DiskFull))
                };
                let idx = dir.extend(new_ts);
                debug!("directory extended to {},{}",new_ts[0],new_ts[1]);
                dir.flush_sector(img,idx-1)?;
                SlotAddr { sector: idx, index: 0 }
            }
        };
        self.slot.typ |= CLOSED_FLAG;
        self.slot.set_block_count(self.chain.len());
        dir.put(addr,&self.slot);
        dir.flush_sector(img,addr.sector)?;
        bam.flush(img)
    }
    /// Return the sectors of an unfinished file to the BAM
    pub fn abandon(&mut self,bam: &mut Bam) {
        for [t,s] in self.chain.drain(..) {
            bam.free(t,s);
        }
        self.ts = None;
    }
}

/// Text written to the command channel, waiting to be executed
#[derive(Default)]
pub struct CommandBuffer {
    pub input: Vec<u8>
}

/// State of one secondary address
pub enum Channel {
    NotInUse,
    SeqRead(SeqReader),
    SeqWrite(SeqWriter),
    DirRead { buf: Vec<u8>, cursor: usize },
    MemBuf { buf: Vec<u8>, cursor: usize },
    Command(CommandBuffer)
}

impl Default for Channel {
    fn default() -> Self {
        Self::NotInUse
    }
}

impl Channel {
    pub fn mem_buf() -> Self {
        Self::MemBuf { buf: vec![0;SECTOR_SIZE], cursor: 0 }
    }
    pub fn in_use(&self) -> bool {
        !matches!(self,Self::NotInUse)
    }
}
