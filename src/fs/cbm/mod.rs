//! # CBM DOS drive
//! 
//! This module makes a disk image behave like a Commodore disk drive as seen from the serial bus.
//! The `Drive` object owns the attached image, the BAM, the 16 channels, and the error channel.
//! The bus side calls `open`, `read`, `write`, `close`, and `flush` with a secondary address.
//! 
//! ## Status reporting
//! 
//! Every operation returns a small status to the caller and latches a DOS error message,
//! which the computer can read from secondary address 15.  Disk conditions never disturb
//! other channels.  A channel found in an impossible state is a bug and panics.
//! 
//! ## Replacing files
//! 
//! Opening `@NAME` for writing scratches the old `NAME` right away, before any of the new data is
//! written.  If the disk fills up during the write, the old file is gone and the new one is short.
//! Real drives behave this way and so does this one.
//! 
//! ## Example
//! 
//! ```rs
//! let mut drive = Drive::new();
//! drive.attach(img,DriveOptions::default());
//! drive.open(b"HELLO,P,W",2);
//! for b in data {
//!     drive.write(2,*b);
//! }
//! drive.close(2);
//! ```

pub mod types;
pub mod bam;
pub mod block;
pub mod directory;
pub mod listing;
pub mod parse;
pub mod latch;
pub mod channel;
mod command;

use bit_vec::BitVec;
use log::{debug,info,warn,error};
use crate::img::{geometry,DiskImage};
use crate::{DYNERR,STDRESULT};
use types::*;
use bam::Bam;
use directory::{Directory,DirectorySlot};
use parse::Access;
use latch::ErrorLatch;
use channel::{Channel,CommandBuffer,SeqReader,SeqWriter};

/// Settings applied when an image is attached
#[derive(Debug,Clone,Copy,Default)]
pub struct DriveOptions {
    /// refuse all writes even if the image is writable
    pub read_only: bool,
    /// use this DOS instead of the one that goes with the image
    pub format: Option<DosFormat>
}

/// A virtual CBM disk drive
pub struct Drive {
    img: Option<Box<dyn DiskImage>>,
    fmt: DosFormat,
    bam: Option<Bam>,
    channels: Vec<Channel>,
    latch: ErrorLatch
}

impl Drive {
    /// Drive with no disk inserted
    pub fn new() -> Self {
        let mut channels: Vec<Channel> = Vec::new();
        for _i in 0..CHANNELS {
            channels.push(Channel::NotInUse);
        }
        channels[COMMAND_CHANNEL] = Channel::Command(CommandBuffer::default());
        Self {
            img: None,
            fmt: DosFormat::D1541,
            bam: None,
            channels,
            latch: ErrorLatch::new()
        }
    }
    /// Insert a disk.  Any disk already inserted is detached first.
    pub fn attach(&mut self,mut img: Box<dyn DiskImage>,opt: DriveOptions) {
        if self.img.is_some() {
            self.detach();
        }
        if opt.read_only {
            img.set_read_only(true);
        }
        self.fmt = match opt.format {
            Some(fmt) => fmt,
            None => DosFormat::from_kind(img.kind())
        };
        info!("attach {} image with {} tracks as {:?}",img.what_am_i(),img.track_count(),self.fmt);
        self.bam = match Bam::load(img.as_mut(),self.fmt) {
            Ok(bam) => Some(bam),
            Err(e) => {
                warn!("could not read BAM: {}",e.err);
                None
            }
        };
        self.img = Some(img);
        self.latch.set_version(self.fmt);
        self.latch.clear();
        self.latch.set(DosError::DosVersion,0,0);
    }
    /// Remove the disk.  Open channels are dropped without flushing, and sectors of files
    /// that were being written go back to the BAM.
    pub fn detach(&mut self) -> Option<Box<dyn DiskImage>> {
        let mut abandoned = false;
        for sa in 0..CHANNELS {
            if sa == COMMAND_CHANNEL {
                continue;
            }
            if let Channel::SeqWrite(mut w) = std::mem::take(&mut self.channels[sa]) {
                if let Some(bam) = self.bam.as_mut() {
                    abandoned |= w.chain().len() > 0;
                    w.abandon(bam);
                }
            }
        }
        self.channels[COMMAND_CHANNEL] = Channel::Command(CommandBuffer::default());
        let mut img = self.img.take();
        if let (true,Some(disk),Some(bam)) = (abandoned,img.as_deref_mut(),self.bam.as_ref()) {
            if !disk.is_read_only() {
                if let Err(e) = bam.flush(disk) {
                    warn!("could not restore BAM on detach: {}",e.err);
                }
            }
        }
        self.bam = None;
        img
    }
    /// The attached image, e.g. for saving it
    pub fn image(&mut self) -> Option<&mut (dyn DiskImage + 'static)> {
        self.img.as_deref_mut()
    }
    pub fn format(&self) -> DosFormat {
        self.fmt
    }
    /// The current error channel message, without reading it
    pub fn status(&self) -> String {
        self.latch.message()
    }
    pub fn status_code(&self) -> DosError {
        self.latch.code()
    }
    /// Image and BAM, loading the BAM if needed
    fn parts(&mut self) -> Result<(&mut dyn DiskImage,&mut Bam),Fault> {
        let img = match self.img.as_deref_mut() {
            Some(img) => img,
            None => return Err(Fault::at(DosError::NotReady,self.fmt.dir_track(),0))
        };
        if self.bam.is_none() {
            self.bam = Some(Bam::load(img,self.fmt)?);
        }
        match self.bam.as_mut() {
            Some(bam) => Ok((img,bam)),
            None => Err(Fault::at(DosError::NotReady,self.fmt.dir_track(),0))
        }
    }
    fn writable(&mut self) -> Result<(),Fault> {
        match self.img.as_deref() {
            Some(img) if img.is_read_only() => Err(Fault::from(DosError::WriteProtect)),
            Some(_) => Ok(()),
            None => Err(Fault::at(DosError::NotReady,self.fmt.dir_track(),0))
        }
    }
    fn directory(&mut self) -> Result<Directory,Fault> {
        let fmt = self.fmt;
        let (img,_) = self.parts()?;
        Directory::load(img,fmt)
    }
    /// Follow a sector chain without changing anything.  A bad or repeated link ends the chain.
    fn walk_chain(&mut self,first: [usize;2]) -> Result<Vec<[usize;2]>,Fault> {
        let kind = self.fmt.kind();
        let (img,_) = self.parts()?;
        let mut visited = BitVec::from_elem(geometry::total_blocks(kind,img.track_count()),false);
        let mut ans = Vec::new();
        let mut ts = first;
        while ts[0] != 0 {
            match geometry::linear_address(kind,ts[0],ts[1]) {
                Ok(i) if i < visited.len() && visited.get(i) == Some(false) => visited.set(i,true),
                _ => {
                    warn!("chain stops at bad link {},{}",ts[0],ts[1]);
                    break;
                }
            }
            let buf = block::read_block(img,ts[0],ts[1])?;
            ans.push(ts);
            ts = [buf[0] as usize,buf[1] as usize];
        }
        Ok(ans)
    }
    /// Return a sector chain to the BAM, returns the number of sectors freed.
    /// The chain is read to the end first, a read error leaves the BAM untouched.
    fn free_chain(&mut self,first: [usize;2]) -> Result<usize,Fault> {
        let chain = self.walk_chain(first)?;
        let (_,bam) = self.parts()?;
        let mut count = 0;
        for [track,sector] in chain {
            if bam.free(track,sector) {
                count += 1;
            }
        }
        Ok(count)
    }
    /// Scratch the entry in a slot and free its blocks.  The directory sector and BAM are written.
    fn remove(&mut self,dir: &mut Directory,addr: directory::SlotAddr) -> Result<usize,Fault> {
        let mut slot = dir.slot(addr);
        let count = self.free_chain(slot.first_block())?;
        slot.typ = 0;
        dir.put(addr,&slot);
        let (img,bam) = self.parts()?;
        dir.flush_sector(img,addr.sector)?;
        bam.flush(img)?;
        debug!("removed entry with {} blocks",count);
        Ok(count)
    }
    /// Open a data channel, the command channel is handled separately
    fn open_data(&mut self,name: &[u8],sa: usize) -> Result<Channel,Fault> {
        let parsed = parse::parse_name(name,sa)?;
        if name[0] == b'#' {
            return Ok(Channel::mem_buf());
        }
        if name[0] == b'$' {
            if sa > 0 {
                let ts = [self.fmt.dir_track(),0];
                let (img,_) = self.parts()?;
                return Ok(Channel::SeqRead(SeqReader::open(img,ts)?));
            }
            let (pattern,filter) = listing::parse_pattern(name);
            let dir = self.directory()?;
            let (_,bam) = self.parts()?;
            let buf = listing::build(bam,&dir,&pattern,filter);
            return Ok(Channel::DirRead { buf, cursor: 0 });
        }
        let typ = parsed.file_type(sa);
        if typ == FileType::Rel {
            return Err(Fault::from(DosError::FileTypeMismatch));
        }
        let mut dir = self.directory()?;
        let found = dir.scan(&parsed.name,None).next();
        match parsed.access {
            Access::Read => {
                let (_,slot) = match found {
                    Some(entry) => entry,
                    None => return Err(Fault::from(DosError::FileNotFound))
                };
                if slot.file_type() == FileType::Rel {
                    return Err(Fault::from(DosError::FileTypeMismatch));
                }
                let (img,_) = self.parts()?;
                Ok(Channel::SeqRead(SeqReader::open(img,slot.first_block())?))
            },
            Access::Write => {
                self.writable()?;
                if parsed.name.len() == 0 {
                    return Err(Fault::from(DosError::NoFilename));
                }
                if parsed.name.iter().any(|c| *c == b'*' || *c == b'?') {
                    return Err(Fault::from(DosError::InvalidFilename));
                }
                if let Some((addr,_)) = found {
                    if !parsed.replace {
                        return Err(Fault::from(DosError::FileExists));
                    }
                    // The old file is freed now.  If the new one hits DISK FULL, both are lost.
                    self.remove(&mut dir,addr)?;
                }
                Ok(Channel::SeqWrite(SeqWriter::new(DirectorySlot::create(typ,&parsed.name))))
            }
        }
    }
    /// Open a channel.  On the command channel a non-empty name is executed as a command.
    pub fn open(&mut self,name: &[u8],sa: usize) -> Status {
        if sa >= CHANNELS {
            self.latch.set(DosError::NoChannel,0,0);
            return Status::Error;
        }
        if sa == COMMAND_CHANNEL {
            if name.len() == 0 {
                return Status::Ok;
            }
            if let Channel::Command(cmd) = &mut self.channels[sa] {
                cmd.input = name.to_vec();
            }
            return self.flush(sa);
        }
        self.latch.clear();
        if self.channels[sa].in_use() {
            self.latch.set(DosError::NoChannel,0,0);
            return Status::Error;
        }
        if self.img.is_none() {
            self.latch.set(DosError::NotReady,self.fmt.dir_track(),0);
            return Status::Error;
        }
        if name.len() == 0 {
            self.latch.set(DosError::NoFilename,0,0);
            return Status::NoDevice;
        }
        match self.open_data(name,sa) {
            Ok(ch) => {
                self.channels[sa] = ch;
                Status::Ok
            },
            Err(fault) => {
                self.latch.set_fault(fault);
                Status::Error
            }
        }
    }
    /// Read one byte from a channel
    pub fn read(&mut self,sa: usize) -> ReadResult {
        if sa >= CHANNELS {
            self.latch.set(DosError::NoChannel,0,0);
            return ReadResult::Error;
        }
        let mut ch = std::mem::take(&mut self.channels[sa]);
        let ans = match &mut ch {
            Channel::NotInUse => {
                self.latch.set(DosError::FileNotOpen,0,0);
                ReadResult::Error
            },
            Channel::SeqRead(r) => {
                match self.img.as_deref_mut() {
                    Some(img) => match r.next(img) {
                        Ok(Some(b)) => ReadResult::Data(b),
                        Ok(None) => ReadResult::Eof,
                        Err(fault) => {
                            self.latch.set_fault(fault);
                            ReadResult::Error
                        }
                    },
                    None => panic!("sequential channel open with no image")
                }
            },
            Channel::DirRead { buf, cursor } | Channel::MemBuf { buf, cursor } => {
                match buf.get(*cursor) {
                    Some(b) => {
                        *cursor += 1;
                        ReadResult::Data(*b)
                    },
                    None => ReadResult::Eof
                }
            },
            Channel::SeqWrite(_) => ReadResult::Error,
            Channel::Command(_) => match self.latch.read() {
                Some(b) => ReadResult::Data(b),
                None => ReadResult::Eof
            }
        };
        self.channels[sa] = ch;
        ans
    }
    /// Write one byte to a channel
    pub fn write(&mut self,sa: usize,val: u8) -> Status {
        if sa >= CHANNELS {
            self.latch.set(DosError::NoChannel,0,0);
            return Status::Error;
        }
        if sa != COMMAND_CHANNEL {
            if let Some(img) = self.img.as_deref() {
                if img.is_read_only() {
                    self.latch.set(DosError::WriteProtect,0,0);
                    return Status::Error;
                }
            }
        }
        let mut ch = std::mem::take(&mut self.channels[sa]);
        let ans = match &mut ch {
            Channel::NotInUse => {
                self.latch.set(DosError::FileNotOpen,0,0);
                Status::Error
            },
            Channel::SeqWrite(w) => {
                let res = match self.parts() {
                    Ok((img,bam)) => w.push(img,bam,val),
                    Err(fault) => Err(fault)
                };
                match res {
                    Ok(()) => Status::Ok,
                    Err(fault) => {
                        self.latch.set_fault(fault);
                        Status::Error
                    }
                }
            },
            Channel::MemBuf { buf, cursor } => {
                match buf.get_mut(*cursor) {
                    Some(b) => {
                        *b = val;
                        *cursor += 1;
                        Status::Ok
                    },
                    None => Status::Error
                }
            },
            Channel::DirRead { .. } => {
                self.latch.set(DosError::WriteFileOpen,0,0);
                Status::Error
            },
            Channel::SeqRead(_) => Status::Error,
            Channel::Command(cmd) => {
                cmd.input.push(val);
                Status::Ok
            }
        };
        self.channels[sa] = ch;
        ans
    }
    /// Close a channel.  Closing a channel that is not open is fine.
    /// Closing the command channel closes every other channel too.
    pub fn close(&mut self,sa: usize) -> Status {
        if sa >= CHANNELS {
            self.latch.set(DosError::NoChannel,0,0);
            return Status::Error;
        }
        if sa == COMMAND_CHANNEL {
            self.latch.clear();
            if let Channel::Command(cmd) = &mut self.channels[sa] {
                cmd.input = Vec::new();
            }
            for i in 0..CHANNELS {
                if i != COMMAND_CHANNEL {
                    self.close(i);
                }
            }
            return Status::Ok;
        }
        match std::mem::take(&mut self.channels[sa]) {
            Channel::SeqWrite(mut w) => {
                let res = match self.parts() {
                    Ok((img,bam)) => match w.finish(img,bam) {
                        Ok(()) => Ok(()),
                        Err(fault) => {
                            w.abandon(bam);
                            Err(fault)
                        }
                    },
                    Err(fault) => Err(fault)
                };
                match res {
                    Ok(()) => Status::Ok,
                    Err(fault) => {
                        error!("file could not be closed");
                        self.latch.set_fault(fault);
                        Status::Error
                    }
                }
            },
            Channel::Command(_) => panic!("command channel found on data channel {}",sa),
            _ => Status::Ok
        }
    }
    /// Execute pending command channel text.  Other channels have nothing to flush.
    pub fn flush(&mut self,sa: usize) -> Status {
        if sa != COMMAND_CHANNEL {
            return Status::Ok;
        }
        let input = match &mut self.channels[sa] {
            Channel::Command(cmd) => std::mem::take(&mut cmd.input),
            _ => panic!("command channel is not in command mode")
        };
        if input.len() == 0 {
            return Status::Ok;
        }
        match self.execute(&input) {
            Ok(()) => Status::Ok,
            Err(fault) => {
                self.latch.set_fault(fault);
                Status::Error
            }
        }
    }
    /// Find a data channel that is not in use
    fn free_channel(&self) -> Result<usize,DYNERR> {
        for sa in 2..COMMAND_CHANNEL {
            if !self.channels[sa].in_use() {
                return Ok(sa);
            }
        }
        Err(Box::new(DosError::NoChannel))
    }
    /// Most data bytes a sequential file can hold on the attached disk
    fn max_file_len(&self) -> usize {
        match self.img.as_deref() {
            Some(img) => geometry::total_blocks(self.fmt.kind(),img.track_count()) * (SECTOR_SIZE - 2),
            None => 0
        }
    }
    /// Read a whole file by name, the name can carry the usual options.
    /// On failure the error is the latched DOS error.
    /// A chain that loops back on itself fails with 66 once it exceeds the disk.
    pub fn load(&mut self,name: &[u8]) -> Result<Vec<u8>,DYNERR> {
        let sa = self.free_channel()?;
        if self.open(name,sa) != Status::Ok {
            return Err(Box::new(self.latch.code()));
        }
        let limit = self.max_file_len();
        let mut ans = Vec::new();
        loop {
            if ans.len() > limit {
                warn!("file chain is longer than the disk");
                self.close(sa);
                self.latch.set(DosError::IllegalTrackSector,0,0);
                return Err(Box::new(DosError::IllegalTrackSector));
            }
            match self.read(sa) {
                ReadResult::Data(b) => ans.push(b),
                ReadResult::Eof => break,
                ReadResult::Error => {
                    let code = self.latch.code();
                    self.close(sa);
                    return Err(Box::new(code));
                }
            }
        }
        self.close(sa);
        Ok(ans)
    }
    /// Write a whole file, e.g., `save(b"NAME,S",&dat)`.
    /// On failure the error is the latched DOS error.
    pub fn save(&mut self,name: &[u8],dat: &[u8]) -> STDRESULT {
        let sa = self.free_channel()?;
        let mut full_name = name.to_vec();
        full_name.extend_from_slice(b",W");
        if self.open(&full_name,sa) != Status::Ok {
            return Err(Box::new(self.latch.code()));
        }
        for b in dat {
            if self.write(sa,*b) != Status::Ok {
                let code = self.latch.code();
                self.close(sa);
                return Err(Box::new(code));
            }
        }
        match self.close(sa) {
            Status::Ok => Ok(()),
            _ => Err(Box::new(self.latch.code()))
        }
    }
    /// The directory listing program for a pattern such as `$` or `$:A*`
    pub fn catalog(&mut self,pattern: &[u8]) -> Result<Vec<u8>,DYNERR> {
        let mut name = pattern.to_vec();
        if name.first() != Some(&b'$') {
            name.insert(0,b'$');
        }
        if self.channels[0].in_use() {
            return Err(Box::new(DosError::NoChannel));
        }
        if self.open(&name,0) != Status::Ok {
            return Err(Box::new(self.latch.code()));
        }
        let mut ans = Vec::new();
        while let ReadResult::Data(b) = self.read(0) {
            ans.push(b);
        }
        self.close(0);
        Ok(ans)
    }
    /// Send a command and return the error channel message
    pub fn command(&mut self,cmd: &[u8]) -> String {
        self.open(cmd,COMMAND_CHANNEL);
        let mut ans = Vec::new();
        while let ReadResult::Data(b) = self.read(COMMAND_CHANNEL) {
            if b != b'\r' {
                ans.push(b);
            }
        }
        String::from_utf8_lossy(&ans).to_string()
    }
    /// Snapshot of the directory entries, for inspection outside the bus protocol
    pub fn entries(&mut self) -> Result<Vec<DirectorySlot>,DYNERR> {
        match self.directory() {
            Ok(dir) => Ok(dir.entries(&[]).map(|(_,slot)| slot).collect()),
            Err(fault) => Err(Box::new(fault.err))
        }
    }
    /// Disk name and id as stored in the header, padding included
    pub fn header(&mut self) -> Result<(Vec<u8>,Vec<u8>),DYNERR> {
        match self.parts() {
            Ok((_,bam)) => Ok((bam.disk_name(),bam.disk_id())),
            Err(fault) => Err(Box::new(fault.err))
        }
    }
    /// Free blocks as shown in the listing
    pub fn blocks_free(&mut self) -> Result<usize,DYNERR> {
        match self.parts() {
            Ok((_,bam)) => Ok(bam.blocks_free()),
            Err(fault) => Err(Box::new(fault.err))
        }
    }
}
