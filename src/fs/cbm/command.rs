//! # Command channel interpreter
//! 
//! Text sent to secondary address 15 is a DOS command.  The first letter selects the command,
//! file names follow a colon, and block commands take decimal parameters separated by
//! spaces or commas.

use bit_vec::BitVec;
use log::{debug,info,warn};
use crate::img::geometry;
use super::types::*;
use super::bam::Bam;
use super::directory::{Directory,DirectorySlot};
use super::channel::{Channel,SeqReader,SeqWriter};
use super::{block,Drive};

const MAX_COMMAND_LEN: usize = 128;

/// Everything after the first colon, if there is a colon
fn after_colon(cmd: &[u8]) -> Option<&[u8]> {
    cmd.iter().position(|c| *c == b':').map(|i| &cmd[i+1..])
}

/// Strip an optional drive prefix such as `0:`
fn strip_drive(name: &[u8]) -> &[u8] {
    match after_colon(name) {
        Some(rest) => rest,
        None => name
    }
}

/// Decimal parameters of block and user commands
fn parameters(txt: &[u8]) -> Result<Vec<usize>,Fault> {
    let mut ans = Vec::new();
    for field in txt.split(|c| [b' ',b',',b':',b')',b'#'].contains(c)) {
        if field.len() == 0 {
            continue;
        }
        match std::str::from_utf8(field).ok().and_then(|s| usize::from_str_radix(s,10).ok()) {
            Some(val) => ans.push(val),
            None => return Err(Fault::from(DosError::Syntax))
        }
    }
    Ok(ans)
}

impl Drive {
    /// Execute one command, status messages other than errors are latched here
    pub(super) fn execute(&mut self,raw: &[u8]) -> Result<(),Fault> {
        self.latch.clear();
        if raw.len() > MAX_COMMAND_LEN {
            return Err(Fault::from(DosError::LongLine));
        }
        let cmd = match raw.last() {
            Some(b'\r') => &raw[0..raw.len()-1],
            _ => raw
        };
        if cmd.len() == 0 {
            return Ok(());
        }
        debug!("command {}",String::from_utf8_lossy(cmd));
        match cmd[0] {
            b'S' => self.scratch(cmd),
            b'R' => self.rename(cmd),
            b'C' => self.copy(cmd),
            b'I' => self.initialize(),
            b'V' => self.validate(),
            b'N' => self.new_disk(cmd),
            b'B' => self.block_command(cmd),
            b'U' => self.user_command(cmd),
            _ => Err(Fault::from(DosError::InvalidCommand))
        }
    }
    /// Close every data channel the way CLOSE would
    fn close_all(&mut self) {
        for sa in 0..CHANNELS {
            if sa != COMMAND_CHANNEL {
                self.close(sa);
            }
        }
    }
    /// `S:pattern[,pattern...]`, locked files are left alone
    fn scratch(&mut self,cmd: &[u8]) -> Result<(),Fault> {
        let names = match after_colon(cmd) {
            Some(names) if names.len() > 0 => names,
            _ => return Err(Fault::from(DosError::NoFilename))
        };
        self.writable()?;
        let mut count = 0;
        for pattern in names.split(|c| *c == b',') {
            let pattern = strip_drive(pattern);
            let pattern = &pattern[0..usize::min(pattern.len(),MAX_NAME_LEN)];
            let mut dir = self.directory()?;
            let matches: Vec<_> = dir.scan(pattern,None).filter(|(_,slot)| !slot.is_locked()).map(|(addr,_)| addr).collect();
            for addr in matches {
                self.remove(&mut dir,addr)?;
                count += 1;
            }
        }
        info!("scratched {} files",count);
        self.latch.set_scratched(count);
        Ok(())
    }
    /// `R:new=old`
    fn rename(&mut self,cmd: &[u8]) -> Result<(),Fault> {
        let args = match after_colon(cmd) {
            Some(args) => args,
            None => return Err(Fault::from(DosError::Syntax))
        };
        let eq = match args.iter().position(|c| *c == b'=') {
            Some(i) => i,
            None => return Err(Fault::from(DosError::Syntax))
        };
        let new_name = &args[0..eq];
        let old_name = strip_drive(&args[eq+1..]);
        if new_name.len() == 0 || old_name.len() == 0 {
            return Err(Fault::from(DosError::NoFilename));
        }
        if new_name.len() > MAX_NAME_LEN || new_name.iter().any(|c| *c == b'*' || *c == b'?') {
            return Err(Fault::from(DosError::InvalidFilename));
        }
        self.writable()?;
        let mut dir = self.directory()?;
        if dir.scan(new_name,None).next().is_some() {
            return Err(Fault::from(DosError::FileExists));
        }
        let (addr,mut slot) = match dir.scan(old_name,None).next() {
            Some(entry) => entry,
            None => return Err(Fault::from(DosError::FileNotFound))
        };
        slot.name = DirectorySlot::create(FileType::Del,new_name).name;
        dir.put(addr,&slot);
        let (img,_) = self.parts()?;
        dir.flush_sector(img,addr.sector)
    }
    /// Data of a closed file
    fn read_chain(&mut self,first: [usize;2]) -> Result<Vec<u8>,Fault> {
        let limit = self.max_file_len();
        let (img,_) = self.parts()?;
        let mut reader = SeqReader::open(img,first)?;
        let mut ans = Vec::new();
        while let Some(b) = reader.next(img)? {
            if ans.len() >= limit {
                return Err(Fault::from(DosError::IllegalTrackSector));
            }
            ans.push(b);
        }
        Ok(ans)
    }
    /// `C:new=old[,old...]`, the sources are concatenated
    fn copy(&mut self,cmd: &[u8]) -> Result<(),Fault> {
        let args = match after_colon(cmd) {
            Some(args) => args,
            None => return Err(Fault::from(DosError::Syntax))
        };
        let eq = match args.iter().position(|c| *c == b'=') {
            Some(i) => i,
            None => return Err(Fault::from(DosError::Syntax))
        };
        let new_name = &args[0..eq];
        if new_name.len() == 0 {
            return Err(Fault::from(DosError::NoFilename));
        }
        if new_name.len() > MAX_NAME_LEN || new_name.iter().any(|c| *c == b'*' || *c == b'?') {
            return Err(Fault::from(DosError::InvalidFilename));
        }
        self.writable()?;
        let dir = self.directory()?;
        if dir.scan(new_name,None).next().is_some() {
            return Err(Fault::from(DosError::FileExists));
        }
        let mut dat = Vec::new();
        let mut typ = None;
        for old_name in args[eq+1..].split(|c| *c == b',') {
            let (_,slot) = match dir.scan(strip_drive(old_name),None).next() {
                Some(entry) => entry,
                None => return Err(Fault::from(DosError::FileNotFound))
            };
            if typ.is_none() {
                typ = Some(slot.file_type());
            }
            dat.append(&mut self.read_chain(slot.first_block())?);
        }
        let mut writer = SeqWriter::new(DirectorySlot::create(typ.unwrap_or(FileType::Seq),new_name));
        let (img,bam) = self.parts()?;
        let mut res = Ok(());
        for b in dat {
            res = writer.push(img,bam,b);
            if res.is_err() {
                break;
            }
        }
        if res.is_ok() {
            res = writer.finish(img,bam);
        }
        if res.is_err() {
            writer.abandon(bam);
        }
        res
    }
    /// `I`, close the channels and read the BAM again
    fn initialize(&mut self) -> Result<(),Fault> {
        self.close_all();
        self.bam = None;
        self.parts()?;
        Ok(())
    }
    /// Mark a chain as used in the BAM being rebuilt
    fn allocate_chain(&mut self,bam: &mut Bam,first: [usize;2]) -> Result<(),Fault> {
        let kind = self.fmt.kind();
        let img = match self.img.as_deref_mut() {
            Some(img) => img,
            None => return Err(Fault::from(DosError::NotReady))
        };
        let mut ts = first;
        while ts[0] != 0 {
            if geometry::linear_address(kind,ts[0],ts[1]).is_err() || ts[0] > img.track_count() {
                return Err(Fault::at(DosError::IllegalTrackSector,ts[0],ts[1]));
            }
            if !bam.allocate(ts[0],ts[1]) {
                warn!("block {},{} allocated twice",ts[0],ts[1]);
                return Err(Fault::at(DosError::NoBlock,ts[0],ts[1]));
            }
            let buf = block::read_block(img,ts[0],ts[1])?;
            ts = [buf[0] as usize,buf[1] as usize];
        }
        Ok(())
    }
    /// `V`, rebuild the BAM from the chains of the closed files.
    /// Entries of files that were never closed are deleted.
    /// The BAM on disk is left alone if a chain is broken.
    fn validate(&mut self) -> Result<(),Fault> {
        self.initialize()?;
        self.writable()?;
        let fmt = self.fmt;
        let (_,old) = self.parts()?;
        let mut bam = old.clone();
        bam.clear();
        bam.free_all();
        self.allocate_chain(&mut bam,[fmt.dir_track(),0])?;
        match fmt {
            DosFormat::D1571 => {
                for s in 0..geometry::sector_count(fmt.kind(),53) {
                    bam.allocate(53,s);
                }
            },
            DosFormat::D1581 => {
                bam.allocate(40,1);
                bam.allocate(40,2);
            },
            _ => {}
        }
        let mut dir = self.directory()?;
        let slots: Vec<_> = dir.entries(&[]).collect();
        let mut dirty = BitVec::from_elem(dir.sectors().len(),false);
        for (addr,mut slot) in slots {
            if slot.is_closed() {
                self.allocate_chain(&mut bam,slot.first_block())?;
                self.allocate_chain(&mut bam,[slot.side[0] as usize,slot.side[1] as usize])?;
            } else {
                debug!("deleting unclosed entry");
                slot.typ = 0;
                dir.put(addr,&slot);
                dirty.set(addr.sector,true);
            }
        }
        let (img,_) = self.parts()?;
        for i in 0..dirty.len() {
            if dirty.get(i) == Some(true) {
                dir.flush_sector(img,i)?;
            }
        }
        bam.flush(img)?;
        self.bam = Some(bam);
        Ok(())
    }
    /// `N:name,id`, write a new header, BAM, and empty directory
    fn new_disk(&mut self,cmd: &[u8]) -> Result<(),Fault> {
        let args = match after_colon(cmd) {
            Some(args) => args,
            None => return Err(Fault::from(DosError::Syntax))
        };
        self.writable()?;
        let (name,id) = match args.iter().position(|c| *c == b',') {
            Some(i) => {
                let mut id = args[i+1..].to_vec();
                id.resize(2,b' ');
                (args[0..i].to_vec(),id)
            },
            None => (args.to_vec(),vec![b' ',b' '])
        };
        let name = match name.len() {
            0 => vec![b' '],
            _ => name
        };
        self.close_all();
        let fmt = self.fmt;
        let img = match self.img.as_deref_mut() {
            Some(img) => img,
            None => return Err(Fault::from(DosError::NotReady))
        };
        let dir = Directory::create(fmt);
        dir.flush_sector(img,0)?;
        let bam = Bam::create_empty(fmt,img.track_count(),&name,&id);
        bam.flush(img)?;
        info!("new disk {}",String::from_utf8_lossy(&name));
        self.bam = Some(bam);
        self.validate()
    }
    fn check_block(&self,track: usize,sector: usize) -> Result<(),Fault> {
        let tracks = match self.img.as_deref() {
            Some(img) => img.track_count(),
            None => return Err(Fault::from(DosError::NotReady))
        };
        match geometry::linear_address(self.fmt.kind(),track,sector) {
            Ok(_) if track <= tracks => Ok(()),
            _ => Err(Fault::at(DosError::IllegalTrackSector,track,sector))
        }
    }
    /// Read or write a block through a `#` buffer
    fn block_io(&mut self,write: bool,params: &[usize]) -> Result<(),Fault> {
        if params.len() != 4 {
            return Err(Fault::from(DosError::Syntax));
        }
        let [ch,_drive,track,sector] = [params[0],params[1],params[2],params[3]];
        self.check_block(track,sector)?;
        if write {
            self.writable()?;
        }
        let mut chan = match self.channels.get_mut(ch) {
            Some(chan) if matches!(chan,Channel::MemBuf { .. }) => std::mem::take(chan),
            _ => return Err(Fault::from(DosError::NoChannel))
        };
        let res = match (&mut chan,self.parts()) {
            (Channel::MemBuf { buf, cursor },Ok((img,_))) => {
                *cursor = 0;
                match write {
                    true => block::write_block(img,track,sector,buf),
                    false => block::read_block(img,track,sector).map(|dat| *buf = dat)
                }
            },
            (_,Err(fault)) => Err(fault),
            _ => panic!("buffer channel changed mode")
        };
        self.channels[ch] = chan;
        res
    }
    /// `B-R`, `B-W`, `B-A`, `B-F`, and `B-P`
    fn block_command(&mut self,cmd: &[u8]) -> Result<(),Fault> {
        if cmd.len() < 3 || cmd[1] != b'-' {
            return Err(Fault::from(DosError::InvalidCommand));
        }
        let params = parameters(&cmd[3..])?;
        match cmd[2] {
            b'R' => self.block_io(false,&params),
            b'W' => self.block_io(true,&params),
            b'A' | b'F' => {
                if params.len() != 3 {
                    return Err(Fault::from(DosError::Syntax));
                }
                let [track,sector] = [params[1],params[2]];
                self.check_block(track,sector)?;
                self.writable()?;
                let (img,bam) = self.parts()?;
                if cmd[2] == b'F' {
                    bam.free(track,sector);
                } else if !bam.allocate(track,sector) {
                    // suggest the next free block without taking it
                    let [t,s] = match bam.alloc_next_free(track) {
                        Some(ts) => {
                            bam.free(ts[0],ts[1]);
                            ts
                        },
                        None => [0,0]
                    };
                    return Err(Fault::at(DosError::NoBlock,t,s));
                }
                bam.flush(img)
            },
            b'P' => {
                if params.len() != 2 {
                    return Err(Fault::from(DosError::Syntax));
                }
                match self.channels.get_mut(params[0]) {
                    Some(Channel::MemBuf { cursor, .. }) => {
                        *cursor = params[1];
                        Ok(())
                    },
                    _ => Err(Fault::from(DosError::NoChannel))
                }
            },
            _ => Err(Fault::from(DosError::InvalidCommand))
        }
    }
    /// `U1`/`UA`, `U2`/`UB`, `UI`, `UJ`, and `U0`
    fn user_command(&mut self,cmd: &[u8]) -> Result<(),Fault> {
        if cmd.len() < 2 {
            return Err(Fault::from(DosError::InvalidCommand));
        }
        if cmd[1] == b'0' {
            return Ok(());
        }
        match (cmd[1].wrapping_sub(1)) & 0x0f {
            0 => self.block_io(false,&parameters(&cmd[2..])?),
            1 => self.block_io(true,&parameters(&cmd[2..])?),
            8 if cmd.get(2) == Some(&b'+') || cmd.get(2) == Some(&b'-') => Ok(()),
            8 | 9 => {
                self.close_all();
                self.latch.set(DosError::DosVersion,0,0);
                Ok(())
            },
            _ => Err(Fault::from(DosError::NotReady))
        }
    }
}
