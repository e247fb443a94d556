//! Error channel.
//! 
//! The drive keeps one status message, which is read from secondary address 15 like a file.
//! Only the first error since the channel last went back to OK is kept.

use log::{debug,warn};
use super::types::*;

pub struct ErrorLatch {
    code: DosError,
    message: Vec<u8>,
    cursor: usize,
    version: &'static str
}

impl ErrorLatch {
    pub fn new() -> Self {
        let mut ans = Self {
            code: DosError::Ok,
            message: Vec::new(),
            cursor: 0,
            version: DosFormat::D1541.dos_version()
        };
        ans.format(DosError::Ok,0,0);
        ans
    }
    fn format(&mut self,code: DosError,track: usize,sector: usize) {
        let text = match code {
            DosError::DosVersion => self.version.to_string(),
            _ => code.to_string()
        };
        self.code = code;
        self.message = format!("{:02},{},{:02},{:02}\r",code.code(),text,track,sector).into_bytes();
        self.cursor = 0;
    }
    /// Set the DOS version reported with code 73
    pub fn set_version(&mut self,fmt: DosFormat) {
        self.version = fmt.dos_version();
    }
    /// Latch a status.  An error is dropped if an earlier error has not been cleared.
    pub fn set(&mut self,code: DosError,track: usize,sector: usize) {
        if code != DosError::Ok && self.code != DosError::Ok {
            debug!("dropping error {} behind {}",code.code(),self.code.code());
            return;
        }
        match code {
            DosError::Ok | DosError::DosVersion | DosError::FilesScratched => {},
            _ => warn!("ERR = {:02}, {}, {:02}, {:02}",code.code(),code,track,sector)
        }
        self.format(code,track,sector);
    }
    pub fn set_fault(&mut self,fault: Fault) {
        self.set(fault.err,fault.track,fault.sector);
    }
    /// Latch the result of a scratch command, the count goes where the track usually is
    pub fn set_scratched(&mut self,count: usize) {
        self.set(DosError::FilesScratched,count,0);
    }
    /// Go back to OK unconditionally
    pub fn clear(&mut self) {
        self.format(DosError::Ok,0,0);
    }
    pub fn code(&self) -> DosError {
        self.code
    }
    /// The pending message without the carriage return
    pub fn message(&self) -> String {
        let end = self.message.len().saturating_sub(1);
        String::from_utf8_lossy(&self.message[0..end]).to_string()
    }
    /// Next byte of the message, or None once the message is drained, at which point
    /// the latch goes back to OK.
    pub fn read(&mut self) -> Option<u8> {
        if self.cursor < self.message.len() {
            self.cursor += 1;
            return Some(self.message[self.cursor-1]);
        }
        self.clear();
        None
    }
}

#[cfg(test)]
fn drain(latch: &mut ErrorLatch) -> String {
    let mut ans = Vec::new();
    while let Some(b) = latch.read() {
        ans.push(b);
    }
    String::from_utf8_lossy(&ans).to_string()
}

#[test]
fn first_error_wins() {
    let mut latch = ErrorLatch::new();
    latch.set(DosError::FileNotFound,0,0);
    latch.set(DosError::DiskFull,0,0);
    assert_eq!(drain(&mut latch),"62,FILE NOT FOUND,00,00\r");
    assert_eq!(drain(&mut latch),"00, OK,00,00\r");
    latch.set(DosError::DataChecksum,18,4);
    assert_eq!(latch.message(),"23,READ ERROR,18,04");
}

#[test]
fn version_and_scratch() {
    let mut latch = ErrorLatch::new();
    latch.set_version(DosFormat::D1581);
    latch.set(DosError::DosVersion,0,0);
    assert_eq!(latch.message(),"73,COPYRIGHT CBM DOS V10 1581,00,00");
    latch.clear();
    latch.set_scratched(3);
    assert_eq!(latch.message(),"01,FILES SCRATCHED,03,00");
}
