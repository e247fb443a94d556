use clap;
use std::io::Write;
use std::str::FromStr;
use log::info;
use super::ItemType;
use crate::fs::{Drive,DriveOptions};
use crate::fs::cbm::types::{ReadResult,Status};
use crate::{STDRESULT,DYNERR};

const RCH: &str = "unreachable was reached";
const BUFFER_CHANNEL: usize = 2;

/// Read a sector through a `#` buffer and the `U1` command
pub fn read_sector(drive: &mut Drive,ts: [usize;2]) -> Result<Vec<u8>,DYNERR> {
    if drive.open(b"#",BUFFER_CHANNEL) != Status::Ok {
        return Err(super::drive_error(drive));
    }
    let u1 = format!("U1 {} 0 {} {}",BUFFER_CHANNEL,ts[0],ts[1]);
    if let Err(e) = super::check_status(&drive.command(u1.as_bytes())) {
        drive.close(BUFFER_CHANNEL);
        return Err(e);
    }
    let mut ans = Vec::new();
    while let ReadResult::Data(b) = drive.read(BUFFER_CHANNEL) {
        ans.push(b);
    }
    drive.close(BUFFER_CHANNEL);
    Ok(ans)
}

fn output_get(start_addr: u16,object: &[u8],console: bool) -> STDRESULT {
    if console || atty::is(atty::Stream::Stdout) {
        crate::display_block(start_addr,object);
    } else {
        std::io::stdout().write_all(object)?;
    }
    Ok(())
}

pub fn get(cmd: &clap::ArgMatches) -> STDRESULT {
    let src = cmd.get_one::<String>("file").expect(RCH);
    let typ = ItemType::from_str(cmd.get_one::<String>("type").expect(RCH))?;
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let console = cmd.get_flag("console");
    let opt = DriveOptions { read_only: true, format: None };
    let mut drive = crate::create_drive_from_file(img_path,opt)?;
    match typ.file_type() {
        None => {
            let ts = super::parse_sector(src)?;
            let dat = read_sector(&mut drive,ts)?;
            output_get(0,&dat,console)
        },
        Some(file_type) => {
            let mut name = crate::escaped_ascii_to_bytes(src);
            name.push(b',');
            name.append(&mut file_type.to_string()[0..1].as_bytes().to_vec());
            let dat = match drive.load(&name) {
                Ok(dat) => dat,
                Err(e) => {
                    eprintln!("{}",drive.status());
                    return Err(e);
                }
            };
            info!("read {} bytes",dat.len());
            match (file_type,console || atty::is(atty::Stream::Stdout),dat.len()) {
                (crate::fs::cbm::types::FileType::Prg,true,n) if n >= 2 => {
                    output_get(u16::from_le_bytes([dat[0],dat[1]]),&dat[2..],true)
                },
                _ => output_get(0,&dat,console)
            }
        }
    }
}
