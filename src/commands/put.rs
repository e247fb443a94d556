use clap;
use std::io::Read;
use std::str::FromStr;
use log::{error,info};
use super::{ItemType,CommandError};
use crate::fs::{Drive,DriveOptions};
use crate::fs::cbm::types::{SECTOR_SIZE,Status};
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";
const BUFFER_CHANNEL: usize = 2;

/// Write a sector through a `#` buffer and the `U2` command
pub fn write_sector(drive: &mut Drive,ts: [usize;2],dat: &[u8]) -> STDRESULT {
    if dat.len() > SECTOR_SIZE {
        error!("sector data is {} bytes, at most {} allowed",dat.len(),SECTOR_SIZE);
        return Err(Box::new(CommandError::OutOfRange));
    }
    if drive.open(b"#",BUFFER_CHANNEL) != Status::Ok {
        return Err(super::drive_error(drive));
    }
    for b in dat {
        drive.write(BUFFER_CHANNEL,*b);
    }
    let u2 = format!("U2 {} 0 {} {}",BUFFER_CHANNEL,ts[0],ts[1]);
    let res = super::check_status(&drive.command(u2.as_bytes()));
    drive.close(BUFFER_CHANNEL);
    res.map(|_| ())
}

pub fn put(cmd: &clap::ArgMatches) -> STDRESULT {
    if atty::is(atty::Stream::Stdin) {
        error!("cannot use `put` with console input, please pipe something in");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let dest = cmd.get_one::<String>("file").expect(RCH);
    let typ = ItemType::from_str(cmd.get_one::<String>("type").expect(RCH))?;
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let mut file_data = Vec::new();
    std::io::stdin().read_to_end(&mut file_data)?;
    let mut drive = crate::create_drive_from_file(img_path,DriveOptions::default())?;
    match typ.file_type() {
        None => {
            let ts = super::parse_sector(dest)?;
            write_sector(&mut drive,ts,&file_data)?;
        },
        Some(file_type) => {
            let mut name = Vec::new();
            if cmd.get_flag("replace") {
                name.extend_from_slice(b"@0:");
            }
            name.append(&mut crate::escaped_ascii_to_bytes(dest));
            name.push(b',');
            name.append(&mut file_type.to_string()[0..1].as_bytes().to_vec());
            if let Err(e) = drive.save(&name,&file_data) {
                eprintln!("{}",drive.status());
                return Err(e);
            }
            info!("wrote {} bytes",file_data.len());
        }
    }
    crate::save_img(&mut drive,img_path)
}
