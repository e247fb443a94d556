use clap;
use std::str::FromStr;
use log::{info,error};
use crate::img;
use crate::img::{DiskImage,DiskImageType,geometry};
use crate::fs::{Drive,DriveOptions};
use super::CommandError;
use crate::{STDRESULT,DYNERR};

const RCH: &str = "unreachable was reached";

/// Blank image with unformatted sectors
fn mkimage(img_typ: DiskImageType,tracks: usize,id: [u8;2]) -> Result<Box<dyn DiskImage>,DYNERR> {
    match img_typ {
        DiskImageType::X64 => Ok(Box::new(img::x64::X64::create(tracks,"")?)),
        DiskImageType::G64 => Ok(Box::new(img::g64::G64::create(tracks,id))),
        typ => Ok(Box::new(img::dsk_cbm::Dsk::create(typ,tracks)?))
    }
}

pub fn mkdsk(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let img_typ = DiskImageType::from_str(cmd.get_one::<String>("type").expect(RCH))?;
    let name = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("name").expect(RCH));
    let id = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("id").expect(RCH));
    if std::path::Path::new(img_path).exists() {
        error!("refusing to overwrite {}",img_path);
        return Err(Box::new(CommandError::InvalidCommand));
    }
    if name.len() > 16 || id.len() != 2 || name.iter().any(|c| *c == b',') {
        error!("name must be at most 16 characters without commas, id must be 2 characters");
        return Err(Box::new(CommandError::OutOfRange));
    }
    let kind = img_typ.disk_kind();
    let tracks = match cmd.get_one::<u16>("tracks") {
        Some(t) if geometry::max_tracks(kind) >= *t as usize => *t as usize,
        Some(_) => {
            error!("{} images cannot have that many tracks",img_typ);
            return Err(Box::new(CommandError::OutOfRange));
        },
        None => geometry::nominal_tracks(kind)
    };
    let disk = mkimage(img_typ,tracks,[id[0],id[1]])?;
    let mut drive = Drive::new();
    drive.attach(disk,DriveOptions::default());
    let mut new_cmd = b"N:".to_vec();
    new_cmd.extend_from_slice(&name);
    new_cmd.push(b',');
    new_cmd.extend_from_slice(&id);
    super::check_status(&drive.command(&new_cmd))?;
    info!("formatted {} with {} tracks",img_typ,tracks);
    crate::save_img(&mut drive,img_path)
}
