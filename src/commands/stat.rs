use clap;
use std::io::Write;
use crate::fs::DriveOptions;
use crate::fs::cbm::{listing,types::PAD};
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

fn read_only() -> DriveOptions {
    DriveOptions { read_only: true, format: None }
}

fn unpadded(dat: &[u8]) -> String {
    let end = dat.iter().position(|c| *c == PAD).unwrap_or(dat.len());
    crate::escaped_ascii_from_bytes(&dat[0..end])
}

pub fn catalog(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let pattern = match cmd.get_one::<String>("file") {
        Some(s) => crate::escaped_ascii_to_bytes(s),
        None => Vec::new()
    };
    let mut drive = crate::create_drive_from_file(img_path,read_only())?;
    let mut name = b"$".to_vec();
    if pattern.len() > 0 {
        name.push(b':');
        name.extend_from_slice(&pattern);
    }
    let prog = match drive.catalog(&name) {
        Ok(prog) => prog,
        Err(e) => {
            eprintln!("{}",drive.status());
            return Err(e);
        }
    };
    if cmd.get_flag("raw") {
        std::io::stdout().write_all(&prog)?;
    } else {
        print!("{}",listing::to_text(&prog));
    }
    Ok(())
}

pub fn stat(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let mut drive = crate::create_drive_from_file(img_path,read_only())?;
    let (name,id) = drive.header()?;
    let mut root = json::JsonValue::new_object();
    if let Some(img) = drive.image() {
        root["image"] = json::JsonValue::String(img.what_am_i().to_string());
        root["tracks"] = json::JsonValue::Number(img.track_count().into());
        root["capacity"] = json::JsonValue::Number(img.byte_capacity().into());
    }
    root["dos"] = json::JsonValue::String(drive.format().dos_version().to_string());
    root["name"] = json::JsonValue::String(unpadded(&name));
    root["id"] = json::JsonValue::String(crate::escaped_ascii_from_bytes(&id));
    root["blocks_free"] = json::JsonValue::Number(drive.blocks_free()?.into());
    let mut files = json::JsonValue::new_array();
    for slot in drive.entries()? {
        let mut obj = json::JsonValue::new_object();
        obj["name"] = json::JsonValue::String(unpadded(&slot.name));
        obj["type"] = json::JsonValue::String(slot.file_type().to_string());
        obj["blocks"] = json::JsonValue::Number(slot.block_count().into());
        obj["closed"] = json::JsonValue::Boolean(slot.is_closed());
        obj["locked"] = json::JsonValue::Boolean(slot.is_locked());
        obj["first"] = json::array![slot.first[0],slot.first[1]];
        files.push(obj)?;
    }
    root["files"] = files;
    let s = match cmd.get_one::<u16>("indent") {
        Some(spaces) => json::stringify_pretty(root,*spaces),
        None => json::stringify(root)
    };
    println!("{}",s);
    Ok(())
}

pub fn geometry(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let disk = crate::create_img_from_file(img_path)?;
    println!("{}",disk.export_geometry(cmd.get_one::<u16>("indent").copied())?);
    Ok(())
}
