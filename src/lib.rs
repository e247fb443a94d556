//! # `cbmkit` main library
//! 
//! This library manipulates Commodore disk images suitable for emulators, and contains a
//! virtual disk drive that answers channel requests the way CBM DOS does.
//! 
//! ## Architecture
//! 
//! Disk image operations are built around two objects:
//! * `img::DiskImage` trait objects read and write sectors, they do not try to interpret a file system
//! * `fs::cbm::Drive` takes ownership of some `DiskImage` and runs the DOS on top of it
//! 
//! The drive uses the owned image as storage.  Any changes are not permanent until the
//! image is saved to whatever file system is hosting cbmkit.
//! 
//! ## Disk Images
//! 
//! In order to manipulate tracks and sectors, `cbmkit` must understand the way the track data is packed
//! into a disk image.  As of this writing `cbmkit` supports
//! * D64 (35 to 42 tracks, with or without error information)
//! * D67, D71, D80, D81, D82
//! * X64
//! * G64 (standard sector layouts only)
//! 
//! ## Disk Kinds
//! 
//! The DOS flavor follows the disk kind, which is fixed by the image type
//! * 1541 and 2040 (5.25 inch, single sided)
//! * 1571 (5.25 inch, double sided)
//! * 1581 (3.5 inch)
//! * 8050 and 8250 (IEEE drives)

pub mod fs;
pub mod img;
pub mod commands;

use img::DiskImage;
use fs::cbm::{Drive,DriveOptions};
use log::{warn,info};
use regex::Regex;
use hex;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const KNOWN_FILE_EXTENSIONS: &str = "d64,d67,d71,d80,d81,d82,x64,g64";

/// Save the image file (make changes permanent)
pub fn save_img(drive: &mut Drive,img_path: &str) -> STDRESULT {
    match drive.image() {
        Some(img) => {
            std::fs::write(img_path,img.to_bytes())?;
            Ok(())
        },
        None => Err(Box::new(fs::cbm::types::DosError::NotReady))
    }
}

/// Given a bytestream return a disk image, or Err if the bytestream cannot be interpreted.
/// Optional `maybe_ext` restricts the image types that will be accepted based on file extension.
pub fn create_img_from_bytestream(disk_img_data: &[u8],maybe_ext: Option<&str>) -> Result<Box<dyn DiskImage>,DYNERR> {
    let ext = match maybe_ext {
        Some(x) => x.to_string().to_lowercase(),
        None => "".to_string()
    };
    let info = match img::probe::probe(disk_img_data) {
        Ok(info) => info,
        Err(e) => {
            warn!("cannot match any image format");
            return Err(Box::new(e));
        }
    };
    if ext != "" && ext != info.typ.to_string() {
        warn!("image looks like {} but extension is {}",info.typ,ext);
        return Err(Box::new(img::Error::ImageTypeMismatch));
    }
    info!("identified {} image with {} tracks",info.typ,info.tracks);
    match info.typ {
        img::DiskImageType::X64 => Ok(Box::new(img::x64::X64::from_bytes(disk_img_data)?)),
        img::DiskImageType::G64 => Ok(Box::new(img::g64::G64::from_bytes(disk_img_data)?)),
        _ => Ok(Box::new(img::dsk_cbm::Dsk::from_bytes(disk_img_data)?))
    }
}

/// Calls `create_img_from_bytestream` getting the bytes from a file.
/// The pathname must already be in the right format for the file system.
/// File extension will be used to restrict image types that are accepted,
/// unless the extension is unknown, in which case all will be tried.
/// If the host file is read-only so is the image.
pub fn create_img_from_file(img_path: &str) -> Result<Box<dyn DiskImage>,DYNERR> {
    let disk_img_data = std::fs::read(img_path)?;
    let mut maybe_ext = img_path.split('.').last();
    if let Some(ext) = maybe_ext {
        if !KNOWN_FILE_EXTENSIONS.split(',').any(|x| x==ext.to_lowercase()) {
            maybe_ext = None;
        }
    }
    let mut img = create_img_from_bytestream(&disk_img_data,maybe_ext)?;
    if std::fs::metadata(img_path)?.permissions().readonly() {
        info!("host file is read-only");
        img.set_read_only(true);
    }
    Ok(img)
}

/// Calls `create_img_from_file` and inserts the image into a new drive
pub fn create_drive_from_file(img_path: &str,opt: DriveOptions) -> Result<Drive,DYNERR> {
    let img = create_img_from_file(img_path)?;
    let mut drive = Drive::new();
    drive.attach(img,opt);
    Ok(drive)
}

/// Map a PETSCII byte to something printable, or None
fn petscii_to_char(c: u8) -> Option<char> {
    match c {
        0x20..=0x5f => Some(c as char),
        0xa0 => Some(' '),
        0xc1..=0xda => Some((c - 0x80) as char),
        _ => None
    }
}

/// Display binary to stdout in columns of hex and PETSCII
pub fn display_block(start_addr: u16,block: &[u8]) {
    let mut slice_start = 0;
    loop {
        let row_label = start_addr as usize + slice_start;
        let mut slice_end = slice_start + 16;
        if slice_end > block.len() {
            slice_end = block.len();
        }
        let slice = block[slice_start..slice_end].to_vec();
        let txt: String = slice.iter().map(|c| petscii_to_char(*c).unwrap_or('.')).collect();
        print!("{:04X} : ",row_label);
        for byte in slice {
            print!("{:02X} ",byte);
        }
        for _blank in slice_end..slice_start+16 {
            print!("   ");
        }
        println!("| {}",txt);
        slice_start += 16;
        if slice_end >= block.len() {
            break;
        }
    }
}

/// This takes PETSCII bytes and makes an ascii friendly string
/// by using hex escapes, e.g., `\xFF`.
/// Shifted spaces (0xA0) are escaped too, so names survive a round trip.
pub fn escaped_ascii_from_bytes(bytes: &[u8]) -> String {
    let mut result = String::new();
    for b in bytes {
        match *b {
            0x20..=0x5b | 0x5d..=0x5f => result.push(*b as char),
            _ => result += &format!("\\x{:02X}",b)
        }
    }
    return result;
}

/// Interpret a UTF8 string as pure ascii and put into PETSCII bytes.
/// Letters are put in upper case, which is how they are typed on the Commodore.
/// Non-ascii characters are omitted from the result, but arbitrary
/// bytes can be introduced using escapes, e.g., `\xFF`.
/// Literal hex escapes are created by coding the backslash, e.g., `\x5CxFF`.
pub fn escaped_ascii_to_bytes(s: &str) -> Vec<u8> {
    let mut ans: Vec<u8> = Vec::new();
    let hex_patt = Regex::new(r"\\x[0-9A-Fa-f][0-9A-Fa-f]").expect("unreachable");
    let mut curs = 0;
    for hex in hex_patt.find_iter(s) {
        push_ascii(&mut ans,&s[curs..hex.start()]);
        if let Ok(mut dat) = hex::decode(&s[hex.start()+2..hex.end()]) {
            ans.append(&mut dat);
        }
        curs = hex.end();
    }
    push_ascii(&mut ans,&s[curs..]);
    return ans;
}

fn push_ascii(ans: &mut Vec<u8>,s: &str) {
    for c in s.chars() {
        if c.is_ascii() {
            ans.push(c.to_ascii_uppercase() as u8);
        }
    }
}

#[test]
fn escapes() {
    assert_eq!(escaped_ascii_to_bytes("hello\\xA0x"),vec![0x48,0x45,0x4c,0x4c,0x4f,0xa0,0x58]);
    assert_eq!(escaped_ascii_to_bytes("\\x5CxFF"),b"\\XFF".to_vec());
    assert_eq!(escaped_ascii_from_bytes(&[0x41,0xa0,0x0d]),"A\\xA0\\x0D");
}
