use clap;
use log::info;
use crate::fs::DriveOptions;
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

/// Attach the image, send one command, check the error channel, and save the image
fn run(img_path: &str,dos_cmd: &[u8]) -> STDRESULT {
    let mut drive = crate::create_drive_from_file(img_path,DriveOptions::default())?;
    let msg = super::check_status(&drive.command(dos_cmd))?;
    info!("drive status {}",msg);
    crate::save_img(&mut drive,img_path)
}

fn with_args(cmd_letter: u8,args: &[&[u8]],sep: u8) -> Vec<u8> {
    let mut ans = vec![cmd_letter,b':'];
    ans.append(&mut args.join(&sep));
    ans
}

pub fn delete(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let name = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("file").expect(RCH));
    run(img_path,&with_args(b'S',&[&name[..]],b','))
}

pub fn rename(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let old = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("file").expect(RCH));
    let new = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("name").expect(RCH));
    run(img_path,&with_args(b'R',&[&new[..],&old[..]],b'='))
}

pub fn copy(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let sources = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("file").expect(RCH));
    let new = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("name").expect(RCH));
    run(img_path,&with_args(b'C',&[&new[..],&sources[..]],b'='))
}

pub fn validate(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    run(img_path,b"V")
}

/// Raw command, the error channel is printed whatever it says
pub fn cmd(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let dos_cmd = crate::escaped_ascii_to_bytes(cmd.get_one::<String>("command").expect(RCH));
    let opt = DriveOptions { read_only: cmd.get_flag("read-only"), format: None };
    let mut drive = crate::create_drive_from_file(img_path,opt)?;
    let msg = drive.command(&dos_cmd);
    println!("{}",msg);
    if cmd.get_flag("dry-run") || cmd.get_flag("read-only") {
        return Ok(());
    }
    crate::save_img(&mut drive,img_path)
}

#[test]
fn command_text() {
    assert_eq!(with_args(b'R',&[&b"NEW"[..],&b"OLD"[..]],b'='),b"R:NEW=OLD".to_vec());
    assert_eq!(with_args(b'S',&[&b"A*"[..]],b','),b"S:A*".to_vec());
}
