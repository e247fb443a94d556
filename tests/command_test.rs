// test of the command channel interpreter
use cbmkit::img;
use cbmkit::img::DiskImageType;
use cbmkit::fs::{Drive,DriveOptions};
use cbmkit::fs::cbm::{listing,types::{DosError,ReadResult,Status}};

const OK: &str = "00, OK,00,00";

fn formatted() -> Drive {
    let img = img::dsk_cbm::Dsk::create(DiskImageType::D64,35).expect("could not create image");
    let mut drive = Drive::new();
    drive.attach(Box::new(img),DriveOptions::default());
    assert_eq!(drive.command(b"N:TEST,01"),OK);
    drive
}

/// Change the type byte of the first directory entry using the block commands
fn poke_first_type(drive: &mut Drive,f: impl Fn(u8) -> u8) {
    assert_eq!(drive.open(b"#",5),Status::Ok);
    assert_eq!(drive.command(b"U1 5 0 18 1"),OK);
    assert_eq!(drive.command(b"B-P 5 2"),OK);
    let typ = match drive.read(5) {
        ReadResult::Data(b) => b,
        _ => panic!("buffer read failed")
    };
    assert_eq!(drive.command(b"B-P 5 2"),OK);
    assert_eq!(drive.write(5,f(typ)),Status::Ok);
    assert_eq!(drive.command(b"U2 5 0 18 1"),OK);
    assert_eq!(drive.close(5),Status::Ok);
}

#[test]
fn scratch() {
    let mut drive = formatted();
    drive.save(b"A1,S",b"1").unwrap();
    drive.save(b"A2,S",&vec![0;600]).unwrap();
    drive.save(b"B,S",b"3").unwrap();
    assert_eq!(drive.blocks_free().unwrap(),659);
    assert_eq!(drive.command(b"S:A*"),"01,FILES SCRATCHED,02,00");
    assert_eq!(drive.blocks_free().unwrap(),663);
    assert_eq!(drive.command(b"S0:NONE"),"01,FILES SCRATCHED,00,00");
    assert_eq!(drive.command(b"S:NONE,B"),"01,FILES SCRATCHED,01,00");
    assert_eq!(drive.blocks_free().unwrap(),664);
    assert_eq!(drive.command(b"S"),"34,SYNTAX ERROR,00,00");
}

#[test]
fn scratch_skips_locked() {
    let mut drive = formatted();
    drive.save(b"KEEP,S",b"1").unwrap();
    poke_first_type(&mut drive,|t| t | 0x40);
    assert_eq!(drive.command(b"S:*"),"01,FILES SCRATCHED,00,00");
    assert_eq!(drive.load(b"KEEP").unwrap(),b"1".to_vec());
    let txt = listing::to_text(&drive.catalog(b"$").unwrap());
    assert!(txt.contains("\"KEEP\"             SEQ<"));
}

#[test]
fn rename() {
    let mut drive = formatted();
    drive.save(b"OLD,P",b"data").unwrap();
    drive.save(b"OTHER,P",b"x").unwrap();
    assert_eq!(drive.command(b"R:NEW=OLD"),OK);
    assert_eq!(drive.load(b"NEW").unwrap(),b"data".to_vec());
    assert!(drive.load(b"OLD").is_err());
    assert_eq!(drive.status(),"62,FILE NOT FOUND,00,00");
    assert_eq!(drive.command(b"R0:OTHER=NEW"),"63,FILE EXISTS,00,00");
    assert_eq!(drive.command(b"R:X=MISSING"),"62,FILE NOT FOUND,00,00");
    assert_eq!(drive.command(b"R:NEW"),"30,SYNTAX ERROR,00,00");
}

#[test]
fn copy() {
    let mut drive = formatted();
    drive.save(b"A,S",&vec![1;300]).unwrap();
    drive.save(b"B,S",&vec![2;300]).unwrap();
    assert_eq!(drive.command(b"C:AB=A,B"),OK);
    let mut expected = vec![1;300];
    expected.append(&mut vec![2;300]);
    assert_eq!(drive.load(b"AB").unwrap(),expected);
    assert_eq!(drive.blocks_free().unwrap(),664 - 4 - 3);
    assert_eq!(drive.command(b"C:A=B"),"63,FILE EXISTS,00,00");
    assert_eq!(drive.command(b"C:Z=NOPE"),"62,FILE NOT FOUND,00,00");
}

#[test]
fn block_allocate_and_validate() {
    let mut drive = formatted();
    drive.save(b"FILE,S",&vec![0;1000]).unwrap();
    assert_eq!(drive.blocks_free().unwrap(),660);
    assert_eq!(drive.command(b"B-A 0 1 0"),OK);
    assert_eq!(drive.blocks_free().unwrap(),659);
    assert_eq!(drive.command(b"B-A 0 1 0"),"65,NO BLOCK,01,01");
    assert_eq!(drive.blocks_free().unwrap(),659);
    assert_eq!(drive.command(b"V"),OK);
    assert_eq!(drive.blocks_free().unwrap(),660);
    assert_eq!(drive.command(b"B-F 0 17 0"),OK);
    assert_eq!(drive.blocks_free().unwrap(),661);
    assert_eq!(drive.command(b"V"),OK);
    assert_eq!(drive.blocks_free().unwrap(),660);
    assert_eq!(drive.load(b"FILE").unwrap(),vec![0;1000]);
}

#[test]
fn validate_removes_unclosed() {
    let mut drive = formatted();
    drive.save(b"SPLAT,S",&vec![0;600]).unwrap();
    poke_first_type(&mut drive,|t| t & 0x7f);
    let txt = listing::to_text(&drive.catalog(b"$").unwrap());
    assert!(txt.contains("*SEQ"));
    assert_eq!(drive.command(b"V"),OK);
    assert_eq!(drive.entries().unwrap().len(),0);
    assert_eq!(drive.blocks_free().unwrap(),664);
}

#[test]
fn validate_keeps_bam_on_broken_chain() {
    let mut drive = formatted();
    drive.save(b"BROKEN,S",b"abc").unwrap();
    assert_eq!(drive.command(b"B-A 0 1 0"),OK);
    // point the file at a track that does not exist
    assert_eq!(drive.open(b"#",5),Status::Ok);
    assert_eq!(drive.command(b"U1 5 0 18 1"),OK);
    assert_eq!(drive.command(b"B-P 5 3"),OK);
    assert_eq!(drive.write(5,99),Status::Ok);
    assert_eq!(drive.command(b"U2 5 0 18 1"),OK);
    assert_eq!(drive.command(b"V"),"66,ILLEGAL TRACK OR SECTOR,99,00");
    assert_eq!(drive.blocks_free().unwrap(),662);
}

#[test]
fn block_read_write() {
    let mut drive = formatted();
    assert_eq!(drive.open(b"#",4),Status::Ok);
    assert_eq!(drive.command(b"B-R 4 0 18 0"),OK);
    let mut hdr = Vec::new();
    for _i in 0..4 {
        if let ReadResult::Data(b) = drive.read(4) {
            hdr.push(b);
        }
    }
    assert_eq!(hdr,vec![18,1,b'A',0]);
    assert_eq!(drive.command(b"B-P 4 144"),OK);
    let mut name = Vec::new();
    for _i in 0..4 {
        if let ReadResult::Data(b) = drive.read(4) {
            name.push(b);
        }
    }
    assert_eq!(name,b"TEST".to_vec());
    assert_eq!(drive.command(b"B-P 4 0"),OK);
    for i in 0..256 {
        assert_eq!(drive.write(4,i as u8),Status::Ok);
    }
    assert_eq!(drive.command(b"U2:4,0,1,5"),OK);
    assert_eq!(drive.command(b"U1 4 0 18 0"),OK);
    assert_eq!(drive.read(4),ReadResult::Data(18));
    assert_eq!(drive.command(b"UA 4 0 1 5"),OK);
    let mut dat = Vec::new();
    while let ReadResult::Data(b) = drive.read(4) {
        dat.push(b);
    }
    assert_eq!(dat,(0..256).map(|i| i as u8).collect::<Vec<u8>>());
}

#[test]
fn block_errors() {
    let mut drive = formatted();
    assert_eq!(drive.open(b"#",5),Status::Ok);
    assert_eq!(drive.command(b"U1 5 0 36 0"),"66,ILLEGAL TRACK OR SECTOR,36,00");
    assert_eq!(drive.command(b"U1 5 0 1 21"),"66,ILLEGAL TRACK OR SECTOR,01,21");
    assert_eq!(drive.command(b"U1 6 0 18 0"),"70,NO CHANNEL,00,00");
    assert_eq!(drive.command(b"U1 5 0 18"),"30,SYNTAX ERROR,00,00");
    assert_eq!(drive.command(b"B-Q 5 0 18 0"),"31,SYNTAX ERROR,00,00");
}

#[test]
fn user_commands() {
    let mut drive = formatted();
    assert_eq!(drive.command(b"UI"),"73,CBM DOS V2.6 1541,00,00");
    assert_eq!(drive.command(b"UJ"),"73,CBM DOS V2.6 1541,00,00");
    assert_eq!(drive.command(b"UI+"),OK);
    assert_eq!(drive.command(b"UI-"),OK);
    assert_eq!(drive.command(b"U0"),OK);
    assert_eq!(drive.command(b"U3"),"74,DRIVE NOT READY,00,00");
}

#[test]
fn unsupported_commands() {
    let mut drive = formatted();
    assert_eq!(drive.command(b"M-R\x00\x05\x01"),"31,SYNTAX ERROR,00,00");
    assert_eq!(drive.command(b"P\x02\x01\x00\x01"),"31,SYNTAX ERROR,00,00");
    assert_eq!(drive.command(b"D"),"31,SYNTAX ERROR,00,00");
    assert_eq!(drive.command(&vec![b'S';129]),"32,SYNTAX ERROR,00,00");
    assert_eq!(drive.command(b"I"),OK);
}

#[test]
fn command_written_to_channel() {
    let mut drive = formatted();
    drive.save(b"GONE,S",b"x").unwrap();
    assert_eq!(drive.open(b"",15),Status::Ok);
    for b in b"S:GONE\r" {
        assert_eq!(drive.write(15,*b),Status::Ok);
    }
    assert_eq!(drive.flush(15),Status::Ok);
    assert_eq!(drive.status(),"01,FILES SCRATCHED,01,00");
    assert_eq!(drive.entries().unwrap().len(),0);
}

#[test]
fn closing_command_channel() {
    let mut drive = formatted();
    assert_eq!(drive.open(b"OPEN,S,W",3),Status::Ok);
    assert_eq!(drive.write(3,b'z'),Status::Ok);
    assert_eq!(drive.close(15),Status::Ok);
    assert_eq!(drive.load(b"OPEN").unwrap(),b"z".to_vec());
    assert_eq!(drive.read(3),ReadResult::Error);
    assert_eq!(drive.status_code(),DosError::FileNotOpen);
}

#[test]
fn format_other_drives() {
    let img = img::dsk_cbm::Dsk::create(DiskImageType::D71,70).unwrap();
    let mut drive = Drive::new();
    drive.attach(Box::new(img),DriveOptions::default());
    assert_eq!(drive.command(b"N:DOUBLE,71"),OK);
    let txt = listing::to_text(&drive.catalog(b"$").unwrap());
    assert_eq!(txt,"0 \"DOUBLE          \" 71 2A\n1328 BLOCKS FREE.\n");
    let img = img::dsk_cbm::Dsk::create(DiskImageType::D81,80).unwrap();
    drive.attach(Box::new(img),DriveOptions::default());
    assert_eq!(drive.command(b"N:THREE,81"),OK);
    let txt = listing::to_text(&drive.catalog(b"$").unwrap());
    assert_eq!(txt,"0 \"THREE           \" 81 3D\n3160 BLOCKS FREE.\n");
}
