// test of the drive as seen from the serial bus
use cbmkit::img;
use cbmkit::img::{geometry,DiskImageType};
use cbmkit::fs::{Drive,DriveOptions};
use cbmkit::fs::cbm::types::{DosError,ReadResult,Status,FileType};

fn formatted(typ: DiskImageType) -> Drive {
    let tracks = geometry::nominal_tracks(typ.disk_kind());
    let img = img::dsk_cbm::Dsk::create(typ,tracks).expect("could not create image");
    let mut drive = Drive::new();
    drive.attach(Box::new(img),DriveOptions::default());
    assert_eq!(drive.command(b"N:TEST,01"),"00, OK,00,00");
    drive
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn read_all(drive: &mut Drive,sa: usize) -> Vec<u8> {
    let mut ans = Vec::new();
    while let ReadResult::Data(b) = drive.read(sa) {
        ans.push(b);
    }
    ans
}

#[test]
fn empty_listing() {
    let mut drive = formatted(DiskImageType::D64);
    let mut expected: Vec<u8> = vec![0x01,0x04,1,1,0,0,0x12,b'"'];
    expected.extend_from_slice(b"TEST            \" 01 2A");
    expected.push(0);
    expected.extend_from_slice(&[1,1,0x98,0x02]);
    expected.extend_from_slice(b"BLOCKS FREE.             ");
    expected.extend_from_slice(&[0,0,0]);
    assert_eq!(drive.catalog(b"$").expect("listing failed"),expected);
    assert_eq!(drive.open(b"$",0),Status::Ok);
    assert_eq!(read_all(&mut drive,0),expected);
    assert_eq!(drive.close(0),Status::Ok);
}

#[test]
fn empty_free_counts() {
    assert_eq!(formatted(DiskImageType::D64).blocks_free().unwrap(),664);
    assert_eq!(formatted(DiskImageType::D71).blocks_free().unwrap(),1328);
    assert_eq!(formatted(DiskImageType::D81).blocks_free().unwrap(),3160);
    assert_eq!(formatted(DiskImageType::D80).blocks_free().unwrap(),2052);
}

#[test]
fn round_trips() {
    let mut drive = formatted(DiskImageType::D64);
    let mut free = 664;
    for (i,len) in [0,1,254,255,508,509,5000].iter().enumerate() {
        let name = format!("FILE{},S",i);
        let dat = pattern(*len);
        drive.save(name.as_bytes(),&dat).expect("save failed");
        let blocks = usize::max(1,(len + 253) / 254);
        free -= blocks;
        assert_eq!(drive.blocks_free().unwrap(),free);
        assert_eq!(drive.load(format!("FILE{}",i).as_bytes()).expect("load failed"),dat);
        let entries = drive.entries().unwrap();
        assert_eq!(entries[i].block_count(),blocks);
        assert_eq!(entries[i].file_type(),FileType::Seq);
        assert!(entries[i].is_closed());
    }
}

#[test]
fn round_trip_other_formats() {
    for typ in [DiskImageType::D71,DiskImageType::D81,DiskImageType::D80,DiskImageType::D82,DiskImageType::D67] {
        let mut drive = formatted(typ);
        let before = drive.blocks_free().unwrap();
        let dat = pattern(3000);
        drive.save(b"BIG,P",&dat).expect("save failed");
        assert_eq!(drive.load(b"BIG").expect("load failed"),dat);
        assert_eq!(drive.blocks_free().unwrap(),before - 12);
    }
}

#[test]
fn file_not_found() {
    let mut drive = formatted(DiskImageType::D64);
    drive.save(b"HELLO,P",b"abc").expect("save failed");
    let before = drive.catalog(b"$").unwrap();
    assert_eq!(drive.open(b"NOPE",2),Status::Error);
    assert_eq!(drive.status(),"62,FILE NOT FOUND,00,00");
    assert_eq!(drive.status_code(),DosError::FileNotFound);
    assert_eq!(drive.catalog(b"$").unwrap(),before);
    assert_eq!(drive.open(b"HELLO",2),Status::Ok);
    assert_eq!(read_all(&mut drive,2),b"abc".to_vec());
}

#[test]
fn wildcards() {
    let mut drive = formatted(DiskImageType::D64);
    drive.save(b"HELLO,P",b"1").expect("save failed");
    drive.save(b"HAPPY,P",b"2").expect("save failed");
    assert_eq!(drive.load(b"H*").unwrap(),b"1".to_vec());
    assert_eq!(drive.load(b"HA?PY").unwrap(),b"2".to_vec());
    assert_eq!(drive.load(b"0:HAP*").unwrap(),b"2".to_vec());
    assert_eq!(drive.open(b"H*,S,W",2),Status::Error);
    assert_eq!(drive.status_code(),DosError::InvalidFilename);
}

#[test]
fn file_exists_and_replace() {
    let mut drive = formatted(DiskImageType::D64);
    drive.save(b"DATA,S",&pattern(600)).expect("save failed");
    assert_eq!(drive.blocks_free().unwrap(),661);
    assert!(drive.save(b"DATA,S",b"x").is_err());
    assert_eq!(drive.status_code(),DosError::FileExists);
    assert_eq!(drive.blocks_free().unwrap(),661);
    drive.save(b"@0:DATA,S",b"short").expect("replace failed");
    assert_eq!(drive.blocks_free().unwrap(),663);
    assert_eq!(drive.entries().unwrap().len(),1);
    assert_eq!(drive.load(b"DATA").unwrap(),b"short".to_vec());
    // old blocks are free as soon as the replacing file is opened
    assert_eq!(drive.open(b"@0:DATA,S,W",2),Status::Ok);
    assert_eq!(drive.blocks_free().unwrap(),664);
    for b in pattern(300) {
        assert_eq!(drive.write(2,b),Status::Ok);
    }
    assert_eq!(drive.close(2),Status::Ok);
    assert_eq!(drive.blocks_free().unwrap(),662);
    assert_eq!(drive.load(b"DATA").unwrap(),pattern(300));
}

#[test]
fn disk_full() {
    let mut drive = formatted(DiskImageType::D64);
    let capacity = 664 * 254;
    assert_eq!(drive.open(b"FILLER,S,W",2),Status::Ok);
    for i in 0..capacity {
        assert_eq!(drive.write(2,(i % 256) as u8),Status::Ok);
    }
    assert_eq!(drive.write(2,0),Status::Error);
    assert_eq!(drive.status_code(),DosError::DiskFull);
    assert_eq!(drive.close(2),Status::Ok);
    assert_eq!(drive.blocks_free().unwrap(),0);
    assert_eq!(drive.load(b"FILLER").unwrap().len(),capacity);
    assert!(drive.save(b"MORE,S",b"1").is_err());
    assert_eq!(drive.status_code(),DosError::DiskFull);
}

#[test]
fn directory_grows() {
    let mut drive = formatted(DiskImageType::D64);
    for i in 0..20 {
        drive.save(format!("F{}",i).as_bytes(),&[i as u8]).expect("save failed");
    }
    assert_eq!(drive.entries().unwrap().len(),20);
    assert_eq!(drive.blocks_free().unwrap(),644);
    let listing = drive.catalog(b"$").unwrap();
    assert_eq!(listing.len(),64 + 32 * 20);
    for i in 0..20 {
        assert_eq!(drive.load(format!("F{}",i).as_bytes()).unwrap(),vec![i as u8]);
    }
    // the chain continues with an interleave of 3
    assert_eq!(drive.open(b"#",3),Status::Ok);
    assert_eq!(drive.command(b"U1 3 0 18 1"),"00, OK,00,00");
    assert_eq!(drive.read(3),ReadResult::Data(18));
    assert_eq!(drive.read(3),ReadResult::Data(4));
}

#[test]
fn independent_channels() {
    let mut drive = formatted(DiskImageType::D64);
    drive.save(b"A,S",&pattern(300)).expect("save failed");
    drive.save(b"B,S",&pattern(10)).expect("save failed");
    assert_eq!(drive.open(b"A",2),Status::Ok);
    assert_eq!(drive.open(b"B",3),Status::Ok);
    assert_eq!(drive.open(b"B",3),Status::Error);
    assert_eq!(drive.status_code(),DosError::NoChannel);
    let mut a = Vec::new();
    let mut b = Vec::new();
    loop {
        let ra = drive.read(2);
        let rb = drive.read(3);
        if let ReadResult::Data(x) = ra {
            a.push(x);
        }
        if let ReadResult::Data(x) = rb {
            b.push(x);
        }
        if ra == ReadResult::Eof && rb == ReadResult::Eof {
            break;
        }
    }
    assert_eq!(a,pattern(300));
    assert_eq!(b,pattern(10));
}

#[test]
fn double_close() {
    let mut drive = formatted(DiskImageType::D64);
    assert_eq!(drive.open(b"X,S,W",2),Status::Ok);
    assert_eq!(drive.write(2,1),Status::Ok);
    assert_eq!(drive.close(2),Status::Ok);
    assert_eq!(drive.close(2),Status::Ok);
    assert_eq!(drive.close(9),Status::Ok);
    assert_eq!(drive.entries().unwrap().len(),1);
}

#[test]
fn error_latch() {
    let mut drive = formatted(DiskImageType::D64);
    assert_eq!(drive.read(3),ReadResult::Error);
    assert_eq!(drive.open(b"X",16),Status::Error);
    assert_eq!(drive.status(),"61,FILE NOT OPEN,00,00");
    let mut msg = Vec::new();
    while let ReadResult::Data(b) = drive.read(15) {
        msg.push(b);
    }
    assert_eq!(msg,b"61,FILE NOT OPEN,00,00\r".to_vec());
    assert_eq!(drive.status(),"00, OK,00,00");
}

#[test]
fn status_after_attach() {
    let img = img::dsk_cbm::Dsk::create(DiskImageType::D81,80).unwrap();
    let mut drive = Drive::new();
    drive.attach(Box::new(img),DriveOptions::default());
    assert_eq!(drive.status(),"73,COPYRIGHT CBM DOS V10 1581,00,00");
}

#[test]
fn no_disk() {
    let mut drive = Drive::new();
    assert_eq!(drive.open(b"X",2),Status::Error);
    assert_eq!(drive.status(),"74,DRIVE NOT READY,18,00");
    assert!(drive.detach().is_none());
}

#[test]
fn write_protect() {
    let mut drive = formatted(DiskImageType::D64);
    drive.save(b"KEEP,S",b"kept").expect("save failed");
    let img = drive.detach().expect("no image");
    drive.attach(img,DriveOptions { read_only: true, format: None });
    assert_eq!(drive.open(b"NEW,S,W",2),Status::Error);
    assert_eq!(drive.status_code(),DosError::WriteProtect);
    assert_eq!(drive.load(b"KEEP").unwrap(),b"kept".to_vec());
    assert!(drive.command(b"S:KEEP").starts_with("26,"));
}

#[test]
fn detach_abandons_writes() {
    let mut drive = formatted(DiskImageType::D64);
    assert_eq!(drive.open(b"LOST,S,W",2),Status::Ok);
    for b in pattern(600) {
        drive.write(2,b);
    }
    let img = drive.detach().expect("no image");
    drive.attach(img,DriveOptions::default());
    assert_eq!(drive.status(),"73,CBM DOS V2.6 1541,00,00");
    assert_eq!(drive.blocks_free().unwrap(),664);
    assert_eq!(drive.entries().unwrap().len(),0);
}

#[test]
fn raw_directory() {
    let mut drive = formatted(DiskImageType::D64);
    assert_eq!(drive.open(b"$",2),Status::Ok);
    assert_eq!(drive.read(2),ReadResult::Data(b'A'));
    assert_eq!(drive.read(2),ReadResult::Data(0));
}

#[test]
fn listing_filters() {
    let mut drive = formatted(DiskImageType::D64);
    drive.save(b"PROG,P",b"1").expect("save failed");
    drive.save(b"TEXT,S",b"2").expect("save failed");
    assert_eq!(drive.catalog(b"$").unwrap().len(),64 + 32 * 2);
    assert_eq!(drive.catalog(b"$:P*").unwrap().len(),64 + 32);
    assert_eq!(drive.catalog(b"$:*=S").unwrap().len(),64 + 32);
    assert_eq!(drive.catalog(b"$0:X*").unwrap().len(),64);
}

#[test]
fn relative_files_refused() {
    let mut drive = formatted(DiskImageType::D64);
    assert_eq!(drive.open(b"REL,L,\x20",2),Status::Error);
    assert_eq!(drive.status_code(),DosError::FileTypeMismatch);
}
