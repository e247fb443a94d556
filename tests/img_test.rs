// test of disk image geometry, identification, and containers
use cbmkit::img;
use cbmkit::img::{geometry,DiskImage,DiskImageType,DiskKind};
use cbmkit::fs::{Drive,DriveOptions};
use cbmkit::fs::cbm::types::{DosError,Status};

fn format(img: Box<dyn DiskImage>) -> Drive {
    let mut drive = Drive::new();
    drive.attach(img,DriveOptions::default());
    assert_eq!(drive.command(b"N:IMAGE TEST,IT"),"00, OK,00,00");
    drive
}

#[test]
fn zone_tables() {
    assert_eq!(geometry::sector_count(DiskKind::CBM1541,1),21);
    assert_eq!(geometry::sector_count(DiskKind::CBM1541,18),19);
    assert_eq!(geometry::sector_count(DiskKind::CBM1541,25),18);
    assert_eq!(geometry::sector_count(DiskKind::CBM1541,31),17);
    assert_eq!(geometry::sector_count(DiskKind::CBM1541,43),0);
    assert_eq!(geometry::sector_count(DiskKind::CBM2040,18),20);
    assert_eq!(geometry::sector_count(DiskKind::CBM1571,36),21);
    assert_eq!(geometry::sector_count(DiskKind::CBM1581,80),40);
    assert_eq!(geometry::sector_count(DiskKind::CBM8050,39),29);
    assert_eq!(geometry::sector_count(DiskKind::CBM8250,78),29);
    assert_eq!(geometry::total_blocks(DiskKind::CBM1541,35),683);
    assert_eq!(geometry::total_blocks(DiskKind::CBM1541,40),768);
    assert_eq!(geometry::total_blocks(DiskKind::CBM2040,35),690);
    assert_eq!(geometry::total_blocks(DiskKind::CBM1571,70),1366);
    assert_eq!(geometry::total_blocks(DiskKind::CBM1581,80),3200);
    assert_eq!(geometry::total_blocks(DiskKind::CBM8050,77),2083);
    assert_eq!(geometry::total_blocks(DiskKind::CBM8250,154),4166);
}

#[test]
fn linear_addresses() {
    assert_eq!(geometry::linear_address(DiskKind::CBM1541,1,0).unwrap(),0);
    assert_eq!(geometry::linear_address(DiskKind::CBM1541,18,0).unwrap(),357);
    assert_eq!(geometry::linear_address(DiskKind::CBM1541,35,16).unwrap(),682);
    assert_eq!(geometry::linear_address(DiskKind::CBM1571,36,0).unwrap(),683);
    assert_eq!(geometry::linear_address(DiskKind::CBM1581,40,0).unwrap(),1560);
    assert_eq!(geometry::linear_address(DiskKind::CBM8250,78,0).unwrap(),2083);
    assert!(geometry::linear_address(DiskKind::CBM1541,0,0).is_err());
    assert!(geometry::linear_address(DiskKind::CBM1541,1,21).is_err());
    assert!(geometry::linear_address(DiskKind::CBM1541,43,0).is_err());
}

#[test]
fn every_block_has_one_address() {
    let kinds = [DiskKind::CBM1541,DiskKind::CBM2040,DiskKind::CBM1571,DiskKind::CBM1581,DiskKind::CBM8050,DiskKind::CBM8250];
    for kind in kinds {
        let tracks = geometry::max_tracks(kind);
        let mut count = 0;
        for track in 1..tracks+1 {
            for sector in 0..geometry::sector_count(kind,track) {
                assert_eq!(geometry::linear_address(kind,track,sector).unwrap(),count,"{} {},{}",kind,track,sector);
                count += 1;
            }
            assert!(geometry::linear_address(kind,track,geometry::sector_count(kind,track)).is_err());
        }
        assert_eq!(count,geometry::total_blocks(kind,tracks));
    }
}

#[test]
fn probe_is_repeatable() {
    let mut samples = vec![vec![0;174848],vec![0;175531],vec![0;1366*256],vec![0;3200*256],vec![0;4166*256],vec![0;1000]];
    samples.push(img::DiskImage::to_bytes(&mut img::x64::X64::create(40,"").unwrap()));
    samples.push(img::DiskImage::to_bytes(&mut img::g64::G64::create(35,*b"00")));
    for dat in samples {
        let first = img::probe::probe(&dat).ok();
        for _i in 0..3 {
            assert_eq!(img::probe::probe(&dat).ok(),first);
        }
    }
    assert_eq!(img::probe::probe(&vec![0;1000]).ok(),None);
}

#[test]
fn probe_by_extension() {
    let dat = vec![0;174848];
    let img = cbmkit::create_img_from_bytestream(&dat,Some("d64")).expect("not identified");
    assert_eq!(img.what_am_i(),DiskImageType::D64);
    assert_eq!(img.track_count(),35);
    assert!(cbmkit::create_img_from_bytestream(&dat,Some("d71")).is_err());
    assert!(cbmkit::create_img_from_bytestream(&dat,None).is_ok());
    assert!(cbmkit::create_img_from_bytestream(&vec![0;1000],None).is_err());
    let img = cbmkit::create_img_from_bytestream(&vec![0;1366*256],Some("D71")).expect("not identified");
    assert_eq!(img.kind(),DiskKind::CBM1571);
}

#[test]
fn error_info_bytes() {
    let mut drive = format(Box::new(img::dsk_cbm::Dsk::create(DiskImageType::D64,35).unwrap()));
    drive.save(b"BAD,S",b"abc").unwrap();
    drive.save(b"GOOD,S",&vec![7;300]).unwrap();
    let mut bytes = drive.detach().expect("no image").to_bytes();
    let mut errors = vec![1;683];
    errors[geometry::linear_address(DiskKind::CBM1541,17,0).unwrap()] = 5;
    bytes.append(&mut errors);
    let img = cbmkit::create_img_from_bytestream(&bytes,Some("d64")).expect("not identified");
    drive.attach(img,DriveOptions::default());
    assert!(drive.load(b"BAD").is_err());
    assert_eq!(drive.status(),"23,READ ERROR,17,00");
    assert_eq!(drive.load(b"GOOD").unwrap(),vec![7;300]);
    let mut saved = drive.detach().expect("no image").to_bytes();
    assert_eq!(saved.len(),683*257);
    assert_eq!(saved.pop(),Some(1));
}

#[test]
fn scratch_with_read_error() {
    let mut drive = format(Box::new(img::dsk_cbm::Dsk::create(DiskImageType::D64,35).unwrap()));
    drive.save(b"BAD,S",&vec![3;700]).unwrap();
    assert_eq!(drive.blocks_free().unwrap(),661);
    let mut bytes = drive.detach().expect("no image").to_bytes();
    let mut errors = vec![1;683];
    errors[geometry::linear_address(DiskKind::CBM1541,17,1).unwrap()] = 5;
    bytes.append(&mut errors);
    let img = cbmkit::create_img_from_bytestream(&bytes,Some("d64")).expect("not identified");
    drive.attach(img,DriveOptions::default());
    assert_eq!(drive.command(b"S:BAD"),"23,READ ERROR,17,01");
    assert_eq!(drive.entries().unwrap().len(),1);
    assert_eq!(drive.blocks_free().unwrap(),661);
    assert_eq!(drive.open(b"@0:BAD,S,W",2),Status::Error);
    assert_eq!(drive.status(),"23,READ ERROR,17,01");
    assert_eq!(drive.blocks_free().unwrap(),661);
    // the blocks of BAD must not be handed out again
    drive.save(b"NEW,S",&vec![4;300]).unwrap();
    let entries = drive.entries().unwrap();
    assert_eq!(entries.len(),2);
    assert_eq!(entries[0].first_block(),[17,0]);
    assert_eq!(entries[1].first_block(),[17,3]);
    assert_eq!(drive.blocks_free().unwrap(),659);
}

#[test]
fn looped_chain() {
    let mut drive = format(Box::new(img::dsk_cbm::Dsk::create(DiskImageType::D64,35).unwrap()));
    drive.save(b"LOOP,S",&vec![9;300]).unwrap();
    let mut disk = drive.detach().expect("no image");
    let mut buf = disk.read_sector(17,1).unwrap();
    assert_eq!(buf[0],0);
    buf[0] = 17;
    buf[1] = 0;
    disk.write_sector(17,1,&buf).unwrap();
    drive.attach(disk,DriveOptions::default());
    assert!(drive.load(b"LOOP").is_err());
    assert_eq!(drive.status(),"66,ILLEGAL TRACK OR SECTOR,00,00");
    assert_eq!(drive.command(b"C:COPY=LOOP"),"66,ILLEGAL TRACK OR SECTOR,00,00");
    assert_eq!(drive.entries().unwrap().len(),1);
    assert_eq!(drive.blocks_free().unwrap(),662);
}

#[test]
fn x64_container() {
    let mut drive = format(Box::new(img::x64::X64::create(35,"cbmkit").unwrap()));
    drive.save(b"HI,P",&[1,8,0x12,0x34]).unwrap();
    let bytes = drive.detach().expect("no image").to_bytes();
    assert_eq!(bytes.len(),64 + 174848);
    assert_eq!(&bytes[0..4],&[b'C',0x15,0x41,0x64]);
    assert!(cbmkit::create_img_from_bytestream(&bytes,Some("d64")).is_err());
    let img = cbmkit::create_img_from_bytestream(&bytes,Some("x64")).expect("not identified");
    assert_eq!(img.what_am_i(),DiskImageType::X64);
    drive.attach(img,DriveOptions::default());
    assert_eq!(drive.load(b"HI").unwrap(),vec![1,8,0x12,0x34]);
    assert_eq!(drive.blocks_free().unwrap(),663);
    let hdr = img::x64::X64::from_bytes(&bytes).unwrap();
    assert_eq!(hdr.label(),"cbmkit");
}

#[test]
fn g64_container() {
    let mut drive = format(Box::new(img::g64::G64::create(35,*b"IT")));
    assert_eq!(drive.blocks_free().unwrap(),664);
    let dat: Vec<u8> = (0..2000).map(|i| (i * 7 % 256) as u8).collect();
    drive.save(b"GCR DATA,S",&dat).unwrap();
    let bytes = drive.detach().expect("no image").to_bytes();
    let img = cbmkit::create_img_from_bytestream(&bytes,Some("g64")).expect("not identified");
    assert_eq!(img.what_am_i(),DiskImageType::G64);
    assert_eq!(img.track_count(),35);
    drive.attach(img,DriveOptions::default());
    assert_eq!(drive.load(b"GCR DATA").unwrap(),dat);
    assert_eq!(drive.blocks_free().unwrap(),656);
}

#[test]
fn read_only_image() {
    let mut img = img::dsk_cbm::Dsk::create(DiskImageType::D64,35).unwrap();
    img.set_read_only(true);
    assert!(img.write_sector(1,0,&[0;256]).is_err());
    let mut drive = Drive::new();
    drive.attach(Box::new(img),DriveOptions::default());
    assert!(drive.command(b"N:X,01").starts_with("26,"));
    assert_eq!(drive.status_code(),DosError::Ok);
}
