//! Module for handling Commodore GCR nibbles
//! 
//! Every 4 bits of data become 5 bits on the disk, so 4 data bytes pack into 5 disk bytes.
//! A 1541 track is a circular sequence of sectors, each made of a header block and a data block,
//! and each block is preceded by a sync mark (a run of 1 bits, byte aligned in images).
//! 
//! decoded header block is [0x08,chk,sector,track,id2,id1,0x0f,0x0f], chk = sector^track^id2^id1
//! decoded data block is [0x07,data 256 bytes,chk,0x00,0x00], chk is the xor of the data

use log::{trace,debug};
use crate::img::NibbleError;

const INVALID_NIB_BYTE: u8 = 0xff;
const HEADER_MARK: u8 = 0x08;
const DATA_MARK: u8 = 0x07;
pub const HEADER_GCR_LEN: usize = 10;
pub const DATA_GCR_LEN: usize = 325;
const SYNC_LEN: usize = 5;
const HEADER_GAP: usize = 9;
const SECTOR_GAP: usize = 8;
const GAP_BYTE: u8 = 0x55;

const FWD_G64: [u8;16] = [
    0b01010, 0b01011, 0b10010, 0b10011,
    0b01110, 0b01111, 0b10110, 0b10111,
    0b01001, 0b11001, 0b11010, 0b11011,
    0b01101, 0b11101, 0b11110, 0b10101
];

const REV_G64: [u8;32] = [
    0xFF,0xFF,0xFF,0xFF,0xFF,0xFF,0xFF,0xFF,
    0xFF,0x08,0x00,0x01,0xFF,0x0C,0x04,0x05,
    0xFF,0xFF,0x02,0x03,0xFF,0x0F,0x06,0x07,
    0xFF,0x09,0x0A,0x0B,0xFF,0x0D,0x0E,0xFF
];

/// encode 4 data bytes as 5 disk bytes, MSB first
pub fn encode_group(src: &[u8]) -> [u8;5] {
    let mut bits: u64 = 0;
    for i in 0..4 {
        bits = (bits << 10) | ((FWD_G64[(src[i] >> 4) as usize] as u64) << 5) | FWD_G64[(src[i] & 0x0f) as usize] as u64;
    }
    let mut ans = [0;5];
    for i in 0..5 {
        ans[i] = (bits >> (32 - 8*i)) as u8;
    }
    ans
}

/// decode 5 disk bytes as 4 data bytes, invalid nibble will yield error
pub fn decode_group(src: &[u8]) -> Result<[u8;4],NibbleError> {
    let mut bits: u64 = 0;
    for i in 0..5 {
        bits = (bits << 8) | src[i] as u64;
    }
    let mut ans = [0;4];
    for i in 0..8 {
        let nib = REV_G64[((bits >> (35 - 5*i)) & 0x1f) as usize];
        if nib == INVALID_NIB_BYTE {
            return Err(NibbleError::InvalidByte);
        }
        ans[i/2] |= match i%2 {
            0 => nib << 4,
            _ => nib
        };
    }
    Ok(ans)
}

/// encode a buffer whose length is a multiple of 4
pub fn encode_bytes(src: &[u8]) -> Vec<u8> {
    let mut ans = Vec::new();
    for chunk in src.chunks(4) {
        ans.extend_from_slice(&encode_group(chunk));
    }
    ans
}

/// decode a buffer whose length is a multiple of 5
pub fn decode_bytes(src: &[u8]) -> Result<Vec<u8>,NibbleError> {
    let mut ans = Vec::new();
    for chunk in src.chunks(5) {
        ans.extend_from_slice(&decode_group(chunk)?);
    }
    Ok(ans)
}

/// Read `n` bytes starting at `start`, wrapping around the end of the track
fn get_circular(track: &[u8],start: usize,n: usize) -> Vec<u8> {
    (0..n).map(|i| track[(start+i) % track.len()]).collect()
}

fn put_circular(track: &mut [u8],start: usize,dat: &[u8]) {
    let len = track.len();
    for i in 0..dat.len() {
        track[(start+i) % len] = dat[i];
    }
}

/// Starting from `start`, find the first byte that follows a sync mark.
/// Returns the position and the distance scanned, or None if the track has no sync.
fn find_sync(track: &[u8],start: usize) -> Option<(usize,usize)> {
    let len = track.len();
    let mut run = 0;
    for dist in 0..2*len {
        let b = track[(start+dist) % len];
        if b == 0xff {
            run += 1;
            if run >= len {
                return None;
            }
        } else if run >= 2 {
            return Some(((start+dist) % len,dist));
        } else {
            run = 0;
        }
    }
    None
}

fn data_checksum(dat: &[u8]) -> u8 {
    dat.iter().fold(0,|acc,b| acc ^ b)
}

/// Locate the data block of the given sector, returning the offset of its first GCR byte
pub fn find_data_block(track_buf: &[u8],track: u8,sector: u8) -> Result<usize,NibbleError> {
    if track_buf.len() < HEADER_GCR_LEN + DATA_GCR_LEN {
        return Err(NibbleError::BadTrack);
    }
    let mut ptr = 0;
    let mut scanned = 0;
    while scanned < track_buf.len() {
        let (pos,dist) = match find_sync(track_buf,ptr) {
            Some(x) => x,
            None => return Err(NibbleError::SyncNotFound)
        };
        scanned += dist + 1;
        ptr = (pos + 1) % track_buf.len();
        let header = match decode_bytes(&get_circular(track_buf,pos,HEADER_GCR_LEN)) {
            Ok(h) => h,
            Err(_) => continue
        };
        if header[0]!=HEADER_MARK || header[2]!=sector || header[3]!=track {
            continue;
        }
        if header[1] != header[2] ^ header[3] ^ header[4] ^ header[5] {
            debug!("header checksum mismatch at {},{}",track,sector);
        }
        trace!("found header {},{} at {}",track,sector,pos);
        return match find_sync(track_buf,(pos + HEADER_GCR_LEN) % track_buf.len()) {
            Some((data_pos,_)) => Ok(data_pos),
            None => Err(NibbleError::SyncNotFound)
        };
    }
    Err(NibbleError::SectorNotFound)
}

/// Decode one sector from a track buffer
pub fn decode_sector(track_buf: &[u8],track: u8,sector: u8) -> Result<Vec<u8>,NibbleError> {
    let pos = find_data_block(track_buf,track,sector)?;
    let block = decode_bytes(&get_circular(track_buf,pos,DATA_GCR_LEN))?;
    if block[0] != DATA_MARK {
        return Err(NibbleError::SectorNotFound);
    }
    if block[257] != data_checksum(&block[1..257]) {
        return Err(NibbleError::BadChecksum);
    }
    Ok(block[1..257].to_vec())
}

/// Re-encode the data block of an existing sector in place
pub fn encode_sector(track_buf: &mut [u8],track: u8,sector: u8,dat: &[u8]) -> Result<(),NibbleError> {
    let pos = find_data_block(track_buf,track,sector)?;
    let mut block = vec![DATA_MARK];
    block.extend_from_slice(&dat[0..256]);
    block.push(data_checksum(&dat[0..256]));
    block.push(0);
    block.push(0);
    put_circular(track_buf,pos,&encode_bytes(&block));
    Ok(())
}

/// Lay out a freshly formatted track, every sector zeroed
pub fn format_track(track: u8,sectors: usize,id: [u8;2],track_len: usize) -> Vec<u8> {
    let mut ans = Vec::new();
    let mut empty = vec![DATA_MARK];
    empty.extend_from_slice(&[0;256]);
    empty.extend_from_slice(&[0,0,0]);
    let data_block = encode_bytes(&empty);
    for sector in 0..sectors as u8 {
        let chk = sector ^ track ^ id[1] ^ id[0];
        ans.extend_from_slice(&[0xff;SYNC_LEN]);
        ans.extend_from_slice(&encode_bytes(&[HEADER_MARK,chk,sector,track,id[1],id[0],0x0f,0x0f]));
        ans.extend_from_slice(&[GAP_BYTE;HEADER_GAP]);
        ans.extend_from_slice(&[0xff;SYNC_LEN]);
        ans.extend_from_slice(&data_block);
        ans.extend_from_slice(&[GAP_BYTE;SECTOR_GAP]);
    }
    while ans.len() < track_len {
        ans.push(GAP_BYTE);
    }
    ans
}

#[test]
fn group_codec() {
    let gcr = encode_group(&[0x08,0x12,0x00,0x01]);
    assert_eq!(gcr[0],0x52);
    assert_eq!(decode_group(&gcr).unwrap(),[0x08,0x12,0x00,0x01]);
    assert!(decode_group(&[0,0,0,0,0]).is_err());
}

#[test]
fn sector_in_formatted_track() {
    let mut trk = format_track(18,19,[0x41,0x42],7142);
    let mut dat = vec![0;256];
    dat[0] = 18;
    dat[1] = 1;
    dat[255] = 0xc7;
    encode_sector(&mut trk,18,0,&dat).expect("encode failed");
    assert_eq!(decode_sector(&trk,18,0).unwrap(),dat);
    assert_eq!(decode_sector(&trk,18,18).unwrap(),vec![0;256]);
    assert!(decode_sector(&trk,18,19).is_err());
}
