//! # Directory listing
//! 
//! Opening `$` on secondary address 0 produces the directory as a tokenized BASIC program,
//! which the computer loads at 0x0401 and can LIST.  The whole program is built in memory
//! when the channel is opened.
//! 
//! Each line is 32 bytes: a link (always 0x0101, the computer relinks on load), the block
//! count as the line number, the quoted name, and the type.  The first line holds the disk
//! name and id in reverse video, the last line the free block count.

use super::types::*;
use super::bam::Bam;
use super::directory::{Directory,DirectorySlot};

const LOAD_ADDRESS: u16 = 0x0401;
const LINE_LEN: usize = 32;
const REVERSE_ON: u8 = 0x12;

fn unpad(dat: &[u8]) -> Vec<u8> {
    dat.iter().map(|c| match *c {
        PAD => 0x20,
        x => x
    }).collect()
}

/// Split the name given to `$` into a name pattern and type filter.
/// Accepts `$`, `$:pattern`, `$0:pattern`, and `pattern=T` where T is a type letter.
pub fn parse_pattern(name: &[u8]) -> (Vec<u8>,Option<FileType>) {
    let mut rest = match name.first() {
        Some(b'$') => &name[1..],
        _ => name
    };
    if let Some(colon) = rest.iter().position(|c| *c == b':') {
        if rest[0..colon].iter().all(|c| c.is_ascii_digit()) {
            rest = &rest[colon+1..];
        }
    }
    let (pattern,filter) = match rest.iter().position(|c| *c == b'=') {
        Some(eq) => (&rest[0..eq],rest.get(eq+1).and_then(|c| FileType::from_letter(*c))),
        None => (rest,None)
    };
    let len = usize::min(pattern.len(),MAX_NAME_LEN);
    (pattern[0..len].to_vec(),filter)
}

fn file_line(slot: &DirectorySlot) -> Vec<u8> {
    let mut ans: Vec<u8> = vec![1,1];
    let blocks = slot.block_count();
    ans.extend_from_slice(&u16::to_le_bytes(blocks as u16));
    if blocks < 10 {
        ans.push(b' ');
    }
    if blocks < 100 {
        ans.push(b' ');
    }
    ans.push(b' ');
    ans.push(b'"');
    let end = slot.name.iter().position(|c| *c == PAD).unwrap_or(MAX_NAME_LEN);
    let mut name = unpad(&slot.name);
    name.push(b' ');
    name[end] = b'"';
    ans.append(&mut name);
    ans.push(match slot.is_closed() {
        true => b' ',
        false => b'*'
    });
    ans.extend_from_slice(slot.file_type().to_string().as_bytes());
    ans.push(match slot.is_locked() {
        true => b'<',
        false => b' '
    });
    while ans.len() < LINE_LEN - 1 {
        ans.push(b' ');
    }
    ans.push(0);
    ans
}

/// Build the listing program, load address first
pub fn build(bam: &Bam,dir: &Directory,pattern: &[u8],filter: Option<FileType>) -> Vec<u8> {
    let mut ans: Vec<u8> = u16::to_le_bytes(LOAD_ADDRESS).to_vec();
    ans.extend_from_slice(&[1,1,0,0,REVERSE_ON,b'"']);
    ans.append(&mut unpad(&bam.disk_name()));
    ans.extend_from_slice(&[b'"',b' ']);
    ans.append(&mut unpad(&bam.disk_id()));
    ans.push(0);
    for (_,slot) in dir.entries(pattern) {
        if let Some(typ) = filter {
            if slot.file_type() != typ {
                continue;
            }
        }
        ans.append(&mut file_line(&slot));
    }
    ans.extend_from_slice(&[1,1]);
    ans.extend_from_slice(&u16::to_le_bytes(bam.blocks_free() as u16));
    ans.extend_from_slice(b"BLOCKS FREE.");
    ans.extend_from_slice(&[b' ';13]);
    ans.push(0);
    ans.extend_from_slice(&[0,0]);
    ans
}

/// Render a listing program as text, the way LIST shows it.
/// Stops at the end marker or at the first truncated line.
pub fn to_text(prog: &[u8]) -> String {
    let mut ans = String::new();
    let mut ptr = 2;
    while ptr + 4 <= prog.len() {
        if prog[ptr] == 0 && prog[ptr+1] == 0 {
            break;
        }
        let num = u16::from_le_bytes([prog[ptr+2],prog[ptr+3]]);
        ptr += 4;
        let end = match prog[ptr..].iter().position(|c| *c == 0) {
            Some(i) => ptr + i,
            None => break
        };
        let txt: String = prog[ptr..end].iter().filter_map(|c| match *c {
            REVERSE_ON => None,
            PAD => Some(' '),
            x if x >= 0x20 && x < 0x80 => Some(x as char),
            _ => Some('.')
        }).collect();
        ans += &format!("{} {}\n",num,txt.trim_end());
        ptr = end + 1;
    }
    ans
}

#[test]
fn patterns() {
    assert_eq!(parse_pattern(b"$"),(vec![],None));
    assert_eq!(parse_pattern(b"$:A*"),(b"A*".to_vec(),None));
    assert_eq!(parse_pattern(b"$0:A*=P"),(b"A*".to_vec(),Some(FileType::Prg)));
    assert_eq!(parse_pattern(b"$X:Y"),(b"X:Y".to_vec(),None));
}

#[test]
fn file_lines() {
    let mut slot = DirectorySlot::create(FileType::Prg,b"HELLO");
    slot.typ |= CLOSED_FLAG;
    slot.set_block_count(3);
    let line = file_line(&slot);
    assert_eq!(line.len(),LINE_LEN);
    assert_eq!(&line[0..4],&[1,1,3,0]);
    assert_eq!(&line[4..30],b"   \"HELLO\"            PRG ");
    slot.set_block_count(664);
    slot.typ = FileType::Seq as u8;
    let line = file_line(&slot);
    assert_eq!(line.len(),LINE_LEN);
    assert_eq!(&line[4..28],b" \"HELLO\"           *SEQ ");
}

#[test]
fn listing_text() {
    let mut prog: Vec<u8> = vec![1,4,1,1,0,0,REVERSE_ON,b'"'];
    prog.extend_from_slice(b"DISK\" ID 2A");
    prog.push(0);
    let mut slot = DirectorySlot::create(FileType::Prg,b"HELLO");
    slot.typ |= CLOSED_FLAG;
    slot.set_block_count(3);
    prog.append(&mut file_line(&slot));
    prog.extend_from_slice(&[1,1,0x98,2]);
    prog.extend_from_slice(b"BLOCKS FREE.");
    prog.extend_from_slice(&[0,0,0]);
    assert_eq!(to_text(&prog),"0 \"DISK\" ID 2A\n3   \"HELLO\"            PRG\n664 BLOCKS FREE.\n");
}
