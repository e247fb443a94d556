//! # Filename parsing
//! 
//! The name given with OPEN has the form `[@][drive:]name[,type[,mode]]`.
//! Only the first letter of each option counts, so `NAME,SEQ,WRITE` is the same as `NAME,S,W`.

use super::types::*;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Access {
    Read,
    Write
}

/// Result of parsing an OPEN name
#[derive(Debug,Clone,PartialEq)]
pub struct ParsedName {
    /// at most 16 bytes, may contain wildcards
    pub name: Vec<u8>,
    /// type given in the options, if any
    pub typ: Option<FileType>,
    pub access: Access,
    /// name began with `@`
    pub replace: bool,
    /// record length given with `,L,` (REL files)
    pub record_len: Option<u8>
}

/// Parse the name given with OPEN on a data channel.
/// Secondary address 0 always reads, 1 always writes, others read unless `W` is given.
pub fn parse_name(raw: &[u8],secondary: usize) -> Result<ParsedName,DosError> {
    if raw.len() == 0 {
        return Err(DosError::NoFilename);
    }
    let replace = raw[0] == b'@';
    let body: &[u8] = match raw.iter().position(|c| *c == b':') {
        Some(colon) => &raw[colon+1..],
        None if raw[0] == b'$' => &[],
        None if replace => &raw[1..],
        None => raw
    };
    let mut fields = body.split(|c| *c == b',');
    let name = fields.next().unwrap_or_default();
    let mut ans = ParsedName {
        name: name[0..usize::min(name.len(),MAX_NAME_LEN)].to_vec(),
        typ: None,
        access: match secondary {
            1 => Access::Write,
            _ => Access::Read
        },
        replace,
        record_len: None
    };
    let mut expect_len = false;
    for opt in fields {
        let letter = match opt.first() {
            Some(c) => *c,
            None => return Err(DosError::Syntax)
        };
        if expect_len {
            expect_len = false;
            ans.record_len = Some(letter);
            continue;
        }
        match letter {
            b'R' => ans.access = Access::Read,
            b'W' => ans.access = Access::Write,
            b'A' => {
                if ans.typ != Some(FileType::Seq) {
                    return Err(DosError::Syntax);
                }
                ans.access = Access::Write;
            },
            b'L' => {
                ans.typ = Some(FileType::Rel);
                expect_len = true;
            },
            c => match FileType::from_letter(c) {
                Some(typ) => ans.typ = Some(typ),
                None => return Err(DosError::Syntax)
            }
        }
    }
    match secondary {
        0 => ans.access = Access::Read,
        1 => ans.access = Access::Write,
        _ => {}
    }
    Ok(ans)
}

impl ParsedName {
    /// Type to use when creating a file
    pub fn file_type(&self,secondary: usize) -> FileType {
        match (self.typ,secondary) {
            (Some(typ),_) => typ,
            (None,0) | (None,1) => FileType::Prg,
            _ => FileType::Seq
        }
    }
}

#[test]
fn options() {
    let p = parse_name(b"DATA,S,W",2).expect("parse failed");
    assert_eq!(p.name,b"DATA".to_vec());
    assert_eq!(p.typ,Some(FileType::Seq));
    assert_eq!(p.access,Access::Write);
    let p = parse_name(b"DATA,SEQ,WRITE",0).expect("parse failed");
    assert_eq!(p.access,Access::Read);
    let p = parse_name(b"@0:GAME",1).expect("parse failed");
    assert!(p.replace);
    assert_eq!(p.name,b"GAME".to_vec());
    assert_eq!(p.file_type(1),FileType::Prg);
    let p = parse_name(b"@GAME",1).expect("parse failed");
    assert_eq!(p.name,b"GAME".to_vec());
    let p = parse_name(b"DATA,L,\x20",2).expect("parse failed");
    assert_eq!(p.record_len,Some(0x20));
    assert_eq!(parse_name(b"$",0).expect("parse failed").name.len(),0);
    assert_eq!(parse_name(b"ABCDEFGHIJKLMNOPQRS",2).expect("parse failed").name.len(),16);
}

#[test]
fn bad_options() {
    assert_eq!(parse_name(b"DATA,",2),Err(DosError::Syntax));
    assert_eq!(parse_name(b"DATA,X",2),Err(DosError::Syntax));
    assert_eq!(parse_name(b"DATA,P,A",2),Err(DosError::Syntax));
    assert_eq!(parse_name(b"",2),Err(DosError::NoFilename));
}
