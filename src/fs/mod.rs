//! # File System Module
//! 
//! File system modules handle interactions with directories and files.  The Commodore disk
//! operating system lives in the drive rather than the computer, so the file system is
//! represented by a virtual drive, `cbm::Drive`, that takes ownership of a disk image and
//! answers the same channel requests a real drive answers on the serial bus.
//! 
//! Transformation of a track and sector to a position in the image is handled within the `img` module.

pub mod cbm;

pub use cbm::{Drive,DriveOptions};
