//! Mounts a FAT16 or FAT32 disk image and lists the root directory.
//!
//! ```text
//! cargo run --example mount --features std -- disk.img
//! ```

use fatdrive::transport::{BlockDevice, SectorBuffer};
use fatdrive::Fat;

use std::env;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

struct FileDevice(File);

impl BlockDevice for FileDevice {
    type Error = io::Error;

    fn read_sector(&mut self, lba: u32, buffer: &mut SectorBuffer) -> Result<(), Self::Error> {
        self.0.seek(SeekFrom::Start(lba as u64 * 512))?;
        self.0.read_exact(buffer)
    }

    fn write_sector(&mut self, lba: u32, buffer: &SectorBuffer) -> Result<(), Self::Error> {
        self.0.seek(SeekFrom::Start(lba as u64 * 512))?;
        self.0.write_all(buffer)
    }
}

fn main() {
    let path = env::args().nth(1).expect("usage: mount <disk-image>");
    let file = File::open(&path).expect("failed to open disk image");
    let device = FileDevice(file);

    let mut buffer = SectorBuffer::default();
    let mut fat = Fat::mount(device, &mut buffer, 0).expect("failed to mount partition 0");

    println!("mounted {:?} volume, {} sectors/cluster", fat.variant, fat.sectors_per_cluster);

    let mut root = fat.open_root_dir().expect("failed to open root directory");
    while let Some(entry) = fat.next_entry(&mut root).expect("directory read failed") {
        let kind = if entry.attributes.is_dir() { "<DIR>" } else { "" };
        println!("{:?}\t{}\t{}", entry.name, entry.file_size, kind);
    }
}
