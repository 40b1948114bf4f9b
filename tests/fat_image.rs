//! End-to-end tests driving a fully synthetic in-memory FAT16 and FAT32
//! image through mount, enumerate, find, and (write feature) create —
//! mirroring spec §8's literal scenarios 1-6.

mod common;

use common::{fat16_image, fat32_image};
use fatdrive::error::Error;
use fatdrive::fat::dir::{Attribute, AttributeSet, DirEntries, DirEntry, Name83};
use fatdrive::fat::{Fat, Location};
use fatdrive::mbr::FatVariant;
use fatdrive::BlockDevice;

/// Scenario 1: mounting a FAT16 image yields the geometry the MBR + BPB
/// describe, including the root-data LBA invariant from spec §8.
#[test]
fn mounts_fat16_image_with_expected_geometry() {
    let image = fat16_image(63, 4, 243, 512, 2);
    let dev = image.build();
    let mut buf = Default::default();

    let fat = Fat::mount(dev, &mut buf, 0).unwrap();

    assert_eq!(fat.variant, FatVariant::Fat16);
    assert_eq!(fat.partition_lba, 63);
    assert_eq!(fat.reserved_sectors, 1);
    assert_eq!(fat.sectors_per_fat, 243);
    assert_eq!(fat.sectors_per_cluster, 4);
    assert_eq!(fat.root_dir_entries, 512);
    // spec §8 scenario 1's "root-data LBA" is the first data cluster's
    // sector (root_data_lba + root_entries_sectors), not the narrower
    // `Fat::root_data_lba` field (spec §3), which excludes the FAT16 root
    // directory region.
    assert_eq!(fat.first_sector_of(2), 582);
}

/// Scenario 2: finding a file in the FAT16 root directory skips a volume
/// label and a deleted slot before matching on the raw 11-byte name.
#[test]
fn finds_entry_in_fat16_root_skipping_deleted_entry() {
    let image = fat16_image(1, 1, 1, 16, 2);
    let mut dev = image.build();

    let mut vol_attrs = AttributeSet::empty();
    vol_attrs.set(Attribute::VolumeId);
    let vol_entry = DirEntry::new(Name83::from_parts("MYDISK", ""), vol_attrs, 0, 0);

    let deleted_name = Name83::from_raw(*b"\xE5TALE      ");
    let deleted_entry = DirEntry::new(deleted_name, AttributeSet::empty(), 0, 0);

    let readme_name = Name83::from_parts("README", "TXT");
    let readme_entry = DirEntry::new(readme_name, AttributeSet::empty(), 0x1234, 0x2000);

    let root_sector = image.root_data_lba();
    image.write_entry_raw(&mut dev, root_sector, 0, &vol_entry.to_raw());
    image.write_entry_raw(&mut dev, root_sector, 1, &deleted_entry.to_raw());
    image.write_entry_raw(&mut dev, root_sector, 2, &readme_entry.to_raw());

    let mut buf = Default::default();
    let mut fat = Fat::mount(dev, &mut buf, 0).unwrap();

    let mut root = fat.open_root_dir().unwrap();
    let found = fat.find_entry(&mut root, &readme_name).unwrap().unwrap();

    assert_eq!(found.cluster(), 0x1234);
    assert_eq!(found.file_size, 0x2000);
}

/// spec §4.5: `find_entry` names only deleted and long-filename slots as
/// skipped — a volume-label entry is an ordinary match candidate like any
/// other, not a third kind of exception.
#[test]
fn finds_volume_label_entry_by_name() {
    let image = fat16_image(1, 1, 1, 16, 2);
    let mut dev = image.build();

    let mut vol_attrs = AttributeSet::empty();
    vol_attrs.set(Attribute::VolumeId);
    let vol_name = Name83::from_parts("MYDISK", "");
    let vol_entry = DirEntry::new(vol_name, vol_attrs, 0, 0);

    let root_sector = image.root_data_lba();
    image.write_entry_raw(&mut dev, root_sector, 0, &vol_entry.to_raw());

    let mut buf = Default::default();
    let mut fat = Fat::mount(dev, &mut buf, 0).unwrap();

    let mut root = fat.open_root_dir().unwrap();
    let found = fat.find_entry(&mut root, &vol_name).unwrap().unwrap();
    assert!(found.attributes.is_volume_id());
}

/// Scenario 3: following a three-cluster FAT32 chain advances the cursor
/// cluster-by-cluster and terminates (no further I/O, `is_valid_cluster`
/// false) exactly one `read_next_sector` call past the end.
#[test]
fn follows_three_cluster_fat32_chain_to_termination() {
    let sectors_per_cluster = 2u8;
    let image = fat32_image(1, sectors_per_cluster, 1, 2, 8);
    let mut dev = image.build();

    image.set_fat_entry(&mut dev, 3, 4);
    image.set_fat_entry(&mut dev, 4, 5);
    image.set_fat_entry(&mut dev, 5, 0x0FFF_FFFF);

    let mut buf = Default::default();
    let mut fat = Fat::mount(dev, &mut buf, 0).unwrap();

    let mut loc = Location { cluster: 0, sector: 0, remaining: 0 };
    fat.seek(&mut loc, 3);
    fat.read_first_sector(&loc).unwrap();
    assert_eq!(loc.cluster, 3);

    for _ in 0..sectors_per_cluster {
        fat.read_next_sector(&mut loc).unwrap();
    }
    assert_eq!(loc.cluster, 4);

    for _ in 0..sectors_per_cluster {
        fat.read_next_sector(&mut loc).unwrap();
    }
    assert_eq!(loc.cluster, 5);

    for _ in 0..sectors_per_cluster {
        fat.read_next_sector(&mut loc).unwrap();
    }
    assert!(!fat.is_valid_cluster(loc.cluster));
}

/// Creates one directory entry through the public two-phase API:
/// `create_entry` locates (and, if needed, extends the directory to find)
/// a free slot, `init_entry` writes its name, and the attributes/cluster/
/// size fields are then poked directly into the shared sector buffer and
/// persisted — exactly the "callers populate them through subsequent
/// mutations before persisting" contract spec §4.5 describes for
/// `init_entry`.
fn write_entry(
    fat: &mut Fat<'_, common::MemoryBlockDevice>,
    dir: &mut DirEntries,
    name: Name83,
    attributes: AttributeSet,
    cluster: u32,
    file_size: u32,
) {
    fat.create_entry(dir).unwrap();
    fat.init_entry(dir, &name).unwrap();

    let entry = DirEntry::new(name, attributes, cluster, file_size);
    let offset = dir.entry_offset();
    fat.buffer[offset..offset + 32].copy_from_slice(&entry.to_raw());
    fat.device.write_sector(dir.current_sector(), fat.buffer).unwrap();
}

/// Fills every one of a single-sector-per-cluster directory's 16 slots
/// with a distinctly-named file entry.
fn fill_directory(fat: &mut Fat<'_, common::MemoryBlockDevice>, dir: &mut DirEntries) {
    for i in 0..16u8 {
        let name = Name83::from_parts(&format!("FILE{:04}", i), "TXT");
        write_entry(fat, dir, name, AttributeSet::empty(), 0, 0);
    }
}

/// spec §4.5: `init_entry` zero-fills the whole 32-byte slot and writes
/// only the name field — attributes, timestamps, size, and start cluster
/// are left at zero for the caller to populate afterward, not carried over
/// from whatever the slot previously held.
#[test]
fn init_entry_zero_fills_slot_and_writes_only_the_name() {
    let image = fat16_image(1, 1, 1, 16, 2);
    let mut dev = image.build();

    // A deleted slot (spec §4.5: name[0] == 0xE5) still carrying its old
    // attributes/cluster/size, exactly the kind of leftover `create_entry`
    // is allowed to reuse.
    let mut stale = DirEntry::new(Name83::from_parts("STALE", "OLD"), AttributeSet::empty(), 0xBEEF, 0xCAFE);
    stale.name = Name83::from_raw({
        let mut raw = *stale.name.as_bytes();
        raw[0] = 0xE5;
        raw
    });
    let root_sector = image.root_data_lba();
    image.write_entry_raw(&mut dev, root_sector, 0, &stale.to_raw());

    let mut buf = Default::default();
    let mut fat = Fat::mount(dev, &mut buf, 0).unwrap();

    let mut root = fat.open_root_dir().unwrap();
    fat.create_entry(&mut root).unwrap();

    let new_name = Name83::from_parts("FRESH", "TXT");
    fat.init_entry(&mut root, &new_name).unwrap();

    let mut root = fat.open_root_dir().unwrap();
    let entry = fat.next_entry(&mut root).unwrap().unwrap();

    assert_eq!(entry.name.as_bytes(), new_name.as_bytes());
    assert_eq!(entry.cluster(), 0);
    assert_eq!(entry.file_size, 0);
    assert_eq!(entry.attributes, AttributeSet::empty());
}

/// Scenario 4: creating an entry in a full subdirectory allocates and
/// links a fresh cluster, zero-fills it, and writes the new entry into its
/// first slot.
#[test]
fn create_entry_extends_full_directory_with_new_cluster() {
    let image = fat16_image(1, 1, 1, 16, 10);
    let dev = image.build();
    let mut buf = Default::default();
    let mut fat = Fat::mount(dev, &mut buf, 0).unwrap();

    // Cluster 5 holds the (already full) subdirectory under test.
    fat.link_clusters(0, 5).unwrap();

    let mut dir = fat.open_dir(5).unwrap();
    fill_directory(&mut fat, &mut dir);

    let overflow_name = Name83::from_parts("OVERFLOW", "TXT");
    write_entry(&mut fat, &mut dir, overflow_name, AttributeSet::empty(), 0x0042, 10);

    // The directory's chain grew off of cluster 5.
    let extension = fat.next_cluster(5).unwrap();
    assert_ne!(extension, fat.eoc());
    assert_eq!(fat.next_cluster(extension).unwrap(), fat.eoc());

    // Re-walking the (now two-cluster) directory finds all 17 entries,
    // with the 17th being the one that triggered the extension.
    let mut dir = fat.open_dir(5).unwrap();
    let mut last = None;
    let mut count = 0;
    while let Some(entry) = fat.next_entry(&mut dir).unwrap() {
        count += 1;
        last = Some(entry);
    }
    assert_eq!(count, 17);
    assert_eq!(last.unwrap().cluster(), 0x0042);
}

/// Scenario 5: with every FAT entry taken, `create_entry` on a full
/// directory fails with `DiskFull` and the directory is left untouched.
#[test]
fn create_entry_reports_disk_full() {
    let image = fat16_image(1, 1, 1, 16, 10);
    let dev = image.build();
    let mut buf = Default::default();
    let mut fat = Fat::mount(dev, &mut buf, 0).unwrap();

    fat.link_clusters(0, 5).unwrap();
    let mut dir = fat.open_dir(5).unwrap();
    fill_directory(&mut fat, &mut dir);

    // Saturate every other cluster slot so no extension is possible.
    let total = image.entries_per_fat_sector() * image.sectors_per_fat;
    for c in 2..total {
        if fat.next_cluster(c).unwrap() == 0 {
            fat.link_clusters(0, c).unwrap();
        }
    }

    let err = fat.create_entry(&mut dir).unwrap_err();
    assert_eq!(err, Error::DiskFull);
}

/// Scenario 6: an unrecognised MBR partition-type byte fails the mount
/// after exactly one sector read (the BPB sector is never touched — the
/// synthetic image is only one sector long, so a second read would surface
/// as a transport error instead of `UnsupportedPartitionType`).
#[test]
fn mount_rejects_unsupported_partition_type_after_one_read() {
    // Only the MBR sector exists — a second read (the BPB) would surface as
    // an out-of-range transport error, not `UnsupportedPartitionType`.
    let mut dev = common::MemoryBlockDevice::new(1);
    {
        let mbr = dev.sector_mut(0);
        mbr[446] = 0x80;
        mbr[446 + 4] = 0x07; // NTFS: not a FAT16 or FAT32 type code
        mbr[446 + 8..446 + 12].copy_from_slice(&1u32.to_le_bytes());
        mbr[510] = 0x55;
        mbr[511] = 0xAA;
    }

    let mut buf = Default::default();
    let err = Fat::mount(dev, &mut buf, 0).unwrap_err();
    assert_eq!(err, Error::UnsupportedPartitionType(0x07));
}
