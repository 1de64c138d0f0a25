//! End-to-end scenarios: a host directory seen and edited through raw sectors.

use dirdisk_core::fat12::{decode12, encode12};
use dirdisk_core::{
    CacheSnapshot, CollectedWarnings, DirAsDisk, DirEntry, DiskConfig, DiskError, HostFs,
    MemoryHostFs, SyncMode, Usage,
};

type TestDisk = DirAsDisk<MemoryHostFs, CollectedWarnings>;

const DIR_SECTOR: u32 = 7;
const FIRST_DATA: u32 = 14;

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 ^ seed).collect()
}

fn disk_with(files: &[(&str, Vec<u8>)], mode: SyncMode) -> TestDisk {
    let host = MemoryHostFs::with_files(files.iter().map(|(n, d)| (*n, d.clone())));
    let config = DiskConfig::default().with_sync_mode(mode);
    DirAsDisk::new(host, CollectedWarnings::new(), config)
}

fn read_entry(disk: &mut TestDisk, slot: usize) -> DirEntry {
    let sector = disk.read_sector(DIR_SECTOR + (slot / 16) as u32);
    DirEntry::from_bytes(&sector[(slot % 16) * 32..])
}

fn write_entry(disk: &mut TestDisk, slot: usize, entry: &DirEntry) {
    let number = DIR_SECTOR + (slot / 16) as u32;
    let mut sector = disk.read_sector(number);
    sector[(slot % 16) * 32..(slot % 16 + 1) * 32].copy_from_slice(entry.as_bytes());
    disk.write_sector(number, &sector);
}

/// Rewrite FAT entries through the first FAT copy, as MSX-DOS would.
fn write_fat(disk: &mut TestDisk, updates: &[(u16, u16)]) {
    let mut fat = Vec::new();
    for sector in 1..=3 {
        fat.extend_from_slice(&disk.read_sector(sector));
    }
    for &(cluster, value) in updates {
        encode12(&mut fat, cluster as usize, value);
    }
    for (i, chunk) in fat.chunks(512).enumerate() {
        let mut sector = [0u8; 512];
        sector.copy_from_slice(chunk);
        disk.write_sector(1 + i as u32, &sector);
    }
}

fn sector_of(data: &[u8]) -> [u8; 512] {
    let mut sector = [0u8; 512];
    sector[..data.len()].copy_from_slice(data);
    sector
}

fn msx_name(name: &str, ext: &str) -> DirEntry {
    let mut raw = [0u8; 32];
    raw[..11].fill(b' ');
    raw[..name.len()].copy_from_slice(name.as_bytes());
    raw[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
    raw[11] = 0x20;
    DirEntry::from_bytes(&raw)
}

#[test]
fn test_game_rom_is_mapped() {
    let rom = pattern(10240, 0);
    let mut disk = disk_with(&[("GAME.ROM", rom.clone())], SyncMode::CachedWrite);

    let slot = disk.entry(0);
    assert!(slot.in_use());
    assert_eq!(slot.short_name, "GAME.ROM");
    assert_eq!(slot.host_name, "GAME.ROM");
    assert_eq!(disk.chain(0).len(), 10);

    let entry = read_entry(&mut disk, 0);
    assert_eq!(entry.raw_name_ext(), b"GAME    ROM");
    assert_eq!(entry.size(), 10240);
    assert_eq!(entry.start_cluster(), 2);

    let fat = disk.read_sector(1);
    assert_eq!(&fat[..3], &[0xF9, 0xFF, 0xFF]);
    assert_eq!(decode12(&fat, 2), 3);
    assert_eq!(decode12(&fat, 11), 0xFFF);
    assert_eq!(decode12(&fat, 12), 0);

    assert_eq!(&disk.read_sector(FIRST_DATA)[..], &rom[..512]);
    assert_eq!(&disk.read_sector(FIRST_DATA + 19)[..], &rom[9728..]);
    assert!(disk.diagnostics().is_empty());
}

#[test]
fn test_case_collision_gets_suffix() {
    let mut disk = disk_with(
        &[("REPORT.TXT", b"upper".to_vec()), ("report.txt", b"lower".to_vec())],
        SyncMode::CachedWrite,
    );

    assert_eq!(disk.entry(0).host_name, "REPORT.TXT");
    assert_eq!(disk.entry(0).short_name, "REPORT.TXT");
    assert_eq!(disk.entry(1).host_name, "report.txt");
    assert_eq!(disk.entry(1).short_name, "REPORT~1.TXT");
    assert!(disk.entry(0).in_use() && disk.entry(1).in_use());
    assert_eq!(read_entry(&mut disk, 1).raw_name_ext(), b"REPORT~1TXT");
}

#[test]
fn test_fat_shortening_truncates_host_file() {
    let mut disk = disk_with(&[("BIG.DAT", pattern(10240, 1))], SyncMode::CachedWrite);

    let mut updates = vec![(5, 0xFFF)];
    updates.extend((6..=11).map(|c| (c, 0)));
    write_fat(&mut disk, &updates);

    let host = disk.host().file("BIG.DAT").unwrap();
    assert_eq!(host.len(), 4096);
    assert_eq!(host, &pattern(10240, 1)[..4096]);
    assert_eq!(disk.entry(0).known_size, 4096);
    assert!(disk.reverse_sector(FIRST_DATA + 8).unwrap().owner.is_none());
    assert_eq!(disk.fat_mirror(), disk.fat());
}

#[test]
fn test_fat_break_mid_chain_truncates() {
    let mut disk = disk_with(&[("BIG.DAT", pattern(10240, 1))], SyncMode::CachedWrite);

    write_fat(&mut disk, &[(5, 0)]);

    assert_eq!(disk.host().file("BIG.DAT").unwrap().len(), 3072);
    assert_eq!(disk.chain(0), vec![2, 3, 4]);
}

#[test]
fn test_full_delete_removes_host_file() {
    let mut disk = disk_with(&[("A.TXT", b"hello".to_vec())], SyncMode::Full);

    let mut entry = read_entry(&mut disk, 0);
    entry.erase();
    write_entry(&mut disk, 0, &entry);

    assert!(!disk.entry(0).in_use());
    assert!(!disk.host().exists("A.TXT"));
    assert_eq!(read_entry(&mut disk, 0).first_byte(), 0xE5);
}

#[test]
fn test_no_delete_keeps_host_file() {
    let mut disk = disk_with(&[("A.TXT", b"hello".to_vec())], SyncMode::NoDelete);

    let mut entry = read_entry(&mut disk, 0);
    entry.erase();
    write_entry(&mut disk, 0, &entry);

    assert!(!disk.entry(0).in_use());
    assert_eq!(disk.host().file("A.TXT"), Some(&b"hello"[..]));

    // Not re-added while unchanged
    assert!(disk.rescan().is_empty());
    assert!(disk.slot_of_host_name("A.TXT").is_none());

    // Comes back once it changes on the host
    disk.host_mut().add_file("A.TXT", b"hello again".to_vec());
    let report = disk.rescan();
    assert_eq!(report.added, vec!["A.TXT".to_string()]);
}

#[test]
fn test_delete_rolls_back_on_host_failure() {
    let mut disk = disk_with(&[("A.TXT", b"hello".to_vec())], SyncMode::CachedWrite);
    disk.host_mut().set_read_only(true);

    let original = read_entry(&mut disk, 0);
    let mut entry = original;
    entry.erase();
    write_entry(&mut disk, 0, &entry);

    assert!(disk.entry(0).in_use());
    assert_eq!(read_entry(&mut disk, 0), original);
    assert!(disk.diagnostics().contains("remove"));
}

#[test]
fn test_readonly_never_touches_host() {
    let data = pattern(3000, 2);
    let mut disk = disk_with(&[("KEEP.BIN", data.clone())], SyncMode::ReadOnly);
    assert!(disk.is_write_protected());

    disk.write_sector(FIRST_DATA, &[0xAA; 512]);
    let mut entry = read_entry(&mut disk, 0);
    entry.erase();
    write_entry(&mut disk, 0, &entry);
    write_fat(&mut disk, &[(2, 0)]);

    assert_eq!(disk.host().file("KEEP.BIN"), Some(&data[..]));
    assert!(disk.entry(0).in_use());
    assert_eq!(&disk.read_sector(FIRST_DATA)[..], &data[..512]);
    assert_eq!(disk.fat().get(2), 3);
}

#[test]
fn test_readonly_still_sees_host_changes() {
    let mut disk = disk_with(&[], SyncMode::ReadOnly);
    disk.host_mut().add_file("NEW.TXT", b"x".to_vec());
    let report = disk.rescan();
    assert_eq!(report.added, vec!["NEW.TXT".to_string()]);
}

#[test]
fn test_directory_full() {
    let files: Vec<(String, Vec<u8>)> = (0..112)
        .map(|i| (format!("F{:03}.TXT", i), vec![b'x']))
        .collect();
    let host = MemoryHostFs::with_files(files);
    let mut disk = DirAsDisk::new(host, CollectedWarnings::new(), DiskConfig::default());
    assert!(disk.entries().iter().all(|e| e.in_use()));
    assert!(disk.diagnostics().is_empty());

    disk.host_mut().add_file("ZZZ.TXT", b"late".to_vec());
    let report = disk.rescan();
    assert!(report.added.is_empty());
    assert!(disk.slot_of_host_name("ZZZ.TXT").is_none());
    assert!(disk.diagnostics().contains("directory full"));

    // Reported once, not on every scan
    disk.rescan();
    assert_eq!(disk.diagnostics().messages().len(), 1);
}

#[test]
fn test_disk_full() {
    let mut disk = disk_with(&[("HUGE.BIN", vec![0; 800_000])], SyncMode::CachedWrite);
    assert!(disk.slot_of_host_name("HUGE.BIN").is_none());
    assert!(disk.diagnostics().contains("disk full"));
    assert_eq!(disk.free_clusters(), 713);

    disk.host_mut().add_file("SMALL.BIN", vec![1; 10]);
    disk.rescan();
    assert!(disk.slot_of_host_name("SMALL.BIN").is_some());
}

#[test]
fn test_rescan_is_idempotent() {
    let mut disk = disk_with(
        &[
            ("A.TXT", pattern(700, 3)),
            ("B.BIN", pattern(5000, 4)),
            ("c.txt", Vec::new()),
        ],
        SyncMode::CachedWrite,
    );
    let before = disk.snapshot();
    assert!(disk.rescan().is_empty());
    assert_eq!(disk.snapshot(), before);
}

#[test]
fn test_sector_round_trips() {
    let mut disk = disk_with(&[("A.BIN", pattern(2048, 5))], SyncMode::CachedWrite);

    // Unowned data sector
    let free = sector_of(&pattern(512, 6));
    disk.write_sector(1439, &free);
    assert_eq!(disk.read_sector(1439), free);
    assert_eq!(disk.reverse_sector(1439).unwrap().usage, Usage::Cached);

    // Owned sector fully inside the file goes straight to the host
    let data = sector_of(&pattern(512, 7));
    disk.write_sector(FIRST_DATA + 1, &data);
    assert_eq!(disk.read_sector(FIRST_DATA + 1), data);
    assert_eq!(disk.reverse_sector(FIRST_DATA + 1).unwrap().usage, Usage::Clean);
    assert_eq!(&disk.host().file("A.BIN").unwrap()[512..1024], &data[..]);

    // Volume label in a free slot is kept as an opaque image
    let mut label = msx_name("MYDISK", "");
    label.set_attrib(0x08);
    write_entry(&mut disk, 5, &label);
    assert_eq!(read_entry(&mut disk, 5), label);
    assert!(!disk.entry(5).in_use());
    assert_eq!(disk.host().names(), vec!["A.BIN".to_string()]);
}

#[test]
fn test_write_past_end_of_file_stays_cached() {
    let mut disk = disk_with(&[("M.TXT", vec![b'a'; 100])], SyncMode::CachedWrite);

    let data = sector_of(&pattern(512, 8));
    disk.write_sector(FIRST_DATA, &data);

    assert_eq!(disk.read_sector(FIRST_DATA), data);
    assert_eq!(
        disk.reverse_sector(FIRST_DATA).unwrap().usage,
        Usage::Mixed { host_len: 100 }
    );
    assert_eq!(disk.host().file("M.TXT").unwrap(), &data[..100]);
}

#[test]
fn test_msx_creates_file() {
    let mut disk = disk_with(&[], SyncMode::CachedWrite);
    let content = pattern(1500, 9);

    let mut entry = msx_name("NEW", "TXT");
    entry.set_start_cluster(2);
    entry.set_size(1500);
    write_entry(&mut disk, 0, &entry);
    assert_eq!(disk.host().file("NEW.TXT"), Some(&b""[..]));
    assert!(disk.entry(0).in_use());

    for (i, chunk) in content.chunks(512).enumerate() {
        disk.write_sector(FIRST_DATA + i as u32, &sector_of(chunk));
    }
    assert_eq!(disk.host().file("NEW.TXT").unwrap().len(), 0);

    write_fat(&mut disk, &[(2, 3), (3, 0xFFF)]);

    assert_eq!(disk.host().file("NEW.TXT"), Some(&content[..]));
    assert_eq!(disk.entry(0).known_size, 1500);
    assert_eq!(disk.cached_sector_count(), 0);
    assert_eq!(&disk.read_sector(FIRST_DATA + 2)[..476], &content[1024..]);
    assert!(disk.diagnostics().is_empty());
}

#[test]
fn test_cached_write_growth_waits_for_data() {
    let mut disk = disk_with(&[("G.BIN", pattern(1024, 10))], SyncMode::CachedWrite);

    write_fat(&mut disk, &[(2, 3), (3, 0xFFF)]);
    let mut entry = read_entry(&mut disk, 0);
    entry.set_size(2048);
    write_entry(&mut disk, 0, &entry);

    // Provisional extension reads as zeros and is not on the host yet
    assert_eq!(disk.host().file("G.BIN").unwrap().len(), 1024);
    assert_eq!(disk.read_sector(FIRST_DATA + 2), [0u8; 512]);

    let a = sector_of(&pattern(512, 11));
    let b = sector_of(&pattern(512, 12));
    disk.write_sector(FIRST_DATA + 2, &a);
    assert_eq!(disk.host().file("G.BIN").unwrap().len(), 1024);
    disk.write_sector(FIRST_DATA + 3, &b);

    let host = disk.host().file("G.BIN").unwrap();
    assert_eq!(host.len(), 2048);
    assert_eq!(&host[1024..1536], &a[..]);
    assert_eq!(&host[1536..], &b[..]);
    assert_eq!(disk.cached_sector_count(), 0);
}

#[test]
fn test_full_growth_commits_immediately() {
    let mut disk = disk_with(&[("G.BIN", pattern(1024, 10))], SyncMode::Full);

    write_fat(&mut disk, &[(2, 3), (3, 0xFFF)]);
    let mut entry = read_entry(&mut disk, 0);
    entry.set_size(2048);
    write_entry(&mut disk, 0, &entry);
    assert_eq!(disk.host().file("G.BIN").unwrap().len(), 2048);

    let a = sector_of(&pattern(512, 11));
    disk.write_sector(FIRST_DATA + 2, &a);
    assert_eq!(&disk.host().file("G.BIN").unwrap()[1024..1536], &a[..]);
    assert_eq!(disk.cached_sector_count(), 0);
}

#[test]
fn test_size_field_truncates_host_file() {
    let mut disk = disk_with(&[("T.TXT", pattern(3000, 13))], SyncMode::CachedWrite);

    let mut entry = read_entry(&mut disk, 0);
    entry.set_size(100);
    write_entry(&mut disk, 0, &entry);

    assert_eq!(disk.host().file("T.TXT"), Some(&pattern(3000, 13)[..100]));
    assert_eq!(disk.entry(0).known_size, 100);
}

#[test]
fn test_rename() {
    let mut disk = disk_with(&[("OLD.TXT", b"data".to_vec())], SyncMode::CachedWrite);

    let mut entry = msx_name("NEW", "TXT");
    let old = read_entry(&mut disk, 0);
    entry.set_start_cluster(old.start_cluster());
    entry.set_size(old.size());
    write_entry(&mut disk, 0, &entry);

    assert_eq!(disk.host().names(), vec!["NEW.TXT".to_string()]);
    assert_eq!(disk.entry(0).host_name, "NEW.TXT");
    assert_eq!(read_entry(&mut disk, 0).raw_name_ext(), b"NEW     TXT");
    assert!(disk.rescan().is_empty());
}

#[test]
fn test_rename_rolls_back() {
    let mut disk = disk_with(
        &[("A.TXT", b"a".to_vec()), ("B.TXT", b"b".to_vec())],
        SyncMode::CachedWrite,
    );
    let original = read_entry(&mut disk, 0);

    // Onto an existing host name
    let mut entry = original;
    entry.set_short_name(&dirdisk_core::to_8_3("B.TXT"));
    write_entry(&mut disk, 0, &entry);
    assert_eq!(read_entry(&mut disk, 0), original);
    assert_eq!(disk.host().file("A.TXT"), Some(&b"a"[..]));
    assert!(disk.diagnostics().contains("rename"));

    // Host refuses
    disk.diagnostics_mut().clear();
    disk.host_mut().set_read_only(true);
    entry.set_short_name(&dirdisk_core::to_8_3("C.TXT"));
    write_entry(&mut disk, 0, &entry);
    assert_eq!(read_entry(&mut disk, 0), original);
    assert_eq!(disk.entry(0).host_name, "A.TXT");
    assert!(disk.diagnostics().contains("rename"));
}

#[test]
fn test_host_changes_picked_up() {
    let mut disk = disk_with(&[("H.BIN", pattern(1000, 14))], SyncMode::CachedWrite);
    assert_eq!(disk.chain(0).len(), 1);

    disk.host_mut().add_file("H.BIN", pattern(5000, 15));
    let report = disk.rescan();
    assert_eq!(report.updated, vec!["H.BIN".to_string()]);
    assert_eq!(disk.chain(0).len(), 5);
    assert_eq!(read_entry(&mut disk, 0).size(), 5000);
    assert_eq!(&disk.read_sector(FIRST_DATA + 9)[..392], &pattern(5000, 15)[4608..]);

    disk.host_mut().add_file("H.BIN", vec![7; 10]);
    disk.rescan();
    assert_eq!(disk.chain(0).len(), 1);
    assert_eq!(disk.free_clusters(), 712);

    disk.host_mut().remove_file("H.BIN");
    let report = disk.rescan();
    assert_eq!(report.removed, vec!["H.BIN".to_string()]);
    assert!(!disk.entry(0).in_use());
    assert_eq!(read_entry(&mut disk, 0).first_byte(), 0xE5);
    assert_eq!(disk.free_clusters(), 713);
}

#[test]
fn test_boot_read_rescans() {
    let mut disk = disk_with(&[], SyncMode::CachedWrite);
    disk.host_mut().add_file("LATE.TXT", b"late".to_vec());
    let boot = disk.read_sector(0);
    assert_eq!(&boot[510..], &[0x55, 0xAA]);
    assert!(disk.slot_of_host_name("LATE.TXT").is_some());

    let config = DiskConfig {
        rescan_on_boot_read: false,
        ..DiskConfig::default()
    };
    let mut disk = DirAsDisk::new(MemoryHostFs::new(), CollectedWarnings::new(), config);
    disk.host_mut().add_file("LATE.TXT", b"late".to_vec());
    disk.read_sector(0);
    assert!(disk.slot_of_host_name("LATE.TXT").is_none());
}

#[test]
fn test_second_fat_copy_mirrors() {
    let mut disk = disk_with(&[], SyncMode::CachedWrite);

    let mut sector = disk.read_sector(4);
    encode12(&mut sector, 20, 0xFFF);
    disk.write_sector(4, &sector);

    assert_eq!(disk.fat().get(20), 0xFFF);
    assert_eq!(disk.fat_mirror().get(20), 0xFFF);
    assert_eq!(disk.read_sector(1), sector);
}

#[test]
fn test_snapshot_round_trip() {
    let mut disk = disk_with(&[("A.TXT", pattern(600, 16))], SyncMode::CachedWrite);
    let orphan = sector_of(&pattern(512, 17));
    disk.write_sector(1000, &orphan);

    let snapshot = disk.snapshot();
    let json = snapshot.to_json().unwrap();
    assert_eq!(CacheSnapshot::from_json(&json).unwrap(), snapshot);

    let host = disk.host().clone();
    let mut restored = DirAsDisk::new(host, CollectedWarnings::new(), DiskConfig::default());
    restored.restore(&snapshot).unwrap();
    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.read_sector(1000), orphan);
}

#[test]
fn test_restore_rejects_bad_snapshot() {
    let mut disk = disk_with(&[("A.TXT", b"a".to_vec())], SyncMode::CachedWrite);
    let before = disk.snapshot();

    let mut bad = before.clone();
    bad.entries.pop();
    assert!(matches!(
        disk.restore(&bad),
        Err(DiskError::InvalidSnapshot(_))
    ));

    let mut bad = before.clone();
    bad.cache.insert(3, vec![0; 512]);
    assert!(disk.restore(&bad).is_err());

    assert_eq!(disk.snapshot(), before);
}

#[test]
fn test_format_under_no_delete_keeps_host_content() {
    let content = pattern(3000, 7);
    let mut disk = disk_with(&[("A.TXT", content.clone())], SyncMode::NoDelete);

    // Blank FAT in both copies, then a blank directory
    let mut first = [0u8; 512];
    first[..3].copy_from_slice(&[0xF9, 0xFF, 0xFF]);
    for sector in 1..=6 {
        let data = if sector == 1 || sector == 4 { first } else { [0u8; 512] };
        disk.write_sector(sector, &data);
    }
    assert_eq!(disk.host().file("A.TXT"), Some(&content[..]));

    for sector in DIR_SECTOR..FIRST_DATA {
        disk.write_sector(sector, &[0u8; 512]);
    }
    assert!(!disk.entry(0).in_use());
    assert_eq!(disk.host().file("A.TXT"), Some(&content[..]));

    disk.rescan();
    assert!(disk.slot_of_host_name("A.TXT").is_none());
    assert_eq!(disk.free_clusters(), 713);
}

#[test]
fn test_failed_size_edit_rolls_back() {
    let mut disk = disk_with(&[("T.TXT", pattern(3000, 2))], SyncMode::CachedWrite);
    disk.host_mut().set_read_only(true);

    let mut entry = read_entry(&mut disk, 0);
    entry.set_size(100);
    write_entry(&mut disk, 0, &entry);

    assert!(disk.diagnostics().contains("truncate"));
    assert_eq!(read_entry(&mut disk, 0).size(), 3000);
    assert_eq!(disk.entry(0).known_size, 3000);
    assert_eq!(disk.host().file("T.TXT").map(|f| f.len()), Some(3000));
    assert_eq!(&disk.read_sector(FIRST_DATA + 5)[..440], &pattern(3000, 2)[2560..]);

    // Once the host accepts writes the same edit goes through
    disk.host_mut().set_read_only(false);
    write_entry(&mut disk, 0, &entry);
    assert_eq!(disk.host().file("T.TXT"), Some(&pattern(3000, 2)[..100]));
    assert_eq!(disk.entry(0).known_size, 100);
}

#[test]
fn test_failed_fat_shrink_restores_chain() {
    let content = pattern(10240, 3);
    let mut disk = disk_with(&[("B.DAT", content.clone())], SyncMode::CachedWrite);
    disk.host_mut().set_read_only(true);

    let mut updates = vec![(5, 0xFFF)];
    updates.extend((6..=11).map(|c| (c, 0)));
    write_fat(&mut disk, &updates);

    assert!(disk.diagnostics().contains("truncate"));
    assert_eq!(disk.chain(0), (2..=11).collect::<Vec<u16>>());
    assert_eq!(decode12(&disk.read_sector(1), 5), 6);
    assert_eq!(disk.fat(), disk.fat_mirror());
    assert_eq!(disk.entry(0).known_size, 10240);
    assert_eq!(disk.host().file("B.DAT").map(|f| f.len()), Some(10240));
    assert_eq!(&disk.read_sector(FIRST_DATA + 19)[..], &content[9728..]);
}
