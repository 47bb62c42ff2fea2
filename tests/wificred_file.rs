use std::fs;
use std::path::PathBuf;

use picowifi::{encode, write_uf2, PicoWifiError, WifiCredentials};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("picowifi-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn written_file_reads_back() {
    let dir = scratch_dir("roundtrip");
    let path = dir.join("wificred.uf2");

    let block = encode("Office WiFi", "correct horse").unwrap();
    write_uf2(&path, &block).unwrap();

    let data = fs::read(&path).unwrap();
    assert_eq!(data.len(), 512);
    assert_eq!(data, block);
    assert!(!dir.join("wificred.uf2.tmp").exists());

    let creds = WifiCredentials::from_uf2(&data).unwrap();
    assert_eq!(creds.ssid(), "Office WiFi");
    assert_eq!(creds.password(), "correct horse");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn rewrite_replaces_old_file() {
    let dir = scratch_dir("rewrite");
    let path = dir.join("wificred.uf2");

    write_uf2(&path, &encode("first", "one").unwrap()).unwrap();
    write_uf2(&path, &encode("second", "two").unwrap()).unwrap();

    let creds = WifiCredentials::from_uf2(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(creds.ssid(), "second");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_write_reports_path() {
    let dir = scratch_dir("missing");
    let path = dir.join("no-such-dir").join("wificred.uf2");

    match write_uf2(&path, &encode("a", "b").unwrap()) {
        Err(PicoWifiError::FileWriteError { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!path.exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_rename_leaves_target_alone() {
    let dir = scratch_dir("occupied");
    // a directory where the file should go cannot be replaced by rename
    let path = dir.join("wificred.uf2");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), b"x").unwrap();

    assert!(matches!(
        write_uf2(&path, &encode("a", "b").unwrap()),
        Err(PicoWifiError::FileWriteError { .. })
    ));
    assert!(path.join("keep").exists());
    assert!(!dir.join("wificred.uf2.tmp").exists());

    fs::remove_dir_all(&dir).unwrap();
}
