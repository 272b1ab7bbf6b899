// packpress-core/tests/discovery_tests.rs

use packpress_core::discovery::find_archives;
use packpress_core::error::CoreError;
use std::fs::{self, File};
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_find_archives() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source_dir = dir.path();

    File::create(source_dir.join("set1.zip"))?;
    File::create(source_dir.join("set2.RAR"))?; // Test case insensitivity
    File::create(source_dir.join("set3.7z"))?;
    File::create(source_dir.join("notes.txt"))?;
    File::create(source_dir.join("image.jpg"))?;
    fs::create_dir(source_dir.join("subdir"))?;
    File::create(source_dir.join("subdir").join("nested.zip"))?; // Not found (non-recursive)

    let files = find_archives(source_dir)?;

    assert_eq!(files.len(), 3);
    assert_eq!(files[0].file_name().unwrap(), "set1.zip");
    assert_eq!(files[1].file_name().unwrap(), "set2.RAR"); // Original case preserved
    assert_eq!(files[2].file_name().unwrap(), "set3.7z");

    dir.close()?;
    Ok(())
}

#[test]
fn test_find_archives_empty_dir_is_ok() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    File::create(dir.path().join("readme.md"))?;

    let files = find_archives(dir.path())?;
    assert!(files.is_empty());

    dir.close()?;
    Ok(())
}

#[test]
fn test_find_archives_missing_dir_is_config_error() {
    let missing = PathBuf::from("surely_this_does_not_exist_42_integration");
    let result = find_archives(&missing);
    assert!(result.is_err());
    match result.err().unwrap() {
        CoreError::Config(_) => {} // Expected error type
        e => panic!("Unexpected error type: {:?}", e),
    }
}
