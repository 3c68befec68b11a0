//! Config file driven saves and loads

use crate::common::*;
use std::fs;

#[test]
fn test_config_file_selects_codec() {
    let scratch = Scratch::new();
    let config_path = scratch.dir.path().join(CONFIG_FILE_NAME);
    fs::write(&config_path, "compression = \"zstd\"\ncompression_level = 3\njson_indent = 0\n").unwrap();
    let config = FormatConfig::from_file(&config_path).unwrap();
    assert_eq!(config.compression().unwrap(), Compression::Zstd);

    let path = scratch.file("configured", "json");
    save_with(&volume_segmentation(), &path, &config).unwrap();
    assert!(!fs::read_to_string(&path).unwrap().contains('\n'));
    assert!(load_with(&path, &config).unwrap().approx_eq(&volume_segmentation()));
}

#[test]
fn test_default_config_written_once() {
    let scratch = Scratch::new();
    let config_path = scratch.dir.path().join(CONFIG_FILE_NAME);
    FormatConfig::write_default_if_missing(&config_path).unwrap();
    assert_eq!(FormatConfig::from_file(&config_path).unwrap(), FormatConfig::default());

    let custom = FormatConfig::default().with_compression_level(9);
    custom.write_to_file(&config_path).unwrap();
    FormatConfig::write_default_if_missing(&config_path).unwrap();
    assert_eq!(FormatConfig::from_file(&config_path).unwrap(), custom);
}

#[test]
fn test_invalid_compression_rejected_before_writing() {
    let scratch = Scratch::new();
    let config = FormatConfig {
        compression: "lz4".to_string(),
        ..FormatConfig::default()
    };
    let err = save_with(&volume_segmentation(), &scratch.file("seg", "hff"), &config).unwrap_err();
    assert!(matches!(err, SffError::Config(_)), "{err}");
    assert!(scratch.entries().is_empty());
}
