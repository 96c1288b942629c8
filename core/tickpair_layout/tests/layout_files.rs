use std::io::Write;
use tempfile::NamedTempFile;
use tickpair_layout::config::{read_layout, read_params};
use tickpair_layout::{PlatformParams, Region, LOG_BUFFER_SIZE};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn layout_from_file() {
    let file = write_config(
        r#"
        // spike-like board with the log buffer enabled
        (
            user_top: 0x80000000,
            paddr_base: 0x80000000,
            kernel_log_buffer: true,
        )
        "#,
    );
    let layout = read_layout(file.path()).expect("layout");
    assert_eq!(layout.pptr_top, 0xFF40_0000);
    assert_eq!(layout.log_buffer.map(|b| b.size), Some(LOG_BUFFER_SIZE));
    assert_eq!(layout.region_of(0xFF40_0000), Region::LogBuffer);
}

#[test]
fn params_written_then_read_back() {
    let params = PlatformParams {
        user_top: 0x4000_0000,
        paddr_base: 0x8000_0000,
        kernel_log_buffer: false,
    };
    let file = write_config(&params.serialize_ron().expect("serialize"));
    assert_eq!(read_params(file.path()).expect("params"), params);
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nowhere.ron");
    let err = read_params(&path).unwrap_err();
    assert!(err.message().contains("nowhere.ron"), "{err}");
    assert!(err.cause().is_some());
}

#[test]
fn invalid_layout_is_reported() {
    let file = write_config("(user_top: 0)");
    let err = read_layout(file.path()).unwrap_err();
    assert_eq!(err.message(), "Invalid address layout");
}
