//! CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecated for custom build-dir; still works for default

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use pretty_assertions::assert_eq;

fn zip_file(path: &Path, files: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, data) in files {
        zip.start_file(*name, opts).unwrap();
        zip.write_all(data).unwrap();
    }
    std::fs::write(path, zip.finish().unwrap().into_inner()).unwrap();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([12, 120, 60]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn book_with_cover(dir: &Path) -> PathBuf {
    let input = dir.join("book.epub");
    let cover = png(600, 900);
    zip_file(
        &input,
        &[
            ("mimetype", b"application/epub+zip"),
            ("OEBPS/img/book-cover.PNG", &cover),
        ],
    );
    input
}

/// Isolate the run from any config in the developer's home directory.
fn thumbnailer(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("epub-thumbnailer").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

#[test]
fn help_prints_and_exits_success() {
    Command::cargo_bin("epub-thumbnailer")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn thumbnail_uses_default_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = book_with_cover(dir.path());
    let output = dir.path().join("thumb.png");

    thumbnailer(dir.path())
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let img = image::open(&output).unwrap();
    assert_eq!((img.width(), img.height()), (133, 200));
}

#[test]
fn thumbnail_with_explicit_size_and_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = book_with_cover(dir.path());
    let output = dir.path().join("thumb.png");

    let out = thumbnailer(dir.path())
        .arg(&input)
        .arg(&output)
        .arg("90")
        .arg("--json")
        .assert()
        .success();

    let stdout = std::str::from_utf8(&out.get_output().stdout).unwrap();
    let report: serde_json::Value = serde_json::from_str(stdout).expect("report should be valid JSON");
    assert_eq!(report["strategy"], "filename");
    assert_eq!(report["cover_path"], "OEBPS/img/book-cover.PNG");
    assert_eq!(report["height"], 90);
    assert_eq!(report["width"], 60);
}

#[test]
fn no_cover_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.epub");
    zip_file(&input, &[("mimetype", b"application/epub+zip"), ("OEBPS/ch1.xhtml", b"<html/>")]);
    let output = dir.path().join("thumb.png");

    let out = thumbnailer(dir.path())
        .arg(&input)
        .arg(&output)
        .assert()
        .failure();

    let stderr = std::str::from_utf8(&out.get_output().stderr).unwrap();
    assert!(stderr.contains("empty.epub"));
    assert!(stderr.contains("No cover image found"));
    assert!(!output.exists());
}

#[test]
fn nonexistent_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    thumbnailer(dir.path())
        .args(["/nonexistent/file.epub", "out.png"])
        .assert()
        .failure();
}

#[test]
fn zero_size_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = book_with_cover(dir.path());
    thumbnailer(dir.path())
        .arg(&input)
        .arg(dir.path().join("thumb.png"))
        .arg("0")
        .assert()
        .failure();
}

#[test]
fn missing_output_argument_fails() {
    let dir = tempfile::tempdir().unwrap();
    thumbnailer(dir.path()).arg("book.epub").assert().failure();
}

#[test]
fn config_show_json_valid() {
    let dir = tempfile::tempdir().unwrap();
    let out = thumbnailer(dir.path())
        .args(["config", "show", "--json"])
        .assert()
        .success();
    let stdout = std::str::from_utf8(&out.get_output().stdout).unwrap();
    let cfg: serde_json::Value = serde_json::from_str(stdout).expect("config show --json should output valid JSON");
    assert_eq!(cfg["thumbnail"]["size"], 200);
    assert_eq!(cfg["thumbnail"]["filter"], "lanczos3");
}
