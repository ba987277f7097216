#![allow(dead_code)]

use std::fs::File;
use std::io::{Read as _, Write as _};
use std::path::Path;

use zip::write::SimpleFileOptions;

pub static COVER_JPG: &[u8] = &[
    0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
    0x00, 0x01, 0x00, 0x00, 0xff, 0xd9,
];

/// Writes a zip with one stored and one deflated image plus `extra` entries.
pub fn write_archive(path: &Path, extra: &[(&str, &[u8])]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);

    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("000.jpg", stored)?;
    zip.write_all(COVER_JPG)?;

    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file("001.jpg", deflated)?;
    zip.write_all(&COVER_JPG.repeat(64))?;

    for (name, content) in extra {
        zip.start_file(*name, deflated)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

/// Entry names and decompressed contents, in archive order.
pub fn read_entries(path: &Path) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut out = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        out.push((entry.name().to_owned(), bytes));
    }
    Ok(out)
}

/// Raw (still compressed) bytes and CRC per entry, for byte-for-byte checks.
pub fn raw_entries(path: &Path) -> anyhow::Result<Vec<(String, u32, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut out = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index_raw(index)?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        out.push((entry.name().to_owned(), entry.crc32(), bytes));
    }
    Ok(out)
}

pub fn files_in(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}
