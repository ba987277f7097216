mod support;

use comicshelf::archive;
use comicshelf::comicinfo::{self, ComicInfo, Page};

fn sample() -> ComicInfo {
    ComicInfo {
        title: "The Case of the Chemical Syndicate".to_owned(),
        series: "Detective Comics".to_owned(),
        number: "27".to_owned(),
        summary: "Batman debuts.\nCommissioner Gordon calls.".to_owned(),
        year: Some(1939),
        month: Some(5),
        writer: "Bill Finger".to_owned(),
        penciller: "Bob Kane".to_owned(),
        letterer: "Bob Kane".to_owned(),
        pages: vec![Page {
            image: "0".to_owned(),
            page_type: "FrontCover".to_owned(),
            ..Page::default()
        }],
        ..ComicInfo::default()
    }
}

#[test]
fn record_round_trips_through_archive() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Detective Comics 027.cbz");
    support::write_archive(&path, &[])?;

    comicinfo::write_record(&path, &sample())?;

    assert_eq!(comicinfo::read_record(&path)?, Some(sample()));
    let entries = support::read_entries(&path)?;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].1, support::COVER_JPG);
    Ok(())
}

#[test]
fn padded_text_survives_write_and_read() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Batman 5.cbz");
    support::write_archive(&path, &[])?;
    let record = ComicInfo {
        title: "   ".to_owned(),
        series: "  Batman ".to_owned(),
        summary: "  lead\n\ntrail  ".to_owned(),
        ..ComicInfo::default()
    };

    comicinfo::write_record(&path, &record)?;

    assert_eq!(comicinfo::read_record(&path)?, Some(record));
    Ok(())
}

#[test]
fn archive_without_record_reads_as_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("a.cbz");
    support::write_archive(&path, &[])?;

    assert_eq!(comicinfo::read_record(&path)?, None);
    Ok(())
}

#[test]
fn lowercase_entry_is_read_and_replaced() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("a.cbz");
    let legacy = "\u{feff}<?xml version=\"1.0\"?>\n<ComicInfo><Series>Batman</Series><Number>5</Number><letterer>Todd Klein</letterer></ComicInfo>";
    support::write_archive(&path, &[("comicinfo.xml", legacy.as_bytes())])?;

    let record = comicinfo::read_record(&path)?.expect("legacy record");
    assert_eq!(record.series, "Batman");
    assert_eq!(record.letterer, "Todd Klein");

    comicinfo::write_record(&path, &record)?;
    let names = archive::list_entries(&path)?;
    assert!(names.iter().any(|name| name == "ComicInfo.xml"));
    assert!(!names.iter().any(|name| name == "comicinfo.xml"));

    let written = String::from_utf8(archive::read_entry(&path, "ComicInfo.xml")?.unwrap_or_default())?;
    assert!(written.contains("<Letterer>Todd Klein</Letterer>"), "{written}");
    Ok(())
}

#[test]
fn malformed_record_is_a_decode_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("a.cbz");
    support::write_archive(&path, &[("ComicInfo.xml", b"<ComicInfo><Series>")])?;

    let err = comicinfo::read_record(&path).unwrap_err();
    assert!(matches!(err, comicinfo::RecordError::Decode(_)), "{err}");
    Ok(())
}
