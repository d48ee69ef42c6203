//! Tabular (CSV) codec for postings
//!
//! Column order: `source,title,company,location,url,collected_at,snapshot_id`.
//! Files written by earlier versions name the title column `job_title`, lack
//! `snapshot_id` and may carry extra columns; all of those still read.

use std::io;

use crate::models::Posting;
use crate::utils::error::StorageError;

/// Header written at the top of every table
pub const COLUMNS: [&str; 7] = [
    "source",
    "title",
    "company",
    "location",
    "url",
    "collected_at",
    "snapshot_id",
];

/// Read postings from CSV
///
/// A malformed row or a row without a URL fails the whole read rather than
/// being dropped, since the result is written back over the source.
pub fn read_postings<R: io::Read>(reader: R) -> Result<Vec<Posting>, StorageError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);

    let mut postings = Vec::new();
    for (index, record) in csv_reader.deserialize::<Posting>().enumerate() {
        let posting = record?;
        if posting.url.is_empty() {
            return Err(StorageError::InvalidRecord(format!(
                "row {} has no url",
                index + 1
            )));
        }
        postings.push(posting);
    }

    Ok(postings)
}

/// Write postings as CSV, header included even when empty
pub fn write_postings<W: io::Write>(writer: W, postings: &[Posting]) -> Result<(), StorageError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(COLUMNS)?;
    for posting in postings {
        csv_writer.serialize(posting)?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Encode postings into an in-memory CSV document
pub fn to_csv_bytes(postings: &[Posting]) -> Result<Vec<u8>, StorageError> {
    let mut buffer = Vec::new();
    write_postings(&mut buffer, postings)?;
    Ok(buffer)
}

/// Decode an in-memory CSV document
pub fn from_csv_bytes(bytes: &[u8]) -> Result<Vec<Posting>, StorageError> {
    read_postings(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use chrono::NaiveDate;

    #[test]
    fn test_write_then_read() {
        let postings = vec![
            Posting::new(
                Source::SerpApi,
                "Data Scientist, NLP",
                "Acme \"Labs\"",
                "Tel Aviv, Israel",
                "https://www.linkedin.com/jobs/view/3900000001",
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            )
            .with_snapshot("2024-05-01T06-00-00Z"),
            Posting::new(
                Source::Lever,
                "ML Engineer",
                "",
                "",
                "https://jobs.lever.co/acme/42",
                NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            ),
        ];

        let bytes = to_csv_bytes(&postings).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("source,title,company,location,url,collected_at,snapshot_id\n"));
        assert!(text.contains("LinkedIn (via SerpAPI)"));

        let decoded = from_csv_bytes(&bytes).unwrap();
        assert_eq!(decoded, postings);
    }

    #[test]
    fn test_empty_table_has_header() {
        let bytes = to_csv_bytes(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap().trim_end(),
            COLUMNS.join(",")
        );
        assert!(from_csv_bytes(&bytes).unwrap().is_empty());
        assert!(from_csv_bytes(b"").unwrap().is_empty());
    }

    #[test]
    fn test_reads_legacy_layout() {
        let legacy = "source,job_title,company,location,url,collected_at,company_len\n\
                      LinkedIn (Playwright),Data Scientist,Acme,Israel,https://www.linkedin.com/jobs/view/3900000009,2024-03-01,4\n";

        let postings = from_csv_bytes(legacy.as_bytes()).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].source, Source::LinkedInBrowser);
        assert_eq!(postings[0].title, "Data Scientist");
        assert!(postings[0].snapshot_id.is_none());
    }

    #[test]
    fn test_rejects_row_without_url() {
        let bad = "source,title,company,location,url,collected_at\nLever,Analyst,Acme,Israel,,2024-03-01\n";
        assert!(matches!(
            from_csv_bytes(bad.as_bytes()),
            Err(StorageError::InvalidRecord(_))
        ));
    }
}
