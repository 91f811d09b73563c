//! Raw export reader with encoding auto-detection.
//!
//! Turns an EDC export file into a header plus data rows of raw fields.
//! Fields are kept verbatim: each reshaper decides what to trim.

pub mod scalar;

use std::path::Path;

use crate::config::IngestOptions;
use crate::error::{CsvError, CsvResult};

pub use scalar::{parse_date, parse_fraction, parse_optional_date, parse_time_of_day, OPEN_END_SENTINEL};

/// One data row of an export, with its position in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Fields split on the delimiter, untrimmed.
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Field at `idx`, or `""` when the row is shorter.
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Number of fields actually present.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }
}

/// A whole export split into header and rows.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Header fields, untrimmed.
    pub header: Vec<String>,
    /// Data rows, blank lines removed.
    pub rows: Vec<RawRow>,
    /// Encoding the content was decoded with.
    pub encoding: String,
    /// Delimiter used to split fields.
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet.
///
/// A UTF-8 byte order mark wins over detection.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-2" | "latin-2" | "latin2" => "iso-8859-2".to_string(),
        "windows-1250" | "cp1250" => "windows-1250".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Encoding assumed when detection names a charset the decoder does not know.
///
/// The EDC portal exports in windows-1250.
pub const FALLBACK_ENCODING: &str = "windows-1250";

/// Map an encoding name to its decoder.
pub fn resolve_encoding(encoding: &str) -> Option<&'static encoding_rs::Encoding> {
    match encoding.trim().to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Some(encoding_rs::UTF_8),
        "iso-8859-1" | "latin-1" | "latin1" => Some(encoding_rs::WINDOWS_1252),
        "iso-8859-2" | "latin-2" | "latin2" => Some(encoding_rs::ISO_8859_2),
        "windows-1250" | "cp1250" => Some(encoding_rs::WINDOWS_1250),
        "windows-1252" | "cp1252" => Some(encoding_rs::WINDOWS_1252),
        other => encoding_rs::Encoding::for_label(other.as_bytes()),
    }
}

/// Decode bytes to a string using the named encoding.
///
/// A leading byte order mark is stripped. An unknown name is an error.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoder = resolve_encoding(encoding).ok_or_else(|| CsvError::EncodingError(encoding.to_string()))?;

    let (decoded, _, _) = decoder.decode(bytes);
    Ok(decoded.into_owned())
}

/// Decode bytes with a detected encoding name.
///
/// Names the decoder does not know fall back to [`FALLBACK_ENCODING`].
/// Returns the content and the encoding actually used.
pub fn decode_detected(bytes: &[u8], detected: &str) -> (String, String) {
    let (decoder, used) = match resolve_encoding(detected) {
        Some(decoder) => (decoder, detected.to_string()),
        None => (encoding_rs::WINDOWS_1250, FALLBACK_ENCODING.to_string()),
    };

    let (decoded, _, _) = decoder.decode(bytes);
    (decoded.into_owned(), used)
}

/// Split decoded content into header and data rows.
///
/// Quotes carry no meaning in the exports, so they are left in the fields.
/// Rows may have any number of fields.
pub fn parse_table(content: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<RawRow>)> {
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let row = RawRow::new(line_idx + 1, line.split(delimiter).map(str::to_string).collect());
        if row.is_blank() {
            continue;
        }

        match header {
            None => header = Some(row.fields),
            Some(_) => rows.push(row),
        }
    }

    let header = header.ok_or(CsvError::EmptyFile)?;
    Ok((header, rows))
}

/// Decode and split raw bytes.
pub fn parse_bytes(bytes: &[u8], options: &IngestOptions) -> CsvResult<RawTable> {
    let (content, encoding) = match options.encoding {
        Some(ref forced) => (decode_content(bytes, forced)?, forced.clone()),
        None => decode_detected(bytes, &detect_encoding(bytes)),
    };

    let (header, rows) = parse_table(&content, options.delimiter)?;

    Ok(RawTable {
        header,
        rows,
        encoding,
        delimiter: options.delimiter,
    })
}

/// Read an export file from disk.
pub fn read_table_file<P: AsRef<Path>>(path: P, options: &IngestOptions) -> CsvResult<RawTable> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_and_rows() {
        let (header, rows) = parse_table("a;b;c\n1;2;3\n4;5;6", ';').unwrap();

        assert_eq!(header, vec!["a", "b", "c"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["1", "2", "3"]);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_blank_lines_skipped_line_numbers_kept() {
        let (_, rows) = parse_table("a;b\n1;2\n\n   \n3;4\n", ';').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].fields, vec!["3", "4"]);
        assert_eq!(rows[1].line, 5);
    }

    #[test]
    fn test_rows_keep_their_own_width() {
        let (_, rows) = parse_table("a;b;c\n1\n1;2;3;4;5", ';').unwrap();

        assert_eq!(rows[0].width(), 1);
        assert_eq!(rows[0].field(2), "");
        assert_eq!(rows[1].width(), 5);
    }

    #[test]
    fn test_fields_untrimmed_and_crlf() {
        let (header, rows) = parse_table("a;b\r\n 1 ;\"x\"\r\n", ';').unwrap();

        assert_eq!(header, vec!["a", "b"]);
        assert_eq!(rows[0].fields, vec![" 1 ", "\"x\""]);
    }

    #[test]
    fn test_empty_content_error() {
        assert!(matches!(parse_table("", ';'), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_table("\n\n", ';'), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_custom_delimiter() {
        let (header, rows) = parse_table("a|b\n1|2", '|').unwrap();
        assert_eq!(header, vec!["a", "b"]);
        assert_eq!(rows[0].field(1), "2");
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Datum;Cas\n01.06.2025;00:00");

        let table = parse_bytes(&bytes, &IngestOptions::default()).unwrap();
        assert_eq!(table.encoding, "utf-8");
        assert_eq!(table.header[0], "Datum");
    }

    #[test]
    fn test_windows_1250_decoding() {
        // "Skupina sdílení" in windows-1250
        let bytes: &[u8] = &[
            0x53, 0x6B, 0x75, 0x70, 0x69, 0x6E, 0x61, 0x20, 0x73, 0x64, 0xED, 0x6C, 0x65, 0x6E, 0xED,
        ];
        let decoded = decode_content(bytes, "windows-1250").unwrap();
        assert_eq!(decoded, "Skupina sdílení");
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        assert!(matches!(
            decode_content(b"abc", "klingon-1"),
            Err(CsvError::EncodingError(_))
        ));
    }

    #[test]
    fn test_unknown_detected_encoding_falls_back() {
        assert!(resolve_encoding("ibm855").is_none());

        // "Datum;Skupina sdílení" in windows-1250
        let mut bytes = b"Datum;Skupina sd".to_vec();
        bytes.extend_from_slice(&[0xED, 0x6C, 0x65, 0x6E, 0xED]);

        let (decoded, used) = decode_detected(&bytes, "ibm855");
        assert_eq!(used, "windows-1250");
        assert_eq!(decoded, "Datum;Skupina sdílení");
    }

    #[test]
    fn test_known_detected_encoding_kept() {
        let (decoded, used) = decode_detected(b"a;b", "iso-8859-2");
        assert_eq!(used, "iso-8859-2");
        assert_eq!(decoded, "a;b");
    }

    #[test]
    fn test_forced_unknown_encoding_is_error() {
        let options = IngestOptions::default().with_encoding("ibm855");
        assert!(matches!(
            parse_bytes(b"a;b\n1;2", &options),
            Err(CsvError::EncodingError(_))
        ));
    }

    #[test]
    fn test_read_table_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        std::fs::write(&path, "h1;h2\nv1;v2\n").unwrap();

        let table = read_table_file(&path, &IngestOptions::default()).unwrap();
        assert_eq!(table.delimiter, ';');
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].field(1), "v2");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = read_table_file(dir.path().join("missing.csv"), &IngestOptions::default());
        assert!(matches!(result, Err(CsvError::IoError(_))));
    }
}
