use std::sync::LazyLock;

use bio::io::fasta;
use camino::Utf8Path;
use regex::Regex;

use crate::domain::UniparcId;
use crate::error::KiraError;

static STATUS_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"status=(?:active|inactive)").expect("static regex"));

/// Turns a raw UniParc FASTA body into the record appended to the output.
///
/// Database status annotations are removed, trailing whitespace is trimmed from the header,
/// and `|<gene>` is spliced into the header at `splice_offset` bytes (clamped to the header
/// length). The result always ends with a newline so the next record starts on its own line.
pub fn annotate_record(
    body: &str,
    gene: &str,
    identifier: &UniparcId,
    splice_offset: usize,
) -> Result<String, KiraError> {
    let cleaned = STATUS_ANNOTATION.replace_all(body, "");
    if !cleaned.starts_with('>') {
        return Err(KiraError::MalformedRecord {
            identifier: identifier.to_string(),
            reason: "body does not start with a '>' header".to_string(),
        });
    }
    let markers = count_markers(cleaned.as_bytes());
    if markers != 1 {
        return Err(KiraError::MalformedRecord {
            identifier: identifier.to_string(),
            reason: format!("expected one record, found {markers}"),
        });
    }

    let (header, rest) = match cleaned.find('\n') {
        Some(idx) => cleaned.split_at(idx),
        None => (&cleaned[..], ""),
    };
    let header = header.trim_end();
    let at = splice_point(header, splice_offset);

    let mut record = String::with_capacity(cleaned.len() + gene.len() + 2);
    record.push_str(&header[..at]);
    record.push('|');
    record.push_str(gene);
    record.push_str(&header[at..]);
    record.push_str(rest);
    if !record.ends_with('\n') {
        record.push('\n');
    }
    Ok(record)
}

/// Byte offset where `|<gene>` goes: `offset` clamped to the header and moved back onto a
/// char boundary.
fn splice_point(header: &str, offset: usize) -> usize {
    let mut at = offset.min(header.len());
    while !header.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// Number of lines starting with the `>` record marker.
pub fn count_markers(data: &[u8]) -> usize {
    let mut count = 0;
    let mut line_start = true;
    for &byte in data {
        if line_start && byte == b'>' {
            count += 1;
        }
        line_start = byte == b'\n';
    }
    count
}

/// Byte range of one record in the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpan {
    /// Header line without the leading `>`.
    pub header: String,
    pub start: u64,
    pub end: u64,
}

impl RecordSpan {
    /// True when this header is exactly what [`annotate_record`] writes for `identifier` and
    /// `gene`: removing `|gene` at the splice point leaves a header whose first token is
    /// `>identifier`.
    pub fn belongs_to(&self, gene: &str, identifier: &str, splice_offset: usize) -> bool {
        let header = format!(">{}", self.header);
        let tag = format!("|{gene}");
        let expected = format!(">{identifier}");
        header.match_indices(tag.as_str()).any(|(at, _)| {
            let original = [&header[..at], &header[at + tag.len()..]].concat();
            splice_point(&original, splice_offset) == at
                && original.split_whitespace().next() == Some(expected.as_str())
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputScan {
    /// Records terminated by a newline.
    pub records: Vec<RecordSpan>,
    /// Trailing record cut off mid-write.
    pub torn: Option<RecordSpan>,
    /// Non-blank bytes before the first record marker.
    pub has_preamble: bool,
    pub len: u64,
}

pub fn scan_records(data: &[u8]) -> OutputScan {
    let mut scan = OutputScan {
        len: data.len() as u64,
        ..OutputScan::default()
    };

    let mut starts = Vec::new();
    let mut line_start = true;
    for (pos, &byte) in data.iter().enumerate() {
        if line_start && byte == b'>' {
            starts.push(pos);
        }
        line_start = byte == b'\n';
    }

    let first = starts.first().copied().unwrap_or(data.len());
    scan.has_preamble = data[..first].iter().any(|b| !b.is_ascii_whitespace());

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(data.len());
        let chunk = &data[start..end];
        let header_end = chunk
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(chunk.len());
        let header = String::from_utf8_lossy(&chunk[1..header_end])
            .trim_end()
            .to_string();
        let span = RecordSpan {
            header,
            start: start as u64,
            end: end as u64,
        };
        if chunk.ends_with(b"\n") {
            scan.records.push(span);
        } else {
            scan.torn = Some(span);
        }
    }
    scan
}

pub fn parse_records(path: &Utf8Path) -> Result<Vec<fasta::Record>, KiraError> {
    let reader = fasta::Reader::from_file(path.as_std_path())
        .map_err(|err| KiraError::FastaParse(format!("{path}: {err}")))?;
    reader
        .records()
        .map(|record| record.map_err(|err| KiraError::FastaParse(format!("{path}: {err}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_only_count_at_line_start() {
        assert_eq!(count_markers(b">a\nAC>GT\n>b\nTT\n"), 2);
        assert_eq!(count_markers(b""), 0);
    }

    #[test]
    fn scan_flags_unterminated_tail() {
        let scan = scan_records(b">UPI1|A\nMK\n>UPI2|B\nMK");
        assert_eq!(scan.records.len(), 1);
        let torn = scan.torn.unwrap();
        assert_eq!(torn.start, 11);
        assert_eq!(torn.header, "UPI2|B");
        assert!(!scan.has_preamble);
    }

    #[test]
    fn ownership_needs_exact_gene_and_identifier() {
        let scan = scan_records(b">UPI0000000001|TP53\nMK\n");
        let record = &scan.records[0];
        assert!(record.belongs_to("TP53", "UPI0000000001", 14));
        assert!(!record.belongs_to("TP5", "UPI0000000001", 14));
        assert!(!record.belongs_to("TP53", "UPI000000000", 14));
        assert!(!record.belongs_to("P53", "UPI0000000001", 14));
    }
}
