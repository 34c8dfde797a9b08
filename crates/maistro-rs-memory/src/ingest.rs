//! Frontmatter document parsing and chunking for ingestion.

use crate::error::MemoryError;
use crate::model::{MetaValue, Metadata, NewRecord, RecordId, RecordKind};
use serde_yaml::Value;
use std::path::PathBuf;

/// Metadata key holding the source document of an ingested record.
pub const DOCUMENT_KEY: &str = "document";

/// Options controlling document ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Bodies longer than this are split into chunks; `None` disables chunking.
    pub chunk_max_chars: Option<usize>,
    /// File extensions picked up by directory ingestion.
    pub extensions: Vec<String>,
    /// Kind used when neither frontmatter nor directory names one.
    pub default_kind: RecordKind,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: Some(2000),
            extensions: vec!["md".to_string(), "txt".to_string()],
            default_kind: RecordKind::Song,
        }
    }
}

impl IngestOptions {
    /// Whether `extension` is configured for ingestion.
    pub fn accepts(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Markdown document with parsed frontmatter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestDocument {
    pub kind: Option<RecordKind>,
    pub id: Option<RecordId>,
    pub supersedes: Option<RecordId>,
    pub metadata: Metadata,
    pub body: String,
}

impl IngestDocument {
    /// Parse a document with optional `---` delimited YAML frontmatter.
    pub fn parse(contents: &str) -> Result<Self, MemoryError> {
        let (frontmatter, body) = split_frontmatter(contents)?;
        let mut document = Self {
            body: body.trim().to_string(),
            ..Self::default()
        };
        let Some(frontmatter) = frontmatter else {
            return Ok(document);
        };
        let mapping = match serde_yaml::from_str::<Value>(&frontmatter)? {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(document),
            _ => {
                return Err(MemoryError::Validation(
                    "frontmatter must be a mapping".to_string(),
                ));
            }
        };

        for (key, value) in mapping {
            let Value::String(key) = key else {
                return Err(MemoryError::Validation(
                    "frontmatter keys must be strings".to_string(),
                ));
            };
            let Some(value) = scalar(&key, value)? else {
                continue;
            };
            match key.as_str() {
                "kind" => document.kind = Some(value.to_string().parse()?),
                "id" => document.id = Some(RecordId::new(value.to_string())),
                "supersedes" => document.supersedes = Some(RecordId::new(value.to_string())),
                _ => {
                    document.metadata.insert(key, value);
                }
            }
        }
        Ok(document)
    }

    /// Build the records for this document, chunking long bodies.
    pub fn into_records(
        self,
        default_kind: RecordKind,
        chunk_max_chars: Option<usize>,
    ) -> Vec<NewRecord> {
        let kind = self.kind.unwrap_or(default_kind);
        let chunks = match chunk_max_chars {
            Some(max_chars) => split_document(&self.body, max_chars),
            None => vec![Chunk {
                header: None,
                text: self.body.clone(),
            }],
        };
        if chunks.len() <= 1 {
            return vec![NewRecord {
                id: self.id,
                kind,
                body: self.body,
                metadata: self.metadata,
                supersedes: self.supersedes,
                created_at: None,
            }];
        }

        let total = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let mut metadata = self.metadata.clone();
                metadata.insert("chunk_index".to_string(), MetaValue::from(index));
                metadata.insert("chunks_total".to_string(), MetaValue::from(total));
                if let Some(header) = chunk.header {
                    metadata.insert("section_header".to_string(), MetaValue::from(header));
                }
                NewRecord {
                    id: self
                        .id
                        .as_ref()
                        .map(|id| RecordId::new(format!("{id}-{index}"))),
                    kind,
                    body: chunk.text,
                    metadata,
                    supersedes: self.supersedes.clone(),
                    created_at: None,
                }
            })
            .collect()
    }
}

/// Convert a frontmatter value into scalar metadata.
fn scalar(key: &str, value: Value) -> Result<Option<MetaValue>, MemoryError> {
    let value = match value {
        Value::Null => return Ok(None),
        Value::Bool(value) => MetaValue::Bool(value),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(value), _) => MetaValue::Integer(value),
            (None, Some(value)) if value.is_finite() => MetaValue::Float(value),
            _ => {
                return Err(MemoryError::Validation(format!(
                    "frontmatter field {key} must be a finite number"
                )));
            }
        },
        Value::String(value) => MetaValue::Text(value),
        Value::Sequence(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match scalar(key, item)? {
                    Some(MetaValue::Text(text)) => parts.push(text),
                    Some(other) => parts.push(other.to_string()),
                    None => {}
                }
            }
            MetaValue::Text(parts.join(", "))
        }
        Value::Mapping(_) | Value::Tagged(_) => {
            return Err(MemoryError::Validation(format!(
                "frontmatter field {key} must be a scalar or list"
            )));
        }
    };
    Ok(Some(value))
}

/// Split YAML frontmatter from the Markdown body.
fn split_frontmatter(contents: &str) -> Result<(Option<String>, String), MemoryError> {
    let mut lines = contents.lines();
    let Some(first) = lines.next() else {
        return Ok((None, String::new()));
    };
    if first.trim() != "---" {
        return Ok((None, contents.to_string()));
    }

    let mut yaml_lines = Vec::new();
    let mut found_delimiter = false;
    for line in lines.by_ref() {
        if line.trim() == "---" {
            found_delimiter = true;
            break;
        }
        yaml_lines.push(line);
    }
    if !found_delimiter {
        return Err(MemoryError::Validation(
            "unterminated frontmatter block".to_string(),
        ));
    }
    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((Some(yaml_lines.join("\n")), body))
}

/// Piece of a split document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Nearest Markdown header above the chunk.
    pub header: Option<String>,
    pub text: String,
}

/// Split `body` into chunks of at most `max_chars` characters.
///
/// Sections start at Markdown headers; oversized sections break on blank
/// lines, and oversized paragraphs break on character boundaries.
pub fn split_document(body: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    if body.chars().count() <= max_chars {
        return vec![Chunk {
            header: None,
            text: body.to_string(),
        }];
    }

    let mut chunks = Vec::new();
    for (header, section) in sections(body) {
        let section = section.trim();
        if section.is_empty() {
            continue;
        }
        if section.chars().count() <= max_chars {
            chunks.push(Chunk {
                header,
                text: section.to_string(),
            });
            continue;
        }
        let mut buffer = String::new();
        for paragraph in section.split("\n\n").map(str::trim) {
            if paragraph.is_empty() {
                continue;
            }
            let needed = if buffer.is_empty() {
                paragraph.chars().count()
            } else {
                buffer.chars().count() + 2 + paragraph.chars().count()
            };
            if needed <= max_chars {
                if !buffer.is_empty() {
                    buffer.push_str("\n\n");
                }
                buffer.push_str(paragraph);
                continue;
            }
            if !buffer.is_empty() {
                chunks.push(Chunk {
                    header: header.clone(),
                    text: std::mem::take(&mut buffer),
                });
            }
            if paragraph.chars().count() <= max_chars {
                buffer.push_str(paragraph);
            } else {
                let characters = paragraph.chars().collect::<Vec<_>>();
                for piece in characters.chunks(max_chars) {
                    chunks.push(Chunk {
                        header: header.clone(),
                        text: piece.iter().collect(),
                    });
                }
            }
        }
        if !buffer.is_empty() {
            chunks.push(Chunk {
                header: header.clone(),
                text: buffer,
            });
        }
    }
    chunks
}

/// Group lines into sections that each begin at a Markdown header.
fn sections(body: &str) -> Vec<(Option<String>, String)> {
    let mut sections = Vec::new();
    let mut header = None;
    let mut lines: Vec<&str> = Vec::new();
    for line in body.lines() {
        if let Some(title) = header_text(line) {
            if !lines.is_empty() {
                sections.push((header.take(), lines.join("\n")));
                lines.clear();
            }
            header = Some(title);
        }
        lines.push(line);
    }
    if !lines.is_empty() {
        sections.push((header, lines.join("\n")));
    }
    sections
}

/// Text of an ATX header line (`# Title`).
fn header_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Document that could not be ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of ingesting one or more documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Documents read.
    pub attempted: usize,
    /// Documents fully stored and indexed.
    pub succeeded: usize,
    /// Documents rejected, with the reason.
    pub failed: Vec<IngestFailure>,
    /// Records created, in ingestion order.
    pub records: Vec<RecordId>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{IngestDocument, IngestOptions, split_document};
    use crate::{MemoryError, MetaValue, RecordKind};
    use pretty_assertions::assert_eq;

    const SONG: &str = "---\ntitle: Golden Hour\ndate: 2024-03-01\ngenre: folk-pop\nbpm: 96\nkey: D major\nthemes: [love, summer]\n---\n\nVerse one\n\nChorus\n";

    #[test]
    fn frontmatter_becomes_metadata() {
        let document = IngestDocument::parse(SONG).expect("parse");
        assert_eq!(document.kind, None);
        assert_eq!(document.body, "Verse one\n\nChorus");
        assert_eq!(
            document.metadata.get("title"),
            Some(&MetaValue::from("Golden Hour"))
        );
        assert_eq!(document.metadata.get("bpm"), Some(&MetaValue::Integer(96)));
        assert_eq!(
            document.metadata.get("themes"),
            Some(&MetaValue::from("love, summer"))
        );
        assert_eq!(
            document.metadata.get("date"),
            Some(&MetaValue::from("2024-03-01"))
        );
    }

    #[test]
    fn reserved_keys_set_record_fields() {
        let contents = "---\nkind: feedback\nid: review-1\nsupersedes: review-0\ntitle: Golden Hour\nsource: blog\n---\nStrong hook.";
        let document = IngestDocument::parse(contents).expect("parse");
        assert_eq!(document.kind, Some(RecordKind::Feedback));
        assert_eq!(document.id.as_ref().map(|id| id.as_str()), Some("review-1"));
        assert_eq!(
            document.supersedes.as_ref().map(|id| id.as_str()),
            Some("review-0")
        );
        assert!(!document.metadata.contains_key("kind"));
    }

    #[test]
    fn nested_frontmatter_is_rejected() {
        let contents = "---\ntitle: x\ncredits:\n  producer: me\n---\nbody";
        let err = IngestDocument::parse(contents).expect_err("nested");
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for value in [".nan", ".inf", "-.inf"] {
            let contents = format!("---\ntitle: x\ngenre: pop\nbpm: {value}\n---\nbody");
            let err = IngestDocument::parse(&contents).expect_err("non-finite");
            assert!(err.to_string().contains("bpm"));
        }
        let document =
            IngestDocument::parse("---\ntitle: x\nbpm: 92.5\n---\nbody").expect("finite");
        assert_eq!(document.metadata.get("bpm"), Some(&MetaValue::Float(92.5)));
    }

    #[test]
    fn unterminated_frontmatter_is_rejected() {
        assert!(IngestDocument::parse("---\ntitle: x\nbody").is_err());
    }

    #[test]
    fn documents_without_frontmatter_keep_body() {
        let document = IngestDocument::parse("just lyrics").expect("parse");
        assert_eq!(document.body, "just lyrics");
        assert!(document.metadata.is_empty());
    }

    #[test]
    fn short_bodies_are_not_chunked() {
        let records = IngestDocument::parse(SONG)
            .expect("parse")
            .into_records(RecordKind::Song, Some(2000));
        assert_eq!(records.len(), 1);
        assert!(!records[0].metadata.contains_key("chunk_index"));
    }

    #[test]
    fn long_bodies_split_on_headers_and_paragraphs() {
        let body = format!(
            "# Verse\n\n{}\n\n{}\n\n# Chorus\n\nshort chorus",
            "a".repeat(30),
            "b".repeat(30)
        );
        let chunks = split_document(&body, 45);
        assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= 45));
        assert_eq!(
            chunks
                .iter()
                .map(|chunk| chunk.header.as_deref().unwrap_or_default())
                .collect::<Vec<_>>(),
            vec!["Verse", "Verse", "Chorus"]
        );
        assert!(chunks[0].text.starts_with("# Verse"));
    }

    #[test]
    fn chunk_records_carry_position_metadata() {
        let contents = format!(
            "---\nid: long\ntitle: Long\ngenre: pop\n---\n# One\n\n{}\n\n# Two\n\n{}",
            "x".repeat(20),
            "y".repeat(20)
        );
        let records = IngestDocument::parse(&contents)
            .expect("parse")
            .into_records(RecordKind::Song, Some(30));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id.as_ref().map(|id| id.as_str()), Some("long-1"));
        assert_eq!(records[1].metadata.get("chunk_index"), Some(&MetaValue::Integer(1)));
        assert_eq!(records[1].metadata.get("chunks_total"), Some(&MetaValue::Integer(2)));
        assert_eq!(
            records[1].metadata.get("section_header"),
            Some(&MetaValue::from("Two"))
        );
    }

    #[test]
    fn extensions_match_case_insensitively() {
        let options = IngestOptions::default();
        assert!(options.accepts("MD"));
        assert!(!options.accepts("json"));
    }
}
