use chrono::{DateTime, Duration, TimeZone, Utc};
use maistro_rs_memory::{NewRecord, RecordKind};
use std::fs;
use std::path::Path;

/// Fixed base timestamp for deterministic records.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Song record with title and genre, created `minutes` after [`base_time`].
pub fn song(title: &str, genre: &str, body: &str, minutes: i64) -> NewRecord {
    NewRecord::new(RecordKind::Song, body)
        .with_meta("title", title)
        .with_meta("genre", genre)
        .created_at(base_time() + Duration::minutes(minutes))
}

/// Feedback record about `title` from `source`.
pub fn feedback(title: &str, source: &str, body: &str, minutes: i64) -> NewRecord {
    NewRecord::new(RecordKind::Feedback, body)
        .with_meta("title", title)
        .with_meta("source", source)
        .created_at(base_time() + Duration::minutes(minutes))
}

/// Write a persona directory with `core.json` and `musical.json`.
pub fn write_persona_dir(dir: &Path, name: &str) {
    fs::create_dir_all(dir).expect("persona dir");
    fs::write(
        dir.join("core.json"),
        format!(
            r#"{{
  "identity": {{ "name": "{name}" }},
  "bio": ["Raised on cassette tapes and late night radio."],
  "style": {{ "all": ["Warm and direct."], "chat": ["Keep replies short."] }},
  "forbidden": ["Never share private details about collaborators."]
}}"#
        ),
    )
    .expect("core.json");
    fs::write(
        dir.join("musical.json"),
        r#"{ "genres": ["folk-pop", "pop/r&b"], "instruments": ["guitar"] }"#,
    )
    .expect("musical.json");
}
