//! Persona configuration: the artist's voice, background and rules.

use crate::error::CoreError;
use crate::task::GenerationTask;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Core persona file inside a persona directory.
const CORE_FILE: &str = "core.json";
/// Optional release list inside a persona directory.
const DISCOGRAPHY_FILE: &str = "discography.json";
/// Optional musical profile inside a persona directory.
const MUSICAL_FILE: &str = "musical.json";

/// Style rules, shared and per output kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleRules {
    pub all: Vec<String>,
    pub chat: Vec<String>,
    pub post: Vec<String>,
    pub song: Vec<String>,
}

impl StyleRules {
    /// Rules specific to one task.
    pub fn for_task(&self, task: GenerationTask) -> &[String] {
        match task {
            GenerationTask::Chat => &self.chat,
            GenerationTask::Post => &self.post,
            GenerationTask::Song => &self.song,
        }
    }
}

/// Released work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub title: String,
    pub year: Option<i32>,
    /// Single, EP, album.
    pub format: Option<String>,
    pub notes: Option<String>,
}

/// Genres, influences and instruments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicalProfile {
    pub genres: Vec<String>,
    pub influences: Vec<String>,
    pub instruments: Vec<String>,
}

impl MusicalProfile {
    fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.influences.is_empty() && self.instruments.is_empty()
    }
}

/// Static voice and constraint configuration for one artist.
///
/// Loaded once and never mutated; reloading means building a new session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub bio: Vec<String>,
    pub lore: Vec<String>,
    pub knowledge: Vec<String>,
    pub style: StyleRules,
    /// Topics the artist talks about.
    pub topics: Vec<String>,
    /// Content the artist must never produce.
    pub forbidden: Vec<String>,
    pub discography: Vec<Release>,
    pub musical: MusicalProfile,
}

/// `core.json` layout, with the name nested under `identity`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CoreFile {
    identity: Identity,
    bio: Vec<String>,
    lore: Vec<String>,
    knowledge: Vec<String>,
    style: StyleRules,
    topics: Vec<String>,
    forbidden: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Identity {
    name: String,
}

impl PersonaConfig {
    /// Load a persona from a JSON5 file or a persona directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_from_dir(path);
        }
        info!("loading persona from file (path={})", path.display());
        let persona: PersonaConfig = read_json5(path)?;
        persona.validate()?;
        Ok(persona)
    }

    /// Load a persona directory holding `core.json` and optionally
    /// `discography.json` and `musical.json`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let dir = dir.as_ref();
        info!("loading persona from directory (path={})", dir.display());
        let core: CoreFile = read_json5(&dir.join(CORE_FILE))?;
        let discography_path = dir.join(DISCOGRAPHY_FILE);
        let discography = if discography_path.exists() {
            read_json5(&discography_path)?
        } else {
            Vec::new()
        };
        let musical_path = dir.join(MUSICAL_FILE);
        let musical = if musical_path.exists() {
            read_json5(&musical_path)?
        } else {
            MusicalProfile::default()
        };

        let persona = PersonaConfig {
            name: core.identity.name,
            bio: core.bio,
            lore: core.lore,
            knowledge: core.knowledge,
            style: core.style,
            topics: core.topics,
            forbidden: core.forbidden,
            discography,
            musical,
        };
        persona.validate()?;
        debug!(
            "loaded persona (name={}, releases={})",
            persona.name,
            persona.discography.len()
        );
        Ok(persona)
    }

    /// Parse a persona from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, CoreError> {
        let persona: PersonaConfig =
            json5::from_str(contents).map_err(|err| CoreError::Persona(err.to_string()))?;
        persona.validate()?;
        Ok(persona)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Persona("persona name is required".to_string()));
        }
        Ok(())
    }

    /// Render the persona block text.
    pub fn render(&self) -> String {
        let mut sections = vec![format!("You are {}.", self.name.trim())];
        push_list(&mut sections, "Bio", &self.bio);
        push_list(&mut sections, "Lore", &self.lore);
        push_list(&mut sections, "Knowledge", &self.knowledge);

        if !self.musical.is_empty() {
            let mut lines = vec!["Musical profile:".to_string()];
            for (label, values) in [
                ("Genres", &self.musical.genres),
                ("Influences", &self.musical.influences),
                ("Instruments", &self.musical.instruments),
            ] {
                if !values.is_empty() {
                    lines.push(format!("{label}: {}", values.join(", ")));
                }
            }
            sections.push(lines.join("\n"));
        }

        if !self.discography.is_empty() {
            let releases = self
                .discography
                .iter()
                .map(render_release)
                .collect::<Vec<_>>();
            push_list(&mut sections, "Discography", &releases);
        }

        push_list(&mut sections, "Style", &self.style.all);
        if !self.topics.is_empty() {
            sections.push(format!("Topics: {}", self.topics.join(", ")));
        }
        push_list(&mut sections, "Never", &self.forbidden);
        sections.join("\n\n")
    }
}

fn render_release(release: &Release) -> String {
    let details = [
        release.year.map(|year| year.to_string()),
        release.format.clone(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();
    let mut line = release.title.clone();
    if !details.is_empty() {
        line.push_str(&format!(" ({})", details.join(", ")));
    }
    if let Some(notes) = release.notes.as_deref().filter(|notes| !notes.trim().is_empty()) {
        line.push_str(&format!(": {}", notes.trim()));
    }
    line
}

/// Append a bulleted section when `items` is non-empty.
pub(crate) fn push_list(sections: &mut Vec<String>, heading: &str, items: &[String]) {
    let items = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>();
    if items.is_empty() {
        return;
    }
    let mut section = format!("{heading}:");
    for item in items {
        section.push_str("\n- ");
        section.push_str(item);
    }
    sections.push(section);
}

fn read_json5<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let contents = fs::read_to_string(path)
        .map_err(|err| CoreError::Persona(format!("{}: {err}", path.display())))?;
    json5::from_str(&contents).map_err(|err| CoreError::Persona(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::{MusicalProfile, PersonaConfig, Release};
    use crate::{CoreError, GenerationTask};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn render_includes_non_empty_sections_in_order() {
        let persona = PersonaConfig {
            name: "Nova".to_string(),
            bio: vec!["Bedroom producer from Lisbon.".to_string()],
            forbidden: vec!["Never discuss politics.".to_string()],
            musical: MusicalProfile {
                genres: vec!["folk-pop".to_string(), "pop/r&b".to_string()],
                ..MusicalProfile::default()
            },
            discography: vec![Release {
                title: "Sunrise".to_string(),
                year: Some(2024),
                format: Some("single".to_string()),
                notes: None,
            }],
            ..PersonaConfig::default()
        };
        assert_eq!(
            persona.render(),
            "You are Nova.\n\n\
Bio:\n- Bedroom producer from Lisbon.\n\n\
Musical profile:\nGenres: folk-pop, pop/r&b\n\n\
Discography:\n- Sunrise (2024, single)\n\n\
Never:\n- Never discuss politics."
        );
    }

    #[test]
    fn style_rules_select_task() {
        let mut persona = PersonaConfig::default();
        persona.style.chat = vec!["lowercase only".to_string()];
        assert_eq!(persona.style.for_task(GenerationTask::Chat).len(), 1);
        assert!(persona.style.for_task(GenerationTask::Song).is_empty());
    }

    #[test]
    fn load_from_str_requires_name() {
        let err = PersonaConfig::load_from_str("{ bio: [\"x\"] }").expect_err("name");
        assert!(matches!(err, CoreError::Persona(_)));
        let persona = PersonaConfig::load_from_str("{ name: 'Nova', topics: ['rain'] }")
            .expect("persona");
        assert_eq!(persona.topics, vec!["rain".to_string()]);
    }

    #[test]
    fn load_from_dir_merges_files() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("core.json"),
            r#"{ "identity": { "name": "Nova" }, "bio": ["b"], "style": { "all": ["warm"], "chat": ["short"] } }"#,
        )
        .expect("core");
        fs::write(
            temp.path().join("discography.json"),
            r#"[{ "title": "Sunrise", "year": 2024 }]"#,
        )
        .expect("discography");
        fs::write(
            temp.path().join("musical.json"),
            r#"{ "genres": ["folk-pop"], "instruments": ["guitar"] }"#,
        )
        .expect("musical");

        let persona = PersonaConfig::load_from_path(temp.path()).expect("persona");
        assert_eq!(persona.name, "Nova");
        assert_eq!(persona.style.chat, vec!["short".to_string()]);
        assert_eq!(persona.discography[0].year, Some(2024));
        assert_eq!(persona.musical.instruments, vec!["guitar".to_string()]);
    }

    #[test]
    fn missing_core_file_is_a_persona_error() {
        let temp = tempdir().expect("tempdir");
        let err = PersonaConfig::load_from_dir(temp.path()).expect_err("missing");
        assert!(matches!(err, CoreError::Persona(_)));
    }
}
