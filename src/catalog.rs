use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::container::{ContainerData, InfoRecord};
use crate::duplicates::DuplicateSet;
use crate::meta::MetaRecord;

/// Stable handle into `Catalog::entries`. Ids are assigned on insert and
/// never reused; the catalog only grows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntryId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub suffix: Option<String>,
    pub size_bytes: u64,
    pub md5: Option<String>,
}

/// One archive attached to an entry. On ingest this is the entry's muster
/// folder acting as a directory-backed archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub path: String,
    pub files: Vec<FileRecord>,
}

/// Decoded container records for one flux file owned by an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxRecord {
    pub file: String,
    pub info: Option<InfoRecord>,
    pub meta: Option<MetaRecord>,
}

impl FluxRecord {
    pub fn new(file: impl Into<String>, data: ContainerData) -> Self {
        Self {
            file: file.into(),
            info: data.info,
            meta: data.meta,
        }
    }
}

/// Archive media types, defaulting unknown names to Software since nearly
/// everything mustered is a program disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mediatype {
    Texts,
    Etree,
    Audio,
    Movies,
    #[default]
    Software,
    Image,
    Data,
    Web,
    Collection,
    Account,
}

impl Mediatype {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "texts" => Mediatype::Texts,
            "etree" => Mediatype::Etree,
            "audio" => Mediatype::Audio,
            "movies" => Mediatype::Movies,
            "image" => Mediatype::Image,
            "data" => Mediatype::Data,
            "web" => Mediatype::Web,
            "collection" => Mediatype::Collection,
            "account" => Mediatype::Account,
            _ => Mediatype::Software,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub identifier: String,
    pub title: String,
    pub folder: Option<String>,
    pub mediatype: Mediatype,
    pub archives: Vec<Archive>,
    pub flux: Vec<FluxRecord>,
    pub photos: Vec<String>,
}

impl Entry {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            folder: None,
            mediatype: Mediatype::default(),
            archives: Vec::new(),
            flux: Vec::new(),
            photos: Vec::new(),
        }
    }

    pub fn has_archives(&self) -> bool {
        !self.archives.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<Entry>,
    pub duplicates: DuplicateSet,
}

impl Catalog {
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.0)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.get_mut(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        (0..self.entries.len()).map(EntryId)
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<EntryId> {
        self.entries
            .iter()
            .position(|e| e.identifier == identifier)
            .map(EntryId)
    }

    /// Look up by natural key, insert if absent, return the handle.
    /// Single-writer, single-process semantics.
    pub fn get_or_create(&mut self, identifier: &str, title: &str) -> EntryId {
        if let Some(id) = self.find_by_identifier(identifier) {
            return id;
        }
        self.entries.push(Entry::new(identifier, title));
        EntryId(self.entries.len() - 1)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("open catalog {}", path.display()))?;
        let catalog = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse catalog {}", path.display()))?;
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("create catalog {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("write catalog {}", path.display()))?;
        Ok(())
    }
}
