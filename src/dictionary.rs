//
// dictionary.rs
// Dicom-Inspect-rs
//
// Tag name lookup: the standard data dictionary, JSON-configured private dictionaries, and chains of both.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use dicom::core::dictionary::DataDictionary;
use dicom::dictionary_std::StandardDataDictionary;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::value::Tag;

/// Resolves tags to human-readable names.
pub trait TagDictionary {
    /// Returns the attribute name, or [`Error::TagNotFound`].
    fn name(&self, tag: Tag) -> Result<String>;
}

/// The DICOM standard data dictionary, resolving to attribute keywords.
///
/// Private tags (odd groups) are never named here, not even the private
/// creator slots the standard dictionary registers as a range.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDictionary;

impl TagDictionary for StandardDictionary {
    fn name(&self, tag: Tag) -> Result<String> {
        if tag.is_private() {
            return Err(Error::TagNotFound(tag));
        }
        StandardDataDictionary
            .by_tag(tag.into())
            .map(|e| e.alias.to_string())
            .ok_or(Error::TagNotFound(tag))
    }
}

/// Entry of a private dictionary file. Other keys, such as a documentary
/// `vr`, are ignored.
#[derive(Debug, Clone, Deserialize)]
struct DictionaryEntry {
    tag: String,
    name: String,
}

/// Site- or vendor-specific tags loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct PrivateDictionary {
    entries: HashMap<Tag, String>,
}

impl PrivateDictionary {
    /// Loads a JSON array of `{"tag": "gggg,eeee", "name": ".."}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let raw: Vec<DictionaryEntry> = serde_json::from_reader(reader)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for entry in raw {
            let tag: Tag = entry.tag.parse()?;
            if entries.insert(tag, entry.name).is_some() {
                return Err(Error::InvalidDictionary(format!("tag {} is listed twice", tag)));
            }
        }
        tracing::debug!("loaded {} private dictionary entries", entries.len());
        Ok(PrivateDictionary { entries })
    }

    pub fn insert(&mut self, tag: Tag, name: impl Into<String>) {
        self.entries.insert(tag, name.into());
    }

    pub fn get(&self, tag: Tag) -> Option<&str> {
        self.entries.get(&tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TagDictionary for PrivateDictionary {
    fn name(&self, tag: Tag) -> Result<String> {
        self.get(tag)
            .map(str::to_string)
            .ok_or(Error::TagNotFound(tag))
    }
}

/// Tries each dictionary in order; the first hit wins.
#[derive(Default)]
pub struct ChainedDictionary {
    dictionaries: Vec<Box<dyn TagDictionary + Send + Sync>>,
}

impl ChainedDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dictionary: impl TagDictionary + Send + Sync + 'static) -> Self {
        self.dictionaries.push(Box::new(dictionary));
        self
    }
}

impl TagDictionary for ChainedDictionary {
    fn name(&self, tag: Tag) -> Result<String> {
        self.dictionaries
            .iter()
            .find_map(|d| d.name(tag).ok())
            .ok_or(Error::TagNotFound(tag))
    }
}

/// Standard dictionary, preceded by a private one when a path is given.
pub fn load(private: Option<&Path>) -> Result<ChainedDictionary> {
    let mut chain = ChainedDictionary::new();
    if let Some(path) = private {
        chain = chain.with(PrivateDictionary::from_json_file(path)?);
    }
    Ok(chain.with(StandardDictionary))
}
