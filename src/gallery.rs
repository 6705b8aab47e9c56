use std::collections::BTreeMap;

/// One enrolled face: the person's display name and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub name: String,
    pub embedding: Vec<f32>,
}

impl GalleryEntry {
    pub fn new(name: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            embedding,
        }
    }
}

/// Known faces in enrollment order. Built once, then only read.
///
/// Names need not be unique: several photos of one person give several
/// entries under the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn from_entries(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &GalleryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count per person, sorted by name.
    pub fn people(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.name.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<GalleryEntry> for Gallery {
    fn from_iter<I: IntoIterator<Item = GalleryEntry>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}
