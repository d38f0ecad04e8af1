//! Registry of compiled-in extension entry points.

use iman_plugin_sdk::ExtensionEntry;

/// Entry points artifacts may refer to by name.
#[derive(Debug, Clone, Default)]
pub struct ExtensionCatalog {
    entries: Vec<ExtensionEntry>,
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry point, replacing any existing entry with the same name.
    pub fn register(&mut self, entry: ExtensionEntry) -> &mut Self {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ExtensionEntry> for ExtensionCatalog {
    fn from_iter<I: IntoIterator<Item = ExtensionEntry>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for entry in iter {
            catalog.register(entry);
        }
        catalog
    }
}
