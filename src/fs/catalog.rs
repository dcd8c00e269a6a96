use chrono::{DateTime, Local};

/// One registered file: name, size and the head of its block chain.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub size_blocks: usize,
    pub head: Option<usize>,
    pub owner: String,
    pub created_at: DateTime<Local>,
    pub modified_at: DateTime<Local>,
}

impl FileEntry {
    pub fn new(name: &str, size_blocks: usize, owner: &str) -> Self {
        let now = Local::now();
        Self {
            name: name.to_string(),
            size_blocks,
            head: None,
            owner: owner.to_string(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// Flat name -> file table. Directory trees are the presentation layer's
/// concern; the core only needs lookup, insert and remove by name.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<FileEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut FileEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn insert(&mut self, entry: FileEntry) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<FileEntry> {
        let i = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(i))
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_find_remove() {
        let mut catalog = Catalog::new();
        catalog.insert(FileEntry::new("a.txt", 3, "user"));
        catalog.insert(FileEntry::new("b.txt", 1, "user"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find("a.txt").unwrap().size_blocks, 3);
        assert!(catalog.find("c.txt").is_none());
        let removed = catalog.remove("a.txt").unwrap();
        assert_eq!(removed.name, "a.txt");
        assert!(catalog.find("a.txt").is_none());
        assert_eq!(catalog.remove("a.txt").map(|e| e.name), None);
    }
}
