//! # Playlist Store
//!
//! Named snapshots of a queue, kept in memory and mirrored to a single JSON
//! file shaped as `{ "<name>": [{ "url", "title", "artist" }, ...] }`.
//!
//! The file is read once at startup and fully rewritten on every save.
//! Writes go to a temporary file in the same directory which then replaces
//! the old one, so a crash mid-write never leaves half a file behind.

use crate::error::{Error, Result};
use crate::track::Track;
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

type Playlists = BTreeMap<String, Vec<Track>>;

#[derive(Debug)]
pub struct PlaylistStore {
    path: PathBuf,
    playlists: Playlists,
}

impl PlaylistStore {
    /// Load the store from `path`.
    ///
    /// A missing file is created holding an empty mapping. An empty or
    /// unreadable file is logged and treated as empty; it is overwritten by
    /// the next save.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if a missing file cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            info!("Creating playlist file at {}", path.display());
            let store = Self {
                path,
                playlists: Playlists::new(),
            };
            store.persist()?;
            return Ok(store);
        }

        let playlists = match read_playlists(&path) {
            Ok(playlists) => playlists,
            Err(e) => {
                error!("Error reading playlists file {}: {e}", path.display());
                Playlists::new()
            }
        };
        debug!("Loaded {} playlists from {}", playlists.len(), path.display());

        Ok(Self { path, playlists })
    }

    /// Save a copy of `tracks` under `name`, replacing any previous entry,
    /// and rewrite the file.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] if `name` is empty or whitespace.
    /// - [`Error::Persistence`] / [`Error::Encode`] if the file cannot be
    ///   written. The in-memory mapping is rolled back in that case.
    pub fn save(&mut self, name: &str, tracks: &[Track]) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidName);
        }

        let previous = self.playlists.insert(name.to_string(), tracks.to_vec());
        if let Err(e) = self.persist() {
            match previous {
                Some(old) => self.playlists.insert(name.to_string(), old),
                None => self.playlists.remove(name),
            };
            return Err(e);
        }

        info!("Saved playlist \"{name}\" ({} tracks)", tracks.len());
        Ok(())
    }

    /// A copy of the playlist stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such playlist exists.
    pub fn load(&self, name: &str) -> Result<Vec<Track>> {
        self.playlists
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("playlist \"{name}\"")))
    }

    /// Saved playlist names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.playlists.keys().cloned().collect()
    }

    /// Names with their track counts, sorted by name.
    pub fn summary(&self) -> Vec<(String, usize)> {
        self.playlists
            .iter()
            .map(|(name, tracks)| (name.clone(), tracks.len()))
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.playlists)?;
        let persistence = |source: std::io::Error| Error::Persistence {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(persistence)?;

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(persistence)?;
        file.write_all(json.as_bytes()).map_err(persistence)?;
        file.as_file().sync_all().map_err(persistence)?;
        file.persist(&self.path).map_err(|e| persistence(e.error))?;
        Ok(())
    }
}

fn read_playlists(path: &Path) -> anyhow::Result<Playlists> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Playlists::new());
    }
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn track(name: &str) -> Track {
        Track::new(format!("https://youtu.be/{name}"), name, "Artist")
    }

    fn temp_store() -> anyhow::Result<(TempDir, PlaylistStore)> {
        let dir = tempfile::tempdir()?;
        let store = PlaylistStore::open(dir.path().join("playlists.json"))?;
        Ok((dir, store))
    }

    #[test]
    fn test_open_creates_empty_file() -> anyhow::Result<()> {
        let (dir, store) = temp_store()?;
        assert!(store.is_empty());

        let content = fs::read_to_string(dir.path().join("playlists.json"))?;
        assert_eq!(content.trim(), "{}");
        Ok(())
    }

    #[test]
    fn test_save_then_load_returns_copy() -> anyhow::Result<()> {
        let (_dir, mut store) = temp_store()?;
        store.save("x", &[track("A"), track("B")])?;

        let mut loaded = store.load("x")?;
        assert_eq!(loaded, vec![track("A"), track("B")]);

        loaded.push(track("C"));
        loaded.remove(0);
        assert_eq!(store.load("x")?, vec![track("A"), track("B")]);
        Ok(())
    }

    #[test]
    fn test_save_overwrites_and_persists() -> anyhow::Result<()> {
        let (dir, mut store) = temp_store()?;
        store.save("mix", &[track("A")])?;
        store.save("mix", &[track("B"), track("C")])?;
        store.save("other", &[])?;

        let reopened = PlaylistStore::open(dir.path().join("playlists.json"))?;
        assert_eq!(reopened.load("mix")?, vec![track("B"), track("C")]);
        assert_eq!(reopened.load("other")?, Vec::<Track>::new());
        assert_eq!(reopened.names(), vec!["mix".to_string(), "other".to_string()]);
        assert_eq!(reopened.summary(), vec![("mix".to_string(), 2), ("other".to_string(), 0)]);
        Ok(())
    }

    #[test]
    fn test_file_layout() -> anyhow::Result<()> {
        let (dir, mut store) = temp_store()?;
        store.save("x", &[track("A")])?;

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("playlists.json"))?)?;
        assert_eq!(raw["x"][0]["title"], "A");
        assert_eq!(raw["x"][0]["url"], "https://youtu.be/A");
        assert_eq!(raw["x"][0]["artist"], "Artist");
        Ok(())
    }

    #[test]
    fn test_empty_name_rejected() -> anyhow::Result<()> {
        let (_dir, mut store) = temp_store()?;
        assert!(matches!(store.save("", &[track("A")]), Err(Error::InvalidName)));
        assert!(matches!(store.save("   ", &[track("A")]), Err(Error::InvalidName)));
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_playlist() -> anyhow::Result<()> {
        let (_dir, store) = temp_store()?;
        assert!(matches!(store.load("nope"), Err(Error::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_corrupt_file_starts_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("playlists.json");
        fs::write(&path, "{ not json")?;

        let mut store = PlaylistStore::open(&path)?;
        assert!(store.is_empty());

        store.save("fresh", &[track("A")])?;
        assert_eq!(PlaylistStore::open(&path)?.load("fresh")?, vec![track("A")]);
        Ok(())
    }

    #[test]
    fn test_empty_file_is_empty_mapping() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("playlists.json");
        fs::write(&path, "")?;
        assert!(PlaylistStore::open(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_write_rolls_back() -> anyhow::Result<()> {
        let (dir, mut store) = temp_store()?;
        store.save("keep", &[track("A")])?;

        // Point the store at a path whose parent is a regular file
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "")?;
        store.path = blocker.join("playlists.json");

        let err = store.save("new", &[track("B")]).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert!(matches!(store.load("new"), Err(Error::NotFound(_))));

        let err = store.save("keep", &[track("C")]).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(store.load("keep")?, vec![track("A")]);
        Ok(())
    }
}
