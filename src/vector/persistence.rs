//! Persistence for the index binary and its identifier-map sidecar.
//!
//! The two files are one logical unit. Loading either validates both or yields
//! nothing; saving stages both as temp files before renaming either into place.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, VectorStoreError};
use crate::vector::hnsw::HnswIndex;
use crate::vector::id_map::{IdMap, IdMapSidecar};

/// Locations of the two persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub index: PathBuf,
    pub map: PathBuf,
}

impl StorePaths {
    pub fn new(index: impl Into<PathBuf>, map: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            map: map.into(),
        }
    }

    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("vectors.hnsw"), dir.join("vectors.map.json"))
    }
}

pub enum LoadOutcome {
    Loaded { index: HnswIndex, ids: IdMap },
    /// Neither file exists.
    Missing,
    /// Something exists but could not be used; the whole pair is discarded.
    Corrupt(VectorStoreError),
}

/// Read both artifacts. Never partially hydrates: any failure on either file, or any
/// disagreement between them, is reported as [`LoadOutcome::Corrupt`].
pub fn load(paths: &StorePaths, dimension: usize) -> LoadOutcome {
    if !paths.index.exists() && !paths.map.exists() {
        return LoadOutcome::Missing;
    }
    match try_load(paths, dimension) {
        Ok((index, ids)) => LoadOutcome::Loaded { index, ids },
        Err(err) => LoadOutcome::Corrupt(err),
    }
}

fn try_load(paths: &StorePaths, dimension: usize) -> Result<(HnswIndex, IdMap)> {
    let file = File::open(&paths.index).map_err(|e| VectorStoreError::corrupt(&paths.index, e))?;
    let index = HnswIndex::read_from(BufReader::new(file))
        .map_err(|reason| VectorStoreError::corrupt(&paths.index, reason))?;

    let raw = fs::read(&paths.map).map_err(|e| VectorStoreError::corrupt(&paths.map, e))?;
    let sidecar: IdMapSidecar =
        serde_json::from_slice(&raw).map_err(|e| VectorStoreError::corrupt(&paths.map, e))?;
    let ids =
        IdMap::deserialize(sidecar).map_err(|reason| VectorStoreError::corrupt(&paths.map, reason))?;

    if index.dimension() != dimension {
        return Err(VectorStoreError::corrupt(
            &paths.index,
            format!(
                "index dimension {} does not match configured {dimension}",
                index.dimension()
            ),
        ));
    }

    let index_labels: HashSet<u64> = index.labels().collect();
    let map_labels: HashSet<u64> = ids.labels().collect();
    if index_labels != map_labels {
        return Err(VectorStoreError::corrupt(
            &paths.map,
            format!(
                "map covers {} labels, index holds {}; label sets differ",
                map_labels.len(),
                index_labels.len()
            ),
        ));
    }

    Ok((index, ids))
}

/// Write the index binary, then the sidecar. Missing parent directories are created.
///
/// Both files are staged next to their targets first; nothing is renamed unless both
/// staged cleanly, so a failed save leaves the previous pair untouched.
pub fn save(index: &HnswIndex, ids: &IdMap, paths: &StorePaths) -> Result<()> {
    for path in [&paths.index, &paths.map] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VectorStoreError::write(parent, e))?;
        }
    }

    let index_tmp = stage(&paths.index, |w| index.write_to(w))?;
    let map_tmp = match stage(&paths.map, |w| {
        serde_json::to_writer(&mut *w, &ids.serialize())?;
        Ok(())
    }) {
        Ok(tmp) => tmp,
        Err(err) => {
            let _ = fs::remove_file(&index_tmp);
            return Err(err);
        }
    };

    if let Err(e) = fs::rename(&index_tmp, &paths.index) {
        let _ = fs::remove_file(&index_tmp);
        let _ = fs::remove_file(&map_tmp);
        return Err(VectorStoreError::write(&paths.index, e));
    }
    if let Err(e) = fs::rename(&map_tmp, &paths.map) {
        let _ = fs::remove_file(&map_tmp);
        return Err(VectorStoreError::write(&paths.map, e));
    }
    Ok(())
}

/// Write a sibling temp file for `target` and fsync it. Returns the temp path.
fn stage(
    target: &Path,
    fill: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<PathBuf> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".into());
    let tmp = target.with_file_name(format!(".{name}.tmp-{}", uuid::Uuid::now_v7()));

    let written = File::create(&tmp).and_then(|file| {
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    });

    match written {
        Ok(()) => Ok(tmp),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(VectorStoreError::write(target, e))
        }
    }
}
