//! Output folder handling, catalog persistence and reloading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use stac_protocol::{rel, Catalog, Collection, Item, Link};
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::layout::{catalog_path, clean_path, collection_path, is_url, item_path};

/// Whether `dir` is missing or has no entries.
pub fn is_empty_dir(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(true);
    }
    let mut entries = fs::read_dir(dir).map_err(|e| IngestionError::io(dir, e))?;
    Ok(entries.next().is_none())
}

/// Make sure `dir` exists and is empty.
///
/// A non-empty folder is cleared when `clean` is set and rejected with
/// [`IngestionError::OutputNotEmpty`] otherwise, without touching it.
pub fn prepare_output(dir: &Path, clean: bool) -> Result<()> {
    if !is_empty_dir(dir)? {
        if !clean {
            warn!(
                folder = %dir.display(),
                "Output folder is not empty; pass the clean option to clear it"
            );
            return Err(IngestionError::OutputNotEmpty(dir.to_path_buf()));
        }
        warn!(folder = %dir.display(), "Clearing output folder");
        clear_dir(dir)?;
    }
    fs::create_dir_all(dir).map_err(|e| IngestionError::io(dir, e))
}

/// Remove every entry inside `dir`, keeping `dir` itself.
pub fn clear_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| IngestionError::io(dir, e))? {
        let entry = entry.map_err(|e| IngestionError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| IngestionError::io(&path, e))?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| IngestionError::io(&path, e))?;
    }
    Ok(())
}

fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| IngestionError::io(parent, e))?;
    }
    let bytes = serde_json::to_vec_pretty(document)?;
    fs::write(path, bytes).map_err(|e| IngestionError::io(path, e))?;
    debug!(path = %path.display(), "Wrote document");
    Ok(())
}

/// Write every object of the tree to its own file under `root`.
///
/// Stops at the first failed write. Returns the written paths in write
/// order (catalog first, then collections depth first, each followed by
/// its items).
pub fn write_catalog(catalog: &Catalog, root: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let path = catalog_path(root);
    write_document(&path, catalog)?;
    written.push(path);

    for collection in &catalog.children {
        write_collection(collection, root, &mut written)?;
    }

    info!(root = %root.display(), files = written.len(), "Catalog persisted");
    Ok(written)
}

fn write_collection(
    collection: &Collection,
    parent_dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = collection_path(parent_dir, &collection.id);
    write_document(&path, collection)?;
    let dir = parent_dir.join(&collection.id);
    written.push(path);

    for child in &collection.children {
        write_collection(child, &dir, written)?;
    }
    for item in &collection.items {
        let path = item_path(&dir, &item.id);
        write_document(&path, item)?;
        written.push(path);
    }
    Ok(())
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| IngestionError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn resolve_link(base_file: &Path, link: &Link) -> Option<PathBuf> {
    if is_url(&link.href) {
        return None;
    }
    let href = Path::new(&link.href);
    if href.is_absolute() {
        return Some(clean_path(href));
    }
    let base = base_file.parent().unwrap_or(Path::new(""));
    Some(clean_path(&base.join(href)))
}

fn links_of<'a>(links: &'a [Link], rel: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
    links.iter().filter(move |l| l.rel == rel)
}

/// Load a persisted tree back by following `child` and `item` links from
/// `<root>/catalog.json`.
pub fn read_catalog(root: &Path) -> Result<Catalog> {
    let path = catalog_path(root);
    let mut catalog: Catalog = read_document(&path)?;
    let links = catalog.links.clone();
    for link in links_of(&links, rel::CHILD) {
        if let Some(child) = resolve_link(&path, link) {
            catalog.children.push(read_collection(&child)?);
        }
    }
    Ok(catalog)
}

fn read_collection(path: &Path) -> Result<Collection> {
    let mut collection: Collection = read_document(path)?;
    let links = collection.links.clone();
    for link in links_of(&links, rel::CHILD) {
        if let Some(child) = resolve_link(path, link) {
            collection.children.push(read_collection(&child)?);
        }
    }
    for link in links_of(&links, rel::ITEM) {
        if let Some(item) = resolve_link(path, link) {
            let item: Item = read_document(&item)?;
            collection.items.push(item);
        }
    }
    Ok(collection)
}
