//! On-disk layout of a catalog tree and href normalization.
//!
//! ```text
//! <root>/catalog.json
//! <root>/<collection>/collection.json
//! <root>/<collection>/<sub>/collection.json
//! <root>/<collection>/<sub>/<item>/<item>.json
//! ```

use std::path::{Component, Path, PathBuf};

use stac_protocol::{media_types, rel, Catalog, Collection, Item, Link};

use crate::config::HrefMode;
use crate::error::{IngestionError, Result};

pub const CATALOG_FILE: &str = "catalog.json";
pub const COLLECTION_FILE: &str = "collection.json";

pub fn catalog_path(root: &Path) -> PathBuf {
    root.join(CATALOG_FILE)
}

/// Collection document path under the directory of its parent.
pub fn collection_path(parent_dir: &Path, id: &str) -> PathBuf {
    parent_dir.join(id).join(COLLECTION_FILE)
}

/// Item document path under the directory of its collection.
pub fn item_path(collection_dir: &Path, id: &str) -> PathBuf {
    collection_dir.join(id).join(format!("{}.json", id))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}

/// Whether an href is a URL rather than a filesystem path.
pub fn is_url(href: &str) -> bool {
    href.contains("://")
}

/// Remove `.` components and resolve `..` lexically.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Absolute, cleaned version of `path`.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(clean_path(path));
    }
    let cwd = std::env::current_dir().map_err(|e| IngestionError::io(path, e))?;
    Ok(clean_path(&cwd.join(path)))
}

/// Relative href from the directory `from_dir` to the file `to`, with
/// `/` separators. Targets below `from_dir` start with `./`.
pub fn relative_href(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let target: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Rewrites every link and asset href of a catalog tree for one output
/// folder.
#[derive(Debug, Clone)]
pub struct HrefNormalizer {
    root: PathBuf,
    mode: HrefMode,
    asset_root: Option<PathBuf>,
}

impl HrefNormalizer {
    pub fn new(root: &Path, mode: HrefMode, asset_root: Option<&Path>) -> Result<Self> {
        Ok(Self {
            root: absolutize(root)?,
            mode,
            asset_root: asset_root.map(absolutize).transpose()?,
        })
    }

    fn href(&self, from_file: &Path, to: &Path) -> String {
        match self.mode {
            HrefMode::SelfContained => relative_href(parent_dir(from_file), to),
            HrefMode::Absolute => to.display().to_string(),
        }
    }

    /// Links that every object carries: root, and self in absolute mode.
    fn base_links(&self, own: &Path, catalog: &Path) -> Vec<Link> {
        let mut links = vec![Link::new(self.href(own, catalog), rel::ROOT).with_type(media_types::JSON)];
        if self.mode == HrefMode::Absolute {
            let type_ = if own.ends_with(CATALOG_FILE) || own.ends_with(COLLECTION_FILE) {
                media_types::JSON
            } else {
                media_types::GEO_JSON
            };
            links.push(Link::new(self.href(own, own), rel::SELF).with_type(type_));
        }
        links
    }

    /// Replace all links and asset hrefs in the tree.
    pub fn normalize(&self, catalog: &mut Catalog) -> Result<()> {
        let catalog_file = catalog_path(&self.root);
        let mut links = self.base_links(&catalog_file, &catalog_file);
        for child in &mut catalog.children {
            let child_file = collection_path(&self.root, &child.id);
            let mut link = Link::new(self.href(&catalog_file, &child_file), rel::CHILD)
                .with_type(media_types::JSON);
            if let Some(title) = &child.title {
                link = link.with_title(title.clone());
            }
            links.push(link);
            self.normalize_collection(child, &child_file, &catalog_file, &catalog_file)?;
        }
        catalog.links = links;
        Ok(())
    }

    fn normalize_collection(
        &self,
        collection: &mut Collection,
        own: &Path,
        parent: &Path,
        catalog: &Path,
    ) -> Result<()> {
        let dir = parent_dir(own).to_path_buf();
        let mut links = self.base_links(own, catalog);
        links.push(Link::new(self.href(own, parent), rel::PARENT).with_type(media_types::JSON));

        for child in &mut collection.children {
            let child_file = collection_path(&dir, &child.id);
            links.push(
                Link::new(self.href(own, &child_file), rel::CHILD).with_type(media_types::JSON),
            );
            self.normalize_collection(child, &child_file, own, catalog)?;
        }

        for item in &mut collection.items {
            let item_file = item_path(&dir, &item.id);
            links.push(
                Link::new(self.href(own, &item_file), rel::ITEM).with_type(media_types::GEO_JSON),
            );
            self.normalize_item(item, &item_file, own, catalog)?;
        }

        collection.links = links;
        Ok(())
    }

    fn normalize_item(
        &self,
        item: &mut Item,
        own: &Path,
        collection: &Path,
        catalog: &Path,
    ) -> Result<()> {
        let mut links = self.base_links(own, catalog);
        links.push(Link::new(self.href(own, collection), rel::PARENT).with_type(media_types::JSON));
        links.push(
            Link::new(self.href(own, collection), rel::COLLECTION).with_type(media_types::JSON),
        );
        item.links = links;

        let item_dir = parent_dir(own);
        for asset in item.assets.values_mut() {
            asset.href = self.asset_href(&asset.href, item_dir);
        }
        Ok(())
    }

    /// URLs pass through; relative paths are resolved against the asset
    /// root (and left alone without one); resolved paths follow the mode.
    pub fn asset_href(&self, href: &str, item_dir: &Path) -> String {
        if is_url(href) {
            return href.to_string();
        }
        let path = Path::new(href);
        let resolved = if path.is_absolute() {
            clean_path(path)
        } else {
            match &self.asset_root {
                Some(root) => clean_path(&root.join(path)),
                None => return href.to_string(),
            }
        };
        match self.mode {
            HrefMode::SelfContained => relative_href(item_dir, &resolved),
            HrefMode::Absolute => resolved.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let root = Path::new("/out");
        assert_eq!(catalog_path(root), Path::new("/out/catalog.json"));
        let col = collection_path(root, "10-days-lno");
        assert_eq!(col, Path::new("/out/10-days-lno/collection.json"));
        let item = item_path(parent_dir(&col), "scene");
        assert_eq!(item, Path::new("/out/10-days-lno/scene/scene.json"));
    }

    #[test]
    fn test_relative_href() {
        assert_eq!(
            relative_href(Path::new("/out"), Path::new("/out/a/collection.json")),
            "./a/collection.json"
        );
        assert_eq!(
            relative_href(Path::new("/out/a/b"), Path::new("/out/catalog.json")),
            "../../catalog.json"
        );
        assert_eq!(
            relative_href(Path::new("/out/a"), Path::new("/out/a/collection.json")),
            "./collection.json"
        );
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), Path::new("/a/c"));
        assert_eq!(clean_path(Path::new("../x")), Path::new("../x"));
    }

    #[test]
    fn test_asset_href_rules() {
        let normalizer =
            HrefNormalizer::new(Path::new("/out"), HrefMode::SelfContained, Some(Path::new("/data/raw")))
                .unwrap();
        let item_dir = Path::new("/out/col/sub/scene");

        assert_eq!(
            normalizer.asset_href("https://psa.esa.int/scene.h5", item_dir),
            "https://psa.esa.int/scene.h5"
        );
        assert_eq!(
            normalizer.asset_href("scene.h5", item_dir),
            "../../../../data/raw/scene.h5"
        );

        let absolute =
            HrefNormalizer::new(Path::new("/out"), HrefMode::Absolute, Some(Path::new("/data/raw")))
                .unwrap();
        assert_eq!(absolute.asset_href("h5/scene.h5", item_dir), "/data/raw/h5/scene.h5");

        let bare = HrefNormalizer::new(Path::new("/out"), HrefMode::Absolute, None).unwrap();
        assert_eq!(bare.asset_href("scene.h5", item_dir), "scene.h5");
    }
}
