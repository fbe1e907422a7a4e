//! STAC root Catalog.

use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::errors::StacError;
use crate::item::Item;
use crate::types::Link;
use crate::STAC_VERSION;

/// The root of a catalog tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    /// Type identifier (always "Catalog").
    #[serde(rename = "type")]
    pub type_: String,

    pub stac_version: String,

    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub description: String,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(skip)]
    pub children: Vec<Collection>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_: "Catalog".to_string(),
            stac_version: STAC_VERSION.to_string(),
            id: id.into(),
            title: None,
            description: description.into(),
            links: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attach a collection; ids must be unique among the children.
    pub fn add_child(&mut self, child: Collection) -> Result<(), StacError> {
        if self.children.iter().any(|c| c.id == child.id) {
            return Err(StacError::DuplicateId {
                id: child.id,
                parent: self.id.clone(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Every item of the tree, depth first.
    pub fn all_items(&self) -> Vec<&Item> {
        self.children.iter().flat_map(|c| c.all_items()).collect()
    }

    /// Every collection of the tree (pre-order).
    pub fn all_collections(&self) -> Vec<&Collection> {
        fn walk<'a>(c: &'a Collection, out: &mut Vec<&'a Collection>) {
            out.push(c);
            for child in &c.children {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        for child in &self.children {
            walk(child, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extent;
    use chrono::{TimeZone, Utc};
    use stac_common::{BoundingBox, TimeRange};

    fn collection(id: &str) -> Collection {
        let extent = Extent::new(
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            TimeRange::new(
                Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2018, 4, 22, 0, 0, 0).unwrap(),
            ),
        );
        Collection::new(id, id, extent)
    }

    #[test]
    fn test_all_collections_preorder() {
        let mut root = collection("root");
        root.add_child(collection("a")).unwrap();
        root.add_child(collection("b")).unwrap();

        let mut catalog = Catalog::new("nomad", "NOMAD");
        catalog.add_child(root).unwrap();

        let ids: Vec<&str> = catalog.all_collections().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "a", "b"]);
    }

    #[test]
    fn test_duplicate_collection_rejected() {
        let mut catalog = Catalog::new("nomad", "NOMAD");
        catalog.add_child(collection("root")).unwrap();
        assert!(catalog.add_child(collection("root")).is_err());
    }
}
