//! STAC Collections.

use serde::{Deserialize, Serialize};

use crate::errors::StacError;
use crate::item::Item;
use crate::types::{Extent, Link, Properties};
use crate::STAC_VERSION;

/// Default license of NOMAD derived products.
pub const DEFAULT_LICENSE: &str = "CC-BY-SA-4.0";

/// A named, extent-bounded group of items or sub-collections.
///
/// Children are owned by the collection and are not serialized inline;
/// they are written as separate documents and referenced through links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    /// Type identifier (always "Collection").
    #[serde(rename = "type")]
    pub type_: String,

    pub stac_version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,

    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub description: String,

    pub license: String,

    pub extent: Extent,

    /// Extension summaries; every value is a list of possible values.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub summaries: Properties,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(skip)]
    pub children: Vec<Collection>,

    #[serde(skip)]
    pub items: Vec<Item>,
}

impl Collection {
    pub fn new(id: impl Into<String>, description: impl Into<String>, extent: Extent) -> Self {
        Self {
            type_: "Collection".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            title: None,
            description: description.into(),
            license: DEFAULT_LICENSE.to_string(),
            extent,
            summaries: Properties::new(),
            links: Vec::new(),
            children: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add an item, taking ownership and stamping the collection id on it.
    pub fn add_item(&mut self, mut item: Item) -> Result<(), StacError> {
        if !self.children.is_empty() {
            return Err(StacError::MixedChildren(self.id.clone()));
        }
        item.collection = Some(self.id.clone());
        self.items.push(item);
        Ok(())
    }

    /// Add a sub-collection, taking ownership.
    pub fn add_child(&mut self, child: Collection) -> Result<(), StacError> {
        if !self.items.is_empty() {
            return Err(StacError::MixedChildren(self.id.clone()));
        }
        if self.children.iter().any(|c| c.id == child.id) {
            return Err(StacError::DuplicateId {
                id: child.id,
                parent: self.id.clone(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Items of this collection and of every descendant, depth first.
    pub fn all_items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.iter().collect();
        for child in &self.children {
            items.extend(child.all_items());
        }
        items
    }
}
