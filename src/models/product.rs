use std::{
    collections::{HashMap, HashSet},
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// A single name/value attribute attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub name: String,
    pub value: String,
}

impl ProductAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A persisted product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
}

/// Immutable snapshot of a product's externally relevant fields.
///
/// Handed to rule evaluation so that it can never mutate persisted state.
/// Two snapshots are equal (and hash equally) when their ids match,
/// regardless of name or attributes.
#[derive(Debug, Clone, Serialize)]
pub struct ReadOnlyProduct {
    id: String,
    name: String,
    attributes: HashMap<String, String>,
}

impl ReadOnlyProduct {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: HashMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Snapshot a set of products, collapsing duplicates by id.
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a Product>) -> HashSet<Self> {
        products.into_iter().map(Self::from).collect()
    }
}

impl From<&Product> for ReadOnlyProduct {
    fn from(product: &Product) -> Self {
        // Later duplicates win, matching insertion order into a map
        let attributes = product
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            attributes,
        }
    }
}

impl PartialEq for ReadOnlyProduct {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ReadOnlyProduct {}

impl Hash for ReadOnlyProduct {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
