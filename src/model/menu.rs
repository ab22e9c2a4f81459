use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::OrderKind;

/// One entry of a menu. Orders carry full copies of the items they were built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, emoji: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emoji: emoji.into(),
            category: category.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An ordered list of menu items, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn find(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The drink and food menus offered to guests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuBook {
    #[serde(default)]
    pub drinks: Menu,
    #[serde(default)]
    pub food: Menu,
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Failed to read menu file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed menu: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl MenuBook {
    pub fn from_json(raw: &str) -> Result<Self, MenuError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads a menu book from a JSON file shaped like `{"drinks": [...], "food": [...]}`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MenuError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| MenuError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn for_kind(&self, kind: OrderKind) -> &Menu {
        match kind {
            OrderKind::Drink => &self.drinks,
            OrderKind::Food => &self.food,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_book_from_json() {
        let raw = r#"{
            "drinks": [
                {"name": "Moscow Mule", "emoji": "🥃", "category": "Classic", "recipe": ""}
            ],
            "food": [
                {"name": "Miso Salmon", "emoji": "🐟", "category": "Entree", "price": "Free.99"}
            ]
        }"#;
        let book = MenuBook::from_json(raw).unwrap();

        let mule = book.for_kind(OrderKind::Drink).find("Moscow Mule").unwrap();
        assert_eq!(mule.category, "Classic");
        assert!(mule.description.is_empty());
        assert!(book.for_kind(OrderKind::Food).find("Moscow Mule").is_none());
        assert_eq!(book.food.items().len(), 1);
    }

    #[test]
    fn test_missing_section_is_empty() {
        let book = MenuBook::from_json(r#"{"drinks": []}"#).unwrap();
        assert!(book.food.is_empty());
        assert!(matches!(
            MenuBook::from_json("[1, 2]"),
            Err(MenuError::Malformed(_))
        ));
    }
}
