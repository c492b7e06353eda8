use crate::backend::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// One of the fixed logical collections an item belongs to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    #[default]
    MyDrive,
    Starred,
    Trash,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::MyDrive => "myDrive",
            View::Starred => "starred",
            View::Trash => "trash",
        }
    }

    /// Heading shown above the item table.
    pub fn title(&self) -> &'static str {
        match self {
            View::MyDrive => "My Drive",
            View::Starred => "Starred",
            View::Trash => "Trash",
        }
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for View {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "myDrive" => Ok(View::MyDrive),
            "starred" => Ok(View::Starred),
            "trash" => Ok(View::Trash),
            _ => Err(BackendError::InvalidRecord(format!("{s}: unknown view"))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    File,
    Folder,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }
}

impl FromStr for ItemKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ItemKind::File),
            "folder" => Ok(ItemKind::Folder),
            _ => Err(BackendError::InvalidRecord(format!("{s}: unknown item kind"))),
        }
    }
}

/// A file or folder record as held by the row store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: uuid::Uuid,
    pub name: String,
    pub kind: ItemKind,
    pub last_modified: DateTime<Utc>,
    pub view: View,

    /// Storage location of the uploaded blob. Only present for uploaded files.
    pub file_path: Option<String>,

    pub owner_id: String,
}

impl Item {
    /// Whether a blob can be retrieved for this item.
    pub fn is_downloadable(&self) -> bool {
        self.kind == ItemKind::File && self.file_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Insert payload, the row store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub kind: ItemKind,
    pub last_modified: DateTime<Utc>,
    pub view: View,
    pub file_path: Option<String>,
    pub owner_id: String,
}

impl NewItem {
    pub fn with_id(self, id: uuid::Uuid) -> Item {
        let NewItem {
            name,
            kind,
            last_modified,
            view,
            file_path,
            owner_id,
        } = self;

        Item {
            id,
            name,
            kind,
            last_modified,
            view,
            file_path,
            owner_id,
        }
    }
}

/// Row as stored in the `items` table.
#[derive(Debug, sqlx::FromRow)]
pub struct ItemRow {
    pub id: uuid::Uuid,
    pub name: String,
    pub kind: String,
    pub view: String,
    pub file_path: Option<String>,
    pub owner_id: String,
    pub last_modified: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = BackendError;

    fn try_from(value: ItemRow) -> Result<Self, Self::Error> {
        let ItemRow {
            id,
            name,
            kind,
            view,
            file_path,
            owner_id,
            last_modified,
        } = value;

        Ok(Self {
            id,
            name,
            kind: kind.parse()?,
            last_modified,
            view: view.parse()?,
            file_path,
            owner_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_serializes_camel_case() {
        assert_eq!("\"myDrive\"", serde_json::to_string(&View::MyDrive).unwrap());
        assert_eq!(View::Trash, serde_json::from_str("\"trash\"").unwrap());
        assert_eq!(View::Starred, "starred".parse().unwrap());
        assert!("Trash".parse::<View>().is_err());
    }

    #[test]
    fn row_with_unknown_kind_is_rejected() {
        let row = ItemRow {
            id: uuid::Uuid::new_v4(),
            name: "x".to_string(),
            kind: "symlink".to_string(),
            view: "myDrive".to_string(),
            file_path: None,
            owner_id: "alice".to_string(),
            last_modified: Utc::now(),
        };
        assert!(matches!(
            Item::try_from(row),
            Err(BackendError::InvalidRecord(_))
        ));
    }

    #[test]
    fn only_files_with_path_are_downloadable() {
        let mut item = NewItem {
            name: "report.pdf".to_string(),
            kind: ItemKind::File,
            last_modified: Utc::now(),
            view: View::MyDrive,
            file_path: None,
            owner_id: "alice".to_string(),
        }
        .with_id(uuid::Uuid::new_v4());

        assert!(!item.is_downloadable());

        item.file_path = Some(String::new());
        assert!(!item.is_downloadable());

        item.file_path = Some("alice/myDrive/report.pdf".to_string());
        assert!(item.is_downloadable());

        item.kind = ItemKind::Folder;
        assert!(!item.is_downloadable());
    }
}
