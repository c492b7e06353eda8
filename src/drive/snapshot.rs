use crate::{
    backend::Principal,
    item::{filter, Item, ItemKind, View},
};
use serde::Serialize;

/// Outcome of resolving the current session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "principal", rename_all = "camelCase")]
pub enum SessionGate {
    #[default]
    Resolving,
    Authenticated(Principal),
    Anonymous,
}

impl SessionGate {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionGate::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

/// State of the "New" dialog.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CreateDialog {
    pub open: bool,
    pub name: String,
    pub kind: ItemKind,
}

/// Progress of the most recent mutation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum MutationStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

/// Immutable copy of everything the drive page renders from.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub session: SessionGate,
    pub view: View,
    pub query: String,
    pub items: Vec<Item>,
    pub error: Option<String>,
    pub loading: bool,
    pub dragging: bool,
    pub dialog: CreateDialog,
    pub status: MutationStatus,
}

impl Snapshot {
    pub fn principal(&self) -> Option<&Principal> {
        self.session.principal()
    }

    /// Items matching the search text that belong to the signed in user and the active view.
    pub fn visible_items(&self) -> Vec<&Item> {
        let Some(principal) = self.principal() else {
            return vec![];
        };

        filter(&self.items, &self.query)
            .into_iter()
            .filter(|item| item.view == self.view && item.owner_id == principal.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewItem;
    use chrono::Utc;

    fn item(name: &str, view: View, owner: &str) -> Item {
        NewItem {
            name: name.to_string(),
            kind: ItemKind::File,
            last_modified: Utc::now(),
            view,
            file_path: None,
            owner_id: owner.to_string(),
        }
        .with_id(uuid::Uuid::new_v4())
    }

    fn snapshot(view: View, query: &str) -> Snapshot {
        Snapshot {
            session: SessionGate::Authenticated(Principal::new("alice")),
            view,
            query: query.to_string(),
            items: vec![
                item("report.pdf", View::MyDrive, "alice"),
                item("old_report.docx", View::Trash, "alice"),
                item("starred report", View::Starred, "alice"),
                item("report-bob.pdf", View::MyDrive, "bob"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn other_views_never_visible() {
        for query in ["", "report", "REPORT", "pdf", "x"] {
            for view in [View::MyDrive, View::Starred, View::Trash] {
                let snapshot = snapshot(view, query);
                assert!(
                    snapshot.visible_items().iter().all(|i| i.view == view),
                    "{view} {query:?}"
                );
            }
        }
    }

    #[test]
    fn other_owners_never_visible() {
        let snapshot = snapshot(View::MyDrive, "report");
        let visible = snapshot.visible_items();
        assert_eq!(1, visible.len());
        assert_eq!("report.pdf", visible[0].name);
    }

    #[test]
    fn nothing_visible_without_session() {
        let mut snapshot = snapshot(View::MyDrive, "");
        snapshot.session = SessionGate::Anonymous;
        assert!(snapshot.visible_items().is_empty());
    }
}
