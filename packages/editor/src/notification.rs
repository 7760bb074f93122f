use crate::id::ItemId;
use crate::value::Value;

/// Observable document events, queued in the document outbox
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Items were added, removed, renamed or reparented
    StructureChanged,

    PropertyChanged {
        item: ItemId,
        property: String,
        old_value: Value,
    },

    SelectionChanged {
        old_selection: Vec<ItemId>,
    },

    /// A selected item changed one of its properties
    SelectionPropertyChanged {
        target: ItemId,
        property: String,
        old_value: Value,
    },
}

impl Notification {
    pub fn is_structural(&self) -> bool {
        matches!(self, Notification::StructureChanged)
    }
}
