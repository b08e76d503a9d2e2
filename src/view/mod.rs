use crate::models::{Category, Item, ShoppingList};

pub mod grouping;
pub mod projector;

pub use grouping::{build_rows, filter_lists};
pub use projector::ViewProjector;

/// Section label in the grouped detail view. `Purchased` exists only here;
/// items themselves always carry a real category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Category(Category),
    Purchased,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Category(category) => category.label(),
            Section::Purchased => "Purchased",
        }
    }
}

/// One renderable unit of the detail screen, matched exhaustively at render
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Header(Section),
    Item(Item),
}

/// Immutable view state for the lists screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListsUiState {
    pub all: Vec<ShoppingList>,
    pub filtered: Vec<ShoppingList>,
    pub query: String,
}

/// Immutable view state for the list detail screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsUiState {
    pub all: Vec<Item>,
    pub rows: Vec<Row>,
    pub query: String,
}
