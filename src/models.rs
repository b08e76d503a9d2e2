use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Registered account. Owns zero or more shopping lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn new(name: &str, email: &str, password_hash: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Closed set of item categories. The "purchased" section shown on the detail
/// screen is not a category; it lives in `view::Section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Food,
    Beverages,
    Hygiene,
    Cleaning,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Food,
        Category::Beverages,
        Category::Hygiene,
        Category::Cleaning,
        Category::Other,
    ];

    /// Display name, also the key used for group ordering.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Beverages => "Beverages",
            Category::Hygiene => "Hygiene",
            Category::Cleaning => "Cleaning",
            Category::Other => "Other",
        }
    }

    /// Lossy decode for backend documents: unknown or reserved markers
    /// (e.g. "PURCHASED") fall back to `Other`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "FOOD" => Category::Food,
            "BEVERAGES" => Category::Beverages,
            "HYGIENE" => Category::Hygiene,
            "CLEANING" => Category::Cleaning,
            _ => Category::Other,
        }
    }
}

/// One entry of a shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub quantity: f64, // positive
    pub unit: String,  // free text, may be empty
    pub category: Category,
    pub purchased: bool,
}

impl Item {
    pub fn new(name: &str, quantity: f64, unit: &str, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            category,
            purchased: false,
        }
    }
}

/// A shopping list owned by exactly one user. The image itself lives in the
/// image store keyed by the list id; `image_ref` is an opaque caller hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub title: String,
    pub image_ref: Option<String>,
    pub items: Vec<Item>,
}

impl ShoppingList {
    pub fn new(title: &str, image_ref: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            image_ref,
            items: Vec::new(),
        }
    }
}
