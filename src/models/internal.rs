use serde::{Deserialize, Serialize};

/// A catalog item held by the menu cache, annotated with its embedding.
///
/// Owned exclusively by `MenuCache`; immutable once cached, replaced
/// wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    /// Decimal kept as text so display never goes through float rounding.
    pub price: String,
    pub category: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Semantic vector from the embedding service. Same model as query
    /// embeddings; dimensions must match.
    pub embedding: Vec<f32>,
    pub upsell_rules: Vec<UpsellRule>,
}

impl MenuItem {
    /// Descriptive text fed to the embedding service when the cache is built.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} Category: {} Tags: {}",
            self.name,
            self.description,
            self.category,
            self.tags.join(" ")
        )
        .replace('\n', " ")
    }
}

/// Suggestion kind attached to an upsell rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UpsellKind {
    #[serde(rename = "cross-sell")]
    CrossSell,
    #[serde(rename = "upsell")]
    Upsell,
}

/// A cross-sell/upsell rule embedded in a `MenuItem`. Read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpsellRule {
    pub target_id: String,
    pub kind: UpsellKind,
}

/// Output-only upsell suggestion attached to a turn's response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpsellData {
    /// Target item IDs; always a singleton.
    pub items: Vec<String>,
    /// Human-readable trigger message shown to the user.
    pub message: String,
    pub kind: UpsellKind,
}

/// Flattened item view returned to the chat model from tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub description: String,
}

impl From<&MenuItem> for Suggestion {
    fn from(item: &MenuItem) -> Self {
        Suggestion {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price.clone(),
            category: item.category.clone(),
            description: if item.description.is_empty() {
                "No description available.".to_string()
            } else {
                item.description.clone()
            },
        }
    }
}
