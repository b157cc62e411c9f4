//! Upstream catalog client: login, menu items, category tree.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::internal::{MenuItem, UpsellKind, UpsellRule};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Catalog API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Login rejected: no access token in response")]
    NoToken,
}

// Stalled upstreams must not hold a session hostage (single-digit seconds).
const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
}

impl CatalogClient {
    pub fn new(base_url: String, email: String, password: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            password,
        }
    }

    /// Exchanges the configured credentials for a bearer token. The token is
    /// requested fresh for every fetch; it is not cached across calls.
    async fn login(&self) -> Result<String, CatalogError> {
        let request = LoginRequest {
            email: &self.email,
            password: &self.password,
        };

        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .timeout(LOGIN_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: LoginResponse = response.json().await?;
        body.access_token.ok_or(CatalogError::NoToken)
    }

    /// Fetches the full menu. Items come back without embeddings; the cache
    /// fills those in.
    pub async fn fetch_menu_items(&self) -> Result<Vec<MenuItem>, CatalogError> {
        let token = self.login().await?;

        let response = self
            .client
            .get(format!("{}/menu-items", self.base_url))
            .bearer_auth(&token)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let items: Vec<ApiMenuItem> = response.json().await?;
        debug!(count = items.len(), "fetched menu items");

        Ok(items
            .into_iter()
            .filter(|i| !i.id.is_empty())
            .map(ApiMenuItem::into_menu_item)
            .collect())
    }

    /// Fetches the category tree and renders it as a bullet list: one line
    /// per top-level category, subcategories comma-joined in parentheses.
    pub async fn fetch_category_tree(&self) -> Result<String, CatalogError> {
        let token = self.login().await?;

        let response = self
            .client
            .get(format!("{}/categories", self.base_url))
            .bearer_auth(&token)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let categories: Vec<ApiCategory> = response.json().await?;
        Ok(render_category_tree(&categories))
    }
}

fn render_category_tree(categories: &[ApiCategory]) -> String {
    let mut lines = Vec::new();
    for cat in categories {
        // Subcategories are rendered under their parent, never as own lines.
        if cat.parent.is_some() {
            continue;
        }
        let subs: Vec<&str> = cat
            .subcategories
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        if subs.is_empty() {
            lines.push(format!("- {}", cat.name));
        } else {
            lines.push(format!("- {} ({})", cat.name, subs.join(", ")));
        }
    }
    lines.join("\n")
}

// ==================== Wire DTOs ====================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct ApiMenuItem {
    id: String,
    name: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    category: Option<ApiCategoryRef>,
    #[serde(default, rename = "upsellItems")]
    upsell_items: Vec<ApiUpsellRule>,
}

#[derive(Deserialize)]
struct ApiCategoryRef {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ApiUpsellRule {
    #[serde(rename = "upgradeProductId")]
    upgrade_product_id: Option<String>,
    #[serde(default = "default_upsell_type", rename = "upsellType")]
    upsell_type: String,
}

fn default_upsell_type() -> String {
    "cross-sell".to_string()
}

#[derive(Deserialize)]
struct ApiCategory {
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent: Option<serde_json::Value>,
    #[serde(default)]
    subcategories: Vec<ApiSubcategory>,
}

#[derive(Deserialize)]
struct ApiSubcategory {
    #[serde(default)]
    name: String,
}

impl ApiMenuItem {
    fn into_menu_item(self) -> MenuItem {
        let upsell_rules = self
            .upsell_items
            .into_iter()
            .filter_map(|rule| {
                let target_id = rule.upgrade_product_id?;
                let kind = if rule.upsell_type == "upsell" {
                    UpsellKind::Upsell
                } else {
                    UpsellKind::CrossSell
                };
                Some(UpsellRule { target_id, kind })
            })
            .collect();

        MenuItem {
            id: self.id,
            name: self.name,
            price: self.price,
            category: self
                .category
                .map(|c| c.name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Other".to_string()),
            description: self.description.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            embedding: Vec::new(),
            upsell_rules,
        }
    }
}
