//! Single contextual cross-sell/upsell suggestion per turn.

use crate::models::internal::{UpsellData, UpsellKind};
use crate::storage::menu_cache::MenuSnapshot;

/// Stands in when the rule's target item is missing from the cache.
const FALLBACK_TARGET_NAME: &str = "a special option";

pub struct UpsellResolver;

impl UpsellResolver {
    /// Resolves at most one suggestion, scoped to the hero item — the first
    /// recommended ID. Rules on secondary recommendations are ignored so the
    /// suggestion stays singular.
    pub fn resolve(recommended_ids: &[String], snapshot: &MenuSnapshot) -> Option<UpsellData> {
        if snapshot.is_empty() {
            return None;
        }

        let hero_id = recommended_ids.first()?;
        let hero = snapshot.get(hero_id)?;
        let rule = hero.upsell_rules.first()?;

        let target_name = snapshot
            .get(&rule.target_id)
            .map(|item| item.name.as_str())
            .unwrap_or(FALLBACK_TARGET_NAME);

        let message = match rule.kind {
            UpsellKind::CrossSell => {
                format!("Chef's suggestion: {target_name} pairs well with that — want to add it?")
            }
            UpsellKind::Upsell => {
                format!("Tip: upgrade to {target_name} for the full experience!")
            }
        };

        Some(UpsellData {
            items: vec![rule.target_id.clone()],
            message,
            kind: rule.kind,
        })
    }
}
