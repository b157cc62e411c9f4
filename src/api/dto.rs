use serde::{Deserialize, Serialize};

use crate::models::internal::{UpsellData, UpsellKind};

// ==================== REQUEST DTOs ====================

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Generated server-side when absent; echoed back either way.
    pub session_id: Option<String>,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub recommended_ids: Vec<String>,
    pub upsell: Option<UpsellDto>,
}

#[derive(Debug, Serialize)]
pub struct UpsellDto {
    pub items: Vec<String>,
    pub message: String,
    pub kind: UpsellKind,
}

impl From<UpsellData> for UpsellDto {
    fn from(data: UpsellData) -> Self {
        UpsellDto {
            items: data.items,
            message: data.message,
            kind: data.kind,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub menu_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u32,
}
