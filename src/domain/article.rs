// ============================================================
// Domain - Article
// ============================================================
// A titled text, the unit from which headline/body triplets
// are built for embedding training.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Headline
    pub title: String,

    /// Body text
    pub body: String,
}

impl Article {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body:  body.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.body
    }
}
