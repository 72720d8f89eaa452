use serde::{Deserialize, Serialize};

/// A move as submitted by a client: either explicit squares (`e2`, `e4`,
/// optional promotion piece) or a single notation string, SAN (`Nf3`,
/// `exd5`, `O-O`) or coordinate (`e2e4`, `e7e8q`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveRequest {
    Squares {
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
    Notation(String),
}

impl MoveRequest {
    pub fn squares(from: &str, to: &str) -> Self {
        MoveRequest::Squares {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn with_promotion(from: &str, to: &str, promotion: &str) -> Self {
        MoveRequest::Squares {
            from: from.to_string(),
            to: to.to_string(),
            promotion: Some(promotion.to_string()),
        }
    }

    pub fn notation(text: &str) -> Self {
        MoveRequest::Notation(text.to_string())
    }
}
