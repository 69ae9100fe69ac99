//! Confidence scoring for successful responses.

use serde_json::Value;

/// Scores module output in `[0.0, 1.0]`.
pub trait ConfidenceStrategy: Send + Sync {
    fn score(&self, data: &Value) -> f64;
}

/// Short or missing output is low confidence; anything else is high.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthHeuristic {
    pub min_chars: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for LengthHeuristic {
    fn default() -> Self {
        Self {
            min_chars: 10,
            low: 0.3,
            high: 0.8,
        }
    }
}

impl ConfidenceStrategy for LengthHeuristic {
    fn score(&self, data: &Value) -> f64 {
        match data {
            Value::Null => self.low,
            Value::String(s) if s.chars().count() < self.min_chars => self.low,
            _ => self.high,
        }
    }
}
