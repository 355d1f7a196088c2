use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One extracted (or manually entered) expense row awaiting user review.
///
/// Produced by the external analysis collaborator or entered by hand; the
/// user may edit or remove items during review. The derived `amount` is
/// `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub amount: Decimal,
    /// Extraction confidence in [0, 1]. Manually entered rows use 1.0.
    pub confidence: f32,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit: Option<String>,
        unit_price: Decimal,
        confidence: f32,
    ) -> Self {
        LineItem {
            description: description.into(),
            quantity,
            unit,
            unit_price,
            amount: quantity * unit_price,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Recompute the derived amount after an edit.
    pub fn recompute_amount(&mut self) {
        self.amount = self.quantity * self.unit_price;
    }

    /// A row is committable when its derived amount is positive.
    pub fn has_positive_amount(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}
