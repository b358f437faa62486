use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a voucher's value is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VoucherKind {
    Percentage,
    Fixed,
}

/// Discount rule attached to a voucher line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoucherRule {
    pub kind: VoucherKind,
    /// Percent for `Percentage`, absolute amount for `Fixed`.
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
}

impl VoucherRule {
    /// Discount this rule contributes against a subtotal. An order below
    /// the minimum order value makes the voucher invalid: it contributes
    /// zero, it is not an error.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if let Some(min) = self.min_order_value {
            if subtotal < min {
                return Decimal::ZERO;
            }
        }

        let raw = match self.kind {
            VoucherKind::Percentage => subtotal * self.value / Decimal::from(100),
            VoucherKind::Fixed => self.value,
        };
        let capped = match self.max_discount {
            Some(cap) => raw.min(cap),
            None => raw,
        };
        capped.min(subtotal).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_discount_is_capped() {
        let rule = VoucherRule {
            kind: VoucherKind::Percentage,
            value: dec!(10),
            max_discount: Some(dec!(50000)),
            min_order_value: None,
        };
        assert_eq!(rule.discount_for(dec!(1000000)), dec!(50000));
        assert_eq!(rule.discount_for(dec!(300000)), dec!(30000));
    }

    #[test]
    fn below_minimum_order_value_contributes_zero() {
        let rule = VoucherRule {
            kind: VoucherKind::Percentage,
            value: dec!(10),
            max_discount: Some(dec!(50000)),
            min_order_value: Some(dec!(300000)),
        };
        assert_eq!(rule.discount_for(dec!(200000)), Decimal::ZERO);
        assert_eq!(rule.discount_for(dec!(300000)), dec!(30000));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let rule = VoucherRule {
            kind: VoucherKind::Fixed,
            value: dec!(80),
            max_discount: None,
            min_order_value: None,
        };
        assert_eq!(rule.discount_for(dec!(50)), dec!(50));
        assert_eq!(rule.discount_for(dec!(500)), dec!(80));
    }
}
