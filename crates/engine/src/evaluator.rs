use common::Condition;

/// Whether `current_price` satisfies an alarm's condition.
///
/// Both directions include the boundary: an `Above` alarm at 50 000 fires
/// at exactly 50 000. NaN never satisfies either comparison.
pub fn is_triggered(condition: Condition, target_price: f64, current_price: f64) -> bool {
    match condition {
        Condition::Above => current_price >= target_price,
        Condition::Below => current_price <= target_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_fires_at_and_over_target() {
        assert!(is_triggered(Condition::Above, 50_000.0, 50_000.0));
        assert!(is_triggered(Condition::Above, 50_000.0, 50_000.01));
        assert!(!is_triggered(Condition::Above, 50_000.0, 49_999.99));
    }

    #[test]
    fn below_fires_at_and_under_target() {
        assert!(is_triggered(Condition::Below, 2_000.0, 2_000.0));
        assert!(is_triggered(Condition::Below, 2_000.0, 1_999.5));
        assert!(!is_triggered(Condition::Below, 2_000.0, 2_500.0));
    }

    #[test]
    fn nan_price_never_fires() {
        assert!(!is_triggered(Condition::Above, 1.0, f64::NAN));
        assert!(!is_triggered(Condition::Below, 1.0, f64::NAN));
    }
}
