use crate::CoreError;

/// Reject NaN and infinities before they reach a backend command string.
pub fn ensure_finite(v: f64, what: &'static str) -> Result<f64, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(f64::NAN, "b_max").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
        assert!(msg.contains("b_max"));
    }

    #[test]
    fn ensure_finite_rejects_infinity() {
        assert!(ensure_finite(f64::NEG_INFINITY, "y_offset").is_err());
        assert_eq!(ensure_finite(-7.5e-6, "y_offset"), Ok(-7.5e-6));
    }

    proptest! {
        #[test]
        fn passes_exactly_the_finite_values(v in any::<f64>()) {
            match ensure_finite(v, "value") {
                Ok(out) => prop_assert_eq!(out.to_bits(), v.to_bits()),
                Err(CoreError::NonFinite { value, .. }) => {
                    prop_assert!(!v.is_finite());
                    prop_assert_eq!(value.to_bits(), v.to_bits());
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
