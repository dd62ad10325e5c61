//! Numeric, bitvector, and collection lowering policies shared across every
//! backend. Each function here encodes the *policy*; a
//! backend supplies only the syntax (operator names, mask literal spelling)
//! around the values these functions compute.

/// The bitmask literal `2^width - 1`, used to keep bitvector arithmetic
/// within `width` bits after an operation on a wider native type.
pub fn mask_for_width(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// True when a bitvector of `width` backed by a native integer of
/// `native_backing` bits needs an explicit mask after arithmetic.
pub fn needs_mask(width: u32, native_backing: u32) -> bool {
    width < native_backing
}

/// Rotation is expanded to `(x << k) | (x >> (W − k))` with W-masking after
/// each shift. This returns the two shift amounts and
/// whether each shifted term needs masking; the backend supplies operator
/// syntax.
pub struct RotationPlan {
    pub left_shift: u32,
    pub right_shift: u32,
    pub mask_each_shift: bool,
}

pub fn rotate_left_plan(width: u32, by: u32, native_backing: Option<u32>) -> RotationPlan {
    let by = by % width.max(1);
    RotationPlan {
        left_shift: by,
        right_shift: width - by,
        mask_each_shift: native_backing.map(|k| needs_mask(width, k)).unwrap_or(true),
    }
}

pub fn rotate_right_plan(width: u32, by: u32, native_backing: Option<u32>) -> RotationPlan {
    rotate_left_plan(width, width.saturating_sub(by % width.max(1)), native_backing)
}

/// The source language's integer division/modulus is Euclidean, never the
/// target's native truncated behavior. This reports whether
/// the backend's native `/`/`%` already behaves Euclidean for the given
/// operand signs, or whether the driver must emit an adjustment.
///
/// A native truncating division matches Euclidean division exactly when the
/// divisor is statically known to be non-negative and... in general we
/// cannot tell signs statically from the RIR alone, so backends are
/// expected to always request the adjusted form unless they know (as C#,
/// Java, Go, JavaScript, Python%, and C++ all do for `%`/`/`) that their
/// native operator truncates toward zero; only Python's `%`/`//` already
/// floor, which is Euclidean for a positive divisor but not for a negative
/// one, so it still needs an adjustment in the general case.
pub fn native_division_is_euclidean() -> bool {
    false
}

/// Collection element types forbid bare (unsized) type-parameter elements
/// unless the backend's `trait_typed_collections` capability bit allows it
///. Returns `true` when the driver must reject the
/// instantiation.
pub fn rejects_unsized_element(element_is_unsized: bool, backend_allows_trait_typed: bool) -> bool {
    element_is_unsized && !backend_allows_trait_typed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_for_width_matches_2_to_the_w_minus_1() {
        assert_eq!(mask_for_width(8), 0xFF);
        assert_eq!(mask_for_width(1), 0b1);
        assert_eq!(mask_for_width(32), u32::MAX as u128);
    }

    #[test]
    fn rotation_plan_wraps_shift_amount_modulo_width() {
        let plan = rotate_left_plan(8, 3, Some(8));
        assert_eq!(plan.left_shift, 3);
        assert_eq!(plan.right_shift, 5);
        assert!(!plan.mask_each_shift);
    }

    #[test]
    fn rotation_plan_requires_mask_when_narrower_than_native_backing() {
        let plan = rotate_left_plan(5, 2, Some(8));
        assert!(plan.mask_each_shift);
    }

    #[test]
    fn unsized_element_rejected_unless_backend_allows_it() {
        assert!(rejects_unsized_element(true, false));
        assert!(!rejects_unsized_element(true, true));
        assert!(!rejects_unsized_element(false, false));
    }
}
