//! 4-bit arithmetic with an explicit carry/link bit.
//!
//! Every function here is pure: it takes the operands and the incoming
//! carry and returns the masked result together with the outgoing carry.
//! The instruction executor decides which of the two it commits.

use crate::nibble::Nibble;

/// Add with carry-in, returning `(result, carry_out)`.
///
/// `carry_out` is set when the unmasked sum exceeds 15.
#[inline]
pub fn add(a: Nibble, b: Nibble, carry_in: bool) -> (Nibble, bool) {
    let sum = a.value() + b.value() + u8::from(carry_in);
    (Nibble::new(sum), sum > 0x0F)
}

/// Subtract with borrow, returning `(result, carry_out)`.
///
/// The hardware adds the one's complement of `b` and the complement of the
/// incoming carry: `a + !b + !carry_in`. Consequently a set carry going in
/// is a pending borrow, and the carry coming out is **cleared when a borrow
/// occurred** (`a < b + carry_in`) and set otherwise.
#[inline]
pub fn subtract(a: Nibble, b: Nibble, carry_in: bool) -> (Nibble, bool) {
    let sum = a.value() + (!b.value() & Nibble::MASK) + u8::from(!carry_in);
    (Nibble::new(sum), sum > 0x0F)
}

/// Increment, returning `(result, overflow)`.
#[inline]
pub fn increment(a: Nibble) -> (Nibble, bool) {
    add(a, Nibble::new(1), false)
}

/// Decrement, returning `(result, no_borrow)`.
///
/// Follows the subtract convention: the flag is cleared only when `a`
/// was zero and the result wrapped to 15.
#[inline]
pub fn decrement(a: Nibble) -> (Nibble, bool) {
    (Nibble::new(a.value().wrapping_sub(1)), !a.is_zero())
}

/// Rotate left through carry: bit 3 moves into the carry, the old carry
/// enters bit 0.
#[inline]
pub fn rotate_left(a: Nibble, carry: bool) -> (Nibble, bool) {
    (Nibble::new((a.value() << 1) | u8::from(carry)), a.bit(3))
}

/// Rotate right through carry: bit 0 moves into the carry, the old carry
/// enters bit 3.
#[inline]
pub fn rotate_right(a: Nibble, carry: bool) -> (Nibble, bool) {
    (Nibble::new((a.value() >> 1) | (u8::from(carry) << 3)), a.bit(0))
}

/// One's complement.
#[inline]
pub fn complement(a: Nibble) -> Nibble {
    Nibble::new(!a.value())
}

/// Decimal adjust after BCD addition.
///
/// Adds 6 when the value is above 9 or the carry is set. The carry is set
/// if that addition overflows and is otherwise left as it was.
pub fn decimal_adjust(a: Nibble, carry: bool) -> (Nibble, bool) {
    if a.value() > 9 || carry {
        let sum = a.value() + 6;
        (Nibble::new(sum), carry || sum > 0x0F)
    } else {
        (a, carry)
    }
}

/// Keyboard process: convert a one-hot value to its bit position + 1.
///
/// 0 stays 0; 1, 2, 4, 8 become 1, 2, 3, 4; any other pattern (more than
/// one key down) yields 15.
pub fn keyboard_process(a: Nibble) -> Nibble {
    let code = match a.value() {
        0b0000 => 0,
        0b0001 => 1,
        0b0010 => 2,
        0b0100 => 3,
        0b1000 => 4,
        _ => 15,
    };
    Nibble::new(code)
}

/// Transfer carry subtract: 10 when the carry is set, 9 otherwise.
///
/// Used to build the BCD nine's/ten's complement in decimal subtraction.
#[inline]
pub fn transfer_carry_subtract(carry: bool) -> Nibble {
    Nibble::new(if carry { 10 } else { 9 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn n(v: u8) -> Nibble {
        Nibble::new(v)
    }

    #[test]
    fn test_add_truth_table() {
        for a in 0..16u8 {
            for b in 0..16u8 {
                for c in [false, true] {
                    let full = a + b + u8::from(c);
                    let (r, carry) = add(n(a), n(b), c);
                    assert_eq!(r.value(), full % 16, "{a}+{b}+{c}");
                    assert_eq!(carry, full > 15, "{a}+{b}+{c}");
                }
            }
        }
    }

    #[test]
    fn test_subtract_truth_table() {
        // 256 operand pairs x 2 carry states.
        for a in 0..16i16 {
            for b in 0..16i16 {
                for c in [false, true] {
                    let diff = a - b - i16::from(c);
                    let borrowed = diff < 0;
                    let (r, carry) = subtract(n(a as u8), n(b as u8), c);
                    assert_eq!(i16::from(r.value()), diff.rem_euclid(16), "{a}-{b}-{c}");
                    assert_eq!(carry, !borrowed, "{a}-{b}-{c}");
                }
            }
        }
    }

    #[test]
    fn test_subtract_borrow_sense_is_inverted() {
        assert_eq!(subtract(n(5), n(3), false), (n(2), true));
        assert_eq!(subtract(n(3), n(5), false), (n(14), false));
        assert_eq!(subtract(n(5), n(5), true), (n(15), false));
        assert_eq!(subtract(n(0), n(0), false), (n(0), true));
    }

    #[test]
    fn test_increment_decrement() {
        assert_eq!(increment(n(15)), (n(0), true));
        assert_eq!(increment(n(7)), (n(8), false));
        assert_eq!(decrement(n(0)), (n(15), false));
        assert_eq!(decrement(n(8)), (n(7), true));
    }

    #[test]
    fn test_rotates_through_carry() {
        assert_eq!(rotate_left(n(0b1001), false), (n(0b0010), true));
        assert_eq!(rotate_left(n(0b0001), true), (n(0b0011), false));
        assert_eq!(rotate_right(n(0b1001), false), (n(0b0100), true));
        assert_eq!(rotate_right(n(0b0010), true), (n(0b1001), false));
    }

    #[test]
    fn test_decimal_adjust() {
        assert_eq!(decimal_adjust(n(9), false), (n(9), false));
        assert_eq!(decimal_adjust(n(12), false), (n(2), true));
        assert_eq!(decimal_adjust(n(3), true), (n(9), true));
        assert_eq!(decimal_adjust(n(5), false), (n(5), false));
    }

    #[test]
    fn test_keyboard_process() {
        let expected = [0, 1, 2, 15, 3, 15, 15, 15, 4, 15, 15, 15, 15, 15, 15, 15];
        for (v, want) in expected.iter().enumerate() {
            assert_eq!(keyboard_process(n(v as u8)).value(), *want, "KBP {v}");
        }
    }

    #[test]
    fn test_transfer_carry_subtract() {
        assert_eq!(transfer_carry_subtract(true).value(), 10);
        assert_eq!(transfer_carry_subtract(false).value(), 9);
    }

    proptest! {
        #[test]
        fn prop_rotate_left_then_right_restores(a in 0u8..16, c in any::<bool>()) {
            let (r, c1) = rotate_left(n(a), c);
            prop_assert_eq!(rotate_right(r, c1), (n(a), c));
        }

        #[test]
        fn prop_complement_is_involution(a in 0u8..16) {
            prop_assert_eq!(complement(complement(n(a))), n(a));
        }

        #[test]
        fn prop_add_then_subtract_restores(a in 0u8..16, b in 0u8..16) {
            let (sum, _) = add(n(a), n(b), false);
            let (back, _) = subtract(sum, n(b), false);
            prop_assert_eq!(back, n(a));
        }
    }
}
