//! Exact rational numbers for aspect ratios and frame rates.
//!
//! ffprobe reports these as `"num/den"` or `"num:den"` strings. A `Ratio` is
//! always stored reduced with a positive denominator, so `32/18` and `16:9`
//! compare equal.

use std::fmt;
use std::ops::Mul;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ratio {
    num: i64,
    den: i64,
}

impl Ratio {
    /// Creates a reduced ratio. Returns `None` when `den` is zero.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i64;
        let sign = if den < 0 { -1 } else { 1 };
        Some(Self {
            num: sign * num / divisor,
            den: sign * den / divisor,
        })
    }

    /// Parses `"a/b"` or `"a:b"`. Both sides must be integers and `b` non-zero.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().replace(':', "/");
        let (num, den) = normalized.split_once('/')?;
        let num = num.trim().parse::<i64>().ok()?;
        let den = den.trim().parse::<i64>().ok()?;
        Self::new(num, den)
    }

    pub fn numer(&self) -> i64 {
        self.num
    }

    pub fn denom(&self) -> i64 {
        self.den
    }

    /// True when the ratio is zero or negative, which makes it useless as a SAR.
    pub fn is_degenerate(&self) -> bool {
        self.num <= 0
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Mul for Ratio {
    type Output = Ratio;

    fn mul(self, rhs: Ratio) -> Ratio {
        // Cross-reduce first so the intermediate products stay small.
        let g1 = gcd(self.num.unsigned_abs(), rhs.den.unsigned_abs()).max(1) as i64;
        let g2 = gcd(rhs.num.unsigned_abs(), self.den.unsigned_abs()).max(1) as i64;
        Ratio {
            num: (self.num / g1) * (rhs.num / g2),
            den: (self.den / g2) * (rhs.den / g1),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_separators() {
        assert_eq!(Ratio::parse("16:9"), Ratio::new(16, 9));
        assert_eq!(Ratio::parse("16/9"), Ratio::new(16, 9));
        assert_eq!(Ratio::parse(" 32/18 "), Ratio::new(16, 9));
    }

    #[test]
    fn test_parse_rejects_garbage_and_zero_denominator() {
        assert_eq!(Ratio::parse("0/0"), None);
        assert_eq!(Ratio::parse("1/0"), None);
        assert_eq!(Ratio::parse("abc"), None);
        assert_eq!(Ratio::parse("30"), None);
        assert_eq!(Ratio::parse("1.5/2"), None);
    }

    #[test]
    fn test_negative_denominator_is_normalized() {
        let r = Ratio::new(3, -6).unwrap();
        assert_eq!(r.numer(), -1);
        assert_eq!(r.denom(), 2);
        assert!(r.is_degenerate());
    }

    #[test]
    fn test_multiplication_reduces() {
        let sar = Ratio::new(1, 1).unwrap();
        let shape = Ratio::new(1920, 1080).unwrap();
        assert_eq!((sar * shape).to_string(), "16/9");

        let anamorphic = Ratio::new(64, 45).unwrap() * Ratio::new(720, 576).unwrap();
        assert_eq!(anamorphic.to_string(), "16/9");
    }

    #[test]
    fn test_ntsc_rate_as_float() {
        let rate = Ratio::parse("30000/1001").unwrap();
        assert!((rate.to_f64() - 29.97).abs() < 0.01);
    }
}
