use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as **integer minor units** of a currency
/// (cents for EUR, yen for JPY).
///
/// Balances and transaction amounts are kept as integers to avoid
/// floating-point drift; the number of fractional digits comes from the
/// [`Currency`].
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, MoneyCents};
///
/// let amount = MoneyCents::parse("12,34", Currency::Eur).unwrap();
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.format(Currency::Eur), "12.34");
/// assert!(MoneyCents::parse("12.345", Currency::Eur).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Formats the amount in major units, without currency suffix.
    #[must_use]
    pub fn format(self, currency: Currency) -> String {
        let digits = u32::from(currency.minor_units());
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if digits == 0 {
            return format!("{sign}{abs}");
        }
        let scale = 10u64.pow(digits);
        let width = digits as usize;
        format!("{sign}{}.{:0width$}", abs / scale, abs % scale)
    }

    /// Parses a decimal string in major units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`;
    /// rejects more fractional digits than the currency has.
    pub fn parse(s: &str, currency: Currency) -> ResultEngine<Self> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(empty());
        }

        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let fraction_str = parts.next().unwrap_or("");
        if parts.next().is_some() {
            return Err(invalid());
        }
        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = usize::from(currency.minor_units());
        if fraction_str.len() > digits {
            return Err(EngineError::InvalidAmount(format!(
                "too many decimals for {currency}"
            )));
        }

        let major: i64 = major_str.parse().map_err(|_| overflow())?;
        let fraction: i64 = if fraction_str.is_empty() {
            0
        } else {
            let padded = format!("{fraction_str:0<digits$}");
            padded.parse().map_err(|_| invalid())?
        };

        let scale = 10i64.pow(u32::from(currency.minor_units()));
        let total = major
            .checked_mul(scale)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(overflow)?;

        Ok(MoneyCents(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uses_currency_minor_units() {
        assert_eq!(MoneyCents::new(0).format(Currency::Eur), "0.00");
        assert_eq!(MoneyCents::new(5).format(Currency::Eur), "0.05");
        assert_eq!(MoneyCents::new(-1050).format(Currency::Usd), "-10.50");
        assert_eq!(MoneyCents::new(1200).format(Currency::Jpy), "1200");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!(MoneyCents::parse("10", Currency::Eur).unwrap().minor(), 1000);
        assert_eq!(MoneyCents::parse("10.5", Currency::Eur).unwrap().minor(), 1050);
        assert_eq!(MoneyCents::parse("10,50", Currency::Eur).unwrap().minor(), 1050);
        assert_eq!(MoneyCents::parse("-0.01", Currency::Eur).unwrap().minor(), -1);
        assert_eq!(MoneyCents::parse(" +2.30 ", Currency::Eur).unwrap().minor(), 230);
        assert_eq!(MoneyCents::parse("150", Currency::Jpy).unwrap().minor(), 150);
    }

    #[test]
    fn parse_rejects_excess_decimals_and_garbage() {
        assert!(MoneyCents::parse("12.345", Currency::Eur).is_err());
        assert!(MoneyCents::parse("1.5", Currency::Jpy).is_err());
        assert!(MoneyCents::parse("1.2.3", Currency::Eur).is_err());
        assert!(MoneyCents::parse("abc", Currency::Eur).is_err());
        assert!(MoneyCents::parse("", Currency::Eur).is_err());
    }
}
