use bigdecimal::BigDecimal;

/// Carrier minimums for a single package.
pub const MIN_WIDTH_CM: f64 = 11.0;
pub const MIN_HEIGHT_CM: f64 = 2.0;
pub const MIN_LENGTH_CM: f64 = 16.0;
pub const MIN_WEIGHT_KG: f64 = 0.3;

/// Aggregator service id of the standard tier (Correios PAC).
pub const SERVICE_PAC: i64 = 1;
/// Aggregator service id of the express tier (Correios SEDEX).
pub const SERVICE_SEDEX: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct PackageItem {
    pub id: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub length_cm: f64,
    pub weight_kg: f64,
    pub insurance_value: f64,
    pub quantity: u32,
}

impl PackageItem {
    /// Raise every physical attribute to the carrier minimum.
    ///
    /// Missing, zero or negative values all end up at the minimum; quantity is
    /// at least one.
    pub fn clamped(self) -> Self {
        Self {
            width_cm: at_least(self.width_cm, MIN_WIDTH_CM),
            height_cm: at_least(self.height_cm, MIN_HEIGHT_CM),
            length_cm: at_least(self.length_cm, MIN_LENGTH_CM),
            weight_kg: at_least(self.weight_kg, MIN_WEIGHT_KG),
            insurance_value: self.insurance_value.max(0.0),
            quantity: self.quantity.max(1),
            ..self
        }
    }
}

fn at_least(value: f64, min: f64) -> f64 {
    if value.is_finite() && value > min {
        value
    } else {
        min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingQuote {
    pub price: BigDecimal,
    pub deadline_days: i32,
}

/// Normalised result: one quote per tier, absent when the carrier could not
/// serve that tier for the destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShippingQuotes {
    pub pac: Option<ShippingQuote>,
    pub sedex: Option<ShippingQuote>,
}

/// Strip everything but digits from a CEP; valid CEPs have eight.
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 8).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(w: f64, h: f64, l: f64, kg: f64, qty: u32) -> PackageItem {
        PackageItem {
            id: "p1".to_string(),
            width_cm: w,
            height_cm: h,
            length_cm: l,
            weight_kg: kg,
            insurance_value: 50.0,
            quantity: qty,
        }
    }

    #[test]
    fn small_items_are_raised_to_minimums() {
        let clamped = item(0.0, 1.0, -3.0, 0.05, 0).clamped();

        assert_eq!(clamped.width_cm, MIN_WIDTH_CM);
        assert_eq!(clamped.height_cm, MIN_HEIGHT_CM);
        assert_eq!(clamped.length_cm, MIN_LENGTH_CM);
        assert_eq!(clamped.weight_kg, MIN_WEIGHT_KG);
        assert_eq!(clamped.quantity, 1);
    }

    #[test]
    fn large_items_are_left_alone() {
        let original = item(30.0, 10.0, 40.0, 1.2, 3);
        assert_eq!(original.clone().clamped(), original);
    }

    #[test]
    fn nan_dimensions_fall_back_to_minimum() {
        assert_eq!(item(f64::NAN, 5.0, 20.0, 1.0, 1).clamped().width_cm, MIN_WIDTH_CM);
    }

    #[test]
    fn postal_code_is_normalised_to_digits() {
        assert_eq!(normalize_postal_code("80010-000").as_deref(), Some("80010000"));
        assert_eq!(normalize_postal_code(" 01310 100 ").as_deref(), Some("01310100"));
        assert_eq!(normalize_postal_code("1234"), None);
    }
}
