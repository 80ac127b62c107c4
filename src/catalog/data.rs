//! Property records from the sales catalog

use serde::{Deserialize, Serialize};

/// A single unit in the catalog
///
/// Immutable reference data, looked up by id. Ids follow the
/// `LETTERS-ALNUM-DIGITS` pattern used in the listing sheets, e.g. `NC-T4-102`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub city: String,
    pub district: String,
    pub rooms: u8,
    pub area_sqm: f64,
    /// Free-text delivery duration, e.g. "delivery within 36 months"
    pub delivery_label: String,
    /// Free-text delivery calendar date, e.g. "Q4 2028"
    pub delivery_date_label: String,
    /// Cash price today, >= 0
    pub cash_price: f64,
}

impl Property {
    /// Best-effort month count extracted from `delivery_label`
    ///
    /// Takes the first run of ASCII digits in the label; 0 when the label
    /// carries no number (e.g. "ready to move in").
    pub fn delivery_months(&self) -> u32 {
        let digits: String = self
            .delivery_label
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().unwrap_or(0)
    }
}

/// Look up a property by id, case-insensitively
pub fn find_property<'a>(catalog: &'a [Property], id: &str) -> Option<&'a Property> {
    catalog.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(id: &str, delivery_label: &str) -> Property {
        Property {
            id: id.to_string(),
            city: "New Capital".to_string(),
            district: "R7".to_string(),
            rooms: 3,
            area_sqm: 140.0,
            delivery_label: delivery_label.to_string(),
            delivery_date_label: "2028".to_string(),
            cash_price: 1_000_000.0,
        }
    }

    #[test]
    fn test_delivery_months_parsing() {
        assert_eq!(prop("NC-T4-102", "delivery within 36 months").delivery_months(), 36);
        assert_eq!(prop("NC-T4-102", "24 month handover").delivery_months(), 24);
        assert_eq!(prop("NC-T4-102", "ready to move in").delivery_months(), 0);
        assert_eq!(prop("NC-T4-102", "").delivery_months(), 0);
    }

    #[test]
    fn test_find_property_case_insensitive() {
        let catalog = vec![prop("NC-T4-102", "36 months"), prop("ZD-A1-07", "12 months")];
        assert_eq!(find_property(&catalog, "nc-t4-102").unwrap().id, "NC-T4-102");
        assert!(find_property(&catalog, "NC-T4-999").is_none());
    }
}
