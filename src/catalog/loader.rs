//! Load the property catalog from a CSV listing sheet

use csv::Reader;
use std::error::Error;
use std::path::Path;

use super::Property;

/// Raw CSV row matching the listing sheet columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "UnitID")]
    id: String,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "District")]
    district: String,
    #[serde(rename = "Rooms")]
    rooms: u8,
    #[serde(rename = "AreaSqm")]
    area_sqm: f64,
    #[serde(rename = "Delivery")]
    delivery_label: String,
    #[serde(rename = "DeliveryDate")]
    delivery_date_label: String,
    #[serde(rename = "CashPrice")]
    cash_price: f64,
}

impl CsvRow {
    fn into_property(self) -> Result<Property, Box<dyn Error>> {
        if self.cash_price < 0.0 {
            return Err(format!("Unit {}: negative cash price", self.id).into());
        }
        Ok(Property {
            id: self.id,
            city: self.city,
            district: self.district,
            rooms: self.rooms,
            area_sqm: self.area_sqm,
            delivery_label: self.delivery_label,
            delivery_date_label: self.delivery_date_label,
            cash_price: self.cash_price,
        })
    }
}

/// Load the catalog from a CSV file
pub fn load_catalog(path: &Path) -> Result<Vec<Property>, Box<dyn Error>> {
    let mut reader = Reader::from_path(path)?;
    let mut catalog = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        catalog.push(row.into_property()?);
    }

    Ok(catalog)
}

/// Built-in sample catalog for the demo binary and tests
pub fn sample_catalog() -> Vec<Property> {
    let rows: [(&str, &str, &str, u8, f64, &str, &str, f64); 6] = [
        ("NC-T4-102", "New Capital", "R7", 3, 165.0, "delivery within 36 months", "Q2 2028", 4_200_000.0),
        ("NC-T4-215", "New Capital", "R7", 2, 120.0, "delivery within 30 months", "Q4 2027", 3_100_000.0),
        ("NC-G2-018", "New Capital", "R8", 3, 150.0, "delivery within 42 months", "Q4 2028", 3_650_000.0),
        ("ZD-A1-077", "Sheikh Zayed", "Zed East", 2, 110.0, "delivery within 24 months", "Q2 2027", 2_900_000.0),
        ("ZD-A3-031", "Sheikh Zayed", "Zed East", 1, 75.0, "delivery within 18 months", "Q4 2026", 1_950_000.0),
        ("MS-B2-140", "Mostakbal City", "Bloomfields", 3, 155.0, "ready to move in", "now", 3_300_000.0),
    ];

    rows.iter()
        .map(|(id, city, district, rooms, area, delivery, date, price)| Property {
            id: id.to_string(),
            city: city.to_string(),
            district: district.to_string(),
            rooms: *rooms,
            area_sqm: *area,
            delivery_label: delivery.to_string(),
            delivery_date_label: date.to_string(),
            cash_price: *price,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_property;

    #[test]
    fn test_sample_catalog_ids_unique() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 6);
        for p in &catalog {
            assert_eq!(
                catalog.iter().filter(|q| q.id == p.id).count(),
                1,
                "duplicate id {}",
                p.id
            );
            assert!(p.cash_price >= 0.0);
        }
    }

    #[test]
    fn test_sample_catalog_lookup() {
        let catalog = sample_catalog();
        let unit = find_property(&catalog, "ZD-A3-031").unwrap();
        assert_eq!(unit.delivery_months(), 18);
    }
}
