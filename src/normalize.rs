use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Amenities, BusinessType, Characteristics, PropertyRecord};

/// Persisted column names, identical for both output tables.
pub const COLUMNS: [&str; 15] = [
    "LINK",
    "TIPO_INMUEBLE",
    "TIPO_NEGOCIO",
    "HABITACIONES",
    "BANIOS",
    "PRECIO",
    "AREA",
    "CONTACTO",
    "DIRECCION",
    "CIUDAD",
    "BARRIO",
    "SECTOR",
    "DEPARTAMENTO",
    "OTRAS_CARACTERISTICAS",
    "IMAGENES",
];

const CONTACT_PREFIX: &str = "HTTPS://WA.ME/";
const AREA_UNITS: [&str; 2] = ["M2", "M²"];

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("error transforming PRECIO column: {raw:?} is not a valid price (row {link})")]
    Price { link: String, raw: String },
    #[error("error transforming AREA column: {raw:?} is not a valid area (row {link})")]
    Area { link: String, raw: String },
}

/// One normalized listing. Text columns are upper-cased and trimmed,
/// except `link`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub link: String,
    pub property_type: String,
    pub business_type: BusinessType,
    pub rooms: String,
    pub bathrooms: String,
    pub price: f64,
    pub area: f64,
    pub contact: String,
    pub address: String,
    pub city: String,
    pub neighborhood: String,
    pub sector: String,
    pub department: String,
    pub amenities: Amenities,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    #[cfg(test)]
    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalize the whole batch into `(rentals, sales)`.
///
/// A price or area that does not parse fails the batch. Rows whose business
/// type folds to neither label are left out of both tables.
pub fn normalize(records: &[PropertyRecord]) -> Result<(Table, Table), NormalizeError> {
    let mut rentals = Table::default();
    let mut sales = Table::default();
    let mut dropped = 0usize;

    let rows = records.iter().map(normalize_record).collect::<Result<Vec<_>, _>>()?;

    for (record, row) in records.iter().zip(rows) {
        match row {
            Some(r) if r.business_type == BusinessType::Rental => rentals.rows.push(r),
            Some(r) => sales.rows.push(r),
            None => {
                debug!("Dropping {}: unknown business type {:?}", record.link, record.business_type);
                dropped += 1;
            }
        }
    }

    info!(
        rentals = rentals.len(),
        sales = sales.len(),
        dropped,
        "Normalized records"
    );
    Ok((rentals, sales))
}

/// `Ok(None)` when the business type is neither rental nor sale.
fn normalize_record(r: &PropertyRecord) -> Result<Option<Row>, NormalizeError> {
    let price = parse_price(&clean(&r.price)).ok_or_else(|| NormalizeError::Price {
        link: r.link.clone(),
        raw: r.price.clone(),
    })?;
    let area = parse_area(&clean(&r.area)).ok_or_else(|| NormalizeError::Area {
        link: r.link.clone(),
        raw: r.area.clone(),
    })?;

    let Some(business_type) = BusinessType::fold(&clean(&r.business_type)) else {
        return Ok(None);
    };

    Ok(Some(Row {
        link: r.link.clone(),
        property_type: clean(&r.property_type),
        business_type,
        rooms: clean(&r.rooms),
        bathrooms: clean(&r.bathrooms),
        price,
        area,
        contact: strip_contact(&clean(&r.contact)),
        address: clean(&r.address),
        city: clean(&r.city),
        neighborhood: clean(&r.neighborhood),
        sector: clean(&r.sector),
        department: clean(&r.department),
        amenities: normalize_amenities(&r.link, &r.amenities),
        images: r.images.clone(),
    }))
}

fn clean(s: &str) -> String {
    s.trim().to_uppercase()
}

fn to_measure(digits: &str) -> Option<f64> {
    let v: f64 = digits.parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

/// "$1,234,500" -> 1234500.0
pub fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    to_measure(&digits)
}

/// "80M2", "80 m2", "1,200 m²" -> 80.0, 80.0, 1200.0
pub fn parse_area(text: &str) -> Option<f64> {
    let upper = text.to_uppercase();
    let stripped = AREA_UNITS.iter().fold(upper, |s, unit| s.replace(unit, ""));
    let digits: String = stripped
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    to_measure(&digits)
}

fn strip_contact(contact: &str) -> String {
    contact.strip_prefix(CONTACT_PREFIX).unwrap_or(contact).to_string()
}

fn normalize_amenities(link: &str, amenities: &Amenities) -> Amenities {
    match amenities {
        Amenities::Structured(c) => Amenities::Structured(Characteristics {
            stratum: clean(&c.stratum),
            closet: clean(&c.closet),
            garage: clean(&c.garage),
        }),
        Amenities::Text(text) => {
            let text = clean(text);
            match serde_json::from_str::<Characteristics>(&text.replace('\'', "\"")) {
                Ok(c) => Amenities::Structured(c),
                Err(e) => {
                    warn!("Error transforming OTRAS_CARACTERISTICAS for {}: {}", link, e);
                    Amenities::Text(text)
                }
            }
        }
    }
}
