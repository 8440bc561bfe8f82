use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder for a value that was looked for but could not be read.
pub const UNKNOWN: &str = "N/A";
/// Placeholder for a value whose element is not on the page at all.
pub const ABSENT: &str = "0";

/// One listing card: the detail-page link plus the types the card declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub link: String,
    pub property_type: String,
    pub business_type: String,
}

/// The "other characteristics" record: stratum, closet and garage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    #[serde(rename = "ESTRATO", alias = "Estrato")]
    pub stratum: String,
    #[serde(rename = "CLOSET", alias = "Closet")]
    pub closet: String,
    #[serde(rename = "GARAJE", alias = "Garaje")]
    pub garage: String,
}

impl Characteristics {
    pub fn unknown() -> Self {
        Self {
            stratum: UNKNOWN.to_string(),
            closet: UNKNOWN.to_string(),
            garage: UNKNOWN.to_string(),
        }
    }
}

/// Amenities as extracted, or as opaque text when a raw dump carries a
/// display-formatted mapping that has not been parsed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Amenities {
    Structured(Characteristics),
    Text(String),
}

/// Values that are neither a string nor a complete mapping are kept as their
/// JSON text.
impl<'de> Deserialize<'de> for Amenities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Value::String(text) = value {
            return Ok(Amenities::Text(text));
        }
        match Characteristics::deserialize(&value) {
            Ok(c) => Ok(Amenities::Structured(c)),
            Err(_) => Ok(Amenities::Text(value.to_string())),
        }
    }
}

/// Serialized field names, in column order. Upper-cased they are the
/// warehouse column names.
#[cfg(test)]
pub const FIELDS: [&str; 15] = [
    "link",
    "tipo_inmueble",
    "tipo_negocio",
    "habitaciones",
    "banios",
    "precio",
    "area",
    "contacto",
    "direccion",
    "ciudad",
    "barrio",
    "sector",
    "departamento",
    "otras_caracteristicas",
    "imagenes",
];

/// A listing after its detail page has been processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub link: String,
    #[serde(rename = "tipo_inmueble")]
    pub property_type: String,
    #[serde(rename = "tipo_negocio")]
    pub business_type: String,
    #[serde(rename = "habitaciones")]
    pub rooms: String,
    #[serde(rename = "banios")]
    pub bathrooms: String,
    #[serde(rename = "precio")]
    pub price: String,
    pub area: String,
    #[serde(rename = "contacto")]
    pub contact: String,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "ciudad")]
    pub city: String,
    #[serde(rename = "barrio")]
    pub neighborhood: String,
    pub sector: String,
    #[serde(rename = "departamento")]
    pub department: String,
    #[serde(rename = "otras_caracteristicas")]
    pub amenities: Amenities,
    #[serde(rename = "imagenes")]
    pub images: Vec<String>,
}

impl PropertyRecord {
    /// Seed a record from its reference; every detail field starts unknown.
    pub fn from_reference(reference: ReferenceRecord) -> Self {
        let unknown = || UNKNOWN.to_string();
        Self {
            link: reference.link,
            property_type: reference.property_type,
            business_type: reference.business_type,
            rooms: unknown(),
            bathrooms: unknown(),
            price: unknown(),
            area: unknown(),
            contact: unknown(),
            address: unknown(),
            city: unknown(),
            neighborhood: unknown(),
            sector: unknown(),
            department: unknown(),
            amenities: Amenities::Structured(Characteristics::unknown()),
            images: Vec::new(),
        }
    }
}

/// Canonical business type after synonym folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusinessType {
    Rental,
    Sale,
}

impl BusinessType {
    /// Fold a source label ("Arrendar", "VENTA", ...) to its canonical type.
    pub fn fold(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "ARRENDAR" | "ARRIENDO" | "RENTAL" => Some(Self::Rental),
            "VENTA" | "SALE" => Some(Self::Sale),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rental => "RENTAL",
            Self::Sale => "SALE",
        }
    }
}
