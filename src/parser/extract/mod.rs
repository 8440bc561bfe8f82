pub mod attributes;
pub mod contact;
pub mod coordinates;
pub mod images;
pub mod listing;

use scraper::Html;

use attributes::Attributes;
use coordinates::Coordinates;

use super::field::Field;

/// Everything read from one detail page.
pub struct DetailFields {
    pub attributes: Attributes,
    pub contact: Field,
    pub coordinates: Option<Coordinates>,
    pub images: Vec<String>,
}

pub fn extract_all(doc: &Html) -> DetailFields {
    DetailFields {
        attributes: attributes::extract(doc),
        contact: contact::extract(doc),
        coordinates: coordinates::extract(doc),
        images: images::extract(doc),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_detail;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn full_detail_page() {
        let d = parse_detail(&fixture("detail"));
        let a = &d.attributes;
        assert_eq!(a.rooms.found(), Some("3"));
        assert_eq!(a.bathrooms.found(), Some("2"));
        assert_eq!(a.price.found(), Some("$1,800,000"));
        assert_eq!(a.area.found(), Some("80 m2"));
        assert_eq!(a.stratum.found(), Some("4"));
        assert_eq!(a.closet.found(), Some("3"));
        assert_eq!(a.garage.found(), Some("Sí"));
        assert_eq!(d.contact.found(), Some("https://wa.me/573001112233"));
        assert_eq!(
            d.coordinates,
            Some(Coordinates { latitude: 6.2518, longitude: -75.5636 })
        );
        assert_eq!(d.images.len(), 3);
        assert!(d.images[0].ends_with("/fotos/1021/1.jpg"));
    }

    #[test]
    fn sparse_detail_page_degrades_to_sentinels() {
        let d = parse_detail(&fixture("detail_sparse"));
        let a = &d.attributes;
        assert_eq!(a.rooms.found(), Some("1"));
        // element there, value span missing
        assert_eq!(a.bathrooms, Field::Absent);
        assert_eq!(a.price.found(), Some("$350,000,000"));
        assert_eq!(a.area, Field::Absent);
        assert_eq!(a.stratum, Field::Absent);
        assert_eq!(a.closet, Field::Absent);
        // label there, value span missing in its column
        assert_eq!(a.garage, Field::Unknown);
        assert_eq!(d.contact, Field::Unknown);
        assert_eq!(d.coordinates, Some(Coordinates::ZERO));
        assert!(d.images.is_empty());

        let c = a.characteristics();
        assert_eq!((c.stratum.as_str(), c.closet.as_str(), c.garage.as_str()), ("0", "0", "N/A"));
    }

    #[test]
    fn garbage_document_never_panics() {
        let d = parse_detail("<<<not html at all>>> <div id=alcoba");
        assert_eq!(d.attributes.price, Field::Absent);
        assert_eq!(d.contact, Field::Unknown);
        assert!(d.images.is_empty());
    }
}
