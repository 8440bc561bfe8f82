use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::fetcher::PageSource;
use crate::geocode::{Geocoder, Location};
use crate::models::{Amenities, PropertyRecord, ReferenceRecord};
use crate::parser::{self, extract::DetailFields};

/// Fetch each reference's detail page, one at a time with `pause` between
/// records, and merge the extracted fields into a `PropertyRecord`.
///
/// A detail page that cannot be fetched is skipped.
pub async fn enrich(
    source: &impl PageSource,
    geocoder: &impl Geocoder,
    base_url: &str,
    references: Vec<ReferenceRecord>,
    pause: Duration,
) -> Vec<PropertyRecord> {
    let total = references.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut records = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for reference in references {
        info!("Extracting property information: {}", reference.link);
        let url = format!("{}{}", base_url, reference.link);

        match source.get(&url).await {
            Some(html) => {
                // parsed document is dropped before the geocoder is awaited
                let detail = parser::parse_detail(&html);
                let location = Location::resolve(geocoder, detail.coordinates).await;
                records.push(merge(PropertyRecord::from_reference(reference), detail, location));
            }
            None => {
                warn!("Skipping {}: detail page unavailable", reference.link);
                skipped += 1;
            }
        }

        pb.inc(1);
        tokio::time::sleep(pause).await;
    }

    pb.finish_and_clear();
    info!("Enriched {} of {} properties ({} skipped)", records.len(), total, skipped);
    records
}

fn merge(mut record: PropertyRecord, detail: DetailFields, location: Location) -> PropertyRecord {
    let attrs = detail.attributes;
    record.amenities = Amenities::Structured(attrs.characteristics());
    record.rooms = attrs.rooms.into_value();
    record.bathrooms = attrs.bathrooms.into_value();
    record.price = attrs.price.into_value();
    record.area = attrs.area.into_value();
    record.contact = detail.contact.into_value();
    record.address = location.address;
    record.city = location.city;
    record.neighborhood = location.neighborhood;
    record.sector = location.sector;
    record.department = location.department;
    record.images = detail.images;
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fake::FakePages;
    use crate::geocode::fake::FixedGeocoder;
    use crate::geocode::AddressParts;
    use crate::models::{BusinessType, Characteristics};
    use crate::normalize::normalize;

    const BASE: &str = "https://site.test";

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn reference(link: &str, business: &str) -> ReferenceRecord {
        ReferenceRecord {
            link: link.into(),
            property_type: "Apartamento".into(),
            business_type: business.into(),
        }
    }

    fn geocoder() -> FixedGeocoder {
        FixedGeocoder {
            answer: Some(AddressParts {
                road: Some("Carrera 76".into()),
                neighbourhood: Some("Laureles".into()),
                suburb: Some("Comuna 11".into()),
                city: Some("Medellín".into()),
                state: Some("Antioquia".into()),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn merges_detail_fields() {
        let source = FakePages::default().with(format!("{}/p/1", BASE), fixture("detail"));
        let g = geocoder();
        let records = enrich(&source, &g, BASE, vec![reference("/p/1", "Arrendar")], Duration::ZERO).await;

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.link, "/p/1");
        assert_eq!(r.business_type, "Arrendar");
        assert_eq!(r.rooms, "3");
        assert_eq!(r.price, "$1,800,000");
        assert_eq!(r.contact, "https://wa.me/573001112233");
        assert_eq!(r.neighborhood, "Laureles");
        assert_eq!(r.address, "Carrera 76, barrio Laureles, Comuna 11, Medellín - Antioquia");
        assert_eq!(r.images.len(), 3);
        assert_eq!(g.calls.get(), 1);
    }

    #[tokio::test]
    async fn sparse_page_and_failed_geocoding_use_sentinels() {
        let source = FakePages::default().with(format!("{}/p/2", BASE), fixture("detail_sparse"));
        let g = FixedGeocoder::default();
        let records = enrich(&source, &g, BASE, vec![reference("/p/2", "Venta")], Duration::ZERO).await;

        let r = &records[0];
        assert_eq!(r.bathrooms, "0");
        assert_eq!(r.area, "0");
        assert_eq!(r.contact, "N/A");
        assert_eq!(r.city, "N/A");
        assert_eq!(r.address, "N/A");
        assert_eq!(
            r.amenities,
            Amenities::Structured(Characteristics {
                stratum: "0".into(),
                closet: "0".into(),
                garage: "N/A".into(),
            })
        );
        // no coordinate script: geocoded at 0,0
        assert_eq!(g.calls.get(), 1);
    }

    #[tokio::test]
    async fn unavailable_detail_is_skipped() {
        let source = FakePages::default().with(format!("{}/p/1", BASE), fixture("detail"));
        let refs = vec![reference("/gone", "Venta"), reference("/p/1", "Venta")];
        let records = enrich(&source, &geocoder(), BASE, refs, Duration::ZERO).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "/p/1");
        assert_eq!(source.requested.borrow().len(), 2);
    }

    #[tokio::test]
    async fn rent_and_sale_end_to_end() {
        let source = FakePages::default()
            .with(format!("{}/p/rent", BASE), fixture("detail"))
            .with(format!("{}/p/sale", BASE), fixture("detail_sparse"));
        let refs = vec![reference("/p/rent", "Arrendar"), reference("/p/sale", "Venta")];
        let records = enrich(&source, &geocoder(), BASE, refs, Duration::ZERO).await;

        let (rentals, sales) = normalize(&records).unwrap();
        assert_eq!(rentals.len(), 1);
        assert_eq!(sales.len(), 1);

        let rent = &rentals.rows[0];
        assert_eq!(rent.business_type, BusinessType::Rental);
        assert_eq!(rent.property_type, "APARTAMENTO");
        assert_eq!(rent.price, 1_800_000.0);
        assert_eq!(rent.area, 80.0);
        assert_eq!(rent.contact, "573001112233");
        assert_eq!(rent.city, "MEDELLÍN");
        assert_eq!(rent.link, "/p/rent");

        let sale = &sales.rows[0];
        assert_eq!(sale.business_type, BusinessType::Sale);
        assert_eq!(sale.price, 350_000_000.0);
        assert_eq!(sale.area, 0.0);
        assert_eq!(rentals.columns(), sales.columns());
    }
}
