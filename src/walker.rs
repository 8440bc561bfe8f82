use tracing::{info, warn};

use crate::fetcher::PageSource;
use crate::models::ReferenceRecord;
use crate::parser::{self, extract::listing::ListingPage};

/// Listing filters, one per business type, in the order they are walked.
pub const BUSINESS_TYPES: [&str; 2] = ["bussines_type=Venta", "bussines_type=Arrendar"];

pub fn listing_url(base_url: &str, path: &str, page: u32, business_type: &str) -> String {
    format!("{}{}{}&{}", base_url, path, page, business_type)
}

/// Walk listing pages `start_page..=max_page` for both business types and
/// collect every card reference.
///
/// An unavailable page is skipped. A page without the listing container ends
/// the walk for that business type only.
pub async fn walk(
    source: &impl PageSource,
    base_url: &str,
    start_page: u32,
    max_page: u32,
    path: &str,
) -> Vec<ReferenceRecord> {
    let mut references = Vec::new();
    let mut exhausted = [false; BUSINESS_TYPES.len()];

    for page in start_page..=max_page {
        for (idx, business_type) in BUSINESS_TYPES.iter().enumerate() {
            if exhausted[idx] {
                continue;
            }
            info!("Extracting properties from page {} for {}", page, business_type);

            let url = listing_url(base_url, path, page, business_type);
            let Some(html) = source.get(&url).await else {
                warn!("Skipping page {} for {}: unavailable", page, business_type);
                continue;
            };

            match parser::parse_listing(&html) {
                ListingPage::Missing => {
                    info!("No properties found on page {} for {}. Stopping this type", page, business_type);
                    exhausted[idx] = true;
                }
                ListingPage::Cards(cards) => {
                    info!(page, count = cards.len(), "Found listing cards");
                    references.extend(cards);
                }
            }
        }

        if exhausted.iter().all(|e| *e) {
            break;
        }
    }

    info!("Walk finished with {} references", references.len());
    references
}
