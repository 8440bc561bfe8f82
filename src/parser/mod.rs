pub mod extract;
pub mod field;

use scraper::Html;

use extract::listing::{self, ListingPage};
use extract::DetailFields;

/// Listing index page → reference cards, or `Missing` past the last page.
pub fn parse_listing(html: &str) -> ListingPage {
    listing::parse(html)
}

/// Detail page → every extracted field. The parsed document does not
/// outlive this call.
pub fn parse_detail(html: &str) -> DetailFields {
    let doc = Html::parse_document(html);
    extract::extract_all(&doc)
}
