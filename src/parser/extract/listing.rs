use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::ReferenceRecord;
use crate::parser::field::{extract_text, parse_selector, with_retries};

static CONTAINER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#properties").unwrap());
static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.property-card").unwrap());

const TYPE_PREFIX: &str = "Tipo: ";

#[derive(Debug, PartialEq)]
pub enum ListingPage {
    /// No listing container: past the last page of results.
    Missing,
    Cards(Vec<ReferenceRecord>),
}

pub fn parse(html: &str) -> ListingPage {
    let doc = Html::parse_document(html);
    let Some(container) = doc.select(&CONTAINER_SEL).next() else {
        return ListingPage::Missing;
    };

    let cards = container
        .select(&CARD_SEL)
        .filter_map(|card| {
            let Some(link) = extract_href(card) else {
                debug!("Skipping listing card without link");
                return None;
            };
            Some(ReferenceRecord {
                link,
                property_type: extract_text(card, "p", "tipo-inmueble", Some(TYPE_PREFIX)).into_value(),
                business_type: extract_text(card, "p", "tipo-negocio", Some(TYPE_PREFIX)).into_value(),
            })
        })
        .collect();

    ListingPage::Cards(cards)
}

fn extract_href(card: ElementRef<'_>) -> Option<String> {
    with_retries("card link", || {
        let sel = parse_selector("a[href]")?;
        Ok(card
            .select(&sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|h| h.trim().to_string()))
    })
    .flatten()
    .filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn cards_from_listing() {
        let ListingPage::Cards(cards) = parse(&fixture("listing")) else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 3);
        assert_eq!(
            cards[0],
            ReferenceRecord {
                link: "/inmueble/apartamento-en-arriendo-laureles-1021".into(),
                property_type: "Apartamento".into(),
                business_type: "Arrendar".into(),
            }
        );
        assert_eq!(cards[1].business_type, "Venta");
        // card without type paragraphs keeps its link, types unknown
        assert_eq!(cards[2].property_type, "N/A");
        assert!(cards.iter().all(|c| c.link.starts_with("/inmueble/")));
    }

    #[test]
    fn missing_container() {
        assert_eq!(parse(&fixture("listing_empty")), ListingPage::Missing);
    }

    #[test]
    fn empty_container_is_not_missing() {
        assert_eq!(parse("<div id='properties'></div>"), ListingPage::Cards(vec![]));
    }
}
