use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use crate::parser::field::Field;

static CONTACT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.wap.mt-2").unwrap());
static HREF_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Raw target of the first link in the contact box (usually a wa.me URL).
pub fn extract(doc: &Html) -> Field {
    let Some(container) = doc.select(&CONTACT_SEL).next() else {
        debug!("No contact container on page");
        return Field::Unknown;
    };

    container
        .select(&HREF_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| Field::Found(href.trim().to_string()))
        .unwrap_or(Field::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_link_in_container() {
        let doc = Html::parse_document(
            r#"<a href="https://wa.me/000">outside</a>
               <div class="wap mt-2"><a href="https://wa.me/573001234567">WhatsApp</a><a href="tel:1">Tel</a></div>"#,
        );
        assert_eq!(extract(&doc), Field::Found("https://wa.me/573001234567".into()));
    }

    #[test]
    fn missing_container_or_link() {
        let doc = Html::parse_document(r#"<div class="wap"><a href="x">x</a></div>"#);
        assert_eq!(extract(&doc), Field::Unknown);
        let doc = Html::parse_document(r#"<div class="wap mt-2"><a>no href</a></div>"#);
        assert_eq!(extract(&doc), Field::Unknown);
    }
}
