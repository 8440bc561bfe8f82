use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

static SLIDE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#property-slider li").unwrap());
static PREVIEW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.prop-preview-img").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"url\((.*?)\)").unwrap());

/// Image URLs of the carousel, in slide order.
pub fn extract(doc: &Html) -> Vec<String> {
    let images: Vec<String> = doc
        .select(&SLIDE_SEL)
        .filter_map(|li| li.select(&PREVIEW_SEL).next())
        .filter_map(|div| {
            let style = div.value().attr("style")?;
            let url = URL_RE.captures(style)?.get(1)?.as_str();
            let url = url.trim().trim_matches(|c| c == '\'' || c == '"');
            (!url.is_empty()).then(|| url.to_string())
        })
        .collect();
    if images.is_empty() {
        debug!("No images found (div#property-slider li div.prop-preview-img)");
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::field::logs::captured;

    #[test]
    fn slides_in_order() {
        let doc = Html::parse_document(
            r#"<div id="property-slider"><ul>
                 <li><div class="prop-preview-img" style="background-image: url(https://cdn.example/1.jpg);"></div></li>
                 <li><div class="other"></div></li>
                 <li><div class="prop-preview-img" style="background-image: url('https://cdn.example/2.jpg')"></div></li>
                 <li><div class="prop-preview-img"></div></li>
               </ul></div>
               <div class="prop-preview-img" style="background-image: url(https://cdn.example/outside.jpg)"></div>"#,
        );
        assert_eq!(
            extract(&doc),
            vec!["https://cdn.example/1.jpg", "https://cdn.example/2.jpg"]
        );
    }

    #[test]
    fn no_slider() {
        let doc = Html::parse_document("<div id='gallery'></div>");
        let logs = captured(|| assert!(extract(&doc).is_empty()));
        assert!(logs.contains("No images found"), "{}", logs);
    }
}
