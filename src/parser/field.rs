use std::fmt;

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::{ABSENT, UNKNOWN};

/// Extra attempts after a failed lookup before giving up on a field.
const MAX_LOOKUP_RETRIES: usize = 2;
/// Class of the ancestor a label climbs to before looking for its value.
const PARENT_CLASS: &str = "col-6";
const DEFAULT_VALUE_CLASS: &str = "attr-value";

/// Outcome of one field extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Found(String),
    /// Element located, value not readable.
    Unknown,
    /// Element not on the page.
    Absent,
}

impl Field {
    #[cfg(test)]
    pub fn found(&self) -> Option<&str> {
        match self {
            Field::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            Field::Found(v) => v,
            Field::Unknown => UNKNOWN.to_string(),
            Field::Absent => ABSENT.to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Found(v) => f.write_str(v),
            Field::Unknown => f.write_str(UNKNOWN),
            Field::Absent => f.write_str(ABSENT),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Target {
    Id(&'static str),
    Class {
        class: &'static str,
        /// Exact text the element must carry.
        text: Option<&'static str>,
        /// Tag of the `col-6` ancestor holding the value span.
        parent: Option<&'static str>,
    },
}

/// Where a field lives on a detail page.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub tag: &'static str,
    pub target: Target,
    /// Class of the inner value span; `None` reads the element's own text.
    pub value_class: Option<&'static str>,
}

impl FieldSpec {
    pub fn selector(&self) -> String {
        match self.target {
            Target::Id(id) => format!("{}#{}", self.tag, id),
            Target::Class { class, .. } => format!("{}{}", self.tag, class_selector(class)),
        }
    }
}

/// "attr-value text" -> ".attr-value.text"
fn class_selector(classes: &str) -> String {
    classes.split_whitespace().map(|c| format!(".{}", c)).collect()
}

pub fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {:?}", css, e))
}

pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Run `lookup` until it succeeds, at most `MAX_LOOKUP_RETRIES` extra times.
pub fn with_retries<T>(what: &str, mut lookup: impl FnMut() -> Result<T>) -> Option<T> {
    for attempt in 0..=MAX_LOOKUP_RETRIES {
        match lookup() {
            Ok(v) => return Some(v),
            Err(e) => warn!(
                "Lookup of {} failed: {} (attempt {}/{})",
                what,
                e,
                attempt + 1,
                MAX_LOOKUP_RETRIES + 1
            ),
        }
    }
    None
}

/// Read one field from a detail document. Never fails: a missing element
/// or value degrades to `Absent` / `Unknown`.
pub fn extract_info(doc: &Html, spec: &FieldSpec) -> Field {
    let what = format!("{} ({})", spec.name, spec.selector());
    with_retries(&what, || lookup(doc, spec)).unwrap_or(Field::Absent)
}

fn lookup(doc: &Html, spec: &FieldSpec) -> Result<Field> {
    let css = spec.selector();
    let selector = parse_selector(&css)?;

    let found = match spec.target {
        Target::Class { text: Some(text), .. } => {
            doc.select(&selector).find(|el| element_text(*el) == text)
        }
        _ => doc.select(&selector).next(),
    };
    let Some(el) = found else {
        debug!("{} not found ({})", spec.name, css);
        return Ok(Field::Absent);
    };

    if let Target::Class { parent: Some(parent), .. } = spec.target {
        if let Some(container) = climb(el, parent) {
            let class = spec.value_class.unwrap_or(DEFAULT_VALUE_CLASS);
            let span = parse_selector(&format!("span{}", class_selector(class)))?;
            return Ok(match container.select(&span).next() {
                Some(s) => Field::Found(element_text(s)),
                None => {
                    debug!("{} has no value under its {}.{} ({})", spec.name, parent, PARENT_CLASS, css);
                    Field::Unknown
                }
            });
        }
    }

    match spec.value_class {
        Some(class) => {
            let span = parse_selector(&format!("span{}", class_selector(class)))?;
            Ok(match el.select(&span).next() {
                Some(s) => Field::Found(element_text(s)),
                None => {
                    debug!("{} has no span.{} ({})", spec.name, class, css);
                    Field::Absent
                }
            })
        }
        None => Ok(Field::Found(element_text(el))),
    }
}

/// Nearest ancestor with tag `tag` and class `col-6`.
fn climb<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.ancestors().filter_map(ElementRef::wrap).find(|a| {
        a.value().name() == tag && a.value().classes().any(|c| c == PARENT_CLASS)
    })
}

/// Text of the first `tag.class` under `scope`, with `prefix` peeled off.
pub fn extract_text(scope: ElementRef<'_>, tag: &str, class: &str, prefix: Option<&str>) -> Field {
    let selector = match parse_selector(&format!("{}{}", tag, class_selector(class))) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to extract {}: {}", class, e);
            return Field::Unknown;
        }
    };

    match scope.select(&selector).next() {
        Some(el) => {
            let text = element_text(el);
            let text = match prefix {
                Some(p) => text.strip_prefix(p).map(|t| t.trim().to_string()).unwrap_or(text),
                None => text,
            };
            Field::Found(text)
        }
        None => Field::Unknown,
    }
}
