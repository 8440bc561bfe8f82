use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static LATITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"latitude\s*=\s*([-+]?\d*\.\d+|[-+]?\d+);").unwrap());
static LONGITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"longitude\s*=\s*([-+]?\d*\.\d+|[-+]?\d+);").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const ZERO: Coordinates = Coordinates { latitude: 0.0, longitude: 0.0 };
}

/// Map coordinates from the first script mentioning `latitude`.
///
/// No such script yields `Coordinates::ZERO`; a script whose pair cannot be
/// read yields `None`.
pub fn extract(doc: &Html) -> Option<Coordinates> {
    let script = doc
        .select(&SCRIPT_SEL)
        .map(|s| s.text().collect::<String>())
        .find(|t| t.contains("latitude"));

    match script {
        Some(text) => {
            let coords = from_script(&text);
            if coords.is_none() {
                warn!("Script mentions latitude but no coordinate pair could be read");
            }
            coords
        }
        None => Some(Coordinates::ZERO),
    }
}

pub fn from_script(text: &str) -> Option<Coordinates> {
    let capture = |re: &Regex| -> Option<f64> { re.captures(text)?.get(1)?.as_str().parse().ok() };
    Some(Coordinates {
        latitude: capture(&LATITUDE_RE)?,
        longitude: capture(&LONGITUDE_RE)?,
    })
}
