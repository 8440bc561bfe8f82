use scraper::Html;

use crate::models::Characteristics;
use crate::parser::field::{extract_info, Field, FieldSpec, Target};

pub const ROOMS: FieldSpec = FieldSpec {
    name: "habitaciones",
    tag: "div",
    target: Target::Id("alcoba"),
    value_class: Some("attr-value"),
};

pub const BATHROOMS: FieldSpec = FieldSpec {
    name: "banios",
    tag: "div",
    target: Target::Id("banios"),
    value_class: Some("attr-value"),
};

pub const PRICE: FieldSpec = FieldSpec {
    name: "precio",
    tag: "li",
    target: Target::Class { class: "precio", text: None, parent: None },
    value_class: Some("second"),
};

pub const AREA: FieldSpec = FieldSpec {
    name: "area",
    tag: "li",
    target: Target::Class { class: "area", text: None, parent: None },
    value_class: Some("second"),
};

pub const STRATUM: FieldSpec = FieldSpec {
    name: "estrato",
    tag: "li",
    target: Target::Class { class: "estrato", text: None, parent: None },
    value_class: Some("second"),
};

pub const CLOSET: FieldSpec = FieldSpec {
    name: "closet",
    tag: "div",
    target: Target::Id("closet"),
    value_class: Some("attr-value"),
};

pub const GARAGE: FieldSpec = FieldSpec {
    name: "garaje",
    tag: "div",
    target: Target::Class {
        class: "attr-name titulo",
        text: Some("Garaje"),
        parent: Some("div"),
    },
    value_class: Some("attr-value text"),
};

pub struct Attributes {
    pub rooms: Field,
    pub bathrooms: Field,
    pub price: Field,
    pub area: Field,
    pub stratum: Field,
    pub closet: Field,
    pub garage: Field,
}

impl Attributes {
    pub fn characteristics(&self) -> Characteristics {
        Characteristics {
            stratum: self.stratum.to_string(),
            closet: self.closet.to_string(),
            garage: self.garage.to_string(),
        }
    }
}

pub fn extract(doc: &Html) -> Attributes {
    Attributes {
        rooms: extract_info(doc, &ROOMS),
        bathrooms: extract_info(doc, &BATHROOMS),
        price: extract_info(doc, &PRICE),
        area: extract_info(doc, &AREA),
        stratum: extract_info(doc, &STRATUM),
        closet: extract_info(doc, &CLOSET),
        garage: extract_info(doc, &GARAGE),
    }
}
