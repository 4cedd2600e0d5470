//! Pure field-composition rules for the three join outcomes.
//!
//! Which dataset wins for which attribute encodes business policy: the
//! secondary dataset is authoritative for descriptive and physical
//! attributes, the primary dataset for commercial ones. Keep the sourcing
//! precedence exactly as written.

use crate::record::{
    COL_BRAND, COL_CATEGORY, COL_COLOR, COL_DESCRIPTION, COL_DIMENSIONS, COL_GROSS_WEIGHT,
    COL_MATERIAL, COL_NAME, COL_PRICE, COL_SKU, COL_SPECIFICATIONS, COL_STOCK, COL_SUBCATEGORY,
    COL_TITLE, COL_VOLUME, COL_WEIGHT, IMAGE_SLOTS, Record, description_column, image_column,
};
use crate::sku;

const SECONDARY_ATTRIBUTES: [&str; 6] = [
    COL_MATERIAL,
    COL_DIMENSIONS,
    COL_WEIGHT,
    COL_GROSS_WEIGHT,
    COL_VOLUME,
    COL_COLOR,
];

/// Rule A: the item exists in both datasets.
pub fn compose_matched(key: &str, primary: &Record, secondary: &Record) -> Record {
    let identifier = if primary.get(COL_SKU).trim().is_empty() {
        secondary.get(COL_SKU)
    } else {
        primary.get(COL_SKU)
    };

    let mut out = Record::new();
    out.set(COL_SKU, key);
    out.set(
        COL_TITLE,
        compose_title(secondary.get(COL_NAME), secondary.get(COL_BRAND), identifier),
    );
    out.set(COL_SUBCATEGORY, primary.get(COL_CATEGORY));
    out.set(COL_CATEGORY, secondary.get(COL_CATEGORY));
    out.set(COL_BRAND, secondary.get(COL_BRAND));
    for column in SECONDARY_ATTRIBUTES {
        out.set(column, secondary.get(column));
    }
    out.set(COL_PRICE, primary.get(COL_PRICE));
    out.set(COL_STOCK, primary.get(COL_STOCK));

    let mut segments = secondary.description_segments();
    let primary_extra = primary.get(&description_column(1));
    if !primary_extra.trim().is_empty() {
        segments.push(primary_extra);
    }
    out.set(COL_DESCRIPTION, segments.join("\n\n"));

    copy_images(&mut out, primary);
    out
}

/// Rule B: the item only exists in the primary dataset.
pub fn compose_primary_only(key: &str, primary: &Record) -> Record {
    let mut out = Record::new();
    out.set(COL_SKU, key);
    out.set(COL_TITLE, primary.get(COL_TITLE));
    out.set(COL_SUBCATEGORY, "");
    out.set(COL_CATEGORY, primary.get(COL_CATEGORY));
    out.set(COL_BRAND, primary.get(COL_BRAND));
    for column in SECONDARY_ATTRIBUTES {
        out.set(column, "");
    }
    out.set(COL_PRICE, primary.get(COL_PRICE));
    out.set(COL_STOCK, primary.get(COL_STOCK));
    out.set(COL_DESCRIPTION, primary.get(&description_column(1)));
    copy_images(&mut out, primary);
    out
}

/// Rule C: the item only exists in the secondary dataset.
pub fn compose_secondary_only(key: &str, secondary: &Record) -> Record {
    let mut out = Record::new();
    out.set(COL_SKU, key);
    out.set(
        COL_TITLE,
        compose_title(
            secondary.get(COL_NAME),
            secondary.get(COL_BRAND),
            secondary.get(COL_SKU),
        ),
    );
    out.set(COL_SUBCATEGORY, secondary.get(COL_NAME));
    out.set(COL_CATEGORY, secondary.get(COL_CATEGORY));
    out.set(COL_BRAND, secondary.get(COL_BRAND));
    for column in SECONDARY_ATTRIBUTES {
        out.set(column, secondary.get(column));
    }
    out.set(COL_PRICE, "");
    out.set(COL_STOCK, "");

    let mut segments = secondary.description_segments();
    let specifications = secondary.get(COL_SPECIFICATIONS);
    if !specifications.trim().is_empty() {
        segments.push(specifications);
    }
    out.set(COL_DESCRIPTION, segments.join("\n\n"));

    copy_images(&mut out, secondary);
    out
}

/// Cleans a product name into a title: drop the brand prefix, then the
/// first occurrence of the normalized identifier, then collapse the
/// whitespace the removals leave behind.
fn compose_title(name: &str, brand: &str, identifier: &str) -> String {
    let mut title = name.trim().to_string();

    let brand = brand.trim();
    if !brand.is_empty() {
        if let Some(rest) = strip_prefix_ci(&title, brand) {
            title = rest.trim_start().to_string();
        }
    }

    let code = sku::normalize(identifier);
    if !code.is_empty() {
        if let Some(position) = title.find(code.as_str()) {
            title.replace_range(position..position + code.len(), "");
        }
    }

    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&value[prefix.len()..]),
        _ => None,
    }
}

fn copy_images(out: &mut Record, source: &Record) {
    for slot in 1..=IMAGE_SLOTS {
        let column = image_column(slot);
        let value = source.get(&column);
        if !value.trim().is_empty() {
            out.set(column, value);
        }
    }
}
