//! Raw field bag to canonical record.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::NormalizationError;
use crate::models::{PropertyRecord, RawFieldBag, Source};

/// Largest price a 12 digit, 2 decimal place column can hold
const MAX_PRICE_DIGITS: u32 = 12;

/// Build the canonical record for `url` from what the rule set extracted.
///
/// Pure: the same input always yields the same output, so a failed run can
/// be normalized again safely.
pub fn normalize(
    source: Source,
    url: &str,
    raw: &RawFieldBag,
) -> Result<PropertyRecord, NormalizationError> {
    let price = parse_price(raw.price.as_deref().unwrap_or_default())?;
    let address = clean_text(raw.address.as_deref())
        .filter(|address| !address.is_empty())
        .ok_or(NormalizationError::MissingField("address"))?;

    Ok(PropertyRecord {
        source,
        url: url.to_string(),
        address,
        price,
        bedrooms: parse_count(raw.bedrooms.as_deref()),
        bathrooms: parse_count(raw.bathrooms.as_deref()),
        size: clean_text(raw.size.as_deref()),
        house_type: clean_text(raw.house_type.as_deref()),
        agent: clean_text(raw.agent.as_deref()),
        description: clean_text(raw.description.as_deref()),
        features: raw
            .features
            .iter()
            .map(|feature| feature.trim())
            .filter(|feature| !feature.is_empty())
            .map(str::to_string)
            .collect(),
        images: raw.images.clone(),
        floorplans: raw.floorplans.clone(),
    })
}

/// Strip everything but digits and `.`, then parse as a 2dp decimal.
///
/// "£1,250,000" -> 1250000.00, "POA" -> InvalidPrice.
pub fn parse_price(raw: &str) -> Result<Decimal, NormalizationError> {
    let invalid = || NormalizationError::InvalidPrice(raw.to_string());

    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return Err(invalid());
    }

    let mut price = Decimal::from_str(&digits).map_err(|_| invalid())?;
    price.rescale(2);
    // Bounds apply to the rounded value
    if price <= Decimal::ZERO || price.mantissa().unsigned_abs() >= 10u128.pow(MAX_PRICE_DIGITS) {
        return Err(invalid());
    }
    Ok(price)
}

/// First run of digits, e.g. "×3" or "3 beds" -> 3
pub fn parse_count(raw: Option<&str>) -> Option<u32> {
    let raw = raw?;
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(|text| text.trim().to_string())
}
