//! City-based shipping fees.
//!
//! Shoppers type their city as free text, so zones carry a list of city
//! aliases and matching is a loose, case-insensitive substring test in either
//! direction ("Cebu City" matches an alias "cebu", and "Makati" matches
//! "makati city").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DraftError;
use crate::types::{Price, ShippingZoneId};

/// Fee charged when no city is given or no zones are configured.
pub const DEFAULT_SHIPPING_FEE: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// A shipping zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingZone {
    pub id: ShippingZoneId,
    pub name: String,
    /// City aliases, matched in order.
    pub cities: Vec<String>,
    pub shipping_fee: Decimal,
    /// Zones are checked in ascending order.
    pub display_order: i32,
    pub is_active: bool,
    /// Used when no zone matches the city.
    #[serde(default)]
    pub is_default: bool,
}

impl ShippingZone {
    /// Whether any alias matches the already-lowercased city.
    fn matches(&self, city: &str) -> bool {
        self.cities.iter().any(|alias| {
            let alias = alias.trim().to_lowercase();
            !alias.is_empty() && (city.contains(&alias) || alias.contains(city))
        })
    }
}

/// Why a quote has the fee it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingBasis {
    /// A free-shipping promo waived the fee.
    FreeShippingPromo,
    /// No city given; the default fee applies.
    CityNotSpecified,
    /// A zone alias matched the city.
    Matched,
    /// Nothing matched; the zone flagged as default was used.
    DefaultZone,
    /// Nothing matched and no zone is flagged default; the last zone in
    /// display order was used.
    LastZone,
    /// Nothing matched and there are no active zones.
    NoZones,
    /// The zone store could not be read; the default fee applies.
    StoreUnavailable,
}

/// A resolved shipping fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub fee: Decimal,
    pub zone_id: Option<ShippingZoneId>,
    pub zone_name: Option<String>,
    pub basis: ShippingBasis,
    /// Text shown next to the fee at checkout.
    pub message: String,
}

impl ShippingQuote {
    /// A quote that carries a fixed fee and no zone.
    #[must_use]
    pub fn flat(fee: Decimal, basis: ShippingBasis) -> Self {
        let message = match basis {
            ShippingBasis::FreeShippingPromo => "Free shipping".to_string(),
            ShippingBasis::CityNotSpecified => "City not specified".to_string(),
            _ => format!("Standard shipping - {}", Price::php(fee).display_whole()),
        };
        Self {
            fee,
            zone_id: None,
            zone_name: None,
            basis,
            message,
        }
    }

    fn for_zone(zone: &ShippingZone, basis: ShippingBasis) -> Self {
        Self {
            fee: zone.shipping_fee,
            zone_id: Some(zone.id),
            zone_name: Some(zone.name.clone()),
            basis,
            message: format!(
                "{} - {}",
                zone.name,
                Price::php(zone.shipping_fee).display_whole()
            ),
        }
    }
}

/// Resolve the shipping fee for a city.
///
/// Only active zones take part. They are checked in ascending
/// `display_order`, keeping the given order for equal values, and the first
/// match wins. When nothing matches, the fee comes from the zone flagged
/// `is_default`, then from the last zone in order, then `default_fee`.
#[must_use]
pub fn resolve_shipping_fee(
    city: &str,
    has_free_shipping_promo: bool,
    zones: &[ShippingZone],
    default_fee: Decimal,
) -> ShippingQuote {
    if has_free_shipping_promo {
        return ShippingQuote::flat(Decimal::ZERO, ShippingBasis::FreeShippingPromo);
    }

    let city = city.trim().to_lowercase();
    if city.is_empty() {
        return ShippingQuote::flat(default_fee, ShippingBasis::CityNotSpecified);
    }

    let mut ordered: Vec<&ShippingZone> = zones.iter().filter(|z| z.is_active).collect();
    ordered.sort_by_key(|z| z.display_order);

    if let Some(zone) = ordered.iter().find(|z| z.matches(&city)) {
        return ShippingQuote::for_zone(zone, ShippingBasis::Matched);
    }
    if let Some(zone) = ordered.iter().find(|z| z.is_default) {
        return ShippingQuote::for_zone(zone, ShippingBasis::DefaultZone);
    }
    match ordered.last() {
        Some(zone) => ShippingQuote::for_zone(zone, ShippingBasis::LastZone),
        None => ShippingQuote::flat(default_fee, ShippingBasis::NoZones),
    }
}

/// Shipping zone fields as entered in the admin form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingZoneDraft {
    pub name: String,
    pub cities: Vec<String>,
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

const fn default_true() -> bool {
    true
}

impl ShippingZoneDraft {
    /// Check the draft against the admin form's rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().chars().count() < 3 {
            return Err(DraftError::NameTooShort { min: 3 });
        }
        if !self.cities.iter().any(|c| !c.trim().is_empty()) {
            return Err(DraftError::NoCities);
        }
        if self.shipping_fee < Decimal::ZERO {
            return Err(DraftError::Negative("shipping fee"));
        }
        if self.display_order < 0 {
            return Err(DraftError::Negative("display order"));
        }
        Ok(())
    }

    /// Validate and turn the draft into a zone, dropping blank aliases.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn into_zone(self, id: ShippingZoneId) -> Result<ShippingZone, DraftError> {
        self.validate()?;
        Ok(ShippingZone {
            id,
            name: self.name.trim().to_string(),
            cities: self
                .cities
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            shipping_fee: self.shipping_fee,
            display_order: self.display_order,
            is_active: self.is_active,
            is_default: self.is_default,
        })
    }
}
