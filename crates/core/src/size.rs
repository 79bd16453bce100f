//! Shoe size scales and conversion.
//!
//! Products store their sizes on the EU scale. Shoppers may pick a size on any
//! scale, so every availability check converts to EU first using the static
//! table below. Half sizes are rows of their own, never interpolated.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Errors that can occur when parsing a [`SizeValue`] or [`SizeScale`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    /// The input is not a number.
    #[error("size must be a number, got '{0}'")]
    NotANumber(String),
    /// The input is a number but not a whole or half size.
    #[error("size must be a positive whole or half size, got '{0}'")]
    NotAHalfStep(String),
    /// The scale name is not recognised.
    #[error("unknown size scale '{0}'")]
    UnknownScale(String),
}

/// A shoe size on some scale, restricted to whole and half steps.
///
/// Stored as a count of half sizes so equality and ordering are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeValue(u16);

impl SizeValue {
    /// A whole size, e.g. `SizeValue::whole(42)` is 42.
    #[must_use]
    pub const fn whole(n: u16) -> Self {
        Self(n * 2)
    }

    /// A half size, e.g. `SizeValue::half(42)` is 42.5.
    #[must_use]
    pub const fn half(n: u16) -> Self {
        Self(n * 2 + 1)
    }

    /// Returns true for sizes like 10.5.
    #[must_use]
    pub const fn is_half(self) -> bool {
        self.0 % 2 == 1
    }

    /// The size as a decimal number.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(i64::from(self.0) * 5, 1)
    }

    /// Convert a decimal to a size if it is a positive whole or half step.
    #[must_use]
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let doubled = value * Decimal::TWO;
        if value <= Decimal::ZERO || doubled.fract() != Decimal::ZERO {
            return None;
        }
        doubled.to_u16().map(Self)
    }

    /// Adult sizes start at EU 35; anything smaller is a kids size.
    #[must_use]
    pub const fn group(self) -> SizeGroup {
        if self.0 >= Self::whole(35).0 {
            SizeGroup::Adult
        } else {
            SizeGroup::Kids
        }
    }
}

impl std::fmt::Display for SizeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_half() {
            write!(f, "{}.5", self.0 / 2)
        } else {
            write!(f, "{}", self.0 / 2)
        }
    }
}

impl FromStr for SizeValue {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| SizeError::NotANumber(trimmed.to_owned()))?;
        Self::from_decimal(value).ok_or_else(|| SizeError::NotAHalfStep(trimmed.to_owned()))
    }
}

impl Serialize for SizeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SizeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SizeVisitor;

        impl de::Visitor<'_> for SizeVisitor {
            type Value = SizeValue;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a whole or half shoe size as a number or string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SizeValue, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SizeValue, E> {
                SizeValue::from_decimal(Decimal::from(v))
                    .ok_or_else(|| E::custom(SizeError::NotAHalfStep(v.to_string())))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SizeValue, E> {
                SizeValue::from_decimal(Decimal::from(v))
                    .ok_or_else(|| E::custom(SizeError::NotAHalfStep(v.to_string())))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<SizeValue, E> {
                Decimal::try_from(v)
                    .ok()
                    .and_then(SizeValue::from_decimal)
                    .ok_or_else(|| E::custom(SizeError::NotAHalfStep(v.to_string())))
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

/// Adult or kids sizing, used to group size pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeGroup {
    Adult,
    Kids,
}

/// A sizing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeScale {
    #[default]
    Eu,
    UsMen,
    UsWomen,
    Kids,
}

impl SizeScale {
    /// The wire name of the scale.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eu => "EU",
            Self::UsMen => "US_MEN",
            Self::UsWomen => "US_WOMEN",
            Self::Kids => "KIDS",
        }
    }
}

impl std::fmt::Display for SizeScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeScale {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EU" => Ok(Self::Eu),
            "US_MEN" => Ok(Self::UsMen),
            "US_WOMEN" => Ok(Self::UsWomen),
            "KIDS" => Ok(Self::Kids),
            _ => Err(SizeError::UnknownScale(s.to_owned())),
        }
    }
}

/// One row of the conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConversion {
    pub eu: SizeValue,
    pub us_men: Option<SizeValue>,
    pub us_women: Option<SizeValue>,
    pub kids: Option<SizeValue>,
    foot_length_mm: u16,
}

impl SizeConversion {
    const fn adult(eu: SizeValue, us_men: SizeValue, us_women: SizeValue, foot_mm: u16) -> Self {
        Self {
            eu,
            us_men: Some(us_men),
            us_women: Some(us_women),
            kids: None,
            foot_length_mm: foot_mm,
        }
    }

    const fn kids(eu: SizeValue, kids: SizeValue, foot_mm: u16) -> Self {
        Self {
            eu,
            us_men: None,
            us_women: None,
            kids: Some(kids),
            foot_length_mm: foot_mm,
        }
    }

    /// This row's size on the given scale, if the scale covers it.
    #[must_use]
    pub const fn in_scale(&self, scale: SizeScale) -> Option<SizeValue> {
        match scale {
            SizeScale::Eu => Some(self.eu),
            SizeScale::UsMen => self.us_men,
            SizeScale::UsWomen => self.us_women,
            SizeScale::Kids => self.kids,
        }
    }

    /// Foot length in centimetres.
    #[must_use]
    pub fn foot_length_cm(&self) -> Decimal {
        Decimal::new(i64::from(self.foot_length_mm), 1)
    }
}

impl Serialize for SizeConversion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut row = serializer.serialize_struct("SizeConversion", 5)?;
        row.serialize_field("eu", &self.eu)?;
        row.serialize_field("us_men", &self.us_men)?;
        row.serialize_field("us_women", &self.us_women)?;
        row.serialize_field("kids", &self.kids)?;
        row.serialize_field("foot_length_cm", &self.foot_length_cm())?;
        row.end()
    }
}

const fn w(n: u16) -> SizeValue {
    SizeValue::whole(n)
}

const fn h(n: u16) -> SizeValue {
    SizeValue::half(n)
}

/// EU → US men / US women / kids, plus foot length in millimetres.
static CONVERSION_TABLE: [SizeConversion; 37] = [
    // Kids (EU 24-34)
    SizeConversion::kids(w(24), h(7), 145),
    SizeConversion::kids(w(25), w(8), 152),
    SizeConversion::kids(w(26), w(9), 158),
    SizeConversion::kids(w(27), w(10), 165),
    SizeConversion::kids(w(28), w(11), 172),
    SizeConversion::kids(w(29), h(11), 178),
    SizeConversion::kids(w(30), w(12), 185),
    SizeConversion::kids(w(31), w(13), 192),
    SizeConversion::kids(w(32), w(1), 198),
    SizeConversion::kids(w(33), w(2), 205),
    SizeConversion::kids(w(34), w(3), 212),
    // Adult (EU 35-48)
    SizeConversion::adult(w(35), w(3), w(5), 218),
    SizeConversion::adult(h(35), h(3), h(5), 222),
    SizeConversion::adult(w(36), w(4), w(6), 225),
    SizeConversion::adult(h(36), h(4), h(6), 228),
    SizeConversion::adult(w(37), w(5), w(7), 232),
    SizeConversion::adult(h(37), h(5), h(7), 235),
    SizeConversion::adult(w(38), w(6), w(8), 238),
    SizeConversion::adult(h(38), h(6), h(8), 242),
    SizeConversion::adult(w(39), w(7), w(9), 245),
    SizeConversion::adult(h(39), h(7), h(9), 248),
    SizeConversion::adult(w(40), w(8), w(10), 252),
    SizeConversion::adult(h(40), h(8), h(10), 255),
    SizeConversion::adult(w(41), w(9), w(11), 258),
    SizeConversion::adult(h(41), h(9), h(11), 262),
    SizeConversion::adult(w(42), w(10), w(12), 265),
    SizeConversion::adult(h(42), h(10), h(12), 268),
    SizeConversion::adult(w(43), w(11), w(13), 272),
    SizeConversion::adult(h(43), h(11), h(13), 275),
    SizeConversion::adult(w(44), w(12), w(14), 278),
    SizeConversion::adult(h(44), h(12), h(14), 282),
    SizeConversion::adult(w(45), w(13), w(15), 285),
    SizeConversion::adult(h(45), h(13), h(15), 288),
    SizeConversion::adult(w(46), w(14), w(16), 292),
    SizeConversion::adult(h(46), h(14), h(16), 295),
    SizeConversion::adult(w(47), w(15), w(17), 298),
    SizeConversion::adult(w(48), w(16), w(18), 305),
];

/// The full conversion table, ordered by EU size.
#[must_use]
pub fn conversion_table() -> &'static [SizeConversion] {
    &CONVERSION_TABLE
}

/// Find the table row for an EU size.
#[must_use]
pub fn lookup(eu: SizeValue) -> Option<&'static SizeConversion> {
    CONVERSION_TABLE.iter().find(|row| row.eu == eu)
}

/// Convert a size on any scale to EU by scanning the table.
///
/// EU input is returned as-is, even when the table has no row for it.
#[must_use]
pub fn convert_to_eu(size: SizeValue, scale: SizeScale) -> Option<SizeValue> {
    if scale == SizeScale::Eu {
        return Some(size);
    }
    CONVERSION_TABLE
        .iter()
        .find(|row| row.in_scale(scale) == Some(size))
        .map(|row| row.eu)
}

/// Convert an EU size to another scale.
#[must_use]
pub fn convert_from_eu(eu: SizeValue, scale: SizeScale) -> Option<SizeValue> {
    lookup(eu).and_then(|row| row.in_scale(scale))
}

/// Foot length for an EU size, if the table covers it.
#[must_use]
pub fn foot_length_cm(eu: SizeValue) -> Option<Decimal> {
    lookup(eu).map(SizeConversion::foot_length_cm)
}

/// Human-readable size label, e.g. "US 10 (Men)".
#[must_use]
pub fn format_size_display(size: SizeValue, scale: SizeScale) -> String {
    match scale {
        SizeScale::Eu => format!("EU {size}"),
        SizeScale::UsMen => format!("US {size} (Men)"),
        SizeScale::UsWomen => format!("US {size} (Women)"),
        SizeScale::Kids => format!("US {size} (Kids)"),
    }
}

/// A size a product is offered in, with optional per-size stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    /// EU size.
    pub value: SizeValue,
    /// Units in stock for this size; `None` when stock is not tracked per size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl Size {
    /// A size without per-size stock tracking.
    #[must_use]
    pub const fn untracked(value: SizeValue) -> Self {
        Self { value, stock: None }
    }

    /// A size with a stock count.
    #[must_use]
    pub const fn with_stock(value: SizeValue, stock: u32) -> Self {
        Self {
            value,
            stock: Some(stock),
        }
    }

    /// Whether this size can be sold (untracked sizes always can).
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|stock| stock > 0)
    }

    /// Normalize one stored size entry.
    ///
    /// The catalog has historically stored sizes as strings (`"42"`), numbers
    /// (`42`), or objects (`{"size": "42", "stock": 3}`, also keyed by `value`
    /// or `name`). Entries that are not shoe sizes, such as apparel labels,
    /// yield `None`.
    #[must_use]
    pub fn from_json(entry: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match entry {
            Value::String(_) | Value::Number(_) => parse_size_json(entry).map(Self::untracked),
            Value::Object(map) => {
                let value = ["size", "value", "name"]
                    .iter()
                    .filter_map(|key| map.get(*key))
                    .find(|v| !v.is_null())
                    .and_then(parse_size_json)?;
                let stock = map.get("stock").map(|stock| {
                    stock
                        .as_i64()
                        .map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
                });
                Some(Self { value, stock })
            }
            _ => None,
        }
    }

    /// Normalize a stored size list, dropping entries that are not shoe sizes.
    #[must_use]
    pub fn list_from_json(entries: &serde_json::Value) -> Vec<Self> {
        entries
            .as_array()
            .map(|items| items.iter().filter_map(Self::from_json).collect())
            .unwrap_or_default()
    }
}

fn parse_size_json(value: &serde_json::Value) -> Option<SizeValue> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
            .and_then(SizeValue::from_decimal),
        _ => None,
    }
}

/// Whether a product offers `size` (given on `scale`) and has it in stock.
#[must_use]
pub fn is_size_available(product_sizes: &[Size], size: SizeValue, scale: SizeScale) -> bool {
    let Some(eu) = convert_to_eu(size, scale) else {
        return false;
    };
    product_sizes
        .iter()
        .any(|offered| offered.value == eu && offered.in_stock())
}

/// A product's sizes expressed on another scale; sizes with no equivalent are dropped.
#[must_use]
pub fn available_sizes_in(product_sizes: &[Size], scale: SizeScale) -> Vec<SizeValue> {
    product_sizes
        .iter()
        .filter_map(|size| match scale {
            SizeScale::Eu => Some(size.value),
            _ => convert_from_eu(size.value, scale),
        })
        .collect()
}
