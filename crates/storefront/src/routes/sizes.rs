//! Size chart handlers.

use axum::{Json, extract::Query};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::size::{
    SizeConversion, SizeScale, SizeValue, conversion_table, convert_from_eu, convert_to_eu,
    foot_length_cm, format_size_display,
};

use crate::error::{AppError, Result};

/// The full EU / US / kids conversion table.
pub async fn table() -> Json<&'static [SizeConversion]> {
    Json(conversion_table())
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub size: String,
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub size: SizeValue,
    pub from: SizeScale,
    pub to: SizeScale,
    /// `None` when the table has no mapping.
    pub result: Option<SizeValue>,
    pub display: Option<String>,
    pub eu: Option<SizeValue>,
    pub foot_length_cm: Option<Decimal>,
}

fn parse_scale(raw: &str) -> Result<SizeScale> {
    raw.parse()
        .map_err(|e: stride_core::size::SizeError| AppError::BadRequest(e.to_string()))
}

/// Convert a size between scales. `from` defaults to EU.
pub async fn convert(Query(query): Query<ConvertQuery>) -> Result<Json<ConvertResponse>> {
    let size: SizeValue = query
        .size
        .parse()
        .map_err(|e: stride_core::size::SizeError| AppError::BadRequest(e.to_string()))?;
    let from = query.from.as_deref().map_or(Ok(SizeScale::Eu), parse_scale)?;
    let to = parse_scale(&query.to)?;

    let eu = convert_to_eu(size, from);
    let result = eu.and_then(|eu| convert_from_eu(eu, to));

    Ok(Json(ConvertResponse {
        size,
        from,
        to,
        result,
        display: result.map(|value| format_size_display(value, to)),
        eu,
        foot_length_cm: eu.and_then(foot_length_cm),
    }))
}
