//! Promo code inspection.
//!
//! ```bash
//! stride-cli promo check SAVE10 --subtotal 1500
//! ```

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use stride_core::pricing::{compute_promo_discount, validate_promo_code};
use stride_storefront::db::PromoCodeRepository;

/// Show whether a code would apply to a cart subtotal right now.
///
/// Does not use up the code.
///
/// # Errors
///
/// Returns an error if the database is unreachable, or if the code is
/// rejected so scripts can check the exit status.
pub async fn check(code: &str, subtotal: Decimal) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let found = PromoCodeRepository::new(&pool).find_by_code(code).await?;

    match validate_promo_code(found.as_ref(), subtotal, Utc::now()) {
        Ok(promo) => {
            info!("{} is valid", promo.code);
            info!("  Type: {}", promo.kind.promo_type().as_str());
            if promo.is_free_shipping() {
                info!("  Grants free shipping");
            } else {
                info!("  Discount on {subtotal}: {}", compute_promo_discount(promo, subtotal));
            }
            match promo.usage_limit {
                Some(limit) => info!("  Used: {}/{limit}", promo.times_used),
                None => info!("  Used: {} (no limit)", promo.times_used),
            }
            info!("  Ends: {}", promo.end_date);
            Ok(())
        }
        Err(rejection) => {
            warn!(reason = ?rejection.kind(), "{rejection}");
            Err(format!("promo code '{code}' rejected").into())
        }
    }
}
