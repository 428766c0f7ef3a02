use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::Rng;
use serde::Deserialize;

use crate::services::catalog::split_display_name;
use crate::types::{OrderIntakeError, VERIFICATION_CODE_MAX, VERIFICATION_CODE_MIN};

/// One basket line as submitted by the customer.
#[derive(Deserialize, Debug, Clone)]
pub struct DraftItem {
    pub name: String,
    pub price: i32,
    pub variant: String,
    pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct OrderDraft {
    pub items: Vec<DraftItem>,
    #[serde(rename = "totalAmount")]
    pub total_amount: i32,
    // Accepted for wire compatibility; nothing is stored from it.
    #[serde(rename = "customerInfo", default)]
    pub customer_info: Option<serde_json::Value>,
}

/// A validated line ready for insertion, with the display name already split
/// and the line total computed server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub base_name: String,
    pub size_code: String,
    pub protein: String,
    pub quantity: i32,
    pub unit_price: i32,
    pub total_amount: i32,
}

/// Rejects a malformed basket before any persistence. Prices are integral
/// minor units, so the submitted total must equal the computed sum exactly.
/// A mismatch is rejected, never silently recomputed.
pub fn validate_draft(draft: &OrderDraft) -> Result<Vec<OrderLine>, OrderIntakeError> {
    if draft.items.is_empty() {
        return Err(OrderIntakeError::EmptyBasket);
    }

    let mut lines = Vec::with_capacity(draft.items.len());
    let mut computed: i32 = 0;

    for item in &draft.items {
        if item.quantity < 1 {
            return Err(OrderIntakeError::BadQuantity(item.name.clone()));
        }
        if item.price < 0 {
            return Err(OrderIntakeError::BadPrice(item.name.clone()));
        }

        let (base_name, size_code) = split_display_name(&item.name);
        // quantities and prices come straight off the wire, so the sums
        // must not be allowed to wrap
        let line_total = item
            .price
            .checked_mul(item.quantity)
            .ok_or(OrderIntakeError::TotalOverflow)?;
        computed = computed
            .checked_add(line_total)
            .ok_or(OrderIntakeError::TotalOverflow)?;

        lines.push(OrderLine {
            base_name,
            size_code,
            protein: item.variant.clone(),
            quantity: item.quantity,
            unit_price: item.price,
            total_amount: line_total,
        });
    }

    if computed != draft.total_amount {
        return Err(OrderIntakeError::TotalMismatch {
            submitted: draft.total_amount,
            computed,
        });
    }

    Ok(lines)
}

/// Draws a candidate verification code of the canonical 5-digit width.
/// Uniqueness among active orders is checked by the caller against the DB.
pub fn draw_verification_code<R: Rng>(rng: &mut R) -> i32 {
    rng.gen_range(VERIFICATION_CODE_MIN..=VERIFICATION_CODE_MAX)
}

/// Sliding-window counter guarding order creation: at most `max` hits per
/// `window` per opaque client key. Advisory only, not a server guarantee.
#[derive(Clone)]
pub struct RateLimiter {
    window: Duration,
    max: usize,
    hits: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            window,
            max,
            hits: Arc::new(DashMap::new()),
        }
    }

    /// Records an attempt for `key` and reports whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        {
            let mut entry = self.hits.entry(key.to_owned()).or_default();
            entry.retain(|seen| now.duration_since(*seen) < self.window);
            if entry.len() >= self.max {
                return false;
            }
            entry.push(now);
        }

        // keys are client-supplied, so fully expired ones must not pile up;
        // the entry guard is dropped before this map-wide sweep
        self.hits.retain(|_, hits| {
            hits.last()
                .map_or(false, |seen| now.duration_since(*seen) < self.window)
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(items: Vec<DraftItem>, total: i32) -> OrderDraft {
        OrderDraft {
            items,
            total_amount: total,
            customer_info: None,
        }
    }

    fn item(name: &str, price: i32, variant: &str, quantity: i32) -> DraftItem {
        DraftItem {
            name: name.to_owned(),
            price,
            variant: variant.to_owned(),
            quantity,
        }
    }

    #[test]
    fn splits_names_and_computes_line_totals() {
        let lines = validate_draft(&draft(
            vec![item("Montana BBQ Hamburger Regular", 280, "Beef", 2)],
            560,
        ))
        .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].base_name, "Montana BBQ Hamburger");
        assert_eq!(lines[0].size_code, "R");
        assert_eq!(lines[0].protein, "Beef");
        assert_eq!(lines[0].total_amount, 560);
    }

    #[test]
    fn rejects_empty_basket() {
        assert_eq!(validate_draft(&draft(vec![], 0)), Err(OrderIntakeError::EmptyBasket));
    }

    #[test]
    fn rejects_total_mismatch() {
        let err = validate_draft(&draft(vec![item("Fries", 120, "", 1)], 125)).unwrap_err();
        assert_eq!(
            err,
            OrderIntakeError::TotalMismatch {
                submitted: 125,
                computed: 120
            }
        );
    }

    #[test]
    fn rejects_bad_quantity_and_price() {
        assert!(matches!(
            validate_draft(&draft(vec![item("Fries", 120, "", 0)], 0)),
            Err(OrderIntakeError::BadQuantity(_))
        ));
        assert!(matches!(
            validate_draft(&draft(vec![item("Fries", -5, "", 1)], -5)),
            Err(OrderIntakeError::BadPrice(_))
        ));
    }

    #[test]
    fn rejects_overflowing_totals() {
        let err = validate_draft(&draft(vec![item("Fries", i32::MAX, "", 2)], 0)).unwrap_err();
        assert_eq!(err, OrderIntakeError::TotalOverflow);

        let err = validate_draft(&draft(
            vec![
                item("Fries", i32::MAX, "", 1),
                item("Fries", i32::MAX, "", 1),
            ],
            0,
        ))
        .unwrap_err();
        assert_eq!(err, OrderIntakeError::TotalOverflow);
    }

    #[test]
    fn verification_code_is_five_digits() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let code = draw_verification_code(&mut rng);
            assert!((10_000..=99_999).contains(&code));
        }
    }

    #[test]
    fn rate_limiter_blocks_sixth_attempt_and_recovers() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("client-a", start));
        }
        assert!(!limiter.check_at("client-a", start));
        // a different key is unaffected
        assert!(limiter.check_at("client-b", start));
        // window expiry frees the slot again
        assert!(limiter.check_at("client-a", start + Duration::from_secs(61)));
    }

    #[test]
    fn stale_keys_are_evicted() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        for i in 0..100 {
            assert!(limiter.check_at(&format!("client-{i}"), start));
        }
        assert_eq!(limiter.hits.len(), 100);

        // one request after the window expires sweeps all stale keys
        assert!(limiter.check_at("late-client", start + Duration::from_secs(61)));
        assert_eq!(limiter.hits.len(), 1);
    }
}
