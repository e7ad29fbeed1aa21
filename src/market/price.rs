//! NO-price derivation from normalized market snapshots.

use rust_decimal::Decimal;

use super::types::MarketSnapshot;

/// Derive the NO-outcome price from a snapshot.
///
/// Precedence:
/// 1. A first-listed YES outcome quoting both sides implies the NO bid via
///    `1 - yes.best_ask`.
/// 2. The NO outcome's own best bid.
/// 3. The `outcome_prices` parallel array at the NO outcome's position.
///
/// Outcome listing order is significant and must be preserved upstream.
/// Missing fields are normal and yield `None`; the result is never negative.
pub fn derive_no_price(snapshot: &MarketSnapshot) -> Option<Decimal> {
    if let Some(first) = snapshot.outcomes.first() {
        if first.is_yes() {
            if let (Some(_bid), Some(ask)) = (first.best_bid, first.best_ask) {
                return non_negative(Decimal::ONE - ask);
            }
        }

        if let Some(bid) = snapshot.no_outcome().and_then(|o| o.best_bid) {
            return non_negative(bid);
        }
    }

    let index = snapshot.no_index()?;
    let price = snapshot.outcome_prices.get(index).copied()?;
    non_negative(price)
}

fn non_negative(price: Decimal) -> Option<Decimal> {
    (price >= Decimal::ZERO).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{CatalogSource, OutcomeQuote};
    use rust_decimal_macros::dec;
    use smallvec::{smallvec, SmallVec};

    fn snapshot(outcomes: SmallVec<[OutcomeQuote; 2]>, prices: Vec<Decimal>) -> MarketSnapshot {
        MarketSnapshot {
            id: None,
            condition_id: None,
            slug: None,
            event_slug: None,
            question: None,
            active: None,
            closed: None,
            archived: None,
            accepting_orders: None,
            end_date: None,
            outcomes,
            outcome_prices: prices,
            volume_24h: Decimal::ZERO,
            source: CatalogSource::Gamma,
        }
    }

    fn quote(name: &str, bid: Option<Decimal>, ask: Option<Decimal>) -> OutcomeQuote {
        OutcomeQuote {
            name: name.to_string(),
            best_bid: bid,
            best_ask: ask,
            last_price: None,
            token_id: None,
        }
    }

    #[test]
    fn yes_first_with_both_quotes_derives_complement() {
        let m = snapshot(
            smallvec![
                quote("Yes", Some(dec!(0.97)), Some(dec!(0.995))),
                quote("No", None, None),
            ],
            vec![],
        );
        assert_eq!(derive_no_price(&m), Some(dec!(0.005)));
    }

    #[test]
    fn no_bid_used_when_yes_quotes_incomplete() {
        // YES side only quotes an ask, so the NO outcome's own bid wins.
        let m = snapshot(
            smallvec![
                quote("Yes", None, Some(dec!(0.995))),
                quote("No", Some(dec!(0.004)), None),
            ],
            vec![],
        );
        assert_eq!(derive_no_price(&m), Some(dec!(0.004)));
    }

    #[test]
    fn no_first_with_both_quotes_uses_own_bid() {
        let m = snapshot(
            smallvec![
                quote("No", Some(dec!(0.008)), Some(dec!(0.012))),
                quote("Yes", None, None),
            ],
            vec![],
        );
        assert_eq!(derive_no_price(&m), Some(dec!(0.008)));
    }

    #[test]
    fn falls_back_to_outcome_prices_by_position() {
        let m = snapshot(
            smallvec![quote("Yes", None, None), quote("No", None, None)],
            vec![dec!(0.99), dec!(0.01)],
        );
        assert_eq!(derive_no_price(&m), Some(dec!(0.01)));
    }

    #[test]
    fn negative_complement_yields_none() {
        // An ask above 1.0 would imply a negative NO bid; reject it.
        let m = snapshot(
            smallvec![
                quote("Yes", Some(dec!(0.99)), Some(dec!(1.05))),
                quote("No", None, None),
            ],
            vec![],
        );
        assert_eq!(derive_no_price(&m), None);
    }

    #[test]
    fn negative_parallel_price_yields_none() {
        let m = snapshot(
            smallvec![quote("Yes", None, None), quote("No", None, None)],
            vec![dec!(0.99), dec!(-0.01)],
        );
        assert_eq!(derive_no_price(&m), None);
    }

    #[test]
    fn missing_everything_yields_none() {
        let m = snapshot(SmallVec::new(), vec![]);
        assert_eq!(derive_no_price(&m), None);

        let m = snapshot(
            smallvec![quote("Yes", None, None), quote("No", None, None)],
            vec![],
        );
        assert_eq!(derive_no_price(&m), None);
    }

    #[test]
    fn derived_price_is_never_negative() {
        let cases = [
            snapshot(
                smallvec![
                    quote("Yes", Some(dec!(0.5)), Some(dec!(1.5))),
                    quote("No", None, None)
                ],
                vec![],
            ),
            snapshot(
                smallvec![quote("No", Some(dec!(0.0)), None), quote("Yes", None, None)],
                vec![],
            ),
            snapshot(
                smallvec![quote("Yes", None, None), quote("No", None, None)],
                vec![dec!(1.0), dec!(0.0)],
            ),
        ];
        for case in &cases {
            if let Some(price) = derive_no_price(case) {
                assert!(price >= Decimal::ZERO);
            }
        }
    }
}
