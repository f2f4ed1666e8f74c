//! Purchase flow state machine
//!
//! The confirm/processing/result sequence is modelled as a pure reducer:
//! [`transition`] takes the current [`PurchaseState`] and a [`PurchaseEvent`]
//! and returns the next state plus the [`Effect`]s the session must carry
//! out. The reducer never touches the store, the cart or the card field
//! itself, which keeps every rule of the flow testable without I/O.
//!
//! ```text
//! Idle --Start--> Confirming --Confirm--> Processing --Completed--> Succeeded
//!  ^                  |                                         \-> Failed
//!  |----Cancel--------/                                              |
//!  |<-------------------------- Acknowledge -------------------------/
//! ```

use rust_decimal::Decimal;

use crate::types::{CardId, CartLine, PosError, Receipt};

/// What the cashier reviews in the confirmation step
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Card that will be charged
    pub card: CardId,
    /// Itemised cart at the time the purchase was started
    pub lines: Vec<CartLine>,
    /// Cart total at the time the purchase was started
    pub total: Decimal,
}

/// Where the purchase flow currently is
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PurchaseState {
    /// Waiting for a purchase to be started
    #[default]
    Idle,
    /// The cashier is reviewing the itemised cart and total
    Confirming(Quote),
    /// Validators and committer are running
    Processing(Quote),
    /// The purchase was committed; the receipt is on screen
    Succeeded(Receipt),
    /// The purchase failed; the reason is on screen
    Failed(PosError),
}

impl PurchaseState {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            PurchaseState::Idle => "idle",
            PurchaseState::Confirming(_) => "confirming",
            PurchaseState::Processing(_) => "processing",
            PurchaseState::Succeeded(_) => "succeeded",
            PurchaseState::Failed(_) => "failed",
        }
    }

    /// Whether a purchase is in flight
    pub fn is_processing(&self) -> bool {
        matches!(self, PurchaseState::Processing(_))
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseEvent {
    /// The purchase action was triggered with the card field's contents
    Start {
        /// Card identifier as entered or scanned
        card_input: String,
        /// Cart lines at the time of the trigger
        lines: Vec<CartLine>,
        /// Cart total at the time of the trigger
        total: Decimal,
    },
    /// The cashier confirmed the quote
    Confirm,
    /// The cashier dismissed the confirmation (button, backdrop or Escape)
    Cancel,
    /// The processing pipeline finished
    Completed(Result<Receipt, PosError>),
    /// The cashier dismissed the result dialog
    Acknowledge,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show a transient notice; the state did not move because of it
    Notify(PosError),
    /// Run card validation, stock validation and commit for this quote
    RunPurchase(Quote),
    /// Empty the cart
    ClearCart,
    /// Clear the card field and disable it
    ResetCardField,
    /// Re-enable the card field and put the cursor in it
    FocusCardField,
}

/// Compute the next state for `event`
///
/// # Arguments
///
/// * `state` - Current state, consumed
/// * `event` - What just happened
/// * `card_digits` - Required length of a card identifier
///
/// # Returns
///
/// The next state and the effects to apply, in order. Events that make no
/// sense in the current state leave it unchanged; a purchase trigger while
/// `Processing` additionally yields a "please wait" notice.
pub fn transition(
    state: PurchaseState,
    event: PurchaseEvent,
    card_digits: usize,
) -> (PurchaseState, Vec<Effect>) {
    match (state, event) {
        (
            PurchaseState::Idle,
            PurchaseEvent::Start {
                card_input,
                lines,
                total,
            },
        ) => {
            if lines.is_empty() {
                return (PurchaseState::Idle, vec![Effect::Notify(PosError::CartEmpty)]);
            }
            match CardId::parse_with_digits(&card_input, card_digits) {
                Ok(card) => (
                    PurchaseState::Confirming(Quote { card, lines, total }),
                    Vec::new(),
                ),
                Err(e) => (
                    PurchaseState::Idle,
                    vec![Effect::Notify(e), Effect::FocusCardField],
                ),
            }
        }

        (PurchaseState::Confirming(quote), PurchaseEvent::Confirm) => (
            PurchaseState::Processing(quote.clone()),
            vec![Effect::RunPurchase(quote)],
        ),
        (PurchaseState::Confirming(_), PurchaseEvent::Cancel) => (
            PurchaseState::Idle,
            vec![Effect::Notify(PosError::Cancelled), Effect::FocusCardField],
        ),

        (state @ PurchaseState::Processing(_), PurchaseEvent::Start { .. })
        | (state @ PurchaseState::Processing(_), PurchaseEvent::Confirm)
        | (state @ PurchaseState::Processing(_), PurchaseEvent::Cancel) => {
            (state, vec![Effect::Notify(PosError::PurchaseInProgress)])
        }
        (PurchaseState::Processing(_), PurchaseEvent::Completed(Ok(receipt))) => {
            (PurchaseState::Succeeded(receipt), Vec::new())
        }
        (PurchaseState::Processing(_), PurchaseEvent::Completed(Err(error))) => {
            (PurchaseState::Failed(error), Vec::new())
        }

        (PurchaseState::Succeeded(_), PurchaseEvent::Acknowledge) => (
            PurchaseState::Idle,
            vec![Effect::ClearCart, Effect::ResetCardField],
        ),
        (PurchaseState::Failed(_), PurchaseEvent::Acknowledge) => {
            (PurchaseState::Idle, vec![Effect::FocusCardField])
        }

        (state, _) => (state, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DIGITS: usize = 10;

    fn lines() -> Vec<CartLine> {
        vec![CartLine {
            product_key: "a".to_string(),
            name: "Juice".to_string(),
            unit_price: Decimal::new(10, 0),
            quantity: 2,
            image_url: String::new(),
            category: String::new(),
        }]
    }

    fn start(card: &str, lines: Vec<CartLine>) -> PurchaseEvent {
        PurchaseEvent::Start {
            card_input: card.to_string(),
            lines,
            total: Decimal::new(20, 0),
        }
    }

    fn quote() -> Quote {
        Quote {
            card: CardId::parse("0123456789").unwrap(),
            lines: lines(),
            total: Decimal::new(20, 0),
        }
    }

    fn receipt() -> Receipt {
        Receipt {
            purchase_id: "k1".to_string(),
            student_name: "Ana".to_string(),
            lines: Vec::new(),
            total: Decimal::new(20, 0),
            new_balance: Decimal::new(80, 0),
        }
    }

    #[test]
    fn test_start_with_valid_card_confirms() {
        let (state, effects) = transition(
            PurchaseState::Idle,
            start("0123456789", lines()),
            DIGITS,
        );

        assert_eq!(state, PurchaseState::Confirming(quote()));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_start_with_empty_cart() {
        let (state, effects) =
            transition(PurchaseState::Idle, start("0123456789", Vec::new()), DIGITS);

        assert_eq!(state, PurchaseState::Idle);
        assert_eq!(effects, vec![Effect::Notify(PosError::CartEmpty)]);
    }

    #[rstest]
    #[case::short("012345678")]
    #[case::long("01234567890")]
    #[case::letters("01234abcde")]
    #[case::empty("")]
    fn test_start_with_invalid_card(#[case] card: &str) {
        let (state, effects) = transition(PurchaseState::Idle, start(card, lines()), DIGITS);

        assert_eq!(state, PurchaseState::Idle);
        assert_eq!(
            effects,
            vec![
                Effect::Notify(PosError::invalid_card_format(card, DIGITS)),
                Effect::FocusCardField
            ]
        );
    }

    #[test]
    fn test_confirm_runs_purchase() {
        let (state, effects) = transition(
            PurchaseState::Confirming(quote()),
            PurchaseEvent::Confirm,
            DIGITS,
        );

        assert_eq!(state, PurchaseState::Processing(quote()));
        assert_eq!(effects, vec![Effect::RunPurchase(quote())]);
    }

    #[test]
    fn test_cancel_returns_to_idle_without_clearing() {
        let (state, effects) = transition(
            PurchaseState::Confirming(quote()),
            PurchaseEvent::Cancel,
            DIGITS,
        );

        assert_eq!(state, PurchaseState::Idle);
        assert!(!effects.contains(&Effect::ClearCart));
        assert!(effects.contains(&Effect::Notify(PosError::Cancelled)));
    }

    #[rstest]
    #[case::start(start("0123456789", lines()))]
    #[case::confirm(PurchaseEvent::Confirm)]
    #[case::cancel(PurchaseEvent::Cancel)]
    fn test_processing_rejects_triggers(#[case] event: PurchaseEvent) {
        let (state, effects) =
            transition(PurchaseState::Processing(quote()), event, DIGITS);

        assert!(state.is_processing());
        assert_eq!(effects, vec![Effect::Notify(PosError::PurchaseInProgress)]);
    }

    #[test]
    fn test_completion_outcomes() {
        let (ok, _) = transition(
            PurchaseState::Processing(quote()),
            PurchaseEvent::Completed(Ok(receipt())),
            DIGITS,
        );
        let (failed, _) = transition(
            PurchaseState::Processing(quote()),
            PurchaseEvent::Completed(Err(PosError::CartEmpty)),
            DIGITS,
        );

        assert_eq!(ok, PurchaseState::Succeeded(receipt()));
        assert_eq!(failed, PurchaseState::Failed(PosError::CartEmpty));
    }

    #[test]
    fn test_acknowledge_success_clears_cart_and_card_field() {
        let (state, effects) = transition(
            PurchaseState::Succeeded(receipt()),
            PurchaseEvent::Acknowledge,
            DIGITS,
        );

        assert_eq!(state, PurchaseState::Idle);
        assert_eq!(effects, vec![Effect::ClearCart, Effect::ResetCardField]);
    }

    #[test]
    fn test_acknowledge_failure_keeps_cart_and_refocuses() {
        let (state, effects) = transition(
            PurchaseState::Failed(PosError::CartEmpty),
            PurchaseEvent::Acknowledge,
            DIGITS,
        );

        assert_eq!(state, PurchaseState::Idle);
        assert_eq!(effects, vec![Effect::FocusCardField]);
    }

    #[rstest]
    #[case::idle_confirm(PurchaseState::Idle, PurchaseEvent::Confirm)]
    #[case::idle_ack(PurchaseState::Idle, PurchaseEvent::Acknowledge)]
    #[case::confirming_restart(PurchaseState::Confirming(quote()), start("0123456789", lines()))]
    #[case::succeeded_start(PurchaseState::Succeeded(receipt()), start("0123456789", lines()))]
    #[case::idle_completed(PurchaseState::Idle, PurchaseEvent::Completed(Ok(receipt())))]
    fn test_irrelevant_events_are_ignored(
        #[case] state: PurchaseState,
        #[case] event: PurchaseEvent,
    ) {
        let (next, effects) = transition(state.clone(), event, DIGITS);

        assert_eq!(next, state);
        assert!(effects.is_empty());
    }
}
