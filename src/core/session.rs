//! Cashier session
//!
//! A [`Session`] is the explicit context object behind one cashier's sale
//! screen. It owns the cart, the card field, a handle to the Catalog Cache
//! and the purchase flow state, and is passed by reference into every
//! operation. It is created when the sale screen opens and dropped when it
//! closes; dropping it stops the catalog watcher.
//!
//! # Presentation Surface
//!
//! - cart actions: [`Session::add_item`], [`Session::change_quantity`],
//!   [`Session::remove_item`]
//! - card input: [`Session::input_card`]
//! - purchase flow: [`Session::start_purchase`], [`Session::confirm`],
//!   [`Session::cancel`], [`Session::process`], [`Session::acknowledge`]
//! - state-change notifications: [`Session::subscribe`]
//!
//! # Processing
//!
//! [`Session::confirm`] only moves the flow to `Processing`. The validators
//! and the committer run in [`Session::process`], strictly one after the
//! other, and the first failing phase decides the `Failed` reason. Triggers
//! that arrive while `Processing` produce a "please wait" notice.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::PosConfig;
use crate::core::card_validator::validate_card;
use crate::core::cart::Cart;
use crate::core::catalog::CatalogCache;
use crate::core::committer::{commit, CommitRequest};
use crate::core::flow::{transition, Effect, PurchaseEvent, PurchaseState, Quote};
use crate::core::stock_validator::validate_stock;
use crate::store::DataStore;
use crate::types::{CardId, PosError, Receipt};

/// The card-identifier input of the sale screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardField {
    /// Digits entered or scanned so far
    pub value: String,
    /// Whether the field accepts input
    pub enabled: bool,
    /// Whether the field holds the cursor
    pub focused: bool,
}

/// One cashier's sale screen
pub struct Session<S: DataStore> {
    store: Arc<S>,
    catalog: CatalogCache,
    config: PosConfig,
    cashier: String,
    cart: Cart,
    card_field: CardField,
    state: watch::Sender<PurchaseState>,
    notices: Vec<PosError>,
    watcher: Option<JoinHandle<()>>,
}

impl<S: DataStore> Session<S> {
    /// Create a session over an already loaded catalog
    ///
    /// No watcher is started; the catalog is only refreshed after commits.
    pub fn new(store: Arc<S>, catalog: CatalogCache, config: PosConfig, cashier: &str) -> Self {
        let (state, _) = watch::channel(PurchaseState::Idle);
        Session {
            store,
            catalog,
            config,
            cashier: cashier.to_string(),
            cart: Cart::new(),
            card_field: CardField::default(),
            state,
            notices: Vec::new(),
            watcher: None,
        }
    }

    /// Open a session: load the catalog and keep it in sync with the store
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `PosError::Store` if the product collection cannot be read or
    /// subscribed to.
    #[instrument(skip(store, config))]
    pub async fn open(store: Arc<S>, config: PosConfig, cashier: &str) -> Result<Self, PosError> {
        let catalog = CatalogCache::new();
        let products = catalog.refresh(store.as_ref()).await?;
        let watcher = catalog.spawn_watcher(store.as_ref())?;
        info!(products, "session opened");

        let mut session = Self::new(store, catalog, config, cashier);
        session.watcher = Some(watcher);
        Ok(session)
    }

    /// The Catalog Cache shared with this session
    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// Current cart
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Current state of the card field
    pub fn card_field(&self) -> &CardField {
        &self.card_field
    }

    /// Current purchase flow state
    pub fn state(&self) -> PurchaseState {
        self.state.borrow().clone()
    }

    /// Receive every purchase flow state change
    pub fn subscribe(&self) -> watch::Receiver<PurchaseState> {
        self.state.subscribe()
    }

    /// Drain the notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<PosError> {
        std::mem::take(&mut self.notices)
    }

    /// Cart total, rounded to currency precision
    pub fn total(&self) -> Decimal {
        self.cart.total()
    }

    /// Whether the purchase action is enabled
    ///
    /// True only in `Idle` with a non-empty cart and a syntactically valid
    /// card identifier in the card field.
    pub fn can_purchase(&self) -> bool {
        matches!(*self.state.borrow(), PurchaseState::Idle)
            && !self.cart.is_empty()
            && CardId::parse_with_digits(&self.card_field.value, self.config.card_digits).is_ok()
    }

    /// Add one unit of a product to the cart
    ///
    /// Returns `false` if the product cannot be added (unknown, out of stock,
    /// or a purchase is under way).
    pub fn add_item(&mut self, product_key: &str) -> bool {
        if !self.cart_editable() {
            return false;
        }
        let added = self.cart.add_item(&self.catalog, product_key);
        if added {
            debug!(product = product_key, "added to cart");
        }
        self.sync_card_field();
        added
    }

    /// Adjust a cart line by `delta`, removing it at zero or below
    pub fn change_quantity(&mut self, product_key: &str, delta: i64) {
        if self.cart_editable() {
            self.cart.change_quantity(product_key, delta);
            self.sync_card_field();
        }
    }

    /// Set a cart line to a typed quantity, removing it at zero
    ///
    /// Products not already in the cart are left alone.
    pub fn set_quantity(&mut self, product_key: &str, quantity: u32) {
        if self.cart_editable() {
            self.cart.set_quantity(product_key, quantity);
            self.sync_card_field();
        }
    }

    /// Remove a cart line
    pub fn remove_item(&mut self, product_key: &str) {
        if self.cart_editable() {
            self.cart.remove_item(product_key);
            self.sync_card_field();
        }
    }

    /// Empty the cart
    pub fn clear_cart(&mut self) {
        if self.cart_editable() {
            self.cart.clear();
            self.sync_card_field();
        }
    }

    /// Feed raw scanner or keyboard input into the card field
    ///
    /// Non-digits are dropped and the value is cut to the card length.
    /// Ignored while the field is disabled.
    pub fn input_card(&mut self, raw: &str) {
        if self.card_field.enabled {
            self.card_field.value = CardId::sanitize(raw, self.config.card_digits);
        }
    }

    /// Trigger the purchase action with a card identifier
    pub fn start_purchase(&mut self, card_input: &str) -> PurchaseState {
        self.dispatch(PurchaseEvent::Start {
            card_input: card_input.to_string(),
            lines: self.cart.lines().to_vec(),
            total: self.cart.total(),
        })
    }

    /// Confirm the quote under review; the flow moves to `Processing`
    pub fn confirm(&mut self) -> PurchaseState {
        self.dispatch(PurchaseEvent::Confirm)
    }

    /// Dismiss the quote under review; the cart is kept
    pub fn cancel(&mut self) -> PurchaseState {
        self.dispatch(PurchaseEvent::Cancel)
    }

    /// Dismiss the receipt or the failure reason
    pub fn acknowledge(&mut self) -> PurchaseState {
        self.dispatch(PurchaseEvent::Acknowledge)
    }

    /// Run the purchase that is in `Processing`
    ///
    /// Card validation, stock validation and commit run in that order; each
    /// starts only after the previous one succeeded. Does nothing outside
    /// `Processing`.
    ///
    /// # Returns
    ///
    /// The resulting state, `Succeeded` or `Failed`.
    pub async fn process(&mut self) -> PurchaseState {
        let PurchaseState::Processing(quote) = self.state() else {
            return self.state();
        };
        let outcome = self.run_purchase(&quote).await;
        self.dispatch(PurchaseEvent::Completed(outcome))
    }

    /// Confirm and run the purchase in one step
    pub async fn confirm_and_process(&mut self) -> PurchaseState {
        self.confirm();
        self.process().await
    }

    #[instrument(skip_all, fields(card = %quote.card, total = %quote.total))]
    async fn run_purchase(&self, quote: &Quote) -> Result<Receipt, PosError> {
        let store = self.store.as_ref();

        let cardholder = validate_card(store, &quote.card, quote.total).await?;
        let stock = validate_stock(store, &quote.lines).await?;
        commit(
            store,
            &self.catalog,
            CommitRequest {
                cardholder: &cardholder,
                lines: &quote.lines,
                total: quote.total,
                stock: &stock,
                cashier: &self.cashier,
            },
        )
        .await
    }

    fn dispatch(&mut self, event: PurchaseEvent) -> PurchaseState {
        let current = self.state();
        let (next, effects) = transition(current, event, self.config.card_digits);

        for effect in effects {
            self.apply(effect);
        }

        if let PurchaseState::Failed(e) = &next {
            warn!(error = %e, "purchase failed");
        }
        debug!(state = next.name(), "purchase state");
        self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next.clone();
                true
            }
        });
        next
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Notify(notice) => {
                debug!(notice = %notice, "notice");
                self.notices.push(notice);
            }
            Effect::RunPurchase(_) => self.card_field.enabled = false,
            Effect::ClearCart => self.cart.clear(),
            Effect::ResetCardField => {
                self.card_field = CardField::default();
            }
            Effect::FocusCardField => {
                self.card_field.enabled = true;
                self.card_field.focused = true;
            }
        }
    }

    /// The cart only changes in `Idle`
    fn cart_editable(&mut self) -> bool {
        let (editable, busy) = match &*self.state.borrow() {
            PurchaseState::Idle => (true, false),
            PurchaseState::Processing(_) => (false, true),
            _ => (false, false),
        };
        if busy {
            self.notices.push(PosError::PurchaseInProgress);
        }
        editable
    }

    /// Empty cart: field cleared and disabled. Otherwise enabled and focused.
    fn sync_card_field(&mut self) {
        if self.cart.is_empty() {
            self.card_field = CardField::default();
        } else if !self.card_field.enabled {
            self.card_field.enabled = true;
            self.card_field.focused = true;
        }
    }
}

impl<S: DataStore> Drop for Session<S> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
