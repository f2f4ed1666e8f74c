//! The in-progress purchase
//!
//! A `Cart` is process-local state owned by one cashier session. Lines keep
//! the order in which products were first added, which is the order they are
//! shown, confirmed and recorded in.

use rust_decimal::Decimal;

use crate::core::catalog::CatalogCache;
use crate::types::money::round_currency;
use crate::types::{CartLine, ProductKey};

/// Mapping from product to selected quantity and unit price
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a catalog product
    ///
    /// Increments the line if the product is already in the cart, otherwise
    /// inserts a new line with quantity 1 and a snapshot of the product's
    /// name, price, image and category.
    ///
    /// # Returns
    ///
    /// `false` (and the cart is untouched) when the product is not in the
    /// catalog or has no stock. Low stock is not checked here; the stock
    /// validator re-checks every line before commit.
    pub fn add_item(&mut self, catalog: &CatalogCache, product_key: &str) -> bool {
        let Some(product) = catalog.get(product_key) else {
            return false;
        };
        if !product.in_stock() {
            return false;
        }

        match self.line_mut(product_key) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine {
                product_key: product.key.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: 1,
                image_url: product.image_url.clone(),
                category: product.category.clone(),
            }),
        }
        true
    }

    /// Adjust a line's quantity by `delta`
    ///
    /// The line is removed when the result is zero or less. Unknown products
    /// are ignored.
    pub fn change_quantity(&mut self, product_key: &str, delta: i64) {
        let Some(index) = self.position(product_key) else {
            return;
        };
        let next = i64::from(self.lines[index].quantity).saturating_add(delta);
        if next <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
    }

    /// Set a line's quantity directly, as typed into the quantity field
    ///
    /// Zero removes the line.
    pub fn set_quantity(&mut self, product_key: &str, quantity: u32) {
        let current = self.quantity_of(product_key);
        if current > 0 {
            self.change_quantity(product_key, i64::from(quantity) - i64::from(current));
        }
    }

    /// Remove a line unconditionally
    pub fn remove_item(&mut self, product_key: &str) {
        self.lines.retain(|line| line.product_key != product_key);
    }

    /// Empty the cart
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `quantity * unit_price` over all lines, rounded to 2 decimals
    ///
    /// Recomputed on every call; nothing is cached between mutations.
    pub fn total(&self) -> Decimal {
        round_currency(self.lines.iter().map(CartLine::subtotal).sum())
    }

    /// Lines in the order products were first added
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct products in the cart
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Selected quantity of a product, zero when absent
    pub fn quantity_of(&self, product_key: &str) -> u32 {
        self.lines
            .iter()
            .find(|line| line.product_key == product_key)
            .map_or(0, |line| line.quantity)
    }

    /// Total number of units across all lines
    pub fn unit_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Keys of every product in the cart
    pub fn product_keys(&self) -> impl Iterator<Item = &ProductKey> {
        self.lines.iter().map(|line| &line.product_key)
    }

    fn position(&self, product_key: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_key == product_key)
    }

    fn line_mut(&mut self, product_key: &str) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_key == product_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn catalog() -> CatalogCache {
        let catalog = CatalogCache::new();
        catalog.replace_from_snapshot(&json!({
            "a": {"name": "Juice", "price": 10, "quantity": 5, "category": "Drinks"},
            "b": {"name": "Bread", "price": "5.00", "quantity": 2, "category": "Snacks"},
            "c": {"name": "Sold Out", "price": 7, "quantity": 0},
            "d": {"name": "Candy", "price": 0.35, "quantity": 100}
        }));
        catalog
    }

    fn expected_total(cart: &Cart) -> Decimal {
        round_currency(
            cart.lines()
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum(),
        )
    }

    #[rstest]
    fn test_add_item_inserts_then_increments(catalog: CatalogCache) {
        let mut cart = Cart::new();

        assert!(cart.add_item(&catalog, "a"));
        assert!(cart.add_item(&catalog, "a"));
        assert!(cart.add_item(&catalog, "b"));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of("a"), 2);
        assert_eq!(cart.quantity_of("b"), 1);
        assert_eq!(cart.lines()[0].name, "Juice");
        assert_eq!(cart.lines()[1].category, "Snacks");
        assert_eq!(cart.total(), Decimal::new(25, 0));
    }

    #[rstest]
    fn test_add_item_out_of_stock_is_noop(catalog: CatalogCache) {
        let mut cart = Cart::new();
        cart.add_item(&catalog, "a");
        let before = cart.clone();

        assert!(!cart.add_item(&catalog, "c"));
        assert!(!cart.add_item(&catalog, "missing"));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart, before);
    }

    #[rstest]
    fn test_add_item_ignores_low_stock(catalog: CatalogCache) {
        let mut cart = Cart::new();
        for _ in 0..4 {
            assert!(cart.add_item(&catalog, "b"));
        }
        assert_eq!(cart.quantity_of("b"), 4);
    }

    #[rstest]
    #[case::increment(3, 4)]
    #[case::decrement(-1, 0)]
    #[case::below_zero(-10, 0)]
    #[case::large(1_000, 1_001)]
    fn test_change_quantity(
        catalog: CatalogCache,
        #[case] delta: i64,
        #[case] expected: u32,
    ) {
        let mut cart = Cart::new();
        cart.add_item(&catalog, "a");

        cart.change_quantity("a", delta);

        assert_eq!(cart.quantity_of("a"), expected);
        assert_eq!(cart.is_empty(), expected == 0);
    }

    #[rstest]
    fn test_set_quantity_and_remove(catalog: CatalogCache) {
        let mut cart = Cart::new();
        cart.add_item(&catalog, "a");
        cart.add_item(&catalog, "b");

        cart.set_quantity("a", 7);
        assert_eq!(cart.quantity_of("a"), 7);

        cart.set_quantity("a", 0);
        assert_eq!(cart.quantity_of("a"), 0);

        cart.remove_item("b");
        cart.remove_item("b");
        assert!(cart.is_empty());
    }

    #[rstest]
    fn test_total_matches_line_sum_across_mutations(catalog: CatalogCache) {
        let mut cart = Cart::new();
        let steps: [(&str, i64); 8] = [
            ("d", 0),
            ("a", 0),
            ("d", 2),
            ("b", 0),
            ("a", -1),
            ("d", 0),
            ("b", 5),
            ("d", -1),
        ];

        for (key, delta) in steps {
            if delta == 0 {
                cart.add_item(&catalog, key);
            } else {
                cart.change_quantity(key, delta);
            }
            assert_eq!(cart.total(), expected_total(&cart));
        }

        assert_eq!(cart.quantity_of("d"), 3);
        assert_eq!(cart.total(), Decimal::new(3105, 2));
    }

    #[rstest]
    fn test_clear(catalog: CatalogCache) {
        let mut cart = Cart::new();
        cart.add_item(&catalog, "a");
        cart.add_item(&catalog, "d");

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.unit_count(), 0);
    }
}
