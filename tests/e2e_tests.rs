//! End-to-end integration tests
//!
//! These tests drive complete purchases through a [`Session`] backed by a
//! seeded [`MemoryStore`], then inspect the store the way the reporting side
//! would. Each test:
//! 1. Seeds products and cardholders
//! 2. Fills the cart, scans a card and runs the purchase flow
//! 3. Checks the outcome, the cart and card field, and every written record
//!
//! The CLI tests at the bottom run the same flows through `cli::run` against a
//! snapshot file in a temporary directory.

#[cfg(test)]
mod tests {
    use canteen_pos::cli::{self, CliArgs, CliError};
    use canteen_pos::io::{load_snapshot, save_snapshot};
    use canteen_pos::store::{children, DataStore, MemoryStore};
    use canteen_pos::types::{
        Cardholder, PosError, Product, PurchaseRecord, StockShortage,
    };
    use canteen_pos::{PosConfig, PurchaseState, Session};
    use clap::Parser;
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const CARD: &str = "0123456789";

    fn canteen() -> Value {
        json!({
            "products": {
                "a": {"name": "Orange Juice", "price": 10, "quantity": 10, "category": "Drinks"},
                "b": {"name": "Pandesal", "price": "5.00", "quantity": 4, "category": "Bread"},
                "c": {"name": "Banana Cue", "price": 12.5, "quantity": 3, "category": "Snacks"}
            },
            "student_users": {
                "u1": {
                    "id_number": CARD,
                    "lrn_number": "LRN-1",
                    "student_fname": "Ana",
                    "student_lname": "Reyes",
                    "balance": 100
                },
                "u2": {
                    "id_number": "9999999999",
                    "student_fname": "Ben",
                    "balance": 500,
                    "disabled": true
                }
            }
        })
    }

    #[fixture]
    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::from_snapshot(canteen()).unwrap())
    }

    async fn open(store: &Arc<MemoryStore>) -> Session<MemoryStore> {
        Session::open(store.clone(), PosConfig::default(), "Maria")
            .await
            .unwrap()
    }

    /// Put `quantity` units of each product in the cart
    fn fill_cart(session: &mut Session<MemoryStore>, items: &[(&str, u32)]) {
        for (key, quantity) in items {
            assert!(session.add_item(key), "could not add {}", key);
            session.change_quantity(key, i64::from(*quantity) - 1);
        }
    }

    async fn product(store: &MemoryStore, key: &str) -> Product {
        let doc = store.get(&format!("products/{key}")).await.unwrap().unwrap();
        Product::from_json(key, &doc)
    }

    async fn cardholder(store: &MemoryStore, key: &str) -> Cardholder {
        let doc = store
            .get(&format!("student_users/{key}"))
            .await
            .unwrap()
            .unwrap();
        Cardholder::from_json(key, &doc)
    }

    async fn purchases(store: &MemoryStore) -> Vec<PurchaseRecord> {
        let collection = store.get("purchases").await.unwrap().unwrap_or(Value::Null);
        children(&collection)
            .map(|(key, doc)| PurchaseRecord::from_json(key, doc))
            .collect()
    }

    async fn log_count(store: &MemoryStore) -> usize {
        let collection = store.get("logs").await.unwrap().unwrap_or(Value::Null);
        children(&collection).count()
    }

    #[rstest]
    #[tokio::test]
    async fn test_successful_purchase(store: Arc<MemoryStore>) {
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("a", 2), ("b", 1)]);
        session.input_card(CARD);

        let PurchaseState::Confirming(quote) = session.start_purchase(CARD) else {
            panic!("expected a quote, notices: {:?}", session.take_notices());
        };
        assert_eq!(quote.total, Decimal::new(25, 0));

        let PurchaseState::Succeeded(receipt) = session.confirm_and_process().await else {
            panic!("expected success");
        };
        assert_eq!(receipt.total, Decimal::new(25, 0));
        assert_eq!(receipt.new_balance, Decimal::new(75, 0));
        assert_eq!(receipt.student_name, "Ana Reyes");

        assert_eq!(product(&store, "a").await.quantity, 8);
        assert_eq!(product(&store, "b").await.quantity, 3);
        assert_eq!(product(&store, "c").await.quantity, 3);
        assert_eq!(cardholder(&store, "u1").await.balance, Decimal::new(75, 0));

        let records = purchases(&store).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_price, Decimal::new(25, 0));
        assert_eq!(records[0].id_number, CARD);
        assert_eq!(records[0].cashier, "Maria");
        assert_eq!(records[0].purchase_id, receipt.purchase_id);
        assert_eq!(log_count(&store).await, 1);

        // the committed stock reaches the session's catalog
        assert_eq!(session.catalog().get("a").unwrap().quantity, 8);
    }

    #[rstest]
    #[tokio::test]
    async fn test_acknowledged_success_resets_session(store: Arc<MemoryStore>) {
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("a", 1)]);
        session.input_card(CARD);
        session.start_purchase(CARD);
        session.confirm_and_process().await;

        // the field stays locked until the receipt is dismissed
        assert!(!session.card_field().enabled);

        assert_eq!(session.acknowledge(), PurchaseState::Idle);
        assert!(session.cart().is_empty());
        assert!(session.card_field().value.is_empty());
        assert!(!session.card_field().enabled);
        assert!(!session.can_purchase());
    }

    #[rstest]
    #[case::insufficient_balance(CARD, &[("a", 9), ("c", 1)])]
    #[case::unknown_card("5555555555", &[("a", 1)])]
    #[case::disabled_account("9999999999", &[("a", 1)])]
    #[case::insufficient_stock(CARD, &[("b", 4), ("c", 3)])]
    #[tokio::test]
    async fn test_failed_purchase_keeps_cart(
        store: Arc<MemoryStore>,
        #[case] card: &str,
        #[case] items: &[(&str, u32)],
    ) {
        let mut session = open(&store).await;
        fill_cart(&mut session, items);
        // somebody else buys while this cart is being rung up
        if items.iter().any(|(key, _)| *key == "b") {
            store.set("products/b/quantity", json!(1)).await.unwrap();
        }
        let before = session.cart().clone();

        session.input_card(card);
        session.start_purchase(card);
        let outcome = session.confirm_and_process().await;
        assert!(matches!(outcome, PurchaseState::Failed(_)), "{outcome:?}");

        assert_eq!(session.cart(), &before);
        assert_eq!(session.acknowledge(), PurchaseState::Idle);
        assert_eq!(session.cart(), &before);
        assert!(session.card_field().enabled);
        assert!(session.card_field().focused);

        assert!(purchases(&store).await.is_empty());
        assert_eq!(log_count(&store).await, 0);
        assert_eq!(cardholder(&store, "u1").await.balance, Decimal::new(100, 0));
    }

    #[rstest]
    #[tokio::test]
    async fn test_insufficient_balance_message(store: Arc<MemoryStore>) {
        store
            .set("products/a/quantity", json!(20))
            .await
            .unwrap();
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("a", 15)]);

        session.start_purchase(CARD);
        let PurchaseState::Failed(error) = session.confirm_and_process().await else {
            panic!("expected failure");
        };

        let message = error.to_string();
        assert!(message.contains("100.00"), "{message}");
        assert!(message.contains("150.00"), "{message}");
    }

    #[rstest]
    #[tokio::test]
    async fn test_every_short_line_reported(store: Arc<MemoryStore>) {
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("c", 3), ("a", 5), ("b", 2)]);
        store.set("products/c/quantity", json!(1)).await.unwrap();
        store.set("products/a/quantity", json!(3)).await.unwrap();

        session.start_purchase(CARD);
        let PurchaseState::Failed(error) = session.confirm_and_process().await else {
            panic!("expected failure");
        };

        assert_eq!(
            error,
            PosError::InsufficientStock {
                shortages: vec![
                    StockShortage {
                        name: "Banana Cue".to_string(),
                        available: 1,
                        requested: 3,
                    },
                    StockShortage {
                        name: "Orange Juice".to_string(),
                        available: 3,
                        requested: 5,
                    },
                ],
            }
        );
        assert!(error.to_string().contains("Available: 3, Requested: 5"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_start_while_processing_asks_to_wait(store: Arc<MemoryStore>) {
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("a", 1)]);
        session.start_purchase(CARD);
        let processing = session.confirm();
        assert!(processing.is_processing());

        assert_eq!(session.start_purchase(CARD), processing);
        assert_eq!(session.take_notices(), vec![PosError::PurchaseInProgress]);

        // only the one purchase runs
        session.process().await;
        assert_eq!(session.process().await.name(), "succeeded");
        assert_eq!(purchases(&store).await.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_partial_commit_failure(store: Arc<MemoryStore>) {
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("a", 2)]);
        store.fail_writes("purchases", "permission denied");

        session.start_purchase(CARD);
        let PurchaseState::Failed(error) = session.confirm_and_process().await else {
            panic!("expected failure");
        };

        let PosError::PartialCommitFailure { succeeded, failed } = &error else {
            panic!("expected PartialCommitFailure, got {error:?}");
        };
        assert_eq!(failed.len(), 1);
        assert!(failed[0].starts_with("purchase record"));
        assert!(succeeded.iter().any(|s| s == "cardholder balance"));

        // what landed stays landed
        assert_eq!(product(&store, "a").await.quantity, 8);
        assert_eq!(cardholder(&store, "u1").await.balance, Decimal::new(80, 0));
        assert!(purchases(&store).await.is_empty());
        assert_eq!(log_count(&store).await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_cancel_keeps_cart(store: Arc<MemoryStore>) {
        let mut session = open(&store).await;
        fill_cart(&mut session, &[("a", 2), ("c", 1)]);
        let before = session.cart().clone();

        session.start_purchase(CARD);
        assert_eq!(session.cancel(), PurchaseState::Idle);

        assert_eq!(session.cart(), &before);
        assert_eq!(session.take_notices(), vec![PosError::Cancelled]);
        assert_eq!(product(&store, "a").await.quantity, 10);
    }

    #[rstest]
    #[case::add_remove(&[("a", 3), ("c", 2)], &[("a", -1), ("c", -2)], Decimal::new(20, 0))]
    #[case::fractional(&[("c", 3), ("b", 2)], &[("b", 1)], Decimal::new(5250, 2))]
    #[case::emptied(&[("a", 1)], &[("a", -5)], Decimal::ZERO)]
    #[tokio::test]
    async fn test_total_matches_lines(
        store: Arc<MemoryStore>,
        #[case] items: &[(&str, u32)],
        #[case] changes: &[(&str, i64)],
        #[case] expected: Decimal,
    ) {
        let mut session = open(&store).await;
        fill_cart(&mut session, items);
        for (key, delta) in changes {
            session.change_quantity(key, *delta);
        }

        let from_lines: Decimal = session
            .cart()
            .lines()
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();
        assert_eq!(session.total(), from_lines.round_dp(2));
        assert_eq!(session.total(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_snapshot_round_trip_after_purchase(store: Arc<MemoryStore>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("canteen.json");

        let mut session = open(&store).await;
        fill_cart(&mut session, &[("c", 2)]);
        session.start_purchase(CARD);
        session.confirm_and_process().await;
        save_snapshot(&store, &path).await.unwrap();

        let reloaded = load_snapshot(&path).await.unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(product(&reloaded, "c").await.quantity, 1);
        assert_eq!(cardholder(&reloaded, "u1").await.balance, Decimal::new(75, 0));
    }

    // CLI

    async fn seeded_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("canteen.json");
        let store = MemoryStore::from_snapshot(canteen()).unwrap();
        save_snapshot(&store, &path).await.unwrap();
        path
    }

    async fn run_cli(data: &Path, args: &[&str]) -> (Result<(), CliError>, String) {
        let data = data.to_string_lossy().to_string();
        let mut argv = vec!["canteen-pos", "--data", data.as_str(), "--cashier", "Maria"];
        argv.extend_from_slice(args);

        let mut output = Vec::new();
        let result = cli::run(CliArgs::try_parse_from(argv).unwrap(), &mut output).await;
        (result, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_cli_checkout_persists() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;

        let (result, output) = run_cli(
            &data,
            &["checkout", "--card", CARD, "--item", "a:2", "--item", "b", "--yes"],
        )
        .await;

        result.unwrap();
        assert!(output.contains("Total: "), "{output}");
        assert!(output.contains("75.00"), "{output}");

        let saved = load_snapshot(&data).await.unwrap();
        assert_eq!(product(&saved, "a").await.quantity, 8);
        assert_eq!(purchases(&saved).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cli_checkout_items_file() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;
        let items = dir.path().join("items.csv");
        std::fs::write(&items, "product,quantity\nc,2\nnope,x\na,\n").unwrap();

        let (result, _) = run_cli(
            &data,
            &[
                "checkout",
                "--card",
                CARD,
                "--items-file",
                items.to_str().unwrap(),
                "--yes",
            ],
        )
        .await;

        result.unwrap();
        let saved = load_snapshot(&data).await.unwrap();
        assert_eq!(product(&saved, "c").await.quantity, 1);
        assert_eq!(product(&saved, "a").await.quantity, 9);
        assert_eq!(cardholder(&saved, "u1").await.balance, Decimal::new(65, 0));
    }

    #[tokio::test]
    async fn test_cli_rejected_card() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;

        let (result, _) =
            run_cli(&data, &["checkout", "--card", "12345", "--item", "a", "--yes"]).await;

        assert!(matches!(
            result,
            Err(CliError::Pos(PosError::InvalidCardFormat { .. }))
        ));
        let saved = load_snapshot(&data).await.unwrap();
        assert_eq!(product(&saved, "a").await.quantity, 10);
    }

    #[tokio::test]
    async fn test_cli_top_up_then_balance() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;

        let (result, output) =
            run_cli(&data, &["top-up", "--card", CARD, "--amount", "150.50"]).await;
        result.unwrap();
        assert!(output.contains("250.50"), "{output}");

        let (result, output) = run_cli(&data, &["balance", "--card", CARD]).await;
        result.unwrap();
        assert!(output.contains("Ana Reyes"), "{output}");
        assert!(output.contains("250.50"), "{output}");

        let (result, output) = run_cli(&data, &["logs"]).await;
        result.unwrap();
        assert!(output.contains("Maria"), "{output}");
    }

    #[tokio::test]
    async fn test_cli_report_csv() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;
        run_cli(
            &data,
            &["checkout", "--card", CARD, "--item", "a:3", "--yes"],
        )
        .await
        .0
        .unwrap();

        let (result, output) = run_cli(&data, &["report", "--csv"]).await;

        result.unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("product,units_sold,revenue"));
        assert_eq!(lines.next(), Some("Orange Juice,3,30.00"));
    }

    #[tokio::test]
    async fn test_cli_repeated_item_accumulates() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;

        let (result, _) = run_cli(
            &data,
            &["checkout", "--card", CARD, "--item", "a:2", "--item", "a:3", "--yes"],
        )
        .await;

        result.unwrap();
        let saved = load_snapshot(&data).await.unwrap();
        assert_eq!(product(&saved, "a").await.quantity, 5);
        assert_eq!(cardholder(&saved, "u1").await.balance, Decimal::new(50, 0));
    }

    #[tokio::test]
    async fn test_cli_register_then_checkout() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;
        let register = [
            "register",
            "--card",
            "5555555555",
            "--lrn",
            "123456789012",
            "--first-name",
            "Carla",
            "--last-name",
            "Santos",
            "--initial-balance",
            "50",
        ];

        let (result, output) = run_cli(&data, &register).await;
        result.unwrap();
        assert!(output.contains("Registered Carla Santos"), "{output}");
        assert!(output.contains("50.00"), "{output}");

        let (result, _) = run_cli(&data, &register).await;
        assert!(matches!(
            result,
            Err(CliError::Pos(PosError::CardAlreadyRegistered { .. }))
        ));

        let (result, output) = run_cli(
            &data,
            &["checkout", "--card", "5555555555", "--item", "a:2", "--yes"],
        )
        .await;
        result.unwrap();
        assert!(output.contains("Carla Santos"), "{output}");

        let (result, output) = run_cli(&data, &["logs", "--action", "user_created"]).await;
        result.unwrap();
        assert!(
            output.contains("Maria registered a student: Carla Santos"),
            "{output}"
        );
        assert_eq!(output.lines().count(), 1, "{output}");
    }

    #[tokio::test]
    async fn test_cli_disable_blocks_checkout_until_enabled() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;
        let checkout = ["checkout", "--card", CARD, "--item", "a", "--yes"];

        let (result, output) = run_cli(&data, &["disable", "--card", CARD]).await;
        result.unwrap();
        assert!(output.contains("Status:  disabled"), "{output}");

        let (result, _) = run_cli(&data, &checkout).await;
        assert!(matches!(
            result,
            Err(CliError::Pos(PosError::AccountDisabled { .. }))
        ));
        let saved = load_snapshot(&data).await.unwrap();
        assert!(cardholder(&saved, "u1").await.disabled);
        assert_eq!(product(&saved, "a").await.quantity, 10);

        run_cli(&data, &["enable", "--card", CARD]).await.0.unwrap();
        run_cli(&data, &checkout).await.0.unwrap();

        let saved = load_snapshot(&data).await.unwrap();
        assert!(!cardholder(&saved, "u1").await.disabled);
        assert_eq!(product(&saved, "a").await.quantity, 9);
    }

    #[rstest]
    #[case::default_limit(&["refund", "--card", CARD, "--amount", "6000"], Decimal::new(5000, 0))]
    #[case::configured_limit(
        &["--max-refund", "40", "refund", "--card", CARD, "--amount", "50"],
        Decimal::new(40, 0)
    )]
    #[tokio::test]
    async fn test_cli_refund_over_limit(#[case] args: &[&str], #[case] limit: Decimal) {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;

        let (result, _) = run_cli(&data, args).await;

        match result {
            Err(CliError::Pos(PosError::RefundLimitExceeded { limit: actual })) => {
                assert_eq!(actual, limit)
            }
            other => panic!("expected refund limit error, got {other:?}"),
        }
        let saved = load_snapshot(&data).await.unwrap();
        assert_eq!(cardholder(&saved, "u1").await.balance, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn test_cli_logs_filters() {
        let dir = TempDir::new().unwrap();
        let data = seeded_file(&dir).await;
        run_cli(&data, &["top-up", "--card", CARD, "--amount", "20"])
            .await
            .0
            .unwrap();
        run_cli(&data, &["checkout", "--card", CARD, "--item", "b", "--yes"])
            .await
            .0
            .unwrap();

        let (result, output) = run_cli(&data, &["logs", "--action", "Add Load"]).await;
        result.unwrap();
        assert_eq!(output.lines().count(), 1, "{output}");
        assert!(output.contains("loaded 20.00"), "{output}");

        let (result, output) = run_cli(&data, &["logs", "--search", "MARIA"]).await;
        result.unwrap();
        assert_eq!(output.lines().count(), 2, "{output}");

        let (result, output) = run_cli(&data, &["logs", "--date", "2000-01-01"]).await;
        result.unwrap();
        assert!(output.is_empty(), "{output}");
    }
}
