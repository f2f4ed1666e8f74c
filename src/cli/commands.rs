//! Subcommand execution
//!
//! Every command loads the snapshot into a [`MemoryStore`], runs against it
//! through the same core operations a sale screen would use, and writes the
//! snapshot back when the command may have changed it.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use super::args::{CliArgs, Command};
use crate::config::PosConfig;
use crate::core::audit_log::search_entries;
use crate::core::reports::load_purchases;
use crate::core::{
    AccountService, BalanceChange, CatalogCache, LogFilter, Page, PurchaseState, Quote,
    Registration, SalesReport, Session,
};
use crate::io::{
    load_snapshot, read_cart_items, save_snapshot, write_catalog_csv, write_sales_csv, CartItem,
    SnapshotError,
};
use crate::store::MemoryStore;
use crate::types::{format_currency, CardId, Cardholder, PosError, Receipt};

/// Errors that end a CLI run
#[derive(Debug, Error)]
pub enum CliError {
    /// A point-of-sale operation failed
    #[error(transparent)]
    Pos(#[from] PosError),

    /// The snapshot file could not be read or written
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Bad command input
    #[error("{0}")]
    Input(String),

    /// Output could not be written
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

/// Run the parsed command, writing results to `output`
///
/// # Errors
///
/// Returns the first error that stops the command. Validation failures of a
/// checkout are returned as `CliError::Pos` after the snapshot was saved.
pub async fn run(args: CliArgs, output: &mut dyn Write) -> Result<(), CliError> {
    let config = args.to_config();
    let digits = config.card_digits;
    let store = Arc::new(load_snapshot(&args.data).await?);

    let result = match args.command.clone() {
        Command::Catalog {
            search,
            category,
            page,
            csv,
        } => show_catalog(&store, &config, &search, category.as_deref(), page, csv, output).await,
        Command::Checkout {
            card,
            items,
            items_file,
            yes,
        } => {
            let items = collect_items(items, items_file.as_deref())?;
            checkout(&store, config, &args.cashier, &card, &items, yes, output).await
        }
        Command::TopUp { card, amount } => {
            let card = CardId::parse_with_digits(&card, digits)?;
            let service = AccountService::new(store.clone(), config);
            let change = service.top_up(&card, amount, &args.cashier).await?;
            print_balance_change("Loaded", &change, output)
        }
        Command::Refund { card, amount } => {
            let card = CardId::parse_with_digits(&card, digits)?;
            let service = AccountService::new(store.clone(), config);
            let change = service.refund(&card, amount, &args.cashier).await?;
            print_balance_change("Returned", &change, output)
        }
        Command::Register {
            card,
            lrn,
            first_name,
            middle_name,
            last_name,
            initial_balance,
        } => {
            let registration = Registration {
                card: CardId::parse_with_digits(&card, digits)?,
                lrn_number: lrn,
                first_name,
                middle_name,
                last_name,
                initial_balance,
            };
            let service = AccountService::new(store.clone(), config);
            let cardholder = service.register_card(&registration, &args.cashier).await?;
            writeln!(output, "Registered {}", cardholder.full_name())?;
            print_cardholder(&cardholder, output)
        }
        Command::Disable { card } | Command::Enable { card } => {
            let disabled = matches!(args.command, Command::Disable { .. });
            let card = CardId::parse_with_digits(&card, digits)?;
            let service = AccountService::new(store.clone(), config);
            let cardholder = service.set_disabled(&card, disabled, &args.cashier).await?;
            print_cardholder(&cardholder, output)
        }
        Command::Balance { card } => {
            let card = CardId::parse_with_digits(&card, digits)?;
            let service = AccountService::new(store.clone(), config);
            let cardholder = service.balance_inquiry(&card).await?;
            print_cardholder(&cardholder, output)
        }
        Command::Report { csv } => show_report(&store, &config, csv, output).await,
        Command::Logs {
            limit,
            action,
            search,
            date,
        } => {
            let filter = LogFilter {
                action,
                search,
                date,
            };
            let entries = search_entries(store.as_ref(), &filter, limit)
                .await
                .map_err(PosError::from)?;
            for entry in entries {
                writeln!(
                    output,
                    "{}  {:<12}  {:<16}  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    entry.user,
                    entry.message
                )?;
            }
            Ok(())
        }
    };

    if args.is_mutating() {
        save(&store, &args.data).await?;
    }
    result
}

async fn save(store: &MemoryStore, path: &Path) -> Result<(), CliError> {
    save_snapshot(store, path).await?;
    info!(path = %path.display(), "snapshot saved");
    Ok(())
}

fn collect_items(
    mut items: Vec<CartItem>,
    items_file: Option<&Path>,
) -> Result<Vec<CartItem>, CliError> {
    if let Some(path) = items_file {
        let file = std::fs::File::open(path).map_err(|e| {
            CliError::Input(format!("Failed to open '{}': {}", path.display(), e))
        })?;
        items.extend(read_cart_items(file));
    }
    if items.is_empty() {
        return Err(PosError::CartEmpty.into());
    }
    Ok(items)
}

async fn show_catalog(
    store: &MemoryStore,
    config: &PosConfig,
    search: &str,
    category: Option<&str>,
    page: usize,
    csv: bool,
    output: &mut dyn Write,
) -> Result<(), CliError> {
    let catalog = CatalogCache::new();
    catalog.refresh(store).await.map_err(PosError::from)?;
    let matches = catalog.search(search, category);

    if csv {
        return write_catalog_csv(&matches, output).map_err(CliError::Output);
    }

    let page = Page::of(&matches, page, config.products_per_page, config.products_per_page);
    for product in &page.items {
        let stock = if product.in_stock() {
            product.quantity.to_string()
        } else {
            "out of stock".to_string()
        };
        writeln!(
            output,
            "{:<22} {:<28} {:<12} {:>10}  {}",
            product.key,
            product.name,
            product.category,
            format_currency(product.price),
            stock
        )?;
    }
    writeln!(
        output,
        "Page {} of {} ({} products)",
        page.page, page.total_pages, page.total_items
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn checkout(
    store: &Arc<MemoryStore>,
    config: PosConfig,
    cashier: &str,
    card: &str,
    items: &[CartItem],
    yes: bool,
    output: &mut dyn Write,
) -> Result<(), CliError> {
    let mut session = Session::open(store.clone(), config, cashier).await?;

    for item in items {
        let already = session.cart().quantity_of(&item.product_key);
        if !session.add_item(&item.product_key) {
            return Err(CliError::Input(format!(
                "Product '{}' is not for sale or out of stock",
                item.product_key
            )));
        }
        session.set_quantity(&item.product_key, already.saturating_add(item.quantity));
    }

    session.input_card(card);
    let PurchaseState::Confirming(quote) = session.start_purchase(card) else {
        let notice = session
            .take_notices()
            .into_iter()
            .next()
            .unwrap_or(PosError::CartEmpty);
        return Err(notice.into());
    };

    print_quote(&quote, output)?;
    if !yes && !prompt_confirmation(output)? {
        session.cancel();
        writeln!(output, "{}", PosError::Cancelled)?;
        return Ok(());
    }

    let outcome = session.confirm_and_process().await;
    session.acknowledge();
    match outcome {
        PurchaseState::Succeeded(receipt) => print_receipt(&receipt, output),
        PurchaseState::Failed(error) => Err(error.into()),
        other => Err(CliError::Input(format!(
            "Purchase ended in unexpected state '{}'",
            other.name()
        ))),
    }
}

fn prompt_confirmation(output: &mut dyn Write) -> Result<bool, CliError> {
    write!(output, "Confirm purchase? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn print_quote(quote: &Quote, output: &mut dyn Write) -> Result<(), CliError> {
    writeln!(output, "Card: {}", quote.card)?;
    for line in &quote.lines {
        writeln!(
            output,
            "  {:<28} {:>4} x {:>10} = {:>10}",
            line.name,
            line.quantity,
            format_currency(line.unit_price),
            format_currency(line.subtotal())
        )?;
    }
    writeln!(output, "Total: {}", format_currency(quote.total))?;
    Ok(())
}

fn print_receipt(receipt: &Receipt, output: &mut dyn Write) -> Result<(), CliError> {
    writeln!(output, "Purchase {} for {}", receipt.purchase_id, receipt.student_name)?;
    writeln!(output, "Charged:     {}", format_currency(receipt.total))?;
    writeln!(output, "New balance: {}", format_currency(receipt.new_balance))?;
    Ok(())
}

fn print_cardholder(cardholder: &Cardholder, output: &mut dyn Write) -> Result<(), CliError> {
    writeln!(output, "Name:    {}", cardholder.full_name())?;
    writeln!(output, "Card:    {}", cardholder.id_number)?;
    writeln!(output, "Balance: {}", format_currency(cardholder.balance))?;
    if cardholder.disabled {
        writeln!(output, "Status:  disabled")?;
    }
    Ok(())
}

fn print_balance_change(
    verb: &str,
    change: &BalanceChange,
    output: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(
        output,
        "{} {} for {} (card {})",
        verb,
        format_currency(change.amount),
        change.cardholder.full_name(),
        change.cardholder.id_number
    )?;
    writeln!(output, "Previous balance: {}", format_currency(change.previous_balance))?;
    writeln!(output, "New balance:      {}", format_currency(change.new_balance))?;
    Ok(())
}

async fn show_report(
    store: &MemoryStore,
    config: &PosConfig,
    csv: bool,
    output: &mut dyn Write,
) -> Result<(), CliError> {
    let purchases = load_purchases(store).await.map_err(PosError::from)?;
    let catalog = CatalogCache::new();
    catalog.refresh(store).await.map_err(PosError::from)?;
    let report = SalesReport::build(
        &purchases,
        &catalog.snapshot(),
        Utc::now(),
        config.low_stock_threshold,
    );

    if csv {
        return write_sales_csv(&report, output).map_err(CliError::Output);
    }

    writeln!(output, "Purchases:     {}", report.purchase_count)?;
    writeln!(output, "Total sales:   {}", format_currency(report.total_sales))?;
    writeln!(output, "Last 7 days:   {}", format_currency(report.last_7_days))?;
    writeln!(output, "Last 30 days:  {}", format_currency(report.last_30_days))?;
    writeln!(output, "Last 365 days: {}", format_currency(report.last_365_days))?;
    writeln!(output)?;
    for sales in &report.products {
        writeln!(
            output,
            "  {:<28} {:>6} {:>12}",
            sales.name,
            sales.units_sold,
            format_currency(sales.revenue)
        )?;
    }
    if !report.low_stock.is_empty() {
        writeln!(output)?;
        writeln!(output, "Low stock ({} items):", report.low_stock.len())?;
        for product in &report.low_stock {
            writeln!(output, "  {:<28} {:>6}", product.name, product.quantity)?;
        }
    }
    Ok(())
}
