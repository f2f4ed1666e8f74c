use crate::config::PosConfig;
use crate::io::CartItem;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Canteen point-of-sale over a JSON database export
#[derive(Parser, Debug)]
#[command(name = "canteen-pos")]
#[command(
    about = "Canteen point-of-sale: checkout, balance loading and sales reports",
    long_about = None
)]
pub struct CliArgs {
    /// JSON database export to operate on
    #[arg(
        long = "data",
        value_name = "FILE",
        default_value = "canteen.json",
        global = true,
        help = "Path to the JSON database export"
    )]
    pub data: PathBuf,

    /// Cashier recorded on purchases and audit entries
    #[arg(long = "cashier", value_name = "NAME", default_value = "Cashier", global = true)]
    pub cashier: String,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Largest amount accepted in a single top-up
    #[arg(long = "max-top-up", value_name = "AMOUNT", global = true)]
    pub max_top_up: Option<Decimal>,

    /// Largest balance an account may hold
    #[arg(long = "max-balance", value_name = "AMOUNT", global = true)]
    pub max_balance: Option<Decimal>,

    /// Largest amount returned in a single refund
    #[arg(long = "max-refund", value_name = "AMOUNT", global = true)]
    pub max_refund: Option<Decimal>,

    /// Largest opening balance of a newly registered card
    #[arg(long = "max-initial-balance", value_name = "AMOUNT", global = true)]
    pub max_initial_balance: Option<Decimal>,

    /// Stock level at or below which a product is reported as low
    #[arg(long = "low-stock", value_name = "COUNT", global = true)]
    pub low_stock_threshold: Option<u32>,

    /// Products per catalog page
    #[arg(long = "per-page", value_name = "COUNT", global = true)]
    pub per_page: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List products for sale
    Catalog {
        /// Match name, category, description or price
        #[arg(long, default_value = "")]
        search: String,
        /// Only this category ("all" for every category)
        #[arg(long)]
        category: Option<String>,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Print every match as CSV instead of a page
        #[arg(long)]
        csv: bool,
    },

    /// Ring up a purchase
    Checkout {
        /// Card identifier of the buyer
        #[arg(long, value_name = "CARD")]
        card: String,
        /// Product to buy, repeatable
        #[arg(long = "item", value_name = "KEY[:QTY]")]
        items: Vec<CartItem>,
        /// CSV file with `product,quantity` rows
        #[arg(long = "items-file", value_name = "FILE")]
        items_file: Option<PathBuf>,
        /// Confirm without prompting
        #[arg(short, long)]
        yes: bool,
    },

    /// Load balance onto a card
    TopUp {
        #[arg(long, value_name = "CARD")]
        card: String,
        #[arg(long, value_name = "AMOUNT")]
        amount: Decimal,
    },

    /// Return money from a card
    Refund {
        #[arg(long, value_name = "CARD")]
        card: String,
        #[arg(long, value_name = "AMOUNT")]
        amount: Decimal,
    },

    /// Register a new card
    Register {
        #[arg(long, value_name = "CARD")]
        card: String,
        /// Learner reference number
        #[arg(long, value_name = "LRN")]
        lrn: String,
        #[arg(long = "first-name", value_name = "NAME")]
        first_name: String,
        #[arg(long = "middle-name", value_name = "NAME", default_value = "")]
        middle_name: String,
        #[arg(long = "last-name", value_name = "NAME")]
        last_name: String,
        /// Opening balance
        #[arg(long = "initial-balance", value_name = "AMOUNT", default_value = "0")]
        initial_balance: Decimal,
    },

    /// Block a card from buying, loading and refunds
    Disable {
        #[arg(long, value_name = "CARD")]
        card: String,
    },

    /// Lift a block placed with `disable`
    Enable {
        #[arg(long, value_name = "CARD")]
        card: String,
    },

    /// Show a cardholder's balance
    Balance {
        #[arg(long, value_name = "CARD")]
        card: String,
    },

    /// Sales summary and low-stock alert
    Report {
        /// Print per-product sales as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Most recent audit log entries
    Logs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only entries of this action, e.g. "purchase" or "Add Load"
        #[arg(long)]
        action: Option<String>,
        /// Text to find in message, user or action
        #[arg(long)]
        search: Option<String>,
        /// Only entries from this day (YYYY-MM-DD, UTC)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
}

impl CliArgs {
    /// Create a PosConfig from CLI arguments
    ///
    /// Flags that are not given keep their defaults; invalid values fall
    /// back to the defaults with a warning.
    pub fn to_config(&self) -> PosConfig {
        let default = PosConfig::default();
        if self.max_top_up.is_none()
            && self.max_balance.is_none()
            && self.max_refund.is_none()
            && self.max_initial_balance.is_none()
            && self.low_stock_threshold.is_none()
            && self.per_page.is_none()
        {
            return default;
        }

        PosConfig::new(
            self.max_top_up.unwrap_or(default.max_top_up),
            self.max_balance.unwrap_or(default.max_balance),
            self.max_refund.unwrap_or(default.max_refund),
            self.max_initial_balance
                .unwrap_or(default.max_initial_balance),
            self.low_stock_threshold
                .unwrap_or(default.low_stock_threshold),
            self.per_page.unwrap_or(default.products_per_page),
        )
    }

    /// Whether the command writes to the store
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.command,
            Command::Checkout { .. }
                | Command::TopUp { .. }
                | Command::Refund { .. }
                | Command::Register { .. }
                | Command::Disable { .. }
                | Command::Enable { .. }
        )
    }
}
