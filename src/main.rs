//! Bitso REST Client
//!
//! Command-line driver for the signed Bitso REST endpoints. Payloads are
//! printed to stdout as pretty JSON; diagnostics go to stderr.

use anyhow::{Context, Result};
use bitso_rest_client::{
    api::{
        conversions::{self, QuoteRequest},
        internal,
        onboarding::{self, AcceptTerms, TermsQuery},
        public::{self, OrderSide, OrderType, PlaceOrder},
        QuoteAmount,
    },
    config::{CredentialsFile, Settings},
    logging::{init_tracing, LogFormat},
    BitsoClient,
};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Instant;

/// Bitso REST Client
///
/// Signs and sends requests to the Bitso REST API, rotating credentials
/// when a key is rate limited.
#[derive(Parser, Debug)]
#[command(name = "bitso-rest-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Environment from the credential file (overrides BITSO_ENV)
    #[arg(short, long, global = true)]
    env: Option<String>,

    /// User whose credentials sign requests (overrides BITSO_USER)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Credential file path (overrides BITSO_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Rotate between the user's keys when one is rate limited
    #[arg(long, global = true)]
    rotate: bool,

    /// Attempts per request, including the first (overrides BITSO_MAX_ATTEMPTS)
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show account status
    AccountStatus,

    /// List catalogues
    Catalogues,

    /// Place an order
    PlaceOrder {
        /// Order book, e.g. btc_mxn
        #[arg(long)]
        book: String,
        #[arg(long, value_enum)]
        side: SideArg,
        #[arg(long = "type", value_enum, default_value_t = TypeArg::Market)]
        order_type: TypeArg,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        minor: Option<String>,
        /// Limit price
        #[arg(long)]
        price: Option<String>,
        /// Client order id (defaults to filler<millis>)
        #[arg(long)]
        origin_id: Option<String>,
    },

    /// Get a v3 conversion quote
    ConversionQuote {
        #[command(flatten)]
        amount: AmountArgs,
        /// Use the route without the /api prefix
        #[arg(long)]
        simple_path: bool,
    },

    /// List withdrawal methods
    WithdrawalMethods {
        /// Restrict to one currency
        currency: Option<String>,
    },

    /// Show combined balance
    CombinedBalance,

    /// Request a v4 conversion quote and print its id
    Quote {
        #[command(flatten)]
        amount: AmountArgs,
    },

    /// Execute a previously requested v4 quote
    ExecuteQuote {
        quote_id: String,
    },

    /// Request and execute one v4 conversion
    Convert {
        #[command(flatten)]
        amount: AmountArgs,
    },

    /// Run many conversions concurrently through one client
    Conversions {
        #[command(flatten)]
        amount: AmountArgs,
        /// Number of conversions to run
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Conversions in flight at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Get terms and conditions
    Terms {
        #[command(flatten)]
        terms: TermsArgs,
    },

    /// Accept (or decline) terms and conditions
    AcceptTerms {
        #[command(flatten)]
        terms: TermsArgs,
        /// Agree to the terms; omitted means decline
        #[arg(long)]
        agree: bool,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct AmountArgs {
    /// Source currency
    #[arg(long = "from")]
    from_currency: String,
    /// Target currency
    #[arg(long = "to")]
    to_currency: String,
    /// Amount of the source currency to spend
    #[arg(long, conflicts_with = "receive")]
    spend: Option<String>,
    /// Amount of the target currency to receive
    #[arg(long)]
    receive: Option<String>,
}

impl AmountArgs {
    fn amount(&self) -> Result<QuoteAmount> {
        Ok(QuoteAmount::from_options(
            self.spend.clone(),
            self.receive.clone(),
        )?)
    }

    fn quote_request(&self) -> Result<QuoteRequest> {
        Ok(QuoteRequest::new(
            self.from_currency.clone(),
            self.to_currency.clone(),
            self.amount()?,
        ))
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct TermsArgs {
    /// Jurisdiction codes, comma separated (e.g. MX,CO)
    #[arg(long = "jurisdiction", value_delimiter = ',')]
    jurisdictions: Vec<String>,
    #[arg(long)]
    include_text: bool,
    #[arg(long)]
    markdown: bool,
}

impl TermsArgs {
    fn query(&self) -> TermsQuery {
        TermsQuery::new()
            .with_jurisdictions(self.jurisdictions.clone())
            .with_include_text(self.include_text)
            .with_markdown(self.markdown)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for OrderSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => OrderSide::Buy,
            SideArg::Sell => OrderSide::Sell,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum TypeArg {
    Market,
    Limit,
}

impl From<TypeArg> for OrderType {
    fn from(order_type: TypeArg) -> Self {
        match order_type {
            TypeArg::Market => OrderType::Market,
            TypeArg::Limit => OrderType::Limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    // Override settings with CLI arguments
    if let Some(env) = args.env {
        settings.environment = env;
    }
    if let Some(user) = args.user {
        settings.user = Some(user);
    }
    if let Some(config) = args.config {
        settings.config_path = config;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(max_attempts) = args.max_attempts {
        settings.max_attempts = max_attempts;
    }
    if args.json_logs {
        settings.json_logs = true;
    }
    if args.rotate {
        settings.rotation_enabled = true;
    }
    settings.validate()?;

    init_tracing(&settings.log_level, LogFormat::from_flag(settings.json_logs))?;

    for warning in settings.warnings() {
        tracing::warn!("{}", warning);
    }

    let user = settings
        .user
        .clone()
        .context("No user selected; pass --user or set BITSO_USER")?;

    let credentials = CredentialsFile::load(&settings.config_path)?;
    let profile = credentials.profile(&settings.environment, &user)?;

    tracing::info!(
        environment = %settings.environment,
        user = %user,
        credentials = profile.credentials.len(),
        rotation = settings.rotation_enabled,
        max_attempts = settings.max_attempts,
        "Starting client"
    );

    let client = settings.client_builder(profile)?.build()?;

    let output = run(&client, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Dispatch one subcommand and return what should be printed
async fn run(client: &BitsoClient, command: Command) -> Result<Value> {
    let output = match command {
        Command::AccountStatus => public::account_status(client).await?,
        Command::Catalogues => public::catalogues(client).await?,
        Command::PlaceOrder {
            book,
            side,
            order_type,
            major,
            minor,
            price,
            origin_id,
        } => {
            let order = PlaceOrder::new(book, side.into(), order_type.into())
                .with_major(major.unwrap_or_default())
                .with_minor(minor.unwrap_or_default())
                .with_price(price.unwrap_or_default())
                .with_origin_id(origin_id.unwrap_or_default());
            public::place_order(client, &order).await?
        }
        Command::ConversionQuote {
            amount,
            simple_path,
        } => {
            internal::conversion_quote(
                client,
                simple_path,
                &amount.amount()?,
                &amount.from_currency,
                &amount.to_currency,
            )
            .await?
        }
        Command::WithdrawalMethods { currency } => {
            internal::withdrawal_methods(client, currency.as_deref()).await?
        }
        Command::CombinedBalance => internal::combined_balance(client).await?,
        Command::Quote { amount } => {
            let quote_id = conversions::request_quote_v4(client, &amount.quote_request()?).await?;
            json!({ "quote_id": quote_id })
        }
        Command::ExecuteQuote { quote_id } => {
            conversions::execute_quote_v4(client, &quote_id).await?
        }
        Command::Convert { amount } => {
            conversions::convert(client, &amount.quote_request()?).await?
        }
        Command::Conversions {
            amount,
            count,
            concurrency,
        } => run_conversions(client, amount.quote_request()?, count, concurrency).await,
        Command::Terms { terms } => onboarding::get_terms(client, &terms.query()).await?,
        Command::AcceptTerms {
            terms,
            agree,
            password,
        } => {
            let acceptance = AcceptTerms::new(agree, password);
            onboarding::accept_terms(client, &terms.query(), &acceptance).await?
        }
    };

    Ok(output)
}

/// Fire `count` quote+execute cycles, at most `concurrency` at a time,
/// all sharing one client (and so one credential pool and nonce source)
async fn run_conversions(
    client: &BitsoClient,
    request: QuoteRequest,
    count: usize,
    concurrency: usize,
) -> Value {
    let started = Instant::now();
    let concurrency = concurrency.max(1);

    tracing::info!(count, concurrency, "Running conversions");

    let results: Vec<(usize, Result<Value, String>)> = stream::iter(0..count)
        .map(|i| {
            let client = client.clone();
            let request = request.clone();
            async move {
                let result = conversions::convert(&client, &request).await;
                match &result {
                    Ok(_) => tracing::info!(conversion = i + 1, "Conversion completed"),
                    Err(e) => tracing::warn!(
                        conversion = i + 1,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Conversion failed"
                    ),
                }
                (i, result.map_err(|e| e.to_string()))
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let succeeded = results.iter().filter(|(_, r)| r.is_ok()).count();
    let mut failures: Vec<Value> = results
        .iter()
        .filter_map(|(i, r)| {
            r.as_ref()
                .err()
                .map(|e| json!({ "conversion": i + 1, "error": e }))
        })
        .collect();
    failures.sort_by_key(|f| f["conversion"].as_u64());

    json!({
        "requested": count,
        "succeeded": succeeded,
        "failed": count - succeeded,
        "failures": failures,
        "elapsed_ms": started.elapsed().as_millis() as u64,
        "pool": client.pool_stats(),
    })
}
