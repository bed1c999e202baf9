use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use inventory_client::{
    config::DEFAULT_CONFIG_FILE, load_settings, BroadcastNotifier, ClassifiedError, DeleteOutcome,
    FetchOutcome, InMemorySession, InventoryClient, NotificationKind, ProductDraft,
    QueryState,
};
use shared::{
    domain::{ProductId, SortDirection, SortField},
    protocol::{PageResult, Product},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "inventory", about = "Browse and edit the product inventory")]
struct Args {
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true)]
    token: Option<String>,
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of products.
    List {
        #[arg(long, default_value_t = 0)]
        page: i64,
        #[arg(long)]
        size: Option<i64>,
        #[arg(long, value_enum, default_value_t = SortArg::Id)]
        sort: SortArg,
        #[arg(long, value_enum, default_value_t = DirArg::Asc)]
        dir: DirArg,
        #[arg(long)]
        search: Option<String>,
        /// Print the raw page as JSON.
        #[arg(long)]
        json: bool,
    },
    Get {
        id: i64,
    },
    Create(DraftArgs),
    Update {
        id: i64,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Check whether `quantity` units are in stock.
    Stock {
        id: i64,
        #[arg(long)]
        quantity: u32,
    },
}

#[derive(ClapArgs, Debug)]
struct DraftArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long, allow_hyphen_values = true)]
    price: String,
    #[arg(long, allow_hyphen_values = true)]
    quantity: String,
}

impl From<DraftArgs> for ProductDraft {
    fn from(args: DraftArgs) -> Self {
        ProductDraft::new(args.name, args.description, args.price, args.quantity)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Id,
    Name,
    Price,
    Quantity,
    CreatedAt,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => SortField::Id,
            SortArg::Name => SortField::Name,
            SortArg::Price => SortField::Price,
            SortArg::Quantity => SortField::Quantity,
            SortArg::CreatedAt => SortField::CreatedAt,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirArg {
    Asc,
    Desc,
}

impl From<DirArg> for SortDirection {
    fn from(arg: DirArg) -> Self {
        match arg {
            DirArg::Asc => SortDirection::Asc,
            DirArg::Desc => SortDirection::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)
        .with_context(|| format!("failed to load settings from {}", args.config.display()))?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if args.token.is_some() {
        settings.token = args.token;
    }

    tracing::debug!(server_url = %settings.server_url, page_size = settings.page_size, "settings loaded");

    let session = Arc::new(InMemorySession::new(settings.token.clone()));
    let notifier = Arc::new(BroadcastNotifier::default());
    let mut notifications = notifier.subscribe();
    let client = InventoryClient::connect(&settings, session, notifier)?;

    let result = run(&client, args.command).await;

    while let Ok(notification) = notifications.try_recv() {
        match notification.kind {
            NotificationKind::Success => eprintln!("✔ {}", notification.message),
            NotificationKind::Error => eprintln!("✖ {}", notification.message),
        }
    }

    result
}

async fn run(client: &InventoryClient, command: Command) -> Result<()> {
    match command {
        Command::List {
            page,
            size,
            sort,
            dir,
            search,
            json,
        } => {
            let mut query = client
                .list
                .current_query()
                .await
                .set_sort(sort.into(), dir.into());
            if let Some(size) = size {
                query = query.set_page_size(size);
            }
            if let Some(search) = search {
                query = query.set_search_term(search);
            }
            let query = query.set_page(page);

            match client.list.fetch(query.clone()).await? {
                FetchOutcome::Applied(result) if json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                FetchOutcome::Applied(result) => print_page(&query, &result),
                FetchOutcome::Stale(_) => {}
            }
        }
        Command::Get { id } => {
            let product = client.mutations.get(ProductId(id)).await?;
            print_products(std::slice::from_ref(&product));
        }
        Command::Create(draft) => {
            let product = client
                .mutations
                .create(draft.into())
                .await
                .map_err(with_field_errors)?;
            println!("Created product {}", product.id);
        }
        Command::Update { id, draft } => {
            let product = client
                .mutations
                .update(ProductId(id), draft.into())
                .await
                .map_err(with_field_errors)?;
            println!("Updated product {}", product.id);
        }
        Command::Delete { id, yes } => {
            let outcome = client
                .mutations
                .delete(ProductId(id), |id| yes || prompt_yes_no(id))
                .await?;
            match outcome {
                DeleteOutcome::Deleted { refreshed_page } => {
                    println!("Deleted product {id}; showing page {}", refreshed_page + 1)
                }
                DeleteOutcome::Cancelled => println!("Delete cancelled"),
            }
        }
        Command::Stock { id, quantity } => {
            let available = client.mutations.check_stock(ProductId(id), quantity).await?;
            if available {
                println!("{quantity} unit(s) of product {id} available");
            } else {
                println!("Not enough stock for {quantity} unit(s) of product {id}");
            }
        }
    }
    Ok(())
}

fn with_field_errors(err: ClassifiedError) -> anyhow::Error {
    for field in err.field_errors() {
        eprintln!("  {}: {}", field.field, field.message);
    }
    anyhow::Error::new(err)
}

fn prompt_yes_no(id: ProductId) -> bool {
    eprint!("Are you sure you want to delete product {id}? [y/N] ");
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_page(query: &QueryState, page: &PageResult) {
    print_products(&page.content);
    let total_pages = page.total_pages.max(1);
    println!(
        "Page {} of {} ({} products, sorted by {} {})",
        page.page_number + 1,
        total_pages,
        page.total_elements,
        query.sort_field(),
        query.sort_direction()
    );
}

fn print_products(products: &[Product]) {
    println!(
        "{:>6}  {:<24}  {:<40}  {:>10}  {:>8}  {:<10}",
        "ID", "NAME", "DESCRIPTION", "PRICE", "QTY", "CREATED"
    );
    for product in products {
        println!(
            "{:>6}  {:<24}  {:<40}  {:>10}  {:>8}  {:<10}",
            product.id,
            truncate(&product.name, 24),
            truncate(&product.description, 40),
            format!("${}", product.price),
            product.quantity,
            product.created_at.format("%Y-%m-%d")
        );
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
