use clap::{Parser, Subcommand, ValueEnum};
use medstock::application::transfer::{ExpiryPolicy, TransferService};
use medstock::domain::catalog::{Branch, Medicine, StaffMember};
use medstock::domain::ids::BranchId;
use medstock::domain::ledger::NewBatch;
use medstock::domain::ports::{
    CatalogStore, LedgerStore, NotificationStore, RequestStore, SharedCatalogStore,
    SharedLedgerStore, SharedNotificationStore, SharedRequestStore, SharedTransferExecutor,
    TransferExecutor,
};
use medstock::infrastructure::in_memory::InMemoryStore;
use medstock::interfaces::csv::report_writer::ReportWriter;
use medstock::interfaces::csv::stock_reader::StockReader;
use medstock::interfaces::http::{AppState, router};
use miette::{IntoDiagnostic, Result, miette};
use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the transfer workflow HTTP server.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Path to a persistent database (optional). If provided, uses
        /// RocksDB; requires the `storage-rocksdb` feature.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Catalog seed file (JSON with branches, medicines, staff).
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Opening-stock CSV file.
        #[arg(long)]
        stock: Option<PathBuf>,

        /// Expiration assigned to receipt batches created by transfers.
        #[arg(long, value_enum, default_value_t = ExpiryPolicyArg::EarliestSource)]
        expiry_policy: ExpiryPolicyArg,
    },
    /// Print a per-batch availability report for an opening-stock CSV.
    Report {
        /// Opening-stock CSV file.
        stock: PathBuf,

        /// Only report batches held by this branch.
        #[arg(long)]
        branch: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExpiryPolicyArg {
    EarliestSource,
    OneYearFromTransfer,
}

impl From<ExpiryPolicyArg> for ExpiryPolicy {
    fn from(arg: ExpiryPolicyArg) -> Self {
        match arg {
            ExpiryPolicyArg::EarliestSource => Self::EarliestSource,
            ExpiryPolicyArg::OneYearFromTransfer => Self::OneYearFromTransfer,
        }
    }
}

/// Catalog seed file shape.
#[derive(Deserialize, Default)]
struct CatalogSeed {
    #[serde(default)]
    branches: Vec<Branch>,
    #[serde(default)]
    medicines: Vec<Medicine>,
    #[serde(default)]
    staff: Vec<StaffMember>,
}

/// One store object wired into every port the service needs.
struct Stores {
    catalog: SharedCatalogStore,
    ledger: SharedLedgerStore,
    requests: SharedRequestStore,
    notifications: SharedNotificationStore,
    executor: SharedTransferExecutor,
}

impl Stores {
    fn from_store<S>(store: S) -> Self
    where
        S: CatalogStore
            + LedgerStore
            + RequestStore
            + NotificationStore
            + TransferExecutor
            + Clone
            + 'static,
    {
        Self {
            catalog: Arc::new(store.clone()),
            ledger: Arc::new(store.clone()),
            requests: Arc::new(store.clone()),
            notifications: Arc::new(store.clone()),
            executor: Arc::new(store),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medstock=info".parse().into_diagnostic()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            listen,
            db_path,
            catalog,
            stock,
            expiry_policy,
        } => serve(listen, db_path, catalog, stock, expiry_policy.into()).await,
        Command::Report { stock, branch } => report(&stock, branch.map(BranchId)).await,
    }
}

async fn serve(
    listen: String,
    db_path: Option<PathBuf>,
    catalog: Option<PathBuf>,
    stock: Option<PathBuf>,
    expiry_policy: ExpiryPolicy,
) -> Result<()> {
    let stores = match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store =
                medstock::infrastructure::rocksdb::RocksDbStore::open(path).into_diagnostic()?;
            Stores::from_store(store)
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            return Err(miette!(
                "--db-path requires a build with the storage-rocksdb feature"
            ));
        }
        None => Stores::from_store(InMemoryStore::new()),
    };

    if let Some(path) = catalog {
        seed_catalog(&stores, &path).await?;
    }
    if let Some(path) = stock {
        seed_stock(stores.ledger.as_ref(), &path).await?;
    }

    let service = Arc::new(
        TransferService::new(
            stores.catalog,
            stores.ledger,
            stores.requests,
            stores.notifications.clone(),
            stores.executor,
        )
        .with_expiry_policy(expiry_policy),
    );
    let app = router(AppState::new(service, stores.notifications));

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .into_diagnostic()?;
    info!(%listen, "medstock listening");
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}

async fn report(stock: &Path, branch: Option<BranchId>) -> Result<()> {
    let ledger = InMemoryStore::new();
    seed_stock(&ledger, stock).await?;

    let mut records = ledger.all_batch_records().await.into_diagnostic()?;
    if let Some(branch) = branch {
        records.retain(|r| r.batch.branch_id == branch);
    }

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_records(&records).into_diagnostic()?;
    Ok(())
}

async fn seed_catalog(stores: &Stores, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let seed: CatalogSeed = serde_json::from_reader(file).into_diagnostic()?;
    for branch in seed.branches {
        stores.catalog.insert_branch(branch).await.into_diagnostic()?;
    }
    for medicine in seed.medicines {
        stores
            .catalog
            .insert_medicine(medicine)
            .await
            .into_diagnostic()?;
    }
    for member in seed.staff {
        stores.catalog.insert_staff(member).await.into_diagnostic()?;
    }
    Ok(())
}

async fn seed_stock(ledger: &dyn LedgerStore, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    for row in StockReader::new(file).rows() {
        let batch: NewBatch = row.into_diagnostic()?.try_into().into_diagnostic()?;
        ledger.insert_batch(batch).await.into_diagnostic()?;
    }
    Ok(())
}
