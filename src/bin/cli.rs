//! memstore CLI
//!
//! Command-line access to a local storage directory. Collections are
//! addressed by name and created on first use.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use memstore::dataset::ListOptions;
use memstore::key_value::RecordValue;
use memstore::request_queue::NewRequest;
use memstore::{MemoryStorage, StorageConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// memstore CLI
#[derive(Parser, Debug)]
#[command(name = "memstore-cli")]
#[command(about = "Local emulation of datasets, key-value stores and request queues")]
#[command(version)]
struct Args {
    /// Storage root directory (defaults to MEMSTORE_LOCAL_STORAGE_DIR or ./storage)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Keep everything in memory for this invocation
    #[arg(long)]
    no_persist: bool,

    /// Write __metadata__.json files
    #[arg(long)]
    write_metadata: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Purge the default collections
    Purge,

    /// Push JSON items to a dataset
    Push {
        dataset: String,

        /// JSON values; arrays are pushed element-wise
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Print dataset items
    Items {
        dataset: String,

        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        desc: bool,
    },

    /// Set a key-value record
    Set {
        store: String,
        key: String,
        value: String,

        /// Content type (JSON values are stored pretty-printed)
        #[arg(short, long, default_value = "text/plain; charset=utf-8")]
        content_type: String,
    },

    /// Print a key-value record
    Get { store: String, key: String },

    /// List keys of a key-value store
    Keys { store: String },

    /// Add a request to a queue
    Enqueue {
        queue: String,
        url: String,

        #[arg(long)]
        unique_key: Option<String>,

        #[arg(long)]
        forefront: bool,
    },

    /// Print pending requests of a queue
    Head {
        queue: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,memstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = StorageConfig::builder().purge_on_start(false);
    if let Some(dir) = args.dir {
        builder = builder.root_dir(dir);
    }
    if args.no_persist {
        builder = builder.persist_storage(false);
    }
    if args.write_metadata {
        builder = builder.write_metadata(true);
    }

    let storage = MemoryStorage::open(builder.build())?;
    tracing::debug!("memstore v{}", memstore::VERSION);

    match args.command {
        Commands::Purge => {
            let report = storage.purge();
            println!("{:#?}", report);
        }
        Commands::Push { dataset, items } => {
            let meta = storage.datasets().get_or_create(Some(&dataset), None)?;
            let client = storage.dataset(&meta.id);
            for raw in items {
                client.push_value(serde_json::from_str(&raw)?)?;
            }
            println!("{}", client.metadata()?.counters.item_count);
        }
        Commands::Items {
            dataset,
            offset,
            limit,
            desc,
        } => {
            let meta = storage.datasets().get_or_create(Some(&dataset), None)?;
            let page = storage
                .dataset(&meta.id)
                .list_items(ListOptions { offset, limit, desc })?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Set {
            store,
            key,
            value,
            content_type,
        } => {
            let meta = storage.key_value_stores().get_or_create(Some(&store), None)?;
            let value = if memstore::key_value::content_type::is_json(&content_type) {
                RecordValue::Json(serde_json::from_str(&value)?)
            } else {
                RecordValue::Text(value)
            };
            storage
                .key_value_store(&meta.id)
                .set_record(&key, Some(value), Some(&content_type))?;
        }
        Commands::Get { store, key } => {
            let meta = storage.key_value_stores().get_or_create(Some(&store), None)?;
            match storage.key_value_store(&meta.id).get_record(&key)? {
                Some(record) => {
                    eprintln!("content-type: {}", record.content_type);
                    println!("{}", String::from_utf8_lossy(&record.value));
                }
                None => return Err(format!("record '{}' not found", key).into()),
            }
        }
        Commands::Keys { store } => {
            let meta = storage.key_value_stores().get_or_create(Some(&store), None)?;
            for info in storage.key_value_store(&meta.id).list_keys(None, None)? {
                println!("{}\t{}", info.key, info.size);
            }
        }
        Commands::Enqueue {
            queue,
            url,
            unique_key,
            forefront,
        } => {
            let meta = storage.request_queues().get_or_create(Some(&queue), None)?;
            let mut request = NewRequest::new(url);
            if let Some(key) = unique_key {
                request = request.unique_key(key);
            }
            let outcome = storage.request_queue(&meta.id).add_request(request, forefront)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Head { queue, limit } => {
            let meta = storage.request_queues().get_or_create(Some(&queue), None)?;
            let head = storage.request_queue(&meta.id).list_head(limit)?;
            println!("{}", serde_json::to_string_pretty(&head)?);
        }
    }

    Ok(())
}
