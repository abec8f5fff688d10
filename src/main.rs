mod cli;

use std::path::Path;

use anyhow::{Context, Result};

use cli::{Args, Command};
use hashkv_store::{Store, StoreConfig};

fn main() -> Result<()> {
    let args = cli::parse_args();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = StoreConfig::default();
    if let Some(n) = args.max_objects_per_bucket {
        config.max_objects_per_bucket = n;
    }
    if let Some(n) = args.max_buckets_cached {
        config.max_buckets_cached = n;
    }
    if let Some(n) = args.partitions {
        config.partitions = n;
    }

    // ========================================================================
    // Destroy Is Handled Separately (Confirmation Prompt, No Reopen After)
    // ========================================================================

    if let Command::Destroy { yes } = args.command {
        return destroy(&args.root, config, yes);
    }

    // ========================================================================
    // Open The Store & Dispatch The Subcommand
    // ========================================================================

    let store = Store::with_config(&args.root, config)?;

    match args.command {
        Command::Get { key } => get(&store, &key)?,
        Command::Put { key, value } => put(&store, &key, &value)?,
        Command::Rm { key } => {
            store.remove(&key)?;
            store.flush()?;
        }
        Command::Flush => store.flush()?,
        Command::Info => print_info(&store),
        Command::Destroy { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn get(store: &Store, key: &str) -> Result<()> {
    let value: serde_json::Value = store.get(key).with_context(|| format!("getting key {key:?}"))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn put(store: &Store, key: &str, raw_value: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(raw_value).with_context(|| format!("parsing value for key {key:?} as JSON"))?;
    store.put(key, &value)?;
    store.flush()?;
    Ok(())
}

fn print_info(store: &Store) {
    let info = store.info();
    println!("cached buckets: {}", info.cached_buckets);
    println!("hits:           {}", info.hits);
    println!("misses:         {}", info.misses);
}

fn destroy(root: &Path, config: StoreConfig, yes: bool) -> Result<()> {
    if !yes {
        eprint!("Remove {} and everything under it? [y/N] ", root.display());
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("aborted");
            return Ok(());
        }
    }

    let store = Store::with_config(root, config)?;
    store.destroy()?;
    println!("destroyed {}", root.display());
    Ok(())
}
