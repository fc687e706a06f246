// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::{style, Term};
use kobosync_config::{Config, ConfigManager};
use kobosync_core::types::{FieldValue, Validator};
use kobosync_database::queries::{
    collection_contents, find_by_title, list_books as db_list_books, list_collections, remove,
};
use kobosync_database::{CatalogStore, DatabaseConfig};
use kobosync_library::{
    init_document, load_document, metadata_path, save_document, InitOptions, ListOptions,
};
use kobosync_sync_engine::{
    DeviceLayout, DeviceReadySignal, FsCopier, SyncError, SyncMode, SyncOptions, SyncOrchestrator,
    SyncReport, SyncResult,
};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Configuration plus the global command-line arguments
pub struct Settings {
    pub config: Config,
    pub path: PathBuf,
}

impl Settings {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self { config, path }
    }

    fn metadata_path(&self) -> PathBuf {
        metadata_path(&self.path, &self.config.library.metadata_file)
    }

    fn listing(&self) -> ListOptions {
        ListOptions::new()
            .with_extensions(&self.config.library.archive_extensions)
            .with_ignore(self.config.library.ignore.iter().cloned())
    }

    /// Device layout with `-k`, `-u` and `-m` applied over the configuration
    fn layout(&self, matches: &ArgMatches) -> Result<DeviceLayout> {
        let mut device = self.config.device.clone();
        if let Some(kobo) = matches.get_one::<String>("kobo") {
            device.device_name = kobo.clone();
        }
        if let Some(user) = matches.get_one::<String>("user") {
            device.user = Some(user.clone());
        }

        match matches.get_one::<String>("mount") {
            Some(mount) => Ok(DeviceLayout {
                mount: PathBuf::from(mount),
                books_dir: device.books_dir,
                onboard_root: device.onboard_root,
                database_file: device.database_file,
            }),
            None => DeviceLayout::from_config(&device).context("Failed to locate the device"),
        }
    }
}

/// Create the metadata file of a series
pub fn init_series(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let dir = &settings.path;
    let name = match matches.get_one::<String>("series") {
        Some(name) => name.clone(),
        None => directory_name(dir)?,
    };

    let options = InitOptions {
        filename: settings.config.library.metadata_file.clone(),
        start_index: matches
            .get_one::<u32>("index")
            .copied()
            .unwrap_or(settings.config.library.start_index),
        listing: settings.listing(),
        force: matches.get_flag("force"),
    };

    let doc = init_document(dir, &name, &options)
        .with_context(|| format!("Failed to initialize {}", dir.display()))?;

    println!(
        "{} Created {} for '{}' with {} volumes",
        style("✓").green().bold(),
        settings.metadata_path().display(),
        doc.name,
        doc.volumes.len()
    );
    println!("  Fill in the TODO fields before syncing.");

    Ok(())
}

/// Copy volumes to the device and update its library
pub async fn sync_series(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let mode = if matches.get_flag("oneshot") {
        SyncMode::Oneshot
    } else {
        SyncMode::Series
    };
    let mut options = SyncOptions::new(mode);
    if let Some(volumes) = matches.get_many::<u32>("volumes") {
        options = options.with_volumes(volumes.copied());
    }

    let layout = settings.layout(matches)?;
    debug!(
        "Device mount {}, catalog {}",
        layout.mount().display(),
        layout.database_path().display()
    );
    if !layout.mount().is_dir() {
        bail!("Device is not mounted at {}", layout.mount().display());
    }

    let mut sync = SyncOrchestrator::new(&settings.path, layout, options)
        .with_metadata_file(settings.config.library.metadata_file.clone());
    let mut store = sync.catalog();

    let report = if matches.get_flag("update-only") {
        sync.scan().context("Failed to read the series")?;
        sync.confirm_device_ready()?;
        sync.update(&mut store)
            .await
            .context("Failed to update the device library")?
            .clone()
    } else {
        let mut signal: Box<dyn DeviceReadySignal> = if matches.get_flag("yes") {
            Box::new(|| -> SyncResult<()> { Ok(()) })
        } else {
            Box::new(ReplugPrompt::new())
        };
        sync.run(&FsCopier, &mut *signal, &mut store)
            .await
            .context("Sync failed")?
    };

    if matches.get_flag("json") {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Inspect or edit the configuration file
pub fn config_command(manager: &ConfigManager, matches: &ArgMatches) -> Result<()> {
    let path = manager.config_path();

    match matches.subcommand() {
        Some(("path", _)) => println!("{}", path.display()),
        Some(("show", _)) => {
            let config = manager
                .load_with_env_overrides()
                .with_context(|| format!("Failed to load {}", path.display()))?;
            print!("{}", config.to_toml()?);
        }
        Some(("check", _)) => {
            let problems = manager
                .validate()
                .with_context(|| format!("Failed to load {}", path.display()))?;
            if problems.is_empty() {
                println!("{} {} is valid", style("✓").green().bold(), path.display());
            } else {
                for problem in &problems {
                    println!("{} {}", style("!").yellow().bold(), problem);
                }
                bail!("{} has {} invalid settings", path.display(), problems.len());
            }
        }
        Some(("init", init)) => {
            if init.get_flag("force") {
                manager.reset()?;
                info!("Config reset to defaults at {}", path.display());
            } else if !manager.initialize()? {
                bail!("{} already exists (use --force to reset it)", path.display());
            }
            println!("{} Wrote {}", style("✓").green().bold(), path.display());
        }
        Some(("set", set)) => {
            let key = required(set, "key")?;
            let value = required(set, "value")?;
            manager
                .update(|config| config.set_value(key, value))
                .with_context(|| format!("Failed to set {}", key))?;
            println!("{} {} updated", style("✓").green().bold(), key);
        }
        _ => bail!("Unknown config command"),
    }

    Ok(())
}

/// Print a metadata field
pub fn get_field(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let field = required(matches, "field")?;
    let doc = load_document(&settings.metadata_path())?;

    let value = doc.get(field).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    println!("{}", value);

    Ok(())
}

/// Change a metadata field
pub fn set_field(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let field = required(matches, "field")?;
    let path = settings.metadata_path();
    let mut doc = load_document(&path)?;

    let value = match matches.get_one::<String>("value") {
        Some(value) => FieldValue::from(value.as_str()),
        None => FieldValue::Unset,
    };
    doc.set(field, value)
        .with_context(|| format!("Cannot set '{}'", field))?;

    if let Err(problems) = doc.validate() {
        for problem in problems {
            println!("{} {}", style("!").yellow().bold(), problem);
        }
    }

    save_document(&doc, &path)?;
    println!("{} {} updated", style("✓").green().bold(), field);

    Ok(())
}

/// List the books on the device
pub async fn list_books(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let mut store = open_catalog(&settings.layout(matches)?).await?;
    let books = db_list_books(store.connection()?).await;
    store.disconnect().await?;
    let books = books.context("Failed to list books")?;

    if books.is_empty() {
        println!("No books on the device.");
        return Ok(());
    }

    println!("\n{} Books on Device", style(books.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for title in books {
        println!("  {}", title);
    }

    Ok(())
}

/// List the collections on the device, or the books in one
pub async fn list_shelves(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let mut store = open_catalog(&settings.layout(matches)?).await?;
    let conn = store.connection()?;

    let (heading, entries) = match matches.get_one::<String>("name") {
        Some(name) => (
            format!("Books in '{}'", name),
            collection_contents(conn, name).await,
        ),
        None => ("Collections".to_string(), list_collections(conn).await),
    };
    store.disconnect().await?;
    let entries = entries.context("Failed to read collections")?;

    println!("\n{} {}", style(entries.len()).bold().cyan(), heading);
    println!("{}", "=".repeat(80));
    for entry in entries {
        println!("  {}", entry);
    }

    Ok(())
}

/// Remove a book from the device library
pub async fn remove_book(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let title = required(matches, "title")?;
    let force = matches.get_flag("force");

    let mut store = open_catalog(&settings.layout(matches)?).await?;
    let Some(content_id) = find_by_title(store.connection()?, title).await? else {
        store.abort().await?;
        bail!("No book titled '{}' on the device", title);
    };

    if !force && !confirm(&format!("Remove '{}' ({}) from the device library?", title, content_id))? {
        store.abort().await?;
        println!("Removal cancelled.");
        return Ok(());
    }

    let removed = match remove(store.connection()?, &content_id).await {
        Ok(removed) => removed,
        Err(e) => {
            store.abort().await?;
            return Err(e).context("Failed to remove book");
        }
    };
    store.disconnect().await?;

    println!(
        "{} Removed '{}' ({} records)",
        style("✓").green().bold(),
        title,
        removed
    );

    Ok(())
}

/// Waits for the operator to replug the device
struct ReplugPrompt {
    term: Term,
}

impl ReplugPrompt {
    fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl DeviceReadySignal for ReplugPrompt {
    fn wait_until_ready(&mut self) -> SyncResult<()> {
        let prompt = format!(
            "{}\nUnplug the device, wait for it to finish importing, then plug it back.\nPress Enter once it is mounted again.",
            style("All files have been copied.").bold()
        );
        self.term
            .write_line(&prompt)
            .and_then(|_| self.term.read_line())
            .map(|_| ())
            .map_err(|e| SyncError::DeviceNotReady(e.to_string()))
    }
}

async fn open_catalog(layout: &DeviceLayout) -> Result<CatalogStore> {
    let mut store = CatalogStore::new(DatabaseConfig::new(layout.database_path()));
    store
        .connect()
        .await
        .with_context(|| format!("Failed to open {}", layout.database_path().display()))?;
    Ok(store)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} is required", name))
}

fn confirm(question: &str) -> Result<bool> {
    println!("{} (y/N)", question);
    let answer = Term::stdout()
        .read_line()
        .context("Failed to read input")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn directory_name(dir: &Path) -> Result<String> {
    let absolute = dir
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", dir.display()))?;
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("{} has no name; pass --series", dir.display()))
}

fn print_report(report: &SyncReport) {
    println!("\n{}", style(format!("Sync of '{}'", report.series)).bold().cyan());
    println!("{}", "=".repeat(80));

    for volume in &report.volumes {
        let copy = volume.copy.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string());
        let update = volume.update.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>4}  {:<40} {:<18} {}",
            volume.index,
            truncate(&volume.file, 40),
            copy,
            update
        );
    }

    if report.collection_replaced {
        println!("\nCollection '{}' rebuilt.", report.series);
    }
    if let Some(finished) = report.finished_at {
        let elapsed = finished - report.started_at;
        println!("Finished in {}s.", elapsed.num_seconds());
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
