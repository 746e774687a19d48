//! Pressroom - command-line front-end for newsletter and eblast production

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::ConfigDir;
use log::{error, info};
use newsletter::backup::list_backups;
use newsletter::brands;
use newsletter::models::SectionId;
use newsletter::query::{get_document_detail, list_documents};
use newsletter::storage::SqliteDocumentStore;
use newsletter::{
    AssetLibrary, BrandRegistry, Document, DocumentId, DocumentKind, Publisher, RenderMode,
    Settings,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "pressroom")]
#[command(version)]
#[command(about = "Compose, render and archive branded newsletters and eblasts", long_about = None)]
struct Cli {
    /// SQLite database to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured brands
    Brands,

    /// Create an empty newsletter
    NewNewsletter {
        /// Brand id or display name
        brand: String,
        title: String,
        month: String,
        year: i32,
    },

    /// Create an empty eblast
    NewEblast {
        /// Brand id or display name
        brand: String,
        title: String,
        #[arg(short, long)]
        subject: Option<String>,
    },

    /// List stored documents, newest first
    #[command(alias = "ls")]
    List {
        /// newsletter or eblast
        #[arg(short, long, default_value = "newsletter")]
        kind: String,

        #[arg(short, long)]
        brand: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Print a document and its violations as JSON
    Show { id: i64 },

    /// Add a section from a kind and a JSON object of fields
    AddSection {
        id: i64,
        /// heading, body_text, image, call_to_action or event_listing
        kind: String,
        /// e.g. '{"text": "Q3 Update"}'
        fields: String,
        /// Insert before this position instead of appending
        #[arg(short, long)]
        position: Option<usize>,
    },

    /// Merge JSON fields into an existing section
    UpdateSection {
        id: i64,
        section: u64,
        fields: Option<String>,
        /// Hex color or brand color token
        #[arg(long, conflicts_with = "clear_background")]
        background: Option<String>,
        #[arg(long)]
        clear_background: bool,
    },

    /// Remove a section
    RemoveSection { id: i64, section: u64 },

    /// Reorder sections; every section id must be given exactly once
    Reorder {
        id: i64,
        #[arg(required = true, num_args = 1..)]
        sections: Vec<u64>,
    },

    /// Enable a disabled section or disable an enabled one
    ToggleSection { id: i64, section: u64 },

    /// Delete a document, its sections and its uploaded images
    Delete { id: i64 },

    /// Copy an image into the asset library for a document
    Upload {
        id: i64,
        file: PathBuf,
        /// Section the image is meant for
        #[arg(short, long)]
        section: Option<u64>,
    },

    /// List a document's uploaded images
    Assets { id: i64 },

    /// Render a document to HTML
    Export {
        id: i64,
        /// email or web
        #[arg(short, long, default_value = "email")]
        mode: String,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the HTML instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Back up the whole store
    Backup {
        /// Backup directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Copy the SQLite database file instead of writing a snapshot
        #[arg(long)]
        sqlite: bool,
    },

    /// List backup artifacts, newest first
    Backups {
        /// Backup directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Replace the store's content with a backup
    Restore { path: PathBuf },

    /// Show document counts and the database location
    Status,

    /// Check the database is reachable
    Health,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_dir = ConfigDir::locate()?;
    config_dir.ensure()?;

    let mut settings = Settings::load(&config_dir).context("Failed to load settings")?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let registry = BrandRegistry::load(settings.brands_file.as_deref())
        .context("Failed to load brands")?;
    let registry = brands::init(registry);

    let store = Arc::new(
        SqliteDocumentStore::open(&settings.db_path)
            .with_context(|| format!("Failed to open {}", settings.db_path.display()))?,
    );
    let publisher = Publisher::new(store.clone(), registry)
        .with_assets(AssetLibrary::new(&settings.uploads_dir));

    match cli.command {
        Commands::Brands => {
            for brand in publisher.brands().iter() {
                println!("{:<12} {} ({})", brand.id, brand.display_name, brand.newsletter_name);
            }
        }

        Commands::NewNewsletter {
            brand,
            title,
            month,
            year,
        } => {
            let mut doc = Document::newsletter(brand, title, month, year);
            let id = publisher.save_new(&mut doc)?;
            println!("{id}");
        }

        Commands::NewEblast {
            brand,
            title,
            subject,
        } => {
            let mut doc = Document::eblast(brand, title, subject);
            let id = publisher.save_new(&mut doc)?;
            println!("{id}");
        }

        Commands::List {
            kind,
            brand,
            limit,
            offset,
        } => {
            let kind: DocumentKind = kind.parse()?;
            let brand = brand
                .map(|b| publisher.brands().get(&b).map(|b| b.id.clone()))
                .transpose()?;
            let page = list_documents(publisher.store(), kind, brand.as_ref(), limit, offset)?;
            for summary in page {
                println!(
                    "{:>6}  {:<10} {:<30} {:>3} sections  {}",
                    summary.id,
                    summary.brand,
                    summary.title,
                    summary.section_count,
                    summary.modified_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Commands::Show { id } => {
            let detail = get_document_detail(publisher.store(), DocumentId::new(id))?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }

        Commands::AddSection {
            id,
            kind,
            fields,
            position,
        } => {
            let fields = parse_fields(&fields)?;
            let section = edit(&publisher, id, |doc| doc.add_section(&kind, &fields, position))?;
            println!("{section}");
        }

        Commands::UpdateSection {
            id,
            section,
            fields,
            background,
            clear_background,
        } => {
            let fields = fields.as_deref().map(parse_fields).transpose()?;
            if fields.is_none() && background.is_none() && !clear_background {
                bail!("Nothing to update: give fields, --background or --clear-background");
            }
            let section = SectionId::new(section);
            edit(&publisher, id, |doc| {
                if let Some(fields) = &fields {
                    doc.update_section_fields(section, fields)?;
                }
                if clear_background {
                    doc.set_section_background(section, None)?;
                } else if let Some(background) = background {
                    doc.set_section_background(section, Some(background))?;
                }
                Ok(())
            })?;
        }

        Commands::RemoveSection { id, section } => {
            edit(&publisher, id, |doc| {
                doc.remove_section(SectionId::new(section)).map(|_| ())
            })?;
        }

        Commands::Reorder { id, sections } => {
            let order: Vec<SectionId> = sections.into_iter().map(SectionId::new).collect();
            edit(&publisher, id, |doc| doc.reorder_sections(&order))?;
        }

        Commands::ToggleSection { id, section } => {
            let section = SectionId::new(section);
            let enabled = edit(&publisher, id, |doc| {
                let enabled = !doc
                    .section(section)
                    .map(|s| s.enabled)
                    .unwrap_or_default();
                doc.set_section_enabled(section, enabled).map(|_| enabled)
            })?;
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }

        Commands::Delete { id } => {
            publisher.delete(DocumentId::new(id))?;
        }

        Commands::Upload { id, file, section } => {
            let asset =
                publisher.import_asset(DocumentId::new(id), section.map(SectionId::new), &file)?;
            println!("{}", asset.file_name);
        }

        Commands::Assets { id } => {
            for asset in publisher.assets(DocumentId::new(id))? {
                let section = asset
                    .section_id
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<36} {:>4} {:>10} bytes  {}",
                    asset.file_name, section, asset.size_bytes, asset.original_name
                );
            }
        }

        Commands::Export {
            id,
            mode,
            out,
            stdout,
        } => {
            let mode: RenderMode = mode.parse()?;
            let id = DocumentId::new(id);
            if stdout {
                print!("{}", publisher.export(id, mode)?.html);
            } else {
                let dir = out.unwrap_or(settings.output_dir);
                let path = publisher.export_to_dir(id, mode, &dir)?;
                println!("{}", path.display());
            }
        }

        Commands::Backup { dir, sqlite } => {
            let dir = dir.unwrap_or(settings.backup_dir);
            if sqlite {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let dest = dir.join(format!(
                    "pressroom_{}.sqlite",
                    Utc::now().format("%Y%m%d_%H%M%S_%3f")
                ));
                let size = store.backup_database(&dest)?;
                info!("[BACKUP] Copied database to {} ({size} bytes)", dest.display());
                println!("{}", dest.display());
            } else {
                let report = publisher.backup(&dir)?;
                println!("{}", report.path.display());
            }
        }

        Commands::Backups { dir } => {
            let dir = dir.unwrap_or(settings.backup_dir);
            for path in list_backups(&dir)? {
                println!("{}", path.display());
            }
        }

        Commands::Restore { path } => {
            let snapshot = publisher.restore(&path)?;
            println!(
                "Restored {} documents ({} sections)",
                snapshot.documents.len(),
                snapshot.section_count()
            );
        }

        Commands::Status => {
            let status = publisher.status()?;
            println!("Database:    {}", status.location);
            if let Some(size) = status.size_bytes {
                println!("Size:        {size} bytes");
            }
            println!("Newsletters: {}", status.newsletters);
            println!("Eblasts:     {}", status.eblasts);
            println!("Sections:    {}", status.sections);
            println!("Assets:      {}", status.assets);
            println!("Uploads:     {}", settings.uploads_dir.display());
        }

        Commands::Health => {
            publisher.health()?;
            println!("ok");
        }
    }

    Ok(())
}

fn parse_fields(json: &str) -> Result<Value> {
    serde_json::from_str(json).context("Section fields must be a JSON object")
}

/// Load a document, apply an edit and save it
///
/// Nothing is written when the edit fails.
fn edit<T>(
    publisher: &Publisher,
    id: i64,
    change: impl FnOnce(&mut Document) -> newsletter::Result<T>,
) -> Result<T> {
    let mut doc = publisher.store().get(DocumentId::new(id))?;
    let out = change(&mut doc)?;
    publisher.save(&mut doc)?;
    Ok(out)
}
