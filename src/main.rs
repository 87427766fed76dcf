//! # Lorebook CLI (`lore`)
//!
//! The `lore` binary drives workspaces of short text documents and the
//! AI features over them: question answering, link suggestion,
//! auto-tagging, and the knowledge graph.
//!
//! ## Usage
//!
//! ```bash
//! lore --config ./config/lore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lore workspaces list` | List workspaces |
//! | `lore workspaces create <name>` | Ensure-or-create a workspace |
//! | `lore pages list <workspace>` | List a workspace's pages |
//! | `lore pages add <workspace> --title … --file …` | Add a page |
//! | `lore pages delete <workspace> <id>` | Delete a page |
//! | `lore ask <workspace> "<question>"` | Answer a question |
//! | `lore link <workspace> --text "…"` | Suggest related pages |
//! | `lore tags <workspace>` | Generate tags |
//! | `lore graph <workspace>` | Derive the knowledge graph |
//! | `lore serve` | Start the JSON API server |
//!
//! Without a config file, `lore` runs with an in-memory store and a
//! disabled model adapter — CRUD works, AI features report their fixed
//! "not available" messages.

mod adapter_http;
mod config;
mod server;
mod service;
mod store_fs;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use lorebook_core::adapter::ModelAdapter;
use lorebook_core::aggregate::{answer_question, generate_tags, suggest_links};
use lorebook_core::graph::build_graph;
use lorebook_core::models::Document;
use lorebook_core::store::WorkspaceStore;

/// Lorebook — AI-assisted workspace notes.
#[derive(Parser)]
#[command(
    name = "lore",
    about = "Lorebook — question answering, link suggestion, auto-tagging, and knowledge graphs over workspace notes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Falls back to built-in defaults
    /// (in-memory store, disabled adapter) when the file does not exist.
    #[arg(long, global = true, default_value = "./config/lore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workspaces.
    Workspaces {
        #[command(subcommand)]
        action: WorkspaceAction,
    },

    /// Manage pages within a workspace.
    Pages {
        #[command(subcommand)]
        action: PageAction,
    },

    /// Answer a natural-language question against a workspace.
    Ask {
        /// Workspace name.
        workspace: String,
        /// The question to answer.
        question: String,
    },

    /// Suggest pages related to a draft text or an existing page.
    Link {
        /// Workspace name.
        workspace: String,
        /// Draft text to match against the workspace.
        #[arg(long, conflicts_with = "page")]
        text: Option<String>,
        /// Existing page id to find links for (excluded from its own
        /// suggestions).
        #[arg(long)]
        page: Option<String>,
    },

    /// Generate topical tags for a workspace.
    Tags {
        /// Workspace name.
        workspace: String,
        /// Tag this text instead of the workspace's content.
        #[arg(long)]
        content: Option<String>,
    },

    /// Derive the knowledge graph for a workspace.
    Graph {
        /// Workspace name.
        workspace: String,
    },

    /// Start the JSON API server.
    Serve,
}

#[derive(Subcommand)]
enum WorkspaceAction {
    /// List all workspaces.
    List,
    /// Create a workspace (idempotent).
    Create {
        /// Workspace name; sanitized to alphanumerics, hyphens, underscores.
        name: String,
    },
}

#[derive(Subcommand)]
enum PageAction {
    /// List pages in a workspace.
    List {
        workspace: String,
    },
    /// Add a page from a file or inline content.
    Add {
        workspace: String,
        /// Page title.
        #[arg(long)]
        title: String,
        /// Read content from this file.
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Inline page content.
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a page by id.
    Delete {
        workspace: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };

    let store = service::build_store(&cfg)?;
    let adapter: Arc<dyn ModelAdapter> = Arc::from(adapter_http::create_adapter(&cfg.adapter)?);

    match cli.command {
        Commands::Workspaces { action } => match action {
            WorkspaceAction::List => {
                for name in store.list_workspaces().await? {
                    println!("{}", name);
                }
            }
            WorkspaceAction::Create { name } => {
                let safe = store.ensure_workspace(&name).await?;
                println!("Workspace '{}' created successfully", safe);
            }
        },
        Commands::Pages { action } => match action {
            PageAction::List { workspace } => {
                for doc in store.list_documents(&workspace).await? {
                    let tags = if doc.tags.is_empty() {
                        String::new()
                    } else {
                        format!("  [{}]", doc.tags.join(", "))
                    };
                    println!("{}  {}{}", doc.id, doc.title, tags);
                }
            }
            PageAction::Add {
                workspace,
                title,
                file,
                content,
            } => {
                let content = match (file, content) {
                    (Some(path), _) => std::fs::read_to_string(&path)?,
                    (None, Some(inline)) => inline,
                    (None, None) => anyhow::bail!("Provide --file or --content"),
                };
                let id = service::add_page(
                    store.as_ref(),
                    adapter.as_ref(),
                    &workspace,
                    &title,
                    &content,
                    Vec::new(),
                )
                .await?;
                println!("Added page {}", id);
            }
            PageAction::Delete { workspace, id } => {
                if store.delete_document(&workspace, &id).await? {
                    println!("Deleted page {}", id);
                } else {
                    anyhow::bail!("Page {} not found", id);
                }
            }
        },
        Commands::Ask {
            workspace,
            question,
        } => {
            let answer = answer_question(
                store.as_ref(),
                adapter.as_ref(),
                &workspace,
                &question,
                cfg.chunk_params(),
            )
            .await?;
            println!("{}", answer.message());
        }
        Commands::Link {
            workspace,
            text,
            page,
        } => {
            let (text, exclude) = match (text, page) {
                (Some(text), _) => (text, None),
                (None, Some(id)) => {
                    let doc: Document = store
                        .get_document(&workspace, &id)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("Page {} not found", id))?;
                    (doc.content, Some(id))
                }
                (None, None) => anyhow::bail!("Provide --text or --page"),
            };
            let suggestions = suggest_links(
                store.as_ref(),
                adapter.as_ref(),
                &workspace,
                &text,
                exclude.as_deref(),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
        Commands::Tags { workspace, content } => {
            let result = generate_tags(
                store.as_ref(),
                adapter.as_ref(),
                &workspace,
                content.as_deref(),
                cfg.chunk_params(),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Graph { workspace } => {
            let docs = store.list_documents(&workspace).await?;
            let graph = build_graph(&docs);
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
