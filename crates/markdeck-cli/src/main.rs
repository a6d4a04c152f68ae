use anyhow::{bail, Context};
use clap::Parser;
use markdeck_core::{
    App, BookmarkItem, Config, FaviconFile, HttpBackend, SearchServiceStore, StoredTokenProvider,
    TabOpener, TokenStore,
};
use markdeck_storage::LocalStorage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound for `login --valid-days`, about a century
const MAX_VALID_DAYS: u64 = 36_500;

#[derive(Parser)]
#[command(name = "markdeck")]
#[command(version, about = "Browse and manage bookmarks on a Markdeck server", long_about = None)]
struct Cli {
    /// Credentials profile to use
    #[arg(long, global = true, env = "MARKDECK_PROFILE", default_value = "default")]
    profile: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Save an ID token so later commands can sign in
    Login {
        #[arg(long)]
        token: String,
        /// Account name shown by `whoami`
        #[arg(long)]
        account: Option<String>,
        /// Defaults to `auth.token_valid_days` from the config
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_VALID_DAYS))]
        valid_days: Option<u64>,
    },
    /// Forget stored credentials
    Logout {
        /// Every profile, not just the current one
        #[arg(long)]
        all: bool,
    },
    /// Show who is signed in
    Whoami,
    /// List the bookmark tree
    Bookmarks {
        /// Indent children under their folders
        #[arg(long)]
        tree: bool,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// List bookmarks the server marked obsolete
    Obsolete,
    /// Upload a custom favicon for a bookmark
    Favicon {
        url: String,
        file: PathBuf,
    },
    /// Ask the server to reprocess its bookmark sources
    Update,
    /// Ask the server to re-import its XBEL file
    ReloadXbel,
    /// Open a query on every active search engine
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Manage search engines
    Engines {
        #[command(subcommand)]
        action: EngineAction,
    },
    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum FavoriteAction {
    List,
    Add {
        url: String,
        /// Used when the URL is not in the bookmark tree
        #[arg(long)]
        title: Option<String>,
    },
    Remove {
        url: String,
    },
}

#[derive(clap::Subcommand)]
enum EngineAction {
    List,
    /// Flip an engine between active and inactive
    Toggle { id: String },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    Show,
    /// Write the current settings to the config file
    Init,
}

/// Opens tabs in the system browser
struct BrowserOpener;

impl TabOpener for BrowserOpener {
    fn open_tab(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "markdeck=warn",
        1 => "markdeck=info",
        _ => "markdeck=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("Failed to load config")?;

    let Some(command) = cli.command.take() else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    match command {
        Commands::Login {
            token,
            account,
            valid_days,
        } => {
            let provider = StoredTokenProvider::new(config.token_store_path()?, &cli.profile);
            let days = valid_days.unwrap_or(config.auth.token_valid_days);
            provider.store_token(&token, account.as_deref(), days)?;
            println!("Saved credentials for profile '{}' (valid {} days)", cli.profile, days);
        }
        Commands::Logout { all: true } => {
            let path = config.token_store_path()?;
            let mut store = TokenStore::load_from(&path)?;
            store.clear();
            store.save_to(&path)?;
            println!("Removed all stored credentials");
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
            ConfigAction::Init => {
                let path = config.save()?;
                println!("Wrote {}", path.display());
            }
        },
        command => {
            let mut app = build_app(&config, &cli.profile)?;
            run(&mut app, command, &config, &cli).await?;
        }
    }

    Ok(())
}

fn build_app(config: &Config, profile: &str) -> anyhow::Result<App> {
    let backend = HttpBackend::from_config(config)?;
    let provider = StoredTokenProvider::new(config.token_store_path()?, profile);
    let storage = LocalStorage::open(&config.storage_path()?)?;
    let search = SearchServiceStore::load(storage, Duration::from_millis(config.search.stagger_ms));

    Ok(App::new(Arc::new(backend), Arc::new(provider), search, config))
}

/// Commands that go through the app and, mostly, the server
async fn run(app: &mut App, command: Commands, config: &Config, cli: &Cli) -> anyhow::Result<()> {
    match command {
        Commands::Logout { .. } => {
            app.sign_out().await?;
            println!("Signed out of profile '{}'", cli.profile);
        }
        Commands::Whoami => {
            let Some(user) = app.sign_in().await else {
                bail!("Not signed in; run `markdeck login --token <TOKEN>`");
            };
            let provider = StoredTokenProvider::new(config.token_store_path()?, &cli.profile);
            let days = provider.days_remaining()?.unwrap_or(0);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "profile": user.uid, "account": user.email, "days_remaining": days })
                );
            } else {
                println!("Profile:  {}", user.uid);
                println!("Account:  {}", user.email.as_deref().unwrap_or("-"));
                println!("Expires:  in {} days", days);
            }
        }
        Commands::Bookmarks { tree } => {
            signed_in(app).await?;
            app.fetch_bookmarks().await?;
            let items = app.state().bookmarks.sorted();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if tree {
                for item in items {
                    print_tree(item, 0);
                }
            } else {
                for item in items {
                    print_item(item);
                }
            }
        }
        Commands::Favorites { action } => run_favorites(app, action, config, cli).await?,
        Commands::Obsolete => {
            signed_in(app).await?;
            app.fetch_obsolete().await?;
            print_list(app.state().obsolete.items(), cli.json)?;
        }
        Commands::Favicon { url, file } => {
            let icon = FaviconFile::from_path(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            signed_in(app).await?;
            app.upload_favicon(&url, icon).await?;
            println!("Uploaded favicon for {}", url);
        }
        Commands::Update => {
            signed_in(app).await?;
            app.update_server().await?;
            println!(
                "Server updated: {} bookmarks, {} obsolete",
                count(app.state().bookmarks.items()),
                app.state().obsolete.items().len()
            );
        }
        Commands::ReloadXbel => {
            signed_in(app).await?;
            app.reload_xbel().await?;
            println!(
                "XBEL reloaded: {} bookmarks, {} obsolete",
                count(app.state().bookmarks.items()),
                app.state().obsolete.items().len()
            );
        }
        Commands::Search { query } => {
            let opened = app.search(&query.join(" "), &BrowserOpener).await?;
            if opened.is_empty() {
                println!("No active search engines; see `markdeck engines list`");
            }
            for url in opened {
                println!("Opened {}", url);
            }
        }
        Commands::Engines { action } => match action {
            EngineAction::List => {
                let services = app.state().search.services();
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(services)?);
                } else {
                    for service in services {
                        let mark = if service.active { "*" } else { " " };
                        println!("{} {:<12} {}", mark, service.id, service.name);
                    }
                }
            }
            EngineAction::Toggle { id } => match app.toggle_search_service(&id)? {
                Some(true) => println!("{} is now active", id),
                Some(false) => println!("{} is now inactive", id),
                None => bail!("Unknown search engine '{}'", id),
            },
        },
        Commands::Login { .. } | Commands::Config { .. } => unreachable!("handled before the app is built"),
    }

    Ok(())
}

async fn run_favorites(
    app: &mut App,
    action: FavoriteAction,
    config: &Config,
    cli: &Cli,
) -> anyhow::Result<()> {
    // Anonymous favorites are fine when the server allows them
    if app.sign_in().await.is_none() && config.auth.favorites_require_auth {
        bail!("Not signed in; run `markdeck login --token <TOKEN>`");
    }

    match action {
        FavoriteAction::List => {
            load_favorites(app).await?;
            print_list(app.state().favorites.items(), cli.json)?;
        }
        FavoriteAction::Add { url, title } => {
            let item = lookup(app, &url)
                .await
                .unwrap_or_else(|| BookmarkItem::bookmark(&url, title.as_deref().unwrap_or(&url), &url));
            app.add_favorite(&item).await?;
            println!("Added {} to favorites", url);
        }
        FavoriteAction::Remove { url } => {
            load_favorites(app).await?;
            if !app.state().favorites.is_favorite(&url) {
                bail!("{} is not a favorite", url);
            }
            let item = BookmarkItem::bookmark(&url, &url, &url);
            app.remove_favorite(&item).await?;
            println!("Removed {} from favorites", url);
        }
    }

    Ok(())
}

/// Sign-in already loaded favorites in the background; surface its error
async fn load_favorites(app: &mut App) -> anyhow::Result<()> {
    if !app.session().is_authenticated() {
        app.fetch_favorites().await?;
    } else if let Some(e) = app.state().favorites.error() {
        bail!("Failed to load favorites: {}", e);
    }
    Ok(())
}

async fn signed_in(app: &mut App) -> anyhow::Result<()> {
    if app.sign_in().await.is_none() {
        bail!("Not signed in; run `markdeck login --token <TOKEN>`");
    }
    Ok(())
}

/// The bookmark with this URL, if the tree can be loaded and has it
async fn lookup(app: &mut App, url: &str) -> Option<BookmarkItem> {
    if let Err(e) = app.fetch_bookmarks().await {
        tracing::debug!("Bookmark lookup skipped: {}", e);
        return None;
    }
    find_by_url(app.state().bookmarks.items(), url).cloned()
}

fn find_by_url<'a>(items: &'a [BookmarkItem], url: &str) -> Option<&'a BookmarkItem> {
    items.iter().find_map(|item| {
        if item.url.as_deref() == Some(url) {
            Some(item)
        } else {
            find_by_url(&item.children, url)
        }
    })
}

fn count(items: &[BookmarkItem]) -> usize {
    items.iter().map(BookmarkItem::bookmark_count).sum()
}

fn print_list(items: &[BookmarkItem], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Nothing here.");
    }
    for item in items {
        print_item(item);
    }
    Ok(())
}

fn print_item(item: &BookmarkItem) {
    match &item.url {
        Some(url) => println!("{}  {}", item.title, url),
        None => println!("{}/ ({} bookmarks)", item.title, item.bookmark_count()),
    }
}

fn print_tree(item: &BookmarkItem, depth: usize) {
    print!("{}", "  ".repeat(depth));
    print_item(item);
    for child in markdeck_core::models::folders_first(&item.children) {
        print_tree(child, depth + 1);
    }
}
