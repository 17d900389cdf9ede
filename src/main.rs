//! viewpoint - street-level view generation from the command line

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use viewpoint::fantasy::FantasyMapStorage;
use viewpoint::gallery::{Gallery, SaveResult};
use viewpoint::generation::{AspectRatio, ImageSize};
use viewpoint::geocode::Geocoder;
use viewpoint::prompt::MapSurface;
use viewpoint::settings::{
    Database, FantasyMapDraft, Preferences, SettingsService, SettingsStore, SettingsUpdate,
};
use viewpoint::style::StyleChoice;
use viewpoint::{Config, Direction, FantasyPoint, GeminiClient, GeoPoint, MapMode, MapSession};

/// Generate street-level views from map selections
#[derive(Parser, Debug)]
#[command(name = "viewpoint", version, about = "Generate street-level views from a map spot and direction")]
struct Cli {
    /// Config file (defaults to viewpoint.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a view
    Generate {
        #[command(subcommand)]
        target: GenerateTarget,
    },
    /// Look up a place and print its coordinates
    Search { query: String },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Manage custom styles
    Styles {
        #[command(subcommand)]
        command: StyleCommand,
    },
    /// Manage fantasy maps
    Maps {
        #[command(subcommand)]
        command: MapCommand,
    },
}

#[derive(Args, Debug)]
struct GenerateOptions {
    /// Viewing direction in degrees clockwise from north
    #[arg(short, long)]
    direction: u16,
    /// Extra request that takes priority in the prompt
    #[arg(short, long)]
    prompt: Option<String>,
    /// Write the image here instead of the gallery
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum GenerateTarget {
    /// Real-world location
    RealWorld {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// PNG capture of the map around the location
        #[arg(long)]
        map_image: PathBuf,
        /// The capture shows satellite imagery
        #[arg(long)]
        satellite: bool,
        #[command(flatten)]
        options: GenerateOptions,
    },
    /// Position on the active fantasy map, in percent of its width and height
    Fantasy {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[command(flatten)]
        options: GenerateOptions,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print current settings
    Show,
    /// Save settings; the API key is required
    Set {
        #[arg(long)]
        api_key: String,
        /// realistic, cinematic, rainy, vintage, anime or custom
        #[arg(long, default_value = "realistic")]
        style: String,
        /// Custom style id, with --style custom
        #[arg(long)]
        custom_style: Option<String>,
        /// 16:9, 4:3, 3:4, 1:1, 9:16 or 21:9
        #[arg(long, default_value = "16:9")]
        aspect_ratio: String,
        /// 1K, 2K or 4K
        #[arg(long, default_value = "2K")]
        image_size: String,
    },
}

#[derive(Subcommand, Debug)]
enum StyleCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        prompt: String,
        /// Edit an existing style
        #[arg(long)]
        id: Option<String>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum MapCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        /// Description of the world
        #[arg(long, default_value = "")]
        context: String,
        /// PNG image; required for a new map
        #[arg(long)]
        image: Option<PathBuf>,
        /// Edit an existing map
        #[arg(long)]
        id: Option<String>,
    },
    /// Make a map the active one
    Activate { id: String },
    Deactivate,
    Delete { id: String },
}

/// Everything the commands need, built from config
struct App {
    config: Config,
    prefs: Preferences,
    storage: FantasyMapStorage,
}

impl App {
    async fn open(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

        let path = config.database_path();
        let db_path = path
            .to_str()
            .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", path.display()))?;
        let db = Database::new(Some(db_path)).await?;
        let prefs = Preferences::new(SettingsStore::new(db.pool().clone()));
        let storage = FantasyMapStorage::new(config.fantasy_map_dir());

        Ok(Self {
            config,
            prefs,
            storage,
        })
    }

    fn settings(&self) -> SettingsService {
        SettingsService::new(self.prefs.clone(), self.storage.clone())
    }

    async fn session(&self) -> Result<MapSession> {
        let client = GeminiClient::from_config(&self.config)?;
        info!("Using model {}", client.model());
        Ok(MapSession::open(
            self.prefs.clone(),
            self.storage.clone(),
            Gallery::new(&self.config.gallery_dir),
            Arc::new(client),
        )
        .await?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viewpoint=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let app = App::open(config).await?;

    match cli.command {
        Command::Generate { target } => generate(&app, target).await,
        Command::Search { query } => search(&app, &query).await,
        Command::Settings { command } => settings(&app, command).await,
        Command::Styles { command } => styles(&app, command).await,
        Command::Maps { command } => maps(&app, command).await,
    }
}

async fn generate(app: &App, target: GenerateTarget) -> Result<()> {
    let session = app.session().await?;

    let (captured, options) = match target {
        GenerateTarget::RealWorld {
            lat,
            lon,
            map_image,
            satellite,
            options,
        } => {
            let point = GeoPoint::new(lat, lon)?;
            let direction = Direction::new(options.direction)?;
            let capture = read_file(&map_image).await?;

            session.set_mode(MapMode::RealWorld).await?;
            session.set_map_surface(if satellite {
                MapSurface::Satellite
            } else {
                MapSurface::Street
            });
            session.set_real_world_selection(point, Some(direction));
            (Some(capture), options)
        }
        GenerateTarget::Fantasy { x, y, options } => {
            let position = FantasyPoint::new(x / 100.0, y / 100.0)?;
            let direction = Direction::new(options.direction)?;

            session.set_mode(MapMode::Fantasy).await?;
            session.set_fantasy_selection(position, Some(direction));
            (None, options)
        }
    };

    let hint = session.requirement_hint();
    if !session.can_generate() {
        bail!("{}", hint.message());
    }

    session
        .generate(captured, options.prompt.as_deref())
        .await?;
    println!("Generating...");

    let image = tokio::select! {
        result = session.wait_for_generation() => result?,
        _ = tokio::signal::ctrl_c() => {
            session.cancel_generation();
            bail!("Cancelled");
        }
    };

    match options.out {
        Some(path) => {
            tokio::fs::write(&path, &image.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {}", path.display());
        }
        None => match session.save_current_image().await {
            SaveResult::Saved { path } => println!("Saved {}", path.display()),
            SaveResult::Failed { message } => bail!(message),
        },
    }
    Ok(())
}

async fn search(app: &App, query: &str) -> Result<()> {
    let geocoder = Geocoder::from_config(&app.config)?;
    match geocoder.search(query).await? {
        Some(point) => println!("{:.6}, {:.6}", point.latitude, point.longitude),
        None => println!("Location not found"),
    }
    Ok(())
}

async fn settings(app: &App, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let prefs = &app.prefs;
            let key = match prefs.api_key().await? {
                Some(_) => "configured",
                None => "not set",
            };
            println!("api key:      {}", key);
            println!("style:        {}", prefs.style().await?.label());
            if let Some(id) = prefs.selected_custom_style_id().await? {
                println!("custom style: {}", id);
            }
            println!("aspect ratio: {}", prefs.aspect_ratio().await?.label());
            println!("image size:   {}", prefs.image_size().await?.label());
            println!("map mode:     {}", prefs.map_mode().await?.name());
            if let Some(id) = prefs.active_fantasy_map_id().await? {
                println!("active map:   {}", id);
            }
        }
        SettingsCommand::Set {
            api_key,
            style,
            custom_style,
            aspect_ratio,
            image_size,
        } => {
            let update = SettingsUpdate {
                api_key,
                style: StyleChoice::from_str(&style)
                    .ok_or_else(|| anyhow!("Unknown style: {}", style))?,
                custom_style_id: custom_style,
                aspect_ratio: AspectRatio::from_str(&aspect_ratio)
                    .ok_or_else(|| anyhow!("Unknown aspect ratio: {}", aspect_ratio))?,
                image_size: ImageSize::from_str(&image_size)
                    .ok_or_else(|| anyhow!("Unknown image size: {}", image_size))?,
            };
            app.settings().save_settings(&update).await?;
            println!("Settings saved");
        }
    }
    Ok(())
}

async fn styles(app: &App, command: StyleCommand) -> Result<()> {
    let settings = app.settings();
    match command {
        StyleCommand::List => {
            for style in app.prefs.custom_styles().await? {
                println!("{}  {}", style.id, style.name);
            }
        }
        StyleCommand::Add { name, prompt, id } => {
            let style = settings
                .save_custom_style(&name, &prompt, id.as_deref())
                .await?;
            println!("{}", style.id);
        }
        StyleCommand::Delete { id } => {
            if !settings.delete_custom_style(&id).await? {
                bail!("Unknown custom style: {}", id);
            }
        }
    }
    Ok(())
}

async fn maps(app: &App, command: MapCommand) -> Result<()> {
    let settings = app.settings();
    match command {
        MapCommand::List => {
            let active = app.prefs.active_fantasy_map_id().await?;
            for map in app.prefs.fantasy_maps().await? {
                let marker = if active.as_deref() == Some(map.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}  {}", marker, map.id, map.name);
            }
        }
        MapCommand::Add {
            name,
            context,
            image,
            id,
        } => {
            let image = match image {
                Some(path) => Some(read_file(&path).await?.to_vec()),
                None => None,
            };
            let map = settings
                .save_fantasy_map(FantasyMapDraft {
                    existing_id: id,
                    name,
                    world_context: context,
                    image,
                })
                .await?;
            println!("{}", map.id);
        }
        MapCommand::Activate { id } => {
            let session = app.session().await?;
            session.set_active_fantasy_map(Some(&id)).await?;
            session.set_mode(MapMode::Fantasy).await?;
        }
        MapCommand::Deactivate => {
            app.prefs.set_active_fantasy_map_id(None).await?;
        }
        MapCommand::Delete { id } => {
            if !settings.delete_fantasy_map(&id).await? {
                bail!("Unknown fantasy map: {}", id);
            }
        }
    }
    Ok(())
}

async fn read_file(path: &Path) -> Result<Arc<[u8]>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(bytes.into())
}
