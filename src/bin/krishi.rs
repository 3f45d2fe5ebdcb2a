//! krishi: command-line front end for the aggregation pipeline.
//!
//! Loads config and secrets, builds the application context and prints the
//! result of one operation as JSON.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use krishi::config::{Config, Secrets};
use krishi::{FieldConditions, InlineImage, KrishiBuilder, MarketQuery, UserContext};

/// Krishi farm advisory CLI
#[derive(Parser)]
#[command(name = "krishi")]
#[command(version = krishi::PKG_VERSION)]
#[command(about = "Weather, advice, soil and market data for farmers")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "KRISHI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current weather, 5-day forecast and farming advice for a city
    Weather {
        city: String,
    },

    /// Classify soil fertility, with local weather
    Fertility {
        /// Location for the weather lookup
        #[arg(short, long)]
        location: String,
        #[arg(short)]
        n: f64,
        #[arg(short)]
        p: f64,
        #[arg(short)]
        k: f64,
        #[arg(long)]
        ph: f64,
    },

    /// Fertilizer doses needed to reach a crop's nutrient target
    Fertilizer {
        /// Crop name (see `krishi crops --list`)
        crop: String,
        #[arg(short)]
        n: f64,
        #[arg(short)]
        p: f64,
        #[arg(short)]
        k: f64,
    },

    /// Mandi prices, newest first
    Market {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        commodity: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// Personalized dashboard for a user
    Dashboard {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: Option<String>,
    },

    /// Ask the farming assistant a question
    Ask {
        /// Question (or omit to read from stdin)
        query: Option<String>,
    },

    /// Identify a pest or disease from a photo
    Pest {
        /// Crop in the photo
        crop: String,
        /// Image file (jpeg, png or webp)
        image: PathBuf,
        /// What the farmer observed
        #[arg(short, long)]
        symptoms: Option<String>,
    },

    /// Recommend crops for field conditions, or list the fertilizer crop table
    Crops {
        /// List crops known to the fertilizer calculator and exit
        #[arg(long)]
        list: bool,
        #[arg(long, required_unless_present = "list")]
        soil: Option<String>,
        #[arg(long, required_unless_present = "list")]
        season: Option<String>,
        #[arg(long, required_unless_present = "list")]
        state: Option<String>,
        /// Average rainfall in mm
        #[arg(long, required_unless_present = "list")]
        rainfall: Option<f64>,
        /// Average temperature in °C
        #[arg(long, required_unless_present = "list")]
        temp: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let ctx = KrishiBuilder::from_config(&config, &secrets).build()?;
    let pipeline = ctx.pipeline();

    match args.command {
        Command::Weather { city } => print_json(&pipeline.weather(&city).await?)?,

        Command::Fertility {
            location,
            n,
            p,
            k,
            ph,
        } => print_json(&pipeline.analyze_fertility_at(&location, n, p, k, ph).await?)?,

        Command::Fertilizer { crop, n, p, k } => {
            print_json(&pipeline.fertilizer_plan(n, p, k, &crop)?)?
        }

        Command::Market {
            state,
            commodity,
            limit,
        } => {
            let mut query = MarketQuery::new().limit(limit);
            if let Some(state) = state {
                query = query.state(state);
            }
            if let Some(commodity) = commodity {
                query = query.commodity(commodity);
            }
            print_json(&pipeline.market_prices(&query).await)?
        }

        Command::Dashboard {
            user_id,
            name,
            location,
        } => {
            let mut user = UserContext::new(user_id, name);
            if let Some(location) = location {
                user = user.with_location(location);
            }
            print_json(&pipeline.dashboard(&user).await?)?
        }

        Command::Ask { query } => {
            let query = resolve_text(query, "ask")?;
            print_json(&pipeline.ask(&query).await?)?
        }

        Command::Pest {
            crop,
            image,
            symptoms,
        } => {
            let data = std::fs::read(&image)?;
            let image = InlineImage::new(mime_type(&image), data);
            print_json(
                &pipeline
                    .identify_pest(&crop, symptoms.as_deref(), image)
                    .await?,
            )?
        }

        Command::Crops {
            list: true, ..
        } => {
            for crop in ctx.crops().crops() {
                println!("{crop}");
            }
        }

        Command::Crops {
            soil,
            season,
            state,
            rainfall,
            temp,
            ..
        } => {
            let conditions = FieldConditions {
                soil: soil.unwrap_or_default(),
                season: season.unwrap_or_default(),
                state: state.unwrap_or_default(),
                rainfall_mm: rainfall.unwrap_or(f64::NAN),
                temperature_c: temp.unwrap_or(f64::NAN),
            };
            print_json(&pipeline.recommend_crops(&conditions).await?)?
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_is_pipe = !io::stdin().is_terminal();
    let stdin_text = if stdin_is_pipe {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    } else {
        None
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
