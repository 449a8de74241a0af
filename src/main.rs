//! SpinDrip command line
//!
//! Runs RTP simulations, live sessions with autoplay and the win feed, and
//! writes sample configuration files.

use clap::{Parser, Subcommand};
use futures::StreamExt;
use spindrip::{
    config::generate_sample_config, errors::SpinDripResult, simulate, ConfigLoader, GameSession, Money,
    OutcomeEngine, SeededRandom, SharedRandom, SpinDripConfig, SpinEvent, ThemeCatalog,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

/// SpinDrip slot simulation CLI
#[derive(Parser)]
#[command(name = "spindrip")]
#[command(about = "Three-reel slot simulation with autoplay and a live win feed")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate many spins offline and report tier rates and RTP
    Simulate {
        /// Number of spins
        #[arg(short = 'n', long, default_value = "100000")]
        spins: u64,

        /// Bet per spin
        #[arg(short, long, default_value = "1.00")]
        bet: Money,

        /// Theme id (defaults to the configured theme)
        #[arg(short, long)]
        theme: Option<String>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run a live session and print spins and feed events
    Play {
        /// Amount deposited before the first spin
        #[arg(short, long, default_value = "20.00")]
        deposit: Money,

        /// Bet per spin (defaults to the configured bet)
        #[arg(short, long)]
        bet: Option<Money>,

        /// How long to run
        #[arg(short, long, default_value = "30")]
        seconds: u64,

        /// Keep spinning on the autoplay timer
        #[arg(short, long)]
        autoplay: bool,

        /// Theme id (unknown ids fall back to the default theme)
        #[arg(short, long)]
        theme: Option<String>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write a sample configuration file
    Config {
        /// Output path
        #[arg(short, long, default_value = "spindrip.toml")]
        write: PathBuf,
    },
}

#[tokio::main]
async fn main() -> SpinDripResult<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "spindrip=debug" } else { "spindrip=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };

    match cli.command {
        Commands::Simulate { spins, bet, theme, seed } => run_simulation(loader.load()?, spins, bet, theme, seed),
        Commands::Play {
            deposit,
            bet,
            seconds,
            autoplay,
            theme,
            seed,
        } => run_play(loader.load()?, deposit, bet, seconds, autoplay, theme, seed).await,
        Commands::Config { write } => {
            generate_sample_config(&write.to_string_lossy())?;
            println!("Sample configuration written to {}", write.display());
            Ok(())
        }
    }
}

fn random_source(seed: Option<u64>) -> SharedRandom {
    match seed {
        Some(seed) => SharedRandom::new(SeededRandom::new(seed)),
        None => SharedRandom::from_entropy(),
    }
}

fn run_simulation(
    config: SpinDripConfig,
    spins: u64,
    bet: Money,
    theme: Option<String>,
    seed: Option<u64>,
) -> SpinDripResult<()> {
    let catalog = ThemeCatalog::built_in();
    let theme = catalog.lookup(theme.as_deref().unwrap_or(&config.game.default_theme))?;
    let engine = OutcomeEngine::new(config.paytable.clone());
    let rng = random_source(seed);

    info!("simulating {} spins at {} on {}", spins, bet, theme.id());
    let report = {
        let mut source = rng.lock();
        simulate(&engine, theme, bet, spins, &mut **source)?
    };

    println!("Simulation: {} spins on {} at {}", report.spins, theme.name(), bet);
    println!("==============================================");
    println!("  Jackpots:      {:>8} ({:.2}%)", report.jackpots, report.jackpot_rate() * 100.0);
    println!("  Minor wins:    {:>8} ({:.2}%)", report.minors, report.minor_rate() * 100.0);
    println!("  Losses:        {:>8} ({:.2}%)", report.losses, report.loss_rate() * 100.0);
    println!("  Total bet:     {:>12}", report.total_bet);
    println!("  Total paid:    {:>12}", report.total_paid);
    println!("  Biggest win:   {:>12}", report.biggest_win);
    println!(
        "  Observed RTP:  {:>11.2}% (table {:.2}%)",
        report.rtp() * 100.0,
        engine.paytable().theoretical_rtp() * 100.0
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_play(
    mut config: SpinDripConfig,
    deposit: Money,
    bet: Option<Money>,
    seconds: u64,
    autoplay: bool,
    theme: Option<String>,
    seed: Option<u64>,
) -> SpinDripResult<()> {
    if let Some(theme) = theme {
        config.game.default_theme = theme;
    }
    let session = GameSession::with_random(config, &ThemeCatalog::built_in(), random_source(seed))?;
    session.on_deposit(deposit)?;
    if let Some(bet) = bet {
        session.set_bet(bet)?;
    }

    println!("🎰 {} | balance {} | bet {}", session.theme().name(), session.get_balance(), session.bet());

    let mut events = session.subscribe_events();
    let mut feed = session.subscribe_to_feed().await;

    if autoplay {
        session.set_autoplay(true).await?;
    } else {
        let result = session.spin().await?;
        println!(
            "[{}] {} -> won {} | balance {}",
            result.symbols.join(" "),
            result.tier,
            result.win_amount,
            session.get_balance()
        );
    }

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(SpinEvent::Settled { result, balance, big_win }) => {
                    let marker = if big_win { "💰 BIG WIN " } else { "" };
                    println!(
                        "{}[{}] {} -> won {} | balance {}",
                        marker,
                        result.symbols.join(" "),
                        result.tier,
                        result.win_amount,
                        balance
                    );
                }
                Ok(SpinEvent::AutoplayChanged { enabled, reason }) => {
                    println!("autoplay {} ({:?})", if enabled { "on" } else { "off" }, reason);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            Some(win) = feed.next() => {
                let tag = if win.is_jackpot { "🏆 JACKPOT" } else { "🎉" };
                println!("{} {} won {} on {}", tag, win.username, win.amount, win.game);
            }
        }
    }

    session.shutdown().await;

    let stats = session.stats();
    println!("==============================================");
    println!("  Spins:         {}", stats.total_spins);
    println!("  Wagered:       {}", stats.total_wagered);
    println!("  Won:           {}", stats.total_won);
    println!("  Biggest win:   {}", stats.biggest_win);
    println!("  Final balance: {}", session.get_balance());
    Ok(())
}
