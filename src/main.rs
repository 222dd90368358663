//! Command-line drivers for the dialogue simulator
//!
//! `run` drives a single conversation, `fanout` launches many as isolated
//! processes, `mock-responder` serves the fixed-response LLM double.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use dialogue_sim::orchestrator::{self, DEFAULT_START_DELAY_RANGE, FanOutOptions};
use dialogue_sim::{
    ConversationIdentity, ConversationSession, Result, SessionOptions, TcpConnector,
    mock_responder,
};

#[derive(Parser)]
#[command(name = "dialogue-sim", version, about = "Test a streaming dialogue backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a single simulated conversation
    Run(RunArgs),
    /// Launch many conversations as isolated processes
    Fanout(FanoutArgs),
    /// Serve the fixed-response LLM double
    MockResponder(MockResponderArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Backend address (host:port)
    #[arg(short, long)]
    address: String,

    /// Conversation id; must start with ___test whenever turns > 1
    #[arg(short, long)]
    conversation_id: String,

    /// Number of turns to simulate
    #[arg(short, long)]
    turns: u32,

    /// Chat (end-user) user id
    #[arg(short, long)]
    user: String,

    /// WoZ (operator) user id
    #[arg(short, long)]
    woz: String,

    /// Delay in seconds between messages in a turn
    #[arg(short, long, default_value_t = 1.0)]
    delay: f64,

    /// Randomize delays by up to 5 extra seconds on top of --delay
    #[arg(short, long)]
    randomize: bool,

    /// Warm-up wait in seconds between subscribing and the first turn
    #[arg(long, default_value_t = 3.0)]
    warmup: f64,

    /// Bound in seconds on each wait for an expected message
    #[arg(long, default_value_t = 60.0)]
    turn_timeout: f64,

    /// Initial wait in seconds before the conversation starts
    #[arg(long, default_value_t = 0)]
    start_delay: u64,
}

#[derive(Args)]
struct FanoutArgs {
    /// Backend address (host:port)
    #[arg(short, long)]
    address: String,

    /// Number of conversations to launch
    #[arg(short, long)]
    num_conversations: u32,

    /// Tag used to namespace every generated id
    #[arg(short, long)]
    tag: String,

    /// Number of turns per conversation
    #[arg(short = 'T', long)]
    turns: u32,

    /// Delay in seconds between messages in a turn
    #[arg(short, long, default_value_t = 1.0)]
    delay: f64,
}

#[derive(Args)]
struct MockResponderArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 7771)]
    port: u16,

    /// Upper bound in seconds of the random response delay
    #[arg(short, long, default_value_t = 5.0)]
    max_delay: f64,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run(args) => run_single(args).await,
        Commands::Fanout(args) => run_fanout(args).await,
        Commands::MockResponder(args) => {
            mock_responder::serve(args.port, Duration::from_secs_f64(args.max_delay)).await
        }
    };

    if let Err(e) = outcome {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_single(args: RunArgs) -> Result<()> {
    if args.start_delay > 0 {
        log::info!(
            "conversation {} is waiting for {} seconds",
            args.conversation_id,
            args.start_delay
        );
        tokio::time::sleep(Duration::from_secs(args.start_delay)).await;
    }

    let identity = ConversationIdentity::new(args.conversation_id, args.woz, args.user);
    let options = SessionOptions::builder()
        .num_turns(args.turns)
        .delay(Duration::from_secs_f64(args.delay))
        .randomize(args.randomize)
        .warmup(Duration::from_secs_f64(args.warmup))
        .turn_timeout(Duration::from_secs_f64(args.turn_timeout))
        .build();

    let connector = TcpConnector::new(args.address);
    let mut session = ConversationSession::new(identity, options);
    let report = session.run(&connector).await?;

    println!("Conversation {} completed!", report.conversation_id);
    Ok(())
}

async fn run_fanout(args: FanoutArgs) -> Result<()> {
    let options = FanOutOptions {
        num_conversations: args.num_conversations,
        tag: args.tag,
        turns: args.turns,
        delay_secs: args.delay,
        address: args.address,
        start_delay_range: DEFAULT_START_DELAY_RANGE,
    };
    let report = orchestrator::run_fan_out(&options).await?;

    println!(
        "{} of {} conversations completed, {} failed",
        report.succeeded,
        report.total(),
        report.failed
    );
    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
