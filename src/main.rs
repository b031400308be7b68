use clap::Parser;
use clap::Subcommand;
use miette::WrapErr;
use sexpr_interpreter::{DEMO_SOURCE, Evaluator, Lexer, ParseMode, UnknownChars};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(version, about = "Read and evaluate S-expressions")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// What to do with characters the lexer does not recognize.
    #[arg(long, value_enum, global = true, default_value_t = UnknownChars::Drop)]
    unknown_chars: UnknownChars,

    /// How to handle unbalanced brackets and bad integer literals.
    #[arg(long, value_enum, global = true, default_value_t = ParseMode::Strict)]
    mode: ParseMode,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the tokens of an expression.
    Tokenize { expr: Option<String> },
    /// Print the tree read from an expression.
    Read { expr: Option<String> },
    /// Read and evaluate an expression.
    Eval { expr: Option<String> },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn main() -> miette::Result<()> {
    init_tracing();
    let args = Args::parse();

    let command = args
        .command
        .unwrap_or(Commands::Eval { expr: None });

    match command {
        Commands::Tokenize { expr } => {
            let source = expr.as_deref().unwrap_or(DEMO_SOURCE);
            for token in Lexer::new(None, source).unknown_chars(args.unknown_chars) {
                println!("{}", token?);
            }
        }
        Commands::Read { expr } => {
            let source = expr.as_deref().unwrap_or(DEMO_SOURCE);
            let tree = sexpr_interpreter::read_with(source, args.unknown_chars, args.mode)
                .wrap_err("reading the expression failed")?;
            println!("READ: {tree}");
        }
        Commands::Eval { expr } => {
            let source = expr.as_deref().unwrap_or(DEMO_SOURCE);
            println!("Source:\n{source}\n");

            let tree = sexpr_interpreter::read_with(source, args.unknown_chars, args.mode)
                .wrap_err("reading the expression failed")?;
            println!("READ: {tree}");

            let result = match Evaluator::default().eval(&tree) {
                Ok(value) => value,
                Err(e) => {
                    let sentinel = e.sentinel();
                    eprintln!("{:?}", miette::Report::new(e));
                    sentinel
                }
            };
            println!("EVAL: {result}");
        }
    }
    Ok(())
}
