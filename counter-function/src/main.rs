// a failed invocation is reported to the host, it should never bring the process down
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

use {
    std::{path::PathBuf, sync::Arc},
    anyhow::anyhow,
    tracing::{Level, info},
    tracing_subscriber::FmtSubscriber,
    clap::{Parser, Subcommand},
    lambda_runtime::{LambdaEvent, service_fn},
    serde_json::Value,
    counter_function::{CounterConfig, CounterFunction, server::run_http_server},
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Read configuration from yaml file instead of environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle invocations coming from the AWS Lambda runtime api (default)
    Lambda,
    /// Handle every incoming http request as an invocation
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a single invocation and print the response
    Invoke,
}

impl Command {
    pub fn is_lambda(&self) -> bool {
        matches!(self, Self::Lambda)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Lambda);
    init_logging(args.log_level, command.is_lambda());

    let config = match &args.config {
        Some(path) => {
            info!("loading config from {path:?}");
            CounterConfig::load(path)?
        },
        None => CounterConfig::from_env()?,
    };
    let function = Arc::new(CounterFunction::new(config));

    match command {
        Command::Lambda => lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
            let function = function.clone();
            async move {
                function.handle(event.payload).await.map_err(lambda_runtime::Error::from)
            }
        }))
            .await
            .map_err(|err| anyhow!("lambda runtime failed: {err}"))?,
        Command::Serve { port } => run_http_server(function, port).await?,
        Command::Invoke => {
            let response = function.handle(Value::Null).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        },
    }

    Ok(())
}

fn init_logging(level: Level, lambda: bool) {
    let builder = FmtSubscriber::builder().with_max_level(level);
    if lambda {
        // log lines end up in cloudwatch, which timestamps them on its own
        builder.with_ansi(false).without_time().init();
    } else {
        builder.init();
    }
}
