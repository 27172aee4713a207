mod cmd;

use clap::{Parser, Subcommand};
use cmd::config::{CommonArgs, Effective};
use cmd::provision::ProvisionArgs;
use cmd::publish::PublishArgs;

#[derive(Parser)]
#[command(name = "courier", about = "Provisioning topic'ов и публикация с подтверждением")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Создать topic; существующий topic не трогается
    ProvisionTopic(ProvisionArgs),
    /// Отправить сообщение и дождаться ack
    Publish(PublishArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.common) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let result = match &cli.command {
        Command::ProvisionTopic(args) => cmd::provision::run(&eff, args).await,
        Command::Publish(args) => cmd::publish::run(&eff, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
