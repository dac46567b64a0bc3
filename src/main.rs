use blog_views::cli::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_views=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, name }) => {
            blog_views::cli::init::run(path, name).await?;
        }
        Some(Commands::Migrate) => {
            blog_views::cli::migrate::run(&cli.config).await?;
        }
        Some(Commands::Load { fixture }) => {
            blog_views::cli::load::run(&cli.config, &fixture).await?;
        }
        Some(Commands::Serve {
            host,
            port,
            ranking,
        }) => {
            blog_views::cli::serve::run(&cli.config, host, port, ranking).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
