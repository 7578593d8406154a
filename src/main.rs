use std::sync::Arc;

use clap::Parser;

use page_extractor::app::{init_logging, AppContext};
use page_extractor::cli::commands::{self, Overrides};
use page_extractor::cli::{Cli, Commands};
use page_extractor::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            policy,
            chrome,
        } => {
            Overrides {
                host,
                port,
                policy,
                chrome,
            }
            .apply(&mut config);
            let _guard = init_logging(&config.logging)?;

            let ctx = Arc::new(AppContext::new(config));
            commands::serve(ctx).await?;
        }
        Commands::Extract {
            url,
            adapters,
            xhr,
            policy,
            html,
            chrome,
        } => {
            Overrides {
                policy,
                chrome,
                ..Default::default()
            }
            .apply(&mut config);
            let _guard = init_logging(&config.logging)?;

            let ctx = AppContext::new(config);
            commands::extract(&ctx, &url, adapters, xhr, html).await?;
        }
    }

    Ok(())
}
