use anyhow::Result;
use clap::{CommandFactory, Parser};

use deskchat::{run_repl_mode, setup_from_cli, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    if let Some(shell) = cli.generate {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    deskchat_logging::init_logging(cli.verbose);
    let app_config = setup_from_cli(&cli);

    match cli.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => run_repl_mode(app_config).await,
        command => {
            let result = command.execute(&app_config).await?;
            println!("{}", result);
            Ok(())
        }
    }
}
