use clap::{Parser, Subcommand};
use unzip_ufop::services::command::UnzipCommand;

/// Builds and inspects unzip command strings.
#[derive(Parser)]
#[command(name = "unzip_cmd", version)]
struct Cli {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Print the command that unzips into BUCKET
    Encode {
        bucket: String,
        /// Replace objects that already exist under the same key
        #[arg(long)]
        overwrite: bool,
    },
    /// Decode a command string and print its parameters
    Decode { command: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.action {
        Action::Encode { bucket, overwrite } => {
            println!("{}", UnzipCommand::new(bucket, overwrite));
        }
        Action::Decode { command } => {
            let parsed = UnzipCommand::parse(&command)?;
            println!("bucket:    {}", parsed.bucket);
            println!("overwrite: {}", parsed.overwrite);
        }
    }

    Ok(())
}
