use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytranscript",
    about = "YouTube transcript resolver",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Echo progress to stderr in addition to the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP transcript endpoint
    Serve {
        /// Address to bind (default from config, then 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default from config, then 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a transcript once and print the result
    Fetch {
        /// YouTube video URL (reads one per line from stdin if omitted)
        url: Option<String>,

        /// Output format: json (default), text
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}
