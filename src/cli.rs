use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "drover")]
#[command(version)]
#[command(about = "Pushes infrastructure artifacts from CI pipelines into a cloud account", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Push a CloudFormation stack (create or update, then wait)
    Stack(PushArgs),

    /// Push a Lambda function from a deployment descriptor
    Function(PushArgs),

    /// Create a container image repository (not yet implemented)
    Repo(PushArgs),

    /// Create an S3 bucket (not yet implemented)
    Bucket(PushArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PushArgs {
    /// Path to the pipeline working directory holding templates and property files
    #[arg(short, long, default_value = ".")]
    pub directory: String,

    /// Environment to deploy
    #[arg(short, long)]
    pub environment: String,

    /// Overall task timeout, in minutes
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,

    /// Custom build variables to inject, as KEY=VALUE (repeatable)
    #[arg(short = 'D', long = "var", value_parser = parse_key_value)]
    pub variables: Vec<(String, String)>,
}

/// Parse a single KEY=VALUE argument.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        assert_eq!(
            parse_key_value("buildNumber=42").unwrap(),
            ("buildNumber".to_string(), "42".to_string())
        );
        // Values may themselves contain '='
        assert_eq!(
            parse_key_value("token=a=b").unwrap(),
            ("token".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=orphan").is_err());
    }

    #[test]
    fn cli_accepts_stack_push_args() {
        let cli = Cli::try_parse_from([
            "drover",
            "stack",
            "-d",
            "/tmp/build",
            "-e",
            "prod",
            "-t",
            "30",
            "-D",
            "buildNumber=7",
        ])
        .unwrap();

        match cli.command {
            Command::Stack(args) => {
                assert_eq!(args.directory, "/tmp/build");
                assert_eq!(args.environment, "prod");
                assert_eq!(args.timeout, 30);
                assert_eq!(args.variables.len(), 1);
            }
            _ => panic!("expected stack subcommand"),
        }
    }
}
