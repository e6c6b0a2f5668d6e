use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lps",
    about = "Localization payload store: server and signing tools",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the payload server
    Serve(ServeArgs),
    /// Print the effective server configuration as TOML
    Config(ConfigArgs),
    /// Generate an Ed25519 key pair for signed exchanges
    Keygen,
    /// Sign the exact bytes of a file
    Sign(SignArgs),
    /// Verify a body signature against the exact bytes of a file
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file; defaults apply when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides `bind_addr` from the config
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct SignArgs {
    /// Private key, hex-encoded
    #[arg(long, env = "LPS_SIGNING_KEY")]
    pub key: String,
    /// Encode the file before signing; the signature covers the encoded bytes
    #[arg(long)]
    pub encoding: Option<String>,
    /// Write the bytes that were signed here
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Public key, hex-encoded
    #[arg(long)]
    pub public_key: String,
    #[arg(long)]
    pub signature: String,
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["lps", "serve", "--config", "lps.toml", "--bind", "0.0.0.0:9000"])
            .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("lps.toml")));
            assert_eq!(args.bind.map(|a| a.port()), Some(9000));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_keygen_json() {
        let cli = Cli::try_parse_from(["lps", "keygen", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Command::Keygen));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn parse_sign() {
        let cli = Cli::try_parse_from(["lps", "sign", "--key", "ab", "--encoding", "zstd", "body.json"])
            .unwrap();
        if let Command::Sign(args) = cli.command {
            assert_eq!(args.key, "ab");
            assert_eq!(args.encoding.as_deref(), Some("zstd"));
            assert_eq!(args.file, PathBuf::from("body.json"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn verify_requires_signature() {
        assert!(Cli::try_parse_from(["lps", "verify", "--public-key", "ab", "f"]).is_err());
    }

    #[test]
    fn bad_bind_is_rejected() {
        assert!(Cli::try_parse_from(["lps", "serve", "--bind", "nowhere"]).is_err());
    }
}
