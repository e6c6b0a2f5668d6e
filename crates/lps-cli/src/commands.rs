use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use lps_crypto::{SigningKey, VerifyingKey};
use lps_protocol::{parse_encoding, verify_body, OutgoingBody};
use lps_server::{LpsServer, ServerConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Config(args) => cmd_config(args),
        Command::Keygen => cmd_keygen(cli.format),
        Command::Sign(args) => cmd_sign(args),
        Command::Verify(args) => cmd_verify(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!("{} LPS server on {}", "→".cyan(), config.bind_addr.to_string().bold());
    let server = LpsServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    println!("{} Server stopped.", "✓".green());
    Ok(())
}

/// The config as TOML, with the private key masked.
fn render_config(mut config: ServerConfig) -> anyhow::Result<String> {
    if config.signing.server_key_hex.is_some() {
        config.signing.server_key_hex = Some("<redacted>".into());
    }
    Ok(toml::to_string_pretty(&config)?)
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", render_config(config)?);
    Ok(())
}

fn cmd_keygen(format: OutputFormat) -> anyhow::Result<()> {
    let key = SigningKey::generate();
    let public = key.verifying_key().to_hex();
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({"private_key": key.to_hex(), "public_key": public})
        ),
        OutputFormat::Text => {
            println!("{} Generated Ed25519 key pair", "✓".green().bold());
            println!("  Private: {}", key.to_hex().yellow());
            println!("  Public:  {}", public.cyan());
        }
    }
    Ok(())
}

/// Sign a file, returning the signature and the exact bytes it covers.
fn sign_file(args: &SignArgs) -> anyhow::Result<(String, Vec<u8>)> {
    let key = SigningKey::from_hex(args.key.trim()).context("invalid signing key")?;
    let encoding = parse_encoding(args.encoding.as_deref())?;
    let body = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let out = OutgoingBody::prepare(body.into(), encoding, Some(&key))?;
    let signature = out
        .signature
        .ok_or_else(|| anyhow::anyhow!("body was not signed"))?;
    Ok((signature, out.bytes.to_vec()))
}

fn cmd_sign(args: SignArgs) -> anyhow::Result<()> {
    let (signature, signed) = sign_file(&args)?;
    if let Some(out) = &args.out {
        std::fs::write(out, &signed).with_context(|| format!("writing {}", out.display()))?;
    }
    println!("{signature}");
    Ok(())
}

fn verify_file(args: &VerifyArgs) -> anyhow::Result<()> {
    let key = VerifyingKey::from_hex(args.public_key.trim()).context("invalid public key")?;
    let body = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    verify_body(&key, &body, Some(&args.signature))?;
    Ok(())
}

fn cmd_verify(args: VerifyArgs) -> anyhow::Result<()> {
    match verify_file(&args) {
        Ok(()) => {
            println!("{} Signature valid for {}", "✓".green().bold(), args.file.display());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            Err(e)
        }
    }
}
