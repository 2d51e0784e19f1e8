use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crusty::container::HEADER_LEN;
use crusty::encryptor::default_output_path;
use crusty::metadata::ContainerInfo;
use crusty::{config, CancelToken, Encryptor, Hooks};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use zeroize::Zeroizing;

/// CRUSTy - password-based chunked file encryption (AES-256-GCM + Argon2id)
#[derive(Parser)]
#[command(name = "crusty")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file
    Encrypt {
        /// Input file to encrypt
        input: PathBuf,

        /// Output container path (defaults to <input>.encrypted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chunk size in bytes (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Read the password from this environment variable instead of prompting
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// Decrypt a container
    Decrypt {
        /// Container to decrypt
        input: PathBuf,

        /// Output file path (defaults to input without .encrypted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read the password from this environment variable instead of prompting
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// Show a container's header without decrypting it
    Info {
        /// Container to inspect
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Use RUST_LOG to control log level (e.g., RUST_LOG=info,crusty=debug)
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    info!(command = ?cli.command, "CRUSTy starting");

    match cli.command {
        Commands::Encrypt {
            input,
            output,
            chunk_size,
            password_env,
        } => {
            cmd_encrypt(
                cli.config.as_deref(),
                &input,
                output,
                chunk_size,
                password_env.as_deref(),
            )
            .await
        }

        Commands::Decrypt {
            input,
            output,
            password_env,
        } => cmd_decrypt(cli.config.as_deref(), &input, output, password_env.as_deref()).await,

        Commands::Info { input } => cmd_info(&input).await,
    }
}

/// Create a styled progress bar for file operations
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Cancel token wired to Ctrl-C
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling after the current chunk");
            handle.cancel();
        }
    });
    token
}

/// Password from `env_var`, or an interactive prompt (confirmed when `confirm`)
fn read_password(env_var: Option<&str>, confirm: bool) -> Result<Zeroizing<String>> {
    if let Some(var) = env_var {
        let password = std::env::var(var)
            .with_context(|| format!("reading password from environment variable {}", var))?;
        return Ok(Zeroizing::new(password));
    }

    let password = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if confirm {
        let again = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
        if *password != *again {
            anyhow::bail!("passwords do not match");
        }
    }
    Ok(password)
}

fn load_encryptor(config_path: Option<&str>) -> Result<Encryptor> {
    let cfg = config::Config::load_with_env(config_path)?;
    Ok(Encryptor::from_config(&cfg)?)
}

/// Encrypt a file
async fn cmd_encrypt(
    config_path: Option<&str>,
    input: &Path,
    output: Option<PathBuf>,
    chunk_size: Option<usize>,
    password_env: Option<&str>,
) -> Result<()> {
    let mut enc = load_encryptor(config_path)?;
    if let Some(size) = chunk_size {
        enc.set_chunk_size(size)?;
    }

    let output = output.unwrap_or_else(|| default_output_path(input, true));
    let input_size = fs::metadata(input)
        .await
        .with_context(|| format!("reading metadata for {:?}", input))?
        .len();

    let password = read_password(password_env, true)?;

    let pb = create_progress_bar(input_size, "Encrypting");
    let bar = pb.clone();
    let mut on_progress = move |fraction: f32| {
        bar.set_position((f64::from(fraction) * input_size as f64) as u64);
    };
    let hooks = Hooks::new()
        .on_progress(&mut on_progress)
        .with_cancel(cancel_on_ctrl_c());

    match enc
        .encrypt_file_with(input, &output, password.as_bytes(), hooks)
        .await
    {
        Ok(bytes) => {
            pb.finish_with_message(format!("Encrypted {} bytes", bytes));
            println!("  {} -> {}", input.display(), output.display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Encryption failed");
            Err(e.into())
        }
    }
}

/// Decrypt a container
async fn cmd_decrypt(
    config_path: Option<&str>,
    input: &Path,
    output: Option<PathBuf>,
    password_env: Option<&str>,
) -> Result<()> {
    let enc = load_encryptor(config_path)?;
    let output = output.unwrap_or_else(|| default_output_path(input, false));

    // Header check first, so a non-container fails before the password prompt
    let info = ContainerInfo::read(input).await?;
    let password = read_password(password_env, false)?;

    let total = info.plaintext_len;
    let pb = create_progress_bar(total, "Decrypting");
    let bar = pb.clone();
    let mut on_progress = move |fraction: f32| {
        bar.set_position((f64::from(fraction) * total as f64) as u64);
    };
    let hooks = Hooks::new()
        .on_progress(&mut on_progress)
        .with_cancel(cancel_on_ctrl_c());

    match enc
        .decrypt_file_with(input, &output, password.as_bytes(), hooks)
        .await
    {
        Ok(bytes) => {
            pb.finish_with_message(format!("Decrypted {} bytes", bytes));
            println!("  {} -> {}", input.display(), output.display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Decryption failed");
            Err(e.into())
        }
    }
}

/// Show container header information
async fn cmd_info(input: &Path) -> Result<()> {
    let info = ContainerInfo::read(input).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);

    if !info.consistent {
        println!();
        println!(
            "WARNING: container is {} bytes but its {}-byte header implies {} - it is truncated or padded",
            info.container_len, HEADER_LEN, info.expected_container_len
        );
    }
    Ok(())
}
