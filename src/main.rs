#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xfer::config::{Config, Protocol};
use xfer::session::Session;
use xfer::transfer::{self, SortKey, TransferReport};
use xfer::RemoteFile;

/// Prompts for the password when the config file did not carry one.
fn ensure_password(config: &mut Config) -> Result<()> {
    if config.password.is_none() {
        use std::io::Write;

        print!("Password for {}@{}: ", config.username, config.host);
        std::io::stdout().flush()?;

        match rpassword::prompt_password("") {
            Ok(password) => config.password = Some(password),
            Err(_) => {
                let mut password = String::new();
                std::io::stdin().read_line(&mut password)?;
                config.password = Some(password.trim().to_string());
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files on the server
    List {
        /// Directory relative to the login directory (default: the login directory)
        path: Option<String>,

        #[arg(short, long, value_enum, default_value_t = SortKey::Modified)]
        sort: SortKey,

        /// Reverse sort order
        #[arg(short, long)]
        reverse: bool,
    },

    /// Print the remote working directory
    Pwd,

    /// Upload files to the server
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Destination directory on server (default: the login directory)
        #[arg(short, long)]
        dest: Option<String>,
    },

    /// Download files from the server
    Download {
        /// Remote path; a `*` in the file name selects every match
        path: String,

        /// Local destination directory
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
    },

    /// Configure server settings
    Config {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        username: Option<String>,

        /// Password (never written to disk)
        #[arg(long)]
        password: Option<String>,

        /// ftp or sftp
        #[arg(long)]
        protocol: Option<Protocol>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    let command = match cli.command {
        Commands::Config {
            host,
            port,
            username,
            password,
            protocol,
        } => return configure(config, host, port, username, password, protocol),
        command => command,
    };

    if !config.is_configured() {
        config.interactive_setup()?;
    }
    ensure_password(&mut config)?;
    let mut session = Session::from_config(&config);

    match command {
        Commands::List {
            path,
            sort,
            reverse,
        } => {
            let (directory, mut files) = session.run(|conn| -> Result<_> {
                let files = match path.as_deref() {
                    Some(path) => conn.list_files_in(path)?,
                    None => conn.list_files()?,
                };
                Ok((conn.print_working_directory()?, files))
            })?;
            transfer::sort_listing(&mut files, sort, reverse);
            print_listing(path.as_deref().unwrap_or(&directory), &files);
        }
        Commands::Pwd => {
            let directory =
                session.run(|conn| -> Result<_> { Ok(conn.print_working_directory()?) })?;
            println!("{}", directory);
        }
        Commands::Upload { files, dest } => {
            let files: Vec<String> = files
                .iter()
                .map(|file| file.to_string_lossy().into_owned())
                .collect();

            let report = session.run(|conn| -> Result<_> {
                let dest = match dest {
                    Some(dest) => dest,
                    None => conn.print_working_directory()?,
                };
                println!("Uploading {} files to {}", files.len(), dest);
                Ok(transfer::upload_files(conn, files.as_slice(), &dest))
            })?;
            print_report("Upload", &report);
        }
        Commands::Download { path, dest } => {
            std::fs::create_dir_all(&dest)?;
            let local = dest.to_string_lossy().into_owned();

            let report = session.run(|conn| -> Result<_> {
                Ok(transfer::download_matching(conn, &path, &local)?)
            })?;
            if report.total() == 0 {
                println!("No files match pattern: {}", path);
            } else {
                print_report("Download", &report);
            }
        }
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn configure(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    protocol: Option<Protocol>,
) -> Result<()> {
    if host.is_none()
        && port.is_none()
        && username.is_none()
        && password.is_none()
        && protocol.is_none()
    {
        return config.interactive_setup();
    }

    if let Some(host) = host {
        config.host = host;
    }
    if port.is_some() {
        config.port = port;
    }
    if let Some(username) = username {
        config.username = username;
    }
    if let Some(protocol) = protocol {
        config.protocol = protocol;
    }
    config.password = password;
    config.configured = true;

    config.save()?;
    println!("Configuration saved successfully!");
    Ok(())
}

fn print_listing(directory: &str, files: &[RemoteFile]) {
    println!("Files in {}:", directory);
    println!("{:<50} {:>10} {:>20}", "Name", "Size", "Modified");
    println!("{}", "-".repeat(82));

    for file in files {
        let size = if file.is_dir() {
            "DIR".to_string()
        } else {
            human_bytes::human_bytes(file.size() as f64)
        };
        println!(
            "{:<50} {:>10} {:>20}",
            file.name(),
            size,
            file.modified().format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn print_report(action: &str, report: &TransferReport) {
    for path in &report.succeeded {
        println!("  ✓ {}", path);
    }
    for (path, err) in &report.failed {
        println!("  ✗ {}: {}", path, err);
    }
    println!(
        "\n{} complete: {} successful, {} failed",
        action,
        report.succeeded.len(),
        report.failed.len()
    );
}
