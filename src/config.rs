use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub protocol: Protocol,
    #[serde(default)]
    pub strict_host_key_checking: bool,
    #[serde(default)]
    pub configured: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Protocol {
    Ftp,
    Sftp,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Ftp => crate::client::ftp::DEFAULT_PORT,
            Self::Sftp => crate::client::sftp::DEFAULT_PORT,
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ftp" => Ok(Self::Ftp),
            "sftp" => Ok(Self::Sftp),
            other => Err(format!("unknown protocol '{}', expected ftp or sftp", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            username: String::new(),
            password: None,
            protocol: Protocol::Sftp,
            strict_host_key_checking: false,
            configured: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    /// Reads the config at `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "xfer").map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn is_configured(&self) -> bool {
        self.configured && !self.host.is_empty() && !self.username.is_empty()
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    pub fn interactive_setup(&mut self) -> Result<()> {
        println!("\nxfer setup");
        println!("----------");
        println!("Let's configure your connection settings:\n");

        self.host = prompt("Host: ")?;
        self.username = prompt("Username: ")?;
        self.password = Some(rpassword::prompt_password("Password: ").unwrap_or_default());

        let choice = prompt("\nProtocol (1=SFTP, 2=FTP) [default: 1]: ")?;
        self.protocol = match choice.as_str() {
            "2" => Protocol::Ftp,
            _ => Protocol::Sftp,
        };

        let port = prompt(&format!("Port [default: {}]: ", self.protocol.default_port()))?;
        self.port = if port.is_empty() {
            None
        } else {
            Some(port.parse().context("port must be a number between 1 and 65535")?)
        };

        if self.protocol == Protocol::Sftp {
            let strict = prompt("Verify host key against ~/.ssh/known_hosts? (y/N): ")?;
            self.strict_host_key_checking = strict.eq_ignore_ascii_case("y");
        }

        self.configured = true;
        self.save()?;

        println!("\nConfiguration complete!");
        if let Some(path) = Self::config_path() {
            println!("Your settings have been saved to: {}", path.display());
        }
        println!("You can reconfigure at any time by running: xfer config\n");
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
