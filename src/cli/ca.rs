//! Arguments of the `ca` binary

use super::CommonArgs;
use crate::ca::{CertificateAuthority, Issued, Subject};
use crate::config::{Config, ConfigOverrides};
use crate::error::{AppError, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// a pseudo certificate authority for testing purposes
#[derive(Parser, Debug, Clone)]
#[command(name = "ca", version = crate::LONG_VERSION, about)]
pub struct CaCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Required unless an environment helper flag is given
    #[command(subcommand)]
    pub command: Option<CaCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CaCommand {
    /// Create CA certs and keys if they do not exist
    Init {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Overwrite keys even if they already exist
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Issue a certificate signed by the CA
    Issue {
        #[command(flatten)]
        subject: SubjectArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SubjectArgs {
    /// Local directory where certificates and keys are stored [env: CA_CERT_DIRECTORY]
    #[arg(short = 'c', long = "certs", value_name = "DIR")]
    pub certs: Option<PathBuf>,

    /// Name of organization to issue certificates for
    #[arg(short = 'o', long, default_value = "")]
    pub organization: String,

    /// Country of the organization
    #[arg(short = 'C', long, default_value = "")]
    pub country: String,

    /// Province or state of the organization
    #[arg(short = 'p', long, default_value = "")]
    pub province: String,

    /// Locality or city of the organization
    #[arg(short = 'l', long, default_value = "")]
    pub locality: String,

    /// Street address of the organization
    #[arg(short = 'a', long, default_value = "")]
    pub address: String,

    /// Postal code of the organization
    #[arg(short = 'P', long, default_value = "")]
    pub postcode: String,
}

impl SubjectArgs {
    pub fn subject(&self) -> Subject {
        Subject {
            organization: self.organization.clone(),
            country: self.country.clone(),
            province: self.province.clone(),
            locality: self.locality.clone(),
            address: self.address.clone(),
            postcode: self.postcode.clone(),
        }
    }
}

impl CaCli {
    fn subject_args(&self) -> Option<&SubjectArgs> {
        match self.command.as_ref()? {
            CaCommand::Init { subject, .. } | CaCommand::Issue { subject } => Some(subject),
        }
    }

    /// Run the selected command against the configured directory
    pub fn run(&self, config: &Config) -> Result<Issued> {
        let ca = CertificateAuthority::new(&config.cert_directory);
        match &self.command {
            Some(CaCommand::Init { subject, force }) => ca.init(&subject.subject(), *force),
            Some(CaCommand::Issue { subject }) => ca.issue(&subject.subject()),
            None => Err(AppError::validation("specify a command: init or issue")),
        }
    }
}

impl ConfigOverrides for CaCli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        self.common.apply(config);
        if let Some(certs) = self.subject_args().and_then(|args| args.certs.as_ref()) {
            config.cert_directory = certs.clone();
        }
        Ok(())
    }

    fn debug(&self) -> bool {
        self.common.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_init() {
        let cli = CaCli::parse_from(["ca", "init", "-f", "-o", "Acme", "-C", "US", "-l", "Springfield"]);
        match &cli.command {
            Some(CaCommand::Init { subject, force }) => {
                assert!(*force);
                assert_eq!(subject.organization, "Acme");
                assert_eq!(subject.country, "US");
                assert_eq!(subject.locality, "Springfield");
                assert!(subject.certs.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_certs_flag_overrides_config() {
        let mut config = Config::default();
        let cli = CaCli::parse_from(["ca", "issue", "-c", "/tmp/certs", "-o", "Acme"]);
        cli.apply(&mut config).unwrap();
        assert_eq!(config.cert_directory, PathBuf::from("/tmp/certs"));
    }

    #[test]
    fn test_run_init_then_issue() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            cert_directory: dir.path().to_path_buf(),
            ..Default::default()
        };

        let issued = CaCli::parse_from(["ca", "init", "-o", "Test CA"]).run(&config).unwrap();
        assert!(issued.cert.ends_with("ca.crt"));

        let issued = CaCli::parse_from(["ca", "issue", "-o", "Big Server"]).run(&config).unwrap();
        assert!(issued.cert.ends_with("big_server.crt"));
        assert!(issued.key.exists());
    }

    #[test]
    fn test_run_without_command() {
        let cli = CaCli::parse_from(["ca", "--env-help"]);
        assert!(cli.command.is_none());
        assert!(cli.common.env_help);
        assert_eq!(cli.run(&Config::default()).unwrap_err().exit_code(), 1);
    }
}
