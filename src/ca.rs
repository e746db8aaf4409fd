//! A pseudo certificate authority for testing
//!
//! `init` creates a self-signed CA pair in a certificate directory and
//! `issue` signs short lived leaf certificates with it. Keys are ECDSA P-256
//! written as PEM with owner-only permissions.

use crate::error::{AppError, ErrorContext, Result};
use chrono::{Datelike, Months, NaiveDate, Utc};
use rand::Rng;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, SerialNumber, PKCS_ECDSA_P256_SHA256,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CA_CERT_FILE: &str = "ca.crt";
pub const CA_KEY_FILE: &str = "ca.key";

/// Validity of the authority certificate
const CA_VALIDITY_MONTHS: u32 = 120;
/// Validity of issued certificates
const LEAF_VALIDITY_DAYS: u64 = 7;

// Attribute types rcgen has no named variant for
const OID_STREET_ADDRESS: [u64; 4] = [2, 5, 4, 9];
const OID_POSTAL_CODE: [u64; 4] = [2, 5, 4, 17];

/// Subject of a certificate; empty fields are left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub organization: String,
    pub country: String,
    pub province: String,
    pub locality: String,
    pub address: String,
    pub postcode: String,
}

impl Subject {
    fn distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        let fields = [
            (DnType::OrganizationName, &self.organization),
            (DnType::CountryName, &self.country),
            (DnType::StateOrProvinceName, &self.province),
            (DnType::LocalityName, &self.locality),
            (DnType::CustomDnType(OID_STREET_ADDRESS.to_vec()), &self.address),
            (DnType::CustomDnType(OID_POSTAL_CODE.to_vec()), &self.postcode),
        ];
        for (kind, value) in fields {
            let value = value.trim();
            if !value.is_empty() {
                dn.push(kind, value);
            }
        }
        dn
    }
}

/// File stem for an organization: trimmed, spaces to underscores, lowercased
pub fn cert_name(organization: &str) -> String {
    organization.trim().replace(' ', "_").to_lowercase()
}

/// Paths of a written certificate and its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Certificate authority rooted at a directory holding `ca.crt`/`ca.key`
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    dir: PathBuf,
}

impl CertificateAuthority {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cert_path(&self) -> PathBuf {
        self.dir.join(CA_CERT_FILE)
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(CA_KEY_FILE)
    }

    /// Create the CA certificate and key. Existing files are only replaced
    /// when `force` is set.
    pub fn init(&self, subject: &Subject, force: bool) -> Result<Issued> {
        let cert_path = self.cert_path();
        let key_path = self.key_path();

        if !force {
            if cert_path.exists() {
                return Err(AppError::already_exists("certificate file already exists"));
            }
            if key_path.exists() {
                return Err(AppError::already_exists("private key file already exists"));
            }
        }

        let today = Utc::now().date_naive();
        let expires = today
            .checked_add_months(Months::new(CA_VALIDITY_MONTHS))
            .ok_or_else(|| AppError::certificate("could not compute CA expiration"))?;

        let mut params = base_params(subject, today, expires);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyCertSign];

        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let cert = params
            .self_signed(&key)
            .with_context(|| "create ca failed".to_string())?;

        self.write_pair(&cert, &key, &cert_path, &key_path)?;
        crate::debug!("created certificate authority in {}", self.dir.display());
        Ok(Issued {
            cert: cert_path,
            key: key_path,
        })
    }

    /// Issue a certificate for `subject.organization` signed by the CA,
    /// written as `<name>.crt`/`<name>.key` beside it.
    pub fn issue(&self, subject: &Subject) -> Result<Issued> {
        let name = cert_name(&subject.organization);
        if name.is_empty() {
            return Err(AppError::validation("specify the name of the organization"));
        }

        let (ca_cert, ca_key) = self.load()?;

        let today = Utc::now().date_naive();
        let expires = today
            .checked_add_days(chrono::Days::new(LEAF_VALIDITY_DAYS))
            .ok_or_else(|| AppError::certificate("could not compute certificate expiration"))?;

        let mut params = base_params(subject, today, expires);
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];

        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let cert = params.signed_by(&key, &ca_cert, &ca_key)?;

        let issued = Issued {
            cert: self.dir.join(format!("{}.crt", name)),
            key: self.dir.join(format!("{}.key", name)),
        };
        self.write_pair(&cert, &key, &issued.cert, &issued.key)?;
        crate::debug!("issued certificate {}", issued.cert.display());
        Ok(issued)
    }

    /// Rebuild the CA certificate from disk so it can sign
    fn load(&self) -> Result<(Certificate, KeyPair)> {
        let cert_path = self.cert_path();
        let key_path = self.key_path();

        let cert_pem = fs::read_to_string(&cert_path)
            .map_err(|e| AppError::certificate(format!("could not read {}: {}", cert_path.display(), e)))?;
        let key_pem = fs::read_to_string(&key_path)
            .map_err(|e| AppError::certificate(format!("could not read {}: {}", key_path.display(), e)))?;

        let key = KeyPair::from_pem(&key_pem)?;
        let params = CertificateParams::from_ca_cert_pem(&cert_pem)?;
        let cert = params.self_signed(&key)?;
        Ok((cert, key))
    }

    fn write_pair(&self, cert: &Certificate, key: &KeyPair, cert_path: &Path, key_path: &Path) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("could not create {}", self.dir.display()))?;
        fs::write(cert_path, cert.pem()).with_context(|| format!("could not write {}", cert_path.display()))?;
        write_private(key_path, key.serialize_pem().as_bytes())
    }
}

fn base_params(subject: &Subject, not_before: NaiveDate, not_after: NaiveDate) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.serial_number = Some(serial_number());
    params.distinguished_name = subject.distinguished_name();
    let (year, month, day) = ymd(not_before);
    params.not_before = rcgen::date_time_ymd(year, month, day);
    let (year, month, day) = ymd(not_after);
    params.not_after = rcgen::date_time_ymd(year, month, day);
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth, ExtendedKeyUsagePurpose::ServerAuth];
    params
}

fn ymd(day: NaiveDate) -> (i32, u8, u8) {
    (day.year(), day.month() as u8, day.day() as u8)
}

/// Random positive serial
fn serial_number() -> SerialNumber {
    SerialNumber::from(rand::thread_rng().gen_range(1..=i64::MAX as u64))
}

/// Write with mode 0600 from the start so the key is never world readable
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("could not create {}", path.display()))?;

    // The mode above only applies to new files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("could not restrict {}", path.display()))?;
    }

    file.write_all(data)
        .with_context(|| format!("could not write {}", path.display()))
}
