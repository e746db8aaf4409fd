//! JSON peer registry
//!
//! A `peers.json` file describes the replicas of a networked system. It is
//! looked up in several standard locations, in priority order:
//!
//! - `$PEERS_PATH`
//! - `$PWD/peers.json`
//! - `$HOME/.fluidfs/peers.json`
//! - `/etc/fluidfs/peers.json`
//!
//! The registry can also be synchronized from a remote service that serves
//! the same document.

use crate::config::Config;
use crate::defaults::DEFAULT_HTTP_TIMEOUT;
use crate::error::{AppError, ErrorContext, Result};
use crate::net;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DIRNAME: &str = "fluidfs";
const FILENAME: &str = "peers.json";

/// Environment variable overriding the peers path
pub const PEERS_PATH_VAR: &str = "PEERS_PATH";

//===========================================================================
// Path lookup
//===========================================================================

/// Configuration read from the environment, keeping whatever parsed
fn env_config() -> Config {
    let mut config = Config::default();
    if let Err(e) = config.merge_from_env() {
        crate::trace!("ignoring environment configuration error: {}", e);
    }
    config
}

fn cwd_peers() -> Option<PathBuf> {
    std::env::current_dir().ok().map(|cwd| cwd.join(FILENAME))
}

fn user_peers() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{}", DIRNAME)).join(FILENAME))
}

fn system_peers() -> PathBuf {
    Path::new("/etc").join(DIRNAME).join(FILENAME)
}

/// Candidate locations in priority order; unavailable ones are skipped
pub fn peers_paths() -> Vec<PathBuf> {
    peers_paths_with(&env_config())
}

/// Candidate locations with `config.peers_path` taking the place of `$PEERS_PATH`
pub fn peers_paths_with(config: &Config) -> Vec<PathBuf> {
    [config.peers_path.clone(), cwd_peers(), user_peers(), Some(system_peers())]
        .into_iter()
        .flatten()
        .collect()
}

/// Recommended location to store a peers file: the environment path, else
/// the user path, else the system path.
pub fn path() -> PathBuf {
    path_with(&env_config())
}

pub fn path_with(config: &Config) -> PathBuf {
    config.peers_path.clone().or_else(user_peers).unwrap_or_else(system_peers)
}

//===========================================================================
// Loading and syncing
//===========================================================================

/// Load from the first readable location. Never fails: when no file can be
/// loaded the collection is empty.
pub fn load() -> Peers {
    load_with(&env_config())
}

/// Like [`load`], searching the locations of a loaded configuration
pub fn load_with(config: &Config) -> Peers {
    for candidate in peers_paths_with(config) {
        match Peers::load(&candidate) {
            Ok(peers) => {
                crate::debug!("loaded peers from {}", candidate.display());
                return peers;
            }
            Err(e) => crate::trace!("skipping peers at {}: {}", candidate.display(), e),
        }
    }
    Peers::default()
}

/// Load from a specific path, propagating any error
pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Peers> {
    Peers::load(path)
}

/// Sync using `PEERS_SYNC_URL` and `PEERS_SYNC_APIKEY` from the environment
pub async fn sync() -> Result<Peers> {
    sync_with(&env_config()).await
}

/// Sync using the URL and API key of a loaded configuration
pub async fn sync_with(config: &Config) -> Result<Peers> {
    let url = config
        .peers_sync_url
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::config("could not find $PEERS_SYNC_URL"))?;
    let apikey = config
        .peers_sync_apikey
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::config("could not find $PEERS_SYNC_APIKEY"))?;
    sync_from(url, apikey).await
}

/// GET the peers document from `url`, sending `apikey` as `X-Api-Key`
pub async fn sync_from(url: &str, apikey: &str) -> Result<Peers> {
    let client = Client::builder().timeout(DEFAULT_HTTP_TIMEOUT).build()?;
    let response = client
        .get(url)
        .header("X-Api-Key", apikey)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AppError::network(format!("could not synchronize peers: {}", status)));
    }

    let peers: Peers = response.json().await?;
    crate::debug!("synchronized {} peers from {}", peers.peers.len(), url);
    Ok(peers)
}

//===========================================================================
// Peers collection
//===========================================================================

/// Network hosts or processes that can be communicated with, plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peers {
    /// Metadata associated with the collection
    #[serde(default)]
    pub info: BTreeMap<String, serde_json::Value>,
    /// The network peers, also called replicas
    #[serde(rename = "replicas", default)]
    pub peers: Vec<Peer>,
    /// Where the collection was loaded from
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Peers {
    /// Load a collection from a JSON file, remembering the path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
        let mut peers: Peers = serde_json::from_str(&data)?;
        peers.path = Some(path.to_path_buf());
        Ok(peers)
    }

    /// Path the collection was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the collection as pretty JSON. Without a path, writes back to
    /// the file it was loaded from.
    pub fn dump<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let target: PathBuf = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => self
                .path
                .clone()
                .ok_or_else(|| AppError::validation("no path specified to dump peers.json to"))?,
        };
        crate::stats::dump_json(&target, self)
    }

    /// Peers whose hostname (first label) matches `hostname`; an empty
    /// hostname means this machine.
    pub fn local(&self, hostname: &str) -> Vec<&Peer> {
        let hostname = if hostname.is_empty() {
            net::hostname()
        } else {
            hostname.to_string()
        };
        self.peers
            .iter()
            .filter(|peer| peer.short_hostname() == hostname)
            .collect()
    }

    /// The local peer with precedence id `pid`, or the first local peer for 0
    pub fn localhost(&self, hostname: &str, pid: u16) -> Result<&Peer> {
        self.local(hostname)
            .into_iter()
            .find(|peer| pid == 0 || peer.pid == pid)
            .ok_or_else(|| AppError::not_found("could not find a matching localhost"))
    }

    /// Peer by its unique name
    pub fn get(&self, name: &str) -> Result<&Peer> {
        self.peers
            .iter()
            .find(|peer| peer.name == name)
            .ok_or_else(|| AppError::not_found(format!("could not find a peer named '{}'", name)))
    }
}

fn is_empty_map(map: &BTreeMap<String, String>) -> bool {
    map.is_empty()
}

/// A replica process or host on the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    /// Precedence id of the peer
    pub pid: u16,
    /// Unique name of the peer
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(rename = "ip_address", default)]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    /// Port the replica listens on
    pub port: u16,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub aws_instance: BTreeMap<String, String>,
}

impl Peer {
    fn short_hostname(&self) -> &str {
        self.hostname.split('.').next().unwrap_or_default()
    }

    /// Whether the peer runs on this machine (hostnames may be FQDNs)
    pub fn is_local(&self) -> bool {
        let hostname = net::hostname();
        !hostname.is_empty() && self.short_hostname() == hostname
    }

    /// `domain:port` when `dns` is set and a domain is known, else `ip:port`
    pub fn endpoint(&self, dns: bool) -> String {
        if dns && !self.domain.is_empty() {
            return format!("{}:{}", self.domain, self.port);
        }
        format!("{}:{}", self.ip_address, self.port)
    }

    /// Endpoint for a ZMQ TCP socket: a wildcard bind address for servers,
    /// localhost for local peers, the peer's address otherwise.
    pub fn zmq_endpoint(&self, server: bool) -> String {
        if server {
            return format!("tcp://*:{}", self.port);
        }
        if self.is_local() {
            return format!("tcp://localhost:{}", self.port);
        }
        format!("tcp://{}:{}", self.ip_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURE: &str = r#"{
        "info": {"num_replicas": 3, "updated": "2017-11-03T14:12:00Z"},
        "replicas": [
            {"pid": 1, "name": "alpha", "hostname": "apollo.example.com", "ip_address": "10.0.0.1", "domain": "alpha.example.com", "port": 3264},
            {"pid": 2, "name": "bravo", "hostname": "apollo", "ip_address": "10.0.0.1", "port": 3265},
            {"pid": 3, "name": "charlie", "hostname": "hermes", "ip_address": "10.0.0.2", "port": 3264,
             "aws_instance": {"region": "us-east-1"}}
        ]
    }"#;

    fn fixture() -> Peers {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn test_paths_priority() {
        let _guard = crate::ENV_LOCK.lock();
        std::env::set_var(PEERS_PATH_VAR, "/tmp/peers.json");

        let paths = peers_paths();
        assert_eq!(paths[0], PathBuf::from("/tmp/peers.json"));
        assert_eq!(paths.last().unwrap(), &PathBuf::from("/etc/fluidfs/peers.json"));
        assert_eq!(path(), PathBuf::from("/tmp/peers.json"));

        // A malformed unrelated variable does not hide the peers path
        std::env::set_var("ENABLE_COLOR", "sometimes");
        let paths = peers_paths();
        std::env::remove_var("ENABLE_COLOR");
        assert_eq!(paths[0], PathBuf::from("/tmp/peers.json"));

        std::env::remove_var(PEERS_PATH_VAR);
        let paths = peers_paths();
        assert!(paths.iter().all(|p| p.ends_with("peers.json")));
        assert_ne!(path(), PathBuf::from("/tmp/peers.json"));
    }

    #[test]
    fn test_load_uses_env_path() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("peers.json");
        fs::write(&file, FIXTURE).unwrap();

        std::env::set_var(PEERS_PATH_VAR, &file);
        let peers = load();
        std::env::remove_var(PEERS_PATH_VAR);

        assert_eq!(peers.peers.len(), 3);
        assert_eq!(peers.path(), Some(file.as_path()));
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("peers.json");
        fs::write(
            &file,
            r#"{"info":{},"replicas":[{"name":"alpha","ip_address":"10.0.0.1"},{"pid":2}]}"#,
        )
        .unwrap();

        let peers = load_from(&file).unwrap();

        assert_eq!(peers.peers.len(), 2);
        assert_eq!(peers.peers[0].pid, 0);
        assert_eq!(peers.peers[0].port, 0);
        assert_eq!(peers.peers[0].name, "alpha");
        assert_eq!(peers.peers[1].pid, 2);
        assert!(peers.peers[1].name.is_empty());
        assert!(peers.peers[1].ip_address.is_empty());
    }

    #[test]
    fn test_config_peers_path_first() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("configured.json");
        fs::write(&file, FIXTURE).unwrap();

        let config = Config {
            peers_path: Some(file.clone()),
            ..Default::default()
        };
        assert_eq!(peers_paths_with(&config)[0], file);
        assert_eq!(path_with(&config), file);

        let peers = load_with(&config);
        assert_eq!(peers.peers.len(), 3);
        assert_eq!(peers.path(), Some(file.as_path()));

        let unset = Config::default();
        assert!(!peers_paths_with(&unset).contains(&file));
    }

    #[test]
    fn test_load_from_propagates_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load_from(dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert_eq!(load_from(&bad).unwrap_err().category(), "PARSE");
    }

    #[test]
    fn test_dump_round_trip_and_omitted_fields() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("conf").join("peers.json");

        let peers = fixture();
        peers.dump(Some(&file)).unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.contains("\"replicas\""));
        assert!(!text.contains("\"description\""));
        assert!(text.contains("\"aws_instance\""));

        let mut loaded = Peers::load(&file).unwrap();
        assert_eq!(loaded.peers, peers.peers);
        assert_eq!(loaded.info, peers.info);

        // Without a path, dumps back to where it was loaded from
        loaded.peers.pop();
        loaded.dump(None::<&Path>).unwrap();
        assert_eq!(Peers::load(&file).unwrap().peers.len(), 2);
    }

    #[test]
    fn test_dump_without_any_path() {
        let err = fixture().dump(None::<&Path>).unwrap_err();
        assert!(err.to_string().contains("no path specified"));
    }

    #[test]
    fn test_local_and_localhost() {
        let peers = fixture();

        let local = peers.local("apollo");
        assert_eq!(local.len(), 2);
        assert_eq!(local[0].name, "alpha");

        assert_eq!(peers.localhost("apollo", 0).unwrap().name, "alpha");
        assert_eq!(peers.localhost("apollo", 2).unwrap().name, "bravo");
        assert!(peers.localhost("apollo", 3).is_err());
        assert!(peers.localhost("zeus", 0).is_err());
    }

    #[test]
    fn test_get() {
        let peers = fixture();
        assert_eq!(peers.get("charlie").unwrap().pid, 3);
        let err = peers.get("delta").unwrap_err();
        assert!(err.to_string().contains("could not find a peer named 'delta'"));
    }

    #[test]
    fn test_endpoints() {
        let peers = fixture();
        let alpha = peers.get("alpha").unwrap();
        let charlie = peers.get("charlie").unwrap();

        assert_eq!(alpha.endpoint(true), "alpha.example.com:3264");
        assert_eq!(alpha.endpoint(false), "10.0.0.1:3264");
        assert_eq!(charlie.endpoint(true), "10.0.0.2:3264");

        assert_eq!(alpha.zmq_endpoint(true), "tcp://*:3264");
        if !charlie.is_local() {
            assert_eq!(charlie.zmq_endpoint(false), "tcp://10.0.0.2:3264");
        }
    }

    #[test]
    fn test_is_local_matches_this_host() {
        let hostname = net::hostname();
        if hostname.is_empty() {
            return;
        }
        let peer = Peer {
            name: "me".to_string(),
            hostname: format!("{}.local", hostname),
            port: 4000,
            ..Default::default()
        };
        assert!(peer.is_local());
        assert_eq!(peer.zmq_endpoint(false), "tcp://localhost:4000");
    }

    #[tokio::test]
    async fn test_sync_from_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/peers"))
            .and(header("X-Api-Key", "secret"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
            .mount(&server)
            .await;

        let peers = sync_from(&format!("{}/peers", server.uri()), "secret").await.unwrap();
        assert_eq!(peers.peers.len(), 3);
        assert!(peers.path().is_none());
    }

    #[tokio::test]
    async fn test_sync_from_rejects_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = sync_from(&server.uri(), "wrong").await.unwrap_err();
        assert!(err.to_string().contains("could not synchronize peers"));
    }

    #[test]
    fn test_sync_with_requires_credentials() {
        let mut config = Config::default();
        let err = tokio_test::block_on(sync_with(&config)).unwrap_err();
        assert!(err.to_string().contains("PEERS_SYNC_URL"));

        config.peers_sync_url = Some("http://localhost:1/peers".to_string());
        let err = tokio_test::block_on(sync_with(&config)).unwrap_err();
        assert!(err.to_string().contains("PEERS_SYNC_APIKEY"));
    }
}
