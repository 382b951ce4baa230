use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::cluster::{BrowseEntry, ClusterClient, ContentLocator, Host, MasterState};
use crate::config::FsConfig;
use crate::error::{Error, Result};

/// [`ClusterClient`] over the DC/OS admin router.
///
/// Mesos master endpoints live under `mesos/`, agents under `slave/<id>/`
/// and Marathon under `marathon/`.
pub struct HttpCluster {
    http: reqwest::blocking::Client,
    base: Url,
    token: Option<String>,
}

/// Body of `files/read.json`.
#[derive(Debug, Deserialize)]
struct ReadChunk {
    #[serde(default)]
    data: String,
    offset: i64,
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    apps: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AppResponse {
    app: Value,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    tasks: Vec<Value>,
}

impl HttpCluster {
    pub fn new(config: &FsConfig) -> Result<Self> {
        let mut base = Url::parse(&config.dcos_url)
            .map_err(|e| Error::config(format!("invalid dcos_url {}: {e}", config.dcos_url)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout())
            .gzip(true)
            .build()
            .map_err(|e| Error::remote_fetch(base.as_str(), e))?;

        Ok(Self {
            http,
            base,
            token: config.acs_token.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::remote_fetch(format!("{}{path}", self.base), e))
    }

    fn master_url(&self, path: &str) -> Result<Url> {
        self.url(&format!("mesos/{path}"))
    }

    fn agent_url(&self, agent_id: &str, path: &str) -> Result<Url> {
        self.url(&format!("slave/{agent_id}/{path}"))
    }

    fn marathon_url(&self, path: &str) -> Result<Url> {
        self.url(&format!("marathon/{path}"))
    }

    fn app_url(&self, app_id: &str, suffix: &str) -> Result<Url> {
        let app_id = app_id.trim_start_matches('/');
        self.marathon_url(&format!("v2/apps/{app_id}{suffix}"))
    }

    fn browse_url(&self, agent_id: &str, path: &str) -> Result<Url> {
        let mut url = self.agent_url(agent_id, "files/browse.json")?;
        _ = url.query_pairs_mut().append_pair("path", path);
        Ok(url)
    }

    /// `files/read.json` on the host serving `locator`. An `offset` of -1
    /// asks for the size only.
    fn read_url(&self, locator: &ContentLocator, offset: i64, length: Option<u64>) -> Result<Url> {
        let mut url = match &locator.host {
            Host::Master => self.master_url("files/read.json")?,
            Host::Agent(agent_id) => self.agent_url(agent_id, "files/read.json")?,
        };
        {
            let mut query = url.query_pairs_mut();
            _ = query.append_pair("path", &locator.path);
            _ = query.append_pair("offset", &offset.to_string());
            if let Some(length) = length {
                _ = query.append_pair("length", &length.to_string());
            }
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token={token}"));
        }

        let response = request
            .send()
            .map_err(|e| Error::remote_fetch(url.as_str(), e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::remote_fetch(url.as_str(), format!("HTTP {status}: {body}")));
        }

        let text = response
            .text()
            .map_err(|e| Error::remote_fetch(url.as_str(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::InvalidResponse(format!("{url}: {e}")))
    }
}

impl ClusterClient for HttpCluster {
    fn master_state(&self) -> Result<MasterState> {
        let url = self.master_url("master/state.json")?;
        Ok(MasterState::new(self.get_json(url)?))
    }

    fn agent_state(&self, agent_id: &str) -> Result<Value> {
        self.get_json(self.agent_url(agent_id, "state.json")?)
    }

    fn browse(&self, agent_id: &str, path: &str) -> Result<Vec<BrowseEntry>> {
        self.get_json(self.browse_url(agent_id, path)?)
    }

    fn read(&self, locator: &ContentLocator, offset: u64, length: u64) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let offset = i64::try_from(offset)
            .map_err(|_| Error::remote_read(locator, format!("offset {offset} out of range")))?;
        let chunk: ReadChunk = self.get_json(self.read_url(locator, offset, Some(length))?)?;
        Ok(chunk.data.into_bytes())
    }

    fn size(&self, locator: &ContentLocator) -> Result<u64> {
        let chunk: ReadChunk = self.get_json(self.read_url(locator, -1, None)?)?;
        u64::try_from(chunk.offset)
            .map_err(|_| Error::InvalidResponse(format!("negative size for {locator}")))
    }

    fn apps(&self) -> Result<Vec<Value>> {
        let response: AppsResponse = self.get_json(self.marathon_url("v2/apps")?)?;
        Ok(response.apps)
    }

    fn app(&self, app_id: &str) -> Result<Value> {
        let response: AppResponse = self.get_json(self.app_url(app_id, "")?)?;
        Ok(response.app)
    }

    fn app_tasks(&self, app_id: &str) -> Result<Vec<Value>> {
        let response: TasksResponse = self.get_json(self.app_url(app_id, "/tasks")?)?;
        Ok(response.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(url: &str) -> HttpCluster {
        HttpCluster::new(&FsConfig::new(url)).expect("client")
    }

    #[test]
    fn test_url_construction() {
        let c = cluster("https://dcos.example.com");
        assert_eq!(
            c.master_url("master/state.json").expect("url").as_str(),
            "https://dcos.example.com/mesos/master/state.json"
        );
        assert_eq!(
            c.agent_url("S0", "state.json").expect("url").as_str(),
            "https://dcos.example.com/slave/S0/state.json"
        );
        assert_eq!(
            c.app_url("/prod/web", "/tasks").expect("url").as_str(),
            "https://dcos.example.com/marathon/v2/apps/prod/web/tasks"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let c = cluster("http://localhost:8080/proxy");
        assert_eq!(
            c.marathon_url("v2/apps").expect("url").as_str(),
            "http://localhost:8080/proxy/marathon/v2/apps"
        );
    }

    #[test]
    fn test_query_urls() {
        let c = cluster("https://dcos.example.com/");
        assert_eq!(
            c.browse_url("S1", "/var/sandbox/t 1").expect("url").as_str(),
            "https://dcos.example.com/slave/S1/files/browse.json?path=%2Fvar%2Fsandbox%2Ft+1"
        );
        assert_eq!(
            c.read_url(&ContentLocator::master("/master/log"), -1, None)
                .expect("url")
                .as_str(),
            "https://dcos.example.com/mesos/files/read.json?path=%2Fmaster%2Flog&offset=-1"
        );
        assert_eq!(
            c.read_url(&ContentLocator::agent("S1", "/slave/log"), 10, Some(5))
                .expect("url")
                .as_str(),
            "https://dcos.example.com/slave/S1/files/read.json?path=%2Fslave%2Flog&offset=10&length=5"
        );
    }

    #[test]
    fn test_read_chunk_parses() {
        let chunk: ReadChunk = serde_json::from_str(r#"{"data": "", "offset": 1234}"#).expect("parse");
        assert_eq!(chunk.offset, 1234);
        assert!(chunk.data.is_empty());
    }
}
