use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

use crate::config::CatalogConfig;
use crate::credits::CreditEntry;

const USER_AGENT: &str = concat!("comicshelf/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no catalog results for query: {query}")]
    NoResults { query: String },

    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("catalog returned status {status_code}: {message}")]
    Status { status_code: i64, message: String },

    #[error("decode catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid catalog url: {0}")]
    Url(#[from] url::ParseError),

    #[error("catalog API key is not set (pass --api-key or set COMICVINE_API_KEY)")]
    MissingApiKey,
}

impl CatalogError {
    /// True for the expected "nothing matched" outcome, as opposed to the
    /// catalog being unreachable or unhappy.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoResults { .. })
    }
}

/// Bibliographic lookups the resolver depends on.
pub trait Catalog {
    /// One search request; results keep the catalog's ranking order.
    /// Zero results is reported as [`CatalogError::NoResults`].
    fn search(&self, query: &str) -> Result<Vec<CatalogCandidate>, CatalogError>;

    /// Person credits for one issue. An empty list is a valid answer.
    fn fetch_credits(&self, issue_id: u64) -> Result<Vec<CreditEntry>, CatalogError>;
}

impl<T: Catalog + ?Sized> Catalog for &T {
    fn search(&self, query: &str) -> Result<Vec<CatalogCandidate>, CatalogError> {
        (**self).search(query)
    }

    fn fetch_credits(&self, issue_id: u64) -> Result<Vec<CreditEntry>, CatalogError> {
        (**self).fetch_credits(issue_id)
    }
}

/// One issue row from a catalog search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogCandidate {
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub issue_number: String,
    #[serde(default, deserialize_with = "nullable")]
    pub volume: VolumeRef,
    #[serde(default, deserialize_with = "nullable")]
    pub api_detail_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub site_detail_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub store_date: String,
    /// Filled by the follow-up credits request.
    #[serde(default, rename = "person_credits", deserialize_with = "nullable")]
    pub credits: Vec<CreditEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VolumeRef {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub site_detail_url: String,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    number_of_total_results: u64,
    #[serde(default, deserialize_with = "nullable")]
    results: Vec<CatalogCandidate>,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    status_code: i64,
    // The catalog sends `[]` instead of an object when nothing is recorded.
    #[serde(default, deserialize_with = "nullable")]
    results: CreditsResults,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreditsResults {
    #[serde(deserialize_with = "nullable")]
    person_credits: Vec<CreditEntry>,
}

const STATUS_OK: &str = "OK";

/// Comic Vine REST client.
#[derive(Debug, Clone)]
pub struct ComicVineClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    api_key: String,
}

impl ComicVineClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut base = config.base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        if self.api_key.is_empty() {
            return Err(CatalogError::MissingApiKey);
        }
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("format", "json");
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        tracing::debug!(endpoint = url.path(), "catalog request");
        // reqwest errors carry the full URL, and with it the API key.
        let response = self.client.get(url).send().map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let raw = response.text().map_err(reqwest::Error::without_url)?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or(raw);
            return Err(CatalogError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    Some(value.get("error")?.as_str()?.to_owned())
}

fn check_status(error: String, status_code: i64) -> Result<(), CatalogError> {
    if error == STATUS_OK {
        return Ok(());
    }
    Err(CatalogError::Status {
        status_code,
        message: error,
    })
}

impl Catalog for ComicVineClient {
    fn search(&self, query: &str) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let mut url = self.endpoint("search/")?;
        url.query_pairs_mut()
            .append_pair("resources", "issue")
            .append_pair("query", query);

        let response: SearchResponse = self.get_json(url)?;
        check_status(response.error, response.status_code)?;
        tracing::debug!(
            query,
            total = response.number_of_total_results,
            returned = response.results.len(),
            "catalog search"
        );
        if response.results.is_empty() {
            return Err(CatalogError::NoResults {
                query: query.to_owned(),
            });
        }
        Ok(response.results)
    }

    fn fetch_credits(&self, issue_id: u64) -> Result<Vec<CreditEntry>, CatalogError> {
        let mut url = self.endpoint(&format!("issue/4000-{issue_id}/"))?;
        url.query_pairs_mut().append_pair("field_list", "person_credits");

        let response: CreditsResponse = self.get_json(url)?;
        check_status(response.error, response.status_code)?;
        Ok(response.results.person_credits)
    }
}
