use std::net::IpAddr;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request type for an impression served as a click.
pub const REQUEST_TYPE_CLICK: &str = "click";
/// Request type for an impression served as a display ad.
pub const REQUEST_TYPE_DISPLAY: &str = "display";

/// A single fraud check sent to `GET /check`.
///
/// Nothing here is validated client-side: Forensiq is the authority on what
/// it accepts, so every field is passed through as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckRequest {
    /// The visitor's IP address. Required by the API; `None` is sent as an
    /// empty `ip` parameter.
    pub ip: Option<IpAddr>,
    /// Where the call is performed: `click` or `display`. Required.
    pub request_type: String,
    /// The URL where the ad is placed.
    pub url: String,
    /// The ID assigned to the traffic source or publisher. Required by the API.
    pub seller_id: String,
    /// Sub source or placement ID.
    pub sub_id: String,
    /// Campaign or creative ID.
    pub campaign: String,
    /// User-agent captured from the browser's request headers.
    pub user_agent: String,
    /// ID representing the user behind the request.
    pub cookie_id: String,
}

impl CheckRequest {
    /// A `click` check for `ip` on behalf of `seller_id`.
    pub fn click(ip: IpAddr, seller_id: impl Into<String>) -> Self {
        Self {
            ip: Some(ip),
            request_type: REQUEST_TYPE_CLICK.to_string(),
            seller_id: seller_id.into(),
            ..Self::default()
        }
    }

    /// A `display` check for `ip` on behalf of `seller_id`.
    pub fn display(ip: IpAddr, seller_id: impl Into<String>) -> Self {
        Self {
            ip: Some(ip),
            request_type: REQUEST_TYPE_DISPLAY.to_string(),
            seller_id: seller_id.into(),
            ..Self::default()
        }
    }

    /// Query parameters carried by this request, excluding the client key
    /// and output marker injected by the client.
    ///
    /// Every parameter is always present, empty or not.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ip", self.ip.map(|ip| ip.to_string()).unwrap_or_default()),
            ("rt", self.request_type.clone()),
            ("url", self.url.clone()),
            ("seller", self.seller_id.clone()),
            ("sub", self.sub_id.clone()),
            ("cmp", self.campaign.clone()),
            ("ua", self.user_agent.clone()),
            ("id", self.cookie_id.clone()),
        ]
    }
}

/// Verdict returned by `GET /check`.
///
/// Decoding is lenient the way the API's reference client is: a field that
/// is missing or `null` keeps its zero value, a `null` body is an all-zero
/// verdict, and keys match case-insensitively when there is no exact match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Option<Map<String, Value>>")]
pub struct CheckResponse {
    /// Likelihood that the impression is fraudulent, 0 to 100.
    pub risk_score: i64,
    /// Ratio of impressions with a risk score of 65 or above for this
    /// seller/domain combination.
    pub seller_domain: i64,
    /// Ratio of ads viewed on the domain, 0 (none) to 100 (all).
    pub domain_viewed: i64,
    /// Ratio of ads likely hidden on the domain, 0 (none) to 100 (all).
    pub domain_hidden: i64,
    /// Ratio of ads viewed for the seller, 0 (none) to 100 (all).
    pub seller_viewed: i64,
    /// Ratio of ads likely hidden for the seller, 0 (none) to 100 (all).
    pub seller_hidden: i64,
    /// High-risk activity has been seen from this IP before.
    #[serde(rename = "ipr")]
    pub ip_reputation: bool,
    /// The IP is a proxy.
    #[serde(rename = "pxy")]
    pub proxy: bool,
    /// Botnet or other automated activity was identified.
    #[serde(rename = "atf")]
    pub automated_traffic: bool,
    /// The ISP is recognised as a hosting provider.
    #[serde(rename = "hst")]
    pub hosting_provider: bool,
    /// Spoofing patterns seen in the user agent.
    // The API sends this one capitalised.
    #[serde(rename = "Spoofed")]
    pub spoofed: i64,
    /// The visitor is not suspected of being a bot.
    pub non_suspect: bool,
    /// Server-side processing time in milliseconds.
    pub time_ms: i64,
}

impl TryFrom<Option<Map<String, Value>>> for CheckResponse {
    type Error = serde_json::Error;

    fn try_from(body: Option<Map<String, Value>>) -> Result<Self, Self::Error> {
        let Some(body) = body else {
            return Ok(Self::default());
        };
        let fields = Fields(body);
        Ok(Self {
            risk_score: fields.get("riskScore")?,
            seller_domain: fields.get("sellerDomain")?,
            domain_viewed: fields.get("domainViewed")?,
            domain_hidden: fields.get("domainHidden")?,
            seller_viewed: fields.get("sellerViewed")?,
            seller_hidden: fields.get("sellerHidden")?,
            ip_reputation: fields.get("ipr")?,
            proxy: fields.get("pxy")?,
            automated_traffic: fields.get("atf")?,
            hosting_provider: fields.get("hst")?,
            spoofed: fields.get("Spoofed")?,
            non_suspect: fields.get("nonSuspect")?,
            time_ms: fields.get("timeMs")?,
        })
    }
}

/// Top-level members of a `/check` response body.
struct Fields(Map<String, Value>);

impl Fields {
    /// Decode the member named `name`, falling back to the first key equal
    /// to it ignoring ASCII case. Missing and `null` members are zero.
    fn get<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, serde_json::Error> {
        let value = self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        });
        match value {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => {
                T::deserialize(value).map_err(|e| serde_json::Error::custom(format!("{name}: {e}")))
            }
        }
    }
}
