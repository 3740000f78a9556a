//! Shareable deep links
//!
//! The USI, peak list and precursor m/z are kept in the page's URL fragment
//! as percent-encoded JSON, so a search can be bookmarked or pasted without
//! the values ever being sent to the server as a query string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// USI shown when a page is opened without (or with a broken) fragment
pub const DEFAULT_USI: &str = "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00011432553";

/// Path of the dashboard page the fragment is attached to
pub const DASHBOARD_PATH: &str = "/microbiomemasst";

const FASST_SEARCH_URL: &str = "https://fasst.gnps2.org/fastsearch/";

/// Form values carried in the URL fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinkState {
    pub usi1: String,
    pub peaks: String,
    pub precursor_mz: String,
}

impl Default for DeepLinkState {
    fn default() -> Self {
        Self {
            usi1: DEFAULT_USI.to_string(),
            peaks: String::new(),
            precursor_mz: String::new(),
        }
    }
}

impl DeepLinkState {
    pub fn for_usi(usi: impl Into<String>) -> Self {
        Self {
            usi1: usi.into(),
            ..Self::default()
        }
    }
}

/// Encode state as a fragment (without the leading `#`)
pub fn encode(state: &DeepLinkState) -> String {
    let json = serde_json::json!({
        "usi1": state.usi1,
        "peaks": state.peaks,
        "precursor_mz": state.precursor_mz,
    });
    urlencoding::encode(&json.to_string()).into_owned()
}

/// Decode a fragment, with or without its leading `#`.
///
/// Never fails: anything that is not a percent-encoded JSON object gives the
/// default state, and missing fields keep their defaults. Each field may be
/// a string or a list whose first element is used.
pub fn decode(fragment: &str) -> DeepLinkState {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    let object = urlencoding::decode(fragment)
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(&text).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        });

    let Some(object) = object else {
        debug!(fragment_len = fragment.len(), "Deep link fragment not decodable, using defaults");
        return DeepLinkState::default();
    };

    let defaults = DeepLinkState::default();
    DeepLinkState {
        usi1: field(&object, "usi1").unwrap_or(defaults.usi1),
        peaks: field(&object, "peaks").unwrap_or(defaults.peaks),
        precursor_mz: field(&object, "precursor_mz").unwrap_or(defaults.precursor_mz),
    }
}

fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    scalar(object.get(key)?)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(scalar),
        _ => None,
    }
}

/// Page link that pre-fills the form for a GNPS library spectrum
pub fn example_link(library_id: &str) -> String {
    let state = DeepLinkState::for_usi(format!("mzspec:GNPS:GNPS-LIBRARY:accession:{library_id}"));
    format!("{DASHBOARD_PATH}#{}", encode(&state))
}

/// Absolute link to the dashboard with the given state, for "Copy Link"
pub fn query_link(base_url: &str, state: &DeepLinkState) -> String {
    format!(
        "{}{DASHBOARD_PATH}#{}",
        base_url.trim_end_matches('/'),
        encode(state)
    )
}

/// Link to the public single-spectrum FASST search for a USI
pub fn fasst_link(usi: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("usi1", usi)
        .finish();
    format!("{FASST_SEARCH_URL}?{query}")
}
