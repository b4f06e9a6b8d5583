//! View address parsing
//!
//! A device view is addressed like a web page:
//! `http://host:3301/fridge.html?type=fridge&name=kitchen&mac=AA:11`.
//! [`parse_url_params`] turns the query part into a multi-valued mapping and
//! [`DeviceQuery`] picks out the three keys the dashboard needs.

use crate::types::DeviceId;
use std::collections::HashMap;
use url::form_urlencoded;

/// Query parameter name → values in order of appearance
///
/// A value is `None` when the parameter appeared without `=`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams(HashMap<String, Vec<Option<String>>>);

impl QueryParams {
    /// All values recorded for `name`
    pub fn get(&self, name: &str) -> Option<&[Option<String>]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value of `name`, treating a bare flag as absent
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|values| values.first())
            .and_then(|v| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Percent-decode one name or value, `+` meaning a space
fn decode_component(raw: &str) -> String {
    // Escape '=' so the form parser keeps the component in one piece
    let escaped = raw.replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}

/// Parse the query part of a view address
///
/// The address is cut at the first `#`; the query is the text after the
/// first `?` before that. Returns `None` when there is no `?` or the query
/// is empty. For `a=b=c` the value
/// is `b`; anything after a second `=` is discarded.
pub fn parse_url_params(address: &str) -> Option<QueryParams> {
    let before_fragment = address.split('#').next().unwrap_or_default();
    let (_, query) = before_fragment.split_once('?')?;
    if query.is_empty() {
        return None;
    }

    let mut params: HashMap<String, Vec<Option<String>>> = HashMap::new();
    for pair in query.split('&') {
        let mut parts = pair.splitn(3, '=');
        let name = decode_component(parts.next().unwrap_or_default());
        let value = parts.next().map(decode_component);
        params.entry(name).or_default().push(value);
    }
    Some(QueryParams(params))
}

/// The device a view address points at
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceQuery {
    pub mac: DeviceId,
    pub device_type: String,
    pub name: String,
}

impl DeviceQuery {
    pub fn new(mac: impl Into<String>, device_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mac: DeviceId::new(mac),
            device_type: device_type.into(),
            name: name.into(),
        }
    }

    /// Extract `mac`, `type` and `name`; missing keys become empty strings
    pub fn from_params(params: Option<&QueryParams>) -> Self {
        let pick = |key: &str| {
            params
                .and_then(|p| p.first(key))
                .unwrap_or_default()
                .to_string()
        };
        Self::new(pick("mac"), pick("type"), pick("name"))
    }

    /// Resolve a full view address
    pub fn from_address(address: &str) -> Self {
        Self::from_params(parse_url_params(address).as_ref())
    }

    /// Whether the query names a device at all
    pub fn has_device(&self) -> bool {
        !self.mac.is_empty()
    }

    /// Query pairs appended to every device request
    pub fn request_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("mac", self.mac.as_str()),
            ("type", self.device_type.as_str()),
            ("name", self.name.as_str()),
        ]
    }

    /// View address of this device relative to `base` (e.g. the server URL)
    pub fn view_address(&self, base: &str) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("type", &self.device_type)
            .append_pair("name", &self.name)
            .append_pair("mac", self.mac.as_str())
            .finish();
        format!("{}/fridge.html?{}", base.trim_end_matches('/'), query)
    }
}
