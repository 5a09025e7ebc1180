//! Recipient values and ordered recipient collections.
//!
//! Graph encodes every recipient as
//! `{"emailAddress": {"address": "...", "name": "..."}}`. The `name` key is
//! left out entirely when there is no display name; the service treats an
//! absent name differently from `null`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// One address endpoint with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Recipient {
    /// Creates a validated recipient without a display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the address is malformed.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Self::build(address.into(), None)
    }

    /// Creates a validated recipient with a display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the address is malformed.
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Self::build(address.into(), Some(name.into()))
    }

    fn build(address: String, name: Option<String>) -> Result<Self> {
        let address = address.trim().to_string();
        validate_address(&address)?;
        Ok(Self::normalized(address, name))
    }

    /// Recipient as reported by the service. Exchange may hand back
    /// addresses that are not `local@domain` (X.500 / legacy DN), so only
    /// emptiness is checked.
    fn from_service(address: String, name: Option<String>) -> Result<Self> {
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(Error::validation("recipient address cannot be empty"));
        }
        Ok(Self::normalized(address, name))
    }

    fn normalized(address: String, name: Option<String>) -> Self {
        Self {
            address,
            name: name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    /// Email address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Graph `recipient` resource.
    #[must_use]
    pub fn to_wire_format(&self) -> Value {
        json!({ "emailAddress": self })
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(Error::validation("recipient address cannot be empty"));
    }
    match address.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::validation(format!(
            "recipient address {address:?} must look like local@domain"
        ))),
    }
}

/// Any accepted way of naming a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientInput {
    /// A bare address.
    Address(String),
    /// `(address, name)`.
    Named(String, String),
    /// An already-built recipient, or one decoded from a JSON object.
    /// Only checked for a non-empty address.
    Object(Recipient),
}

impl RecipientInput {
    /// Resolves the input into a validated [`Recipient`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the address is malformed.
    pub fn into_recipient(self) -> Result<Recipient> {
        match self {
            Self::Address(address) => Recipient::new(address),
            Self::Named(address, name) => Recipient::with_name(address, name),
            Self::Object(recipient) => Recipient::from_service(recipient.address, recipient.name),
        }
    }
}

impl From<&str> for RecipientInput {
    fn from(address: &str) -> Self {
        Self::Address(address.to_string())
    }
}

impl From<String> for RecipientInput {
    fn from(address: String) -> Self {
        Self::Address(address)
    }
}

impl From<&String> for RecipientInput {
    fn from(address: &String) -> Self {
        Self::Address(address.clone())
    }
}

impl<A: Into<String>, N: Into<String>> From<(A, N)> for RecipientInput {
    fn from((address, name): (A, N)) -> Self {
        Self::Named(address.into(), name.into())
    }
}

impl From<Recipient> for RecipientInput {
    fn from(recipient: Recipient) -> Self {
        Self::Object(recipient)
    }
}

impl From<&Recipient> for RecipientInput {
    fn from(recipient: &Recipient) -> Self {
        Self::Object(recipient.clone())
    }
}

#[derive(Deserialize)]
struct FlatAddress {
    address: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedAddress {
    email_address: FlatAddress,
}

impl TryFrom<&Value> for RecipientInput {
    type Error = Error;

    /// Accepts `"addr"`, `["addr", "name"]`, `{"address", "name"?}` or the
    /// service's `{"emailAddress": {...}}`.
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(address) => Ok(Self::Address(address.clone())),
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(address), Value::String(name)] => {
                    Ok(Self::Named(address.clone(), name.clone()))
                }
                _ => Err(Error::validation(
                    "recipient pair must be [address, name] strings",
                )),
            },
            Value::Object(map) => {
                let flat = if map.contains_key("emailAddress") {
                    serde_json::from_value::<NestedAddress>(value.clone())
                        .map(|n| n.email_address)
                } else {
                    serde_json::from_value::<FlatAddress>(value.clone())
                }
                .map_err(|e| Error::validation(format!("unrecognized recipient object: {e}")))?;

                Ok(Self::Object(Recipient {
                    address: flat.address,
                    name: flat.name,
                }))
            }
            other => Err(Error::validation(format!(
                "unrecognized recipient value: {other}"
            ))),
        }
    }
}

/// Ordered recipient list. Order is preserved as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    items: Vec<Recipient>,
}

impl Recipients {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the input is malformed.
    pub fn add(&mut self, input: impl Into<RecipientInput>) -> Result<()> {
        self.items.push(input.into().into_recipient()?);
        Ok(())
    }

    /// Appends several recipients in order. Nothing is added if any fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for the first malformed input.
    pub fn extend<I, R>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: Into<RecipientInput>,
    {
        let resolved = inputs
            .into_iter()
            .map(|input| input.into().into_recipient())
            .collect::<Result<Vec<_>>>()?;
        self.items.extend(resolved);
        Ok(())
    }

    /// Appends a JSON value or a JSON array of values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for any unrecognized shape.
    pub fn add_json(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Array(values) => self.extend(
                values
                    .iter()
                    .map(RecipientInput::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            single => self.add(RecipientInput::try_from(single)?),
        }
    }

    /// Number of recipients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no recipients.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recipient at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Recipient> {
        self.items.get(index)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Recipient> {
        self.items.iter()
    }

    /// Removes and returns the recipient at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Recipient> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Removes every recipient.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// List of Graph `recipient` resources.
    #[must_use]
    pub fn to_wire_format(&self) -> Vec<Value> {
        self.items.iter().map(Recipient::to_wire_format).collect()
    }
}

impl<'a> IntoIterator for &'a Recipients {
    type Item = &'a Recipient;
    type IntoIter = std::slice::Iter<'a, Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::needless_collect)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bare_address_has_no_name_key() {
        let mut to = Recipients::new();
        to.add("a@b.com").unwrap();
        assert_eq!(
            to.to_wire_format(),
            vec![json!({"emailAddress": {"address": "a@b.com"}})]
        );
    }

    #[test]
    fn test_pair_keeps_name() {
        let mut to = Recipients::new();
        to.add(("jane@contoso.com", "Jane Doe")).unwrap();
        assert_eq!(
            to.to_wire_format(),
            vec![json!({"emailAddress": {"address": "jane@contoso.com", "name": "Jane Doe"}})]
        );
    }

    #[test]
    fn test_empty_name_treated_as_absent() {
        let r = Recipient::with_name("a@b.com", "  ").unwrap();
        assert_eq!(r.name(), None);
        assert_eq!(r.to_string(), "a@b.com");
    }

    #[test]
    fn test_order_preserved() {
        let mut to = Recipients::new();
        to.extend(["c@x.com", "a@x.com", "b@x.com"]).unwrap();
        let addresses: Vec<_> = to.iter().map(Recipient::address).collect();
        assert_eq!(addresses, ["c@x.com", "a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_extend_is_all_or_nothing() {
        let mut to = Recipients::new();
        to.add("keep@x.com").unwrap();
        let err = to.extend(["ok@x.com", "", "also@x.com"]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(to.len(), 1);
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let mut to = Recipients::new();
        assert!(to.add("").is_err());
        assert!(to.add("no-at-sign").is_err());
        assert!(to.add("@domain.com").is_err());
        assert!(to.add("local@").is_err());
        assert!(to.is_empty());
    }

    #[test]
    fn test_json_shapes() {
        let mut cc = Recipients::new();
        cc.add_json(&json!([
            "plain@x.com",
            ["pair@x.com", "Pair"],
            {"address": "flat@x.com", "name": "Flat"},
            {"emailAddress": {"address": "nested@x.com", "name": "Nested"}}
        ]))
        .unwrap();

        let rendered: Vec<String> = cc.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            [
                "plain@x.com",
                "Pair <pair@x.com>",
                "Flat <flat@x.com>",
                "Nested <nested@x.com>"
            ]
        );
    }

    #[test]
    fn test_unrecognized_json_rejected() {
        let mut cc = Recipients::new();
        for bad in [json!(42), json!(null), json!([["a@b.com"]]), json!({"mail": "a@b.com"})] {
            assert!(matches!(cc.add_json(&bad), Err(Error::Validation(_))), "{bad}");
        }
        assert!(cc.is_empty());
    }

    #[test]
    fn test_server_objects_accept_exchange_addresses() {
        let legacy_dn = "/o=ExchangeLabs/ou=Exchange Administrative Group (FYDIBOHF23SPDLT)/cn=Recipients/cn=jdoe";
        let mut to = Recipients::new();
        to.add_json(&json!([{"emailAddress": {"address": legacy_dn, "name": "John Doe"}}]))
            .unwrap();
        assert_eq!(to.get(0).unwrap().address(), legacy_dn);

        assert!(to.add(legacy_dn).is_err());
        assert!(matches!(
            to.add_json(&json!({"emailAddress": {"address": "  "}})),
            Err(Error::Validation(_))
        ));
        assert_eq!(to.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut bcc = Recipients::new();
        bcc.extend(["a@x.com", "b@x.com"]).unwrap();
        assert_eq!(bcc.remove(0).unwrap().address(), "a@x.com");
        assert!(bcc.remove(5).is_none());
        bcc.clear();
        assert!(bcc.is_empty());
    }

    fn address() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9.]{0,12}", "[a-z]{1,10}\\.[a-z]{2,4}").prop_map(|(l, d)| format!("{l}@{d}"))
    }

    proptest! {
        #[test]
        fn prop_wire_round_trip(addr in address(), name in proptest::option::of("[A-Za-z][A-Za-z ]{0,15}")) {
            let mut list = Recipients::new();
            match &name {
                Some(n) => list.add((addr.as_str(), n.as_str())).unwrap(),
                None => list.add(addr.as_str()).unwrap(),
            }

            let wire = list.to_wire_format();
            let email = &wire[0]["emailAddress"];
            prop_assert_eq!(email["address"].as_str(), Some(addr.as_str()));
            match name {
                Some(n) => prop_assert_eq!(email["name"].as_str(), Some(n.trim())),
                None => prop_assert!(email.get("name").is_none()),
            }

            // The server shape normalizes back to the same recipient.
            let mut back = Recipients::new();
            back.add_json(&Value::Array(wire)).unwrap();
            prop_assert_eq!(back, list);
        }
    }
}
