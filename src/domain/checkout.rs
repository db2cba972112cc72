//! Cart snapshot carried through the payment provider as session metadata.
//!
//! At checkout the cart and shipping address are flattened into string
//! key/value pairs that the provider stores with the payment session and
//! echoes back in its webhook. Decoding happens at the trust boundary and is
//! lenient: anything missing or malformed yields empty values rather than an
//! error, so a settlement is never refused because of metadata shape.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::cart::{is_freight_line, Cart};

/// Stripe rejects metadata values longer than this.
pub const METADATA_VALUE_LIMIT: usize = 500;

const CART_KEY: &str = "cart";
const ADDRESS_KEY: &str = "address";
const USER_KEY: &str = "user_id";
const EMAIL_KEY: &str = "email";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    pub recipient: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl ShippingAddress {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let street = [self.street.as_str(), self.number.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let city = [self.city.as_str(), self.state.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let parts: Vec<&str> = [
            self.recipient.as_str(),
            street.as_str(),
            self.complement.as_str(),
            self.neighborhood.as_str(),
            city.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
        write!(f, "{}", parts.join(" - "))?;
        if !self.postal_code.is_empty() {
            write!(f, " - CEP {}", self.postal_code)?;
        }
        Ok(())
    }
}

/// One line of the cart as it was when the checkout session was opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotItem {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub is_freight: bool,
}

impl SnapshotItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

// Short keys keep the encoded cart inside as few metadata values as possible.
#[derive(Serialize)]
struct WireItem<'a> {
    i: &'a str,
    n: &'a str,
    p: String,
    q: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    s: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    c: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    f: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutMetadata {
    pub items: Vec<SnapshotItem>,
    pub address: ShippingAddress,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

impl CheckoutMetadata {
    pub fn from_cart(
        cart: &Cart,
        address: ShippingAddress,
        user_id: Option<Uuid>,
        email: Option<String>,
    ) -> Self {
        let items = cart
            .items()
            .iter()
            .map(|i| SnapshotItem {
                id: i.id.clone(),
                name: i.name.clone(),
                price: i.price.clone(),
                quantity: i32::try_from(i.quantity).unwrap_or(i32::MAX),
                size: i.size.clone(),
                color: i.color.clone(),
                is_freight: is_freight_line(&i.id, &i.name, i.is_freight),
            })
            .collect();
        Self {
            items,
            address,
            user_id,
            email,
        }
    }

    /// Flatten into provider metadata, splitting long values into numbered
    /// chunks (`cart_0`, `cart_1`, ...) that each fit the provider limit.
    pub fn encode(&self) -> BTreeMap<String, String> {
        let wire: Vec<WireItem<'_>> = self
            .items
            .iter()
            .map(|i| WireItem {
                i: &i.id,
                n: &i.name,
                p: i.price.to_string(),
                q: i.quantity,
                s: i.size.as_deref(),
                c: i.color.as_deref(),
                f: i.is_freight,
            })
            .collect();

        let mut out = BTreeMap::new();
        // Serializing plain structs of strings and numbers cannot fail.
        let cart = serde_json::to_string(&wire).unwrap_or_else(|_| "[]".to_string());
        put_chunked(&mut out, CART_KEY, &cart);
        let address = serde_json::to_string(&self.address).unwrap_or_default();
        put_chunked(&mut out, ADDRESS_KEY, &address);
        if let Some(user_id) = self.user_id {
            out.insert(USER_KEY.to_string(), user_id.to_string());
        }
        if let Some(email) = &self.email {
            out.insert(EMAIL_KEY.to_string(), email.clone());
        }
        out
    }

    pub fn decode(metadata: &BTreeMap<String, String>) -> Self {
        let items = take_chunked(metadata, CART_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<Value>>(&raw).ok())
            .map(|values| {
                values
                    .into_iter()
                    .filter_map(|v| serde_json::from_value::<IncomingItem>(v).ok())
                    .filter_map(IncomingItem::into_snapshot)
                    .collect()
            })
            .unwrap_or_default();

        let address = take_chunked(metadata, ADDRESS_KEY)
            .and_then(|raw| serde_json::from_str::<ShippingAddress>(&raw).ok())
            .unwrap_or_default();

        let user_id = metadata
            .get(USER_KEY)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

        let email = metadata
            .get(EMAIL_KEY)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Self {
            items,
            address,
            user_id,
            email,
        }
    }

    /// Decode from a JSON object whose values are strings, as returned by
    /// providers that keep metadata as a JSON document.
    pub fn decode_json(metadata: &Value) -> Self {
        let map: BTreeMap<String, String> = metadata
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k.clone(), s.clone())),
                        Value::Number(n) => Some((k.clone(), n.to_string())),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self::decode(&map)
    }
}

fn put_chunked(out: &mut BTreeMap<String, String>, key: &str, value: &str) {
    let chars: Vec<char> = value.chars().collect();
    for (n, chunk) in chars.chunks(METADATA_VALUE_LIMIT).enumerate() {
        out.insert(format!("{key}_{n}"), chunk.iter().collect());
    }
}

fn take_chunked(metadata: &BTreeMap<String, String>, key: &str) -> Option<String> {
    let mut joined = String::new();
    let mut n = 0;
    while let Some(part) = metadata.get(&format!("{key}_{n}")) {
        joined.push_str(part);
        n += 1;
    }
    if n == 0 {
        // Single unchunked value, as written by older sessions.
        return metadata.get(key).cloned();
    }
    Some(joined)
}

/// A cart line as read back from metadata. Accepts the short keys written by
/// [`CheckoutMetadata::encode`] and the long names of older sessions; values
/// of the wrong type read as absent.
#[derive(Deserialize)]
struct IncomingItem {
    #[serde(default, alias = "id", deserialize_with = "lenient_text")]
    i: Option<String>,
    #[serde(default, alias = "name", deserialize_with = "lenient_text")]
    n: Option<String>,
    #[serde(default, alias = "price", deserialize_with = "lenient_price")]
    p: Option<BigDecimal>,
    #[serde(default, alias = "quantity", deserialize_with = "lenient_quantity")]
    q: Option<i32>,
    #[serde(default, alias = "size", deserialize_with = "lenient_text")]
    s: Option<String>,
    #[serde(default, alias = "color", deserialize_with = "lenient_text")]
    c: Option<String>,
    #[serde(default, alias = "is_freight", deserialize_with = "lenient_flag")]
    f: bool,
}

impl IncomingItem {
    fn into_snapshot(self) -> Option<SnapshotItem> {
        let id = self.i.unwrap_or_default();
        let name = self.n.unwrap_or_default();
        if id.is_empty() && name.is_empty() {
            return None;
        }
        Some(SnapshotItem {
            is_freight: is_freight_line(&id, &name, self.f),
            price: self.p.unwrap_or_default(),
            quantity: self.q.unwrap_or(1),
            size: self.s,
            color: self.c,
            id,
            name,
        })
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    })
}

fn lenient_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BigDecimal>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    })
}

fn lenient_quantity<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Ok(Value::deserialize(d)?
        .as_i64()
        .and_then(|q| i32::try_from(q).ok())
        .filter(|q| *q > 0))
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(d)?.as_bool().unwrap_or(false))
}
