//! Shopping cart held by the shopper while browsing.
//!
//! The cart is a plain value owned by whoever drives the checkout; there is no
//! process-wide instance. Entries are keyed by `(id, size, color)` and keep
//! their insertion order. Shipping is represented by a single freight line
//! whose id is one of the reserved [`FREIGHT_IDS`].

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Reserved id of the freight line for the standard (PAC) service.
pub const FREIGHT_PAC_ID: &str = "frete-pac";
/// Reserved id of the freight line for the express (SEDEX) service.
pub const FREIGHT_SEDEX_ID: &str = "frete-sedex";
pub const FREIGHT_IDS: [&str; 2] = [FREIGHT_PAC_ID, FREIGHT_SEDEX_ID];

const FREIGHT_NAME_PREFIX: &str = "frete";

/// Whether a cart or order line stands for shipping cost rather than a product.
///
/// A line is freight when it is flagged as such, carries one of the reserved
/// ids, or its name starts with "Frete". Both payment providers settle through
/// this single rule.
pub fn is_freight_line(id: &str, name: &str, flagged: bool) -> bool {
    flagged
        || FREIGHT_IDS.contains(&id)
        || name
            .trim_start()
            .get(..FREIGHT_NAME_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(FREIGHT_NAME_PREFIX))
}

/// Product data the cart needs to create a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CartProduct {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_freight: bool,
}

impl CartItem {
    fn matches(&self, id: &str, size: Option<&str>, color: Option<&str>) -> bool {
        self.id == id && self.size.as_deref() == size && self.color.as_deref() == color
    }

    fn is_freight(&self) -> bool {
        is_freight_line(&self.id, &self.name, self.is_freight)
    }

    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self { items }
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of `product` in the given size/color.
    ///
    /// An existing entry with the same product, size and color is bumped in
    /// place; otherwise a new entry with quantity one is appended. Freight
    /// lines never take part in the match.
    pub fn add(&mut self, product: &CartProduct, size: Option<&str>, color: Option<&str>) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| !i.is_freight() && i.matches(&product.id, size, color))
        {
            existing.quantity += 1;
            return;
        }

        self.items.push(CartItem {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price.clone(),
            quantity: 1,
            size: size.map(str::to_string),
            color: color.map(str::to_string),
            image: product.image.clone(),
            is_freight: false,
        });
    }

    pub fn increment_item(&mut self, id: &str, size: Option<&str>, color: Option<&str>) {
        if let Some(item) = self.items.iter_mut().find(|i| i.matches(id, size, color)) {
            item.quantity += 1;
        }
    }

    /// Take one unit off the matching entry, dropping it once it reaches zero.
    pub fn decrement_item(&mut self, id: &str, size: Option<&str>, color: Option<&str>) {
        let Some(pos) = self.items.iter().position(|i| i.matches(id, size, color)) else {
            return;
        };
        if self.items[pos].quantity <= 1 {
            self.items.remove(pos);
        } else {
            self.items[pos].quantity -= 1;
        }
    }

    pub fn remove_item(&mut self, id: &str, size: Option<&str>, color: Option<&str>) {
        self.items.retain(|i| !i.matches(id, size, color));
    }

    /// Replace whatever freight line is present with `item`.
    pub fn add_freight(&mut self, mut item: CartItem) {
        self.items.retain(|i| !i.is_freight());
        item.is_freight = true;
        item.quantity = 1;
        item.size = None;
        item.color = None;
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn freight(&self) -> Option<&CartItem> {
        self.items.iter().find(|i| i.is_freight())
    }

    /// Sum of the product lines, freight excluded.
    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .filter(|i| !i.is_freight())
            .map(CartItem::line_total)
            .sum()
    }

    pub fn total(&self) -> BigDecimal {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product(id: &str, price: &str) -> CartProduct {
        CartProduct {
            id: id.to_string(),
            name: format!("Produto {id}"),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            image: None,
        }
    }

    fn freight(id: &str, price: &str) -> CartItem {
        CartItem {
            id: id.to_string(),
            name: "Frete PAC".to_string(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            quantity: 1,
            size: None,
            color: None,
            image: None,
            is_freight: false,
        }
    }

    #[test]
    fn adding_same_variant_twice_merges_into_one_entry() {
        let mut cart = Cart::new();
        let p1 = product("p1", "100.00");

        cart.add(&p1, Some("M"), Some("Azul"));
        cart.add(&p1, Some("M"), Some("Azul"));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn different_size_or_color_is_a_separate_entry() {
        let mut cart = Cart::new();
        let p1 = product("p1", "100.00");

        cart.add(&p1, Some("M"), Some("Azul"));
        cart.add(&p1, Some("G"), Some("Azul"));
        cart.add(&p1, Some("M"), Some("Rosa"));
        cart.add(&p1, None, None);

        assert_eq!(cart.items().len(), 4);
    }

    #[test]
    fn existing_entries_keep_their_position() {
        let mut cart = Cart::new();
        cart.add(&product("p1", "10.00"), None, None);
        cart.add(&product("p2", "20.00"), None, None);
        cart.add(&product("p1", "10.00"), None, None);

        let ids: Vec<&str> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn decrementing_last_unit_removes_entry() {
        let mut cart = Cart::new();
        cart.add(&product("p1", "10.00"), Some("P"), None);

        cart.decrement_item("p1", Some("P"), None);

        assert!(cart.is_empty());
    }

    #[test]
    fn increment_and_decrement_only_touch_exact_match() {
        let mut cart = Cart::new();
        let p1 = product("p1", "10.00");
        cart.add(&p1, Some("P"), None);
        cart.add(&p1, Some("M"), None);

        cart.increment_item("p1", Some("M"), None);
        cart.increment_item("p1", Some("GG"), None);
        cart.decrement_item("p1", Some("P"), None);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].size.as_deref(), Some("M"));
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn remove_item_drops_regardless_of_quantity() {
        let mut cart = Cart::new();
        let p1 = product("p1", "10.00");
        cart.add(&p1, None, Some("Azul"));
        cart.add(&p1, None, Some("Azul"));
        cart.add(&product("p2", "5.00"), None, None);

        cart.remove_item("p1", None, Some("Azul"));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].id, "p2");
    }

    #[test]
    fn add_freight_keeps_a_single_freight_line() {
        let mut cart = Cart::new();
        cart.add(&product("p1", "10.00"), None, None);

        cart.add_freight(freight(FREIGHT_PAC_ID, "20.00"));
        cart.add_freight(freight(FREIGHT_SEDEX_ID, "35.00"));
        cart.add_freight(freight(FREIGHT_PAC_ID, "21.00"));

        let freights: Vec<&CartItem> = cart.items().iter().filter(|i| i.is_freight).collect();
        assert_eq!(freights.len(), 1);
        assert_eq!(freights[0].id, FREIGHT_PAC_ID);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn add_never_merges_into_freight_line() {
        let mut cart = Cart::new();
        cart.add_freight(freight(FREIGHT_PAC_ID, "20.00"));

        cart.add(&product(FREIGHT_PAC_ID, "20.00"), None, None);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.freight().map(|f| f.quantity), Some(1));
    }

    #[test]
    fn subtotal_excludes_freight_and_total_includes_it() {
        let mut cart = Cart::new();
        let p1 = product("p1", "49.90");
        cart.add(&p1, None, None);
        cart.add(&p1, None, None);
        cart.add_freight(freight(FREIGHT_SEDEX_ID, "25.10"));

        assert_eq!(cart.subtotal(), BigDecimal::from_str("99.80").unwrap());
        assert_eq!(cart.total(), BigDecimal::from_str("124.90").unwrap());
    }

    #[test]
    fn clear_empties_cart() {
        let mut cart = Cart::new();
        cart.add(&product("p1", "1.00"), None, None);
        cart.add_freight(freight(FREIGHT_PAC_ID, "2.00"));

        cart.clear();

        assert!(cart.is_empty());
    }

    #[test]
    fn freight_rule_accepts_flag_sentinel_or_name() {
        assert!(is_freight_line("anything", "Camiseta", true));
        assert!(is_freight_line(FREIGHT_SEDEX_ID, "", false));
        assert!(is_freight_line("x", "Frete SEDEX", false));
        assert!(is_freight_line("x", "  frete pac", false));
        assert!(!is_freight_line("p1", "Vestido Floral", false));
        assert!(!is_freight_line("p1", "Fre", false));
    }
}
