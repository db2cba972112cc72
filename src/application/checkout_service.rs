use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use uuid::Uuid;

use crate::domain::cart::{is_freight_line, Cart};
use crate::domain::catalog::ProductView;
use crate::domain::checkout::{CheckoutMetadata, ShippingAddress};
use crate::domain::errors::DomainError;

/// One line as the hosted checkout page will show it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: i32,
}

/// Everything a provider client needs to open a hosted payment session.
#[derive(Debug, Clone)]
pub struct PreparedCheckout {
    /// Our id for this checkout. Providers that settle under their own
    /// payment ids echo it back so the order is findable by it.
    pub reference: String,
    pub line_items: Vec<LineItem>,
    pub metadata: CheckoutMetadata,
    pub total: BigDecimal,
}

impl PreparedCheckout {
    pub fn email(&self) -> Option<&str> {
        self.metadata.email.as_deref()
    }
}

pub fn prepare_checkout(
    cart: &Cart,
    address: ShippingAddress,
    user_id: Option<Uuid>,
    email: Option<String>,
) -> Result<PreparedCheckout, DomainError> {
    if cart.is_empty() {
        return Err(DomainError::InvalidInput("cart is empty".to_string()));
    }

    let line_items = cart
        .items()
        .iter()
        .map(|item| {
            if item.quantity == 0 {
                return Err(DomainError::InvalidInput(format!(
                    "item '{}' has zero quantity",
                    item.name
                )));
            }
            let mut name = item.name.clone();
            let variant: Vec<&str> = [item.size.as_deref(), item.color.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !variant.is_empty() {
                name = format!("{name} ({})", variant.join(" / "));
            }
            Ok(LineItem {
                name,
                unit_amount_cents: to_cents(&item.price)?,
                quantity: i32::try_from(item.quantity).map_err(|_| {
                    DomainError::InvalidInput(format!("quantity too large for '{}'", item.name))
                })?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());

    Ok(PreparedCheckout {
        reference: Uuid::new_v4().to_string(),
        line_items,
        total: cart.total(),
        metadata: CheckoutMetadata::from_cart(cart, address, user_id, email),
    })
}

/// Unit price of `product` in the given size/color: the base price plus the
/// matching variation's delta.
pub fn catalog_unit_price(
    product: &ProductView,
    size: Option<&str>,
    color: Option<&str>,
) -> Result<BigDecimal, DomainError> {
    if !product.is_active {
        return Err(DomainError::InvalidInput(format!(
            "'{}' is not available",
            product.name
        )));
    }
    if size.is_none() && color.is_none() {
        return Ok(product.price.clone());
    }
    product
        .variations
        .iter()
        .find(|v| v.size.as_deref() == size && v.color.as_deref() == color)
        .map(|v| &product.price + &v.price_delta)
        .ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "'{}' has no {} / {} variation",
                product.name,
                size.unwrap_or("-"),
                color.unwrap_or("-")
            ))
        })
}

/// Rebuild `cart` with product names and prices taken from the catalog.
/// The freight line keeps the price of the quote the shopper picked.
pub fn price_from_catalog<F>(cart: &Cart, mut lookup: F) -> Result<Cart, DomainError>
where
    F: FnMut(Uuid) -> Result<Option<ProductView>, DomainError>,
{
    let mut lines = Vec::with_capacity(cart.items().len());
    for item in cart
        .items()
        .iter()
        .filter(|i| !is_freight_line(&i.id, &i.name, i.is_freight))
    {
        let product = Uuid::parse_str(&item.id)
            .ok()
            .map(&mut lookup)
            .transpose()?
            .flatten()
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown product '{}'", item.id)))?;
        let mut line = item.clone();
        line.price = catalog_unit_price(&product, item.size.as_deref(), item.color.as_deref())?;
        line.name = product.name;
        lines.push(line);
    }

    let mut priced = Cart::from(lines);
    if let Some(freight) = cart.freight() {
        priced.add_freight(freight.clone());
    }
    Ok(priced)
}

/// Convert a BRL amount to integer centavos, rounding to the nearest one.
pub fn to_cents(amount: &BigDecimal) -> Result<i64, DomainError> {
    if *amount < BigDecimal::zero() {
        return Err(DomainError::InvalidInput(format!(
            "negative amount {amount}"
        )));
    }
    (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| DomainError::InvalidInput(format!("amount {amount} out of range")))
}
