use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariationView {
    pub id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub stock: i32,
    pub price_delta: BigDecimal,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct ReviewView {
    pub id: Uuid,
    pub author_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Dimensions {
    pub weight_kg: Option<BigDecimal>,
    pub width_cm: Option<i32>,
    pub height_cm: Option<i32>,
    pub length_cm: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_bestseller: bool,
    pub category: Option<CategoryView>,
    pub dimensions: Dimensions,
    pub variations: Vec<VariationView>,
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub category_slug: Option<String>,
    pub featured: Option<bool>,
    pub bestseller: Option<bool>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone)]
pub struct VariationInput {
    pub size: Option<String>,
    pub color: Option<String>,
    pub stock: i32,
    pub price_delta: BigDecimal,
    pub sku: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_bestseller: bool,
    pub category_id: Option<Uuid>,
    pub dimensions: Dimensions,
    pub variations: Vec<VariationInput>,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("name is required".to_string()));
        }
        if self.price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(
                "price must not be negative".to_string(),
            ));
        }
        if self.stock < 0 || self.variations.iter().any(|v| v.stock < 0) {
            return Err(DomainError::InvalidInput(
                "stock must not be negative".to_string(),
            ));
        }
        let mut seen: Vec<(Option<&str>, Option<&str>)> = Vec::new();
        for v in &self.variations {
            let key = (v.size.as_deref(), v.color.as_deref());
            if seen.contains(&key) {
                return Err(DomainError::InvalidInput(format!(
                    "duplicate variation {}/{}",
                    key.0.unwrap_or("-"),
                    key.1.unwrap_or("-")
                )));
            }
            seen.push(key);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BannerView {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct BannerInput {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub rating: i32,
    pub comment: String,
}

impl ReviewInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=5).contains(&self.rating) {
            return Err(DomainError::InvalidInput(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        if self.comment.trim().is_empty() {
            return Err(DomainError::InvalidInput("comment is required".to_string()));
        }
        Ok(())
    }
}

/// URL-safe identifier derived from a display name.
///
/// Latin accents are folded ("Calça Jeans" becomes "calca-jeans"), anything
/// that is not alphanumeric becomes a single hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// SKU for a variation created without one, e.g. `vestido-floral-m-azul`.
pub fn variation_sku(product_slug: &str, size: Option<&str>, color: Option<&str>) -> String {
    let mut parts = vec![product_slug.to_string()];
    parts.extend(size.map(slugify).filter(|s| !s.is_empty()));
    parts.extend(color.map(slugify).filter(|s| !s.is_empty()));
    parts.join("-")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Vestido Floral".to_string(),
            description: None,
            price: BigDecimal::from_str("89.90").unwrap(),
            stock: 5,
            images: vec![],
            is_active: true,
            is_featured: false,
            is_bestseller: false,
            category_id: None,
            dimensions: Dimensions {
                weight_kg: None,
                width_cm: None,
                height_cm: None,
                length_cm: None,
            },
            variations: vec![],
        }
    }

    fn variation(size: &str, color: &str) -> VariationInput {
        VariationInput {
            size: Some(size.to_string()),
            color: Some(color.to_string()),
            stock: 1,
            price_delta: BigDecimal::zero(),
            sku: None,
        }
    }

    #[test]
    fn slugify_folds_accents_and_collapses_separators() {
        assert_eq!(slugify("Calça Jeans  Infantil!"), "calca-jeans-infantil");
        assert_eq!(slugify("  Conjunto -- Verão 2026 "), "conjunto-verao-2026");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn variation_sku_skips_missing_parts() {
        assert_eq!(
            variation_sku("vestido", Some("M"), Some("Azul Bebê")),
            "vestido-m-azul-bebe"
        );
        assert_eq!(variation_sku("vestido", None, Some("Rosa")), "vestido-rosa");
    }

    #[test]
    fn product_input_requires_name_and_non_negative_values() {
        assert!(input().validate().is_ok());

        let mut bad = input();
        bad.name = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.price = BigDecimal::from_str("-1").unwrap();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.stock = -1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn product_input_rejects_duplicate_size_color_pairs() {
        let mut p = input();
        p.variations = vec![variation("M", "Azul"), variation("G", "Azul")];
        assert!(p.validate().is_ok());

        p.variations.push(variation("M", "Azul"));
        assert!(matches!(p.validate(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn review_rating_must_be_in_range() {
        let mut review = ReviewInput {
            user_id: None,
            author_name: "Ana".to_string(),
            rating: 5,
            comment: "Lindo!".to_string(),
        };
        assert!(review.validate().is_ok());
        review.rating = 0;
        assert!(review.validate().is_err());
        review.rating = 6;
        assert!(review.validate().is_err());
    }
}
