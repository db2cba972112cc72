use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AdminUser, CurrentUser};
use crate::domain::catalog::{
    BannerInput, BannerView, CategoryInput, CategoryView, Dimensions, ProductFilter, ProductInput,
    ProductView, ReviewInput, ReviewView, VariationInput, VariationView,
};
use crate::errors::AppError;
use crate::infrastructure::catalog_repo::DieselCatalogRepository;

pub type Catalog = web::Data<DieselCatalogRepository>;

fn money(value: &BigDecimal) -> String {
    value.with_scale(2).to_string()
}

fn parse_money(field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("{field} must be a decimal, got '{raw}'")))
}

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
}

impl From<CategoryView> for CategoryResponse {
    fn from(c: CategoryView) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            image_url: c.image_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariationResponse {
    pub id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub stock: i32,
    pub price_delta: String,
    pub sku: String,
}

impl From<VariationView> for VariationResponse {
    fn from(v: VariationView) -> Self {
        Self {
            id: v.id,
            size: v.size,
            color: v.color,
            stock: v.stock,
            price_delta: money(&v.price_delta),
            sku: v.sku,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub author_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: String,
}

impl From<ReviewView> for ReviewResponse {
    fn from(r: ReviewView) -> Self {
        Self {
            id: r.id,
            author_name: r.author_name,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: String,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_bestseller: bool,
    pub category: Option<CategoryResponse>,
    pub weight_kg: Option<String>,
    pub width_cm: Option<i32>,
    pub height_cm: Option<i32>,
    pub length_cm: Option<i32>,
    pub variations: Vec<VariationResponse>,
    /// Only filled on single-product reads.
    pub reviews: Vec<ReviewResponse>,
}

impl From<ProductView> for ProductResponse {
    fn from(p: ProductView) -> Self {
        Self {
            id: p.id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: money(&p.price),
            stock: p.stock,
            images: p.images,
            is_active: p.is_active,
            is_featured: p.is_featured,
            is_bestseller: p.is_bestseller,
            category: p.category.map(CategoryResponse::from),
            weight_kg: p.dimensions.weight_kg.as_ref().map(|w| w.to_string()),
            width_cm: p.dimensions.width_cm,
            height_cm: p.dimensions.height_cm,
            length_cm: p.dimensions.length_cm,
            variations: p.variations.into_iter().map(VariationResponse::from).collect(),
            reviews: p.reviews.into_iter().map(ReviewResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BannerResponse {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

impl From<BannerView> for BannerResponse {
    fn from(b: BannerView) -> Self {
        Self {
            id: b.id,
            title: b.title,
            image_url: b.image_url,
            link_url: b.link_url,
            position: b.position,
            is_active: b.is_active,
        }
    }
}

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub bestseller: Option<bool>,
}

impl ProductQuery {
    fn into_filter(self, include_inactive: bool) -> ProductFilter {
        ProductFilter {
            search: self.q.filter(|q| !q.trim().is_empty()),
            category_slug: self.category.filter(|c| !c.trim().is_empty()),
            featured: self.featured,
            bestseller: self.bestseller,
            include_inactive,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VariationRequest {
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub stock: i32,
    /// Added to the product price, e.g. "5.00"
    pub price_delta: Option<String>,
    /// Generated from the product slug, size and color when absent.
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    pub category_id: Option<Uuid>,
    pub weight_kg: Option<String>,
    pub width_cm: Option<i32>,
    pub height_cm: Option<i32>,
    pub length_cm: Option<i32>,
    #[serde(default)]
    pub variations: Vec<VariationRequest>,
}

fn default_true() -> bool {
    true
}

impl ProductRequest {
    fn into_input(self) -> Result<ProductInput, AppError> {
        let variations = self
            .variations
            .into_iter()
            .map(|v| {
                Ok(VariationInput {
                    size: v.size.filter(|s| !s.trim().is_empty()),
                    color: v.color.filter(|c| !c.trim().is_empty()),
                    stock: v.stock,
                    price_delta: match v.price_delta.as_deref() {
                        Some(raw) => parse_money("price_delta", raw)?,
                        None => BigDecimal::from(0),
                    },
                    sku: v.sku.filter(|s| !s.trim().is_empty()),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(ProductInput {
            price: parse_money("price", &self.price)?,
            dimensions: Dimensions {
                weight_kg: self
                    .weight_kg
                    .as_deref()
                    .map(|w| parse_money("weight_kg", w))
                    .transpose()?,
                width_cm: self.width_cm,
                height_cm: self.height_cm,
                length_cm: self.length_cm,
            },
            name: self.name,
            description: self.description,
            stock: self.stock,
            images: self.images,
            is_active: self.is_active,
            is_featured: self.is_featured,
            is_bestseller: self.is_bestseller,
            category_id: self.category_id,
            variations,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    pub image_url: Option<String>,
}

impl From<CategoryRequest> for CategoryInput {
    fn from(c: CategoryRequest) -> Self {
        Self {
            name: c.name,
            image_url: c.image_url,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BannerRequest {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<BannerRequest> for BannerInput {
    fn from(b: BannerRequest) -> Self {
        Self {
            title: b.title,
            image_url: b.image_url,
            link_url: b.link_url,
            position: b.position,
            is_active: b.is_active,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// 1 to 5
    pub rating: i32,
    pub comment: String,
    /// Display name; defaults to the account name.
    pub author_name: Option<String>,
}

// ── Public reads ─────────────────────────────────────────────────────────────

/// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("q" = Option<String>, Query, description = "Substring of the product name"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("featured" = Option<bool>, Query, description = "Only featured products"),
        ("bestseller" = Option<bool>, Query, description = "Only bestsellers"),
    ),
    responses((status = 200, description = "Active products", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn list_products(
    catalog: Catalog,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter(false);

    let products = web::block(move || catalog.list_products(&filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        products
            .into_iter()
            .map(ProductResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/products/{slug}
#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product with variations and reviews", body = ProductResponse),
        (status = 404, description = "No active product with this slug"),
    ),
    tag = "catalog"
)]
pub async fn get_product(catalog: Catalog, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let not_found = AppError::NotFound(format!("Product {slug}"));

    let product = web::block(move || catalog.get_by_slug(&slug, false))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or(not_found)?;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = [CategoryResponse])),
    tag = "catalog"
)]
pub async fn list_categories(catalog: Catalog) -> Result<HttpResponse, AppError> {
    let categories = web::block(move || catalog.list_categories())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        categories
            .into_iter()
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/banners
#[utoipa::path(
    get,
    path = "/api/banners",
    responses((status = 200, description = "Active banners by position", body = [BannerResponse])),
    tag = "catalog"
)]
pub async fn list_banners(catalog: Catalog) -> Result<HttpResponse, AppError> {
    banners(catalog, true).await
}

async fn banners(catalog: Catalog, active_only: bool) -> Result<HttpResponse, AppError> {
    let banners = web::block(move || catalog.list_banners(active_only))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        banners
            .into_iter()
            .map(BannerResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/products/{id}/reviews
#[utoipa::path(
    post,
    path = "/api/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Review stored", body = ReviewResponse),
        (status = 400, description = "Rating outside 1..5 or empty comment"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn add_review(
    user: CurrentUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();
    let input = ReviewInput {
        user_id: Some(user.0.id),
        author_name: body
            .author_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(user.0.name),
        rating: body.rating,
        comment: body.comment,
    };

    let review = web::block(move || catalog.add_review(product_id, &input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ReviewResponse::from(review)))
}

// ── Admin: products ──────────────────────────────────────────────────────────

/// GET /api/admin/products
#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(
        ("q" = Option<String>, Query, description = "Substring of the product name"),
        ("category" = Option<String>, Query, description = "Category slug"),
    ),
    responses((status = 200, description = "All products, inactive included", body = [ProductResponse])),
    tag = "admin-catalog"
)]
pub async fn admin_list_products(
    _admin: AdminUser,
    catalog: Catalog,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter(true);

    let products = web::block(move || catalog.list_products(&filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        products
            .into_iter()
            .map(ProductResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/admin/products/{id}
#[utoipa::path(
    get,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "admin-catalog"
)]
pub async fn admin_get_product(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let product = web::block(move || catalog.get_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /api/admin/products
#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 409, description = "Slug or SKU already in use"),
    ),
    tag = "admin-catalog"
)]
pub async fn create_product(
    _admin: AdminUser,
    catalog: Catalog,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;

    let product = web::block(move || catalog.create_product(&input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PUT /api/admin/products/{id}
///
/// Replaces the product, variations included.
#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Slug or SKU already in use"),
    ),
    tag = "admin-catalog"
)]
pub async fn update_product(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = body.into_inner().into_input()?;

    let product = web::block(move || catalog.update_product(id, &input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /api/admin/products/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
    ),
    tag = "admin-catalog"
)]
pub async fn delete_product(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let deleted = web::block(move || catalog.delete_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    if !deleted {
        return Err(AppError::NotFound(format!("Product {id}")));
    }

    log::info!("Product {} deleted", id);
    Ok(HttpResponse::NoContent().finish())
}

// ── Admin: categories ────────────────────────────────────────────────────────

/// POST /api/admin/categories
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Slug already in use"),
    ),
    tag = "admin-catalog"
)]
pub async fn create_category(
    _admin: AdminUser,
    catalog: Catalog,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let input = CategoryInput::from(body.into_inner());

    let category = web::block(move || catalog.create_category(&input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

/// PUT /api/admin/categories/{id}
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    tag = "admin-catalog"
)]
pub async fn update_category(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = CategoryInput::from(body.into_inner());

    let category = web::block(move || catalog.update_category(id, &input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or_else(|| AppError::NotFound(format!("Category {id}")))?;

    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

/// DELETE /api/admin/categories/{id}
///
/// Products in the category stay, uncategorised.
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
    ),
    tag = "admin-catalog"
)]
pub async fn delete_category(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let deleted = web::block(move || catalog.delete_category(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    if !deleted {
        return Err(AppError::NotFound(format!("Category {id}")));
    }
    Ok(HttpResponse::NoContent().finish())
}

// ── Admin: banners ───────────────────────────────────────────────────────────

/// GET /api/admin/banners
#[utoipa::path(
    get,
    path = "/api/admin/banners",
    responses((status = 200, description = "All banners by position", body = [BannerResponse])),
    tag = "admin-catalog"
)]
pub async fn admin_list_banners(_admin: AdminUser, catalog: Catalog) -> Result<HttpResponse, AppError> {
    banners(catalog, false).await
}

/// POST /api/admin/banners
#[utoipa::path(
    post,
    path = "/api/admin/banners",
    request_body = BannerRequest,
    responses((status = 201, description = "Banner created", body = BannerResponse)),
    tag = "admin-catalog"
)]
pub async fn create_banner(
    _admin: AdminUser,
    catalog: Catalog,
    body: web::Json<BannerRequest>,
) -> Result<HttpResponse, AppError> {
    let input = BannerInput::from(body.into_inner());

    let banner = web::block(move || catalog.create_banner(&input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(BannerResponse::from(banner)))
}

/// PUT /api/admin/banners/{id}
#[utoipa::path(
    put,
    path = "/api/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner UUID")),
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Banner updated", body = BannerResponse),
        (status = 404, description = "Banner not found"),
    ),
    tag = "admin-catalog"
)]
pub async fn update_banner(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
    body: web::Json<BannerRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = BannerInput::from(body.into_inner());

    let banner = web::block(move || catalog.update_banner(id, &input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or_else(|| AppError::NotFound(format!("Banner {id}")))?;

    Ok(HttpResponse::Ok().json(BannerResponse::from(banner)))
}

/// DELETE /api/admin/banners/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner UUID")),
    responses(
        (status = 204, description = "Banner deleted"),
        (status = 404, description = "Banner not found"),
    ),
    tag = "admin-catalog"
)]
pub async fn delete_banner(
    _admin: AdminUser,
    catalog: Catalog,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let deleted = web::block(move || catalog.delete_banner(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    if !deleted {
        return Err(AppError::NotFound(format!("Banner {id}")));
    }
    Ok(HttpResponse::NoContent().finish())
}
