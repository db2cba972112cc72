use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    slugify, variation_sku, BannerInput, BannerView, CategoryInput, CategoryView, Dimensions,
    ProductFilter, ProductInput, ProductView, ReviewInput, ReviewView, VariationInput,
    VariationView,
};
use crate::domain::errors::DomainError;
use crate::schema::{banners, categories, products, reviews, variations};

use super::models::{
    BannerChanges, BannerRow, CategoryChanges, CategoryRow, NewReviewRow, NewVariationRow,
    ProductChanges, ProductRow, ReviewRow, VariationRow,
};

pub struct DieselCatalogRepository {
    pool: DbPool,
}

// ── Row → view mapping ───────────────────────────────────────────────────────

fn category_view(row: CategoryRow) -> CategoryView {
    CategoryView {
        id: row.id,
        name: row.name,
        slug: row.slug,
        image_url: row.image_url,
    }
}

fn variation_view(row: VariationRow) -> VariationView {
    VariationView {
        id: row.id,
        size: row.size,
        color: row.color,
        stock: row.stock,
        price_delta: row.price_delta,
        sku: row.sku,
    }
}

fn review_view(row: ReviewRow) -> ReviewView {
    ReviewView {
        id: row.id,
        author_name: row.author_name,
        rating: row.rating,
        comment: row.comment,
        created_at: row.created_at,
    }
}

fn banner_view(row: BannerRow) -> BannerView {
    BannerView {
        id: row.id,
        title: row.title,
        image_url: row.image_url,
        link_url: row.link_url,
        position: row.position,
        is_active: row.is_active,
    }
}

/// Attach category, variations and optionally reviews to product rows.
fn load_products(
    conn: &mut PgConnection,
    rows: Vec<ProductRow>,
    with_reviews: bool,
) -> Result<Vec<ProductView>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = rows.iter().filter_map(|p| p.category_id).collect();

    let categories_by_id: HashMap<Uuid, CategoryView> = categories::table
        .filter(categories::id.eq_any(&category_ids))
        .select(CategoryRow::as_select())
        .load(conn)?
        .into_iter()
        .map(|c| (c.id, category_view(c)))
        .collect();

    let mut variations_by_product: HashMap<Uuid, Vec<VariationView>> = HashMap::new();
    for v in variations::table
        .filter(variations::product_id.eq_any(&ids))
        .select(VariationRow::as_select())
        .order((variations::size.asc(), variations::color.asc()))
        .load(conn)?
    {
        variations_by_product
            .entry(v.product_id)
            .or_default()
            .push(variation_view(v));
    }

    let mut reviews_by_product: HashMap<Uuid, Vec<ReviewView>> = HashMap::new();
    if with_reviews {
        for r in reviews::table
            .filter(reviews::product_id.eq_any(&ids))
            .select(ReviewRow::as_select())
            .order(reviews::created_at.desc())
            .load(conn)?
        {
            reviews_by_product
                .entry(r.product_id)
                .or_default()
                .push(review_view(r));
        }
    }

    Ok(rows
        .into_iter()
        .map(|p| ProductView {
            category: p
                .category_id
                .and_then(|id| categories_by_id.get(&id).cloned()),
            variations: variations_by_product.remove(&p.id).unwrap_or_default(),
            reviews: reviews_by_product.remove(&p.id).unwrap_or_default(),
            dimensions: Dimensions {
                weight_kg: p.weight_kg,
                width_cm: p.width_cm,
                height_cm: p.height_cm,
                length_cm: p.length_cm,
            },
            id: p.id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: p.price,
            stock: p.stock,
            images: p.images,
            is_active: p.is_active,
            is_featured: p.is_featured,
            is_bestseller: p.is_bestseller,
        })
        .collect())
}

fn product_changes<'a>(input: &'a ProductInput, slug: &'a str) -> ProductChanges<'a> {
    ProductChanges {
        name: input.name.trim(),
        slug,
        description: input.description.as_deref(),
        price: &input.price,
        stock: input.stock,
        images: &input.images,
        is_active: input.is_active,
        is_featured: input.is_featured,
        is_bestseller: input.is_bestseller,
        category_id: input.category_id,
        weight_kg: input.dimensions.weight_kg.as_ref(),
        width_cm: input.dimensions.width_cm,
        height_cm: input.dimensions.height_cm,
        length_cm: input.dimensions.length_cm,
    }
}

fn insert_variations(
    conn: &mut PgConnection,
    product_id: Uuid,
    slug: &str,
    inputs: &[VariationInput],
) -> Result<(), DomainError> {
    if inputs.is_empty() {
        return Ok(());
    }
    let rows: Vec<NewVariationRow<'_>> = inputs
        .iter()
        .map(|v| NewVariationRow {
            id: Uuid::new_v4(),
            product_id,
            size: v.size.as_deref(),
            color: v.color.as_deref(),
            stock: v.stock,
            price_delta: &v.price_delta,
            sku: v
                .sku
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| variation_sku(slug, v.size.as_deref(), v.color.as_deref())),
        })
        .collect();
    diesel::insert_into(variations::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

fn slug_for(name: &str) -> Result<String, DomainError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(DomainError::InvalidInput(format!(
            "cannot derive a slug from '{name}'"
        )));
    }
    Ok(slug)
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // ── Products ─────────────────────────────────────────────────────────────

    pub fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = products::table
            .select(ProductRow::as_select())
            .order(products::created_at.desc())
            .into_boxed();
        if !filter.include_inactive {
            query = query.filter(products::is_active.eq(true));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            query = query.filter(products::name.ilike(format!("%{escaped}%")));
        }
        if let Some(slug) = &filter.category_slug {
            query = query.filter(
                products::category_id.eq_any(
                    categories::table
                        .filter(categories::slug.eq(slug.clone()))
                        .select(categories::id.nullable()),
                ),
            );
        }
        if let Some(featured) = filter.featured {
            query = query.filter(products::is_featured.eq(featured));
        }
        if let Some(bestseller) = filter.bestseller {
            query = query.filter(products::is_bestseller.eq(bestseller));
        }

        let rows = query.load(&mut conn)?;
        load_products(&mut conn, rows, false)
    }

    pub fn get_by_slug(
        &self,
        slug: &str,
        include_inactive: bool,
    ) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = products::table
            .filter(products::slug.eq(slug))
            .select(ProductRow::as_select())
            .into_boxed();
        if !include_inactive {
            query = query.filter(products::is_active.eq(true));
        }
        let Some(row) = query.first(&mut conn).optional()? else {
            return Ok(None);
        };
        Ok(load_products(&mut conn, vec![row], true)?.pop())
    }

    pub fn get_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        let Some(row) = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };
        Ok(load_products(&mut conn, vec![row], true)?.pop())
    }

    pub fn create_product(&self, input: &ProductInput) -> Result<ProductView, DomainError> {
        input.validate()?;
        let slug = slug_for(&input.name)?;
        let mut conn = self.pool.get()?;

        let id = Uuid::new_v4();
        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(products::table)
                .values((products::id.eq(id), &product_changes(input, &slug)))
                .execute(conn)?;
            insert_variations(conn, id, &slug, &input.variations)
        })?;
        log::info!("Product {} created ({})", id, slug);

        drop(conn);
        self.get_product(id)?
            .ok_or_else(|| DomainError::Internal(format!("product {id} vanished after insert")))
    }

    /// Overwrite a product and replace its variation set.
    pub fn update_product(
        &self,
        id: Uuid,
        input: &ProductInput,
    ) -> Result<Option<ProductView>, DomainError> {
        input.validate()?;
        let slug = slug_for(&input.name)?;
        let mut conn = self.pool.get()?;

        let updated = conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(products::table.find(id))
                .set((
                    &product_changes(input, &slug),
                    products::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Ok(false);
            }
            diesel::delete(variations::table.filter(variations::product_id.eq(id)))
                .execute(conn)?;
            insert_variations(conn, id, &slug, &input.variations)?;
            Ok(true)
        })?;
        if !updated {
            return Ok(None);
        }

        drop(conn);
        self.get_product(id)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    // ── Reviews ──────────────────────────────────────────────────────────────

    pub fn add_review(
        &self,
        product_id: Uuid,
        input: &ReviewInput,
    ) -> Result<ReviewView, DomainError> {
        input.validate()?;
        let mut conn = self.pool.get()?;

        let exists: i64 = products::table
            .filter(products::id.eq(product_id))
            .count()
            .get_result(&mut conn)?;
        if exists == 0 {
            return Err(DomainError::NotFound(format!("Product {product_id}")));
        }

        let row = diesel::insert_into(reviews::table)
            .values(&NewReviewRow {
                id: Uuid::new_v4(),
                product_id,
                user_id: input.user_id,
                author_name: input.author_name.trim(),
                rating: input.rating,
                comment: input.comment.trim(),
            })
            .returning(ReviewRow::as_returning())
            .get_result(&mut conn)?;
        Ok(review_view(row))
    }

    // ── Categories ───────────────────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(categories::table
            .select(CategoryRow::as_select())
            .order(categories::name.asc())
            .load(&mut conn)?
            .into_iter()
            .map(category_view)
            .collect())
    }

    pub fn create_category(&self, input: &CategoryInput) -> Result<CategoryView, DomainError> {
        let slug = slug_for(&input.name)?;
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(categories::table)
            .values((
                categories::id.eq(Uuid::new_v4()),
                &CategoryChanges {
                    name: input.name.trim(),
                    slug: &slug,
                    image_url: input.image_url.as_deref(),
                },
            ))
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(category_view(row))
    }

    pub fn update_category(
        &self,
        id: Uuid,
        input: &CategoryInput,
    ) -> Result<Option<CategoryView>, DomainError> {
        let slug = slug_for(&input.name)?;
        let mut conn = self.pool.get()?;

        Ok(diesel::update(categories::table.find(id))
            .set(&CategoryChanges {
                name: input.name.trim(),
                slug: &slug,
                image_url: input.image_url.as_deref(),
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(category_view))
    }

    pub fn delete_category(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(categories::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    // ── Banners ──────────────────────────────────────────────────────────────

    pub fn list_banners(&self, active_only: bool) -> Result<Vec<BannerView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = banners::table
            .select(BannerRow::as_select())
            .order((banners::position.asc(), banners::created_at.asc()))
            .into_boxed();
        if active_only {
            query = query.filter(banners::is_active.eq(true));
        }
        Ok(query
            .load(&mut conn)?
            .into_iter()
            .map(banner_view)
            .collect())
    }

    pub fn create_banner(&self, input: &BannerInput) -> Result<BannerView, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(banners::table)
            .values((banners::id.eq(Uuid::new_v4()), &banner_changes(input)))
            .returning(BannerRow::as_returning())
            .get_result(&mut conn)?;
        Ok(banner_view(row))
    }

    pub fn update_banner(
        &self,
        id: Uuid,
        input: &BannerInput,
    ) -> Result<Option<BannerView>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(banners::table.find(id))
            .set(&banner_changes(input))
            .returning(BannerRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(banner_view))
    }

    pub fn delete_banner(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(banners::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

fn banner_changes(input: &BannerInput) -> BannerChanges<'_> {
    BannerChanges {
        title: input.title.trim(),
        image_url: input.image_url.trim(),
        link_url: input.link_url.as_deref(),
        position: input.position,
        is_active: input.is_active,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::infrastructure::test_db::setup_db;

    fn product(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: Some("Algodão orgânico".to_string()),
            price: BigDecimal::from_str("89.90").unwrap(),
            stock: 10,
            images: vec!["https://cdn.example.com/1.jpg".to_string()],
            is_active: true,
            is_featured: false,
            is_bestseller: false,
            category_id: None,
            dimensions: Dimensions {
                weight_kg: Some(BigDecimal::from_str("0.250").unwrap()),
                width_cm: Some(20),
                height_cm: Some(3),
                length_cm: Some(25),
            },
            variations: vec![
                VariationInput {
                    size: Some("M".to_string()),
                    color: Some("Azul".to_string()),
                    stock: 4,
                    price_delta: BigDecimal::from(0),
                    sku: None,
                },
                VariationInput {
                    size: Some("G".to_string()),
                    color: Some("Azul".to_string()),
                    stock: 6,
                    price_delta: BigDecimal::from(5),
                    sku: Some("VF-G-AZ".to_string()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn create_product_generates_slug_and_skus() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);

        let created = repo.create_product(&product("Vestido Floral")).unwrap();

        assert_eq!(created.slug, "vestido-floral");
        assert_eq!(created.images.len(), 1);
        let skus: Vec<&str> = created.variations.iter().map(|v| v.sku.as_str()).collect();
        assert!(skus.contains(&"vestido-floral-m-azul"));
        assert!(skus.contains(&"VF-G-AZ"));

        let by_slug = repo.get_by_slug("vestido-floral", false).unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let mut first = product("Vestido Floral");
        first.variations.clear();
        repo.create_product(&first).unwrap();

        let err = repo.create_product(&first).unwrap_err();

        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_replaces_variations() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let created = repo.create_product(&product("Body Liso")).unwrap();

        let mut changed = product("Body Liso");
        changed.variations.truncate(1);
        changed.price = BigDecimal::from_str("59.90").unwrap();
        let updated = repo.update_product(created.id, &changed).unwrap().unwrap();

        assert_eq!(updated.variations.len(), 1);
        assert_eq!(updated.price, BigDecimal::from_str("59.90").unwrap());
        assert!(repo.update_product(Uuid::new_v4(), &changed).unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_search_category_and_flags() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let meninas = repo
            .create_category(&CategoryInput {
                name: "Meninas".to_string(),
                image_url: None,
            })
            .unwrap();
        let mut vestido = product("Vestido Floral");
        vestido.category_id = Some(meninas.id);
        vestido.is_featured = true;
        repo.create_product(&vestido).unwrap();
        let mut hidden = product("Vestido Antigo");
        hidden.is_active = false;
        hidden.variations.clear();
        repo.create_product(&hidden).unwrap();
        let mut bermuda = product("Bermuda");
        bermuda.variations.clear();
        repo.create_product(&bermuda).unwrap();

        let search = ProductFilter {
            search: Some("vestido".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(repo.list_products(&search).unwrap().len(), 1);

        let by_category = ProductFilter {
            category_slug: Some("meninas".to_string()),
            ..ProductFilter::default()
        };
        let found = repo.list_products(&by_category).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category.as_ref().unwrap().slug, "meninas");

        let featured = ProductFilter {
            featured: Some(true),
            ..ProductFilter::default()
        };
        assert_eq!(repo.list_products(&featured).unwrap().len(), 1);

        let everything = ProductFilter {
            include_inactive: true,
            ..ProductFilter::default()
        };
        assert_eq!(repo.list_products(&everything).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reviews_attach_to_existing_products_only() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let created = repo.create_product(&product("Macacão")).unwrap();
        let review = ReviewInput {
            user_id: None,
            author_name: "Ana".to_string(),
            rating: 5,
            comment: "Tecido ótimo".to_string(),
        };

        repo.add_review(created.id, &review).unwrap();
        let err = repo.add_review(Uuid::new_v4(), &review).unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
        let loaded = repo.get_by_slug("macacao", false).unwrap().unwrap();
        assert_eq!(loaded.reviews.len(), 1);
        assert_eq!(loaded.reviews[0].rating, 5);
    }

    #[tokio::test]
    async fn banners_list_active_by_position() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        for (title, position, active) in [("Verão", 2, true), ("Inverno", 1, true), ("Old", 0, false)]
        {
            repo.create_banner(&BannerInput {
                title: title.to_string(),
                image_url: format!("https://cdn.example.com/{position}.jpg"),
                link_url: None,
                position,
                is_active: active,
            })
            .unwrap();
        }

        let active = repo.list_banners(true).unwrap();
        let titles: Vec<&str> = active.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Inverno", "Verão"]);
        assert_eq!(repo.list_banners(false).unwrap().len(), 3);
    }
}
