pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::order_service::OrderService;
use crate::application::settlement::SettlementService;
use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::ApiDoc;
use crate::infrastructure::catalog_repo::DieselCatalogRepository;
use crate::infrastructure::contact_repo::DieselContactRepository;
use crate::infrastructure::mailer::Mailer;
use crate::infrastructure::melhor_envio::MelhorEnvioClient;
use crate::infrastructure::mercadopago::MercadoPagoClient;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::stripe::StripeClient;
use crate::infrastructure::user_repo::DieselUserRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type MigrationError = Box<dyn std::error::Error + Send + Sync>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), MigrationError> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        log::info!("Applied migration {}", version);
    }
    Ok(())
}

/// Everything the handlers pull out of app data. Integrations without
/// configuration are left out, and their handlers answer `*_not_configured`.
#[derive(Clone)]
pub struct AppState {
    config: web::Data<Config>,
    settlements: web::Data<SettlementService<DieselOrderRepository>>,
    orders: web::Data<OrderService<DieselOrderRepository>>,
    catalog: web::Data<DieselCatalogRepository>,
    users: web::Data<DieselUserRepository>,
    contacts: web::Data<DieselContactRepository>,
    mailer: web::Data<Mailer>,
    stripe: Option<web::Data<StripeClient>>,
    mercadopago: Option<web::Data<MercadoPagoClient>>,
    shipping: Option<web::Data<MelhorEnvioClient>>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> io::Result<Self> {
        let mailer = match &config.email {
            Some(email) => Mailer::new(email)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
            None => {
                log::warn!("SMTP not configured; order e-mails are disabled");
                Mailer::disabled()
            }
        };
        if config.stripe.is_none() {
            log::warn!("Stripe not configured");
        }
        if config.mercadopago.is_none() {
            log::warn!("Mercado Pago not configured");
        }
        if config.shipping.is_none() {
            log::warn!("Melhor Envio not configured; shipping quotes are disabled");
        }

        Ok(Self {
            stripe: config.stripe.as_ref().map(|c| web::Data::new(StripeClient::new(c))),
            mercadopago: config
                .mercadopago
                .as_ref()
                .map(|c| web::Data::new(MercadoPagoClient::new(c))),
            shipping: config
                .shipping
                .as_ref()
                .map(|c| web::Data::new(MelhorEnvioClient::new(c))),
            settlements: web::Data::new(SettlementService::new(DieselOrderRepository::new(
                pool.clone(),
            ))),
            orders: web::Data::new(OrderService::new(DieselOrderRepository::new(pool.clone()))),
            catalog: web::Data::new(DieselCatalogRepository::new(pool.clone())),
            users: web::Data::new(DieselUserRepository::new(pool.clone())),
            contacts: web::Data::new(DieselContactRepository::new(pool)),
            mailer: web::Data::new(mailer),
            config: web::Data::new(config),
        })
    }

    /// Register app data and every `/api` route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.settlements.clone())
            .app_data(self.orders.clone())
            .app_data(self.catalog.clone())
            .app_data(self.users.clone())
            .app_data(self.contacts.clone())
            .app_data(self.mailer.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::BadRequest(err.to_string()).into()
            }));
        if let Some(stripe) = &self.stripe {
            cfg.app_data(stripe.clone());
        }
        if let Some(mercadopago) = &self.mercadopago {
            cfg.app_data(mercadopago.clone());
        }
        if let Some(shipping) = &self.shipping {
            cfg.app_data(shipping.clone());
        }
        cfg.service(api_scope());
    }
}

fn api_scope() -> actix_web::Scope {
    use handlers::{auth, catalog, checkout, contact, orders, shipping, webhooks};

    web::scope("/api")
        .service(
            web::scope("/webhooks")
                .route("/stripe", web::post().to(webhooks::stripe_webhook))
                .route("/mercadopago", web::post().to(webhooks::mercadopago_webhook)),
        )
        .route("/checkout", web::post().to(checkout::create_checkout))
        .route("/shipping/quote", web::post().to(shipping::quote_shipping))
        .service(
            web::scope("/orders")
                .route("/mine", web::get().to(orders::my_orders))
                .route("/check/{session_id}", web::get().to(orders::check_order)),
        )
        .service(
            web::scope("/products")
                .route("", web::get().to(catalog::list_products))
                .route("/{slug}", web::get().to(catalog::get_product))
                .route("/{id}/reviews", web::post().to(catalog::add_review)),
        )
        .route("/categories", web::get().to(catalog::list_categories))
        .route("/banners", web::get().to(catalog::list_banners))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/logout", web::post().to(auth::logout))
                .route("/me", web::get().to(auth::me)),
        )
        .route("/newsletter", web::post().to(contact::subscribe))
        .route("/contact", web::post().to(contact::send_message))
        .service(
            web::scope("/admin")
                .service(
                    web::scope("/orders")
                        .route("", web::get().to(orders::list_orders))
                        .route("/{id}", web::get().to(orders::get_order))
                        .route("/{id}", web::patch().to(orders::update_order)),
                )
                .service(
                    web::scope("/products")
                        .route("", web::get().to(catalog::admin_list_products))
                        .route("", web::post().to(catalog::create_product))
                        .route("/{id}", web::get().to(catalog::admin_get_product))
                        .route("/{id}", web::put().to(catalog::update_product))
                        .route("/{id}", web::delete().to(catalog::delete_product)),
                )
                .service(
                    web::scope("/categories")
                        .route("", web::post().to(catalog::create_category))
                        .route("/{id}", web::put().to(catalog::update_category))
                        .route("/{id}", web::delete().to(catalog::delete_category)),
                )
                .service(
                    web::scope("/banners")
                        .route("", web::get().to(catalog::admin_list_banners))
                        .route("", web::post().to(catalog::create_banner))
                        .route("/{id}", web::put().to(catalog::update_banner))
                        .route("/{id}", web::delete().to(catalog::delete_banner)),
                )
                .route(
                    "/newsletter/export",
                    web::get().to(contact::export_subscribers),
                )
                .route("/messages", web::get().to(contact::list_messages)),
        )
}

/// Build and return an actix-web `Server` bound to the configured address.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(pool: DbPool, config: Config) -> io::Result<actix_web::dev::Server> {
    let bind = (config.host.clone(), config.port);
    let state = AppState::new(pool, config)?;

    Ok(HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(bind)?
    .run())
}
