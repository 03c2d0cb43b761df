use actix_web::dev::Server;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionService;
use crate::middleware::{RequestTiming, RequireAuth};
use crate::routes::{create_user, health_check, login, refresh, revoke, update_user};
use crate::storage::AccountRepository;

pub fn run(
    listener: TcpListener,
    accounts: Arc<dyn AccountRepository>,
    sessions: SessionService,
) -> Result<Server, std::io::Error> {
    let accounts = web::Data::from(accounts);
    let sessions_data = web::Data::new(sessions.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestTiming)

            // Shared state
            .app_data(accounts.clone())
            .app_data(sessions_data.clone())

            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))

                    // Protected routes (require an access token). Registered
                    // before the public `/users` route so the PUT guard is
                    // tried first.
                    .service(
                        web::resource("/users")
                            .guard(guard::Put())
                            .wrap(RequireAuth::new(sessions.clone()))
                            .to(update_user),
                    )

                    // Public routes
                    .route("/users", web::post().to(create_user))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
