use crate::{
    api::{attendance, shift},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / requests_per_min as u64).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            // both values are non-zero above
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Every route needs an access token
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    .service(web::resource("/clock-in").route(web::post().to(attendance::clock_in)))
                    .service(
                        web::resource("/clock-out").route(web::post().to(attendance::clock_out)),
                    )
                    .service(
                        web::resource("/break/start")
                            .route(web::post().to(attendance::start_break)),
                    )
                    .service(
                        web::resource("/break/end").route(web::post().to(attendance::end_break)),
                    )
                    .service(web::resource("/status").route(web::get().to(attendance::my_status)))
                    // /attendance/employee/{employee_id}?date=YYYY-MM-DD
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(attendance::employee_status)),
                    ),
            )
            .service(
                web::scope("/shift")
                    // /shift
                    .service(
                        web::resource("")
                            .route(web::get().to(shift::list_shifts))
                            .route(web::post().to(shift::create_shift)),
                    )
                    // /shift/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(shift::get_shift))
                            .route(web::put().to(shift::update_shift))
                            .route(web::delete().to(shift::delete_shift)),
                    ),
            )
            .service(
                web::resource("/employee/{employee_id}/shift")
                    .route(web::put().to(shift::assign_shift)),
            ),
    );
}
