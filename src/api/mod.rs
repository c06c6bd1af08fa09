pub mod attendance;
pub mod shift;

#[cfg(test)]
pub mod test_support {
    use crate::auth::jwt::issue_token;
    use crate::config::Config;
    use crate::models::TokenType;
    use crate::model::shift::ShiftDefinition;
    use crate::routes;
    use crate::services::{AttendanceService, ShiftCatalog, time_accounting::BreakPolicy};
    use crate::store::{MemoryStore, ShiftStore};
    use crate::utils::clock::ManualClock;
    use actix_web::{
        App,
        body::MessageBody,
        dev::{ServiceFactory, ServiceRequest, ServiceResponse},
        test::TestRequest,
        web::Data,
    };
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use std::net::SocketAddr;
    use std::sync::Arc;

    const SECRET: &str = "test-secret";

    pub fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// Full routing stack over one shared memory store and a manual clock.
    pub struct TestApp {
        pub clock: Arc<ManualClock>,
        pub store: Arc<MemoryStore>,
        config: Config,
    }

    impl TestApp {
        pub fn new(start: NaiveDateTime) -> Self {
            let config = Config::from_lookup(|key| match key {
                "SERVER_ADDR" => Some("127.0.0.1:0".to_string()),
                "JWT_SECRET" => Some(SECRET.to_string()),
                _ => None,
            })
            .unwrap();

            Self {
                clock: Arc::new(ManualClock::new(start)),
                store: Arc::new(MemoryStore::default()),
                config,
            }
        }

        pub fn peer() -> SocketAddr {
            "127.0.0.1:40000".parse().unwrap()
        }

        pub fn app(
            &self,
        ) -> App<
            impl ServiceFactory<
                ServiceRequest,
                Config = (),
                Response = ServiceResponse<impl MessageBody + use<>>,
                Error = actix_web::Error,
                InitError = (),
            > + use<>,
        > {
            let attendance = AttendanceService::new(
                self.store.clone(),
                self.clock.clone(),
                BreakPolicy::default(),
            );
            let shifts = ShiftCatalog::new(self.store.clone());
            let config = self.config.clone();

            App::new()
                .app_data(Data::new(self.config.clone()))
                .app_data(Data::new(attendance))
                .app_data(Data::new(shifts))
                .configure(move |cfg| routes::configure(cfg, config))
        }

        /// Fixed 10:00 to 19:00 with a 30 minute paid allowance, assigned to `employee_id`.
        pub async fn seed_office_shift(&self, employee_id: u64) -> u64 {
            let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
            let shift = self
                .store
                .insert_shift(&ShiftDefinition::fixed("office", t(10), t(19), 30))
                .await
                .unwrap();
            self.store
                .assign_shift(employee_id, Some(shift.id))
                .await
                .unwrap();
            shift.id
        }

        pub fn refresh_token(&self, employee_id: u64) -> String {
            issue_token(3, Some(employee_id), TokenType::Refresh, SECRET)
        }

        /// Attaches a peer address and an access token for `role`.
        pub fn request(&self, req: TestRequest, role: u8, employee_id: Option<u64>) -> TestRequest {
            let token = issue_token(role, employee_id, TokenType::Access, SECRET);
            req.peer_addr(Self::peer())
                .insert_header(("Authorization", format!("Bearer {token}")))
        }

        /// Request made by a plain employee.
        pub fn get(&self, uri: &str, employee_id: u64) -> TestRequest {
            self.request(TestRequest::get().uri(uri), 3, Some(employee_id))
        }

        pub fn post(&self, uri: &str, employee_id: u64) -> TestRequest {
            self.request(TestRequest::post().uri(uri), 3, Some(employee_id))
        }
    }
}
