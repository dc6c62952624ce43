pub mod auth;
pub mod daily;
pub mod entries;
pub mod error;
pub mod middleware;

use std::sync::Arc;

use axum::{
    Router, middleware as layer,
    routing::{delete, get, post},
};

use keepsake_core::clock::DayClock;
use keepsake_core::gate::AccessPolicy;
use keepsake_core::render::Render;
use keepsake_db::{Database, Table};
use keepsake_gateway::store::Store;
use keepsake_types::collection::{HiddenMessages, Letters, Memories, Reminders, Songs};

use crate::middleware::{require_allowed, require_auth};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub store: Store,
    pub policy: Arc<AccessPolicy>,
    pub clock: DayClock,
    pub jwt_secret: String,
}

/// Every REST route. The gateway socket is mounted by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let mut member_routes = Router::new()
        .route("/daily/today", get(daily::today))
        .route("/together", get(daily::together));
    member_routes = collection_routes::<Reminders>(member_routes);
    member_routes = collection_routes::<Letters>(member_routes);
    member_routes = collection_routes::<HiddenMessages>(member_routes);
    member_routes = collection_routes::<Memories>(member_routes);
    member_routes = collection_routes::<Songs>(member_routes);
    let member_routes =
        member_routes.route_layer(layer::from_fn_with_state(state.clone(), require_allowed));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .merge(member_routes)
        .route_layer(layer::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

fn collection_routes<C: Table + Render>(router: Router<AppState>) -> Router<AppState> {
    let base = format!("/{}", C::KIND.path());
    router
        .route(&base, get(entries::list::<C>).post(entries::add::<C>))
        .route(&format!("{}/view", base), get(entries::view::<C>))
        .route(&format!("{}/{{id}}", base), delete(entries::remove::<C>))
}
