use std::collections::HashSet;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use keepsake_core::picker::pick_today;
use keepsake_core::render::{
    RenderContext, render_collage, render_featured_letter, render_list, render_today,
};
use keepsake_types::api::{TodayResponse, TogetherResponse};
use keepsake_types::collection::{Letters, Memories, Reminders, Songs};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    /// How many times "pick another" was pressed.
    #[serde(default)]
    pub offset: u32,
}

pub async fn today(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<TodayResponse>, ApiError> {
    let reminders = state.store.list::<Reminders>().await?;

    let now = Utc::now();
    let day_key = state.clock.day_key(now);
    let text = pick_today(&reminders, &day_key, query.offset).text().to_string();

    Ok(Json(TodayResponse {
        pretty_date: state.clock.pretty_date(now),
        day_key,
        text,
    }))
}

/// The dashboard: today's reminder, the featured letter, a photo collage and
/// the songs list.
pub async fn together(State(state): State<AppState>) -> Result<Json<TogetherResponse>, ApiError> {
    let (reminders, letters, memories, songs) = tokio::try_join!(
        state.store.list::<Reminders>(),
        state.store.list::<Letters>(),
        state.store.list::<Memories>(),
        state.store.list::<Songs>(),
    )?;

    let now = Utc::now();
    let day_key = state.clock.day_key(now);
    let revealed = HashSet::new();
    let ctx = RenderContext { tz: state.clock.tz(), revealed: &revealed };

    Ok(Json(TogetherResponse {
        pretty_date: state.clock.pretty_date(now),
        today: render_today(pick_today(&reminders, &day_key, 0).text()),
        featured_letter: render_featured_letter(&letters),
        collage: render_collage(&memories),
        songs: render_list::<Songs>(&songs, &ctx),
    }))
}
