use serde::Deserialize;

use crate::{error::AppResult, models::MovieMetadata};

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    image_base_url: String,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        image_base_url: String,
    ) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no TMDB_API_KEY provided, movie lookups will be rejected upstream");
        }

        Self { client, api_key, base_url, image_base_url }
    }

    /// Fetches a movie by TMDB id. A non-success status is `Ok(None)`; transport and
    /// decode failures are errors.
    pub async fn fetch_movie(&self, movie_id: i32) -> AppResult<Option<MovieMetadata>> {
        let url = format!("{}/movie/{}", self.base_url.trim_end_matches('/'), movie_id);

        let resp = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await?;

        if !resp.status().is_success() {
            tracing::warn!(movie_id, status = %resp.status(), "TMDB movie lookup failed");
            return Ok(None);
        }

        let movie: MovieResponse = resp.json().await?;
        Ok(Some(movie.into_metadata(movie_id, &self.image_base_url)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MovieResponse {
    title: Option<String>,
    original_title: Option<String>,
    tagline: Option<String>,
    genres: Option<Vec<Genre>>,
    poster_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Genre {
    name: Option<String>,
}

impl MovieResponse {
    fn into_metadata(self, movie_id: i32, image_base_url: &str) -> MovieMetadata {
        // The original-language title names the film on display and in the wiki lookup.
        let title = [self.original_title, self.title]
            .into_iter()
            .flatten()
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown Title".to_string());

        let mut genres: Vec<String> = self
            .genres
            .into_iter()
            .flatten()
            .filter_map(|g| g.name)
            .filter(|name| !name.trim().is_empty())
            .collect();
        if genres.is_empty() {
            genres.push("Unknown Genre".to_string());
        }

        let poster_url = self
            .poster_path
            .filter(|p| !p.trim().is_empty())
            .map(|p| format!("{}{}", image_base_url.trim_end_matches('/'), p))
            .unwrap_or_default();

        MovieMetadata {
            movie_id,
            title,
            tagline: self.tagline.unwrap_or_default(),
            genres,
            poster_url,
        }
    }
}
