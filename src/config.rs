use std::net::SocketAddr;

use anyhow::Context;

/// Ten years. Longer lifetimes overflow cookie expiry dates.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

const DEFAULT_MOVIE_IDS: [i32; 10] =
    [1241982, 762509, 402431, 1011985, 748783, 519182, 1022789, 808, 109445, 62177];

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub wiki_api_url: String,
    pub wiki_fallback_url: String,
    pub movie_ids: Vec<i32>,
    pub session_ttl_hours: i64,
    pub session_cookie_secure: bool,
    pub http_timeout_secs: u64,
    pub rating_min: Option<i32>,
    pub rating_max: Option<i32>,
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: "sqlite://movie_explorer.db?mode=rwc".to_string(),
            tmdb_api_key: String::new(),
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_image_base_url: "https://image.tmdb.org/t/p/w500".to_string(),
            wiki_api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            wiki_fallback_url: "https://en.wikipedia.org/wiki/Main_Page".to_string(),
            movie_ids: DEFAULT_MOVIE_IDS.to_vec(),
            session_ttl_hours: 168,
            session_cookie_secure: false,
            http_timeout_secs: 30,
            rating_min: None,
            rating_max: None,
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let tmdb_api_key = std::env::var("TMDB_API_KEY").unwrap_or_default();
        let tmdb_base_url = std::env::var("TMDB_BASE_URL").unwrap_or(defaults.tmdb_base_url);
        let tmdb_image_base_url =
            std::env::var("TMDB_IMAGE_BASE_URL").unwrap_or(defaults.tmdb_image_base_url);

        let wiki_api_url = std::env::var("WIKI_API_URL").unwrap_or(defaults.wiki_api_url);
        let wiki_fallback_url =
            std::env::var("WIKI_FALLBACK_URL").unwrap_or(defaults.wiki_fallback_url);

        let movie_ids = match std::env::var("MOVIE_IDS") {
            Ok(raw) => parse_movie_ids(&raw).context("MOVIE_IDS")?,
            Err(_) => defaults.movie_ids,
        };

        let session_ttl_hours = check_session_ttl(parse_var("SESSION_TTL_HOURS")?.unwrap_or(168))
            .context("SESSION_TTL_HOURS")?;

        let session_cookie_secure: bool = parse_var("SESSION_COOKIE_SECURE")?.unwrap_or(false);
        let http_timeout_secs: u64 = parse_var("HTTP_TIMEOUT_SECS")?.unwrap_or(30);

        let rating_min: Option<i32> = parse_var("RATING_MIN")?;
        let rating_max: Option<i32> = parse_var("RATING_MAX")?;
        if let (Some(min), Some(max)) = (rating_min, rating_max) {
            if min > max {
                anyhow::bail!("RATING_MIN ({min}) is greater than RATING_MAX ({max})");
            }
        }

        let cors_origin = std::env::var("CORS_ORIGIN").ok().filter(|s| !s.trim().is_empty());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_image_base_url,
            wiki_api_url,
            wiki_fallback_url,
            movie_ids,
            session_ttl_hours,
            session_cookie_secure,
            http_timeout_secs,
            rating_min,
            rating_max,
            cors_origin,
        })
    }

    /// Whether `value` falls inside the configured rating bounds. Unset bounds are open.
    pub fn rating_in_range(&self, value: i32) -> bool {
        self.rating_min.is_none_or(|min| value >= min)
            && self.rating_max.is_none_or(|max| value <= max)
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            Ok(Some(raw.trim().parse().with_context(|| name.to_string())?))
        },
        _ => Ok(None),
    }
}

fn check_session_ttl(hours: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        anyhow::bail!(
            "session lifetime must be between 1 and {MAX_SESSION_TTL_HOURS} hours, got {hours}"
        );
    }
    Ok(hours)
}

pub fn parse_movie_ids(raw: &str) -> anyhow::Result<Vec<i32>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().with_context(|| format!("invalid movie id {s:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if ids.is_empty() {
        anyhow::bail!("movie id list is empty");
    }
    Ok(ids)
}
