use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::{rating, user};

/// Movie fields consumed from TMDB, with placeholders already applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovieMetadata {
    pub movie_id: i32,
    pub title: String,
    pub tagline: String,
    pub genres: Vec<String>,
    pub poster_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieDetails {
    pub movie_id: i32,
    pub title: String,
    pub tagline: String,
    pub genre: Vec<String>,
    pub poster_url: String,
    pub wiki_url: String,
}

impl MovieDetails {
    pub fn new(meta: MovieMetadata, wiki_url: String) -> Self {
        Self {
            movie_id: meta.movie_id,
            title: meta.title,
            tagline: meta.tagline,
            genre: meta.genres,
            poster_url: meta.poster_url,
            wiki_url,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HomeResponse {
    pub movie: MovieDetails,
    pub ratings: Vec<RatingView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RatingView {
    pub id: i32,
    pub user_id: i32,
    pub username: Option<String>,
    pub movie_id: i32,
    pub rating_value: i32,
    pub comment: String,
    pub timestamp: String,
}

impl From<(rating::Model, Option<user::Model>)> for RatingView {
    fn from((rating, user): (rating::Model, Option<user::Model>)) -> Self {
        let timestamp = jiff::Timestamp::from_second(rating.timestamp)
            .map(|ts| ts.to_string())
            .unwrap_or_default();

        Self {
            id: rating.id,
            user_id: rating.user_id,
            username: user.map(|u| u.username),
            movie_id: rating.movie_id,
            rating_value: rating.rating_value,
            comment: rating.comment.unwrap_or_default(),
            timestamp,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        Self { id: user.id, username: user.username }
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingSubmission {
    #[serde(deserialize_with = "int_or_string")]
    pub movie_id: i32,
    #[serde(deserialize_with = "int_or_string")]
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RatingUpdate {
    #[serde(deserialize_with = "int_or_string")]
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Accepts `5` as well as `"5"`; browser form inputs submit numbers as strings.
fn int_or_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i32),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(n) => Ok(n),
        IntOrString::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(serde_json::json!({"movie_id": 808, "rating": 5}), 808, 5)]
    #[case(serde_json::json!({"movie_id": "808", "rating": " 7 "}), 808, 7)]
    #[case(serde_json::json!({"movie_id": 62177, "rating": -3, "comment": "meh"}), 62177, -3)]
    fn accepts_numbers_and_numeric_strings(
        #[case] body: serde_json::Value,
        #[case] movie_id: i32,
        #[case] rating: i32,
    ) {
        let sub: RatingSubmission = serde_json::from_value(body).unwrap();
        assert_eq!(sub.movie_id, movie_id);
        assert_eq!(sub.rating, rating);
    }

    #[rstest]
    #[case(serde_json::json!({"movie_id": 808}))]
    #[case(serde_json::json!({"movie_id": "abc", "rating": 5}))]
    #[case(serde_json::json!({"movie_id": 808, "rating": 4.5}))]
    #[case(serde_json::json!({"movie_id": 808, "rating": null}))]
    fn rejects_missing_or_non_integer_fields(#[case] body: serde_json::Value) {
        assert!(serde_json::from_value::<RatingSubmission>(body).is_err());
    }

    #[test]
    fn rating_view_formats_timestamp_and_owner() {
        let rating = rating::Model {
            id: 1,
            user_id: 2,
            movie_id: 808,
            rating_value: 5,
            comment: None,
            timestamp: 0,
        };
        let user = user::Model { id: 2, username: "alice".into() };

        let view = RatingView::from((rating, Some(user)));
        assert_eq!(view.username.as_deref(), Some("alice"));
        assert_eq!(view.comment, "");
        assert_eq!(view.timestamp, "1970-01-01T00:00:00Z");
    }
}
