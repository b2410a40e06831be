use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set, SqlErr,
    sea_query::{Expr, OnConflict},
};

use crate::{
    entities::{rating, user},
    error::{AppError, AppResult},
};

/// A rating row joined with its owner, when the owner row still exists.
pub type RatingWithUser = (rating::Model, Option<user::Model>);

/// Persistence for users and their ratings.
#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_user(&self, username: &str) -> AppResult<user::Model> {
        let model = user::ActiveModel { id: NotSet, username: Set(username.to_string()) };

        match model.insert(&self.db).await {
            Ok(user) => Ok(user),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AppError::bad_input("Username already exists"))
            },
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_user(&self, id: i32) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_user_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(user)
    }

    /// Inserts or updates the rating for `(user_id, movie_id)` in one statement.
    ///
    /// Returns the stored row and whether it was newly created. The unique index on
    /// `(user_id, movie_id)` keeps concurrent submissions to a single row; only the
    /// value and comment are overwritten, so `timestamp` keeps its first-write value.
    pub async fn upsert_rating(
        &self,
        user_id: i32,
        movie_id: i32,
        rating_value: i32,
        comment: String,
    ) -> AppResult<(RatingWithUser, bool)> {
        let existed = self.find_user_rating(user_id, movie_id).await?.is_some();

        let model = rating::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            rating_value: Set(rating_value),
            comment: Set(Some(comment)),
            timestamp: Set(now_sec()),
        };

        rating::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([rating::Column::UserId, rating::Column::MovieId])
                    .update_columns([rating::Column::RatingValue, rating::Column::Comment])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let stored = self.find_user_rating(user_id, movie_id).await?.ok_or_else(|| {
            anyhow::anyhow!("rating for user {user_id} movie {movie_id} missing after upsert")
        })?;

        Ok((stored, !existed))
    }

    /// Updates a rating owned by `user_id`. `comment: None` keeps the stored comment.
    pub async fn update_rating(
        &self,
        user_id: i32,
        rating_id: i32,
        rating_value: i32,
        comment: Option<String>,
    ) -> AppResult<RatingWithUser> {
        let mut update = rating::Entity::update_many()
            .col_expr(rating::Column::RatingValue, Expr::value(rating_value))
            .filter(rating::Column::Id.eq(rating_id))
            .filter(rating::Column::UserId.eq(user_id));
        if let Some(comment) = comment {
            update = update.col_expr(rating::Column::Comment, Expr::value(comment));
        }

        let result = update.exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFoundOrNotOwned);
        }

        self.find_rating(rating_id).await?.ok_or(AppError::NotFoundOrNotOwned)
    }

    pub async fn delete_rating(&self, user_id: i32, rating_id: i32) -> AppResult<()> {
        let result = rating::Entity::delete_many()
            .filter(rating::Column::Id.eq(rating_id))
            .filter(rating::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFoundOrNotOwned);
        }
        Ok(())
    }

    pub async fn find_rating(&self, rating_id: i32) -> AppResult<Option<RatingWithUser>> {
        let row = rating::Entity::find_by_id(rating_id)
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;
        Ok(row)
    }

    pub async fn ratings_for_movie(&self, movie_id: i32) -> AppResult<Vec<RatingWithUser>> {
        let rows = rating::Entity::find()
            .filter(rating::Column::MovieId.eq(movie_id))
            .find_also_related(user::Entity)
            .order_by_asc(rating::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn all_ratings(&self) -> AppResult<Vec<RatingWithUser>> {
        let rows = rating::Entity::find()
            .find_also_related(user::Entity)
            .order_by_asc(rating::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find_user_rating(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> AppResult<Option<RatingWithUser>> {
        let row = rating::Entity::find()
            .filter(rating::Column::UserId.eq(user_id))
            .filter(rating::Column::MovieId.eq(movie_id))
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;
        Ok(row)
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
