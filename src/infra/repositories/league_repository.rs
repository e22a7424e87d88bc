//! Players, teams and matches.

use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use std::collections::HashMap;
use uuid::Uuid;

use super::entities::game::Entity as MatchEntity;
use super::entities::player::{self, ActiveModel as PlayerActiveModel, Entity as PlayerEntity};
use super::entities::player_team::{self, Entity as PlayerTeamEntity};
use super::entities::team::{self, Entity as TeamEntity};
use crate::domain::{Match, Player, Team};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read access to the league structure plus roster changes made by drafts.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LeagueRepository: Send + Sync {
    async fn find_player(&self, id: Uuid) -> AppResult<Option<Player>>;

    /// Player profile linked to a user account.
    async fn find_player_by_user(&self, user_id: Uuid) -> AppResult<Option<Player>>;

    async fn find_players(&self, ids: Vec<Uuid>) -> AppResult<Vec<Player>>;

    async fn find_team(&self, id: Uuid) -> AppResult<Option<Team>>;

    async fn find_teams(&self, ids: Vec<Uuid>) -> AppResult<Vec<Team>>;

    async fn find_match(&self, id: Uuid) -> AppResult<Option<Match>>;

    /// Put the player on `team_id` and make it their primary team.
    async fn set_primary_team(&self, player_id: Uuid, team_id: Uuid) -> AppResult<Player>;
}

/// Concrete implementation of LeagueRepository
pub struct LeagueStore {
    db: DatabaseConnection,
}

impl LeagueStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn hydrate(&self, models: Vec<player::Model>) -> AppResult<Vec<Player>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

        let mut teams: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in PlayerTeamEntity::find()
            .filter(player_team::Column::PlayerId.is_in(ids))
            .all(&self.db)
            .await
            .map_err(AppError::from)?
        {
            teams.entry(link.player_id).or_default().push(link.team_id);
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let team_ids = teams.remove(&m.id).unwrap_or_default();
                m.into_player(team_ids)
            })
            .collect())
    }

    async fn hydrate_one(&self, model: Option<player::Model>) -> AppResult<Option<Player>> {
        match model {
            Some(model) => Ok(self.hydrate(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LeagueRepository for LeagueStore {
    async fn find_player(&self, id: Uuid) -> AppResult<Option<Player>> {
        let model = PlayerEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        self.hydrate_one(model).await
    }

    async fn find_player_by_user(&self, user_id: Uuid) -> AppResult<Option<Player>> {
        let model = PlayerEntity::find()
            .filter(player::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        self.hydrate_one(model).await
    }

    async fn find_players(&self, ids: Vec<Uuid>) -> AppResult<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = PlayerEntity::find()
            .filter(player::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        self.hydrate(models).await
    }

    async fn find_team(&self, id: Uuid) -> AppResult<Option<Team>> {
        let result = TeamEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Team::from))
    }

    async fn find_teams(&self, ids: Vec<Uuid>) -> AppResult<Vec<Team>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = TeamEntity::find()
            .filter(team::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Team::from).collect())
    }

    async fn find_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        let result = MatchEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Match::from))
    }

    async fn set_primary_team(&self, player_id: Uuid, team_id: Uuid) -> AppResult<Player> {
        let model = PlayerEntity::find_by_id(player_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let link = player_team::ActiveModel {
            player_id: Set(player_id),
            team_id: Set(team_id),
        };
        PlayerTeamEntity::insert(link)
            .on_conflict(
                OnConflict::columns([player_team::Column::PlayerId, player_team::Column::TeamId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut active: PlayerActiveModel = model.into();
        active.primary_team_id = Set(Some(team_id));
        let model = active.update(&self.db).await.map_err(AppError::from)?;

        self.hydrate_one(Some(model))
            .await?
            .ok_or(AppError::NotFound)
    }
}
