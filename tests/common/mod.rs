//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use uuid::Uuid;

use league_coordinator::domain::{
    Match, Player, PoolEntry, RequestStatus, SubstituteRequest, SubstituteResponse, User,
};
use league_coordinator::errors::AppResult;
use league_coordinator::infra::repositories::{
    MockAvailabilityRepository, MockLeagueRepository, MockNotificationRepository,
    MockPoolRepository, MockRoleRepository, MockSubstituteRepository, MockUserRepository,
};
use league_coordinator::infra::{
    AvailabilityRepository, LeagueRepository, MockPoolWrites, MockSubstituteWrites,
    NotificationRepository, PoolRepository, RoleRepository, SubstituteRepository,
    TransactionContext, TxFuture, UnitOfWork, UserRepository,
};

/// UnitOfWork over mockall repositories. Unset repositories are strict
/// mocks with no expectations, so any call to them fails the test.
///
/// `transaction` runs the body against `substitute_writes` and `pool_writes`.
#[derive(Default)]
pub struct TestUnitOfWork {
    pub users: MockUserRepository,
    pub league: MockLeagueRepository,
    pub availability: MockAvailabilityRepository,
    pub substitutes: MockSubstituteRepository,
    pub pool: MockPoolRepository,
    pub roles: MockRoleRepository,
    pub notifications: MockNotificationRepository,
    pub substitute_writes: MockSubstituteWrites,
    pub pool_writes: MockPoolWrites,
}

impl TestUnitOfWork {
    pub fn build(self) -> Arc<BuiltUnitOfWork> {
        Arc::new(BuiltUnitOfWork {
            users: Arc::new(self.users),
            league: Arc::new(self.league),
            availability: Arc::new(self.availability),
            substitutes: Arc::new(self.substitutes),
            pool: Arc::new(self.pool),
            roles: Arc::new(self.roles),
            notifications: Arc::new(self.notifications),
            substitute_writes: self.substitute_writes,
            pool_writes: self.pool_writes,
        })
    }
}

pub struct BuiltUnitOfWork {
    users: Arc<MockUserRepository>,
    league: Arc<MockLeagueRepository>,
    availability: Arc<MockAvailabilityRepository>,
    substitutes: Arc<MockSubstituteRepository>,
    pool: Arc<MockPoolRepository>,
    roles: Arc<MockRoleRepository>,
    notifications: Arc<MockNotificationRepository>,
    substitute_writes: MockSubstituteWrites,
    pool_writes: MockPoolWrites,
}

#[async_trait]
impl UnitOfWork for BuiltUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn league(&self) -> Arc<dyn LeagueRepository> {
        self.league.clone()
    }

    fn availability(&self) -> Arc<dyn AvailabilityRepository> {
        self.availability.clone()
    }

    fn substitutes(&self) -> Arc<dyn SubstituteRepository> {
        self.substitutes.clone()
    }

    fn pool(&self) -> Arc<dyn PoolRepository> {
        self.pool.clone()
    }

    fn roles(&self) -> Arc<dyn RoleRepository> {
        self.roles.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        self.notifications.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        f(TransactionContext::new(&self.substitute_writes, &self.pool_writes)).await
    }
}

pub fn upcoming_match(id: Uuid, home: Uuid, away: Uuid) -> Match {
    Match {
        id,
        league_id: Uuid::new_v4(),
        home_team_id: home,
        away_team_id: away,
        date: (Utc::now() + Duration::days(3)).date_naive(),
        time: NaiveTime::from_hms_opt(19, 30, 0),
        location: Some("North Field".to_string()),
        created_at: Utc::now(),
    }
}

pub fn past_match(id: Uuid) -> Match {
    Match {
        date: (Utc::now() - Duration::days(2)).date_naive(),
        ..upcoming_match(id, Uuid::new_v4(), Uuid::new_v4())
    }
}

pub fn player(id: Uuid, team_id: Uuid) -> Player {
    Player {
        id,
        user_id: Some(Uuid::new_v4()),
        name: "Sam Keeper".to_string(),
        discord_id: Some("123456789".to_string()),
        gender: None,
        league_id: None,
        primary_team_id: Some(team_id),
        team_ids: vec![team_id],
        is_active: true,
    }
}

pub fn sub_request(id: Uuid, status: RequestStatus) -> SubstituteRequest {
    SubstituteRequest {
        id,
        match_id: Uuid::new_v4(),
        team_id: Uuid::new_v4(),
        league_id: Uuid::new_v4(),
        requested_by: Uuid::new_v4(),
        positions_needed: None,
        gender_preference: None,
        notes: None,
        status,
        substitutes_needed: 1,
        filled_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Active pool entry with every outreach channel opted in.
pub fn pool_entry(player_id: Uuid, league_id: Uuid) -> PoolEntry {
    PoolEntry {
        id: Uuid::new_v4(),
        player_id,
        league_id,
        is_active: true,
        preferred_positions: None,
        max_matches_per_week: None,
        sms_for_sub_requests: true,
        discord_for_sub_requests: true,
        email_for_sub_requests: true,
        requests_received: 0,
        requests_accepted: 0,
        matches_played: 0,
        joined_pool_at: Utc::now(),
        last_active_at: None,
    }
}

/// Unanswered outreach record with a live token.
pub fn outreach(request_id: Uuid, player_id: Uuid) -> SubstituteResponse {
    let now = Utc::now();
    SubstituteResponse {
        id: Uuid::new_v4(),
        request_id,
        player_id,
        is_available: None,
        response_method: None,
        response_text: None,
        notification_sent_at: Some(now),
        notification_methods: Vec::new(),
        responded_at: None,
        rsvp_token: "tok_0123456789abcdefABCDEF".to_string(),
        token_expires_at: now + Duration::hours(48),
        token_used_at: None,
        created_at: now,
    }
}

/// Account reachable by email only.
pub fn email_only_user(id: Uuid) -> User {
    let mut user = User::new(id, "Casey Winger".to_string());
    user.email = Some(format!("{}@example.com", id.simple()));
    user.push_notifications = false;
    user
}
