#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use fake::{Fake, faker::internet::en::SafeEmail};
use uuid::Uuid;

use safha::Config;
use safha::database::models::{
    LocationType, MemberRole, Opportunity, OpportunityInput, OpportunityStatus, Recurrence,
    UserRole,
};
use safha::database::store::MemoryRegistrationStore;
use safha::services::auth::Claims;
use safha::{RegistrationService, UserContext};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-that-is-long-enough";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://@localhost:5432/safha_test".to_string(),
        database_max_connections: 1,
        lock_timeout_ms: 1_000,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        client_base_url: "http://localhost:3000".to_string(),
    }
}

pub fn user(role: UserRole) -> UserContext {
    let email: String = SafeEmail().fake();
    UserContext::new(Uuid::new_v4(), email, role)
}

pub fn volunteer() -> UserContext {
    user(UserRole::Volunteer)
}

pub fn organizer() -> UserContext {
    user(UserRole::Organization)
}

pub fn admin() -> UserContext {
    user(UserRole::Admin)
}

pub fn bearer(ctx: &UserContext) -> String {
    let token = Claims::new(ctx.user_id, ctx.email.clone(), ctx.role, Duration::hours(1))
        .encode(TEST_JWT_SECRET)
        .expect("token encodes");
    format!("Bearer {}", token)
}

pub fn opportunity(max_volunteers: Option<i32>, waitlist_enabled: bool) -> Opportunity {
    let now = Utc::now();
    Opportunity {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        title: "Community garden planting".to_string(),
        description: "Help plant the spring beds".to_string(),
        short_description: None,
        category: "Environment".to_string(),
        skills_needed: vec!["gardening".to_string()],
        location_type: LocationType::InPerson,
        address: None,
        city: Some("Ramallah".to_string()),
        start_date: now + Duration::days(7),
        end_date: None,
        recurrence: Recurrence::OneTime,
        max_volunteers,
        current_volunteers: 0,
        waitlist_enabled,
        status: OpportunityStatus::Published,
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

/// Edit form that keeps every field of `opportunity` except the capacity.
pub fn edit_with_capacity(opportunity: &Opportunity, max_volunteers: Option<i32>) -> OpportunityInput {
    OpportunityInput {
        title: opportunity.title.clone(),
        description: opportunity.description.clone(),
        short_description: opportunity.short_description.clone(),
        category: opportunity.category.clone(),
        skills_needed: opportunity.skills_needed.clone(),
        location_type: opportunity.location_type,
        address: opportunity.address.clone(),
        city: opportunity.city.clone(),
        start_date: opportunity.start_date,
        end_date: opportunity.end_date,
        recurrence: opportunity.recurrence,
        max_volunteers,
        waitlist_enabled: opportunity.waitlist_enabled,
        status: opportunity.status,
        image_url: opportunity.image_url.clone(),
    }
}

/// In-memory ledger with one seeded opportunity and a member organizer.
pub struct TestLedger {
    pub store: MemoryRegistrationStore,
    pub service: RegistrationService,
    pub opportunity: Opportunity,
    pub organizer: UserContext,
}

impl TestLedger {
    pub async fn new(max_volunteers: Option<i32>, waitlist_enabled: bool) -> Self {
        Self::with_opportunity(opportunity(max_volunteers, waitlist_enabled)).await
    }

    pub async fn with_opportunity(opportunity: Opportunity) -> Self {
        let store = MemoryRegistrationStore::new();
        store.insert_opportunity(opportunity.clone()).await;

        let organizer = organizer();
        store
            .add_member(organizer.user_id, opportunity.organization_id, MemberRole::Owner)
            .await;

        let service = RegistrationService::new(Arc::new(store.clone()));

        Self {
            store,
            service,
            opportunity,
            organizer,
        }
    }

    pub async fn current_volunteers(&self) -> i32 {
        self.store
            .opportunity(self.opportunity.id)
            .await
            .map(|o| o.current_volunteers)
            .unwrap_or_default()
    }
}
