use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type Id = Uuid;

// ---------------------------------------------------------------- accounts

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Id,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
}

// ---------------------------------------------------------------- profiles

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "profile_status", rename_all = "lowercase")]
pub enum ProfileStatus {
    #[default]
    Active,
    Banned,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Profile {
    pub id: Id,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub specialties: Vec<String>,
    pub location: Option<String>,
    pub photo: Option<String>,
    pub portfolio: Vec<String>,
    pub price: Option<i64>,
    pub featured: bool,
    pub is_admin: bool,
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh profile row created alongside an account.
    pub fn empty(id: Id, is_admin: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            bio: None,
            specialties: Vec::new(),
            location: None,
            photo: None,
            portfolio: Vec::new(),
            price: None,
            featured: false,
            is_admin,
            status: ProfileStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_banned(&self) -> bool {
        self.status == ProfileStatus::Banned
    }

    /// Apply a partial self-service edit. Absent fields keep their value.
    pub fn apply(&mut self, upd: ProfileUpdate) {
        fn clean(s: String) -> Option<String> {
            let t = s.trim();
            if t.is_empty() { None } else { Some(t.to_string()) }
        }
        if let Some(n) = upd.name { self.name = clean(n); }
        if let Some(b) = upd.bio { self.bio = clean(b); }
        if let Some(l) = upd.location { self.location = clean(l); }
        if let Some(p) = upd.photo { self.photo = clean(p); }
        if let Some(s) = upd.specialties {
            self.specialties = s.into_iter().filter_map(clean).collect();
        }
        if let Some(p) = upd.portfolio {
            self.portfolio = p.into_iter().filter_map(clean).collect();
        }
        if let Some(price) = upd.price { self.price = Some(price); }
        self.updated_at = Utc::now();
    }

    /// Which of the fields shown on the public creator page are still blank.
    pub fn completion(&self) -> ProfileCompletion {
        let mut missing = Vec::new();
        if self.name.is_none() { missing.push("Name".to_string()); }
        if self.bio.is_none() { missing.push("Bio".to_string()); }
        if self.specialties.is_empty() { missing.push("Specialties".to_string()); }
        if self.location.is_none() { missing.push("Location".to_string()); }
        if self.photo.is_none() { missing.push("Profile Photo".to_string()); }
        if self.portfolio.iter().all(|p| p.trim().is_empty()) { missing.push("Portfolio Images".to_string()); }
        ProfileCompletion { complete: missing.is_empty(), missing }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub location: Option<String>,
    pub photo: Option<String>,
    pub portfolio: Option<Vec<String>>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProfileCompletion {
    pub complete: bool,
    pub missing: Vec<String>,
}

/// Profile as listed on the explore page, with its review average joined in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreativeListing {
    #[serde(flatten)]
    pub profile: Profile,
    pub rating: Option<f64>,
    pub review_count: i64,
}

// ---------------------------------------------------------------- bookings

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
}

impl BookingStatus {
    /// `pending` is the only non-terminal state.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Accepted) | (BookingStatus::Pending, BookingStatus::Declined)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Booking {
    pub id: Id,
    pub client_id: Id,
    pub creative_id: Id,
    pub date: NaiveDate,
    pub message: String,
    pub status: BookingStatus,
    pub client_unread: bool,
    pub creative_unread: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewBooking {
    pub creative_id: Id,
    pub date: NaiveDate,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookingStatus {
    pub status: BookingStatus,
}

// ---------------------------------------------------------------- reviews

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Review {
    pub id: Id,
    pub booking_id: Id,
    pub reviewer_id: Id,
    pub creative_id: Id,
    pub rating: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewReview {
    pub booking_id: Id,
    pub rating: i32,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, sqlx::FromRow)]
pub struct RatingSummary {
    pub creative_id: Id,
    pub average: Option<f64>,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_ratings(creative_id: Id, ratings: &[i32]) -> Self {
        let count = ratings.len() as i64;
        let average = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64)
        };
        Self { creative_id, average, count }
    }
}

// ---------------------------------------------------------------- messaging

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Conversation {
    pub id: Id,
    pub user1: Id,
    pub user2: Id,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Participants are stored sorted so each pair maps to one row.
    pub fn canonical_pair(a: Id, b: Id) -> (Id, Id) {
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn has_participant(&self, user: Id) -> bool {
        self.user1 == user || self.user2 == user
    }

    pub fn peer_of(&self, user: Id) -> Id {
        if self.user1 == user { self.user2 } else { self.user1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenConversation {
    pub peer_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Message {
    pub id: Id,
    pub conversation_id: Id,
    pub sender: Id,
    pub content: String,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMessage {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    pub count: i64,
}

// ---------------------------------------------------------------- ads

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AdSlot {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAdSlot {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAdSlot {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "ad_status", rename_all = "lowercase")]
pub enum AdStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl AdStatus {
    /// Review decisions only. `expired` is reached through the sweep, never by request.
    pub fn can_transition_to(self, next: AdStatus) -> bool {
        matches!(
            (self, next),
            (AdStatus::Pending, AdStatus::Approved) | (AdStatus::Pending, AdStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Ad {
    pub id: Id,
    pub slot_id: Id,
    pub client_id: Id,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub status: AdStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Ad {
    /// Approved and inside its display window (both bounds inclusive).
    pub fn is_live_on(&self, day: NaiveDate) -> bool {
        self.status == AdStatus::Approved && self.start_date <= day && day <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAd {
    pub slot_id: Id,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAd {
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateAdStatus {
    pub status: AdStatus,
}

/// Admin view of an ad with the slot and the buyer's display name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdDetails {
    #[serde(flatten)]
    pub ad: Ad,
    pub slot: Option<AdSlot>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AdAnalytics {
    pub id: Id,
    pub ad_id: Id,
    pub impressions: i64,
    pub clicks: i64,
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------- admin

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ClientAdSummary {
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
    pub impressions: i64,
    pub clicks: i64,
}

impl ClientAdSummary {
    pub fn tally(ads: &[Ad], analytics: &[AdAnalytics]) -> Self {
        let mut s = ClientAdSummary { total: ads.len() as i64, ..Default::default() };
        for ad in ads {
            match ad.status {
                AdStatus::Approved => s.approved += 1,
                AdStatus::Rejected => s.rejected += 1,
                _ => {}
            }
            if let Some(a) = analytics.iter().find(|a| a.ad_id == ad.id) {
                s.impressions += a.impressions;
                s.clicks += a.clicks;
            }
        }
        s
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientOverview {
    pub profile: Profile,
    pub email: Option<String>,
    pub ads: ClientAdSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateClientStatus {
    pub status: ProfileStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateFeatured {
    pub featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_is_terminal_after_decision() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Accepted));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Declined));
        assert!(!BookingStatus::Accepted.can_transition_to(BookingStatus::Declined));
        assert!(!BookingStatus::Declined.can_transition_to(BookingStatus::Accepted));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn ad_status_review_transitions() {
        assert!(AdStatus::Pending.can_transition_to(AdStatus::Approved));
        assert!(AdStatus::Pending.can_transition_to(AdStatus::Rejected));
        assert!(!AdStatus::Approved.can_transition_to(AdStatus::Rejected));
        assert!(!AdStatus::Pending.can_transition_to(AdStatus::Expired));
        assert!(!AdStatus::Expired.can_transition_to(AdStatus::Approved));
    }

    #[test]
    fn completion_lists_missing_fields_in_order() {
        let mut p = Profile::empty(Uuid::new_v4(), false);
        let c = p.completion();
        assert!(!c.complete);
        assert_eq!(c.missing, vec!["Name", "Bio", "Specialties", "Location", "Profile Photo", "Portfolio Images"]);

        p.apply(ProfileUpdate {
            name: Some("Ama".into()),
            bio: Some("Weddings".into()),
            specialties: Some(vec!["Photographer".into()]),
            location: Some("Durban".into()),
            photo: Some("/media/profile-photos/x.png".into()),
            portfolio: Some(vec!["".into(), "/media/portfolio-images/a.png".into()]),
            price: None,
        });
        assert_eq!(p.portfolio.len(), 1);
        assert!(p.completion().complete);
    }

    #[test]
    fn blank_strings_clear_fields() {
        let mut p = Profile::empty(Uuid::new_v4(), false);
        p.apply(ProfileUpdate { name: Some("  Sipho ".into()), ..Default::default() });
        assert_eq!(p.name.as_deref(), Some("Sipho"));
        p.apply(ProfileUpdate { name: Some("   ".into()), ..Default::default() });
        assert!(p.name.is_none());
    }

    #[test]
    fn average_rating() {
        let id = Uuid::new_v4();
        assert_eq!(RatingSummary::from_ratings(id, &[]).average, None);
        let s = RatingSummary::from_ratings(id, &[5, 4, 4]);
        assert_eq!(s.count, 3);
        assert!((s.average.unwrap() - 13.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Conversation::canonical_pair(a, b), Conversation::canonical_pair(b, a));
        let (lo, hi) = Conversation::canonical_pair(a, b);
        assert!(lo <= hi);
    }
}
