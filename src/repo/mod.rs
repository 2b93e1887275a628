use chrono::NaiveDate;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Creates the account and its empty profile. Duplicate email (case-insensitive) → `Conflict`.
    async fn create_account(&self, new: NewAccount, is_admin: bool) -> RepoResult<(Account, Profile)>;
    async fn find_account_by_email(&self, email: &str) -> RepoResult<Account>;
    async fn get_account(&self, id: Id) -> RepoResult<Account>;
    async fn list_accounts(&self) -> RepoResult<Vec<Account>>;
    async fn update_password(&self, id: Id, password_hash: String) -> RepoResult<()>;
}

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get_profile(&self, id: Id) -> RepoResult<Profile>;
    async fn list_profiles(&self) -> RepoResult<Vec<Profile>>;
    async fn upsert_profile(&self, id: Id, upd: ProfileUpdate) -> RepoResult<Profile>;
    async fn append_portfolio(&self, id: Id, urls: Vec<String>) -> RepoResult<Profile>;
    async fn set_profile_status(&self, id: Id, status: ProfileStatus) -> RepoResult<Profile>;
    async fn set_featured(&self, id: Id, featured: bool) -> RepoResult<Profile>;
}

#[async_trait]
pub trait BookingRepo: Send + Sync {
    async fn create_booking(&self, client_id: Id, new: NewBooking) -> RepoResult<Booking>;
    async fn get_booking(&self, id: Id) -> RepoResult<Booking>;
    /// Bookings where `user` is client or creative, newest first.
    async fn list_bookings_for_user(&self, user: Id) -> RepoResult<Vec<Booking>>;
    /// Moves a `pending` booking to `status`; any other current state → `Conflict`.
    async fn update_booking_status(&self, id: Id, status: BookingStatus) -> RepoResult<Booking>;
    /// Clears the caller's side of the unread flags. Returns rows touched.
    async fn mark_bookings_seen(&self, user: Id) -> RepoResult<u64>;
    async fn count_unread_bookings(&self, user: Id) -> RepoResult<i64>;
}

#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// One review per booking; a second attempt → `Conflict`.
    async fn create_review(&self, reviewer_id: Id, creative_id: Id, new: NewReview) -> RepoResult<Review>;
    async fn list_reviews_for_creative(&self, creative_id: Id) -> RepoResult<Vec<Review>>;
    async fn rating_summary(&self, creative_id: Id) -> RepoResult<RatingSummary>;
    /// Summaries for every creative with at least one review.
    async fn rating_summaries(&self) -> RepoResult<Vec<RatingSummary>>;
}

#[async_trait]
pub trait ConversationRepo: Send + Sync {
    /// Returns the existing conversation for the pair or creates it.
    async fn open_conversation(&self, a: Id, b: Id) -> RepoResult<Conversation>;
    async fn get_conversation(&self, id: Id) -> RepoResult<Conversation>;
    async fn list_conversations_for_user(&self, user: Id) -> RepoResult<Vec<Conversation>>;
    async fn create_message(&self, conversation_id: Id, sender: Id, content: String) -> RepoResult<Message>;
    /// Oldest first.
    async fn list_messages(&self, conversation_id: Id) -> RepoResult<Vec<Message>>;
    /// Clears `unread` on messages in the conversation not sent by `reader`.
    async fn mark_messages_read(&self, conversation_id: Id, reader: Id) -> RepoResult<u64>;
    async fn count_unread_messages(&self, user: Id) -> RepoResult<i64>;
}

#[async_trait]
pub trait AdRepo: Send + Sync {
    async fn list_ad_slots(&self) -> RepoResult<Vec<AdSlot>>;
    async fn get_ad_slot(&self, id: Id) -> RepoResult<AdSlot>;
    async fn create_ad_slot(&self, new: NewAdSlot) -> RepoResult<AdSlot>;
    async fn update_ad_slot(&self, id: Id, upd: UpdateAdSlot) -> RepoResult<AdSlot>;
    /// Slots still referenced by ads cannot be removed (`Conflict`).
    async fn delete_ad_slot(&self, id: Id) -> RepoResult<()>;

    async fn list_ads(&self) -> RepoResult<Vec<Ad>>;
    async fn list_ads_for_client(&self, client_id: Id) -> RepoResult<Vec<Ad>>;
    async fn get_ad(&self, id: Id) -> RepoResult<Ad>;
    async fn create_ad(&self, client_id: Id, new: NewAd) -> RepoResult<Ad>;
    async fn update_ad(&self, id: Id, upd: UpdateAd) -> RepoResult<Ad>;
    /// Review decision; illegal transitions → `Conflict`.
    async fn set_ad_status(&self, id: Id, status: AdStatus) -> RepoResult<Ad>;
    async fn delete_ad(&self, id: Id) -> RepoResult<()>;
    /// Approved ads live on `day`, at most `limit`.
    async fn live_ads(&self, day: NaiveDate, limit: usize) -> RepoResult<Vec<Ad>>;
    /// Approved ads whose window ended before `day` become `expired`. Returns rows touched.
    async fn expire_ads(&self, day: NaiveDate) -> RepoResult<u64>;

    async fn list_ad_analytics(&self) -> RepoResult<Vec<AdAnalytics>>;
    async fn record_impression(&self, ad_id: Id) -> RepoResult<AdAnalytics>;
    async fn record_click(&self, ad_id: Id) -> RepoResult<AdAnalytics>;
}

pub trait Repo: AccountRepo + ProfileRepo + BookingRepo + ReviewRepo + ConversationRepo + AdRepo {}

impl<T> Repo for T where T: AccountRepo + ProfileRepo + BookingRepo + ReviewRepo + ConversationRepo + AdRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem;

#[cfg(feature = "postgres-store")]
pub mod pg;
