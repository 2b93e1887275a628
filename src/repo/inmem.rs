use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::*;

const SNAPSHOT_FILE: &str = "state.json";

#[derive(Default, Serialize, Deserialize)]
struct State {
    accounts: HashMap<Id, Account>,
    profiles: HashMap<Id, Profile>,
    bookings: HashMap<Id, Booking>,
    reviews: HashMap<Id, Review>,
    conversations: HashMap<Id, Conversation>,
    messages: HashMap<Id, Message>,
    ad_slots: HashMap<Id, AdSlot>,
    ads: HashMap<Id, Ad>,
    ad_analytics: HashMap<Id, AdAnalytics>, // keyed by ad id
}

/// Process-local repository persisted as a JSON snapshot after every write.
#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Arc<PathBuf>,
}

impl InMemRepo {
    fn data_dir() -> PathBuf {
        std::env::var("FOLIOO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"))
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    log::info!("[inmem] loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    log::warn!("[inmem] failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            },
            Err(e) => {
                log::info!("[inmem] no snapshot at '{}': {e}. Starting empty.", path.display());
                State::default()
            }
        }
    }

    pub fn new() -> Self {
        Self::with_data_dir(Self::data_dir())
    }

    /// Repository whose snapshot lives in `dir`; an existing snapshot there is loaded.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        let mut snapshot_path = dir.into();
        snapshot_path.push(SNAPSHOT_FILE);
        let state = Self::load_state_from(&snapshot_path);
        Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Arc::new(snapshot_path),
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|e| RepoError::Internal(e.to_string()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|e| RepoError::Internal(e.to_string()))
    }

    /// Write the snapshot. Callers hold the write guard so snapshots land in mutation order.
    /// Failures are logged; the in-memory state stays authoritative.
    fn persist(&self, state: &State) {
        let path = &self.snapshot_path;
        let bytes = match serde_json::to_vec_pretty(state) {
            Ok(b) => b,
            Err(e) => { log::error!("[inmem] snapshot encode failed: {e}"); return; }
        };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(path.as_path(), bytes) {
            log::error!("[inmem] failed to write snapshot '{}': {e}", path.display());
        }
    }
}

impl Default for InMemRepo {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl AccountRepo for InMemRepo {
    async fn create_account(&self, new: NewAccount, is_admin: bool) -> RepoResult<(Account, Profile)> {
        let mut s = self.write()?;
        let email = new.email.trim().to_lowercase();
        if s.accounts.values().any(|a| a.email == email) {
            return Err(RepoError::Conflict);
        }
        let account = Account {
            id: Uuid::new_v4(),
            email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        let profile = Profile::empty(account.id, is_admin);
        s.accounts.insert(account.id, account.clone());
        s.profiles.insert(profile.id, profile.clone());
        self.persist(&s);
        Ok((account, profile))
    }

    async fn find_account_by_email(&self, email: &str) -> RepoResult<Account> {
        let email = email.trim().to_lowercase();
        let s = self.read()?;
        s.accounts.values().find(|a| a.email == email).cloned().ok_or(RepoError::NotFound)
    }

    async fn get_account(&self, id: Id) -> RepoResult<Account> {
        let s = self.read()?;
        s.accounts.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.accounts.values().cloned().collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(v)
    }

    async fn update_password(&self, id: Id, password_hash: String) -> RepoResult<()> {
        let mut s = self.write()?;
        let account = s.accounts.get_mut(&id).ok_or(RepoError::NotFound)?;
        account.password_hash = password_hash;
        self.persist(&s);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepo for InMemRepo {
    async fn get_profile(&self, id: Id) -> RepoResult<Profile> {
        let s = self.read()?;
        s.profiles.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_profiles(&self) -> RepoResult<Vec<Profile>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.profiles.values().cloned().collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(v)
    }

    async fn upsert_profile(&self, id: Id, upd: ProfileUpdate) -> RepoResult<Profile> {
        let mut s = self.write()?;
        let profile = s.profiles.entry(id).or_insert_with(|| Profile::empty(id, false));
        profile.apply(upd);
        let updated = profile.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn append_portfolio(&self, id: Id, urls: Vec<String>) -> RepoResult<Profile> {
        let mut s = self.write()?;
        let profile = s.profiles.get_mut(&id).ok_or(RepoError::NotFound)?;
        profile.portfolio.extend(urls);
        profile.updated_at = Utc::now();
        let updated = profile.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn set_profile_status(&self, id: Id, status: ProfileStatus) -> RepoResult<Profile> {
        let mut s = self.write()?;
        let profile = s.profiles.get_mut(&id).ok_or(RepoError::NotFound)?;
        profile.status = status;
        profile.updated_at = Utc::now();
        let updated = profile.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn set_featured(&self, id: Id, featured: bool) -> RepoResult<Profile> {
        let mut s = self.write()?;
        let profile = s.profiles.get_mut(&id).ok_or(RepoError::NotFound)?;
        profile.featured = featured;
        profile.updated_at = Utc::now();
        let updated = profile.clone();
        self.persist(&s);
        Ok(updated)
    }
}

#[async_trait]
impl BookingRepo for InMemRepo {
    async fn create_booking(&self, client_id: Id, new: NewBooking) -> RepoResult<Booking> {
        let mut s = self.write()?;
        if !s.profiles.contains_key(&new.creative_id) { return Err(RepoError::NotFound); }
        let booking = Booking {
            id: Uuid::new_v4(),
            client_id,
            creative_id: new.creative_id,
            date: new.date,
            message: new.message,
            status: BookingStatus::Pending,
            client_unread: true,
            creative_unread: true,
            created_at: Utc::now(),
        };
        s.bookings.insert(booking.id, booking.clone());
        self.persist(&s);
        Ok(booking)
    }

    async fn get_booking(&self, id: Id) -> RepoResult<Booking> {
        let s = self.read()?;
        s.bookings.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_bookings_for_user(&self, user: Id) -> RepoResult<Vec<Booking>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.bookings.values()
            .filter(|b| b.client_id == user || b.creative_id == user)
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn update_booking_status(&self, id: Id, status: BookingStatus) -> RepoResult<Booking> {
        let mut s = self.write()?;
        let booking = s.bookings.get_mut(&id).ok_or(RepoError::NotFound)?;
        if !booking.status.can_transition_to(status) {
            return Err(RepoError::Conflict);
        }
        booking.status = status;
        booking.client_unread = true;
        let updated = booking.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn mark_bookings_seen(&self, user: Id) -> RepoResult<u64> {
        let mut s = self.write()?;
        let mut touched = 0;
        for b in s.bookings.values_mut() {
            let mut hit = false;
            if b.client_id == user && b.client_unread { b.client_unread = false; hit = true; }
            if b.creative_id == user && b.creative_unread { b.creative_unread = false; hit = true; }
            if hit { touched += 1; }
        }
        if touched > 0 { self.persist(&s); }
        Ok(touched)
    }

    async fn count_unread_bookings(&self, user: Id) -> RepoResult<i64> {
        let s = self.read()?;
        Ok(s.bookings.values()
            .filter(|b| (b.client_id == user && b.client_unread) || (b.creative_id == user && b.creative_unread))
            .count() as i64)
    }
}

#[async_trait]
impl ReviewRepo for InMemRepo {
    async fn create_review(&self, reviewer_id: Id, creative_id: Id, new: NewReview) -> RepoResult<Review> {
        let mut s = self.write()?;
        if !s.bookings.contains_key(&new.booking_id) { return Err(RepoError::NotFound); }
        if s.reviews.values().any(|r| r.booking_id == new.booking_id) {
            return Err(RepoError::Conflict);
        }
        let review = Review {
            id: Uuid::new_v4(),
            booking_id: new.booking_id,
            reviewer_id,
            creative_id,
            rating: new.rating,
            text: new.text,
            created_at: Utc::now(),
        };
        s.reviews.insert(review.id, review.clone());
        self.persist(&s);
        Ok(review)
    }

    async fn list_reviews_for_creative(&self, creative_id: Id) -> RepoResult<Vec<Review>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.reviews.values().filter(|r| r.creative_id == creative_id).cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn rating_summary(&self, creative_id: Id) -> RepoResult<RatingSummary> {
        let s = self.read()?;
        let ratings: Vec<i32> = s.reviews.values().filter(|r| r.creative_id == creative_id).map(|r| r.rating).collect();
        Ok(RatingSummary::from_ratings(creative_id, &ratings))
    }

    async fn rating_summaries(&self) -> RepoResult<Vec<RatingSummary>> {
        let s = self.read()?;
        let mut by_creative: HashMap<Id, Vec<i32>> = HashMap::new();
        for r in s.reviews.values() {
            by_creative.entry(r.creative_id).or_default().push(r.rating);
        }
        Ok(by_creative.into_iter().map(|(id, ratings)| RatingSummary::from_ratings(id, &ratings)).collect())
    }
}

#[async_trait]
impl ConversationRepo for InMemRepo {
    async fn open_conversation(&self, a: Id, b: Id) -> RepoResult<Conversation> {
        let (user1, user2) = Conversation::canonical_pair(a, b);
        let mut s = self.write()?;
        if let Some(existing) = s.conversations.values().find(|c| c.user1 == user1 && c.user2 == user2) {
            return Ok(existing.clone());
        }
        let convo = Conversation { id: Uuid::new_v4(), user1, user2, created_at: Utc::now() };
        s.conversations.insert(convo.id, convo.clone());
        self.persist(&s);
        Ok(convo)
    }

    async fn get_conversation(&self, id: Id) -> RepoResult<Conversation> {
        let s = self.read()?;
        s.conversations.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_conversations_for_user(&self, user: Id) -> RepoResult<Vec<Conversation>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.conversations.values().filter(|c| c.has_participant(user)).cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn create_message(&self, conversation_id: Id, sender: Id, content: String) -> RepoResult<Message> {
        let mut s = self.write()?;
        if !s.conversations.contains_key(&conversation_id) { return Err(RepoError::NotFound); }
        let msg = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender,
            content,
            unread: true,
            created_at: Utc::now(),
        };
        s.messages.insert(msg.id, msg.clone());
        self.persist(&s);
        Ok(msg)
    }

    async fn list_messages(&self, conversation_id: Id) -> RepoResult<Vec<Message>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.messages.values().filter(|m| m.conversation_id == conversation_id).cloned().collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(v)
    }

    async fn mark_messages_read(&self, conversation_id: Id, reader: Id) -> RepoResult<u64> {
        let mut s = self.write()?;
        let mut touched = 0;
        for m in s.messages.values_mut() {
            if m.conversation_id == conversation_id && m.sender != reader && m.unread {
                m.unread = false;
                touched += 1;
            }
        }
        if touched > 0 { self.persist(&s); }
        Ok(touched)
    }

    async fn count_unread_messages(&self, user: Id) -> RepoResult<i64> {
        let s = self.read()?;
        Ok(s.messages.values()
            .filter(|m| m.unread && m.sender != user)
            .filter(|m| s.conversations.get(&m.conversation_id).map(|c| c.has_participant(user)).unwrap_or(false))
            .count() as i64)
    }
}

#[async_trait]
impl AdRepo for InMemRepo {
    async fn list_ad_slots(&self) -> RepoResult<Vec<AdSlot>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.ad_slots.values().cloned().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    async fn get_ad_slot(&self, id: Id) -> RepoResult<AdSlot> {
        let s = self.read()?;
        s.ad_slots.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_ad_slot(&self, new: NewAdSlot) -> RepoResult<AdSlot> {
        let mut s = self.write()?;
        let slot = AdSlot {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            is_active: new.is_active,
        };
        s.ad_slots.insert(slot.id, slot.clone());
        self.persist(&s);
        Ok(slot)
    }

    async fn update_ad_slot(&self, id: Id, upd: UpdateAdSlot) -> RepoResult<AdSlot> {
        let mut s = self.write()?;
        let slot = s.ad_slots.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(n) = upd.name { slot.name = n; }
        if let Some(d) = upd.description { slot.description = Some(d); }
        if let Some(p) = upd.price { slot.price = p; }
        if let Some(a) = upd.is_active { slot.is_active = a; }
        let updated = slot.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn delete_ad_slot(&self, id: Id) -> RepoResult<()> {
        let mut s = self.write()?;
        if !s.ad_slots.contains_key(&id) { return Err(RepoError::NotFound); }
        if s.ads.values().any(|a| a.slot_id == id) { return Err(RepoError::Conflict); }
        s.ad_slots.remove(&id);
        self.persist(&s);
        Ok(())
    }

    async fn list_ads(&self) -> RepoResult<Vec<Ad>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.ads.values().cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn list_ads_for_client(&self, client_id: Id) -> RepoResult<Vec<Ad>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.ads.values().filter(|a| a.client_id == client_id).cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn get_ad(&self, id: Id) -> RepoResult<Ad> {
        let s = self.read()?;
        s.ads.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_ad(&self, client_id: Id, new: NewAd) -> RepoResult<Ad> {
        let mut s = self.write()?;
        if !s.ad_slots.contains_key(&new.slot_id) { return Err(RepoError::NotFound); }
        let ad = Ad {
            id: Uuid::new_v4(),
            slot_id: new.slot_id,
            client_id,
            image_url: new.image_url,
            link_url: new.link_url,
            status: AdStatus::Pending,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: Utc::now(),
        };
        s.ads.insert(ad.id, ad.clone());
        self.persist(&s);
        Ok(ad)
    }

    async fn update_ad(&self, id: Id, upd: UpdateAd) -> RepoResult<Ad> {
        let mut s = self.write()?;
        let ad = s.ads.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(u) = upd.image_url { ad.image_url = Some(u); }
        if let Some(u) = upd.link_url { ad.link_url = Some(u); }
        if let Some(d) = upd.start_date { ad.start_date = d; }
        if let Some(d) = upd.end_date { ad.end_date = d; }
        let updated = ad.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn set_ad_status(&self, id: Id, status: AdStatus) -> RepoResult<Ad> {
        let mut s = self.write()?;
        let ad = s.ads.get_mut(&id).ok_or(RepoError::NotFound)?;
        if !ad.status.can_transition_to(status) { return Err(RepoError::Conflict); }
        ad.status = status;
        let updated = ad.clone();
        self.persist(&s);
        Ok(updated)
    }

    async fn delete_ad(&self, id: Id) -> RepoResult<()> {
        let mut s = self.write()?;
        s.ads.remove(&id).ok_or(RepoError::NotFound)?;
        s.ad_analytics.remove(&id);
        self.persist(&s);
        Ok(())
    }

    async fn live_ads(&self, day: NaiveDate, limit: usize) -> RepoResult<Vec<Ad>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.ads.values().filter(|a| a.is_live_on(day)).cloned().collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        v.truncate(limit);
        Ok(v)
    }

    async fn expire_ads(&self, day: NaiveDate) -> RepoResult<u64> {
        let mut s = self.write()?;
        let mut touched = 0;
        for ad in s.ads.values_mut() {
            if ad.status == AdStatus::Approved && ad.end_date < day {
                ad.status = AdStatus::Expired;
                touched += 1;
            }
        }
        if touched > 0 { self.persist(&s); }
        Ok(touched)
    }

    async fn list_ad_analytics(&self) -> RepoResult<Vec<AdAnalytics>> {
        let s = self.read()?;
        Ok(s.ad_analytics.values().cloned().collect())
    }

    async fn record_impression(&self, ad_id: Id) -> RepoResult<AdAnalytics> {
        self.bump(ad_id, |a| a.impressions += 1)
    }

    async fn record_click(&self, ad_id: Id) -> RepoResult<AdAnalytics> {
        self.bump(ad_id, |a| a.clicks += 1)
    }
}

impl InMemRepo {
    fn bump(&self, ad_id: Id, f: impl FnOnce(&mut AdAnalytics)) -> RepoResult<AdAnalytics> {
        let mut s = self.write()?;
        if !s.ads.contains_key(&ad_id) { return Err(RepoError::NotFound); }
        let row = s.ad_analytics.entry(ad_id).or_insert_with(|| AdAnalytics {
            id: Uuid::new_v4(),
            ad_id,
            impressions: 0,
            clicks: 0,
            last_updated: Utc::now(),
        });
        f(row);
        row.last_updated = Utc::now();
        let updated = row.clone();
        self.persist(&s);
        Ok(updated)
    }
}
