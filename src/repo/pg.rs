use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::*;

const ACCOUNT_COLS: &str = "id, email, password_hash, created_at";
const PROFILE_COLS: &str = "id, name, bio, specialties, location, photo, portfolio, price, featured, is_admin, status, created_at, updated_at";
const BOOKING_COLS: &str = "id, client_id, creative_id, date, message, status, client_unread, creative_unread, created_at";
const REVIEW_COLS: &str = "id, booking_id, reviewer_id, creative_id, rating, text, created_at";
const CONVERSATION_COLS: &str = "id, user1, user2, created_at";
const MESSAGE_COLS: &str = "id, conversation_id, sender, content, unread, created_at";
const SLOT_COLS: &str = "id, name, description, price, is_active";
const AD_COLS: &str = "id, slot_id, client_id, image_url, link_url, status, start_date, end_date, created_at";
const ANALYTICS_COLS: &str = "id, ad_id, impressions, clicks, last_updated";

/// Maps driver errors onto the repository's small error vocabulary.
fn map_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => RepoError::Conflict, // unique_violation
            Some("23503") => RepoError::Conflict, // foreign_key_violation
            _ => RepoError::Internal(e.to_string()),
        },
        _ => RepoError::Internal(e.to_string()),
    }
}

#[derive(Clone)]
pub struct PgRepo { pool: Pool<Postgres> }

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

    async fn exists(&self, table: &str, id: Id) -> RepoResult<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
        sqlx::query_scalar::<_, bool>(&sql).bind(id).fetch_one(&self.pool).await.map_err(map_err)
    }
}

#[async_trait]
impl AccountRepo for PgRepo {
    async fn create_account(&self, new: NewAccount, is_admin: bool) -> RepoResult<(Account, Profile)> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        let account = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (id, email, password_hash) VALUES ($1, lower($2), $3) RETURNING {ACCOUNT_COLS}"
        ))
            .bind(Uuid::new_v4())
            .bind(new.email.trim())
            .bind(&new.password_hash)
            .fetch_one(&mut *tx).await.map_err(map_err)?;
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (id, is_admin) VALUES ($1, $2) RETURNING {PROFILE_COLS}"
        ))
            .bind(account.id)
            .bind(is_admin)
            .fetch_one(&mut *tx).await.map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        Ok((account, profile))
    }

    async fn find_account_by_email(&self, email: &str) -> RepoResult<Account> {
        sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE email = lower($1)"))
            .bind(email.trim())
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn get_account(&self, id: Id) -> RepoResult<Account> {
        sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLS} FROM accounts ORDER BY created_at"))
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn update_password(&self, id: Id, password_hash: String) -> RepoResult<()> {
        let res = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool).await.map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepo for PgRepo {
    async fn get_profile(&self, id: Id) -> RepoResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn list_profiles(&self) -> RepoResult<Vec<Profile>> {
        sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLS} FROM profiles ORDER BY created_at"))
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn upsert_profile(&self, id: Id, upd: ProfileUpdate) -> RepoResult<Profile> {
        // Lock the row and apply the same field rules as the in-memory backend.
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query("INSERT INTO profiles (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .execute(&mut *tx).await.map_err(map_err)?;
        let mut profile = sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLS} FROM profiles WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_one(&mut *tx).await.map_err(map_err)?;
        profile.apply(upd);
        let saved = sqlx::query_as::<_, Profile>(&format!(r#"
            UPDATE profiles SET name = $2, bio = $3, specialties = $4, location = $5, photo = $6,
                   portfolio = $7, price = $8, updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLS}
        "#))
            .bind(id)
            .bind(&profile.name)
            .bind(&profile.bio)
            .bind(&profile.specialties)
            .bind(&profile.location)
            .bind(&profile.photo)
            .bind(&profile.portfolio)
            .bind(profile.price)
            .fetch_one(&mut *tx).await.map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        Ok(saved)
    }

    async fn append_portfolio(&self, id: Id, urls: Vec<String>) -> RepoResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET portfolio = portfolio || $2, updated_at = now() WHERE id = $1 RETURNING {PROFILE_COLS}"
        ))
            .bind(id)
            .bind(urls)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn set_profile_status(&self, id: Id, status: ProfileStatus) -> RepoResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET status = $2, updated_at = now() WHERE id = $1 RETURNING {PROFILE_COLS}"
        ))
            .bind(id)
            .bind(status)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn set_featured(&self, id: Id, featured: bool) -> RepoResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET featured = $2, updated_at = now() WHERE id = $1 RETURNING {PROFILE_COLS}"
        ))
            .bind(id)
            .bind(featured)
            .fetch_one(&self.pool).await.map_err(map_err)
    }
}

#[async_trait]
impl BookingRepo for PgRepo {
    async fn create_booking(&self, client_id: Id, new: NewBooking) -> RepoResult<Booking> {
        if !self.exists("profiles", new.creative_id).await? { return Err(RepoError::NotFound); }
        sqlx::query_as::<_, Booking>(&format!(r#"
            INSERT INTO bookings (id, client_id, creative_id, date, message, status, client_unread, creative_unread)
            VALUES ($1, $2, $3, $4, $5, 'pending', TRUE, TRUE)
            RETURNING {BOOKING_COLS}
        "#))
            .bind(Uuid::new_v4())
            .bind(client_id)
            .bind(new.creative_id)
            .bind(new.date)
            .bind(&new.message)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn get_booking(&self, id: Id) -> RepoResult<Booking> {
        sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn list_bookings_for_user(&self, user: Id) -> RepoResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLS} FROM bookings WHERE client_id = $1 OR creative_id = $1 ORDER BY created_at DESC"
        ))
            .bind(user)
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn update_booking_status(&self, id: Id, status: BookingStatus) -> RepoResult<Booking> {
        if !BookingStatus::Pending.can_transition_to(status) { return Err(RepoError::Conflict); }
        let updated = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = $2, client_unread = TRUE WHERE id = $1 AND status = 'pending' RETURNING {BOOKING_COLS}"
        ))
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool).await.map_err(map_err)?;
        match updated {
            Some(b) => Ok(b),
            None if self.exists("bookings", id).await? => Err(RepoError::Conflict),
            None => Err(RepoError::NotFound),
        }
    }

    async fn mark_bookings_seen(&self, user: Id) -> RepoResult<u64> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        let a = sqlx::query("UPDATE bookings SET client_unread = FALSE WHERE client_id = $1 AND client_unread")
            .bind(user)
            .execute(&mut *tx).await.map_err(map_err)?;
        let b = sqlx::query("UPDATE bookings SET creative_unread = FALSE WHERE creative_id = $1 AND creative_unread")
            .bind(user)
            .execute(&mut *tx).await.map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        Ok(a.rows_affected() + b.rows_affected())
    }

    async fn count_unread_bookings(&self, user: Id) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE (client_id = $1 AND client_unread) OR (creative_id = $1 AND creative_unread)"
        )
            .bind(user)
            .fetch_one(&self.pool).await.map_err(map_err)
    }
}

#[async_trait]
impl ReviewRepo for PgRepo {
    async fn create_review(&self, reviewer_id: Id, creative_id: Id, new: NewReview) -> RepoResult<Review> {
        sqlx::query_as::<_, Review>(&format!(r#"
            INSERT INTO reviews (id, booking_id, reviewer_id, creative_id, rating, text)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLS}
        "#))
            .bind(Uuid::new_v4())
            .bind(new.booking_id)
            .bind(reviewer_id)
            .bind(creative_id)
            .bind(new.rating)
            .bind(&new.text)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn list_reviews_for_creative(&self, creative_id: Id) -> RepoResult<Vec<Review>> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLS} FROM reviews WHERE creative_id = $1 ORDER BY created_at DESC"
        ))
            .bind(creative_id)
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn rating_summary(&self, creative_id: Id) -> RepoResult<RatingSummary> {
        sqlx::query_as::<_, RatingSummary>(
            "SELECT $1::uuid AS creative_id, AVG(rating)::float8 AS average, COUNT(*) AS count FROM reviews WHERE creative_id = $1"
        )
            .bind(creative_id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn rating_summaries(&self) -> RepoResult<Vec<RatingSummary>> {
        sqlx::query_as::<_, RatingSummary>(
            "SELECT creative_id, AVG(rating)::float8 AS average, COUNT(*) AS count FROM reviews GROUP BY creative_id"
        )
            .fetch_all(&self.pool).await.map_err(map_err)
    }
}

#[async_trait]
impl ConversationRepo for PgRepo {
    async fn open_conversation(&self, a: Id, b: Id) -> RepoResult<Conversation> {
        let (user1, user2) = Conversation::canonical_pair(a, b);
        // No-op update so RETURNING yields the existing row on conflict.
        sqlx::query_as::<_, Conversation>(&format!(r#"
            INSERT INTO conversations (id, user1, user2) VALUES ($1, $2, $3)
            ON CONFLICT (user1, user2) DO UPDATE SET user1 = EXCLUDED.user1
            RETURNING {CONVERSATION_COLS}
        "#))
            .bind(Uuid::new_v4())
            .bind(user1)
            .bind(user2)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn get_conversation(&self, id: Id) -> RepoResult<Conversation> {
        sqlx::query_as::<_, Conversation>(&format!("SELECT {CONVERSATION_COLS} FROM conversations WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn list_conversations_for_user(&self, user: Id) -> RepoResult<Vec<Conversation>> {
        sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLS} FROM conversations WHERE user1 = $1 OR user2 = $1 ORDER BY created_at DESC"
        ))
            .bind(user)
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn create_message(&self, conversation_id: Id, sender: Id, content: String) -> RepoResult<Message> {
        sqlx::query_as::<_, Message>(&format!(r#"
            INSERT INTO messages (id, conversation_id, sender, content, unread)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {MESSAGE_COLS}
        "#))
            .bind(Uuid::new_v4())
            .bind(conversation_id)
            .bind(sender)
            .bind(content)
            .fetch_one(&self.pool).await
            .map_err(|e| match map_err(e) { RepoError::Conflict => RepoError::NotFound, other => other })
    }

    async fn list_messages(&self, conversation_id: Id) -> RepoResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLS} FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC"
        ))
            .bind(conversation_id)
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn mark_messages_read(&self, conversation_id: Id, reader: Id) -> RepoResult<u64> {
        let res = sqlx::query(
            "UPDATE messages SET unread = FALSE WHERE conversation_id = $1 AND sender <> $2 AND unread"
        )
            .bind(conversation_id)
            .bind(reader)
            .execute(&self.pool).await.map_err(map_err)?;
        Ok(res.rows_affected())
    }

    async fn count_unread_messages(&self, user: Id) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(r#"
            SELECT COUNT(*) FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE m.unread AND m.sender <> $1 AND (c.user1 = $1 OR c.user2 = $1)
        "#)
            .bind(user)
            .fetch_one(&self.pool).await.map_err(map_err)
    }
}

#[async_trait]
impl AdRepo for PgRepo {
    async fn list_ad_slots(&self) -> RepoResult<Vec<AdSlot>> {
        sqlx::query_as::<_, AdSlot>(&format!("SELECT {SLOT_COLS} FROM ad_slots ORDER BY name"))
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn get_ad_slot(&self, id: Id) -> RepoResult<AdSlot> {
        sqlx::query_as::<_, AdSlot>(&format!("SELECT {SLOT_COLS} FROM ad_slots WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn create_ad_slot(&self, new: NewAdSlot) -> RepoResult<AdSlot> {
        sqlx::query_as::<_, AdSlot>(&format!(
            "INSERT INTO ad_slots (id, name, description, price, is_active) VALUES ($1, $2, $3, $4, $5) RETURNING {SLOT_COLS}"
        ))
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.price)
            .bind(new.is_active)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn update_ad_slot(&self, id: Id, upd: UpdateAdSlot) -> RepoResult<AdSlot> {
        sqlx::query_as::<_, AdSlot>(&format!(r#"
            UPDATE ad_slots SET name = COALESCE($2, name), description = COALESCE($3, description),
                   price = COALESCE($4, price), is_active = COALESCE($5, is_active)
            WHERE id = $1
            RETURNING {SLOT_COLS}
        "#))
            .bind(id)
            .bind(upd.name)
            .bind(upd.description)
            .bind(upd.price)
            .bind(upd.is_active)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn delete_ad_slot(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM ad_slots WHERE id = $1")
            .bind(id)
            .execute(&self.pool).await.map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }

    async fn list_ads(&self) -> RepoResult<Vec<Ad>> {
        sqlx::query_as::<_, Ad>(&format!("SELECT {AD_COLS} FROM ads ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn list_ads_for_client(&self, client_id: Id) -> RepoResult<Vec<Ad>> {
        sqlx::query_as::<_, Ad>(&format!("SELECT {AD_COLS} FROM ads WHERE client_id = $1 ORDER BY created_at DESC"))
            .bind(client_id)
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn get_ad(&self, id: Id) -> RepoResult<Ad> {
        sqlx::query_as::<_, Ad>(&format!("SELECT {AD_COLS} FROM ads WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn create_ad(&self, client_id: Id, new: NewAd) -> RepoResult<Ad> {
        if !self.exists("ad_slots", new.slot_id).await? { return Err(RepoError::NotFound); }
        sqlx::query_as::<_, Ad>(&format!(r#"
            INSERT INTO ads (id, slot_id, client_id, image_url, link_url, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING {AD_COLS}
        "#))
            .bind(Uuid::new_v4())
            .bind(new.slot_id)
            .bind(client_id)
            .bind(&new.image_url)
            .bind(&new.link_url)
            .bind(new.start_date)
            .bind(new.end_date)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn update_ad(&self, id: Id, upd: UpdateAd) -> RepoResult<Ad> {
        sqlx::query_as::<_, Ad>(&format!(r#"
            UPDATE ads SET image_url = COALESCE($2, image_url), link_url = COALESCE($3, link_url),
                   start_date = COALESCE($4, start_date), end_date = COALESCE($5, end_date)
            WHERE id = $1
            RETURNING {AD_COLS}
        "#))
            .bind(id)
            .bind(upd.image_url)
            .bind(upd.link_url)
            .bind(upd.start_date)
            .bind(upd.end_date)
            .fetch_one(&self.pool).await.map_err(map_err)
    }

    async fn set_ad_status(&self, id: Id, status: AdStatus) -> RepoResult<Ad> {
        if !AdStatus::Pending.can_transition_to(status) { return Err(RepoError::Conflict); }
        let updated = sqlx::query_as::<_, Ad>(&format!(
            "UPDATE ads SET status = $2 WHERE id = $1 AND status = 'pending' RETURNING {AD_COLS}"
        ))
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool).await.map_err(map_err)?;
        match updated {
            Some(ad) => Ok(ad),
            None if self.exists("ads", id).await? => Err(RepoError::Conflict),
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete_ad(&self, id: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query("DELETE FROM ad_analytics WHERE ad_id = $1")
            .bind(id)
            .execute(&mut *tx).await.map_err(map_err)?;
        let res = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx).await.map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn live_ads(&self, day: NaiveDate, limit: usize) -> RepoResult<Vec<Ad>> {
        sqlx::query_as::<_, Ad>(&format!(r#"
            SELECT {AD_COLS} FROM ads
            WHERE status = 'approved' AND start_date <= $1 AND end_date >= $1
            ORDER BY created_at
            LIMIT $2
        "#))
            .bind(day)
            .bind(limit as i64)
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn expire_ads(&self, day: NaiveDate) -> RepoResult<u64> {
        let res = sqlx::query("UPDATE ads SET status = 'expired' WHERE status = 'approved' AND end_date < $1")
            .bind(day)
            .execute(&self.pool).await.map_err(map_err)?;
        Ok(res.rows_affected())
    }

    async fn list_ad_analytics(&self) -> RepoResult<Vec<AdAnalytics>> {
        sqlx::query_as::<_, AdAnalytics>(&format!("SELECT {ANALYTICS_COLS} FROM ad_analytics"))
            .fetch_all(&self.pool).await.map_err(map_err)
    }

    async fn record_impression(&self, ad_id: Id) -> RepoResult<AdAnalytics> {
        self.bump(ad_id, "impressions").await
    }

    async fn record_click(&self, ad_id: Id) -> RepoResult<AdAnalytics> {
        self.bump(ad_id, "clicks").await
    }
}

impl PgRepo {
    async fn bump(&self, ad_id: Id, counter: &'static str) -> RepoResult<AdAnalytics> {
        let sql = format!(r#"
            INSERT INTO ad_analytics (id, ad_id, {counter}) VALUES ($1, $2, 1)
            ON CONFLICT (ad_id) DO UPDATE SET {counter} = ad_analytics.{counter} + 1, last_updated = now()
            RETURNING {ANALYTICS_COLS}
        "#);
        sqlx::query_as::<_, AdAnalytics>(&sql)
            .bind(Uuid::new_v4())
            .bind(ad_id)
            .fetch_one(&self.pool).await
            // a missing ad surfaces as a foreign key violation
            .map_err(|e| match map_err(e) { RepoError::Conflict => RepoError::NotFound, other => other })
    }
}
