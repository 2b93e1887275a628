//! Explore-page filtering. The creative list is small, so this is a plain
//! in-memory pass over every profile.

use std::collections::HashMap;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::models::{CreativeListing, Id, Profile, RatingSummary};

/// Value the explore page sends for "no filter".
const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriceBand {
    Low,
    Mid,
    High,
}

impl PriceBand {
    pub fn contains(self, price: i64) -> bool {
        match self {
            PriceBand::Low => price <= 500,
            PriceBand::Mid => price > 500 && price <= 1000,
            PriceBand::High => price > 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExploreQuery {
    /// Matches name, specialties or location (case-insensitive substring).
    pub q: Option<String>,
    pub specialty: Option<String>,
    pub location: Option<String>,
    pub min_rating: Option<f64>,
    #[param(value_type = Option<String>)]
    pub price: Option<PriceBand>,
    pub featured: Option<bool>,
}

fn selected(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != ALL)
}

impl ExploreQuery {
    pub fn matches(&self, p: &Profile, rating: Option<f64>) -> bool {
        if p.is_banned() {
            return false;
        }
        if let Some(q) = selected(&self.q) {
            let q = q.to_lowercase();
            let hit = p.name.as_deref().unwrap_or("").to_lowercase().contains(&q)
                || p.specialties.join(",").to_lowercase().contains(&q)
                || p.location.as_deref().unwrap_or("").to_lowercase().contains(&q);
            if !hit { return false; }
        }
        if let Some(s) = selected(&self.specialty) {
            if !p.specialties.iter().any(|x| x == s) { return false; }
        }
        if let Some(l) = selected(&self.location) {
            if p.location.as_deref() != Some(l) { return false; }
        }
        if let Some(min) = self.min_rating {
            match rating {
                Some(r) if r >= min => {}
                _ => return false,
            }
        }
        if let Some(band) = self.price {
            match p.price {
                Some(price) if band.contains(price) => {}
                _ => return false,
            }
        }
        if self.featured == Some(true) && !p.featured {
            return false;
        }
        true
    }
}

/// Join ratings onto profiles and keep the ones matching `query`, preserving input order.
pub fn explore(profiles: Vec<Profile>, ratings: &[RatingSummary], query: &ExploreQuery) -> Vec<CreativeListing> {
    let by_id: HashMap<Id, &RatingSummary> = ratings.iter().map(|r| (r.creative_id, r)).collect();
    profiles
        .into_iter()
        .filter_map(|profile| {
            let summary = by_id.get(&profile.id);
            let rating = summary.and_then(|s| s.average);
            if !query.matches(&profile, rating) {
                return None;
            }
            Some(CreativeListing {
                review_count: summary.map(|s| s.count).unwrap_or(0),
                rating,
                profile,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProfileStatus, ProfileUpdate};
    use uuid::Uuid;

    fn creative(name: &str, specialty: &str, location: &str, price: Option<i64>) -> Profile {
        let mut p = Profile::empty(Uuid::new_v4(), false);
        p.apply(ProfileUpdate {
            name: Some(name.into()),
            specialties: Some(vec![specialty.into()]),
            location: Some(location.into()),
            price,
            ..Default::default()
        });
        p
    }

    fn sample() -> Vec<Profile> {
        vec![
            creative("Thandi Photo", "Photographer", "Cape Town", Some(450)),
            creative("Reel Nomad", "Videographer", "Durban", Some(900)),
            creative("Glam Co", "Makeup Artist", "Cape Town", Some(1500)),
        ]
    }

    #[test]
    fn empty_query_keeps_everyone() {
        let out = explore(sample(), &[], &ExploreQuery::default());
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|c| c.rating.is_none() && c.review_count == 0));
    }

    #[test]
    fn text_search_spans_name_specialty_location() {
        let q = |s: &str| ExploreQuery { q: Some(s.into()), ..Default::default() };
        assert_eq!(explore(sample(), &[], &q("thandi")).len(), 1);
        assert_eq!(explore(sample(), &[], &q("VIDEO")).len(), 1);
        assert_eq!(explore(sample(), &[], &q("cape")).len(), 2);
    }

    #[test]
    fn all_means_no_filter() {
        let q = ExploreQuery { specialty: Some("All".into()), location: Some("All".into()), ..Default::default() };
        assert_eq!(explore(sample(), &[], &q).len(), 3);
        let q = ExploreQuery { location: Some("Cape Town".into()), specialty: Some("Makeup Artist".into()), ..Default::default() };
        let out = explore(sample(), &[], &q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].profile.name.as_deref(), Some("Glam Co"));
    }

    #[test]
    fn price_bands() {
        let band = |b| ExploreQuery { price: Some(b), ..Default::default() };
        assert_eq!(explore(sample(), &[], &band(PriceBand::Low)).len(), 1);
        assert_eq!(explore(sample(), &[], &band(PriceBand::Mid)).len(), 1);
        assert_eq!(explore(sample(), &[], &band(PriceBand::High)).len(), 1);
        assert!(PriceBand::Low.contains(500));
        assert!(PriceBand::Mid.contains(1000));
        assert!(!PriceBand::Mid.contains(500));
    }

    #[test]
    fn min_rating_excludes_unrated() {
        let profiles = sample();
        let rated = RatingSummary { creative_id: profiles[1].id, average: Some(4.5), count: 2 };
        let q = ExploreQuery { min_rating: Some(4.0), ..Default::default() };
        let out = explore(profiles, &[rated], &q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].review_count, 2);
    }

    #[test]
    fn banned_profiles_are_hidden() {
        let mut profiles = sample();
        profiles[0].status = ProfileStatus::Banned;
        assert_eq!(explore(profiles, &[], &ExploreQuery::default()).len(), 2);
    }

    #[test]
    fn featured_filter_only_when_true() {
        let mut profiles = sample();
        profiles[2].featured = true;
        let q = ExploreQuery { featured: Some(true), ..Default::default() };
        let out = explore(profiles.clone(), &[], &q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].profile.name.as_deref(), Some("Glam Co"));
        let q = ExploreQuery { featured: Some(false), ..Default::default() };
        assert_eq!(explore(profiles, &[], &q).len(), 3);
    }
}
