//! Domain model for restaurant reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review of a restaurant.
///
/// `id` is assigned by the server; a review created locally while offline
/// carries `id: None` until its POST is replayed and the server response is
/// reconciled back into the store. Timestamps travel as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub restaurant_id: i64,
    pub name: String,
    pub rating: u8,
    pub comments: String,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// User-entered fields of a new review, before timestamps are stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    pub restaurant_id: i64,
    pub name: String,
    pub rating: u8,
    pub comments: String,
}

impl ReviewDraft {
    /// Stamp the draft into a full (not yet server-acknowledged) review.
    pub fn into_review(self, now: DateTime<Utc>) -> Review {
        Review {
            id: None,
            restaurant_id: self.restaurant_id,
            name: self.name,
            rating: self.rating,
            comments: self.comments,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Valid rating range accepted by the API.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn review_timestamps_round_trip_as_millis() {
        let created = Utc.timestamp_millis_opt(1_546_300_800_000).unwrap();
        let review = Review {
            id: Some(42),
            restaurant_id: 3,
            name: "Ada".to_string(),
            rating: 5,
            comments: "Great bibimbap.".to_string(),
            created_at: created,
            updated_at: created,
        };

        let json = serde_json::to_string(&review).unwrap();
        assert!(json.contains("\"createdAt\":1546300800000"));

        let back: Review = serde_json::from_str(&json).unwrap();
        assert_eq!(back, review);
    }

    #[test]
    fn pending_review_omits_id() {
        let draft = ReviewDraft {
            restaurant_id: 1,
            name: "Grace".to_string(),
            rating: 4,
            comments: "Solid.".to_string(),
        };
        let review = draft.into_review(Utc::now());
        let json = serde_json::to_string(&review).unwrap();
        assert!(!json.contains("\"id\""));
        assert_eq!(review.created_at, review.updated_at);
    }
}
