//! Reduction of raw search API responses into comparison figures.

use dining_atlas_summary_models::{
    Average, DISTRIBUTION_SIZE, FacetCounter, RunningAverage, TOP_CATEGORY_COUNT,
};
use serde::Serialize;
use serde_json::Value;

/// Reviews kept per business.
pub const REVIEW_EXCERPT_COUNT: usize = 3;

/// Converts a `"$$"`-style price symbol to a numeric tier.
///
/// Returns `None` when the symbol holds no `$`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn price_tier_from_symbol(symbol: &str) -> Option<f64> {
    let tier = symbol.chars().filter(|c| *c == '$').count();
    (tier > 0).then_some(tier as f64)
}

/// Renders an average price tier back to a `"$$"`-style symbol.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn price_symbol(average: Average) -> Option<String> {
    let tier = average.value()?.round();
    if tier < 1.0 {
        return None;
    }
    Some("$".repeat(tier as usize))
}

/// One listing from a search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Provider business id.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Star rating.
    pub rating: Option<f64>,
    /// Number of reviews.
    pub review_count: Option<u64>,
    /// Numeric price tier.
    pub price_tier: Option<f64>,
    /// Category titles.
    pub categories: Vec<String>,
}

impl Listing {
    /// Reads one listing object. Missing or mistyped fields become `None`.
    #[must_use]
    pub fn from_json(item: &Value) -> Self {
        let text = |key: &str| item.get(key).and_then(Value::as_str).map(String::from);

        Self {
            id: text("id"),
            name: text("name"),
            rating: item.get("rating").and_then(Value::as_f64),
            review_count: item.get("review_count").and_then(Value::as_u64),
            price_tier: item
                .get("price")
                .and_then(Value::as_str)
                .and_then(price_tier_from_symbol),
            categories: item
                .get("categories")
                .and_then(Value::as_array)
                .map(|cats| {
                    cats.iter()
                        .filter_map(|c| c.get("title").and_then(Value::as_str))
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// The most reviewed listing of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopBusiness {
    /// Provider business id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Number of reviews.
    pub review_count: u64,
}

/// Aggregate figures for one search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    /// Listings in the response.
    pub listings: usize,
    /// Mean review count over listings that report one.
    pub average_review_count: Average,
    /// Mean rating over listings that report one.
    pub average_rating: Average,
    /// Mean price tier over listings that report a price.
    pub average_price: Average,
    /// Up to three categories by listing count.
    pub top_categories: Vec<String>,
    /// Up to ten categories with their listing counts.
    pub category_distribution: Vec<(String, u64)>,
    /// Listing with the most reviews; the first one wins ties.
    pub top_business: Option<TopBusiness>,
}

impl SearchSummary {
    /// Reduces a search response (`{"businesses": [...]}`).
    ///
    /// A response without a `businesses` array is treated as empty.
    #[must_use]
    pub fn from_response(response: &Value) -> Self {
        let listings: Vec<Listing> = response
            .get("businesses")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Listing::from_json).collect())
            .unwrap_or_default();
        Self::from_listings(&listings)
    }

    /// Reduces already parsed listings.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_listings(listings: &[Listing]) -> Self {
        let mut reviews = RunningAverage::default();
        let mut rating = RunningAverage::default();
        let mut price = RunningAverage::default();
        let mut categories = FacetCounter::new();
        let mut top_business: Option<TopBusiness> = None;

        for listing in listings {
            if let Some(count) = listing.review_count {
                reviews.push(count as f64);
            }
            if let Some(r) = listing.rating {
                rating.push(r);
            }
            if let Some(tier) = listing.price_tier {
                price.push(tier);
            }
            for category in &listing.categories {
                categories.increment(category);
            }

            if let (Some(id), Some(count)) = (&listing.id, listing.review_count) {
                if top_business.as_ref().is_none_or(|top| count > top.review_count) {
                    top_business = Some(TopBusiness {
                        id: id.clone(),
                        name: listing.name.clone(),
                        review_count: count,
                    });
                }
            }
        }

        Self {
            listings: listings.len(),
            average_review_count: reviews.finish(),
            average_rating: rating.finish(),
            average_price: price.finish(),
            top_categories: categories.top(TOP_CATEGORY_COUNT),
            category_distribution: categories.top_counts(DISTRIBUTION_SIZE),
            top_business,
        }
    }

    /// The average price as a `"$$"`-style symbol.
    #[must_use]
    pub fn price_symbol(&self) -> Option<String> {
        price_symbol(self.average_price)
    }
}

/// One review shown alongside a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewExcerpt {
    /// Star rating given.
    pub rating: Option<f64>,
    /// Review text.
    pub text: Option<String>,
    /// Reviewer display name.
    pub reviewer: Option<String>,
}

impl ReviewExcerpt {
    /// The first [`REVIEW_EXCERPT_COUNT`] reviews of a reviews response
    /// (`{"reviews": [...]}`).
    #[must_use]
    pub fn from_response(response: &Value) -> Vec<Self> {
        response
            .get("reviews")
            .and_then(Value::as_array)
            .map(|reviews| {
                reviews
                    .iter()
                    .take(REVIEW_EXCERPT_COUNT)
                    .map(|r| Self {
                        rating: r.get("rating").and_then(Value::as_f64),
                        text: r.get("text").and_then(Value::as_str).map(String::from),
                        reviewer: r
                            .get("user")
                            .and_then(|u| u.get("name"))
                            .and_then(Value::as_str)
                            .map(String::from),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Details of one business.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetails {
    /// Provider business id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Star rating.
    pub rating: Option<f64>,
    /// Price symbol as reported.
    pub price: Option<String>,
    /// Listing page URL.
    pub url: Option<String>,
}

impl BusinessDetails {
    /// Reads a business details response.
    #[must_use]
    pub fn from_response(business_id: &str, response: &Value) -> Self {
        let text = |key: &str| response.get(key).and_then(Value::as_str).map(String::from);
        Self {
            id: text("id").unwrap_or_else(|| business_id.to_string()),
            name: text("name"),
            rating: response.get("rating").and_then(Value::as_f64),
            price: text("price"),
            url: text("url"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "total": 4,
            "businesses": [
                {
                    "id": "a", "name": "Thai Tom", "rating": 4.5, "review_count": 120,
                    "price": "$",
                    "categories": [{"alias": "thai", "title": "Thai"}]
                },
                {
                    "id": "b", "name": "Pestle Rock", "rating": 4.0, "review_count": 300,
                    "price": "$$$",
                    "categories": [{"title": "Thai"}, {"title": "Cocktail Bars"}]
                },
                {
                    "id": "c", "name": "Noodle Hut", "rating": 3.5, "review_count": 300,
                    "categories": [{"title": "Noodles"}, {"title": "Cocktail Bars"}]
                },
                {
                    "id": "d", "name": "Kin Dee", "review_count": 30, "price": "$$",
                    "categories": [{"title": "Vegan"}]
                }
            ]
        })
    }

    #[test]
    fn averages_over_reported_values() {
        let summary = SearchSummary::from_response(&response());
        assert_eq!(summary.listings, 4);
        assert_eq!(summary.average_review_count.to_string(), "187.50");
        assert_eq!(summary.average_rating.to_string(), "4.00");
        assert_eq!(summary.average_price.to_string(), "2.00");
        assert_eq!(summary.price_symbol().as_deref(), Some("$$"));
    }

    #[test]
    fn top_categories_break_ties_by_first_seen() {
        let summary = SearchSummary::from_response(&response());
        assert_eq!(
            summary.top_categories,
            vec!["Thai", "Cocktail Bars", "Noodles"]
        );
        assert_eq!(summary.category_distribution.len(), 4);
        assert_eq!(summary.category_distribution[0], ("Thai".to_string(), 2));
    }

    #[test]
    fn first_most_reviewed_business_wins() {
        let summary = SearchSummary::from_response(&response());
        let top = summary.top_business.unwrap();
        assert_eq!(top.id, "b");
        assert_eq!(top.review_count, 300);
    }

    #[test]
    fn empty_response_has_no_data() {
        let summary = SearchSummary::from_response(&json!({"error": {"code": "X"}}));
        assert_eq!(summary.listings, 0);
        assert_eq!(summary.average_rating, Average::NotAvailable);
        assert!(summary.top_business.is_none());
        assert!(summary.price_symbol().is_none());
    }

    #[test]
    fn price_symbols_convert() {
        assert_eq!(price_tier_from_symbol("$$"), Some(2.0));
        assert_eq!(price_tier_from_symbol(""), None);
        assert_eq!(price_symbol(Average::Value(2.6)).as_deref(), Some("$$$"));
    }

    #[test]
    fn keeps_first_three_reviews() {
        let reviews = ReviewExcerpt::from_response(&json!({
            "reviews": [
                {"rating": 5, "text": "Great", "user": {"name": "Ana"}},
                {"rating": 4, "text": "Good", "user": {"name": "Bo"}},
                {"rating": 2, "text": "Meh", "user": {}},
                {"rating": 1, "text": "Bad", "user": {"name": "Di"}}
            ]
        }));
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[0].reviewer.as_deref(), Some("Ana"));
        assert_eq!(reviews[0].rating, Some(5.0));
        assert_eq!(reviews[2].reviewer, None);
    }

    #[test]
    fn business_details_fall_back_to_requested_id() {
        let details = BusinessDetails::from_response(
            "xyz",
            &json!({"name": "Thai Tom", "rating": 4.5, "url": "https://example.com/tt"}),
        );
        assert_eq!(details.id, "xyz");
        assert_eq!(details.name.as_deref(), Some("Thai Tom"));
        assert_eq!(details.price, None);
    }
}
