//! Catalog filter parsed from query parameters.
//!
//! Every predicate is optional and they commute: a product matches when it
//! satisfies each predicate that was requested. Repositories may use the
//! filter to narrow a query, but [`CatalogFilter::matches`] is the definition
//! of what a match is.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use furnish_core::ProductId;

use super::{FurnitureDetails, Identity, Product};

/// How the `brand` parameter is compared with a product's brand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandMatch {
    /// Exact, case-sensitive comparison.
    #[default]
    Exact,
    /// Case-insensitive substring.
    Contains,
}

impl FromStr for BrandMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            other => Err(format!("expected 'exact' or 'contains', got '{other}'")),
        }
    }
}

/// A query parameter that could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid value '{value}' for '{param}'")]
pub struct FilterError {
    pub param: String,
    pub value: String,
}

/// Faceted product filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// Category slugs; a product matches any of them.
    pub categories: Vec<String>,
    /// Collection slugs.
    pub collections: Vec<String>,
    /// Color names.
    pub colors: Vec<String>,
    /// Material names.
    pub materials: Vec<String>,
    pub brand: Option<String>,
    pub brand_match: BrandMatch,
    pub fast_delivery: Option<bool>,
    pub min_total_price: Option<Decimal>,
    pub max_total_price: Option<Decimal>,
    pub weight_min: Option<Decimal>,
    pub weight_max: Option<Decimal>,
    pub warranty_min: Option<i32>,
    pub warranty_max: Option<i32>,
    pub min_rating: Option<Decimal>,
    pub max_rating: Option<Decimal>,
    pub is_favorited: bool,
    pub in_stock: bool,
    pub name: Option<String>,
    pub search: Option<String>,
    pub details: FurnitureDetails,
}

impl CatalogFilter {
    /// Parse a raw query string such as `category=sofas,beds&in_stock=true`.
    ///
    /// List parameters may be repeated or comma-separated. Empty values are
    /// ignored, unknown parameters too.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] when a numeric or boolean parameter cannot be
    /// parsed.
    pub fn from_query(query: &str) -> Result<Self, FilterError> {
        let mut filter = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_ref() {
                "category" => push_list(&mut filter.categories, value),
                "collection" => push_list(&mut filter.collections, value),
                "color" => push_list(&mut filter.colors, value),
                "material" => push_list(&mut filter.materials, value),
                "brand" => filter.brand = Some(value.to_owned()),
                "fast_delivery" => filter.fast_delivery = Some(parse_bool(&key, value)?),
                "min_total_price" => filter.min_total_price = Some(parse_number(&key, value)?),
                "max_total_price" => filter.max_total_price = Some(parse_number(&key, value)?),
                "weight_min" => filter.weight_min = Some(parse_number(&key, value)?),
                "weight_max" => filter.weight_max = Some(parse_number(&key, value)?),
                "warranty_min" => filter.warranty_min = Some(parse_number(&key, value)?),
                "warranty_max" => filter.warranty_max = Some(parse_number(&key, value)?),
                "min_rating" => filter.min_rating = Some(parse_number(&key, value)?),
                "max_rating" => filter.max_rating = Some(parse_number(&key, value)?),
                "is_favorited" => filter.is_favorited = parse_bool(&key, value)?,
                "in_stock" => filter.in_stock = parse_bool(&key, value)?,
                "name" => filter.name = Some(value.to_owned()),
                "search" => filter.search = Some(value.to_owned()),
                "purpose" => filter.details.purpose = Some(value.to_owned()),
                "furniture_type" => filter.details.furniture_type = Some(value.to_owned()),
                "construction" => filter.details.construction = Some(value.to_owned()),
                "swing_mechanism" => filter.details.swing_mechanism = Some(value.to_owned()),
                "armrest_adjustment" => {
                    filter.details.armrest_adjustment = Some(value.to_owned());
                }
                _ => {}
            }
        }

        Ok(filter)
    }

    /// Set the brand comparison mode.
    #[must_use]
    pub const fn with_brand_match(mut self, brand_match: BrandMatch) -> Self {
        self.brand_match = brand_match;
        self
    }

    /// Whether `product` satisfies every requested predicate.
    ///
    /// `favorites` only matters for an authenticated `identity`; anonymous
    /// callers asking for favorites get the unfiltered set.
    #[must_use]
    pub fn matches(
        &self,
        product: &Product,
        identity: Identity,
        favorites: &BTreeSet<ProductId>,
        now: DateTime<Utc>,
    ) -> bool {
        self.matches_facets(product)
            && self.matches_ranges(product, now)
            && self.matches_text(product)
            && (!self.in_stock || product.in_stock())
            && (!self.is_favorited
                || !identity.is_authenticated()
                || favorites.contains(&product.id))
    }

    fn matches_facets(&self, product: &Product) -> bool {
        any_of(&self.categories, Some(&product.category.slug))
            && any_of(
                &self.collections,
                product.collection.as_ref().map(|c| &c.slug),
            )
            && any_of(&self.colors, product.color.as_ref().map(|c| &c.name))
            && any_of(&self.materials, product.material.as_ref().map(|m| &m.name))
            && self.brand.as_deref().is_none_or(|wanted| {
                product
                    .brand
                    .as_deref()
                    .is_some_and(|brand| self.brand_matches(wanted, brand))
            })
            && self
                .fast_delivery
                .is_none_or(|wanted| product.fast_delivery == wanted)
            && exact(
                self.details.purpose.as_ref(),
                product.details.purpose.as_ref(),
            )
            && exact(
                self.details.furniture_type.as_ref(),
                product.details.furniture_type.as_ref(),
            )
            && exact(
                self.details.construction.as_ref(),
                product.details.construction.as_ref(),
            )
            && exact(
                self.details.swing_mechanism.as_ref(),
                product.details.swing_mechanism.as_ref(),
            )
            && exact(
                self.details.armrest_adjustment.as_ref(),
                product.details.armrest_adjustment.as_ref(),
            )
    }

    fn matches_ranges(&self, product: &Product, now: DateTime<Utc>) -> bool {
        let price_ok = (self.min_total_price.is_none() && self.max_total_price.is_none())
            || product
                .price_at(now)
                .matches_range(self.min_total_price, self.max_total_price);

        price_ok
            && in_range(product.weight, self.weight_min, self.weight_max)
            && in_range(product.warranty, self.warranty_min, self.warranty_max)
            && in_range(product.rating, self.min_rating, self.max_rating)
    }

    /// `name` is one substring; `search` is split on whitespace and every
    /// term must occur in the name.
    fn matches_text(&self, product: &Product) -> bool {
        let name = product.name.to_lowercase();
        let terms = self.search.as_deref().map(str::split_whitespace);
        self.name
            .as_deref()
            .into_iter()
            .chain(terms.into_iter().flatten())
            .all(|needle| name.contains(&needle.to_lowercase()))
    }

    fn brand_matches(&self, wanted: &str, brand: &str) -> bool {
        match self.brand_match {
            BrandMatch::Exact => brand == wanted,
            BrandMatch::Contains => brand.to_lowercase().contains(&wanted.to_lowercase()),
        }
    }
}

fn push_list(target: &mut Vec<String>, value: &str) {
    target.extend(
        value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned),
    );
}

fn parse_bool(param: &str, value: &str) -> Result<bool, FilterError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(FilterError {
            param: param.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn parse_number<T: FromStr>(param: &str, value: &str) -> Result<T, FilterError> {
    value.parse().map_err(|_| FilterError {
        param: param.to_owned(),
        value: value.to_owned(),
    })
}

/// An empty list accepts everything; otherwise the value must be one of the
/// listed ones.
fn any_of(wanted: &[String], value: Option<&String>) -> bool {
    wanted.is_empty() || value.is_some_and(|v| wanted.contains(v))
}

fn exact(wanted: Option<&String>, value: Option<&String>) -> bool {
    wanted.is_none_or(|w| value == Some(w))
}

/// Products without a value never match a requested bound.
fn in_range<T: PartialOrd + Copy>(value: Option<T>, min: Option<T>, max: Option<T>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    value.is_some_and(|v| min.is_none_or(|lo| v >= lo) && max.is_none_or(|hi| v <= hi))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use furnish_core::{CategoryId, Discount, DiscountId};

    use super::*;
    use crate::models::{Category, ProductImages};

    fn product(id: i32, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            article: format!("ART-{id}"),
            name: format!("Sofa {id}"),
            product_type: None,
            category: Category {
                id: CategoryId::new(1),
                name: "Sofas".to_owned(),
                slug: "sofas".to_owned(),
            },
            collection: None,
            color: None,
            material: None,
            legs_material: None,
            brand: Some("Nordhaus".to_owned()),
            country: None,
            width: None,
            height: None,
            length: None,
            weight: None,
            warranty: None,
            fast_delivery: false,
            description: String::new(),
            price: Decimal::from(price),
            details: FurnitureDetails::default(),
            images: ProductImages::default(),
            available_quantity: 0,
            rating: None,
            discounts: Vec::new(),
        }
    }

    fn matches(filter: &CatalogFilter, product: &Product) -> bool {
        filter.matches(product, Identity::Anonymous, &BTreeSet::new(), Utc::now())
    }

    #[test]
    fn test_parse_lists_repeated_and_comma_separated() {
        let filter = CatalogFilter::from_query("category=sofas,beds&category=chairs&color=").unwrap();
        assert_eq!(filter.categories, vec!["sofas", "beds", "chairs"]);
        assert!(filter.colors.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_number() {
        let err = CatalogFilter::from_query("min_total_price=cheap").unwrap_err();
        assert_eq!(err.param, "min_total_price");
    }

    #[test]
    fn test_parse_decodes_percent_encoding() {
        let filter = CatalogFilter::from_query("name=corner%20sofa&in_stock=True").unwrap();
        assert_eq!(filter.name.as_deref(), Some("corner sofa"));
        assert!(filter.in_stock);
    }

    #[test]
    fn test_in_stock_boundary() {
        let filter = CatalogFilter::from_query("in_stock=true").unwrap();
        let mut p = product(1, 100);
        assert!(!matches(&filter, &p));
        p.available_quantity = 1;
        assert!(matches(&filter, &p));
    }

    #[test]
    fn test_price_range_uses_list_or_discounted_price() {
        let filter =
            CatalogFilter::from_query("min_total_price=100&max_total_price=200").unwrap();
        let now = Utc::now();

        let mut discounted = product(2, 250);
        discounted.discounts.push(Discount {
            id: DiscountId::new(1),
            discount: Decimal::from(50),
            created_at: now - Duration::days(1),
            end_at: now + Duration::days(1),
        });

        assert!(matches(&filter, &product(1, 150)));
        assert!(matches(&filter, &discounted));
        assert!(!matches(&filter, &product(3, 300)));
    }

    #[test]
    fn test_rating_bound_excludes_unrated() {
        let filter = CatalogFilter::from_query("min_rating=1").unwrap();
        let mut p = product(1, 100);
        assert!(!matches(&filter, &p));
        p.rating = Some(Decimal::new(45, 1));
        assert!(matches(&filter, &p));
    }

    #[test]
    fn test_favorites_only_apply_to_users() {
        let filter = CatalogFilter::from_query("is_favorited=true").unwrap();
        let p = product(5, 100);
        let none = BTreeSet::new();
        let now = Utc::now();

        assert!(filter.matches(&p, Identity::Anonymous, &none, now));
        let user = Identity::User(furnish_core::UserId::new(1));
        assert!(!filter.matches(&p, user, &none, now));
        assert!(filter.matches(&p, user, &BTreeSet::from([p.id]), now));
    }

    #[test]
    fn test_brand_match_modes() {
        let p = product(1, 100);
        let exact = CatalogFilter::from_query("brand=nord").unwrap();
        assert!(!matches(&exact, &p));

        let contains = exact.with_brand_match(BrandMatch::Contains);
        assert!(matches(&contains, &p));
    }

    #[test]
    fn test_name_is_case_insensitive_substring() {
        let filter = CatalogFilter::from_query("name=SOFA").unwrap();
        assert!(matches(&filter, &product(1, 100)));
        let filter = CatalogFilter::from_query("search=bed").unwrap();
        assert!(!matches(&filter, &product(1, 100)));
    }

    #[test]
    fn test_search_requires_every_term() {
        let mut sofa = product(1, 100);
        sofa.name = "Oslo Grey sofa".to_owned();

        for query in ["search=oslo+grey", "search=sofa%20%20OSLO", "search=grey"] {
            let filter = CatalogFilter::from_query(query).unwrap();
            assert!(matches(&filter, &sofa), "{query}");
        }
        for query in ["search=oslo+green", "search=grey+bed", "name=oslo+sofa"] {
            let filter = CatalogFilter::from_query(query).unwrap();
            assert!(!matches(&filter, &sofa), "{query}");
        }
    }
}
