//! Line pricing for order placement.
//!
//! Pure arithmetic, separated from the transaction so it can be tested at
//! memory speed. Prices always come from the catalog rows loaded inside
//! the placement transaction; client-supplied prices are never consulted.
//! All amounts are [`Decimal`] fixed at 2 fractional digits.

use crate::catalog::Product;
use crate::types::ProductId;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// A requested line: what the caller (or their cart) asked for.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestedLine {
    /// Product to order.
    pub product_id: ProductId,
    /// Number of units, at least 1.
    pub quantity: i32,
    /// Chosen specification options (opaque document).
    #[serde(default = "empty_specifications")]
    pub specifications: Value,
}

fn empty_specifications() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A priced line: the requested line plus catalog price and line total.
#[derive(Debug, Clone)]
pub struct PricedLine {
    /// Product being ordered.
    pub product_id: ProductId,
    /// Product name at order time.
    pub product_name: String,
    /// Number of units.
    pub quantity: i32,
    /// Catalog unit price at order time.
    pub unit_price: Decimal,
    /// `unit_price × quantity`, 2 fractional digits.
    pub total: Decimal,
    /// Specification snapshot.
    pub specifications: Value,
}

/// Result of pricing a full request.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    /// Priced lines, in request order.
    pub lines: Vec<PricedLine>,
    /// Exact sum of line totals, 2 fractional digits.
    pub total: Decimal,
}

/// Why a request could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// One or more lines reference products that do not exist.
    #[error("Products not found: {}", format_ids(.0))]
    UnknownProducts(Vec<ProductId>),
    /// A line asked for fewer than one unit.
    #[error("Quantity must be at least 1")]
    InvalidQuantity {
        /// Product on the offending line.
        product_id: ProductId,
    },
}

fn format_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Price the requested lines against the catalog rows loaded for them.
///
/// Every line must resolve to a product; unknown references fail the whole
/// request with the full list of offending ids rather than silently
/// shrinking the order.
///
/// # Errors
///
/// [`PricingError::UnknownProducts`] if any line references a product
/// missing from `products`; [`PricingError::InvalidQuantity`] if any line
/// has a quantity below 1.
pub fn price_lines(
    lines: &[RequestedLine],
    products: &HashMap<ProductId, Product>,
) -> Result<PricedOrder, PricingError> {
    let unknown: Vec<ProductId> = lines
        .iter()
        .filter(|line| !products.contains_key(&line.product_id))
        .map(|line| line.product_id)
        .collect();
    if !unknown.is_empty() {
        return Err(PricingError::UnknownProducts(unknown));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity < 1 {
            return Err(PricingError::InvalidQuantity {
                product_id: line.product_id,
            });
        }

        let Some(product) = products.get(&line.product_id) else {
            return Err(PricingError::UnknownProducts(vec![line.product_id]));
        };

        let line_total = (product.price * Decimal::from(line.quantity)).round_dp(2);
        total += line_total;

        priced.push(PricedLine {
            product_id: line.product_id,
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
            total: line_total,
            specifications: line.specifications.clone(),
        });
    }

    Ok(PricedOrder {
        lines: priced,
        total: total.round_dp(2),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CategoryId;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal::prelude::FromPrimitive;

    fn product(price: &str) -> Product {
        Product {
            id: ProductId::new(),
            name: "Business Cards".to_string(),
            category_id: CategoryId::new(),
            description: None,
            price: price.parse().unwrap(),
            image_url: None,
            specifications: serde_json::json!({}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(product_id: ProductId, quantity: i32) -> RequestedLine {
        RequestedLine {
            product_id,
            quantity,
            specifications: serde_json::json!({}),
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_total_sums_lines() {
        let a = product("100.00");
        let b = product("50.00");
        let lines = vec![line(a.id, 2), line(b.id, 1)];
        let priced = price_lines(&lines, &catalog(vec![a, b])).unwrap();

        assert_eq!(priced.total, "250.00".parse::<Decimal>().unwrap());
        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.lines[0].total, "200.00".parse::<Decimal>().unwrap());
        assert_eq!(priced.lines[1].total, "50.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_unit_price_copied_from_catalog() {
        let p = product("19.99");
        let priced = price_lines(&[line(p.id, 3)], &catalog(vec![p.clone()])).unwrap();
        assert_eq!(priced.lines[0].unit_price, p.price);
        assert_eq!(priced.lines[0].total, "59.97".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_unknown_products_listed() {
        let known = product("10.00");
        let missing_a = ProductId::new();
        let missing_b = ProductId::new();
        let lines = vec![line(known.id, 1), line(missing_a, 1), line(missing_b, 2)];

        let err = price_lines(&lines, &catalog(vec![known])).unwrap_err();
        assert_eq!(err, PricingError::UnknownProducts(vec![missing_a, missing_b]));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let p = product("10.00");
        let err = price_lines(&[line(p.id, 0)], &catalog(vec![p.clone()])).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidQuantity { product_id: p.id }
        );
    }

    proptest! {
        /// Decimal totals never drift: pricing the same request twice gives
        /// identical results, and the total always equals the line sum at
        /// scale 2.
        #[test]
        fn prop_total_is_exact_sum(
            cents in proptest::collection::vec(1u32..1_000_000, 1..8),
            quantities in proptest::collection::vec(1i32..1_000, 1..8),
        ) {
            let n = cents.len().min(quantities.len());
            let products: Vec<Product> = cents[..n]
                .iter()
                .map(|c| {
                    let price = Decimal::from_u32(*c).unwrap() / Decimal::from(100);
                    product(&price.round_dp(2).to_string())
                })
                .collect();
            let lines: Vec<RequestedLine> = products
                .iter()
                .zip(&quantities[..n])
                .map(|(p, q)| line(p.id, *q))
                .collect();
            let map = catalog(products);

            let first = price_lines(&lines, &map).unwrap();
            let second = price_lines(&lines, &map).unwrap();

            prop_assert_eq!(first.total, second.total);
            let sum: Decimal = first.lines.iter().map(|l| l.total).sum();
            prop_assert_eq!(first.total, sum.round_dp(2));
            prop_assert!(first.total.scale() <= 2);
        }
    }
}
