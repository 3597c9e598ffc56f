//! Credit package catalogue.
//!
//! Purchases are simulated: buying a package credits the account without
//! any payment processing.

use serde::{Deserialize, Serialize};

/// A purchasable bundle of credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPackage {
    /// Credits granted by the package.
    pub credits: i64,

    /// Displayed price in euro cents.
    pub price_cents: i64,

    /// Highlighted in the catalogue.
    pub popular: bool,
}

const CATALOG: [CreditPackage; 4] = [
    CreditPackage {
        credits: 100,
        price_cents: 999,
        popular: false,
    },
    CreditPackage {
        credits: 500,
        price_cents: 3999,
        popular: true,
    },
    CreditPackage {
        credits: 1000,
        price_cents: 6999,
        popular: false,
    },
    CreditPackage {
        credits: 2500,
        price_cents: 14999,
        popular: false,
    },
];

impl CreditPackage {
    /// The full catalogue, in display order.
    #[must_use]
    pub const fn catalog() -> &'static [Self] {
        &CATALOG
    }

    /// Look up the package granting exactly `credits`.
    #[must_use]
    pub fn find(credits: i64) -> Option<Self> {
        CATALOG.iter().copied().find(|p| p.credits == credits)
    }

    /// Price formatted as euros, e.g. `"39.99"`.
    #[must_use]
    pub fn price_formatted(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }

    /// Description recorded on the purchase transaction.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "Achat de {} crédits pour {}€",
            self.credits,
            self.price_formatted()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_one_popular_package() {
        let popular: Vec<_> = CreditPackage::catalog()
            .iter()
            .filter(|p| p.popular)
            .collect();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].credits, 500);
    }

    #[test]
    fn find_by_credits() {
        assert_eq!(CreditPackage::find(1000).unwrap().price_cents, 6999);
        assert!(CreditPackage::find(42).is_none());
    }

    #[test]
    fn description_includes_price() {
        let package = CreditPackage::find(100).unwrap();
        assert_eq!(package.price_formatted(), "9.99");
        assert_eq!(package.description(), "Achat de 100 crédits pour 9.99€");
    }
}
