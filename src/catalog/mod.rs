pub mod entitlement;
pub mod money;

pub use money::Money;

/// A product sold through PayPal checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub sku: &'static str,
    pub name: &'static str,
    pub price_cents: i64,
    // Tier tag written to users.status, None for one-off products
    pub status: Option<&'static str>,
    pub validity_days: u32,
    pub points_multiplier: u32,
}

impl Product {
    pub fn price(&self, currency: &str) -> Money {
        Money::new(self.price_cents, currency)
    }
}

pub const PRODUCTS: &[Product] = &[
    Product {
        sku: "VIP_PASS",
        name: "VIP Pass",
        price_cents: 4000,
        status: Some("VIP"),
        validity_days: 30,
        points_multiplier: 1,
    },
    Product {
        sku: "FULL_ACCESS",
        name: "Full Access",
        price_cents: 5000,
        status: Some("FULL"),
        validity_days: 30,
        points_multiplier: 1,
    },
    Product {
        sku: "VIP_3M",
        name: "VIP 3 Monate",
        price_cents: 10000,
        status: Some("VIP"),
        validity_days: 90,
        points_multiplier: 1,
    },
    Product {
        sku: "LIFETIME",
        name: "Lifetime Zugang",
        price_cents: 15000,
        status: Some("LIFETIME"),
        validity_days: entitlement::UNLIMITED_DAYS,
        points_multiplier: 1,
    },
    Product {
        sku: "BILDER_SET",
        name: "Bilder Set",
        price_cents: 2000,
        status: None,
        validity_days: 0,
        points_multiplier: 1,
    },
    Product {
        sku: "VIDEO_SET",
        name: "Video Set",
        price_cents: 3000,
        status: None,
        validity_days: 0,
        points_multiplier: 1,
    },
];

pub fn find_product(sku: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.sku.eq_ignore_ascii_case(sku.trim()))
}

/// Something loyalty points can be spent on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reward {
    pub id: &'static str,
    pub name: &'static str,
    pub cost: i64,
}

pub const REWARDS: &[Reward] = &[
    Reward {
        id: "bonus_bild",
        name: "Bonus Bild",
        cost: 10,
    },
    Reward {
        id: "bonus_video",
        name: "Bonus Video",
        cost: 25,
    },
    Reward {
        id: "sprachnachricht",
        name: "Persönliche Sprachnachricht",
        cost: 50,
    },
];

pub fn find_reward(id: &str) -> Option<&'static Reward> {
    REWARDS.iter().find(|r| r.id == id)
}
