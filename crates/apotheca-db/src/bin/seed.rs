//! Seeds a database with sample catalog data for local development.
//!
//! ```text
//! cargo run -p apotheca-db --bin seed -- [path/to/apotheca.db]
//! ```
//!
//! Safe to re-run: products are matched by name and skipped when present.

use chrono::NaiveDate;
use tracing::{info, warn};

use apotheca_db::{Database, DbConfig, DbResult};
use apotheca_core::{Money, NewProduct};

struct SeedProduct {
    name: &'static str,
    category: &'static str,
    quantity: i64,
    price_cents: i64,
    cost_cents: i64,
    reorder_level: i64,
    supplier: &'static str,
    expiry: Option<(i32, u32, u32)>,
}

const CATEGORIES: &[&str] = &[
    "Pain Relief",
    "Antibiotics",
    "Allergy",
    "Digestive Health",
    "First Aid",
    "Vitamins & Supplements",
];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Paracetamol 500mg (20 tabs)",
        category: "Pain Relief",
        quantity: 120,
        price_cents: 349,
        cost_cents: 180,
        reorder_level: 30,
        supplier: "MediSupply Co",
        expiry: Some((2027, 6, 30)),
    },
    SeedProduct {
        name: "Ibuprofen 200mg (24 tabs)",
        category: "Pain Relief",
        quantity: 90,
        price_cents: 499,
        cost_cents: 260,
        reorder_level: 25,
        supplier: "MediSupply Co",
        expiry: Some((2027, 3, 31)),
    },
    SeedProduct {
        name: "Amoxicillin 500mg (12 caps)",
        category: "Antibiotics",
        quantity: 40,
        price_cents: 1_299,
        cost_cents: 720,
        reorder_level: 15,
        supplier: "PharmChem Ltd",
        expiry: Some((2026, 11, 30)),
    },
    SeedProduct {
        name: "Cetirizine 10mg (30 tabs)",
        category: "Allergy",
        quantity: 75,
        price_cents: 699,
        cost_cents: 340,
        reorder_level: 20,
        supplier: "PharmChem Ltd",
        expiry: Some((2028, 1, 31)),
    },
    SeedProduct {
        name: "Loratadine 10mg (10 tabs)",
        category: "Allergy",
        quantity: 60,
        price_cents: 449,
        cost_cents: 210,
        reorder_level: 20,
        supplier: "PharmChem Ltd",
        expiry: Some((2027, 9, 30)),
    },
    SeedProduct {
        name: "Omeprazole 20mg (14 caps)",
        category: "Digestive Health",
        quantity: 55,
        price_cents: 899,
        cost_cents: 470,
        reorder_level: 15,
        supplier: "MediSupply Co",
        expiry: Some((2027, 5, 31)),
    },
    SeedProduct {
        name: "Oral Rehydration Salts (6 sachets)",
        category: "Digestive Health",
        quantity: 80,
        price_cents: 399,
        cost_cents: 190,
        reorder_level: 25,
        supplier: "Wellness Wholesale",
        expiry: Some((2028, 4, 30)),
    },
    SeedProduct {
        name: "Adhesive Bandages (40 pack)",
        category: "First Aid",
        quantity: 150,
        price_cents: 299,
        cost_cents: 130,
        reorder_level: 40,
        supplier: "Wellness Wholesale",
        expiry: None,
    },
    SeedProduct {
        name: "Antiseptic Solution 250ml",
        category: "First Aid",
        quantity: 65,
        price_cents: 549,
        cost_cents: 280,
        reorder_level: 20,
        supplier: "Wellness Wholesale",
        expiry: Some((2028, 8, 31)),
    },
    SeedProduct {
        name: "Vitamin C 1000mg (30 tabs)",
        category: "Vitamins & Supplements",
        quantity: 100,
        price_cents: 799,
        cost_cents: 410,
        reorder_level: 30,
        supplier: "NutriSource",
        expiry: Some((2028, 2, 29)),
    },
    SeedProduct {
        name: "Multivitamin Daily (60 tabs)",
        category: "Vitamins & Supplements",
        quantity: 45,
        price_cents: 1_199,
        cost_cents: 640,
        reorder_level: 15,
        supplier: "NutriSource",
        expiry: Some((2027, 12, 31)),
    },
];

async fn seed_categories(db: &Database) -> DbResult<()> {
    for name in CATEGORIES {
        sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?1)")
            .bind(name)
            .execute(db.pool())
            .await?;
    }
    info!(count = CATEGORIES.len(), "Categories seeded");
    Ok(())
}

async fn category_id(db: &Database, name: &str) -> DbResult<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM categories WHERE name = ?1")
        .bind(name)
        .fetch_optional(db.pool())
        .await?;
    Ok(id)
}

async fn seed_products(db: &Database) -> DbResult<()> {
    let products = db.products();
    let mut created = 0usize;

    for seed in PRODUCTS {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE name = ?1")
            .bind(seed.name)
            .fetch_one(db.pool())
            .await?;
        if exists > 0 {
            continue;
        }

        let expiry_date = seed
            .expiry
            .and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));

        let draft = NewProduct {
            name: seed.name.to_string(),
            category_id: category_id(db, seed.category).await?,
            quantity: seed.quantity,
            price: Money::from_cents(seed.price_cents),
            cost: Money::from_cents(seed.cost_cents),
            reorder_level: seed.reorder_level,
            supplier: Some(seed.supplier.to_string()),
            expiry_date,
        };

        let product = products.create(&draft).await?;
        info!(id = product.id, name = %product.name, "Product seeded");
        created += 1;
    }

    if created == 0 {
        warn!("No new products created (database already seeded)");
    } else {
        info!(created, "Catalog seeded");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> DbResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "apotheca.db".to_string());

    info!(path = %path, "Seeding database");

    let db = Database::new(DbConfig::new(&path)).await?;
    seed_categories(&db).await?;
    seed_products(&db).await?;
    db.close().await;

    info!("Seed complete");
    Ok(())
}
