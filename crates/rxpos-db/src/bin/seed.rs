//! # Seed Data Generator
//!
//! Provisions an active demo pharmacy for local development.
//!
//! ## Usage
//! ```bash
//! # Demo tenant "demo" / "demo1234" in ./rxpos.db
//! cargo run -p rxpos-db --bin seed
//!
//! # Custom database and owner
//! cargo run -p rxpos-db --bin seed -- --db ./data/dev.db --username cairo --password secret99
//! ```
//!
//! ## Generated Data
//! - One ACTIVE tenant with its owner, default inventory and categories
//! - A second inventory ("Back Room")
//! - Medicines across the default categories, each with two or three
//!   batches at staggered expiry dates (one batch already near expiry)
//! - A customer and a supplier

use std::env;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{Duration, Utc};
use rxpos_core::{ProductType, TenantStatus};
use rxpos_db::repository::customer::NewCustomer;
use rxpos_db::repository::inventory::{AddStock, NewInventory};
use rxpos_db::repository::product::NewProduct;
use rxpos_db::repository::supplier::NewSupplier;
use rxpos_db::repository::tenant::NewRegistration;
use rxpos_db::{Actor, Database, DbConfig};

/// (name, generic name, type, price in piasters, requires prescription)
const PRODUCTS: &[(&str, &str, ProductType, i64, bool)] = &[
    ("Panadol Extra", "Paracetamol + Caffeine", ProductType::Medicine, 4_500, false),
    ("Augmentin 1g", "Amoxicillin + Clavulanate", ProductType::Medicine, 12_500, true),
    ("Brufen 400", "Ibuprofen", ProductType::Medicine, 3_800, false),
    ("Concor 5", "Bisoprolol", ProductType::Medicine, 6_900, true),
    ("Glucophage 500", "Metformin", ProductType::Medicine, 2_750, true),
    ("Otrivin Adult", "Xylometazoline", ProductType::Medicine, 3_200, false),
    ("Centrum Adults", "Multivitamin", ProductType::Supplement, 38_000, false),
    ("Omega 3 Plus", "Fish Oil", ProductType::Supplement, 21_000, false),
    ("Bepanthen Cream", "Dexpanthenol", ProductType::Cosmetic, 9_500, false),
    ("Vichy Mineral 89", "Hyaluronic Acid", ProductType::Cosmetic, 74_000, false),
    ("Accu-Chek Strips", "Glucose Test Strips", ProductType::MedicalDevice, 45_000, false),
    ("Omron M2", "Blood Pressure Monitor", ProductType::MedicalDevice, 180_000, false),
];

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./rxpos.db");
    let mut username = String::from("demo");
    let mut password = String::from("demo1234");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 1;
            }
            "--username" | "-u" if i + 1 < args.len() => {
                username = args[i + 1].clone();
                i += 1;
            }
            "--password" | "-p" if i + 1 < args.len() => {
                password = args[i + 1].clone();
                i += 1;
            }
            "--help" | "-h" => {
                println!("rxpos Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./rxpos.db)");
                println!("  -u, --username <NAME>    Owner username (default: demo)");
                println!("  -p, --password <PASS>    Owner password (default: demo1234)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("rxpos Seed Data Generator");
    println!("=========================");
    println!("Database: {db_path}");
    println!("Owner:    {username}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    if db.users().get_by_username(&username).await?.is_some() {
        println!("⚠ User '{username}' already exists; skipping seed.");
        println!("  Delete the database file or pick another --username.");
        return Ok(());
    }

    let (tenant, owner) = db
        .tenants()
        .register(&NewRegistration {
            pharmacy_name: format!("{username} Pharmacy"),
            email: format!("{username}@rxpos.local"),
            phone: "01001234567".to_string(),
            address: "26 July Street, Zamalek".to_string(),
            city: "Cairo".to_string(),
            owner_name: "Demo Owner".to_string(),
            username: username.clone(),
            password_hash: hash_password(&password).map_err(|e| e.to_string())?,
        })
        .await?;
    db.tenants().set_status(&tenant.id, TenantStatus::Active).await?;
    println!("✓ Tenant '{}' registered and activated", tenant.name);

    let actor = Actor::new(&tenant.id, &owner.id);
    let main_store = db.inventory().default_inventory(&tenant.id).await?;
    let back_room = db
        .inventory()
        .create(
            &tenant.id,
            &NewInventory {
                name: "Back Room".to_string(),
                location: Some("Behind the counter".to_string()),
            },
        )
        .await?;

    let categories = db.categories().list(&tenant.id).await?;
    let category_for = |product_type: ProductType| {
        let name = match product_type {
            ProductType::Medicine | ProductType::Other => "Medicines",
            ProductType::Cosmetic => "Cosmetics",
            ProductType::Supplement => "Supplements",
            ProductType::MedicalDevice => "Medical Devices",
        };
        categories.iter().find(|c| c.name == name).map(|c| c.id.clone())
    };

    let today = Utc::now().date_naive();
    let mut batches = 0;
    for (index, (name, generic, product_type, price, rx)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .create(
                &tenant.id,
                &NewProduct {
                    name: name.to_string(),
                    generic_name: Some(generic.to_string()),
                    category_id: category_for(*product_type),
                    product_type: *product_type,
                    cost_price_cents: Some(price * 7 / 10),
                    selling_price_cents: *price,
                    requires_prescription: *rx,
                    is_vat_exempt: *product_type == ProductType::Medicine,
                    ..NewProduct::default()
                },
            )
            .await?;

        let offset = index as i64;
        let lots = [
            (format!("L{:03}A", index + 1), 6 + offset, 30 + offset * 5, &main_store.id),
            (format!("L{:03}B", index + 1), 20 + offset * 2, 240 + offset * 10, &main_store.id),
            (format!("L{:03}B", index + 1), 12, 240 + offset * 10, &back_room.id),
        ];
        for (batch, quantity, days, inventory_id) in lots {
            db.inventory()
                .add_stock(
                    &actor,
                    &AddStock {
                        product_id: product.id.clone(),
                        inventory_id: inventory_id.clone(),
                        quantity,
                        batch_number: Some(batch),
                        expiry_date: Some(today + Duration::days(days)),
                        cost_price_cents: None,
                    },
                )
                .await?;
            batches += 1;
        }
    }
    println!("✓ {} products with {batches} batches", PRODUCTS.len());

    db.customers()
        .create(
            &tenant.id,
            &NewCustomer {
                name: "Mona Ali".to_string(),
                phone: Some("01112223334".to_string()),
                credit_limit_cents: 500_000,
                ..NewCustomer::default()
            },
        )
        .await?;
    db.suppliers()
        .create(
            &tenant.id,
            &NewSupplier {
                name: "Ibnsina Pharma".to_string(),
                contact_person: Some("Hany Fawzy".to_string()),
                phone: Some("0223456789".to_string()),
                payment_terms: Some("Net 30".to_string()),
                ..NewSupplier::default()
            },
        )
        .await?;
    println!("✓ Customer and supplier created");

    println!();
    println!("Log in with {username} / {password}");

    db.close().await;
    Ok(())
}
