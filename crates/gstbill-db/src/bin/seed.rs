//! # Seed Data Generator
//!
//! Populates a database with a small Indian retail catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./gstbill_dev.db for a shop in Maharashtra
//! cargo run -p gstbill-db --bin seed
//!
//! # Specify database path, shop state and the first admin
//! cargo run -p gstbill-db --bin seed -- --db ./data/gstbill.db --state 29 --admin owner@shop.in
//! ```
//!
//! ## Generated Data
//! - Settings for the chosen state (only if none exist)
//! - Products across the common GST slabs (0%, 5%, 12%, 18%, 28%)
//! - Customers: one in-state, one inter-state with a GSTIN, one retail
//! - Optionally an admin on the approved-user allowlist

use anyhow::{bail, Context};
use chrono::Utc;
use std::env;
use std::sync::Arc;

use gstbill_core::auth::ApproveUserInput;
use gstbill_core::{CustomerInput, Money, ProductInput, Quantity, Role, Settings, TaxRate};
use gstbill_db::{BillingService, Database, DbConfig, ServiceOptions, SqliteStore};

/// (name, hsn, gst bps, selling price in paise, unit, opening stock)
const PRODUCTS: &[(&str, &str, u32, i64, &str, i64)] = &[
    ("Basmati Rice 5kg", "1006", 500, 54_900, "bag", 40),
    ("Toor Dal 1kg", "0713", 0, 16_500, "pkt", 60),
    ("Sunflower Oil 1L", "1512", 500, 15_200, "btl", 48),
    ("Atta 10kg", "1101", 0, 42_000, "bag", 25),
    ("Masala Chai 250g", "0902", 500, 13_000, "pkt", 80),
    ("Bathing Soap 4x100g", "3401", 1800, 18_000, "pkt", 70),
    ("Toothpaste 200g", "3306", 1800, 11_500, "pcs", 90),
    ("Detergent Powder 1kg", "3402", 1800, 12_500, "pkt", 55),
    ("Steel Tiffin Box", "7323", 1200, 45_000, "pcs", 12),
    ("LED Bulb 9W", "8539", 1200, 9_900, "pcs", 100),
    ("Ceiling Fan", "8414", 1800, 2_25_000, "pcs", 6),
    ("Mixer Grinder 750W", "8509", 1800, 3_49_900, "pcs", 4),
    ("Split AC 1.5T", "8415", 2800, 35_99_000, "pcs", 2),
    ("Cement 50kg", "2523", 2800, 42_000, "bag", 30),
];

fn print_help() {
    println!("GST Billing Seed Data Generator");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>       Database file path (default: ./gstbill_dev.db)");
    println!("  -s, --state <CODE>    Shop state code for new settings (default: 27)");
    println!("  -a, --admin <EMAIL>   Approve EMAIL as admin");
    println!("  -h, --help            Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./gstbill_dev.db");
    let mut state_code = String::from("27");
    let mut admin: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                db_path = args.get(i + 1).cloned().context("--db needs a path")?;
                i += 1;
            }
            "--state" | "-s" => {
                state_code = args.get(i + 1).cloned().context("--state needs a code")?;
                i += 1;
            }
            "--admin" | "-a" => {
                admin = Some(args.get(i + 1).cloned().context("--admin needs an email")?);
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 GST Billing Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let service = BillingService::new(Arc::new(SqliteStore::new(db)), ServiceOptions::default());
    let settings = service
        .initialize(&Settings::new(&state_code, state_name(&state_code), Utc::now()))
        .await?;
    println!("✓ Settings: {} ({})", settings.shop_name, settings.state_code);

    let existing = service.list_products().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog to avoid duplicates.");
    } else {
        for (index, (name, hsn, bps, paise, unit, stock)) in PRODUCTS.iter().enumerate() {
            let selling_price = Money::from_paise(*paise);
            let input = ProductInput {
                name: name.to_string(),
                sku: Some(format!("SKU-{:03}", index + 1)),
                hsn_code: Some(hsn.to_string()),
                gst_rate: TaxRate::from_bps(*bps),
                // 75% of MRP
                purchase_price: Money::from_paise(paise * 3 / 4),
                selling_price,
                stock: Quantity::from_units(*stock),
                low_stock_alert: Quantity::from_units(5),
                unit: Some(unit.to_string()),
            };
            if let Err(e) = service.create_product(input).await {
                eprintln!("Failed to insert {}: {}", name, e);
            }
        }
        println!("✓ Inserted {} products", PRODUCTS.len());

        for input in customers(&state_code) {
            service.create_customer(input).await?;
        }
        println!("✓ Inserted 3 customers");
    }

    if let Some(email) = admin {
        match service.check_approved(&email).await? {
            Some(user) => println!("✓ {} is already approved as {}", user.email, user.role),
            None => {
                let user = service
                    .add_approved_user(ApproveUserInput {
                        email,
                        role: Role::Admin,
                    })
                    .await?;
                println!("✓ Approved {} as admin", user.email);
            }
        }
    }

    let dashboard = service.dashboard(service.today()).await?;
    println!();
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn customers(shop_state: &str) -> Vec<CustomerInput> {
    // any state other than the shop's makes an inter-state party
    let other_state = if shop_state == "29" { "27" } else { "29" };
    vec![
        CustomerInput {
            name: "Meera Iyer".to_string(),
            phone: Some("9820012345".to_string()),
            gstin: None,
            address: Some("Andheri West".to_string()),
            email: None,
            state_code: Some(shop_state.to_string()),
        },
        CustomerInput {
            name: "Deccan Traders".to_string(),
            phone: Some("8041234567".to_string()),
            gstin: Some(format!("{other_state}AABCD1234E1Z5")),
            address: Some("Industrial Area".to_string()),
            email: Some("accounts@deccantraders.in".to_string()),
            state_code: None,
        },
        CustomerInput {
            name: "Walk-in Regular".to_string(),
            phone: None,
            gstin: None,
            address: None,
            email: None,
            state_code: None,
        },
    ]
}

fn state_name(code: &str) -> &'static str {
    match code {
        "07" => "Delhi",
        "09" => "Uttar Pradesh",
        "24" => "Gujarat",
        "27" => "Maharashtra",
        "29" => "Karnataka",
        "33" => "Tamil Nadu",
        "36" => "Telangana",
        _ => "Unknown",
    }
}
