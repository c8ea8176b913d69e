//! # Reports
//!
//! Read-only aggregations over stored invoices and products: the sales
//! summary, top products, daily totals, low stock and the dashboard tiles.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{div_round_half_away, Money};
use crate::quantity::Quantity;
use crate::types::{Invoice, Product};

/// Default length of the top-products list.
pub const DEFAULT_TOP_PRODUCTS: usize = 5;

// =============================================================================
// Sales Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub invoice_count: u32,
    /// Σ grand_total
    pub total_sales: Money,
    /// Σ paid_amount
    pub received: Money,
    /// Σ due_amount
    pub outstanding: Money,
    pub total_gst: Money,
    pub total_cgst: Money,
    pub total_sgst: Money,
    pub total_igst: Money,
    pub average_invoice_value: Money,
}

impl SalesSummary {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        let mut summary = invoices.iter().fold(SalesSummary::default(), |mut acc, inv| {
            acc.invoice_count += 1;
            acc.total_sales += inv.grand_total;
            acc.received += inv.paid_amount;
            acc.outstanding += inv.due_amount;
            acc.total_gst += inv.total_gst;
            acc.total_cgst += inv.total_cgst;
            acc.total_sgst += inv.total_sgst;
            acc.total_igst += inv.total_igst;
            acc
        });
        if summary.invoice_count > 0 {
            summary.average_invoice_value = Money::from_paise(
                div_round_half_away(summary.total_sales.paise() as i128, summary.invoice_count as i128) as i64,
            );
        }
        summary
    }
}

// =============================================================================
// Top Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_name: String,
    pub quantity: Quantity,
    /// Σ line amount (pre-tax).
    pub revenue: Money,
    pub invoice_count: u32,
}

/// Products by revenue, highest first, grouped by name.
///
/// Ties break on name so the order is stable.
pub fn top_products(invoices: &[Invoice], limit: usize) -> Vec<ProductSales> {
    let mut by_name: BTreeMap<&str, ProductSales> = BTreeMap::new();

    for invoice in invoices {
        let mut seen_here: Vec<&str> = Vec::new();
        for item in &invoice.items {
            let entry = by_name.entry(item.product_name.as_str()).or_insert_with(|| ProductSales {
                product_name: item.product_name.clone(),
                quantity: Quantity::zero(),
                revenue: Money::zero(),
                invoice_count: 0,
            });
            entry.quantity += item.quantity;
            entry.revenue += item.amount;
            if !seen_here.contains(&item.product_name.as_str()) {
                entry.invoice_count += 1;
                seen_here.push(item.product_name.as_str());
            }
        }
    }

    let mut ranked: Vec<ProductSales> = by_name.into_values().collect();
    // BTreeMap already sorted by name; a stable sort keeps that for ties
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    ranked.truncate(limit);
    ranked
}

// =============================================================================
// Daily Totals
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub invoice_count: u32,
    pub total_sales: Money,
    pub total_gst: Money,
}

/// Per-day totals in ascending date order.
pub fn daily_sales(invoices: &[Invoice]) -> Vec<DailySales> {
    let mut days: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for inv in invoices {
        let day = days.entry(inv.invoice_date).or_insert(DailySales {
            date: inv.invoice_date,
            invoice_count: 0,
            total_sales: Money::zero(),
            total_gst: Money::zero(),
        });
        day.invoice_count += 1;
        day.total_sales += inv.grand_total;
        day.total_gst += inv.total_gst;
    }
    days.into_values().collect()
}

/// Everything the reports page shows for one date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
    pub summary: SalesSummary,
    pub top_products: Vec<ProductSales>,
    pub daily: Vec<DailySales>,
}

impl SalesReport {
    pub fn build(from: NaiveDate, to: NaiveDate, invoices: &[Invoice]) -> Self {
        SalesReport {
            from,
            to,
            summary: SalesSummary::from_invoices(invoices),
            top_products: top_products(invoices, DEFAULT_TOP_PRODUCTS),
            daily: daily_sales(invoices),
        }
    }
}

// =============================================================================
// Stock & Dashboard
// =============================================================================

/// Products at or below their alert level, lowest stock first.
pub fn low_stock(products: &[Product]) -> Vec<Product> {
    let mut low: Vec<Product> = products.iter().filter(|p| p.is_low_stock()).cloned().collect();
    low.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    low
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dashboard {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub today_sales: Money,
    pub today_invoice_count: u32,
    /// Σ due over every invoice.
    pub total_receivables: Money,
    pub product_count: u32,
    pub customer_count: u32,
    pub low_stock_count: u32,
}

impl Dashboard {
    pub fn build(
        date: NaiveDate,
        today_invoices: &[Invoice],
        total_receivables: Money,
        products: &[Product],
        customer_count: u32,
    ) -> Self {
        let today = SalesSummary::from_invoices(today_invoices);
        Dashboard {
            date,
            today_sales: today.total_sales,
            today_invoice_count: today.invoice_count,
            total_receivables,
            product_count: products.len() as u32,
            customer_count,
            low_stock_count: products.iter().filter(|p| p.is_low_stock()).count() as u32,
        }
    }
}
