//! Spend summary and payment calendar commands

use anyhow::{Context, Result};
use chrono::Local;
use subtrack_core::analytics::{HomeSummary, SpendItem};
use subtrack_core::billing::{events_for_month, Billable, MonthSchedule, MonthWindow};
use subtrack_core::db::Database;

use super::{find_user, truncate};

/// Build the home summary for a user
pub fn user_summary(db: &Database, email: &str) -> Result<HomeSummary> {
    let user = find_user(db, email)?;
    let subscriptions = db
        .list_user_subscriptions(user.id)
        .context("Failed to list subscriptions")?;
    let items: Vec<SpendItem> = subscriptions.iter().map(SpendItem::from).collect();
    Ok(HomeSummary::build(&user.name, &items))
}

pub fn cmd_summary(db: &Database, email: &str, json: bool) -> Result<()> {
    let summary = user_summary(db, email)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("📊 Monthly Spend ({})", summary.user_initials);
    println!("   ─────────────────────────────");
    println!("   Subscriptions: {}", summary.subscriptions_count);
    println!("   Per month:     {:.2}", summary.monthly_total);

    if summary.subscriptions_count == 0 {
        return Ok(());
    }

    println!();
    println!("   By category");
    for stat in &summary.category_stats {
        println!(
            "   {:20} │ {:>10.2} │ {:>5.1}%",
            truncate(&stat.name, 20),
            stat.amount,
            stat.share
        );
    }

    println!();
    println!("   By card");
    for stat in &summary.card_stats {
        println!(
            "   {:28} │ {:>10.2} │ {:>5.1}% │ {} sub(s)",
            truncate(&stat.label, 28),
            stat.amount,
            stat.share,
            stat.subscriptions_count
        );
    }

    Ok(())
}

/// Projected charges for a user in one month (`YYYY-MM`, default current)
pub fn user_schedule(db: &Database, email: &str, month: Option<&str>) -> Result<MonthSchedule> {
    let today = Local::now().date_naive();
    let window = match month {
        Some(m) => MonthWindow::parse(m)
            .with_context(|| format!("Invalid --month {:?} (use YYYY-MM)", m))?,
        None => MonthWindow::containing(today).context("Current month is out of range")?,
    };

    let user = find_user(db, email)?;
    let subscriptions = db
        .list_user_subscriptions(user.id)
        .context("Failed to list subscriptions")?;
    let billables: Vec<Billable> = subscriptions.iter().map(Billable::from).collect();
    let events = events_for_month(&billables, &window);

    Ok(MonthSchedule::build(window, events, None, today))
}

pub fn cmd_calendar(db: &Database, email: &str, month: Option<&str>) -> Result<()> {
    let schedule = user_schedule(db, email, month)?;

    println!();
    println!("📅 Payments in {}", schedule.month);
    println!("   ─────────────────────────────────────────────");

    if schedule.events.is_empty() {
        println!("   No payments this month");
        return Ok(());
    }

    for event in &schedule.events {
        println!(
            "   {} │ {:24} │ {:>10.2} │ {}",
            event.date.format("%a %d"),
            truncate(&event.name, 24),
            event.amount,
            event.payment_method_label.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!(
        "   Total: {:.2} across {} subscription(s)",
        schedule.month_total, schedule.unique_subscriptions
    );
    if let Some(next) = &schedule.next_event {
        println!("   Next:  {} on {}", next.name, next.date);
    }

    Ok(())
}
